use objc2::AnyThread;
use objc2::rc::Retained;
use objc2_core_bluetooth::{
    CBAttributePermissions, CBCharacteristicProperties, CBMutableCharacteristic,
};

use super::mac_extensions_cb::uuid_to_cbuuid;
use crate::api::characteristic::{AttributePermission, Characteristic, CharacteristicProperty};

// Values are always served on demand, so no characteristic carries a cached
// value. CoreBluetooth only accepts a cached value on read-only characteristics.
pub fn parse_characteristic(characteristic: &Characteristic) -> Retained<CBMutableCharacteristic> {
    let properties = characteristic
        .properties
        .iter()
        .fold(CBCharacteristicProperties::empty(), |acc, property| {
            acc | property_to_cb(*property)
        });
    let permissions = characteristic
        .permissions
        .iter()
        .fold(CBAttributePermissions::empty(), |acc, permission| {
            acc | permission_to_cb(*permission)
        });

    unsafe {
        CBMutableCharacteristic::initWithType_properties_value_permissions(
            CBMutableCharacteristic::alloc(),
            &uuid_to_cbuuid(characteristic.uuid),
            properties,
            None,
            permissions,
        )
    }
}

fn property_to_cb(property: CharacteristicProperty) -> CBCharacteristicProperties {
    match property {
        CharacteristicProperty::Broadcast => CBCharacteristicProperties::Broadcast,
        CharacteristicProperty::Read => CBCharacteristicProperties::Read,
        CharacteristicProperty::WriteWithoutResponse => {
            CBCharacteristicProperties::WriteWithoutResponse
        }
        CharacteristicProperty::Write => CBCharacteristicProperties::Write,
        CharacteristicProperty::Notify => CBCharacteristicProperties::Notify,
        CharacteristicProperty::Indicate => CBCharacteristicProperties::Indicate,
    }
}

fn permission_to_cb(permission: AttributePermission) -> CBAttributePermissions {
    match permission {
        AttributePermission::Readable => CBAttributePermissions::Readable,
        AttributePermission::Writeable => CBAttributePermissions::Writeable,
        AttributePermission::ReadEncryptionRequired => {
            CBAttributePermissions::ReadEncryptionRequired
        }
        AttributePermission::WriteEncryptionRequired => {
            CBAttributePermissions::WriteEncryptionRequired
        }
    }
}
