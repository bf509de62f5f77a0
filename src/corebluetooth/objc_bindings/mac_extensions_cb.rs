use objc2::rc::Retained;
use objc2_core_bluetooth::{CBCharacteristic, CBService, CBUUID};
use objc2_foundation::{NSString, NSUUID};
use uuid::Uuid;

// 0000xxxx-0000-1000-8000-00805F9B34FB
const BLUETOOTH_BASE_UUID: u128 = 0x00000000_0000_1000_8000_00805F9B34FB;

pub fn uuid_to_cbuuid(uuid: Uuid) -> Retained<CBUUID> {
    let uuid_str = uuid.hyphenated().to_string().to_uppercase();
    unsafe { CBUUID::UUIDWithString(&NSString::from_str(&uuid_str)) }
}

pub fn nsuuid_to_string(uuid: &NSUUID) -> String {
    uuid.UUIDString().to_string()
}

/// CoreBluetooth reports assigned numbers in their 16 or 32 bit short form.
pub fn parse_uuid(uuid_str: &str) -> Option<Uuid> {
    match uuid_str.len() {
        4 | 8 => u32::from_str_radix(uuid_str, 16)
            .ok()
            .map(|short| Uuid::from_u128(BLUETOOTH_BASE_UUID | (u128::from(short) << 96))),
        _ => Uuid::parse_str(uuid_str).ok(),
    }
}

pub trait UuidExtension {
    fn get_uuid(self) -> Option<Uuid>;
}

impl UuidExtension for &CBService {
    fn get_uuid(self) -> Option<Uuid> {
        unsafe { self.UUID().get_uuid() }
    }
}

impl UuidExtension for &CBCharacteristic {
    fn get_uuid(self) -> Option<Uuid> {
        unsafe { self.UUID().get_uuid() }
    }
}

impl UuidExtension for &CBUUID {
    fn get_uuid(self) -> Option<Uuid> {
        let uuid_str = unsafe { self.UUIDString() }.to_string();
        parse_uuid(&uuid_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_and_short_forms() {
        assert_eq!(
            parse_uuid("CE4CFF01-B85D-49AA-8E03-0D34779A6EEF"),
            Some(Uuid::from_u128(0xCE4CFF01_B85D_49AA_8E03_0D34779A6EEF))
        );
        assert_eq!(
            parse_uuid("180D"),
            Some(Uuid::from_u128(0x0000180D_0000_1000_8000_00805F9B34FB))
        );
        assert_eq!(parse_uuid("not a uuid"), None);
    }
}
