use uuid::Uuid;

#[derive(Debug, Ord, Eq, PartialEq, PartialOrd, Clone)]
pub struct Characteristic {
    pub uuid: Uuid,
    pub properties: Vec<CharacteristicProperty>,
    pub permissions: Vec<AttributePermission>,
}

impl Characteristic {
    pub fn new(
        uuid: Uuid,
        properties: Vec<CharacteristicProperty>,
        permissions: Vec<AttributePermission>,
    ) -> Self {
        Characteristic {
            uuid,
            properties,
            permissions,
        }
    }

    pub fn is_readable(&self) -> bool {
        self.properties.contains(&CharacteristicProperty::Read)
    }

    pub fn is_notifiable(&self) -> bool {
        self.properties.contains(&CharacteristicProperty::Notify)
            || self.properties.contains(&CharacteristicProperty::Indicate)
    }
}

impl Default for Characteristic {
    fn default() -> Self {
        Characteristic {
            uuid: Uuid::nil(),
            properties: vec![CharacteristicProperty::Read],
            permissions: vec![AttributePermission::Readable],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialOrd, Ord, Eq, PartialEq)]
pub enum CharacteristicProperty {
    Broadcast,
    Read,
    WriteWithoutResponse,
    Write,
    Notify,
    Indicate,
}

#[derive(Debug, Clone, Copy, Ord, PartialOrd, PartialEq, Eq)]
pub enum AttributePermission {
    Readable,
    Writeable,
    ReadEncryptionRequired,
    WriteEncryptionRequired,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capabilities_follow_properties() {
        let heart_rate = Characteristic::new(
            Uuid::from_u128(1),
            vec![CharacteristicProperty::Read, CharacteristicProperty::Notify],
            vec![AttributePermission::Readable],
        );
        assert!(heart_rate.is_readable());
        assert!(heart_rate.is_notifiable());

        let notify_only = Characteristic::new(
            Uuid::from_u128(2),
            vec![CharacteristicProperty::Notify],
            vec![AttributePermission::Readable],
        );
        assert!(!notify_only.is_readable());
        assert!(notify_only.is_notifiable());
    }

    #[test]
    fn default_is_read_only() {
        let characteristic = Characteristic::default();
        assert!(characteristic.is_readable());
        assert!(!characteristic.is_notifiable());
    }
}
