//! The fixed set of GATT services the peripheral exposes.
//!
//! A [`Catalog`] is validated once when it is built and only handed out by
//! shared reference afterwards.

use std::collections::HashSet;

use uuid::Uuid;

use crate::api::characteristic::{AttributePermission, Characteristic, CharacteristicProperty};
use crate::api::service::Service;
use crate::{Error, ErrorType, Result};

pub const HEART_MONITOR_SERVICE: Uuid = Uuid::from_u128(0xCE4CFF01_B85D_49AA_8E03_0D34779A6EEF);
pub const STEPS_MONITOR_SERVICE: Uuid = Uuid::from_u128(0x3E18B512_D819_4550_8343_F9EFFDA2F896);
pub const TEMPERATURE_MONITOR_SERVICE: Uuid =
    Uuid::from_u128(0x4B5CF42E_3224_43B4_AFA2_8A0917B34856);

pub const HEART_RATE_CHARACTERISTIC: Uuid =
    Uuid::from_u128(0x7821C91E_A551_4907_A5E0_F6CB64AC0A4B);
pub const STEPS_COUNT_CHARACTERISTIC: Uuid =
    Uuid::from_u128(0xEE6134CF_F907_45CD_B259_2AB681CA6B32);
pub const TEMPERATURE_CHARACTERISTIC: Uuid =
    Uuid::from_u128(0x2BCE8CF5_F03E_4EB2_BB35_77C87AC5F1A4);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalog {
    services: Vec<Service>,
}

impl Catalog {
    /// Checks that every service has at least one characteristic and that no
    /// UUID is used twice, either across services or across characteristics.
    pub fn new(services: Vec<Service>) -> Result<Self> {
        if services.is_empty() {
            return Err(invalid("catalog has no services".to_string()));
        }

        let mut service_ids = HashSet::new();
        let mut characteristic_ids = HashSet::new();
        for service in &services {
            if !service_ids.insert(service.uuid) {
                return Err(invalid(format!("service {} is declared twice", service.uuid)));
            }
            if service.characteristics.is_empty() {
                return Err(invalid(format!(
                    "service {} has no characteristics",
                    service.uuid
                )));
            }
            for characteristic in &service.characteristics {
                if !characteristic_ids.insert(characteristic.uuid) {
                    return Err(invalid(format!(
                        "characteristic {} is declared twice (last in service {})",
                        characteristic.uuid, service.uuid
                    )));
                }
            }
        }

        Ok(Self { services })
    }

    /// Heart, steps and temperature monitors.
    pub fn standard() -> Self {
        let readable = || vec![AttributePermission::Readable];
        Self {
            services: vec![
                Service::primary(
                    HEART_MONITOR_SERVICE,
                    vec![Characteristic::new(
                        HEART_RATE_CHARACTERISTIC,
                        vec![CharacteristicProperty::Read, CharacteristicProperty::Notify],
                        readable(),
                    )],
                ),
                Service::primary(
                    STEPS_MONITOR_SERVICE,
                    vec![Characteristic::new(
                        STEPS_COUNT_CHARACTERISTIC,
                        vec![CharacteristicProperty::Read],
                        readable(),
                    )],
                ),
                Service::primary(
                    TEMPERATURE_MONITOR_SERVICE,
                    vec![Characteristic::new(
                        TEMPERATURE_CHARACTERISTIC,
                        vec![CharacteristicProperty::Read],
                        readable(),
                    )],
                ),
            ],
        }
    }

    /// Services in registration order.
    pub fn describe(&self) -> &[Service] {
        &self.services
    }

    pub fn characteristic(&self, uuid: &Uuid) -> Option<&Characteristic> {
        self.services.iter().find_map(|s| s.characteristic(uuid))
    }

    pub fn service_of(&self, characteristic: &Uuid) -> Option<&Service> {
        self.services
            .iter()
            .find(|s| s.characteristic(characteristic).is_some())
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::standard()
    }
}

fn invalid(message: String) -> Error {
    Error::from_string(message, ErrorType::InvalidCatalog)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_only(uuid: Uuid) -> Characteristic {
        Characteristic::new(
            uuid,
            vec![CharacteristicProperty::Read],
            vec![AttributePermission::Readable],
        )
    }

    #[test]
    fn standard_catalog_passes_validation() {
        let standard = Catalog::standard();
        let rebuilt = Catalog::new(standard.describe().to_vec()).unwrap();
        assert_eq!(rebuilt, standard);
    }

    #[test]
    fn standard_catalog_order_and_capabilities() {
        let catalog = Catalog::standard();
        let ids: Vec<Uuid> = catalog.describe().iter().map(|s| s.uuid).collect();
        assert_eq!(
            ids,
            vec![
                HEART_MONITOR_SERVICE,
                STEPS_MONITOR_SERVICE,
                TEMPERATURE_MONITOR_SERVICE
            ]
        );
        assert!(catalog.describe().iter().all(|s| s.primary));

        let heart = catalog.characteristic(&HEART_RATE_CHARACTERISTIC).unwrap();
        assert!(heart.is_readable() && heart.is_notifiable());
        let steps = catalog.characteristic(&STEPS_COUNT_CHARACTERISTIC).unwrap();
        assert!(steps.is_readable() && !steps.is_notifiable());
        let temperature = catalog.characteristic(&TEMPERATURE_CHARACTERISTIC).unwrap();
        assert!(temperature.is_readable() && !temperature.is_notifiable());
    }

    #[test]
    fn uuids_render_in_canonical_form() {
        assert_eq!(
            HEART_MONITOR_SERVICE.hyphenated().to_string().to_uppercase(),
            "CE4CFF01-B85D-49AA-8E03-0D34779A6EEF"
        );
        assert_eq!(
            TEMPERATURE_CHARACTERISTIC.hyphenated().to_string().to_uppercase(),
            "2BCE8CF5-F03E-4EB2-BB35-77C87AC5F1A4"
        );
    }

    #[test]
    fn service_of_finds_owner() {
        let catalog = Catalog::standard();
        assert_eq!(
            catalog.service_of(&STEPS_COUNT_CHARACTERISTIC).map(|s| s.uuid),
            Some(STEPS_MONITOR_SERVICE)
        );
        assert!(catalog.service_of(&Uuid::nil()).is_none());
    }

    #[test]
    fn rejects_service_without_characteristics() {
        let error = Catalog::new(vec![Service::primary(Uuid::from_u128(1), vec![])]).unwrap_err();
        assert_eq!(error.kind(), ErrorType::InvalidCatalog);
    }

    #[test]
    fn rejects_duplicate_characteristic_within_service() {
        let service = Service::primary(
            Uuid::from_u128(1),
            vec![read_only(Uuid::from_u128(10)), read_only(Uuid::from_u128(10))],
        );
        let error = Catalog::new(vec![service]).unwrap_err();
        assert_eq!(error.kind(), ErrorType::InvalidCatalog);
    }

    #[test]
    fn rejects_characteristic_shared_between_services() {
        let first = Service::primary(Uuid::from_u128(1), vec![read_only(Uuid::from_u128(10))]);
        let second = Service::primary(Uuid::from_u128(2), vec![read_only(Uuid::from_u128(10))]);
        assert!(Catalog::new(vec![first, second]).is_err());
    }

    #[test]
    fn rejects_empty_and_duplicate_services() {
        assert!(Catalog::new(vec![]).is_err());

        let first = Service::primary(Uuid::from_u128(1), vec![read_only(Uuid::from_u128(10))]);
        let second = Service::primary(Uuid::from_u128(1), vec![read_only(Uuid::from_u128(11))]);
        assert!(Catalog::new(vec![first, second]).is_err());
    }
}
