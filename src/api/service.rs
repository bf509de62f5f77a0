use uuid::Uuid;

use crate::api::characteristic::Characteristic;

#[derive(Debug, Clone, Ord, PartialOrd, PartialEq, Eq)]
pub struct Service {
    pub uuid: Uuid,
    pub primary: bool,
    pub characteristics: Vec<Characteristic>,
}

impl Service {
    pub fn new(uuid: Uuid, primary: bool, characteristics: Vec<Characteristic>) -> Self {
        Service {
            uuid,
            primary,
            characteristics,
        }
    }

    pub fn primary(uuid: Uuid, characteristics: Vec<Characteristic>) -> Self {
        Self::new(uuid, true, characteristics)
    }

    pub fn characteristic(&self, uuid: &Uuid) -> Option<&Characteristic> {
        self.characteristics.iter().find(|c| &c.uuid == uuid)
    }
}
