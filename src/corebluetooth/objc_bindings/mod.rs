use std::collections::HashMap;

use tokio::sync::oneshot;
use uuid::Uuid;

mod characteristic_utils_cb;
mod mac_extensions_cb;
mod mac_utils_cb;
pub mod peripheral_manager_cb;
mod peripheral_manager_delegate_cb;

// Registration results waiting on peripheralManager:didAddService:error:,
// keyed by service.
#[derive(Debug)]
pub struct ServiceResolver(HashMap<Uuid, oneshot::Sender<Option<String>>>);

// The result waiting on peripheralManagerDidStartAdvertising:error:.
#[derive(Debug)]
pub struct AdvertisementResolver(Option<oneshot::Sender<Option<String>>>);

impl ServiceResolver {
    pub fn new() -> Self {
        Self(HashMap::new())
    }

    pub fn is_waiting_for(&self, service_uuid: &Uuid) -> bool {
        self.0.contains_key(service_uuid)
    }

    pub fn register(&mut self, service_uuid: Uuid, sender: oneshot::Sender<Option<String>>) {
        self.0.insert(service_uuid, sender);
    }

    pub fn take(&mut self, service_uuid: &Uuid) -> Option<oneshot::Sender<Option<String>>> {
        self.0.remove(service_uuid)
    }

    pub fn cancel(&mut self, service_uuid: &Uuid) -> bool {
        self.0.remove(service_uuid).is_some()
    }
}

impl Default for ServiceResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl AdvertisementResolver {
    pub fn new() -> Self {
        Self(None)
    }

    pub fn is_waiting(&self) -> bool {
        self.0.is_some()
    }

    pub fn register(&mut self, sender: oneshot::Sender<Option<String>>) {
        self.0 = Some(sender);
    }

    pub fn take(&mut self) -> Option<oneshot::Sender<Option<String>>> {
        self.0.take()
    }

    pub fn cancel(&mut self) {
        self.0 = None;
    }
}

impl Default for AdvertisementResolver {
    fn default() -> Self {
        Self::new()
    }
}
