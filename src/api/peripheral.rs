use async_trait::async_trait;
use uuid::Uuid;

use crate::Result;
use crate::api::service::Service;

/// The radio side of a peripheral: whatever BLE stack actually owns the
/// hardware. Callbacks flow back as [`PeripheralEvent`]s over the channel
/// handed to the implementation when it is built.
///
/// [`PeripheralEvent`]: crate::api::peripheral_event::PeripheralEvent
#[async_trait]
pub trait PeripheralManager: Send + Sync {
    /// Resolves once the stack has reported the service as added, or failed.
    async fn add_service(&self, service: &Service) -> Result<()>;

    /// Resolves once the stack has reported advertising as started, or failed.
    async fn start_advertising(&self, name: &str, uuids: &[Uuid]) -> Result<()>;

    async fn stop_advertising(&self) -> Result<()>;

    /// Push one value to the subscribed clients of a characteristic.
    async fn update_characteristic(
        &self,
        characteristic: Uuid,
        value: Vec<u8>,
        subscribers: &[String],
    ) -> Result<()>;
}
