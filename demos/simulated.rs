use std::time::Duration;

use async_trait::async_trait;
use log::LevelFilter;
use rustyperipheral::Result;
use rustyperipheral::api::peripheral::PeripheralManager;
use rustyperipheral::api::peripheral_event::{
    ManagerState, PendingRead, PeripheralEvent, PeripheralRequest,
};
use rustyperipheral::api::service::Service;
use rustyperipheral::catalog::{
    Catalog, HEART_MONITOR_SERVICE, HEART_RATE_CHARACTERISTIC, STEPS_COUNT_CHARACTERISTIC,
    STEPS_MONITOR_SERVICE,
};
use rustyperipheral::config::PeripheralConfig;
use rustyperipheral::data_source::SyntheticSource;
use rustyperipheral::peripheral::Peripheral;
use tokio::sync::mpsc::{self, Sender};
use uuid::Uuid;

/// Stands in for the radio: everything the peripheral asks of it is logged.
struct LoggingTransport;

#[async_trait]
impl PeripheralManager for LoggingTransport {
    async fn add_service(&self, service: &Service) -> Result<()> {
        log::info!(
            "[radio] add service {} with {} characteristic(s)",
            service.uuid,
            service.characteristics.len()
        );
        Ok(())
    }

    async fn start_advertising(&self, name: &str, uuids: &[Uuid]) -> Result<()> {
        log::info!("[radio] advertising {name:?} with {uuids:?}");
        Ok(())
    }

    async fn stop_advertising(&self) -> Result<()> {
        log::info!("[radio] advertising stopped");
        Ok(())
    }

    async fn update_characteristic(
        &self,
        characteristic: Uuid,
        value: Vec<u8>,
        subscribers: &[String],
    ) -> Result<()> {
        log::info!(
            "[radio] notify {characteristic} = {} to {subscribers:?}",
            String::from_utf8_lossy(&value)
        );
        Ok(())
    }
}

#[tokio::main]
async fn main() {
    pretty_env_logger::formatted_builder()
        .filter_level(LevelFilter::Info)
        .parse_default_env()
        .init();

    let config = PeripheralConfig::default().with_notify_interval(Duration::from_secs(1));
    let (sender_tx, receiver_rx) = mpsc::channel::<PeripheralEvent>(config.event_buffer);
    let peripheral = Peripheral::new(
        LoggingTransport,
        SyntheticSource::standard(),
        Catalog::standard(),
        config,
    );

    tokio::spawn(simulate_central(sender_tx));
    if let Err(error) = peripheral.run(receiver_rx).await {
        log::error!("{error}");
    }
}

// Plays the part of the BLE stack and one connected central.
async fn simulate_central(events: Sender<PeripheralEvent>) {
    let heart_rate = PeripheralRequest {
        client: "simulated-central".to_string(),
        service: HEART_MONITOR_SERVICE,
        characteristic: HEART_RATE_CHARACTERISTIC,
    };

    let _ = events
        .send(PeripheralEvent::StateUpdate {
            state: ManagerState::PoweredOn,
        })
        .await;

    let (pending, response) = PendingRead::new(
        PeripheralRequest {
            client: "simulated-central".to_string(),
            service: STEPS_MONITOR_SERVICE,
            characteristic: STEPS_COUNT_CHARACTERISTIC,
        },
        0,
    );
    let _ = events.send(PeripheralEvent::ReadRequest { pending }).await;
    if let Ok(response) = response.await {
        log::info!(
            "[central] steps read {:?}: {}",
            response.response,
            String::from_utf8_lossy(&response.value)
        );
    }

    let _ = events
        .send(PeripheralEvent::CharacteristicSubscriptionUpdate {
            request: heart_rate.clone(),
            subscribed: true,
        })
        .await;
    tokio::time::sleep(Duration::from_millis(3_500)).await;
    let _ = events
        .send(PeripheralEvent::CharacteristicSubscriptionUpdate {
            request: heart_rate,
            subscribed: false,
        })
        .await;
    tokio::time::sleep(Duration::from_secs(2)).await;

    // Dropping the sender ends the peripheral's event loop.
    drop(events);
}
