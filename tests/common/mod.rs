#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rustyperipheral::api::peripheral::PeripheralManager;
use rustyperipheral::api::peripheral_event::{PeripheralRequest, ManagerState};
use rustyperipheral::api::service::Service;
use rustyperipheral::catalog::Catalog;
use rustyperipheral::config::PeripheralConfig;
use rustyperipheral::data_source::SyntheticSource;
use rustyperipheral::peripheral::Peripheral;
use rustyperipheral::{Error, ErrorType, Result};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::time::Instant;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    AddService(Uuid),
    StartAdvertising { name: String, uuids: Vec<Uuid> },
    StopAdvertising,
}

#[derive(Debug, Clone)]
pub struct Notification {
    pub at: Instant,
    pub characteristic: Uuid,
    pub value: Vec<u8>,
    pub subscribers: Vec<String>,
}

/// Transport double that records every call and can be told to fail.
#[derive(Clone)]
pub struct RecordingTransport {
    calls: Arc<Mutex<Vec<Call>>>,
    failing_services: Arc<HashSet<Uuid>>,
    fail_advertising: bool,
    notifications: UnboundedSender<Notification>,
}

impl RecordingTransport {
    pub fn new() -> (Self, UnboundedReceiver<Notification>) {
        let (notifications, receiver) = mpsc::unbounded_channel();
        let transport = Self {
            calls: Arc::new(Mutex::new(Vec::new())),
            failing_services: Arc::new(HashSet::new()),
            fail_advertising: false,
            notifications,
        };
        (transport, receiver)
    }

    pub fn failing_services(mut self, services: &[Uuid]) -> Self {
        self.failing_services = Arc::new(services.iter().copied().collect());
        self
    }

    pub fn failing_advertising(mut self) -> Self {
        self.fail_advertising = true;
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl PeripheralManager for RecordingTransport {
    async fn add_service(&self, service: &Service) -> Result<()> {
        self.record(Call::AddService(service.uuid));
        if self.failing_services.contains(&service.uuid) {
            return Err(Error::from_string(
                "attribute table full".to_string(),
                ErrorType::CoreBluetooth,
            ));
        }
        Ok(())
    }

    async fn start_advertising(&self, name: &str, uuids: &[Uuid]) -> Result<()> {
        self.record(Call::StartAdvertising {
            name: name.to_string(),
            uuids: uuids.to_vec(),
        });
        if self.fail_advertising {
            return Err(Error::from_string(
                "advertising not allowed".to_string(),
                ErrorType::CoreBluetooth,
            ));
        }
        Ok(())
    }

    async fn stop_advertising(&self) -> Result<()> {
        self.record(Call::StopAdvertising);
        Ok(())
    }

    async fn update_characteristic(
        &self,
        characteristic: Uuid,
        value: Vec<u8>,
        subscribers: &[String],
    ) -> Result<()> {
        let _ = self.notifications.send(Notification {
            at: Instant::now(),
            characteristic,
            value,
            subscribers: subscribers.to_vec(),
        });
        Ok(())
    }
}

pub fn peripheral(
    transport: RecordingTransport,
    catalog: Catalog,
) -> Peripheral<RecordingTransport, SyntheticSource> {
    Peripheral::new(
        transport,
        SyntheticSource::standard().with_seed(11),
        catalog,
        PeripheralConfig::default(),
    )
}

pub async fn powered_on(
    transport: RecordingTransport,
) -> Peripheral<RecordingTransport, SyntheticSource> {
    let peripheral = peripheral(transport, Catalog::standard());
    peripheral
        .on_hardware_state_changed(ManagerState::PoweredOn)
        .await
        .unwrap();
    peripheral
}

pub fn request(client: &str, service: Uuid, characteristic: Uuid) -> PeripheralRequest {
    PeripheralRequest {
        client: client.to_string(),
        service,
        characteristic,
    }
}

pub fn text(value: &[u8]) -> String {
    String::from_utf8(value.to_vec()).unwrap()
}
