use async_trait::async_trait;
use tokio::sync::mpsc::{self, Sender};
use tokio::sync::oneshot;
use uuid::Uuid;

use crate::{
    Error, ErrorType, Result,
    api::{peripheral::PeripheralManager, peripheral_event::PeripheralEvent, service::Service},
    corebluetooth::objc_bindings::peripheral_manager_cb,
};

const COMMAND_BUFFER: usize = 32;

#[derive(Debug)]
pub enum PeripheralManagerCommand {
    StartAdvertising {
        name: String,
        uuids: Vec<Uuid>,
        responder: oneshot::Sender<Result<()>>,
    },
    StopAdvertising {
        responder: oneshot::Sender<Result<()>>,
    },
    AddService {
        service: Service,
        responder: oneshot::Sender<Result<()>>,
    },
    UpdateCharacteristic {
        characteristic: Uuid,
        value: Vec<u8>,
        responder: oneshot::Sender<Result<()>>,
    },
}

/// [`PeripheralManager`] backed by a `CBPeripheralManager`.
///
/// Hardware state, subscriptions and read requests are delivered on the
/// sender passed to [`CoreBluetoothPeripheral::new`].
pub struct CoreBluetoothPeripheral {
    manager_tx: Sender<PeripheralManagerCommand>,
}

impl CoreBluetoothPeripheral {
    pub fn new(sender_tx: Sender<PeripheralEvent>) -> Result<Self> {
        if !peripheral_manager_cb::is_authorized() {
            return Err(Error::from_string(
                "Bluetooth access is denied or restricted for this process".to_string(),
                ErrorType::Precondition,
            ));
        }
        let (manager_tx, manager_rx) = mpsc::channel(COMMAND_BUFFER);
        peripheral_manager_cb::run_peripheral_thread(sender_tx, manager_rx)?;
        Ok(Self { manager_tx })
    }

    async fn send<T>(
        &self,
        command: PeripheralManagerCommand,
        response: oneshot::Receiver<Result<T>>,
    ) -> Result<T> {
        self.manager_tx.send(command).await.map_err(|_| closed())?;
        response.await.map_err(|_| closed())?
    }
}

#[async_trait]
impl PeripheralManager for CoreBluetoothPeripheral {
    async fn add_service(&self, service: &Service) -> Result<()> {
        let (responder, response) = oneshot::channel();
        let command = PeripheralManagerCommand::AddService {
            service: service.clone(),
            responder,
        };
        self.send(command, response).await
    }

    async fn start_advertising(&self, name: &str, uuids: &[Uuid]) -> Result<()> {
        let (responder, response) = oneshot::channel();
        let command = PeripheralManagerCommand::StartAdvertising {
            name: name.to_string(),
            uuids: uuids.to_vec(),
            responder,
        };
        self.send(command, response).await
    }

    async fn stop_advertising(&self) -> Result<()> {
        let (responder, response) = oneshot::channel();
        self.send(PeripheralManagerCommand::StopAdvertising { responder }, response)
            .await
    }

    async fn update_characteristic(
        &self,
        characteristic: Uuid,
        value: Vec<u8>,
        _subscribers: &[String],
    ) -> Result<()> {
        let (responder, response) = oneshot::channel();
        let command = PeripheralManagerCommand::UpdateCharacteristic {
            characteristic,
            value,
            responder,
        };
        self.send(command, response).await
    }
}

fn closed() -> Error {
    Error::from_string(
        "CoreBluetooth thread is gone".to_string(),
        ErrorType::Channel,
    )
}
