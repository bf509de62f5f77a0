use super::characteristic_utils_cb::parse_characteristic;
use super::mac_extensions_cb::uuid_to_cbuuid;
use super::mac_utils_cb;
use super::peripheral_manager_delegate_cb::PeripheralManagerDelegate;
use crate::api::peripheral_event::PeripheralEvent;
use crate::api::service::Service;
use crate::corebluetooth::peripheral_manager::PeripheralManagerCommand;
use crate::{Error, ErrorType};
use objc2::{AnyThread, msg_send};
use objc2::{rc::Retained, runtime::AnyObject};
use objc2_core_bluetooth::{
    CBAdvertisementDataLocalNameKey, CBAdvertisementDataServiceUUIDsKey, CBCharacteristic,
    CBManager, CBManagerAuthorization, CBMutableCharacteristic, CBMutableService,
    CBPeripheralManager,
};
use objc2_foundation::{NSArray, NSData, NSDictionary, NSString};
use std::collections::HashMap;
use std::thread;
use tokio::runtime;
use tokio::sync::mpsc::{Receiver, Sender};
use uuid::Uuid;

// CoreBluetooth objects are not Send, so the manager lives on its own thread and is driven
// through commands.
pub fn run_peripheral_thread(
    sender: Sender<PeripheralEvent>,
    listener: Receiver<PeripheralManagerCommand>,
) -> Result<(), Error> {
    thread::Builder::new()
        .name("corebluetooth-peripheral".to_string())
        .spawn(move || {
            let runtime = match runtime::Builder::new_current_thread().enable_time().build() {
                Ok(runtime) => runtime,
                Err(e) => {
                    log::error!("Failed to create runtime: {e}");
                    return;
                }
            };
            runtime.block_on(async move {
                let mut peripheral_manager = PeripheralManager::new(sender, listener);
                while peripheral_manager.handle_event().await {}
                log::debug!("CoreBluetooth peripheral thread finished");
            })
        })
        .map(|_| ())
        .map_err(|e| {
            Error::from_string(
                format!("Failed to spawn CoreBluetooth thread: {e}"),
                ErrorType::CoreBluetooth,
            )
        })
}

#[derive(Debug)]
struct PeripheralManager {
    manager_command_rx: Receiver<PeripheralManagerCommand>,
    cb_peripheral_manager: Retained<CBPeripheralManager>,
    peripheral_delegate: Retained<PeripheralManagerDelegate>,
    cached_characteristics: HashMap<Uuid, Retained<CBMutableCharacteristic>>,
}

impl PeripheralManager {
    fn new(
        peripheral_tx: Sender<PeripheralEvent>,
        manager_rx: Receiver<PeripheralManagerCommand>,
    ) -> Self {
        let delegate: Retained<PeripheralManagerDelegate> =
            PeripheralManagerDelegate::new(peripheral_tx);
        let label = c"RustyPeripheralQueue";
        let queue: *mut std::ffi::c_void = unsafe {
            mac_utils_cb::dispatch_queue_create(label.as_ptr(), mac_utils_cb::DISPATCH_QUEUE_SERIAL)
        };
        let queue: *mut AnyObject = queue.cast();
        let peripheral_manager: Retained<CBPeripheralManager> = unsafe {
            msg_send![CBPeripheralManager::alloc(), initWithDelegate: &*delegate, queue: queue]
        };

        Self {
            manager_command_rx: manager_rx,
            cb_peripheral_manager: peripheral_manager,
            peripheral_delegate: delegate,
            cached_characteristics: HashMap::new(),
        }
    }

    // Returns false once every command sender is gone.
    async fn handle_event(&mut self) -> bool {
        let Some(event) = self.manager_command_rx.recv().await else {
            return false;
        };
        match event {
            PeripheralManagerCommand::StartAdvertising {
                name,
                uuids,
                responder,
            } => {
                let _ = responder.send(self.start_advertising(&name, &uuids).await);
            }
            PeripheralManagerCommand::StopAdvertising { responder } => {
                self.stop_advertising();
                let _ = responder.send(Ok(()));
            }
            PeripheralManagerCommand::AddService { service, responder } => {
                let _ = responder.send(self.add_service(&service).await);
            }
            PeripheralManagerCommand::UpdateCharacteristic {
                characteristic,
                value,
                responder,
            } => {
                let _ = responder.send(self.update_characteristic(characteristic, value));
            }
        }
        true
    }

    async fn start_advertising(&self, name: &str, uuids: &[Uuid]) -> Result<(), Error> {
        if self
            .peripheral_delegate
            .is_waiting_for_advertisement_result()
        {
            return Err(Error::from_string(
                "Already in progress".to_string(),
                ErrorType::Advertising,
            ));
        }

        let mut keys: Vec<&NSString> = vec![];
        let mut objects: Vec<Retained<AnyObject>> = vec![];

        unsafe {
            keys.push(CBAdvertisementDataLocalNameKey);
            objects.push(Retained::cast_unchecked(NSString::from_str(name)));

            keys.push(CBAdvertisementDataServiceUUIDsKey);
            let cb_uuids: Vec<_> = uuids.iter().map(|u| uuid_to_cbuuid(*u)).collect();
            objects.push(Retained::cast_unchecked(NSArray::from_retained_slice(&cb_uuids)));
        }

        let advertising_data: Retained<NSDictionary<NSString, AnyObject>> =
            NSDictionary::from_retained_objects(&keys, &objects);

        let receiver = self.peripheral_delegate.expect_advertisement_result();
        unsafe {
            self.cb_peripheral_manager
                .startAdvertising(Some(&advertising_data));
        }

        self.peripheral_delegate
            .ensure_advertisement_started(receiver)
            .await
    }

    fn stop_advertising(&self) {
        unsafe {
            self.cb_peripheral_manager.stopAdvertising();
        }
    }

    // Subscribers are passed as nil: CoreBluetooth fans the value out to every subscribed
    // central itself.
    fn update_characteristic(&mut self, characteristic: Uuid, value: Vec<u8>) -> Result<(), Error> {
        let Some(cb_characteristic) = self.cached_characteristics.get(&characteristic) else {
            return Err(Error::from_string(
                format!("Characteristic {characteristic} was never registered"),
                ErrorType::UnknownCharacteristic,
            ));
        };
        let sent = unsafe {
            self.cb_peripheral_manager
                .updateValue_forCharacteristic_onSubscribedCentrals(
                    &NSData::from_vec(value),
                    cb_characteristic,
                    None,
                )
        };
        if !sent {
            return Err(Error::from_string(
                "Transmit queue is full".to_string(),
                ErrorType::Notification,
            ));
        }
        Ok(())
    }

    async fn add_service(&mut self, service: &Service) -> Result<(), Error> {
        if self
            .peripheral_delegate
            .is_waiting_for_service_result(service.uuid)
        {
            return Err(Error::from_string(
                "Already in progress".to_string(),
                ErrorType::Registration,
            ));
        }

        let mut characteristics: Vec<Retained<CBCharacteristic>> = Vec::new();
        for characteristic in service.characteristics.iter() {
            let cb_characteristic = parse_characteristic(characteristic);
            characteristics.push(Retained::into_super(cb_characteristic.clone()));
            self.cached_characteristics
                .insert(characteristic.uuid, cb_characteristic);
        }

        let mutable_service: Retained<CBMutableService> = unsafe {
            CBMutableService::initWithType_primary(
                CBMutableService::alloc(),
                &uuid_to_cbuuid(service.uuid),
                service.primary,
            )
        };
        unsafe {
            let chars = NSArray::from_retained_slice(&characteristics);
            mutable_service.setCharacteristics(Some(&chars));
        }

        let receiver = self.peripheral_delegate.expect_service_result(service.uuid);
        unsafe {
            self.cb_peripheral_manager.addService(&mutable_service);
        }

        self.peripheral_delegate
            .ensure_service_added(service.uuid, receiver)
            .await
    }
}

pub fn is_authorized() -> bool {
    let authorization = unsafe { CBManager::authorization_class() };
    authorization != CBManagerAuthorization::Restricted
        && authorization != CBManagerAuthorization::Denied
}
