use super::mac_extensions_cb::{UuidExtension, nsuuid_to_string};
use crate::{
    Error, ErrorType,
    api::peripheral_event::{
        ManagerState, PendingRead, PeripheralEvent, PeripheralRequest, RequestResponse,
    },
    corebluetooth::objc_bindings::{AdvertisementResolver, ServiceResolver},
};
use ::futures::executor;
use objc2::{AnyThread, DefinedClass, define_class, msg_send, rc::Retained};
use objc2_core_bluetooth::{
    CBATTError, CBATTRequest, CBCentral, CBCharacteristic, CBManagerState, CBPeripheralManager,
    CBPeripheralManagerDelegate, CBService,
};
use objc2_foundation::{NSData, NSError, NSObject, NSObjectProtocol};
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc::Sender, oneshot};
use tokio::time::{Duration, timeout};
use uuid::Uuid;

const RESULT_TIMEOUT: Duration = Duration::from_secs(5);

// Instance Variables that are stored within the ObjC class allowing communication between Rust
// code and the ObjC class.
#[derive(Debug)]
pub struct IVars {
    pub sender: Sender<PeripheralEvent>,
    pub services_resolver: Arc<Mutex<ServiceResolver>>,
    pub advertisement_resolver: Arc<Mutex<AdvertisementResolver>>,
}

define_class! {
    #[derive(Debug)]
    #[unsafe(super(NSObject))]
    #[thread_kind = AnyThread]
    #[name = "RustyPeripheralManagerDelegate"]
    #[ivars = IVars]
    pub struct PeripheralManagerDelegate;

    unsafe impl NSObjectProtocol for PeripheralManagerDelegate {}

    unsafe impl CBPeripheralManagerDelegate for PeripheralManagerDelegate {
        #[unsafe(method(peripheralManagerDidUpdateState:))]
        fn delegate_peripheralmanagerdidupdatestate(&self, peripheral: &CBPeripheralManager) {
            let state = convert_state(unsafe { peripheral.state() });
            log::debug!("PeripheralManager state {state:?}");
            self.send_event(PeripheralEvent::StateUpdate { state });
        }

        #[unsafe(method(peripheralManagerDidStartAdvertising:error:))]
        fn delegate_peripheralmanagerdidstartadvertising_error(
            &self,
            _: &CBPeripheralManager,
            error: Option<&NSError>,
        ) {
            let error_desc = error.map(|e| e.localizedDescription().to_string());
            log::debug!("Advertising, Error: {error_desc:?}");
            let sender = match self.ivars().advertisement_resolver.lock() {
                Ok(mut resolver) => resolver.take(),
                Err(_) => None,
            };
            if let Some(sender) = sender {
                let _ = sender.send(error_desc);
            }
        }

        #[unsafe(method(peripheralManager:didAddService:error:))]
        fn delegate_peripheralmanager_didaddservice_error(
            &self,
            _: &CBPeripheralManager,
            service: &CBService,
            error: Option<&NSError>,
        ) {
            let error_desc = error.map(|e| e.localizedDescription().to_string());
            log::debug!("AddService, Error: {error_desc:?}");
            let Some(service_uuid) = service.get_uuid() else {
                return;
            };
            let sender = match self.ivars().services_resolver.lock() {
                Ok(mut resolver) => resolver.take(&service_uuid),
                Err(_) => None,
            };
            if let Some(sender) = sender {
                let _ = sender.send(error_desc);
            }
        }

        #[unsafe(method(peripheralManager:central:didSubscribeToCharacteristic:))]
        fn delegate_peripheralmanager_central_didsubscribetocharacteristic(
            &self,
            _: &CBPeripheralManager,
            central: &CBCentral,
            characteristic: &CBCharacteristic,
        ) {
            if let Some(request) = peripheral_request(central, characteristic) {
                self.send_event(PeripheralEvent::CharacteristicSubscriptionUpdate {
                    request,
                    subscribed: true,
                });
            }
        }

        #[unsafe(method(peripheralManager:central:didUnsubscribeFromCharacteristic:))]
        fn delegate_peripheralmanager_central_didunsubscribefromcharacteristic(
            &self,
            _: &CBPeripheralManager,
            central: &CBCentral,
            characteristic: &CBCharacteristic,
        ) {
            if let Some(request) = peripheral_request(central, characteristic) {
                self.send_event(PeripheralEvent::CharacteristicSubscriptionUpdate {
                    request,
                    subscribed: false,
                });
            }
        }

        #[unsafe(method(peripheralManager:didReceiveReadRequest:))]
        fn delegate_peripheralmanager_didreceivereadrequest(
            &self,
            manager: &CBPeripheralManager,
            request: &CBATTRequest,
        ) {
            let (central, characteristic) =
                unsafe { (request.central(), request.characteristic()) };
            match peripheral_request(&central, &characteristic) {
                Some(peripheral_request) => {
                    self.send_read_request(peripheral_request, manager, request)
                }
                None => unsafe {
                    manager.respondToRequest_withResult(request, CBATTError::InvalidHandle);
                },
            }
        }
    }
}

impl PeripheralManagerDelegate {
    pub fn new(sender: Sender<PeripheralEvent>) -> Retained<PeripheralManagerDelegate> {
        let this = PeripheralManagerDelegate::alloc().set_ivars(IVars {
            sender,
            services_resolver: Arc::new(Mutex::new(ServiceResolver::new())),
            advertisement_resolver: Arc::new(Mutex::new(AdvertisementResolver::new())),
        });
        unsafe { msg_send![super(this), init] }
    }

    pub fn is_waiting_for_advertisement_result(&self) -> bool {
        if let Ok(resolver) = self.ivars().advertisement_resolver.lock() {
            return resolver.is_waiting();
        }
        false
    }

    /// Registers interest in the next advertising result. Must be called
    /// before advertising is requested so the callback cannot be missed.
    pub fn expect_advertisement_result(&self) -> oneshot::Receiver<Option<String>> {
        let (sender, receiver) = oneshot::channel::<Option<String>>();
        if let Ok(mut resolver) = self.ivars().advertisement_resolver.lock() {
            resolver.register(sender);
        }
        receiver
    }

    /// Wait for delegate to ensure advertisement started successfully
    pub async fn ensure_advertisement_started(
        &self,
        receiver: oneshot::Receiver<Option<String>>,
    ) -> Result<(), Error> {
        let event = timeout(RESULT_TIMEOUT, receiver).await;
        if let Ok(mut resolver) = self.ivars().advertisement_resolver.lock() {
            resolver.cancel();
        }
        resolve_event(event)
    }

    pub fn is_waiting_for_service_result(&self, service: Uuid) -> bool {
        if let Ok(resolver) = self.ivars().services_resolver.lock() {
            return resolver.is_waiting_for(&service);
        }
        false
    }

    pub fn expect_service_result(&self, service: Uuid) -> oneshot::Receiver<Option<String>> {
        let (sender, receiver) = oneshot::channel::<Option<String>>();
        if let Ok(mut resolver) = self.ivars().services_resolver.lock() {
            resolver.register(service, sender);
        }
        receiver
    }

    // Wait for event from delegate if service added successfully
    pub async fn ensure_service_added(
        &self,
        service: Uuid,
        receiver: oneshot::Receiver<Option<String>>,
    ) -> Result<(), Error> {
        let event = timeout(RESULT_TIMEOUT, receiver).await;
        if let Ok(mut resolver) = self.ivars().services_resolver.lock() {
            resolver.cancel(&service);
        }
        resolve_event(event)
    }
}

/// Event handler
impl PeripheralManagerDelegate {
    fn send_event(&self, event: PeripheralEvent) {
        let sender = self.ivars().sender.clone();
        executor::block_on(async {
            if let Err(e) = sender.send(event).await {
                log::error!("Error sending delegate event: {}", e);
            }
        });
    }

    // Blocks the CoreBluetooth queue until the peripheral answers. If the
    // event cannot be delivered, the dropped PendingRead answers for it.
    fn send_read_request(
        &self,
        peripheral_request: PeripheralRequest,
        manager: &CBPeripheralManager,
        request: &CBATTRequest,
    ) {
        let sender = self.ivars().sender.clone();
        let offset = unsafe { request.offset() } as u64;
        let (pending, resp_rx) = PendingRead::new(peripheral_request, offset);

        executor::block_on(async {
            if let Err(e) = sender.send(PeripheralEvent::ReadRequest { pending }).await {
                log::error!("Error sending delegate event: {}", e);
            }

            let mut cb_att_error = CBATTError::UnlikelyError;
            if let Ok(result) = resp_rx.await {
                cb_att_error = result.response.to_cb_error();
                if result.response == RequestResponse::Success {
                    unsafe { request.setValue(Some(&NSData::with_bytes(&result.value))) };
                }
            }
            unsafe { manager.respondToRequest_withResult(request, cb_att_error) };
        });
    }
}

fn peripheral_request(
    central: &CBCentral,
    characteristic: &CBCharacteristic,
) -> Option<PeripheralRequest> {
    let service = unsafe { characteristic.service() }?;
    Some(PeripheralRequest {
        client: nsuuid_to_string(&unsafe { central.identifier() }),
        service: (&*service).get_uuid()?,
        characteristic: characteristic.get_uuid()?,
    })
}

fn resolve_event(
    event: Result<Result<Option<String>, oneshot::error::RecvError>, tokio::time::error::Elapsed>,
) -> Result<(), Error> {
    let event = match event {
        Ok(Ok(event)) => event,
        Ok(Err(e)) => {
            return Err(Error::from_string(
                format!("Channel error while waiting: {}", e),
                ErrorType::CoreBluetooth,
            ));
        }
        Err(_) => {
            return Err(Error::from_string(
                "Timeout waiting for event".to_string(),
                ErrorType::CoreBluetooth,
            ));
        }
    };

    if let Some(error) = event {
        return Err(Error::from_string(error, ErrorType::CoreBluetooth));
    }

    Ok(())
}

fn convert_state(cb_state: CBManagerState) -> ManagerState {
    match cb_state {
        CBManagerState::Unknown => ManagerState::Unknown,
        CBManagerState::Resetting => ManagerState::Resetting,
        CBManagerState::Unsupported => ManagerState::Unsupported,
        CBManagerState::Unauthorized => ManagerState::Unauthorized,
        CBManagerState::PoweredOff => ManagerState::PoweredOff,
        CBManagerState::PoweredOn => ManagerState::PoweredOn,
        _ => {
            log::warn!("Unexpected CBManagerState value, treating as Unknown");
            ManagerState::Unknown
        }
    }
}

impl RequestResponse {
    fn to_cb_error(self) -> CBATTError {
        match self {
            RequestResponse::Success => CBATTError::Success,
            RequestResponse::InvalidHandle => CBATTError::InvalidHandle,
            RequestResponse::RequestNotSupported => CBATTError::RequestNotSupported,
            RequestResponse::InvalidOffset => CBATTError::InvalidOffset,
            RequestResponse::UnlikelyError => CBATTError::UnlikelyError,
        }
    }
}
