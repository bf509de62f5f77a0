//! The peripheral's GATT state machine.
//!
//! A [`Peripheral`] reacts to [`PeripheralEvent`]s coming from the transport:
//! once the hardware reports it is powered on, every catalog service is
//! registered in order and the ones that made it are advertised. Reads are
//! answered from the [`DataSource`], and a subscribed characteristic gets a
//! notification timer for as long as it has subscribers.

use std::sync::{Arc, Weak};

use tokio::sync::Mutex;
use tokio::sync::mpsc::Receiver;
use uuid::Uuid;

use crate::api::peripheral::PeripheralManager;
use crate::api::peripheral_event::{
    ManagerState, PendingRead, PeripheralEvent, PeripheralRequest, ReadRequestResponse,
    RequestResponse,
};
use crate::catalog::Catalog;
use crate::config::PeripheralConfig;
use crate::data_source::DataSource;
use crate::{Error, ErrorType, Result};

pub mod scheduler;
pub mod state;

use scheduler::NotificationScheduler;
pub use state::{PeripheralState, SubscriptionTable};
use state::Shared;

pub struct Peripheral<M, S> {
    inner: Arc<Inner<M, S>>,
}

struct Inner<M, S> {
    manager: M,
    source: S,
    catalog: Catalog,
    config: PeripheralConfig,
    shared: Mutex<Shared>,
}

impl<M, S> Peripheral<M, S>
where
    M: PeripheralManager + 'static,
    S: DataSource + 'static,
{
    pub fn new(manager: M, source: S, catalog: Catalog, config: PeripheralConfig) -> Self {
        let scheduler = NotificationScheduler::new(config.notify_interval);
        Self {
            inner: Arc::new(Inner {
                manager,
                source,
                catalog,
                config,
                shared: Mutex::new(Shared::new(scheduler)),
            }),
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.inner.catalog
    }

    pub fn config(&self) -> &PeripheralConfig {
        &self.inner.config
    }

    pub async fn state(&self) -> PeripheralState {
        self.inner.shared.lock().await.state
    }

    /// Services that registered successfully, once registration has run.
    pub async fn advertised_services(&self) -> Option<Vec<Uuid>> {
        self.inner.shared.lock().await.registered.clone()
    }

    pub async fn subscribers(&self, characteristic: &Uuid) -> Vec<String> {
        self.inner
            .shared
            .lock()
            .await
            .subscriptions
            .subscribers(characteristic)
    }

    pub async fn is_notifying(&self, characteristic: &Uuid) -> bool {
        self.inner
            .shared
            .lock()
            .await
            .scheduler
            .is_running(characteristic)
    }

    /// Processes events until the transport closes the channel or a fatal
    /// error occurs. Notification timers are stopped either way.
    pub async fn run(&self, mut events: Receiver<PeripheralEvent>) -> Result<()> {
        let mut result = Ok(());
        while let Some(event) = events.recv().await {
            if let Err(error) = self.handle_event(event).await {
                if error.is_fatal() {
                    result = Err(error);
                    break;
                }
                log::error!("{error}");
            }
        }
        self.stop_notifications().await;
        log::info!("Peripheral event loop finished");
        result
    }

    pub async fn handle_event(&self, event: PeripheralEvent) -> Result<()> {
        log::trace!("handle_event {event:?}");
        match event {
            PeripheralEvent::StateUpdate { state } => self.on_hardware_state_changed(state).await,
            PeripheralEvent::CharacteristicSubscriptionUpdate {
                request,
                subscribed,
            } => {
                if subscribed {
                    self.on_subscribe(&request).await;
                } else {
                    self.on_unsubscribe(&request).await;
                }
                Ok(())
            }
            PeripheralEvent::ReadRequest { pending } => {
                self.on_read_request(pending);
                Ok(())
            }
        }
    }

    /// Registers the catalog and starts advertising the first time the
    /// hardware reports PoweredOn. Any other hardware state is fatal.
    pub async fn on_hardware_state_changed(&self, state: ManagerState) -> Result<()> {
        if state != ManagerState::PoweredOn {
            let mut shared = self.inner.shared.lock().await;
            shared.state = PeripheralState::PoweredOff;
            shared.scheduler.stop_all();
            shared.subscriptions.clear();
            return Err(Error::from_string(
                format!("Bluetooth hardware is {state:?}, a powered on adapter is required"),
                ErrorType::Precondition,
            ));
        }

        {
            let mut shared = self.inner.shared.lock().await;
            if shared.registered.is_some() {
                log::debug!("Already registered, ignoring repeated PoweredOn");
                return Ok(());
            }
            shared.state = PeripheralState::PoweredOn;
            shared.registered = Some(Vec::new());
        }
        log::info!("Bluetooth powered on");

        let mut registered = Vec::new();
        for service in self.inner.catalog.describe() {
            let result = self.inner.manager.add_service(service).await;
            self.on_service_added(service.uuid, &result);
            if result.is_ok() {
                registered.push(service.uuid);
            }
        }

        self.inner.shared.lock().await.registered = Some(registered.clone());

        if registered.is_empty() {
            log::error!("No service registered, not advertising");
            return Ok(());
        }

        let result = self
            .inner
            .manager
            .start_advertising(&self.inner.config.local_name, &registered)
            .await
            .map_err(|e| Error::from_string(e.to_string(), ErrorType::Advertising));
        self.on_advertising_started(&result);
        if result.is_ok() {
            let mut shared = self.inner.shared.lock().await;
            if shared.state == PeripheralState::PoweredOn {
                shared.state = PeripheralState::Advertising;
            }
        }
        Ok(())
    }

    pub fn on_service_added(&self, service: Uuid, result: &Result<()>) {
        match result {
            Ok(()) => log::info!("Service {service} registered"),
            Err(error) => log::error!("Service {service} failed to register, {error}"),
        }
    }

    pub fn on_advertising_started(&self, result: &Result<()>) {
        match result {
            Ok(()) => log::info!("Advertising as {:?}", self.inner.config.local_name),
            Err(error) => log::error!("{error}"),
        }
    }

    /// Answers a read exactly once: with a fresh sample when the
    /// characteristic is readable, with an explicit failure otherwise.
    pub fn on_read_request(&self, pending: PendingRead) {
        let characteristic = pending.characteristic();
        let response = match self.inner.catalog.characteristic(&characteristic) {
            None => {
                log::warn!("Read request for unknown characteristic {characteristic}");
                ReadRequestResponse::failure(RequestResponse::InvalidHandle)
            }
            Some(descriptor) if !descriptor.is_readable() => {
                log::warn!("Read request for {characteristic}, which is not readable");
                ReadRequestResponse::failure(RequestResponse::RequestNotSupported)
            }
            Some(_) => match self.inner.source.sample(&characteristic) {
                Ok(value) => match usize::try_from(pending.offset) {
                    Ok(offset) if offset <= value.len() => {
                        ReadRequestResponse::success(value[offset..].to_vec())
                    }
                    _ => ReadRequestResponse::failure(RequestResponse::InvalidOffset),
                },
                Err(error) => {
                    log::error!("Internal error sampling {characteristic}: {error}");
                    ReadRequestResponse::failure(RequestResponse::UnlikelyError)
                }
            },
        };
        log::debug!(
            "Read {characteristic} from {}: {:?}",
            pending.request.client,
            response.response
        );
        pending.respond(response);
    }

    pub async fn on_subscribe(&self, request: &PeripheralRequest) {
        let characteristic = request.characteristic;
        match self.inner.catalog.characteristic(&characteristic) {
            Some(descriptor) if descriptor.is_notifiable() => {}
            Some(_) => {
                log::warn!(
                    "{} subscribed to {characteristic}, which does not notify",
                    request.client
                );
                return;
            }
            None => {
                log::warn!(
                    "{} subscribed to unknown characteristic {characteristic}",
                    request.client
                );
                return;
            }
        }

        let mut shared = self.inner.shared.lock().await;
        if !matches!(
            shared.state,
            PeripheralState::PoweredOn | PeripheralState::Advertising
        ) {
            log::warn!(
                "{} subscribed to {characteristic} while {:?}, ignoring",
                request.client,
                shared.state
            );
            return;
        }
        if shared
            .subscriptions
            .subscribe(characteristic, request.client.clone())
        {
            log::info!("{} subscribed to {characteristic}", request.client);
        }
        if !shared.scheduler.is_running(&characteristic) {
            // Timers hold a Weak so dropping the Peripheral ends them.
            let inner: Weak<Inner<M, S>> = Arc::downgrade(&self.inner);
            shared.scheduler.start(characteristic, move |generation| {
                let inner = inner.upgrade();
                async move {
                    match inner {
                        Some(inner) => {
                            inner.notify(characteristic, generation).await;
                            true
                        }
                        None => false,
                    }
                }
            });
        }
    }

    pub async fn on_unsubscribe(&self, request: &PeripheralRequest) {
        let characteristic = request.characteristic;
        let mut shared = self.inner.shared.lock().await;
        if shared
            .subscriptions
            .unsubscribe(&characteristic, &request.client)
        {
            log::info!("{} unsubscribed from {characteristic}", request.client);
        }
        if !shared.subscriptions.has_subscribers(&characteristic) {
            shared.scheduler.stop(&characteristic);
        }
    }

    /// Stops all notifications and, if advertising, stops advertising.
    pub async fn shutdown(&self) {
        self.stop_notifications().await;
        let mut shared = self.inner.shared.lock().await;
        if shared.state == PeripheralState::Advertising {
            match self.inner.manager.stop_advertising().await {
                Ok(()) => shared.state = PeripheralState::PoweredOn,
                Err(error) => log::warn!("Failed to stop advertising, {error}"),
            }
        }
    }

    async fn stop_notifications(&self) {
        let mut shared = self.inner.shared.lock().await;
        shared.scheduler.stop_all();
        shared.subscriptions.clear();
    }
}

impl<M, S> Inner<M, S>
where
    M: PeripheralManager,
    S: DataSource,
{
    // One tick of a notification timer. The lock is held through the push so
    // an unsubscribe cannot interleave with it.
    async fn notify(&self, characteristic: Uuid, generation: u64) {
        let shared = self.shared.lock().await;
        if !shared.scheduler.is_current(&characteristic, generation) {
            return;
        }
        let subscribers = shared.subscriptions.subscribers(&characteristic);
        if subscribers.is_empty() {
            return;
        }

        let value = match self.source.sample(&characteristic) {
            Ok(value) => value,
            Err(error) => {
                log::error!("Internal error sampling {characteristic}: {error}");
                return;
            }
        };
        log::trace!("Notifying {} subscriber(s) of {characteristic}", subscribers.len());
        if let Err(error) = self
            .manager
            .update_characteristic(characteristic, value, &subscribers)
            .await
        {
            log::warn!(
                "{}",
                Error::from_string(
                    format!("{characteristic}: {error}"),
                    ErrorType::Notification
                )
            );
        }
    }
}
