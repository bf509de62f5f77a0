use std::time::Duration;

use crate::peripheral::scheduler::MIN_INTERVAL;

pub const DEFAULT_LOCAL_NAME: &str = "RJT Peripheral";
pub const DEFAULT_NOTIFY_INTERVAL: Duration = Duration::from_secs(5);
pub const DEFAULT_EVENT_BUFFER: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeripheralConfig {
    /// Name carried in the advertising payload.
    pub local_name: String,
    /// Period between notifications on a subscribed characteristic.
    pub notify_interval: Duration,
    /// Capacity of the transport event channel.
    pub event_buffer: usize,
}

impl PeripheralConfig {
    pub fn with_local_name(mut self, local_name: impl Into<String>) -> Self {
        self.local_name = local_name.into();
        self
    }

    /// Intervals below one millisecond are raised to it.
    pub fn with_notify_interval(mut self, notify_interval: Duration) -> Self {
        self.notify_interval = notify_interval.max(MIN_INTERVAL);
        self
    }

    pub fn with_event_buffer(mut self, event_buffer: usize) -> Self {
        self.event_buffer = event_buffer.max(1);
        self
    }
}

impl Default for PeripheralConfig {
    fn default() -> Self {
        Self {
            local_name: DEFAULT_LOCAL_NAME.to_string(),
            notify_interval: DEFAULT_NOTIFY_INTERVAL,
            event_buffer: DEFAULT_EVENT_BUFFER,
        }
    }
}
