use std::collections::{BTreeSet, HashMap};

use uuid::Uuid;

use crate::peripheral::scheduler::NotificationScheduler;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PeripheralState {
    Uninitialized,
    PoweredOff,
    PoweredOn,
    Advertising,
}

/// Subscribers per characteristic. A characteristic with no subscribers has
/// no entry at all.
#[derive(Debug, Default)]
pub struct SubscriptionTable(HashMap<Uuid, BTreeSet<String>>);

impl SubscriptionTable {
    pub fn new() -> Self {
        Self(HashMap::new())
    }

    /// Returns false if the client was already subscribed.
    pub fn subscribe(&mut self, characteristic: Uuid, client: String) -> bool {
        self.0.entry(characteristic).or_default().insert(client)
    }

    /// Returns false if the client was not subscribed.
    pub fn unsubscribe(&mut self, characteristic: &Uuid, client: &str) -> bool {
        let Some(clients) = self.0.get_mut(characteristic) else {
            return false;
        };
        let removed = clients.remove(client);
        if clients.is_empty() {
            self.0.remove(characteristic);
        }
        removed
    }

    pub fn has_subscribers(&self, characteristic: &Uuid) -> bool {
        self.0.contains_key(characteristic)
    }

    pub fn subscribers(&self, characteristic: &Uuid) -> Vec<String> {
        self.0
            .get(characteristic)
            .map(|clients| clients.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }
}

// Everything the run loop and the notification ticks share; guarded by a
// single lock.
#[derive(Debug)]
pub(crate) struct Shared {
    pub state: PeripheralState,
    pub registered: Option<Vec<Uuid>>,
    pub subscriptions: SubscriptionTable,
    pub scheduler: NotificationScheduler,
}

impl Shared {
    pub fn new(scheduler: NotificationScheduler) -> Self {
        Self {
            state: PeripheralState::Uninitialized,
            registered: None,
            subscriptions: SubscriptionTable::new(),
            scheduler,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEART: Uuid = Uuid::from_u128(1);

    #[test]
    fn empty_sets_are_removed() {
        let mut table = SubscriptionTable::new();
        assert!(table.subscribe(HEART, "a".to_string()));
        assert!(table.subscribe(HEART, "b".to_string()));
        assert!(!table.subscribe(HEART, "a".to_string()));
        assert_eq!(table.subscribers(&HEART), vec!["a".to_string(), "b".to_string()]);

        assert!(table.unsubscribe(&HEART, "a"));
        assert!(table.has_subscribers(&HEART));
        assert!(table.unsubscribe(&HEART, "b"));
        assert!(!table.has_subscribers(&HEART));
        assert!(table.subscribers(&HEART).is_empty());
    }

    #[test]
    fn unsubscribe_unknown_is_noop() {
        let mut table = SubscriptionTable::new();
        assert!(!table.unsubscribe(&HEART, "nobody"));
        table.subscribe(HEART, "a".to_string());
        assert!(!table.unsubscribe(&HEART, "nobody"));
        assert!(table.has_subscribers(&HEART));
    }
}
