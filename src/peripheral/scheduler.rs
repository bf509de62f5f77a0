use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use uuid::Uuid;

/// Shortest period a timer accepts; anything below is raised to it.
pub const MIN_INTERVAL: Duration = Duration::from_millis(1);

#[derive(Debug)]
struct Ticker {
    generation: u64,
    handle: JoinHandle<()>,
}

/// One repeating timer per characteristic.
///
/// Every timer is tagged with a generation number that is passed to its tick
/// callback. A callback that checks [`is_current`](Self::is_current) under
/// the same lock used to call [`stop`](Self::stop) can never act after the
/// stop, even if the task was already woken.
#[derive(Debug)]
pub struct NotificationScheduler {
    interval: Duration,
    next_generation: u64,
    tickers: HashMap<Uuid, Ticker>,
}

impl NotificationScheduler {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval: interval.max(MIN_INTERVAL),
            next_generation: 0,
            tickers: HashMap::new(),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Spawns the timer for `characteristic`. The first tick fires right away,
    /// and the task ends on its own once a tick returns false.
    /// Returns false, and spawns nothing, if a timer is already running.
    pub fn start<F, Fut>(&mut self, characteristic: Uuid, mut tick: F) -> bool
    where
        F: FnMut(u64) -> Fut + Send + 'static,
        Fut: Future<Output = bool> + Send + 'static,
    {
        if self.tickers.contains_key(&characteristic) {
            return false;
        }

        let generation = self.next_generation;
        self.next_generation += 1;
        let period = self.interval;
        let handle = tokio::spawn(async move {
            let mut interval = time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                if !tick(generation).await {
                    break;
                }
            }
        });

        log::debug!("Notification timer {generation} started for {characteristic}");
        self.tickers.insert(
            characteristic,
            Ticker { generation, handle },
        );
        true
    }

    /// Returns false if no timer was running.
    pub fn stop(&mut self, characteristic: &Uuid) -> bool {
        match self.tickers.remove(characteristic) {
            Some(ticker) => {
                ticker.handle.abort();
                log::debug!(
                    "Notification timer {} stopped for {characteristic}",
                    ticker.generation
                );
                true
            }
            None => false,
        }
    }

    pub fn stop_all(&mut self) {
        for (_, ticker) in self.tickers.drain() {
            ticker.handle.abort();
        }
    }

    pub fn is_running(&self, characteristic: &Uuid) -> bool {
        self.tickers.contains_key(characteristic)
    }

    pub fn is_current(&self, characteristic: &Uuid, generation: u64) -> bool {
        self.tickers
            .get(characteristic)
            .is_some_and(|ticker| ticker.generation == generation)
    }

    pub fn running(&self) -> Vec<Uuid> {
        self.tickers.keys().copied().collect()
    }
}

impl Drop for NotificationScheduler {
    fn drop(&mut self) {
        self.stop_all();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    const HEART: Uuid = Uuid::from_u128(1);

    fn counting(
        counter: &Arc<AtomicUsize>,
    ) -> impl FnMut(u64) -> std::future::Ready<bool> + Send + 'static {
        let counter = Arc::clone(counter);
        move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            std::future::ready(true)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn first_tick_is_immediate_then_periodic() {
        let ticks = Arc::new(AtomicUsize::new(0));
        let mut scheduler = NotificationScheduler::new(Duration::from_secs(5));
        assert!(scheduler.start(HEART, counting(&ticks)));

        tokio::task::yield_now().await;
        assert_eq!(ticks.load(Ordering::SeqCst), 1);

        time::sleep(Duration::from_millis(4_900)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 1);

        time::sleep(Duration::from_millis(200)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn start_and_stop_are_idempotent() {
        let ticks = Arc::new(AtomicUsize::new(0));
        let mut scheduler = NotificationScheduler::new(Duration::from_secs(5));

        assert!(!scheduler.stop(&HEART));
        assert!(scheduler.start(HEART, counting(&ticks)));
        assert!(!scheduler.start(HEART, counting(&ticks)));
        assert_eq!(scheduler.running(), vec![HEART]);

        tokio::task::yield_now().await;
        assert_eq!(ticks.load(Ordering::SeqCst), 1);

        assert!(scheduler.stop(&HEART));
        assert!(!scheduler.stop(&HEART));
        assert!(!scheduler.is_running(&HEART));
    }

    #[tokio::test(start_paused = true)]
    async fn no_ticks_after_stop() {
        let ticks = Arc::new(AtomicUsize::new(0));
        let mut scheduler = NotificationScheduler::new(Duration::from_secs(5));
        scheduler.start(HEART, counting(&ticks));
        tokio::task::yield_now().await;

        scheduler.stop(&HEART);
        let seen = ticks.load(Ordering::SeqCst);
        time::sleep(Duration::from_secs(60)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), seen);
    }

    #[tokio::test(start_paused = true)]
    async fn restart_gets_new_generation() {
        let ticks = Arc::new(AtomicUsize::new(0));
        let mut scheduler = NotificationScheduler::new(Duration::from_secs(5));

        scheduler.start(HEART, counting(&ticks));
        assert!(scheduler.is_current(&HEART, 0));
        scheduler.stop(&HEART);
        assert!(!scheduler.is_current(&HEART, 0));

        scheduler.start(HEART, counting(&ticks));
        assert!(!scheduler.is_current(&HEART, 0));
        assert!(scheduler.is_current(&HEART, 1));
        scheduler.stop_all();
        assert!(scheduler.running().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn zero_interval_is_raised_to_minimum() {
        let ticks = Arc::new(AtomicUsize::new(0));
        let mut scheduler = NotificationScheduler::new(Duration::ZERO);
        assert_eq!(scheduler.interval(), MIN_INTERVAL);

        scheduler.start(HEART, counting(&ticks));
        time::sleep(Duration::from_millis(10)).await;
        assert!(ticks.load(Ordering::SeqCst) >= 2);
    }

    #[tokio::test(start_paused = true)]
    async fn tick_returning_false_ends_the_task() {
        let ticks = Arc::new(AtomicUsize::new(0));
        let mut scheduler = NotificationScheduler::new(Duration::from_secs(5));
        let counter = Arc::clone(&ticks);
        scheduler.start(HEART, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            std::future::ready(false)
        });

        time::sleep(Duration::from_secs(60)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 1);
    }
}
