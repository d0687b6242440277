use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::constants::MIN_POLL_INTERVAL_MS;

/// Repeating poll timer backed by a tokio task.
///
/// The first tick fires one full interval after `start`. At most one task is
/// alive per timer: `start` cancels any previous one, and `cancel` is
/// idempotent. Intervals shorter than [`MIN_POLL_INTERVAL_MS`] are raised to it.
#[derive(Debug)]
pub struct PollTimer {
    interval: Duration,
    handle: Option<JoinHandle<()>>,
}

impl PollTimer {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval: interval.max(Duration::from_millis(MIN_POLL_INTERVAL_MS)),
            handle: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Starts ticking. `on_tick` returning `false` stops the timer from inside.
    pub fn start<F>(&mut self, mut on_tick: F)
    where
        F: FnMut() -> bool + Send + 'static,
    {
        self.cancel();

        let period = self.interval;
        self.handle = Some(tokio::spawn(async move {
            let mut interval = time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                interval.tick().await;
                if !on_tick() {
                    break;
                }
            }
        }));
    }

    pub fn is_active(&self) -> bool {
        self.handle.as_ref().is_some_and(|handle| !handle.is_finished())
    }

    /// Returns whether a running timer was actually cleared.
    pub fn cancel(&mut self) -> bool {
        match self.handle.take() {
            Some(handle) => {
                handle.abort();
                true
            }
            None => false,
        }
    }
}

impl Drop for PollTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn counting_timer(interval: Duration) -> (PollTimer, Arc<AtomicU32>) {
        let ticks = Arc::new(AtomicU32::new(0));
        let mut timer = PollTimer::new(interval);
        let counter = ticks.clone();
        timer.start(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            true
        });
        (timer, ticks)
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_tick_after_one_interval() {
        let (_timer, ticks) = counting_timer(Duration::from_secs(5));

        time::sleep(Duration::from_millis(4_900)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 0);

        time::sleep(Duration::from_millis(10_200)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_ticks_and_is_idempotent() {
        let (mut timer, ticks) = counting_timer(Duration::from_secs(5));

        time::sleep(Duration::from_millis(5_100)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 1);

        assert!(timer.cancel());
        assert!(!timer.cancel());
        assert!(!timer.is_active());

        time::sleep(Duration::from_secs(30)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_replaces_previous_task() {
        let ticks = Arc::new(AtomicU32::new(0));
        let mut timer = PollTimer::new(Duration::from_secs(5));

        for _ in 0..3 {
            let counter = ticks.clone();
            timer.start(move || {
                counter.fetch_add(1, Ordering::SeqCst);
                true
            });
        }

        time::sleep(Duration::from_millis(5_100)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_interval_is_raised_and_ticks() {
        let (timer, ticks) = counting_timer(Duration::ZERO);
        assert_eq!(timer.interval(), Duration::from_millis(MIN_POLL_INTERVAL_MS));

        time::sleep(Duration::from_millis(MIN_POLL_INTERVAL_MS * 3 + 50)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 3);
        assert!(timer.is_active());
    }

    #[tokio::test(start_paused = true)]
    async fn test_callback_can_stop_timer() {
        let ticks = Arc::new(AtomicU32::new(0));
        let mut timer = PollTimer::new(Duration::from_secs(1));
        let counter = ticks.clone();
        timer.start(move || counter.fetch_add(1, Ordering::SeqCst) < 1);

        time::sleep(Duration::from_secs(10)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 2);
        assert!(!timer.is_active());
    }
}
