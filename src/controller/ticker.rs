//! Progress ticker
//!
//! Periodically queues a `Tick` event while the controller is playing or
//! recording. Each start bumps the generation so ticks that were already
//! queued when the ticker was stopped can be recognised and dropped.

use super::events::{ControllerEvent, EventSender};
use crate::tokio_runtime;
use log::{debug, warn};
use std::time::Duration;
use tokio::task::JoinHandle;

/// Default interval between time updates
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(1000);

pub struct ProgressTicker {
    period: Duration,
    generation: u64,
    task: Option<JoinHandle<()>>,
}

impl ProgressTicker {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            generation: 0,
            task: None,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Generation of the currently running ticker
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_running(&self) -> bool {
        self.task.is_some()
    }

    /// Whether a tick belongs to the ticker that is running right now
    pub fn is_current(&self, generation: u64) -> bool {
        self.is_running() && generation == self.generation
    }

    /// (Re)start ticking. The first tick is queued right away, the next
    /// ones every period.
    pub fn start(&mut self, sender: EventSender) {
        self.stop();
        self.generation += 1;

        let generation = self.generation;
        let period = self.period;
        sender.send(ControllerEvent::Tick { generation });
        self.task = tokio_runtime::spawn(async move {
            let mut interval =
                tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                if !sender.send(ControllerEvent::Tick { generation }) {
                    break;
                }
            }
        });

        if self.task.is_none() {
            warn!("No runtime available, time updates disabled");
        } else {
            debug!("Ticker generation {} started ({:?})", generation, period);
        }
    }

    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            debug!("Ticker generation {} stopped", self.generation);
        }
    }
}

impl Default for ProgressTicker {
    fn default() -> Self {
        Self::new(DEFAULT_TICK_INTERVAL)
    }
}

impl Drop for ProgressTicker {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_ticks_carry_generation() {
        let (sender, mut rx) = EventSender::channel();
        let mut ticker = ProgressTicker::new(Duration::from_millis(10));

        ticker.start(sender.clone());
        assert_eq!(rx.try_recv().ok(), Some(ControllerEvent::Tick { generation: 1 }));
        let second = rx.recv().await;
        assert_eq!(second, Some(ControllerEvent::Tick { generation: 1 }));
        assert!(ticker.is_current(1));

        ticker.start(sender);
        assert_eq!(ticker.generation(), 2);
        assert!(!ticker.is_current(1));
        ticker.stop();
    }

    #[test]
    fn test_stop_is_idempotent() {
        let (sender, _rx) = EventSender::channel();
        let mut ticker = ProgressTicker::default();
        ticker.stop();
        ticker.start(sender);
        assert!(ticker.is_running());
        ticker.stop();
        ticker.stop();
        assert!(!ticker.is_running());
        assert!(!ticker.is_current(ticker.generation()));
    }
}
