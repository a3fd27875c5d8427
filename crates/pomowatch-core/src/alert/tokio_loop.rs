//! Alert loop driven by a tokio interval.

use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use super::{AlertLoop, DEFAULT_ALERT_INTERVAL};

/// One alert pulse (a buzz, a bell, a notification).
pub type Pulse = Arc<dyn Fn() + Send + Sync>;

/// Spawns a repeating pulse task on a tokio runtime.
///
/// The first pulse fires synchronously inside `start()`; later pulses come
/// from the spawned task. `stop()` aborts the task before returning.
pub struct TokioAlertLoop {
    handle: Handle,
    interval: Duration,
    pulse: Pulse,
    task: Option<JoinHandle<()>>,
}

impl TokioAlertLoop {
    pub fn new(handle: Handle, pulse: Pulse) -> Self {
        Self::with_interval(handle, DEFAULT_ALERT_INTERVAL, pulse)
    }

    pub fn with_interval(handle: Handle, interval: Duration, pulse: Pulse) -> Self {
        Self {
            handle,
            // tokio panics on a zero period
            interval: interval.max(Duration::from_millis(1)),
            pulse,
            task: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }
}

impl AlertLoop for TokioAlertLoop {
    fn start(&mut self) {
        self.stop();
        (self.pulse)();

        let pulse = Arc::clone(&self.pulse);
        let period = self.interval;
        self.task = Some(self.handle.spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                pulse();
            }
        }));
        tracing::debug!(interval_ms = period.as_millis() as u64, "alert loop started");
    }

    fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            tracing::debug!("alert loop stopped");
        }
    }
}

impl Drop for TokioAlertLoop {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_pulse() -> (Pulse, Arc<AtomicUsize>) {
        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        let pulse: Pulse = Arc::new(move || {
            c.fetch_add(1, Ordering::SeqCst);
        });
        (pulse, count)
    }

    #[tokio::test]
    async fn start_pulses_immediately() {
        let (pulse, count) = counting_pulse();
        let mut alerts =
            TokioAlertLoop::with_interval(Handle::current(), Duration::from_secs(60), pulse);
        alerts.start();
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(alerts.is_running());
        alerts.stop();
        assert!(!alerts.is_running());
    }

    #[tokio::test]
    async fn pulses_repeat_until_stopped() {
        let (pulse, count) = counting_pulse();
        let mut alerts =
            TokioAlertLoop::with_interval(Handle::current(), Duration::from_millis(10), pulse);
        alerts.start();
        tokio::time::sleep(Duration::from_millis(55)).await;
        alerts.stop();

        let after_stop = count.load(Ordering::SeqCst);
        assert!(after_stop >= 2, "expected repeated pulses, got {after_stop}");

        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(count.load(Ordering::SeqCst), after_stop);
    }

    #[tokio::test]
    async fn stop_without_start_is_harmless() {
        let (pulse, count) = counting_pulse();
        let mut alerts = TokioAlertLoop::new(Handle::current(), pulse);
        alerts.stop();
        alerts.stop();
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }
}
