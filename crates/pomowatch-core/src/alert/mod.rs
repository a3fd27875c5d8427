//! Repeating alert while a session is ringing.
//!
//! The engine calls [`AlertLoop::start`] exactly when it enters Ringing and
//! [`AlertLoop::stop`] when it leaves. It never polls the loop.

mod tokio_loop;

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub use tokio_loop::TokioAlertLoop;

/// Default gap between alert pulses.
pub const DEFAULT_ALERT_INTERVAL: Duration = Duration::from_secs(2);

/// A cancellable repeating alert.
pub trait AlertLoop {
    /// Fire one pulse now and keep pulsing at a fixed interval.
    fn start(&mut self);

    /// Cancel pulsing. Safe to call when not started.
    fn stop(&mut self);
}

impl<A: AlertLoop + ?Sized> AlertLoop for Box<A> {
    fn start(&mut self) {
        (**self).start();
    }

    fn stop(&mut self) {
        (**self).stop();
    }
}

/// Alert loop that emits nothing and only records what the engine asked for.
///
/// Used by one-shot hosts that exit before a second pulse could fire, and by
/// tests. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct HeadlessAlertLoop {
    active: Arc<AtomicBool>,
    starts: Arc<AtomicUsize>,
}

impl HeadlessAlertLoop {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Number of times the loop was started.
    pub fn start_count(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }
}

impl AlertLoop for HeadlessAlertLoop {
    fn start(&mut self) {
        self.active.store(true, Ordering::SeqCst);
        self.starts.fetch_add(1, Ordering::SeqCst);
    }

    fn stop(&mut self) {
        self.active.store(false, Ordering::SeqCst);
    }
}
