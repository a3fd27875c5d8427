use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::timer::{ProgressBand, SessionMode, TimerState};

/// Every state change of the engine produces an Event.
/// Hosts print or forward them; `StateSnapshot` carries every derived value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    SessionStarted {
        mode: SessionMode,
        duration_minutes: u32,
        /// Elapsed seconds carried over from a pause (normally 0).
        resumed_from_secs: f64,
        at: DateTime<Utc>,
    },
    SessionPaused {
        elapsed_secs: f64,
        remaining_secs: f64,
        at: DateTime<Utc>,
    },
    SessionReset {
        at: DateTime<Utc>,
    },
    DurationChanged {
        duration_minutes: u32,
        /// True when the change forced the session back to idle.
        reset: bool,
        at: DateTime<Utc>,
    },
    ModeToggled {
        mode: SessionMode,
        duration_minutes: u32,
        at: DateTime<Utc>,
    },
    /// The session fully elapsed and the alert loop started.
    RingingStarted {
        mode: SessionMode,
        duration_minutes: u32,
        at: DateTime<Utc>,
    },
    RingingStopped {
        /// Mode of the next session (differs from the finished one with auto-advance).
        next_mode: SessionMode,
        at: DateTime<Utc>,
    },
    StateSnapshot {
        state: TimerState,
        mode: SessionMode,
        session_label: String,
        duration_minutes: u32,
        elapsed_secs: f64,
        remaining_secs: f64,
        remaining_display: String,
        progress: f64,
        progress_band: ProgressBand,
        is_running: bool,
        is_ringing: bool,
        started_at: Option<DateTime<Utc>>,
        at: DateTime<Utc>,
    },
}
