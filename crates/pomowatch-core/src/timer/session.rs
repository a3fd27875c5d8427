//! The session record: mode, duration, elapsed time and run state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::SnapshotError;

pub const MIN_DURATION_MINUTES: u32 = 1;
pub const MAX_DURATION_MINUTES: u32 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionMode {
    Focus,
    Break,
}

impl SessionMode {
    pub fn toggled(self) -> Self {
        match self {
            SessionMode::Focus => SessionMode::Break,
            SessionMode::Break => SessionMode::Focus,
        }
    }

    /// Label shown above the dial.
    pub fn label(self) -> &'static str {
        match self {
            SessionMode::Focus => "Session",
            SessionMode::Break => "Break",
        }
    }
}

/// Flat run state, as persisted and reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerState {
    Idle,
    Running,
    Paused,
    Ringing,
}

impl TimerState {
    pub fn as_str(self) -> &'static str {
        match self {
            TimerState::Idle => "idle",
            TimerState::Running => "running",
            TimerState::Paused => "paused",
            TimerState::Ringing => "ringing",
        }
    }
}

/// Run state with the start instant carried only where it exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    /// `started_at` is the wall-clock instant at which elapsed time was zero
    /// for the current run.
    Running {
        started_at: DateTime<Utc>,
    },
    Paused,
    Ringing,
}

impl SessionState {
    pub fn kind(&self) -> TimerState {
        match self {
            SessionState::Idle => TimerState::Idle,
            SessionState::Running { .. } => TimerState::Running,
            SessionState::Paused => TimerState::Paused,
            SessionState::Ringing => TimerState::Ringing,
        }
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        match self {
            SessionState::Running { started_at } => Some(*started_at),
            _ => None,
        }
    }
}

/// Clamp any requested duration into `[1, 60]` whole minutes.
///
/// Fractions round to the nearest minute; NaN maps to the minimum.
pub fn clamp_minutes(minutes: f64) -> u32 {
    if minutes.is_nan() {
        return MIN_DURATION_MINUTES;
    }
    minutes
        .round()
        .clamp(f64::from(MIN_DURATION_MINUTES), f64::from(MAX_DURATION_MINUTES)) as u32
}

/// The single timer instance.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub mode: SessionMode,
    pub duration_minutes: u32,
    /// Elapsed seconds at the last transition or tick. While running, the
    /// live value is derived from `started_at` instead.
    pub elapsed_secs: f64,
    pub state: SessionState,
}

impl Session {
    /// A fresh idle session.
    pub fn new(mode: SessionMode, duration_minutes: u32) -> Self {
        Self {
            mode,
            duration_minutes: clamp_minutes(f64::from(duration_minutes)),
            elapsed_secs: 0.0,
            state: SessionState::Idle,
        }
    }

    pub fn total_secs(&self) -> f64 {
        f64::from(self.duration_minutes) * 60.0
    }

    pub fn to_record(&self) -> SessionRecord {
        SessionRecord {
            mode: self.mode,
            duration_minutes: i64::from(self.duration_minutes),
            elapsed_seconds: self.elapsed_secs,
            state: self.state.kind(),
            start_timestamp: self.state.started_at(),
        }
    }

    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.to_record())
    }

    /// Decode and validate a persisted record.
    pub fn decode(record: &str) -> Result<Self, SnapshotError> {
        let record: SessionRecord = serde_json::from_str(record)?;
        Self::from_record(record)
    }

    /// Validate a record, repairing what can be clamped and rejecting the rest.
    pub fn from_record(record: SessionRecord) -> Result<Self, SnapshotError> {
        if !record.elapsed_seconds.is_finite() || record.elapsed_seconds < 0.0 {
            return Err(SnapshotError::InvalidElapsed(record.elapsed_seconds));
        }

        let duration_minutes = clamp_minutes(record.duration_minutes as f64);
        let total = f64::from(duration_minutes) * 60.0;

        let state = match record.state {
            TimerState::Idle => SessionState::Idle,
            TimerState::Paused => SessionState::Paused,
            TimerState::Ringing => SessionState::Ringing,
            TimerState::Running => SessionState::Running {
                started_at: record
                    .start_timestamp
                    .ok_or(SnapshotError::MissingStartTimestamp)?,
            },
        };
        if record.start_timestamp.is_some() && state.started_at().is_none() {
            tracing::debug!(state = ?record.state, "dropping start timestamp of non-running record");
        }

        let elapsed_secs = if state == SessionState::Ringing {
            total
        } else {
            record.elapsed_seconds.min(total)
        };

        Ok(Self {
            mode: record.mode,
            duration_minutes,
            elapsed_secs,
            state,
        })
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(SessionMode::Focus, 25)
    }
}

/// Persisted layout of a [`Session`]: one flat record, overwritten on every save.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub mode: SessionMode,
    pub duration_minutes: i64,
    pub elapsed_seconds: f64,
    pub state: TimerState,
    #[serde(default)]
    pub start_timestamp: Option<DateTime<Utc>>,
}
