mod engine;
mod progress;
mod session;

pub use engine::{EngineOptions, SessionEngine};
pub use progress::{format_mm_ss, ProgressBand};
pub use session::{
    clamp_minutes, Session, SessionMode, SessionRecord, SessionState, TimerState,
    MAX_DURATION_MINUTES, MIN_DURATION_MINUTES,
};
