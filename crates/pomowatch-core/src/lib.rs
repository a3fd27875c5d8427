//! # pomowatch Core Library
//!
//! This library provides the countdown-session engine behind the pomowatch
//! focus/break timer. Hosts (the CLI, a watch face, a tray app) are thin
//! layers that call engine operations and render its derived values.
//!
//! ## Architecture
//!
//! - **Session Engine**: A wall-clock-based state machine that requires the caller
//!   to periodically invoke `tick()` for progress updates
//! - **Clock**: The single source of time; elapsed time is `now - start`, never a tick count
//! - **Storage**: One JSON session record in SQLite, overwritten on every mutation,
//!   plus TOML-based configuration
//! - **Alert Loop**: A cancellable repeating pulse, active only while ringing
//!
//! ## Key Components
//!
//! - [`SessionEngine`]: Core session state machine
//! - [`Clock`]: Time source ([`SystemClock`], [`ManualClock`])
//! - [`SessionStore`]: Persistence seam ([`Database`], [`MemoryStore`])
//! - [`AlertLoop`]: Alert seam ([`TokioAlertLoop`], [`HeadlessAlertLoop`])
//! - [`Config`]: Application configuration management

pub mod alert;
pub mod clock;
pub mod error;
pub mod events;
pub mod storage;
pub mod timer;

pub use alert::{AlertLoop, HeadlessAlertLoop, TokioAlertLoop};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{ConfigError, CoreError, SnapshotError, StoreError};
pub use events::Event;
pub use storage::{Config, Database, MemoryStore, SessionStore};
pub use timer::{
    EngineOptions, ProgressBand, Session, SessionEngine, SessionMode, SessionState, TimerState,
};
