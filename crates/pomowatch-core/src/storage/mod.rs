mod config;
pub mod database;
mod memory;

pub use config::{AlertConfig, Config, DriverConfig, SessionConfig};
pub use database::Database;
pub use memory::MemoryStore;

use std::path::PathBuf;

use crate::error::StoreError;

/// Fixed key the session record is stored under.
pub const SESSION_KEY: &str = "session_engine";

/// Durable home of the single session record.
///
/// Every `save` overwrites the previous record in one atomic step. The store
/// deals in encoded records only; decoding and validation belong to the engine.
pub trait SessionStore {
    /// The last saved record, or `None` if nothing was ever saved.
    fn load(&self) -> Result<Option<String>, StoreError>;

    fn save(&mut self, record: &str) -> Result<(), StoreError>;
}

impl<S: SessionStore + ?Sized> SessionStore for Box<S> {
    fn load(&self) -> Result<Option<String>, StoreError> {
        (**self).load()
    }

    fn save(&mut self, record: &str) -> Result<(), StoreError> {
        (**self).save(record)
    }
}

/// Returns `~/.config/pomowatch[-dev]/` based on POMOWATCH_ENV.
///
/// Set POMOWATCH_ENV=dev to use development data directory.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, StoreError> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("POMOWATCH_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("pomowatch-dev")
    } else {
        base_dir.join("pomowatch")
    };

    std::fs::create_dir_all(&dir).map_err(StoreError::DataDir)?;
    Ok(dir)
}
