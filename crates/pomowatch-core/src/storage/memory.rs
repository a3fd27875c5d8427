use std::sync::{Arc, Mutex};

use super::SessionStore;
use crate::error::StoreError;

/// In-memory session store. Clones share the same slot.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    record: Arc<Mutex<Option<String>>>,
    saves: Arc<Mutex<usize>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that already holds `record`, as if a previous process saved it.
    pub fn with_record(record: impl Into<String>) -> Self {
        let store = Self::default();
        *store.record.lock().unwrap_or_else(|e| e.into_inner()) = Some(record.into());
        store
    }

    /// The currently stored record.
    pub fn record(&self) -> Option<String> {
        self.record.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// How many times `save` has been called.
    pub fn save_count(&self) -> usize {
        *self.saves.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl SessionStore for MemoryStore {
    fn load(&self) -> Result<Option<String>, StoreError> {
        Ok(self.record())
    }

    fn save(&mut self, record: &str) -> Result<(), StoreError> {
        *self.record.lock().unwrap_or_else(|e| e.into_inner()) = Some(record.to_string());
        *self.saves.lock().unwrap_or_else(|e| e.into_inner()) += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_store_loads_nothing() {
        assert!(MemoryStore::new().load().unwrap().is_none());
    }

    #[test]
    fn save_overwrites_previous_record() {
        let mut store = MemoryStore::with_record("old");
        let observer = store.clone();
        store.save("new").unwrap();
        assert_eq!(observer.load().unwrap().as_deref(), Some("new"));
        assert_eq!(observer.save_count(), 1);
    }
}
