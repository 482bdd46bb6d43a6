//! Persistence contracts for the combined recommendation state.
//!
//! The core does not own a storage backend. It hands the surrounding
//! application a single blob through the [`StateStore`] capability and
//! tolerates whatever comes back: a missing blob is a cold start, a partial
//! blob merges field-by-field over defaults, and a malformed blob degrades to
//! defaults with a warning.

use serde::{Deserialize, Serialize};

use crate::bandit::BanditState;
use crate::error::StoreError;
use crate::fatigue::FatigueState;

/// Combined state blob exchanged with the persistence capability.
///
/// Both sub-states are optional so that partial blobs restore whatever they
/// carry and leave the rest at defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PersistedAiState {
    #[serde(default)]
    pub bandit: Option<BanditState>,

    #[serde(default)]
    pub fatigue: Option<FatigueState>,

    /// Unix timestamp in milliseconds of the last save.
    #[serde(default)]
    pub last_updated: i64,
}

/// External key-value persistence capability.
///
/// Implemented by the surrounding application (config file, app database,
/// whatever). The core never retries and never surfaces a store failure
/// through the recommendation API.
pub trait StateStore {
    /// Persist the combined state blob.
    fn save(&mut self, state: &PersistedAiState) -> Result<(), StoreError>;

    /// Load the previously persisted blob, or `None` on a cold start.
    fn load(&self) -> Result<Option<PersistedAiState>, StoreError>;

    /// Drop the persisted blob.
    fn clear(&mut self) -> Result<(), StoreError>;
}

/// In-memory store realization of the capability.
///
/// Keeps the blob as encoded JSON so save/load exercises the same round-trip
/// a real backend would.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    blob: Option<String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-seed the stored blob, e.g. to replay a captured state.
    pub fn with_blob(blob: impl Into<String>) -> Self {
        Self {
            blob: Some(blob.into()),
        }
    }

    /// Raw encoded blob, for inspection.
    pub fn raw(&self) -> Option<&str> {
        self.blob.as_deref()
    }
}

impl StateStore for MemoryStore {
    fn save(&mut self, state: &PersistedAiState) -> Result<(), StoreError> {
        let encoded = serde_json::to_string(state).map_err(StoreError::Encode)?;
        self.blob = Some(encoded);
        Ok(())
    }

    fn load(&self) -> Result<Option<PersistedAiState>, StoreError> {
        match &self.blob {
            Some(blob) => serde_json::from_str(blob)
                .map(Some)
                .map_err(StoreError::Decode),
            None => Ok(None),
        }
    }

    fn clear(&mut self) -> Result<(), StoreError> {
        self.blob = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bandit::DurationBandit;
    use crate::fatigue::FatigueTracker;

    #[test]
    fn test_cold_start_loads_none() {
        let store = MemoryStore::new();
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn test_save_load_round_trip() {
        let mut store = MemoryStore::new();
        let mut bandit = DurationBandit::new();
        bandit.update(25, 0.7);
        let state = PersistedAiState {
            bandit: Some(bandit.export_state()),
            fatigue: Some(FatigueTracker::new().export_state()),
            last_updated: 1_756_000_000_000,
        };

        store.save(&state).unwrap();
        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded.bandit, Some(bandit.export_state()));
        assert_eq!(loaded.last_updated, 1_756_000_000_000);
    }

    #[test]
    fn test_partial_blob_deserializes() {
        let loaded = MemoryStore::with_blob(r#"{"fatigue":{"ewma":0.9,"alpha":0.5}}"#)
            .load()
            .unwrap()
            .unwrap();
        assert!(loaded.bandit.is_none());
        assert_eq!(loaded.fatigue.map(|f| f.ewma), Some(0.9));
        assert_eq!(loaded.last_updated, 0);
    }

    #[test]
    fn test_malformed_blob_is_a_decode_error() {
        let store = MemoryStore::with_blob("not valid");
        assert!(matches!(store.load(), Err(StoreError::Decode(_))));
    }

    #[test]
    fn test_clear_drops_blob() {
        let mut store = MemoryStore::with_blob("{}");
        store.clear().unwrap();
        assert!(store.load().unwrap().is_none());
        assert!(store.raw().is_none());
    }
}
