//! State
//!
//! Key/value persistence for deal bookkeeping. Blobs are YAML values produced
//! from typed state structs, so any backend able to store a document can hold
//! them.

use std::fmt;

use rustc_hash::FxHashMap;
use serde::{Serialize, de::DeserializeOwned};
use serde_norway::Value;
use thiserror::Error;

/// Errors raised while reading or writing persisted state.
#[derive(Debug, Error)]
pub enum StateError {
    /// A stored blob could not be decoded into the expected state type.
    #[error("failed to decode state `{key}`: {source}")]
    Decode {
        /// Store key
        key: String,

        /// Underlying YAML error
        #[source]
        source: serde_norway::Error,
    },

    /// A state value could not be encoded.
    #[error("failed to encode state `{key}`: {source}")]
    Encode {
        /// Store key
        key: String,

        /// Underlying YAML error
        #[source]
        source: serde_norway::Error,
    },
}

/// Persistent storage for state blobs.
pub trait StateStore: fmt::Debug {
    /// Load a blob, if one was saved under `key`.
    fn load(&self, key: &str) -> Option<Value>;

    /// Save a blob under `key`, replacing any previous one.
    fn save(&mut self, key: &str, value: Value);
}

impl<S: StateStore + ?Sized> StateStore for Box<S> {
    fn load(&self, key: &str) -> Option<Value> {
        (**self).load(key)
    }

    fn save(&mut self, key: &str, value: Value) {
        (**self).save(key, value);
    }
}

/// Load and decode typed state.
///
/// # Errors
///
/// Returns `StateError::Decode` if the stored blob has the wrong shape.
pub fn load_state<T: DeserializeOwned>(
    store: &dyn StateStore,
    key: &str,
) -> Result<Option<T>, StateError> {
    store
        .load(key)
        .map(|value| {
            serde_norway::from_value(value).map_err(|source| StateError::Decode {
                key: key.to_string(),
                source,
            })
        })
        .transpose()
}

/// Encode and save typed state.
///
/// # Errors
///
/// Returns `StateError::Encode` if the value cannot be represented as YAML.
pub fn save_state<T: Serialize>(
    store: &mut dyn StateStore,
    key: &str,
    state: &T,
) -> Result<(), StateError> {
    let value = serde_norway::to_value(state).map_err(|source| StateError::Encode {
        key: key.to_string(),
        source,
    })?;

    store.save(key, value);

    Ok(())
}

/// In-memory state store.
#[derive(Debug, Default, Clone)]
pub struct MemoryStateStore {
    blobs: FxHashMap<String, Value>,
}

impl MemoryStateStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the number of stored blobs.
    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    /// Check if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }
}

impl StateStore for MemoryStateStore {
    fn load(&self, key: &str) -> Option<Value> {
        self.blobs.get(key).cloned()
    }

    fn save(&mut self, key: &str, value: Value) {
        self.blobs.insert(key.to_string(), value);
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;
    use testresult::TestResult;

    use super::*;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Counter {
        hits: u32,
    }

    #[test]
    fn typed_state_round_trips() -> TestResult {
        let mut store = MemoryStateStore::new();

        save_state(&mut store, "counter", &Counter { hits: 3 })?;

        assert_eq!(load_state::<Counter>(&store, "counter")?, Some(Counter { hits: 3 }));
        assert_eq!(store.len(), 1);

        Ok(())
    }

    #[test]
    fn missing_state_is_none() -> TestResult {
        let store = MemoryStateStore::new();

        assert_eq!(load_state::<Counter>(&store, "counter")?, None);

        Ok(())
    }

    #[test]
    fn mismatched_state_is_a_decode_error() {
        let mut store = MemoryStateStore::new();

        store.save("counter", Value::String("lots".to_string()));

        assert!(matches!(
            load_state::<Counter>(&store, "counter"),
            Err(StateError::Decode { key, .. }) if key == "counter"
        ));
    }
}
