//! Typed device-local preferences.
//!
//! Values are held as JSON in memory, hydrated from the store at startup and
//! written back through the store capability on every change.

use serde::{de::DeserializeOwned, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::marker::PhantomData;

use crate::capabilities::{KeyNamespace, KvError, KvKey};

/// A named preference of type `T`.
#[derive(Debug)]
pub struct Preference<T> {
    key: &'static str,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Preference<T> {
    #[must_use]
    pub const fn new(key: &'static str) -> Self {
        Self {
            key,
            _marker: PhantomData,
        }
    }

    #[must_use]
    pub const fn key(&self) -> &'static str {
        self.key
    }

    pub fn kv_key(&self) -> Result<KvKey, KvError> {
        KvKey::new(KeyNamespace::Settings, self.key)
    }
}

pub const DARK_MODE: Preference<bool> = Preference::new("darkMode");

/// Every key read back at startup.
pub const KNOWN_KEYS: [&str; 1] = [DARK_MODE.key()];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PreferenceStore {
    values: BTreeMap<String, serde_json::Value>,
    /// Keys written this run; a late startup read must not clobber them.
    touched: BTreeSet<String>,
}

impl PreferenceStore {
    /// The stored value, or `T::default()` when absent or of the wrong shape.
    #[must_use]
    pub fn get<T>(&self, pref: &Preference<T>) -> T
    where
        T: DeserializeOwned + Default,
    {
        self.values
            .get(pref.key())
            .and_then(|value| serde_json::from_value(value.clone()).ok())
            .unwrap_or_default()
    }

    /// Record a new value and return its encoded form for persistence.
    pub fn set<T>(&mut self, pref: &Preference<T>, value: &T) -> Result<Vec<u8>, KvError>
    where
        T: Serialize,
    {
        let json = serde_json::to_value(value).map_err(|e| KvError::Serialization {
            message: e.to_string(),
            key: Some(pref.key().to_string()),
        })?;
        let bytes = serde_json::to_vec(&json).map_err(|e| KvError::Serialization {
            message: e.to_string(),
            key: Some(pref.key().to_string()),
        })?;

        self.values.insert(pref.key().to_string(), json);
        self.touched.insert(pref.key().to_string());
        Ok(bytes)
    }

    /// Load a persisted value read at startup. Returns `Ok(false)` when the
    /// key was already set during this run and the read was ignored.
    /// Malformed bytes leave the key absent, so readers see the default.
    pub fn hydrate(&mut self, key: &str, bytes: Option<&[u8]>) -> Result<bool, KvError> {
        if self.touched.contains(key) {
            return Ok(false);
        }

        let Some(bytes) = bytes else {
            self.values.remove(key);
            return Ok(true);
        };

        match serde_json::from_slice::<serde_json::Value>(bytes) {
            Ok(value) => {
                self.values.insert(key.to_string(), value);
                Ok(true)
            }
            Err(e) => {
                self.values.remove(key);
                Err(KvError::Serialization {
                    message: e.to_string(),
                    key: Some(key.to_string()),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_key_reads_as_default() {
        let store = PreferenceStore::default();
        assert!(!store.get(&DARK_MODE));
    }

    #[test]
    fn set_then_get_and_encoding() {
        let mut store = PreferenceStore::default();
        let bytes = store.set(&DARK_MODE, &true).unwrap();
        assert_eq!(bytes, b"true");
        assert!(store.get(&DARK_MODE));
    }

    #[test]
    fn hydrate_reads_persisted_value() {
        let mut store = PreferenceStore::default();
        assert_eq!(store.hydrate("darkMode", Some(&b"true"[..])), Ok(true));
        assert!(store.get(&DARK_MODE));
    }

    #[test]
    fn malformed_value_falls_back_to_default() {
        let mut store = PreferenceStore::default();
        assert!(store.hydrate("darkMode", Some(&b"{not json"[..])).is_err());
        assert!(!store.get(&DARK_MODE));

        // Valid JSON of the wrong type also reads as the default.
        store.hydrate("darkMode", Some(&b"\"yes\""[..])).unwrap();
        assert!(!store.get(&DARK_MODE));
    }

    #[test]
    fn late_read_does_not_clobber_local_write() {
        let mut store = PreferenceStore::default();
        store.set(&DARK_MODE, &true).unwrap();
        assert_eq!(store.hydrate("darkMode", Some(&b"false"[..])), Ok(false));
        assert!(store.get(&DARK_MODE));
    }

    #[test]
    fn preference_key_is_namespaced() {
        assert_eq!(DARK_MODE.kv_key().unwrap().raw(), "settings:darkMode");
        assert_eq!(KNOWN_KEYS, ["darkMode"]);
    }
}
