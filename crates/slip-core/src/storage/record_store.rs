use thiserror::Error;

use crate::records::{Record, Records, TagFilter};

/// Errors produced by record store implementations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    /// The identity key file is unreadable, not PEM, or not an RSA key we can use.
    #[error("key format error: {reason}")]
    KeyFormat { reason: String },
    /// An asymmetric operation failed.
    #[error("crypto error: {reason}")]
    Crypto { reason: String },
    /// AEAD tag verification failed: tampered data or the wrong key.
    #[error("authentication failed: store data was tampered with or the key does not match")]
    Authentication,
    /// The store file or its plaintext is structurally invalid.
    #[error("invalid store format: {reason}")]
    Format { reason: String },
    /// No record matches the requested key and tag.
    #[error("key not found: {key}{}", tag_suffix(.tag))]
    NotFound { key: String, tag: Option<String> },
    /// Key, value or tag cannot be represented in the line format.
    #[error("invalid record: {reason}")]
    InvalidRecord { reason: String },
    /// Underlying filesystem failure.
    #[error("storage failure: {reason}")]
    Storage { reason: String },
}

fn tag_suffix(tag: &Option<String>) -> String {
    tag.as_deref()
        .map(|t| format!(" (tag {t})"))
        .unwrap_or_default()
}

/// Operations the CLI layer drives against a store.
///
/// Mutations rewrite the whole backing store; on error the backing store
/// and the in-memory view are left as they were.
pub trait RecordStore {
    /// Keys in scope whose name contains `filter`, in store order.
    fn list(&self, filter: Option<&str>, scope: &TagFilter) -> Vec<String>;

    /// Value of the record with exactly this key and tag (`None` = untagged).
    fn get(&self, key: &str, tag: Option<&str>) -> Result<String, StoreError>;

    /// Insert or replace the value for `(key, tag)`.
    fn set(&mut self, key: &str, value: &str, tag: Option<&str>) -> Result<(), StoreError>;

    /// Remove the first record with this key regardless of tag.
    /// Returns `false` when nothing matched.
    fn delete(&mut self, key: &str) -> Result<bool, StoreError>;

    /// `key=value` lines for the records in scope.
    fn dump(&self, scope: &TagFilter) -> String;
}

/// Plaintext, memory-only store for tests and dry runs.
#[derive(Debug, Default, Clone)]
pub struct InMemoryRecordStore {
    records: Records,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &Records {
        &self.records
    }
}

impl RecordStore for InMemoryRecordStore {
    fn list(&self, filter: Option<&str>, scope: &TagFilter) -> Vec<String> {
        self.records.keys(filter, scope)
    }

    fn get(&self, key: &str, tag: Option<&str>) -> Result<String, StoreError> {
        self.records.value_of(key, tag)
    }

    fn set(&mut self, key: &str, value: &str, tag: Option<&str>) -> Result<(), StoreError> {
        let record = Record::new(key, value, tag.map(str::to_string))?;
        self.records.upsert(record);
        Ok(())
    }

    fn delete(&mut self, key: &str) -> Result<bool, StoreError> {
        Ok(self.records.remove(key).is_some())
    }

    fn dump(&self, scope: &TagFilter) -> String {
        self.records.dump(scope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_then_get_respects_tag_scope() {
        let mut store = InMemoryRecordStore::new();
        store.set("key1", "value1", Some("tag1")).expect("set");
        store.set("key2", "value2", Some("tag2")).expect("set");

        assert_eq!(store.get("key1", Some("tag1")).expect("get"), "value1");
        let err = store
            .get("key2", Some("tag1"))
            .expect_err("wrong scope should miss");
        assert_eq!(
            err,
            StoreError::NotFound {
                key: "key2".into(),
                tag: Some("tag1".into())
            }
        );
    }

    #[test]
    fn delete_is_idempotent_and_ignores_tag() {
        let mut store = InMemoryRecordStore::new();
        store.set("k", "a", Some("tagX")).expect("set");

        assert!(store.delete("k").expect("delete"));
        assert!(!store.delete("k").expect("delete again"));
        assert!(store.records().is_empty());
    }

    #[test]
    fn empty_store_lists_nothing_and_misses_on_get() {
        let store = InMemoryRecordStore::new();
        assert!(store.list(None, &TagFilter::Any).is_empty());
        assert_eq!(store.dump(&TagFilter::Any), "");
        let err = store.get("k", None).expect_err("empty store");
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[test]
    fn not_found_message_mentions_tag() {
        let err = StoreError::NotFound {
            key: "k".into(),
            tag: Some("work".into()),
        };
        assert_eq!(err.to_string(), "key not found: k (tag work)");
    }
}
