//! Record store contract shared by the encrypted file store and test doubles.

mod record_store;

pub use record_store::{InMemoryRecordStore, RecordStore, StoreError};
