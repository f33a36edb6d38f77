//! Core abstractions for slippard: the record model, its line format and the
//! record store contract. No cryptography or file I/O lives here.

pub mod records;
pub mod storage;

pub use records::{Record, Records, TagFilter, TAG_SEPARATOR};
pub use storage::{InMemoryRecordStore, RecordStore, StoreError};
