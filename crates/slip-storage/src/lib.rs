//! Envelope-encrypted storage for slippard records.
//! Record text is sealed with AES-256-GCM under a random data key; that key is
//! wrapped with the user's RSA identity key and stored alongside the ciphertext.

pub mod envelope;
pub mod key_provider;
pub mod secure_file_store;

#[cfg(test)]
mod test_support;

pub use secure_file_store::{open_store, EncryptedFileStore};
