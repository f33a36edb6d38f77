//! Data key generation, AES-256-GCM sealing, and the on-disk envelope layout.
//!
//! ```text
//! [u16 BE: n][n bytes: wrapped data key][12 bytes: nonce][ciphertext || 16-byte tag]
//! ```

use std::fmt;

use aes_gcm::{
    aead::{Aead, AeadCore, KeyInit, OsRng},
    Aes256Gcm, Nonce,
};
use rand::RngCore;
use slip_core::StoreError;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

/// Data key length in bytes (AES-256).
pub const DATA_KEY_LEN: usize = 32;
/// GCM nonce length in bytes.
pub const NONCE_LEN: usize = 12;
const LENGTH_PREFIX_LEN: usize = 2;

/// Symmetric key that encrypts the record payload. Zeroed on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct DataKey {
    bytes: [u8; DATA_KEY_LEN],
}

impl DataKey {
    /// Fresh key from the OS CSPRNG.
    pub fn generate() -> Self {
        let mut bytes = [0u8; DATA_KEY_LEN];
        OsRng.fill_bytes(&mut bytes);
        Self { bytes }
    }

    pub fn from_slice(slice: &[u8]) -> Result<Self, StoreError> {
        if slice.len() != DATA_KEY_LEN {
            return Err(StoreError::Crypto {
                reason: format!(
                    "data key must be {DATA_KEY_LEN} bytes, got {}",
                    slice.len()
                ),
            });
        }
        let mut bytes = [0u8; DATA_KEY_LEN];
        bytes.copy_from_slice(slice);
        Ok(Self { bytes })
    }

    pub fn as_bytes(&self) -> &[u8; DATA_KEY_LEN] {
        &self.bytes
    }
}

impl fmt::Debug for DataKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// Encrypt `plaintext` under a fresh random nonce. Output is `nonce || ciphertext || tag`.
pub fn seal(plaintext: &[u8], key: &DataKey) -> Result<Vec<u8>, StoreError> {
    let cipher = build_cipher(key)?;
    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
    let ciphertext = cipher
        .encrypt(&nonce, plaintext)
        .map_err(|e| StoreError::Crypto {
            reason: format!("encrypt failed: {e}"),
        })?;

    let mut sealed = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    sealed.extend_from_slice(nonce.as_slice());
    sealed.extend_from_slice(&ciphertext);
    Ok(sealed)
}

/// Verify and decrypt the output of [`seal`].
pub fn open(sealed: &[u8], key: &DataKey) -> Result<Zeroizing<Vec<u8>>, StoreError> {
    if sealed.len() < NONCE_LEN {
        return Err(StoreError::Format {
            reason: format!(
                "sealed payload is {} bytes, shorter than the {NONCE_LEN}-byte nonce",
                sealed.len()
            ),
        });
    }
    let cipher = build_cipher(key)?;
    let (nonce, ciphertext) = sealed.split_at(NONCE_LEN);
    cipher
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map(Zeroizing::new)
        .map_err(|_| StoreError::Authentication)
}

/// Borrowed view of a parsed store file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Envelope<'a> {
    pub wrapped_key: &'a [u8],
    pub sealed: &'a [u8],
}

/// Lay out the file bytes: length prefix, wrapped key, sealed payload.
pub fn build_envelope(wrapped_key: &[u8], sealed: &[u8]) -> Result<Vec<u8>, StoreError> {
    let len = u16::try_from(wrapped_key.len()).map_err(|_| StoreError::Format {
        reason: format!(
            "wrapped key is {} bytes, larger than the length prefix allows",
            wrapped_key.len()
        ),
    })?;

    let mut out = Vec::with_capacity(LENGTH_PREFIX_LEN + wrapped_key.len() + sealed.len());
    out.extend_from_slice(&len.to_be_bytes());
    out.extend_from_slice(wrapped_key);
    out.extend_from_slice(sealed);
    Ok(out)
}

/// Split file bytes into wrapped key and sealed payload.
///
/// An empty file is a store that was created but never written and yields `None`.
pub fn parse_envelope(bytes: &[u8]) -> Result<Option<Envelope<'_>>, StoreError> {
    if bytes.is_empty() {
        return Ok(None);
    }
    if bytes.len() < LENGTH_PREFIX_LEN {
        return Err(format_err("file is too short for the length prefix"));
    }

    let (prefix, rest) = bytes.split_at(LENGTH_PREFIX_LEN);
    let key_len = usize::from(u16::from_be_bytes([prefix[0], prefix[1]]));
    if key_len == 0 {
        return Err(format_err("wrapped key length is zero"));
    }
    if rest.len() < key_len + NONCE_LEN {
        return Err(StoreError::Format {
            reason: format!(
                "file declares a {key_len}-byte wrapped key but only {} bytes follow",
                rest.len()
            ),
        });
    }

    let (wrapped_key, sealed) = rest.split_at(key_len);
    Ok(Some(Envelope {
        wrapped_key,
        sealed,
    }))
}

fn build_cipher(key: &DataKey) -> Result<Aes256Gcm, StoreError> {
    Aes256Gcm::new_from_slice(key.as_bytes()).map_err(|e| StoreError::Crypto {
        reason: format!("cipher init failed: {e}"),
    })
}

fn format_err(reason: &str) -> StoreError {
    StoreError::Format {
        reason: reason.to_string(),
    }
}
