use std::{
    fs::{self, OpenOptions},
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
};

use slip_core::{Record, RecordStore, Records, StoreError, TagFilter};
use tempfile::NamedTempFile;
use tracing::{debug, instrument};
use zeroize::Zeroizing;

use crate::{
    envelope::{self, build_envelope, parse_envelope, DataKey},
    key_provider::{KeyWrapper, RsaIdentity},
};

/// Single-file record store, envelope-encrypted at rest.
///
/// The whole file is decrypted into memory on open. Every mutation re-seals the
/// full record list and atomically replaces the file.
pub struct EncryptedFileStore<W: KeyWrapper> {
    path: PathBuf,
    wrapper: W,
    data_key: DataKey,
    /// Wrapped form of `data_key`; read from the file or computed on first write.
    wrapped_key: Option<Vec<u8>>,
    records: Records,
}

/// Open (or create) the store at `store_path`, protected by the RSA key at `key_path`.
pub fn open_store(
    store_path: impl AsRef<Path>,
    key_path: impl AsRef<Path>,
) -> Result<EncryptedFileStore<RsaIdentity>, StoreError> {
    let identity = RsaIdentity::load(key_path)?;
    EncryptedFileStore::open(store_path, identity)
}

impl<W: KeyWrapper> EncryptedFileStore<W> {
    /// Decrypt an existing store, or start an empty one.
    ///
    /// A missing file is created empty. An empty file gets a fresh data key that
    /// is not written until the first mutation.
    #[instrument(skip_all)]
    pub fn open(path: impl AsRef<Path>, wrapper: W) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let bytes = read_or_create(&path)?;

        let Some(parsed) = parse_envelope(&bytes)? else {
            debug!(path = %path.display(), "opened empty store");
            return Ok(Self {
                path,
                wrapper,
                data_key: DataKey::generate(),
                wrapped_key: None,
                records: Records::new(),
            });
        };

        let data_key = wrapper.unwrap_key(parsed.wrapped_key)?;
        let plaintext = envelope::open(parsed.sealed, &data_key)?;
        let text = std::str::from_utf8(&plaintext).map_err(|e| StoreError::Format {
            reason: format!("decrypted records are not UTF-8: {e}"),
        })?;
        let records = Records::parse(text)?;
        debug!(path = %path.display(), records = records.len(), "opened store");

        Ok(Self {
            path,
            wrapper,
            data_key,
            wrapped_key: Some(parsed.wrapped_key.to_vec()),
            records,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn records(&self) -> &Records {
        &self.records
    }

    /// Persist the current records, restoring `previous` in memory if the write fails.
    fn commit(&mut self, previous: Records) -> Result<(), StoreError> {
        match self.persist() {
            Ok(()) => Ok(()),
            Err(err) => {
                self.records = previous;
                Err(err)
            }
        }
    }

    fn persist(&mut self) -> Result<(), StoreError> {
        let plaintext = Zeroizing::new(self.records.serialize());
        let sealed = envelope::seal(plaintext.as_bytes(), &self.data_key)?;

        let wrapped = match self.wrapped_key.take() {
            Some(wrapped) => wrapped,
            None => {
                debug!("wrapping data key for first write");
                self.wrapper.wrap_key(&self.data_key)?
            }
        };
        let bytes = build_envelope(&wrapped, &sealed);
        self.wrapped_key = Some(wrapped);

        write_atomic(&self.path, &bytes?)?;
        debug!(records = self.records.len(), "store written");
        Ok(())
    }
}

impl<W: KeyWrapper> RecordStore for EncryptedFileStore<W> {
    fn list(&self, filter: Option<&str>, scope: &TagFilter) -> Vec<String> {
        self.records.keys(filter, scope)
    }

    fn get(&self, key: &str, tag: Option<&str>) -> Result<String, StoreError> {
        self.records.value_of(key, tag)
    }

    #[instrument(skip_all, fields(tagged = tag.is_some()))]
    fn set(&mut self, key: &str, value: &str, tag: Option<&str>) -> Result<(), StoreError> {
        let record = Record::new(key, value, tag.map(str::to_string))?;
        let previous = self.records.clone();
        self.records.upsert(record);
        self.commit(previous)
    }

    #[instrument(skip_all)]
    fn delete(&mut self, key: &str) -> Result<bool, StoreError> {
        let previous = self.records.clone();
        if self.records.remove(key).is_none() {
            debug!("delete matched nothing");
            return Ok(false);
        }
        self.commit(previous)?;
        Ok(true)
    }

    fn dump(&self, scope: &TagFilter) -> String {
        self.records.dump(scope)
    }
}

fn read_or_create(path: &Path) -> Result<Vec<u8>, StoreError> {
    match fs::read(path) {
        Ok(bytes) => Ok(bytes),
        Err(err) if err.kind() == ErrorKind::NotFound => {
            create_empty(path)?;
            Ok(Vec::new())
        }
        Err(err) => Err(storage_err(err)),
    }
}

fn create_empty(path: &Path) -> Result<(), StoreError> {
    fs::create_dir_all(parent_dir(path)).map_err(storage_err)?;

    let mut options = OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    match options.open(path) {
        Ok(_) => {
            debug!(path = %path.display(), "created store file");
            Ok(())
        }
        Err(err) if err.kind() == ErrorKind::AlreadyExists => Ok(()),
        Err(err) => Err(storage_err(err)),
    }
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    let parent = parent_dir(path);
    fs::create_dir_all(parent).map_err(storage_err)?;

    let mut tmp = NamedTempFile::new_in(parent).map_err(storage_err)?;
    tmp.write_all(bytes).map_err(storage_err)?;
    tmp.flush().map_err(storage_err)?;
    tmp.as_file().sync_all().map_err(storage_err)?;
    tmp.persist(path).map_err(|e| storage_err(e.error))?;
    Ok(())
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

fn storage_err<E: ToString>(err: E) -> StoreError {
    StoreError::Storage {
        reason: err.to_string(),
    }
}
