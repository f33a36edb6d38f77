use color_eyre::{eyre::WrapErr, Result};
use slip_storage::{key_provider::RsaIdentity, EncryptedFileStore};
use tracing::debug;

use crate::config::StorePaths;

/// Open the encrypted store at the resolved paths, creating an empty one if needed.
pub fn open_store(paths: &StorePaths) -> Result<EncryptedFileStore<RsaIdentity>> {
    debug!(
        store = %paths.store_file.display(),
        key = %paths.key_path.display(),
        "opening encrypted store"
    );
    slip_storage::open_store(&paths.store_file, &paths.key_path).wrap_err_with(|| {
        format!(
            "failed to open store {} with key {}",
            paths.store_file.display(),
            paths.key_path.display()
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_key_file_reports_both_paths() {
        let dir = tempfile::tempdir().expect("tempdir");
        let paths = StorePaths {
            key_path: dir.path().join("absent_key"),
            store_file: dir.path().join("store.dat"),
        };

        let err = open_store(&paths).err().expect("missing key");
        let report = format!("{err:?}");
        assert!(report.contains("absent_key"));
        assert!(report.contains("key format error"));
    }
}
