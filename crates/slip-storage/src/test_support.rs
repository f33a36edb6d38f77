//! Shared RSA fixtures. Key generation is slow, so each test binary does it once.

use std::{
    fs,
    path::{Path, PathBuf},
    sync::OnceLock,
};

use rand::rngs::OsRng;
use rsa::{
    pkcs1::{EncodeRsaPrivateKey, LineEnding},
    RsaPrivateKey,
};

pub const RSA_BITS: usize = 2048;

/// One 2048-bit key produced by `ssh-keygen -t rsa -N ''`, in both container formats.
pub const OPENSSH_FIXTURE: &str = include_str!("testdata/id_rsa_openssh");
pub const PKCS1_FIXTURE: &str = include_str!("testdata/id_rsa_pkcs1");

static RSA_KEY: OnceLock<RsaPrivateKey> = OnceLock::new();
static OTHER_RSA_KEY: OnceLock<RsaPrivateKey> = OnceLock::new();

pub fn rsa_key() -> &'static RsaPrivateKey {
    RSA_KEY.get_or_init(|| RsaPrivateKey::new(&mut OsRng, RSA_BITS).expect("generate rsa key"))
}

/// A second, unrelated identity for wrong-key scenarios.
pub fn other_rsa_key() -> &'static RsaPrivateKey {
    OTHER_RSA_KEY.get_or_init(|| RsaPrivateKey::new(&mut OsRng, 1024).expect("generate rsa key"))
}

pub fn write_pkcs1_key(dir: &Path) -> PathBuf {
    write_pkcs1(dir, "id_rsa", rsa_key())
}

pub fn write_other_pkcs1_key(dir: &Path) -> PathBuf {
    write_pkcs1(dir, "id_rsa_other", other_rsa_key())
}

pub fn write_openssh_fixture(dir: &Path) -> PathBuf {
    write_text(dir, "id_rsa_openssh", OPENSSH_FIXTURE)
}

pub fn write_pkcs1_fixture(dir: &Path) -> PathBuf {
    write_text(dir, "id_rsa_fixture", PKCS1_FIXTURE)
}

fn write_pkcs1(dir: &Path, name: &str, key: &RsaPrivateKey) -> PathBuf {
    let pem = key.to_pkcs1_pem(LineEnding::LF).expect("encode pkcs1");
    write_text(dir, name, &pem)
}

fn write_text(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).expect("write key");
    path
}
