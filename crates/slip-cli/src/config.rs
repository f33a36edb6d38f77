use std::{
    env,
    ffi::OsString,
    fs,
    path::{Path, PathBuf},
};

use color_eyre::Result;
use dirs::{config_dir, home_dir};
use serde::{Deserialize, Serialize};

pub const KEY_PATH_ENV: &str = "SLP_KEY_PATH";
pub const STORE_FILE_ENV: &str = "SLP_STORE_FILE";

/// User-level configuration loaded from `~/.config/slippard/config.toml` (platform-specific).
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct Config {
    /// RSA private key that unlocks the store.
    pub key_path: Option<PathBuf>,
    /// Encrypted store file.
    pub store_file: Option<PathBuf>,
}

/// Fully resolved locations handed to the storage layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorePaths {
    pub key_path: PathBuf,
    pub store_file: PathBuf,
}

/// Load config from the default path; if missing, return defaults.
pub fn load() -> Result<Config> {
    let path = default_path()?;
    load_from_path(path)
}

/// Load config from a given path; if missing or empty, return defaults.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<Config> {
    let path = path.as_ref();
    if !path.exists() {
        return Ok(Config::default());
    }
    let contents = fs::read_to_string(path)?;
    if contents.trim().is_empty() {
        return Ok(Config::default());
    }
    let cfg: Config = toml::from_str(&contents)?;
    Ok(cfg)
}

/// Resolve the default config path (platform aware).
pub fn default_path() -> Result<PathBuf> {
    let base = config_dir().ok_or_else(|| color_eyre::eyre::eyre!("no config dir available"))?;
    Ok(base.join("slippard").join("config.toml"))
}

/// Write the config to `path` unless a file is already there.
pub fn write_if_missing(config: &Config, path: &Path) -> Result<PathBuf> {
    if path.exists() {
        return Ok(path.to_path_buf());
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let body = toml::to_string_pretty(config)?;
    fs::write(path, body)?;
    Ok(path.to_path_buf())
}

/// Pick key and store paths: flag, then environment, then config file, then defaults.
///
/// The config file is only read when a flag or environment variable leaves a path unset.
pub fn resolve_paths(key_flag: Option<PathBuf>, store_flag: Option<PathBuf>) -> Result<StorePaths> {
    resolve_with(key_flag, store_flag, load, |name| env::var_os(name), home_dir())
}

fn resolve_with(
    key_flag: Option<PathBuf>,
    store_flag: Option<PathBuf>,
    load_config: impl FnOnce() -> Result<Config>,
    env_lookup: impl Fn(&str) -> Option<OsString>,
    home: Option<PathBuf>,
) -> Result<StorePaths> {
    let from_env = |name: &str| env_lookup(name).filter(|v| !v.is_empty()).map(PathBuf::from);
    let require_home =
        || home.clone().ok_or_else(|| color_eyre::eyre::eyre!("no home dir available"));

    let mut key_path = key_flag.or_else(|| from_env(KEY_PATH_ENV));
    let mut store_file = store_flag.or_else(|| from_env(STORE_FILE_ENV));
    if key_path.is_none() || store_file.is_none() {
        let config = load_config()?;
        key_path = key_path.or(config.key_path);
        store_file = store_file.or(config.store_file);
    }

    let key_path = match key_path {
        Some(path) => path,
        None => require_home()?.join(".ssh").join("id_rsa"),
    };
    let store_file = match store_file {
        Some(path) => path,
        None => require_home()?.join(".config").join("slippard").join("store.dat"),
    };

    Ok(StorePaths {
        key_path,
        store_file,
    })
}
