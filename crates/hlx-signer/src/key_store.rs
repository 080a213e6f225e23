//! Private key storage.
//!
//! The store is an opaque get/save/delete capability. Keys are kept as
//! `0x` + 64 hex chars. Never log key material.

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use alloy::signers::local::PrivateKeySigner;
use parking_lot::Mutex;
use tracing::{info, warn};
use zeroize::Zeroizing;

use crate::error::KeyError;

/// Secure key-value capability.
#[cfg_attr(test, mockall::automock)]
pub trait KeyStore: Send + Sync {
    fn get_key(&self, name: &str) -> Result<Option<String>, KeyError>;
    fn save_key(&self, name: &str, value: &str) -> Result<(), KeyError>;
    fn delete_key(&self, name: &str) -> Result<(), KeyError>;
}

/// `0x` followed by exactly 64 hex characters.
pub fn validate_key_format(value: &str) -> bool {
    value
        .strip_prefix("0x")
        .is_some_and(|hex| hex.len() == 64 && hex.chars().all(|c| c.is_ascii_hexdigit()))
}

fn parse_signer(value: &str) -> Result<PrivateKeySigner, KeyError> {
    if !validate_key_format(value) {
        return Err(KeyError::InvalidFormat("expected 0x + 64 hex chars".to_string()));
    }
    let bytes = Zeroizing::new(
        hex::decode(&value[2..]).map_err(|e| KeyError::InvalidFormat(e.to_string()))?,
    );
    PrivateKeySigner::from_slice(&bytes).map_err(|e| KeyError::InvalidFormat(e.to_string()))
}

fn encode_signer(signer: &PrivateKeySigner) -> Zeroizing<String> {
    Zeroizing::new(format!("0x{}", hex::encode(signer.to_bytes())))
}

/// Load the key stored under `name`.
///
/// A stored value that is not a valid key is deleted and reported as absent.
pub fn load_signer(store: &dyn KeyStore, name: &str) -> Result<Option<PrivateKeySigner>, KeyError> {
    let Some(raw) = store.get_key(name)? else {
        return Ok(None);
    };
    let raw = Zeroizing::new(raw);

    match parse_signer(raw.trim()) {
        Ok(signer) => Ok(Some(signer)),
        Err(e) => {
            warn!(key = name, error = %e, "Purging invalid stored key");
            store.delete_key(name)?;
            Ok(None)
        }
    }
}

/// Load the key under `name`, generating and saving a fresh one if absent.
pub fn load_or_generate(store: &dyn KeyStore, name: &str) -> Result<PrivateKeySigner, KeyError> {
    if let Some(signer) = load_signer(store, name)? {
        return Ok(signer);
    }

    let signer = PrivateKeySigner::random();
    store.save_key(name, &encode_signer(&signer))?;
    info!(key = name, address = %signer.address(), "Generated new signing key");
    Ok(signer)
}

/// Process-local store; keys vanish on exit.
#[derive(Default)]
pub struct MemoryKeyStore {
    keys: Mutex<HashMap<String, Zeroizing<String>>>,
}

impl MemoryKeyStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyStore for MemoryKeyStore {
    fn get_key(&self, name: &str) -> Result<Option<String>, KeyError> {
        Ok(self.keys.lock().get(name).map(|k| k.as_str().to_string()))
    }

    fn save_key(&self, name: &str, value: &str) -> Result<(), KeyError> {
        self.keys
            .lock()
            .insert(name.to_string(), Zeroizing::new(value.to_string()));
        Ok(())
    }

    fn delete_key(&self, name: &str) -> Result<(), KeyError> {
        self.keys.lock().remove(name);
        Ok(())
    }
}

/// One file per key under a directory, `<dir>/<name>.key`, mode 0600 on unix.
#[derive(Debug, Clone)]
pub struct FileKeyStore {
    dir: PathBuf,
}

impl FileKeyStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, name: &str) -> Result<PathBuf, KeyError> {
        let valid = !name.is_empty()
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(KeyError::Store(format!("invalid key name: {name:?}")));
        }
        Ok(self.dir.join(format!("{name}.key")))
    }
}

impl KeyStore for FileKeyStore {
    fn get_key(&self, name: &str) -> Result<Option<String>, KeyError> {
        let path = self.path_for(name)?;
        match fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content.trim().to_string())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save_key(&self, name: &str, value: &str) -> Result<(), KeyError> {
        let path = self.path_for(name)?;
        fs::create_dir_all(&self.dir)?;

        let mut options = fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        let mut file = options.open(&path)?;
        file.write_all(value.as_bytes())?;
        file.sync_all()?;
        Ok(())
    }

    fn delete_key(&self, name: &str) -> Result<(), KeyError> {
        let path = self.path_for(name)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
