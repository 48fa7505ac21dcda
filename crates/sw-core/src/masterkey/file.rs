//! File-backed password store

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use zeroize::Zeroizing;

use crate::error::StoreError;
use crate::profile::write_owner_only;
use crate::traits::PasswordStore;

use super::HASH_SUFFIX;

/// Default file name under the home directory
pub const MASTER_FILE_NAME: &str = ".sshw-master";

/// Stores the secret in one file and its hash in a `_hash` sibling
///
/// Both files are written with owner-only permissions.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    /// Store at `~/.sshw-master`
    pub fn new() -> Result<Self, StoreError> {
        let home = dirs::home_dir().ok_or_else(|| {
            StoreError::Io(io::Error::new(
                io::ErrorKind::NotFound,
                "cannot determine home directory",
            ))
        })?;
        Ok(Self::at(home.join(MASTER_FILE_NAME)))
    }

    /// Store at an explicit path
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn hash_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(HASH_SUFFIX);
        PathBuf::from(name)
    }
}

fn read(path: &Path) -> Result<Vec<u8>, StoreError> {
    match fs::read(path) {
        Ok(data) => Ok(data),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Err(StoreError::NotFound),
        Err(e) => Err(StoreError::Io(e)),
    }
}

fn remove(path: &Path) -> Result<(), StoreError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(StoreError::Io(e)),
    }
}

impl PasswordStore for FileStore {
    fn name(&self) -> &'static str {
        "file"
    }

    fn get(&self) -> Result<Zeroizing<Vec<u8>>, StoreError> {
        read(&self.path).map(Zeroizing::new)
    }

    fn set(&self, secret: &[u8]) -> Result<(), StoreError> {
        write_owner_only(&self.path, secret).map_err(StoreError::Io)
    }

    fn get_hash(&self) -> Result<String, StoreError> {
        let data = read(&self.hash_path())?;
        String::from_utf8(data)
            .map(|hash| hash.trim().to_string())
            .map_err(|_| StoreError::Backend("hash file is not valid UTF-8".into()))
    }

    fn set_hash(&self, hash: &str) -> Result<(), StoreError> {
        write_owner_only(&self.hash_path(), hash.as_bytes()).map_err(StoreError::Io)
    }

    fn clear_cached(&self) -> Result<(), StoreError> {
        remove(&self.path)
    }

    fn delete(&self) -> Result<(), StoreError> {
        remove(&self.path)?;
        remove(&self.hash_path())
    }
}
