use crate::error::StorageError;
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info};

/// A durable key-value slot. Values are whole documents; `set` always overwrites.
pub trait Storage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError>;
}

/// One JSON file per key under a data directory.
#[derive(Debug)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    #[tracing::instrument(skip(dir))]
    pub fn open(dir: &Path) -> Result<Self, StorageError> {
        if dir.exists() && !dir.is_dir() {
            return Err(StorageError::unavailable(format!(
                "{} is not a directory",
                dir.display()
            )));
        }
        fs::create_dir_all(dir)?;
        info!(data_dir = %dir.display(), "opened storage");
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl Storage for FileStorage {
    #[tracing::instrument(skip(self))]
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.path_for(key);
        if !path.exists() {
            debug!(file = %path.display(), "no stored value");
            return Ok(None);
        }
        let data = fs::read_to_string(&path)?;
        debug!(file = %path.display(), bytes = data.len(), "read stored value");
        Ok(Some(data))
    }

    #[tracing::instrument(skip(self, value))]
    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.path_for(key);
        let mut temp = NamedTempFile::new_in(&self.dir)?;
        temp.write_all(value.as_bytes())?;
        temp.flush()?;
        temp.persist(&path).map_err(|err| err.error)?;
        debug!(file = %path.display(), bytes = value.len(), "wrote stored value");
        Ok(())
    }
}

/// In-process slot, used by tests.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    values: HashMap<String, String>,
    fail_writes: bool,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(key: &str, value: &str) -> Self {
        let mut storage = Self::new();
        storage.values.insert(key.to_string(), value.to_string());
        storage
    }

    /// Makes every later `set` fail, like a browser storage quota being hit.
    pub fn fail_writes(&mut self, fail: bool) {
        self.fail_writes = fail;
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        if self.fail_writes {
            return Err(StorageError::unavailable("quota exceeded"));
        }
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}
