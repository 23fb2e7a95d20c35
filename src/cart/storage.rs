use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use super::CartStorageError;

/// Where a cart keeps its serialized line list between sessions.
pub trait CartStorage: Send {
    fn load(&self) -> Result<Option<String>, CartStorageError>;
    fn save(&self, contents: &str) -> Result<(), CartStorageError>;
    fn remove(&self) -> Result<(), CartStorageError>;
}

/// Cart persisted as a JSON file. The parent directory is created on first save.
#[derive(Debug, Clone)]
pub struct FileCartStorage {
    path: PathBuf,
}

impl FileCartStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CartStorage for FileCartStorage {
    fn load(&self) -> Result<Option<String>, CartStorageError> {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, contents: &str) -> Result<(), CartStorageError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, contents)?;
        Ok(())
    }

    fn remove(&self) -> Result<(), CartStorageError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-memory slot. Clones share the same slot, so a test can keep one clone
/// to inspect what the cart wrote.
#[cfg(test)]
#[derive(Debug, Clone, Default)]
pub struct MemoryCartStorage {
    slot: std::sync::Arc<std::sync::Mutex<Option<String>>>,
}

#[cfg(test)]
impl MemoryCartStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_contents(contents: impl Into<String>) -> Self {
        Self {
            slot: std::sync::Arc::new(std::sync::Mutex::new(Some(contents.into()))),
        }
    }

    pub fn contents(&self) -> Option<String> {
        self.slot.lock().map(|slot| slot.clone()).unwrap_or_default()
    }

    fn with_slot<T>(&self, f: impl FnOnce(&mut Option<String>) -> T) -> Result<T, CartStorageError> {
        let mut slot = self
            .slot
            .lock()
            .map_err(|_| CartStorageError::Io("cart slot poisoned".to_string()))?;
        Ok(f(&mut slot))
    }
}

#[cfg(test)]
impl CartStorage for MemoryCartStorage {
    fn load(&self) -> Result<Option<String>, CartStorageError> {
        self.with_slot(|slot| slot.clone())
    }

    fn save(&self, contents: &str) -> Result<(), CartStorageError> {
        self.with_slot(|slot| *slot = Some(contents.to_string()))
    }

    fn remove(&self) -> Result<(), CartStorageError> {
        self.with_slot(|slot| *slot = None)
    }
}
