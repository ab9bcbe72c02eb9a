use crate::IndexError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::RwLock;

/// Durable home for one encoded catalog snapshot.
///
/// A backend stores a single opaque blob; the metadata and the vector matrix
/// always travel together inside it, so a save either replaces both or
/// neither.
pub trait StoreBackend: Send + Sync {
    /// Read the last saved snapshot, or `None` if nothing was ever saved.
    fn load(&self) -> Result<Option<Vec<u8>>, IndexError>;
    /// Replace the stored snapshot with `bytes`.
    fn save(&self, bytes: &[u8]) -> Result<(), IndexError>;
    /// Human-readable location for logs.
    fn describe(&self) -> String;
}

/// Configuration for selecting and building a backend.
///
/// ```
/// use index::BackendConfig;
///
/// let config = BackendConfig::in_memory();
/// let config = BackendConfig::file("/app/data/embeddings.bin");
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BackendConfig {
    /// Nothing survives the process. Useful for tests and throwaway servers.
    #[default]
    InMemory,
    /// A single file replaced atomically on every save.
    File { path: PathBuf },
    /// A redb database holding the snapshot as one value.
    ///
    /// Requires the `backend-redb` feature.
    Redb { path: PathBuf },
}

impl BackendConfig {
    pub fn in_memory() -> Self {
        BackendConfig::InMemory
    }

    pub fn file<P: Into<PathBuf>>(path: P) -> Self {
        BackendConfig::File { path: path.into() }
    }

    pub fn redb<P: Into<PathBuf>>(path: P) -> Self {
        BackendConfig::Redb { path: path.into() }
    }

    /// Replace the path of a persistent backend; in-memory stays in-memory.
    pub fn with_path<P: Into<PathBuf>>(self, path: P) -> Self {
        match self {
            BackendConfig::InMemory => BackendConfig::InMemory,
            BackendConfig::File { .. } => BackendConfig::File { path: path.into() },
            BackendConfig::Redb { .. } => BackendConfig::Redb { path: path.into() },
        }
    }

    pub fn build(&self) -> Result<Box<dyn StoreBackend>, IndexError> {
        match self {
            BackendConfig::InMemory => Ok(Box::new(InMemoryBackend::new())),
            BackendConfig::File { path } => Ok(Box::new(FileBackend::new(path))),
            BackendConfig::Redb { path } => {
                #[cfg(feature = "backend-redb")]
                {
                    Ok(Box::new(RedbBackend::open(path)?))
                }
                #[cfg(not(feature = "backend-redb"))]
                {
                    let _ = path;
                    Err(IndexError::backend("redb backend disabled at compile time"))
                }
            }
        }
    }
}

/// Keeps the last snapshot in process memory.
#[derive(Default)]
pub struct InMemoryBackend {
    blob: RwLock<Option<Vec<u8>>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StoreBackend for InMemoryBackend {
    fn load(&self) -> Result<Option<Vec<u8>>, IndexError> {
        let guard = self
            .blob
            .read()
            .map_err(|_| IndexError::backend("poisoned lock"))?;
        Ok(guard.clone())
    }

    fn save(&self, bytes: &[u8]) -> Result<(), IndexError> {
        *self
            .blob
            .write()
            .map_err(|_| IndexError::backend("poisoned lock"))? = Some(bytes.to_vec());
        Ok(())
    }

    fn describe(&self) -> String {
        "in-memory".to_string()
    }
}

/// Writes the snapshot to a sibling temp file, then renames it over the
/// destination.
pub struct FileBackend {
    path: PathBuf,
}

impl FileBackend {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StoreBackend for FileBackend {
    fn load(&self) -> Result<Option<Vec<u8>>, IndexError> {
        match fs::read(&self.path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(IndexError::Io(e.to_string())),
        }
    }

    fn save(&self, bytes: &[u8]) -> Result<(), IndexError> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)?;
        let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
        tmp.write_all(bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path)
            .map_err(|e| IndexError::Io(e.error.to_string()))?;
        Ok(())
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

#[cfg(feature = "backend-redb")]
pub mod redb;

#[cfg(feature = "backend-redb")]
pub use redb::RedbBackend;
