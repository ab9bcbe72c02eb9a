//! Redb backend for the embedding catalog.
//!
//! The whole snapshot is one value under a fixed key, written in a single
//! write transaction, so readers never observe metadata from one save and
//! vectors from another.
//!
//! ```yaml
//! store:
//!   backend:
//!     kind: redb
//!     path: /app/data/embeddings.redb
//! ```

use crate::{IndexError, StoreBackend};
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use std::path::{Path, PathBuf};

const CATALOG_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("sharkid_catalog");
const SNAPSHOT_KEY: &str = "snapshot";

pub struct RedbBackend {
    db: Database,
    path: PathBuf,
}

impl RedbBackend {
    /// Open or create a database at `path`, creating parent directories.
    ///
    /// A file redb cannot open is renamed to `<path>.corrupt` and a fresh,
    /// empty database takes its place.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, IndexError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let db = match try_open(path) {
            Ok(db) => db,
            Err(err) => {
                let quarantine = quarantine_path(path);
                tracing::warn!(
                    path = %path.display(),
                    moved_to = %quarantine.display(),
                    error = %err,
                    "redb catalog unreadable, starting empty"
                );
                std::fs::rename(path, &quarantine)?;
                try_open(path)?
            }
        };

        Ok(Self {
            db,
            path: path.to_path_buf(),
        })
    }
}

/// Open the database and make sure the catalog table exists.
///
/// redb panics on some truncated files instead of returning an error, so
/// the attempt runs under `catch_unwind`.
fn try_open(path: &Path) -> Result<Database, IndexError> {
    let attempt = std::panic::catch_unwind(|| -> Result<Database, IndexError> {
        let db = Database::create(path).map_err(IndexError::backend)?;
        let write_txn = db.begin_write().map_err(IndexError::backend)?;
        {
            let _table = write_txn
                .open_table(CATALOG_TABLE)
                .map_err(IndexError::backend)?;
        }
        write_txn.commit().map_err(IndexError::backend)?;
        Ok(db)
    });
    match attempt {
        Ok(result) => result,
        Err(panic) => {
            let message = panic
                .downcast_ref::<&str>()
                .map(|s| (*s).to_owned())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_owned());
            Err(IndexError::backend(format!("redb panicked: {message}")))
        }
    }
}

fn quarantine_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".corrupt");
    PathBuf::from(name)
}

impl StoreBackend for RedbBackend {
    fn load(&self) -> Result<Option<Vec<u8>>, IndexError> {
        let read_txn = self.db.begin_read().map_err(IndexError::backend)?;
        let table = read_txn
            .open_table(CATALOG_TABLE)
            .map_err(IndexError::backend)?;
        let value = table.get(SNAPSHOT_KEY).map_err(IndexError::backend)?;
        Ok(value.map(|v| v.value().to_vec()))
    }

    fn save(&self, bytes: &[u8]) -> Result<(), IndexError> {
        let write_txn = self.db.begin_write().map_err(IndexError::backend)?;
        {
            let mut table = write_txn
                .open_table(CATALOG_TABLE)
                .map_err(IndexError::backend)?;
            table
                .insert(SNAPSHOT_KEY, bytes)
                .map_err(IndexError::backend)?;
        }
        write_txn.commit().map_err(IndexError::backend)?;
        Ok(())
    }

    fn describe(&self) -> String {
        format!("redb:{}", self.path.display())
    }
}
