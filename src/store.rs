// src/store.rs
//
// Flat table store: the only thing that touches the table file.
//
// Every call reloads the file; nothing is cached between calls. Writes go
// through a temp file + atomic replace, so readers see the old table or the
// new one, never half of either.

use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use fs2::FileExt;
use tracing::{debug, info};

use crate::config::options::{lock_path_for, Options};
use crate::error::StoreError;
use crate::key::VehicleKey;
use crate::row::{Fields, Row};
use crate::table::{self, ensure_directory, Table};

#[derive(Clone, Debug)]
pub struct TableStore {
    path: PathBuf,
    lock_writes: bool,
}

impl TableStore {
    /// Store backed by `path`. Writes are serialized through `<path>.lock`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), lock_writes: true }
    }

    pub fn from_options(opts: &Options) -> Self {
        Self::new(&opts.table_path).locking(opts.lock_writes)
    }

    /// Turn the write lock on or off. Without it, concurrent upserts can lose
    /// each other's changes (both load, last replace wins).
    pub fn locking(mut self, on: bool) -> Self {
        self.lock_writes = on;
        self
    }

    pub fn path(&self) -> &Path { &self.path }

    pub fn load(&self) -> Result<Table, StoreError> {
        Table::load(&self.path)
    }

    /// Row for `key`, if any. A missing file is `Ok(None)`.
    pub fn lookup(&self, key: &VehicleKey) -> Result<Option<Row>, StoreError> {
        let table = self.load()?;
        let hit = table.find(key).cloned();
        debug!(key = %key, hit = hit.is_some(), rows = table.len(), "lookup");
        Ok(hit)
    }

    /// Insert-or-merge `fields` into the row for `key` and persist the whole
    /// table. Columns absent from `fields` are left as they were.
    pub fn upsert(&self, key: &VehicleKey, fields: &Fields) -> Result<Row, StoreError> {
        self.upsert_with(key, fields, |_| Ok(()))
    }

    /// [`TableStore::upsert`] with a hook between writing the temp file and
    /// replacing the table (see [`table::persist_with`]).
    pub fn upsert_with<F>(&self, key: &VehicleKey, fields: &Fields, before_replace: F) -> Result<Row, StoreError>
    where
        F: FnOnce(&Path) -> io::Result<()>,
    {
        let _guard = if self.lock_writes { Some(WriteLock::acquire(&self.path)?) } else { None };

        let mut table = self.load()?;
        let existed = table.find(key).is_some();
        let merged = table.upsert(key, fields);
        table::persist_with(&self.path, &table, before_replace)?;

        info!(
            key = %key,
            created = !existed,
            columns = fields.len(),
            rows = table.len(),
            "upsert persisted"
        );
        Ok(merged)
    }
}

/// Exclusive advisory lock on the sidecar lock file, released on drop.
struct WriteLock {
    file: File,
}

impl WriteLock {
    fn acquire(table_path: &Path) -> Result<Self, StoreError> {
        let lock_path = lock_path_for(table_path);
        if let Some(parent) = lock_path.parent() {
            if !parent.as_os_str().is_empty() {
                ensure_directory(parent).map_err(|e| StoreError::io(parent, e))?;
            }
        }
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&lock_path)
            .map_err(|e| StoreError::Lock { path: lock_path.clone(), source: e })?;
        FileExt::lock_exclusive(&file)
            .map_err(|e| StoreError::Lock { path: lock_path.clone(), source: e })?;
        Ok(Self { file })
    }
}

impl Drop for WriteLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}
