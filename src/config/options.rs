// src/config/options.rs
use std::env;
use std::path::PathBuf;

use super::consts::*;

/// Process-level settings. Built once at startup and handed to the pieces that
/// need them; nothing reads the environment after this.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Options {
    pub table_path: PathBuf,
    /// Program that scrapes the parts catalogue (see `source::CommandSource`).
    pub source_cmd: Option<PathBuf>,
    /// Program that turns a repair-order image into a vehicle reply.
    pub extract_cmd: Option<PathBuf>,
    /// Serialize load-merge-replace with an advisory lock file.
    pub lock_writes: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            table_path: PathBuf::from(DEFAULT_TABLE_FILE),
            source_cmd: None,
            extract_cmd: None,
            lock_writes: true,
        }
    }
}

impl Options {
    /// Defaults, overridden by `RO_PARTS_TABLE`, `RO_PARTS_SOURCE_CMD` and
    /// `RO_PARTS_EXTRACT_CMD` when set and non-empty.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Same as [`Options::from_env`] with an injectable variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let mut opts = Self::default();
        if let Some(p) = get(TABLE_PATH_ENV) { opts.table_path = PathBuf::from(p); }
        opts.source_cmd = get(SOURCE_CMD_ENV).map(PathBuf::from);
        opts.extract_cmd = get(EXTRACT_CMD_ENV).map(PathBuf::from);
        opts
    }
}

/// Sidecar file used for the write lock: `<table>.lock`.
pub fn lock_path_for(table: &std::path::Path) -> PathBuf {
    let mut name = table.as_os_str().to_os_string();
    name.push(LOCK_SUFFIX);
    PathBuf::from(name)
}
