// src/table.rs
//
// The persisted table: header + rows, CSV on disk.
//
// Header invariants: unique names, key column first, grows but never shrinks.
// Row invariants: one row per key, every row has a value for every column.
//
// A file that breaks these is repaired when it can be done without losing
// data (short rows, key column out of place, duplicate keys that agree) and
// rejected otherwise (long rows, no key column, repeated column names,
// duplicate keys that disagree on a value).

use std::fs::{self, File};
use std::io::{self, BufWriter, Read, Write};
use std::path::Path;

use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::attributes::is_key_column;
use crate::config::consts::{KEY_COLUMN, TABLE_DELIM};
use crate::error::StoreError;
use crate::key::{normalize, VehicleKey};
use crate::row::{Fields, Row};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Table {
    header: Vec<String>,
    rows: Vec<Row>,
}

impl Default for Table {
    fn default() -> Self {
        Self { header: vec![s!(KEY_COLUMN)], rows: Vec::new() }
    }
}

impl Table {
    pub fn new() -> Self { Self::default() }

    /// Full header, key column first.
    pub fn header(&self) -> &[String] { &self.header }

    /// Attribute columns only.
    pub fn columns(&self) -> &[String] { &self.header[1..] }

    pub fn rows(&self) -> &[Row] { &self.rows }

    pub fn len(&self) -> usize { self.rows.len() }
    pub fn is_empty(&self) -> bool { self.rows.is_empty() }

    pub fn find(&self, key: &VehicleKey) -> Option<&Row> {
        self.rows.iter().find(|r| &r.key == key)
    }

    /// Append any column not already in the header, in the order given.
    /// Spellings of the key column are skipped.
    pub fn ensure_columns<'a>(&mut self, columns: impl IntoIterator<Item = &'a str>) {
        for col in columns {
            if !is_key_column(col) && !self.header.iter().any(|h| h == col) {
                self.header.push(s!(col));
            }
        }
    }

    /// In-memory upsert: grow the header, merge into the keyed row (or create
    /// it), backfill every row, and return the merged row. The key column is
    /// not an attribute; any spelling of it in `update` is dropped.
    pub fn upsert(&mut self, key: &VehicleKey, update: &Fields) -> Row {
        let update: Fields = update
            .iter()
            .filter(|(col, _)| {
                let keep = !is_key_column(col);
                if !keep { warn!(key = %key, column = %col, "ignoring update to the key column"); }
                keep
            })
            .map(|(c, v)| (c.clone(), v.clone()))
            .collect();
        self.ensure_columns(update.keys().map(String::as_str));

        let ix = match self.rows.iter().position(|r| &r.key == key) {
            Some(ix) => ix,
            None => {
                let blank = Row::blank(key.clone(), self.columns());
                self.rows.push(blank);
                self.rows.len() - 1
            }
        };
        self.rows[ix].merge(&update);
        self.backfill();
        self.rows[ix].clone()
    }

    /// Keep the table rectangular.
    pub fn backfill(&mut self) {
        let cols = self.header[1..].to_vec();
        for row in &mut self.rows {
            row.backfill(&cols);
        }
    }

    /* ---------------- Loading ---------------- */

    /// Read the table at `path`. A missing or empty file is an empty table.
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        match File::open(path) {
            Ok(file) => Self::parse(path, file),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "table file absent; starting empty");
                Ok(Self::new())
            }
            Err(e) => Err(StoreError::io(path, e)),
        }
    }

    /// Parse CSV text. `path` is only used for diagnostics.
    pub fn parse<R: Read>(path: &Path, input: R) -> Result<Self, StoreError> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(TABLE_DELIM)
            .has_headers(false)
            .flexible(true)
            .from_reader(input);

        let mut records = reader.records();
        let raw_header: Vec<String> = match records.next() {
            None => return Ok(Self::new()),
            Some(rec) => rec
                .map_err(|e| StoreError::csv(path, e))?
                .iter()
                .enumerate()
                .map(|(i, h)| if i == 0 { h.trim_start_matches('\u{feff}') } else { h })
                .map(|h| s!(h.trim()))
                .collect(),
        };

        for (i, h) in raw_header.iter().enumerate() {
            if raw_header[..i].contains(h) {
                return Err(StoreError::malformed(path, format!("column {h:?} appears more than once")));
            }
        }
        let key_pos = raw_header
            .iter()
            .position(|h| h == KEY_COLUMN)
            .ok_or_else(|| StoreError::malformed(path, format!("header has no {KEY_COLUMN:?} column")))?;
        if let Some(h) = raw_header.iter().enumerate().find(|&(i, h)| i != key_pos && is_key_column(h)).map(|(_, h)| h) {
            return Err(StoreError::malformed(path, format!("column {h:?} clashes with the {KEY_COLUMN:?} key column")));
        }
        if key_pos != 0 {
            warn!(path = %path.display(), key_pos, "key column not first; moving it");
        }

        let mut table = Self::new();
        table.ensure_columns(raw_header.iter().map(String::as_str));

        // CSV line of each row in `table.rows`, for diagnostics
        let mut lines: Vec<usize> = Vec::new();
        let mut short_rows = 0usize;
        let mut folded = 0usize;
        for (n, rec) in records.enumerate() {
            let rec = rec.map_err(|e| StoreError::csv(path, e))?;
            let line = n + 2;
            if rec.len() > raw_header.len() {
                return Err(StoreError::malformed(
                    path,
                    format!("row {line} has {} fields but header has {}", rec.len(), raw_header.len()),
                ));
            }
            if rec.len() < raw_header.len() {
                short_rows += 1;
            }

            let key = normalize(rec.get(key_pos).unwrap_or(""));
            let mut row = Row::new(key);
            for (i, col) in raw_header.iter().enumerate() {
                if i != key_pos {
                    row.fields.insert(col.clone(), s!(rec.get(i).unwrap_or("")));
                }
            }

            match table.rows.iter().position(|r| r.key == row.key) {
                Some(ix) => {
                    let first = &mut table.rows[ix];
                    if let Some((col, kept, other)) = first.fields.iter().find_map(|(col, kept)| {
                        row.get(col)
                            .filter(|other| !kept.is_empty() && !other.is_empty() && *other != kept.as_str())
                            .map(|other| (col, kept, other))
                    }) {
                        return Err(StoreError::malformed(
                            path,
                            format!(
                                "rows {} and {line} share key {:?} but disagree on {col:?} ({kept:?} vs {other:?})",
                                lines[ix], row.key.as_str()
                            ),
                        ));
                    }
                    folded += 1;
                    for (col, val) in row.fields {
                        let slot = first.fields.entry(col).or_default();
                        if slot.is_empty() { *slot = val; }
                    }
                }
                None => {
                    table.rows.push(row);
                    lines.push(line);
                }
            }
        }

        if short_rows > 0 {
            warn!(path = %path.display(), short_rows, "backfilled short rows with empty values");
        }
        if folded > 0 {
            warn!(path = %path.display(), folded, "folded duplicate keys into their first row");
        }
        table.backfill();
        Ok(table)
    }

    /* ---------------- Writing ---------------- */

    /// Serialize header + rows.
    pub fn write_to<W: Write>(&self, out: W) -> csv::Result<()> {
        let mut w = csv::WriterBuilder::new().delimiter(TABLE_DELIM).from_writer(out);
        w.write_record(&self.header)?;
        for row in &self.rows {
            let mut rec = Vec::with_capacity(self.header.len());
            rec.push(row.key.as_str());
            rec.extend(self.columns().iter().map(|c| row.get(c).unwrap_or("")));
            w.write_record(&rec)?;
        }
        w.flush()?;
        Ok(())
    }

    pub fn to_csv_string(&self) -> csv::Result<String> {
        let mut buf: Vec<u8> = Vec::new();
        self.write_to(&mut buf)?;
        Ok(match String::from_utf8(buf) {
            Ok(s) => s,
            Err(e) => String::from_utf8_lossy(&e.into_bytes()).into_owned(),
        })
    }
}

/// Write `table` to a temp file beside `path`, then atomically replace `path`.
pub fn persist(path: &Path, table: &Table) -> Result<(), StoreError> {
    persist_with(path, table, |_| Ok(()))
}

/// [`persist`] with a hook that runs after the temp file is fully written and
/// synced but before the replace. An error from the hook abandons the write;
/// the temp file is removed and `path` is untouched.
pub fn persist_with<F>(path: &Path, table: &Table, before_replace: F) -> Result<(), StoreError>
where
    F: FnOnce(&Path) -> io::Result<()>,
{
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    ensure_directory(dir).map_err(|e| StoreError::io(dir, e))?;

    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| StoreError::io(dir, e))?;
    // The temp file is created owner-only; keep whatever mode the table had.
    match fs::metadata(path) {
        Ok(meta) => tmp
            .as_file()
            .set_permissions(meta.permissions())
            .map_err(|e| StoreError::io(tmp.path(), e))?,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(StoreError::io(path, e)),
    }
    {
        let mut out = BufWriter::new(tmp.as_file_mut());
        table.write_to(&mut out).map_err(|e| StoreError::csv(path, e))?;
        out.flush().map_err(|e| StoreError::io(path, e))?;
    }
    tmp.as_file().sync_all().map_err(|e| StoreError::io(tmp.path(), e))?;

    before_replace(tmp.path()).map_err(|e| StoreError::io(path, e))?;

    tmp.persist(path).map_err(|e| StoreError::io(path, e.error))?;
    debug!(path = %path.display(), rows = table.len(), "table replaced");
    Ok(())
}

pub fn ensure_directory(dir: &Path) -> io::Result<()> {
    if dir.exists() && !dir.is_dir() {
        return Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("path exists but is not a directory: {}", dir.display()),
        ));
    }
    if !dir.exists() { fs::create_dir_all(dir)?; }
    Ok(())
}
