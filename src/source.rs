// src/source.rs
//
// The parts source: whatever drives the catalogue site and reports back.
// The browser automation itself lives outside this crate; here we only define
// the seam and one adapter that shells out to a scraper program.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use tracing::{debug, warn};

use crate::attributes::{column_for, is_key_column};
use crate::error::ScrapeError;
use crate::row::Fields;
use crate::value::SourceValue;

/// attribute name (source spelling) -> value
pub type SourceOutput = BTreeMap<String, SourceValue>;

pub trait PartsSource {
    /// Look up `requested` attribute columns for `descriptor`. Returning only
    /// some of them is fine; failing outright is a [`ScrapeError`].
    fn scrape(&self, descriptor: &str, requested: &[String]) -> Result<SourceOutput, ScrapeError>;
}

impl<F> PartsSource for F
where
    F: Fn(&str, &[String]) -> Result<SourceOutput, ScrapeError>,
{
    fn scrape(&self, descriptor: &str, requested: &[String]) -> Result<SourceOutput, ScrapeError> {
        self(descriptor, requested)
    }
}

/// Store-ready fields from raw source output: names mapped to columns, values
/// flattened, and anything the source did not really answer left out. The key
/// column is never taken from a source.
///
/// Two spellings of one attribute (`oil_filters`, `Oil Filters`) that disagree
/// resolve to the one spelled exactly like the column.
pub fn to_fields(output: &SourceOutput) -> Fields {
    let mut fields = Fields::new();
    for (name, v) in output {
        let Some(flat) = v.flatten() else { continue };
        let col = column_for(name);
        if col.is_empty() { continue; }
        if is_key_column(&col) {
            warn!(source_name = %name, "source returned the key column; ignored");
            continue;
        }
        match fields.get(&col) {
            Some(prev) if *prev != flat => {
                let canonical = name.trim() == col;
                warn!(column = %col, source_name = %name, kept = if canonical { flat.as_str() } else { prev.as_str() },
                    "source answered one attribute under two names");
                if canonical { fields.insert(col, flat); }
            }
            Some(_) => {}
            None => { fields.insert(col, flat); }
        }
    }
    fields
}

/* ---------------- External program adapter ---------------- */

/// Runs `<program> [args..] <descriptor> <attribute>...` and reads one JSON
/// object from stdout, e.g.
/// `{"oil_filters": ["WIX: 57356"], "oil_capacity": "4.4 quarts", "oil_types": null}`.
#[derive(Clone, Debug)]
pub struct CommandSource {
    program: PathBuf,
    args: Vec<String>,
}

impl CommandSource {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self { program: program.into(), args: Vec::new() }
    }

    pub fn arg(mut self, a: impl Into<String>) -> Self {
        self.args.push(a.into());
        self
    }
}

impl PartsSource for CommandSource {
    fn scrape(&self, descriptor: &str, requested: &[String]) -> Result<SourceOutput, ScrapeError> {
        debug!(program = %self.program.display(), descriptor, ?requested, "running source");
        let out = Command::new(&self.program)
            .args(&self.args)
            .arg(descriptor)
            .args(requested)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| ScrapeError::Unavailable(format!("{}: {e}", self.program.display())))?;

        if !out.status.success() {
            return Err(ScrapeError::Failed {
                status: out.status.to_string(),
                stderr: s!(String::from_utf8_lossy(&out.stderr).trim()),
            });
        }
        parse_output(&out.stdout)
    }
}

pub fn parse_output(stdout: &[u8]) -> Result<SourceOutput, ScrapeError> {
    serde_json::from_slice(stdout).map_err(|e| ScrapeError::BadOutput(e.to_string()))
}
