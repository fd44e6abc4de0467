// src/log.rs
//
// tracing setup for the binary. Library code only emits events; whoever owns
// the process decides where they go.

use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::config::consts::{DEFAULT_LOG_FILTER, VERBOSE_LOG_FILTER};
use crate::table::ensure_directory;

#[derive(Clone, Debug, Default)]
pub struct LogOptions {
    pub verbose: bool,
    /// Also append plain-text events here.
    pub file: Option<PathBuf>,
}

/// `RUST_LOG` wins when set; otherwise info (debug with `verbose`).
pub fn filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if verbose { VERBOSE_LOG_FILTER } else { DEFAULT_LOG_FILTER })
    })
}

/// Install the global subscriber. A second call is a no-op.
pub fn init(opts: &LogOptions) -> io::Result<()> {
    let console = fmt::layer()
        .with_writer(io::stderr)
        .with_target(false)
        .with_filter(filter(opts.verbose));

    let file_layer = match &opts.file {
        Some(path) => Some(
            fmt::layer()
                .with_writer(Mutex::new(open_append(path)?))
                .with_ansi(false)
                .with_filter(filter(opts.verbose)),
        ),
        None => None,
    };

    let _ = tracing_subscriber::registry()
        .with(console)
        .with(file_layer)
        .try_init();
    Ok(())
}

fn open_append(path: &Path) -> io::Result<File> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            ensure_directory(parent)?;
        }
    }
    OpenOptions::new().create(true).append(true).open(path)
}
