// src/cli.rs
use std::fs;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{eyre, WrapErr};
use serde::Serialize;

use crate::attributes::{column_for, is_key_column};
use crate::config::consts::{DEFAULT_TABLE_FILE, EXTRACT_CMD_ENV, SOURCE_CMD_ENV, TABLE_PATH_ENV};
use crate::config::Options;
use crate::error::ScrapeError;
use crate::extract::CommandExtractor;
use crate::key::normalize;
use crate::log::{self, LogOptions};
use crate::orchestrator::Orchestrator;
use crate::row::Fields;
use crate::source::{CommandSource, PartsSource, SourceOutput};
use crate::store::TableStore;
use crate::value::flatten_text;

#[derive(Parser, Debug)]
#[command(name = "ro_parts", version, about = "Oil/air filter, oil type and capacity lookup for a vehicle")]
pub struct Cli {
    /// Cache table file
    #[arg(long, global = true, env = TABLE_PATH_ENV, default_value = DEFAULT_TABLE_FILE)]
    pub table: PathBuf,

    /// Scraper program: `<cmd> <descriptor> <attribute>...`, JSON on stdout
    #[arg(long, global = true, env = SOURCE_CMD_ENV)]
    pub source_cmd: Option<PathBuf>,

    /// Vision program: image on stdin, `{year, make, model, engine}` on stdout
    #[arg(long, global = true, env = EXTRACT_CMD_ENV)]
    pub extract_cmd: Option<PathBuf>,

    /// Do not take the table write lock
    #[arg(long, global = true)]
    pub no_lock: bool,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Append log output to this file as well as stderr
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Cmd,
}

#[derive(Subcommand, Debug)]
pub enum Cmd {
    /// Resolve attributes for a vehicle: cache first, then the scraper.
    Lookup {
        #[arg(long, required_unless_present = "image", conflicts_with = "image")]
        descriptor: Option<String>,
        /// Repair-order photo; needs --extract-cmd
        #[arg(long)]
        image: Option<PathBuf>,
        /// Attribute to fetch (repeatable; default: all known)
        #[arg(long = "attr")]
        attrs: Vec<String>,
        #[arg(long)]
        pretty: bool,
    },
    /// Print the cached row for a vehicle without scraping.
    Show { descriptor: String },
    /// Manually merge values into a vehicle's row.
    Put {
        descriptor: String,
        /// COLUMN=VALUE (repeatable). Newline- or "; "-separated lists are fine.
        #[arg(long = "set", required = true, value_parser = parse_assignment)]
        set: Vec<(String, String)>,
    },
    /// Print the cache key for a descriptor.
    Normalize { descriptor: String },
}

impl Cli {
    pub fn options(&self) -> Options {
        Options {
            table_path: self.table.clone(),
            source_cmd: self.source_cmd.clone(),
            extract_cmd: self.extract_cmd.clone(),
            lock_writes: !self.no_lock,
        }
    }
}

fn parse_assignment(s: &str) -> Result<(String, String), String> {
    let (col, val) = s.split_once('=').ok_or_else(|| format!("expected COLUMN=VALUE, got {s:?}"))?;
    let col = column_for(col);
    if col.is_empty() { return Err(format!("empty column name in {s:?}")); }
    if is_key_column(&col) { return Err(format!("{col:?} is the key column; pass the vehicle as DESCRIPTOR")); }
    Ok((col, flatten_text(val)))
}

/// Source used by the CLI: the configured program, or none at all.
enum CliSource {
    Command(CommandSource),
    Unconfigured,
}

impl PartsSource for CliSource {
    fn scrape(&self, descriptor: &str, requested: &[String]) -> Result<SourceOutput, ScrapeError> {
        match self {
            CliSource::Command(c) => c.scrape(descriptor, requested),
            CliSource::Unconfigured => Err(ScrapeError::Unavailable(format!(
                "no scraper configured (--source-cmd or {SOURCE_CMD_ENV})"
            ))),
        }
    }
}

pub fn run() -> color_eyre::Result<()> {
    let cli = Cli::parse();
    log::init(&LogOptions { verbose: cli.verbose, file: cli.log_file.clone() })
        .wrap_err("failed to open log file")?;
    execute(&cli)
}

pub fn execute(cli: &Cli) -> color_eyre::Result<()> {
    let opts = cli.options();
    let store = TableStore::from_options(&opts);

    match &cli.command {
        Cmd::Normalize { descriptor } => println!("{}", normalize(descriptor)),

        Cmd::Show { descriptor } => {
            let row = store.lookup(&normalize(descriptor))?;
            print_json(&row.map(|r| r.fields), true)?;
        }

        Cmd::Put { descriptor, set } => {
            let fields: Fields = set.iter().cloned().collect();
            let row = store.upsert(&normalize(descriptor), &fields)?;
            print_json(&row.fields, true)?;
        }

        Cmd::Lookup { descriptor, image, attrs, pretty } => {
            let source = match &opts.source_cmd {
                Some(p) => CliSource::Command(CommandSource::new(p)),
                None => CliSource::Unconfigured,
            };
            let orch = Orchestrator::new(store, source);

            let outcome = match (descriptor, image) {
                (Some(d), _) => orch.resolve(d, attrs.as_slice())?,
                (None, Some(path)) => {
                    let cmd = opts
                        .extract_cmd
                        .as_ref()
                        .ok_or_else(|| eyre!("--image needs --extract-cmd or {EXTRACT_CMD_ENV}"))?;
                    let bytes = fs::read(path)
                        .wrap_err_with(|| format!("reading image {}", path.display()))?;
                    orch.resolve_image(&CommandExtractor::new(cmd), &bytes, attrs.as_slice())?
                }
                (None, None) => return Err(eyre!("either --descriptor or --image is required")),
            };
            print_json(&outcome.response(), *pretty)?;
        }
    }
    Ok(())
}

fn print_json<T: Serialize>(v: &T, pretty: bool) -> color_eyre::Result<()> {
    let s = if pretty { serde_json::to_string_pretty(v)? } else { serde_json::to_string(v)? };
    println!("{s}");
    Ok(())
}
