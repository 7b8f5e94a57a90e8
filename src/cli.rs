//! CLI definition and dispatch.

use clap::{Args, Parser, Subcommand};
use csv::StringRecord;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::file_store::RecordStore;
use crate::domain::error::StoreError;
use crate::domain::record_codec;
use crate::domain::store_config::{self, StoreConfig, build_store_config, parse_header};
use crate::ports::indexed_access::IndexedAccess;
use crate::ports::record_cursor::RecordCursor;
use crate::ports::size_query::SizeQuery;

const DEFAULT_LOG_LEVEL: &str = "warn";

#[derive(Parser, Debug)]
#[command(name = "recstore", about = "Positional record store over a CSV file")]
pub struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

/// Which record file a command operates on.
#[derive(Args, Debug, Clone, Default)]
pub struct Target {
    /// Record file; takes precedence over `[store] path`
    #[arg(short, long)]
    pub file: Option<PathBuf>,
    /// INI configuration with a `[store]` section
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the number of records
    Count {
        #[command(flatten)]
        target: Target,
    },
    /// Print the record at a position
    Get {
        #[command(flatten)]
        target: Target,
        #[arg(short, long)]
        position: usize,
    },
    /// Append a record
    Append {
        #[command(flatten)]
        target: Target,
        #[arg(required = true, allow_hyphen_values = true)]
        fields: Vec<String>,
    },
    /// Replace the record at a position (appends past the end)
    Set {
        #[command(flatten)]
        target: Target,
        #[arg(short, long)]
        position: usize,
        #[arg(required = true, allow_hyphen_values = true)]
        fields: Vec<String>,
    },
    /// Remove the record at a position
    Delete {
        #[command(flatten)]
        target: Target,
        #[arg(short, long)]
        position: usize,
    },
    /// Replace the whole store with the rows of another CSV file
    Import {
        #[command(flatten)]
        target: Target,
        #[arg(short, long)]
        source: PathBuf,
        /// Header row, e.g. `date,open,close`; defaults to `[store] header`
        #[arg(long)]
        header: Option<String>,
    },
    /// Print every record with its position
    Dump {
        #[command(flatten)]
        target: Target,
    },
    /// Print the end offset of every record
    Index {
        #[command(flatten)]
        target: Target,
    },
}

impl Command {
    pub fn target(&self) -> &Target {
        match self {
            Command::Count { target }
            | Command::Get { target, .. }
            | Command::Append { target, .. }
            | Command::Set { target, .. }
            | Command::Delete { target, .. }
            | Command::Import { target, .. }
            | Command::Dump { target }
            | Command::Index { target } => target,
        }
    }
}

impl Cli {
    /// `--log-level`, else `[log] level` from `--config`, else `warn`.
    pub fn log_level(&self) -> String {
        if let Some(level) = &self.log_level {
            return level.to_lowercase();
        }
        self.command
            .target()
            .config
            .as_ref()
            .and_then(|path| FileConfigAdapter::from_file(path).ok())
            .and_then(|adapter| store_config::log_level(&adapter))
            .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string())
    }
}

/// Installs a stderr fmt subscriber. Later calls are ignored.
pub fn init_logging(level: &str) {
    let level = match level {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "error" => Level::ERROR,
        _ => Level::WARN,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Count { target } => run_count(&target),
        Command::Get { target, position } => run_get(&target, position),
        Command::Append { target, fields } => run_set(&target, None, &fields),
        Command::Set {
            target,
            position,
            fields,
        } => run_set(&target, Some(position), &fields),
        Command::Delete { target, position } => run_delete(&target, position),
        Command::Import {
            target,
            source,
            header,
        } => run_import(&target, &source, header.as_deref()),
        Command::Dump { target } => run_dump(&target),
        Command::Index { target } => run_index(&target),
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, StoreError> {
    FileConfigAdapter::from_file(path)
}

/// Resolves the store settings for a command.
///
/// `--file` wins over `[store] path`; header and `create_dirs` still come from
/// the config when one is given.
pub fn resolve_target(target: &Target) -> Result<StoreConfig, StoreError> {
    let from_config = match &target.config {
        Some(path) => Some(build_store_config(&load_config(path)?)),
        None => None,
    };

    match (&target.file, from_config) {
        (Some(file), Some(Ok(config))) => Ok(StoreConfig {
            path: file.clone(),
            ..config
        }),
        (Some(file), Some(Err(StoreError::ConfigMissing { .. })) | None) => Ok(StoreConfig {
            path: file.clone(),
            header: None,
            create_dirs: false,
        }),
        (_, Some(result)) => result,
        (None, None) => Err(StoreError::Configuration {
            reason: "either --file or --config is required".into(),
        }),
    }
}

pub fn open_store(config: &StoreConfig) -> Result<RecordStore, StoreError> {
    if config.create_dirs {
        RecordStore::open_with_create_dirs(&config.path)
    } else {
        RecordStore::open(&config.path)
    }
}

fn open_target(target: &Target) -> Result<RecordStore, StoreError> {
    open_store(&resolve_target(target)?)
}

fn fail(err: StoreError) -> ExitCode {
    eprintln!("error: {err}");
    (&err).into()
}

fn line_of(record: &StringRecord) -> Result<String, StoreError> {
    record_codec::to_line(record).map_err(|e| StoreError::resource("failed to format record", e))
}

fn run_count(target: &Target) -> ExitCode {
    match open_target(target) {
        Ok(store) => {
            println!("{}", store.count());
            ExitCode::SUCCESS
        }
        Err(e) => fail(e),
    }
}

fn run_get(target: &Target, position: usize) -> ExitCode {
    let result = open_target(target).and_then(|store| store.get(position));
    match result {
        Ok(Some(record)) => match line_of(&record) {
            Ok(line) => {
                println!("{line}");
                ExitCode::SUCCESS
            }
            Err(e) => fail(e),
        },
        Ok(None) => {
            eprintln!("No record at position {position}");
            ExitCode::SUCCESS
        }
        Err(e) => fail(e),
    }
}

/// Appends (`None`) or replaces a record, returning its position.
pub fn set_record(
    target: &Target,
    position: Option<usize>,
    fields: &[String],
) -> Result<usize, StoreError> {
    let mut store = open_target(target)?;
    let written = store.set(position, &StringRecord::from(fields.to_vec()))?;
    store.sync()?;
    Ok(written)
}

fn run_set(target: &Target, position: Option<usize>, fields: &[String]) -> ExitCode {
    match set_record(target, position, fields) {
        Ok(written) => {
            println!("{written}");
            ExitCode::SUCCESS
        }
        Err(e) => fail(e),
    }
}

pub fn delete_record(target: &Target, position: usize) -> Result<usize, StoreError> {
    let mut store = open_target(target)?;
    store.unset(position)?;
    store.sync()?;
    Ok(store.count())
}

fn run_delete(target: &Target, position: usize) -> ExitCode {
    match delete_record(target, position) {
        Ok(left) => {
            eprintln!("Deleted record {position}, {left} remaining");
            ExitCode::SUCCESS
        }
        Err(e) => fail(e),
    }
}

/// Bulk-replaces the store with the rows of `source`.
///
/// The source is read in full before the store is touched, so a malformed
/// source leaves the store as it was. Returns the resulting record count.
pub fn import_file(
    target: &Target,
    source: &Path,
    header: Option<&str>,
) -> Result<usize, StoreError> {
    let config = resolve_target(target)?;

    let header = match header {
        Some(raw) => Some(parse_header(raw).map_err(|reason| StoreError::Configuration {
            reason: format!("invalid --header: {reason}"),
        })?),
        None => config.header.clone(),
    };

    let file = File::open(source)
        .map_err(|e| StoreError::resource(format!("failed to open {}", source.display()), e))?;
    let rows = record_codec::read_all(file)
        .map_err(|e| StoreError::resource(format!("failed to read {}", source.display()), e))?;

    let mut store = open_store(&config)?;
    let count = store.import_data(&rows, header.as_ref())?.len();
    store.sync()?;
    Ok(count)
}

fn run_import(target: &Target, source: &Path, header: Option<&str>) -> ExitCode {
    eprintln!("Importing from {}", source.display());
    match import_file(target, source, header) {
        Ok(count) => {
            eprintln!("{count} records written");
            ExitCode::SUCCESS
        }
        Err(e) => fail(e),
    }
}

/// Walks the store with its cursor, returning `(position, line)` pairs.
pub fn dump_records(target: &Target) -> Result<Vec<(usize, String)>, StoreError> {
    let mut store = open_target(target)?;
    let mut lines = Vec::with_capacity(store.count());

    store.rewind();
    while store.valid() {
        if let Some(record) = store.current()? {
            lines.push((store.key(), line_of(&record)?));
        }
        store.next();
    }
    Ok(lines)
}

fn run_dump(target: &Target) -> ExitCode {
    match dump_records(target) {
        Ok(lines) => {
            for (position, line) in &lines {
                println!("{position}\t{line}");
            }
            ExitCode::SUCCESS
        }
        Err(e) => fail(e),
    }
}

fn run_index(target: &Target) -> ExitCode {
    match open_target(target) {
        Ok(store) => {
            for offset in store.index() {
                println!("{offset}");
            }
            eprintln!(
                "{} records, {} bytes",
                store.count(),
                store.index().last().copied().unwrap_or(0)
            );
            ExitCode::SUCCESS
        }
        Err(e) => fail(e),
    }
}
