//! End-to-end CSV load: catalog → record type → ingest → batched insert.
//!
//! [`load_csv_into_table`] is the coarse entrypoint: it opens one session,
//! runs the pipeline, always releases the session, and folds the result
//! into a [`LoadReport`]. [`try_load`] runs the same pipeline on a session
//! the caller already holds and keeps the typed error.

use std::{
    error::Error as StdError,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{Context, Result as AnyResult, anyhow};
use log::{debug, error, info};
use serde::Serialize;

use crate::{
    catalog,
    cli::LoadArgs,
    data::display_optional,
    error::LoadError,
    ingest::{self, CoercionPolicy, IngestOptions, Ingested},
    insert::{self, CommitMode, InsertOptions},
    io_utils,
    record::{self, Record, RecordType},
    session::{Session, SqliteSession},
    table,
};

pub const DEFAULT_PREVIEW_ROWS: usize = 20;

#[derive(Debug, Clone)]
pub struct LoadOptions {
    pub ingest: IngestOptions,
    pub insert: InsertOptions,
    /// Parsed records echoed to the debug log before inserting.
    pub preview_rows: usize,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            ingest: IngestOptions::default(),
            insert: InsertOptions::default(),
            preview_rows: DEFAULT_PREVIEW_ROWS,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoadConfig {
    pub database: PathBuf,
    pub options: LoadOptions,
}

impl LoadConfig {
    pub fn new(database: impl Into<PathBuf>) -> Self {
        Self {
            database: database.into(),
            options: LoadOptions::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadSummary {
    pub rows_loaded: usize,
    pub statements: usize,
    pub unmatched_headers: Vec<String>,
    pub skipped_cells: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LoadStatus {
    Success,
    Failure,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    pub status: LoadStatus,
    pub detail: String,
    pub rows_loaded: usize,
    pub statements: usize,
    pub unmatched_headers: Vec<String>,
    pub skipped_cells: usize,
}

impl LoadReport {
    fn success(table: &str, summary: LoadSummary) -> Self {
        Self {
            status: LoadStatus::Success,
            detail: format!("Loaded {} row(s) into '{table}'", summary.rows_loaded),
            rows_loaded: summary.rows_loaded,
            statements: summary.statements,
            unmatched_headers: summary.unmatched_headers,
            skipped_cells: summary.skipped_cells,
        }
    }

    fn failure(err: &LoadError) -> Self {
        Self {
            status: LoadStatus::Failure,
            detail: error_chain(err),
            rows_loaded: 0,
            statements: 0,
            unmatched_headers: Vec::new(),
            skipped_cells: 0,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == LoadStatus::Success
    }
}

/// Loads `file` into `table` of the database named by `config`.
pub fn load_csv_into_table(config: &LoadConfig, file: &Path, table: &str) -> LoadReport {
    let result = SqliteSession::open(&config.database)
        .map_err(|source| LoadError::Connection {
            path: config.database.clone(),
            source,
        })
        .and_then(|mut session| try_load(&mut session, file, table, &config.options));
    match result {
        Ok(summary) => LoadReport::success(table, summary),
        Err(err) => {
            let report = LoadReport::failure(&err);
            error!("Loading {file:?} into '{table}' failed: {}", report.detail);
            report
        }
    }
}

pub fn try_load<S: Session + ?Sized>(
    session: &mut S,
    file: &Path,
    table: &str,
    options: &LoadOptions,
) -> Result<LoadSummary, LoadError> {
    let (_, ingested) = prepare(session, file, table, options)?;
    log_preview(&ingested.records, options.preview_rows);
    let outcome = insert::bulk_insert(session, table, &ingested.records, &options.insert)?;
    Ok(LoadSummary {
        rows_loaded: outcome.rows,
        statements: outcome.statements,
        unmatched_headers: ingested.unmatched_headers,
        skipped_cells: ingested.skipped_cells,
    })
}

/// Reads the table schema, synthesizes its record type, and ingests `file`
/// without touching table data.
pub fn prepare<S: Session + ?Sized>(
    session: &mut S,
    file: &Path,
    table: &str,
    options: &LoadOptions,
) -> Result<(Arc<RecordType>, Ingested), LoadError> {
    if file.as_os_str().is_empty() {
        return Err(LoadError::MissingArgument("file"));
    }
    if table.trim().is_empty() {
        return Err(LoadError::MissingArgument("table"));
    }
    let schema = catalog::read_column_schemas(session, table)?;
    if schema.is_empty() {
        return Err(LoadError::UnknownTable(table.to_string()));
    }
    let record_type = Arc::new(record::synthesize(&schema)?);
    let ingested = ingest::ingest(file, &record_type, &options.ingest)?;
    Ok((record_type, ingested))
}

fn log_preview(records: &[Record], limit: usize) {
    if !log::log_enabled!(log::Level::Debug) {
        return;
    }
    for record in records.iter().take(limit) {
        let fields = record
            .fields()
            .map(|(identifier, _, value)| format!("{identifier}={}", display_optional(value)))
            .collect::<Vec<_>>();
        debug!("{}", fields.join(" "));
    }
}

fn error_chain(err: &dyn StdError) -> String {
    let mut parts = vec![err.to_string()];
    let mut source = err.source();
    while let Some(cause) = source {
        parts.push(cause.to_string());
        source = cause.source();
    }
    parts.join(": ")
}

pub fn execute(database: &Path, args: &LoadArgs) -> AnyResult<()> {
    let encoding = io_utils::resolve_encoding(args.input_encoding.as_deref())?;
    let options = LoadOptions {
        ingest: IngestOptions {
            delimiter: args.delimiter,
            encoding,
            coercion: if args.strict {
                CoercionPolicy::Strict
            } else {
                CoercionPolicy::Lenient
            },
        },
        insert: InsertOptions {
            batch_size: args.batch_size,
            commit: if args.per_batch_commit {
                CommitMode::PerBatch
            } else {
                CommitMode::Atomic
            },
        },
        preview_rows: args.preview_rows,
    };
    info!(
        "Loading '{}' into '{}' (delimiter '{}', batch size {}, {:?} commit)",
        args.input.display(),
        args.table,
        crate::printable_delimiter(io_utils::resolve_input_delimiter(
            &args.input,
            args.delimiter
        )),
        options.insert.batch_size,
        options.insert.commit
    );

    if args.dry_run {
        return dry_run(database, args, &options);
    }

    let config = LoadConfig {
        database: database.to_path_buf(),
        options,
    };
    let report = load_csv_into_table(&config, &args.input, &args.table);
    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("Serializing load report")?
        );
    }
    if report.is_success() {
        info!("{}", report.detail);
        Ok(())
    } else {
        Err(anyhow!(report.detail))
    }
}

fn dry_run(database: &Path, args: &LoadArgs, options: &LoadOptions) -> AnyResult<()> {
    let mut session = SqliteSession::open(database)
        .with_context(|| format!("Opening database {database:?}"))?;
    let (record_type, ingested) = prepare(&mut session, &args.input, &args.table, options)?;
    let rows = ingested
        .records
        .iter()
        .take(options.preview_rows)
        .map(|record| {
            record
                .fields()
                .map(|(_, _, value)| display_optional(value))
                .collect::<Vec<_>>()
        })
        .collect::<Vec<_>>();
    table::print_table(&record_type.identifiers(), &rows);
    info!(
        "Dry run parsed {} record(s) for '{}'; nothing was inserted",
        ingested.records.len(),
        args.table
    );
    Ok(())
}
