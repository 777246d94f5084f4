//! Error taxonomy shared by the catalog, ingest, insert, and load layers.
//!
//! Fatal conditions are variants here. Header mismatches and cells that fail
//! coercion are not errors: they are counted on [`crate::ingest::Ingested`]
//! and logged, and the load carries on.

use std::{io, path::PathBuf};

use thiserror::Error;

use crate::record::SlotKind;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
    #[error("{0}")]
    Backend(String),
}

#[derive(Debug, Error)]
#[error("catalog lookup for table '{table}' failed")]
pub struct CatalogError {
    pub table: String,
    #[source]
    pub source: SessionError,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("columns '{first}' and '{second}' of table '{table}' both map to slot '{identifier}'")]
pub struct SlotCollision {
    pub table: String,
    pub identifier: String,
    pub first: String,
    pub second: String,
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("reading {path:?}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("parsing CSV in {path:?}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("line {line} of {path:?} is not valid {encoding}")]
    Decode {
        path: PathBuf,
        line: usize,
        encoding: &'static str,
    },
    #[error("CSV file {0:?} is empty or has a header but no data rows")]
    EmptyOrHeaderOnly(PathBuf),
    #[error("line {line} column '{column}': cannot read '{value}' as {kind}")]
    Coercion {
        line: usize,
        column: String,
        value: String,
        kind: SlotKind,
    },
}

#[derive(Debug, Error)]
pub enum InsertError {
    #[error("no records to insert")]
    NoRecords,
    #[error("batch size must be at least 1")]
    InvalidBatchSize,
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error("table '{0}' has no columns to insert into")]
    NoColumns(String),
    #[error("batch {batch} of {batches} failed ({committed_rows} row(s) already committed)")]
    BatchFailed {
        batch: usize,
        batches: usize,
        committed_rows: usize,
        #[source]
        source: SessionError,
    },
    #[error("transaction {action} failed")]
    Transaction {
        action: &'static str,
        #[source]
        source: SessionError,
    },
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("could not open database {path:?}")]
    Connection {
        path: PathBuf,
        #[source]
        source: SessionError,
    },
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error("table '{0}' was not found or has no columns")]
    UnknownTable(String),
    #[error(transparent)]
    SlotCollision(#[from] SlotCollision),
    #[error("missing '{0}' parameter")]
    MissingArgument(&'static str),
    #[error(transparent)]
    Ingest(#[from] IngestError),
    #[error(transparent)]
    Insert(#[from] InsertError),
}
