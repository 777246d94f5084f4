//! Batched multi-row INSERT generation and execution.
//!
//! Column order always comes from a fresh catalog read, never from the record
//! type, and it drives both the column list and the positional parameters.
//! Records are cut into consecutive batches and each batch becomes one
//! parameterized statement.

use itertools::Itertools;
use log::{debug, info, warn};
use serde::Serialize;

use crate::{
    catalog,
    data::Value,
    error::InsertError,
    naming,
    record::Record,
    session::{Session, quote_identifier},
};

pub const DEFAULT_BATCH_SIZE: usize = 1000;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum CommitMode {
    /// One transaction around every batch; any failure rolls all of them back.
    #[default]
    Atomic,
    /// Each batch commits on its own; a failure leaves earlier batches in place.
    PerBatch,
}

#[derive(Debug, Clone)]
pub struct InsertOptions {
    pub batch_size: usize,
    pub commit: CommitMode,
}

impl Default for InsertOptions {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            commit: CommitMode::Atomic,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct InsertOutcome {
    pub rows: usize,
    pub statements: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InsertStatement {
    pub sql: String,
    pub params: Vec<Option<Value>>,
}

/// Target table and its column order, with each column's slot identifier
/// resolved once up front.
#[derive(Debug, Clone)]
pub struct InsertPlan {
    table: String,
    columns: Vec<String>,
    identifiers: Vec<String>,
}

impl InsertPlan {
    pub fn new(table: &str, columns: Vec<String>) -> Self {
        let identifiers = columns.iter().map(|c| naming::normalize(c)).collect();
        Self {
            table: table.to_string(),
            columns,
            identifiers,
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// One INSERT covering every record in `batch`. A record without a value
    /// for a column binds NULL in that position.
    pub fn statement(&self, batch: &[Record]) -> InsertStatement {
        let row_placeholder = format!(
            "({})",
            std::iter::repeat("?").take(self.columns.len()).join(", ")
        );
        let sql = format!(
            "INSERT INTO {} ({}) VALUES {}",
            quote_identifier(&self.table),
            self.columns.iter().map(|c| quote_identifier(c)).join(", "),
            std::iter::repeat(row_placeholder.as_str())
                .take(batch.len())
                .join(", ")
        );
        let params = batch
            .iter()
            .flat_map(|record| {
                self.identifiers
                    .iter()
                    .map(move |identifier| record.get(identifier).cloned())
            })
            .collect();
        InsertStatement { sql, params }
    }
}

pub fn bulk_insert<S: Session + ?Sized>(
    session: &mut S,
    table: &str,
    records: &[Record],
    options: &InsertOptions,
) -> Result<InsertOutcome, InsertError> {
    if records.is_empty() {
        return Err(InsertError::NoRecords);
    }
    if options.batch_size == 0 {
        return Err(InsertError::InvalidBatchSize);
    }
    let columns = catalog::read_column_order(session, table)?;
    if columns.is_empty() {
        return Err(InsertError::NoColumns(table.to_string()));
    }
    let plan = InsertPlan::new(table, columns);
    let batch_size = effective_batch_size(
        options.batch_size,
        plan.columns().len(),
        session.max_parameters(),
    );
    let batches = records.len().div_ceil(batch_size);
    debug!(
        "Inserting {} record(s) into '{table}' as {batches} batch(es) of up to {batch_size}",
        records.len()
    );

    if options.commit == CommitMode::Atomic {
        session.begin().map_err(|source| InsertError::Transaction {
            action: "begin",
            source,
        })?;
    }

    let mut inserted = 0usize;
    for (idx, batch) in records.chunks(batch_size).enumerate() {
        let statement = plan.statement(batch);
        debug!(
            "Batch {}/{batches}: {} row(s), {} parameter(s)",
            idx + 1,
            batch.len(),
            statement.params.len()
        );
        if let Err(source) = session.execute(&statement.sql, &statement.params) {
            let committed_rows = match options.commit {
                CommitMode::Atomic => {
                    if let Err(err) = session.rollback() {
                        warn!("Rolling back '{table}' after batch {} failed: {err}", idx + 1);
                    }
                    0
                }
                CommitMode::PerBatch => inserted,
            };
            return Err(InsertError::BatchFailed {
                batch: idx + 1,
                batches,
                committed_rows,
                source,
            });
        }
        inserted += batch.len();
    }

    if options.commit == CommitMode::Atomic {
        if let Err(source) = session.commit() {
            if let Err(err) = session.rollback() {
                warn!("Rolling back '{table}' after failed commit: {err}");
            }
            return Err(InsertError::Transaction {
                action: "commit",
                source,
            });
        }
    }

    info!("Inserted {inserted} row(s) into '{table}' with {batches} statement(s)");
    Ok(InsertOutcome {
        rows: inserted,
        statements: batches,
    })
}

/// Shrinks `requested` so one statement binds no more than `max_parameters`.
fn effective_batch_size(requested: usize, columns: usize, max_parameters: Option<usize>) -> usize {
    match max_parameters {
        Some(max) if columns > 0 && requested.saturating_mul(columns) > max => {
            let fitted = (max / columns).max(1);
            debug!(
                "Batch size {requested} x {columns} column(s) exceeds {max} parameters; using {fitted}"
            );
            fitted
        }
        _ => requested,
    }
}
