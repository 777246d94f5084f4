//! CSV ingestion into typed records.
//!
//! The first row is the header. Each header cell is normalized and matched to
//! a slot of the target [`RecordType`]; headers without a slot are skipped.
//! Every following row becomes one [`Record`], in file order, with its cells
//! coerced by slot kind.

use std::{io::Read, path::Path, sync::Arc};

use encoding_rs::{Encoding, UTF_8};
use log::{debug, info, warn};
use serde::Serialize;

use crate::{
    data::parse_slot_value,
    error::IngestError,
    io_utils, naming,
    record::{Record, RecordType, SlotKind},
};

/// What happens when a cell cannot be read as its slot's kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum CoercionPolicy {
    /// Leave the slot absent and keep going.
    #[default]
    Lenient,
    /// Fail the whole ingest at the first unreadable cell.
    Strict,
}

#[derive(Debug, Clone)]
pub struct IngestOptions {
    pub delimiter: Option<u8>,
    pub encoding: &'static Encoding,
    pub coercion: CoercionPolicy,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            delimiter: None,
            encoding: UTF_8,
            coercion: CoercionPolicy::Lenient,
        }
    }
}

#[derive(Debug)]
pub struct Ingested {
    pub records: Vec<Record>,
    /// Header cells that matched no slot, in file order.
    pub unmatched_headers: Vec<String>,
    /// Cells left absent because they could not be coerced.
    pub skipped_cells: usize,
}

struct HeaderBinding {
    column: usize,
    slot: usize,
    kind: SlotKind,
    header: String,
}

pub fn ingest(
    path: &Path,
    record_type: &Arc<RecordType>,
    options: &IngestOptions,
) -> Result<Ingested, IngestError> {
    let delimiter = io_utils::resolve_input_delimiter(path, options.delimiter);
    let reader =
        io_utils::open_csv_reader_from_path(path, delimiter).map_err(|source| IngestError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    let ingested = ingest_csv(reader, path, record_type, options)?;
    info!(
        "Ingested {} record(s) from {:?}",
        ingested.records.len(),
        path
    );
    Ok(ingested)
}

/// Ingests from an already opened CSV reader; `source` only labels errors.
pub fn ingest_csv<R: Read>(
    mut reader: csv::Reader<R>,
    source: &Path,
    record_type: &Arc<RecordType>,
    options: &IngestOptions,
) -> Result<Ingested, IngestError> {
    let rows = reader
        .byte_records()
        .collect::<Result<Vec<_>, _>>()
        .map_err(|err| IngestError::Csv {
            path: source.to_path_buf(),
            source: err,
        })?;
    if rows.len() < 2 {
        return Err(IngestError::EmptyOrHeaderOnly(source.to_path_buf()));
    }

    let headers = io_utils::decode_headers(&rows[0], options.encoding).ok_or_else(|| {
        IngestError::Decode {
            path: source.to_path_buf(),
            line: 1,
            encoding: options.encoding.name(),
        }
    })?;
    let (bindings, unmatched_headers) = bind_headers(&headers, record_type);
    for header in &unmatched_headers {
        warn!("Skipping CSV column '{header}': no unbound column of the target table matches it");
    }
    debug!(
        "Matched {} of {} header(s) to record slots",
        bindings.len(),
        headers.len()
    );

    let mut records = Vec::with_capacity(rows.len() - 1);
    let mut skipped_cells = 0usize;
    for (row_idx, row) in rows.iter().enumerate().skip(1) {
        let line = row
            .position()
            .map(|pos| pos.line() as usize)
            .unwrap_or(row_idx + 1);
        let mut record = Record::new(Arc::clone(record_type));
        for binding in &bindings {
            let raw = row.get(binding.column).unwrap_or_default();
            let cell = io_utils::decode_bytes(raw, options.encoding).ok_or_else(|| {
                IngestError::Decode {
                    path: source.to_path_buf(),
                    line,
                    encoding: options.encoding.name(),
                }
            })?;
            match parse_slot_value(&cell, binding.kind) {
                Ok(Some(value)) => {
                    record.set(binding.slot, value);
                }
                Ok(None) => {}
                Err(err) => match options.coercion {
                    CoercionPolicy::Lenient => skipped_cells += 1,
                    CoercionPolicy::Strict => {
                        return Err(IngestError::Coercion {
                            line,
                            column: binding.header.clone(),
                            value: err.value,
                            kind: err.kind,
                        });
                    }
                },
            }
        }
        records.push(record);
    }

    if skipped_cells > 0 {
        warn!("{skipped_cells} cell(s) could not be coerced and were left empty");
    }
    Ok(Ingested {
        records,
        unmatched_headers,
        skipped_cells,
    })
}

fn bind_headers(headers: &[String], record_type: &RecordType) -> (Vec<HeaderBinding>, Vec<String>) {
    let mut bindings: Vec<HeaderBinding> = Vec::new();
    let mut unmatched = Vec::new();
    for (column, header) in headers.iter().enumerate() {
        let identifier = naming::normalize(header);
        match record_type.position(&identifier) {
            Some(slot) if bindings.iter().any(|bound| bound.slot == slot) => {
                debug!("CSV column '{header}' maps to slot '{identifier}', already bound");
                unmatched.push(header.clone());
            }
            Some(slot) => bindings.push(HeaderBinding {
                column,
                slot,
                kind: record_type.slots()[slot].kind,
                header: header.clone(),
            }),
            None => unmatched.push(header.clone()),
        }
    }
    (bindings, unmatched)
}
