use std::fmt;

use thiserror::Error;

use crate::record::SlotKind;

/// A typed cell held by a record slot and bound as a statement parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Integer(i64),
    Float(f64),
    Text(String),
}

impl Value {
    pub fn kind(&self) -> SlotKind {
        match self {
            Value::Integer(_) => SlotKind::Integer,
            Value::Float(_) => SlotKind::Floating,
            Value::Text(_) => SlotKind::Text,
        }
    }

    pub fn as_display(&self) -> String {
        match self {
            Value::Integer(i) => i.to_string(),
            Value::Float(f) => f.to_string(),
            Value::Text(s) => s.clone(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_display())
    }
}

/// Renders an optional slot value the way the preview table shows it.
pub fn display_optional(value: Option<&Value>) -> String {
    value
        .map(Value::as_display)
        .unwrap_or_else(|| "NULL".to_string())
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("cannot read '{value}' as {kind}")]
pub struct CellError {
    pub value: String,
    pub kind: SlotKind,
}

/// Coerces one raw CSV cell into the value a slot of `kind` holds.
///
/// `Ok(None)` means the slot stays absent: the cell was empty or the slot is
/// of unknown kind. Text is taken verbatim, with no trimming.
pub fn parse_slot_value(value: &str, kind: SlotKind) -> Result<Option<Value>, CellError> {
    if kind == SlotKind::Unknown {
        return Ok(None);
    }
    if value.is_empty() && kind != SlotKind::Text {
        return Ok(None);
    }
    let parsed = match kind {
        SlotKind::Integer => value
            .parse::<i64>()
            .map(Value::Integer)
            .map_err(|_| cell_error(value, kind))?,
        SlotKind::Floating => value
            .parse::<f64>()
            .map(Value::Float)
            .map_err(|_| cell_error(value, kind))?,
        SlotKind::Text => Value::Text(value.to_string()),
        SlotKind::Unknown => return Ok(None),
    };
    Ok(Some(parsed))
}

fn cell_error(value: &str, kind: SlotKind) -> CellError {
    CellError {
        value: value.to_string(),
        kind,
    }
}
