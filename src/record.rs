//! Runtime record model derived from a table's catalog schema.
//!
//! A [`RecordType`] is an ordered list of slots, one per table column, built
//! fresh for every load. A [`Record`] shares its type through an [`Arc`] and
//! stores one optional [`Value`] per slot, so every table, whatever its shape,
//! flows through the same container.

use std::{collections::HashMap, fmt, sync::Arc};

use serde::Serialize;

use crate::{
    catalog::{DeclaredType, TableSchema},
    data::Value,
    error::SlotCollision,
    naming,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SlotKind {
    Integer,
    Floating,
    Text,
    Unknown,
}

impl From<DeclaredType> for SlotKind {
    fn from(declared: DeclaredType) -> Self {
        match declared {
            DeclaredType::Integer => SlotKind::Integer,
            DeclaredType::Floating => SlotKind::Floating,
            DeclaredType::Text => SlotKind::Text,
            DeclaredType::Unknown => SlotKind::Unknown,
        }
    }
}

impl fmt::Display for SlotKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SlotKind::Integer => "integer",
            SlotKind::Floating => "float",
            SlotKind::Text => "text",
            SlotKind::Unknown => "unknown",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slot {
    pub identifier: String,
    pub kind: SlotKind,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordType {
    slots: Vec<Slot>,
}

impl RecordType {
    pub fn new(slots: Vec<Slot>) -> Self {
        Self { slots }
    }

    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Index of the slot named `identifier`, if the type has one.
    pub fn position(&self, identifier: &str) -> Option<usize> {
        self.slots
            .iter()
            .position(|slot| slot.identifier == identifier)
    }

    pub fn identifiers(&self) -> Vec<String> {
        self.slots
            .iter()
            .map(|slot| slot.identifier.clone())
            .collect()
    }
}

/// Builds the record type for a table: one slot per column, in ordinal order.
///
/// Fails when two columns normalize to the same identifier, since a header
/// could then only ever fill one of them.
pub fn synthesize(schema: &TableSchema) -> Result<RecordType, SlotCollision> {
    let mut seen: HashMap<String, &str> = HashMap::with_capacity(schema.columns.len());
    let mut slots = Vec::with_capacity(schema.columns.len());
    for column in &schema.columns {
        let identifier = naming::normalize(&column.name);
        if let Some(first) = seen.insert(identifier.clone(), &column.name) {
            return Err(SlotCollision {
                table: schema.table.clone(),
                identifier,
                first: first.to_string(),
                second: column.name.clone(),
            });
        }
        slots.push(Slot {
            identifier,
            kind: SlotKind::from(column.declared_type),
        });
    }
    Ok(RecordType::new(slots))
}

/// One data row shaped by a [`RecordType`].
#[derive(Debug, Clone)]
pub struct Record {
    layout: Arc<RecordType>,
    values: Vec<Option<Value>>,
}

impl Record {
    /// Creates a record with every slot absent.
    pub fn new(layout: Arc<RecordType>) -> Self {
        let values = vec![None; layout.len()];
        Self { layout, values }
    }

    pub fn layout(&self) -> &Arc<RecordType> {
        &self.layout
    }

    /// Stores `value` in slot `index`. Values whose kind does not match the
    /// slot are refused and the slot keeps its previous contents.
    pub fn set(&mut self, index: usize, value: Value) -> bool {
        match self.layout.slots.get(index) {
            Some(slot) if slot.kind == value.kind() => {
                self.values[index] = Some(value);
                true
            }
            _ => false,
        }
    }

    pub fn value_at(&self, index: usize) -> Option<&Value> {
        self.values.get(index).and_then(Option::as_ref)
    }

    /// Value held by the slot named `identifier`; `None` when the slot is
    /// absent or the record type has no such slot.
    pub fn get(&self, identifier: &str) -> Option<&Value> {
        self.layout
            .position(identifier)
            .and_then(|index| self.value_at(index))
    }

    /// Ordered `(identifier, kind, value)` triples.
    pub fn fields(&self) -> impl Iterator<Item = (&str, SlotKind, Option<&Value>)> {
        self.layout
            .slots
            .iter()
            .zip(self.values.iter())
            .map(|(slot, value)| (slot.identifier.as_str(), slot.kind, value.as_ref()))
    }
}
