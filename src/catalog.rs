//! Schema discovery against the database's own catalog.
//!
//! Columns always come back as ordered sequences sorted by ordinal position.
//! [`read_column_schemas`] and [`read_column_order`] are generated from the
//! same catalog query so the two can never disagree on order.

use std::{collections::HashSet, fmt};

use log::debug;
use serde::Serialize;

use crate::{
    data::Value,
    error::{CatalogError, SessionError},
    session::{Row, Session, quote_identifier},
};

macro_rules! table_info_query {
    ($columns:literal) => {
        concat!(
            "SELECT ",
            $columns,
            " FROM pragma_table_info(?1) ORDER BY cid"
        )
    };
}

const COLUMN_SCHEMA_QUERY: &str = table_info_query!("name, type, cid");
const COLUMN_ORDER_QUERY: &str = table_info_query!("name");
const COLUMN_DETAIL_QUERY: &str = table_info_query!("name, type, \"notnull\", dflt_value, pk");
const FOREIGN_KEY_QUERY: &str = "SELECT \"from\" FROM pragma_foreign_key_list(?1)";
const LIST_TABLES_QUERY: &str = "SELECT name FROM sqlite_master \
     WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DeclaredType {
    Integer,
    Floating,
    Text,
    Unknown,
}

impl DeclaredType {
    /// Classifies a catalog type name such as `INT UNSIGNED`, `decimal(10,2)`
    /// or `VARCHAR(255)` into its value family.
    pub fn from_catalog(raw: &str) -> Self {
        let lowered = raw.to_ascii_lowercase();
        let without_size = lowered.split('(').next().unwrap_or_default();
        let base = without_size
            .split_whitespace()
            .filter(|word| !matches!(*word, "unsigned" | "signed" | "zerofill"))
            .collect::<Vec<_>>()
            .join(" ");
        match base.as_str() {
            "int" | "integer" | "tinyint" | "smallint" | "mediumint" | "bigint" | "int2"
            | "int8" | "serial" | "bigserial" => DeclaredType::Integer,
            "float" | "double" | "double precision" | "real" | "decimal" | "numeric" => {
                DeclaredType::Floating
            }
            "char" | "varchar" | "character" | "varying character" | "nchar" | "nvarchar"
            | "native character" | "text" | "tinytext" | "mediumtext" | "longtext" | "clob" => {
                DeclaredType::Text
            }
            other => Self::from_affinity(other),
        }
    }

    /// SQLite's column-affinity rules for names outside the list above, so
    /// `UNSIGNED BIG INT`, `INT4` or `FLOAT8` land in their family.
    fn from_affinity(name: &str) -> Self {
        if name.contains("int") {
            DeclaredType::Integer
        } else if ["char", "clob", "text"].iter().any(|part| name.contains(part)) {
            DeclaredType::Text
        } else if ["real", "floa", "doub", "decimal", "numeric"]
            .iter()
            .any(|part| name.contains(part))
        {
            DeclaredType::Floating
        } else {
            DeclaredType::Unknown
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSchema {
    pub name: String,
    pub raw_type: String,
    pub declared_type: DeclaredType,
    pub ordinal_position: u32,
}

impl ColumnSchema {
    pub fn new(name: &str, raw_type: &str, ordinal_position: u32) -> Self {
        Self {
            name: name.to_string(),
            raw_type: raw_type.to_string(),
            declared_type: DeclaredType::from_catalog(raw_type),
            ordinal_position,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    pub table: String,
    pub columns: Vec<ColumnSchema>,
}

impl TableSchema {
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }
}

/// Reads name, declared type and ordinal position for every column of
/// `table`. An unknown table yields an empty schema.
pub fn read_column_schemas<S: Session + ?Sized>(
    session: &mut S,
    table: &str,
) -> Result<TableSchema, CatalogError> {
    let rows = run_catalog_query(session, COLUMN_SCHEMA_QUERY, table)?;
    let mut columns = Vec::with_capacity(rows.len());
    for row in &rows {
        let name = required_cell(row, 0, table)?;
        let raw_type = row.get(1).cloned().flatten().unwrap_or_default();
        let cid = required_cell(row, 2, table)?
            .parse::<u32>()
            .map_err(|err| catalog_failure(table, format!("bad column id: {err}")))?;
        columns.push(ColumnSchema::new(&name, &raw_type, cid + 1));
    }
    debug!("Catalog lists {} column(s) for '{table}'", columns.len());
    Ok(TableSchema {
        table: table.to_string(),
        columns,
    })
}

/// Column names of `table` in ordinal order, as the insert path needs them.
pub fn read_column_order<S: Session + ?Sized>(
    session: &mut S,
    table: &str,
) -> Result<Vec<String>, CatalogError> {
    run_catalog_query(session, COLUMN_ORDER_QUERY, table)?
        .iter()
        .map(|row| required_cell(row, 0, table))
        .collect()
}

pub fn list_tables<S: Session + ?Sized>(session: &mut S) -> Result<Vec<String>, CatalogError> {
    let rows = session
        .query(LIST_TABLES_QUERY, &[])
        .map_err(|source| CatalogError {
            table: "*".to_string(),
            source,
        })?;
    Ok(rows
        .into_iter()
        .filter_map(|row| row.into_iter().next().flatten())
        .collect())
}

pub fn row_count<S: Session + ?Sized>(session: &mut S, table: &str) -> Result<u64, CatalogError> {
    let sql = format!("SELECT COUNT(*) FROM {}", quote_identifier(table));
    let rows = session.query(&sql, &[]).map_err(|source| CatalogError {
        table: table.to_string(),
        source,
    })?;
    let first = rows
        .first()
        .ok_or_else(|| catalog_failure(table, "COUNT(*) returned no rows".to_string()))?;
    required_cell(first, 0, table)?
        .parse::<u64>()
        .map_err(|err| catalog_failure(table, format!("bad row count: {err}")))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum KeyKind {
    #[serde(rename = "PRI")]
    Primary,
    #[serde(rename = "FK")]
    Foreign,
}

impl fmt::Display for KeyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyKind::Primary => f.write_str("PRI"),
            KeyKind::Foreign => f.write_str("FK"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnDetail {
    pub name: String,
    pub data_type: String,
    pub nullable: bool,
    pub default: Option<String>,
    pub key: Option<KeyKind>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableOverview {
    pub name: String,
    pub row_count: u64,
    pub columns: Vec<ColumnDetail>,
}

/// Column details plus row count for one table, or `None` if the catalog
/// has no columns for it.
pub fn table_overview<S: Session + ?Sized>(
    session: &mut S,
    table: &str,
) -> Result<Option<TableOverview>, CatalogError> {
    let rows = run_catalog_query(session, COLUMN_DETAIL_QUERY, table)?;
    if rows.is_empty() {
        return Ok(None);
    }
    let foreign = run_catalog_query(session, FOREIGN_KEY_QUERY, table)?
        .into_iter()
        .filter_map(|row| row.into_iter().next().flatten())
        .collect::<HashSet<_>>();

    let mut columns = Vec::with_capacity(rows.len());
    for row in &rows {
        let name = required_cell(row, 0, table)?;
        let is_primary = row
            .get(4)
            .cloned()
            .flatten()
            .is_some_and(|pk| pk != "0");
        let key = if is_primary {
            Some(KeyKind::Primary)
        } else if foreign.contains(&name) {
            Some(KeyKind::Foreign)
        } else {
            None
        };
        columns.push(ColumnDetail {
            data_type: row.get(1).cloned().flatten().unwrap_or_default(),
            nullable: row.get(2).cloned().flatten().as_deref() != Some("1"),
            default: row.get(3).cloned().flatten(),
            key,
            name,
        });
    }

    let row_count = row_count(session, table)?;
    Ok(Some(TableOverview {
        name: table.to_string(),
        row_count,
        columns,
    }))
}

fn run_catalog_query<S: Session + ?Sized>(
    session: &mut S,
    sql: &str,
    table: &str,
) -> Result<Vec<Row>, CatalogError> {
    session
        .query(sql, &[Some(Value::Text(table.to_string()))])
        .map_err(|source| CatalogError {
            table: table.to_string(),
            source,
        })
}

fn required_cell(row: &Row, index: usize, table: &str) -> Result<String, CatalogError> {
    row.get(index).cloned().flatten().ok_or_else(|| {
        catalog_failure(table, format!("catalog row is missing column {index}"))
    })
}

fn catalog_failure(table: &str, message: String) -> CatalogError {
    CatalogError {
        table: table.to_string(),
        source: SessionError::Backend(message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SqliteSession;

    fn recipe_db() -> SqliteSession {
        let session = SqliteSession::open_in_memory().unwrap();
        session
            .connection()
            .execute_batch(
                "CREATE TABLE recipe (
                    recipe_id INTEGER PRIMARY KEY,
                    name VARCHAR(120) NOT NULL,
                    servings INT,
                    yield_amt DECIMAL(6,2) DEFAULT 1.0,
                    source TEXT
                 );
                 CREATE TABLE method_junc (
                    method_junc_id INTEGER PRIMARY KEY,
                    recipe_id INTEGER REFERENCES recipe(recipe_id),
                    note BLOB
                 );
                 INSERT INTO recipe (name, servings) VALUES ('stew', 4), ('soup', 2);",
            )
            .unwrap();
        session
    }

    #[test]
    fn declared_type_maps_type_families() {
        assert_eq!(DeclaredType::from_catalog("INTEGER"), DeclaredType::Integer);
        assert_eq!(DeclaredType::from_catalog("int unsigned"), DeclaredType::Integer);
        assert_eq!(DeclaredType::from_catalog("int(10) unsigned"), DeclaredType::Integer);
        assert_eq!(DeclaredType::from_catalog("BIGINT"), DeclaredType::Integer);
        assert_eq!(DeclaredType::from_catalog("double"), DeclaredType::Floating);
        assert_eq!(DeclaredType::from_catalog("DECIMAL(10,2)"), DeclaredType::Floating);
        assert_eq!(DeclaredType::from_catalog("Double Precision"), DeclaredType::Floating);
        assert_eq!(DeclaredType::from_catalog("varchar(255)"), DeclaredType::Text);
        assert_eq!(DeclaredType::from_catalog("TEXT"), DeclaredType::Text);
        assert_eq!(DeclaredType::from_catalog("DATETIME"), DeclaredType::Unknown);
        assert_eq!(DeclaredType::from_catalog("BLOB"), DeclaredType::Unknown);
        assert_eq!(DeclaredType::from_catalog(""), DeclaredType::Unknown);
        assert_eq!(DeclaredType::from_catalog("BOOLEAN"), DeclaredType::Unknown);
    }

    #[test]
    fn declared_type_falls_back_to_sqlite_affinity() {
        assert_eq!(DeclaredType::from_catalog("UNSIGNED BIG INT"), DeclaredType::Integer);
        assert_eq!(DeclaredType::from_catalog("BIG INT"), DeclaredType::Integer);
        assert_eq!(DeclaredType::from_catalog("INT4"), DeclaredType::Integer);
        assert_eq!(DeclaredType::from_catalog("FLOAT8"), DeclaredType::Floating);
        assert_eq!(DeclaredType::from_catalog("REAL8"), DeclaredType::Floating);
        assert_eq!(DeclaredType::from_catalog("CHARACTER(20)"), DeclaredType::Text);
        assert_eq!(DeclaredType::from_catalog("VARYING TEXT"), DeclaredType::Text);
        assert_eq!(DeclaredType::from_catalog("numeric precision"), DeclaredType::Floating);
    }

    #[test]
    fn read_column_schemas_follows_ordinal_position() {
        let mut session = recipe_db();
        let schema = read_column_schemas(&mut session, "recipe").unwrap();
        let summary = schema
            .columns
            .iter()
            .map(|c| (c.name.as_str(), c.declared_type, c.ordinal_position))
            .collect::<Vec<_>>();
        assert_eq!(
            summary,
            vec![
                ("recipe_id", DeclaredType::Integer, 1),
                ("name", DeclaredType::Text, 2),
                ("servings", DeclaredType::Integer, 3),
                ("yield_amt", DeclaredType::Floating, 4),
                ("source", DeclaredType::Text, 5),
            ]
        );
        assert_eq!(schema.columns[1].raw_type, "VARCHAR(120)");
    }

    #[test]
    fn unknown_table_yields_empty_schema() {
        let mut session = recipe_db();
        let schema = read_column_schemas(&mut session, "no_such_table").unwrap();
        assert!(schema.is_empty());
        assert!(read_column_order(&mut session, "no_such_table").unwrap().is_empty());
    }

    #[test]
    fn column_order_matches_schema_order_and_is_repeatable() {
        let mut session = recipe_db();
        let schema = read_column_schemas(&mut session, "recipe").unwrap();
        let first = read_column_order(&mut session, "recipe").unwrap();
        let second = read_column_order(&mut session, "recipe").unwrap();
        assert_eq!(first, second);
        assert_eq!(first, schema.column_names());
    }

    #[test]
    fn list_tables_is_sorted() {
        let mut session = recipe_db();
        assert_eq!(
            list_tables(&mut session).unwrap(),
            vec!["method_junc".to_string(), "recipe".to_string()]
        );
    }

    #[test]
    fn table_overview_reports_keys_defaults_and_count() {
        let mut session = recipe_db();
        let overview = table_overview(&mut session, "method_junc")
            .unwrap()
            .expect("table exists");
        assert_eq!(overview.row_count, 0);
        let keys = overview
            .columns
            .iter()
            .map(|c| (c.name.as_str(), c.key))
            .collect::<Vec<_>>();
        assert_eq!(
            keys,
            vec![
                ("method_junc_id", Some(KeyKind::Primary)),
                ("recipe_id", Some(KeyKind::Foreign)),
                ("note", None),
            ]
        );

        let recipe = table_overview(&mut session, "recipe").unwrap().unwrap();
        assert_eq!(recipe.row_count, 2);
        let name = &recipe.columns[1];
        assert!(!name.nullable);
        let yield_amt = &recipe.columns[3];
        assert!(yield_amt.nullable);
        assert_eq!(yield_amt.default.as_deref(), Some("1.0"));
        assert_eq!(recipe.columns[4].default, None);
    }

    #[test]
    fn table_overview_of_missing_table_is_none() {
        let mut session = recipe_db();
        assert!(table_overview(&mut session, "ghost").unwrap().is_none());
    }
}
