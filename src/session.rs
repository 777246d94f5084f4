//! Database session seam.
//!
//! The catalog reader and the insert engine only ever talk to a [`Session`]:
//! positional parameters in, rows of text-convertible cells out. The shipped
//! implementation wraps a SQLite connection.

use std::path::Path;

use log::debug;
use rusqlite::{
    Connection, OpenFlags, params_from_iter,
    types::{Value as SqlValue, ValueRef},
};

use crate::{data::Value, error::SessionError};

/// One result row, cells in select-list order. `None` is SQL NULL.
pub type Row = Vec<Option<String>>;

/// Default bound-parameter ceiling of SQLite builds since 3.32.
const SQLITE_MAX_VARIABLE_NUMBER: usize = 32_766;

pub trait Session {
    fn query(&mut self, sql: &str, params: &[Option<Value>]) -> Result<Vec<Row>, SessionError>;

    fn execute(&mut self, sql: &str, params: &[Option<Value>]) -> Result<usize, SessionError>;

    fn begin(&mut self) -> Result<(), SessionError> {
        self.execute("BEGIN", &[]).map(|_| ())
    }

    fn commit(&mut self) -> Result<(), SessionError> {
        self.execute("COMMIT", &[]).map(|_| ())
    }

    fn rollback(&mut self) -> Result<(), SessionError> {
        self.execute("ROLLBACK", &[]).map(|_| ())
    }

    /// Largest number of parameters a single statement may bind, if bounded.
    fn max_parameters(&self) -> Option<usize> {
        None
    }
}

pub struct SqliteSession {
    conn: Connection,
}

impl SqliteSession {
    /// Opens an existing database file. A missing file is an error rather
    /// than a freshly created empty database.
    pub fn open(path: &Path) -> Result<Self, SessionError> {
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_URI
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let conn = Connection::open_with_flags(path, flags)?;
        let session = Self { conn };
        session.ping()?;
        debug!("Opened SQLite database {path:?}");
        Ok(session)
    }

    pub fn open_in_memory() -> Result<Self, SessionError> {
        Ok(Self {
            conn: Connection::open_in_memory()?,
        })
    }

    pub fn from_connection(conn: Connection) -> Self {
        Self { conn }
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    fn ping(&self) -> Result<(), SessionError> {
        self.conn
            .query_row("PRAGMA schema_version", [], |_| Ok(()))?;
        Ok(())
    }
}

impl Session for SqliteSession {
    fn query(&mut self, sql: &str, params: &[Option<Value>]) -> Result<Vec<Row>, SessionError> {
        let mut stmt = self.conn.prepare(sql)?;
        let column_count = stmt.column_count();
        let mut rows = stmt.query(params_from_iter(params.iter().map(to_sql_value)))?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let mut cells = Vec::with_capacity(column_count);
            for idx in 0..column_count {
                cells.push(cell_text(row.get_ref(idx)?));
            }
            out.push(cells);
        }
        Ok(out)
    }

    fn execute(&mut self, sql: &str, params: &[Option<Value>]) -> Result<usize, SessionError> {
        let mut stmt = self.conn.prepare_cached(sql)?;
        let affected = stmt.execute(params_from_iter(params.iter().map(to_sql_value)))?;
        Ok(affected)
    }

    fn begin(&mut self) -> Result<(), SessionError> {
        self.conn.execute_batch("BEGIN")?;
        Ok(())
    }

    fn commit(&mut self) -> Result<(), SessionError> {
        self.conn.execute_batch("COMMIT")?;
        Ok(())
    }

    fn rollback(&mut self) -> Result<(), SessionError> {
        self.conn.execute_batch("ROLLBACK")?;
        Ok(())
    }

    fn max_parameters(&self) -> Option<usize> {
        Some(SQLITE_MAX_VARIABLE_NUMBER)
    }
}

/// Double-quotes an identifier for interpolation into SQL text.
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn to_sql_value(value: &Option<Value>) -> SqlValue {
    match value {
        None => SqlValue::Null,
        Some(Value::Integer(i)) => SqlValue::Integer(*i),
        Some(Value::Float(f)) => SqlValue::Real(*f),
        Some(Value::Text(s)) => SqlValue::Text(s.clone()),
    }
}

fn cell_text(value: ValueRef<'_>) -> Option<String> {
    match value {
        ValueRef::Null => None,
        ValueRef::Integer(i) => Some(i.to_string()),
        ValueRef::Real(f) => Some(f.to_string()),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
            Some(String::from_utf8_lossy(bytes).into_owned())
        }
    }
}
