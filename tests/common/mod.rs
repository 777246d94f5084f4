#![allow(dead_code)]

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use csv_bulkload::{
    data::Value,
    error::SessionError,
    session::{Row, Session, SqliteSession},
};
use rusqlite::Connection;
use tempfile::{TempDir, tempdir};

/// Schema used across the loader tests; mirrors a slice of a recipe database.
pub const FOOD_SCHEMA: &str = "
    CREATE TABLE nutrient_lu (
        nutrient_id INTEGER PRIMARY KEY,
        name VARCHAR(80) NOT NULL
    );
    CREATE TABLE nutrition_junc (
        nut_junc_id INTEGER PRIMARY KEY,
        item_id INT NOT NULL,
        nutrient_id INT REFERENCES nutrient_lu(nutrient_id),
        nutrient_cat_id INT,
        ammount DOUBLE,
        unit_id INT
    );
    CREATE TABLE people (
        id INTEGER,
        name TEXT
    );
";

/// Returns the absolute path to a fixture under `tests/data`.
pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("data")
        .join(name)
}

/// Scratch directory helper that cleans up files automatically on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes `contents` into a file under the workspace and returns the path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        self.write_bytes(name, contents.as_bytes())
    }

    pub fn write_bytes(&self, name: &str, contents: &[u8]) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        let mut file = File::create(&path).expect("create temp file");
        file.write_all(contents).expect("write temp file contents");
        path
    }

    /// Creates a SQLite database file seeded with `ddl` and returns its path.
    pub fn database(&self, ddl: &str) -> PathBuf {
        let path = self.temp_dir.path().join("food.db");
        let conn = Connection::open(&path).expect("create database");
        conn.execute_batch(ddl).expect("apply schema");
        path
    }
}

pub fn memory_session(ddl: &str) -> SqliteSession {
    let session = SqliteSession::open_in_memory().expect("in-memory database");
    session
        .connection()
        .execute_batch(ddl)
        .expect("apply schema");
    session
}

/// Runs `sql` against the database file and returns every row as text.
pub fn query_file(path: &Path, sql: &str) -> Vec<Row> {
    let mut session = SqliteSession::open(path).expect("open database");
    session.query(sql, &[]).expect("query database")
}

pub fn text_rows(rows: &[&[Option<&str>]]) -> Vec<Row> {
    rows.iter()
        .map(|row| row.iter().map(|cell| cell.map(str::to_string)).collect())
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExecutedStatement {
    pub sql: String,
    pub params: Vec<Option<Value>>,
}

/// Session wrapper that records every statement and transaction call, and
/// can be told to fail a specific INSERT.
pub struct RecordingSession {
    inner: SqliteSession,
    pub executed: Vec<ExecutedStatement>,
    pub transactions: Vec<&'static str>,
    pub fail_insert_number: Option<usize>,
    inserts_seen: usize,
}

impl RecordingSession {
    pub fn new(inner: SqliteSession) -> Self {
        Self {
            inner,
            executed: Vec::new(),
            transactions: Vec::new(),
            fail_insert_number: None,
            inserts_seen: 0,
        }
    }

    pub fn failing_on_insert(inner: SqliteSession, insert_number: usize) -> Self {
        Self {
            fail_insert_number: Some(insert_number),
            ..Self::new(inner)
        }
    }

    pub fn inserts(&self) -> Vec<&ExecutedStatement> {
        self.executed
            .iter()
            .filter(|stmt| stmt.sql.starts_with("INSERT"))
            .collect()
    }

    pub fn inner_mut(&mut self) -> &mut SqliteSession {
        &mut self.inner
    }
}

impl Session for RecordingSession {
    fn query(&mut self, sql: &str, params: &[Option<Value>]) -> Result<Vec<Row>, SessionError> {
        self.inner.query(sql, params)
    }

    fn execute(&mut self, sql: &str, params: &[Option<Value>]) -> Result<usize, SessionError> {
        if sql.starts_with("INSERT") {
            self.inserts_seen += 1;
            if self.fail_insert_number == Some(self.inserts_seen) {
                return Err(SessionError::Backend(format!(
                    "injected failure on insert {}",
                    self.inserts_seen
                )));
            }
        }
        self.executed.push(ExecutedStatement {
            sql: sql.to_string(),
            params: params.to_vec(),
        });
        self.inner.execute(sql, params)
    }

    fn begin(&mut self) -> Result<(), SessionError> {
        self.transactions.push("begin");
        self.inner.begin()
    }

    fn commit(&mut self) -> Result<(), SessionError> {
        self.transactions.push("commit");
        self.inner.commit()
    }

    fn rollback(&mut self) -> Result<(), SessionError> {
        self.transactions.push("rollback");
        self.inner.rollback()
    }

    fn max_parameters(&self) -> Option<usize> {
        self.inner.max_parameters()
    }
}
