use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::{insert::DEFAULT_BATCH_SIZE, loader::DEFAULT_PREVIEW_ROWS};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Browse a database schema and bulk-load CSV files into its tables",
    long_about = None
)]
pub struct Cli {
    /// SQLite database file to operate on
    #[arg(short = 'd', long = "database", env = "CSV_BULKLOAD_DATABASE")]
    pub database: PathBuf,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// List the tables in the database
    Tables,
    /// Show a table's columns, types, keys, and row count
    Describe(DescribeArgs),
    /// Load a CSV file into an existing table
    Load(LoadArgs),
}

#[derive(Debug, Args)]
pub struct DescribeArgs {
    /// Table to describe
    pub table: String,
    /// Print the overview as JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct LoadArgs {
    /// CSV file to load ('-' reads stdin)
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Destination table
    #[arg(short = 't', long = "table")]
    pub table: String,
    /// Maximum number of rows per INSERT statement
    #[arg(long = "batch-size", default_value_t = DEFAULT_BATCH_SIZE, value_parser = parse_batch_size)]
    pub batch_size: usize,
    /// Commit each batch on its own instead of wrapping the load in one transaction
    #[arg(long = "per-batch-commit")]
    pub per_batch_commit: bool,
    /// Fail the load when a cell cannot be read as its column's type
    #[arg(long)]
    pub strict: bool,
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the input file (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
    /// Parse the file and print the first records without inserting anything
    #[arg(long = "dry-run")]
    pub dry_run: bool,
    /// Number of parsed records to show in a dry run or the debug log
    #[arg(long = "preview-rows", default_value_t = DEFAULT_PREVIEW_ROWS)]
    pub preview_rows: usize,
    /// Print the load report as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn parse_batch_size(value: &str) -> Result<usize, String> {
    let parsed = value
        .trim()
        .parse::<usize>()
        .map_err(|_| format!("'{value}' is not a whole number"))?;
    if parsed == 0 {
        return Err("Batch size must be at least 1".to_string());
    }
    Ok(parsed)
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "|" | "pipe" => Ok(b'|'),
        ";" | "semicolon" => Ok(b';'),
        other => {
            let mut chars = other.chars();
            let first = chars
                .next()
                .ok_or_else(|| "Delimiter cannot be empty".to_string())?;
            if chars.next().is_some() {
                return Err("Delimiter must be a single character".to_string());
            }
            if !first.is_ascii() {
                return Err("Delimiter must be ASCII".to_string());
            }
            Ok(first as u8)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_batch_size_rejects_zero_and_garbage() {
        assert_eq!(parse_batch_size("250"), Ok(250));
        assert!(parse_batch_size("0").is_err());
        assert!(parse_batch_size("-3").is_err());
        assert!(parse_batch_size("many").is_err());
    }

    #[test]
    fn parse_delimiter_accepts_names() {
        assert_eq!(parse_delimiter("tab"), Ok(b'\t'));
        assert_eq!(parse_delimiter("pipe"), Ok(b'|'));
        assert_eq!(parse_delimiter(":"), Ok(b':'));
        assert!(parse_delimiter("::").is_err());
    }

    #[test]
    fn load_defaults_match_engine_defaults() {
        let cli = Cli::try_parse_from([
            "csv-bulkload",
            "--database",
            "food.db",
            "load",
            "-i",
            "items.csv",
            "-t",
            "item",
        ])
        .unwrap();
        match cli.command {
            Commands::Load(args) => {
                assert_eq!(args.batch_size, 1000);
                assert_eq!(args.preview_rows, 20);
                assert!(!args.per_batch_commit);
                assert!(!args.strict);
            }
            other => panic!("expected load command, got {other:?}"),
        }
    }
}
