//! Schema browsing commands: table listing and per-table overview.

use std::path::Path;

use anyhow::{Context, Result, anyhow};
use log::info;

use crate::{
    catalog::{self, TableOverview},
    cli::DescribeArgs,
    session::SqliteSession,
    table,
};

const NOT_APPLICABLE: &str = "N/A";

pub fn execute_tables(database: &Path) -> Result<()> {
    let mut session = open(database)?;
    let tables = catalog::list_tables(&mut session)
        .with_context(|| format!("Listing tables in {database:?}"))?;
    if tables.is_empty() {
        info!("Database {database:?} has no tables");
        return Ok(());
    }
    for name in &tables {
        println!("{name}");
    }
    info!("Listed {} table(s) from {database:?}", tables.len());
    Ok(())
}

pub fn execute_describe(database: &Path, args: &DescribeArgs) -> Result<()> {
    let mut session = open(database)?;
    let overview = catalog::table_overview(&mut session, &args.table)
        .with_context(|| format!("Reading catalog for '{}'", args.table))?
        .ok_or_else(|| anyhow!("Table '{}' was not found", args.table))?;

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&overview).context("Serializing table overview")?
        );
    } else {
        println!("{} ({} row(s))", overview.name, overview.row_count);
        table::print_table(&overview_headers(), &overview_rows(&overview));
    }
    info!(
        "Described {} column(s) of '{}'",
        overview.columns.len(),
        overview.name
    );
    Ok(())
}

fn open(database: &Path) -> Result<SqliteSession> {
    SqliteSession::open(database).with_context(|| format!("Opening database {database:?}"))
}

fn overview_headers() -> Vec<String> {
    ["#", "name", "type", "nullable", "default", "key"]
        .iter()
        .map(|h| h.to_string())
        .collect()
}

fn overview_rows(overview: &TableOverview) -> Vec<Vec<String>> {
    overview
        .columns
        .iter()
        .enumerate()
        .map(|(idx, column)| {
            vec![
                (idx + 1).to_string(),
                column.name.clone(),
                column.data_type.clone(),
                if column.nullable { "YES" } else { "NO" }.to_string(),
                column
                    .default
                    .clone()
                    .unwrap_or_else(|| NOT_APPLICABLE.to_string()),
                column
                    .key
                    .map(|key| key.to_string())
                    .unwrap_or_else(|| NOT_APPLICABLE.to_string()),
            ]
        })
        .collect()
}
