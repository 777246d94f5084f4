pub mod browse;
pub mod catalog;
pub mod cli;
pub mod data;
pub mod error;
pub mod ingest;
pub mod insert;
pub mod io_utils;
pub mod loader;
pub mod naming;
pub mod record;
pub mod session;
pub mod table;

use std::{env, sync::OnceLock};

use anyhow::Result;
use clap::Parser;
use log::{LevelFilter, debug};

use crate::cli::{Cli, Commands};

pub use crate::loader::{LoadConfig, LoadReport, LoadStatus, load_csv_into_table};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("csv_bulkload", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    debug!("Using database {:?}", cli.database);
    match &cli.command {
        Commands::Tables => browse::execute_tables(&cli.database),
        Commands::Describe(args) => browse::execute_describe(&cli.database, args),
        Commands::Load(args) => loader::execute(&cli.database, args),
    }
}

pub(crate) fn printable_delimiter(delimiter: u8) -> String {
    match delimiter {
        b',' => ",".to_string(),
        b'\t' => "\\t".to_string(),
        other => (other as char).to_string(),
    }
}
