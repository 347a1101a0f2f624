//! # DuckDB Table Detection Extension
//!
//! Finds the independent tables inside spreadsheet sheets that carry no
//! table metadata, using nothing but cell content and presentation: borders,
//! bold fonts and fills.
//!
//! Each cell of a sheet's used range gets an integer score, the cells with a
//! positive score are clustered with DBSCAN over a small grid of `eps` /
//! `min_samples` values, and every cluster of the best partition becomes an
//! inclusive, 1-based bounding box.
//!
//! ## Table Functions
//!
//! This extension registers two table functions:
//!
//! - `detect_tables`: one row per detected table, with its bounding box
//! - `detect_tables_report`: the whole workbook report as a JSON document
//!
//! ```sql
//! SELECT * FROM detect_tables('book.xlsx', eps_range := [1.0, 1.5], verbose := true);
//! ```
//!
//! ## Library Use
//!
//! The detector is also usable from Rust:
//!
//! ```rust,no_run
//! use rusty_tables::{analyze_workbook, DetectorConfig};
//!
//! let report = analyze_workbook("book.xlsx", &DetectorConfig::default())?;
//! println!("{}", report.to_json_pretty()?);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
extern crate duckdb;
extern crate duckdb_loadable_macros;
extern crate libduckdb_sys;

mod bridge;
pub mod detection;
pub mod error;
mod extension;
mod helpers;
pub mod spreadsheet;

pub use crate::detection::analyzer::analyze_sheet;
pub use crate::detection::analyzer::analyze_workbook;
pub use crate::detection::analyzer::SheetAnalysis;
pub use crate::detection::analyzer::SheetOutcome;
pub use crate::detection::analyzer::WorkbookAnalyzer;
pub use crate::detection::config::DetectorConfig;
pub use crate::detection::report::SheetReport;
pub use crate::detection::report::WorkbookReport;
pub use crate::detection::DetectionError;
pub use crate::error::RustyTablesError;

use crate::extension::detect_tables::DetectTablesTableFunction;
use crate::extension::detect_tables_report::DetectTablesReportTableFunction;
use anyhow::{Context, Result};
use duckdb::Connection;
use duckdb_loadable_macros::duckdb_entrypoint_c_api;
use libduckdb_sys as ffi;

/// Extension entry point for DuckDB.
///
/// Installs the logger (filtered by `RUST_LOG`; by default `warn`, plus the
/// `verbose` narration of this crate) and
/// registers the `detect_tables` and `detect_tables_report` table functions.
///
/// # Errors
///
/// Returns an error if either table function fails to register with DuckDB.
#[duckdb_entrypoint_c_api()]
pub unsafe fn extension_entrypoint(connection: Connection) -> Result<()> {
    let _ = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("rusty_tables=debug,warn"),
    )
    .try_init();
    connection
        .register_table_function::<DetectTablesTableFunction>("detect_tables")
        .context("Failed to register detect_tables table function")?;
    connection
        .register_table_function::<DetectTablesReportTableFunction>("detect_tables_report")
        .context("Failed to register detect_tables_report table function")?;
    Ok(())
}
