//! # Table Detection
//!
//! Finds rectangular tables in a sheet that carries no table metadata, using
//! only cell content and presentation (borders, bold font, fill).
//!
//! The pipeline runs leaf-first:
//!
//! 1. [`score`] turns every cell of the used extent into an integer signal.
//! 2. [`candidates`] keeps the coordinates with a positive score.
//! 3. [`search`] clusters the candidates with DBSCAN ([`dbscan`]) over a grid
//!    of `eps` / `min_samples` values and picks the best partition.
//! 4. [`bbox`] reduces each cluster to an inclusive 1-based rectangle.
//! 5. [`analyzer`] runs the above for every sheet of a workbook and builds
//!    the [`report`].
use crate::error::RustyTablesError;
use thiserror::Error;

pub mod analyzer;
pub mod bbox;
pub mod candidates;
pub mod config;
pub mod dbscan;
pub mod report;
pub mod score;
pub mod search;

/// Errors that abort a whole detection call.
///
/// Sheets that are empty, have no candidate cells, or cluster into nothing
/// are not errors; they are reported with zero tables.
#[derive(Error, Debug)]
pub enum DetectionError {
    /// The detector configuration describes an empty or invalid search grid
    #[error("Invalid detector configuration: {0}")]
    InvalidConfig(String),

    /// The workbook could not be opened or parsed
    #[error("Cannot load workbook '{path}': {source}")]
    WorkbookLoadFailure {
        path: String,
        source: Box<RustyTablesError>,
    },
}
