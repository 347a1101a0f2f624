//! Runs table detection over every sheet of a workbook.
use crate::detection::candidates::extract_candidates;
use crate::detection::config::DetectorConfig;
use crate::detection::report::SheetReport;
use crate::detection::report::WorkbookReport;
use crate::detection::score::score_sheet;
use crate::detection::search::search;
use crate::detection::search::ConfigurationResult;
use crate::detection::DetectionError;
use crate::error::RustyTablesError;
use crate::spreadsheet::open_spreadsheet;
use crate::spreadsheet::open_spreadsheet_from_bytes;
use crate::spreadsheet::Sheet;
use crate::spreadsheet::SheetSource;
use crate::spreadsheet::Spreadsheet;
use log::debug;
use log::info;
use log::warn;

/// How the analysis of one sheet ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SheetOutcome {
    /// The sheet has no used rows or columns
    EmptySheet,
    /// Every cell of the used extent scored zero
    NoCandidateCells,
    /// No configuration of the grid found a table
    NoViableClustering,
    /// At least one table was found
    Detected,
}

/// Report of one sheet plus every configuration the search evaluated.
#[derive(Clone, Debug, PartialEq)]
pub struct SheetAnalysis {
    pub report: SheetReport,
    pub outcome: SheetOutcome,
    /// Evaluated configurations in canonical order; empty when clustering
    /// never ran
    pub diagnostics: Vec<ConfigurationResult>,
}

/// Scores, clusters and boxes a single sheet.
///
/// Nothing here fails: sheets without tables are reported with zero tables.
pub fn analyze_sheet<S: SheetSource + ?Sized>(sheet: &S, config: &DetectorConfig) -> SheetAnalysis {
    let name = sheet.name();
    if config.verbose {
        let (rows, cols) = sheet.extent();
        info!("Analyzing sheet '{}' ({} x {})", name, rows, cols);
    }

    let grid = score_sheet(sheet);
    if grid.is_empty() {
        if config.verbose {
            info!("Sheet '{}' is empty", name);
        }
        return SheetAnalysis {
            report: SheetReport::empty(name),
            outcome: SheetOutcome::EmptySheet,
            diagnostics: Vec::new(),
        };
    }

    let candidates = extract_candidates(&grid);
    if candidates.is_empty() {
        if config.verbose {
            info!("Sheet '{}' has no candidate cells", name);
        }
        return SheetAnalysis {
            report: SheetReport::empty(name),
            outcome: SheetOutcome::NoCandidateCells,
            diagnostics: Vec::new(),
        };
    }

    let outcome = search(&candidates, config);
    if outcome.truncated {
        warn!(
            "Sheet '{}': search stopped by time budget after {} configurations",
            name,
            outcome.results.len()
        );
    }
    if config.verbose {
        for result in &outcome.results {
            debug!(
                "Sheet '{}': eps={} min_samples={} tables={} outliers={} score={}",
                name, result.eps, result.min_samples, result.num_tables, result.num_outliers, result.score
            );
        }
    }

    let Some(best) = outcome.best() else {
        if config.verbose {
            info!("Sheet '{}': no configuration found a table among {} candidates", name, candidates.len());
        }
        return SheetAnalysis {
            report: SheetReport::empty(name),
            outcome: SheetOutcome::NoViableClustering,
            diagnostics: outcome.results,
        };
    };

    let report = SheetReport::from_result(name, best);
    if config.verbose {
        info!(
            "Sheet '{}': {} tables (eps={}, min_samples={})",
            name, report.num_tables, best.eps, best.min_samples
        );
        for table in &report.tables {
            info!("  table {}: {}", table.table_id, table.bbox);
        }
    }
    SheetAnalysis {
        report,
        outcome: SheetOutcome::Detected,
        diagnostics: outcome.results,
    }
}

/// Detects tables in whole workbooks with a fixed configuration.
#[derive(Clone, Debug)]
pub struct WorkbookAnalyzer {
    config: DetectorConfig,
}

impl WorkbookAnalyzer {
    /// Creates an analyzer; the configuration is validated up front.
    pub fn new(config: DetectorConfig) -> Result<Self, DetectionError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Analyzes the workbook at a local path or remote URL.
    pub fn analyze_path(&self, path: &str) -> Result<WorkbookReport, DetectionError> {
        if self.config.verbose {
            info!("Analyzing workbook '{}'", path);
        }
        let sheets = open_spreadsheet(path)
            .and_then(|mut spreadsheet| spreadsheet.read_sheets())
            .map_err(|error| load_failure(path, error))?;
        Ok(self.analyze_sheets(path, &sheets))
    }

    /// Analyzes a workbook package held in memory.
    pub fn analyze_bytes(&self, file_name: &str, bytes: Vec<u8>) -> Result<WorkbookReport, DetectionError> {
        if self.config.verbose {
            info!("Analyzing workbook '{}' ({} bytes)", file_name, bytes.len());
        }
        let sheets = open_spreadsheet_from_bytes(file_name, bytes)
            .and_then(|mut spreadsheet| spreadsheet.read_sheets())
            .map_err(|error| load_failure(file_name, error))?;
        Ok(self.analyze_sheets(file_name, &sheets))
    }

    /// Analyzes an already opened workbook.
    pub fn analyze_spreadsheet(&self, spreadsheet: &mut dyn Spreadsheet) -> Result<WorkbookReport, DetectionError> {
        let name = spreadsheet.name();
        let sheets = spreadsheet
            .read_sheets()
            .map_err(|error| load_failure(&name, error))?;
        Ok(self.analyze_sheets(&name, &sheets))
    }

    /// Analyzes loaded sheets in order; the report has one entry per sheet.
    pub fn analyze_sheets(&self, file_path: &str, sheets: &[Sheet]) -> WorkbookReport {
        let sheets: Vec<SheetReport> = sheets
            .iter()
            .map(|sheet| analyze_sheet(sheet, &self.config).report)
            .collect();
        let report = WorkbookReport {
            file_path: file_path.to_string(),
            sheets,
        };
        if self.config.verbose {
            info!(
                "Workbook '{}': {} tables in {} sheets",
                file_path,
                report.total_tables(),
                report.sheets.len()
            );
        }
        report
    }
}

/// Validates `config` and analyzes the workbook at `path`.
pub fn analyze_workbook(path: &str, config: &DetectorConfig) -> Result<WorkbookReport, DetectionError> {
    WorkbookAnalyzer::new(config.clone())?.analyze_path(path)
}

fn load_failure(path: &str, error: RustyTablesError) -> DetectionError {
    DetectionError::WorkbookLoadFailure {
        path: path.to_string(),
        source: Box::new(error),
    }
}
