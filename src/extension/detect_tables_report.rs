use crate::detection::analyzer::WorkbookAnalyzer;
use crate::detection::DetectionError;
use crate::error::RustyTablesError;
use crate::extension::config_from_bind;
use crate::extension::named_parameters;
use crate::extension::writer::write_varchar;
use crate::extension::PathParam;
use duckdb::core::DataChunkHandle;
use duckdb::core::Inserter;
use duckdb::core::LogicalTypeHandle;
use duckdb::core::LogicalTypeId;
use duckdb::vtab::BindInfo;
use duckdb::vtab::InitInfo;
use duckdb::vtab::TableFunctionInfo;
use duckdb::vtab::VTab;
use log::warn;
use std::error::Error;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

#[repr(C)]
/// Binding data: the JSON report of one workbook, or why it could not be loaded
pub(crate) struct DetectTablesReportBindData {
    file_name: String,
    report: Option<String>,
    error: Option<String>,
}

impl DetectTablesReportBindData {
    /// Runs the analyzer; a workbook that cannot be loaded becomes an error
    /// message instead of a failed query.
    fn analyze(path: &str, analyzer: &WorkbookAnalyzer) -> Result<Self, RustyTablesError> {
        match analyzer.analyze_path(path) {
            Ok(report) => Ok(Self {
                file_name: path.to_owned(),
                report: Some(report.to_json_pretty()?),
                error: None,
            }),
            Err(error @ DetectionError::WorkbookLoadFailure { .. }) => {
                warn!("{}", error);
                Ok(Self {
                    file_name: path.to_owned(),
                    report: None,
                    error: Some(error.to_string()),
                })
            }
            Err(error) => Err(error.into()),
        }
    }
}

impl TryFrom<&BindInfo> for DetectTablesReportBindData {
    type Error = RustyTablesError;

    fn try_from(bind: &BindInfo) -> Result<Self, Self::Error> {
        let path = PathParam::read(bind, 0)?;
        let analyzer = WorkbookAnalyzer::new(config_from_bind(bind)?)?;
        Self::analyze(&path, &analyzer)
    }
}

#[repr(C)]
/// Initialization data for tracking iteration state across function calls
pub(crate) struct DetectTablesReportInitData {
    /// Whether the single row was already emitted
    index: AtomicUsize,
}

/// `detect_tables_report(path, ...)`: the workbook report as one JSON row
pub(crate) struct DetectTablesReportTableFunction;

impl VTab for DetectTablesReportTableFunction {
    type InitData = DetectTablesReportInitData;
    type BindData = DetectTablesReportBindData;

    fn bind(bind: &BindInfo) -> Result<Self::BindData, Box<dyn Error>> {
        let data = DetectTablesReportBindData::try_from(bind)?;
        bind.add_result_column("file_name", LogicalTypeHandle::from(LogicalTypeId::Varchar));
        bind.add_result_column("report", LogicalTypeHandle::from(LogicalTypeId::Varchar));
        bind.add_result_column("error", LogicalTypeHandle::from(LogicalTypeId::Varchar));
        Ok(data)
    }

    fn init(_: &InitInfo) -> Result<Self::InitData, Box<dyn Error>> {
        Ok(DetectTablesReportInitData {
            index: AtomicUsize::new(0),
        })
    }

    fn func(
        func: &TableFunctionInfo<Self>,
        output: &mut DataChunkHandle,
    ) -> Result<(), Box<dyn Error>> {
        let init = func.get_init_data();
        let bind = func.get_bind_data();
        if init.index.fetch_add(1, Ordering::Relaxed) == 0 {
            let files = output.flat_vector(0);
            let mut reports = output.flat_vector(1);
            let mut errors = output.flat_vector(2);
            files.insert(0, &bind.file_name);
            write_varchar(&mut reports, 0, bind.report.as_ref());
            write_varchar(&mut errors, 0, bind.error.as_ref());
            output.set_len(1);
        } else {
            output.set_len(0);
        }
        Ok(())
    }

    fn parameters() -> Option<Vec<LogicalTypeHandle>> {
        Some(vec![PathParam::kind()])
    }

    fn named_parameters() -> Option<Vec<(String, LogicalTypeHandle)>> {
        Some(named_parameters())
    }
}
