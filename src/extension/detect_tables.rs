use crate::detection::analyzer::WorkbookAnalyzer;
use crate::detection::report::WorkbookReport;
use crate::error::RustyTablesError;
use crate::extension::config_from_bind;
use crate::extension::named_parameters;
use crate::extension::writer::write_optional;
use crate::extension::writer::write_primitive;
use crate::extension::PathParam;
use duckdb::core::DataChunkHandle;
use duckdb::core::Inserter;
use duckdb::core::LogicalTypeHandle;
use duckdb::core::LogicalTypeId;
use duckdb::vtab::BindInfo;
use duckdb::vtab::InitInfo;
use duckdb::vtab::TableFunctionInfo;
use duckdb::vtab::VTab;
use std::error::Error;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

/// One output row: a detected table, or a sheet without tables
#[derive(Clone, Debug, PartialEq)]
struct TableRow {
    file_name: String,
    sheet_name: String,
    num_tables: i64,
    eps: Option<f64>,
    min_samples: Option<i64>,
    table_id: Option<i64>,
    /// `[min_row, min_col, max_row, max_col]`
    bbox: Option<[i64; 4]>,
}

/// Flattens a workbook report into rows; every sheet yields at least one row.
fn flatten(report: &WorkbookReport) -> Vec<TableRow> {
    let mut rows = Vec::new();
    for sheet in &report.sheets {
        let eps = sheet.parameters.map(|parameters| parameters.eps);
        let min_samples = sheet.parameters.map(|parameters| parameters.min_samples as i64);
        let row = TableRow {
            file_name: report.file_path.to_owned(),
            sheet_name: sheet.sheet_name.to_owned(),
            num_tables: sheet.num_tables as i64,
            eps,
            min_samples,
            table_id: None,
            bbox: None,
        };
        if sheet.tables.is_empty() {
            rows.push(row);
            continue;
        }
        for table in &sheet.tables {
            let bbox: [usize; 4] = table.bbox.into();
            rows.push(TableRow {
                table_id: Some(table.table_id as i64),
                bbox: Some(bbox.map(|value| value as i64)),
                ..row.clone()
            });
        }
    }
    rows
}

#[repr(C)]
/// Binding data holding every output row
pub(crate) struct DetectTablesBindData {
    rows: Vec<TableRow>,
}

impl TryFrom<&BindInfo> for DetectTablesBindData {
    type Error = RustyTablesError;

    /// Reads the parameters and runs the detection
    fn try_from(bind: &BindInfo) -> Result<Self, Self::Error> {
        let path = PathParam::read(bind, 0)?;
        let analyzer = WorkbookAnalyzer::new(config_from_bind(bind)?)?;
        let report = analyzer.analyze_path(&path)?;
        Ok(DetectTablesBindData {
            rows: flatten(&report),
        })
    }
}

#[repr(C)]
/// Initialization data for tracking iteration state across function calls
pub(crate) struct DetectTablesInitData {
    /// Atomic counter tracking the current position in the row vector
    index: AtomicUsize,
}

/// `detect_tables(path, ...)`: one row per detected table
pub(crate) struct DetectTablesTableFunction;

impl VTab for DetectTablesTableFunction {
    type InitData = DetectTablesInitData;
    type BindData = DetectTablesBindData;

    fn bind(bind: &BindInfo) -> Result<Self::BindData, Box<dyn Error>> {
        let data = DetectTablesBindData::try_from(bind)?;
        bind.add_result_column("file_name", LogicalTypeHandle::from(LogicalTypeId::Varchar));
        bind.add_result_column("sheet_name", LogicalTypeHandle::from(LogicalTypeId::Varchar));
        bind.add_result_column("num_tables", LogicalTypeHandle::from(LogicalTypeId::Bigint));
        bind.add_result_column("eps", LogicalTypeHandle::from(LogicalTypeId::Double));
        bind.add_result_column("min_samples", LogicalTypeHandle::from(LogicalTypeId::Bigint));
        bind.add_result_column("table_id", LogicalTypeHandle::from(LogicalTypeId::Bigint));
        for name in ["min_row", "min_col", "max_row", "max_col"] {
            bind.add_result_column(name, LogicalTypeHandle::from(LogicalTypeId::Bigint));
        }
        Ok(data)
    }

    fn init(_: &InitInfo) -> Result<Self::InitData, Box<dyn Error>> {
        Ok(DetectTablesInitData {
            index: AtomicUsize::new(0),
        })
    }

    fn func(
        func: &TableFunctionInfo<Self>,
        output: &mut DataChunkHandle,
    ) -> Result<(), Box<dyn Error>> {
        let init = func.get_init_data();
        let bind = func.get_bind_data();
        let lower = init.index.fetch_add(2048, Ordering::Relaxed);
        let upper = bind.rows.len().min(lower + 2048);
        if lower < upper {
            let files = output.flat_vector(0);
            let sheets = output.flat_vector(1);
            let mut counts = output.flat_vector(2);
            let mut eps = output.flat_vector(3);
            let mut min_samples = output.flat_vector(4);
            let mut table_ids = output.flat_vector(5);
            let mut bounds = [
                output.flat_vector(6),
                output.flat_vector(7),
                output.flat_vector(8),
                output.flat_vector(9),
            ];
            for index in lower..upper {
                let row = &bind.rows[index];
                let offset = index - lower;
                files.insert(offset, &row.file_name);
                sheets.insert(offset, &row.sheet_name);
                write_primitive(&mut counts, offset, row.num_tables);
                write_optional(&mut eps, offset, row.eps);
                write_optional(&mut min_samples, offset, row.min_samples);
                write_optional(&mut table_ids, offset, row.table_id);
                for (position, vector) in bounds.iter_mut().enumerate() {
                    write_optional(vector, offset, row.bbox.map(|bbox| bbox[position]));
                }
            }
            output.set_len(upper - lower);
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
