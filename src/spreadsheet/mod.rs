//! # Spreadsheet Reading Module
//!
//! Reads workbooks into [`Sheet`]s that carry, per cell, only what table
//! detection needs: whether the cell has content and which presentation
//! signals (borders, bold font, fill) apply to it.
//!
//! Office Open XML workbooks (`.xlsx`, `.xlsm`, `.xltx`, `.xltm`) are
//! supported, from local paths, remote URLs or in-memory buffers.
use crate::error::RustyTablesError;
use crate::helpers::reader::UnifiedReader;
use crate::spreadsheet::xlsx::XlsxSpreadsheet;
use std::path::Path;
use thiserror::Error;
use url::Url;

pub(crate) mod cell;
pub(crate) mod excel;
pub(crate) mod reference;
pub(crate) mod sheet;
pub(crate) mod styles;
pub(crate) mod xlsx;

pub use cell::CellFeatures;
pub use sheet::Sheet;
pub use sheet::SheetSource;

/// Errors raised while opening or reading a workbook.
#[derive(Error, Debug)]
pub enum SpreadsheetError {
    /// The file extension is not a supported workbook format
    #[error("Cannot detect file format for '{0}'")]
    UnsupportedFormat(String),

    /// The package is encrypted (or is a legacy binary workbook)
    #[error("Spreadsheet '{0}' is password protected")]
    PasswordProtected(String),

    /// The workbook lists no worksheets
    #[error("Spreadsheet '{0}' contains no worksheets")]
    EmptyWorkbook(String),

    /// A part referenced by the package is missing
    #[error("Missing package part '{0}'")]
    MissingPart(String),
}

/// A workbook opened for reading.
pub trait Spreadsheet {
    /// Returns the file name of this spreadsheet
    fn name(&self) -> String;

    /// Returns the sheet names in workbook order
    fn sheet_names(&self) -> Vec<String>;

    /// Reads every worksheet, in workbook order
    fn read_sheets(&mut self) -> Result<Vec<Sheet>, RustyTablesError>;
}

/// Opens a workbook from a local path or remote URL, choosing the reader by file extension.
pub fn open_spreadsheet(file_name: &str) -> Result<Box<dyn Spreadsheet>, RustyTablesError> {
    match extension_of(file_name).as_deref() {
        Some("xlsx" | "xlsm" | "xltx" | "xltm") => {
            let reader = UnifiedReader::new(file_name)?;
            Ok(Box::new(XlsxSpreadsheet::open(file_name, reader)?))
        }
        _ => Err(SpreadsheetError::UnsupportedFormat(file_name.to_owned()))?,
    }
}

/// Opens an Office Open XML workbook from an in-memory package.
/// `file_name` is only used to label the sheets and error messages.
pub fn open_spreadsheet_from_bytes(file_name: &str, bytes: Vec<u8>) -> Result<Box<dyn Spreadsheet>, RustyTablesError> {
    let reader = UnifiedReader::from_bytes(bytes);
    Ok(Box::new(XlsxSpreadsheet::open(file_name, reader)?))
}

/// Lower-cased file extension of a path or URL path.
fn extension_of(file_name: &str) -> Option<String> {
    let path = if UnifiedReader::is_remote_url(file_name) {
        Url::parse(file_name).ok()?.path().to_owned()
    } else {
        file_name.to_owned()
    };
    Path::new(&path)
        .extension()
        .map(|extension| extension.to_string_lossy().to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_extensions() {
        assert_eq!(extension_of("book.XLSX").as_deref(), Some("xlsx"));
        assert_eq!(extension_of("/tmp/report.xlsm").as_deref(), Some("xlsm"));
        assert_eq!(extension_of("https://host/data/book.xlsx?token=abc").as_deref(), Some("xlsx"));
        assert_eq!(extension_of("notes"), None);
    }

    #[test]
    fn rejects_unsupported_formats() {
        let error = open_spreadsheet("legacy.xls").err().unwrap();
        assert!(matches!(
            error,
            RustyTablesError::SpreadsheetError(SpreadsheetError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(open_spreadsheet("does/not/exist.xlsx").is_err());
    }
}
