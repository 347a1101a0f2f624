//! Serializable detection results.
//!
//! The JSON shape is:
//!
//! ```json
//! {
//!   "file_path": "book.xlsx",
//!   "sheets": [
//!     {
//!       "sheet_name": "Sheet1",
//!       "num_tables": 1,
//!       "parameters": { "eps": 1.0, "min_samples": 2 },
//!       "tables": [ { "table_id": 1, "bbox": [1, 1, 3, 4] } ]
//!     }
//!   ]
//! }
//! ```
use crate::detection::bbox::TableBoundingBox;
use crate::detection::search::ConfigurationResult;
use serde::Deserialize;
use serde::Serialize;

/// The DBSCAN parameters a sheet report was produced with.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Parameters {
    pub eps: f64,
    pub min_samples: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableEntry {
    /// 1-based position of the table in the sheet report
    pub table_id: usize,
    pub bbox: TableBoundingBox,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SheetReport {
    pub sheet_name: String,
    pub num_tables: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Parameters>,
    pub tables: Vec<TableEntry>,
}

impl SheetReport {
    /// Report of a sheet where nothing was found.
    pub fn empty(sheet_name: &str) -> Self {
        Self {
            sheet_name: sheet_name.to_string(),
            num_tables: 0,
            parameters: None,
            tables: Vec::new(),
        }
    }

    /// Report built from the chosen configuration; table ids follow the
    /// order of its bounding boxes.
    pub fn from_result(sheet_name: &str, result: &ConfigurationResult) -> Self {
        let tables: Vec<TableEntry> = result
            .bboxes
            .iter()
            .enumerate()
            .map(|(index, bbox)| TableEntry {
                table_id: index + 1,
                bbox: *bbox,
            })
            .collect();
        Self {
            sheet_name: sheet_name.to_string(),
            num_tables: tables.len(),
            parameters: Some(Parameters {
                eps: result.eps,
                min_samples: result.min_samples,
            }),
            tables,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WorkbookReport {
    pub file_path: String,
    pub sheets: Vec<SheetReport>,
}

impl WorkbookReport {
    pub fn total_tables(&self) -> usize {
        self.sheets.iter().map(|sheet| sheet.num_tables).sum()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::search::selection_score;

    #[test]
    fn json_shape() {
        let chosen = ConfigurationResult {
            eps: 1.5,
            min_samples: 3,
            num_tables: 2,
            num_outliers: 1,
            score: selection_score(2, 1),
            bboxes: vec![[1, 1, 3, 3].into(), [5, 1, 8, 2].into()],
        };
        let report = WorkbookReport {
            file_path: "book.xlsx".to_string(),
            sheets: vec![
                SheetReport::from_result("Data", &chosen),
                SheetReport::empty("Notes"),
            ],
        };
        assert_eq!(report.total_tables(), 2);
        assert_eq!(
            report.to_json().unwrap(),
            concat!(
                r#"{"file_path":"book.xlsx","sheets":["#,
                r#"{"sheet_name":"Data","num_tables":2,"parameters":{"eps":1.5,"min_samples":3},"#,
                r#""tables":[{"table_id":1,"bbox":[1,1,3,3]},{"table_id":2,"bbox":[5,1,8,2]}]},"#,
                r#"{"sheet_name":"Notes","num_tables":0,"tables":[]}]}"#,
            )
        );
    }

    #[test]
    fn parses_back() {
        let text = r#"{"file_path":"a.xlsx","sheets":[{"sheet_name":"S","num_tables":0,"tables":[]}]}"#;
        let report: WorkbookReport = serde_json::from_str(text).unwrap();
        assert_eq!(report.sheets[0], SheetReport::empty("S"));
        assert!(report.to_json_pretty().unwrap().contains("\n  \"sheets\""));
    }
}
