use crate::spreadsheet::cell::CellFeatures;
use std::collections::HashMap;

/// Read access to one sheet, as needed by table detection.
///
/// Coordinates are 0-based. The used extent always starts at the first row
/// and column, so a sheet whose last used cell is `D10` has extent `(10, 4)`.
pub trait SheetSource {
    /// Sheet name as listed in the workbook
    fn name(&self) -> &str;

    /// Used extent as `(max_row, max_col)`; `(0, 0)` for a sheet without cells
    fn extent(&self) -> (usize, usize);

    /// Features of the cell at `(row, col)`; cells never written are blank
    fn features(&self, row: usize, col: usize) -> CellFeatures;
}

/// A sheet read from a workbook, with cell features stored sparsely.
#[derive(Clone, Debug, Default)]
pub struct Sheet {
    /// Source file name
    pub(crate) file_name: String,
    /// Sheet name
    pub(crate) name: String,
    /// Non-blank cells by 0-based (row, col)
    cells: HashMap<(usize, usize), CellFeatures>,
    /// Used extent, 1-based inclusive
    max_row: usize,
    max_col: usize,
}

impl Sheet {
    /// Creates an empty sheet.
    pub fn new(file_name: &str, name: &str) -> Self {
        Self {
            file_name: file_name.to_owned(),
            name: name.to_owned(),
            ..Default::default()
        }
    }

    /// Builds a sheet from rows of features, row 0 first.
    /// Ragged rows are allowed; the extent is the longest row.
    pub fn from_rows(name: &str, rows: Vec<Vec<CellFeatures>>) -> Self {
        let mut sheet = Self::new("", name);
        for (row, cells) in rows.into_iter().enumerate() {
            for (col, features) in cells.into_iter().enumerate() {
                sheet.push(row, col, features);
            }
        }
        sheet
    }

    /// Source file name.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Returns true if no cell was ever pushed.
    pub fn is_empty(&self) -> bool {
        self.max_row == 0 || self.max_col == 0
    }

    /// Records a cell at 0-based `(row, col)`.
    /// Blank cells still widen the used extent, like a styled but empty cell does.
    pub fn push(&mut self, row: usize, col: usize, features: CellFeatures) {
        self.update_bound(row, col);
        if features.is_blank() {
            self.cells.remove(&(row, col));
        } else {
            self.cells.insert((row, col), features);
        }
    }

    /// Applies a merged range spanning `first` to `last`, both 0-based and
    /// inclusive.
    ///
    /// Every covered cell but the top-left one loses its own content and
    /// style and counts as part of the used extent. Cells on the edges of the
    /// range inherit the top-left cell's border on the matching side.
    pub fn merge(&mut self, first: (usize, usize), last: (usize, usize)) {
        let anchor = self.features(first.0, first.1);
        for row in first.0..=last.0 {
            for col in first.1..=last.1 {
                if (row, col) == first {
                    continue;
                }
                let features = CellFeatures {
                    border_top: anchor.border_top && row == first.0,
                    border_bottom: anchor.border_bottom && row == last.0,
                    border_left: anchor.border_left && col == first.1,
                    border_right: anchor.border_right && col == last.1,
                    ..Default::default()
                };
                self.push(row, col, features);
            }
        }
    }

    /// Extends the used extent to include a cell.
    fn update_bound(&mut self, row: usize, col: usize) {
        self.max_row = self.max_row.max(row + 1);
        self.max_col = self.max_col.max(col + 1);
    }
}

impl SheetSource for Sheet {
    fn name(&self) -> &str {
        &self.name
    }

    fn extent(&self) -> (usize, usize) {
        (self.max_row, self.max_col)
    }

    fn features(&self, row: usize, col: usize) -> CellFeatures {
        self.cells.get(&(row, col)).copied().unwrap_or_default()
    }
}
