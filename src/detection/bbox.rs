use crate::detection::candidates::Point;
use crate::detection::dbscan::Label;
use serde::Deserialize;
use serde::Serialize;
use std::fmt;

/// Inclusive rectangle of a detected table, 1-based like spreadsheet rows
/// and columns.
///
/// Serialized as `[min_row, min_col, max_row, max_col]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "[usize; 4]", from = "[usize; 4]")]
pub struct TableBoundingBox {
    pub min_row: usize,
    pub min_col: usize,
    pub max_row: usize,
    pub max_col: usize,
}

impl TableBoundingBox {
    /// Box of a single 0-based grid point.
    fn around(point: Point) -> Self {
        let (row, col) = point;
        Self {
            min_row: row + 1,
            min_col: col + 1,
            max_row: row + 1,
            max_col: col + 1,
        }
    }

    fn extend(&mut self, point: Point) {
        let (row, col) = point;
        self.min_row = self.min_row.min(row + 1);
        self.min_col = self.min_col.min(col + 1);
        self.max_row = self.max_row.max(row + 1);
        self.max_col = self.max_col.max(col + 1);
    }

    pub fn height(&self) -> usize {
        self.max_row - self.min_row + 1
    }

    pub fn width(&self) -> usize {
        self.max_col - self.min_col + 1
    }

    /// Whether the 1-based cell `(row, col)` lies inside the box.
    pub fn contains(&self, row: usize, col: usize) -> bool {
        (self.min_row..=self.max_row).contains(&row) && (self.min_col..=self.max_col).contains(&col)
    }
}

impl From<TableBoundingBox> for [usize; 4] {
    fn from(bbox: TableBoundingBox) -> Self {
        [bbox.min_row, bbox.min_col, bbox.max_row, bbox.max_col]
    }
}

impl From<[usize; 4]> for TableBoundingBox {
    fn from([min_row, min_col, max_row, max_col]: [usize; 4]) -> Self {
        Self {
            min_row,
            min_col,
            max_row,
            max_col,
        }
    }
}

impl fmt::Display for TableBoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {}) - ({}, {})",
            self.min_row, self.min_col, self.max_row, self.max_col
        )
    }
}

/// One box per cluster, in ascending label order.
///
/// Noise points are ignored. Boxes are reported as found, even when two of
/// them overlap.
pub fn bounding_boxes(points: &[Point], labels: &[Label]) -> Vec<TableBoundingBox> {
    let mut boxes: Vec<Option<TableBoundingBox>> = Vec::new();
    for (point, label) in points.iter().zip(labels) {
        let Some(label) = *label else {
            continue;
        };
        if label >= boxes.len() {
            boxes.resize(label + 1, None);
        }
        match &mut boxes[label] {
            Some(bbox) => bbox.extend(*point),
            slot => *slot = Some(TableBoundingBox::around(*point)),
        }
    }
    boxes.into_iter().flatten().collect()
}
