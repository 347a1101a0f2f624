//! Per-cell feature scoring.
use crate::spreadsheet::CellFeatures;
use crate::spreadsheet::SheetSource;
use log::warn;

/// Weight of a non-blank value
pub const CONTENT_WEIGHT: u32 = 1;
/// Weight of each drawn border side
pub const BORDER_SIDE_WEIGHT: u32 = 2;
/// Weight of a bold font, the usual mark of a header row
pub const BOLD_WEIGHT: u32 = 3;
/// Weight of a fill, often only decorative
pub const FILL_WEIGHT: u32 = 1;
/// Highest score a single cell can reach
pub const MAX_CELL_SCORE: u32 = CONTENT_WEIGHT + 4 * BORDER_SIDE_WEIGHT + BOLD_WEIGHT + FILL_WEIGHT;
/// Extents with more cells than this are reported before scoring starts
pub const LARGE_EXTENT_CELLS: usize = 10_000_000;

/// Weighted sum of the signals of one cell.
pub fn cell_score(features: &CellFeatures) -> u32 {
    let mut score = 0;
    if features.content_present {
        score += CONTENT_WEIGHT;
    }
    score += features.border_count() * BORDER_SIDE_WEIGHT;
    if features.bold {
        score += BOLD_WEIGHT;
    }
    if features.fill_present {
        score += FILL_WEIGHT;
    }
    score
}

/// Dense `rows × cols` matrix of cell scores, row-major.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScoreGrid {
    rows: usize,
    cols: usize,
    scores: Vec<u32>,
}

impl ScoreGrid {
    /// An empty `0 × 0` grid.
    pub fn empty() -> Self {
        Self {
            rows: 0,
            cols: 0,
            scores: Vec::new(),
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    /// Score at 0-based `(row, col)`, `None` outside the grid.
    pub fn get(&self, row: usize, col: usize) -> Option<u32> {
        if row < self.rows && col < self.cols {
            Some(self.scores[row * self.cols + col])
        } else {
            None
        }
    }

    /// Iterates `((row, col), score)` in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = ((usize, usize), u32)> + '_ {
        let cols = self.cols;
        self.scores
            .iter()
            .enumerate()
            .map(move |(index, score)| ((index / cols, index % cols), *score))
    }
}

/// Scores every cell in the used extent of a sheet.
/// A sheet with zero rows or columns yields an empty grid.
pub fn score_sheet<S: SheetSource + ?Sized>(sheet: &S) -> ScoreGrid {
    let (rows, cols) = sheet.extent();
    if rows == 0 || cols == 0 {
        return ScoreGrid::empty();
    }
    if is_large_extent(rows, cols) {
        warn!(
            "Sheet '{}' spans {} x {} cells; scoring its dense grid may take long",
            sheet.name(),
            rows,
            cols
        );
    }
    let mut scores = Vec::with_capacity(rows * cols);
    for row in 0..rows {
        for col in 0..cols {
            scores.push(cell_score(&sheet.features(row, col)));
        }
    }
    ScoreGrid { rows, cols, scores }
}

/// Whether a `rows × cols` extent exceeds [`LARGE_EXTENT_CELLS`].
pub fn is_large_extent(rows: usize, cols: usize) -> bool {
    rows.saturating_mul(cols) > LARGE_EXTENT_CELLS
}
