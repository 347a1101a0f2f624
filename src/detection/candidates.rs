use crate::detection::score::ScoreGrid;

/// A 0-based `(row, col)` grid coordinate.
pub type Point = (usize, usize);

/// Coordinates of every cell with a positive score, in row-major order.
pub fn extract_candidates(grid: &ScoreGrid) -> Vec<Point> {
    grid.iter()
        .filter(|(_, score)| *score > 0)
        .map(|(point, _)| point)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::score::score_sheet;
    use crate::spreadsheet::CellFeatures;
    use crate::spreadsheet::Sheet;

    #[test]
    fn keeps_positive_cells_in_row_major_order() {
        let mut sheet = Sheet::new("", "s");
        let content = CellFeatures {
            content_present: true,
            ..Default::default()
        };
        sheet.push(2, 0, content);
        sheet.push(0, 3, content);
        sheet.push(0, 1, content);
        sheet.push(1, 1, CellFeatures::default());

        let candidates = extract_candidates(&score_sheet(&sheet));
        assert_eq!(candidates, vec![(0, 1), (0, 3), (2, 0)]);
        assert_eq!(candidates, extract_candidates(&score_sheet(&sheet)));
    }

    #[test]
    fn blank_grid_has_no_candidates() {
        let mut sheet = Sheet::new("", "s");
        sheet.push(4, 4, CellFeatures::default());
        assert!(extract_candidates(&score_sheet(&sheet)).is_empty());
        assert!(extract_candidates(&ScoreGrid::empty()).is_empty());
    }
}
