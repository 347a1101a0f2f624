/// Presentation and content signals of a single cell, as seen by table detection.
///
/// Produced once per cell by a workbook reader; detection never looks at raw
/// cell values or style records directly.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct CellFeatures {
    /// The cell holds a value that is not blank after trimming
    pub content_present: bool,
    pub border_left: bool,
    pub border_right: bool,
    pub border_top: bool,
    pub border_bottom: bool,
    /// The cell font is bold
    pub bold: bool,
    /// The cell has any fill other than `none`
    pub fill_present: bool,
}

impl CellFeatures {
    /// Returns true if no signal is set.
    pub fn is_blank(&self) -> bool {
        *self == Self::default()
    }

    /// Number of border sides drawn around the cell.
    pub fn border_count(&self) -> u32 {
        [self.border_left, self.border_right, self.border_top, self.border_bottom]
            .iter()
            .filter(|side| **side)
            .count() as u32
    }

    /// Combines a cell format with the content flag of one cell.
    pub(crate) fn from_style(style: &CellStyle, content_present: bool) -> Self {
        Self {
            content_present,
            border_left: style.border_left,
            border_right: style.border_right,
            border_top: style.border_top,
            border_bottom: style.border_bottom,
            bold: style.bold,
            fill_present: style.fill_present,
        }
    }
}

/// Style-derived part of [`CellFeatures`], resolved once per `cellXfs` entry.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct CellStyle {
    pub(crate) border_left: bool,
    pub(crate) border_right: bool,
    pub(crate) border_top: bool,
    pub(crate) border_bottom: bool,
    pub(crate) bold: bool,
    pub(crate) fill_present: bool,
}

/// Returns true if a cached cell value counts as content.
pub(crate) fn is_content(value: &str) -> bool {
    !value.trim().is_empty()
}
