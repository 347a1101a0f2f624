//! Decoding of `xl/styles.xml` into per-format cell styles.
use crate::error::RustyTablesError;
use crate::helpers::xml::XmlNodeHelper;
use crate::helpers::xml::XmlReader;
use crate::match_xml_events;
use crate::spreadsheet::cell::CellStyle;
use quick_xml::events::Event;
use std::io::BufRead;

// Containers; <dxfs> reuses the same child tags, so children only count inside these
const TAG_FONTS: &[u8] = b"fonts";
const TAG_FILLS: &[u8] = b"fills";
const TAG_BORDERS: &[u8] = b"borders";
const TAG_CELL_FORMATS: &[u8] = b"cellXfs";

const TAG_FONT: &[u8] = b"font";
const TAG_BOLD: &[u8] = b"b";
const TAG_FILL: &[u8] = b"fill";
const TAG_PATTERN_FILL: &[u8] = b"patternFill";
const TAG_GRADIENT_FILL: &[u8] = b"gradientFill";
const TAG_BORDER: &[u8] = b"border";
const TAG_CELL_FORMAT: &[u8] = b"xf";

/// Sides of a border record
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
struct BorderSides {
    left: bool,
    right: bool,
    top: bool,
    bottom: bool,
}

/// Font, fill and border references of one `cellXfs` entry
#[derive(Copy, Clone, Debug, Default)]
struct CellFormat {
    font_id: usize,
    fill_id: usize,
    border_id: usize,
}

#[derive(Copy, Clone, PartialEq, Eq)]
enum Section {
    None,
    Fonts,
    Fills,
    Borders,
    CellFormats,
}

/// Parses a styles part and resolves every `cellXfs` entry to a [`CellStyle`].
///
/// Index `i` of the result is the style selected by `s="i"` on a worksheet cell.
/// Dangling font, fill or border ids resolve to "no signal".
pub(crate) fn load_cell_styles<R: BufRead>(reader: &mut XmlReader<R>) -> Result<Vec<CellStyle>, RustyTablesError> {
    let mut section = Section::None;
    let mut in_font = false;
    let mut in_fill = false;
    let mut in_border = false;

    let mut fonts = Vec::<bool>::new();
    let mut fills = Vec::<bool>::new();
    let mut borders = Vec::<BorderSides>::new();
    let mut formats = Vec::<CellFormat>::new();

    match_xml_events!(reader => {
        Event::Start(event) if section == Section::None => {
            section = match event.local_name().as_ref() {
                TAG_FONTS => Section::Fonts,
                TAG_FILLS => Section::Fills,
                TAG_BORDERS => Section::Borders,
                TAG_CELL_FORMATS => Section::CellFormats,
                _ => Section::None,
            };
        }
        Event::End(event) if section != Section::None && matches!(
            event.local_name().as_ref(),
            TAG_FONTS | TAG_FILLS | TAG_BORDERS | TAG_CELL_FORMATS
        ) => {
            section = Section::None;
        }

        Event::Start(event) if section == Section::Fonts => {
            match event.local_name().as_ref() {
                TAG_FONT => {
                    in_font = true;
                    fonts.push(false);
                }
                TAG_BOLD if in_font => {
                    let bold = event.toggle_attribute_value("val")?;
                    if let Some(last) = fonts.last_mut() {
                        *last = bold;
                    }
                }
                _ => (),
            }
        }
        Event::End(event) if section == Section::Fonts && event.local_name().as_ref() == TAG_FONT => {
            in_font = false;
        }

        Event::Start(event) if section == Section::Fills => {
            match event.local_name().as_ref() {
                TAG_FILL => {
                    in_fill = true;
                    fills.push(false);
                }
                TAG_PATTERN_FILL if in_fill => {
                    let present = event.get_attribute_value("patternType")?
                        .map(|pattern| is_drawn(&pattern))
                        .unwrap_or(false);
                    if let Some(last) = fills.last_mut() {
                        *last = present;
                    }
                }
                TAG_GRADIENT_FILL if in_fill => {
                    if let Some(last) = fills.last_mut() {
                        *last = true;
                    }
                }
                _ => (),
            }
        }
        Event::End(event) if section == Section::Fills && event.local_name().as_ref() == TAG_FILL => {
            in_fill = false;
        }

        Event::Start(event) if section == Section::Borders => {
            let name = event.local_name();
            if name.as_ref() == TAG_BORDER {
                in_border = true;
                borders.push(BorderSides::default());
            } else if in_border {
                let drawn = event.get_attribute_value("style")?
                    .map(|style| is_drawn(&style))
                    .unwrap_or(false);
                if let Some(last) = borders.last_mut() {
                    match name.as_ref() {
                        b"left" | b"start" => last.left |= drawn,
                        b"right" | b"end" => last.right |= drawn,
                        b"top" => last.top |= drawn,
                        b"bottom" => last.bottom |= drawn,
                        _ => (),
                    }
                }
            }
        }
        Event::End(event) if section == Section::Borders && event.local_name().as_ref() == TAG_BORDER => {
            in_border = false;
        }

        Event::Start(event) if section == Section::CellFormats && event.local_name().as_ref() == TAG_CELL_FORMAT => {
            formats.push(CellFormat {
                font_id: event.parse_attribute_value("fontId")?.unwrap_or(0),
                fill_id: event.parse_attribute_value("fillId")?.unwrap_or(0),
                border_id: event.parse_attribute_value("borderId")?.unwrap_or(0),
            });
        }
    });

    Ok(formats
        .iter()
        .map(|format| {
            let sides = borders.get(format.border_id).copied().unwrap_or_default();
            CellStyle {
                border_left: sides.left,
                border_right: sides.right,
                border_top: sides.top,
                border_bottom: sides.bottom,
                bold: fonts.get(format.font_id).copied().unwrap_or(false),
                fill_present: fills.get(format.fill_id).copied().unwrap_or(false),
            }
        })
        .collect())
}

/// Pattern types and border styles are drawn unless empty or `none`.
fn is_drawn(value: &str) -> bool {
    let value = value.trim();
    !value.is_empty() && value != "none"
}
