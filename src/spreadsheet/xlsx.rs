use crate::error::ResultMessage;
use crate::error::RustyTablesError;
use crate::helpers::reader::UnifiedReader;
use crate::helpers::xml::XmlAttributeHelper;
use crate::helpers::xml::XmlNodeHelper;
use crate::helpers::xml::XmlReader;
use crate::helpers::xml::XmlTextContextHelper;
use crate::helpers::zip::ZipHelper;
use crate::match_xml_events;
use crate::spreadsheet::cell::is_content;
use crate::spreadsheet::cell::CellFeatures;
use crate::spreadsheet::cell::CellStyle;
use crate::spreadsheet::excel;
use crate::spreadsheet::excel::load_relationships;
use crate::spreadsheet::reference::index_to_reference;
use crate::spreadsheet::reference::range_to_indexes;
use crate::spreadsheet::reference::reference_to_index;
use crate::spreadsheet::sheet::Sheet;
use crate::spreadsheet::styles::load_cell_styles;
use crate::spreadsheet::Spreadsheet;
use crate::spreadsheet::SpreadsheetError;
use log::trace;
use quick_xml::events::Event;
use std::borrow::Cow;
use std::io::BufRead;
use zip::ZipArchive;

// XML tag names (local names) for parsing Office Open XML parts
const TAG_SHARED_STRING_ITEM: &[u8] = b"si"; // Shared string table item
const TAG_PHONETIC_TEXT: &[u8] = b"rPh";     // Phonetic text for Asian languages
const TAG_TEXT: &[u8] = b"t";                // Text content within strings
const TAG_SHEET: &[u8] = b"sheet";           // Worksheet definition
const TAG_ROW: &[u8] = b"row";               // Row in worksheet
const TAG_CELL: &[u8] = b"c";                // Cell in worksheet
const TAG_INLINE_STRING: &[u8] = b"is";      // Inline string value
const TAG_VALUE: &[u8] = b"v";               // Cached cell value
const TAG_MERGE_CELL: &[u8] = b"mergeCell";  // Merged cell range

/// How the cached value of a cell is stored
#[derive(Copy, Clone, Debug, Default, PartialEq)]
enum ValueKind {
    /// Value text is the value itself
    #[default]
    Literal,
    /// Value text is an index into the shared string table
    SharedString,
}

/// Represents an Office Open XML workbook
pub(crate) struct XlsxSpreadsheet {
    /// File name of the spreadsheet
    pub(crate) name: String,
    /// ZIP archive containing the package parts
    zip: ZipArchive<UnifiedReader>,
    /// Resolved cell styles, indexed by the `s` attribute of a cell
    styles: Vec<CellStyle>,
    /// List of worksheets with (name, zip_path) pairs
    sheets: Vec<(String, String)>,
}

impl XlsxSpreadsheet {
    /// Opens a workbook package and parses its structure and styles
    pub(crate) fn open(file_name: &str, reader: UnifiedReader) -> Result<XlsxSpreadsheet, RustyTablesError> {
        let (mut zip, sheets) = excel::open(file_name, reader, load_workbook)?;
        let styles = match zip.xml_reader("xl/styles.xml")? {
            Some(mut reader) => load_cell_styles(&mut reader).with_prefix("xl/styles.xml")?,
            None => Vec::new(),
        };
        Ok(XlsxSpreadsheet {
            name: file_name.to_owned(),
            zip,
            styles,
            sheets,
        })
    }

    /// Loads the shared string table as "has content" flags.
    /// Only blankness matters to detection, so the texts are dropped right away.
    fn load_shared_string_flags(&mut self) -> Result<Vec<bool>, RustyTablesError> {
        let mut flags = Vec::<bool>::new();
        let mut reader = match self.zip.xml_reader("xl/sharedStrings.xml")? {
            Some(reader) => reader,
            None => return Ok(flags),
        };

        match_xml_events!(reader => {
            Event::Start(event) if event.local_name().as_ref() == TAG_SHARED_STRING_ITEM => {
                let string = read_string_value(&mut reader, TAG_SHARED_STRING_ITEM, false)?;
                flags.push(is_content(&string));
            }
        });
        Ok(flags)
    }
}

impl Spreadsheet for XlsxSpreadsheet {
    fn name(&self) -> String {
        self.name.to_owned()
    }

    fn sheet_names(&self) -> Vec<String> {
        self.sheets.iter().map(|(name, _)| name.to_owned()).collect()
    }

    /// Reads every worksheet into a [`Sheet`] of cell features.
    ///
    /// Every `<c>` element widens the used extent, even without a value, so
    /// the extent matches what spreadsheet applications report as used range.
    /// Merged ranges are applied once the cells are read; see [`Sheet::merge`].
    fn read_sheets(&mut self) -> Result<Vec<Sheet>, RustyTablesError> {
        let shared_strings = self.load_shared_string_flags().with_prefix("xl/sharedStrings.xml")?;
        let mut sheets = Vec::<Sheet>::with_capacity(self.sheets.len());
        for (sheet_name, zip_path) in &self.sheets {
            let mut sheet = Sheet::new(&self.name, sheet_name);
            let mut row_count = 0usize;
            let mut col_count = 0usize;
            let mut row = 0usize;
            let mut col = 0usize;
            let mut style = CellStyle::default();
            let mut kind = ValueKind::default();
            let mut value = String::new();
            let mut merges = Vec::new();
            let mut reader = self.zip.xml_reader(zip_path)?
                .ok_or_else(|| SpreadsheetError::MissingPart(zip_path.to_owned()))?;
            match_xml_events!(reader => {
                Event::Start(event) if event.local_name().as_ref() == TAG_ROW => {
                    if let Some(number) = event.parse_attribute_value::<usize>("r")? {
                        row_count = number.saturating_sub(1);
                    }
                    col_count = 0;
                }
                Event::End(event) if event.local_name().as_ref() == TAG_ROW => {
                    row_count += 1;
                    col_count = 0;
                }
                Event::Start(event) if event.local_name().as_ref() == TAG_CELL => {
                    (row, col) = event.get_attribute_value("r")?
                        .and_then(|reference| reference_to_index(&reference))
                        .unwrap_or((row_count, col_count));
                    col_count = col + 1;
                    kind = match event.get_attribute_value("t")?.as_deref() {
                        Some("s") => ValueKind::SharedString,
                        _ => ValueKind::Literal,
                    };
                    let index = event.parse_attribute_value::<usize>("s")?.unwrap_or(0);
                    style = self.styles.get(index).copied().unwrap_or_else(|| {
                        if index > 0 {
                            trace!("{}: cell {} references unknown style {}", sheet_name, index_to_reference(row, col), index);
                        }
                        CellStyle::default()
                    });
                    value.clear();
                }
                Event::Start(event) if event.local_name().as_ref() == TAG_INLINE_STRING => {
                    value = read_string_value(&mut reader, TAG_INLINE_STRING, false)?;
                }
                Event::Start(event) if event.local_name().as_ref() == TAG_VALUE => {
                    value = read_string_value(&mut reader, TAG_VALUE, true)?;
                }
                Event::End(event) if event.local_name().as_ref() == TAG_CELL => {
                    let content_present = match kind {
                        ValueKind::SharedString => value
                            .trim()
                            .parse::<usize>()
                            .ok()
                            .and_then(|index| shared_strings.get(index).copied())
                            .unwrap_or(false),
                        ValueKind::Literal => is_content(&value),
                    };
                    sheet.push(row, col, CellFeatures::from_style(&style, content_present));
                    value.clear();
                },
                Event::Start(event) if event.local_name().as_ref() == TAG_MERGE_CELL => {
                    if let Some(range) = event.get_attribute_value("ref")?.and_then(|range| range_to_indexes(&range)) {
                        merges.push(range);
                    }
                },
            });
            for (first, last) in merges {
                sheet.merge(first, last);
            }
            sheets.push(sheet);
        }

        Ok(sheets)
    }
}

/// Lists worksheets of the package in workbook order
///
/// Parses `xl/workbook.xml` and resolves each sheet's relationship id to
/// the worksheet part path. Sheets whose relationship is not a worksheet
/// (chartsheets, dialog sheets) are skipped.
fn load_workbook(zip: &mut ZipArchive<UnifiedReader>) -> Result<Vec<(String, String)>, RustyTablesError> {
    let relationships = load_relationships(zip, "xl/_rels/workbook.xml.rels")?;
    let mut reader = zip.xml_reader("xl/workbook.xml")?
        .ok_or_else(|| SpreadsheetError::MissingPart("xl/workbook.xml".to_string()))?;
    let mut sheets: Vec<(String, String)> = Vec::new();
    match_xml_events!(reader => {
        Event::Start(event) if event.local_name().as_ref() == TAG_SHEET => {
            let mut name = None::<Cow<str>>;
            let mut id = None::<Cow<str>>;
            for result in event.attributes() {
                let attribute = result?;
                let key = attribute.key.local_name();
                if key.as_ref() == b"name" {
                    name = Some(attribute.get_value()?);
                } else if key.as_ref() == b"id" {
                    id = Some(attribute.get_value()?);
                }
            }
            if let Some((name, id)) = name.zip(id) {
                if let Some(path) = relationships.get(&*id) {
                    sheets.push((name.to_string(), path.to_owned()));
                }
            }
        }
    });
    Ok(sheets)
}

/// Reads string value from XML content, handling text and CDATA sections
///
/// Extracts string content up to `end_tag`, skipping phonetic text
/// annotations. With `is_text_content` the element text itself is the
/// value (`<v>`); otherwise only `<t>` runs count (`<si>`, `<is>`).
fn read_string_value<R: BufRead>(
    reader: &mut XmlReader<R>,
    end_tag: &[u8],
    is_text_content: bool,
) -> Result<String, RustyTablesError> {
    let mut is_phonetic_text = false;
    let mut is_text = is_text_content;
    let mut text = String::new();
    match_xml_events!(reader => {
        Event::End(event) if event.local_name().as_ref() == end_tag => break,
        Event::Start(event) if event.local_name().as_ref() == TAG_PHONETIC_TEXT => is_phonetic_text = true,
        Event::End(event) if event.local_name().as_ref() == TAG_PHONETIC_TEXT => is_phonetic_text = false,
        Event::Start(event) if !is_phonetic_text && event.local_name().as_ref() == TAG_TEXT => is_text = true,
        Event::End(event) if is_text && event.local_name().as_ref() == TAG_TEXT => is_text = false,
        Event::Text(event) if is_text => text.push_str(&event.xml_content()?),
        Event::CData(event) if is_text => text.push_str(&event.xml_content()?),
        Event::GeneralRef(event) if is_text => text.push_bytes_ref(&event)?,
    });
    Ok(text)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::spreadsheet::open_spreadsheet;
    use crate::spreadsheet::open_spreadsheet_from_bytes;
    use crate::spreadsheet::SheetSource;
    use std::io::Cursor;
    use std::io::Write;
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    pub(crate) const STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
  <fonts count="2"><font><sz val="11"/></font><font><b/></font></fonts>
  <fills count="3">
    <fill><patternFill patternType="none"/></fill>
    <fill><patternFill patternType="gray125"/></fill>
    <fill><patternFill patternType="solid"><fgColor rgb="FFDDDDDD"/></patternFill></fill>
  </fills>
  <borders count="2">
    <border><left/><right/><top/><bottom/><diagonal/></border>
    <border><left style="thin"/><right style="thin"/><top style="thin"/><bottom style="thin"/><diagonal/></border>
  </borders>
  <cellXfs count="4">
    <xf numFmtId="0" fontId="0" fillId="0" borderId="0"/>
    <xf numFmtId="0" fontId="1" fillId="0" borderId="1"/>
    <xf numFmtId="0" fontId="0" fillId="2" borderId="0"/>
    <xf numFmtId="0" fontId="0" fillId="0" borderId="1"/>
  </cellXfs>
</styleSheet>"#;

    /// Builds a workbook package in memory from (sheet name, sheetData xml) pairs.
    pub(crate) fn build_workbook(sheets: &[(&str, &str)], shared_strings: &[&str]) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default();

        let mut workbook = String::from(
            r#"<?xml version="1.0" encoding="UTF-8"?><workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets>"#,
        );
        let mut relationships = String::from(
            r#"<?xml version="1.0" encoding="UTF-8"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
        );
        for (index, (name, _)) in sheets.iter().enumerate() {
            workbook.push_str(&format!(r#"<sheet name="{}" sheetId="{}" r:id="rId{}"/>"#, name, index + 1, index + 1));
            relationships.push_str(&format!(
                r#"<Relationship Id="rId{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet{}.xml"/>"#,
                index + 1,
                index + 1
            ));
        }
        workbook.push_str("</sheets></workbook>");
        relationships.push_str(&format!(
            r#"<Relationship Id="rId{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/></Relationships>"#,
            sheets.len() + 1
        ));

        let mut parts = vec![
            ("xl/workbook.xml".to_string(), workbook),
            ("xl/_rels/workbook.xml.rels".to_string(), relationships),
            ("xl/styles.xml".to_string(), STYLES.to_string()),
        ];
        if !shared_strings.is_empty() {
            let items = shared_strings
                .iter()
                .map(|text| format!("<si><t xml:space=\"preserve\">{text}</t></si>"))
                .collect::<String>();
            parts.push((
                "xl/sharedStrings.xml".to_string(),
                format!(r#"<sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">{items}</sst>"#),
            ));
        }
        for (index, (_, data)) in sheets.iter().enumerate() {
            // bodies that bring their own sheetData may append other sections
            let body = if data.starts_with("<sheetData") {
                data.to_string()
            } else {
                format!("<sheetData>{data}</sheetData>")
            };
            parts.push((
                format!("xl/worksheets/sheet{}.xml", index + 1),
                format!(r#"<?xml version="1.0" encoding="UTF-8"?><worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">{body}</worksheet>"#),
            ));
        }
        for (path, content) in parts {
            writer.start_file(path, options).unwrap();
            writer.write_all(content.as_bytes()).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    fn read(sheets: &[(&str, &str)], shared_strings: &[&str]) -> Vec<Sheet> {
        let bytes = build_workbook(sheets, shared_strings);
        let mut spreadsheet = open_spreadsheet_from_bytes("memory.xlsx", bytes).unwrap();
        spreadsheet.read_sheets().unwrap()
    }

    #[test]
    fn lists_sheets_in_workbook_order() {
        let bytes = build_workbook(&[("Zeta", ""), ("Alpha", ""), ("Mid", "")], &[]);
        let spreadsheet = open_spreadsheet_from_bytes("memory.xlsx", bytes).unwrap();
        assert_eq!(spreadsheet.sheet_names(), vec!["Zeta", "Alpha", "Mid"]);
        assert_eq!(spreadsheet.name(), "memory.xlsx");
    }

    #[test]
    fn reads_content_and_styles() {
        let sheets = read(&[(
            "Data",
            r#"<row r="1"><c r="A1" s="1" t="s"><v>0</v></c><c r="B1" s="2"><v>42</v></c></row>
               <row r="3"><c r="C3" s="3"/><c r="D3" t="inlineStr"><is><t>note</t></is></c></row>"#,
        )], &["Header"]);
        let sheet = &sheets[0];
        assert_eq!(sheet.name(), "Data");
        assert_eq!(sheet.file_name(), "memory.xlsx");
        assert_eq!(sheet.extent(), (3, 4));

        let header = sheet.features(0, 0);
        assert!(header.content_present && header.bold);
        assert_eq!(header.border_count(), 4);
        assert!(!header.fill_present);

        let number = sheet.features(0, 1);
        assert!(number.content_present && number.fill_present && !number.bold);

        let bordered = sheet.features(2, 2);
        assert!(!bordered.content_present);
        assert_eq!(bordered.border_count(), 4);

        assert!(sheet.features(2, 3).content_present);
        assert!(sheet.features(1, 0).is_blank());
    }

    #[test]
    fn blank_values_are_not_content() {
        let sheets = read(&[(
            "Blank",
            r#"<row r="1"><c r="A1" t="s"><v>0</v></c><c r="B1" t="inlineStr"><is><t>  </t></is></c><c r="C1" t="s"><v>1</v></c></row>
               <row r="2"><c r="A2"><f>SUM(B1:B9)</f></c><c r="E2" t="s"><v>7</v></c></row>"#,
        )], &["   ", "kept"]);
        let sheet = &sheets[0];
        assert_eq!(sheet.extent(), (2, 5));
        assert!(!sheet.features(0, 0).content_present);
        assert!(!sheet.features(0, 1).content_present);
        assert!(sheet.features(0, 2).content_present);
        // formula without a cached value
        assert!(!sheet.features(1, 0).content_present);
        // dangling shared string index
        assert!(!sheet.features(1, 4).content_present);
    }

    #[test]
    fn cells_without_references_follow_row_order() {
        let sheets = read(&[(
            "Implicit",
            r#"<row><c><v>1</v></c><c><v>2</v></c></row><row><c><v>3</v></c></row>"#,
        )], &[]);
        let sheet = &sheets[0];
        assert_eq!(sheet.extent(), (2, 2));
        assert!(sheet.features(0, 1).content_present);
        assert!(sheet.features(1, 0).content_present);
    }

    #[test]
    fn skips_phonetic_runs() {
        let sheets = read(&[(
            "Phonetic",
            r#"<row r="1"><c r="A1" t="inlineStr"><is><r><t></t></r><rPh sb="0" eb="1"><t>ヨミ</t></rPh></is></c></row>"#,
        )], &[]);
        assert!(!sheets[0].features(0, 0).content_present);
    }

    #[test]
    fn merged_header_spreads_its_border() {
        let sheets = read(&[(
            "Merged",
            r#"<sheetData><row r="1"><c r="A1" s="1" t="s"><v>0</v></c><c r="B1" s="2"><v>9</v></c></row></sheetData>
               <mergeCells count="2"><mergeCell ref="A1:D1"/><mergeCell ref="F1"/></mergeCells>"#,
        )], &["Header"]);
        let sheet = &sheets[0];
        assert_eq!(sheet.extent(), (1, 4));
        assert!(sheet.features(0, 0).bold);
        let inner = sheet.features(0, 1);
        assert!(!inner.content_present && !inner.fill_present && !inner.bold);
        assert!(inner.border_top && inner.border_bottom);
        assert_eq!(inner.border_count(), 2);
        let last = sheet.features(0, 3);
        assert!(last.border_right && !last.border_left);
        assert_eq!(last.border_count(), 3);
    }

    #[test]
    fn empty_worksheet_has_no_extent() {
        let sheets = read(&[("Empty", "")], &[]);
        assert_eq!(sheets[0].extent(), (0, 0));
    }

    #[test]
    fn opens_workbook_from_path() {
        let bytes = build_workbook(&[("Disk", r#"<row r="2"><c r="B2"><v>1</v></c></row>"#)], &[]);
        let mut file = tempfile::Builder::new().suffix(".xlsx").tempfile().unwrap();
        file.write_all(&bytes).unwrap();
        let path = file.path().to_string_lossy().to_string();

        let mut spreadsheet = open_spreadsheet(&path).unwrap();
        let sheets = spreadsheet.read_sheets().unwrap();
        assert_eq!(sheets[0].extent(), (2, 2));
        assert!(sheets[0].features(1, 1).content_present);
    }

    #[test]
    fn rejects_encrypted_packages() {
        let mut bytes = vec![0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];
        bytes.extend_from_slice(&[0u8; 504]);
        let error = open_spreadsheet_from_bytes("secret.xlsx", bytes).err().unwrap();
        assert!(matches!(
            error,
            RustyTablesError::SpreadsheetError(SpreadsheetError::PasswordProtected(_))
        ));
    }

    #[test]
    fn rejects_garbage() {
        assert!(open_spreadsheet_from_bytes("junk.xlsx", b"not a zip".to_vec()).is_err());
    }
}
