//! Office Open XML package helpers
use crate::error::RustyTablesError;
use crate::helpers::reader::UnifiedReader;
use crate::helpers::xml::XmlNodeHelper;
use crate::helpers::zip::ZipHelper;
use crate::match_xml_events;
use crate::spreadsheet::SpreadsheetError;
use quick_xml::events::Event;
use std::borrow::Cow;
use std::collections::HashMap;
use zip::ZipArchive;

/// XML tag name for relationship elements
const TAG_RELATIONSHIP: &[u8] = b"Relationship";

/// Opens a workbook package and lists its worksheets
///
/// # Arguments
/// * `file_name` - Path or URL of the workbook, used in error messages
/// * `reader` - Reader positioned at the start of the package
/// * `load_workbook` - Function listing (sheet name, part path) pairs in workbook order
///
/// # Returns
/// Tuple of the zip archive handle and the list of worksheets
pub(super) fn open<W>(file_name: &str, mut reader: UnifiedReader, load_workbook: W) -> Result<(
    ZipArchive<UnifiedReader>,
    Vec<(String, String)>,
), RustyTablesError>
where
    W: Fn(&mut ZipArchive<UnifiedReader>) -> Result<Vec<(String, String)>, RustyTablesError>,
{
    if reader.has_compound_file_signature()? {
        Err(SpreadsheetError::PasswordProtected(file_name.to_owned()))?;
    }

    let mut zip = ZipArchive::new(reader)?;
    let sheets = load_workbook(&mut zip)?;
    if sheets.is_empty() {
        Err(SpreadsheetError::EmptyWorkbook(file_name.to_owned()))?
    }
    Ok((zip, sheets))
}

/// Loads worksheet relationships of a package part
///
/// # Returns
/// Mapping of relationship IDs to worksheet paths inside the archive
pub(super) fn load_relationships(zip: &mut ZipArchive<UnifiedReader>, path: &str) -> Result<HashMap<String, String>, RustyTablesError> {
    let mut reader = zip.xml_reader(path)?
        .ok_or_else(|| SpreadsheetError::MissingPart(path.to_string()))?;
    let mut relationships: HashMap<String, String> = HashMap::new();
    match_xml_events!(reader => {
        Event::Start(event) if event.local_name().as_ref() == TAG_RELATIONSHIP => {
            let id = event.get_attribute_value("Id")?;
            let kind = event.get_attribute_value("Type")?;
            let target = event.get_attribute_value("Target")?;
            // Only worksheet relationships; chartsheets and dialog sheets carry no cells
            if kind.map(|it| it.ends_with("/worksheet")).unwrap_or(true) {
                if let Some((id, target)) = id.zip(target) {
                    relationships.insert(id.to_string(), to_zip_path(target));
                }
            }
        }
    });
    Ok(relationships)
}

/// Normalizes a relationship target to a path inside the archive
pub(crate) fn to_zip_path(path: Cow<'_, str>) -> String {
    if let Some(stripped) = path.strip_prefix('/') {
        stripped.to_string()
    } else if path.starts_with("xl/") {
        path.to_string()
    } else if let Some(relative) = path.strip_prefix("../") {
        relative.to_string()
    } else {
        format!("xl/{path}")
    }
}
