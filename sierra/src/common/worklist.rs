//! Reclassification work list reader.
use crate::common::callnumber;
use crate::result::{SierraError, SierraResult};
use std::fs::File;
use std::path::{Path, PathBuf};

const BIB_ID_COLUMN: usize = 1;
const SPECIAL_CUTTER_COLUMN: usize = 2;
const CLASSIFICATION_COLUMN: usize = 3;
const REQUIRED_COLUMNS: usize = 4;

/// One row of the work list.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkUnit {
    pub bib_id: String,
    pub special_cutter: bool,
    pub classification: String,
}

/// Lazy iterator over the rows of a work list file.
///
/// The header row is skipped.  Opening the file again starts over
/// from the first data row.
pub struct WorkList {
    path: PathBuf,
    records: csv::StringRecordsIntoIter<File>,
}

impl WorkList {
    pub fn open(path: impl AsRef<Path>) -> SierraResult<Self> {
        let path = path.as_ref().to_path_buf();

        let reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(&path)
            .map_err(|e| format!("Cannot open work list {path:?}: {e}"))?;

        Ok(WorkList {
            path,
            records: reader.into_records(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn parse_record(record: &csv::StringRecord) -> SierraResult<WorkUnit> {
        let line = record.position().map(|p| p.line()).unwrap_or(0);

        if record.len() < REQUIRED_COLUMNS {
            return Err(SierraError::MalformedRow {
                line,
                message: format!(
                    "expected at least {REQUIRED_COLUMNS} columns, found {}",
                    record.len()
                ),
            });
        }

        let bib_id = parse_bib_id(&record[BIB_ID_COLUMN]).ok_or_else(|| {
            SierraError::MalformedRow {
                line,
                message: format!("invalid bib number '{}'", &record[BIB_ID_COLUMN]),
            }
        })?;

        Ok(WorkUnit {
            bib_id,
            special_cutter: callnumber::has_special_cutter(&record[SPECIAL_CUTTER_COLUMN]),
            classification: record[CLASSIFICATION_COLUMN].trim().to_string(),
        })
    }
}

impl Iterator for WorkList {
    type Item = SierraResult<WorkUnit>;

    fn next(&mut self) -> Option<Self::Item> {
        let record = match self.records.next()? {
            Ok(r) => r,
            Err(e) => return Some(Err(e.into())),
        };

        Some(WorkList::parse_record(&record))
    }
}

/// Bib numbers arrive wrapped, e.g. "b12345678a".  Strip the leading
/// and trailing character.
///
/// ```
/// use sierra::common::worklist::parse_bib_id;
///
/// assert_eq!(parse_bib_id(" b12345678a ").as_deref(), Some("12345678"));
/// assert_eq!(parse_bib_id("b1"), None);
/// ```
pub fn parse_bib_id(cell: &str) -> Option<String> {
    let cell = cell.trim();
    let mut chars = cell.chars();

    chars.next()?;
    chars.next_back()?;

    let id = chars.as_str();
    if id.is_empty() {
        None
    } else {
        Some(id.to_string())
    }
}
