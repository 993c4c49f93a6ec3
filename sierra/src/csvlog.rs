//! Audit and error CSV logs for reclass runs.
use crate::result::SierraResult;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const AUDIT_HEADER: &[&str] = &[
    "timestamp",
    "bibNo",
    "lcc",
    "items_updated",
    "requests_made",
    "elapsed_time",
    "item_ids",
];

pub const BIB_NOT_FOUND_MARKER: &str = "ERROR-BIB NOT FOUND";
pub const BIB_NOT_RETRIEVED_MARKER: &str = "ERROR-BIB NOT RETRIEVED";
pub const ITEMS_NOT_RETRIEVED_MARKER: &str = "ERROR-ITEMS NOT RETRIEVED";

/// One audit log row.
#[derive(Debug, Clone, PartialEq)]
pub enum AuditEntry {
    /// A work unit ran to completion.
    Completed {
        timestamp: String,
        bib_id: String,
        classification: String,
        item_ids: Vec<String>,
        requests: usize,
        elapsed: Duration,
    },

    /// A work unit was abandoned.  The marker lands in the
    /// items_updated column.
    Failed {
        timestamp: String,
        bib_id: String,
        classification: String,
        marker: &'static str,
    },
}

impl AuditEntry {
    /// ```
    /// use sierra::csvlog::AuditEntry;
    /// use std::time::Duration;
    ///
    /// let entry = AuditEntry::Completed {
    ///     timestamp: "2024-03-09 10:00:00.000000".to_string(),
    ///     bib_id: "1000001".to_string(),
    ///     classification: "ML100.G13 2019".to_string(),
    ///     item_ids: vec!["14381985".to_string(), "14381986".to_string()],
    ///     requests: 4,
    ///     elapsed: Duration::from_millis(1500),
    /// };
    ///
    /// assert_eq!(
    ///     entry.to_row(),
    ///     vec![
    ///         "2024-03-09 10:00:00.000000",
    ///         "1000001",
    ///         "ML100.G13 2019",
    ///         "2",
    ///         "4",
    ///         "1.500",
    ///         "14381985,14381986",
    ///     ]
    /// );
    /// ```
    pub fn to_row(&self) -> Vec<String> {
        match self {
            Self::Completed {
                timestamp,
                bib_id,
                classification,
                item_ids,
                requests,
                elapsed,
            } => vec![
                timestamp.to_string(),
                bib_id.to_string(),
                classification.to_string(),
                item_ids.len().to_string(),
                requests.to_string(),
                format!("{:.3}", elapsed.as_secs_f64()),
                item_ids.join(","),
            ],
            Self::Failed {
                timestamp,
                bib_id,
                classification,
                marker,
            } => vec![
                timestamp.to_string(),
                bib_id.to_string(),
                classification.to_string(),
                marker.to_string(),
            ],
        }
    }
}

/// Destination for the durable per-run records.
pub trait ReclassSink {
    /// Append one audit row.
    fn audit(&mut self, entry: &AuditEntry) -> SierraResult<()>;

    /// Record an item which could not be updated.
    fn item_failed(&mut self, bib_id: &str, item_id: &str) -> SierraResult<()>;
}

/// ReclassSink writing to a pair of CSV files.
///
/// Each row is appended and flushed on its own, so an interrupted run
/// keeps every row written before the interruption.
pub struct CsvSink {
    audit_path: PathBuf,
    error_path: PathBuf,
}

impl CsvSink {
    /// Writes the audit header if the audit file is missing or empty.
    pub fn new(audit_path: impl AsRef<Path>, error_path: impl AsRef<Path>) -> SierraResult<Self> {
        let sink = CsvSink {
            audit_path: audit_path.as_ref().to_path_buf(),
            error_path: error_path.as_ref().to_path_buf(),
        };

        let needs_header = match fs::metadata(&sink.audit_path) {
            Ok(m) => m.len() == 0,
            Err(_) => true,
        };

        if needs_header {
            CsvSink::append(&sink.audit_path, AUDIT_HEADER)?;
        }

        Ok(sink)
    }

    pub fn audit_path(&self) -> &Path {
        &self.audit_path
    }

    pub fn error_path(&self) -> &Path {
        &self.error_path
    }

    fn append<I, T>(path: &Path, row: I) -> SierraResult<()>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<[u8]>,
    {
        let file = fs::File::options()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| format!("Cannot open log file {path:?}: {e}"))?;

        // Error rows are shorter than completed rows.
        let mut writer = csv::WriterBuilder::new().flexible(true).from_writer(file);

        writer.write_record(row)?;
        writer.flush()?;

        Ok(())
    }
}

impl ReclassSink for CsvSink {
    fn audit(&mut self, entry: &AuditEntry) -> SierraResult<()> {
        CsvSink::append(&self.audit_path, entry.to_row())
    }

    fn item_failed(&mut self, bib_id: &str, item_id: &str) -> SierraResult<()> {
        CsvSink::append(&self.error_path, [bib_id, item_id])
    }
}
