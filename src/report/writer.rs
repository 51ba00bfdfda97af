// CSV report writer.
// One row per parsed comment with a fixed set of analyzer columns.

use std::io::Write;

use chrono::{DateTime, Utc};

use crate::conduit::Phid;
use crate::error::{PhabStatsError, Result};
use crate::stats::DefectStats;

/// Analyzers that get their own report column, in column order.
pub const KNOWN_ANALYZERS: &[&str] = &["clang-format", "clang-tidy", "infer", "mozlint", "coverity"];

/// One parsed comment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRow {
    pub revision: Phid,
    pub comment_id: u64,
    pub created_at: Option<DateTime<Utc>>,
    pub stats: DefectStats,
}

impl ReportRow {
    fn record(&self) -> Vec<String> {
        let mut record = vec![
            self.revision.to_string(),
            self.comment_id.to_string(),
            self.created_at.map(|dt| dt.to_rfc3339()).unwrap_or_default(),
        ];
        record.extend(
            KNOWN_ANALYZERS
                .iter()
                .map(|name| self.stats.get(name).unwrap_or(0).to_string()),
        );
        record.push(self.stats.total.to_string());
        record
    }
}

/// Column names, in order.
pub fn header() -> Vec<&'static str> {
    let mut header = vec!["revision", "comment", "date"];
    header.extend_from_slice(KNOWN_ANALYZERS);
    header.push("total");
    header
}

/// Streams report rows as CSV.
pub struct ReportWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> ReportWriter<W> {
    /// Wrap `inner` and write the header row.
    pub fn new(inner: W) -> Result<Self> {
        let mut writer = csv::Writer::from_writer(inner);
        writer.write_record(header())?;
        Ok(Self { writer })
    }

    pub fn write_row(&mut self, row: &ReportRow) -> Result<()> {
        for name in row.stats.analyzers.keys() {
            if !KNOWN_ANALYZERS.contains(&name.as_str()) {
                tracing::warn!(analyzer = %name, comment = row.comment_id, "unknown analyzer omitted from report");
            }
        }

        self.writer.write_record(row.record())?;
        Ok(())
    }

    /// Flush buffered rows and hand back the inner writer.
    pub fn finish(self) -> Result<W> {
        self.writer
            .into_inner()
            .map_err(|e| PhabStatsError::Io(e.into_error()))
    }
}
