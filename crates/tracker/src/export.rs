//! CSV export.

use std::path::{Path, PathBuf};
use chronos_core::{format_timestamp, EventRecord};
use serde::Serialize;

/// Header row of exported files.
pub const CSV_HEADER: &str = "sequence,timestamp,state,action,description,workingContext,sessionId,stamp";

/// Result of a successful export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportOutcome {
    /// File written
    pub file: PathBuf,
    /// Rows written, excluding the header
    pub count: usize,
}

/// Quote a field, doubling embedded quotes.
fn quote(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}

/// Render records as CSV; every value is quoted.
pub fn render_csv(records: &[EventRecord]) -> String {
    let mut csv = String::with_capacity(CSV_HEADER.len() + 1 + records.len() * 256);
    csv.push_str(CSV_HEADER);
    csv.push('\n');

    for record in records {
        let row = [
            quote(&record.sequence.to_string()),
            quote(&format_timestamp(&record.timestamp)),
            quote(&record.state),
            quote(&record.action),
            quote(&record.description),
            quote(&record.working_context),
            quote(record.session_id.as_str()),
            quote(&record.stamp),
        ];
        csv.push_str(&row.join(","));
        csv.push('\n');
    }
    csv
}

pub(crate) async fn write_csv(path: &Path, records: &[EventRecord]) -> chronos_storage::Result<ExportOutcome> {
    let csv = render_csv(records);
    chronos_storage::json_storage::write_atomic(path, csv.as_bytes()).await?;
    Ok(ExportOutcome {
        file: path.to_path_buf(),
        count: records.len(),
    })
}
