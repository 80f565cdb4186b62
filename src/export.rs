//! Table export
//!
//! Serializes a record set back to the canonical CSV layout, optionally
//! masking detection identifiers before the table leaves the process.

use crate::error::ExportError;
use crate::store::{RecordSet, REQUIRED_COLUMNS, TIMESTAMP_FORMAT};
use std::io::Write;
use tracing::{debug, instrument};

/// Prefix applied to masked detection identifiers
pub const MASK_PREFIX: &str = "ANON-HASH-";

/// Number of trailing identifier characters kept after masking
const MASK_KEEP_CHARS: usize = 6;

/// `ANON-HASH-` followed by the last six characters of the identifier
pub fn mask_detection_id(id: &str) -> String {
    let chars: Vec<char> = id.chars().collect();
    let tail: String = chars[chars.len().saturating_sub(MASK_KEEP_CHARS)..]
        .iter()
        .collect();
    format!("{MASK_PREFIX}{tail}")
}

/// Write `records` as CSV with the canonical header.
#[instrument(skip_all, fields(rows = records.len(), mask = mask))]
pub fn export_csv<W: Write>(
    records: &RecordSet,
    writer: W,
    mask: bool,
) -> Result<(), ExportError> {
    let mut csv_writer = csv::WriterBuilder::new().from_writer(writer);
    csv_writer.write_record(REQUIRED_COLUMNS)?;

    for observation in records.iter() {
        let detection_id = if mask {
            mask_detection_id(&observation.detection_id)
        } else {
            observation.detection_id
        };

        csv_writer.write_record([
            detection_id,
            observation.timestamp.format(TIMESTAMP_FORMAT).to_string(),
            observation.zone,
            format_number(observation.dwell_time_seconds),
            format_number(observation.engagement_score),
            format_number(observation.detector_confidence),
        ])?;
    }

    csv_writer.flush()?;
    debug!("export written");
    Ok(())
}

/// Export to an in-memory string
pub fn export_csv_string(records: &RecordSet, mask: bool) -> Result<String, ExportError> {
    let mut buffer = Vec::new();
    export_csv(records, &mut buffer, mask)?;
    Ok(String::from_utf8(buffer)?)
}

/// Shortest round-trip representation; missing values are empty cells
fn format_number(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}
