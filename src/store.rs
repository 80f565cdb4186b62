//! Record Store
//!
//! Loads a footfall table into column-oriented storage. The loader only checks
//! the schema, parses cell values and enforces their ranges; it never filters
//! or aggregates.

use crate::error::LoadError;
use crate::types::Observation;
use chrono::NaiveDateTime;
use std::collections::HashMap;
use std::fs::File;
use std::io::{self, Read};
use std::ops::RangeInclusive;
use std::path::PathBuf;
use tracing::{debug, instrument};

pub const COL_DETECTION_ID: &str = "DetectionID";
pub const COL_TIMESTAMP: &str = "Timestamp";
pub const COL_ZONE: &str = "Zone";
pub const COL_DWELL: &str = "DwellTime_s";
pub const COL_ENGAGEMENT: &str = "EngagementScore";
pub const COL_CONFIDENCE: &str = "AI_Confidence";

/// Required columns, in canonical output order
pub const REQUIRED_COLUMNS: [&str; 6] = [
    COL_DETECTION_ID,
    COL_TIMESTAMP,
    COL_ZONE,
    COL_DWELL,
    COL_ENGAGEMENT,
    COL_CONFIDENCE,
];

/// Timestamp layout used by the table
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Accepted dwell seconds
pub const DWELL_RANGE: RangeInclusive<f64> = 0.0..=f64::MAX;

/// Engagement is nominally 0-100 but not enforced
pub const ENGAGEMENT_RANGE: RangeInclusive<f64> = f64::MIN..=f64::MAX;

/// Accepted detector confidence
pub const CONFIDENCE_RANGE: RangeInclusive<f64> = 0.0..=1.0;

/// Where a record table comes from
#[derive(Debug, Clone, PartialEq)]
pub enum Source {
    File(PathBuf),
    /// CSV text already in memory
    Inline(String),
    Stdin,
}

impl Source {
    /// `-` means stdin, anything else is a file path
    pub fn from_arg(arg: &str) -> Self {
        if arg == "-" {
            Source::Stdin
        } else {
            Source::File(PathBuf::from(arg))
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Source::File(path) => path.display().to_string(),
            Source::Inline(_) => "<inline>".to_string(),
            Source::Stdin => "<stdin>".to_string(),
        }
    }
}

/// Column-oriented table of observations
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordSet {
    detection_ids: Vec<String>,
    timestamps: Vec<NaiveDateTime>,
    zones: Vec<String>,
    dwell_seconds: Vec<Option<f64>>,
    engagement: Vec<Option<f64>>,
    confidence: Vec<Option<f64>>,
}

impl RecordSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_observations(observations: impl IntoIterator<Item = Observation>) -> Self {
        let mut records = Self::new();
        for observation in observations {
            records.push(observation);
        }
        records
    }

    pub fn push(&mut self, observation: Observation) {
        self.detection_ids.push(observation.detection_id);
        self.timestamps.push(observation.timestamp);
        self.zones.push(observation.zone);
        self.dwell_seconds.push(observation.dwell_time_seconds);
        self.engagement.push(observation.engagement_score);
        self.confidence.push(observation.detector_confidence);
    }

    pub fn len(&self) -> usize {
        self.zones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }

    pub fn detection_ids(&self) -> &[String] {
        &self.detection_ids
    }

    pub fn timestamps(&self) -> &[NaiveDateTime] {
        &self.timestamps
    }

    pub fn zones(&self) -> &[String] {
        &self.zones
    }

    pub fn dwell_seconds(&self) -> &[Option<f64>] {
        &self.dwell_seconds
    }

    pub fn engagement(&self) -> &[Option<f64>] {
        &self.engagement
    }

    pub fn confidence(&self) -> &[Option<f64>] {
        &self.confidence
    }

    /// Row `index` as an owned observation
    pub fn get(&self, index: usize) -> Option<Observation> {
        if index >= self.len() {
            return None;
        }
        Some(Observation {
            detection_id: self.detection_ids[index].clone(),
            timestamp: self.timestamps[index],
            zone: self.zones[index].clone(),
            dwell_time_seconds: self.dwell_seconds[index],
            engagement_score: self.engagement[index],
            detector_confidence: self.confidence[index],
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = Observation> + '_ {
        (0..self.len()).filter_map(move |i| self.get(i))
    }

    /// Indices of rows with both dwell and engagement present
    pub fn complete_indices(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.len()).filter(move |&i| {
            self.dwell_seconds[i].is_some() && self.engagement[i].is_some()
        })
    }

    /// Number of rows per zone
    pub fn zone_counts(&self) -> HashMap<&str, usize> {
        let mut counts = HashMap::new();
        for zone in &self.zones {
            *counts.entry(zone.as_str()).or_insert(0) += 1;
        }
        counts
    }
}

/// Load a record table from `source`.
#[instrument(skip(source), fields(source = %source.describe()))]
pub fn load(source: &Source) -> Result<RecordSet, LoadError> {
    let records = match source {
        Source::File(path) => load_from_reader(File::open(path)?)?,
        Source::Inline(text) => load_from_reader(text.as_bytes())?,
        Source::Stdin => load_from_reader(io::stdin().lock())?,
    };
    debug!(rows = records.len(), "record table loaded");
    Ok(records)
}

/// Load a record table from any CSV reader.
pub fn load_from_reader<R: Read>(reader: R) -> Result<RecordSet, LoadError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = csv_reader.headers()?.clone();

    // No bytes at all: nothing to validate, zero rows
    if headers.is_empty() {
        return Ok(RecordSet::new());
    }

    let column_index = |name: &str| -> Result<usize, LoadError> {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| LoadError::MissingColumn(name.to_string()))
    };

    let id_idx = column_index(COL_DETECTION_ID)?;
    let ts_idx = column_index(COL_TIMESTAMP)?;
    let zone_idx = column_index(COL_ZONE)?;
    let dwell_idx = column_index(COL_DWELL)?;
    let engagement_idx = column_index(COL_ENGAGEMENT)?;
    let confidence_idx = column_index(COL_CONFIDENCE)?;

    let mut records = RecordSet::new();

    for (row, result) in csv_reader.records().enumerate() {
        let record = result?;
        let cell = |idx: usize| record.get(idx).unwrap_or("");

        let timestamp_raw = cell(ts_idx);
        let timestamp = NaiveDateTime::parse_from_str(timestamp_raw, TIMESTAMP_FORMAT)
            .map_err(|_| invalid(row, COL_TIMESTAMP, timestamp_raw))?;

        let zone = cell(zone_idx);
        if zone.is_empty() {
            return Err(invalid(row, COL_ZONE, zone));
        }

        records.push(Observation {
            detection_id: cell(id_idx).to_string(),
            timestamp,
            zone: zone.to_string(),
            dwell_time_seconds: parse_number(row, COL_DWELL, cell(dwell_idx), &DWELL_RANGE)?,
            engagement_score: parse_number(
                row,
                COL_ENGAGEMENT,
                cell(engagement_idx),
                &ENGAGEMENT_RANGE,
            )?,
            detector_confidence: parse_number(
                row,
                COL_CONFIDENCE,
                cell(confidence_idx),
                &CONFIDENCE_RANGE,
            )?,
        });
    }

    Ok(records)
}

/// Empty cells are missing values; anything else must be a finite number in `range`
fn parse_number(
    row: usize,
    column: &str,
    raw: &str,
    range: &RangeInclusive<f64>,
) -> Result<Option<f64>, LoadError> {
    if raw.is_empty() || raw.eq_ignore_ascii_case("nan") {
        return Ok(None);
    }
    match raw.parse::<f64>() {
        Ok(value) if value.is_finite() && range.contains(&value) => Ok(Some(value)),
        _ => Err(invalid(row, column, raw)),
    }
}

fn invalid(row: usize, column: &str, value: &str) -> LoadError {
    LoadError::InvalidValue {
        // 1-based data row, header excluded
        row: row + 1,
        column: column.to_string(),
        value: value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const HEADER: &str = "DetectionID,Timestamp,Zone,DwellTime_s,EngagementScore,AI_Confidence";

    fn sample_csv() -> String {
        format!(
            "{HEADER}\n\
             ANON-a1b2c3,2024-03-01 09:15:00,Entrance,32.5,48.1,0.81\n\
             ANON-d4e5f6,2024-03-01 09:16:10,Checkout,118.0,62.4,0.93\n\
             ANON-0718aa,2024-03-01 09:20:45,High-Conv,301.25,79.0,0.97\n"
        )
    }

    #[test]
    fn test_load_inline() {
        let records = load(&Source::Inline(sample_csv())).unwrap();

        assert_eq!(records.len(), 3);
        assert_eq!(records.zones()[1], "Checkout");
        assert_eq!(records.dwell_seconds()[2], Some(301.25));
        assert_eq!(records.confidence()[0], Some(0.81));
        assert_eq!(
            records.timestamps()[0].format(TIMESTAMP_FORMAT).to_string(),
            "2024-03-01 09:15:00"
        );
    }

    #[test]
    fn test_column_order_and_extra_columns() {
        let csv = "Zone,Extra,AI_Confidence,EngagementScore,DwellTime_s,Timestamp,DetectionID\n\
                   Entrance,x,0.7,40,20,2024-03-01 10:00:00,id-1\n";
        let records = load_from_reader(csv.as_bytes()).unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records.detection_ids()[0], "id-1");
        assert_eq!(records.engagement()[0], Some(40.0));
    }

    #[test]
    fn test_missing_column() {
        let csv = "DetectionID,Timestamp,Zone,DwellTime_s,AI_Confidence\n";
        let err = load_from_reader(csv.as_bytes()).unwrap_err();

        match err {
            LoadError::MissingColumn(name) => assert_eq!(name, "EngagementScore"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_header_only_is_empty() {
        let records = load_from_reader(format!("{HEADER}\n").as_bytes()).unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn test_no_bytes_is_empty() {
        let records = load(&Source::Inline(String::new())).unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn test_empty_cells_are_missing() {
        let csv = format!("{HEADER}\nid-1,2024-03-01 10:00:00,Entrance,,55.0,\n");
        let records = load_from_reader(csv.as_bytes()).unwrap();

        assert_eq!(records.dwell_seconds()[0], None);
        assert_eq!(records.engagement()[0], Some(55.0));
        assert_eq!(records.confidence()[0], None);
        assert_eq!(records.complete_indices().count(), 0);
    }

    #[test]
    fn test_invalid_number() {
        let csv = format!(
            "{HEADER}\nid-1,2024-03-01 10:00:00,Entrance,12,55,0.9\n\
             id-2,2024-03-01 10:01:00,Entrance,abc,55,0.9\n"
        );
        let err = load_from_reader(csv.as_bytes()).unwrap_err();

        match err {
            LoadError::InvalidValue { row, column, value } => {
                assert_eq!(row, 2);
                assert_eq!(column, "DwellTime_s");
                assert_eq!(value, "abc");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_negative_dwell_rejected() {
        let csv = format!("{HEADER}\nid-1,2024-03-01 10:00:00,Entrance,-4.5,55,0.9\n");
        let err = load_from_reader(csv.as_bytes()).unwrap_err();

        match err {
            LoadError::InvalidValue { row, column, value } => {
                assert_eq!(row, 1);
                assert_eq!(column, "DwellTime_s");
                assert_eq!(value, "-4.5");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_confidence_outside_unit_interval_rejected() {
        let csv = format!("{HEADER}\nid-1,2024-03-01 10:00:00,Entrance,12,55,1.5\n");
        let err = load_from_reader(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, LoadError::InvalidValue { ref column, .. } if column == "AI_Confidence"));

        let csv = format!("{HEADER}\nid-1,2024-03-01 10:00:00,Entrance,12,55,-0.1\n");
        assert!(load_from_reader(csv.as_bytes()).is_err());
    }

    #[test]
    fn test_range_boundaries_and_lenient_engagement() {
        let csv = format!(
            "{HEADER}\nid-1,2024-03-01 10:00:00,Entrance,0,120,0\n\
             id-2,2024-03-01 10:01:00,Entrance,30,-5,1\n"
        );
        let records = load_from_reader(csv.as_bytes()).unwrap();

        assert_eq!(records.dwell_seconds()[0], Some(0.0));
        assert_eq!(records.engagement(), &[Some(120.0), Some(-5.0)]);
        assert_eq!(records.confidence(), &[Some(0.0), Some(1.0)]);
    }

    #[test]
    fn test_invalid_timestamp() {
        let csv = format!("{HEADER}\nid-1,2024-03-01T10:00:00Z,Entrance,12,55,0.9\n");
        let err = load_from_reader(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, LoadError::InvalidValue { ref column, .. } if column == "Timestamp"));
    }

    #[test]
    fn test_empty_zone_rejected() {
        let csv = format!("{HEADER}\nid-1,2024-03-01 10:00:00,,12,55,0.9\n");
        assert!(load_from_reader(csv.as_bytes()).is_err());
    }

    #[test]
    fn test_load_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(sample_csv().as_bytes()).unwrap();

        let records = load(&Source::File(file.path().to_path_buf())).unwrap();
        assert_eq!(records.len(), 3);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = load(&Source::File(PathBuf::from("/nonexistent/footfall.csv"))).unwrap_err();
        assert!(matches!(err, LoadError::Io(_)));
    }

    #[test]
    fn test_zone_counts() {
        let records = load(&Source::Inline(sample_csv())).unwrap();
        let counts = records.zone_counts();
        assert_eq!(counts.get("Entrance"), Some(&1));
        assert_eq!(counts.values().sum::<usize>(), 3);
    }

    #[test]
    fn test_source_from_arg() {
        assert_eq!(Source::from_arg("-"), Source::Stdin);
        assert_eq!(
            Source::from_arg("data.csv"),
            Source::File(PathBuf::from("data.csv"))
        );
    }
}
