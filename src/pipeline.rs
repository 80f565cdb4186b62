//! Pipeline orchestration
//!
//! This module provides the public API for footfall-stats. Each operation
//! loads a fresh record set from its source, runs one engine component and
//! wraps the outcome in a response envelope. Operations never fail: errors
//! become `status: "error"` responses.

use crate::config::AnalysisConfig;
use crate::error::{AnalysisError, FootfallError};
use crate::store::{self, RecordSet, Source};
use crate::types::{
    GlobalMetrics, ResponseMeta, ResponseStatus, SummaryResponse, Unit10Report, Unit10Response,
};
use crate::unit10::compute as compute_unit10;
use crate::{zones, FOOTFALL_VERSION, PRODUCER_NAME};
use chrono::Utc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Zone summary for the table at `source` (stateless, one-shot).
///
/// # Example
/// ```ignore
/// let response = summary(&Source::from_arg("footfall_data.csv"), &AnalysisConfig::default());
/// assert_eq!(response.status, ResponseStatus::Success);
/// ```
pub fn summary(source: &Source, config: &AnalysisConfig) -> SummaryResponse {
    FootfallAnalyzer::with_config(config.clone()).summary(source)
}

/// Unit10 statistics for the table at `source` (stateless, one-shot).
pub fn unit10(source: &Source, config: &AnalysisConfig) -> Unit10Response {
    FootfallAnalyzer::with_config(config.clone()).unit10(source)
}

/// Runs the engine with a fixed configuration and producer identity.
///
/// Holds no data between calls; every operation re-reads its source.
#[derive(Debug, Clone)]
pub struct FootfallAnalyzer {
    config: AnalysisConfig,
    instance_id: String,
}

impl Default for FootfallAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl FootfallAnalyzer {
    /// Create an analyzer with default settings
    pub fn new() -> Self {
        Self::with_config(AnalysisConfig::default())
    }

    pub fn with_config(config: AnalysisConfig) -> Self {
        Self {
            config,
            instance_id: Uuid::new_v4().to_string(),
        }
    }

    /// Use a fixed instance ID instead of a random one
    pub fn with_instance_id(mut self, instance_id: impl Into<String>) -> Self {
        self.instance_id = instance_id.into();
        self
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    /// Load `source` and produce the zone summary
    #[instrument(skip(self), fields(source = %source.describe()))]
    pub fn summary(&self, source: &Source) -> SummaryResponse {
        self.summary_response(self.try_summary(source))
    }

    /// Zone summary of an already-loaded record set
    pub fn summarize_records(&self, records: &RecordSet) -> SummaryResponse {
        self.summary_response(zones::aggregate(records, &self.config).map_err(Into::into))
    }

    /// Load `source` and produce the Unit10 report
    #[instrument(skip(self), fields(source = %source.describe()))]
    pub fn unit10(&self, source: &Source) -> Unit10Response {
        self.unit10_response(self.try_unit10(source))
    }

    /// Unit10 report of an already-loaded record set
    pub fn unit10_records(&self, records: &RecordSet) -> Unit10Response {
        self.unit10_response(compute_unit10(records, &self.config).map_err(Into::into))
    }

    /// Fallible summary, for callers that want the error itself
    pub fn try_summary(&self, source: &Source) -> Result<GlobalMetrics, FootfallError> {
        self.config.validate()?;
        let records = store::load(source)?;
        Ok(zones::aggregate(&records, &self.config)?)
    }

    /// Fallible Unit10 report, for callers that want the error itself
    pub fn try_unit10(&self, source: &Source) -> Result<Unit10Report, FootfallError> {
        self.config.validate()?;
        let records = store::load(source)?;
        Ok(compute_unit10(&records, &self.config)?)
    }

    fn summary_response(&self, result: Result<GlobalMetrics, FootfallError>) -> SummaryResponse {
        let (status, data, message) = match result {
            Ok(metrics) => {
                info!(
                    total = metrics.total_footfall,
                    zones = metrics.zones.len(),
                    "summary computed"
                );
                (ResponseStatus::Success, Some(metrics), None)
            }
            Err(FootfallError::Analysis(AnalysisError::EmptyInput)) => {
                info!("no observations, reporting empty summary");
                (ResponseStatus::Empty, None, None)
            }
            Err(e) => {
                warn!(error = %e, "summary failed");
                (ResponseStatus::Error, None, Some(e.to_string()))
            }
        };

        SummaryResponse {
            status,
            data,
            message,
            meta: Some(self.meta()),
        }
    }

    fn unit10_response(&self, result: Result<Unit10Report, FootfallError>) -> Unit10Response {
        let (status, report, message) = match result {
            Ok(report) => {
                info!(warnings = report.warnings.len(), "unit10 report computed");
                (ResponseStatus::Success, Some(report), None)
            }
            Err(e) => {
                warn!(error = %e, "unit10 failed");
                (ResponseStatus::Error, None, Some(e.to_string()))
            }
        };

        Unit10Response {
            status,
            report,
            message,
            meta: Some(self.meta()),
        }
    }

    fn meta(&self) -> ResponseMeta {
        ResponseMeta {
            producer: PRODUCER_NAME.to_string(),
            version: FOOTFALL_VERSION.to_string(),
            instance_id: self.instance_id.clone(),
            computed_at_utc: Utc::now().to_rfc3339(),
        }
    }
}
