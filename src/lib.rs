//! Footfall Stats - Statistical analysis engine for retail footfall detections
//!
//! Loads a table of detection events (one row per detection, with zone, dwell
//! time, engagement and detector confidence) and derives dashboard metrics
//! from it: load → zone aggregation / Unit10 statistics → JSON response.
//!
//! ## Modules
//!
//! - **Record Store**: CSV loading into a column-oriented record set
//! - **Zone Aggregation**: Store-wide and per-zone footfall, dwell and engagement
//! - **Unit10 Statistics**: Routine and robust estimators, Welch's t-test, regressions
//! - **Export**: Canonical CSV output with optional identifier masking

pub mod config;
pub mod error;
pub mod export;
pub mod pipeline;
pub mod stats;
pub mod store;
pub mod types;
pub mod unit10;
pub mod zones;

pub use config::{AnalysisConfig, HypothesisGroups};
pub use error::{AnalysisError, ConfigError, ExportError, FootfallError, LoadError};
pub use pipeline::{summary, unit10, FootfallAnalyzer};
pub use store::{load, RecordSet, Source};
pub use types::{GlobalMetrics, ResponseStatus, SummaryResponse, Unit10Report, Unit10Response};

/// Library version embedded in all responses
pub const FOOTFALL_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for responses
pub const PRODUCER_NAME: &str = "footfall-stats";
