//! Error types for footfall-stats

use thiserror::Error;

/// Errors raised while loading a record table
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Missing required column: {0}")]
    MissingColumn(String),

    #[error("Invalid value {value:?} in column {column} at row {row}")]
    InvalidValue {
        row: usize,
        column: String,
        value: String,
    },

    #[error("Failed to read CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while writing an exported table
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Failed to write CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Export is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Errors raised by the analysis engine
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalysisError {
    #[error("No observations to analyse")]
    EmptyInput,

    #[error("Insufficient data in group {group}: {count} observations, at least 2 required")]
    InsufficientGroupData { group: String, count: usize },

    #[error("Insufficient data: {0}")]
    InsufficientData(String),
}

/// Invalid analysis configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid config value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

/// Any failure along the load → analyse path
#[derive(Debug, Error)]
pub enum FootfallError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Analysis(#[from] AnalysisError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}
