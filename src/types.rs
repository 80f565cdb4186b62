//! Core types for footfall-stats
//!
//! This module defines the data structures that flow through the engine:
//! single observations, zone aggregates, and the Unit10 statistics report.
//! Wire names follow the dashboard's JSON API.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single footfall detection event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub detection_id: String,
    pub timestamp: NaiveDateTime,
    /// Open set; new zone names are grouped without registration
    pub zone: String,
    /// Time spent in the zone (seconds, >= 0)
    pub dwell_time_seconds: Option<f64>,
    /// Interaction intensity, nominally 0-100
    pub engagement_score: Option<f64>,
    /// Detector reliability in [0, 1]
    pub detector_confidence: Option<f64>,
}

/// Per-zone aggregate metrics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneMetrics {
    #[serde(rename = "footfall")]
    pub count: usize,
    #[serde(rename = "dwell_min")]
    pub mean_dwell_minutes: Option<f64>,
    #[serde(rename = "engagement")]
    pub mean_engagement: Option<f64>,
    /// min(cap, mean engagement × factor). A capped linear proxy,
    /// not an empirical conversion rate.
    #[serde(rename = "conversion")]
    pub derived_conversion: Option<f64>,
}

/// Store-wide aggregate metrics with the per-zone breakdown
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalMetrics {
    pub total_footfall: usize,
    #[serde(rename = "avg_dwell_min")]
    pub avg_dwell_minutes: Option<f64>,
    pub avg_engagement: Option<f64>,
    /// Mean detector confidence as a percentage
    #[serde(rename = "ai_confidence")]
    pub avg_confidence_pct: Option<f64>,
    /// Keyed by zone name; callers must not rely on ordering
    pub zones: BTreeMap<String, ZoneMetrics>,
}

/// Central tendency and dispersion of dwell time (seconds)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutineStats {
    pub mean: f64,
    pub median: f64,
    pub mode: f64,
    /// Sample standard deviation; absent with fewer than two values
    pub std: Option<f64>,
    pub range: f64,
}

/// Robust estimators of dwell time (seconds)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NonRoutineStats {
    pub trimmed: f64,
    /// Mean weighted by detector confidence; absent without usable weights
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weighted: Option<f64>,
    pub iqr: f64,
}

/// Welch's t-test result
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TTestResult {
    pub t_stat: f64,
    pub p_val: f64,
}

impl TTestResult {
    /// Reported when a group is too small for the test
    pub const DEGENERATE: TTestResult = TTestResult {
        t_stat: 0.0,
        p_val: 1.0,
    };
}

/// Ordinary least-squares fit of engagement on dwell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearFit {
    pub slope: f64,
    #[serde(rename = "int")]
    pub intercept: f64,
    pub r2: f64,
}

/// Power-law fit engagement = a · dwell^b
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PowerFit {
    pub a: f64,
    pub b: f64,
    pub r2: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub linear: Option<LinearFit>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub power: Option<PowerFit>,
}

/// Statistical family within the Unit10 report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatFamily {
    NonRoutine,
    WeightedMean,
    Ttest,
    LinearRegression,
    PowerRegression,
}

/// A family that could not be computed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FamilyWarning {
    pub family: StatFamily,
    pub message: String,
}

/// The Unit10 statistics report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Unit10Report {
    pub routine: RoutineStats,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub non_routine: Option<NonRoutineStats>,
    pub ttest: TTestResult,
    pub regression: RegressionReport,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<FamilyWarning>,
}

/// Outcome reported to API consumers; match on this, never on message text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Success,
    /// No data yet; an expected state, not a fault
    Empty,
    Error,
}

/// Producer metadata stamped on every response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseMeta {
    pub producer: String,
    pub version: String,
    pub instance_id: String,
    pub computed_at_utc: String,
}

/// Response of the summary operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryResponse {
    pub status: ResponseStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<GlobalMetrics>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<ResponseMeta>,
}

/// Response of the unit10 operation; report sections sit at the top level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Unit10Response {
    pub status: ResponseStatus,
    #[serde(flatten, skip_serializing_if = "Option::is_none")]
    pub report: Option<Unit10Report>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<ResponseMeta>,
}
