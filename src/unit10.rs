//! Unit10 statistics
//!
//! Descriptive statistics, robust estimators, a Welch t-test between two zones
//! and two regression fits of engagement on dwell time. Each family is
//! computed on its own; a family that cannot be computed is reported as a
//! warning and the rest of the report still stands.

use crate::config::{AnalysisConfig, HypothesisGroups};
use crate::error::AnalysisError;
use crate::stats;
use crate::store::RecordSet;
use crate::types::{
    FamilyWarning, LinearFit, NonRoutineStats, PowerFit, RegressionReport, RoutineStats,
    StatFamily, TTestResult, Unit10Report,
};
use tracing::{debug, instrument, warn};

/// Complete observations pulled out of the record set
struct Columns<'a> {
    zones: Vec<&'a str>,
    dwell: Vec<f64>,
    engagement: Vec<f64>,
    confidence: Vec<Option<f64>>,
}

impl<'a> Columns<'a> {
    fn from_records(records: &'a RecordSet) -> Self {
        let indices: Vec<usize> = records.complete_indices().collect();

        Columns {
            zones: indices.iter().map(|&i| records.zones()[i].as_str()).collect(),
            dwell: indices
                .iter()
                .filter_map(|&i| records.dwell_seconds()[i])
                .collect(),
            engagement: indices
                .iter()
                .filter_map(|&i| records.engagement()[i])
                .collect(),
            confidence: indices.iter().map(|&i| records.confidence()[i]).collect(),
        }
    }

    fn dwell_in_zone(&self, zone: &str) -> Vec<f64> {
        self.zones
            .iter()
            .zip(&self.dwell)
            .filter(|(z, _)| **z == zone)
            .map(|(_, d)| *d)
            .collect()
    }
}

/// Compute the Unit10 report.
///
/// Fails only when there is no complete observation at all.
#[instrument(skip_all, fields(rows = records.len()))]
pub fn compute(
    records: &RecordSet,
    config: &AnalysisConfig,
) -> Result<Unit10Report, AnalysisError> {
    let columns = Columns::from_records(records);
    if columns.dwell.is_empty() {
        return Err(AnalysisError::EmptyInput);
    }
    debug!(complete = columns.dwell.len(), "computing unit10 statistics");

    let sorted_dwell = stats::sorted(&columns.dwell);
    let mut warnings = Vec::new();

    let routine = compute_routine(&columns.dwell, &sorted_dwell)?;

    let weighted = record(
        &mut warnings,
        StatFamily::WeightedMean,
        compute_weighted_mean(&columns),
    );

    let non_routine = record(
        &mut warnings,
        StatFamily::NonRoutine,
        compute_non_routine(&sorted_dwell, config.trim_proportion, weighted),
    );

    let ttest = record(
        &mut warnings,
        StatFamily::Ttest,
        compute_ttest(&columns, &config.hypothesis_groups),
    )
    .unwrap_or(TTestResult::DEGENERATE);

    let linear = record(
        &mut warnings,
        StatFamily::LinearRegression,
        compute_linear_fit(&columns.dwell, &columns.engagement),
    );

    let power = record(
        &mut warnings,
        StatFamily::PowerRegression,
        compute_power_fit(&columns.dwell, &columns.engagement),
    );

    Ok(Unit10Report {
        routine,
        non_routine,
        ttest,
        regression: RegressionReport { linear, power },
        warnings,
    })
}

/// Keep a family's value, or log and record why it is missing
fn record<T>(
    warnings: &mut Vec<FamilyWarning>,
    family: StatFamily,
    result: Result<T, AnalysisError>,
) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(?family, error = %e, "statistic family skipped");
            warnings.push(FamilyWarning {
                family,
                message: e.to_string(),
            });
            None
        }
    }
}

/// Mean, median, mode, sample std and range of dwell time
fn compute_routine(dwell: &[f64], sorted: &[f64]) -> Result<RoutineStats, AnalysisError> {
    let mean = stats::mean(dwell).ok_or(AnalysisError::EmptyInput)?;
    let median = stats::quantile_sorted(sorted, 0.5).ok_or(AnalysisError::EmptyInput)?;
    let mode = stats::mode_sorted(sorted).ok_or(AnalysisError::EmptyInput)?;
    let range = match (sorted.first(), sorted.last()) {
        (Some(min), Some(max)) => max - min,
        _ => return Err(AnalysisError::EmptyInput),
    };

    Ok(RoutineStats {
        mean: stats::round_to(mean, 1),
        median: stats::round_to(median, 1),
        mode: stats::round_to(mode, 1),
        std: stats::sample_std(dwell).map(|s| stats::round_to(s, 1)),
        range: stats::round_to(range, 1),
    })
}

/// Mean dwell weighted by detector confidence, over rows that have one
fn compute_weighted_mean(columns: &Columns) -> Result<f64, AnalysisError> {
    let (values, weights): (Vec<f64>, Vec<f64>) = columns
        .dwell
        .iter()
        .zip(&columns.confidence)
        .filter_map(|(d, c)| c.map(|c| (*d, c)))
        .unzip();

    if weights.is_empty() {
        return Err(AnalysisError::InsufficientData(
            "no confidence values".to_string(),
        ));
    }

    Ok(stats::round_to(stats::weighted_mean(&values, &weights)?, 1))
}

/// Trimmed mean and interquartile range, carrying the weighted mean alongside
fn compute_non_routine(
    sorted: &[f64],
    trim_proportion: f64,
    weighted: Option<f64>,
) -> Result<NonRoutineStats, AnalysisError> {
    let trimmed = stats::trimmed_mean_sorted(sorted, trim_proportion)?;

    let q1 = stats::quantile_sorted(sorted, 0.25);
    let q3 = stats::quantile_sorted(sorted, 0.75);
    let iqr = match (q1, q3) {
        (Some(q1), Some(q3)) => q3 - q1,
        _ => return Err(AnalysisError::EmptyInput),
    };

    Ok(NonRoutineStats {
        trimmed: stats::round_to(trimmed, 1),
        weighted,
        iqr: stats::round_to(iqr, 1),
    })
}

/// Welch's t-test on dwell time between the two configured zones
fn compute_ttest(
    columns: &Columns,
    groups: &HypothesisGroups,
) -> Result<TTestResult, AnalysisError> {
    let first = columns.dwell_in_zone(&groups.first);
    let second = columns.dwell_in_zone(&groups.second);

    for (group, sample) in [(&groups.first, &first), (&groups.second, &second)] {
        if sample.len() < 2 {
            return Err(AnalysisError::InsufficientGroupData {
                group: group.clone(),
                count: sample.len(),
            });
        }
    }

    let test = stats::welch_t_test(&first, &second)?;
    debug!(
        t = test.t_stat,
        p = test.p_value,
        df = test.degrees_of_freedom,
        "welch t-test"
    );

    Ok(TTestResult {
        t_stat: stats::round_to(test.t_stat, 2),
        p_val: stats::round_to(test.p_value, 4),
    })
}

/// Least-squares line of engagement on dwell time
fn compute_linear_fit(dwell: &[f64], engagement: &[f64]) -> Result<LinearFit, AnalysisError> {
    let fit = stats::linear_regression(dwell, engagement)?;

    Ok(LinearFit {
        slope: stats::round_to(fit.slope, 2),
        intercept: stats::round_to(fit.intercept, 2),
        r2: stats::round_to(fit.r_squared(), 4),
    })
}

/// engagement = a · dwell^b, fitted on the log-log pairs of strictly positive rows
fn compute_power_fit(dwell: &[f64], engagement: &[f64]) -> Result<PowerFit, AnalysisError> {
    let (log_dwell, log_engagement): (Vec<f64>, Vec<f64>) = dwell
        .iter()
        .zip(engagement)
        .filter(|(d, e)| **d > 0.0 && **e > 0.0)
        .map(|(d, e)| (d.ln(), e.ln()))
        .unzip();

    let fit = stats::linear_regression(&log_dwell, &log_engagement)?;

    Ok(PowerFit {
        a: stats::round_to(fit.intercept.exp(), 2),
        b: stats::round_to(fit.slope, 2),
        r2: stats::round_to(fit.r_squared(), 4),
    })
}
