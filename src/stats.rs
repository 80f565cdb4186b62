//! Numeric primitives
//!
//! Order statistics, robust estimators, Welch's t-test and least-squares
//! regression over plain `f64` slices. Callers are responsible for filtering
//! out missing values before calling in.

use crate::error::AnalysisError;
use statrs::distribution::{ContinuousCDF, StudentsT};
use statrs::statistics::Statistics;
use std::cmp::Ordering;

/// Round half away from zero to `decimals` places.
///
/// Used for every published figure so results are reproducible across runs.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Arithmetic mean, `None` for an empty slice
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Bessel-corrected sample standard deviation, `None` with fewer than two values
pub fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    Some(values.std_dev())
}

/// Sorted copy of `values` (total order, so NaN cannot poison the sort)
pub fn sorted(values: &[f64]) -> Vec<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    sorted
}

/// Quantile `q` of already-sorted data, interpolating linearly between the
/// order statistics around position `(n - 1) * q`.
pub fn quantile_sorted(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let position = (sorted.len() - 1) as f64 * q.clamp(0.0, 1.0);
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let fraction = position - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * fraction)
}

/// Most frequent value of already-sorted data; ties go to the smallest value.
pub fn mode_sorted(sorted: &[f64]) -> Option<f64> {
    let mut best: Option<(f64, usize)> = None;
    let mut i = 0;

    while i < sorted.len() {
        let value = sorted[i];
        let run = sorted[i..]
            .iter()
            .take_while(|v| v.total_cmp(&value) == Ordering::Equal)
            .count();

        // Strictly greater keeps the earliest (smallest) value on ties
        if best.map_or(true, |(_, count)| run > count) {
            best = Some((value, run));
        }
        i += run;
    }

    best.map(|(value, _)| value)
}

/// Mean after cutting `floor(proportion * n)` values from each end of the
/// sorted data.
pub fn trimmed_mean_sorted(sorted: &[f64], proportion: f64) -> Result<f64, AnalysisError> {
    let cut = (proportion * sorted.len() as f64).floor() as usize;
    let kept = sorted.get(cut..sorted.len().saturating_sub(cut)).unwrap_or(&[]);

    mean(kept).ok_or_else(|| {
        AnalysisError::InsufficientData(format!(
            "trimming {} from each tail of {} values leaves nothing",
            cut,
            sorted.len()
        ))
    })
}

/// Σ(value · weight) / Σ(weight)
pub fn weighted_mean(values: &[f64], weights: &[f64]) -> Result<f64, AnalysisError> {
    if values.len() != weights.len() {
        return Err(AnalysisError::InsufficientData(format!(
            "{} values but {} weights",
            values.len(),
            weights.len()
        )));
    }

    let total_weight: f64 = weights.iter().sum();
    if total_weight == 0.0 {
        return Err(AnalysisError::InsufficientData(
            "weights sum to zero".to_string(),
        ));
    }

    let weighted_sum: f64 = values.iter().zip(weights).map(|(v, w)| v * w).sum();
    Ok(weighted_sum / total_weight)
}

/// Raw (unrounded) outcome of a two-sample t-test
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TTest {
    pub t_stat: f64,
    pub p_value: f64,
    pub degrees_of_freedom: f64,
}

/// Welch's unequal-variance two-sample t-test with a two-sided p-value.
///
/// Both samples need at least two values and the pooled standard error must be
/// non-zero.
pub fn welch_t_test(first: &[f64], second: &[f64]) -> Result<TTest, AnalysisError> {
    if first.len() < 2 || second.len() < 2 {
        return Err(AnalysisError::InsufficientData(format!(
            "t-test needs two values per sample, got {} and {}",
            first.len(),
            second.len()
        )));
    }

    let n1 = first.len() as f64;
    let n2 = second.len() as f64;
    let se1 = first.variance() / n1;
    let se2 = second.variance() / n2;
    let standard_error = (se1 + se2).sqrt();

    if standard_error == 0.0 || !standard_error.is_finite() {
        return Err(AnalysisError::InsufficientData(
            "both samples have zero variance".to_string(),
        ));
    }

    let mean1 = first.iter().sum::<f64>() / n1;
    let mean2 = second.iter().sum::<f64>() / n2;
    let t_stat = (mean1 - mean2) / standard_error;

    // Welch-Satterthwaite
    let degrees_of_freedom =
        (se1 + se2).powi(2) / (se1.powi(2) / (n1 - 1.0) + se2.powi(2) / (n2 - 1.0));

    let distribution = StudentsT::new(0.0, 1.0, degrees_of_freedom)
        .map_err(|e| AnalysisError::InsufficientData(format!("t distribution: {e}")))?;
    let p_value = (2.0 * (1.0 - distribution.cdf(t_stat.abs()))).clamp(0.0, 1.0);

    Ok(TTest {
        t_stat,
        p_value,
        degrees_of_freedom,
    })
}

/// Raw (unrounded) ordinary least-squares fit
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LeastSquares {
    pub slope: f64,
    pub intercept: f64,
    /// Pearson correlation of x and y
    pub r: f64,
}

impl LeastSquares {
    pub fn r_squared(&self) -> f64 {
        self.r * self.r
    }
}

/// Least-squares fit of `y` on `x`.
///
/// Fails with fewer than two points or when every `x` is identical. Constant
/// `y` gives a flat line with `r = 0`.
pub fn linear_regression(x: &[f64], y: &[f64]) -> Result<LeastSquares, AnalysisError> {
    if x.len() != y.len() {
        return Err(AnalysisError::InsufficientData(format!(
            "{} x values but {} y values",
            x.len(),
            y.len()
        )));
    }
    if x.len() < 2 {
        return Err(AnalysisError::InsufficientData(format!(
            "regression needs at least two points, got {}",
            x.len()
        )));
    }

    let n = x.len() as f64;
    let x_mean = x.iter().sum::<f64>() / n;
    let y_mean = y.iter().sum::<f64>() / n;

    let mut ss_xx = 0.0;
    let mut ss_yy = 0.0;
    let mut ss_xy = 0.0;
    for (xi, yi) in x.iter().zip(y) {
        let dx = xi - x_mean;
        let dy = yi - y_mean;
        ss_xx += dx * dx;
        ss_yy += dy * dy;
        ss_xy += dx * dy;
    }

    if ss_xx == 0.0 {
        return Err(AnalysisError::InsufficientData(
            "all x values are identical".to_string(),
        ));
    }

    let slope = ss_xy / ss_xx;
    let intercept = y_mean - slope * x_mean;
    let r = if ss_yy == 0.0 {
        0.0
    } else {
        (ss_xy / (ss_xx * ss_yy).sqrt()).clamp(-1.0, 1.0)
    };

    Ok(LeastSquares {
        slope,
        intercept,
        r,
    })
}
