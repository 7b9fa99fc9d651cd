/** ------------------------------------------------------------
 * Residual based outlier scoring
 *
 * The series is detrended (seasonal decomposition remainder when the
 * series declares a frequency, LOESS residuals otherwise) and every
 * residual is scored by how far, in IQR units, it lies outside the
 * Tukey fence of the residual distribution.
 * ------------------------------------------------------------- */
use crate::errors::PipelineError;
use crate::loess::Loess;
use crate::series::TimeSeries;
use crate::stl::Stl;
use crate::util::quantile_sorted;
use log::debug;

/// Fence multiplier applied to the IQR
pub const FENCE_MULTIPLIER: f64 = 1.5;

// IQR at or below this fraction of the series magnitude counts as zero
const DEGENERATE_IQR_TOLERANCE: f64 = 1e-9;

/**
 * Detection strategy, carrying the quantile pair used for its fence
 */
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ScoringMethod {
    Loess,
    AdaptiveMedianFilter,
}

impl ScoringMethod {
    /**
     * Lower and upper residual quantile
     *
     * The filtered series of the adaptive method leaves noisier residuals,
     * so its central band is wider.
     */
    pub fn quantiles(self) -> (f64, f64) {
        match self {
            ScoringMethod::Loess => (0.25, 0.75),
            ScoringMethod::AdaptiveMedianFilter => (0.15, 0.85),
        }
    }
}

/**
 * Residuals and their outlier scores, aligned with the input series
 */
#[derive(Debug, Clone, PartialEq)]
pub struct OutlierScores {
    pub residuals: Vec<f64>,
    pub quantiles: (f64, f64),
    pub iqr: f64,
    pub limits: (f64, f64),
    pub scores: Vec<f64>,
}

impl OutlierScores {
    /**
     * Number of samples outside the fence
     */
    pub fn num_outliers(&self) -> usize {
        self.scores.iter().filter(|&&s| s > 0.0).count()
    }
}

/**
 * Distance of a residual outside the fence, in IQR units
 *
 * Residuals inside the fence or exactly on a limit score 0.
 */
fn fence_score(residual: f64, limits: (f64, f64), iqr: f64) -> f64 {
    (((residual - limits.0) / iqr).min(0.0) + ((residual - limits.1) / iqr).max(0.0)).abs()
}

/**
 * Residuals of the series against its expected local trend
 */
pub fn detrend(series: &TimeSeries) -> Result<Vec<f64>, PipelineError> {
    if series.frequency() > 1 {
        let decomposition = Stl::robust(series.frequency()).decompose(series.values())?;
        return Ok(decomposition.remainder);
    }

    let index = series.index_f64();
    Ok(Loess::default().fit(&index, series.values())?.residuals())
}

pub fn score_with_method(
    series: &TimeSeries,
    method: ScoringMethod,
) -> Result<OutlierScores, PipelineError> {
    let (lower, upper) = method.quantiles();
    score(series, lower, upper)
}

/**
 * Score every sample of a series
 *
 * \param lower_quantile Lower residual quantile of the fence
 * \param upper_quantile Upper residual quantile of the fence
 *
 * \returns One score per sample; 0 inside the fence (limits included),
 *          otherwise the distance to the fence divided by the IQR.
 */
pub fn score(
    series: &TimeSeries,
    lower_quantile: f64,
    upper_quantile: f64,
) -> Result<OutlierScores, PipelineError> {
    let residuals = detrend(series)?;

    let mut sorted = residuals.clone();
    sorted.sort_by(f64::total_cmp);
    let q_low = quantile_sorted(&sorted, lower_quantile);
    let q_high = quantile_sorted(&sorted, upper_quantile);
    let iqr = q_high - q_low;

    let magnitude = series
        .values()
        .iter()
        .fold(1.0_f64, |acc, v| acc.max(v.abs()));
    if !(iqr > DEGENERATE_IQR_TOLERANCE * magnitude) {
        return Err(PipelineError::DegenerateData { iqr });
    }

    let limits = (
        q_low - FENCE_MULTIPLIER * iqr,
        q_high + FENCE_MULTIPLIER * iqr,
    );
    let scores: Vec<f64> = residuals
        .iter()
        .map(|&r| fence_score(r, limits, iqr))
        .collect();

    let result = OutlierScores {
        residuals,
        quantiles: (q_low, q_high),
        iqr,
        limits,
        scores,
    };
    debug!(
        "Scored {} residuals, IQR {:.3}, limits [{:.3}, {:.3}], {} outliers",
        result.residuals.len(),
        iqr,
        limits.0,
        limits.1,
        result.num_outliers()
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noisy_line(n: usize) -> Vec<f64> {
        // Deterministic zig-zag noise around a slow ramp
        (0..n)
            .map(|i| 100.0 + 0.1 * i as f64 + [0.0, 1.5, -1.0, 0.5, -1.5, 1.0][i % 6])
            .collect()
    }

    #[test]
    fn method_quantiles() {
        assert_eq!(ScoringMethod::Loess.quantiles(), (0.25, 0.75));
        assert_eq!(ScoringMethod::AdaptiveMedianFilter.quantiles(), (0.15, 0.85));
    }

    #[test]
    fn residuals_on_the_limits_score_zero() {
        let limits = (-4.0, 6.0);
        assert_eq!(fence_score(-4.0, limits, 2.0), 0.0);
        assert_eq!(fence_score(6.0, limits, 2.0), 0.0);
        assert_eq!(fence_score(1.0, limits, 2.0), 0.0);
    }

    #[test]
    fn residuals_outside_the_limits_score_distance_over_iqr() {
        let limits = (-4.0, 6.0);
        assert!((fence_score(-4.5, limits, 2.0) - 0.25).abs() < 1e-12);
        assert!((fence_score(7.0, limits, 2.0) - 0.5).abs() < 1e-12);
        assert!((fence_score(-10.0, limits, 4.0) - 1.5).abs() < 1e-12);
    }

    #[test]
    fn scores_align_with_series() {
        let series = TimeSeries::new(noisy_line(60));
        let result = score_with_method(&series, ScoringMethod::Loess).unwrap();
        assert_eq!(result.scores.len(), 60);
        assert_eq!(result.residuals.len(), 60);
        assert!(result.scores.iter().all(|s| *s >= 0.0));
        assert_eq!(result.num_outliers(), 0);
    }

    #[test]
    fn spike_is_scored() {
        let mut values = noisy_line(120);
        values[100] += 60.0;
        let result = score_with_method(&TimeSeries::new(values), ScoringMethod::Loess).unwrap();

        let expected = ((result.residuals[100] - result.limits.1) / result.iqr).abs();
        assert!(result.scores[100] > 1.0);
        assert!((result.scores[100] - expected).abs() < 1e-12);
        // Outside the spike's LOESS neighbourhood
        assert_eq!(result.scores[5], 0.0);
    }

    #[test]
    fn negative_excursions_score_positive() {
        let mut values = noisy_line(80);
        values[30] -= 60.0;
        let result = score(&TimeSeries::new(values), 0.15, 0.85).unwrap();
        assert!(result.residuals[30] < result.limits.0);
        assert!(result.scores[30] > 0.0);
    }

    #[test]
    fn constant_series_is_degenerate() {
        let series = TimeSeries::new(vec![669.0; 50]);
        let result = score_with_method(&series, ScoringMethod::Loess);
        assert!(matches!(result, Err(PipelineError::DegenerateData { .. })));
    }

    #[test]
    fn seasonal_series_uses_decomposition() {
        let pattern = [4.0, 0.0, -2.0, -2.0];
        let mut values: Vec<f64> = (0..64)
            .map(|i| pattern[i % 4] + [0.0, 0.3, -0.2, 0.1, -0.3][i % 5])
            .collect();
        values[33] += 25.0;
        let series = TimeSeries::new(values).with_frequency(4);
        let result = score_with_method(&series, ScoringMethod::Loess).unwrap();

        let max_position = result
            .scores
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i);
        assert_eq!(max_position, Some(33));
    }
}
