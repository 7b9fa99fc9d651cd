/** ------------------------------------------------------------
 * Adaptive online repeated median filter
 *
 * A robust regression filter run over a moving time window ending at
 * the current sample. The window width adapts with a linear search:
 * a sign test on the most recent residuals shrinks the window one
 * sample at a time while the fit no longer describes the newest data,
 * and the window grows by one sample per step otherwise.
 * ------------------------------------------------------------- */
use crate::errors::PipelineError;
use crate::util::{binomial_half_cdf, median_in_place};
use log::{debug, trace};

/**
 * Filter configuration
 */
#[rustfmt::skip]
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct AdoreConfig {
    pub min_width        : usize, // Smallest window width
    pub max_width        : usize, // Largest window width
    pub test_width       : usize, // Most recent residuals checked by the sign test
    pub test_significance: f64,   // Level at which the window is considered too wide
    pub restrict_to_range: bool,  // Clamp the level into the window's value range
    pub extrapolate      : bool,  // Fill the warm-up samples from the first fit
}

impl Default for AdoreConfig {
    fn default() -> Self {
        Self::with_widths(10, 200)
    }
}

impl AdoreConfig {
    /**
     * Configuration for the given width bounds, testing half the minimum width
     */
    pub fn with_widths(min_width: usize, max_width: usize) -> Self {
        AdoreConfig {
            min_width,
            max_width: max_width.max(min_width),
            test_width: (min_width / 2).max(1),
            test_significance: 0.1,
            restrict_to_range: true,
            extrapolate: true,
        }
    }
}

/**
 * Repeated median line through a window, time relative to its last sample
 */
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct RepeatedMedianFit {
    pub level: f64,
    pub slope: f64,
}

impl RepeatedMedianFit {
    /**
     * Fit a window; sample i sits at time i - (len - 1)
     */
    pub fn fit(window: &[f64]) -> Self {
        let n = window.len();
        if n < 2 {
            return Self {
                level: window.first().copied().unwrap_or(f64::NAN),
                slope: 0.0,
            };
        }

        let mut pair_slopes = Vec::with_capacity(n - 1);
        let mut point_slopes = Vec::with_capacity(n);
        for i in 0..n {
            pair_slopes.clear();
            pair_slopes.extend(
                (0..n)
                    .filter(|&j| j != i)
                    .map(|j| (window[i] - window[j]) / (i as f64 - j as f64)),
            );
            point_slopes.push(median_in_place(&mut pair_slopes));
        }
        let slope = median_in_place(&mut point_slopes);

        let last = (n - 1) as f64;
        let mut intercepts: Vec<f64> = window
            .iter()
            .enumerate()
            .map(|(i, &y)| y - slope * (i as f64 - last))
            .collect();
        let level = median_in_place(&mut intercepts);

        Self { level, slope }
    }

    /**
     * Value of the line at a time relative to the window end
     */
    pub fn at(&self, time: f64) -> f64 {
        self.level + self.slope * time
    }
}

pub struct AdoreFilter {
    config: AdoreConfig,
}

/**
 * Per-sample output of the filter
 */
#[derive(Debug, Clone, PartialEq)]
pub struct FilterOutput {
    pub signals: Vec<f64>,
    pub widths: Vec<usize>,
}

impl AdoreFilter {
    pub fn new(config: AdoreConfig) -> Self {
        Self { config }
    }

    /**
     * Whether the newest residuals of a fit share a sign too often
     */
    fn rejects(&self, window: &[f64], fit: &RepeatedMedianFit) -> bool {
        let n = window.len();
        let tested = self.config.test_width.min(n);
        let (mut positive, mut negative) = (0usize, 0usize);
        for (i, &y) in window.iter().enumerate().skip(n - tested) {
            let residual = y - fit.at(i as f64 - (n - 1) as f64);
            if residual > 0.0 {
                positive += 1;
            } else if residual < 0.0 {
                negative += 1;
            }
        }

        let trials = positive + negative;
        if trials == 0 {
            return false;
        }
        let p_value = (2.0 * binomial_half_cdf(positive.min(negative), trials)).min(1.0);
        p_value <= self.config.test_significance
    }

    /**
     * Filter a series
     *
     * \returns signals and window widths, one per input sample
     */
    pub fn apply(&self, values: &[f64]) -> Result<FilterOutput, PipelineError> {
        let AdoreConfig {
            min_width,
            max_width,
            ..
        } = self.config;
        let min_width = min_width.max(2);
        if values.len() < min_width {
            return Err(PipelineError::InsufficientData {
                required: min_width,
                available: values.len(),
            });
        }

        let mut signals = Vec::with_capacity(values.len());
        let mut widths = Vec::with_capacity(values.len());
        let mut width = min_width;
        let mut num_shrinks = 0usize;

        for t in (min_width - 1)..values.len() {
            width = width.min(t + 1);
            let (fit, window) = loop {
                let window = &values[t + 1 - width..=t];
                let fit = RepeatedMedianFit::fit(window);
                if width > min_width && self.rejects(window, &fit) {
                    trace!("t = {}: window {} rejected", t, width);
                    width -= 1;
                    num_shrinks += 1;
                    continue;
                }
                break (fit, window);
            };

            if t == min_width - 1 {
                // Warm-up samples before the first full window
                for i in 0..t {
                    let time = i as f64 - t as f64;
                    let signal = if self.config.extrapolate {
                        fit.at(time)
                    } else {
                        values[i]
                    };
                    signals.push(signal);
                    widths.push(i + 1);
                }
            }

            let mut level = fit.level;
            if self.config.restrict_to_range {
                let (low, high) = window
                    .iter()
                    .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
                        (lo.min(v), hi.max(v))
                    });
                // An all-NaN window leaves the fold at (inf, -inf)
                if low <= high {
                    level = level.clamp(low, high);
                }
            }

            signals.push(level);
            widths.push(width);
            width = (width + 1).min(max_width.max(min_width));
        }

        debug!(
            "Filtered {} samples, {} window reductions, widths {}..{}",
            values.len(),
            num_shrinks,
            widths.iter().min().copied().unwrap_or(0),
            widths.iter().max().copied().unwrap_or(0)
        );

        Ok(FilterOutput { signals, widths })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_median_of_a_line() {
        let window: Vec<f64> = (0..11).map(|i| 5.0 + 2.0 * i as f64).collect();
        let fit = RepeatedMedianFit::fit(&window);
        assert!((fit.slope - 2.0).abs() < 1e-12);
        assert!((fit.level - 25.0).abs() < 1e-12);
        assert!((fit.at(-10.0) - 5.0).abs() < 1e-12);
    }

    #[test]
    fn repeated_median_resists_outliers() {
        let mut window: Vec<f64> = (0..11).map(|i| i as f64).collect();
        window[4] = 100.0;
        window[7] = -50.0;
        let fit = RepeatedMedianFit::fit(&window);
        assert!((fit.slope - 1.0).abs() < 1e-12);
        assert!((fit.level - 10.0).abs() < 1e-12);
    }

    #[test]
    fn all_nan_windows_pass_through() {
        let values = [f64::NAN; 12];
        let output = AdoreFilter::new(AdoreConfig::default())
            .apply(&values)
            .unwrap();
        assert_eq!(output.signals.len(), 12);
        assert_eq!(output.widths.len(), 12);
        assert!(output.signals.iter().all(|s| s.is_nan()));
    }

    #[test]
    fn follows_linear_trend() {
        let values: Vec<f64> = (0..60).map(|i| 100.0 + 0.5 * i as f64).collect();
        let output = AdoreFilter::new(AdoreConfig::default())
            .apply(&values)
            .unwrap();
        assert_eq!(output.signals.len(), values.len());
        for (signal, value) in output.signals.iter().zip(&values) {
            assert!((signal - value).abs() < 1e-9);
        }
    }

    #[test]
    fn removes_isolated_spike() {
        let mut values = vec![10.0; 50];
        values[25] = 80.0;
        let output = AdoreFilter::new(AdoreConfig::default())
            .apply(&values)
            .unwrap();
        assert!(output.signals.iter().all(|s| (s - 10.0).abs() < 1e-12));
    }

    #[test]
    fn window_grows_up_to_max_width() {
        let values: Vec<f64> = (0..40).map(|i| (i % 3) as f64).collect();
        let config = AdoreConfig::with_widths(6, 12);
        let output = AdoreFilter::new(config).apply(&values).unwrap();
        assert_eq!(output.widths.len(), 40);
        assert!(output.widths.iter().all(|&w| w <= 12));
        assert_eq!(output.widths[5], 6);
    }

    #[test]
    fn level_shift_shrinks_window() {
        let mut values = vec![0.0; 60];
        for v in values.iter_mut().skip(40) {
            *v = 50.0;
        }
        let output = AdoreFilter::new(AdoreConfig::default())
            .apply(&values)
            .unwrap();
        assert!(output.widths[45] < output.widths[39] + 6);
        assert!((output.signals[59] - 50.0).abs() < 1e-12);
    }

    #[test]
    fn warm_up_without_extrapolation_copies_values() {
        let values: Vec<f64> = (0..20).map(|i| (i * i) as f64).collect();
        let config = AdoreConfig {
            extrapolate: false,
            ..AdoreConfig::default()
        };
        let output = AdoreFilter::new(config).apply(&values).unwrap();
        assert_eq!(&output.signals[..9], &values[..9]);
    }

    #[test]
    fn too_short() {
        let result = AdoreFilter::new(AdoreConfig::default()).apply(&[1.0; 5]);
        assert!(matches!(
            result,
            Err(PipelineError::InsufficientData {
                required: 10,
                available: 5
            })
        ));
    }
}
