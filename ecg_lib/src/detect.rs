/** ------------------------------------------------------------
 * Peak detectors
 *
 * Both detectors score residual outliers of a series and count the
 * isolated spikes of the score curve. They only borrow the input
 * series and share no state.
 * ------------------------------------------------------------- */
use crate::adore::{AdoreConfig, AdoreFilter};
use crate::errors::PipelineError;
use crate::loess::Loess;
use crate::outlier::{score_with_method, OutlierScores, ScoringMethod};
use crate::peaks::{detect_peaks, PeakSet};
use crate::series::TimeSeries;
use log::debug;

/// Span of the detector's own LOESS curve
pub const DETECTOR_SPAN: f64 = 0.15;

#[derive(Debug, Clone, PartialEq)]
pub struct LoessDetection {
    /// Detector LOESS curve at every sample index
    pub fitted: Vec<f64>,
    pub scores: OutlierScores,
    pub peaks: PeakSet,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AdaptiveDetection {
    /// Filter signals, same length as the input
    pub filtered: TimeSeries,
    pub scores: OutlierScores,
    pub peaks: PeakSet,
}

pub struct LoessPeakDetector {
    loess: Loess,
}

impl Default for LoessPeakDetector {
    fn default() -> Self {
        Self::new(DETECTOR_SPAN)
    }
}

impl LoessPeakDetector {
    pub fn new(span: f64) -> Self {
        Self {
            loess: Loess::new(span),
        }
    }

    /**
     * Detect peaks on the raw series
     *
     * The scorer detrends with its own default-span LOESS; the curve
     * fitted here is returned alongside for display.
     */
    pub fn detect(&self, series: &TimeSeries) -> Result<LoessDetection, PipelineError> {
        let index = series.index_f64();
        let fit = self.loess.fit(&index, series.values())?;
        let fitted: Vec<f64> = index.iter().map(|&x| fit.predict(x)).collect();

        let scores = score_with_method(series, ScoringMethod::Loess)?;
        let peaks = detect_peaks(&scores.scores);
        debug!("LOESS detector found {} peaks", peaks.len());

        Ok(LoessDetection {
            fitted,
            scores,
            peaks,
        })
    }
}

pub struct AdaptiveMedianPeakDetector {
    filter: AdoreFilter,
}

impl Default for AdaptiveMedianPeakDetector {
    fn default() -> Self {
        Self::new(AdoreConfig::default())
    }
}

impl AdaptiveMedianPeakDetector {
    pub fn new(config: AdoreConfig) -> Self {
        Self {
            filter: AdoreFilter::new(config),
        }
    }

    /**
     * Detect peaks on the filtered series
     */
    pub fn detect(&self, series: &TimeSeries) -> Result<AdaptiveDetection, PipelineError> {
        let output = self.filter.apply(series.values())?;
        let filtered = TimeSeries::new(output.signals).with_frequency(series.frequency());

        let scores = score_with_method(&filtered, ScoringMethod::AdaptiveMedianFilter)?;
        let peaks = detect_peaks(&scores.scores);
        debug!("Adaptive median detector found {} peaks", peaks.len());

        Ok(AdaptiveDetection {
            filtered,
            scores,
            peaks,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Slow baseline wander with a narrow spike every 50 samples
    fn spiky_series(n: usize) -> TimeSeries {
        let values = (0..n)
            .map(|i| {
                let baseline = 500.0 + 20.0 * (i as f64 / 40.0).sin();
                let wiggle = [0.0, 1.0, -1.0, 2.0, -2.0][i % 5];
                let spike = match i % 50 {
                    24 => 150.0,
                    25 => 400.0,
                    26 => 150.0,
                    _ => 0.0,
                };
                baseline + wiggle + spike
            })
            .collect();
        TimeSeries::new(values)
    }

    #[test]
    fn loess_detector_finds_spikes() {
        let series = spiky_series(200);
        let detection = LoessPeakDetector::default().detect(&series).unwrap();

        assert_eq!(detection.fitted.len(), 200);
        assert_eq!(detection.scores.scores.len(), 200);
        assert_eq!(detection.peaks.positions(), &[26, 76, 126, 176]);
    }

    #[test]
    fn adaptive_detector_keeps_length() {
        let series = spiky_series(200);
        let detection = AdaptiveMedianPeakDetector::default()
            .detect(&series)
            .unwrap();

        assert_eq!(detection.filtered.len(), series.len());
        assert_eq!(detection.scores.scores.len(), series.len());
        assert!(detection
            .peaks
            .positions()
            .iter()
            .all(|&p| (2..series.len()).contains(&p)));
    }

    #[test]
    fn detectors_reject_short_series() {
        let series = TimeSeries::new(vec![1.0, 2.0, 3.0]);
        assert!(LoessPeakDetector::default().detect(&series).is_err());
        assert!(AdaptiveMedianPeakDetector::default()
            .detect(&series)
            .is_err());
    }

    #[test]
    fn loess_detector_rejects_zero_span() {
        let series = spiky_series(200);
        let result = LoessPeakDetector::new(0.0).detect(&series);
        assert!(matches!(result, Err(PipelineError::InvalidSpan { .. })));
    }
}
