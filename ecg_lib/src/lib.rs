pub mod adore;
pub mod detect;
mod errors;
pub mod heart_rate;
pub mod loess;
pub mod outlier;
pub mod packet;
pub mod peaks;
mod persistence;
pub mod series;
pub mod stl;
pub mod util;

pub use errors::PipelineError;

use adore::AdoreConfig;
use detect::{AdaptiveDetection, AdaptiveMedianPeakDetector, LoessDetection, LoessPeakDetector};
use heart_rate::SAMPLING_HZ;
use log::{debug, info};
use series::TimeSeries;
use std::fs;
use std::path::PathBuf;

/**
 * Two seconds of a single-lead recording at 256 Hz, 512 packets
 */
pub const SAMPLE_RECORDING: &str = include_str!("../data/sample_recording.hex");

/**
 * Pipeline parameters
 */
#[rustfmt::skip]
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PipelineConfig {
    pub sampling_hz: u32,        // Device sampling frequency
    pub loess_span : f64,        // Span of the LOESS detector curve
    pub adore      : AdoreConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            sampling_hz: SAMPLING_HZ,
            loess_span: detect::DETECTOR_SPAN,
            adore: AdoreConfig::default(),
        }
    }
}

/**
 * Everything the pipeline derives from one recording
 *
 * The adaptive filter heart rate is the primary result; the LOESS heart
 * rate is a secondary estimate.
 */
#[derive(Debug, Clone, PartialEq)]
pub struct EcgAnalysis {
    pub index: Vec<usize>,
    pub series: TimeSeries,
    pub loess: LoessDetection,
    pub adaptive: AdaptiveDetection,
    pub loess_bpm: u32,
    pub adaptive_bpm: u32,
}

/**
 * Run the full pipeline on a raw hex stream
 *
 * \param raw    Concatenated 34 hex character packets
 * \param config Pipeline parameters
 */
pub fn analyze(raw: &str, config: &PipelineConfig) -> Result<EcgAnalysis, PipelineError> {
    let measurements = packet::decode(raw)?;
    let series = TimeSeries::from_measurements(&measurements);
    let index = series.index();

    let loess = LoessPeakDetector::new(config.loess_span).detect(&series)?;
    let adaptive = AdaptiveMedianPeakDetector::new(config.adore).detect(&series)?;

    let loess_bpm = heart_rate::estimate(loess.peaks.len(), series.len(), config.sampling_hz)?;
    let adaptive_bpm = heart_rate::estimate(
        adaptive.peaks.len(),
        adaptive.filtered.len(),
        config.sampling_hz,
    )?;
    debug!(
        "LOESS: {} peaks, {} bpm; adaptive filter: {} peaks, {} bpm",
        loess.peaks.len(),
        loess_bpm,
        adaptive.peaks.len(),
        adaptive_bpm
    );

    Ok(EcgAnalysis {
        index,
        series,
        loess,
        adaptive,
        loess_bpm,
        adaptive_bpm,
    })
}

/**
 * Run the pipeline on a file holding the raw hex stream
 */
pub fn analyze_file(path: PathBuf, config: &PipelineConfig) -> Result<EcgAnalysis, PipelineError> {
    let raw = fs::read_to_string(&path)?;
    info!("Read {} characters from {}", raw.trim().len(), path.display());
    analyze(&raw, config)
}
