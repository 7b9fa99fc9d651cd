use ecg_lib::adore::AdoreConfig;
use ecg_lib::packet::decode;
use ecg_lib::{analyze, analyze_file, EcgAnalysis, PipelineConfig, PipelineError, SAMPLE_RECORDING};
use log::{debug, info, warn};
use std::fs;
use std::path::PathBuf;

pub struct AnalysisArgs {
    pub input_file: Option<PathBuf>,
    pub out_file: Option<PathBuf>,
    pub print: bool,
    pub sampling_hz: u32,
    pub span: f64,
    pub min_width: usize,
    pub max_width: usize,
}

impl AnalysisArgs {
    fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            sampling_hz: self.sampling_hz,
            loess_span: self.span,
            adore: AdoreConfig::with_widths(self.min_width, self.max_width),
        }
    }
}

/**
 * Analyse a recording and report its heart rate
 */
pub fn run_analysis(args: AnalysisArgs) -> Result<(), String> {
    let config = args.pipeline_config();

    let analysis = match &args.input_file {
        Some(path) => analyze_file(path.clone(), &config),
        None => {
            info!("No input file given, analysing the embedded sample recording");
            analyze(SAMPLE_RECORDING, &config)
        }
    }
    .map_err(|e| describe(&e))?;

    report(&analysis, args.print);

    if let Some(out_file) = args.out_file {
        analysis
            .to_parquet(out_file.clone())
            .map_err(|e| format!("Writing to parquet failed with error: {}", e))?;
        info!("Wrote {} samples to {}", analysis.series.len(), out_file.display());
    }

    Ok(())
}

/**
 * Print the decoded channel 1 values, one per line
 */
pub fn decode_recording(input_file: Option<PathBuf>) -> Result<(), String> {
    let raw = match input_file {
        Some(path) => fs::read_to_string(&path)
            .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?,
        None => SAMPLE_RECORDING.to_string(),
    };

    let measurements = decode(&raw).map_err(|e| describe(&e))?;
    for measurement in measurements {
        println!("{}\t{}", measurement.packet_position, measurement.value);
    }

    Ok(())
}

fn report(analysis: &EcgAnalysis, print: bool) {
    println!("Heart rate: {} bpm", analysis.adaptive_bpm);

    // Secondary estimate, only surfaced on request
    debug!(
        "LOESS heart rate: {} bpm from {} peaks",
        analysis.loess_bpm,
        analysis.loess.peaks.len()
    );

    if analysis.adaptive.peaks.is_empty() {
        warn!("Adaptive median filter found no peaks");
    }

    if print {
        println!(
            "Adaptive filter peaks: {:?}",
            analysis.adaptive.peaks.positions()
        );
        println!("LOESS peaks: {:?}", analysis.loess.peaks.positions());
    }
}

fn describe(error: &PipelineError) -> String {
    if error.is_format_error() {
        format!("Recording is not a valid packet stream: {}", error)
    } else {
        format!("Analysis failed: {}", error)
    }
}
