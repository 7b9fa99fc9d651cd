mod analysis;

use analysis::{decode_recording, run_analysis, AnalysisArgs};
use clap::{Parser, Subcommand};
use env_logger::Env;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/**
 * Available CLI commands
 */
#[derive(Subcommand)]
enum Commands {
    /// Detect peaks and estimate the heart rate of a recording
    Analyze {
        /// hex recording, the embedded sample recording if omitted
        #[arg(short = 'f', long, value_name = "FILE")]
        input_file: Option<PathBuf>,

        /// parquet output file for the plot renderer
        #[arg(short, long, value_name = "OUTFILE")]
        out_file: Option<PathBuf>,

        /// Whether to print the detected peak positions
        #[arg(short, long)]
        print: bool,

        /// Device sampling frequency in Hz
        #[arg(long, default_value_t = 256)]
        sampling_hz: u32,

        /// Span of the LOESS detector curve
        #[arg(long, default_value_t = 0.15)]
        span: f64,

        /// Smallest window of the adaptive median filter
        #[arg(long, default_value_t = 10)]
        min_width: usize,

        /// Largest window of the adaptive median filter
        #[arg(long, default_value_t = 200)]
        max_width: usize,
    },
    /// Print the decoded channel 1 values of a recording
    Decode {
        /// hex recording, the embedded sample recording if omitted
        #[arg(short = 'f', long, value_name = "FILE")]
        input_file: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(
        Env::default()
            .filter_or("ECG_LOG_LEVEL", "info")
            .write_style_or("ECG_LOG_STYLE", "auto"),
    )
    .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Some(Commands::Analyze {
            input_file,
            out_file,
            print,
            sampling_hz,
            span,
            min_width,
            max_width,
        }) => run_analysis(AnalysisArgs {
            input_file,
            out_file,
            print,
            sampling_hz,
            span,
            min_width,
            max_width,
        }),
        Some(Commands::Decode { input_file }) => decode_recording(input_file),
        None => Ok(()),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
