/** ------------------------------------------------------------
 * Persistence (handing the analysis to the plot renderer as parquet)
 * ------------------------------------------------------------- */
use crate::peaks::PeakSet;
use crate::EcgAnalysis;
use std::fs::File;
use std::path::PathBuf;

use polars::prelude::*;
use polars::{error::PolarsError, frame::DataFrame, series::Series};

/**
 * Per-sample flags marking the 1-based peak positions
 */
fn peak_mask(peaks: &PeakSet, len: usize) -> Vec<bool> {
    let mut mask = vec![false; len];
    for &position in peaks.positions() {
        if (1..=len).contains(&position) {
            mask[position - 1] = true;
        }
    }
    mask
}

/**
 * Parquet conversion of the analysis, one row per sample
 */
impl EcgAnalysis {
    pub fn to_dataframe(&self) -> Result<DataFrame, PolarsError> {
        let len = self.series.len();

        // Convert usize indices to u32, polars has no usize column type
        let index_series = Series::new(
            "sample_index",
            &self
                .index
                .iter()
                .map(|&i| i as u32)
                .collect::<Vec<u32>>(),
        );

        let columns = vec![
            index_series,
            Series::new("channel_1", self.series.values()),
            Series::new("adaptive_filtered", self.adaptive.filtered.values()),
            Series::new("loess_fitted", &self.loess.fitted),
            Series::new("loess_score", &self.loess.scores.scores),
            Series::new("adaptive_score", &self.adaptive.scores.scores),
            Series::new("loess_peak", &peak_mask(&self.loess.peaks, len)),
            Series::new("adaptive_peak", &peak_mask(&self.adaptive.peaks, len)),
            // Renderer reads the title annotation from here
            Series::new("adaptive_bpm", &vec![self.adaptive_bpm; len]),
        ];

        DataFrame::new(columns)
    }

    pub fn to_parquet(&self, file_path: PathBuf) -> Result<(), PolarsError> {
        let mut df = self.to_dataframe()?;

        let file = File::create(file_path)?;
        ParquetWriter::new(file).finish(&mut df)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{analyze, PipelineConfig, SAMPLE_RECORDING};
    use tempdir::TempDir;

    #[test]
    fn mask_marks_positions() {
        let mask = peak_mask(&PeakSet::from(vec![1, 3]), 4);
        assert_eq!(mask, vec![true, false, true, false]);
    }

    #[test]
    fn parquet_round_trip_shape() {
        let analysis = analyze(SAMPLE_RECORDING, &PipelineConfig::default()).unwrap();
        let dir = TempDir::new("ecg_lib").unwrap();
        let path = dir.path().join("analysis.parquet");

        analysis.to_parquet(path.clone()).unwrap();

        let df = ParquetReader::new(File::open(&path).unwrap())
            .finish()
            .unwrap();
        assert_eq!(df.shape(), (512, 9));
        let flagged = df
            .column("adaptive_peak")
            .unwrap()
            .bool()
            .unwrap()
            .into_iter()
            .filter(|flag| *flag == Some(true))
            .count();
        assert_eq!(flagged, analysis.adaptive.peaks.len());
    }
}
