use ecg_lib::{analyze, EcgAnalysis, PipelineConfig, SAMPLE_RECORDING};
use numpy::PyArray1;
use pyo3::exceptions::{PyIOError, PyValueError};
use pyo3::prelude::*;

type AnalysisArrays<'py> = (
    Bound<'py, PyArray1<u64>>,
    Bound<'py, PyArray1<f64>>,
    Bound<'py, PyArray1<f64>>,
    Bound<'py, PyArray1<u64>>,
    Bound<'py, PyArray1<u64>>,
    u32,
    u32,
);

#[pymodule]
fn ecg_peaks<'py>(_py: Python<'py>, m: &Bound<'py, PyModule>) -> PyResult<()> {
    /**
     * Analyse a raw hex recording
     *
     * \param raw:         Concatenated 34 hex character packets
     * \param sampling_hz: Device sampling frequency
     *
     * \returns A tuple (index, raw series, filtered series, adaptive peaks,
     *          LOESS peaks, adaptive bpm, LOESS bpm). Series are numpy
     *          arrays aligned with the 1-based index.
     */
    #[pyfn(m)]
    #[pyo3(name = "analyze", signature = (raw, sampling_hz = 256))]
    fn analyze_recording<'py>(
        py: Python<'py>,
        raw: &str,
        sampling_hz: u32,
    ) -> PyResult<AnalysisArrays<'py>> {
        let analysis = run(raw, sampling_hz)?;
        Ok(to_arrays(py, analysis))
    }

    /**
     * Analyse a raw hex recording and write the per-sample table as parquet
     */
    #[pyfn(m)]
    #[pyo3(signature = (raw, path, sampling_hz = 256))]
    fn analyze_to_parquet(raw: &str, path: &str, sampling_hz: u32) -> PyResult<u32> {
        let analysis = run(raw, sampling_hz)?;
        analysis
            .to_parquet(path.into())
            .map_err(|e| PyIOError::new_err(e.to_string()))?;
        Ok(analysis.adaptive_bpm)
    }

    /**
     * The embedded 512 packet sample recording
     */
    #[pyfn(m)]
    fn sample_recording() -> &'static str {
        SAMPLE_RECORDING.trim()
    }

    Ok(())
}

fn run(raw: &str, sampling_hz: u32) -> PyResult<EcgAnalysis> {
    let config = PipelineConfig {
        sampling_hz,
        ..PipelineConfig::default()
    };
    analyze(raw, &config).map_err(|e| PyValueError::new_err(e.to_string()))
}

// Peak positions and indices as u64, numpy has no portable usize dtype
fn to_u64(values: &[usize]) -> Vec<u64> {
    values.iter().map(|&v| v as u64).collect()
}

fn to_arrays(py: Python<'_>, analysis: EcgAnalysis) -> AnalysisArrays<'_> {
    let EcgAnalysis {
        index,
        series,
        loess,
        adaptive,
        loess_bpm,
        adaptive_bpm,
    } = analysis;

    (
        PyArray1::from_vec_bound(py, to_u64(&index)),
        PyArray1::from_slice_bound(py, series.values()),
        PyArray1::from_slice_bound(py, adaptive.filtered.values()),
        PyArray1::from_vec_bound(py, to_u64(adaptive.peaks.positions())),
        PyArray1::from_vec_bound(py, to_u64(loess.peaks.positions())),
        adaptive_bpm,
        loess_bpm,
    )
}
