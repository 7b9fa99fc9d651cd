/** ------------------------------------------------------------
 * Heart rate from a peak count
 * ------------------------------------------------------------- */
use crate::errors::PipelineError;
use crate::util::round_half_up;

/// Sampling frequency of the device in Hz
pub const SAMPLING_HZ: u32 = 256;

/**
 * Beats per minute for `peak_count` beats over `series_length` samples
 *
 * bpm = round_half_up(peak_count * 60 * sampling_hz / series_length)
 */
pub fn estimate(
    peak_count: usize,
    series_length: usize,
    sampling_hz: u32,
) -> Result<u32, PipelineError> {
    if series_length == 0 {
        return Err(PipelineError::DivisionByZero);
    }

    let bpm = peak_count as f64 * 60.0 * sampling_hz as f64 / series_length as f64;
    Ok(round_half_up(bpm) as u32)
}
