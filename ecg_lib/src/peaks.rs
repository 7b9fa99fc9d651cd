/** ------------------------------------------------------------
 * Peak extraction from a score curve
 * ------------------------------------------------------------- */
use crate::util::sign;

/**
 * Ordered 1-based sample positions of detected peaks
 */
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PeakSet(Vec<usize>);

impl PeakSet {
    pub fn positions(&self) -> &[usize] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<usize>> for PeakSet {
    fn from(positions: Vec<usize>) -> Self {
        Self(positions)
    }
}

/**
 * Strict local maxima of a sequence
 *
 * A sample is a peak when the sign of the first difference drops from +1
 * to -1 across it, i.e. the second difference of the signs is exactly -2.
 * Plateaus never qualify.
 *
 * ## Indexing
 *
 * For the zero-based second-difference position k the peak is the sample
 * k + 1 (zero-based), reported as the 1-based position k + 2.
 */
pub fn detect_peaks(values: &[f64]) -> PeakSet {
    let slopes: Vec<i8> = values.windows(2).map(|w| sign(w[1] - w[0])).collect();

    slopes
        .windows(2)
        .enumerate()
        .filter(|(_, s)| s[1] - s[0] == -2)
        .map(|(k, _)| k + 2)
        .collect::<Vec<usize>>()
        .into()
}
