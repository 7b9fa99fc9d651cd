/** ------------------------------------------------------------
 * Time series assembled from decoded measurements
 * ------------------------------------------------------------- */
use crate::packet::Measurement;

/**
 * Ordered sample values, implicitly indexed 1..=N
 *
 * `frequency` is the number of samples per seasonal cycle. A value of 1
 * declares no periodicity.
 */
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeries {
    values: Vec<f64>,
    frequency: usize,
}

impl TimeSeries {
    pub fn new(values: Vec<f64>) -> Self {
        Self {
            values,
            frequency: 1,
        }
    }

    pub fn from_measurements(measurements: &[Measurement]) -> Self {
        Self::new(measurements.iter().map(|m| m.value as f64).collect())
    }

    pub fn with_frequency(mut self, frequency: usize) -> Self {
        self.frequency = frequency.max(1);
        self
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn frequency(&self) -> usize {
        self.frequency
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /**
     * 1-based sample positions aligned with the values
     */
    pub fn index(&self) -> Vec<usize> {
        (1..=self.values.len()).collect()
    }

    /**
     * Sample positions as regression abscissae
     */
    pub(crate) fn index_f64(&self) -> Vec<f64> {
        (1..=self.values.len()).map(|i| i as f64).collect()
    }
}
