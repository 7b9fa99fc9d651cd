/** ------------------------------------------------------------
 * Robust seasonal-trend decomposition by LOESS
 *
 * Periodic variant: the seasonal component is the (robustly weighted)
 * mean of each cycle position, centred to zero over one period. The
 * trend is a degree-1 LOESS of the deseasonalised series.
 * ------------------------------------------------------------- */
use crate::errors::PipelineError;
use crate::loess::Loess;
use crate::util::median;
use log::debug;

/**
 * Decomposition parameters
 */
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Stl {
    pub period: usize,
    pub inner_iterations: usize,
    pub outer_iterations: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Decomposition {
    pub seasonal: Vec<f64>,
    pub trend: Vec<f64>,
    pub remainder: Vec<f64>,
}

impl Stl {
    /**
     * Robust decomposition: one inner pass per robustness iteration
     */
    pub fn robust(period: usize) -> Self {
        Self {
            period,
            inner_iterations: 1,
            outer_iterations: 15,
        }
    }

    pub fn non_robust(period: usize) -> Self {
        Self {
            period,
            inner_iterations: 2,
            outer_iterations: 0,
        }
    }

    /**
     * Trend smoother window in samples, always odd
     */
    fn trend_window(&self, n: usize) -> usize {
        let seasonal_window = (10 * n + 1) as f64;
        let window = (1.5 * self.period as f64 / (1.0 - 1.5 / seasonal_window)).ceil() as usize;
        window | 1
    }

    pub fn decompose(&self, values: &[f64]) -> Result<Decomposition, PipelineError> {
        let n = values.len();
        if self.period < 2 || n < 2 * self.period {
            return Err(PipelineError::InsufficientData {
                required: 2 * self.period.max(2),
                available: n,
            });
        }

        let x: Vec<f64> = (1..=n).map(|i| i as f64).collect();
        let trend_window = self.trend_window(n);
        // Half a sample of slack so that floor(n * span) lands on the window
        let trend_smoother = Loess::new((trend_window as f64 + 0.5) / n as f64).with_degree(1);

        let mut trend = vec![0.0; n];
        let mut seasonal = vec![0.0; n];
        let mut robustness = vec![1.0; n];

        for outer in 0..=self.outer_iterations {
            for _ in 0..self.inner_iterations {
                let detrended: Vec<f64> = values.iter().zip(&trend).map(|(v, t)| v - t).collect();
                seasonal = self.periodic_component(&detrended, &robustness);

                let deseasonalized: Vec<f64> =
                    values.iter().zip(&seasonal).map(|(v, s)| v - s).collect();
                trend = trend_smoother
                    .fit_weighted(&x, &deseasonalized, Some(robustness.as_slice()))?
                    .fitted();
            }

            if outer < self.outer_iterations {
                let remainder: Vec<f64> = (0..n).map(|i| values[i] - seasonal[i] - trend[i]).collect();
                robustness = bisquare_weights(&remainder);
            }
        }

        let remainder = (0..n).map(|i| values[i] - seasonal[i] - trend[i]).collect();
        debug!(
            "Decomposed {} samples, period {}, trend window {}",
            n, self.period, trend_window
        );

        Ok(Decomposition {
            seasonal,
            trend,
            remainder,
        })
    }

    /**
     * Weighted cycle-position means, centred over one period
     */
    fn periodic_component(&self, detrended: &[f64], weights: &[f64]) -> Vec<f64> {
        let mut cycle_means = vec![0.0; self.period];
        for (phase, mean) in cycle_means.iter_mut().enumerate() {
            let positions = (phase..detrended.len()).step_by(self.period);
            let total_weight: f64 = positions.clone().map(|i| weights[i]).sum();
            *mean = if total_weight > 0.0 {
                positions.map(|i| weights[i] * detrended[i]).sum::<f64>() / total_weight
            } else {
                let count = positions.clone().count() as f64;
                positions.map(|i| detrended[i]).sum::<f64>() / count
            };
        }

        let centre = cycle_means.iter().sum::<f64>() / self.period as f64;
        (0..detrended.len())
            .map(|i| cycle_means[i % self.period] - centre)
            .collect()
    }
}

/**
 * Bisquare robustness weights from residuals, scaled by 6 * median |r|
 */
fn bisquare_weights(residuals: &[f64]) -> Vec<f64> {
    let absolute: Vec<f64> = residuals.iter().map(|r| r.abs()).collect();
    let scale = 6.0 * median(&absolute);
    if scale <= 0.0 {
        return vec![1.0; residuals.len()];
    }

    absolute
        .iter()
        .map(|&r| {
            let u = r / scale;
            if u < 1.0 {
                (1.0 - u * u).powi(2)
            } else {
                0.0
            }
        })
        .collect()
}
