/** ------------------------------------------------------------
 * Local regression (LOESS) smoothing
 *
 * Fits are evaluated directly at every requested abscissa: the q
 * nearest neighbours (q = floor(n * span)) are weighted with a tricube
 * kernel and a local polynomial is solved by weighted least squares.
 * ------------------------------------------------------------- */
use crate::errors::PipelineError;
use log::trace;
use nalgebra::{DMatrix, DVector};

pub const DEFAULT_SPAN: f64 = 0.75;
pub const DEFAULT_DEGREE: usize = 2;

// Singular values below this are treated as zero in the local solve
const SVD_EPS: f64 = 1e-10;

/**
 * LOESS smoother parameters
 */
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Loess {
    pub span: f64,
    pub degree: usize,
}

impl Default for Loess {
    fn default() -> Self {
        Self {
            span: DEFAULT_SPAN,
            degree: DEFAULT_DEGREE,
        }
    }
}

impl Loess {
    pub fn new(span: f64) -> Self {
        Self {
            span,
            ..Default::default()
        }
    }

    pub fn with_degree(mut self, degree: usize) -> Self {
        self.degree = degree;
        self
    }

    pub fn fit<'a>(&self, x: &'a [f64], y: &'a [f64]) -> Result<LoessFit<'a>, PipelineError> {
        self.fit_weighted(x, y, None)
    }

    /**
     * Fit with optional prior weights per observation
     *
     * \param weights Multiplied into the tricube weights, e.g. robustness
     *                weights of an outer iteration. Must match `x` in length.
     */
    pub fn fit_weighted<'a>(
        &self,
        x: &'a [f64],
        y: &'a [f64],
        weights: Option<&'a [f64]>,
    ) -> Result<LoessFit<'a>, PipelineError> {
        if !(self.span.is_finite() && self.span > 0.0) {
            return Err(PipelineError::InvalidSpan { span: self.span });
        }

        let n = x.len();
        if y.len() != n {
            return Err(PipelineError::LengthMismatch {
                expected: n,
                found: y.len(),
            });
        }
        if let Some(w) = weights.filter(|w| w.len() != n) {
            return Err(PipelineError::LengthMismatch {
                expected: n,
                found: w.len(),
            });
        }

        let num_neighbours = ((n as f64 * self.span.min(1.0)).floor() as usize).min(n);
        let num_coefficients = self.degree + 1;
        if num_neighbours < num_coefficients {
            return Err(PipelineError::InsufficientData {
                required: (num_coefficients as f64 / self.span.min(1.0)).ceil() as usize,
                available: n,
            });
        }

        Ok(LoessFit {
            x,
            y,
            weights,
            num_neighbours,
            span: self.span,
            degree: self.degree,
        })
    }
}

/**
 * A LOESS model bound to its data, evaluated lazily per abscissa
 */
#[derive(Debug, Clone)]
pub struct LoessFit<'a> {
    x: &'a [f64],
    y: &'a [f64],
    weights: Option<&'a [f64]>,
    num_neighbours: usize,
    span: f64,
    degree: usize,
}

fn tricube(u: f64) -> f64 {
    let t = 1.0 - u * u * u;
    t * t * t
}

impl LoessFit<'_> {
    pub fn num_neighbours(&self) -> usize {
        self.num_neighbours
    }

    /**
     * Fitted value at a single abscissa
     */
    pub fn predict(&self, x0: f64) -> f64 {
        let distances: Vec<f64> = self.x.iter().map(|&xi| (xi - x0).abs()).collect();

        let mut bandwidth = {
            let mut sorted = distances.clone();
            let (_, qth, _) =
                sorted.select_nth_unstable_by(self.num_neighbours - 1, f64::total_cmp);
            *qth
        };
        if self.span > 1.0 {
            bandwidth *= self.span;
        }

        let mut rows = self.neighbourhood(x0, &distances, bandwidth, self.weights);
        if rows.is_empty() && self.weights.is_some() {
            // Every neighbour carries zero prior weight, fall back to the kernel alone
            rows = self.neighbourhood(x0, &distances, bandwidth, None);
        }
        if rows.is_empty() {
            trace!("Empty LOESS neighbourhood at x = {}", x0);
            return f64::NAN;
        }

        let num_coefficients = self.degree + 1;
        let design = DMatrix::from_fn(rows.len(), num_coefficients, |r, c| {
            let (sqrt_w, dx, _) = rows[r];
            sqrt_w * dx.powi(c as i32)
        });
        let rhs = DVector::from_iterator(rows.len(), rows.iter().map(|&(sqrt_w, _, y)| sqrt_w * y));

        match design.svd(true, true).solve(&rhs, SVD_EPS) {
            Ok(beta) => beta[0],
            Err(e) => {
                trace!("LOESS solve failed at x = {}: {}", x0, e);
                let total: f64 = rows.iter().map(|&(s, _, _)| s * s).sum();
                rows.iter().map(|&(s, _, y)| s * s * y).sum::<f64>() / total
            }
        }
    }

    /**
     * Weighted design rows (sqrt(w), dx, y) of the neighbourhood of x0
     *
     * Abscissae are centred on x0 and scaled by the bandwidth, so the
     * intercept of the local polynomial is the fitted value.
     */
    fn neighbourhood(
        &self,
        x0: f64,
        distances: &[f64],
        bandwidth: f64,
        weights: Option<&[f64]>,
    ) -> Vec<(f64, f64, f64)> {
        let mut rows = Vec::with_capacity(self.num_neighbours);
        for (i, &d) in distances.iter().enumerate() {
            if d >= bandwidth && !(bandwidth == 0.0 && d == 0.0) {
                continue;
            }
            let kernel = if bandwidth > 0.0 {
                tricube(d / bandwidth)
            } else {
                1.0
            };
            let w = kernel * weights.map_or(1.0, |w| w[i]);
            if w > 0.0 {
                let dx = if bandwidth > 0.0 {
                    (self.x[i] - x0) / bandwidth
                } else {
                    0.0
                };
                rows.push((w.sqrt(), dx, self.y[i]));
            }
        }
        rows
    }

    /**
     * Fitted values at every observed abscissa, evaluated one at a time in order
     */
    pub fn fitted(&self) -> Vec<f64> {
        self.x.iter().map(|&x0| self.predict(x0)).collect()
    }

    pub fn residuals(&self) -> Vec<f64> {
        self.fitted()
            .iter()
            .zip(self.y)
            .map(|(fitted, observed)| observed - fitted)
            .collect()
    }
}
