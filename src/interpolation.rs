//! 1-D interpolation used for cycle normalization.
//!
//! [`CubicSpline`] is a piecewise cubic with not-a-knot end conditions: the
//! third derivative is continuous across the second and the second-to-last
//! knot, so four points define a single cubic and any cubic polynomial is
//! reproduced exactly. [`LinearInterpolant`] is the cheap
//! alternative for very short cycles.
//!
//! Both refuse to extrapolate. Asking for a value outside the knot range is
//! an [`InterpolationError`], never a silent clamp.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why an interpolant could not be built or evaluated.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InterpolationError {
    #[error("need at least {needed} points, got {got}")]
    TooFewPoints { needed: usize, got: usize },

    #[error("x and y lengths differ ({x} vs {y})")]
    LengthMismatch { x: usize, y: usize },

    #[error("x must be strictly increasing (violated at index {0})")]
    NotIncreasing(usize),

    #[error("non-finite input value at index {0}")]
    NonFinite(usize),

    #[error("spline system is singular at row {0}")]
    Singular(usize),

    #[error("{value} is outside the interpolation range [{min}, {max}]")]
    OutOfRange { value: f64, min: f64, max: f64 },
}

/// Interpolation method, named by polynomial order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum InterpolationKind {
    /// Piecewise linear, needs 2 samples.
    Linear,
    /// Not-a-knot cubic spline, needs 4 samples.
    #[default]
    Cubic,
}

impl InterpolationKind {
    /// Fewest samples the method can fit (order + 1).
    pub fn min_points(self) -> usize {
        match self {
            InterpolationKind::Linear => 2,
            InterpolationKind::Cubic => 4,
        }
    }

    /// Fit `y` over `x` and evaluate at every point of `targets`.
    pub fn resample(self, x: &[f64], y: &[f64], targets: &[f64]) -> Result<Vec<f64>, InterpolationError> {
        match self {
            InterpolationKind::Linear => LinearInterpolant::new(x, y)?.evaluate_many(targets),
            InterpolationKind::Cubic => CubicSpline::new(x, y)?.evaluate_many(targets),
        }
    }

    /// Like [`resample`](Self::resample), but NaN or infinite `y` values flow
    /// into the result instead of failing the fit. A linear fit spoils only
    /// the intervals touching the bad sample; a spline spoils every output.
    pub fn resample_propagating(self, x: &[f64], y: &[f64], targets: &[f64]) -> Result<Vec<f64>, InterpolationError> {
        match self {
            InterpolationKind::Linear => LinearInterpolant::propagating(x, y)?.evaluate_many(targets),
            InterpolationKind::Cubic => CubicSpline::propagating(x, y)?.evaluate_many(targets),
        }
    }
}

/// `n` evenly spaced values from `start` to `end` inclusive.
/// The last value is exactly `end`.
pub fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (n - 1) as f64;
            let mut out: Vec<f64> = (0..n).map(|i| start + step * i as f64).collect();
            out[n - 1] = end;
            out
        }
    }
}

fn check_knots(x: &[f64], y: &[f64], needed: usize, finite_y: bool) -> Result<(), InterpolationError> {
    if x.len() != y.len() {
        return Err(InterpolationError::LengthMismatch { x: x.len(), y: y.len() });
    }
    if x.len() < needed {
        return Err(InterpolationError::TooFewPoints { needed, got: x.len() });
    }
    for (i, (xi, yi)) in x.iter().zip(y).enumerate() {
        if !xi.is_finite() || (finite_y && !yi.is_finite()) {
            return Err(InterpolationError::NonFinite(i));
        }
    }
    for i in 1..x.len() {
        if x[i] <= x[i - 1] {
            return Err(InterpolationError::NotIncreasing(i));
        }
    }
    Ok(())
}

/// Index `j` of the knot interval `[x[j], x[j + 1]]` containing `t`.
fn locate(x: &[f64], t: f64) -> Result<usize, InterpolationError> {
    let (min, max) = (x[0], x[x.len() - 1]);
    if !(t >= min && t <= max) {
        return Err(InterpolationError::OutOfRange { value: t, min, max });
    }
    let upper = x.partition_point(|&xi| xi <= t);
    Ok(upper.saturating_sub(1).min(x.len() - 2))
}

// ============================================================================
// LINEAR
// ============================================================================

#[derive(Debug, Clone)]
pub struct LinearInterpolant {
    x: Vec<f64>,
    y: Vec<f64>,
}

impl LinearInterpolant {
    pub fn new(x: &[f64], y: &[f64]) -> Result<Self, InterpolationError> {
        Self::fit(x, y, true)
    }

    /// Accepts non-finite `y`; they propagate into nearby evaluations.
    pub fn propagating(x: &[f64], y: &[f64]) -> Result<Self, InterpolationError> {
        Self::fit(x, y, false)
    }

    fn fit(x: &[f64], y: &[f64], finite_y: bool) -> Result<Self, InterpolationError> {
        check_knots(x, y, InterpolationKind::Linear.min_points(), finite_y)?;
        Ok(Self {
            x: x.to_vec(),
            y: y.to_vec(),
        })
    }

    pub fn evaluate(&self, t: f64) -> Result<f64, InterpolationError> {
        let j = locate(&self.x, t)?;
        let h = self.x[j + 1] - self.x[j];
        let w = (t - self.x[j]) / h;
        Ok(self.y[j] * (1.0 - w) + self.y[j + 1] * w)
    }

    pub fn evaluate_many(&self, targets: &[f64]) -> Result<Vec<f64>, InterpolationError> {
        targets.iter().map(|&t| self.evaluate(t)).collect()
    }
}

// ============================================================================
// CUBIC SPLINE
// ============================================================================

/// Not-a-knot cubic spline through `(x, y)`.
///
/// Stores the second derivative `m` at every knot. With spacings
/// `h[i] = x[i+1] - x[i]` the interior rows are
/// `h[i-1] m[i-1] + 2 (h[i-1] + h[i]) m[i] + h[i] m[i+1] = 6 (d[i] - d[i-1])`,
/// where `d` are the secant slopes. The two not-a-knot rows are folded into the
/// first and last interior rows, which leaves a tridiagonal system in
/// `m[1..n-1]` solved with the Thomas algorithm.
#[derive(Debug, Clone)]
pub struct CubicSpline {
    x: Vec<f64>,
    y: Vec<f64>,
    m: Vec<f64>,
}

impl CubicSpline {
    pub fn new(x: &[f64], y: &[f64]) -> Result<Self, InterpolationError> {
        Self::fit(x, y, true)
    }

    /// Accepts non-finite `y`. The spline couples every knot, so one bad
    /// sample makes every evaluation NaN.
    pub fn propagating(x: &[f64], y: &[f64]) -> Result<Self, InterpolationError> {
        Self::fit(x, y, false)
    }

    fn fit(x: &[f64], y: &[f64], finite_y: bool) -> Result<Self, InterpolationError> {
        check_knots(x, y, InterpolationKind::Cubic.min_points(), finite_y)?;

        let n = x.len();
        let h: Vec<f64> = x.windows(2).map(|w| w[1] - w[0]).collect();
        let d: Vec<f64> = (0..n - 1).map(|i| (y[i + 1] - y[i]) / h[i]).collect();

        // Unknowns m[1..=n-2], stored at k = i - 1.
        let size = n - 2;
        let mut sub = vec![0.0; size];
        let mut diag = vec![0.0; size];
        let mut sup = vec![0.0; size];
        let mut rhs = vec![0.0; size];

        for k in 0..size {
            let i = k + 1;
            sub[k] = h[i - 1];
            diag[k] = 2.0 * (h[i - 1] + h[i]);
            sup[k] = h[i];
            rhs[k] = 6.0 * (d[i] - d[i - 1]);
        }

        // m[0] = ((h0 + h1) m[1] - h0 m[2]) / h1
        let (h0, h1) = (h[0], h[1]);
        diag[0] = (h0 + h1) * (h0 + 2.0 * h1) / h1;
        sup[0] = (h1 * h1 - h0 * h0) / h1;

        // m[n-1] = ((a + b) m[n-2] - b m[n-3]) / a
        let (a, b) = (h[n - 3], h[n - 2]);
        let last = size - 1;
        diag[last] = (a + b) * (2.0 * a + b) / a;
        sub[last] = (a * a - b * b) / a;

        let interior = solve_tridiagonal(&sub, &diag, &sup, &rhs)?;

        let mut m = vec![0.0; n];
        m[1..n - 1].copy_from_slice(&interior);
        m[0] = ((h0 + h1) * m[1] - h0 * m[2]) / h1;
        m[n - 1] = ((a + b) * m[n - 2] - b * m[n - 3]) / a;

        Ok(Self {
            x: x.to_vec(),
            y: y.to_vec(),
            m,
        })
    }

    /// Knot abscissae.
    pub fn knots(&self) -> &[f64] {
        &self.x
    }

    pub fn evaluate(&self, t: f64) -> Result<f64, InterpolationError> {
        let j = locate(&self.x, t)?;
        let h = self.x[j + 1] - self.x[j];
        let left = self.x[j + 1] - t;
        let right = t - self.x[j];
        let (mj, mk) = (self.m[j], self.m[j + 1]);

        Ok(mj * left.powi(3) / (6.0 * h)
            + mk * right.powi(3) / (6.0 * h)
            + (self.y[j] / h - mj * h / 6.0) * left
            + (self.y[j + 1] / h - mk * h / 6.0) * right)
    }

    pub fn evaluate_many(&self, targets: &[f64]) -> Result<Vec<f64>, InterpolationError> {
        targets.iter().map(|&t| self.evaluate(t)).collect()
    }
}

/// Thomas algorithm. `sub[0]` and `sup[n-1]` are ignored.
fn solve_tridiagonal(sub: &[f64], diag: &[f64], sup: &[f64], rhs: &[f64]) -> Result<Vec<f64>, InterpolationError> {
    let n = diag.len();
    let mut c = vec![0.0; n];
    let mut r = vec![0.0; n];

    let mut pivot = diag[0];
    if pivot == 0.0 || !pivot.is_finite() {
        return Err(InterpolationError::Singular(0));
    }
    c[0] = sup[0] / pivot;
    r[0] = rhs[0] / pivot;

    for i in 1..n {
        pivot = diag[i] - sub[i] * c[i - 1];
        if pivot == 0.0 || !pivot.is_finite() {
            return Err(InterpolationError::Singular(i));
        }
        c[i] = if i + 1 < n { sup[i] / pivot } else { 0.0 };
        r[i] = (rhs[i] - sub[i] * r[i - 1]) / pivot;
    }

    let mut out = vec![0.0; n];
    out[n - 1] = r[n - 1];
    for i in (0..n - 1).rev() {
        out[i] = r[i] - c[i] * out[i + 1];
    }
    Ok(out)
}
