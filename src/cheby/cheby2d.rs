//! Bivariate Chebyshev series and their evaluation.
//!
//! A [`Cheby2D`] holds an `nx × ny` coefficient grid `c[i][j]` and represents
//!
//! ```text
//! f(x, y) = Σ_i Σ_j c[i][j] · T_i(x) · T_j(y),     x, y ∈ [-1, 1]
//! ```
//!
//! where `x` is normalized time and `y` normalized observing frequency.
//! Evaluation uses the Clenshaw recurrence along each axis, so no explicit
//! powers of `x` or `y` are formed and the rounding error stays bounded by a
//! small multiple of the coefficient magnitudes. All arithmetic is done in
//! [`LongDouble`].
//!
//! Outside `[-1, 1]` the series is still evaluated (extrapolation); accuracy
//! then degrades quickly with distance.
use nalgebra::DMatrix;
use serde::{de, Deserialize, Deserializer, Serialize};

use crate::{long_double::LongDouble, predictor_errors::PredictorError};

/// Evaluate `Σ_k c_k T_k(x)` with the Clenshaw recurrence.
///
/// Arguments
/// -----------------
/// * `n`: Number of coefficients.
/// * `coeff`: Accessor for coefficient `k`, `0 <= k < n`.
/// * `x`: Normalized abscissa.
///
/// Return
/// ----------
/// * The series value; `0` when `n == 0`.
pub fn clenshaw(n: usize, coeff: impl Fn(usize) -> LongDouble, x: LongDouble) -> LongDouble {
    if n == 0 {
        return LongDouble::ZERO;
    }

    let two_x = x * 2.0;
    let mut b_k1 = LongDouble::ZERO; // b_{k+1}
    let mut b_k2 = LongDouble::ZERO; // b_{k+2}

    for k in (1..n).rev() {
        let b_k = two_x * b_k1 - b_k2 + coeff(k);
        b_k2 = b_k1;
        b_k1 = b_k;
    }

    x * b_k1 - b_k2 + coeff(0)
}

/// Dense bivariate Chebyshev coefficient grid, time terms by frequency terms.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Cheby2D {
    coeff: DMatrix<LongDouble>,
}

impl<'de> Deserialize<'de> for Cheby2D {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(rename = "Cheby2D")]
        struct Stored {
            coeff: DMatrix<LongDouble>,
        }

        let stored = Stored::deserialize(deserializer)?;
        Cheby2D::new(stored.coeff).map_err(de::Error::custom)
    }
}

impl Cheby2D {
    /// Wrap a coefficient matrix (`nx` rows for time, `ny` columns for frequency).
    ///
    /// Return
    /// ----------
    /// * [`PredictorError::InvalidSegment`] if either dimension is zero or a
    ///   coefficient is not finite.
    pub fn new(coeff: DMatrix<LongDouble>) -> Result<Self, PredictorError> {
        if coeff.nrows() == 0 || coeff.ncols() == 0 {
            return Err(PredictorError::InvalidSegment(format!(
                "Chebyshev grid must be at least 1x1, got {}x{}",
                coeff.nrows(),
                coeff.ncols()
            )));
        }
        if let Some(bad) = coeff.iter().find(|c| !c.is_finite()) {
            return Err(PredictorError::InvalidSegment(format!(
                "non-finite Chebyshev coefficient {bad}"
            )));
        }
        Ok(Cheby2D { coeff })
    }

    /// Build a grid from one row of frequency coefficients per time term.
    pub fn from_rows(rows: &[Vec<LongDouble>]) -> Result<Self, PredictorError> {
        let nx = rows.len();
        let ny = rows.first().map_or(0, Vec::len);
        if let Some(row) = rows.iter().find(|r| r.len() != ny) {
            return Err(PredictorError::InvalidSegment(format!(
                "ragged Chebyshev grid: expected {ny} frequency terms, found {}",
                row.len()
            )));
        }
        Cheby2D::new(DMatrix::from_fn(nx, ny, |i, j| rows[i][j]))
    }

    /// Number of time terms.
    pub fn nx(&self) -> usize {
        self.coeff.nrows()
    }

    /// Number of frequency terms.
    pub fn ny(&self) -> usize {
        self.coeff.ncols()
    }

    pub fn coeff(&self, ix: usize, iy: usize) -> LongDouble {
        self.coeff[(ix, iy)]
    }

    pub fn coefficients(&self) -> &DMatrix<LongDouble> {
        &self.coeff
    }

    /// Coefficients of time term `ix`, one per frequency term.
    pub fn row(&self, ix: usize) -> Vec<LongDouble> {
        (0..self.ny()).map(|iy| self.coeff[(ix, iy)]).collect()
    }

    /// Evaluate the series at normalized coordinates `(x, y)`.
    ///
    /// The frequency axis is collapsed first: each time term `i` gets the
    /// weight `Σ_j c[i][j] T_j(y)`, then a single Clenshaw pass runs over time.
    pub fn evaluate(&self, x: LongDouble, y: LongDouble) -> LongDouble {
        let ny = self.ny();
        let time_terms: Vec<LongDouble> = (0..self.nx())
            .map(|ix| clenshaw(ny, |iy| self.coeff[(ix, iy)], y))
            .collect();
        clenshaw(time_terms.len(), |ix| time_terms[ix], x)
    }

    /// Analytic derivative with respect to the normalized time `x`.
    ///
    /// Uses the backward recurrence `d[k-1] = d[k+1] + 2 k c[k]` applied to
    /// every frequency column, with `d[0]` halved. The result has `nx - 1`
    /// time terms (a single zero row when `nx == 1`).
    pub fn time_derivative(&self) -> Cheby2D {
        let nx = self.nx();
        let ny = self.ny();
        if nx < 2 {
            return Cheby2D {
                coeff: DMatrix::from_element(1, ny, LongDouble::ZERO),
            };
        }

        let mut deriv = DMatrix::from_element(nx - 1, ny, LongDouble::ZERO);
        for iy in 0..ny {
            let mut d_k1 = LongDouble::ZERO; // d[k]
            let mut d_k2 = LongDouble::ZERO; // d[k+1]
            for k in (1..nx).rev() {
                let d = d_k2 + self.coeff[(k, iy)] * (2.0 * k as f64);
                deriv[(k - 1, iy)] = d;
                d_k2 = d_k1;
                d_k1 = d;
            }
            deriv[(0, iy)] *= 0.5;
        }

        Cheby2D { coeff: deriv }
    }
}
