//! One Chebyshev predictive phase segment.
//!
//! A [`ChebyModel`] predicts pulse phase over a rectangle of time and observing
//! frequency:
//!
//! ```text
//! phase(mjd, f) = Σ c[i][j] T_i(x) T_j(y) + D / f²
//! x = 2 (mjd - mjd_start) / (mjd_end - mjd_start) - 1
//! y = 2 (f   - freq_start) / (freq_end - freq_start) - 1
//! ```
//!
//! The spin frequency is evaluated from a second grid (`frequency_cheby`)
//! rather than by differencing phases. When a serialized segment does not
//! carry that grid it is rebuilt from the analytic time derivative of the phase
//! grid, so every constructed segment can answer frequency queries.
use std::fmt;

use hifitime::{Duration, Epoch};
use serde::{de, Deserialize, Deserializer, Serialize};

use crate::{
    constants::{Cycles, Hertz, MHz, Mjd, SECONDS_PER_DAY},
    identifier::Identifier,
    long_double::LongDouble,
    predictor_errors::PredictorError,
    segment_set::{PhaseModel, Segment},
};

use super::cheby2d::Cheby2D;

/// Chebyshev predictive phase model valid on `[mjd_start, mjd_end)` and
/// `[freq_start, freq_end]`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChebyModel {
    psr_name: Identifier,
    site_name: Identifier,
    mjd_start: Mjd,
    mjd_end: Mjd,
    freq_start: MHz,
    freq_end: MHz,
    dispersion_constant: LongDouble,
    cheby: Cheby2D,
    frequency_cheby: Cheby2D,
    /// `true` when `frequency_cheby` was supplied rather than derived.
    fitted_frequency: bool,
}

impl<'de> Deserialize<'de> for ChebyModel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(rename = "ChebyModel")]
        struct Stored {
            psr_name: Identifier,
            site_name: Identifier,
            mjd_start: Mjd,
            mjd_end: Mjd,
            freq_start: MHz,
            freq_end: MHz,
            dispersion_constant: LongDouble,
            cheby: Cheby2D,
            frequency_cheby: Cheby2D,
            fitted_frequency: bool,
        }

        let s = Stored::deserialize(deserializer)?;
        ChebyModel::new(
            s.psr_name,
            s.site_name,
            (s.mjd_start, s.mjd_end),
            (s.freq_start, s.freq_end),
            s.dispersion_constant,
            s.cheby,
            s.fitted_frequency.then_some(s.frequency_cheby),
        )
        .map_err(de::Error::custom)
    }
}

impl ChebyModel {
    /// Validate and assemble a segment.
    ///
    /// Arguments
    /// -----------------
    /// * `psr_name`, `site_name`: Pulsar and observatory identifiers.
    /// * `mjd_range`: `(mjd_start, mjd_end)`, must satisfy `start < end`.
    /// * `freq_range`: `(freq_start, freq_end)` in MHz, must satisfy `start <= end`.
    /// * `dispersion_constant`: `D` in `D / f²` (cycles · MHz²).
    /// * `cheby`: Phase coefficient grid.
    /// * `frequency_cheby`: Independently fitted frequency grid (cycles per
    ///   unit of normalized time), or `None` to derive it from `cheby`.
    ///
    /// Return
    /// ----------
    /// * The segment, or [`PredictorError::InvalidSegment`] when a window is
    ///   empty/inverted or not finite.
    pub fn new(
        psr_name: Identifier,
        site_name: Identifier,
        mjd_range: (Mjd, Mjd),
        freq_range: (MHz, MHz),
        dispersion_constant: LongDouble,
        cheby: Cheby2D,
        frequency_cheby: Option<Cheby2D>,
    ) -> Result<Self, PredictorError> {
        let (mjd_start, mjd_end) = mjd_range;
        let (freq_start, freq_end) = freq_range;

        let all_finite = [mjd_start, mjd_end, freq_start, freq_end, dispersion_constant]
            .iter()
            .all(LongDouble::is_finite);
        if !all_finite {
            return Err(PredictorError::InvalidSegment(
                "non-finite time, frequency or dispersion value".into(),
            ));
        }
        if mjd_start >= mjd_end {
            return Err(PredictorError::InvalidSegment(format!(
                "empty time window [{mjd_start}, {mjd_end})"
            )));
        }
        if freq_start > freq_end {
            return Err(PredictorError::InvalidSegment(format!(
                "inverted frequency window [{freq_start}, {freq_end}]"
            )));
        }

        let fitted_frequency = frequency_cheby.is_some();
        let frequency_cheby = frequency_cheby.unwrap_or_else(|| cheby.time_derivative());

        Ok(ChebyModel {
            psr_name,
            site_name,
            mjd_start,
            mjd_end,
            freq_start,
            freq_end,
            dispersion_constant,
            cheby,
            frequency_cheby,
            fitted_frequency,
        })
    }

    pub fn psr_name(&self) -> &Identifier {
        &self.psr_name
    }

    pub fn site_name(&self) -> &Identifier {
        &self.site_name
    }

    pub fn mjd_start(&self) -> Mjd {
        self.mjd_start
    }

    pub fn mjd_end(&self) -> Mjd {
        self.mjd_end
    }

    pub fn freq_start(&self) -> MHz {
        self.freq_start
    }

    pub fn freq_end(&self) -> MHz {
        self.freq_end
    }

    pub fn dispersion_constant(&self) -> LongDouble {
        self.dispersion_constant
    }

    pub fn cheby(&self) -> &Cheby2D {
        &self.cheby
    }

    pub fn frequency_cheby(&self) -> &Cheby2D {
        &self.frequency_cheby
    }

    /// Whether the frequency grid was fitted upstream (and must be persisted).
    pub fn has_fitted_frequency(&self) -> bool {
        self.fitted_frequency
    }

    /// Map `(mjd, freq)` to the normalized square `[-1, 1]²`.
    ///
    /// A degenerate frequency window (`freq_start == freq_end`) maps every
    /// frequency to `y = 0`.
    pub fn normalize(&self, mjd: Mjd, freq: MHz) -> (LongDouble, LongDouble) {
        let x = (mjd - self.mjd_start) * 2.0 / (self.mjd_end - self.mjd_start) - 1.0;
        let width = self.freq_end - self.freq_start;
        let y = if width.is_zero() {
            LongDouble::ZERO
        } else {
            (freq - self.freq_start) * 2.0 / width - 1.0
        };
        (x, y)
    }

    /// Pulse phase (cycles) at `mjd` observed at `freq` MHz.
    ///
    /// The dispersion term `D / f²` is skipped for `freq == 0`, which stands
    /// for infinite frequency.
    pub fn phase(&self, mjd: Mjd, freq: MHz) -> Cycles {
        let (x, y) = self.normalize(mjd, freq);
        let phase = self.cheby.evaluate(x, y);
        if freq.is_zero() {
            phase
        } else {
            phase + self.dispersion_constant / (freq * freq)
        }
    }

    /// Apparent spin frequency (Hz) at `mjd` observed at `freq` MHz.
    pub fn frequency(&self, mjd: Mjd, freq: MHz) -> Hertz {
        let (x, y) = self.normalize(mjd, freq);
        // d(phase)/dx → cycles per day → cycles per second
        let per_day = self.frequency_cheby.evaluate(x, y) * 2.0 / (self.mjd_end - self.mjd_start);
        per_day / SECONDS_PER_DAY
    }
}

impl Segment for ChebyModel {
    fn start_mjd(&self) -> LongDouble {
        self.mjd_start
    }

    fn end_mjd(&self) -> LongDouble {
        self.mjd_end
    }
}

impl PhaseModel for ChebyModel {
    fn phase(&self, mjd: LongDouble, freq: LongDouble) -> LongDouble {
        ChebyModel::phase(self, mjd, freq)
    }

    fn frequency(&self, mjd: LongDouble, freq: LongDouble) -> LongDouble {
        ChebyModel::frequency(self, mjd, freq)
    }
}

impl fmt::Display for ChebyModel {
    /// One-line summary: pulsar, site, validity window as UTC epochs and its
    /// duration, frequency window and grid shape.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let start = Epoch::from_mjd_utc(self.mjd_start.to_f64());
        let end = Epoch::from_mjd_utc(self.mjd_end.to_f64());
        let span = Duration::from_seconds((self.mjd_end - self.mjd_start).to_f64() * SECONDS_PER_DAY);
        write!(
            f,
            "ChebyModel {} @ {}: {start} → {end} ({span}), {:.6}-{:.6} MHz, {}x{} coefficients",
            self.psr_name,
            self.site_name,
            self.freq_start,
            self.freq_end,
            self.cheby.nx(),
            self.cheby.ny()
        )
    }
}
