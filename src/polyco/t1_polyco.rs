//! TEMPO1-style Taylor-series predictive segment ("polyco").
//!
//! A polyco describes the phase around a reference epoch `TMID` as
//!
//! ```text
//! dt    = (mjd - TMID) · 1440                        (minutes)
//! phase = RPHASE + 60 · F0 · dt + Σ_i c[i] · dt^i
//! freq  = F0 + (Σ_i i · c[i] · dt^(i-1)) / 60          (Hz)
//! ```
//!
//! valid on `[TMID - span/2, TMID + span/2)`. Both series are evaluated with
//! Horner's scheme in [`LongDouble`].
//!
//! Two additive corrections are applied on top of the spin series:
//!
//! * **binary terms**: when present, `binary_phase + binary_frequency · dt[s]`
//!   is added to the phase and `binary_frequency` to the frequency. They model
//!   orbital modulation on its own timescale instead of folding it into the
//!   coefficients.
//! * **dispersion**: a polyco is fitted at one observing frequency. Queried at
//!   another frequency `f`, the arrival delay changes by
//!   `DM / 2.41e-4 · (1/f² - 1/f_obs²)` seconds (both frequencies shifted to the
//!   barycentric frame by the Doppler factor), and the phase moves back by that
//!   delay times the spin frequency.
use std::fmt;

use hifitime::{Duration, Epoch};
use serde::{de, Deserialize, Deserializer, Serialize};

use crate::{
    constants::{
        Cycles, Hertz, MHz, Mjd, DISPERSION_K, MAX_POLYCO_COEFFS, MINUTES_PER_DAY,
        SECONDS_PER_MINUTE,
    },
    identifier::Identifier,
    long_double::LongDouble,
    predictor_errors::PredictorError,
    segment_set::{PhaseModel, Segment},
};

/// Orbital phase (cycles) at `TMID` and orbital frequency (Hz) of a binary pulsar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BinaryTerms {
    pub phase: f64,
    pub frequency: f64,
}

/// One Taylor-series segment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct T1Polyco {
    psr_name: Identifier,
    site_name: Identifier,
    mjd_mid: Mjd,
    span_minutes: u32,
    reference_phase: Cycles,
    frequency_psr_0: Hertz,
    coeff: Vec<LongDouble>,
    dm: f64,
    doppler: f64,
    log10rms: f64,
    frequency_obs: f64,
    binary: Option<BinaryTerms>,
}

impl<'de> Deserialize<'de> for T1Polyco {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(rename = "T1Polyco")]
        struct Stored {
            psr_name: Identifier,
            site_name: Identifier,
            mjd_mid: Mjd,
            span_minutes: u32,
            reference_phase: Cycles,
            frequency_psr_0: Hertz,
            coeff: Vec<LongDouble>,
            dm: f64,
            doppler: f64,
            log10rms: f64,
            frequency_obs: f64,
            binary: Option<BinaryTerms>,
        }

        let s = Stored::deserialize(deserializer)?;
        let polyco = T1Polyco::new(
            s.psr_name,
            s.site_name,
            s.mjd_mid,
            s.span_minutes,
            s.reference_phase,
            s.frequency_psr_0,
            s.coeff,
        )
        .map_err(de::Error::custom)?
        .with_dispersion(s.dm, s.frequency_obs)
        .with_doppler(s.doppler)
        .with_log10rms(s.log10rms);
        Ok(match s.binary {
            Some(b) => polyco.with_binary(b.phase, b.frequency),
            None => polyco,
        })
    }
}

impl T1Polyco {
    /// Validate and assemble a polyco with no dispersion, Doppler or binary terms.
    ///
    /// Arguments
    /// -----------------
    /// * `psr_name`, `site_name`: Pulsar and observatory identifiers.
    /// * `mjd_mid`: Reference epoch `TMID`.
    /// * `span_minutes`: Validity span centred on `TMID`, must be positive.
    /// * `reference_phase`: Phase at `TMID` (cycles).
    /// * `frequency_psr_0`: Spin frequency at `TMID` (Hz).
    /// * `coeff`: Taylor coefficients in powers of minutes, at most
    ///   [`MAX_POLYCO_COEFFS`].
    ///
    /// Return
    /// ----------
    /// * The polyco, [`PredictorError::TooManyCoefficients`] on coefficient
    ///   overflow, or [`PredictorError::InvalidSegment`] for a zero span or a
    ///   non-finite value.
    pub fn new(
        psr_name: Identifier,
        site_name: Identifier,
        mjd_mid: Mjd,
        span_minutes: u32,
        reference_phase: Cycles,
        frequency_psr_0: Hertz,
        coeff: Vec<LongDouble>,
    ) -> Result<Self, PredictorError> {
        if coeff.len() > MAX_POLYCO_COEFFS {
            return Err(PredictorError::TooManyCoefficients(coeff.len()));
        }
        if span_minutes == 0 {
            return Err(PredictorError::InvalidSegment(
                "polyco span must be positive".into(),
            ));
        }
        let all_finite = [mjd_mid, reference_phase, frequency_psr_0]
            .iter()
            .chain(coeff.iter())
            .all(LongDouble::is_finite);
        if !all_finite {
            return Err(PredictorError::InvalidSegment(
                "non-finite polyco epoch, phase, frequency or coefficient".into(),
            ));
        }

        Ok(T1Polyco {
            psr_name,
            site_name,
            mjd_mid,
            span_minutes,
            reference_phase,
            frequency_psr_0,
            coeff,
            dm: 0.0,
            doppler: 0.0,
            log10rms: 0.0,
            frequency_obs: 0.0,
            binary: None,
        })
    }

    /// Dispersion measure (pc cm⁻³) and the observing frequency (MHz) the
    /// polyco was fitted at.
    pub fn with_dispersion(mut self, dm: f64, frequency_obs: f64) -> Self {
        self.dm = dm;
        self.frequency_obs = frequency_obs;
        self
    }

    /// Observatory Doppler factor, in units of 1e-4.
    pub fn with_doppler(mut self, doppler: f64) -> Self {
        self.doppler = doppler;
        self
    }

    pub fn with_log10rms(mut self, log10rms: f64) -> Self {
        self.log10rms = log10rms;
        self
    }

    pub fn with_binary(mut self, phase: f64, frequency: f64) -> Self {
        self.binary = Some(BinaryTerms { phase, frequency });
        self
    }

    pub fn psr_name(&self) -> &Identifier {
        &self.psr_name
    }

    pub fn site_name(&self) -> &Identifier {
        &self.site_name
    }

    pub fn mjd_mid(&self) -> Mjd {
        self.mjd_mid
    }

    pub fn span_minutes(&self) -> u32 {
        self.span_minutes
    }

    pub fn reference_phase(&self) -> Cycles {
        self.reference_phase
    }

    pub fn frequency_psr_0(&self) -> Hertz {
        self.frequency_psr_0
    }

    pub fn coefficients(&self) -> &[LongDouble] {
        &self.coeff
    }

    pub fn dm(&self) -> f64 {
        self.dm
    }

    pub fn doppler(&self) -> f64 {
        self.doppler
    }

    pub fn log10rms(&self) -> f64 {
        self.log10rms
    }

    pub fn frequency_obs(&self) -> f64 {
        self.frequency_obs
    }

    pub fn binary(&self) -> Option<BinaryTerms> {
        self.binary
    }

    fn half_span_days(&self) -> LongDouble {
        LongDouble::from(self.span_minutes) / (2.0 * MINUTES_PER_DAY)
    }

    /// Minutes elapsed since `TMID`.
    pub fn elapsed_minutes(&self, mjd: Mjd) -> LongDouble {
        (mjd - self.mjd_mid) * MINUTES_PER_DAY
    }

    fn spin_phase(&self, dt: LongDouble) -> Cycles {
        let series = self
            .coeff
            .iter()
            .rev()
            .fold(LongDouble::ZERO, |acc, &c| acc * dt + c);
        self.reference_phase + self.frequency_psr_0 * dt * SECONDS_PER_MINUTE + series
    }

    fn spin_frequency(&self, dt: LongDouble) -> Hertz {
        let derivative = self
            .coeff
            .iter()
            .enumerate()
            .skip(1)
            .rev()
            .fold(LongDouble::ZERO, |acc, (i, &c)| acc * dt + c * (i as f64));
        self.frequency_psr_0 + derivative / SECONDS_PER_MINUTE
    }

    /// Extra arrival delay (s) at `freq` relative to the fitted observing frequency.
    fn dispersion_delay(&self, freq: MHz) -> Option<LongDouble> {
        if self.dm == 0.0 || self.frequency_obs <= 0.0 || freq <= 0.0 {
            return None;
        }
        let shift = 1.0 + self.doppler * 1e-4;
        let f = freq * shift;
        let f_obs = LongDouble::from(self.frequency_obs) * shift;
        let inverse_sq = LongDouble::ONE / (f * f) - LongDouble::ONE / (f_obs * f_obs);
        Some(inverse_sq * (self.dm / DISPERSION_K))
    }

    /// Pulse phase (cycles) at `mjd` observed at `freq` MHz.
    pub fn phase(&self, mjd: Mjd, freq: MHz) -> Cycles {
        let dt = self.elapsed_minutes(mjd);
        let mut phase = self.spin_phase(dt);
        if let Some(binary) = self.binary {
            phase += binary.phase + dt * SECONDS_PER_MINUTE * binary.frequency;
        }
        if let Some(delay) = self.dispersion_delay(freq) {
            phase -= delay * self.frequency(mjd, freq);
        }
        phase
    }

    /// Apparent spin frequency (Hz) at `mjd`; the observing frequency only
    /// matters through the phase.
    pub fn frequency(&self, mjd: Mjd, _freq: MHz) -> Hertz {
        let dt = self.elapsed_minutes(mjd);
        let mut frequency = self.spin_frequency(dt);
        if let Some(binary) = self.binary {
            frequency += binary.frequency;
        }
        frequency
    }
}

impl Segment for T1Polyco {
    fn start_mjd(&self) -> LongDouble {
        self.mjd_mid - self.half_span_days()
    }

    fn end_mjd(&self) -> LongDouble {
        self.mjd_mid + self.half_span_days()
    }
}

impl PhaseModel for T1Polyco {
    fn phase(&self, mjd: LongDouble, freq: LongDouble) -> LongDouble {
        T1Polyco::phase(self, mjd, freq)
    }

    fn frequency(&self, mjd: LongDouble, freq: LongDouble) -> LongDouble {
        T1Polyco::frequency(self, mjd, freq)
    }
}

impl fmt::Display for T1Polyco {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tmid = Epoch::from_mjd_utc(self.mjd_mid.to_f64());
        let span = Duration::from_seconds(f64::from(self.span_minutes) * SECONDS_PER_MINUTE);
        write!(
            f,
            "T1Polyco {} @ {}: TMID {tmid} ({span}), F0 {:.12} Hz, {} coefficients",
            self.psr_name,
            self.site_name,
            self.frequency_psr_0,
            self.coeff.len()
        )?;
        if let Some(binary) = self.binary {
            write!(f, ", binary phase {} freq {}", binary.phase, binary.frequency)?;
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod test_t1_polyco {
    use approx::assert_abs_diff_eq;

    use super::*;

    pub(crate) fn ld(x: f64) -> LongDouble {
        LongDouble::from(x)
    }

    /// 90-minute polyco with constant spin frequency `f0` and phase `rphase` at
    /// `tmid`. The half span, 1/32 day, is exact in binary.
    pub(crate) fn constant_polyco(tmid: f64, rphase: f64, f0: f64) -> T1Polyco {
        T1Polyco::new(
            Identifier::new("B1937+21").unwrap(),
            Identifier::new("ao").unwrap(),
            ld(tmid),
            90,
            ld(rphase),
            ld(f0),
            vec![],
        )
        .unwrap()
    }

    #[test]
    fn test_deserialize_validates() {
        let p = constant_polyco(59000.5, 0.25, 641.9)
            .with_dispersion(71.0, 1410.0)
            .with_binary(0.5, 1e-4);
        let value = serde_json::to_value(&p).unwrap();
        assert_eq!(serde_json::from_value::<T1Polyco>(value.clone()).unwrap(), p);

        let mut zero_span = value.clone();
        zero_span["span_minutes"] = serde_json::json!(0);
        let err = serde_json::from_value::<T1Polyco>(zero_span).unwrap_err();
        assert!(err.to_string().contains("span must be positive"), "{err}");

        let mut crowded = value;
        crowded["coeff"] = serde_json::json!(vec![ld(1.0); MAX_POLYCO_COEFFS + 1]);
        assert!(serde_json::from_value::<T1Polyco>(crowded).is_err());
    }

    #[test]
    fn test_window() {
        let p = constant_polyco(59000.5, 0.0, 641.9);
        assert_abs_diff_eq!(p.start_mjd().to_f64(), 59000.5 - 45.0 / 1440.0, epsilon = 1e-12);
        assert_abs_diff_eq!(p.end_mjd().to_f64(), 59000.5 + 45.0 / 1440.0, epsilon = 1e-12);
        assert!(p.contains(ld(59000.5)));
        assert!(!p.contains(p.end_mjd()));
    }

    #[test]
    fn test_constant_frequency() {
        let p = constant_polyco(59000.5, 0.25, 641.9);
        let t = ld(59000.5) + ld(10.0) / MINUTES_PER_DAY;
        assert_abs_diff_eq!(p.phase(t, ld(1400.0)).to_f64(), 0.25 + 641.9 * 600.0, epsilon = 1e-7);
        assert_abs_diff_eq!(p.frequency(t, ld(1400.0)).to_f64(), 641.9, epsilon = 1e-12);
    }

    #[test]
    fn test_taylor_series() {
        // c = [1, 2, 3] → phase adds 1 + 2 dt + 3 dt², frequency adds (2 + 6 dt) / 60
        let p = T1Polyco::new(
            Identifier::new("B1937+21").unwrap(),
            Identifier::new("ao").unwrap(),
            ld(59000.5),
            120,
            ld(0.0),
            ld(100.0),
            vec![ld(1.0), ld(2.0), ld(3.0)],
        )
        .unwrap();
        let dt = 5.0;
        let t = ld(59000.5) + ld(dt) / MINUTES_PER_DAY;
        let phase = 100.0 * 60.0 * dt + 1.0 + 2.0 * dt + 3.0 * dt * dt;
        assert_abs_diff_eq!(p.phase(t, ld(0.0)).to_f64(), phase, epsilon = 1e-8);
        let freq = 100.0 + (2.0 + 6.0 * dt) / 60.0;
        assert_abs_diff_eq!(p.frequency(t, ld(0.0)).to_f64(), freq, epsilon = 1e-12);
    }

    #[test]
    fn test_binary_terms_are_additive() {
        let plain = constant_polyco(59000.5, 0.0, 200.0);
        let binary = plain.clone().with_binary(0.125, 0.001);
        let t = ld(59000.5) + ld(2.0) / MINUTES_PER_DAY;
        let dphase = binary.phase(t, ld(0.0)) - plain.phase(t, ld(0.0));
        assert_abs_diff_eq!(dphase.to_f64(), 0.125 + 0.001 * 120.0, epsilon = 1e-12);
        let dfreq = binary.frequency(t, ld(0.0)) - plain.frequency(t, ld(0.0));
        assert_abs_diff_eq!(dfreq.to_f64(), 0.001, epsilon = 1e-15);
    }

    #[test]
    fn test_dispersion_rereference() {
        let p = constant_polyco(59000.5, 0.0, 100.0).with_dispersion(10.0, 1400.0);
        let t = ld(59000.5);
        // at the fitted frequency nothing changes
        assert_abs_diff_eq!(p.phase(t, ld(1400.0)).to_f64(), 0.0, epsilon = 1e-12);
        // at a lower frequency pulses arrive later: phase decreases
        let delay = 10.0 / DISPERSION_K * (1.0 / (700.0 * 700.0) - 1.0 / (1400.0 * 1400.0));
        assert_abs_diff_eq!(p.phase(t, ld(700.0)).to_f64(), -100.0 * delay, epsilon = 1e-9);
        // infinite frequency (0) disables the correction
        assert_abs_diff_eq!(p.phase(t, ld(0.0)).to_f64(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_invalid_polycos() {
        let make = |span: u32, n: usize| {
            T1Polyco::new(
                Identifier::new("B1937+21").unwrap(),
                Identifier::new("ao").unwrap(),
                ld(59000.5),
                span,
                ld(0.0),
                ld(100.0),
                vec![ld(0.0); n],
            )
        };
        assert!(make(60, MAX_POLYCO_COEFFS).is_ok());
        assert_eq!(
            make(60, MAX_POLYCO_COEFFS + 1).unwrap_err(),
            PredictorError::TooManyCoefficients(MAX_POLYCO_COEFFS + 1)
        );
        assert!(matches!(make(0, 3), Err(PredictorError::InvalidSegment(_))));
    }

    #[test]
    fn test_display() {
        let p = constant_polyco(59000.5, 0.0, 100.0).with_binary(0.5, 0.25);
        let text = p.to_string();
        assert!(text.starts_with("T1Polyco B1937+21 @ ao"));
        assert!(text.contains("2020-05-31T12:00:00"));
        assert!(text.ends_with("binary phase 0.5 freq 0.25"));
    }
}
