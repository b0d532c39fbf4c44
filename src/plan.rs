//! # Plans
//!
//! A plan is a piecewise-linear reduction of a predictor for consumers that
//! cannot evaluate Chebyshev or Taylor series themselves: an anchor phase at
//! `mjd_start` plus one constant pulse frequency per fixed time step.
//!
//! ## Algorithm
//!
//! The predictor phase is sampled at `mjd_start` and at every step boundary
//! `t_i = mjd_start + i · step`; the last boundary is clamped to `mjd_end`.
//! Each frequency is the phase difference over the elapsed seconds, so the
//! implied phase is continuous and exact at every boundary. Between
//! boundaries the error is bounded by how much the true frequency moves
//! within one step.
//!
//! ```text
//! n       = ceil((mjd_end - mjd_start) · 86400 / step)
//! freq[i] = (phase(t_{i+1}) - phase(t_i)) / (t_{i+1} - t_i)[s]
//! ```
//!
//! ## See also
//! ------------
//! * [`get_plan`] / [`get_plan_ext`] – plan straight from a predictor file.
//! * [`Plan::phase_at`] – phase implied by a plan.
use camino::Utf8Path;
use log::{debug, trace, warn};

use crate::{
    config::PredictorConfig,
    constants::{Cycles, Hertz, MHz, Mjd, PLAN_STEP_EPSILON, SECONDS_PER_DAY},
    identifier::Identifier,
    long_double::LongDouble,
    predictor::Predictor,
    predictor_errors::PredictorError,
};

/// Time range, step and observing frequency of a plan.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlanRequest {
    pub mjd_start: Mjd,
    pub mjd_end: Mjd,
    /// Step length in seconds.
    pub step_seconds: LongDouble,
    /// Observing frequency in MHz, `0` for infinite frequency.
    pub freq: MHz,
}

impl PlanRequest {
    pub fn new(mjd_start: Mjd, mjd_end: Mjd, step_seconds: LongDouble, freq: MHz) -> Self {
        PlanRequest {
            mjd_start,
            mjd_end,
            step_seconds,
            freq,
        }
    }

    pub fn duration_seconds(&self) -> LongDouble {
        (self.mjd_end - self.mjd_start) * SECONDS_PER_DAY
    }

    /// Number of plan segments the request produces.
    ///
    /// A duration within [`PLAN_STEP_EPSILON`] steps of a whole number of steps
    /// is not given an extra sliver segment.
    ///
    /// Return
    /// ----------
    /// * The segment count, or [`PredictorError::InvalidPlanRequest`] for a
    ///   non-positive or non-finite step or an empty range.
    pub fn segment_count(&self) -> Result<usize, PredictorError> {
        if !self.step_seconds.is_finite() || self.step_seconds <= 0.0 {
            return Err(PredictorError::InvalidPlanRequest(format!(
                "step must be a positive number of seconds, got {}",
                self.step_seconds
            )));
        }
        let all_finite = [self.mjd_start, self.mjd_end, self.freq]
            .iter()
            .all(LongDouble::is_finite);
        if !all_finite || self.mjd_end <= self.mjd_start {
            return Err(PredictorError::InvalidPlanRequest(format!(
                "empty MJD range [{}, {})",
                self.mjd_start, self.mjd_end
            )));
        }

        let steps = self.duration_seconds() / self.step_seconds;
        let nearest = steps.round();
        let count = if (steps - nearest).abs() < PLAN_STEP_EPSILON {
            nearest
        } else {
            steps.ceil()
        };
        Ok((count.to_f64() as usize).max(1))
    }

    /// Boundary `index` of a plan with `count` segments.
    fn boundary(&self, index: usize, count: usize) -> Mjd {
        if index >= count {
            self.mjd_end
        } else {
            self.mjd_start + self.step_seconds * (index as f64) / SECONDS_PER_DAY
        }
    }
}

/// Anchor phase and per-step pulse frequencies.
#[derive(Debug, Clone, PartialEq)]
pub struct Plan {
    request: PlanRequest,
    phase0: Cycles,
    frequencies: Vec<Hertz>,
}

impl Plan {
    /// Sample `predictor` into a plan.
    ///
    /// Arguments
    /// -----------------
    /// * `predictor`: Source predictor.
    /// * `request`: Range, step and observing frequency.
    /// * `capacity`: Maximum number of segments the caller accepts.
    ///
    /// Return
    /// ----------
    /// * The plan, or one of [`PredictorError::InvalidPlanRequest`],
    ///   [`PredictorError::EmptyPredictor`], [`PredictorError::OutOfRange`]
    ///   (range entirely outside the predictor validity) and
    ///   [`PredictorError::CapacityExceeded`].
    ///
    /// A range that only partly overlaps the validity is planned with
    /// extrapolated phases and logged as a warning.
    pub fn build(
        predictor: &Predictor,
        request: &PlanRequest,
        capacity: usize,
    ) -> Result<Self, PredictorError> {
        let count = request.segment_count()?;
        let (Some(valid_start), Some(valid_end)) = (predictor.start_mjd(), predictor.end_mjd())
        else {
            return Err(PredictorError::EmptyPredictor);
        };

        if request.mjd_end <= valid_start || request.mjd_start >= valid_end {
            return Err(PredictorError::OutOfRange {
                start: request.mjd_start.to_f64(),
                end: request.mjd_end.to_f64(),
                valid_start: valid_start.to_f64(),
                valid_end: valid_end.to_f64(),
            });
        }
        if request.mjd_start < valid_start || request.mjd_end > valid_end {
            warn!(
                "plan range [{}, {}) extends beyond predictor validity [{valid_start}, {valid_end}), extrapolating",
                request.mjd_start, request.mjd_end
            );
        }
        if count > capacity {
            return Err(PredictorError::CapacityExceeded {
                needed: count,
                capacity,
            });
        }

        let phase0 = predictor.phase(request.mjd_start, request.freq)?.value;
        let mut frequencies = Vec::with_capacity(count);
        let (mut t_prev, mut phase_prev) = (request.mjd_start, phase0);
        for index in 1..=count {
            let t = request.boundary(index, count);
            let phase = predictor.phase(t, request.freq)?.value;
            let frequency = (phase - phase_prev) / ((t - t_prev) * SECONDS_PER_DAY);
            trace!("plan step {index}/{count}: mjd {t}, frequency {frequency} Hz");
            frequencies.push(frequency);
            t_prev = t;
            phase_prev = phase;
        }

        debug!(
            "planned {count} segments of {} s over [{}, {})",
            request.step_seconds, request.mjd_start, request.mjd_end
        );
        Ok(Plan {
            request: *request,
            phase0,
            frequencies,
        })
    }

    pub fn request(&self) -> &PlanRequest {
        &self.request
    }

    /// Predictor phase at `mjd_start`.
    pub fn phase0(&self) -> Cycles {
        self.phase0
    }

    pub fn frequencies(&self) -> &[Hertz] {
        &self.frequencies
    }

    pub fn len(&self) -> usize {
        self.frequencies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frequencies.is_empty()
    }

    /// Duration of segment `index` in seconds; the last one may be shorter.
    pub fn segment_seconds(&self, index: usize) -> LongDouble {
        let count = self.len();
        let start = self.request.boundary(index, count);
        let end = self.request.boundary(index + 1, count);
        (end - start) * SECONDS_PER_DAY
    }

    /// Phase implied by the plan at `mjd`.
    ///
    /// Times before `mjd_start` or after `mjd_end` extrapolate the first or
    /// last frequency.
    pub fn phase_at(&self, mjd: Mjd) -> Cycles {
        let Some(&first) = self.frequencies.first() else {
            return self.phase0;
        };
        let offset = (mjd - self.request.mjd_start) * SECONDS_PER_DAY;
        if offset <= 0.0 {
            return self.phase0 + first * offset;
        }

        let last = self.len() - 1;
        let index = ((offset / self.request.step_seconds).floor().to_f64() as usize).min(last);
        let completed: LongDouble = self.frequencies[..index]
            .iter()
            .map(|&f| f * self.request.step_seconds)
            .sum();
        let into_segment = offset - self.request.step_seconds * (index as f64);
        self.phase0 + completed + self.frequencies[index] * into_segment
    }

    /// Phase implied by the plan at `mjd_end`.
    pub fn end_phase(&self) -> Cycles {
        self.phase0
            + (0..self.len())
                .map(|i| self.frequencies[i] * self.segment_seconds(i))
                .sum::<LongDouble>()
    }

    /// Copy the frequencies into a caller buffer.
    ///
    /// Return
    /// ----------
    /// * The number of frequencies written, or
    ///   [`PredictorError::CapacityExceeded`] if `out` is too short.
    pub fn copy_frequencies_into(&self, out: &mut [Hertz]) -> Result<usize, PredictorError> {
        let needed = self.len();
        let Some(target) = out.get_mut(..needed) else {
            return Err(PredictorError::CapacityExceeded {
                needed,
                capacity: out.len(),
            });
        };
        target.copy_from_slice(&self.frequencies);
        Ok(needed)
    }
}

/// A plan together with the identifiers of the predictor it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedPlan {
    pub psr_name: Identifier,
    pub site_name: Identifier,
    pub plan: Plan,
}

/// Plan from a predictor file with the default [`PredictorConfig`].
pub fn get_plan(path: impl AsRef<Utf8Path>, request: &PlanRequest) -> Result<Plan, PredictorError> {
    get_plan_with(path, request, &PredictorConfig::default())
}

/// Plan from a predictor file.
///
/// Arguments
/// -----------------
/// * `path`: Predictor file.
/// * `request`: Range, step and observing frequency.
/// * `config`: Decoding limits and the plan capacity.
///
/// Return
/// ----------
/// * The plan, a read error ([`PredictorError::ResourceError`],
///   [`PredictorError::ParseError`]) or one of the [`Plan::build`] errors.
pub fn get_plan_with(
    path: impl AsRef<Utf8Path>,
    request: &PlanRequest,
    config: &PredictorConfig,
) -> Result<Plan, PredictorError> {
    let predictor = Predictor::read_with(path, config)?;
    Plan::build(&predictor, request, config.plan_capacity)
}

/// Like [`get_plan`], also returning the pulsar and site names.
pub fn get_plan_ext(
    path: impl AsRef<Utf8Path>,
    request: &PlanRequest,
) -> Result<NamedPlan, PredictorError> {
    get_plan_ext_with(path, request, &PredictorConfig::default())
}

/// Like [`get_plan_with`], also returning the pulsar and site names.
///
/// Return
/// ----------
/// * The named plan, any [`get_plan_with`] error, or
///   [`PredictorError::EmptyPredictor`] if the file holds no segment.
pub fn get_plan_ext_with(
    path: impl AsRef<Utf8Path>,
    request: &PlanRequest,
    config: &PredictorConfig,
) -> Result<NamedPlan, PredictorError> {
    let predictor = Predictor::read_with(path, config)?;
    let plan = Plan::build(&predictor, request, config.plan_capacity)?;
    match (predictor.psr_name(), predictor.site_name()) {
        (Some(psr_name), Some(site_name)) => Ok(NamedPlan {
            psr_name: psr_name.clone(),
            site_name: site_name.clone(),
            plan,
        }),
        _ => Err(PredictorError::EmptyPredictor),
    }
}
