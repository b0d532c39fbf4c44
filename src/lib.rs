//! # pulsar-predictor
//!
//! Pulse phase prediction for radio pulsar observations.
//!
//! A [`Predictor`] is an ordered set of time segments, each holding a local
//! model of the pulse phase as a function of time (MJD) and observing
//! frequency (MHz). Two representations are supported:
//!
//! * [`ChebyModelSet`](cheby::cheby_model_set::ChebyModelSet): 2-D Chebyshev
//!   grids over a time × frequency window.
//! * [`T1PolycoSet`](polyco::t1_polyco_set::T1PolycoSet): TEMPO1 style
//!   Taylor polynomials in minutes around a midpoint, with a dispersion
//!   correction.
//!
//! Predictors are merged, pruned, evaluated, written to and read from a
//! versioned text format ([`io`]), and sampled into observing [`plan`]s.
//!
//! ## Example
//! ```no_run
//! use pulsar_predictor::{plan::PlanRequest, LongDouble, Predictor};
//!
//! let predictor = Predictor::read("J0437-4715.pred")?;
//! let mjd = LongDouble::from(59000.25);
//! let phase = predictor.phase(mjd, LongDouble::from(1400.0))?;
//! println!("phase = {} (in range: {})", phase.value, phase.is_in_range());
//!
//! let request = PlanRequest::new(
//!     mjd,
//!     mjd + 1.0 / 24.0,
//!     LongDouble::from(10.0),
//!     LongDouble::from(1400.0),
//! );
//! let plan = pulsar_predictor::plan::Plan::build(&predictor, &request, 86_400)?;
//! println!("{} steps from phase {}", plan.len(), plan.phase0());
//! # Ok::<(), pulsar_predictor::PredictorError>(())
//! ```
pub mod cheby;
pub mod config;
pub mod constants;
pub mod identifier;
pub mod io;
pub mod long_double;
pub mod plan;
pub mod polyco;
pub mod predictor;
pub mod predictor_errors;
pub mod segment_set;

pub use config::PredictorConfig;
pub use identifier::Identifier;
pub use long_double::LongDouble;
pub use predictor::{Predictor, PredictorKind};
pub use predictor_errors::PredictorError;
pub use segment_set::{Prediction, RangeStatus};
