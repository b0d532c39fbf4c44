//! # Constants and type definitions for the predictor engine
//!
//! This module centralizes the **unit conversions**, **format limits**, and
//! **common type aliases** shared by the Chebyshev and polyco representations,
//! the plan generator and the text codec.
//!
//! ## Overview
//!
//! - Time conversions (days ↔ minutes ↔ seconds)
//! - Dispersion constant used to re-reference polycos in frequency
//! - Capacity limits enforced at construction and decode time
//! - Type aliases documenting the unit of a [`LongDouble`] argument

use crate::long_double::LongDouble;

// -------------------------------------------------------------------------------------------------
// Unit conversions
// -------------------------------------------------------------------------------------------------

/// Number of seconds in a day
pub const SECONDS_PER_DAY: f64 = 86_400.0;

/// Number of minutes in a day
pub const MINUTES_PER_DAY: f64 = 1_440.0;

/// Number of seconds in a minute
pub const SECONDS_PER_MINUTE: f64 = 60.0;

/// Dispersion delay constant: `delay [s] = DM / (DISPERSION_K * f[MHz]^2)`
pub const DISPERSION_K: f64 = 2.41e-4;

// -------------------------------------------------------------------------------------------------
// Format limits
// -------------------------------------------------------------------------------------------------

/// Maximum number of Taylor coefficients held by one polyco segment
pub const MAX_POLYCO_COEFFS: usize = 32;

/// Maximum length (bytes) of a pulsar or site identifier
pub const MAX_IDENTIFIER_LEN: usize = 63;

/// Current version written on the first line of a serialized predictor
pub const PREDICTOR_FORMAT_VERSION: u32 = 1;

/// Intersection (days) below which two segment windows still count as touching.
/// Legacy polyco files store TMID to ~1e-11 day, so consecutive windows of a
/// contiguous file can overlap by rounding noise.
pub const SEGMENT_OVERLAP_TOLERANCE: f64 = 1e-9;

/// Half-width of the window used to decide that a plan step count is integral
pub const PLAN_STEP_EPSILON: f64 = 1e-9;

// -------------------------------------------------------------------------------------------------
// Type aliases
// -------------------------------------------------------------------------------------------------

/// Modified Julian Date, days
pub type Mjd = LongDouble;

/// Radio observing frequency, MHz
pub type MHz = LongDouble;

/// Rotational phase, cycles
pub type Cycles = LongDouble;

/// Spin frequency, Hz
pub type Hertz = LongDouble;
