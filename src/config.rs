//! Runtime limits for decoding predictors and generating plans.
//!
//! Defaults suit a day-long plan at one-second resolution. Both limits can be
//! overridden in code with the `with_*` setters or from the environment:
//!
//! | variable                          | field           |
//! |-----------------------------------|-----------------|
//! | `PULSAR_PREDICTOR_PLAN_CAPACITY`  | `plan_capacity` |
//! | `PULSAR_PREDICTOR_MAX_SEGMENTS`   | `max_segments`  |
use std::env;

use log::warn;

pub const PLAN_CAPACITY_VAR: &str = "PULSAR_PREDICTOR_PLAN_CAPACITY";
pub const MAX_SEGMENTS_VAR: &str = "PULSAR_PREDICTOR_MAX_SEGMENTS";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PredictorConfig {
    /// Maximum number of plan segments a plan request may produce.
    pub plan_capacity: usize,
    /// Maximum number of segments accepted when decoding one predictor.
    pub max_segments: usize,
}

impl Default for PredictorConfig {
    fn default() -> Self {
        PredictorConfig {
            plan_capacity: 86_400,
            max_segments: 100_000,
        }
    }
}

impl PredictorConfig {
    pub fn with_plan_capacity(mut self, plan_capacity: usize) -> Self {
        self.plan_capacity = plan_capacity;
        self
    }

    pub fn with_max_segments(mut self, max_segments: usize) -> Self {
        self.max_segments = max_segments;
        self
    }

    /// Defaults overridden by the environment variables that are set and
    /// parse as unsigned integers. Unparsable values are logged and ignored.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let read = |key: &str, default: usize| match lookup(key) {
            Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
                warn!("ignoring {key}={raw:?}: not an unsigned integer");
                default
            }),
            None => default,
        };
        let defaults = Self::default();
        PredictorConfig {
            plan_capacity: read(PLAN_CAPACITY_VAR, defaults.plan_capacity),
            max_segments: read(MAX_SEGMENTS_VAR, defaults.max_segments),
        }
    }
}
