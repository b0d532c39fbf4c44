use thiserror::Error;

use crate::predictor::PredictorKind;

#[derive(Error, Debug)]
pub enum PredictorError {
    #[error("Malformed predictor data at line {line}: {message}")]
    ParseError { line: usize, message: String },

    #[error("Cannot merge a {from} predictor into a {into} predictor")]
    KindMismatch {
        into: PredictorKind,
        from: PredictorKind,
    },

    #[error(
        "Segments [{first_start}, {first_end}) and [{second_start}, {second_end}) overlap in time"
    )]
    SegmentOverlap {
        first_start: f64,
        first_end: f64,
        second_start: f64,
        second_end: f64,
    },

    #[error(
        "Requested MJD range [{start}, {end}) lies outside the predictor validity [{valid_start}, {valid_end})"
    )]
    OutOfRange {
        start: f64,
        end: f64,
        valid_start: f64,
        valid_end: f64,
    },

    #[error("Plan needs {needed} segments but the output buffer holds only {capacity}")]
    CapacityExceeded { needed: usize, capacity: usize },

    #[error("Unable to perform predictor I/O: {0}")]
    ResourceError(#[from] std::io::Error),

    #[error("Predictor holds no segments")]
    EmptyPredictor,

    #[error("Invalid identifier {0:?}: expected 1 to 63 bytes without whitespace")]
    InvalidIdentifier(String),

    #[error("Invalid plan request: {0}")]
    InvalidPlanRequest(String),

    #[error("Too many Taylor coefficients: {0} (a polyco holds at most 32)")]
    TooManyCoefficients(usize),

    #[error("Invalid segment: {0}")]
    InvalidSegment(String),
}

impl PredictorError {
    pub(crate) fn parse(line: usize, message: impl Into<String>) -> Self {
        PredictorError::ParseError {
            line,
            message: message.into(),
        }
    }
}

impl PartialEq for PredictorError {
    fn eq(&self, other: &Self) -> bool {
        use PredictorError::*;
        match (self, other) {
            (
                ParseError {
                    line: l1,
                    message: m1,
                },
                ParseError {
                    line: l2,
                    message: m2,
                },
            ) => l1 == l2 && m1 == m2,
            (KindMismatch { into: a, from: b }, KindMismatch { into: c, from: d }) => {
                a == c && b == d
            }
            (
                SegmentOverlap {
                    first_start: a1,
                    first_end: a2,
                    second_start: a3,
                    second_end: a4,
                },
                SegmentOverlap {
                    first_start: b1,
                    first_end: b2,
                    second_start: b3,
                    second_end: b4,
                },
            ) => a1 == b1 && a2 == b2 && a3 == b3 && a4 == b4,
            (
                OutOfRange {
                    start: a1,
                    end: a2,
                    valid_start: a3,
                    valid_end: a4,
                },
                OutOfRange {
                    start: b1,
                    end: b2,
                    valid_start: b3,
                    valid_end: b4,
                },
            ) => a1 == b1 && a2 == b2 && a3 == b3 && a4 == b4,
            (
                CapacityExceeded {
                    needed: a,
                    capacity: b,
                },
                CapacityExceeded {
                    needed: c,
                    capacity: d,
                },
            ) => a == c && b == d,

            // I/O errors are not comparable: equal when the variant matches
            (ResourceError(_), ResourceError(_)) => true,

            (InvalidIdentifier(a), InvalidIdentifier(b)) => a == b,
            (InvalidPlanRequest(a), InvalidPlanRequest(b)) => a == b,
            (TooManyCoefficients(a), TooManyCoefficients(b)) => a == b,
            (InvalidSegment(a), InvalidSegment(b)) => a == b,

            (EmptyPredictor, EmptyPredictor) => true,

            _ => false,
        }
    }
}
