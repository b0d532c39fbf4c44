//! Bounded pulsar / observatory identifiers.
//!
//! Names are stored as owned strings whose length is checked once, at
//! construction or decode time. They must be non-empty, contain no
//! whitespace (the text codec is token based) and fit in
//! [`MAX_IDENTIFIER_LEN`] bytes.
use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{constants::MAX_IDENTIFIER_LEN, predictor_errors::PredictorError};

/// A validated pulsar or site name such as `"J0437-4715"` or `"pks"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Identifier(String);

impl Identifier {
    /// Validate and wrap a name.
    ///
    /// Arguments
    /// -----------------
    /// * `name`: Candidate identifier.
    ///
    /// Return
    /// ----------
    /// * The wrapped identifier, or [`PredictorError::InvalidIdentifier`] when the
    ///   name is empty, longer than [`MAX_IDENTIFIER_LEN`] bytes, or contains
    ///   whitespace / control characters.
    pub fn new(name: &str) -> Result<Self, PredictorError> {
        if name.is_empty()
            || name.len() > MAX_IDENTIFIER_LEN
            || name.chars().any(|c| c.is_whitespace() || c.is_control())
        {
            return Err(PredictorError::InvalidIdentifier(name.to_string()));
        }
        Ok(Identifier(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Identifier {
    type Err = PredictorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Identifier::new(s)
    }
}

impl TryFrom<String> for Identifier {
    type Error = PredictorError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Identifier::new(&value)
    }
}

impl TryFrom<&str> for Identifier {
    type Error = PredictorError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Identifier::new(value)
    }
}

impl From<Identifier> for String {
    fn from(value: Identifier) -> Self {
        value.0
    }
}

impl AsRef<str> for Identifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
