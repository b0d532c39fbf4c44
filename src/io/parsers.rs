//! nom line grammars shared by the decoders.
//!
//! Every line of the predictor format is a keyword followed by
//! whitespace-separated values. [`KeywordLine`] splits a line once and
//! converts its values on demand, turning every failure into a
//! [`PredictorError::ParseError`] that carries the line number.
use std::{fmt::Display, str::FromStr};

use nom::{
    bytes::complete::{tag, take_till1},
    character::complete::{digit1, space0, space1},
    combinator::{all_consuming, map_res},
    multi::separated_list1,
    sequence::{delimited, preceded},
    IResult, Parser,
};

use crate::{identifier::Identifier, predictor_errors::PredictorError};

fn token(input: &str) -> IResult<&str, &str> {
    take_till1(|c: char| c.is_whitespace()).parse(input)
}

/// Whitespace-separated tokens covering the whole line.
pub(crate) fn tokens(input: &str) -> IResult<&str, Vec<&str>> {
    all_consuming(delimited(space0, separated_list1(space1, token), space0)).parse(input)
}

/// `<name> <count> segments`
fn set_header<'a>(name: &'static str) -> impl Parser<&'a str, Output = usize, Error = nom::error::Error<&'a str>> {
    all_consuming(delimited(
        (space0, tag(name), space1),
        map_res(digit1, str::parse::<usize>),
        (space1, tag("segments"), space0),
    ))
}

/// `<name> BEGIN` or `<name> END`
fn block_marker<'a>(
    name: &'static str,
    marker: &'static str,
) -> impl Parser<&'a str, Output = &'a str, Error = nom::error::Error<&'a str>> {
    all_consuming(delimited(
        space0,
        preceded((tag(name), space1), tag(marker)),
        space0,
    ))
}

/// Segment count declared by a set header line such as `ChebyModelSet 4 segments`.
pub(crate) fn parse_set_header(
    line: &str,
    number: usize,
    name: &'static str,
) -> Result<usize, PredictorError> {
    set_header(name)
        .parse(line)
        .map(|(_, count)| count)
        .map_err(|_| PredictorError::parse(number, format!("expected `{name} <n> segments`, found {line:?}")))
}

pub(crate) fn is_block_marker(line: &str, name: &'static str, marker: &'static str) -> bool {
    block_marker(name, marker).parse(line).is_ok()
}

/// Check a `<name> BEGIN` line.
pub(crate) fn expect_block_begin(
    line: &str,
    number: usize,
    name: &'static str,
) -> Result<(), PredictorError> {
    if is_block_marker(line, name, "BEGIN") {
        Ok(())
    } else {
        Err(PredictorError::parse(number, format!("expected `{name} BEGIN`, found {line:?}")))
    }
}

/// One `KEYWORD value...` line.
#[derive(Debug)]
pub(crate) struct KeywordLine<'a> {
    pub(crate) number: usize,
    pub(crate) keyword: &'a str,
    values: Vec<&'a str>,
}

impl<'a> KeywordLine<'a> {
    pub(crate) fn parse(line: &'a str, number: usize) -> Result<Self, PredictorError> {
        let (_, mut fields) = tokens(line).map_err(|_| PredictorError::parse(number, "empty line"))?;
        let keyword = fields.remove(0);
        Ok(KeywordLine {
            number,
            keyword,
            values: fields,
        })
    }

    pub(crate) fn error(&self, message: impl Display) -> PredictorError {
        PredictorError::parse(self.number, format!("{}: {message}", self.keyword))
    }

    pub(crate) fn len(&self) -> usize {
        self.values.len()
    }

    fn convert<T>(&self, raw: &str) -> Result<T, PredictorError>
    where
        T: FromStr,
        T::Err: Display,
    {
        raw.parse()
            .map_err(|err| self.error(format_args!("bad value {raw:?} ({err})")))
    }

    /// All values of the line.
    pub(crate) fn values<T>(&self) -> Result<Vec<T>, PredictorError>
    where
        T: FromStr,
        T::Err: Display,
    {
        self.values.iter().map(|raw| self.convert(raw)).collect()
    }

    /// Exactly `N` values.
    pub(crate) fn array<T, const N: usize>(&self) -> Result<[T; N], PredictorError>
    where
        T: FromStr,
        T::Err: Display,
    {
        let values = self.values()?;
        let found = values.len();
        values
            .try_into()
            .map_err(|_| self.error(format_args!("expected {N} values, found {found}")))
    }

    /// Exactly one value.
    pub(crate) fn value<T>(&self) -> Result<T, PredictorError>
    where
        T: FromStr,
        T::Err: Display,
    {
        let [value] = self.array()?;
        Ok(value)
    }

    pub(crate) fn identifier(&self) -> Result<Identifier, PredictorError> {
        self.value()
    }

    /// Store `value` in a keyword slot that may be filled only once per block.
    pub(crate) fn set_once<T>(&self, slot: &mut Option<T>, value: T) -> Result<(), PredictorError> {
        match slot.replace(value) {
            Some(_) => Err(self.error("duplicate keyword")),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod test_parsers {
    use super::*;
    use crate::long_double::LongDouble;

    #[test]
    fn test_tokens() {
        let (_, t) = tokens("  TIME_RANGE 59000\t59001  ").unwrap();
        assert_eq!(t, vec!["TIME_RANGE", "59000", "59001"]);
        assert!(tokens("   ").is_err());
    }

    #[test]
    fn test_set_header() {
        assert_eq!(parse_set_header("ChebyModelSet 12 segments", 3, "ChebyModelSet").unwrap(), 12);
        assert_eq!(
            parse_set_header("ChebyModelSet twelve segments", 3, "ChebyModelSet").unwrap_err(),
            PredictorError::parse(
                3,
                "expected `ChebyModelSet <n> segments`, found \"ChebyModelSet twelve segments\""
            )
        );
        assert!(parse_set_header("T1PolycoSet 2 segments", 1, "ChebyModelSet").is_err());
    }

    #[test]
    fn test_block_markers() {
        assert!(is_block_marker("ChebyModel BEGIN", "ChebyModel", "BEGIN"));
        assert!(is_block_marker("  T1Polyco   END ", "T1Polyco", "END"));
        assert!(!is_block_marker("ChebyModel BEGIN now", "ChebyModel", "BEGIN"));
        assert!(expect_block_begin("ChebyModel END", 7, "ChebyModel").is_err());
    }

    #[test]
    fn test_keyword_line_values() {
        let line = KeywordLine::parse("FREQ_RANGE 1200 1.6e3", 9).unwrap();
        assert_eq!(line.keyword, "FREQ_RANGE");
        assert_eq!(line.len(), 2);
        let [lo, hi]: [LongDouble; 2] = line.array().unwrap();
        assert_eq!(lo, LongDouble::from(1200.0));
        assert_eq!(hi, LongDouble::from(1600.0));

        let err = line.value::<f64>().unwrap_err();
        assert_eq!(
            err,
            PredictorError::parse(9, "FREQ_RANGE: expected 1 values, found 2")
        );

        let bad = KeywordLine::parse("NCOEFF_TIME x", 4).unwrap();
        assert!(matches!(
            bad.value::<usize>(),
            Err(PredictorError::ParseError { line: 4, .. })
        ));

        let name = KeywordLine::parse("PSRNAME J1939+2134", 1).unwrap();
        assert_eq!(name.identifier().unwrap().as_str(), "J1939+2134");
    }
}
