//! # Predictor serialization
//!
//! Human-readable, versioned keyword format for both predictor kinds:
//!
//! ```text
//! PREDICTOR_FORMAT 1
//! ChebyModelSet 2 segments        or   T1PolycoSet 2 segments
//! ...
//! ```
//!
//! Extended-precision values are written in decimal scientific notation with
//! 31 significant digits, so a write/read cycle reproduces them to ~1e-30
//! relative. The version line is optional on read. A stream that starts with
//! neither the version line nor a set header is read as a legacy TEMPO1
//! `polyco.dat`.
//!
//! Every decoding failure is a [`PredictorError::ParseError`] carrying the
//! 1-based line number.
//!
//! ## See also
//! ------------
//! * [`cheby_format`] – Chebyshev set layout.
//! * [`polyco_format`] – polyco set layout.
//! * [`tempo1`] – legacy polyco files.
pub mod cheby_format;
mod lines;
mod parsers;
pub mod polyco_format;
pub mod tempo1;

use std::io::{BufRead, Write};

use crate::{
    config::PredictorConfig, constants::PREDICTOR_FORMAT_VERSION, predictor::Predictor,
    predictor_errors::PredictorError,
};

use lines::LineReader;
use parsers::KeywordLine;

const VERSION_TAG: &str = "PREDICTOR_FORMAT";

/// What the next line of the stream introduces.
enum Section {
    Version,
    Cheby,
    T1,
    Other,
}

fn section(line: &str) -> Section {
    match line.split_whitespace().next() {
        Some(VERSION_TAG) => Section::Version,
        Some(cheby_format::SET_TAG) => Section::Cheby,
        Some(polyco_format::SET_TAG) => Section::T1,
        _ => Section::Other,
    }
}

fn peek_section<R: BufRead>(lines: &mut LineReader<R>) -> Result<Option<Section>, PredictorError> {
    Ok(lines.peek()?.map(section))
}

/// Decode a complete predictor from `reader`.
///
/// Arguments
/// -----------------
/// * `reader`: Stream positioned at the start of a predictor.
/// * `config`: Decoding limits (`max_segments`).
///
/// Return
/// ----------
/// * The predictor, [`Predictor::None`] for a stream holding only the version
///   line, or a [`PredictorError`].
pub fn decode<R: BufRead>(reader: R, config: &PredictorConfig) -> Result<Predictor, PredictorError> {
    let mut lines = LineReader::new(reader);

    let mut versioned = false;
    let mut next = peek_section(&mut lines)?;
    if let Some(Section::Version) = next {
        let line = lines.expect_line(VERSION_TAG)?;
        let version: u32 = KeywordLine::parse(&line, lines.line_number())?.value()?;
        if version != PREDICTOR_FORMAT_VERSION {
            return Err(PredictorError::parse(
                lines.line_number(),
                format!("unsupported predictor format version {version}"),
            ));
        }
        versioned = true;
        next = peek_section(&mut lines)?;
    }

    let predictor = match next {
        None if versioned => Predictor::None,
        None => return Err(PredictorError::parse(1, "empty predictor input")),
        Some(Section::Cheby) => Predictor::Cheby(cheby_format::read_set(&mut lines, config)?),
        Some(Section::T1) => Predictor::T1(polyco_format::read_set(&mut lines, config)?),
        Some(Section::Other) if !versioned => Predictor::T1(tempo1::read_polycos(&mut lines, config)?),
        Some(_) => {
            let line = lines.expect_line("a predictor set")?;
            return Err(PredictorError::parse(
                lines.line_number(),
                format!("unknown predictor kind in {line:?}"),
            ));
        }
    };

    if lines.next_line()?.is_some() {
        return Err(PredictorError::parse(
            lines.line_number(),
            "unexpected content after the predictor",
        ));
    }
    Ok(predictor)
}

/// Encode `predictor`, version line first.
pub fn encode<W: Write>(mut writer: W, predictor: &Predictor) -> Result<(), PredictorError> {
    writeln!(writer, "{VERSION_TAG} {PREDICTOR_FORMAT_VERSION}")?;
    match predictor {
        Predictor::None => {}
        Predictor::Cheby(set) => cheby_format::write_set(&mut writer, set)?,
        Predictor::T1(set) => polyco_format::write_set(&mut writer, set)?,
    }
    writer.flush()?;
    Ok(())
}
