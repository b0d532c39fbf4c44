//! Text encoding of a [`ChebyModelSet`].
//!
//! ```text
//! ChebyModelSet <n> segments
//! ChebyModel BEGIN
//! PSRNAME <name>
//! SITENAME <site>
//! TIME_RANGE <mjd_start> <mjd_end>
//! FREQ_RANGE <freq_start> <freq_end>
//! DISPERSION_CONSTANT <d>
//! NCOEFF_TIME <nx>
//! NCOEFF_FREQ <ny>
//! COEFFS <ny values>            nx lines
//! FREQ_COEFFS <ny values>       only for a fitted frequency grid
//! ChebyModel END
//! ```
use std::io::{BufRead, Write};

use crate::{
    cheby::{cheby2d::Cheby2D, cheby_model::ChebyModel, cheby_model_set::ChebyModelSet},
    config::PredictorConfig,
    identifier::Identifier,
    long_double::LongDouble,
    predictor_errors::PredictorError,
};

use super::{
    lines::LineReader,
    parsers::{expect_block_begin, is_block_marker, parse_set_header, KeywordLine},
};

pub(crate) const SET_TAG: &str = "ChebyModelSet";
const BLOCK_TAG: &str = "ChebyModel";

/// Fields collected between `ChebyModel BEGIN` and `ChebyModel END`.
#[derive(Default)]
struct ModelFields {
    psr_name: Option<Identifier>,
    site_name: Option<Identifier>,
    time_range: Option<[LongDouble; 2]>,
    freq_range: Option<[LongDouble; 2]>,
    dispersion_constant: Option<LongDouble>,
    nx: Option<usize>,
    ny: Option<usize>,
    coeffs: Vec<Vec<LongDouble>>,
    freq_coeffs: Vec<Vec<LongDouble>>,
}

fn required<T>(slot: Option<T>, keyword: &str, end_line: usize) -> Result<T, PredictorError> {
    slot.ok_or_else(|| {
        PredictorError::parse(end_line, format!("{BLOCK_TAG} block is missing {keyword}"))
    })
}

fn coefficient_row(line: &KeywordLine, ny: Option<usize>) -> Result<Vec<LongDouble>, PredictorError> {
    let Some(ny) = ny else {
        return Err(line.error("NCOEFF_FREQ must precede coefficient rows"));
    };
    if line.len() != ny {
        return Err(line.error(format_args!("expected {ny} coefficients, found {}", line.len())));
    }
    line.values()
}

impl ModelFields {
    fn accept(&mut self, line: &KeywordLine) -> Result<(), PredictorError> {
        match line.keyword {
            "PSRNAME" => line.set_once(&mut self.psr_name, line.identifier()?),
            "SITENAME" => line.set_once(&mut self.site_name, line.identifier()?),
            "TIME_RANGE" => line.set_once(&mut self.time_range, line.array()?),
            "FREQ_RANGE" => line.set_once(&mut self.freq_range, line.array()?),
            "DISPERSION_CONSTANT" => line.set_once(&mut self.dispersion_constant, line.value()?),
            "NCOEFF_TIME" => line.set_once(&mut self.nx, line.value()?),
            "NCOEFF_FREQ" => line.set_once(&mut self.ny, line.value()?),
            "COEFFS" => {
                self.coeffs.push(coefficient_row(line, self.ny)?);
                Ok(())
            }
            "FREQ_COEFFS" => {
                self.freq_coeffs.push(coefficient_row(line, self.ny)?);
                Ok(())
            }
            _ => Err(line.error("unknown keyword")),
        }
    }

    fn build(self, end_line: usize) -> Result<ChebyModel, PredictorError> {
        let nx = required(self.nx, "NCOEFF_TIME", end_line)?;
        required(self.ny, "NCOEFF_FREQ", end_line)?;
        if self.coeffs.len() != nx {
            return Err(PredictorError::parse(
                end_line,
                format!("expected {nx} COEFFS lines, found {}", self.coeffs.len()),
            ));
        }
        let [mjd_start, mjd_end] = required(self.time_range, "TIME_RANGE", end_line)?;
        let [freq_start, freq_end] = required(self.freq_range, "FREQ_RANGE", end_line)?;

        let invalid = |err: PredictorError| PredictorError::parse(end_line, err.to_string());
        let cheby = Cheby2D::from_rows(&self.coeffs).map_err(invalid)?;
        let frequency_cheby = if self.freq_coeffs.is_empty() {
            None
        } else {
            Some(Cheby2D::from_rows(&self.freq_coeffs).map_err(invalid)?)
        };

        ChebyModel::new(
            required(self.psr_name, "PSRNAME", end_line)?,
            required(self.site_name, "SITENAME", end_line)?,
            (mjd_start, mjd_end),
            (freq_start, freq_end),
            required(self.dispersion_constant, "DISPERSION_CONSTANT", end_line)?,
            cheby,
            frequency_cheby,
        )
        .map_err(invalid)
    }
}

fn read_model<R: BufRead>(lines: &mut LineReader<R>) -> Result<ChebyModel, PredictorError> {
    let begin = lines.expect_line("`ChebyModel BEGIN`")?;
    expect_block_begin(&begin, lines.line_number(), BLOCK_TAG)?;

    let mut fields = ModelFields::default();
    loop {
        let line = lines.expect_line("`ChebyModel END`")?;
        if is_block_marker(&line, BLOCK_TAG, "END") {
            return fields.build(lines.line_number());
        }
        fields.accept(&KeywordLine::parse(&line, lines.line_number())?)?;
    }
}

/// Decode one `ChebyModelSet` section, header line included.
pub(crate) fn read_set<R: BufRead>(
    lines: &mut LineReader<R>,
    config: &PredictorConfig,
) -> Result<ChebyModelSet, PredictorError> {
    let header = lines.expect_line("a ChebyModelSet header")?;
    let count = parse_set_header(&header, lines.line_number(), SET_TAG)?;
    if count > config.max_segments {
        return Err(PredictorError::parse(
            lines.line_number(),
            format!("{count} segments exceed the limit of {}", config.max_segments),
        ));
    }

    let segments = (0..count)
        .map(|_| read_model(lines))
        .collect::<Result<Vec<_>, _>>()?;
    ChebyModelSet::from_segments(segments)
}

fn write_row<W: Write>(writer: &mut W, keyword: &str, row: &[LongDouble]) -> std::io::Result<()> {
    write!(writer, "{keyword}")?;
    for value in row {
        write!(writer, " {value}")?;
    }
    writeln!(writer)
}

pub(crate) fn write_set<W: Write>(writer: &mut W, set: &ChebyModelSet) -> std::io::Result<()> {
    writeln!(writer, "{SET_TAG} {} segments", set.len())?;
    for model in set {
        let cheby = model.cheby();
        writeln!(writer, "{BLOCK_TAG} BEGIN")?;
        writeln!(writer, "PSRNAME {}", model.psr_name())?;
        writeln!(writer, "SITENAME {}", model.site_name())?;
        writeln!(writer, "TIME_RANGE {} {}", model.mjd_start(), model.mjd_end())?;
        writeln!(writer, "FREQ_RANGE {} {}", model.freq_start(), model.freq_end())?;
        writeln!(writer, "DISPERSION_CONSTANT {}", model.dispersion_constant())?;
        writeln!(writer, "NCOEFF_TIME {}", cheby.nx())?;
        writeln!(writer, "NCOEFF_FREQ {}", cheby.ny())?;
        for ix in 0..cheby.nx() {
            write_row(writer, "COEFFS", &cheby.row(ix))?;
        }
        if model.has_fitted_frequency() {
            let frequency = model.frequency_cheby();
            for ix in 0..frequency.nx() {
                write_row(writer, "FREQ_COEFFS", &frequency.row(ix))?;
            }
        }
        writeln!(writer, "{BLOCK_TAG} END")?;
    }
    Ok(())
}
