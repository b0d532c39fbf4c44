//! Text encoding of a [`T1PolycoSet`].
//!
//! ```text
//! T1PolycoSet <n> segments
//! T1Polyco BEGIN
//! PSRNAME <name>
//! SITENAME <site>
//! TMID <mjd>
//! SPAN <minutes>
//! RPHASE <cycles>
//! F0 <Hz>
//! DM <pc cm^-3>
//! DOPPLER <1e-4>
//! LOG10RMS <log10 periods>
//! OBSFREQ <MHz>
//! BINARY <phase> <frequency>    optional
//! NCOEFF <n>
//! COEFFS <values>               repeated until n values are read
//! T1Polyco END
//! ```
use std::io::{BufRead, Write};

use crate::{
    config::PredictorConfig,
    constants::MAX_POLYCO_COEFFS,
    identifier::Identifier,
    long_double::LongDouble,
    polyco::{t1_polyco::T1Polyco, t1_polyco_set::T1PolycoSet},
    predictor_errors::PredictorError,
};

use super::{
    lines::LineReader,
    parsers::{expect_block_begin, is_block_marker, parse_set_header, KeywordLine},
};

pub(crate) const SET_TAG: &str = "T1PolycoSet";
const BLOCK_TAG: &str = "T1Polyco";
const COEFFS_PER_LINE: usize = 4;

#[derive(Default)]
struct PolycoFields {
    psr_name: Option<Identifier>,
    site_name: Option<Identifier>,
    mjd_mid: Option<LongDouble>,
    span: Option<u32>,
    reference_phase: Option<LongDouble>,
    frequency_psr_0: Option<LongDouble>,
    dm: Option<f64>,
    doppler: Option<f64>,
    log10rms: Option<f64>,
    frequency_obs: Option<f64>,
    binary: Option<[f64; 2]>,
    ncoeff: Option<usize>,
    coeff: Vec<LongDouble>,
}

impl PolycoFields {
    fn accept(&mut self, line: &KeywordLine) -> Result<(), PredictorError> {
        match line.keyword {
            "PSRNAME" => line.set_once(&mut self.psr_name, line.identifier()?),
            "SITENAME" => line.set_once(&mut self.site_name, line.identifier()?),
            "TMID" => line.set_once(&mut self.mjd_mid, line.value()?),
            "SPAN" => line.set_once(&mut self.span, line.value()?),
            "RPHASE" => line.set_once(&mut self.reference_phase, line.value()?),
            "F0" => line.set_once(&mut self.frequency_psr_0, line.value()?),
            "DM" => line.set_once(&mut self.dm, line.value()?),
            "DOPPLER" => line.set_once(&mut self.doppler, line.value()?),
            "LOG10RMS" => line.set_once(&mut self.log10rms, line.value()?),
            "OBSFREQ" => line.set_once(&mut self.frequency_obs, line.value()?),
            "BINARY" => line.set_once(&mut self.binary, line.array()?),
            "NCOEFF" => {
                let ncoeff: usize = line.value()?;
                if ncoeff > MAX_POLYCO_COEFFS {
                    return Err(line.error(format_args!(
                        "{ncoeff} coefficients exceed the maximum of {MAX_POLYCO_COEFFS}"
                    )));
                }
                line.set_once(&mut self.ncoeff, ncoeff)
            }
            "COEFFS" => {
                let Some(ncoeff) = self.ncoeff else {
                    return Err(line.error("NCOEFF must precede COEFFS"));
                };
                if self.coeff.len() + line.len() > ncoeff {
                    return Err(line.error(format_args!("more than the {ncoeff} declared coefficients")));
                }
                self.coeff.extend(line.values::<LongDouble>()?);
                Ok(())
            }
            _ => Err(line.error("unknown keyword")),
        }
    }

    fn build(self, end_line: usize) -> Result<T1Polyco, PredictorError> {
        let missing = |keyword: &str| {
            PredictorError::parse(end_line, format!("{BLOCK_TAG} block is missing {keyword}"))
        };
        let ncoeff = self.ncoeff.ok_or_else(|| missing("NCOEFF"))?;
        if self.coeff.len() != ncoeff {
            return Err(PredictorError::parse(
                end_line,
                format!("expected {ncoeff} coefficients, found {}", self.coeff.len()),
            ));
        }

        let polyco = T1Polyco::new(
            self.psr_name.ok_or_else(|| missing("PSRNAME"))?,
            self.site_name.ok_or_else(|| missing("SITENAME"))?,
            self.mjd_mid.ok_or_else(|| missing("TMID"))?,
            self.span.ok_or_else(|| missing("SPAN"))?,
            self.reference_phase.ok_or_else(|| missing("RPHASE"))?,
            self.frequency_psr_0.ok_or_else(|| missing("F0"))?,
            self.coeff,
        )
        .map_err(|err| PredictorError::parse(end_line, err.to_string()))?
        .with_dispersion(self.dm.unwrap_or(0.0), self.frequency_obs.unwrap_or(0.0))
        .with_doppler(self.doppler.unwrap_or(0.0))
        .with_log10rms(self.log10rms.unwrap_or(0.0));

        Ok(match self.binary {
            Some([phase, frequency]) => polyco.with_binary(phase, frequency),
            None => polyco,
        })
    }
}

fn read_polyco<R: BufRead>(lines: &mut LineReader<R>) -> Result<T1Polyco, PredictorError> {
    let begin = lines.expect_line("`T1Polyco BEGIN`")?;
    expect_block_begin(&begin, lines.line_number(), BLOCK_TAG)?;

    let mut fields = PolycoFields::default();
    loop {
        let line = lines.expect_line("`T1Polyco END`")?;
        if is_block_marker(&line, BLOCK_TAG, "END") {
            return fields.build(lines.line_number());
        }
        fields.accept(&KeywordLine::parse(&line, lines.line_number())?)?;
    }
}

/// Decode one `T1PolycoSet` section, header line included.
pub(crate) fn read_set<R: BufRead>(
    lines: &mut LineReader<R>,
    config: &PredictorConfig,
) -> Result<T1PolycoSet, PredictorError> {
    let header = lines.expect_line("a T1PolycoSet header")?;
    let count = parse_set_header(&header, lines.line_number(), SET_TAG)?;
    if count > config.max_segments {
        return Err(PredictorError::parse(
            lines.line_number(),
            format!("{count} segments exceed the limit of {}", config.max_segments),
        ));
    }

    let mut polycos = Vec::with_capacity(count);
    for _ in 0..count {
        polycos.push(read_polyco(lines)?);
    }
    T1PolycoSet::from_segments(polycos)
}

pub(crate) fn write_set<W: Write>(writer: &mut W, set: &T1PolycoSet) -> std::io::Result<()> {
    writeln!(writer, "{SET_TAG} {} segments", set.len())?;
    for polyco in set {
        writeln!(writer, "{BLOCK_TAG} BEGIN")?;
        writeln!(writer, "PSRNAME {}", polyco.psr_name())?;
        writeln!(writer, "SITENAME {}", polyco.site_name())?;
        writeln!(writer, "TMID {}", polyco.mjd_mid())?;
        writeln!(writer, "SPAN {}", polyco.span_minutes())?;
        writeln!(writer, "RPHASE {}", polyco.reference_phase())?;
        writeln!(writer, "F0 {}", polyco.frequency_psr_0())?;
        writeln!(writer, "DM {}", polyco.dm())?;
        writeln!(writer, "DOPPLER {}", polyco.doppler())?;
        writeln!(writer, "LOG10RMS {}", polyco.log10rms())?;
        writeln!(writer, "OBSFREQ {}", polyco.frequency_obs())?;
        if let Some(binary) = polyco.binary() {
            writeln!(writer, "BINARY {} {}", binary.phase, binary.frequency)?;
        }
        writeln!(writer, "NCOEFF {}", polyco.coefficients().len())?;
        for chunk in polyco.coefficients().chunks(COEFFS_PER_LINE) {
            write!(writer, "COEFFS")?;
            for value in chunk {
                write!(writer, " {value}")?;
            }
            writeln!(writer)?;
        }
        writeln!(writer, "{BLOCK_TAG} END")?;
    }
    Ok(())
}
