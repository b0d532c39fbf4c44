//! Reader for classic TEMPO1 `polyco.dat` files.
//!
//! Each polyco occupies two header lines followed by coefficient lines:
//!
//! ```text
//! <psr> <date> <utc> <tmid> <dm> [<doppler> [<log10rms>]]
//! <rphase> <f0> <site> <span> <ncoeff> <obsfreq> [<binphase> [<binfreq>]]
//! <c0> <c1> <c2>
//! ...
//! ```
//!
//! Numbers may use Fortran `D` exponents. Fields are read as whitespace
//! separated tokens; the date and UTC columns are informational and skipped.
use std::{fmt::Display, io::BufRead, str::FromStr};

use log::debug;

use crate::{
    config::PredictorConfig,
    constants::MAX_POLYCO_COEFFS,
    long_double::LongDouble,
    polyco::{t1_polyco::T1Polyco, t1_polyco_set::T1PolycoSet},
    predictor_errors::PredictorError,
};

use super::{lines::LineReader, parsers::tokens};

/// Column values of one legacy line.
struct Columns<'a> {
    number: usize,
    fields: Vec<&'a str>,
}

/// `f64` that also accepts `1.0D-05`.
struct Fortran(f64);

impl FromStr for Fortran {
    type Err = <LongDouble as FromStr>::Err;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<LongDouble>().map(|v| Fortran(v.to_f64()))
    }
}

impl<'a> Columns<'a> {
    fn split(line: &'a str, number: usize) -> Result<Self, PredictorError> {
        let (_, fields) =
            tokens(line).map_err(|_| PredictorError::parse(number, "empty polyco line"))?;
        Ok(Columns { number, fields })
    }

    fn optional<T>(&self, index: usize, name: &str) -> Result<Option<T>, PredictorError>
    where
        T: FromStr,
        T::Err: Display,
    {
        self.fields
            .get(index)
            .map(|raw| {
                raw.parse().map_err(|err| {
                    PredictorError::parse(self.number, format!("bad {name} {raw:?} ({err})"))
                })
            })
            .transpose()
    }

    fn required<T>(&self, index: usize, name: &str) -> Result<T, PredictorError>
    where
        T: FromStr,
        T::Err: Display,
    {
        self.optional(index, name)?
            .ok_or_else(|| PredictorError::parse(self.number, format!("missing {name}")))
    }
}

fn read_polyco<R: BufRead>(lines: &mut LineReader<R>) -> Result<T1Polyco, PredictorError> {
    let first = lines.expect_line("a polyco header line")?;
    let first = Columns::split(&first, lines.line_number())?;
    let psr_name = first.required(0, "pulsar name")?;
    let mjd_mid: LongDouble = first.required(3, "TMID")?;
    let Fortran(dm) = first.required(4, "DM")?;
    let doppler = first.optional::<Fortran>(5, "Doppler shift")?.map_or(0.0, |f| f.0);
    let log10rms = first.optional::<Fortran>(6, "log10 rms")?.map_or(0.0, |f| f.0);

    let second = lines.expect_line("a polyco parameter line")?;
    let second = Columns::split(&second, lines.line_number())?;
    let reference_phase: LongDouble = second.required(0, "RPHASE")?;
    let frequency_psr_0: LongDouble = second.required(1, "F0")?;
    let site_name = second.required(2, "site")?;
    let span: u32 = second.required(3, "span")?;
    let ncoeff: usize = second.required(4, "coefficient count")?;
    let Fortran(frequency_obs) = second.required(5, "observing frequency")?;
    let binary_phase = second.optional::<Fortran>(6, "binary phase")?;
    let binary_frequency = second.optional::<Fortran>(7, "binary frequency")?;
    if ncoeff > MAX_POLYCO_COEFFS {
        return Err(PredictorError::parse(
            second.number,
            format!("{ncoeff} coefficients exceed the maximum of {MAX_POLYCO_COEFFS}"),
        ));
    }
    let second_number = second.number;

    let mut coeff = Vec::with_capacity(ncoeff);
    while coeff.len() < ncoeff {
        let line = lines.expect_line("polyco coefficients")?;
        let columns = Columns::split(&line, lines.line_number())?;
        if coeff.len() + columns.fields.len() > ncoeff {
            return Err(PredictorError::parse(
                columns.number,
                format!("more than the {ncoeff} declared coefficients"),
            ));
        }
        for index in 0..columns.fields.len() {
            coeff.push(columns.required::<LongDouble>(index, "coefficient")?);
        }
    }

    let polyco = T1Polyco::new(
        psr_name,
        site_name,
        mjd_mid,
        span,
        reference_phase,
        frequency_psr_0,
        coeff,
    )
    .map_err(|err| PredictorError::parse(second_number, err.to_string()))?
    .with_dispersion(dm, frequency_obs)
    .with_doppler(doppler)
    .with_log10rms(log10rms);

    Ok(match binary_phase {
        Some(Fortran(phase)) => {
            polyco.with_binary(phase, binary_frequency.map_or(0.0, |f| f.0))
        }
        None => polyco,
    })
}

/// Read every polyco until the end of the stream.
pub(crate) fn read_polycos<R: BufRead>(
    lines: &mut LineReader<R>,
    config: &PredictorConfig,
) -> Result<T1PolycoSet, PredictorError> {
    let mut polycos = Vec::new();
    while lines.peek()?.is_some() {
        if polycos.len() == config.max_segments {
            return Err(PredictorError::parse(
                lines.line_number() + 1,
                format!("more than {} polycos", config.max_segments),
            ));
        }
        polycos.push(read_polyco(lines)?);
    }
    debug!("read {} legacy TEMPO1 polycos", polycos.len());
    T1PolycoSet::from_segments(polycos)
}

#[cfg(test)]
mod test_tempo1 {
    use approx::assert_abs_diff_eq;

    use super::*;
    use crate::segment_set::Segment;

    const POLYCO_DAT: &str = "\
1937+21    1-Jun-20  120000.00   59001.50000000000           71.024900 -0.123 -6.123
    123456.789012   641.928222127829    3   60  12   1410.000
 0.12345678901234567D-03  0.11234567890123457D+00 -0.23456789012345678D-04
 0.34567890123456789D-06 -0.45678901234567890D-08  0.56789012345678901D-10
-0.67890123456789012D-12  0.78901234567890123D-14 -0.89012345678901234D-16
 0.90123456789012345D-18 -0.10123456789012345D-19  0.11123456789012345D-21
1937+21    1-Jun-20  130000.00   59001.54166666666667        71.024900 -0.123 -6.123
    1635437.024     641.928222127829    3   60   3   1410.000   0.25  0.001
 0.1D-03  0.2D+00 -0.3D-04
";

    fn read(text: &str) -> Result<T1PolycoSet, PredictorError> {
        read_polycos(&mut LineReader::new(text.as_bytes()), &PredictorConfig::default())
    }

    #[test]
    fn test_read_legacy_file() {
        let set = read(POLYCO_DAT).unwrap();
        assert_eq!(set.len(), 2);

        let first = &set.segments()[0];
        assert_eq!(first.psr_name().as_str(), "1937+21");
        assert_eq!(first.site_name().as_str(), "3");
        assert_eq!(first.span_minutes(), 60);
        assert_eq!(first.coefficients().len(), 12);
        assert_abs_diff_eq!(first.coefficients()[1].to_f64(), 0.11234567890123457, epsilon = 1e-17);
        assert_abs_diff_eq!(first.dm(), 71.0249, epsilon = 1e-12);
        assert_abs_diff_eq!(first.doppler(), -0.123, epsilon = 1e-12);
        assert_abs_diff_eq!(first.log10rms(), -6.123, epsilon = 1e-12);
        assert_abs_diff_eq!(first.frequency_obs(), 1410.0, epsilon = 1e-12);
        assert_eq!(first.binary(), None);
        assert_abs_diff_eq!(first.reference_phase().to_f64(), 123456.789012, epsilon = 1e-9);

        let second = &set.segments()[1];
        let binary = second.binary().unwrap();
        assert_abs_diff_eq!(binary.phase, 0.25, epsilon = 1e-15);
        assert_abs_diff_eq!(binary.frequency, 0.001, epsilon = 1e-15);
        assert!(second.start_mjd() >= first.end_mjd());
    }

    #[test]
    fn test_hourly_file_with_rounded_epochs() {
        let text = "\
1937+21    1-Jun-20  130000.00   59001.54166666667           71.024900  0.0   -6.0
    0.000000   641.928222127829    ao   60   1   1410.000
 0.00000000000000000D+00
1937+21    1-Jun-20  140000.00   59001.58333333333           71.024900  0.0   -6.0
    0.500000   641.928222127829    ao   60   1   1410.000
 0.00000000000000000D+00
";
        let set = read(text).unwrap();
        assert_eq!(set.len(), 2);

        let (first, second) = (&set.segments()[0], &set.segments()[1]);
        assert!(first.end_mjd() > second.start_mjd());
        let boundary = LongDouble::from(59001.5625);
        let hit = set.find(boundary).unwrap();
        assert_eq!(hit.index, 1);
        assert!(hit.status.is_in_range());
    }

    #[test]
    fn test_truncated_coefficients() {
        let text: String = POLYCO_DAT.lines().take(4).map(|l| format!("{l}\n")).collect();
        assert_eq!(
            read(&text).unwrap_err(),
            PredictorError::parse(5, "unexpected end of input, expected polyco coefficients")
        );
    }

    #[test]
    fn test_bad_number() {
        let text = POLYCO_DAT.replacen("641.928222127829", "641.9x", 1);
        assert!(matches!(
            read(&text),
            Err(PredictorError::ParseError { line: 2, .. })
        ));
    }

    #[test]
    fn test_polyco_limit() {
        let config = PredictorConfig::default().with_max_segments(1);
        let err = read_polycos(&mut LineReader::new(POLYCO_DAT.as_bytes()), &config).unwrap_err();
        assert_eq!(err, PredictorError::parse(7, "more than 1 polycos"));
    }
}
