//! # Predictor
//!
//! [`Predictor`] is the kind-agnostic handle consumers work with: it holds
//! either nothing, a Chebyshev set or a polyco set, and dispatches every
//! operation to the active representation.
//!
//! ## Lifecycle
//!
//! * starts as [`Predictor::None`] ([`Predictor::new`]),
//! * is populated by decoding ([`Predictor::read`], [`Predictor::fread`]) or by
//!   merging another predictor ([`Predictor::insert`]),
//! * may be pruned for a set of query times ([`Predictor::keep`]),
//! * is reset by [`Predictor::destroy`].
//!
//! Predictors own their segments; `Clone` and [`Predictor::copy_from`] are
//! deep copies. Queries take `&self` and report whether they were served from
//! inside a validity window through [`Prediction::status`].
//!
//! ## Example
//!
//! ```rust, no_run
//! use pulsar_predictor::{long_double::LongDouble, predictor::Predictor};
//!
//! let predictor = Predictor::read("J0437-4715.pred").unwrap();
//! let mjd: LongDouble = "59000.123456789012345678".parse().unwrap();
//! let phase = predictor.phase(mjd, LongDouble::from(1400.0)).unwrap();
//! println!("phase {} (in range: {})", phase.value, phase.is_in_range());
//! ```
use std::{
    fmt,
    fs::File,
    io::{BufRead, BufReader, BufWriter, Write},
};

use camino::Utf8Path;
use log::debug;

use crate::{
    cheby::cheby_model_set::ChebyModelSet,
    config::PredictorConfig,
    constants::{MHz, Mjd},
    identifier::Identifier,
    io,
    polyco::t1_polyco_set::T1PolycoSet,
    predictor_errors::PredictorError,
    segment_set::{Prediction, Segment},
};

/// Which representation a [`Predictor`] holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PredictorKind {
    None,
    Cheby,
    T1,
}

impl fmt::Display for PredictorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PredictorKind::None => "None",
            PredictorKind::Cheby => "Cheby",
            PredictorKind::T1 => "T1",
        };
        f.write_str(name)
    }
}

/// Pulsar phase predictor with exactly one active representation.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Predictor {
    #[default]
    None,
    Cheby(ChebyModelSet),
    T1(T1PolycoSet),
}

impl Predictor {
    pub fn new() -> Self {
        Predictor::None
    }

    pub fn kind(&self) -> PredictorKind {
        match self {
            Predictor::None => PredictorKind::None,
            Predictor::Cheby(_) => PredictorKind::Cheby,
            Predictor::T1(_) => PredictorKind::T1,
        }
    }

    /// `true` for [`Predictor::None`] and for a kind with no segments.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of segments in the active representation.
    pub fn len(&self) -> usize {
        match self {
            Predictor::None => 0,
            Predictor::Cheby(set) => set.len(),
            Predictor::T1(set) => set.len(),
        }
    }

    /// Replace `self` with a deep copy of `source`.
    pub fn copy_from(&mut self, source: &Predictor) {
        self.clone_from(source);
    }

    /// Merge deep copies of the segments of `source` into `self`.
    ///
    /// Arguments
    /// -----------------
    /// * `source`: Predictor to copy segments from. A `None` source is a no-op.
    ///
    /// Return
    /// ----------
    /// * `Ok(())` on success. [`PredictorError::KindMismatch`] when both sides
    ///   hold different kinds, or [`PredictorError::SegmentOverlap`] when a
    ///   source window intersects a destination window. `self` is unchanged on
    ///   error.
    ///
    /// See also
    /// ------------
    /// * [`crate::segment_set::SegmentSet::insert`] – the staged merge.
    pub fn insert(&mut self, source: &Predictor) -> Result<(), PredictorError> {
        if matches!(source, Predictor::None) {
            return Ok(());
        }
        if matches!(self, Predictor::None) {
            *self = source.clone();
            return Ok(());
        }
        match (self, source) {
            (Predictor::Cheby(dst), Predictor::Cheby(src)) => dst.insert(src),
            (Predictor::T1(dst), Predictor::T1(src)) => dst.insert(src),
            (dst, src) => Err(PredictorError::KindMismatch {
                into: dst.kind(),
                from: src.kind(),
            }),
        }
    }

    /// Prune down to the segments needed to serve `mjds`.
    pub fn keep(&mut self, mjds: &[Mjd]) {
        match self {
            Predictor::None => {}
            Predictor::Cheby(set) => set.keep(mjds),
            Predictor::T1(set) => set.keep(mjds),
        }
    }

    /// Release every segment and reset to [`Predictor::None`].
    pub fn destroy(&mut self) {
        *self = Predictor::None;
    }

    pub fn psr_name(&self) -> Option<&Identifier> {
        match self {
            Predictor::None => None,
            Predictor::Cheby(set) => set.first().map(|s| s.psr_name()),
            Predictor::T1(set) => set.first().map(|s| s.psr_name()),
        }
    }

    pub fn site_name(&self) -> Option<&Identifier> {
        match self {
            Predictor::None => None,
            Predictor::Cheby(set) => set.first().map(|s| s.site_name()),
            Predictor::T1(set) => set.first().map(|s| s.site_name()),
        }
    }

    /// Start of validity of the earliest segment.
    pub fn start_mjd(&self) -> Option<Mjd> {
        match self {
            Predictor::None => None,
            Predictor::Cheby(set) => set.start_mjd(),
            Predictor::T1(set) => set.start_mjd(),
        }
    }

    /// End of validity of the latest segment.
    pub fn end_mjd(&self) -> Option<Mjd> {
        match self {
            Predictor::None => None,
            Predictor::Cheby(set) => set.end_mjd(),
            Predictor::T1(set) => set.end_mjd(),
        }
    }

    /// Lowest supported observing frequency. A polyco set reports its single
    /// fitted observing frequency.
    pub fn start_freq(&self) -> Option<MHz> {
        match self {
            Predictor::None => None,
            Predictor::Cheby(set) => set.freq_start(),
            Predictor::T1(set) => set.frequency_obs(),
        }
    }

    /// Highest supported observing frequency.
    pub fn end_freq(&self) -> Option<MHz> {
        match self {
            Predictor::None => None,
            Predictor::Cheby(set) => set.freq_end(),
            Predictor::T1(set) => set.frequency_obs(),
        }
    }

    /// Whether `mjd` lies inside some segment window.
    pub fn covers(&self, mjd: Mjd) -> bool {
        match self {
            Predictor::None => false,
            Predictor::Cheby(set) => set.iter().any(|s| s.contains(mjd)),
            Predictor::T1(set) => set.iter().any(|s| s.contains(mjd)),
        }
    }

    /// Pulse phase at `mjd` for observing frequency `freq` (MHz, `0` meaning
    /// infinite frequency).
    ///
    /// Return
    /// ----------
    /// * The phase (cycles) and whether it came from inside a validity window,
    ///   or [`PredictorError::EmptyPredictor`].
    pub fn phase(&self, mjd: Mjd, freq: MHz) -> Result<Prediction, PredictorError> {
        let prediction = match self {
            Predictor::None => None,
            Predictor::Cheby(set) => set.phase(mjd, freq),
            Predictor::T1(set) => set.phase(mjd, freq),
        };
        prediction.ok_or(PredictorError::EmptyPredictor)
    }

    /// Apparent spin frequency (Hz) at `mjd` for observing frequency `freq`.
    pub fn frequency(&self, mjd: Mjd, freq: MHz) -> Result<Prediction, PredictorError> {
        let prediction = match self {
            Predictor::None => None,
            Predictor::Cheby(set) => set.frequency(mjd, freq),
            Predictor::T1(set) => set.frequency(mjd, freq),
        };
        prediction.ok_or(PredictorError::EmptyPredictor)
    }

    /// Decode a predictor file with the default [`PredictorConfig`].
    pub fn read(path: impl AsRef<Utf8Path>) -> Result<Self, PredictorError> {
        Self::read_with(path, &PredictorConfig::default())
    }

    /// Decode a predictor file.
    ///
    /// Arguments
    /// -----------------
    /// * `path`: File in the predictor text format or a legacy TEMPO1
    ///   `polyco.dat`.
    /// * `config`: Decoding limits.
    ///
    /// Return
    /// ----------
    /// * The decoded predictor, [`PredictorError::ResourceError`] if the file
    ///   cannot be opened or read, or [`PredictorError::ParseError`] with the
    ///   offending line number.
    pub fn read_with(
        path: impl AsRef<Utf8Path>,
        config: &PredictorConfig,
    ) -> Result<Self, PredictorError> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let predictor = io::decode(BufReader::new(file), config)?;
        debug!(
            "read {} predictor with {} segments from {path}",
            predictor.kind(),
            predictor.len()
        );
        Ok(predictor)
    }

    /// Decode from an open stream into `self`.
    ///
    /// The stream is decoded into a fresh predictor; `self` is replaced only
    /// if decoding succeeds.
    pub fn fread<R: BufRead>(&mut self, reader: R) -> Result<(), PredictorError> {
        *self = io::decode(reader, &PredictorConfig::default())?;
        Ok(())
    }

    /// Encode to a file, creating or truncating it.
    pub fn write(&self, path: impl AsRef<Utf8Path>) -> Result<(), PredictorError> {
        let path = path.as_ref();
        let mut writer = BufWriter::new(File::create(path)?);
        self.fwrite(&mut writer)?;
        writer.flush()?;
        debug!("wrote {} predictor with {} segments to {path}", self.kind(), self.len());
        Ok(())
    }

    /// Encode to an open stream.
    pub fn fwrite<W: Write>(&self, writer: W) -> Result<(), PredictorError> {
        io::encode(writer, self)
    }
}

impl fmt::Display for Predictor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} predictor, {} segments", self.kind(), self.len())?;
        match self {
            Predictor::None => Ok(()),
            Predictor::Cheby(set) => set.iter().try_for_each(|s| writeln!(f, "  {s}")),
            Predictor::T1(set) => set.iter().try_for_each(|s| writeln!(f, "  {s}")),
        }
    }
}

impl From<ChebyModelSet> for Predictor {
    fn from(set: ChebyModelSet) -> Self {
        Predictor::Cheby(set)
    }
}

impl From<T1PolycoSet> for Predictor {
    fn from(set: T1PolycoSet) -> Self {
        Predictor::T1(set)
    }
}

#[cfg(test)]
mod test_predictor {
    use approx::assert_abs_diff_eq;

    use super::*;
    use crate::{
        cheby::cheby_model::test_cheby_model::{ld, linear_segment},
        polyco::t1_polyco::test_t1_polyco::constant_polyco,
        segment_set::RangeStatus,
    };

    fn cheby_day(start: f64, f0: f64) -> Predictor {
        let base = (start - 59000.0) * 86400.0 * f0;
        Predictor::from(
            ChebyModelSet::from_segments(vec![linear_segment(start, start + 1.0, base, f0)]).unwrap(),
        )
    }

    #[test]
    fn test_predictor_is_thread_safe() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Predictor>();
    }

    #[test]
    fn test_empty_predictor() {
        let p = Predictor::new();
        assert_eq!(p.kind(), PredictorKind::None);
        assert!(p.is_empty());
        assert_eq!(p.psr_name(), None);
        assert_eq!(p.start_mjd(), None);
        assert_eq!(p.start_freq(), None);
        assert_eq!(p.phase(ld(59000.0), ld(1400.0)).unwrap_err(), PredictorError::EmptyPredictor);
        assert_eq!(
            p.frequency(ld(59000.0), ld(1400.0)).unwrap_err(),
            PredictorError::EmptyPredictor
        );
    }

    #[test]
    fn test_insert_adopts_kind() {
        let mut p = Predictor::new();
        p.insert(&cheby_day(59000.0, 10.0)).unwrap();
        assert_eq!(p.kind(), PredictorKind::Cheby);
        p.insert(&cheby_day(59001.0, 10.0)).unwrap();
        assert_eq!(p.len(), 2);
        assert_eq!(p.start_mjd(), Some(ld(59000.0)));
        assert_eq!(p.end_mjd(), Some(ld(59002.0)));
        assert_eq!(p.psr_name().map(Identifier::as_str), Some("J0437-4715"));
        assert_eq!(p.site_name().map(Identifier::as_str), Some("pks"));
        assert_eq!(p.start_freq(), Some(ld(1200.0)));
        assert_eq!(p.end_freq(), Some(ld(1600.0)));

        // inserting nothing changes nothing
        let before = p.clone();
        p.insert(&Predictor::None).unwrap();
        assert_eq!(p, before);
    }

    #[test]
    fn test_insert_kind_mismatch() {
        let mut p = cheby_day(59000.0, 10.0);
        let t1 = Predictor::from(
            T1PolycoSet::from_segments(vec![constant_polyco(59010.5, 0.0, 10.0)]).unwrap(),
        );
        let before = p.clone();
        assert_eq!(
            p.insert(&t1).unwrap_err(),
            PredictorError::KindMismatch {
                into: PredictorKind::Cheby,
                from: PredictorKind::T1
            }
        );
        assert_eq!(p, before);
    }

    #[test]
    fn test_copy_is_deep() {
        let source = cheby_day(59000.0, 10.0);
        let mut copy = Predictor::new();
        copy.copy_from(&source);
        copy.destroy();
        assert_eq!(copy.kind(), PredictorKind::None);
        assert_eq!(source.len(), 1);
    }

    #[test]
    fn test_phase_and_frequency_dispatch() {
        let mut p = cheby_day(59000.0, 10.0);
        p.insert(&cheby_day(59001.0, 10.0)).unwrap();

        let phase = p.phase(ld(59001.5), ld(1400.0)).unwrap();
        assert_eq!(phase.status, RangeStatus::InRange);
        assert_abs_diff_eq!(phase.value.to_f64(), 1.5 * 86400.0 * 10.0, epsilon = 1e-6);

        let freq = p.frequency(ld(59003.0), ld(1400.0)).unwrap();
        assert_eq!(freq.status, RangeStatus::OutOfRange);
        assert_abs_diff_eq!(freq.value.to_f64(), 10.0, epsilon = 1e-12);
        assert!(p.covers(ld(59000.0)));
        assert!(!p.covers(ld(59002.0)));
    }

    #[test]
    fn test_keep_delegates() {
        let mut p = cheby_day(59000.0, 10.0);
        p.insert(&cheby_day(59001.0, 10.0)).unwrap();
        p.insert(&cheby_day(59002.0, 10.0)).unwrap();
        p.keep(&[ld(59001.2), ld(59001.7)]);
        assert_eq!(p.len(), 1);
        assert_eq!(p.start_mjd(), Some(ld(59001.0)));
    }

    #[test]
    fn test_t1_frequency_window() {
        let p = Predictor::from(
            T1PolycoSet::from_segments(vec![
                constant_polyco(59000.5, 0.0, 10.0).with_dispersion(1.0, 430.0)
            ])
            .unwrap(),
        );
        assert_eq!(p.kind(), PredictorKind::T1);
        assert_eq!(p.start_freq(), Some(ld(430.0)));
        assert_eq!(p.end_freq(), Some(ld(430.0)));
    }
}
