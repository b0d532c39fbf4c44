//! # Time-ordered segment sets
//!
//! Both predictor representations are piecewise in time: a sequence of
//! segments, each valid on a half-open MJD window `[start, end)`. This module
//! implements the bookkeeping once, generically over the [`Segment`] trait:
//!
//! * [`SegmentSet::find`] – locate the segment for an MJD, with a per-call
//!   [`RangeStatus`] instead of a shared out-of-range flag,
//! * [`SegmentSet::insert`] – all-or-nothing merge that preserves ordering and
//!   rejects overlapping windows,
//! * [`SegmentSet::keep`] – prune down to the segments a list of query times
//!   actually needs.
//!
//! ## Invariants
//!
//! * Segments are sorted by strictly increasing start MJD.
//! * No two windows intersect by more than [`SEGMENT_OVERLAP_TOLERANCE`]
//!   (touching windows, `a.end == b.start`, are fine). Inside such a sliver the
//!   later segment wins the lookup.
//!
//! Every constructor and mutator checks both; a failed mutation leaves the set
//! untouched.
//!
//! ## See also
//! ------------
//! * [`crate::cheby::cheby_model_set::ChebyModelSet`] – Chebyshev instantiation.
//! * [`crate::polyco::t1_polyco_set::T1PolycoSet`] – polyco instantiation.
use std::{cmp::Ordering, collections::BTreeSet, fmt};

use itertools::Itertools;
use log::{debug, warn};
use serde::{de, Deserialize, Deserializer, Serialize};

use crate::{
    constants::SEGMENT_OVERLAP_TOLERANCE, long_double::LongDouble,
    predictor_errors::PredictorError,
};

/// A piece of a piecewise model, valid on `[start_mjd, end_mjd)`.
pub trait Segment: Clone + fmt::Debug {
    /// Inclusive start of the validity window (MJD).
    fn start_mjd(&self) -> LongDouble;

    /// Exclusive end of the validity window (MJD).
    fn end_mjd(&self) -> LongDouble;

    fn contains(&self, mjd: LongDouble) -> bool {
        self.start_mjd() <= mjd && mjd < self.end_mjd()
    }

    /// Whether the windows share more than [`SEGMENT_OVERLAP_TOLERANCE`] days.
    fn overlaps(&self, other: &Self) -> bool {
        self.start_mjd() < other.end_mjd() - SEGMENT_OVERLAP_TOLERANCE
            && other.start_mjd() < self.end_mjd() - SEGMENT_OVERLAP_TOLERANCE
    }
}

/// A segment that can predict phase and spin frequency.
pub trait PhaseModel: Segment {
    /// Pulse phase (cycles) at `mjd` observed at `freq` MHz.
    fn phase(&self, mjd: LongDouble, freq: LongDouble) -> LongDouble;

    /// Apparent spin frequency (Hz) at `mjd` observed at `freq` MHz.
    fn frequency(&self, mjd: LongDouble, freq: LongDouble) -> LongDouble;
}

/// Whether a query fell inside a segment window or was served by extrapolation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RangeStatus {
    InRange,
    /// No window contains the query; the nearest segment was used instead.
    OutOfRange,
}

impl RangeStatus {
    pub fn is_in_range(self) -> bool {
        self == RangeStatus::InRange
    }
}

/// Result of [`SegmentSet::find`].
#[derive(Debug, Clone, Copy)]
pub struct Lookup<'a, S> {
    pub segment: &'a S,
    pub index: usize,
    pub status: RangeStatus,
}

/// An evaluated quantity together with the range status of its lookup.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    pub value: LongDouble,
    pub status: RangeStatus,
}

impl Prediction {
    pub fn is_in_range(&self) -> bool {
        self.status.is_in_range()
    }

    /// The value, only if it was produced inside a validity window.
    pub fn in_range(self) -> Option<LongDouble> {
        self.is_in_range().then_some(self.value)
    }
}

/// Ordered, non-overlapping sequence of segments.
///
/// Deserialization goes through [`SegmentSet::from_segments`], so a decoded
/// set holds the same invariants as a constructed one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentSet<S> {
    segments: Vec<S>,
}

impl<'de, S> Deserialize<'de> for SegmentSet<S>
where
    S: Segment + Deserialize<'de>,
{
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(rename = "SegmentSet")]
        struct Stored<S> {
            segments: Vec<S>,
        }

        let stored = Stored::<S>::deserialize(deserializer)?;
        SegmentSet::from_segments(stored.segments).map_err(de::Error::custom)
    }
}

impl<S> Default for SegmentSet<S> {
    fn default() -> Self {
        SegmentSet {
            segments: Vec::new(),
        }
    }
}

fn by_start<S: Segment>(a: &S, b: &S) -> Ordering {
    a.start_mjd()
        .partial_cmp(&b.start_mjd())
        .unwrap_or(Ordering::Equal)
}

/// First pair of overlapping neighbours in a start-sorted slice, as an error.
fn check_no_overlap<S: Segment>(sorted: &[S]) -> Result<(), PredictorError> {
    match sorted.iter().tuple_windows().find(|(a, b)| a.overlaps(*b)) {
        Some((a, b)) => Err(PredictorError::SegmentOverlap {
            first_start: a.start_mjd().to_f64(),
            first_end: a.end_mjd().to_f64(),
            second_start: b.start_mjd().to_f64(),
            second_end: b.end_mjd().to_f64(),
        }),
        None => Ok(()),
    }
}

impl<S: Segment> SegmentSet<S> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a set from segments in any order.
    ///
    /// Arguments
    /// -----------------
    /// * `segments`: Segments to own; they are sorted by start MJD.
    ///
    /// Return
    /// ----------
    /// * The ordered set, or [`PredictorError::SegmentOverlap`] for the first
    ///   pair of intersecting windows.
    pub fn from_segments(mut segments: Vec<S>) -> Result<Self, PredictorError> {
        segments.sort_by(by_start);
        check_no_overlap(&segments)?;
        Ok(SegmentSet { segments })
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn segments(&self) -> &[S] {
        &self.segments
    }

    pub fn iter(&self) -> std::slice::Iter<'_, S> {
        self.segments.iter()
    }

    pub fn first(&self) -> Option<&S> {
        self.segments.first()
    }

    pub fn last(&self) -> Option<&S> {
        self.segments.last()
    }

    /// Start of the earliest segment.
    pub fn start_mjd(&self) -> Option<LongDouble> {
        self.first().map(Segment::start_mjd)
    }

    /// End of the latest segment.
    pub fn end_mjd(&self) -> Option<LongDouble> {
        self.last().map(Segment::end_mjd)
    }

    /// Locate the segment to use for `mjd`.
    ///
    /// Binary search on the start MJDs. When no window contains `mjd` (before
    /// the first segment, after the last one, or in a gap) the segment with the
    /// nearest boundary is returned with [`RangeStatus::OutOfRange`]; callers
    /// decide whether extrapolation is acceptable.
    ///
    /// Arguments
    /// -----------------
    /// * `mjd`: Query time.
    ///
    /// Return
    /// ----------
    /// * `None` for an empty set, otherwise the selected segment, its index and
    ///   the range status.
    pub fn find(&self, mjd: LongDouble) -> Option<Lookup<'_, S>> {
        if self.segments.is_empty() {
            return None;
        }

        // Number of segments starting at or before `mjd`.
        let after = self.segments.partition_point(|s| s.start_mjd() <= mjd);
        if after == 0 {
            return Some(self.lookup(0, RangeStatus::OutOfRange));
        }

        let candidate = after - 1;
        let segment = &self.segments[candidate];
        if segment.contains(mjd) {
            return Some(self.lookup(candidate, RangeStatus::InRange));
        }

        // Past the candidate's end: either a gap or beyond the last segment.
        let index = match self.segments.get(after) {
            Some(next) if next.start_mjd() - mjd < mjd - segment.end_mjd() => after,
            _ => candidate,
        };
        Some(self.lookup(index, RangeStatus::OutOfRange))
    }

    fn lookup(&self, index: usize, status: RangeStatus) -> Lookup<'_, S> {
        Lookup {
            segment: &self.segments[index],
            index,
            status,
        }
    }

    /// Merge deep copies of every segment of `source` into `self`.
    ///
    /// The merge is staged on a copy and committed only if the result keeps
    /// the non-overlap invariant.
    ///
    /// Arguments
    /// -----------------
    /// * `source`: Set whose segments are copied in.
    ///
    /// Return
    /// ----------
    /// * `Ok(())` on success; [`PredictorError::SegmentOverlap`] otherwise, with
    ///   `self` unchanged.
    pub fn insert(&mut self, source: &SegmentSet<S>) -> Result<(), PredictorError> {
        if source.is_empty() {
            return Ok(());
        }

        let mut staged = Vec::with_capacity(self.segments.len() + source.len());
        staged.extend(self.segments.iter().cloned());
        staged.extend(source.segments.iter().cloned());
        staged.sort_by(by_start);
        check_no_overlap(&staged)?;

        debug!(
            "merged {} segments into a set of {} (now {})",
            source.len(),
            self.segments.len(),
            staged.len()
        );
        self.segments = staged;
        Ok(())
    }

    /// Keep only the segments that `mjds` resolve to.
    ///
    /// A time inside a window keeps that segment. A time outside every window
    /// keeps the nearest segment instead, so every time still resolves after
    /// pruning; it is logged since that segment will extrapolate for it.
    ///
    /// Arguments
    /// -----------------
    /// * `mjds`: Query times the pruned set must still serve.
    pub fn keep(&mut self, mjds: &[LongDouble]) {
        let mut needed = BTreeSet::new();
        for &mjd in mjds {
            if let Some(hit) = self.find(mjd) {
                if !hit.status.is_in_range() {
                    warn!("keep: MJD {mjd} falls outside every segment, keeping the nearest one");
                }
                needed.insert(hit.index);
            }
        }

        let before = self.segments.len();
        let mut index = 0;
        self.segments.retain(|_| {
            let keep = needed.contains(&index);
            index += 1;
            keep
        });
        debug!("keep: retained {} of {} segments", self.segments.len(), before);
    }

    /// Drop every segment.
    pub fn clear(&mut self) {
        self.segments.clear();
    }
}

impl<S: PhaseModel> SegmentSet<S> {
    /// Phase from the segment selected by [`Self::find`]; `None` if empty.
    pub fn phase(&self, mjd: LongDouble, freq: LongDouble) -> Option<Prediction> {
        self.find(mjd).map(|hit| Prediction {
            value: hit.segment.phase(mjd, freq),
            status: hit.status,
        })
    }

    /// Spin frequency from the segment selected by [`Self::find`]; `None` if empty.
    pub fn frequency(&self, mjd: LongDouble, freq: LongDouble) -> Option<Prediction> {
        self.find(mjd).map(|hit| Prediction {
            value: hit.segment.frequency(mjd, freq),
            status: hit.status,
        })
    }
}

impl<'a, S> IntoIterator for &'a SegmentSet<S> {
    type Item = &'a S;
    type IntoIter = std::slice::Iter<'a, S>;

    fn into_iter(self) -> Self::IntoIter {
        self.segments.iter()
    }
}

#[cfg(test)]
pub(crate) mod test_segment_set {
    use super::*;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub(crate) struct Window(pub f64, pub f64);

    impl Segment for Window {
        fn start_mjd(&self) -> LongDouble {
            LongDouble::from(self.0)
        }

        fn end_mjd(&self) -> LongDouble {
            LongDouble::from(self.1)
        }
    }

    fn ld(x: f64) -> LongDouble {
        LongDouble::from(x)
    }

    fn set(windows: &[(f64, f64)]) -> SegmentSet<Window> {
        SegmentSet::from_segments(windows.iter().map(|&(a, b)| Window(a, b)).collect()).unwrap()
    }

    #[test]
    fn test_from_segments_sorts() {
        let s = set(&[(2.0, 3.0), (0.0, 1.0), (1.0, 2.0)]);
        let starts: Vec<f64> = s.iter().map(|w| w.0).collect();
        assert_eq!(starts, vec![0.0, 1.0, 2.0]);
        assert_eq!(s.start_mjd(), Some(ld(0.0)));
        assert_eq!(s.end_mjd(), Some(ld(3.0)));
    }

    #[test]
    fn test_from_segments_rejects_overlap() {
        let err = SegmentSet::from_segments(vec![Window(0.0, 1.5), Window(1.0, 2.0)]).unwrap_err();
        assert_eq!(
            err,
            PredictorError::SegmentOverlap {
                first_start: 0.0,
                first_end: 1.5,
                second_start: 1.0,
                second_end: 2.0
            }
        );
    }

    #[test]
    fn test_rounding_sized_overlap_counts_as_touching() {
        let first = Window(0.0, 1.0 + 3e-12);
        let s = SegmentSet::from_segments(vec![Window(1.0, 2.0), first.clone()]).unwrap();
        assert_eq!(s.len(), 2);
        assert_eq!(s.find(ld(1.0 + 1e-12)).unwrap().index, 1);
        assert_eq!(s.find(ld(1.0 - 1e-12)).unwrap().index, 0);

        assert!(SegmentSet::from_segments(vec![first, Window(1.0 - 1e-8, 2.0)]).is_err());
    }

    #[test]
    fn test_deserialize_checks_invariants() {
        let s: SegmentSet<Window> =
            serde_json::from_str(r#"{"segments":[[1.0,2.0],[0.0,1.0]]}"#).unwrap();
        let starts: Vec<f64> = s.iter().map(|w| w.0).collect();
        assert_eq!(starts, vec![0.0, 1.0]);

        let err = serde_json::from_str::<SegmentSet<Window>>(r#"{"segments":[[0.0,1.5],[1.0,2.0]]}"#)
            .unwrap_err();
        assert!(err.to_string().contains("overlap"), "{err}");
    }

    #[test]
    fn test_find_inside() {
        let s = set(&[(0.0, 1.0), (1.0, 2.5), (2.5, 2.6)]);
        let hit = s.find(ld(1.0)).unwrap();
        assert_eq!(hit.index, 1);
        assert_eq!(hit.status, RangeStatus::InRange);

        let hit = s.find(ld(2.55)).unwrap();
        assert_eq!(hit.index, 2);
        assert!(hit.status.is_in_range());

        let hit = s.find(ld(0.0)).unwrap();
        assert_eq!(hit.index, 0);
        assert!(hit.status.is_in_range());
    }

    #[test]
    fn test_find_outside_returns_nearest() {
        let s = set(&[(0.0, 1.0), (3.0, 4.0)]);
        assert!(s.find(ld(-0.5)).is_some_and(|l| l.index == 0 && !l.status.is_in_range()));
        assert!(s.find(ld(4.0)).is_some_and(|l| l.index == 1 && !l.status.is_in_range()));
        assert!(s.find(ld(1.4)).is_some_and(|l| l.index == 0 && !l.status.is_in_range()));
        assert!(s.find(ld(2.6)).is_some_and(|l| l.index == 1 && !l.status.is_in_range()));
        assert!(SegmentSet::<Window>::new().find(ld(0.0)).is_none());
    }

    #[test]
    fn test_insert_merges_in_order() {
        let mut a = set(&[(0.0, 1.0), (4.0, 5.0)]);
        let b = set(&[(2.0, 3.0), (1.0, 2.0)]);
        a.insert(&b).unwrap();
        let starts: Vec<f64> = a.iter().map(|w| w.0).collect();
        assert_eq!(starts, vec![0.0, 1.0, 2.0, 4.0]);
        // source untouched
        assert_eq!(b.len(), 2);
    }

    #[test]
    fn test_insert_overlap_leaves_destination() {
        let mut a = set(&[(0.0, 1.0), (2.0, 3.0)]);
        let before = a.clone();
        let b = set(&[(0.5, 1.5)]);
        assert!(matches!(
            a.insert(&b),
            Err(PredictorError::SegmentOverlap { .. })
        ));
        assert_eq!(a, before);
    }

    #[test]
    fn test_keep_retains_needed_only() {
        let mut s = set(&[(0.0, 1.0), (1.0, 2.0), (2.0, 3.0), (3.0, 4.0)]);
        s.keep(&[ld(0.5), ld(0.7), ld(2.1)]);
        let starts: Vec<f64> = s.iter().map(|w| w.0).collect();
        assert_eq!(starts, vec![0.0, 2.0]);

        // an out-of-range time keeps its nearest segment
        s.keep(&[ld(10.0)]);
        let starts: Vec<f64> = s.iter().map(|w| w.0).collect();
        assert_eq!(starts, vec![2.0]);

        s.keep(&[]);
        assert!(s.is_empty());
    }
}
