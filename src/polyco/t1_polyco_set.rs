//! Ordered set of TEMPO1 polycos.
use crate::{
    constants::MHz,
    long_double::LongDouble,
    segment_set::{Segment, SegmentSet},
};

use super::t1_polyco::T1Polyco;

pub type T1PolycoSet = SegmentSet<T1Polyco>;

impl SegmentSet<T1Polyco> {
    /// Observing frequency the first polyco was fitted at.
    ///
    /// Polycos are single-frequency models, so the frequency "window" of a set
    /// collapses to this value at both ends.
    pub fn frequency_obs(&self) -> Option<MHz> {
        self.first().map(|p| LongDouble::from(p.frequency_obs()))
    }

    /// Whether consecutive polycos leave no gap in time.
    pub fn is_contiguous(&self) -> bool {
        self.segments()
            .windows(2)
            .all(|pair| pair[0].end_mjd() >= pair[1].start_mjd())
    }
}

#[cfg(test)]
mod test_t1_polyco_set {
    use approx::assert_abs_diff_eq;

    use super::*;
    use crate::{
        polyco::t1_polyco::test_t1_polyco::{constant_polyco, ld},
        segment_set::RangeStatus,
    };

    #[test]
    fn test_lookup_across_polycos() {
        // two 90-minute polycos centred 90 minutes apart
        let first = constant_polyco(59000.5, 0.0, 50.0).with_dispersion(0.0, 1400.0);
        let second = constant_polyco(59000.5625, 50.0 * 5400.0, 50.0);
        let set = T1PolycoSet::from_segments(vec![second, first]).unwrap();
        assert!(set.is_contiguous());
        assert_eq!(set.frequency_obs(), Some(ld(1400.0)));

        let boundary = set.segments()[0].end_mjd();
        let hit = set.phase(boundary, ld(0.0)).unwrap();
        assert_eq!(hit.status, RangeStatus::InRange);
        assert_abs_diff_eq!(hit.value.to_f64(), 50.0 * 2700.0, epsilon = 1e-6);

        let miss = set.frequency(ld(59001.0), ld(0.0)).unwrap();
        assert_eq!(miss.status, RangeStatus::OutOfRange);
        assert_abs_diff_eq!(miss.value.to_f64(), 50.0, epsilon = 1e-12);
    }

    #[test]
    fn test_gap_detection() {
        let set = T1PolycoSet::from_segments(vec![
            constant_polyco(59000.5, 0.0, 50.0),
            constant_polyco(59000.6, 0.0, 50.0),
        ])
        .unwrap();
        assert!(!set.is_contiguous());
        assert_eq!(T1PolycoSet::new().frequency_obs(), None);
    }
}
