//! Ordered set of Chebyshev segments.
//!
//! [`ChebyModelSet`] is the Chebyshev instantiation of
//! [`SegmentSet`](crate::segment_set::SegmentSet); lookup, merge and pruning
//! come from there. This module adds the accessors that are specific to the
//! Chebyshev representation.
use crate::{
    constants::MHz,
    long_double::LongDouble,
    segment_set::{Segment, SegmentSet},
};

use super::cheby_model::ChebyModel;

pub type ChebyModelSet = SegmentSet<ChebyModel>;

impl SegmentSet<ChebyModel> {
    /// Lowest frequency covered by every segment (the intersection of windows).
    pub fn freq_start(&self) -> Option<MHz> {
        self.iter()
            .map(ChebyModel::freq_start)
            .reduce(LongDouble::max)
    }

    /// Highest frequency covered by every segment.
    pub fn freq_end(&self) -> Option<MHz> {
        self.iter().map(ChebyModel::freq_end).reduce(LongDouble::min)
    }

    /// Total time covered by segments, in days (gaps excluded).
    pub fn covered_days(&self) -> LongDouble {
        self.iter().map(|s| s.end_mjd() - s.start_mjd()).sum()
    }
}
