mod common;

use approx::assert_abs_diff_eq;
use common::{cheby_day, cheby_predictor, ld, polyco, polyco_predictor, CHEBY_F0};
use pulsar_predictor::{
    cheby::cheby_model_set::ChebyModelSet, polyco::t1_polyco_set::T1PolycoSet, Predictor,
    PredictorError, PredictorKind, RangeStatus,
};

fn single_day(start: f64) -> Predictor {
    Predictor::from(ChebyModelSet::from_segments(vec![cheby_day(start, 0.0)]).unwrap())
}

#[test]
fn merging_day_by_day_matches_the_full_set() {
    let mut merged = Predictor::new();
    merged.insert(&single_day(59001.0)).unwrap();
    merged.insert(&Predictor::None).unwrap();
    merged.insert(&single_day(59000.0)).unwrap();

    assert_eq!(merged, cheby_predictor());
    assert_eq!(merged.start_mjd(), Some(ld(59000.0)));
    assert_eq!(merged.end_mjd(), Some(ld(59002.0)));
}

#[test]
fn merge_rejects_overlap_and_mismatched_kinds() {
    let mut predictor = cheby_predictor();
    let before = predictor.clone();

    let err = predictor.insert(&single_day(59001.0)).unwrap_err();
    assert!(matches!(err, PredictorError::SegmentOverlap { .. }));

    let err = predictor.insert(&polyco_predictor()).unwrap_err();
    assert_eq!(
        err,
        PredictorError::KindMismatch {
            into: PredictorKind::Cheby,
            from: PredictorKind::T1,
        }
    );
    assert_eq!(predictor, before);
}

#[test]
fn phase_is_continuous_across_the_segment_boundary() {
    let predictor = cheby_predictor();
    let boundary = ld(59001.0);
    let eps = ld(1e-9);

    let before = predictor.phase(boundary - eps, ld(1400.0)).unwrap();
    let at = predictor.phase(boundary, ld(1400.0)).unwrap();
    assert!(before.is_in_range() && at.is_in_range());
    assert_abs_diff_eq!(
        (at.value - before.value).to_f64(),
        CHEBY_F0 * 86_400.0 * 1e-9,
        epsilon = 1e-6
    );
}

#[test]
fn queries_outside_the_validity_use_the_nearest_segment() {
    let predictor = cheby_predictor();

    let late = predictor.phase(ld(59003.0), ld(1400.0)).unwrap();
    assert_eq!(late.status, RangeStatus::OutOfRange);
    assert!(!predictor.covers(ld(59003.0)));
    // Linear extrapolation of the last segment.
    assert_abs_diff_eq!(late.value.to_f64(), CHEBY_F0 * 86_400.0 * 3.0, epsilon = 1e-6);

    assert_eq!(
        Predictor::new().phase(ld(59000.0), ld(1400.0)).unwrap_err(),
        PredictorError::EmptyPredictor
    );
}

#[test]
fn keep_prunes_unused_segments() {
    let mut predictor = polyco_predictor();
    predictor.keep(&[ld(59000.55), ld(59000.56)]);
    assert_eq!(predictor.len(), 1);
    assert_abs_diff_eq!(predictor.start_mjd().unwrap().to_f64(), 59000.53125, epsilon = 1e-12);

    // Times outside every window keep the nearest segment.
    let mut predictor = cheby_predictor();
    predictor.keep(&[ld(58990.0)]);
    assert_eq!(predictor.len(), 1);
    assert_eq!(predictor.start_mjd(), Some(ld(59000.0)));

    predictor.keep(&[]);
    assert!(predictor.is_empty());
    assert_eq!(predictor.kind(), PredictorKind::Cheby);
}

#[test]
fn copies_are_independent() {
    let original = polyco_predictor();
    let mut copy = Predictor::new();
    copy.copy_from(&original);
    copy.keep(&[ld(59000.5)]);
    assert_eq!(original.len(), 2);
    assert_eq!(copy.len(), 1);

    copy.destroy();
    assert_eq!(copy.kind(), PredictorKind::None);
    assert_eq!(original.len(), 2);
}

#[test]
fn polyco_phase_includes_the_dispersion_delay() {
    let predictor = Predictor::from(T1PolycoSet::from_segments(vec![polyco(59000.5)]).unwrap());
    let at_obs = predictor.phase(ld(59000.5), ld(1410.0)).unwrap().value;
    let at_infinity = predictor.phase(ld(59000.5), ld(0.0)).unwrap().value;
    let lower = predictor.phase(ld(59000.5), ld(700.0)).unwrap().value;

    assert_abs_diff_eq!(at_obs.to_f64(), 0.0, epsilon = 1e-12);
    assert_abs_diff_eq!(at_infinity.to_f64(), 0.0, epsilon = 1e-12);
    // Lower frequencies arrive later, so fewer cycles have elapsed.
    let delay = (1.0 / (700.0 * 700.0) - 1.0 / (1410.0 * 1410.0)) * 71.0249 / 2.41e-4;
    assert_abs_diff_eq!(lower.to_f64(), -delay * 640.0, epsilon = 1e-9);
}

#[test]
fn adjacent_segments_agree_on_their_shared_boundary() {
    let Predictor::Cheby(set) = cheby_predictor() else {
        unreachable!()
    };
    let (first, second) = (&set.segments()[0], &set.segments()[1]);
    let boundary = ld(59001.0);
    let freq = ld(1400.0);
    assert_abs_diff_eq!(
        (first.phase(boundary, freq) - second.phase(boundary, freq)).to_f64(),
        0.0,
        epsilon = 1e-9
    );

    let before = Predictor::Cheby(set).phase(ld(58999.5), freq).unwrap();
    assert_eq!(before.status, RangeStatus::OutOfRange);
    assert_abs_diff_eq!(before.value.to_f64(), -CHEBY_F0 * 43_200.0, epsilon = 1e-6);
}
