#![allow(dead_code)]

use approx::assert_abs_diff_eq;
use pulsar_predictor::{
    cheby::{cheby2d::Cheby2D, cheby_model::ChebyModel, cheby_model_set::ChebyModelSet},
    constants::SECONDS_PER_DAY,
    polyco::{t1_polyco::T1Polyco, t1_polyco_set::T1PolycoSet},
    Identifier, LongDouble, Predictor,
};

/// Spin frequency (Hz) of the synthetic Chebyshev pulsar. Exact in binary.
pub const CHEBY_F0: f64 = 173.6875;

/// Spin frequency (Hz) of the synthetic polyco pulsar.
pub const POLYCO_F0: f64 = 640.0;

pub fn ld(x: f64) -> LongDouble {
    LongDouble::from(x)
}

/// One-day Chebyshev segment with a phase linear in time, continuous with a
/// segment starting at `start - 1` built by the same helper.
///
/// `phase(mjd) = CHEBY_F0 · 86400 · (mjd - 59000) + dispersion / f²`
pub fn cheby_day(start: f64, dispersion: f64) -> ChebyModel {
    let half_span_s = SECONDS_PER_DAY / 2.0;
    let base = ld(CHEBY_F0) * ((start - 59000.0) * SECONDS_PER_DAY);
    let c0 = base + ld(CHEBY_F0) * half_span_s;
    let c1 = ld(CHEBY_F0) * half_span_s;
    let grid = Cheby2D::from_rows(&[
        vec![c0, ld(0.0), ld(0.0)],
        vec![c1, ld(0.0), ld(0.0)],
        vec![ld(0.0), ld(0.0), ld(0.0)],
    ])
    .unwrap();
    ChebyModel::new(
        Identifier::new("J0437-4715").unwrap(),
        Identifier::new("pks").unwrap(),
        (ld(start), ld(start + 1.0)),
        (ld(1200.0), ld(1600.0)),
        ld(dispersion),
        grid,
        None,
    )
    .unwrap()
}

/// Two contiguous Chebyshev segments covering MJD 59000 to 59002.
pub fn cheby_predictor() -> Predictor {
    let set = ChebyModelSet::from_segments(vec![cheby_day(59000.0, 0.0), cheby_day(59001.0, 0.0)])
        .unwrap();
    Predictor::from(set)
}

/// 90-minute polyco with constant spin frequency, phase-continuous with the
/// polyco centred 1/16 day earlier.
pub fn polyco(tmid: f64) -> T1Polyco {
    let minutes = (tmid - 59000.5) * 1440.0;
    T1Polyco::new(
        Identifier::new("B1937+21").unwrap(),
        Identifier::new("ao").unwrap(),
        ld(tmid),
        90,
        ld(POLYCO_F0) * (minutes * 60.0),
        ld(POLYCO_F0),
        vec![],
    )
    .unwrap()
    .with_dispersion(71.0249, 1410.0)
}

/// Two contiguous polycos covering MJD 59000.46875 to 59000.59375.
pub fn polyco_predictor() -> Predictor {
    let set = T1PolycoSet::from_segments(vec![polyco(59000.5), polyco(59000.5625)]).unwrap();
    Predictor::from(set)
}

/// Compare two predictors by sampling phase and frequency over their span.
pub fn assert_predictors_close(a: &Predictor, b: &Predictor, freq: f64, epsilon: f64) {
    assert_eq!(a.kind(), b.kind());
    assert_eq!(a.len(), b.len());
    assert_eq!(a.psr_name(), b.psr_name());
    assert_eq!(a.site_name(), b.site_name());

    let start = a.start_mjd().unwrap();
    let span = a.end_mjd().unwrap() - start;
    for i in 0..=16 {
        let mjd = start + span * (i as f64 / 16.0);
        let (pa, pb) = (
            a.phase(mjd, ld(freq)).unwrap(),
            b.phase(mjd, ld(freq)).unwrap(),
        );
        assert_eq!(pa.status, pb.status);
        assert_abs_diff_eq!((pa.value - pb.value).to_f64(), 0.0, epsilon = epsilon);

        let (fa, fb) = (
            a.frequency(mjd, ld(freq)).unwrap(),
            b.frequency(mjd, ld(freq)).unwrap(),
        );
        assert_abs_diff_eq!((fa.value - fb.value).to_f64(), 0.0, epsilon = epsilon);
    }
}
