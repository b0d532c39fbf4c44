//! Chebyshev predictive models: the bivariate series ([`cheby2d`]), a single
//! time/frequency segment ([`cheby_model`]) and the ordered segment set
//! ([`cheby_model_set`]).
pub mod cheby2d;
pub mod cheby_model;
pub mod cheby_model_set;
