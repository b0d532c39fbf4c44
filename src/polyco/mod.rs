//! TEMPO1-style polynomial predictors: a single Taylor-series segment
//! ([`t1_polyco`]) and the ordered set ([`t1_polyco_set`]).
pub mod t1_polyco;
pub mod t1_polyco_set;
