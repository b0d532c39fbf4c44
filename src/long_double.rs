//! # Extended-precision scalar
//!
//! [`LongDouble`] is a *double-double* floating value: an unevaluated sum
//! `hi + lo` of two `f64` with `|lo| <= ulp(hi) / 2`. It carries roughly
//! 106 bits of mantissa (≈ 32 significant decimal digits), which is enough to
//! hold an MJD together with a sub-nanosecond fraction, or a pulse count of
//! 10¹² cycles together with a micro-cycle fraction.
//!
//! ## Overview
//!
//! * Error-free transformations (`two_sum`, `two_prod`) are the building blocks
//!   of every operator. `two_prod` relies on [`f64::mul_add`].
//! * Arithmetic operators are implemented for `LongDouble ⊕ LongDouble`,
//!   `LongDouble ⊕ f64` and `f64 ⊕ LongDouble`.
//! * Decimal text conversion ([`std::fmt::Display`] / [`std::str::FromStr`]) is
//!   exact to ~1e-30 relative, so values survive a write/read cycle.
//!
//! ## Example
//!
//! ```rust
//! use pulsar_predictor::long_double::LongDouble;
//!
//! let mjd: LongDouble = "59000.123456789012345678901".parse().unwrap();
//! let day = mjd.floor();
//! let frac = mjd - day;
//! assert_eq!(day, LongDouble::from(59000.0));
//! assert!((frac.to_f64() - 0.123456789012345678901).abs() < 1e-16);
//! ```
//!
//! ## See also
//! ------------
//! * Dekker (1971), *A floating-point technique for extending the available precision*.
//! * Hida, Li & Bailey, *QD library* – algorithms used for `*` and `/`.
use std::{
    cmp::Ordering,
    fmt,
    iter::Sum,
    ops::{Add, AddAssign, Div, DivAssign, Mul, MulAssign, Neg, Sub, SubAssign},
    str::FromStr,
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of significant decimal digits produced by the default formatter.
pub const SIGNIFICANT_DIGITS: usize = 31;

/// Mantissa digits kept when parsing; later digits are below double-double precision.
const MAX_PARSED_DIGITS: usize = 36;

/// Largest decimal exponent magnitude a literal may carry after mantissa scaling.
const MAX_DECIMAL_SCALE: i64 = 400;

/// Largest power of ten applied in one scaling step (finite in `f64`).
const POW10_STEP: i32 = 256;

/// Below this magnitude the `lo` word can no longer hold a full correction.
const MIN_NORMAL_DOUBLE_DOUBLE: f64 = 1e-290;

/// Extended-precision floating value stored as `hi + lo`.
#[derive(Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LongDouble {
    hi: f64,
    lo: f64,
}

/// Failure to decode a decimal literal into a [`LongDouble`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid extended-precision literal: {0:?}")]
pub struct ParseLongDoubleError(pub String);

#[inline]
fn two_sum(a: f64, b: f64) -> (f64, f64) {
    let s = a + b;
    let bb = s - a;
    let err = (a - (s - bb)) + (b - bb);
    (s, err)
}

#[inline]
fn quick_two_sum(a: f64, b: f64) -> (f64, f64) {
    let s = a + b;
    let err = b - (s - a);
    (s, err)
}

#[inline]
fn two_prod(a: f64, b: f64) -> (f64, f64) {
    let p = a * b;
    let err = a.mul_add(b, -p);
    (p, err)
}

impl LongDouble {
    pub const ZERO: LongDouble = LongDouble { hi: 0.0, lo: 0.0 };
    pub const ONE: LongDouble = LongDouble { hi: 1.0, lo: 0.0 };

    /// Build a value from two components, renormalizing them.
    pub fn new(hi: f64, lo: f64) -> Self {
        let (hi, lo) = two_sum(hi, lo);
        LongDouble { hi, lo }
    }

    /// Leading component.
    pub fn hi(&self) -> f64 {
        self.hi
    }

    /// Trailing (correction) component.
    pub fn lo(&self) -> f64 {
        self.lo
    }

    /// Round to the nearest `f64`.
    pub fn to_f64(self) -> f64 {
        self.hi + self.lo
    }

    pub fn is_finite(&self) -> bool {
        self.hi.is_finite() && self.lo.is_finite()
    }

    pub fn is_zero(&self) -> bool {
        self.hi == 0.0
    }

    pub fn is_sign_negative(&self) -> bool {
        self.hi < 0.0 || (self.hi == 0.0 && self.lo < 0.0)
    }

    pub fn abs(self) -> Self {
        if self.is_sign_negative() {
            -self
        } else {
            self
        }
    }

    /// Largest integer value not greater than `self`.
    pub fn floor(self) -> Self {
        let hi = self.hi.floor();
        if hi == self.hi {
            // `hi` already integral: the fractional part lives in `lo`.
            let (hi, lo) = quick_two_sum(hi, self.lo.floor());
            LongDouble { hi, lo }
        } else {
            LongDouble { hi, lo: 0.0 }
        }
    }

    /// Smallest integer value not less than `self`.
    pub fn ceil(self) -> Self {
        -(-self).floor()
    }

    /// Integer part, rounding toward zero.
    pub fn trunc(self) -> Self {
        if self.is_sign_negative() {
            self.ceil()
        } else {
            self.floor()
        }
    }

    /// Nearest integer, halves rounded away from zero.
    pub fn round(self) -> Self {
        if self.is_sign_negative() {
            -((-self) + 0.5).floor()
        } else {
            (self + 0.5).floor()
        }
    }

    /// Fractional part `self - floor(self)`, always in `[0, 1)`.
    pub fn fract(self) -> Self {
        self - self.floor()
    }

    /// Integer power by binary exponentiation.
    pub fn powi(self, n: i32) -> Self {
        if n == 0 {
            return LongDouble::ONE;
        }
        let mut base = self;
        let mut exp = n.unsigned_abs();
        let mut acc = LongDouble::ONE;
        while exp > 0 {
            if exp & 1 == 1 {
                acc *= base;
            }
            base *= base;
            exp >>= 1;
        }
        if n < 0 {
            LongDouble::ONE / acc
        } else {
            acc
        }
    }

    /// Multiply by `10^n`, in steps that keep every power of ten finite.
    pub fn scale_pow10(self, n: i32) -> Self {
        let ten = LongDouble::from(10.0);
        let mut value = self;
        let mut remaining = n;
        while remaining > 0 {
            let step = remaining.min(POW10_STEP);
            value *= ten.powi(step);
            remaining -= step;
        }
        while remaining < 0 {
            let step = remaining.max(-POW10_STEP);
            value /= ten.powi(-step);
            remaining -= step;
        }
        value
    }

    pub fn min(self, other: Self) -> Self {
        if other < self {
            other
        } else {
            self
        }
    }

    pub fn max(self, other: Self) -> Self {
        if other > self {
            other
        } else {
            self
        }
    }

    /// Render with `digits` significant decimal digits in scientific notation.
    ///
    /// Trailing zeros of the mantissa are kept, so the output width is fixed
    /// for a given `digits`.
    ///
    /// Arguments
    /// -----------------
    /// * `digits`: Number of significant digits, at least 1.
    ///
    /// Return
    /// ----------
    /// * A string such as `"5.9000500000e4"`.
    pub fn to_scientific(self, digits: usize) -> String {
        let digits = digits.max(1);
        if !self.is_finite() {
            return format!("{}", self.hi);
        }
        if self.is_zero() {
            return format!("{:.*}e0", digits - 1, 0.0);
        }

        let negative = self.is_sign_negative();
        let mut value = self.abs();

        let mut exponent = value.hi.log10().floor() as i32;
        value = value.scale_pow10(-exponent);
        // log10 of `hi` can be off by one close to a power of ten.
        if value >= LongDouble::from(10.0) {
            value /= 10.0;
            exponent += 1;
        } else if value < LongDouble::ONE {
            value *= 10.0;
            exponent -= 1;
        }

        // One guard digit for rounding.
        let mut mantissa: Vec<u8> = Vec::with_capacity(digits + 1);
        for _ in 0..=digits {
            let digit = value.floor().to_f64().clamp(0.0, 9.0);
            mantissa.push(digit as u8);
            value = (value - digit) * 10.0;
        }

        let guard = mantissa.pop().unwrap_or(0);
        if guard >= 5 {
            let mut carry = true;
            for d in mantissa.iter_mut().rev() {
                if !carry {
                    break;
                }
                if *d == 9 {
                    *d = 0;
                } else {
                    *d += 1;
                    carry = false;
                }
            }
            if carry {
                mantissa.insert(0, 1);
                mantissa.pop();
                exponent += 1;
            }
        }

        let mut out = String::with_capacity(digits + 8);
        if negative {
            out.push('-');
        }
        out.push(char::from(b'0' + mantissa[0]));
        if mantissa.len() > 1 {
            out.push('.');
            out.extend(mantissa[1..].iter().map(|d| char::from(b'0' + d)));
        }
        out.push('e');
        out.push_str(&exponent.to_string());
        out
    }
}

impl From<f64> for LongDouble {
    fn from(value: f64) -> Self {
        LongDouble { hi: value, lo: 0.0 }
    }
}

impl From<f32> for LongDouble {
    fn from(value: f32) -> Self {
        LongDouble::from(f64::from(value))
    }
}

impl From<i32> for LongDouble {
    fn from(value: i32) -> Self {
        LongDouble::from(f64::from(value))
    }
}

impl From<u32> for LongDouble {
    fn from(value: u32) -> Self {
        LongDouble::from(f64::from(value))
    }
}

impl From<i64> for LongDouble {
    fn from(value: i64) -> Self {
        let hi = value as f64;
        // `hi` may have lost the low bits of a 64-bit integer.
        let lo = (value - hi as i64) as f64;
        LongDouble::new(hi, lo)
    }
}

impl From<usize> for LongDouble {
    fn from(value: usize) -> Self {
        LongDouble::from(value as i64)
    }
}

impl From<LongDouble> for f64 {
    fn from(value: LongDouble) -> Self {
        value.to_f64()
    }
}

impl PartialOrd for LongDouble {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match self.hi.partial_cmp(&other.hi)? {
            Ordering::Equal => self.lo.partial_cmp(&other.lo),
            ord => Some(ord),
        }
    }
}

impl PartialEq<f64> for LongDouble {
    fn eq(&self, other: &f64) -> bool {
        *self == LongDouble::from(*other)
    }
}

impl PartialOrd<f64> for LongDouble {
    fn partial_cmp(&self, other: &f64) -> Option<Ordering> {
        self.partial_cmp(&LongDouble::from(*other))
    }
}

impl Neg for LongDouble {
    type Output = Self;

    fn neg(self) -> Self::Output {
        LongDouble {
            hi: -self.hi,
            lo: -self.lo,
        }
    }
}

impl Add for LongDouble {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        let (s, e) = two_sum(self.hi, rhs.hi);
        let (t, f) = two_sum(self.lo, rhs.lo);
        let (s, e) = quick_two_sum(s, e + t);
        let (hi, lo) = quick_two_sum(s, e + f);
        LongDouble { hi, lo }
    }
}

impl Sub for LongDouble {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        self + (-rhs)
    }
}

impl Mul for LongDouble {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self::Output {
        let (p, e) = two_prod(self.hi, rhs.hi);
        let e = e + (self.hi * rhs.lo + self.lo * rhs.hi);
        let (hi, lo) = quick_two_sum(p, e);
        LongDouble { hi, lo }
    }
}

impl Div for LongDouble {
    type Output = Self;

    fn div(self, rhs: Self) -> Self::Output {
        // Long division: three quotient digits, each refining the remainder.
        let q1 = self.hi / rhs.hi;
        let r = self - rhs * q1;
        let q2 = r.hi / rhs.hi;
        let r = r - rhs * q2;
        let q3 = r.hi / rhs.hi;
        let (hi, lo) = quick_two_sum(q1, q2);
        LongDouble { hi, lo } + q3
    }
}

macro_rules! impl_f64_ops {
    ($($trait:ident, $method:ident, $assign_trait:ident, $assign_method:ident);* $(;)?) => {
        $(
            impl $trait<f64> for LongDouble {
                type Output = LongDouble;

                fn $method(self, rhs: f64) -> Self::Output {
                    $trait::$method(self, LongDouble::from(rhs))
                }
            }

            impl $trait<LongDouble> for f64 {
                type Output = LongDouble;

                fn $method(self, rhs: LongDouble) -> Self::Output {
                    $trait::$method(LongDouble::from(self), rhs)
                }
            }

            impl $assign_trait for LongDouble {
                fn $assign_method(&mut self, rhs: LongDouble) {
                    *self = $trait::$method(*self, rhs);
                }
            }

            impl $assign_trait<f64> for LongDouble {
                fn $assign_method(&mut self, rhs: f64) {
                    *self = $trait::$method(*self, LongDouble::from(rhs));
                }
            }
        )*
    };
}

impl_f64_ops! {
    Add, add, AddAssign, add_assign;
    Sub, sub, SubAssign, sub_assign;
    Mul, mul, MulAssign, mul_assign;
    Div, div, DivAssign, div_assign;
}

impl Sum for LongDouble {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(LongDouble::ZERO, |acc, x| acc + x)
    }
}

impl<'a> Sum<&'a LongDouble> for LongDouble {
    fn sum<I: Iterator<Item = &'a LongDouble>>(iter: I) -> Self {
        iter.fold(LongDouble::ZERO, |acc, x| acc + *x)
    }
}

impl fmt::Debug for LongDouble {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LongDouble({})", self)
    }
}

impl fmt::Display for LongDouble {
    /// Scientific notation. `{:.N}` gives `N + 1` significant digits with
    /// trailing zeros kept; the default prints 31 digits and trims zeros.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match f.precision() {
            Some(precision) => f.write_str(&self.to_scientific(precision + 1)),
            None => {
                let full = self.to_scientific(SIGNIFICANT_DIGITS);
                match full.split_once('e') {
                    Some((mantissa, exponent)) if mantissa.contains('.') => {
                        let mantissa = mantissa.trim_end_matches('0').trim_end_matches('.');
                        write!(f, "{mantissa}e{exponent}")
                    }
                    _ => f.write_str(&full),
                }
            }
        }
    }
}

impl FromStr for LongDouble {
    type Err = ParseLongDoubleError;

    /// Parse a decimal literal such as `-1.25`, `5.9e4`, `1.0D-05` or `inf`.
    ///
    /// Fortran `D` exponents are accepted because legacy polyco files use them.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseLongDoubleError(s.to_string());
        let text = s.trim();
        if text.is_empty() {
            return Err(err());
        }

        let lowered = text.to_ascii_lowercase();
        let unsigned = lowered.trim_start_matches(['+', '-']);
        if matches!(unsigned, "inf" | "infinity" | "nan") {
            return text.parse::<f64>().map(LongDouble::from).map_err(|_| err());
        }

        let (negative, body) = match text.as_bytes()[0] {
            b'-' => (true, &text[1..]),
            b'+' => (false, &text[1..]),
            _ => (false, text),
        };

        let (mantissa, exponent) = match body.find(['e', 'E', 'd', 'D']) {
            Some(pos) => {
                let exp = body[pos + 1..].parse::<i32>().map_err(|_| err())?;
                (&body[..pos], exp)
            }
            None => (body, 0),
        };

        let mut value = LongDouble::ZERO;
        let mut significant: usize = 0;
        // Decimal exponent contributed by the mantissa digits.
        let mut digit_scale: i64 = 0;
        let mut seen_point = false;
        let mut seen_digit = false;
        for c in mantissa.chars() {
            match c {
                '0'..='9' => {
                    seen_digit = true;
                    let digit = f64::from(c as u8 - b'0');
                    if significant < MAX_PARSED_DIGITS {
                        value = value * 10.0 + digit;
                        if !value.is_zero() {
                            significant += 1;
                        }
                        if seen_point {
                            digit_scale -= 1;
                        }
                    } else if !seen_point {
                        digit_scale += 1;
                    }
                }
                '.' if !seen_point => seen_point = true,
                _ => return Err(err()),
            }
        }
        if !seen_digit {
            return Err(err());
        }
        if value.is_zero() {
            return Ok(LongDouble::ZERO);
        }

        let scale = i64::from(exponent) + digit_scale;
        if !(-MAX_DECIMAL_SCALE..=MAX_DECIMAL_SCALE).contains(&scale) {
            return Err(err());
        }
        value = value.scale_pow10(scale as i32);
        if value.hi.abs() < MIN_NORMAL_DOUBLE_DOUBLE {
            // The trailing word underflows first; f64 parsing rounds correctly there.
            let normalized = text.replace(['d', 'D'], "e");
            return normalized.parse::<f64>().map(LongDouble::from).map_err(|_| err());
        }
        if !value.is_finite() {
            return Err(err());
        }

        Ok(if negative { -value } else { value })
    }
}
