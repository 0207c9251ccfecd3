//! Extended precision float: double-double arithmetic.
//!
//! The value is the unevaluated sum `head + tail` with `|tail| <= ulp(head) / 2`,
//! giving roughly 104 bits of mantissa while keeping f64's exponent range.
//! All operations are built on the error-free transforms `two_sum` and
//! `two_prod` (the latter via fused multiply-add).

use serde::{Deserialize, Serialize};

use crate::bigfloat::{BigFloat, MIN_ARBITRARY_BITS};
use crate::error::{NumericDegenerate, ParseError};

/// Usable mantissa bits of a double-double.
pub const EXTENDED_MANTISSA_BITS: usize = 104;

#[derive(Clone, Copy, Debug, Default, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct ExtFloat {
    /// Leading component, the nearest f64 to the full value
    pub head: f64,
    /// Rounding error of `head`
    pub tail: f64,
}

#[inline]
fn two_sum(a: f64, b: f64) -> (f64, f64) {
    let s = a + b;
    let bb = s - a;
    let e = (a - (s - bb)) + (b - bb);
    (s, e)
}

#[inline]
fn quick_two_sum(a: f64, b: f64) -> (f64, f64) {
    let s = a + b;
    let e = b - (s - a);
    (s, e)
}

#[inline]
fn two_prod(a: f64, b: f64) -> (f64, f64) {
    let p = a * b;
    let e = a.mul_add(b, -p);
    (p, e)
}

impl ExtFloat {
    pub const ZERO: Self = Self {
        head: 0.0,
        tail: 0.0,
    };

    #[inline]
    pub fn from_f64(val: f64) -> Self {
        Self {
            head: val,
            tail: 0.0,
        }
    }

    /// Renormalize, collapsing the tail when the head is not finite so that
    /// overflow propagates as a clean infinity instead of NaN.
    #[inline]
    fn renormalized(head: f64, tail: f64) -> Self {
        if !head.is_finite() {
            return Self { head, tail: 0.0 };
        }
        let (head, tail) = quick_two_sum(head, tail);
        Self { head, tail }
    }

    #[inline]
    pub fn to_f64(&self) -> f64 {
        self.head + self.tail
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.head == 0.0
    }

    #[inline]
    pub fn is_finite(&self) -> bool {
        self.head.is_finite() && self.tail.is_finite()
    }

    #[inline]
    pub fn neg(&self) -> Self {
        Self {
            head: -self.head,
            tail: -self.tail,
        }
    }

    #[inline]
    pub fn abs(&self) -> Self {
        if self.head < 0.0 {
            self.neg()
        } else {
            *self
        }
    }

    #[inline]
    pub fn add(&self, other: &Self) -> Self {
        let (s, e) = two_sum(self.head, other.head);
        if !s.is_finite() {
            return Self::from_f64(s);
        }
        let (t, f) = two_sum(self.tail, other.tail);
        let (s, e) = quick_two_sum(s, e + t);
        Self::renormalized(s, e + f)
    }

    #[inline]
    pub fn sub(&self, other: &Self) -> Self {
        self.add(&other.neg())
    }

    #[inline]
    pub fn mul(&self, other: &Self) -> Self {
        let (p, e) = two_prod(self.head, other.head);
        let e = e + (self.head * other.tail + self.tail * other.head);
        Self::renormalized(p, e)
    }

    /// Long division with three correction steps.
    pub fn div(&self, other: &Self) -> Result<Self, NumericDegenerate> {
        if other.is_zero() {
            return Err(NumericDegenerate::DivisionByZero);
        }
        let q1 = self.head / other.head;
        let r = self.sub(&other.mul(&Self::from_f64(q1)));
        let q2 = r.head / other.head;
        let r = r.sub(&other.mul(&Self::from_f64(q2)));
        let q3 = r.head / other.head;
        let (q1, q2) = quick_two_sum(q1, q2);
        Ok(Self::renormalized(q1, q2).add(&Self::from_f64(q3)))
    }

    /// Widen to an arbitrary-precision value. Exact for any width the
    /// arbitrary tier allows.
    pub fn to_bigfloat(&self, precision_bits: usize) -> Result<BigFloat, NumericDegenerate> {
        BigFloat::from_f64_sum(self.head, self.tail, precision_bits)
    }

    /// Nearest double-double to an arbitrary-precision value.
    pub fn from_bigfloat(val: &BigFloat) -> Self {
        let head = val.to_f64();
        if !head.is_finite() {
            return Self::from_f64(head);
        }
        let tail = match BigFloat::with_precision(head, val.precision_bits()) {
            Ok(h) => val.sub(&h).to_f64(),
            Err(_) => 0.0,
        };
        Self::renormalized(head, tail)
    }

    /// Parse decimal text without passing through f64.
    pub fn from_string(val: &str) -> Result<Self, ParseError> {
        let wide = BigFloat::from_string(val, MIN_ARBITRARY_BITS)?;
        Ok(Self::from_bigfloat(&wide))
    }
}

impl std::fmt::Display for ExtFloat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.to_bigfloat(MIN_ARBITRARY_BITS) {
            Ok(v) => write!(f, "{}", v),
            Err(_) => write!(f, "{}", self.head),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn addition_keeps_bits_f64_would_drop() {
        let one = ExtFloat::from_f64(1.0);
        let tiny = ExtFloat::from_f64(2f64.powi(-80));
        let sum = one.add(&tiny);
        assert_eq!(sum.head, 1.0);
        assert_eq!(sum.tail, 2f64.powi(-80));
        assert_eq!(sum.sub(&one).to_f64(), 2f64.powi(-80));
    }

    #[test]
    fn multiplication_captures_rounding_error() {
        let a = ExtFloat::from_f64(1.0 + 2f64.powi(-40));
        let sq = a.mul(&a);
        // (1 + 2^-40)^2 = 1 + 2^-39 + 2^-80
        let expected =
            ExtFloat::from_f64(1.0 + 2f64.powi(-39)).add(&ExtFloat::from_f64(2f64.powi(-80)));
        assert_eq!(sq, expected);
    }

    #[test]
    fn division_inverts_multiplication() {
        let a = ExtFloat::from_string("0.1").unwrap();
        let b = ExtFloat::from_string("3").unwrap();
        let q = a.div(&b).unwrap();
        let back = q.mul(&b);
        assert!((back.sub(&a)).to_f64().abs() < 1e-30);
    }

    #[test]
    fn division_by_zero_is_degenerate() {
        let a = ExtFloat::from_f64(1.0);
        assert_eq!(a.div(&ExtFloat::ZERO), Err(NumericDegenerate::DivisionByZero));
    }

    #[test]
    fn parse_keeps_more_than_f64() {
        let a = ExtFloat::from_string("0.1").unwrap();
        assert_eq!(a.head, 0.1);
        assert_ne!(a.tail, 0.0);
    }

    #[test]
    fn bigfloat_round_trip_is_exact() {
        let a = ExtFloat::from_string("-1.2345678901234567890123456789").unwrap();
        let wide = a.to_bigfloat(256).unwrap();
        assert_eq!(ExtFloat::from_bigfloat(&wide), a);
    }

    #[test]
    fn overflow_yields_infinity_not_nan() {
        let big = ExtFloat::from_f64(1e300);
        let sq = big.mul(&big);
        assert!(sq.head.is_infinite());
        assert!(!sq.is_finite());
        assert_eq!(sq.tail, 0.0);
    }
}
