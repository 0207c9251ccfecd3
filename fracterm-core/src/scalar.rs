//! Tiered real numbers.
//!
//! [`PrecisionTier`] names a representation, [`Real`] is the arithmetic the
//! evaluator is generic over, and [`Scalar`] is the tagged union the viewport
//! stores so a coordinate can move between tiers at runtime.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::bigfloat::{BigFloat, MIN_ARBITRARY_BITS};
use crate::error::{NumericDegenerate, ParseError};
use crate::extfloat::{ExtFloat, EXTENDED_MANTISSA_BITS};

/// Mantissa bits of an IEEE-754 double.
pub const NATIVE_MANTISSA_BITS: usize = 53;

/// Numeric representation, ordered by capacity.
///
/// Arbitrary widths below [`MIN_ARBITRARY_BITS`] are widened when a tier is
/// deserialized, so equal capacity always means the same tier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "TierRepr")]
pub enum PrecisionTier {
    Native,
    Extended,
    Arbitrary { bits: usize },
}

#[derive(Deserialize)]
enum TierRepr {
    Native,
    Extended,
    Arbitrary { bits: usize },
}

impl From<TierRepr> for PrecisionTier {
    fn from(repr: TierRepr) -> Self {
        match repr {
            TierRepr::Native => PrecisionTier::Native,
            TierRepr::Extended => PrecisionTier::Extended,
            TierRepr::Arbitrary { bits } => PrecisionTier::arbitrary(bits),
        }
    }
}

impl PrecisionTier {
    /// Arbitrary tier of at least `bits`, never narrower than the minimum width.
    pub fn arbitrary(bits: usize) -> Self {
        PrecisionTier::Arbitrary {
            bits: bits.max(MIN_ARBITRARY_BITS),
        }
    }

    pub fn mantissa_bits(&self) -> usize {
        match self {
            PrecisionTier::Native => NATIVE_MANTISSA_BITS,
            PrecisionTier::Extended => EXTENDED_MANTISSA_BITS,
            PrecisionTier::Arbitrary { bits } => *bits,
        }
    }

    /// Equivalent count of significant decimal digits.
    pub fn decimal_digits(&self) -> usize {
        (self.mantissa_bits() as f64 * std::f64::consts::LOG10_2).floor() as usize
    }

    /// One unit in the last place for a value of the given magnitude.
    pub fn ulp(&self, magnitude: f64) -> f64 {
        let magnitude = magnitude.abs();
        if magnitude == 0.0 || !magnitude.is_finite() {
            return f64::MIN_POSITIVE;
        }
        let (_, exp) = libm::frexp(magnitude);
        libm::ldexp(1.0, exp - self.mantissa_bits() as i32).max(f64::MIN_POSITIVE)
    }

    /// Coarse class index: 0 native, 1 extended, 2 arbitrary.
    pub fn class(&self) -> u8 {
        match self {
            PrecisionTier::Native => 0,
            PrecisionTier::Extended => 1,
            PrecisionTier::Arbitrary { .. } => 2,
        }
    }
}

impl Ord for PrecisionTier {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.mantissa_bits(), self.class()).cmp(&(other.mantissa_bits(), other.class()))
    }
}

impl PartialOrd for PrecisionTier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for PrecisionTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrecisionTier::Native => write!(f, "native"),
            PrecisionTier::Extended => write!(f, "extended"),
            PrecisionTier::Arbitrary { bits } => {
                write!(f, "arbitrary({} bits, ~{} digits)", bits, self.decimal_digits())
            }
        }
    }
}

/// Arithmetic shared by every tier's concrete number type.
///
/// Escape-time iteration is written once against this trait and
/// monomorphized per tier.
pub trait Real: Clone + PartialEq + PartialOrd + fmt::Debug + Send + Sync + 'static {
    /// Construct from f64 at the given mantissa width (ignored by fixed-width types).
    fn from_f64_at(val: f64, precision_bits: usize) -> Result<Self, NumericDegenerate>;

    fn precision_bits(&self) -> usize;

    fn add(&self, other: &Self) -> Self;
    fn sub(&self, other: &Self) -> Self;
    fn mul(&self, other: &Self) -> Self;
    fn div(&self, other: &Self) -> Result<Self, NumericDegenerate>;
    fn abs(&self) -> Self;

    fn to_f64(&self) -> f64;
    fn is_zero(&self) -> bool;
    fn is_finite(&self) -> bool;

    /// True when a non-zero product collapsed to zero or a subnormal.
    fn underflowed(&self) -> bool;

    fn compare(&self, other: &Self) -> Option<Ordering> {
        self.partial_cmp(other)
    }

    /// Multiply, reporting underflow of non-zero operands.
    fn checked_mul(&self, other: &Self) -> Result<Self, NumericDegenerate> {
        let product = self.mul(other);
        if !self.is_zero() && !other.is_zero() && product.underflowed() {
            return Err(NumericDegenerate::Underflow);
        }
        if !product.is_finite() {
            return Err(NumericDegenerate::NonFinite);
        }
        Ok(product)
    }

    /// Add an f64 offset expressed at this value's width.
    fn add_f64(&self, offset: f64) -> Result<Self, NumericDegenerate> {
        let offset = Self::from_f64_at(offset, self.precision_bits())?;
        Ok(self.add(&offset))
    }
}

impl Real for f64 {
    #[inline]
    fn from_f64_at(val: f64, _precision_bits: usize) -> Result<Self, NumericDegenerate> {
        if val.is_finite() {
            Ok(val)
        } else {
            Err(NumericDegenerate::NonFinite)
        }
    }

    #[inline]
    fn precision_bits(&self) -> usize {
        NATIVE_MANTISSA_BITS
    }

    #[inline]
    fn add(&self, other: &Self) -> Self {
        self + other
    }

    #[inline]
    fn sub(&self, other: &Self) -> Self {
        self - other
    }

    #[inline]
    fn mul(&self, other: &Self) -> Self {
        self * other
    }

    #[inline]
    fn div(&self, other: &Self) -> Result<Self, NumericDegenerate> {
        if *other == 0.0 {
            return Err(NumericDegenerate::DivisionByZero);
        }
        Ok(self / other)
    }

    #[inline]
    fn abs(&self) -> Self {
        f64::abs(*self)
    }

    #[inline]
    fn to_f64(&self) -> f64 {
        *self
    }

    #[inline]
    fn is_zero(&self) -> bool {
        *self == 0.0
    }

    #[inline]
    fn is_finite(&self) -> bool {
        f64::is_finite(*self)
    }

    #[inline]
    fn underflowed(&self) -> bool {
        *self == 0.0 || self.is_subnormal()
    }
}

impl Real for ExtFloat {
    #[inline]
    fn from_f64_at(val: f64, _precision_bits: usize) -> Result<Self, NumericDegenerate> {
        if val.is_finite() {
            Ok(ExtFloat::from_f64(val))
        } else {
            Err(NumericDegenerate::NonFinite)
        }
    }

    #[inline]
    fn precision_bits(&self) -> usize {
        EXTENDED_MANTISSA_BITS
    }

    #[inline]
    fn add(&self, other: &Self) -> Self {
        ExtFloat::add(self, other)
    }

    #[inline]
    fn sub(&self, other: &Self) -> Self {
        ExtFloat::sub(self, other)
    }

    #[inline]
    fn mul(&self, other: &Self) -> Self {
        ExtFloat::mul(self, other)
    }

    fn div(&self, other: &Self) -> Result<Self, NumericDegenerate> {
        ExtFloat::div(self, other)
    }

    #[inline]
    fn abs(&self) -> Self {
        ExtFloat::abs(self)
    }

    #[inline]
    fn to_f64(&self) -> f64 {
        ExtFloat::to_f64(self)
    }

    #[inline]
    fn is_zero(&self) -> bool {
        ExtFloat::is_zero(self)
    }

    #[inline]
    fn is_finite(&self) -> bool {
        ExtFloat::is_finite(self)
    }

    #[inline]
    fn underflowed(&self) -> bool {
        self.head == 0.0 || self.head.is_subnormal()
    }
}

impl Real for BigFloat {
    fn from_f64_at(val: f64, precision_bits: usize) -> Result<Self, NumericDegenerate> {
        BigFloat::with_precision(val, precision_bits)
    }

    fn precision_bits(&self) -> usize {
        BigFloat::precision_bits(self)
    }

    fn add(&self, other: &Self) -> Self {
        BigFloat::add(self, other)
    }

    fn sub(&self, other: &Self) -> Self {
        BigFloat::sub(self, other)
    }

    fn mul(&self, other: &Self) -> Self {
        BigFloat::mul(self, other)
    }

    fn div(&self, other: &Self) -> Result<Self, NumericDegenerate> {
        BigFloat::div(self, other)
    }

    fn abs(&self) -> Self {
        BigFloat::abs(self)
    }

    fn to_f64(&self) -> f64 {
        BigFloat::to_f64(self)
    }

    fn is_zero(&self) -> bool {
        BigFloat::is_zero(self)
    }

    fn is_finite(&self) -> bool {
        true
    }

    // Binary exponents are unbounded.
    fn underflowed(&self) -> bool {
        BigFloat::is_zero(self)
    }
}

/// A real number at one of the three precision tiers.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum Scalar {
    Native(f64),
    Extended(ExtFloat),
    Arbitrary(BigFloat),
}

impl Scalar {
    pub fn from_f64(val: f64, tier: PrecisionTier) -> Result<Self, NumericDegenerate> {
        if !val.is_finite() {
            return Err(NumericDegenerate::NonFinite);
        }
        Ok(match tier {
            PrecisionTier::Native => Scalar::Native(val),
            PrecisionTier::Extended => Scalar::Extended(ExtFloat::from_f64(val)),
            PrecisionTier::Arbitrary { bits } => {
                Scalar::Arbitrary(BigFloat::with_precision(val, bits)?)
            }
        })
    }

    /// Parse decimal text at the requested tier. Extended and arbitrary
    /// values never pass through f64.
    pub fn from_string(val: &str, tier: PrecisionTier) -> Result<Self, ParseError> {
        match tier {
            PrecisionTier::Native => {
                let parsed = val.trim().parse::<f64>().map_err(|e| ParseError {
                    input: val.to_string(),
                    reason: e.to_string(),
                })?;
                if !parsed.is_finite() {
                    return Err(ParseError {
                        input: val.to_string(),
                        reason: "value is not finite".to_string(),
                    });
                }
                Ok(Scalar::Native(parsed))
            }
            PrecisionTier::Extended => Ok(Scalar::Extended(ExtFloat::from_string(val)?)),
            PrecisionTier::Arbitrary { bits } => {
                Ok(Scalar::Arbitrary(BigFloat::from_string(val, bits)?))
            }
        }
    }

    pub fn tier(&self) -> PrecisionTier {
        match self {
            Scalar::Native(_) => PrecisionTier::Native,
            Scalar::Extended(_) => PrecisionTier::Extended,
            Scalar::Arbitrary(v) => PrecisionTier::Arbitrary {
                bits: v.precision_bits(),
            },
        }
    }

    /// Re-express at another tier. Upgrades are exact; downgrades round to
    /// nearest (ties to even).
    pub fn to_tier(&self, tier: PrecisionTier) -> Result<Scalar, NumericDegenerate> {
        let converted = match (self, tier) {
            (Scalar::Native(v), PrecisionTier::Native) => Scalar::Native(*v),
            (Scalar::Native(v), PrecisionTier::Extended) => Scalar::Extended(ExtFloat::from_f64(*v)),
            (Scalar::Native(v), PrecisionTier::Arbitrary { bits }) => {
                Scalar::Arbitrary(BigFloat::with_precision(*v, bits)?)
            }
            (Scalar::Extended(v), PrecisionTier::Native) => Scalar::Native(v.to_f64()),
            (Scalar::Extended(v), PrecisionTier::Extended) => Scalar::Extended(*v),
            (Scalar::Extended(v), PrecisionTier::Arbitrary { bits }) => {
                Scalar::Arbitrary(v.to_bigfloat(bits)?)
            }
            (Scalar::Arbitrary(v), PrecisionTier::Native) => Scalar::Native(v.to_f64()),
            (Scalar::Arbitrary(v), PrecisionTier::Extended) => {
                Scalar::Extended(ExtFloat::from_bigfloat(v))
            }
            (Scalar::Arbitrary(v), PrecisionTier::Arbitrary { bits }) => {
                Scalar::Arbitrary(v.with_width(bits))
            }
        };
        converted.finite()
    }

    fn finite(self) -> Result<Scalar, NumericDegenerate> {
        let ok = match &self {
            Scalar::Native(v) => v.is_finite(),
            Scalar::Extended(v) => v.is_finite(),
            Scalar::Arbitrary(_) => true,
        };
        if ok {
            Ok(self)
        } else {
            Err(NumericDegenerate::NonFinite)
        }
    }

    /// Bring both operands to the wider of their two tiers.
    fn promoted(&self, other: &Scalar) -> Result<(Scalar, Scalar), NumericDegenerate> {
        let tier = self.tier().max(other.tier());
        Ok((self.to_tier(tier)?, other.to_tier(tier)?))
    }

    pub fn add(&self, other: &Scalar) -> Result<Scalar, NumericDegenerate> {
        match (self, other) {
            (Scalar::Native(a), Scalar::Native(b)) => Scalar::Native(a + b).finite(),
            (Scalar::Extended(a), Scalar::Extended(b)) => Scalar::Extended(a.add(b)).finite(),
            (Scalar::Arbitrary(a), Scalar::Arbitrary(b)) => Ok(Scalar::Arbitrary(a.add(b))),
            _ => {
                let (a, b) = self.promoted(other)?;
                a.add(&b)
            }
        }
    }

    pub fn sub(&self, other: &Scalar) -> Result<Scalar, NumericDegenerate> {
        match (self, other) {
            (Scalar::Native(a), Scalar::Native(b)) => Scalar::Native(a - b).finite(),
            (Scalar::Extended(a), Scalar::Extended(b)) => Scalar::Extended(a.sub(b)).finite(),
            (Scalar::Arbitrary(a), Scalar::Arbitrary(b)) => Ok(Scalar::Arbitrary(a.sub(b))),
            _ => {
                let (a, b) = self.promoted(other)?;
                a.sub(&b)
            }
        }
    }

    pub fn mul(&self, other: &Scalar) -> Result<Scalar, NumericDegenerate> {
        match (self, other) {
            (Scalar::Native(a), Scalar::Native(b)) => a.checked_mul(b).map(Scalar::Native),
            (Scalar::Extended(a), Scalar::Extended(b)) => a.checked_mul(b).map(Scalar::Extended),
            (Scalar::Arbitrary(a), Scalar::Arbitrary(b)) => a.checked_mul(b).map(Scalar::Arbitrary),
            _ => {
                let (a, b) = self.promoted(other)?;
                a.mul(&b)
            }
        }
    }

    pub fn div(&self, other: &Scalar) -> Result<Scalar, NumericDegenerate> {
        let quotient = match (self, other) {
            (Scalar::Native(a), Scalar::Native(b)) => Scalar::Native(Real::div(a, b)?),
            (Scalar::Extended(a), Scalar::Extended(b)) => Scalar::Extended(a.div(b)?),
            (Scalar::Arbitrary(a), Scalar::Arbitrary(b)) => Scalar::Arbitrary(a.div(b)?),
            _ => {
                let (a, b) = self.promoted(other)?;
                return a.div(&b);
            }
        };
        if !self.is_zero() && quotient.is_zero() {
            return Err(NumericDegenerate::Underflow);
        }
        quotient.finite()
    }

    pub fn compare(&self, other: &Scalar) -> Option<Ordering> {
        match (self, other) {
            (Scalar::Native(a), Scalar::Native(b)) => a.partial_cmp(b),
            (Scalar::Extended(a), Scalar::Extended(b)) => a.partial_cmp(b),
            (Scalar::Arbitrary(a), Scalar::Arbitrary(b)) => a.partial_cmp(b),
            _ => {
                let (a, b) = self.promoted(other).ok()?;
                a.compare(&b)
            }
        }
    }

    pub fn to_f64(&self) -> f64 {
        match self {
            Scalar::Native(v) => *v,
            Scalar::Extended(v) => v.to_f64(),
            Scalar::Arbitrary(v) => v.to_f64(),
        }
    }

    pub fn is_zero(&self) -> bool {
        match self {
            Scalar::Native(v) => *v == 0.0,
            Scalar::Extended(v) => v.is_zero(),
            Scalar::Arbitrary(v) => v.is_zero(),
        }
    }

    /// Add an f64 offset in this value's own arithmetic.
    pub fn add_f64(&self, offset: f64) -> Result<Scalar, NumericDegenerate> {
        match self {
            Scalar::Native(v) => Real::add_f64(v, offset).map(Scalar::Native)?.finite(),
            Scalar::Extended(v) => Real::add_f64(v, offset).map(Scalar::Extended)?.finite(),
            Scalar::Arbitrary(v) => Real::add_f64(v, offset).map(Scalar::Arbitrary),
        }
    }
}

impl PartialEq for Scalar {
    fn eq(&self, other: &Self) -> bool {
        self.compare(other) == Some(Ordering::Equal)
    }
}

impl PartialOrd for Scalar {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.compare(other)
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Native(v) => write!(f, "{}", v),
            Scalar::Extended(v) => write!(f, "{}", v),
            Scalar::Arbitrary(v) => write!(f, "{}", v),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tiers_order_by_capacity() {
        assert!(PrecisionTier::Native < PrecisionTier::Extended);
        assert!(PrecisionTier::Extended < PrecisionTier::arbitrary(128));
        assert!(PrecisionTier::arbitrary(128) < PrecisionTier::arbitrary(256));
        assert_eq!(PrecisionTier::arbitrary(16), PrecisionTier::arbitrary(128));
    }

    #[test]
    fn narrow_arbitrary_tier_is_widened_when_deserialized() {
        let tier: PrecisionTier = serde_json::from_str(r#"{"Arbitrary":{"bits":53}}"#).unwrap();
        assert_eq!(tier, PrecisionTier::arbitrary(MIN_ARBITRARY_BITS));
        assert_ne!(tier.cmp(&PrecisionTier::Native), Ordering::Equal);

        let json = serde_json::to_string(&PrecisionTier::arbitrary(512)).unwrap();
        let back: PrecisionTier = serde_json::from_str(&json).unwrap();
        assert_eq!(back, PrecisionTier::arbitrary(512));
    }

    #[test]
    fn ordering_agrees_with_equality() {
        let odd = PrecisionTier::Arbitrary { bits: 53 };
        assert_ne!(odd, PrecisionTier::Native);
        assert_eq!(odd.cmp(&PrecisionTier::Native), Ordering::Greater);
    }

    #[test]
    fn arbitrary_reports_digit_count() {
        assert_eq!(PrecisionTier::arbitrary(256).decimal_digits(), 77);
        assert_eq!(PrecisionTier::Native.decimal_digits(), 15);
    }

    #[test]
    fn mixed_tiers_promote_to_higher() {
        let a = Scalar::from_f64(1.0, PrecisionTier::Native).unwrap();
        let b = Scalar::from_string("1e-25", PrecisionTier::Extended).unwrap();
        let sum = a.add(&b).unwrap();
        assert_eq!(sum.tier(), PrecisionTier::Extended);
        assert_eq!(sum.sub(&a).unwrap().to_f64(), b.to_f64());

        let c = Scalar::from_f64(2.0, PrecisionTier::arbitrary(512)).unwrap();
        assert_eq!(sum.mul(&c).unwrap().tier(), PrecisionTier::arbitrary(512));
    }

    #[test]
    fn upgrade_is_lossless() {
        let ext = Scalar::from_string("0.1000000000000000000000000001", PrecisionTier::Extended)
            .unwrap();
        let wide = ext.to_tier(PrecisionTier::arbitrary(256)).unwrap();
        assert_eq!(wide.to_tier(PrecisionTier::Extended).unwrap(), ext);
        assert_eq!(wide, ext);
    }

    #[test]
    fn downgrade_rounds_to_nearest() {
        // 1 - 2^-60 is closer to 1.0 than to the next double below it
        let almost_one = Scalar::Extended(ExtFloat::from_f64(1.0).sub(&ExtFloat::from_f64(
            2f64.powi(-60),
        )));
        let native = almost_one.to_tier(PrecisionTier::Native).unwrap();
        assert_eq!(native.to_f64(), 1.0);
    }

    #[test]
    fn division_by_zero_reports_degenerate() {
        for tier in [
            PrecisionTier::Native,
            PrecisionTier::Extended,
            PrecisionTier::arbitrary(128),
        ] {
            let one = Scalar::from_f64(1.0, tier).unwrap();
            let zero = Scalar::from_f64(0.0, tier).unwrap();
            assert_eq!(one.div(&zero), Err(NumericDegenerate::DivisionByZero), "{tier}");
        }
    }

    #[test]
    fn native_underflow_reports_degenerate() {
        let tiny = Scalar::from_f64(1e-200, PrecisionTier::Native).unwrap();
        assert_eq!(tiny.mul(&tiny), Err(NumericDegenerate::Underflow));

        let wide = tiny.to_tier(PrecisionTier::arbitrary(128)).unwrap();
        assert!(wide.mul(&wide).is_ok());
    }

    #[test]
    fn native_overflow_reports_non_finite() {
        let huge = Scalar::from_f64(1e300, PrecisionTier::Native).unwrap();
        assert_eq!(huge.mul(&huge), Err(NumericDegenerate::NonFinite));
    }

    #[test]
    fn from_string_rejects_garbage() {
        assert!(Scalar::from_string("abc", PrecisionTier::Native).is_err());
        assert!(Scalar::from_string("abc", PrecisionTier::Extended).is_err());
        assert!(Scalar::from_string("abc", PrecisionTier::arbitrary(256)).is_err());
        assert!(Scalar::from_string("inf", PrecisionTier::Native).is_err());
    }

    #[test]
    fn ulp_shrinks_with_capacity() {
        let native = PrecisionTier::Native.ulp(1.0);
        let extended = PrecisionTier::Extended.ulp(1.0);
        assert_eq!(native, 2f64.powi(-52));
        assert!(extended < native);
    }
}
