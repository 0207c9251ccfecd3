use std::cmp::Ordering;

use dashu_base::{Abs, Approximation};
use dashu_float::round::mode::{HalfEven, Zero};
use dashu_float::{DBig, FBig};
use serde::{Deserialize, Serialize};

use crate::error::{NumericDegenerate, ParseError};

/// Smallest width an arbitrary-precision value is allowed to carry.
///
/// Anything narrower could not hold a double-double exactly, so upgrades
/// from the extended tier would lose bits.
pub const MIN_ARBITRARY_BITS: usize = 128;

/// Binary arbitrary precision floating point with explicit precision.
///
/// Backed by dashu's `FBig`; every value records the mantissa width it was
/// created with, and binary operations promote to the wider operand.
#[derive(Clone, Debug)]
pub struct BigFloat {
    value: FBig,
    precision_bits: usize,
}

impl BigFloat {
    /// Create from f64 with explicit precision. Non-finite input is rejected.
    pub fn with_precision(val: f64, precision_bits: usize) -> Result<Self, NumericDegenerate> {
        if !val.is_finite() {
            return Err(NumericDegenerate::NonFinite);
        }
        let precision_bits = precision_bits.max(MIN_ARBITRARY_BITS);
        let fbig = if val == 0.0 {
            FBig::ZERO
        } else {
            FBig::try_from(val).map_err(|_| NumericDegenerate::NonFinite)?
        };
        Ok(Self {
            value: fbig.with_precision(precision_bits).value(),
            precision_bits,
        })
    }

    pub fn zero(precision_bits: usize) -> Self {
        let precision_bits = precision_bits.max(MIN_ARBITRARY_BITS);
        Self {
            value: FBig::ZERO.with_precision(precision_bits).value(),
            precision_bits,
        }
    }

    pub fn precision_bits(&self) -> usize {
        self.precision_bits
    }

    /// Equivalent number of significant decimal digits.
    pub fn decimal_digits(&self) -> usize {
        (self.precision_bits as f64 * std::f64::consts::LOG10_2).floor() as usize
    }

    /// Nearest f64, rounding half to even.
    pub fn to_f64(&self) -> f64 {
        self.value.clone().with_rounding::<HalfEven>().to_f64().value()
    }

    /// Parse decimal text directly at the target precision.
    ///
    /// Values beyond f64 range (e.g. "1e-1000") are preserved.
    pub fn from_string(val: &str, precision_bits: usize) -> Result<Self, ParseError> {
        let precision_bits = precision_bits.max(MIN_ARBITRARY_BITS);
        let dbig = val.trim().parse::<DBig>().map_err(|e| ParseError {
            input: val.to_string(),
            reason: e.to_string(),
        })?;
        let binary = match dbig.with_base_and_precision::<2>(precision_bits) {
            Approximation::Exact(v) => v,
            Approximation::Inexact(v, _) => v,
        };
        Ok(Self {
            value: binary.with_rounding::<Zero>(),
            precision_bits,
        })
    }

    /// Re-express at a different width. Widening is exact; narrowing rounds
    /// half to even.
    pub fn with_width(&self, precision_bits: usize) -> Self {
        let precision_bits = precision_bits.max(MIN_ARBITRARY_BITS);
        let value = if precision_bits >= self.precision_bits {
            self.value.clone().with_precision(precision_bits).value()
        } else {
            self.value
                .clone()
                .with_rounding::<HalfEven>()
                .with_precision(precision_bits)
                .value()
                .with_rounding::<Zero>()
        };
        Self {
            value,
            precision_bits,
        }
    }

    pub fn add(&self, other: &Self) -> Self {
        Self {
            value: &self.value + &other.value,
            precision_bits: self.precision_bits.max(other.precision_bits),
        }
    }

    pub fn sub(&self, other: &Self) -> Self {
        Self {
            value: &self.value - &other.value,
            precision_bits: self.precision_bits.max(other.precision_bits),
        }
    }

    pub fn mul(&self, other: &Self) -> Self {
        Self {
            value: &self.value * &other.value,
            precision_bits: self.precision_bits.max(other.precision_bits),
        }
    }

    /// Divide, reporting division by zero instead of panicking.
    pub fn div(&self, other: &Self) -> Result<Self, NumericDegenerate> {
        if other.is_zero() {
            return Err(NumericDegenerate::DivisionByZero);
        }
        Ok(Self {
            value: &self.value / &other.value,
            precision_bits: self.precision_bits.max(other.precision_bits),
        })
    }

    pub fn abs(&self) -> Self {
        Self {
            value: self.value.clone().abs(),
            precision_bits: self.precision_bits,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.value.repr().is_zero()
    }

    /// Exact sum of two f64 values, used to widen a double-double.
    pub(crate) fn from_f64_sum(
        head: f64,
        tail: f64,
        precision_bits: usize,
    ) -> Result<Self, NumericDegenerate> {
        let head = Self::with_precision(head, precision_bits)?;
        let tail = Self::with_precision(tail, precision_bits)?;
        Ok(head.add(&tail))
    }
}

impl PartialEq for BigFloat {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl PartialOrd for BigFloat {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.value.partial_cmp(&other.value)
    }
}

impl std::fmt::Display for BigFloat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.value)
    }
}

#[derive(Serialize, Deserialize)]
struct BigFloatSerde {
    value: String,
    precision_bits: usize,
}

impl Serialize for BigFloat {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        BigFloatSerde {
            value: self.value.to_string(),
            precision_bits: self.precision_bits,
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for BigFloat {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let serde = BigFloatSerde::deserialize(deserializer)?;
        let fbig = serde
            .value
            .parse::<FBig>()
            .map_err(|e| serde::de::Error::custom(format!("Failed to parse FBig: {}", e)))?;
        let precision_bits = serde.precision_bits.max(MIN_ARBITRARY_BITS);
        Ok(BigFloat {
            value: fbig.with_precision(precision_bits).value(),
            precision_bits,
        })
    }
}
