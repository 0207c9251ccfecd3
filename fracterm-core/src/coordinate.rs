use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{NumericDegenerate, ParseError};
use crate::scalar::{PrecisionTier, Scalar};

/// A point in the complex plane. Both components always share one tier.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    re: Scalar,
    im: Scalar,
}

impl Coordinate {
    /// Pair two scalars, promoting the narrower one.
    pub fn new(re: Scalar, im: Scalar) -> Result<Self, NumericDegenerate> {
        let tier = re.tier().max(im.tier());
        Ok(Self {
            re: re.to_tier(tier)?,
            im: im.to_tier(tier)?,
        })
    }

    pub fn from_f64(re: f64, im: f64, tier: PrecisionTier) -> Result<Self, NumericDegenerate> {
        Ok(Self {
            re: Scalar::from_f64(re, tier)?,
            im: Scalar::from_f64(im, tier)?,
        })
    }

    /// Parse decimal components, keeping every digit the tier can hold.
    pub fn from_strings(re: &str, im: &str, tier: PrecisionTier) -> Result<Self, ParseError> {
        Ok(Self {
            re: Scalar::from_string(re, tier)?,
            im: Scalar::from_string(im, tier)?,
        })
    }

    pub fn re(&self) -> &Scalar {
        &self.re
    }

    pub fn im(&self) -> &Scalar {
        &self.im
    }

    pub fn tier(&self) -> PrecisionTier {
        self.re.tier()
    }

    pub fn to_tier(&self, tier: PrecisionTier) -> Result<Self, NumericDegenerate> {
        Ok(Self {
            re: self.re.to_tier(tier)?,
            im: self.im.to_tier(tier)?,
        })
    }

    /// Shift by an offset given in f64, added in the coordinate's own tier.
    pub fn offset(&self, d_re: f64, d_im: f64) -> Result<Self, NumericDegenerate> {
        Ok(Self {
            re: self.re.add_f64(d_re)?,
            im: self.im.add_f64(d_im)?,
        })
    }

    pub fn to_f64_pair(&self) -> (f64, f64) {
        (self.re.to_f64(), self.im.to_f64())
    }

    /// Largest absolute component, in f64.
    pub fn magnitude_hint(&self) -> f64 {
        self.re.to_f64().abs().max(self.im.to_f64().abs())
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.re, self.im)
    }
}
