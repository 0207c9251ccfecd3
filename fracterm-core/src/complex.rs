//! Complex arithmetic over any [`Real`] tier.

use crate::scalar::Real;

/// Complex number with components of one tier.
#[derive(Clone, Debug, PartialEq)]
pub struct Complex<T> {
    pub re: T,
    pub im: T,
}

impl<T: Real> Complex<T> {
    #[inline]
    pub fn new(re: T, im: T) -> Self {
        Self { re, im }
    }

    #[inline]
    pub fn add(&self, other: &Self) -> Self {
        Self {
            re: self.re.add(&other.re),
            im: self.im.add(&other.im),
        }
    }

    /// (a + bi)(c + di) = (ac - bd) + (ad + bc)i
    #[inline]
    pub fn mul(&self, other: &Self) -> Self {
        Self {
            re: self.re.mul(&other.re).sub(&self.im.mul(&other.im)),
            im: self.re.mul(&other.im).add(&self.im.mul(&other.re)),
        }
    }

    /// (a + bi)^2 = (a^2 - b^2) + 2abi
    #[inline]
    pub fn square(&self) -> Self {
        let re_sq = self.re.mul(&self.re);
        let im_sq = self.im.mul(&self.im);
        let re_im = self.re.mul(&self.im);
        Self {
            re: re_sq.sub(&im_sq),
            im: re_im.add(&re_im),
        }
    }

    /// z^n by repeated squaring.
    pub fn powu(&self, n: u32) -> Self {
        let mut result: Option<Self> = None;
        let mut base = self.clone();
        let mut n = n;
        while n > 0 {
            if n & 1 == 1 {
                result = Some(match result {
                    Some(acc) => acc.mul(&base),
                    None => base.clone(),
                });
            }
            n >>= 1;
            if n > 0 {
                base = base.square();
            }
        }
        match result {
            Some(r) => r,
            // z^0 = 1 at z's own width
            None => Self {
                re: T::from_f64_at(1.0, self.re.precision_bits())
                    .unwrap_or_else(|_| self.re.clone()),
                im: self.im.sub(&self.im),
            },
        }
    }

    /// |Re| + |Im|i, the fold applied by the Burning Ship recurrence.
    #[inline]
    pub fn abs_parts(&self) -> Self {
        Self {
            re: self.re.abs(),
            im: self.im.abs(),
        }
    }

    /// |z|^2 in the tier's own arithmetic.
    #[inline]
    pub fn norm_sq(&self) -> T {
        self.re.mul(&self.re).add(&self.im.mul(&self.im))
    }

    pub fn to_f64_pair(&self) -> (f64, f64) {
        (self.re.to_f64(), self.im.to_f64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BigFloat, ExtFloat};

    #[test]
    fn square_matches_mul_for_f64() {
        let z = Complex::new(0.3_f64, -1.7_f64);
        assert_eq!(z.square(), z.mul(&z));
    }

    #[test]
    fn powu_matches_repeated_multiplication() {
        let z = Complex::new(0.5_f64, 0.25_f64);
        let mut expected = z.clone();
        for _ in 1..5 {
            expected = expected.mul(&z);
        }
        let got = z.powu(5);
        assert!((got.re - expected.re).abs() < 1e-15);
        assert!((got.im - expected.im).abs() < 1e-15);
    }

    #[test]
    fn powu_zero_is_one() {
        let z = Complex::new(ExtFloat::from_f64(3.0), ExtFloat::from_f64(4.0));
        let one = z.powu(0);
        assert_eq!(one.to_f64_pair(), (1.0, 0.0));
    }

    #[test]
    fn norm_sq_agrees_across_tiers() {
        let native = Complex::new(3.0_f64, 4.0_f64);
        let ext = Complex::new(ExtFloat::from_f64(3.0), ExtFloat::from_f64(4.0));
        let big = Complex::new(
            BigFloat::with_precision(3.0, 256).unwrap(),
            BigFloat::with_precision(4.0, 256).unwrap(),
        );
        assert_eq!(native.norm_sq(), 25.0);
        assert_eq!(ext.norm_sq().to_f64(), 25.0);
        assert_eq!(big.norm_sq().to_f64(), 25.0);
    }

    #[test]
    fn abs_parts_folds_into_first_quadrant() {
        let z = Complex::new(-1.5_f64, -2.0_f64).abs_parts();
        assert_eq!(z.to_f64_pair(), (1.5, 2.0));
    }
}
