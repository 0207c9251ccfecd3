use serde::{Deserialize, Serialize};

use crate::error::InvalidParameters;

/// Highest exponent accepted for the PowerN (Multibrot) family.
pub const MAX_POWER_EXPONENT: u32 = 16;

/// Default Julia seed, a dendrite-like connected set.
pub const DEFAULT_JULIA_SEED: (f64, f64) = (-0.99418604, 0.261627);

/// The closed set of escape-time recurrences.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Formula {
    /// z' = z^2 + c, z0 = 0
    Mandelbrot,
    /// z' = (|Re z| + i|Im z|)^2 + c, z0 = 0
    BurningShip,
    /// z' = z^2 + seed, z0 = c
    Julia { seed_re: f64, seed_im: f64 },
    /// z' = z^n + c, z0 = 0
    PowerN { exponent: u32 },
}

impl Formula {
    pub fn julia(seed_re: f64, seed_im: f64) -> Self {
        Formula::Julia { seed_re, seed_im }
    }

    /// Registry id of the formula family.
    pub fn id(&self) -> &'static str {
        match self {
            Formula::Mandelbrot => "mandelbrot",
            Formula::BurningShip => "burning_ship",
            Formula::Julia { .. } => "julia",
            Formula::PowerN { .. } => "power_n",
        }
    }

    /// Polynomial degree of the recurrence, used by the smoothing correction.
    pub fn degree(&self) -> u32 {
        match self {
            Formula::PowerN { exponent } => *exponent,
            _ => 2,
        }
    }

    pub fn validate(&self) -> Result<(), InvalidParameters> {
        match self {
            Formula::Julia { seed_re, seed_im } if !seed_re.is_finite() || !seed_im.is_finite() => {
                Err(InvalidParameters::JuliaSeed)
            }
            Formula::PowerN { exponent } if !(2..=MAX_POWER_EXPONENT).contains(exponent) => {
                Err(InvalidParameters::Exponent {
                    got: *exponent,
                    max: MAX_POWER_EXPONENT,
                })
            }
            _ => Ok(()),
        }
    }
}

/// Immutable snapshot of what to compute, consumed by one compute pass.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FractalParams {
    pub formula: Formula,
    pub max_iterations: u32,
    pub bailout: f64,
}

impl FractalParams {
    pub fn new(
        formula: Formula,
        max_iterations: u32,
        bailout: f64,
    ) -> Result<Self, InvalidParameters> {
        let params = Self {
            formula,
            max_iterations,
            bailout,
        };
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> Result<(), InvalidParameters> {
        if self.max_iterations == 0 {
            return Err(InvalidParameters::ZeroIterationLimit);
        }
        if !self.bailout.is_finite() || self.bailout <= 0.0 {
            return Err(InvalidParameters::Bailout(self.bailout));
        }
        self.formula.validate()
    }

    pub fn with_iteration_limit(&self, max_iterations: u32) -> Result<Self, InvalidParameters> {
        Self::new(self.formula, max_iterations, self.bailout)
    }

    pub fn with_formula(&self, formula: Formula, bailout: f64) -> Result<Self, InvalidParameters> {
        Self::new(formula, self.max_iterations, bailout)
    }
}

impl Default for FractalParams {
    fn default() -> Self {
        Self {
            formula: Formula::Mandelbrot,
            max_iterations: 256,
            bailout: 2.0,
        }
    }
}
