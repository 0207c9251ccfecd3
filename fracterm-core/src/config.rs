//! Static registry of the built-in formulas and their default views.

use crate::error::{InvalidParameters, ParseError};
use crate::params::{Formula, FractalParams, DEFAULT_JULIA_SEED};
use crate::scalar::PrecisionTier;
use crate::{Coordinate, Viewport};

/// Defaults for one formula family.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FormulaConfig {
    /// Unique identifier (matches `Formula::id`)
    pub id: &'static str,
    /// Human-readable name
    pub display_name: &'static str,
    /// Default center as strings (preserves precision)
    pub default_center: (&'static str, &'static str),
    /// Default linear magnification
    pub default_scale: f64,
    pub default_bailout: f64,
    pub default_max_iterations: u32,
    /// Formula with its default constants
    pub formula: Formula,
}

impl FormulaConfig {
    pub fn default_center(&self) -> Result<Coordinate, ParseError> {
        let (re, im) = self.default_center;
        Coordinate::from_strings(re, im, PrecisionTier::Native)
    }

    /// Home view of this formula on a grid of the given size.
    pub fn default_viewport(
        &self,
        width: u32,
        height: u32,
    ) -> Result<Viewport, InvalidParameters> {
        Viewport::new(self.default_center()?, self.default_scale, width, height)
    }

    pub fn default_params(&self) -> FractalParams {
        FractalParams {
            formula: self.formula,
            max_iterations: self.default_max_iterations,
            bailout: self.default_bailout,
        }
    }
}

pub static MANDELBROT_CONFIG: FormulaConfig = FormulaConfig {
    id: "mandelbrot",
    display_name: "Mandelbrot Set",
    default_center: ("-0.5", "0.0"),
    default_scale: 1.0,
    default_bailout: 2.0,
    default_max_iterations: 256,
    formula: Formula::Mandelbrot,
};

/// Burning Ship is drawn with the imaginary axis pointing down the screen,
/// so the ship sits upright around (-0.5, -0.5).
pub static BURNING_SHIP_CONFIG: FormulaConfig = FormulaConfig {
    id: "burning_ship",
    display_name: "Burning Ship",
    default_center: ("-0.5", "-0.5"),
    default_scale: 1.0,
    default_bailout: 2.0,
    default_max_iterations: 256,
    formula: Formula::BurningShip,
};

pub static JULIA_CONFIG: FormulaConfig = FormulaConfig {
    id: "julia",
    display_name: "Julia Set",
    default_center: ("0.0", "0.0"),
    default_scale: 1.0,
    default_bailout: 2.0,
    default_max_iterations: 256,
    formula: Formula::Julia {
        seed_re: DEFAULT_JULIA_SEED.0,
        seed_im: DEFAULT_JULIA_SEED.1,
    },
};

pub static POWER_N_CONFIG: FormulaConfig = FormulaConfig {
    id: "power_n",
    display_name: "Multibrot (z^n + c)",
    default_center: ("0.0", "0.0"),
    default_scale: 1.0,
    default_bailout: 2.0,
    default_max_iterations: 256,
    formula: Formula::PowerN { exponent: 3 },
};

pub static FORMULAS: [&FormulaConfig; 4] = [
    &MANDELBROT_CONFIG,
    &BURNING_SHIP_CONFIG,
    &JULIA_CONFIG,
    &POWER_N_CONFIG,
];

/// Look up a formula configuration by id.
pub fn get_formula_config(id: &str) -> Option<&'static FormulaConfig> {
    FORMULAS.iter().copied().find(|config| config.id == id)
}

/// First formula whose id or display name starts with `prefix`, ignoring case.
pub fn find_formula(prefix: &str) -> Option<&'static FormulaConfig> {
    let prefix = prefix.trim().to_lowercase();
    if prefix.is_empty() {
        return None;
    }
    FORMULAS.iter().copied().find(|config| {
        config.id.starts_with(&prefix) || config.display_name.to_lowercase().starts_with(&prefix)
    })
}

impl Formula {
    /// Registry entry for this formula's family.
    pub fn config(&self) -> &'static FormulaConfig {
        match self {
            Formula::Mandelbrot => &MANDELBROT_CONFIG,
            Formula::BurningShip => &BURNING_SHIP_CONFIG,
            Formula::Julia { .. } => &JULIA_CONFIG,
            Formula::PowerN { .. } => &POWER_N_CONFIG,
        }
    }
}
