pub mod bigfloat;
pub mod buffers;
pub mod complex;
pub mod config;
pub mod coordinate;
pub mod error;
pub mod extfloat;
pub mod params;
pub mod pixel_rect;
pub mod precision;
pub mod scalar;
pub mod viewport;

pub use bigfloat::{BigFloat, MIN_ARBITRARY_BITS};
pub use buffers::{ColorBuffer, IterationBuffer, IterationCell, Rgb};
pub use complex::Complex;
pub use config::{find_formula, get_formula_config, FormulaConfig, FORMULAS};
pub use coordinate::Coordinate;
pub use error::{InvalidParameters, NumericDegenerate, ParseError};
pub use extfloat::{ExtFloat, EXTENDED_MANTISSA_BITS};
pub use params::{Formula, FractalParams, DEFAULT_JULIA_SEED, MAX_POWER_EXPONENT};
pub use pixel_rect::PixelRect;
pub use precision::{resolution_bits, Navigated, PrecisionManager, PrecisionPolicy, TierChange};
pub use scalar::{PrecisionTier, Real, Scalar, NATIVE_MANTISSA_BITS};
pub use viewport::{Viewport, BASE_SPAN, MAX_SCALE, MIN_SCALE};
