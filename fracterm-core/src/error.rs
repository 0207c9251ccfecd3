//! Error taxonomy shared by every layer of the engine.

use thiserror::Error;

use crate::PrecisionTier;

/// Arithmetic could not produce a faithful result at the active tier.
///
/// Recovered by the precision manager forcing an upgrade before the next frame.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum NumericDegenerate {
    #[error("division by zero")]
    DivisionByZero,

    #[error("result underflowed below the smallest normal value")]
    Underflow,

    #[error("result is not finite")]
    NonFinite,

    #[error("adjacent pixels are indistinguishable at tier {tier}")]
    Unresolvable { tier: PrecisionTier },
}

/// A configuration mutation was rejected; the previous configuration stays active.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum InvalidParameters {
    #[error("iteration limit must be at least 1")]
    ZeroIterationLimit,

    #[error("bail-out radius must be a positive finite number, got {0}")]
    Bailout(f64),

    #[error("PowerN exponent must be between 2 and {max}, got {got}")]
    Exponent { got: u32, max: u32 },

    #[error("Julia seed must be finite")]
    JuliaSeed,

    #[error("palette needs at least two color stops, got {0}")]
    TooFewStops(usize),

    #[error("color stop position {0} is outside [0, 1]")]
    StopPosition(f64),

    #[error("palette cycle length must be a positive finite number, got {0}")]
    CycleLength(f64),

    #[error("viewport dimensions must be non-zero, got {width}x{height}")]
    Dimensions { width: u32, height: u32 },

    #[error("pixel aspect must be a positive finite number, got {0}")]
    PixelAspect(f64),

    #[error("zoom factor must be a positive finite number, got {0}")]
    ZoomFactor(f64),

    #[error("zoom scale {0:e} is outside the supported range")]
    ZoomOutOfRange(f64),

    #[error("pan offset must be finite")]
    PanOffset,

    #[error("coordinate could not be represented: {0}")]
    Coordinate(#[from] NumericDegenerate),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("{field} must be {expected}")]
    Setting {
        field: &'static str,
        expected: &'static str,
    },

    #[error("unknown {kind} '{name}'")]
    Unknown { kind: &'static str, name: String },
}

/// Decimal text could not be parsed into a numeric value.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("cannot parse '{input}' as a number: {reason}")]
pub struct ParseError {
    pub input: String,
    pub reason: String,
}
