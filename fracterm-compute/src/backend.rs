//! The seam between the dispatcher and the things that fill iteration buffers.

use std::fmt;

use fracterm_core::{FractalParams, IterationBuffer, NumericDegenerate, PrecisionTier, Viewport};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cancellation::GenerationToken;

/// Which implementation produced (or should produce) a frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Cpu,
    Gpu,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Cpu => write!(f, "cpu"),
            BackendKind::Gpu => write!(f, "gpu"),
        }
    }
}

/// Why a backend could not produce a buffer.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum BackendError {
    #[error("backend cannot evaluate at tier {tier}")]
    UnsupportedTier { tier: PrecisionTier },

    #[error("frame needs {required} mantissa bits, backend offers {available}")]
    InsufficientPrecision { required: usize, available: usize },

    #[error("backend cannot evaluate these parameters: {0}")]
    UnsupportedParameters(String),

    #[error("device error: {0}")]
    Device(String),

    #[error("backend unavailable: {0}")]
    Unavailable(String),

    #[error("generation {generation} was superseded")]
    Cancelled { generation: u64 },

    #[error(transparent)]
    Numeric(#[from] NumericDegenerate),
}

impl BackendError {
    /// Refusals decided from the frame alone, before touching any device.
    /// These clear as soon as a frame fits again.
    pub fn is_capability(&self) -> bool {
        matches!(
            self,
            BackendError::UnsupportedTier { .. }
                | BackendError::InsufficientPrecision { .. }
                | BackendError::UnsupportedParameters(_)
        )
    }
}

/// Immutable input of one compute pass.
#[derive(Clone, Debug, PartialEq)]
pub struct FrameSnapshot {
    pub generation: u64,
    pub viewport: Viewport,
    pub params: FractalParams,
}

impl FrameSnapshot {
    pub fn tier(&self) -> PrecisionTier {
        self.viewport.tier()
    }
}

/// Something that can turn a frame snapshot into an iteration buffer.
pub trait ComputeBackend: Send + Sync {
    fn kind(&self) -> BackendKind;

    /// Capability check for this frame. Cheap; must not touch a device.
    fn check(&self, snapshot: &FrameSnapshot) -> Result<(), BackendError>;

    /// Evaluate every pixel. Returns [`BackendError::Cancelled`] as soon as
    /// the token is superseded; partial results are discarded.
    fn compute(
        &self,
        snapshot: &FrameSnapshot,
        token: &GenerationToken,
    ) -> Result<IterationBuffer, BackendError>;
}
