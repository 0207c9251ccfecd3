use std::fmt;

use fracterm_core::{InvalidParameters, NumericDegenerate, TierChange};

use crate::backend::{BackendError, BackendKind};

/// Non-fatal event surfaced to the host alongside frames.
#[derive(Clone, Debug, PartialEq)]
pub enum Notice {
    /// The preferred backend failed; frames are being computed on `using`.
    /// Emitted once per failure streak.
    BackendFallback { reason: String, using: BackendKind },
    /// The GPU produced a frame again after a failure streak.
    GpuRecovered,
    /// A queued command was refused; the previous configuration stays active.
    CommandRejected(InvalidParameters),
    PrecisionChanged(TierChange),
    /// The frame was abandoned because a newer one was requested.
    Superseded { generation: u64 },
    /// Arithmetic broke down; the next frame runs at a wider tier.
    NumericDegenerate(NumericDegenerate),
    /// The CPU fallback itself failed; no frame was produced.
    BackendFailed(BackendError),
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::BackendFallback { reason, using } => {
                write!(f, "falling back to {using}: {reason}")
            }
            Notice::GpuRecovered => write!(f, "GPU recovered"),
            Notice::CommandRejected(err) => write!(f, "command rejected: {err}"),
            Notice::PrecisionChanged(change) => {
                write!(f, "precision {} -> {}", change.from, change.to)
            }
            Notice::Superseded { generation } => write!(f, "frame {generation} superseded"),
            Notice::NumericDegenerate(err) => write!(f, "numeric breakdown: {err}"),
            Notice::BackendFailed(err) => write!(f, "backend failed: {err}"),
        }
    }
}
