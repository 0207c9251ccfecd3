//! Chooses the backend for each frame and falls back to the CPU on GPU failure.

use std::time::Instant;

use fracterm_core::{IterationBuffer, NumericDegenerate};
use thiserror::Error;

use crate::backend::{BackendError, BackendKind, ComputeBackend, FrameSnapshot};
use crate::cancellation::GenerationToken;
use crate::cpu::CpuBackend;
use crate::notice::Notice;
use crate::render_config::EngineConfig;

#[derive(Clone, Debug, PartialEq, Error)]
pub enum DispatchError {
    #[error("generation {generation} was superseded")]
    Superseded { generation: u64 },

    #[error(transparent)]
    Numeric(#[from] NumericDegenerate),

    #[error("CPU backend failed: {0}")]
    Backend(BackendError),
}

impl From<BackendError> for DispatchError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::Cancelled { generation } => DispatchError::Superseded { generation },
            BackendError::Numeric(e) => DispatchError::Numeric(e),
            other => DispatchError::Backend(other),
        }
    }
}

/// A completed pass.
#[derive(Clone, Debug, PartialEq)]
pub struct DispatchOutcome {
    pub buffer: IterationBuffer,
    pub backend: BackendKind,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum GpuHealth {
    Healthy,
    /// The last frame did not fit the GPU's capabilities; retried every frame.
    Refused,
    /// The device failed; retried every `reprobe_interval` frames.
    Failed { frames_since_probe: u32 },
}

/// Routes each frame to the preferred backend, keeping the CPU as the
/// always-available fallback.
pub struct Dispatcher {
    cpu: CpuBackend,
    gpu: Option<Box<dyn ComputeBackend>>,
    preferred: BackendKind,
    health: GpuHealth,
    reprobe_interval: u32,
    notices: Vec<Notice>,
}

impl Dispatcher {
    pub fn new(config: &EngineConfig) -> Result<Self, BackendError> {
        Ok(Self {
            cpu: CpuBackend::new(config.cpu_threads, config.rows_per_block)?,
            gpu: None,
            preferred: config.backend,
            health: GpuHealth::Healthy,
            reprobe_interval: config.gpu_reprobe_interval.max(1),
            notices: Vec::new(),
        })
    }

    /// Install the GPU implementation. Health starts fresh.
    pub fn with_gpu(mut self, gpu: Box<dyn ComputeBackend>) -> Self {
        self.gpu = Some(gpu);
        self.health = GpuHealth::Healthy;
        self
    }

    pub fn preferred(&self) -> BackendKind {
        self.preferred
    }

    /// Switch the preferred backend. Selecting the GPU clears any failure
    /// streak so it is probed on the next frame.
    pub fn set_preferred(&mut self, kind: BackendKind) {
        self.preferred = kind;
        if kind == BackendKind::Gpu {
            self.health = GpuHealth::Healthy;
        }
    }

    /// True while frames are being diverted away from a preferred GPU.
    pub fn in_fallback(&self) -> bool {
        self.preferred == BackendKind::Gpu && self.health != GpuHealth::Healthy
    }

    /// Notices raised since the last call.
    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    /// Compute one frame. GPU failures never fail the frame; they divert it
    /// to the CPU.
    pub fn dispatch(
        &mut self,
        snapshot: &FrameSnapshot,
        token: &GenerationToken,
    ) -> Result<DispatchOutcome, DispatchError> {
        let started = Instant::now();

        if self.preferred == BackendKind::Gpu {
            match self.try_gpu(snapshot, token) {
                Some(Ok(buffer)) => {
                    self.gpu_succeeded();
                    log::debug!(
                        "frame {} on gpu in {:?}",
                        snapshot.generation,
                        started.elapsed()
                    );
                    return Ok(DispatchOutcome {
                        buffer,
                        backend: BackendKind::Gpu,
                    });
                }
                Some(Err(BackendError::Cancelled { generation })) => {
                    return Err(DispatchError::Superseded { generation });
                }
                // The tier is at fault, not the device; the CPU would fail the same way.
                Some(Err(BackendError::Numeric(err))) => return Err(DispatchError::Numeric(err)),
                Some(Err(err)) => self.gpu_failed(err),
                None => {}
            }
        }

        let buffer = self.cpu.compute(snapshot, token)?;
        log::debug!(
            "frame {} on cpu in {:?}",
            snapshot.generation,
            started.elapsed()
        );
        Ok(DispatchOutcome {
            buffer,
            backend: BackendKind::Cpu,
        })
    }

    /// `None` when the GPU is sitting out this frame of a failure streak.
    fn try_gpu(
        &mut self,
        snapshot: &FrameSnapshot,
        token: &GenerationToken,
    ) -> Option<Result<IterationBuffer, BackendError>> {
        if let GpuHealth::Failed { frames_since_probe } = &mut self.health {
            *frames_since_probe += 1;
            if *frames_since_probe < self.reprobe_interval {
                return None;
            }
            *frames_since_probe = 0;
            log::debug!("re-probing GPU");
        }

        let Some(gpu) = self.gpu.as_ref() else {
            return Some(Err(BackendError::Unavailable(
                "no GPU backend installed".to_string(),
            )));
        };
        Some(gpu.check(snapshot).and_then(|()| gpu.compute(snapshot, token)))
    }

    fn gpu_succeeded(&mut self) {
        if self.health != GpuHealth::Healthy {
            log::info!("GPU recovered, leaving CPU fallback");
            self.notices.push(Notice::GpuRecovered);
        }
        self.health = GpuHealth::Healthy;
    }

    fn gpu_failed(&mut self, err: BackendError) {
        if self.health == GpuHealth::Healthy {
            log::warn!("GPU unavailable for this frame, using CPU: {err}");
            self.notices.push(Notice::BackendFallback {
                reason: err.to_string(),
                using: BackendKind::Cpu,
            });
        }
        self.health = match (self.health, err.is_capability()) {
            (_, true) => GpuHealth::Refused,
            (failed @ GpuHealth::Failed { .. }, false) => failed,
            (_, false) => GpuHealth::Failed {
                frames_since_probe: 0,
            },
        };
    }
}
