//! [`ComputeBackend`] implementation on top of [`GpuRenderer`].

use std::sync::{Mutex, MutexGuard};

use fracterm_compute::{
    BackendError, BackendKind, ComputeBackend, FrameSnapshot, GenerationToken,
};
use fracterm_core::{resolution_bits, IterationBuffer, PrecisionTier};

use crate::device::GpuContext;
use crate::error::GpuError;
use crate::renderer::GpuRenderer;

/// Significant bits the double-single shader keeps reliably.
pub const GPU_MANTISSA_BITS: usize = 46;

/// Largest coordinate magnitude whose squares stay finite in single precision.
pub const GPU_COORDINATE_LIMIT: f64 = 1e15;

/// GPU compute backend.
///
/// The device is opened on first use. After a device failure it is dropped
/// and reopened on the next attempt, so a recovered adapter is picked up
/// when the dispatcher re-probes.
pub struct GpuBackend {
    renderer: Mutex<Option<GpuRenderer>>,
    safety_margin_bits: usize,
}

impl GpuBackend {
    /// Backend that opens the device lazily.
    pub fn new(safety_margin_bits: u32) -> Self {
        Self {
            renderer: Mutex::new(None),
            safety_margin_bits: safety_margin_bits as usize,
        }
    }

    /// Backend over an already opened device.
    pub fn with_context(context: GpuContext, safety_margin_bits: u32) -> Self {
        Self {
            renderer: Mutex::new(Some(GpuRenderer::new(context))),
            safety_margin_bits: safety_margin_bits as usize,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<GpuRenderer>> {
        // A panic mid-frame leaves nothing half-written worth keeping.
        self.renderer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl ComputeBackend for GpuBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Gpu
    }

    fn check(&self, snapshot: &FrameSnapshot) -> Result<(), BackendError> {
        let tier = snapshot.tier();
        if matches!(tier, PrecisionTier::Arbitrary { .. }) {
            return Err(BackendError::UnsupportedTier { tier });
        }
        let magnitude = snapshot.viewport.max_magnitude();
        if !(magnitude <= GPU_COORDINATE_LIMIT) {
            return Err(BackendError::UnsupportedParameters(format!(
                "coordinates up to {magnitude:e} exceed single precision range"
            )));
        }
        let required = resolution_bits(&snapshot.viewport) + self.safety_margin_bits;
        if required > GPU_MANTISSA_BITS {
            return Err(BackendError::InsufficientPrecision {
                required,
                available: GPU_MANTISSA_BITS,
            });
        }
        let bailout_sq = (snapshot.params.bailout * snapshot.params.bailout) as f32;
        if !bailout_sq.is_finite() {
            return Err(BackendError::UnsupportedParameters(format!(
                "bail-out radius {} overflows single precision",
                snapshot.params.bailout
            )));
        }
        Ok(())
    }

    fn compute(
        &self,
        snapshot: &FrameSnapshot,
        token: &GenerationToken,
    ) -> Result<IterationBuffer, BackendError> {
        self.check(snapshot)?;

        let mut slot = self.lock();
        if slot.is_none() {
            let context = GpuContext::init_blocking().map_err(BackendError::from)?;
            let renderer = GpuRenderer::new(context);
            log::info!("GPU backend ready on {}", renderer.adapter_name());
            *slot = Some(renderer);
        }
        let renderer = slot
            .as_mut()
            .ok_or_else(|| BackendError::Unavailable("GPU renderer missing".into()))?;

        match renderer.render(&snapshot.viewport, &snapshot.params, token) {
            Ok(buffer) => Ok(buffer),
            Err(GpuError::Cancelled(generation)) => Err(BackendError::Cancelled { generation }),
            Err(GpuError::Numeric(err)) => Err(BackendError::Numeric(err)),
            Err(err) => {
                log::warn!("GPU frame {} failed: {err}", snapshot.generation);
                *slot = None;
                Err(err.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fracterm_compute::GenerationCounter;
    use fracterm_core::{Coordinate, Formula, FractalParams, Viewport};

    fn snapshot(tier: PrecisionTier, scale: f64, bailout: f64) -> FrameSnapshot {
        let center = Coordinate::from_f64(-0.5, 0.0, tier).unwrap();
        FrameSnapshot {
            generation: 0,
            viewport: Viewport::new(center, scale, 80, 40).unwrap(),
            params: FractalParams::new(Formula::Mandelbrot, 100, bailout).unwrap(),
        }
    }

    #[test]
    fn refuses_arbitrary_tier() {
        let backend = GpuBackend::new(8);
        let result = backend.check(&snapshot(PrecisionTier::arbitrary(128), 1.0, 2.0));
        assert!(matches!(result, Err(BackendError::UnsupportedTier { .. })));
    }

    #[test]
    fn refuses_zoom_beyond_double_single() {
        let backend = GpuBackend::new(8);
        assert!(backend.check(&snapshot(PrecisionTier::Native, 1.0, 2.0)).is_ok());
        let result = backend.check(&snapshot(PrecisionTier::Native, 1e12, 2.0));
        assert!(matches!(
            result,
            Err(BackendError::InsufficientPrecision { available: GPU_MANTISSA_BITS, .. })
        ));
    }

    #[test]
    fn refuses_coordinates_outside_single_precision() {
        let backend = GpuBackend::new(8);
        let center = Coordinate::from_f64(1e20, 0.0, PrecisionTier::Native).unwrap();
        let far = FrameSnapshot {
            generation: 0,
            viewport: Viewport::new(center, 1.0, 80, 40).unwrap(),
            params: FractalParams::new(Formula::Mandelbrot, 100, 2.0).unwrap(),
        };
        assert!(matches!(
            backend.check(&far),
            Err(BackendError::UnsupportedParameters(_))
        ));
    }

    #[test]
    fn refusals_never_touch_the_device() {
        let backend = GpuBackend::new(8);
        let token = GenerationCounter::new().token();
        let result = backend.compute(&snapshot(PrecisionTier::Native, 1.0, 1e30), &token);
        assert!(matches!(result, Err(BackendError::UnsupportedParameters(_))));
        assert!(backend.lock().is_none());
    }
}
