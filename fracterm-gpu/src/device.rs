//! GPU device initialization and capability detection.

use crate::error::GpuError;

/// Holds the wgpu device and queue.
pub struct GpuContext {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub adapter_name: String,
}

/// Result of GPU initialization attempt.
pub enum GpuAvailability {
    Available(GpuContext),
    Unavailable(String),
}

impl GpuContext {
    /// Attempt to initialize GPU. Returns Unavailable on any failure.
    pub async fn try_init() -> GpuAvailability {
        match Self::init_internal().await {
            Ok(ctx) => GpuAvailability::Available(ctx),
            Err(e) => {
                log::warn!("GPU initialization failed: {e}");
                GpuAvailability::Unavailable(e.to_string())
            }
        }
    }

    /// Blocking form of [`GpuContext::try_init`] for the frame thread.
    pub fn init_blocking() -> Result<Self, GpuError> {
        pollster::block_on(Self::init_internal())
    }

    async fn init_internal() -> Result<Self, GpuError> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .ok_or(GpuError::NoAdapter)?;

        let info = adapter.get_info();
        log::info!("GPU adapter: {} ({:?})", info.name, info.backend);

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("fracterm"),
                    required_features: wgpu::Features::empty(),
                    // Compute shaders need storage buffers, which the
                    // downlevel WebGL2 limits do not provide.
                    required_limits: adapter.limits(),
                    memory_hints: wgpu::MemoryHints::MemoryUsage,
                },
                None,
            )
            .await?;

        Ok(Self {
            device,
            queue,
            adapter_name: info.name,
        })
    }
}
