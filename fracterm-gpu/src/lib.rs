//! GPU-accelerated escape-time rendering using wgpu.

mod backend;
mod buffers;
mod device;
mod error;
mod pipeline;
mod renderer;

pub use backend::{GpuBackend, GPU_MANTISSA_BITS};
pub use buffers::{split_f64, EscapeBuffers, EscapeUniforms, GpuCell};
pub use device::{GpuAvailability, GpuContext};
pub use error::GpuError;
pub use pipeline::EscapePipeline;
pub use renderer::{GpuRenderer, READBACK_TIMEOUT};
