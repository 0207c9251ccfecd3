//! GPU error types.

use std::time::Duration;

use fracterm_compute::BackendError;
use fracterm_core::NumericDegenerate;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GpuError {
    #[error("No GPU adapter found")]
    NoAdapter,

    #[error("Failed to create device: {0}")]
    DeviceCreation(#[from] wgpu::RequestDeviceError),

    #[error("Buffer mapping failed: {0}")]
    BufferMap(#[from] wgpu::BufferAsyncError),

    #[error("GPU did not finish within {0:?}")]
    Timeout(Duration),

    #[error("generation {0} was superseded")]
    Cancelled(u64),

    #[error("GPU unavailable: {0}")]
    Unavailable(String),

    /// Host re-evaluation of an uncertain cell broke down.
    #[error(transparent)]
    Numeric(#[from] NumericDegenerate),
}

impl From<GpuError> for BackendError {
    fn from(err: GpuError) -> Self {
        match err {
            GpuError::NoAdapter | GpuError::DeviceCreation(_) => {
                BackendError::Unavailable(err.to_string())
            }
            GpuError::Cancelled(generation) => BackendError::Cancelled { generation },
            GpuError::Numeric(err) => BackendError::Numeric(err),
            GpuError::BufferMap(_) | GpuError::Timeout(_) | GpuError::Unavailable(_) => {
                BackendError::Device(err.to_string())
            }
        }
    }
}
