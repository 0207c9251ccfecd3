pub mod backend;
pub mod cancellation;
pub mod colorizers;
pub mod commands;
pub mod cpu;
pub mod dispatcher;
pub mod driver;
pub mod evaluator;
pub mod notice;
pub mod render_config;
pub mod session;
pub mod stats;

pub use backend::{BackendError, BackendKind, ComputeBackend, FrameSnapshot};
pub use cancellation::{CancellationChecker, GenerationCounter, GenerationToken};
pub use colorizers::{
    find_palette, ColorStop, Gradient, HslSettings, InteriorFill, Palette, PaletteMapper,
    PaletteMode,
};
pub use commands::{Applied, Command, Effect};
pub use cpu::CpuBackend;
pub use dispatcher::{DispatchError, DispatchOutcome, Dispatcher};
pub use driver::{DriverClosed, FrameDriver, FrameDriverHandle};
pub use evaluator::{evaluate, iterate, smoothing};
pub use notice::Notice;
pub use render_config::{EngineConfig, RenderConfig};
pub use session::{Frame, FrameReport, Session, SessionError};
pub use stats::FrameStats;

// Re-export core types for convenience
pub use fracterm_core::*;
