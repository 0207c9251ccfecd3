use fracterm_core::config::MANDELBROT_CONFIG;
use fracterm_core::{FormulaConfig, FractalParams, InvalidParameters, PrecisionPolicy, Viewport};
use serde::{Deserialize, Serialize};

use crate::backend::BackendKind;
use crate::colorizers::Palette;

/// Engine-wide settings fixed when a session starts.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Worker threads for the CPU backend; 0 means one per logical CPU.
    pub cpu_threads: usize,
    pub rows_per_block: u32,
    /// Preferred backend at startup.
    pub backend: BackendKind,
    /// Frames between GPU re-probes while falling back after a device failure.
    pub gpu_reprobe_interval: u32,
    pub precision: PrecisionPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cpu_threads: 0,
            rows_per_block: 8,
            backend: BackendKind::Cpu,
            gpu_reprobe_interval: 30,
            precision: PrecisionPolicy::default(),
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), InvalidParameters> {
        if self.rows_per_block == 0 {
            return Err(InvalidParameters::Setting {
                field: "rows_per_block",
                expected: "at least 1",
            });
        }
        if self.gpu_reprobe_interval == 0 {
            return Err(InvalidParameters::Setting {
                field: "gpu_reprobe_interval",
                expected: "at least 1",
            });
        }
        self.precision.validate()
    }
}

/// Everything that determines one frame. Replaced wholesale, never edited:
/// each accepted command yields a new value with `version + 1`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RenderConfig {
    pub version: u64,
    pub viewport: Viewport,
    pub params: FractalParams,
    pub palette: Palette,
    pub backend: BackendKind,
}

impl RenderConfig {
    /// Home view of a formula on a grid of the given size.
    pub fn home(
        formula: &FormulaConfig,
        width: u32,
        height: u32,
        palette: Palette,
        backend: BackendKind,
    ) -> Result<Self, InvalidParameters> {
        let config = Self {
            version: 0,
            viewport: formula.default_viewport(width, height)?,
            params: formula.default_params(),
            palette,
            backend,
        };
        config.validate()?;
        Ok(config)
    }

    /// Mandelbrot home view with the default palette.
    pub fn mandelbrot(width: u32, height: u32) -> Result<Self, InvalidParameters> {
        Self::home(&MANDELBROT_CONFIG, width, height, Palette::default(), BackendKind::Cpu)
    }

    pub fn validate(&self) -> Result<(), InvalidParameters> {
        self.params.validate()?;
        self.palette.validate()
    }

    /// Successor carrying the next version number.
    pub fn next(&self) -> Self {
        Self {
            version: self.version + 1,
            ..self.clone()
        }
    }
}
