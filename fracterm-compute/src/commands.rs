//! Interaction commands and their effect on the render configuration.

use fracterm_core::{Coordinate, Formula, InvalidParameters, PrecisionManager, TierChange};
use serde::{Deserialize, Serialize};

use crate::backend::BackendKind;
use crate::colorizers::Palette;
use crate::render_config::RenderConfig;

/// One user interaction, applied between frames.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
    /// Move the view by pixels; positive values move right and down.
    Pan { dx: f64, dy: f64 },
    /// Magnify around a pixel. Factors below 1 zoom out.
    Zoom { factor: f64, px: u32, py: u32 },
    Recenter { center: Coordinate },
    SetFormula { formula: Formula, bailout: f64 },
    SetIterationLimit { max_iterations: u32 },
    SetPalette { palette: Palette },
    SetBackend { backend: BackendKind },
    Resize { width: u32, height: u32 },
    SetPaletteOffset { offset: f64 },
    /// Back to the current formula's default center and zoom.
    ResetView,
}

/// What a frame needs after a command.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Effect {
    /// Only colors change; the retained iteration buffer can be remapped.
    Recolor,
    Recompute,
}

/// Result of an accepted command.
#[derive(Clone, Debug, PartialEq)]
pub struct Applied {
    pub config: RenderConfig,
    pub effect: Effect,
    pub tier_change: Option<TierChange>,
}

impl Command {
    /// Apply to `config`, returning the successor configuration. On error the
    /// caller keeps `config` unchanged.
    pub fn apply(
        &self,
        config: &RenderConfig,
        precision: &PrecisionManager,
    ) -> Result<Applied, InvalidParameters> {
        let mut next = config.next();
        let mut effect = Effect::Recompute;
        let mut tier_change = None;
        let viewport = &config.viewport;

        match self {
            Command::Pan { dx, dy } => {
                let nav = precision.navigate(viewport, |v| v.pan(*dx, *dy))?;
                next.viewport = nav.viewport;
                tier_change = nav.change;
            }
            Command::Zoom { factor, px, py } => {
                let nav = precision.navigate(viewport, |v| v.zoom(*factor, *px, *py))?;
                next.viewport = nav.viewport;
                tier_change = nav.change;
            }
            Command::Recenter { center } => {
                let nav = precision.navigate(viewport, |v| v.recenter(center.clone()))?;
                next.viewport = nav.viewport;
                tier_change = nav.change;
            }
            Command::Resize { width, height } => {
                let nav = precision.navigate(viewport, |v| v.resize(*width, *height))?;
                next.viewport = nav.viewport;
                tier_change = nav.change;
            }
            Command::ResetView => {
                let home = config.params.formula.config();
                let nav = precision.navigate(viewport, |v| {
                    home.default_viewport(v.width(), v.height())?
                        .with_pixel_aspect(v.pixel_aspect())
                })?;
                next.viewport = nav.viewport;
                tier_change = nav.change;
            }
            Command::SetFormula { formula, bailout } => {
                next.params = config.params.with_formula(*formula, *bailout)?;
                if formula.id() != config.params.formula.id() {
                    let home = formula.config();
                    let nav = precision.navigate(viewport, |v| {
                        home.default_viewport(v.width(), v.height())?
                            .with_pixel_aspect(v.pixel_aspect())
                    })?;
                    next.viewport = nav.viewport;
                    tier_change = nav.change;
                }
            }
            Command::SetIterationLimit { max_iterations } => {
                next.params = config.params.with_iteration_limit(*max_iterations)?;
            }
            Command::SetPalette { palette } => {
                palette.validate()?;
                next.palette = palette.clone();
                effect = Effect::Recolor;
            }
            Command::SetPaletteOffset { offset } => {
                let palette = config.palette.with_offset(*offset);
                palette.validate()?;
                next.palette = palette;
                effect = Effect::Recolor;
            }
            Command::SetBackend { backend } => {
                next.backend = *backend;
            }
        }

        Ok(Applied {
            config: next,
            effect,
            tier_change,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fracterm_core::{PrecisionTier, DEFAULT_JULIA_SEED};

    fn base() -> RenderConfig {
        RenderConfig::mandelbrot(800, 600).unwrap()
    }

    #[test]
    fn accepted_commands_bump_version() {
        let precision = PrecisionManager::default();
        let applied = Command::Pan { dx: 5.0, dy: 0.0 }
            .apply(&base(), &precision)
            .unwrap();
        assert_eq!(applied.config.version, 1);
        assert_eq!(applied.effect, Effect::Recompute);
    }

    #[test]
    fn rejected_zoom_reports_invalid_parameters() {
        let precision = PrecisionManager::default();
        let result = Command::Zoom {
            factor: -2.0,
            px: 0,
            py: 0,
        }
        .apply(&base(), &precision);
        assert_eq!(result, Err(InvalidParameters::ZoomFactor(-2.0)));
    }

    #[test]
    fn palette_commands_only_recolor() {
        let precision = PrecisionManager::default();
        let applied = Command::SetPaletteOffset { offset: 0.25 }
            .apply(&base(), &precision)
            .unwrap();
        assert_eq!(applied.effect, Effect::Recolor);
        assert_eq!(applied.config.palette.offset, 0.25);
        assert_eq!(applied.config.viewport, base().viewport);
    }

    #[test]
    fn switching_formula_moves_to_its_home_view() {
        let precision = PrecisionManager::default();
        let zoomed = Command::Zoom {
            factor: 50.0,
            px: 10,
            py: 10,
        }
        .apply(&base(), &precision)
        .unwrap()
        .config;

        let (re, im) = DEFAULT_JULIA_SEED;
        let applied = Command::SetFormula {
            formula: Formula::julia(re, im),
            bailout: 2.0,
        }
        .apply(&zoomed, &precision)
        .unwrap();
        assert_eq!(applied.config.viewport.scale(), 1.0);
        assert_eq!(applied.config.viewport.center().to_f64_pair(), (0.0, 0.0));
    }

    #[test]
    fn changing_power_keeps_the_view() {
        let precision = PrecisionManager::default();
        let mut config = base();
        config.params.formula = Formula::PowerN { exponent: 3 };
        let applied = Command::SetFormula {
            formula: Formula::PowerN { exponent: 5 },
            bailout: 2.0,
        }
        .apply(&config, &precision)
        .unwrap();
        assert_eq!(applied.config.viewport, config.viewport);
        assert_eq!(applied.config.params.formula.degree(), 5);
    }

    #[test]
    fn reset_view_restores_home_and_downgrades() {
        let precision = PrecisionManager::default();
        let mut config = base();
        config.viewport = config
            .viewport
            .with_scale(1e20)
            .and_then(|v| Ok(v.with_tier(PrecisionTier::Extended)?))
            .unwrap();
        let applied = Command::ResetView.apply(&config, &precision).unwrap();
        assert_eq!(applied.config.viewport.scale(), 1.0);
        assert_eq!(applied.config.viewport.tier(), PrecisionTier::Native);
        assert!(applied.tier_change.is_some());
    }

    #[test]
    fn zero_iteration_limit_is_rejected() {
        let precision = PrecisionManager::default();
        let result = Command::SetIterationLimit { max_iterations: 0 }.apply(&base(), &precision);
        assert_eq!(result, Err(InvalidParameters::ZeroIterationLimit));
    }

    #[test]
    fn commands_deserialize_from_json() {
        let cmd: Command =
            serde_json::from_str(r#"{"command":"zoom","factor":2.0,"px":400,"py":300}"#).unwrap();
        assert_eq!(
            cmd,
            Command::Zoom {
                factor: 2.0,
                px: 400,
                py: 300
            }
        );
    }
}
