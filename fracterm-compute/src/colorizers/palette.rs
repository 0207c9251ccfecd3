//! Palette configuration and the built-in palettes.

use fracterm_core::{InvalidParameters, IterationCell, Rgb};
use serde::{Deserialize, Serialize};

use super::{ColorStop, Gradient, HslSettings, InteriorFill};

/// How an escape value becomes a gradient position.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PaletteMode {
    /// Stretch `[0, max_iterations]` over the gradient once.
    Clamped,
    /// Repeat the gradient every `cycle_length` iterations.
    Cyclic { cycle_length: f64 },
}

/// A complete palette configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Palette {
    pub name: String,
    pub gradient: Gradient,
    pub mode: PaletteMode,
    /// Use the fractional smoothing term; `false` gives banded coloring.
    pub smooth: bool,
    /// Shift of the gradient position, used for color cycling.
    pub offset: f64,
    /// Fill for bounded points.
    #[serde(default)]
    pub interior: InteriorFill,
    /// When set, escaped points take their color from the hue circle
    /// instead of the gradient.
    #[serde(default)]
    pub hsl: Option<HslSettings>,
}

impl Palette {
    pub fn validate(&self) -> Result<(), InvalidParameters> {
        self.gradient.validate()?;
        if let PaletteMode::Cyclic { cycle_length } = self.mode {
            if !cycle_length.is_finite() || cycle_length <= 0.0 {
                return Err(InvalidParameters::CycleLength(cycle_length));
            }
        }
        if !self.offset.is_finite() {
            return Err(InvalidParameters::Setting {
                field: "palette offset",
                expected: "finite",
            });
        }
        match &self.hsl {
            Some(hsl) => hsl.validate(),
            None => Ok(()),
        }
    }

    /// Gradient position for an escaped cell, or `None` for a bounded one.
    pub fn position(&self, cell: &IterationCell, max_iterations: u32) -> Option<f64> {
        if cell.bounded {
            return None;
        }
        let value = if self.smooth {
            cell.value()
        } else {
            cell.iterations as f64
        };
        Some(match self.mode {
            PaletteMode::Clamped => {
                (value / max_iterations.max(1) as f64 + self.offset).clamp(0.0, 1.0)
            }
            PaletteMode::Cyclic { cycle_length } => {
                (value / cycle_length + self.offset).rem_euclid(1.0)
            }
        })
    }

    /// Same palette with a new cycling offset.
    pub fn with_offset(&self, offset: f64) -> Self {
        Self {
            offset,
            ..self.clone()
        }
    }

    /// Factory default palettes built into the binary.
    pub fn factory_defaults() -> Vec<Palette> {
        vec![
            Self::classic(),
            Self::fire(),
            Self::ocean(),
            Self::grayscale(),
            Self::galaxy(),
            Self::sunset(),
            Self::forest(),
        ]
    }

    pub fn classic() -> Self {
        clamped(
            "Classic",
            &[
                (0.0, [0, 7, 100]),
                (0.16, [32, 107, 203]),
                (0.42, [237, 255, 255]),
                (0.6425, [255, 170, 0]),
                (0.8575, [0, 2, 0]),
                (1.0, [0, 7, 100]),
            ],
        )
    }

    pub fn fire() -> Self {
        clamped(
            "Fire",
            &[
                (0.0, [0, 0, 0]),
                (0.2, [128, 0, 0]),
                (0.4, [255, 0, 0]),
                (0.6, [255, 128, 0]),
                (0.8, [255, 255, 0]),
                (1.0, [255, 255, 255]),
            ],
        )
    }

    pub fn ocean() -> Self {
        clamped(
            "Ocean",
            &[
                (0.0, [0, 0, 64]),
                (0.25, [0, 64, 128]),
                (0.5, [0, 128, 192]),
                (0.75, [64, 192, 255]),
                (1.0, [255, 255, 255]),
            ],
        )
    }

    pub fn grayscale() -> Self {
        clamped("Grayscale", &[(0.0, [0, 0, 0]), (1.0, [255, 255, 255])])
    }

    pub fn galaxy() -> Self {
        cyclic(
            "Galaxy",
            &[
                [12, 4, 50],
                [7, 7, 76],
                [3, 10, 103],
                [15, 47, 141],
                [27, 85, 180],
                [60, 128, 212],
                [137, 184, 232],
                [214, 239, 251],
                [244, 236, 194],
                [251, 204, 97],
                [255, 173, 3],
                [207, 131, 3],
                [156, 90, 3],
                [109, 55, 6],
                [69, 33, 19],
                [28, 10, 29],
            ],
        )
    }

    pub fn sunset() -> Self {
        cyclic(
            "Sunset",
            &[
                [25, 7, 26],
                [53, 14, 37],
                [88, 27, 48],
                [135, 54, 72],
                [186, 85, 108],
                [229, 118, 142],
                [252, 165, 177],
                [255, 204, 187],
                [255, 211, 138],
                [255, 187, 90],
                [252, 146, 48],
                [241, 103, 31],
                [208, 66, 29],
                [162, 40, 33],
                [111, 17, 29],
                [54, 7, 20],
            ],
        )
    }

    pub fn forest() -> Self {
        cyclic(
            "Forest",
            &[
                [10, 17, 5],
                [14, 30, 9],
                [22, 47, 12],
                [33, 68, 18],
                [50, 91, 25],
                [72, 116, 38],
                [106, 145, 55],
                [139, 174, 81],
                [171, 202, 114],
                [194, 219, 154],
                [182, 190, 129],
                [158, 157, 104],
                [118, 117, 77],
                [85, 80, 56],
                [55, 52, 36],
                [25, 27, 17],
            ],
        )
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self::galaxy()
    }
}

/// First factory palette whose name starts with `prefix`, ignoring case.
pub fn find_palette(prefix: &str) -> Option<Palette> {
    let prefix = prefix.trim().to_lowercase();
    if prefix.is_empty() {
        return None;
    }
    Palette::factory_defaults()
        .into_iter()
        .find(|p| p.name.to_lowercase().starts_with(&prefix))
}

fn rgb([r, g, b]: [u8; 3]) -> Rgb {
    Rgb::new(r, g, b)
}

fn clamped(name: &str, stops: &[(f64, [u8; 3])]) -> Palette {
    let stops = stops
        .iter()
        .map(|&(position, color)| ColorStop::new(position, rgb(color)))
        .collect();
    build(name, Gradient::new(stops), PaletteMode::Clamped)
}

fn cyclic(name: &str, colors: &[[u8; 3]]) -> Palette {
    let colors: Vec<Rgb> = colors.iter().copied().map(rgb).collect();
    let cycle_length = colors.len() as f64;
    build(
        name,
        Gradient::cyclic(&colors),
        PaletteMode::Cyclic { cycle_length },
    )
}

fn build(
    name: &str,
    gradient: Result<Gradient, InvalidParameters>,
    mode: PaletteMode,
) -> Palette {
    let gradient = gradient.unwrap_or_else(|err| {
        log::error!("built-in palette {name} is malformed: {err}");
        Gradient::default()
    });
    Palette {
        name: name.to_string(),
        gradient,
        mode,
        smooth: true,
        offset: 0.0,
        interior: InteriorFill::Black,
        hsl: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn factory_palettes_are_valid_and_unique() {
        let palettes = Palette::factory_defaults();
        assert_eq!(palettes.len(), 7);
        for palette in &palettes {
            assert!(palette.validate().is_ok(), "{}", palette.name);
        }
        let mut names: Vec<_> = palettes.iter().map(|p| p.name.clone()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), 7);
    }

    #[test]
    fn find_by_prefix_ignores_case() {
        assert_eq!(find_palette("SUN").map(|p| p.name), Some("Sunset".to_string()));
        assert_eq!(find_palette("gr").map(|p| p.name), Some("Grayscale".to_string()));
        assert!(find_palette("plaid").is_none());
        assert!(find_palette("  ").is_none());
    }

    #[test]
    fn bounded_cells_have_no_position() {
        let palette = Palette::grayscale();
        assert_eq!(palette.position(&IterationCell::bounded(100), 100), None);
    }

    #[test]
    fn clamped_position_scales_by_limit() {
        let palette = Palette::grayscale();
        let cell = IterationCell::escaped(25, 0.0);
        assert_eq!(palette.position(&cell, 100), Some(0.25));
        let past = IterationCell::escaped(250, 0.0);
        assert_eq!(palette.position(&past, 100), Some(1.0));
    }

    #[test]
    fn cyclic_position_wraps_with_offset() {
        let palette = Palette {
            mode: PaletteMode::Cyclic { cycle_length: 10.0 },
            ..Palette::grayscale()
        };
        let cell = IterationCell::escaped(25, 0.0);
        let p = palette.position(&cell, 1000).unwrap();
        assert!((p - 0.5).abs() < 1e-12);

        let shifted = palette.with_offset(0.75).position(&cell, 1000).unwrap();
        assert!((shifted - 0.25).abs() < 1e-12);
    }

    #[test]
    fn banded_mode_ignores_smoothing() {
        let cell = IterationCell::escaped(10, 0.9);
        let smooth = Palette::grayscale();
        let banded = Palette {
            smooth: false,
            ..Palette::grayscale()
        };
        assert!(smooth.position(&cell, 100) > banded.position(&cell, 100));
        assert_eq!(banded.position(&cell, 100), Some(0.1));
    }

    #[test]
    fn rejects_bad_cycle_length() {
        let palette = Palette {
            mode: PaletteMode::Cyclic { cycle_length: 0.0 },
            ..Palette::grayscale()
        };
        assert_eq!(palette.validate(), Err(InvalidParameters::CycleLength(0.0)));
    }

    #[test]
    fn rejects_out_of_range_hsl() {
        let palette = Palette {
            hsl: Some(HslSettings {
                saturation: 200,
                ..HslSettings::default()
            }),
            ..Palette::grayscale()
        };
        assert!(palette.validate().is_err());
    }

    #[test]
    fn older_palette_json_defaults_new_fields() {
        let mut value = serde_json::to_value(Palette::ocean()).unwrap();
        let object = value.as_object_mut().unwrap();
        object.remove("interior");
        object.remove("hsl");
        let parsed: Palette = serde_json::from_value(value).unwrap();
        assert_eq!(parsed.interior, InteriorFill::Black);
        assert_eq!(parsed.hsl, None);
    }

    #[test]
    fn palette_deserializes_from_json() {
        let json = serde_json::to_string(&Palette::fire()).unwrap();
        let parsed: Palette = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, Palette::fire());
    }
}
