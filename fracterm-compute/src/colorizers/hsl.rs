//! Hue-cycling color mode: escape values walk around the HSL hue circle.

use fracterm_core::{InvalidParameters, Rgb};
use serde::{Deserialize, Serialize};

/// Upper bound of every HSL setting.
pub const MAX_HSL_VALUE: u8 = 100;

/// HSL mode settings. Every field is on a 0..=100 scale.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HslSettings {
    /// Rotation of the hue circle; 100 is a full turn.
    pub hue_offset: u8,
    pub saturation: u8,
    pub luminance: u8,
    /// Higher values stretch each hue over more iterations.
    pub smoothness: u8,
}

impl Default for HslSettings {
    fn default() -> Self {
        Self {
            hue_offset: 69,
            saturation: 64,
            luminance: 48,
            smoothness: 5,
        }
    }
}

impl HslSettings {
    pub fn validate(&self) -> Result<(), InvalidParameters> {
        let fields = [
            ("hsl hue offset", self.hue_offset),
            ("hsl saturation", self.saturation),
            ("hsl luminance", self.luminance),
            ("hsl smoothness", self.smoothness),
        ];
        match fields.iter().find(|(_, v)| *v > MAX_HSL_VALUE) {
            Some((field, _)) => Err(InvalidParameters::Setting {
                field: *field,
                expected: "at most 100",
            }),
            None => Ok(()),
        }
    }

    /// Hue in degrees for an escape value.
    pub fn hue(&self, value: f64) -> f64 {
        let stretch = 10f64.powf(self.smoothness as f64 / 30.0);
        (value / stretch * 30.0 + self.hue_offset as f64 * 3.6).rem_euclid(360.0)
    }

    pub fn color(&self, value: f64) -> Rgb {
        hsl_to_rgb(
            self.hue(value),
            self.saturation as f64 / MAX_HSL_VALUE as f64,
            self.luminance as f64 / MAX_HSL_VALUE as f64,
        )
    }
}

/// `hue` in degrees, saturation and lightness in [0, 1].
pub fn hsl_to_rgb(hue: f64, saturation: f64, lightness: f64) -> Rgb {
    let chroma = (1.0 - (2.0 * lightness - 1.0).abs()) * saturation;
    let h = hue.rem_euclid(360.0) / 60.0;
    let x = chroma * (1.0 - (h % 2.0 - 1.0).abs());

    let (r, g, b) = match h as u32 {
        0 => (chroma, x, 0.0),
        1 => (x, chroma, 0.0),
        2 => (0.0, chroma, x),
        3 => (0.0, x, chroma),
        4 => (x, 0.0, chroma),
        _ => (chroma, 0.0, x),
    };

    let m = lightness - chroma / 2.0;
    let channel = |v: f64| ((v + m) * 255.0).round().clamp(0.0, 255.0) as u8;
    Rgb::new(channel(r), channel(g), channel(b))
}
