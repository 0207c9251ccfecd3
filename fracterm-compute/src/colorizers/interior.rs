//! How bounded (interior) pixels are painted.

use fracterm_core::Rgb;
use serde::{Deserialize, Serialize};

/// Fill for points that never escaped.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InteriorFill {
    /// Leave the terminal background showing through.
    Transparent,
    #[default]
    Black,
    White,
    Color {
        color: Rgb,
    },
    RedNoise,
    GreenNoise,
    BlueNoise,
    RgbNoise,
    /// The color an escape value of zero would get.
    ColorScheme,
}

impl InteriorFill {
    /// Color of the interior pixel at `(x, y)`. `scheme` is the palette's
    /// color for an escape value of zero. `None` means transparent.
    ///
    /// Noise is a hash of the position and `seed`, so a frame recolors the
    /// same way every time it is mapped with the same seed.
    pub fn fill(self, x: u32, y: u32, seed: u64, scheme: Rgb) -> Option<Rgb> {
        let channels = || noise(x, y, seed);
        Some(match self {
            InteriorFill::Transparent => return None,
            InteriorFill::Black => Rgb::BLACK,
            InteriorFill::White => Rgb::WHITE,
            InteriorFill::Color { color } => color,
            InteriorFill::RedNoise => Rgb::new(channels()[0], 0, 0),
            InteriorFill::GreenNoise => Rgb::new(0, channels()[1], 0),
            InteriorFill::BlueNoise => Rgb::new(0, 0, channels()[2]),
            InteriorFill::RgbNoise => {
                let [r, g, b] = channels();
                Rgb::new(r, g, b)
            }
            InteriorFill::ColorScheme => scheme,
        })
    }
}

/// Three pseudo-random channels from a splitmix64 step over the position.
fn noise(x: u32, y: u32, seed: u64) -> [u8; 3] {
    let mut h = ((y as u64) << 32 | x as u64) ^ seed;
    h = h.wrapping_add(0x9e37_79b9_7f4a_7c15);
    h = (h ^ (h >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    h = (h ^ (h >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    h ^= h >> 31;
    [h as u8, (h >> 8) as u8, (h >> 16) as u8]
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCHEME: Rgb = Rgb::new(9, 8, 7);

    #[test]
    fn plain_fills() {
        assert_eq!(InteriorFill::Transparent.fill(0, 0, 0, SCHEME), None);
        assert_eq!(InteriorFill::Black.fill(3, 4, 0, SCHEME), Some(Rgb::BLACK));
        assert_eq!(InteriorFill::White.fill(3, 4, 0, SCHEME), Some(Rgb::WHITE));
        assert_eq!(InteriorFill::ColorScheme.fill(1, 1, 5, SCHEME), Some(SCHEME));
        let custom = InteriorFill::Color {
            color: Rgb::new(1, 2, 3),
        };
        assert_eq!(custom.fill(0, 0, 0, SCHEME), Some(Rgb::new(1, 2, 3)));
    }

    #[test]
    fn single_channel_noise_stays_in_its_channel() {
        let mut reds = Vec::new();
        for x in 0..64 {
            let red = InteriorFill::RedNoise.fill(x, 7, 1, SCHEME).unwrap();
            assert_eq!((red.g, red.b), (0, 0));
            reds.push(red.r);

            let green = InteriorFill::GreenNoise.fill(x, 7, 1, SCHEME).unwrap();
            assert_eq!((green.r, green.b), (0, 0));
            let blue = InteriorFill::BlueNoise.fill(x, 7, 1, SCHEME).unwrap();
            assert_eq!((blue.r, blue.g), (0, 0));
        }
        reds.sort_unstable();
        reds.dedup();
        assert!(reds.len() > 32, "only {} distinct values", reds.len());
    }

    #[test]
    fn noise_is_repeatable_per_seed() {
        let a = InteriorFill::RgbNoise.fill(10, 20, 42, SCHEME);
        assert_eq!(a, InteriorFill::RgbNoise.fill(10, 20, 42, SCHEME));
        let moved: Vec<_> = (0..8)
            .map(|seed| InteriorFill::RgbNoise.fill(10, 20, seed, SCHEME))
            .collect();
        assert!(moved.windows(2).any(|w| w[0] != w[1]));
    }

    #[test]
    fn fill_deserializes_from_json() {
        let fill: InteriorFill =
            serde_json::from_str(r#"{"kind":"color","color":{"r":1,"g":2,"b":3}}"#).unwrap();
        assert_eq!(fill, InteriorFill::Color { color: Rgb::new(1, 2, 3) });
        let fill: InteriorFill = serde_json::from_str(r#"{"kind":"rgb_noise"}"#).unwrap();
        assert_eq!(fill, InteriorFill::RgbNoise);
    }
}
