//! Maps iteration buffers to colors through a palette lookup table.

use fracterm_core::{ColorBuffer, InvalidParameters, IterationBuffer, IterationCell, Rgb};

use super::gradient::LUT_SIZE;
use super::Palette;

/// Palette plus its precomputed lookup table.
///
/// Mapping is a pure function of the buffer, the palette and the noise seed,
/// so a palette change can recolor a retained buffer without recomputing it.
#[derive(Clone, Debug)]
pub struct PaletteMapper {
    palette: Palette,
    lut: Vec<Rgb>,
}

impl PaletteMapper {
    pub fn new(palette: Palette) -> Result<Self, InvalidParameters> {
        palette.validate()?;
        let lut = palette.gradient.to_lut();
        Ok(Self { palette, lut })
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    /// Color of an escaped cell, or `None` for a bounded one.
    pub fn escaped_color(&self, cell: &IterationCell, max_iterations: u32) -> Option<Rgb> {
        let t = self.palette.position(cell, max_iterations)?;
        if let Some(hsl) = &self.palette.hsl {
            let value = if self.palette.smooth {
                cell.value()
            } else {
                cell.iterations as f64
            };
            return Some(hsl.color(value));
        }
        let idx = (t * (LUT_SIZE - 1) as f64).round() as usize;
        Some(self.lut[idx.min(LUT_SIZE - 1)])
    }

    /// Color a whole buffer. `seed` drives the noise interior fills.
    pub fn map(&self, buffer: &IterationBuffer, seed: u64) -> ColorBuffer {
        let max_iterations = buffer.max_iterations();
        // Interior color of the color-scheme fill
        let scheme = self
            .escaped_color(&IterationCell::escaped(0, 0.0), max_iterations)
            .unwrap_or(Rgb::BLACK);
        let interior = self.palette.interior;
        buffer.map_pixels(|x, y, cell| match self.escaped_color(cell, max_iterations) {
            Some(color) => Some(color),
            None => interior.fill(x, y, seed, scheme),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::colorizers::{ColorStop, Gradient, HslSettings, InteriorFill, PaletteMode};

    fn grey_mapper() -> PaletteMapper {
        PaletteMapper::new(Palette::grayscale()).unwrap()
    }

    fn interior_buffer() -> IterationBuffer {
        let mut buffer = IterationBuffer::new(4, 2, 10);
        for cell in buffer.cells_mut() {
            *cell = IterationCell::bounded(10);
        }
        buffer.cells_mut()[0] = IterationCell::escaped(5, 0.0);
        buffer
    }

    fn with_interior(interior: InteriorFill) -> PaletteMapper {
        PaletteMapper::new(Palette {
            interior,
            ..Palette::fire()
        })
        .unwrap()
    }

    #[test]
    fn halfway_value_maps_to_mid_grey() {
        let mapper = grey_mapper();
        let c = mapper
            .escaped_color(&IterationCell::escaped(50, 0.0), 100)
            .unwrap();
        assert!(c.r == 127 || c.r == 128, "got {c:?}");
        assert_eq!((c.r, c.g), (c.g, c.b));
    }

    #[test]
    fn bounded_cells_take_interior_color() {
        let mapper = with_interior(InteriorFill::Color {
            color: Rgb::new(1, 2, 3),
        });
        assert_eq!(mapper.escaped_color(&IterationCell::bounded(10), 10), None);
        let colors = mapper.map(&interior_buffer(), 0);
        assert_eq!(colors.get(3, 1), Some(Rgb::new(1, 2, 3)));
    }

    #[test]
    fn transparent_interior_leaves_only_escaped_cells_opaque() {
        let colors = with_interior(InteriorFill::Transparent).map(&interior_buffer(), 0);
        assert!(!colors.is_transparent(0, 0));
        assert!((1..4).all(|x| colors.is_transparent(x, 0)));
        assert!((0..4).all(|x| colors.is_transparent(x, 1)));
    }

    #[test]
    fn color_scheme_interior_matches_escape_value_zero() {
        let mapper = with_interior(InteriorFill::ColorScheme);
        let zero = mapper
            .escaped_color(&IterationCell::escaped(0, 0.0), 10)
            .unwrap();
        assert_eq!(mapper.map(&interior_buffer(), 0).get(2, 1), Some(zero));
    }

    #[test]
    fn noise_interior_follows_the_seed() {
        let mapper = with_interior(InteriorFill::RgbNoise);
        let buffer = interior_buffer();
        assert_eq!(mapper.map(&buffer, 7), mapper.map(&buffer, 7));
        assert_ne!(mapper.map(&buffer, 7), mapper.map(&buffer, 8));
        // Escaped cells do not depend on the seed
        assert_eq!(mapper.map(&buffer, 7).get(0, 0), mapper.map(&buffer, 8).get(0, 0));
    }

    #[test]
    fn hsl_mode_replaces_the_gradient() {
        let hsl = HslSettings {
            hue_offset: 0,
            saturation: 100,
            luminance: 50,
            smoothness: 0,
        };
        let mapper = PaletteMapper::new(Palette {
            hsl: Some(hsl),
            smooth: false,
            ..Palette::grayscale()
        })
        .unwrap();
        // Hue 0 and 4 * 30 degrees
        assert_eq!(
            mapper.escaped_color(&IterationCell::escaped(0, 0.0), 100),
            Some(Rgb::new(255, 0, 0))
        );
        assert_eq!(
            mapper.escaped_color(&IterationCell::escaped(4, 0.5), 100),
            Some(Rgb::new(0, 255, 0))
        );
        assert_eq!(mapper.escaped_color(&IterationCell::bounded(100), 100), None);
    }

    #[test]
    fn map_preserves_dimensions() {
        let mut buffer = IterationBuffer::new(3, 2, 10);
        buffer.cells_mut()[4] = IterationCell::escaped(10, 0.0);
        let colors = grey_mapper().map(&buffer, 0);
        assert_eq!((colors.width(), colors.height()), (3, 2));
        assert_eq!(colors.get(1, 1), Some(Rgb::WHITE));
        assert_eq!(colors.get(0, 0), Some(Rgb::BLACK));
    }

    #[test]
    fn cycling_offset_recolors_same_cell() {
        let palette = Palette {
            gradient: Gradient::new(vec![
                ColorStop::new(0.0, Rgb::new(255, 0, 0)),
                ColorStop::new(1.0, Rgb::new(0, 0, 255)),
            ])
            .unwrap(),
            mode: PaletteMode::Cyclic { cycle_length: 8.0 },
            ..Palette::grayscale()
        };
        let cell = IterationCell::escaped(2, 0.0);
        let before = PaletteMapper::new(palette.clone())
            .unwrap()
            .escaped_color(&cell, 100);
        let after = PaletteMapper::new(palette.with_offset(0.5))
            .unwrap()
            .escaped_color(&cell, 100);
        assert_ne!(before, after);
    }

    #[test]
    fn invalid_palette_is_rejected() {
        let palette = Palette {
            offset: f64::NAN,
            ..Palette::grayscale()
        };
        assert!(PaletteMapper::new(palette).is_err());
    }
}
