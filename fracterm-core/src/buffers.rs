//! Per-frame output grids: escape results and display colors.

use serde::{Deserialize, Serialize};

/// Escape-time result for one pixel.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct IterationCell {
    /// Iterations before escape (the limit for bounded points)
    pub iterations: u32,
    /// Continuous correction in [0, 1); zero for bounded points
    pub smoothing: f32,
    /// True when the limit was reached without escaping
    pub bounded: bool,
}

impl IterationCell {
    pub fn escaped(iterations: u32, smoothing: f32) -> Self {
        let smoothing = if smoothing.is_finite() {
            smoothing.clamp(0.0, 1.0 - f32::EPSILON)
        } else {
            0.0
        };
        Self {
            iterations,
            smoothing,
            bounded: false,
        }
    }

    pub fn bounded(max_iterations: u32) -> Self {
        Self {
            iterations: max_iterations,
            smoothing: 0.0,
            bounded: true,
        }
    }

    /// Iterations plus the smoothing fraction.
    pub fn value(&self) -> f64 {
        self.iterations as f64 + self.smoothing as f64
    }
}

/// Dense row-major grid of escape results for one frame.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IterationBuffer {
    width: u32,
    height: u32,
    max_iterations: u32,
    cells: Vec<IterationCell>,
}

impl IterationBuffer {
    pub fn new(width: u32, height: u32, max_iterations: u32) -> Self {
        Self {
            width,
            height,
            max_iterations,
            cells: vec![IterationCell::default(); width as usize * height as usize],
        }
    }

    /// Wrap cells produced elsewhere (e.g. read back from a device).
    /// Returns `None` when the cell count does not match the dimensions.
    pub fn from_cells(
        width: u32,
        height: u32,
        max_iterations: u32,
        cells: Vec<IterationCell>,
    ) -> Option<Self> {
        (cells.len() == width as usize * height as usize).then_some(Self {
            width,
            height,
            max_iterations,
            cells,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Iteration limit the buffer was computed with.
    pub fn max_iterations(&self) -> u32 {
        self.max_iterations
    }

    pub fn get(&self, x: u32, y: u32) -> Option<&IterationCell> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.cells.get(y as usize * self.width as usize + x as usize)
    }

    pub fn cells(&self) -> &[IterationCell] {
        &self.cells
    }

    pub fn cells_mut(&mut self) -> &mut [IterationCell] {
        &mut self.cells
    }

    pub fn row(&self, y: u32) -> Option<&[IterationCell]> {
        if y >= self.height {
            return None;
        }
        let start = y as usize * self.width as usize;
        self.cells.get(start..start + self.width as usize)
    }

    /// Color every cell, keeping the grid shape. `f` receives the pixel
    /// position; returning `None` leaves that pixel transparent.
    pub fn map_pixels<F>(&self, mut f: F) -> ColorBuffer
    where
        F: FnMut(u32, u32, &IterationCell) -> Option<Rgb>,
    {
        let width = self.width.max(1) as usize;
        let mut transparent = Vec::new();
        let mut colors = Vec::with_capacity(self.cells.len());
        for (i, cell) in self.cells.iter().enumerate() {
            let (x, y) = ((i % width) as u32, (i / width) as u32);
            match f(x, y, cell) {
                Some(color) => colors.push(color),
                None => {
                    if transparent.is_empty() {
                        transparent = vec![false; self.cells.len()];
                    }
                    transparent[i] = true;
                    colors.push(Rgb::BLACK);
                }
            }
        }
        ColorBuffer {
            width: self.width,
            height: self.height,
            colors,
            transparent,
        }
    }
}

/// A 24-bit color.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

const COLOR_CUBE_OFFSET: u8 = 16;
const COLOR_CUBE_SIZE: u8 = 6;
const GRAYSCALE_OFFSET: u8 = 232;
const GRAYSCALE_LEVELS: u8 = 24;

/// Nearest level of the xterm 6x6x6 cube (0, 95, 135, 175, 215, 255).
fn cube_level(v: u8) -> u8 {
    match v {
        0..=47 => 0,
        48..=114 => 1,
        _ => (v - 35) / 40,
    }
}

fn cube_value(level: u8) -> u8 {
    if level == 0 {
        0
    } else {
        level * 40 + 55
    }
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);
    pub const WHITE: Rgb = Rgb::new(255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Nearest entry of the xterm 256-color palette, for terminals without
    /// true color. Picks between the color cube and the grayscale ramp.
    pub fn to_ansi256(&self) -> u8 {
        let (lr, lg, lb) = (cube_level(self.r), cube_level(self.g), cube_level(self.b));
        let cube_index =
            COLOR_CUBE_OFFSET + lr * COLOR_CUBE_SIZE * COLOR_CUBE_SIZE + lg * COLOR_CUBE_SIZE + lb;
        let cube = Rgb::new(cube_value(lr), cube_value(lg), cube_value(lb));

        let mean = (self.r as u32 + self.g as u32 + self.b as u32) / 3;
        let gray_step = (mean.saturating_sub(3) / 10).min(GRAYSCALE_LEVELS as u32 - 1) as u8;
        let gray_level = gray_step * 10 + 8;
        let gray = Rgb::new(gray_level, gray_level, gray_level);

        if self.distance_sq(&gray) < self.distance_sq(&cube) {
            GRAYSCALE_OFFSET + gray_step
        } else {
            cube_index
        }
    }

    fn distance_sq(&self, other: &Rgb) -> u32 {
        let dr = self.r as i32 - other.r as i32;
        let dg = self.g as i32 - other.g as i32;
        let db = self.b as i32 - other.b as i32;
        (dr * dr + dg * dg + db * db) as u32
    }
}

/// Dense row-major grid of display colors, one per pixel.
///
/// Transparent pixels keep the terminal's own background; their stored
/// color is black.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ColorBuffer {
    width: u32,
    height: u32,
    colors: Vec<Rgb>,
    /// Empty when no pixel is transparent.
    #[serde(default)]
    transparent: Vec<bool>,
}

impl ColorBuffer {
    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn get(&self, x: u32, y: u32) -> Option<Rgb> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.colors
            .get(y as usize * self.width as usize + x as usize)
            .copied()
    }

    pub fn colors(&self) -> &[Rgb] {
        &self.colors
    }

    pub fn is_transparent(&self, x: u32, y: u32) -> bool {
        if x >= self.width || y >= self.height {
            return false;
        }
        let i = y as usize * self.width as usize + x as usize;
        self.transparent.get(i).copied().unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escaped_cell_clamps_smoothing() {
        assert!(IterationCell::escaped(3, 1.0).smoothing < 1.0);
        assert_eq!(IterationCell::escaped(3, -0.5).smoothing, 0.0);
        assert_eq!(IterationCell::escaped(3, f32::NAN).smoothing, 0.0);
    }

    #[test]
    fn buffer_indexing_is_row_major() {
        let mut buffer = IterationBuffer::new(4, 3, 100);
        buffer.cells_mut()[2 * 4 + 1] = IterationCell::escaped(7, 0.5);
        assert_eq!(buffer.get(1, 2).map(|c| c.iterations), Some(7));
        assert_eq!(buffer.row(2).unwrap()[1].iterations, 7);
        assert!(buffer.row(buffer.height()).is_none());
        assert!(buffer.get(4, 0).is_none());
    }

    #[test]
    fn from_cells_checks_length() {
        assert!(IterationBuffer::from_cells(2, 2, 10, vec![IterationCell::default(); 3]).is_none());
        assert!(IterationBuffer::from_cells(2, 2, 10, vec![IterationCell::default(); 4]).is_some());
    }

    #[test]
    fn map_pixels_passes_positions_and_marks_transparency() {
        let mut buffer = IterationBuffer::new(3, 2, 10);
        buffer.cells_mut()[5] = IterationCell::escaped(4, 0.0);
        let colors = buffer.map_pixels(|x, y, cell| {
            (!cell.bounded).then(|| Rgb::new(x as u8, y as u8, cell.iterations as u8))
        });
        assert_eq!(colors.get(2, 1), Some(Rgb::new(2, 1, 4)));
        assert!(!colors.is_transparent(2, 1));
        assert!(colors.is_transparent(0, 0));
        assert_eq!(colors.get(0, 0), Some(Rgb::BLACK));
        assert!(!colors.is_transparent(3, 0));
    }

    #[test]
    fn opaque_buffers_carry_no_mask() {
        let buffer = IterationBuffer::new(2, 2, 10);
        let colors = buffer.map_pixels(|_, _, _| Some(Rgb::WHITE));
        assert!((0..2).all(|y| (0..2).all(|x| !colors.is_transparent(x, y))));
        let json = serde_json::to_string(&colors).unwrap();
        let parsed: ColorBuffer = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, colors);
    }

    #[test]
    fn ansi256_maps_primaries_into_cube() {
        assert_eq!(Rgb::new(255, 0, 0).to_ansi256(), 196);
        assert_eq!(Rgb::new(0, 0, 255).to_ansi256(), 21);
        assert_eq!(Rgb::BLACK.to_ansi256(), 16);
        assert_eq!(Rgb::WHITE.to_ansi256(), 231);
    }

    #[test]
    fn ansi256_uses_grayscale_ramp_for_grays() {
        let idx = Rgb::new(128, 128, 128).to_ansi256();
        assert!((232..=255).contains(&idx), "got {idx}");
    }
}
