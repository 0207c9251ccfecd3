use serde::{Deserialize, Serialize};

/// Band of pixel rows handed to one worker or one GPU submission.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn area(&self) -> u32 {
        self.width * self.height
    }

    /// Split a grid into full-width bands of at most `rows` rows, top to bottom.
    pub fn row_blocks(width: u32, height: u32, rows: u32) -> Vec<PixelRect> {
        let rows = rows.max(1);
        (0..height)
            .step_by(rows as usize)
            .map(|y| PixelRect::new(0, y, width, rows.min(height - y)))
            .collect()
    }

    /// Index range of this band within a row-major buffer `grid_width` wide.
    /// Only meaningful for full-width bands.
    pub fn cell_range(&self, grid_width: u32) -> std::ops::Range<usize> {
        let start = self.y as usize * grid_width as usize;
        start..start + self.height as usize * grid_width as usize
    }
}
