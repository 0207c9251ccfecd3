//! GPU buffer management for the escape-time shader.

use bytemuck::{Pod, Zeroable};
use fracterm_core::{Formula, FractalParams, Viewport};

pub const FORMULA_MANDELBROT: u32 = 0;
pub const FORMULA_BURNING_SHIP: u32 = 1;
pub const FORMULA_JULIA: u32 = 2;
pub const FORMULA_POWER_N: u32 = 3;

pub const CELL_BOUNDED: u32 = 0;
pub const CELL_ESCAPED: u32 = 1;
/// The device could not guarantee the host evaluator's answer for this cell.
pub const CELL_UNCERTAIN: u32 = 2;

/// Split an `f64` into an unevaluated `hi + lo` pair of `f32`s.
pub fn split_f64(value: f64) -> (f32, f32) {
    let hi = value as f32;
    let lo = (value - hi as f64) as f32;
    (hi, lo)
}

/// Uniform block for one chunk of rows. Layout matches `Params` in escape.wgsl.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct EscapeUniforms {
    pub width: u32,
    pub height: u32,
    pub row_offset: u32,
    pub rows: u32,

    pub max_iterations: u32,
    pub formula: u32,
    pub exponent: u32,
    pub _pad0: u32,

    pub center_re_hi: f32,
    pub center_re_lo: f32,
    pub center_im_hi: f32,
    pub center_im_lo: f32,

    pub spacing_hi: f32,
    pub spacing_lo: f32,
    pub spacing_y_hi: f32,
    pub spacing_y_lo: f32,

    pub seed_re_hi: f32,
    pub seed_re_lo: f32,
    pub seed_im_hi: f32,
    pub seed_im_lo: f32,

    pub bailout_sq_hi: f32,
    pub bailout_sq_lo: f32,
    pub _pad1: [u32; 2],
}

impl EscapeUniforms {
    pub fn new(viewport: &Viewport, params: &FractalParams) -> Self {
        let (center_re, center_im) = viewport.center().to_f64_pair();
        let (center_re_hi, center_re_lo) = split_f64(center_re);
        let (center_im_hi, center_im_lo) = split_f64(center_im);
        let (spacing_hi, spacing_lo) = split_f64(viewport.spacing());
        let (spacing_y_hi, spacing_y_lo) = split_f64(viewport.spacing_y());

        let (formula, exponent, seed) = match params.formula {
            Formula::Mandelbrot => (FORMULA_MANDELBROT, 2, (0.0, 0.0)),
            Formula::BurningShip => (FORMULA_BURNING_SHIP, 2, (0.0, 0.0)),
            Formula::Julia { seed_re, seed_im } => (FORMULA_JULIA, 2, (seed_re, seed_im)),
            Formula::PowerN { exponent } => (FORMULA_POWER_N, exponent, (0.0, 0.0)),
        };
        let (seed_re_hi, seed_re_lo) = split_f64(seed.0);
        let (seed_im_hi, seed_im_lo) = split_f64(seed.1);
        let (bailout_sq_hi, bailout_sq_lo) = split_f64(params.bailout * params.bailout);

        Self {
            width: viewport.width(),
            height: viewport.height(),
            row_offset: 0,
            rows: 0,
            max_iterations: params.max_iterations,
            formula,
            exponent,
            _pad0: 0,
            center_re_hi,
            center_re_lo,
            center_im_hi,
            center_im_lo,
            spacing_hi,
            spacing_lo,
            spacing_y_hi,
            spacing_y_lo,
            seed_re_hi,
            seed_re_lo,
            seed_im_hi,
            seed_im_lo,
            bailout_sq_hi,
            bailout_sq_lo,
            _pad1: [0; 2],
        }
    }

    /// Same frame, restricted to `rows` rows starting at `row_offset`.
    pub fn for_rows(self, row_offset: u32, rows: u32) -> Self {
        Self {
            row_offset,
            rows,
            ..self
        }
    }
}

/// Per-pixel shader output.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct GpuCell {
    pub iterations: u32,
    /// One of `CELL_BOUNDED`, `CELL_ESCAPED`, `CELL_UNCERTAIN`.
    pub status: u32,
    /// |z|^2 at escape as a double-single pair.
    pub norm_sq_hi: f32,
    pub norm_sq_lo: f32,
}

impl GpuCell {
    /// |z|^2 at escape, widened back to f64.
    pub fn norm_sq(&self) -> f64 {
        self.norm_sq_hi as f64 + self.norm_sq_lo as f64
    }
}

/// Buffers for one chunk of rows. Reused while the chunk shape is unchanged.
pub struct EscapeBuffers {
    pub uniforms: wgpu::Buffer,
    pub cells: wgpu::Buffer,
    pub staging: wgpu::Buffer,
    pub width: u32,
    pub rows: u32,
}

impl EscapeBuffers {
    pub fn new(device: &wgpu::Device, width: u32, rows: u32) -> Self {
        let size = Self::cells_size(width, rows);

        let uniforms = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("escape_uniforms"),
            size: std::mem::size_of::<EscapeUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let cells = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("escape_cells"),
            size,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });

        let staging = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("escape_staging"),
            size,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Self {
            uniforms,
            cells,
            staging,
            width,
            rows,
        }
    }

    pub fn cells_size(width: u32, rows: u32) -> u64 {
        width as u64 * rows as u64 * std::mem::size_of::<GpuCell>() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fracterm_core::{Coordinate, PrecisionTier};

    #[test]
    fn uniforms_are_sixteen_byte_aligned() {
        assert_eq!(std::mem::size_of::<EscapeUniforms>() % 16, 0);
        assert_eq!(std::mem::size_of::<GpuCell>(), 16);
    }

    #[test]
    fn split_keeps_more_than_single_precision() {
        let value = 0.1_f64;
        let (hi, lo) = split_f64(value);
        assert_ne!(lo, 0.0);
        let rebuilt = hi as f64 + lo as f64;
        assert!((rebuilt - value).abs() < 1e-15);
        assert!((hi as f64 - value).abs() > 1e-10);
    }

    #[test]
    fn inexact_bailout_square_keeps_its_low_word() {
        let center = Coordinate::from_f64(0.0, 0.0, PrecisionTier::Native).unwrap();
        let viewport = Viewport::new(center, 1.0, 8, 8).unwrap();
        let params = FractalParams::new(Formula::Mandelbrot, 10, 2.1).unwrap();
        let u = EscapeUniforms::new(&viewport, &params);
        assert_ne!(u.bailout_sq_lo, 0.0);
        let rebuilt = u.bailout_sq_hi as f64 + u.bailout_sq_lo as f64;
        assert!((rebuilt - 2.1 * 2.1).abs() < 1e-13);
    }

    #[test]
    fn cell_norm_widens_both_words() {
        let (hi, lo) = split_f64(4.000_000_123_456_789);
        let cell = GpuCell {
            iterations: 3,
            status: CELL_ESCAPED,
            norm_sq_hi: hi,
            norm_sq_lo: lo,
        };
        assert!((cell.norm_sq() - 4.000_000_123_456_789).abs() < 1e-13);
    }

    #[test]
    fn uniforms_carry_formula_and_view() {
        let center = Coordinate::from_f64(-0.5, 0.25, PrecisionTier::Native).unwrap();
        let viewport = Viewport::new(center, 2.0, 80, 40).unwrap();
        let params = FractalParams::new(Formula::PowerN { exponent: 4 }, 300, 3.0).unwrap();
        let u = EscapeUniforms::new(&viewport, &params).for_rows(8, 4);
        assert_eq!((u.width, u.height, u.row_offset, u.rows), (80, 40, 8, 4));
        assert_eq!((u.formula, u.exponent), (FORMULA_POWER_N, 4));
        assert_eq!(u.center_re_hi, -0.5);
        assert_eq!((u.bailout_sq_hi, u.bailout_sq_lo), (9.0, 0.0));
        assert_eq!(u.max_iterations, 300);
    }
}
