use serde::{Deserialize, Serialize};

use crate::error::{InvalidParameters, NumericDegenerate};
use crate::scalar::PrecisionTier;
use crate::Coordinate;

/// Plane distance covered by the shorter screen axis at scale 1.
pub const BASE_SPAN: f64 = 4.0;

/// Smallest magnification a zoom-out may reach.
pub const MIN_SCALE: f64 = 1e-3;

/// Largest magnification; keeps the pixel spacing a normal f64.
pub const MAX_SCALE: f64 = 1e290;

/// Window onto the complex plane.
///
/// - `center`: plane coordinate under the middle of the grid, at the active tier
/// - `scale`: linear magnification (> 0); `zoom_log2()` gives the log2 form
/// - `width`/`height`: pixel grid dimensions (> 0)
/// - `pixel_aspect`: height of one pixel relative to its width
///
/// Navigation never mutates in place; every operation returns a new state.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    center: Coordinate,
    scale: f64,
    width: u32,
    height: u32,
    pixel_aspect: f64,
}

fn check_scale(scale: f64) -> Result<f64, InvalidParameters> {
    if scale.is_finite() && (MIN_SCALE..=MAX_SCALE).contains(&scale) {
        Ok(scale)
    } else {
        Err(InvalidParameters::ZoomOutOfRange(scale))
    }
}

impl Viewport {
    pub fn new(
        center: Coordinate,
        scale: f64,
        width: u32,
        height: u32,
    ) -> Result<Self, InvalidParameters> {
        if width == 0 || height == 0 {
            return Err(InvalidParameters::Dimensions { width, height });
        }
        Ok(Self {
            center,
            scale: check_scale(scale)?,
            width,
            height,
            pixel_aspect: 1.0,
        })
    }

    /// Same view with non-square pixels (terminal cells are usually taller than wide).
    pub fn with_pixel_aspect(mut self, pixel_aspect: f64) -> Result<Self, InvalidParameters> {
        if !pixel_aspect.is_finite() || pixel_aspect <= 0.0 {
            return Err(InvalidParameters::PixelAspect(pixel_aspect));
        }
        self.pixel_aspect = pixel_aspect;
        Ok(self)
    }

    pub fn center(&self) -> &Coordinate {
        &self.center
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn zoom_log2(&self) -> f64 {
        self.scale.log2()
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixel_aspect(&self) -> f64 {
        self.pixel_aspect
    }

    pub fn tier(&self) -> PrecisionTier {
        self.center.tier()
    }

    /// Horizontal plane distance between adjacent pixels.
    pub fn spacing(&self) -> f64 {
        BASE_SPAN / (self.scale * self.width.min(self.height) as f64)
    }

    /// Vertical plane distance between adjacent pixels.
    pub fn spacing_y(&self) -> f64 {
        self.spacing() * self.pixel_aspect
    }

    /// Plane offset of a (possibly fractional) pixel position from the center.
    /// The imaginary axis points up while pixel rows grow downward.
    pub fn pixel_offset(&self, px: f64, py: f64) -> (f64, f64) {
        let dx = px - self.width as f64 / 2.0;
        let dy = py - self.height as f64 / 2.0;
        (dx * self.spacing(), -dy * self.spacing_y())
    }

    /// Largest component magnitude of any coordinate on screen.
    pub fn max_magnitude(&self) -> f64 {
        let half_w = self.width as f64 / 2.0 * self.spacing();
        let half_h = self.height as f64 / 2.0 * self.spacing_y();
        self.center.magnitude_hint() + half_w.max(half_h)
    }

    /// Map a pixel to its plane coordinate at the active tier.
    pub fn pixel_to_coordinate(&self, px: u32, py: u32) -> Result<Coordinate, NumericDegenerate> {
        let (d_re, d_im) = self.pixel_offset(px as f64, py as f64);
        if (d_re != 0.0 && d_re.is_subnormal()) || (d_im != 0.0 && d_im.is_subnormal()) {
            return Err(NumericDegenerate::Underflow);
        }
        self.center.offset(d_re, d_im)
    }

    /// Move the view by whole or fractional pixels; positive `dx` moves right,
    /// positive `dy` moves down.
    pub fn pan(&self, dx: f64, dy: f64) -> Result<Self, InvalidParameters> {
        if !dx.is_finite() || !dy.is_finite() {
            return Err(InvalidParameters::PanOffset);
        }
        let (d_re, d_im) = (dx * self.spacing(), -dy * self.spacing_y());
        Ok(Self {
            center: self.center.offset(d_re, d_im)?,
            ..self.clone()
        })
    }

    /// Magnify by `factor` keeping the plane coordinate under the pivot pixel fixed.
    pub fn zoom(&self, factor: f64, pivot_px: u32, pivot_py: u32) -> Result<Self, InvalidParameters> {
        if !factor.is_finite() || factor <= 0.0 {
            return Err(InvalidParameters::ZoomFactor(factor));
        }
        let scale = check_scale(self.scale * factor)?;
        let pivot = self.pixel_to_coordinate(pivot_px, pivot_py)?;
        let zoomed = Self {
            scale,
            ..self.clone()
        };
        let (d_re, d_im) = zoomed.pixel_offset(pivot_px as f64, pivot_py as f64);
        Ok(Self {
            center: pivot.offset(-d_re, -d_im)?,
            ..zoomed
        })
    }

    /// Replace the center; the new coordinate is re-expressed at the active tier.
    pub fn recenter(&self, center: Coordinate) -> Result<Self, InvalidParameters> {
        Ok(Self {
            center: center.to_tier(self.tier())?,
            ..self.clone()
        })
    }

    /// Change grid dimensions, keeping center and scale.
    pub fn resize(&self, width: u32, height: u32) -> Result<Self, InvalidParameters> {
        if width == 0 || height == 0 {
            return Err(InvalidParameters::Dimensions { width, height });
        }
        Ok(Self {
            width,
            height,
            ..self.clone()
        })
    }

    /// Same view with a different magnification about the center.
    pub fn with_scale(&self, scale: f64) -> Result<Self, InvalidParameters> {
        Ok(Self {
            scale: check_scale(scale)?,
            ..self.clone()
        })
    }

    /// Re-express the center at another tier.
    pub fn with_tier(&self, tier: PrecisionTier) -> Result<Self, NumericDegenerate> {
        Ok(Self {
            center: self.center.to_tier(tier)?,
            ..self.clone()
        })
    }

    /// Check that neighbouring pixels map to distinct coordinates.
    ///
    /// Probes the four corners and the middle, where the coordinate magnitude
    /// (and so the representation's unit) is largest or typical.
    pub fn resolution_probe(&self) -> Result<(), NumericDegenerate> {
        let last_x = self.width.saturating_sub(2);
        let last_y = self.height.saturating_sub(2);
        let probes = [
            (0, 0),
            (last_x, 0),
            (0, last_y),
            (last_x, last_y),
            (self.width / 2, self.height / 2),
        ];
        for (x, y) in probes {
            let here = self.pixel_to_coordinate(x, y)?;
            if x + 1 < self.width {
                let right = self.pixel_to_coordinate(x + 1, y)?;
                if here.re() == right.re() {
                    return Err(NumericDegenerate::Unresolvable { tier: self.tier() });
                }
            }
            if y + 1 < self.height {
                let below = self.pixel_to_coordinate(x, y + 1)?;
                if here.im() == below.im() {
                    return Err(NumericDegenerate::Unresolvable { tier: self.tier() });
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mandelbrot_home(tier: PrecisionTier) -> Viewport {
        let center = Coordinate::from_f64(-0.5, 0.0, tier).unwrap();
        Viewport::new(center, 1.0, 800, 600).unwrap()
    }

    #[test]
    fn center_pixel_maps_to_center() {
        let vp = mandelbrot_home(PrecisionTier::Native);
        let c = vp.pixel_to_coordinate(400, 300).unwrap();
        assert_eq!(c.to_f64_pair(), (-0.5, 0.0));
    }

    #[test]
    fn shorter_axis_spans_base_span() {
        let vp = mandelbrot_home(PrecisionTier::Native);
        let top = vp.pixel_to_coordinate(400, 0).unwrap().to_f64_pair().1;
        assert!((top - BASE_SPAN / 2.0).abs() < 1e-12);
        let left = vp.pixel_to_coordinate(0, 300).unwrap().to_f64_pair().0;
        assert!((left - (-0.5 - 800.0 / 600.0 * 2.0)).abs() < 1e-12);
    }

    #[test]
    fn pixel_aspect_stretches_vertical_spacing() {
        let vp = mandelbrot_home(PrecisionTier::Native)
            .with_pixel_aspect(2.0)
            .unwrap();
        assert_eq!(vp.spacing_y(), 2.0 * vp.spacing());
    }

    #[test]
    fn zero_dimensions_are_rejected() {
        let center = Coordinate::from_f64(0.0, 0.0, PrecisionTier::Native).unwrap();
        assert!(matches!(
            Viewport::new(center, 1.0, 0, 10),
            Err(InvalidParameters::Dimensions { .. })
        ));
    }

    #[test]
    fn zoom_keeps_pivot_fixed() {
        for tier in [
            PrecisionTier::Native,
            PrecisionTier::Extended,
            PrecisionTier::arbitrary(256),
        ] {
            let vp = mandelbrot_home(tier);
            let before = vp.pixel_to_coordinate(123, 77).unwrap();
            let after = vp.zoom(3.0, 123, 77).unwrap();
            let moved = after.pixel_to_coordinate(123, 77).unwrap();

            let (b_re, b_im) = before.to_f64_pair();
            let (m_re, m_im) = moved.to_f64_pair();
            assert!((b_re - m_re).abs() <= tier.ulp(b_re).max(PrecisionTier::Native.ulp(b_re)));
            assert!((b_im - m_im).abs() <= tier.ulp(b_im).max(PrecisionTier::Native.ulp(b_im)));
            assert_eq!(after.scale(), 3.0);
        }
    }

    #[test]
    fn zoom_rejects_bad_factors() {
        let vp = mandelbrot_home(PrecisionTier::Native);
        assert!(matches!(vp.zoom(0.0, 0, 0), Err(InvalidParameters::ZoomFactor(_))));
        assert!(matches!(vp.zoom(f64::NAN, 0, 0), Err(InvalidParameters::ZoomFactor(_))));
        assert!(matches!(vp.zoom(1e-6, 0, 0), Err(InvalidParameters::ZoomOutOfRange(_))));
    }

    #[test]
    fn pan_moves_center_by_pixels() {
        let vp = mandelbrot_home(PrecisionTier::Native);
        let panned = vp.pan(10.0, 0.0).unwrap();
        let expected = vp.pixel_to_coordinate(410, 300).unwrap();
        assert_eq!(panned.center(), &expected);
    }

    #[test]
    fn recenter_keeps_tier() {
        let vp = mandelbrot_home(PrecisionTier::Extended);
        let target = Coordinate::from_f64(0.25, 0.5, PrecisionTier::Native).unwrap();
        let moved = vp.recenter(target).unwrap();
        assert_eq!(moved.tier(), PrecisionTier::Extended);
        assert_eq!(moved.center().to_f64_pair(), (0.25, 0.5));
    }

    #[test]
    fn probe_detects_collapsed_pixels() {
        let vp = mandelbrot_home(PrecisionTier::Native);
        assert!(vp.resolution_probe().is_ok());

        let deep = vp.with_scale(1e17).unwrap();
        assert_eq!(
            deep.resolution_probe(),
            Err(NumericDegenerate::Unresolvable {
                tier: PrecisionTier::Native
            })
        );
        assert!(deep.with_tier(PrecisionTier::Extended).unwrap().resolution_probe().is_ok());
    }
}
