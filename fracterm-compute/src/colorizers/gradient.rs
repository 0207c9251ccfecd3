//! Color gradients with positioned stops.

use fracterm_core::{InvalidParameters, Rgb};
use serde::{Deserialize, Serialize};

pub(crate) const LUT_SIZE: usize = 4096;

/// A color stop in the gradient.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ColorStop {
    pub position: f64,
    pub color: Rgb,
}

impl ColorStop {
    pub const fn new(position: f64, color: Rgb) -> Self {
        Self { position, color }
    }
}

/// Piecewise-linear RGB gradient over `[0, 1]`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Gradient {
    stops: Vec<ColorStop>,
}

impl Gradient {
    /// Create a gradient from color stops. Stops are sorted by position.
    /// Requires at least two stops with finite positions in `[0, 1]`.
    pub fn new(mut stops: Vec<ColorStop>) -> Result<Self, InvalidParameters> {
        validate_stops(&stops)?;
        stops.sort_by(|a, b| a.position.total_cmp(&b.position));
        Ok(Self { stops })
    }

    /// Evenly spaced stops that wrap: the last segment blends back into the
    /// first color so a cyclic palette has no seam.
    pub fn cyclic(colors: &[Rgb]) -> Result<Self, InvalidParameters> {
        let n = colors.len();
        if n < 2 {
            return Err(InvalidParameters::TooFewStops(n));
        }
        let mut stops: Vec<ColorStop> = colors
            .iter()
            .enumerate()
            .map(|(i, &color)| ColorStop::new(i as f64 / n as f64, color))
            .collect();
        stops.push(ColorStop::new(1.0, colors[0]));
        Self::new(stops)
    }

    pub fn stops(&self) -> &[ColorStop] {
        &self.stops
    }

    /// Re-check invariants, e.g. after deserialization.
    pub fn validate(&self) -> Result<(), InvalidParameters> {
        validate_stops(&self.stops)?;
        if self.stops.windows(2).any(|w| w[0].position > w[1].position) {
            return Err(InvalidParameters::Setting {
                field: "gradient stops",
                expected: "sorted by position",
            });
        }
        Ok(())
    }

    /// Color at `t`, linearly interpolated between the enclosing stops.
    /// `t` outside `[0, 1]` takes the end colors.
    pub fn sample(&self, t: f64) -> Rgb {
        let (first, last) = match (self.stops.first(), self.stops.last()) {
            (Some(first), Some(last)) => (first, last),
            _ => return Rgb::BLACK,
        };
        if !(t > first.position) {
            return first.color;
        }
        if t >= last.position {
            return last.color;
        }

        let seg = self
            .stops
            .windows(2)
            .find(|w| t <= w[1].position)
            .unwrap_or(&self.stops[self.stops.len() - 2..]);
        let (lo, hi) = (seg[0], seg[1]);
        let span = hi.position - lo.position;
        let local = if span < 1e-12 {
            1.0
        } else {
            ((t - lo.position) / span).clamp(0.0, 1.0)
        };
        Rgb::new(
            lerp(lo.color.r, hi.color.r, local),
            lerp(lo.color.g, hi.color.g, local),
            lerp(lo.color.b, hi.color.b, local),
        )
    }

    /// Generate a 4096-entry lookup table.
    pub fn to_lut(&self) -> Vec<Rgb> {
        (0..LUT_SIZE)
            .map(|i| self.sample(i as f64 / (LUT_SIZE - 1) as f64))
            .collect()
    }
}

impl Default for Gradient {
    /// Black to white.
    fn default() -> Self {
        Self {
            stops: vec![
                ColorStop::new(0.0, Rgb::BLACK),
                ColorStop::new(1.0, Rgb::WHITE),
            ],
        }
    }
}

fn validate_stops(stops: &[ColorStop]) -> Result<(), InvalidParameters> {
    if stops.len() < 2 {
        return Err(InvalidParameters::TooFewStops(stops.len()));
    }
    if let Some(bad) = stops
        .iter()
        .find(|s| !s.position.is_finite() || !(0.0..=1.0).contains(&s.position))
    {
        return Err(InvalidParameters::StopPosition(bad.position));
    }
    Ok(())
}

fn lerp(a: u8, b: u8, t: f64) -> u8 {
    (a as f64 + (b as f64 - a as f64) * t)
        .round()
        .clamp(0.0, 255.0) as u8
}
