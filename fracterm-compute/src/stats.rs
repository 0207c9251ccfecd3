//! Per-frame statistics shown alongside the picture.

use std::time::Duration;

use fracterm_core::IterationBuffer;

/// Escape statistics of one frame. Bounded cells are left out of the
/// averages.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameStats {
    /// Mean iteration count of the escaped cells; zero when none escaped.
    pub average_iterations: f64,
    pub highest_iterations: u32,
    pub escaped_cells: usize,
    /// From the start of the render request to the colored frame.
    pub render_time: Duration,
}

impl FrameStats {
    pub fn collect(buffer: &IterationBuffer, render_time: Duration) -> Self {
        let (count, sum, highest) = buffer
            .cells()
            .iter()
            .filter(|cell| !cell.bounded)
            .fold((0usize, 0u64, 0u32), |(count, sum, highest), cell| {
                (
                    count + 1,
                    sum + cell.iterations as u64,
                    highest.max(cell.iterations),
                )
            });
        Self {
            average_iterations: if count == 0 {
                0.0
            } else {
                sum as f64 / count as f64
            },
            highest_iterations: highest,
            escaped_cells: count,
            render_time,
        }
    }
}
