//! Multi-core CPU backend.

use fracterm_core::{IterationBuffer, IterationCell, PixelRect};
use rayon::prelude::*;

use crate::backend::{BackendError, BackendKind, ComputeBackend, FrameSnapshot};
use crate::cancellation::{CancellationChecker, GenerationToken};
use crate::evaluator::evaluate;

/// Evaluates frames on a fixed-size rayon pool, one band of rows per task.
///
/// Each band is computed into a local vector and copied into the shared
/// buffer only if the frame's generation is still current.
pub struct CpuBackend {
    pool: rayon::ThreadPool,
    rows_per_block: u32,
}

impl CpuBackend {
    /// `threads == 0` sizes the pool to the number of logical CPUs.
    pub fn new(threads: usize, rows_per_block: u32) -> Result<Self, BackendError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("fracterm-cpu-{i}"))
            .build()
            .map_err(|e| BackendError::Unavailable(e.to_string()))?;
        log::debug!(
            "CPU pool ready: {} threads, {} rows per block",
            pool.current_num_threads(),
            rows_per_block.max(1)
        );
        Ok(Self {
            pool,
            rows_per_block: rows_per_block.max(1),
        })
    }

    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    fn compute_block(
        snapshot: &FrameSnapshot,
        block: &PixelRect,
        token: &GenerationToken,
    ) -> Result<Vec<IterationCell>, BackendError> {
        let mut local = Vec::with_capacity(block.area() as usize);
        for y in block.y..block.y + block.height {
            if token.is_cancelled() {
                return Err(BackendError::Cancelled {
                    generation: token.generation(),
                });
            }
            for x in block.x..block.x + block.width {
                let coord = snapshot.viewport.pixel_to_coordinate(x, y)?;
                local.push(evaluate(&coord, &snapshot.params)?);
            }
        }
        Ok(local)
    }
}

impl ComputeBackend for CpuBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Cpu
    }

    fn check(&self, _snapshot: &FrameSnapshot) -> Result<(), BackendError> {
        Ok(())
    }

    fn compute(
        &self,
        snapshot: &FrameSnapshot,
        token: &GenerationToken,
    ) -> Result<IterationBuffer, BackendError> {
        let width = snapshot.viewport.width();
        let height = snapshot.viewport.height();
        let mut buffer = IterationBuffer::new(width, height, snapshot.params.max_iterations);
        let blocks = PixelRect::row_blocks(width, height, self.rows_per_block);
        let block_len = width as usize * self.rows_per_block as usize;

        self.pool.install(|| {
            buffer
                .cells_mut()
                .par_chunks_mut(block_len)
                .zip(blocks.par_iter())
                .try_for_each(|(cells, block)| {
                    let local = Self::compute_block(snapshot, block, token)?;
                    if token.is_cancelled() {
                        return Err(BackendError::Cancelled {
                            generation: token.generation(),
                        });
                    }
                    cells.copy_from_slice(&local);
                    Ok(())
                })
        })?;

        Ok(buffer)
    }
}
