//! High-level GPU renderer API.

use std::time::{Duration, Instant};

use fracterm_compute::{evaluate, smoothing, CancellationChecker, GenerationToken};
use fracterm_core::{FractalParams, IterationBuffer, IterationCell, PixelRect, Viewport};

use crate::buffers::{EscapeBuffers, EscapeUniforms, GpuCell, CELL_BOUNDED, CELL_ESCAPED};
use crate::device::GpuContext;
use crate::error::GpuError;
use crate::pipeline::EscapePipeline;

/// Longest the renderer waits for one frame before declaring the device hung.
pub const READBACK_TIMEOUT: Duration = Duration::from_secs(15);

/// Pixels per submission. Short submissions keep the driver watchdog quiet
/// and give cancellation a chance between chunks.
const CHUNK_PIXELS: u32 = 1 << 16;

/// Renders whole frames on one device, a chunk of rows at a time.
///
/// Cells the device flags as uncertain are evaluated on the host, so a frame
/// carries the same iteration counts the CPU backend would produce.
pub struct GpuRenderer {
    context: GpuContext,
    pipeline: EscapePipeline,
    buffers: Option<EscapeBuffers>,
}

impl GpuRenderer {
    pub fn new(context: GpuContext) -> Self {
        let pipeline = EscapePipeline::new(&context.device);
        Self {
            context,
            pipeline,
            buffers: None,
        }
    }

    pub fn adapter_name(&self) -> &str {
        &self.context.adapter_name
    }

    /// Rows per chunk for a frame of the given width.
    pub fn chunk_rows(width: u32, height: u32) -> u32 {
        (CHUNK_PIXELS / width.max(1)).clamp(1, height.max(1))
    }

    /// Evaluate every pixel of `viewport`. Checks `token` between chunks.
    pub fn render(
        &mut self,
        viewport: &Viewport,
        params: &FractalParams,
        token: &GenerationToken,
    ) -> Result<IterationBuffer, GpuError> {
        let started = Instant::now();
        let deadline = started + READBACK_TIMEOUT;
        let width = viewport.width();
        let height = viewport.height();
        let chunk_rows = Self::chunk_rows(width, height);
        self.ensure_buffers(width, chunk_rows)?;

        let base = EscapeUniforms::new(viewport, params);
        let degree = params.formula.degree();
        let mut cells =
            vec![IterationCell::bounded(params.max_iterations); width as usize * height as usize];
        let mut uncertain = Vec::new();

        for block in PixelRect::row_blocks(width, height, chunk_rows) {
            if token.is_cancelled() {
                return Err(GpuError::Cancelled(token.generation()));
            }
            let chunk = self.run_chunk(base.for_rows(block.y, block.height), deadline)?;
            let range = block.cell_range(width);
            let start = range.start;
            let target = cells
                .get_mut(range)
                .filter(|target| target.len() == chunk.len())
                .ok_or_else(|| GpuError::Unavailable("readback size mismatch".into()))?;

            for (offset, (slot, cell)) in target.iter_mut().zip(&chunk).enumerate() {
                *slot = match cell.status {
                    CELL_ESCAPED => IterationCell::escaped(
                        cell.iterations,
                        smoothing(cell.norm_sq(), params.bailout, degree),
                    ),
                    CELL_BOUNDED => IterationCell::bounded(params.max_iterations),
                    _ => {
                        uncertain.push(start + offset);
                        continue;
                    }
                };
            }
        }

        let rechecked = uncertain.len();
        for index in uncertain {
            if token.is_cancelled() {
                return Err(GpuError::Cancelled(token.generation()));
            }
            let px = (index % width as usize) as u32;
            let py = (index / width as usize) as u32;
            let coord = viewport.pixel_to_coordinate(px, py)?;
            cells[index] = evaluate(&coord, params)?;
        }

        log::debug!(
            "gpu frame {}x{} in {:?} ({} rows per chunk, {} cells rechecked on host)",
            width,
            height,
            started.elapsed(),
            chunk_rows,
            rechecked
        );
        IterationBuffer::from_cells(width, height, params.max_iterations, cells)
            .ok_or_else(|| GpuError::Unavailable("readback size mismatch".into()))
    }

    fn ensure_buffers(&mut self, width: u32, rows: u32) -> Result<(), GpuError> {
        if let Some(buffers) = &self.buffers {
            if buffers.width == width && buffers.rows == rows {
                return Ok(());
            }
        }
        let size = EscapeBuffers::cells_size(width, rows);
        let limit = self.context.device.limits().max_storage_buffer_binding_size as u64;
        if size > limit {
            return Err(GpuError::Unavailable(format!(
                "chunk needs {size} bytes, device allows {limit}"
            )));
        }
        self.buffers = Some(EscapeBuffers::new(&self.context.device, width, rows));
        Ok(())
    }

    fn run_chunk(
        &self,
        uniforms: EscapeUniforms,
        deadline: Instant,
    ) -> Result<Vec<GpuCell>, GpuError> {
        let buffers = self
            .buffers
            .as_ref()
            .ok_or_else(|| GpuError::Unavailable("buffers not allocated".into()))?;

        self.context
            .queue
            .write_buffer(&buffers.uniforms, 0, bytemuck::bytes_of(&uniforms));

        let bind_group = self
            .context
            .device
            .create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("escape_bind_group"),
                layout: &self.pipeline.bind_group_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: buffers.uniforms.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: buffers.cells.as_entire_binding(),
                    },
                ],
            });

        let mut encoder =
            self.context
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("escape_encoder"),
                });

        {
            let mut compute_pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("escape_pass"),
                timestamp_writes: None,
            });
            compute_pass.set_pipeline(&self.pipeline.compute_pipeline);
            compute_pass.set_bind_group(0, &bind_group, &[]);
            compute_pass.dispatch_workgroups(uniforms.width.div_ceil(8), uniforms.rows.div_ceil(8), 1);
        }

        let bytes = EscapeBuffers::cells_size(uniforms.width, uniforms.rows);
        encoder.copy_buffer_to_buffer(&buffers.cells, 0, &buffers.staging, 0, bytes);
        self.context.queue.submit(std::iter::once(encoder.finish()));

        self.read_cells(&buffers.staging, bytes, deadline)
    }

    /// Map the staging buffer, polling the device until the deadline.
    fn read_cells(
        &self,
        buffer: &wgpu::Buffer,
        bytes: u64,
        deadline: Instant,
    ) -> Result<Vec<GpuCell>, GpuError> {
        let slice = buffer.slice(..bytes);

        let (tx, mut rx) = futures_channel::oneshot::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });

        loop {
            let _ = self.context.device.poll(wgpu::Maintain::Poll);
            match rx.try_recv() {
                Ok(Some(result)) => {
                    result?;
                    break;
                }
                Ok(None) => {}
                Err(_) => return Err(GpuError::Unavailable("Channel closed".into())),
            }
            if Instant::now() >= deadline {
                return Err(GpuError::Timeout(READBACK_TIMEOUT));
            }
            std::thread::sleep(Duration::from_micros(250));
        }

        let data = {
            let view = slice.get_mapped_range();
            bytemuck::cast_slice(&view).to_vec()
        };
        buffer.unmap();

        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunks_cover_whole_rows() {
        assert_eq!(GpuRenderer::chunk_rows(800, 600), 81);
        assert_eq!(GpuRenderer::chunk_rows(100_000, 10), 1);
        assert_eq!(GpuRenderer::chunk_rows(10, 5), 5);
    }
}
