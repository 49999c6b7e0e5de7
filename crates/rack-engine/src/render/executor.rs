//! Replays a decoded draw stream against a [`Rasterizer`].
//!
//! Draws are issued strictly in stream order. A draw that cannot be issued
//! (unknown topology, vertex range past the pool, program without a pipeline)
//! is skipped and recorded in the [`FrameReport`]; the rest of the frame
//! still renders. Draws with no vertices are dropped silently.

use std::ops::Range;

use glam::Mat4;
use rack_proto::{DrawError, DrawStream, ProgramId, ResourceError, Topology, VertexPool};

use crate::coords::Viewport;

use super::programs::{BlendMode, ProgramState, effects_of};
use super::projection::{pixel_projection, view_matrix};

/// The operations the executor needs from a GPU back-end.
///
/// Calls arrive in a fixed order per frame: one `upload_vertices`, then per
/// draw an optional program switch (`bind_program`, `upload_projection`,
/// `set_blend`, maybe `bind_atlas`), `upload_view` and `draw`.
pub trait Rasterizer {
    fn upload_vertices(&mut self, pool: &VertexPool<'_>);

    /// Whether `program` can be bound right now.
    fn has_program(&self, program: ProgramId) -> bool;

    fn bind_program(&mut self, program: ProgramId);
    fn set_blend(&mut self, blend: BlendMode);
    fn bind_atlas(&mut self);
    fn upload_projection(&mut self, projection: &Mat4);
    fn upload_view(&mut self, view: &Mat4);

    /// Draws pool vertices `vertices` (already bounds-checked).
    fn draw(&mut self, topology: Topology, vertices: Range<u32>);
}

/// A draw that was not issued.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct SkippedDraw {
    /// Position in the draw stream.
    pub index: u32,
    pub error: DrawError,
}

/// What one frame did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameReport {
    pub draws_issued: u32,
    pub draws_skipped: u32,
    pub program_binds: u32,
    pub skipped: Vec<SkippedDraw>,
}

impl FrameReport {
    fn reset(&mut self) {
        self.draws_issued = 0;
        self.draws_skipped = 0;
        self.program_binds = 0;
        self.skipped.clear();
    }

    #[inline]
    pub fn is_clean(&self) -> bool {
        self.draws_skipped == 0
    }
}

/// Runs frames. Keep one per renderer; the report buffer is reused.
#[derive(Debug, Default)]
pub struct RenderBatchExecutor {
    state: ProgramState,
    report: FrameReport,
}

impl RenderBatchExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Program currently bound on the rasterizer, as far as the executor knows.
    pub fn state(&self) -> ProgramState {
        self.state
    }

    pub fn report(&self) -> &FrameReport {
        &self.report
    }

    /// Issues every draw of `draws` against `pool` for a target of `viewport`.
    pub fn execute<R: Rasterizer>(
        &mut self,
        rasterizer: &mut R,
        pool: &VertexPool<'_>,
        draws: &DrawStream<'_>,
        viewport: Viewport,
    ) -> &FrameReport {
        self.report.reset();
        // a new pass starts with nothing bound
        self.state = ProgramState::NoProgramBound;

        rasterizer.upload_vertices(pool);
        let projection = pixel_projection(viewport);

        for (index, item) in draws.iter().enumerate() {
            let index = index as u32;

            let cmd = match item {
                Ok(cmd) => cmd,
                Err(err) => {
                    self.skip(index, err.into());
                    continue;
                }
            };

            let range = match pool.check_range(cmd.vertex_offset, cmd.vertex_count) {
                Ok(range) => range,
                Err(err) => {
                    self.skip(index, err.into());
                    continue;
                }
            };
            // nothing to rasterize, and an empty pool has no vertex buffer bound
            if range.is_empty() {
                continue;
            }

            let Some(effects) = effects_of(cmd.program).filter(|_| rasterizer.has_program(cmd.program))
            else {
                self.skip(index, ResourceError::PipelineUnavailable(cmd.program.0).into());
                continue;
            };

            if let Some(effects) = self.state.transition(effects) {
                rasterizer.bind_program(effects.program);
                rasterizer.upload_projection(&projection);
                rasterizer.set_blend(effects.blend);
                if effects.atlas {
                    rasterizer.bind_atlas();
                }
                self.state = effects.state;
                self.report.program_binds += 1;
            }

            rasterizer.upload_view(&view_matrix(&cmd.transform));
            rasterizer.draw(cmd.topology, range);
            self.report.draws_issued += 1;
        }

        &self.report
    }

    fn skip(&mut self, index: u32, error: DrawError) {
        log::warn!("draw {index} skipped: {error}");
        self.report.draws_skipped += 1;
        self.report.skipped.push(SkippedDraw { index, error });
    }
}
