use rack_proto::{DrawStream, FrameOutput, PoolVertex, ProtocolError, VertexLayout, VertexPool};

use super::atlas::{AtlasError, FontAtlas};
use super::ctx::{RenderCtx, RenderTarget};
use super::executor::{FrameReport, RenderBatchExecutor};
use super::msdf::ATLAS_SIZE;
use super::wgpu_backend::WgpuBackend;

/// Per-session renderer settings.
#[derive(Debug, Clone, Copy)]
pub struct RendererConfig {
    /// Layout every frame's vertex pool must use.
    pub layout: VertexLayout,
    /// Cleared before the frame's draws.
    pub clear_color: wgpu::Color,
    /// Edge length the session's packed texel coordinates address.
    pub atlas_size: u32,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            layout: VertexLayout::Textured,
            clear_color: wgpu::Color {
                r: 0.02,
                g: 0.02,
                b: 0.025,
                a: 1.0,
            },
            atlas_size: ATLAS_SIZE,
        }
    }
}

/// Validates a frame's two buffers against the session layout.
///
/// Only whole-frame failures are reported here: a truncated pool or stream.
/// Per-record problems surface later, one draw at a time.
pub fn decode_frame<'a>(
    layout: VertexLayout,
    vertex_bytes: &'a [u8],
    vertex_count: u32,
    draw_bytes: &'a [u8],
    draw_count: u32,
) -> Result<(VertexPool<'a>, DrawStream<'a>), ProtocolError> {
    let pool = VertexPool::new(vertex_bytes, vertex_count, layout)?;
    let draws = DrawStream::new(draw_bytes, draw_count)?;
    Ok((pool, draws))
}

/// Renders one frame per call: clear, then every draw of the stream in order.
pub struct FrameRenderer {
    config: RendererConfig,
    backend: WgpuBackend,
    executor: RenderBatchExecutor,
}

impl FrameRenderer {
    pub fn new(config: RendererConfig) -> Self {
        Self {
            backend: WgpuBackend::new(config.layout),
            executor: RenderBatchExecutor::new(),
            config,
        }
    }

    #[inline]
    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    /// Report of the last rendered frame.
    #[inline]
    pub fn last_report(&self) -> &FrameReport {
        self.executor.report()
    }

    /// Uploads the glyph atlas used by the text program. Until this is
    /// called, text draws are skipped.
    pub fn set_atlas(&mut self, ctx: &RenderCtx<'_>, atlas: &FontAtlas) -> Result<(), AtlasError> {
        if atlas.size() != self.config.atlas_size {
            return Err(AtlasError::SizeMismatch {
                expected: self.config.atlas_size,
                got: atlas.size(),
            });
        }
        self.backend.set_atlas(ctx, atlas);
        Ok(())
    }

    /// Renders the raw buffers of one frame into `target`.
    ///
    /// On `Err` the target is still cleared but nothing is drawn. Skipped
    /// draws are not errors; they are listed in the returned report.
    pub fn render(
        &mut self,
        ctx: &RenderCtx<'_>,
        vertex_bytes: &[u8],
        vertex_count: u32,
        draw_bytes: &[u8],
        draw_count: u32,
        target: &mut RenderTarget<'_>,
    ) -> Result<&FrameReport, ProtocolError> {
        let (pool, draws) =
            match decode_frame(self.config.layout, vertex_bytes, vertex_count, draw_bytes, draw_count) {
                Ok(frame) => frame,
                Err(err) => {
                    log::error!("frame rejected: {err}");
                    self.clear(target);
                    return Err(err);
                }
            };

        self.backend
            .prepare(ctx, pool.as_bytes().len() as u64, draws.len() as u32);

        let viewport = target.viewport;
        {
            let mut pass = self.begin_pass(target);
            let mut rasterizer = self.backend.rasterizer(ctx, &mut pass);
            self.executor.execute(&mut rasterizer, &pool, &draws, viewport);
        }
        self.backend.finish(ctx);

        Ok(self.executor.report())
    }

    /// Renders a frame produced by a [`rack_proto::FrameBuilder`].
    pub fn render_frame<V: PoolVertex>(
        &mut self,
        ctx: &RenderCtx<'_>,
        frame: &FrameOutput<'_, V>,
        target: &mut RenderTarget<'_>,
    ) -> Result<&FrameReport, ProtocolError> {
        if V::LAYOUT != self.config.layout {
            let err = ProtocolError::LayoutMismatch {
                expected: self.config.layout,
                found: V::LAYOUT,
            };
            log::error!("frame rejected: {err}");
            self.clear(target);
            return Err(err);
        }
        self.render(
            ctx,
            frame.vertex_bytes,
            frame.vertex_count,
            frame.draw_bytes,
            frame.draw_count,
            target,
        )
    }

    fn clear(&self, target: &mut RenderTarget<'_>) {
        let _pass = self.begin_pass(target);
    }

    fn begin_pass<'t>(&self, target: &'t mut RenderTarget<'_>) -> wgpu::RenderPass<'t> {
        target.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("rack frame pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target.color_view,
                resolve_target: None,
                depth_slice: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(self.config.clear_color),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use rack_proto::{
        DrawCommand, DrawStreamWriter, FlatVertex, ProgramId, RECORD_SIZE, Rgba8, StreamKind, Topology,
        Transform,
    };

    use super::*;

    fn one_draw() -> DrawStreamWriter {
        let mut w = DrawStreamWriter::new();
        w.push(&DrawCommand {
            transform: Transform::IDENTITY,
            program: ProgramId::FLAT,
            topology: Topology::TriangleList,
            vertex_offset: 0,
            vertex_count: 3,
        });
        w
    }

    fn tri() -> [FlatVertex; 3] {
        [[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]].map(|pos| FlatVertex {
            pos,
            color: Rgba8::WHITE,
        })
    }

    #[test]
    fn well_formed_frame_decodes() {
        let w = one_draw();
        let verts = tri();
        let (pool, draws) = decode_frame(
            VertexLayout::Flat,
            bytemuck::cast_slice(&verts),
            3,
            w.as_bytes(),
            1,
        )
        .unwrap();
        assert_eq!(pool.len(), 3);
        assert_eq!(draws.len(), 1);
    }

    #[test]
    fn short_draw_stream_fails_the_frame() {
        let w = one_draw();
        let verts = tri();
        let err = decode_frame(
            VertexLayout::Flat,
            bytemuck::cast_slice(&verts),
            3,
            &w.as_bytes()[..RECORD_SIZE - 1],
            1,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::Truncated {
                stream: StreamKind::Draws,
                ..
            }
        ));
    }

    #[test]
    fn short_vertex_pool_fails_the_frame() {
        let w = one_draw();
        let verts = tri();
        // textured stride needs 48 bytes for three vertices, flat data has 36
        let err = decode_frame(
            VertexLayout::Textured,
            bytemuck::cast_slice(&verts),
            3,
            w.as_bytes(),
            1,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::Truncated {
                stream: StreamKind::Vertices,
                ..
            }
        ));
    }

    #[test]
    fn default_config_matches_texel_packing() {
        let c = RendererConfig::default();
        assert_eq!(c.layout, VertexLayout::Textured);
        assert_eq!(c.atlas_size, ATLAS_SIZE);
    }
}
