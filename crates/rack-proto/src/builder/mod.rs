//! Frame builder: producer side of the vertex pool + draw stream.
//!
//! Primitives are appended to one shared vertex pool. Consecutive primitives
//! with the same program, topology and view are coalesced into one draw, so a
//! frame of a hundred rectangles is one draw record. Strip topologies always
//! start a new draw (concatenated strips would bridge unrelated geometry).
//!
//! Shape tessellation lives in [`shapes`].

mod shapes;

use crate::camera::Camera2D;
use crate::draw::{DrawCommand, ProgramId, Topology, Transform};
use crate::encode::DrawStreamWriter;
use crate::vertex::{PackedTexCoord, PoolVertex, Rgba8};

#[derive(Debug, Copy, Clone)]
struct Batch {
    program: ProgramId,
    topology: Topology,
    start: u32,
}

/// Records one frame's vertices and draws.
///
/// Reuse one builder across frames: [`begin_frame`](Self::begin_frame) keeps
/// both buffers' capacity.
#[derive(Debug)]
pub struct FrameBuilder<V: PoolVertex> {
    vertices: Vec<V>,
    draws: DrawStreamWriter,
    batch: Option<Batch>,
    view: Transform,
}

/// Finished frame, borrowed from the builder.
#[derive(Debug, Copy, Clone)]
pub struct FrameOutput<'a, V> {
    pub vertices: &'a [V],
    pub vertex_bytes: &'a [u8],
    pub vertex_count: u32,
    pub draw_bytes: &'a [u8],
    pub draw_count: u32,
}

impl<V: PoolVertex> Default for FrameBuilder<V> {
    fn default() -> Self {
        Self {
            vertices: Vec::new(),
            draws: DrawStreamWriter::new(),
            batch: None,
            view: Transform::IDENTITY,
        }
    }
}

impl<V: PoolVertex> FrameBuilder<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops the previous frame's contents. Capacity is kept.
    pub fn begin_frame(&mut self) {
        self.vertices.clear();
        self.draws.clear();
        self.batch = None;
        self.view = Transform::IDENTITY;
    }

    /// Draws recorded until [`end_camera`](Self::end_camera) use `camera`'s view.
    pub fn begin_camera(&mut self, camera: &Camera2D) {
        self.finish_batch();
        self.view = camera.view();
    }

    /// Returns to the identity view.
    pub fn end_camera(&mut self) {
        self.finish_batch();
        self.view = Transform::IDENTITY;
    }

    /// Appends pre-built vertices as one primitive run.
    pub fn push_vertices(&mut self, program: ProgramId, topology: Topology, vertices: &[V]) {
        self.start_batch(program, topology);
        self.vertices.extend_from_slice(vertices);
    }

    #[inline]
    pub fn vertex_count(&self) -> u32 {
        self.vertices.len() as u32
    }

    /// Draws finished so far; the open batch is not counted.
    #[inline]
    pub fn draw_count(&self) -> u32 {
        self.draws.count()
    }

    /// Closes the open batch and exposes both buffers.
    pub fn finish(&mut self) -> FrameOutput<'_, V> {
        self.finish_batch();
        FrameOutput {
            vertices: &self.vertices,
            vertex_bytes: bytemuck::cast_slice(&self.vertices),
            vertex_count: self.vertices.len() as u32,
            draw_bytes: self.draws.as_bytes(),
            draw_count: self.draws.count(),
        }
    }

    fn start_batch(&mut self, program: ProgramId, topology: Topology) {
        if let Some(b) = self.batch {
            if b.program == program && b.topology == topology && !topology.is_strip() {
                return;
            }
            self.finish_batch();
        }
        self.batch = Some(Batch {
            program,
            topology,
            start: self.vertex_count(),
        });
    }

    fn finish_batch(&mut self) {
        let Some(b) = self.batch.take() else { return };
        let count = self.vertex_count() - b.start;
        if count == 0 {
            return;
        }
        self.draws.push(&DrawCommand {
            transform: self.view,
            program: b.program,
            topology: b.topology,
            vertex_offset: b.start,
            vertex_count: count,
        });
    }

    #[inline]
    fn vertex(&mut self, pos: [f32; 2], color: Rgba8) {
        self.vertices.push(V::new(pos, color, PackedTexCoord::default()));
    }

    #[inline]
    fn vertex_uv(&mut self, pos: [f32; 2], color: Rgba8, uv: PackedTexCoord) {
        self.vertices.push(V::new(pos, color, uv));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::DrawStream;
    use crate::vertex::{FlatVertex, TexturedVertex};

    fn decode(out: &FrameOutput<'_, impl Copy>) -> Vec<DrawCommand> {
        DrawStream::new(out.draw_bytes, out.draw_count)
            .unwrap()
            .iter()
            .map(Result::unwrap)
            .collect()
    }

    #[test]
    fn consecutive_triangles_merge() {
        let mut b = FrameBuilder::<FlatVertex>::new();
        b.push_rect([0.0, 0.0], [10.0, 10.0], Rgba8::WHITE);
        b.push_circle([5.0, 5.0], 3.0, Rgba8::BLACK);
        let out = b.finish();

        let draws = decode(&out);
        assert_eq!(draws.len(), 1);
        assert_eq!(draws[0].vertex_offset, 0);
        assert_eq!(draws[0].vertex_count, 6 + 16 * 3);
        assert_eq!(out.vertex_count, 54);
    }

    #[test]
    fn strips_never_merge() {
        let mut b = FrameBuilder::<FlatVertex>::new();
        b.push_line_strip(&[[0.0, 0.0], [1.0, 1.0]], Rgba8::WHITE);
        b.push_line_strip(&[[2.0, 2.0], [3.0, 3.0], [4.0, 4.0]], Rgba8::WHITE);
        let out = b.finish();

        let draws = decode(&out);
        assert_eq!(draws.len(), 2);
        assert_eq!((draws[1].vertex_offset, draws[1].vertex_count), (2, 3));
        assert_eq!(draws[1].topology, Topology::LineStrip);
    }

    #[test]
    fn camera_splits_and_stamps_view() {
        let cam = Camera2D {
            offset: [100.0, 0.0],
            ..Camera2D::default()
        };
        let mut b = FrameBuilder::<FlatVertex>::new();
        b.push_rect([0.0, 0.0], [1.0, 1.0], Rgba8::WHITE);
        b.begin_camera(&cam);
        b.push_rect([0.0, 0.0], [1.0, 1.0], Rgba8::WHITE);
        b.end_camera();
        b.push_rect([0.0, 0.0], [1.0, 1.0], Rgba8::WHITE);
        let out = b.finish();

        let draws = decode(&out);
        assert_eq!(draws.len(), 3);
        assert_eq!(draws[0].transform, Transform::IDENTITY);
        assert_eq!(draws[1].transform, cam.view());
        assert_eq!(draws[2].transform, Transform::IDENTITY);
    }

    #[test]
    fn program_change_splits() {
        let mut b = FrameBuilder::<TexturedVertex>::new();
        b.push_rect([0.0, 0.0], [4.0, 4.0], Rgba8::WHITE);
        b.push_glyph([0.0, 0.0], [8.0, 8.0], (0, 0), (8, 8), Rgba8::WHITE);
        b.push_glyph([8.0, 0.0], [16.0, 8.0], (8, 0), (16, 8), Rgba8::WHITE);
        b.push_rect([0.0, 0.0], [4.0, 4.0], Rgba8::WHITE);
        let out = b.finish();

        let programs: Vec<_> = decode(&out).iter().map(|d| d.program).collect();
        assert_eq!(
            programs,
            vec![ProgramId::FLAT, ProgramId::MSDF_TEXT, ProgramId::FLAT]
        );
    }

    #[test]
    fn begin_frame_resets() {
        let mut b = FrameBuilder::<FlatVertex>::new();
        b.push_rect([0.0, 0.0], [1.0, 1.0], Rgba8::WHITE);
        b.finish();
        b.begin_frame();
        let out = b.finish();
        assert_eq!(out.vertex_count, 0);
        assert_eq!(out.draw_count, 0);
        assert!(out.draw_bytes.is_empty());
    }

    #[test]
    fn empty_batch_emits_nothing() {
        let mut b = FrameBuilder::<FlatVertex>::new();
        b.push_line_strip(&[], Rgba8::WHITE);
        b.push_rect([0.0, 0.0], [1.0, 1.0], Rgba8::WHITE);
        let out = b.finish();
        assert_eq!(out.draw_count, 1);
    }
}
