use std::ops::Range;

use glam::{Mat4, Vec4};
use rack_engine::coords::Viewport;
use rack_engine::render::{BlendMode, Rasterizer, RenderBatchExecutor, decode_frame};
use rack_proto::{
    Camera2D, DrawError, FrameBuilder, ProgramId, ResourceError, Rgba8, TexturedVertex, Topology,
    VertexLayout, VertexPool,
};

/// Counts calls and keeps the last view so clip positions can be checked.
#[derive(Default)]
struct Counting {
    msdf_ready: bool,
    uploaded: usize,
    binds: Vec<ProgramId>,
    blends: Vec<BlendMode>,
    atlas_binds: u32,
    projection: Mat4,
    views: Vec<Mat4>,
    draws: Vec<(Topology, Range<u32>)>,
}

impl Rasterizer for Counting {
    fn upload_vertices(&mut self, pool: &VertexPool<'_>) {
        self.uploaded = pool.as_bytes().len();
    }

    fn has_program(&self, program: ProgramId) -> bool {
        program == ProgramId::FLAT || (program == ProgramId::MSDF_TEXT && self.msdf_ready)
    }

    fn bind_program(&mut self, program: ProgramId) {
        self.binds.push(program);
    }

    fn set_blend(&mut self, blend: BlendMode) {
        self.blends.push(blend);
    }

    fn bind_atlas(&mut self) {
        self.atlas_binds += 1;
    }

    fn upload_projection(&mut self, projection: &Mat4) {
        self.projection = *projection;
    }

    fn upload_view(&mut self, view: &Mat4) {
        self.views.push(*view);
    }

    fn draw(&mut self, topology: Topology, vertices: Range<u32>) {
        self.draws.push((topology, vertices));
    }
}

fn build_scene(frame: &mut FrameBuilder<TexturedVertex>) {
    frame.push_rect([0.0, 0.0], [100.0, 20.0], Rgba8::new(40, 40, 48, 255));
    frame.push_glyph([4.0, 4.0], [16.0, 18.0], (1, 1), (12, 15), Rgba8::WHITE);
    frame.push_glyph([16.0, 4.0], [28.0, 18.0], (14, 1), (25, 15), Rgba8::WHITE);
    frame.push_line_strip(&[[0.0, 30.0], [50.0, 40.0], [100.0, 30.0]], Rgba8::WHITE);
}

#[test]
fn builder_output_replays_in_order() {
    let mut frame = FrameBuilder::<TexturedVertex>::new();
    build_scene(&mut frame);
    let out = frame.finish();

    let (pool, draws) = decode_frame(
        VertexLayout::Textured,
        out.vertex_bytes,
        out.vertex_count,
        out.draw_bytes,
        out.draw_count,
    )
    .unwrap();

    let mut gpu = Counting {
        msdf_ready: true,
        ..Default::default()
    };
    let mut exec = RenderBatchExecutor::new();
    let report = exec.execute(&mut gpu, &pool, &draws, Viewport::new(800.0, 600.0));

    assert!(report.is_clean());
    // rect, both glyphs merged, strip
    assert_eq!(report.draws_issued, 3);
    assert_eq!(gpu.binds, vec![ProgramId::FLAT, ProgramId::MSDF_TEXT, ProgramId::FLAT]);
    assert_eq!(report.program_binds, 3);
    assert_eq!(gpu.blends, vec![BlendMode::Opaque, BlendMode::Alpha, BlendMode::Opaque]);
    assert_eq!(gpu.atlas_binds, 1);
    assert_eq!(gpu.uploaded, out.vertex_bytes.len());

    let ranges: Vec<_> = gpu.draws.iter().map(|(_, r)| r.clone()).collect();
    assert_eq!(ranges, vec![0..6, 6..18, 18..21]);
    assert_eq!(gpu.draws[2].0, Topology::LineStrip);
}

#[test]
fn text_without_atlas_is_skipped_not_fatal() {
    let mut frame = FrameBuilder::<TexturedVertex>::new();
    build_scene(&mut frame);
    let out = frame.finish();
    let (pool, draws) = decode_frame(
        VertexLayout::Textured,
        out.vertex_bytes,
        out.vertex_count,
        out.draw_bytes,
        out.draw_count,
    )
    .unwrap();

    let mut gpu = Counting::default();
    let mut exec = RenderBatchExecutor::new();
    let report = exec.execute(&mut gpu, &pool, &draws, Viewport::new(800.0, 600.0));

    assert_eq!(report.draws_issued, 2);
    assert_eq!(report.draws_skipped, 1);
    assert_eq!(report.skipped[0].index, 1);
    assert_eq!(
        report.skipped[0].error,
        DrawError::Resource(ResourceError::PipelineUnavailable(ProgramId::MSDF_TEXT.0))
    );
    // flat stays bound across the skipped draw
    assert_eq!(gpu.binds, vec![ProgramId::FLAT]);
    assert_eq!(gpu.atlas_binds, 0);
}

#[test]
fn camera_view_reaches_the_rasterizer() {
    let mut frame = FrameBuilder::<TexturedVertex>::new();
    frame.push_rect([0.0, 0.0], [10.0, 10.0], Rgba8::WHITE);
    let camera = Camera2D {
        offset: [400.0, 300.0],
        target: [100.0, 0.0],
        zoom: 2.0,
        ..Default::default()
    };
    frame.begin_camera(&camera);
    frame.push_rect([100.0, 0.0], [10.0, 10.0], Rgba8::WHITE);
    frame.end_camera();
    let out = frame.finish();

    let (pool, draws) = decode_frame(
        VertexLayout::Textured,
        out.vertex_bytes,
        out.vertex_count,
        out.draw_bytes,
        out.draw_count,
    )
    .unwrap();
    let mut gpu = Counting::default();
    RenderBatchExecutor::new().execute(&mut gpu, &pool, &draws, Viewport::new(800.0, 600.0));

    assert_eq!(gpu.views.len(), 2);
    assert_eq!(gpu.views[0], Mat4::IDENTITY);

    // the camera target lands where camera.view() puts it
    let expected = camera.view().apply([100.0, 0.0]);
    let p = gpu.views[1] * Vec4::new(100.0, 0.0, 0.0, 1.0);
    assert!((p.x - expected[0]).abs() < 1e-4);
    assert!((p.y - expected[1]).abs() < 1e-4);

    // and the projection maps the top-left corner to clip (-1, 1)
    let c = gpu.projection * Vec4::new(0.0, 0.0, 0.0, 1.0);
    assert!((c.x + 1.0).abs() < 1e-6 && (c.y - 1.0).abs() < 1e-6);
}
