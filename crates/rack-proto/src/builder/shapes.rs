use std::f32::consts::{PI, TAU};

use super::FrameBuilder;
use crate::draw::{ProgramId, Topology};
use crate::vertex::{PackedTexCoord, PoolVertex, Rgba8, TexturedVertex};

const CIRCLE_SEGMENTS: u32 = 16;
const CORNER_SEGMENTS: u32 = 4;
const SPLINE_SEGMENTS: u32 = 16;

impl<V: PoolVertex> FrameBuilder<V> {
    pub fn push_triangle(&mut self, a: [f32; 2], b: [f32; 2], c: [f32; 2], color: Rgba8) {
        self.start_batch(ProgramId::FLAT, Topology::TriangleList);
        self.triangle(a, b, c, color);
    }

    /// Quad from corners laid out as
    ///
    /// ```text
    /// a ---- b
    /// |      |
    /// c ---- d
    /// ```
    pub fn push_quad(&mut self, a: [f32; 2], b: [f32; 2], c: [f32; 2], d: [f32; 2], color: Rgba8) {
        self.start_batch(ProgramId::FLAT, Topology::TriangleList);
        self.quad(a, b, c, d, color);
    }

    /// Axis-aligned rectangle, top-left `pos`.
    pub fn push_rect(&mut self, pos: [f32; 2], size: [f32; 2], color: Rgba8) {
        self.push_rect_rotated(pos, size, [0.0, 0.0], 0.0, color);
    }

    /// Rectangle rotated by `radians` around `origin` (relative to its top-left),
    /// with `origin` placed at `pos`.
    pub fn push_rect_rotated(
        &mut self,
        pos: [f32; 2],
        size: [f32; 2],
        origin: [f32; 2],
        radians: f32,
        color: Rgba8,
    ) {
        self.start_batch(ProgramId::FLAT, Topology::TriangleList);

        let (s, c) = radians.sin_cos();
        let corner = |x: f32, y: f32| {
            let (x, y) = (x - origin[0], y - origin[1]);
            [pos[0] + x * c - y * s, pos[1] + x * s + y * c]
        };

        let v00 = corner(0.0, 0.0);
        let v10 = corner(size[0], 0.0);
        let v01 = corner(0.0, size[1]);
        let v11 = corner(size[0], size[1]);
        self.quad(v00, v10, v01, v11, color);
    }

    pub fn push_circle(&mut self, center: [f32; 2], radius: f32, color: Rgba8) {
        self.start_batch(ProgramId::FLAT, Topology::TriangleList);
        self.arc(center, radius, 0.0, TAU, CIRCLE_SEGMENTS, color);
    }

    /// Rectangle with circular corners. `roundness` in `[0, 1]` scales the
    /// corner radius up to half the shorter side; zero draws nothing.
    pub fn push_rounded_rect(&mut self, pos: [f32; 2], size: [f32; 2], roundness: f32, color: Rgba8) {
        let roundness = roundness.min(1.0);
        let radius = size[0].min(size[1]) * roundness / 2.0;
        if radius <= 0.0 {
            return;
        }

        self.start_batch(ProgramId::FLAT, Topology::TriangleList);

        let [x, y] = pos;
        let [w, h] = size;
        let c00 = [x + radius, y + radius];
        let c01 = [x + radius, y + h - radius];
        let c10 = [x + w - radius, y + radius];
        let c11 = [x + w - radius, y + h - radius];

        // center, then left / right / top / bottom bands
        self.quad(c00, c10, c01, c11, color);
        self.quad([x, c00[1]], c00, [x, c01[1]], c01, color);
        self.quad(c10, [x + w, c10[1]], c11, [x + w, c11[1]], color);
        self.quad([c00[0], y], [c10[0], y], c00, c10, color);
        self.quad(c01, c11, [c01[0], y + h], [c11[0], y + h], color);

        self.arc(c00, radius, PI, PI * 1.5, CORNER_SEGMENTS, color);
        self.arc(c01, radius, PI * 0.5, PI, CORNER_SEGMENTS, color);
        self.arc(c10, radius, PI * 1.5, TAU, CORNER_SEGMENTS, color);
        self.arc(c11, radius, 0.0, PI * 0.5, CORNER_SEGMENTS, color);
    }

    pub fn push_line_strip(&mut self, points: &[[f32; 2]], color: Rgba8) {
        self.start_batch(ProgramId::FLAT, Topology::LineStrip);
        for &p in points {
            self.vertex(p, color);
        }
    }

    /// Quadratic Bézier from `p1` to `p3` with control `c2`, as a triangle strip
    /// of width `thickness`.
    pub fn push_spline_quadratic(
        &mut self,
        p1: [f32; 2],
        c2: [f32; 2],
        p3: [f32; 2],
        thickness: f32,
        color: Rgba8,
    ) {
        self.start_batch(ProgramId::FLAT, Topology::TriangleStrip);

        let step = 1.0 / SPLINE_SEGMENTS as f32;
        let mut previous = p1;
        for i in 1..=SPLINE_SEGMENTS {
            let t = step * i as f32;
            let a = (1.0 - t) * (1.0 - t);
            let b = 2.0 * (1.0 - t) * t;
            let c = t * t;
            let current = [
                a * p1[0] + b * c2[0] + c * p3[0],
                a * p1[1] + b * c2[1] + c * p3[1],
            ];

            let dx = current[0] - previous[0];
            let dy = current[1] - previous[1];
            let len = (dx * dx + dy * dy).sqrt();
            let k = if len > 0.0 { 0.5 * thickness / len } else { 0.0 };

            if i == 1 {
                self.vertex([previous[0] + dy * k, previous[1] - dx * k], color);
                self.vertex([previous[0] - dy * k, previous[1] + dx * k], color);
            }
            self.vertex([current[0] + dy * k, current[1] - dx * k], color);
            self.vertex([current[0] - dy * k, current[1] + dx * k], color);

            previous = current;
        }
    }

    fn triangle(&mut self, a: [f32; 2], b: [f32; 2], c: [f32; 2], color: Rgba8) {
        self.vertex(a, color);
        self.vertex(b, color);
        self.vertex(c, color);
    }

    fn quad(&mut self, a: [f32; 2], b: [f32; 2], c: [f32; 2], d: [f32; 2], color: Rgba8) {
        self.triangle(a, b, c, color);
        self.triangle(c, b, d, color);
    }

    fn arc(&mut self, center: [f32; 2], radius: f32, a0: f32, a1: f32, segments: u32, color: Rgba8) {
        let at = |i: u32| {
            let a = a0 + (a1 - a0) * (i as f32 / segments as f32);
            [center[0] + a.cos() * radius, center[1] + a.sin() * radius]
        };
        for i in 0..segments {
            self.triangle(center, at(i), at(i + 1), color);
        }
    }
}

impl FrameBuilder<TexturedVertex> {
    /// One MSDF glyph: screen rect `dst_min..dst_max` sampling the atlas texel
    /// rect `uv_min..uv_max`.
    pub fn push_glyph(
        &mut self,
        dst_min: [f32; 2],
        dst_max: [f32; 2],
        uv_min: (u16, u16),
        uv_max: (u16, u16),
        color: Rgba8,
    ) {
        self.start_batch(ProgramId::MSDF_TEXT, Topology::TriangleList);

        let a = ([dst_min[0], dst_min[1]], PackedTexCoord::new(uv_min.0, uv_min.1));
        let b = ([dst_max[0], dst_min[1]], PackedTexCoord::new(uv_max.0, uv_min.1));
        let c = ([dst_min[0], dst_max[1]], PackedTexCoord::new(uv_min.0, uv_max.1));
        let d = ([dst_max[0], dst_max[1]], PackedTexCoord::new(uv_max.0, uv_max.1));
        for (pos, uv) in [a, b, c, c, b, d] {
            self.vertex_uv(pos, color, uv);
        }
    }
}
