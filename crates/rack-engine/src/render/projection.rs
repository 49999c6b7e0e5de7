use glam::{Mat4, Vec3};
use rack_proto::Transform;

use crate::coords::Viewport;

/// Pixel space to clip space: `(0, 0)` is the top-left corner at `(-1, 1)`,
/// `(w, h)` the bottom-right at `(1, -1)`.
pub fn pixel_projection(viewport: Viewport) -> Mat4 {
    let Viewport { width, height } = viewport.clamped();
    Mat4::orthographic_rh(0.0, width, height, 0.0, -1.0, 1.0)
}

/// Draw-record transform (row-major) as a column-major matrix.
#[inline]
pub fn view_matrix(transform: &Transform) -> Mat4 {
    Mat4::from_cols_array(&transform.0).transpose()
}

/// Clip-space xy of a pixel-space point.
pub fn to_clip(projection: &Mat4, view: &Mat4, p: [f32; 2]) -> [f32; 2] {
    let clip = (*projection * *view).project_point3(Vec3::new(p[0], p[1], 0.0));
    [clip.x, clip.y]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: [f32; 2], b: [f32; 2]) -> bool {
        (a[0] - b[0]).abs() < 1e-6 && (a[1] - b[1]).abs() < 1e-6
    }

    #[test]
    fn corners_of_800x600() {
        let proj = pixel_projection(Viewport::new(800.0, 600.0));
        assert!(close(to_clip(&proj, &Mat4::IDENTITY, [0.0, 0.0]), [-1.0, 1.0]));
        assert!(close(to_clip(&proj, &Mat4::IDENTITY, [800.0, 600.0]), [1.0, -1.0]));
        assert!(close(to_clip(&proj, &Mat4::IDENTITY, [400.0, 300.0]), [0.0, 0.0]));
    }

    #[test]
    fn depth_stays_in_clip_range() {
        let proj = pixel_projection(Viewport::new(640.0, 480.0));
        let z = proj.project_point3(Vec3::new(10.0, 10.0, 0.0)).z;
        assert!((0.0..=1.0).contains(&z));
    }

    #[test]
    fn view_matrix_matches_row_major_apply() {
        let t = Transform::translation(30.0, -4.0) * Transform::rotation_z(0.7) * Transform::scale(2.0, 0.5);
        let m = view_matrix(&t);
        let p = m.transform_point3(Vec3::new(3.0, 8.0, 0.0));
        let [x, y] = t.apply([3.0, 8.0]);
        assert!((p.x - x).abs() < 1e-4 && (p.y - y).abs() < 1e-4);
        assert_eq!(m.to_cols_array(), t.to_column_major());
    }

    #[test]
    fn degenerate_viewport_is_finite() {
        let proj = pixel_projection(Viewport::new(0.0, 0.0));
        assert!(proj.is_finite());
    }
}
