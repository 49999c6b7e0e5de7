//! CPU mirror of the text fragment shader (`shaders/msdf.wgsl`).
//!
//! The shader reconstructs glyph coverage from a multi-channel signed
//! distance field: the median of the three channels is the distance, 0.5 is
//! the glyph edge, and the transition band is one screen pixel wide.

use rack_proto::PackedTexCoord;

/// Atlas edge length the stock shader and glyph packer assume.
pub const ATLAS_SIZE: u32 = 256;

/// Smallest band half-width; keeps `smoothstep` defined when the distance
/// does not change across a pixel.
pub const MIN_BAND: f32 = 1.0e-4;

#[inline]
pub fn median(r: f32, g: f32, b: f32) -> f32 {
    r.min(g).max(r.max(g).min(b))
}

/// Hermite step, as WGSL `smoothstep`.
#[inline]
pub fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// Coverage of a texel with distance channels `rgb` when the distance
/// changes by `width` across one screen pixel.
#[inline]
pub fn coverage(rgb: [f32; 3], width: f32) -> f32 {
    let d = median(rgb[0], rgb[1], rgb[2]);
    let w = width.abs().max(MIN_BAND);
    smoothstep(0.5 - w, 0.5 + w, d)
}

/// Packed integer texel to normalized texture coordinate, sampling the texel
/// center.
#[inline]
pub fn texel_to_uv(uv: PackedTexCoord, atlas_size: u32) -> [f32; 2] {
    let size = atlas_size.max(1) as f32;
    let (u, v) = uv.unpack();
    [(u as f32 + 0.5) / size, (v as f32 + 0.5) / size]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn median_of_three() {
        assert_eq!(median(0.1, 0.9, 0.5), 0.5);
        assert_eq!(median(0.9, 0.1, 0.5), 0.5);
        assert_eq!(median(0.5, 0.5, 0.2), 0.5);
        assert_eq!(median(0.3, 0.7, 0.7), 0.7);
    }

    #[test]
    fn edge_is_half_covered() {
        assert!((coverage([0.5, 0.5, 0.5], 0.05) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn saturates_outside_band() {
        assert_eq!(coverage([0.9, 0.8, 0.95], 0.05), 1.0);
        assert_eq!(coverage([0.1, 0.2, 0.0], 0.05), 0.0);
        // one outlier channel does not change the median
        assert_eq!(coverage([0.0, 0.9, 0.8], 0.05), 1.0);
    }

    #[test]
    fn zero_width_is_a_hard_edge() {
        assert_eq!(coverage([0.51, 0.51, 0.51], 0.0), 1.0);
        assert_eq!(coverage([0.49, 0.49, 0.49], 0.0), 0.0);
    }

    #[test]
    fn texel_centers() {
        assert_eq!(texel_to_uv(PackedTexCoord::new(0, 0), 256), [0.5 / 256.0, 0.5 / 256.0]);
        let [u, v] = texel_to_uv(PackedTexCoord::new(255, 127), 256);
        assert_eq!(u, 255.5 / 256.0);
        assert_eq!(v, 127.5 / 256.0);
    }

    #[test]
    fn packed_bits() {
        let uv = PackedTexCoord::new(300, 12);
        assert_eq!(uv.0, 12 << 16 | 300);
    }
}
