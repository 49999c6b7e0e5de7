//! Signed distance fields from coverage bitmaps.

/// Coverage at or above this counts as inside.
const INSIDE: u8 = 128;

/// Distance field of a `w x h` coverage bitmap, grown by `spread` texels on
/// every side.
///
/// Encoded like the atlas expects: 0.5 (128) on the outline, rising inside.
/// Texels with no opposite texel within `spread` saturate to 0 or 255.
/// Brute force over a `spread` window; fine for the few dozen glyphs built
/// at startup.
pub fn distance_field(coverage: &[u8], w: u32, h: u32, spread: u32) -> (Vec<u8>, u32, u32) {
    debug_assert_eq!(coverage.len(), (w * h) as usize);
    let spread = spread.max(1);
    let out_w = w + 2 * spread;
    let out_h = h + 2 * spread;
    let s = spread as i64;

    let inside = |x: i64, y: i64| -> bool {
        if x < 0 || y < 0 || x >= w as i64 || y >= h as i64 {
            return false;
        }
        coverage[(y * w as i64 + x) as usize] >= INSIDE
    };

    let mut field = Vec::with_capacity((out_w * out_h) as usize);
    for oy in 0..out_h as i64 {
        for ox in 0..out_w as i64 {
            let (x, y) = (ox - s, oy - s);
            let here = inside(x, y);

            let mut best = f32::INFINITY;
            for dy in -s..=s {
                for dx in -s..=s {
                    if inside(x + dx, y + dy) != here {
                        best = best.min((dx * dx + dy * dy) as f32);
                    }
                }
            }

            let dist = best.sqrt().min(spread as f32 + 0.5);
            let signed = if here { dist - 0.5 } else { -(dist - 0.5) };
            let value = 0.5 + signed / (2.0 * spread as f32);
            field.push((value.clamp(0.0, 1.0) * 255.0).round() as u8);
        }
    }
    (field, out_w, out_h)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(w: u32, h: u32, x0: u32, y0: u32, x1: u32, y1: u32) -> Vec<u8> {
        let mut c = vec![0u8; (w * h) as usize];
        for y in y0..y1 {
            for x in x0..x1 {
                c[(y * w + x) as usize] = 255;
            }
        }
        c
    }

    #[test]
    fn grows_by_spread() {
        let (f, w, h) = distance_field(&[255; 6], 3, 2, 4);
        assert_eq!((w, h), (11, 10));
        assert_eq!(f.len(), 110);
    }

    #[test]
    fn far_outside_is_zero() {
        let cov = square(4, 4, 1, 1, 3, 3);
        let (f, w, _) = distance_field(&cov, 4, 4, 3);
        assert_eq!(f[0], 0);
        assert_eq!(f[(w - 1) as usize], 0);
    }

    #[test]
    fn outline_straddles_half() {
        let cov = square(8, 8, 2, 2, 6, 6);
        let s = 4;
        let (f, w, _) = distance_field(&cov, 8, 8, s);
        let at = |x: u32, y: u32| f[((y + s) * w + x + s) as usize];

        // row 4: x=1 outside next to x=2 inside
        assert!(at(1, 4) < 128);
        assert!(at(2, 4) > 128);
        // centre is deeper inside than the border texel
        assert!(at(4, 4) > at(2, 4));
        // symmetric about the edge
        assert_eq!(at(1, 4) as i32 + at(2, 4) as i32, 255);
    }

    #[test]
    fn empty_bitmap_is_all_outside() {
        let (f, _, _) = distance_field(&[0; 4], 2, 2, 2);
        assert!(f.iter().all(|&v| v < 128));
    }
}
