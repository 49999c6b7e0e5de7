/// Render target size in logical pixels (top-left origin, +Y down).
///
/// Draw streams are authored in this space; the projection maps it to clip
/// space.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    #[inline]
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Logical size of a physical surface at `scale` device pixels per point.
    pub fn from_physical(width: u32, height: u32, scale: f64) -> Self {
        let scale = if scale > 0.0 { scale } else { 1.0 };
        Self::new((width as f64 / scale) as f32, (height as f64 / scale) as f32)
    }

    #[inline]
    pub fn is_valid(self) -> bool {
        self.width > 0.0 && self.height > 0.0 && self.width.is_finite() && self.height.is_finite()
    }

    /// Clamps degenerate sizes to one pixel so the projection stays invertible.
    #[inline]
    pub fn clamped(self) -> Self {
        let fix = |v: f32| if v.is_finite() { v.max(1.0) } else { 1.0 };
        Self::new(fix(self.width), fix(self.height))
    }
}
