use crate::draw::Transform;

/// 2D camera in pixel space.
///
/// `target` is the world point that lands on `offset` (in screen pixels);
/// rotation and zoom pivot around it.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Camera2D {
    pub offset: [f32; 2],
    pub target: [f32; 2],
    /// Degrees, clockwise on screen.
    pub rotation: f32,
    pub zoom: f32,
}

impl Default for Camera2D {
    fn default() -> Self {
        Self {
            offset: [0.0, 0.0],
            target: [0.0, 0.0],
            rotation: 0.0,
            zoom: 1.0,
        }
    }
}

impl Camera2D {
    /// View transform: move `target` to the origin, scale, rotate, then move to `offset`.
    pub fn view(&self) -> Transform {
        Transform::translation(self.offset[0], self.offset[1])
            * Transform::rotation_z(self.rotation.to_radians())
            * Transform::scale(self.zoom, self.zoom)
            * Transform::translation(-self.target[0], -self.target[1])
    }

    /// Maps a screen pixel back into world space.
    pub fn screen_to_world(&self, p: [f32; 2]) -> [f32; 2] {
        let zoom = if self.zoom == 0.0 { 1.0 } else { self.zoom };
        let (s, c) = (-self.rotation.to_radians()).sin_cos();
        let dx = p[0] - self.offset[0];
        let dy = p[1] - self.offset[1];
        [
            (dx * c - dy * s) / zoom + self.target[0],
            (dx * s + dy * c) / zoom + self.target[1],
        ]
    }
}
