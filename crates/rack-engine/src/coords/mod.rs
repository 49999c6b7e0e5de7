//! Pixel-space helpers shared by the runtime and the renderer.

mod viewport;

pub use viewport::Viewport;
