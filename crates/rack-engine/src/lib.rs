//! Rack engine crate.
//!
//! Owns the window, the GPU device and the renderer that replays the flat
//! draw streams produced with [`rack_proto`].
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`window`] | winit event loop, `Runtime`, `RuntimeConfig` |
//! | [`device`] | wgpu surface/device setup |
//! | [`core`] | `App` contract and per-frame context |
//! | [`render`] | `FrameRenderer`, executor, wgpu back-end, MSDF helpers |
//! | [`text`] | glyph atlas generation and text layout |
//! | [`time`] | frame clock |
//! | [`coords`] | `Viewport` |
//! | [`logging`] | `env_logger` setup |

pub mod device;
pub mod window;
pub mod time;
pub mod core;

pub mod logging;
pub mod coords;
pub mod render;
pub mod text;
