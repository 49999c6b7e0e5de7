//! Draw stream replay.
//!
//! [`FrameRenderer`] decodes a frame's vertex pool and draw stream, then
//! hands them to the [`RenderBatchExecutor`], which walks the records in
//! order against a [`Rasterizer`]. The wgpu back-end is the only production
//! rasterizer; tests drive the executor with a recording mock.

mod atlas;
mod ctx;
mod executor;
pub mod msdf;
mod programs;
pub mod projection;
mod renderer;
mod wgpu_backend;

pub use atlas::{AtlasError, FontAtlas, MAX_ATLAS_SIZE};
pub use ctx::{RenderCtx, RenderTarget};
pub use executor::{FrameReport, Rasterizer, RenderBatchExecutor, SkippedDraw};
pub use programs::{BlendMode, PROGRAMS, ProgramEffects, ProgramState, effects_of};
pub use renderer::{FrameRenderer, RendererConfig, decode_frame};
pub use wgpu_backend::{WgpuBackend, WgpuRasterizer};
