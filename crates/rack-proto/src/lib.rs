//! Wire format for the **rack** per-frame draw stream.
//!
//! A frame is two flat byte buffers handed from the engine to the renderer:
//! a vertex pool (interleaved attributes, one layout per session) and a draw
//! stream (fixed-size little-endian records, one per draw call).
//!
//! This crate only depends on `bytemuck` and `thiserror` so producers can
//! build frames without linking the GPU runtime.
//!
//! # Structure
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`vertex`] | `VertexLayout`, `FlatVertex`, `TexturedVertex`, `PackedTexCoord`, `VertexPool` |
//! | [`draw`] | `DrawCommand`, `Topology`, `ProgramId`, `Transform`, record sizes |
//! | [`decode`] | `DrawStream` lazy record decoder |
//! | [`encode`] | `DrawStreamWriter` |
//! | [`camera`] | `Camera2D` view transform |
//! | [`builder`] | `FrameBuilder` tessellator + batcher |
//! | [`error`] | `ProtocolError`, `ResourceError`, `DrawError` |
//!
//! # Quick start
//!
//! ```rust
//! use rack_proto::{DrawStream, FlatVertex, FrameBuilder, Rgba8, VertexPool};
//!
//! let mut frame = FrameBuilder::<FlatVertex>::new();
//! frame.push_circle([64.0, 64.0], 20.0, Rgba8::WHITE);
//! let out = frame.finish();
//!
//! let pool = VertexPool::from_vertices(out.vertices);
//! let stream = DrawStream::new(out.draw_bytes, out.draw_count).unwrap();
//! for cmd in &stream {
//!     let cmd = cmd.unwrap();
//!     assert!(pool.check_range(cmd.vertex_offset, cmd.vertex_count).is_ok());
//! }
//! ```

pub mod builder;
pub mod camera;
pub mod decode;
pub mod draw;
pub mod encode;
pub mod error;
pub mod vertex;

mod reader;

pub use builder::{FrameBuilder, FrameOutput};
pub use camera::Camera2D;
pub use decode::{DrawIter, DrawStream};
pub use draw::{DrawCommand, ProgramId, Topology, Transform, RECORD_SIZE};
pub use encode::DrawStreamWriter;
pub use error::{DrawError, ProtocolError, ResourceError, StreamKind};
pub use vertex::{
    FlatVertex, PackedTexCoord, PoolVertex, Rgba8, TexturedVertex, VertexLayout, VertexPool,
};
