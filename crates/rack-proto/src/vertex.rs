//! Vertex pool layouts.
//!
//! Two interleaved layouts exist; a session picks one and every frame's pool
//! uses it:
//!
//! | Layout | Stride | Attributes (byte offset) |
//! |--------|--------|--------------------------|
//! | `Flat` | 12 | position `f32x2` (0), color `unorm8x4` (8) |
//! | `Textured` | 16 | position (0), color (8), packed texel `u32` (12) |

use std::ops::Range;

use bytemuck::{Pod, Zeroable};

use crate::error::{ProtocolError, StreamKind};

/// Vertex layout used for a session.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum VertexLayout {
    Flat,
    Textured,
}

impl VertexLayout {
    /// Bytes per vertex.
    #[inline]
    pub const fn stride(self) -> usize {
        match self {
            VertexLayout::Flat => 12,
            VertexLayout::Textured => 16,
        }
    }

    pub const POSITION_OFFSET: usize = 0;
    pub const COLOR_OFFSET: usize = 8;
    /// Only present in the `Textured` layout.
    pub const TEXCOORD_OFFSET: usize = 12;
}

/// 8-bit RGBA color, normalized to `[0, 1]` by the rasterizer.
#[repr(C)]
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash, Pod, Zeroable)]
pub struct Rgba8 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba8 {
    pub const WHITE: Self = Self::new(255, 255, 255, 255);
    pub const BLACK: Self = Self::new(0, 0, 0, 255);
    pub const TRANSPARENT: Self = Self::new(0, 0, 0, 0);

    #[inline]
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }
}

/// Integer texel address packed into one `u32`: low 16 bits `u`, high 16 bits `v`.
#[repr(transparent)]
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash, Pod, Zeroable)]
pub struct PackedTexCoord(pub u32);

impl PackedTexCoord {
    #[inline]
    pub const fn new(u: u16, v: u16) -> Self {
        Self(((v as u32) << 16) | u as u32)
    }

    #[inline]
    pub const fn u(self) -> u16 {
        (self.0 & 0xffff) as u16
    }

    #[inline]
    pub const fn v(self) -> u16 {
        (self.0 >> 16) as u16
    }

    #[inline]
    pub const fn unpack(self) -> (u16, u16) {
        (self.u(), self.v())
    }
}

/// Vertex of the `Flat` layout.
#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, Pod, Zeroable)]
pub struct FlatVertex {
    pub pos: [f32; 2],
    pub color: Rgba8,
}

/// Vertex of the `Textured` layout.
#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, Pod, Zeroable)]
pub struct TexturedVertex {
    pub pos: [f32; 2],
    pub color: Rgba8,
    pub uv: PackedTexCoord,
}

const _: () = assert!(std::mem::size_of::<FlatVertex>() == VertexLayout::Flat.stride());
const _: () = assert!(std::mem::size_of::<TexturedVertex>() == VertexLayout::Textured.stride());

/// A vertex type that can live in a pool.
pub trait PoolVertex: Pod {
    const LAYOUT: VertexLayout;

    /// Builds a vertex. Layouts without texture coordinates drop `uv`.
    fn new(pos: [f32; 2], color: Rgba8, uv: PackedTexCoord) -> Self;
}

impl PoolVertex for FlatVertex {
    const LAYOUT: VertexLayout = VertexLayout::Flat;

    #[inline]
    fn new(pos: [f32; 2], color: Rgba8, _uv: PackedTexCoord) -> Self {
        Self { pos, color }
    }
}

impl PoolVertex for TexturedVertex {
    const LAYOUT: VertexLayout = VertexLayout::Textured;

    #[inline]
    fn new(pos: [f32; 2], color: Rgba8, uv: PackedTexCoord) -> Self {
        Self { pos, color, uv }
    }
}

/// Borrowed view over one frame's vertex bytes.
#[derive(Debug, Copy, Clone)]
pub struct VertexPool<'a> {
    bytes: &'a [u8],
    layout: VertexLayout,
    len: u32,
}

impl<'a> VertexPool<'a> {
    /// Wraps `vertex_count` vertices of `layout` at the start of `bytes`.
    ///
    /// Trailing bytes beyond `vertex_count * stride` are ignored.
    pub fn new(
        bytes: &'a [u8],
        vertex_count: u32,
        layout: VertexLayout,
    ) -> Result<Self, ProtocolError> {
        let stride = layout.stride();
        let needed = (vertex_count as usize).checked_mul(stride);
        match needed {
            Some(needed) if needed <= bytes.len() => Ok(Self {
                bytes: &bytes[..needed],
                layout,
                len: vertex_count,
            }),
            _ => Err(ProtocolError::Truncated {
                stream: StreamKind::Vertices,
                declared: vertex_count,
                record_size: stride,
                needed: needed.unwrap_or(usize::MAX),
                available: bytes.len(),
            }),
        }
    }

    /// Views a typed vertex slice as a pool.
    pub fn from_vertices<V: PoolVertex>(vertices: &'a [V]) -> Self {
        Self {
            bytes: bytemuck::cast_slice(vertices),
            layout: V::LAYOUT,
            len: u32::try_from(vertices.len()).unwrap_or(u32::MAX),
        }
    }

    #[inline]
    pub fn layout(&self) -> VertexLayout {
        self.layout
    }

    /// Number of vertices.
    #[inline]
    pub fn len(&self) -> u32 {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Raw interleaved bytes, exactly `len * stride` long.
    #[inline]
    pub fn as_bytes(&self) -> &'a [u8] {
        self.bytes
    }

    /// Validates a draw's vertex range against the pool length.
    pub fn check_range(&self, offset: u32, count: u32) -> Result<Range<u32>, ProtocolError> {
        match offset.checked_add(count) {
            Some(end) if end <= self.len => Ok(offset..end),
            _ => Err(ProtocolError::OutOfRange {
                offset,
                count,
                pool_len: self.len,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packed_texcoord_layout() {
        let t = PackedTexCoord::new(300, 12);
        assert_eq!(t.0, 12 << 16 | 300);
        assert_eq!(t.unpack(), (300, 12));
    }

    #[test]
    fn packed_texcoord_extremes() {
        let t = PackedTexCoord::new(u16::MAX, 0);
        assert_eq!(t.unpack(), (u16::MAX, 0));
        let t = PackedTexCoord::new(0, u16::MAX);
        assert_eq!(t.0, 0xffff_0000);
    }

    #[test]
    fn textured_vertex_bytes() {
        let v = TexturedVertex::new([1.0, 2.0], Rgba8::new(1, 2, 3, 4), PackedTexCoord::new(5, 6));
        let b = bytemuck::bytes_of(&v);
        assert_eq!(b.len(), 16);
        assert_eq!(&b[0..4], &1.0f32.to_le_bytes());
        assert_eq!(&b[8..12], &[1, 2, 3, 4]);
        assert_eq!(&b[12..16], &(6u32 << 16 | 5).to_le_bytes());
    }

    #[test]
    fn pool_rejects_short_buffer() {
        let bytes = [0u8; 23];
        let err = VertexPool::new(&bytes, 2, VertexLayout::Flat).unwrap_err();
        assert!(matches!(err, ProtocolError::Truncated { needed: 24, available: 23, .. }));
    }

    #[test]
    fn pool_trims_trailing_bytes() {
        let bytes = [0u8; 40];
        let pool = VertexPool::new(&bytes, 2, VertexLayout::Textured).unwrap();
        assert_eq!(pool.len(), 2);
        assert_eq!(pool.as_bytes().len(), 32);
    }

    #[test]
    fn range_checks() {
        let verts = [FlatVertex::default(); 6];
        let pool = VertexPool::from_vertices(&verts);
        assert_eq!(pool.check_range(0, 6), Ok(0..6));
        assert_eq!(pool.check_range(6, 0), Ok(6..6));
        assert!(pool.check_range(4, 3).is_err());
        assert!(pool.check_range(u32::MAX, 2).is_err());
    }
}
