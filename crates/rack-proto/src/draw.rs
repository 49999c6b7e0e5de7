use std::ops::Mul;

use crate::error::ProtocolError;

/// Bytes occupied by the transform at the start of each record.
pub const TRANSFORM_SIZE: usize = 64;
/// Bytes of program / topology / offset / count after the transform.
pub const RECORD_TAIL_SIZE: usize = 16;
/// Size of one draw record.
pub const RECORD_SIZE: usize = TRANSFORM_SIZE + RECORD_TAIL_SIZE;

pub(crate) const PROGRAM_OFFSET: usize = TRANSFORM_SIZE;
pub(crate) const TOPOLOGY_OFFSET: usize = TRANSFORM_SIZE + 4;
pub(crate) const VERTEX_OFFSET_OFFSET: usize = TRANSFORM_SIZE + 8;
pub(crate) const VERTEX_COUNT_OFFSET: usize = TRANSFORM_SIZE + 12;

/// Primitive kind of a draw.
///
/// Wire codes follow the classic GL numbering (no line loop, no fans).
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Topology {
    PointList,
    LineList,
    LineStrip,
    TriangleList,
    TriangleStrip,
}

impl Topology {
    pub const ALL: [Topology; 5] = [
        Topology::PointList,
        Topology::LineList,
        Topology::LineStrip,
        Topology::TriangleList,
        Topology::TriangleStrip,
    ];

    #[inline]
    pub const fn code(self) -> u32 {
        match self {
            Topology::PointList => 0,
            Topology::LineList => 1,
            Topology::LineStrip => 3,
            Topology::TriangleList => 4,
            Topology::TriangleStrip => 5,
        }
    }

    pub const fn from_code(code: u32) -> Result<Self, ProtocolError> {
        match code {
            0 => Ok(Topology::PointList),
            1 => Ok(Topology::LineList),
            3 => Ok(Topology::LineStrip),
            4 => Ok(Topology::TriangleList),
            5 => Ok(Topology::TriangleStrip),
            other => Err(ProtocolError::UnknownTopology(other)),
        }
    }

    /// Strips cannot be concatenated without joining unrelated primitives.
    #[inline]
    pub const fn is_strip(self) -> bool {
        matches!(self, Topology::LineStrip | Topology::TriangleStrip)
    }
}

impl TryFrom<u32> for Topology {
    type Error = ProtocolError;

    fn try_from(code: u32) -> Result<Self, Self::Error> {
        Topology::from_code(code)
    }
}

/// Pipeline selector carried by each draw.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct ProgramId(pub u32);

impl ProgramId {
    /// Vertex color only, no blending.
    pub const FLAT: Self = Self(0);
    /// MSDF font atlas, alpha blended.
    pub const MSDF_TEXT: Self = Self(1);
}

/// 4x4 matrix stored row-major, applied to column vectors (`M * p`).
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Transform(pub [f32; 16]);

impl Transform {
    pub const IDENTITY: Self = Self([
        1.0, 0.0, 0.0, 0.0, //
        0.0, 1.0, 0.0, 0.0, //
        0.0, 0.0, 1.0, 0.0, //
        0.0, 0.0, 0.0, 1.0,
    ]);

    pub const fn translation(x: f32, y: f32) -> Self {
        Self([
            1.0, 0.0, 0.0, x, //
            0.0, 1.0, 0.0, y, //
            0.0, 0.0, 1.0, 0.0, //
            0.0, 0.0, 0.0, 1.0,
        ])
    }

    pub const fn scale(x: f32, y: f32) -> Self {
        Self([
            x, 0.0, 0.0, 0.0, //
            0.0, y, 0.0, 0.0, //
            0.0, 0.0, 1.0, 0.0, //
            0.0, 0.0, 0.0, 1.0,
        ])
    }

    /// Rotation about +Z by `radians` (clockwise on screen, since +Y is down).
    pub fn rotation_z(radians: f32) -> Self {
        let (s, c) = radians.sin_cos();
        Self([
            c, -s, 0.0, 0.0, //
            s, c, 0.0, 0.0, //
            0.0, 0.0, 1.0, 0.0, //
            0.0, 0.0, 0.0, 1.0,
        ])
    }

    #[inline]
    pub fn at(&self, row: usize, col: usize) -> f32 {
        self.0[row * 4 + col]
    }

    /// Transforms a 2D point (z = 0, w = 1).
    pub fn apply(&self, p: [f32; 2]) -> [f32; 2] {
        [
            self.at(0, 0) * p[0] + self.at(0, 1) * p[1] + self.at(0, 3),
            self.at(1, 0) * p[0] + self.at(1, 1) * p[1] + self.at(1, 3),
        ]
    }

    /// Same matrix in column-major order, for back-ends that expect it.
    pub fn to_column_major(&self) -> [f32; 16] {
        let mut out = [0.0f32; 16];
        for row in 0..4 {
            for col in 0..4 {
                out[col * 4 + row] = self.at(row, col);
            }
        }
        out
    }
}

/// Matrix product `self * rhs`: `rhs` is applied first.
impl Mul for Transform {
    type Output = Transform;

    fn mul(self, rhs: Transform) -> Transform {
        let mut out = [0.0f32; 16];
        for row in 0..4 {
            for col in 0..4 {
                out[row * 4 + col] = (0..4).map(|k| self.at(row, k) * rhs.at(k, col)).sum();
            }
        }
        Transform(out)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// One decoded draw call.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct DrawCommand {
    /// View transform; the renderer supplies the projection.
    pub transform: Transform,
    pub program: ProgramId,
    pub topology: Topology,
    pub vertex_offset: u32,
    pub vertex_count: u32,
}
