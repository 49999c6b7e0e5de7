use std::fmt;

use thiserror::Error;

use crate::vertex::VertexLayout;

/// Which of the two per-frame buffers an error refers to.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum StreamKind {
    Draws,
    Vertices,
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamKind::Draws => f.write_str("draw stream"),
            StreamKind::Vertices => f.write_str("vertex buffer"),
        }
    }
}

/// Malformed frame payload.
///
/// `Truncated` and `LayoutMismatch` fail the whole frame; the other variants
/// only invalidate the draw that carries them.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Error)]
pub enum ProtocolError {
    #[error("{stream} truncated: {declared} records of {record_size} bytes need {needed} bytes, got {available}")]
    Truncated {
        stream: StreamKind,
        declared: u32,
        record_size: usize,
        needed: usize,
        available: usize,
    },

    #[error("draw range {offset}..{offset}+{count} exceeds vertex pool of {pool_len} vertices")]
    OutOfRange { offset: u32, count: u32, pool_len: u32 },

    #[error("unknown topology code {0}")]
    UnknownTopology(u32),

    #[error("vertex pool uses {found:?} layout but the session expects {expected:?}")]
    LayoutMismatch {
        expected: VertexLayout,
        found: VertexLayout,
    },
}

/// A draw references a resource the renderer does not have.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Error)]
pub enum ResourceError {
    #[error("no pipeline available for program {0}")]
    PipelineUnavailable(u32),
}

/// Reason a single draw was skipped.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Error)]
pub enum DrawError {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error(transparent)]
    Resource(#[from] ResourceError),
}
