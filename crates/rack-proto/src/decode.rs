use std::iter::FusedIterator;

use crate::draw::{
    DrawCommand, ProgramId, Topology, Transform, PROGRAM_OFFSET, RECORD_SIZE, TOPOLOGY_OFFSET,
    VERTEX_COUNT_OFFSET, VERTEX_OFFSET_OFFSET,
};
use crate::error::{ProtocolError, StreamKind};
use crate::reader::ByteReader;

/// A validated draw stream of `draw_count` records.
///
/// Construction checks the total length once; records are decoded lazily on
/// iteration, so walking the stream allocates nothing. Vertex ranges are not
/// checked here.
#[derive(Debug, Copy, Clone)]
pub struct DrawStream<'a> {
    reader: ByteReader<'a>,
    count: u32,
}

impl<'a> DrawStream<'a> {
    /// Fails with [`ProtocolError::Truncated`] if `bytes` holds fewer than
    /// `draw_count` records. Trailing bytes are ignored.
    pub fn new(bytes: &'a [u8], draw_count: u32) -> Result<Self, ProtocolError> {
        let needed = (draw_count as usize).checked_mul(RECORD_SIZE);
        match needed {
            Some(needed) if needed <= bytes.len() => Ok(Self {
                reader: ByteReader::new(&bytes[..needed]),
                count: draw_count,
            }),
            _ => Err(ProtocolError::Truncated {
                stream: StreamKind::Draws,
                declared: draw_count,
                record_size: RECORD_SIZE,
                needed: needed.unwrap_or(usize::MAX),
                available: bytes.len(),
            }),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.count as usize
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Decodes record `index`, or `None` past the end.
    pub fn get(&self, index: u32) -> Option<Result<DrawCommand, ProtocolError>> {
        if index >= self.count {
            return None;
        }
        let record = self.reader.sub(index as usize * RECORD_SIZE, RECORD_SIZE)?;
        Some(decode_record(record))
    }

    #[inline]
    pub fn iter(&self) -> DrawIter<'a> {
        DrawIter { stream: *self, next: 0 }
    }
}

impl<'a> IntoIterator for &DrawStream<'a> {
    type Item = Result<DrawCommand, ProtocolError>;
    type IntoIter = DrawIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// In-order iterator over a [`DrawStream`].
#[derive(Debug, Clone)]
pub struct DrawIter<'a> {
    stream: DrawStream<'a>,
    next: u32,
}

impl Iterator for DrawIter<'_> {
    type Item = Result<DrawCommand, ProtocolError>;

    fn next(&mut self) -> Option<Self::Item> {
        let item = self.stream.get(self.next)?;
        self.next += 1;
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = (self.stream.count - self.next) as usize;
        (left, Some(left))
    }
}

impl ExactSizeIterator for DrawIter<'_> {}
impl FusedIterator for DrawIter<'_> {}

fn decode_record(r: ByteReader<'_>) -> Result<DrawCommand, ProtocolError> {
    // The stream length was validated up front, so a short read here means the
    // record slicing itself is wrong; report it as truncation rather than panic.
    let short = || ProtocolError::Truncated {
        stream: StreamKind::Draws,
        declared: 1,
        record_size: RECORD_SIZE,
        needed: RECORD_SIZE,
        available: r.len(),
    };

    let mut rows = [0.0f32; 16];
    for (i, v) in rows.iter_mut().enumerate() {
        *v = r.f32_le(i * 4).ok_or_else(short)?;
    }

    let program = r.u32_le(PROGRAM_OFFSET).ok_or_else(short)?;
    let topology = r.u32_le(TOPOLOGY_OFFSET).ok_or_else(short)?;
    let vertex_offset = r.u32_le(VERTEX_OFFSET_OFFSET).ok_or_else(short)?;
    let vertex_count = r.u32_le(VERTEX_COUNT_OFFSET).ok_or_else(short)?;

    Ok(DrawCommand {
        transform: Transform(rows),
        program: ProgramId(program),
        topology: Topology::from_code(topology)?,
        vertex_offset,
        vertex_count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::DrawStreamWriter;

    fn cmd(program: u32, offset: u32, count: u32) -> DrawCommand {
        DrawCommand {
            transform: Transform::translation(offset as f32, 1.0),
            program: ProgramId(program),
            topology: Topology::TriangleList,
            vertex_offset: offset,
            vertex_count: count,
        }
    }

    #[test]
    fn decodes_in_order() {
        let mut w = DrawStreamWriter::new();
        w.push(&cmd(0, 0, 3));
        w.push(&cmd(1, 3, 6));
        w.push(&cmd(0, 9, 3));

        let s = DrawStream::new(w.as_bytes(), w.count()).unwrap();
        let got: Vec<_> = s.iter().map(Result::unwrap).collect();
        assert_eq!(got, vec![cmd(0, 0, 3), cmd(1, 3, 6), cmd(0, 9, 3)]);
    }

    #[test]
    fn truncated_stream_fails_up_front() {
        let mut w = DrawStreamWriter::new();
        w.push(&cmd(0, 0, 3));
        w.push(&cmd(0, 3, 3));
        let bytes = &w.as_bytes()[..RECORD_SIZE * 2 - 1];

        let err = DrawStream::new(bytes, 2).unwrap_err();
        assert_eq!(
            err,
            ProtocolError::Truncated {
                stream: StreamKind::Draws,
                declared: 2,
                record_size: RECORD_SIZE,
                needed: 160,
                available: 159,
            }
        );
    }

    #[test]
    fn unknown_topology_only_fails_that_record() {
        let mut w = DrawStreamWriter::new();
        w.push(&cmd(0, 0, 3));
        w.push(&cmd(0, 3, 3));
        let mut bytes = w.as_bytes().to_vec();
        bytes[RECORD_SIZE + TOPOLOGY_OFFSET..RECORD_SIZE + TOPOLOGY_OFFSET + 4]
            .copy_from_slice(&9u32.to_le_bytes());

        let s = DrawStream::new(&bytes, 2).unwrap();
        let mut it = s.iter();
        assert!(it.next().unwrap().is_ok());
        assert_eq!(it.next().unwrap(), Err(ProtocolError::UnknownTopology(9)));
        assert!(it.next().is_none());
    }

    #[test]
    fn zero_draws_from_empty_buffer() {
        let s = DrawStream::new(&[], 0).unwrap();
        assert!(s.is_empty());
        assert_eq!(s.iter().count(), 0);
    }

    #[test]
    fn trailing_bytes_ignored() {
        let mut w = DrawStreamWriter::new();
        w.push(&cmd(0, 0, 3));
        let mut bytes = w.as_bytes().to_vec();
        bytes.extend_from_slice(&[0xaa; 7]);
        let s = DrawStream::new(&bytes, 1).unwrap();
        assert_eq!(s.iter().len(), 1);
    }
}
