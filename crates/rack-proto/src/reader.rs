/// Little-endian field reader over a borrowed byte span.
///
/// Every access is bounds-checked and returns `None` past the end; nothing is
/// reinterpreted in place.
#[derive(Debug, Copy, Clone)]
pub(crate) struct ByteReader<'a> {
    bytes: &'a [u8],
}

impl<'a> ByteReader<'a> {
    #[inline]
    pub(crate) const fn new(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Sub-reader over `len` bytes starting at `offset`.
    #[inline]
    pub(crate) fn sub(&self, offset: usize, len: usize) -> Option<ByteReader<'a>> {
        let end = offset.checked_add(len)?;
        self.bytes.get(offset..end).map(ByteReader::new)
    }

    #[inline]
    pub(crate) fn u32_le(&self, offset: usize) -> Option<u32> {
        self.array::<4>(offset).map(u32::from_le_bytes)
    }

    #[inline]
    pub(crate) fn f32_le(&self, offset: usize) -> Option<f32> {
        self.u32_le(offset).map(f32::from_bits)
    }

    #[inline]
    fn array<const N: usize>(&self, offset: usize) -> Option<[u8; N]> {
        let end = offset.checked_add(N)?;
        self.bytes.get(offset..end)?.try_into().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_little_endian() {
        let r = ByteReader::new(&[0x2c, 0x01, 0x0c, 0x00, 0xff]);
        assert_eq!(r.u32_le(0), Some(12 << 16 | 300));
    }

    #[test]
    fn past_end_is_none() {
        let r = ByteReader::new(&[0u8; 6]);
        assert_eq!(r.u32_le(3), None);
        assert!(r.sub(4, 4).is_none());
        assert!(r.sub(usize::MAX, 2).is_none());
    }

    #[test]
    fn sub_is_relative() {
        let r = ByteReader::new(&[0, 0, 0, 0, 1, 0, 0, 0]);
        let s = r.sub(4, 4).unwrap();
        assert_eq!(s.len(), 4);
        assert_eq!(s.u32_le(0), Some(1));
    }
}
