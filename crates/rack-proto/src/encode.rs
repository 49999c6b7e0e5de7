use crate::draw::{
    DrawCommand, PROGRAM_OFFSET, RECORD_SIZE, TOPOLOGY_OFFSET, VERTEX_COUNT_OFFSET,
    VERTEX_OFFSET_OFFSET,
};

/// Writes one record into `out`.
pub fn encode_record(cmd: &DrawCommand, out: &mut [u8; RECORD_SIZE]) {
    for (i, v) in cmd.transform.0.iter().enumerate() {
        out[i * 4..i * 4 + 4].copy_from_slice(&v.to_le_bytes());
    }
    out[PROGRAM_OFFSET..PROGRAM_OFFSET + 4].copy_from_slice(&cmd.program.0.to_le_bytes());
    out[TOPOLOGY_OFFSET..TOPOLOGY_OFFSET + 4].copy_from_slice(&cmd.topology.code().to_le_bytes());
    out[VERTEX_OFFSET_OFFSET..VERTEX_OFFSET_OFFSET + 4]
        .copy_from_slice(&cmd.vertex_offset.to_le_bytes());
    out[VERTEX_COUNT_OFFSET..VERTEX_COUNT_OFFSET + 4]
        .copy_from_slice(&cmd.vertex_count.to_le_bytes());
}

/// Growable draw stream buffer.
///
/// `clear()` keeps capacity, so a writer reused every frame stops allocating
/// once it has seen its largest frame.
#[derive(Debug, Default, Clone)]
pub struct DrawStreamWriter {
    bytes: Vec<u8>,
    count: u32,
}

impl DrawStreamWriter {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn clear(&mut self) {
        self.bytes.clear();
        self.count = 0;
    }

    pub fn push(&mut self, cmd: &DrawCommand) {
        let mut record = [0u8; RECORD_SIZE];
        encode_record(cmd, &mut record);
        self.bytes.extend_from_slice(&record);
        self.count += 1;
    }

    #[inline]
    pub fn count(&self) -> u32 {
        self.count
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}
