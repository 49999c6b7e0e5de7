use proptest::prelude::*;
use rack_proto::{
    DrawCommand, DrawStream, DrawStreamWriter, ProgramId, ProtocolError, Topology, Transform,
    RECORD_SIZE,
};

fn arb_topology() -> impl Strategy<Value = Topology> {
    prop::sample::select(Topology::ALL.to_vec())
}

fn arb_command() -> impl Strategy<Value = DrawCommand> {
    (
        prop::array::uniform16(-1.0e6f32..1.0e6),
        0u32..4,
        arb_topology(),
        any::<u32>(),
        any::<u32>(),
    )
        .prop_map(|(rows, program, topology, vertex_offset, vertex_count)| DrawCommand {
            transform: Transform(rows),
            program: ProgramId(program),
            topology,
            vertex_offset,
            vertex_count,
        })
}

fn encode(cmds: &[DrawCommand]) -> DrawStreamWriter {
    let mut w = DrawStreamWriter::new();
    for c in cmds {
        w.push(c);
    }
    w
}

proptest! {
    #[test]
    fn exact_buffer_decodes_every_record_in_order(cmds in prop::collection::vec(arb_command(), 0..64)) {
        let w = encode(&cmds);
        prop_assert_eq!(w.as_bytes().len(), cmds.len() * RECORD_SIZE);

        let stream = DrawStream::new(w.as_bytes(), cmds.len() as u32).unwrap();
        let decoded: Vec<DrawCommand> = stream.iter().map(Result::unwrap).collect();
        prop_assert_eq!(decoded, cmds);
    }

    #[test]
    fn short_buffer_is_truncated(
        cmds in prop::collection::vec(arb_command(), 1..32),
        cut in 1usize..RECORD_SIZE * 2,
    ) {
        let w = encode(&cmds);
        let len = w.as_bytes().len().saturating_sub(cut);
        let err = DrawStream::new(&w.as_bytes()[..len], cmds.len() as u32).unwrap_err();
        let is_truncated = matches!(err, ProtocolError::Truncated { .. });
        prop_assert!(is_truncated);
    }

    #[test]
    fn random_bytes_never_panic(bytes in prop::collection::vec(any::<u8>(), 0..512), count in 0u32..8) {
        if let Ok(stream) = DrawStream::new(&bytes, count) {
            prop_assert_eq!(stream.iter().count(), count as usize);
            for item in &stream {
                if let Err(e) = item {
                    let is_topology = matches!(e, ProtocolError::UnknownTopology(_));
                    prop_assert!(is_topology);
                }
            }
        }
    }
}

#[test]
fn huge_declared_count_is_truncated_not_overflow() {
    let err = DrawStream::new(&[0u8; RECORD_SIZE], u32::MAX).unwrap_err();
    assert!(matches!(err, ProtocolError::Truncated { declared: u32::MAX, .. }));
}
