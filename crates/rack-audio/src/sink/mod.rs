//! Real-time consumers of the ring.
//!
//! [`TimerSink`] paces pulls with a thread and hands blocks to a callback;
//! it needs no audio device. `CpalSink` (feature `cpal`) feeds a device
//! stream. Both go through [`BlockPump`] when the output asks for frames in
//! chunks that do not line up with the block size.

mod timer;
#[cfg(feature = "cpal")]
mod device;

pub use timer::TimerSink;
#[cfg(feature = "cpal")]
pub use device::{CpalSink, OutputDevice};

use crate::ring::{AudioBlock, RingConsumer};

/// Carries the unplayed tail of the last block between output callbacks.
pub struct BlockPump<const SLOTS: usize, const BLOCK: usize> {
    consumer: RingConsumer<SLOTS, BLOCK>,
    carry: AudioBlock<BLOCK>,
    carry_pos: usize,
}

impl<const SLOTS: usize, const BLOCK: usize> BlockPump<SLOTS, BLOCK> {
    pub fn new(consumer: RingConsumer<SLOTS, BLOCK>) -> Self {
        Self {
            consumer,
            carry: [0.0; BLOCK],
            carry_pos: BLOCK,
        }
    }

    /// Fills interleaved `out` with `channels` copies of the mono stream.
    /// A trailing partial frame is left untouched.
    pub fn fill_interleaved<T>(&mut self, out: &mut [T], channels: usize, convert: impl Fn(f32) -> T) {
        if channels == 0 {
            return;
        }
        for frame in out.chunks_exact_mut(channels) {
            if self.carry_pos == BLOCK {
                self.consumer.pull_into(&mut self.carry);
                self.carry_pos = 0;
            }
            let sample = self.carry[self.carry_pos];
            self.carry_pos += 1;
            for dst in frame {
                *dst = convert(sample);
            }
        }
    }

    pub fn consumer(&self) -> &RingConsumer<SLOTS, BLOCK> {
        &self.consumer
    }

    pub fn into_consumer(self) -> RingConsumer<SLOTS, BLOCK> {
        self.consumer
    }
}
