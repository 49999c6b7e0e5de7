//! Refill side: turns refill requests into synthesized blocks.

use std::io;
use std::thread::{self, JoinHandle};

use crate::ring::{AudioBlock, RefillRequest, RingProducer, RingStats};

/// Source of samples. Called off the real-time thread.
pub trait Synth: Send {
    /// Writes `buffer.len()` samples (one block) into `buffer`.
    fn fill(&mut self, buffer: &mut [f32]);
}

impl<F> Synth for F
where
    F: FnMut(&mut [f32]) + Send,
{
    fn fill(&mut self, buffer: &mut [f32]) {
        self(buffer)
    }
}

/// Adapts a [`Synth`] to the ring: one scratch block, filled by the synth and
/// then copied into the requested slot.
pub struct RefillAdapter<S, const SLOTS: usize, const BLOCK: usize> {
    producer: RingProducer<SLOTS, BLOCK>,
    synth: S,
    scratch: AudioBlock<BLOCK>,
    refills: u64,
}

impl<S: Synth, const SLOTS: usize, const BLOCK: usize> RefillAdapter<S, SLOTS, BLOCK> {
    pub fn new(producer: RingProducer<SLOTS, BLOCK>, synth: S) -> Self {
        Self {
            producer,
            synth,
            scratch: [0.0; BLOCK],
            refills: 0,
        }
    }

    /// Fills every slot once. Call before playback starts so the first lap
    /// is not silence.
    pub fn prime(&mut self) {
        for slot in 0..SLOTS {
            self.refill_slot(slot);
        }
    }

    /// Synthesizes one block for `request` and stamps it with the request's
    /// due tick.
    pub fn handle(&mut self, request: RefillRequest) {
        self.synth.fill(&mut self.scratch);
        self.producer.fulfil(request, &self.scratch);
        self.refills += 1;
    }

    /// Handles every request already pending. Returns how many were handled.
    pub fn service_pending(&mut self) -> usize {
        let mut handled = 0;
        while let Some(request) = self.producer.try_next_request() {
            self.handle(request);
            handled += 1;
        }
        handled
    }

    /// Handles requests until the consumer half is dropped.
    pub fn run(&mut self) {
        log::debug!("audio refill loop started ({SLOTS} x {BLOCK})");
        while let Some(request) = self.producer.next_request() {
            self.handle(request);
        }
        let stats = self.stats();
        log::debug!(
            "audio refill loop finished: refills={} ticks={} stale={} dropped={}",
            self.refills,
            stats.ticks,
            stats.stale_blocks,
            stats.dropped_requests
        );
    }

    /// Slots written since construction.
    #[inline]
    pub fn refills(&self) -> u64 {
        self.refills
    }

    pub fn stats(&self) -> RingStats {
        self.producer.stats()
    }

    pub fn synth_mut(&mut self) -> &mut S {
        &mut self.synth
    }

    pub fn into_inner(self) -> (RingProducer<SLOTS, BLOCK>, S) {
        (self.producer, self.synth)
    }

    fn refill_slot(&mut self, slot: usize) {
        self.synth.fill(&mut self.scratch);
        self.producer.refill(slot, &self.scratch);
        self.refills += 1;
    }
}

/// Runs `adapter` on a dedicated thread until the consumer goes away.
/// The adapter is handed back through the join handle.
pub fn spawn_refill_thread<S, const SLOTS: usize, const BLOCK: usize>(
    mut adapter: RefillAdapter<S, SLOTS, BLOCK>,
) -> io::Result<JoinHandle<RefillAdapter<S, SLOTS, BLOCK>>>
where
    S: Synth + 'static,
{
    thread::Builder::new()
        .name("rack-audio-refill".into())
        .spawn(move || {
            adapter.run();
            adapter
        })
}
