//! Fixed-depth ring of audio blocks shared by one producer and one consumer.
//!
//! The consumer runs on the real-time thread. Each pull copies out the block
//! under the cursor, flags that slot in the refill mailbox, and advances. It
//! never waits on the producer: if a slot was not refilled in time the old
//! content plays again and the stale counter goes up.
//!
//! Samples live in `AtomicU32` cells (f32 bit patterns). Each slot carries the
//! tick it was last filled for; the producer publishes it with `Release` after
//! writing the samples, and the consumer reads it with `Acquire` before
//! copying them out.
//!
//! The mailbox is one `AtomicU64` bit per slot plus the tick each flagged slot
//! is due at. The consumer sets bits with `fetch_or`; the producer takes them
//! all with `swap(0)` and polls on its own schedule, so the consumer side
//! never locks or wakes another thread.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::thread;
use std::time::{Duration, Instant};

/// Slot count used by the stock sinks.
pub const DEFAULT_SLOTS: usize = 8;
/// Samples per block used by the stock sinks.
pub const DEFAULT_BLOCK: usize = 128;
/// Upper bound on slots, one mailbox bit each.
pub const MAX_SLOTS: usize = 64;

/// How long a waiting producer sleeps between mailbox checks.
const REQUEST_POLL: Duration = Duration::from_micros(250);

/// One block of mono samples.
pub type AudioBlock<const BLOCK: usize> = [f32; BLOCK];

/// Ring with the stock dimensions.
pub type DefaultRing = AudioRing<DEFAULT_SLOTS, DEFAULT_BLOCK>;

/// "Slot `slot` was just played and is free to be refilled."
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct RefillRequest {
    pub slot: usize,
    /// Consumer tick at which the slot will next be played.
    pub due_tick: u64,
}

/// Counters shared by both halves.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct RingStats {
    /// Blocks handed to the consumer so far.
    pub ticks: u64,
    /// Blocks played without a refill since their previous lap.
    pub stale_blocks: u64,
    /// Refill requests lost because the slot was still pending from its
    /// previous lap, or because the producer is gone.
    pub dropped_requests: u64,
}

struct Shared<const SLOTS: usize, const BLOCK: usize> {
    samples: Box<[AtomicU32]>,
    filled_for: [AtomicU64; SLOTS],
    /// Mailbox: bit `s` set means slot `s` waits for a refill.
    pending: AtomicU64,
    /// Due tick of the request flagged for each slot.
    due: [AtomicU64; SLOTS],
    ticks: AtomicU64,
    stale: AtomicU64,
    dropped: AtomicU64,
    consumer_alive: AtomicBool,
    producer_alive: AtomicBool,
}

impl<const SLOTS: usize, const BLOCK: usize> Shared<SLOTS, BLOCK> {
    fn new() -> Self {
        Self {
            samples: (0..SLOTS * BLOCK).map(|_| AtomicU32::new(0)).collect(),
            // Every slot starts out fresh for its first lap.
            filled_for: std::array::from_fn(|slot| AtomicU64::new(slot as u64)),
            pending: AtomicU64::new(0),
            due: std::array::from_fn(|_| AtomicU64::new(0)),
            ticks: AtomicU64::new(0),
            stale: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
            consumer_alive: AtomicBool::new(true),
            producer_alive: AtomicBool::new(true),
        }
    }

    #[inline]
    fn block(&self, slot: usize) -> &[AtomicU32] {
        &self.samples[slot * BLOCK..(slot + 1) * BLOCK]
    }

    fn stats(&self) -> RingStats {
        RingStats {
            ticks: self.ticks.load(Ordering::Acquire),
            stale_blocks: self.stale.load(Ordering::Relaxed),
            dropped_requests: self.dropped.load(Ordering::Relaxed),
        }
    }
}

/// Owner of the shared storage until it is split into its two halves.
///
/// `SLOTS` blocks of `BLOCK` samples, initially silent.
pub struct AudioRing<const SLOTS: usize, const BLOCK: usize> {
    shared: Arc<Shared<SLOTS, BLOCK>>,
}

impl<const SLOTS: usize, const BLOCK: usize> AudioRing<SLOTS, BLOCK> {
    pub fn new() -> Self {
        const {
            assert!(SLOTS > 0, "ring needs at least one slot");
            assert!(SLOTS <= MAX_SLOTS, "ring has one mailbox bit per slot");
            assert!(BLOCK > 0, "blocks cannot be empty");
        }
        Self {
            shared: Arc::new(Shared::new()),
        }
    }

    pub const fn slots(&self) -> usize {
        SLOTS
    }

    pub const fn block_len(&self) -> usize {
        BLOCK
    }

    /// Splits into the producer half (refill side) and the consumer half
    /// (real-time side). Neither half can be cloned.
    pub fn split(self) -> (RingProducer<SLOTS, BLOCK>, RingConsumer<SLOTS, BLOCK>) {
        let producer = RingProducer {
            shared: Arc::clone(&self.shared),
            batch: 0,
        };
        let consumer = RingConsumer {
            shared: self.shared,
            cursor: 0,
        };
        (producer, consumer)
    }
}

impl<const SLOTS: usize, const BLOCK: usize> Default for AudioRing<SLOTS, BLOCK> {
    fn default() -> Self {
        Self::new()
    }
}

/// Real-time half. Does not lock, allocate, log or wake other threads.
pub struct RingConsumer<const SLOTS: usize, const BLOCK: usize> {
    shared: Arc<Shared<SLOTS, BLOCK>>,
    cursor: u64,
}

impl<const SLOTS: usize, const BLOCK: usize> RingConsumer<SLOTS, BLOCK> {
    /// Returns a copy of the block under the cursor and advances.
    pub fn next_playback_block(&mut self) -> AudioBlock<BLOCK> {
        let mut block = [0.0; BLOCK];
        self.pull_into(&mut block);
        block
    }

    /// Like [`next_playback_block`](Self::next_playback_block), writing into
    /// `out`. Returns the slot that was played.
    pub fn pull_into(&mut self, out: &mut AudioBlock<BLOCK>) -> usize {
        let tick = self.cursor;
        let slot = (tick % SLOTS as u64) as usize;
        let shared = &*self.shared;

        if shared.filled_for[slot].load(Ordering::Acquire) != tick {
            shared.stale.fetch_add(1, Ordering::Relaxed);
        }

        for (dst, src) in out.iter_mut().zip(shared.block(slot)) {
            *dst = f32::from_bits(src.load(Ordering::Relaxed));
        }

        // published before the request, so a producer that sees the
        // request also sees the tick it was made at
        self.cursor = tick + 1;
        shared.ticks.store(self.cursor, Ordering::Release);

        if !shared.producer_alive.load(Ordering::Acquire) {
            shared.dropped.fetch_add(1, Ordering::Relaxed);
            return slot;
        }
        let bit = 1u64 << slot;
        shared.due[slot].store(tick + SLOTS as u64, Ordering::Relaxed);
        // still set: last lap's request was never taken and is replaced
        if shared.pending.fetch_or(bit, Ordering::AcqRel) & bit != 0 {
            shared.dropped.fetch_add(1, Ordering::Relaxed);
        }
        slot
    }

    /// Slot the next pull will read.
    #[inline]
    pub fn cursor(&self) -> usize {
        (self.cursor % SLOTS as u64) as usize
    }

    pub fn stats(&self) -> RingStats {
        self.shared.stats()
    }
}

impl<const SLOTS: usize, const BLOCK: usize> Drop for RingConsumer<SLOTS, BLOCK> {
    fn drop(&mut self) {
        self.shared.consumer_alive.store(false, Ordering::Release);
    }
}

impl<const SLOTS: usize, const BLOCK: usize> fmt::Debug for RingConsumer<SLOTS, BLOCK> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RingConsumer")
            .field("slots", &SLOTS)
            .field("block", &BLOCK)
            .field("cursor", &self.cursor)
            .finish()
    }
}

/// Refill half.
pub struct RingProducer<const SLOTS: usize, const BLOCK: usize> {
    shared: Arc<Shared<SLOTS, BLOCK>>,
    /// Slots taken from the mailbox and not handed out yet.
    batch: u64,
}

impl<const SLOTS: usize, const BLOCK: usize> RingProducer<SLOTS, BLOCK> {
    /// Overwrites `slot` and marks it fresh for the next time the consumer
    /// reaches it. Used to prime the ring; requested slots go through
    /// [`fulfil`](Self::fulfil).
    ///
    /// Refilling a slot the consumer is currently reading is a timing error
    /// on the caller's side; the consumer then sees a mix of old and new
    /// samples but never torn floats. An out-of-range `slot` is ignored.
    pub fn refill(&self, slot: usize, samples: &AudioBlock<BLOCK>) {
        let now = self.shared.ticks.load(Ordering::Acquire);
        self.write_slot(slot, next_visit(now, slot, SLOTS), samples);
    }

    /// Answers `request`: writes the slot and marks it fresh for the tick the
    /// request was made for.
    pub fn fulfil(&self, request: RefillRequest, samples: &AudioBlock<BLOCK>) {
        self.write_slot(request.slot, request.due_tick, samples);
    }

    fn write_slot(&self, slot: usize, due: u64, samples: &AudioBlock<BLOCK>) {
        if slot >= SLOTS {
            log::warn!("refill of slot {slot} ignored, ring has {SLOTS} slots");
            return;
        }
        let shared = &*self.shared;
        for (dst, &src) in shared.block(slot).iter().zip(samples) {
            dst.store(src.to_bits(), Ordering::Relaxed);
        }
        shared.filled_for[slot].store(due, Ordering::Release);
    }

    /// Next pending request, without waiting. Requests come out oldest
    /// first.
    ///
    /// `None` when nothing is pending.
    pub fn try_next_request(&mut self) -> Option<RefillRequest> {
        if self.batch == 0 {
            self.batch = self.shared.pending.swap(0, Ordering::AcqRel);
        }

        let mut oldest: Option<RefillRequest> = None;
        let mut bits = self.batch;
        while bits != 0 {
            let slot = bits.trailing_zeros() as usize;
            bits &= bits - 1;
            let due_tick = self.shared.due[slot].load(Ordering::Relaxed);
            if oldest.is_none_or(|r| due_tick < r.due_tick) {
                oldest = Some(RefillRequest { slot, due_tick });
            }
        }

        let request = oldest?;
        self.batch &= !(1u64 << request.slot);
        Some(request)
    }

    /// Waits for a request. `None` once the consumer was dropped and every
    /// pending request was handed out.
    pub fn next_request(&mut self) -> Option<RefillRequest> {
        loop {
            if let Some(request) = self.try_next_request() {
                return Some(request);
            }
            if !self.shared.consumer_alive.load(Ordering::Acquire) {
                // requests flagged just before the drop
                return self.try_next_request();
            }
            thread::sleep(REQUEST_POLL);
        }
    }

    /// Like [`next_request`](Self::next_request) with an upper bound on the
    /// wait. `None` on timeout as well.
    pub fn next_request_timeout(&mut self, timeout: Duration) -> Option<RefillRequest> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(request) = self.try_next_request() {
                return Some(request);
            }
            if !self.shared.consumer_alive.load(Ordering::Acquire) {
                return self.try_next_request();
            }
            let left = deadline.saturating_duration_since(Instant::now());
            if left.is_zero() {
                return None;
            }
            thread::sleep(left.min(REQUEST_POLL));
        }
    }

    /// Whether the consumer half still exists.
    pub fn consumer_alive(&self) -> bool {
        self.shared.consumer_alive.load(Ordering::Acquire)
    }

    pub fn stats(&self) -> RingStats {
        self.shared.stats()
    }
}

impl<const SLOTS: usize, const BLOCK: usize> Drop for RingProducer<SLOTS, BLOCK> {
    fn drop(&mut self) {
        self.shared.producer_alive.store(false, Ordering::Release);
    }
}

impl<const SLOTS: usize, const BLOCK: usize> fmt::Debug for RingProducer<SLOTS, BLOCK> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RingProducer")
            .field("slots", &SLOTS)
            .field("block", &BLOCK)
            .field("stats", &self.stats())
            .finish()
    }
}

/// First tick `>= now` at which the consumer reads `slot`.
#[inline]
fn next_visit(now: u64, slot: usize, slots: usize) -> u64 {
    let slots = slots as u64;
    let ahead = (slot as u64 + slots - now % slots) % slots;
    now + ahead
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block<const B: usize>(v: f32) -> AudioBlock<B> {
        [v; B]
    }

    #[test]
    fn next_visit_wraps() {
        assert_eq!(next_visit(0, 0, 8), 0);
        assert_eq!(next_visit(0, 5, 8), 5);
        assert_eq!(next_visit(9, 0, 8), 16);
        assert_eq!(next_visit(9, 1, 8), 9);
        assert_eq!(next_visit(9, 3, 8), 11);
    }

    #[test]
    fn starts_silent_and_fresh() {
        let (_p, mut c) = AudioRing::<4, 16>::new().split();
        for _ in 0..4 {
            assert_eq!(c.next_playback_block(), [0.0; 16]);
        }
        assert_eq!(c.stats().stale_blocks, 0);
        assert_eq!(c.stats().ticks, 4);
    }

    #[test]
    fn ninth_pull_replays_first_block_without_refill() {
        let (p, mut c) = DefaultRing::new().split();
        for slot in 0..DEFAULT_SLOTS {
            p.refill(slot, &block(slot as f32 + 1.0));
        }

        let first = c.next_playback_block();
        for _ in 1..DEFAULT_SLOTS {
            c.next_playback_block();
        }
        let ninth = c.next_playback_block();

        assert_eq!(first, ninth);
        assert_eq!(c.stats().stale_blocks, 1);
    }

    #[test]
    fn refill_before_next_visit_is_played() {
        let (mut p, mut c) = AudioRing::<4, 8>::new().split();
        let slot = c.pull_into(&mut [0.0; 8]);
        assert_eq!(slot, 0);

        let req = p.try_next_request().unwrap();
        assert_eq!(req, RefillRequest { slot: 0, due_tick: 4 });
        p.fulfil(req, &block(0.25));

        for _ in 0..3 {
            c.next_playback_block();
        }
        assert_eq!(c.next_playback_block(), [0.25; 8]);
        assert_eq!(c.stats().stale_blocks, 0);
    }

    #[test]
    fn zeros_come_back_as_zeros() {
        let (p, mut c) = AudioRing::<2, 4>::new().split();
        p.refill(0, &block(0.5));
        p.refill(0, &[0.0; 4]);
        assert_eq!(c.next_playback_block(), [0.0; 4]);
    }

    #[test]
    fn repeated_unanswered_slot_counts_dropped_requests() {
        let (p, mut c) = AudioRing::<2, 4>::new().split();
        // nobody services the mailbox: each slot holds one request, a second
        // one for the same slot replaces it
        for _ in 0..5 {
            c.next_playback_block();
        }
        let stats = p.stats();
        assert_eq!(stats.ticks, 5);
        assert_eq!(stats.dropped_requests, 3);
        assert_eq!(stats.stale_blocks, 3);
    }

    #[test]
    fn producer_sees_disconnect() {
        let (mut p, c) = AudioRing::<2, 4>::new().split();
        drop(c);
        assert!(!p.consumer_alive());
        assert_eq!(p.next_request(), None);
    }

    #[test]
    fn consumer_survives_dropped_producer() {
        let (p, mut c) = AudioRing::<2, 4>::new().split();
        p.refill(0, &block(1.0));
        drop(p);
        assert_eq!(c.next_playback_block(), [1.0; 4]);
        assert_eq!(c.next_playback_block(), [0.0; 4]);
        c.next_playback_block();
        assert_eq!(c.stats().dropped_requests, 3);
    }

    #[test]
    fn requests_come_out_oldest_first() {
        let (mut p, mut c) = AudioRing::<4, 2>::new().split();
        for _ in 0..6 {
            c.next_playback_block();
        }
        // slots 0 and 1 were requested twice; their newer requests are due last
        let order: Vec<_> = std::iter::from_fn(|| p.try_next_request()).collect();
        assert_eq!(
            order,
            vec![
                RefillRequest { slot: 2, due_tick: 6 },
                RefillRequest { slot: 3, due_tick: 7 },
                RefillRequest { slot: 0, due_tick: 8 },
                RefillRequest { slot: 1, due_tick: 9 },
            ]
        );
        assert_eq!(c.stats().dropped_requests, 2);
        assert_eq!(p.try_next_request(), None);
    }

    #[test]
    fn answered_requests_never_count_as_stale() {
        let (mut p, mut c) = AudioRing::<4, 4>::new().split();
        for tick in 0..64u64 {
            let played = c.next_playback_block();
            if tick >= 4 {
                assert_eq!(played, block(tick as f32));
            }
            let req = p.try_next_request().unwrap();
            assert_eq!(req.due_tick, tick + 4);
            p.fulfil(req, &block(req.due_tick as f32));
        }
        assert_eq!(c.stats().stale_blocks, 0);
        assert_eq!(c.stats().dropped_requests, 0);
    }

    #[test]
    fn late_answer_is_stale_for_one_lap_only() {
        let (mut p, mut c) = AudioRing::<2, 2>::new().split();
        c.next_playback_block();
        let late = p.try_next_request().unwrap();
        c.next_playback_block();
        c.next_playback_block(); // tick 2 replays slot 0
        assert_eq!(c.stats().stale_blocks, 1);

        p.fulfil(late, &block(1.0));
        while let Some(req) = p.try_next_request() {
            p.fulfil(req, &block(2.0));
        }
        c.next_playback_block();
        c.next_playback_block();
        assert_eq!(c.stats().stale_blocks, 1);
    }

    #[test]
    fn out_of_range_slot_is_ignored() {
        let (p, mut c) = AudioRing::<2, 4>::new().split();
        p.refill(0, &block(1.0));
        p.refill(1, &block(2.0));
        p.refill(2, &block(9.0));
        p.fulfil(RefillRequest { slot: 5, due_tick: 0 }, &block(9.0));

        assert_eq!(c.next_playback_block(), [1.0; 4]);
        assert_eq!(c.next_playback_block(), [2.0; 4]);
        assert_eq!(c.stats().stale_blocks, 0);
    }
}
