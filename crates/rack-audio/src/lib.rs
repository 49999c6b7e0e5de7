//! Audio block ring for a real-time output and a synthesis thread.
//!
//! ```text
//!  synth ──fill──▶ RefillAdapter ──refill──▶ ┌──────────── AudioRing ───────────┐
//!                        ▲                   │ slot 0 │ slot 1 │ … │ slot N-1   │
//!                        │                   └──────────────────────────────────┘
//!                 RefillRequest                               │ next_playback_block
//!                        └──────────── RingConsumer ◀─────────┘  (real-time sink)
//! ```
//!
//! The consumer never blocks. A slot that was not refilled in time replays
//! its previous contents; that shows up in [`RingStats::stale_blocks`].
//!
//! ```
//! use rack_audio::{AudioRing, RefillAdapter};
//!
//! let (producer, mut consumer) = AudioRing::<8, 128>::new().split();
//! let mut refill = RefillAdapter::new(producer, |buf: &mut [f32]| buf.fill(0.1));
//! refill.prime();
//!
//! let block = consumer.next_playback_block();
//! assert_eq!(block, [0.1; 128]);
//! assert_eq!(refill.service_pending(), 1);
//! ```

pub mod clock;
pub mod config;
pub mod refill;
pub mod ring;
pub mod sink;

pub use clock::{BlockClock, BlockTime, block_period};
pub use config::AudioConfig;
pub use refill::{RefillAdapter, Synth, spawn_refill_thread};
pub use ring::{
    AudioBlock, AudioRing, DEFAULT_BLOCK, DEFAULT_SLOTS, DefaultRing, MAX_SLOTS, RefillRequest,
    RingConsumer, RingProducer, RingStats,
};
pub use sink::{BlockPump, TimerSink};
#[cfg(feature = "cpal")]
pub use sink::{CpalSink, OutputDevice};
