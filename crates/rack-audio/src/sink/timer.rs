use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Instant;

use crate::clock::BlockClock;
use crate::ring::{AudioBlock, RingConsumer};

/// Pulls one block per block period on its own thread and passes it to
/// `output`. Stands in for a device when there is none (tests, headless
/// runs, offline capture).
#[derive(Debug)]
pub struct TimerSink {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl TimerSink {
    pub fn start<F, const SLOTS: usize, const BLOCK: usize>(
        mut consumer: RingConsumer<SLOTS, BLOCK>,
        sample_rate: u32,
        mut output: F,
    ) -> io::Result<Self>
    where
        F: FnMut(&AudioBlock<BLOCK>) + Send + 'static,
    {
        let stop = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stop);

        let handle = thread::Builder::new()
            .name("rack-audio-timer".into())
            .spawn(move || {
                let mut clock = BlockClock::new(sample_rate, BLOCK);
                let mut block = [0.0; BLOCK];
                while !flag.load(Ordering::Relaxed) {
                    let bt = clock.tick();
                    let wait = bt.due.saturating_duration_since(Instant::now());
                    if !wait.is_zero() {
                        thread::sleep(wait);
                    }
                    consumer.pull_into(&mut block);
                    output(&block);
                }
                let stats = consumer.stats();
                log::debug!(
                    "timer sink stopped: ticks={} stale={} dropped={}",
                    stats.ticks,
                    stats.stale_blocks,
                    stats.dropped_requests
                );
            })?;

        log::info!("timer sink started ({sample_rate} Hz, {SLOTS} x {BLOCK})");
        Ok(Self {
            stop,
            handle: Some(handle),
        })
    }

    /// Stops pulling and waits for the thread. Dropping the consumer there
    /// also ends the refill loop.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("timer sink thread panicked");
            }
        }
    }
}

impl Drop for TimerSink {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc;
    use std::time::Duration;

    use super::*;
    use crate::ring::AudioRing;

    #[test]
    fn delivers_blocks_until_stopped() {
        let (mut p, c) = AudioRing::<4, 64>::new().split();
        for slot in 0..4 {
            p.refill(slot, &[slot as f32; 64]);
        }

        let (tx, rx) = mpsc::channel();
        let sink = TimerSink::start(c, 48_000, move |block: &[f32; 64]| {
            let _ = tx.send(block[0]);
        })
        .unwrap();

        let first: Vec<f32> = (0..4)
            .map(|_| rx.recv_timeout(Duration::from_secs(2)).unwrap())
            .collect();
        sink.stop();

        assert_eq!(first, vec![0.0, 1.0, 2.0, 3.0]);
        // requests flagged before the stop are still handed out
        assert!(!p.consumer_alive());
        let req = p.next_request_timeout(Duration::from_secs(2)).unwrap();
        assert!(req.slot < 4);
        assert!(req.due_tick >= 4);
    }
}
