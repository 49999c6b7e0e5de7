use std::f32::consts::TAU;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use rack_audio::{
    AudioConfig, AudioRing, DEFAULT_BLOCK, DEFAULT_SLOTS, RefillAdapter, Synth, TimerSink,
    spawn_refill_thread,
};

/// Frequency shared between the UI and the synth, as `f32` bits.
#[derive(Debug, Clone)]
pub struct SharedFrequency(Arc<AtomicU32>);

impl SharedFrequency {
    pub fn new(hz: f32) -> Self {
        Self(Arc::new(AtomicU32::new(hz.to_bits())))
    }

    pub fn get(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::Relaxed))
    }

    pub fn set(&self, hz: f32) {
        self.0.store(hz.to_bits(), Ordering::Relaxed);
    }
}

pub struct Sine {
    sample_rate: f32,
    phase: f32,
    gain: f32,
    frequency: SharedFrequency,
}

impl Sine {
    pub fn new(sample_rate: u32, frequency: SharedFrequency) -> Self {
        Self {
            sample_rate: sample_rate.max(1) as f32,
            phase: 0.0,
            gain: 0.2,
            frequency,
        }
    }
}

impl Synth for Sine {
    fn fill(&mut self, buffer: &mut [f32]) {
        let step = TAU * self.frequency.get() / self.sample_rate;
        for s in buffer {
            *s = self.gain * self.phase.sin();
            self.phase = (self.phase + step) % TAU;
        }
    }
}

type Refill = RefillAdapter<Sine, DEFAULT_SLOTS, DEFAULT_BLOCK>;

enum Sink {
    #[cfg(feature = "cpal")]
    Device(rack_audio::CpalSink),
    Timer(TimerSink),
}

/// The running audio path: refill thread plus one sink.
pub struct AudioOut {
    sink: Option<Sink>,
    refill: Option<JoinHandle<Refill>>,
    sample_rate: u32,
}

impl AudioOut {
    pub fn start(config: &AudioConfig, frequency: SharedFrequency) -> Result<Self> {
        let (producer, consumer) = AudioRing::<DEFAULT_SLOTS, DEFAULT_BLOCK>::new().split();

        #[cfg(feature = "cpal")]
        let device = match rack_audio::OutputDevice::open(config) {
            Ok(device) => Some(device),
            Err(err) => {
                log::warn!("no audio device, falling back to the timer sink: {err:#}");
                None
            }
        };
        #[cfg(feature = "cpal")]
        let sample_rate = device.as_ref().map_or(config.sample_rate, |d| d.sample_rate());
        #[cfg(not(feature = "cpal"))]
        let sample_rate = config.sample_rate;

        let mut adapter = RefillAdapter::new(producer, Sine::new(sample_rate, frequency));
        adapter.prime();
        let refill = spawn_refill_thread(adapter).context("spawning refill thread")?;

        #[cfg(feature = "cpal")]
        if let Some(device) = device {
            let sink = device.play(consumer).context("starting audio device")?;
            return Ok(Self {
                sink: Some(Sink::Device(sink)),
                refill: Some(refill),
                sample_rate,
            });
        }

        // no device: pace the ring on a timer so the refill path still runs
        let sink = TimerSink::start(consumer, sample_rate, |_block| {}).context("starting timer sink")?;
        Ok(Self {
            sink: Some(Sink::Timer(sink)),
            refill: Some(refill),
            sample_rate,
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Stops the sink, which releases the consumer and ends the refill loop.
    pub fn shutdown(&mut self) {
        match self.sink.take() {
            #[cfg(feature = "cpal")]
            Some(Sink::Device(sink)) => drop(sink),
            Some(Sink::Timer(sink)) => sink.stop(),
            None => {}
        }

        let Some(handle) = self.refill.take() else { return };
        let deadline = Instant::now() + Duration::from_millis(250);
        while !handle.is_finished() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        if !handle.is_finished() {
            log::warn!("refill thread still running at shutdown");
            return;
        }
        match handle.join() {
            Ok(adapter) => {
                let stats = adapter.stats();
                log::info!(
                    "audio: {} blocks played, {} refills, {} stale, {} dropped requests",
                    stats.ticks,
                    adapter.refills(),
                    stats.stale_blocks,
                    stats.dropped_requests
                );
            }
            Err(_) => log::error!("refill thread panicked"),
        }
    }
}

impl Drop for AudioOut {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sine_is_continuous_across_blocks() {
        let freq = SharedFrequency::new(1000.0);
        let mut synth = Sine::new(48_000, freq);
        let mut a = [0.0; 64];
        let mut b = [0.0; 64];
        synth.fill(&mut a);
        synth.fill(&mut b);

        let step = TAU * 1000.0 / 48_000.0;
        let expected = 0.2 * (64.0 * step % TAU).sin();
        assert!((b[0] - expected).abs() < 1e-4);
        assert!(a.iter().chain(&b).all(|s| s.abs() <= 0.2 + 1e-6));
    }

    #[test]
    fn frequency_change_reaches_the_synth() {
        let freq = SharedFrequency::new(0.0);
        let mut synth = Sine::new(48_000, freq.clone());
        let mut buf = [1.0; 8];
        synth.fill(&mut buf);
        assert!(buf.iter().all(|&s| s == 0.0));

        freq.set(440.0);
        synth.fill(&mut buf);
        assert!(buf[1] > 0.0);
    }
}
