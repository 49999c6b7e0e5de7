use anyhow::{Context, anyhow};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{BufferSize, Sample, SampleFormat, SizedSample, StreamConfig};
use dasp_sample::FromSample;

use super::BlockPump;
use crate::config::AudioConfig;
use crate::ring::RingConsumer;

/// An opened output device, not yet playing.
///
/// Open the device first and build the synth at [`sample_rate`](Self::sample_rate):
/// when the requested rate is unsupported the device default is used.
pub struct OutputDevice {
    device: cpal::Device,
    config: StreamConfig,
    format: SampleFormat,
    host: String,
}

impl OutputDevice {
    /// Tries the preferred host first, then every other host, taking the
    /// first default output device that accepts an f32/i16/u16 stream.
    pub fn open(cfg: &AudioConfig) -> anyhow::Result<Self> {
        let available = cpal::available_hosts();
        let mut order = Vec::with_capacity(available.len());
        if let Some(preferred) = cfg.preferred_host.as_deref() {
            match available.iter().find(|h| h.name() == preferred) {
                Some(&id) => order.push(id),
                None => log::warn!("audio host {preferred:?} not available"),
            }
        }
        for id in available {
            if !order.contains(&id) {
                order.push(id);
            }
        }

        let mut last_error = None;
        for id in order {
            match Self::open_on(id, cfg) {
                Ok(dev) => return Ok(dev),
                Err(err) => {
                    log::debug!("audio host {} skipped: {err:#}", id.name());
                    last_error = Some(err);
                }
            }
        }
        Err(last_error.unwrap_or_else(|| anyhow!("no audio hosts available")))
    }

    fn open_on(id: cpal::HostId, cfg: &AudioConfig) -> anyhow::Result<Self> {
        let host = cpal::host_from_id(id)?;
        let host_name = id.name().to_string();
        let device = host
            .default_output_device()
            .ok_or_else(|| anyhow!("host {host_name} has no default output device"))?;

        let wanted = cpal::SampleRate(cfg.sample_rate);
        let exact = device
            .supported_output_configs()
            .with_context(|| format!("enumerating output configs on {host_name}"))?
            .filter(|c| is_supported_format(c.sample_format()))
            .find(|c| c.min_sample_rate() <= wanted && c.max_sample_rate() >= wanted)
            .map(|c| c.with_sample_rate(wanted));

        let supported = match exact {
            Some(c) => c,
            None => {
                let fallback = device
                    .default_output_config()
                    .with_context(|| format!("querying default output config on {host_name}"))?;
                log::warn!(
                    "{} Hz not supported on {host_name}, using device default {} Hz",
                    cfg.sample_rate,
                    fallback.sample_rate().0
                );
                fallback
            }
        };

        let format = supported.sample_format();
        if !is_supported_format(format) {
            return Err(anyhow!("unsupported sample format {format:?} on {host_name}"));
        }

        let mut config = supported.config();
        if let Some(frames) = cfg.buffer_frames {
            config.buffer_size = BufferSize::Fixed(frames);
        }

        Ok(Self {
            device,
            config,
            format,
            host: host_name,
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.config.sample_rate.0
    }

    pub fn channels(&self) -> u16 {
        self.config.channels
    }

    pub fn host_name(&self) -> &str {
        &self.host
    }

    /// Starts the device stream, pulling from `consumer` in its callback.
    pub fn play<const SLOTS: usize, const BLOCK: usize>(
        self,
        consumer: RingConsumer<SLOTS, BLOCK>,
    ) -> anyhow::Result<CpalSink> {
        let pump = BlockPump::new(consumer);
        let stream = match self.format {
            SampleFormat::F32 => build_stream::<f32, SLOTS, BLOCK>(&self.device, &self.config, pump)?,
            SampleFormat::I16 => build_stream::<i16, SLOTS, BLOCK>(&self.device, &self.config, pump)?,
            SampleFormat::U16 => build_stream::<u16, SLOTS, BLOCK>(&self.device, &self.config, pump)?,
            other => return Err(anyhow!("unsupported sample format {other:?}")),
        };
        stream.play().context("starting output stream")?;

        log::info!(
            "audio output on {}: {} Hz, {} ch, {:?}",
            self.host,
            self.config.sample_rate.0,
            self.config.channels,
            self.format
        );
        Ok(CpalSink {
            _stream: stream,
            sample_rate: self.config.sample_rate.0,
        })
    }
}

/// Playing device stream. Playback stops when dropped.
pub struct CpalSink {
    _stream: cpal::Stream,
    sample_rate: u32,
}

impl CpalSink {
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

fn is_supported_format(format: SampleFormat) -> bool {
    matches!(format, SampleFormat::F32 | SampleFormat::I16 | SampleFormat::U16)
}

fn build_stream<T, const SLOTS: usize, const BLOCK: usize>(
    device: &cpal::Device,
    config: &StreamConfig,
    mut pump: BlockPump<SLOTS, BLOCK>,
) -> anyhow::Result<cpal::Stream>
where
    T: SizedSample + FromSample<f32>,
{
    let channels = config.channels as usize;
    device
        .build_output_stream(
            config,
            move |data: &mut [T], _| {
                pump.fill_interleaved(data, channels, |s| T::from_sample(s));
            },
            |err| log::error!("audio stream error: {err}"),
            None,
        )
        .context("building output stream")
}
