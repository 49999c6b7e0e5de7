/// Output settings shared by the sinks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioConfig {
    /// Rate the synth runs at. Device sinks fall back to the device default
    /// when it is not supported and report the rate they actually opened.
    pub sample_rate: u32,
    /// cpal host name to try first ("ALSA", "JACK", ...).
    pub preferred_host: Option<String>,
    /// Device callback size in frames; `None` leaves it to the host.
    pub buffer_frames: Option<u32>,
}

impl AudioConfig {
    pub const DEFAULT_SAMPLE_RATE: u32 = 48_000;

    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    pub fn with_preferred_host(mut self, host: impl Into<String>) -> Self {
        self.preferred_host = Some(host.into());
        self
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: Self::DEFAULT_SAMPLE_RATE,
            preferred_host: None,
            buffer_frames: None,
        }
    }
}
