use std::time::{Duration, Instant};

/// Timing of one rendered frame.
#[derive(Debug, Copy, Clone)]
pub struct FrameTime {
    /// Seconds since the previous frame, clamped.
    pub dt: f32,
    pub now: Instant,
    pub frame_index: u64,
    /// Smoothed frames per second.
    pub fps: f32,
}

/// Produces [`FrameTime`]s for one window.
///
/// `dt` is clamped to `[100us, 250ms]` so a debugger pause or a minimized
/// window does not hand a huge step to animation code.
#[derive(Debug, Clone)]
pub struct FrameClock {
    last: Instant,
    frame_index: u64,
    fps: f32,
}

const DT_MIN: Duration = Duration::from_micros(100);
const DT_MAX: Duration = Duration::from_millis(250);
/// Weight of the newest frame in the fps average.
const FPS_SMOOTHING: f32 = 0.1;

impl FrameClock {
    pub fn new() -> Self {
        Self::starting_at(Instant::now())
    }

    pub fn starting_at(now: Instant) -> Self {
        Self {
            last: now,
            frame_index: 0,
            fps: 0.0,
        }
    }

    /// Restarts the dt baseline, e.g. after the window was hidden.
    pub fn reset(&mut self) {
        self.last = Instant::now();
    }

    pub fn tick(&mut self) -> FrameTime {
        self.tick_at(Instant::now())
    }

    pub fn tick_at(&mut self, now: Instant) -> FrameTime {
        let dt = now.saturating_duration_since(self.last).clamp(DT_MIN, DT_MAX).as_secs_f32();
        self.last = now;

        let instant_fps = 1.0 / dt;
        self.fps = if self.frame_index == 0 {
            instant_fps
        } else {
            self.fps + (instant_fps - self.fps) * FPS_SMOOTHING
        };

        let ft = FrameTime {
            dt,
            now,
            frame_index: self.frame_index,
            fps: self.fps,
        };
        self.frame_index = self.frame_index.wrapping_add(1);
        ft
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}
