//! Frame timing for the main loop.

use std::time::{Duration, Instant};

/// Measures per-frame delta time and reports a frame rate once per interval.
#[derive(Debug)]
pub struct FrameTimer {
    start: Instant,
    last_tick: Instant,
    report_interval: Duration,
    window_start: Instant,
    frames_in_window: u32,
}

impl FrameTimer {
    /// Create a timer that reports its frame rate every `report_interval`.
    pub fn new(report_interval: Duration) -> Self {
        let now = Instant::now();
        Self {
            start: now,
            last_tick: now,
            report_interval,
            window_start: now,
            frames_in_window: 0,
        }
    }

    /// Total time since the timer was created.
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Record a finished frame and return the time since the previous one.
    pub fn tick(&mut self) -> Duration {
        self.tick_at(Instant::now())
    }

    fn tick_at(&mut self, now: Instant) -> Duration {
        let delta = now.saturating_duration_since(self.last_tick);
        self.last_tick = now;
        self.frames_in_window += 1;
        delta
    }

    /// Returns the average frames per second over the last interval once the
    /// interval has elapsed, then starts a new interval.
    pub fn take_fps(&mut self) -> Option<f32> {
        self.take_fps_at(Instant::now())
    }

    fn take_fps_at(&mut self, now: Instant) -> Option<f32> {
        let window = now.saturating_duration_since(self.window_start);
        if window < self.report_interval || window.is_zero() {
            return None;
        }
        let fps = self.frames_in_window as f32 / window.as_secs_f32();
        self.window_start = now;
        self.frames_in_window = 0;
        Some(fps)
    }

    /// Restart timing without reporting, e.g. after the window was minimized.
    pub fn reset(&mut self) {
        let now = Instant::now();
        self.last_tick = now;
        self.window_start = now;
        self.frames_in_window = 0;
    }
}

impl Default for FrameTimer {
    fn default() -> Self {
        Self::new(Duration::from_secs(1))
    }
}
