//! Frame-rate tracking for the panel footer

use std::time::{Duration, Instant};

const WINDOW: usize = 120; // 2 seconds at 60fps

/// Fixed-size ring of recent frame durations
pub struct FrameClock {
    frame_times: [f32; WINDOW],
    head: usize,
    filled: usize,
    total: f32,
    last_frame: Instant,
}

impl FrameClock {
    pub fn new() -> Self {
        Self {
            frame_times: [0.0; WINDOW],
            head: 0,
            filled: 0,
            total: 0.0,
            last_frame: Instant::now(),
        }
    }

    /// Record the time since the previous call
    pub fn tick(&mut self) {
        let now = Instant::now();
        let delta = now.duration_since(self.last_frame);
        self.last_frame = now;
        self.push(delta);
    }

    fn push(&mut self, delta: Duration) {
        let ms = delta.as_secs_f32() * 1000.0;
        self.total += ms - self.frame_times[self.head];
        self.frame_times[self.head] = ms;
        self.head = (self.head + 1) % WINDOW;
        self.filled = (self.filled + 1).min(WINDOW);
    }

    /// Average frames per second over the recorded window
    pub fn fps(&self) -> f32 {
        if self.filled == 0 {
            return 0.0;
        }
        let avg_ms = self.total / self.filled as f32;
        if avg_ms > 0.001 {
            1000.0 / avg_ms
        } else {
            0.0
        }
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fps_average() {
        let mut clock = FrameClock::new();
        assert_eq!(clock.fps(), 0.0);
        for _ in 0..10 {
            clock.push(Duration::from_millis(20));
        }
        assert!((clock.fps() - 50.0).abs() < 0.01);
    }

    #[test]
    fn test_old_frames_roll_off() {
        let mut clock = FrameClock::new();
        for _ in 0..WINDOW {
            clock.push(Duration::from_millis(100));
        }
        for _ in 0..WINDOW {
            clock.push(Duration::from_millis(10));
        }
        assert!((clock.fps() - 100.0).abs() < 0.5);
    }
}
