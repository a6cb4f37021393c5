//! Frame timing
//!
//! The timer does not read a clock itself; the frame loop feeds it the window
//! clock (`glfw::Glfw::get_time`) once per iteration, which keeps it
//! deterministic under test.

/// Per-frame timer producing the `total_time` / `delta_time` uniforms
#[derive(Debug, Clone)]
pub struct FrameTimer {
    start: f64,
    last: f64,
    delta_time: f32,
    total_time: f32,
    frame_count: u64,
}

impl FrameTimer {
    /// Create a timer whose zero point is `now` (seconds)
    pub fn starting_at(now: f64) -> Self {
        Self {
            start: now,
            last: now,
            delta_time: 0.0,
            total_time: 0.0,
            frame_count: 0,
        }
    }

    /// Advance the timer to `now` (should be called once per frame)
    ///
    /// A clock that steps backwards yields a zero delta rather than a negative one.
    pub fn advance(&mut self, now: f64) {
        let now = now.max(self.last);
        self.delta_time = (now - self.last) as f32;
        self.total_time = (now - self.start) as f32;
        self.last = now;
        self.frame_count += 1;
    }

    /// Get the time since the last frame in seconds
    pub fn delta_time(&self) -> f32 {
        self.delta_time
    }

    /// Get the total elapsed time since the timer started
    pub fn total_time(&self) -> f32 {
        self.total_time
    }

    /// Get the current frame count
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Get the average FPS since the timer started
    pub fn average_fps(&self) -> f32 {
        if self.total_time > 0.0 {
            self.frame_count as f32 / self.total_time
        } else {
            0.0
        }
    }

    /// Get the current FPS (based on last frame time)
    pub fn current_fps(&self) -> f32 {
        if self.delta_time > 0.0 {
            1.0 / self.delta_time
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_advance_accumulates_total_and_delta() {
        let mut timer = FrameTimer::starting_at(10.0);
        timer.advance(10.5);
        timer.advance(10.75);

        assert_relative_eq!(timer.delta_time(), 0.25);
        assert_relative_eq!(timer.total_time(), 0.75);
        assert_eq!(timer.frame_count(), 2);
        assert_relative_eq!(timer.current_fps(), 4.0);
    }

    #[test]
    fn test_backwards_clock_gives_zero_delta() {
        let mut timer = FrameTimer::starting_at(5.0);
        timer.advance(6.0);
        timer.advance(5.5);

        assert_eq!(timer.delta_time(), 0.0);
        assert_relative_eq!(timer.total_time(), 1.0);
    }

    #[test]
    fn test_fresh_timer_reports_zero_fps() {
        let timer = FrameTimer::starting_at(0.0);
        assert_eq!(timer.average_fps(), 0.0);
        assert_eq!(timer.current_fps(), 0.0);
    }
}
