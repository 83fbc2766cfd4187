//! Frame timing: delta time between consecutive redraws.

use std::time::Instant;

#[derive(Clone, Copy, Debug)]
pub struct FrameClock {
    start: Instant,
    last: Instant,
}

impl FrameClock {
    pub fn new(now: Instant) -> Self {
        Self {
            start: now,
            last: now,
        }
    }

    /// Advance to `now` and return the elapsed seconds since the previous tick.
    pub fn tick(&mut self, now: Instant) -> f32 {
        let delta = now.saturating_duration_since(self.last);
        self.last = now;
        delta.as_secs_f32()
    }

    /// Seconds since the clock was created, as of the last tick.
    #[inline]
    pub fn elapsed_secs(&self) -> f32 {
        self.last.saturating_duration_since(self.start).as_secs_f32()
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new(Instant::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn tick_reports_delta_and_elapsed() {
        let t0 = Instant::now();
        let mut clock = FrameClock::new(t0);
        let dt = clock.tick(t0 + Duration::from_millis(250));
        assert!((dt - 0.25).abs() < 1e-6);
        let dt = clock.tick(t0 + Duration::from_millis(750));
        assert!((dt - 0.5).abs() < 1e-6);
        assert!((clock.elapsed_secs() - 0.75).abs() < 1e-6);
    }
}
