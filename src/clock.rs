//! Fixed-step simulation clock.
//!
//! Display callbacks feed elapsed time in; at most one simulation step comes
//! out per callback. When more than one interval has piled up (a long frame,
//! a backgrounded window) the surplus is discarded rather than replayed.

use tracing::trace;

pub const MIN_SPEED: u32 = 1;
pub const MAX_SPEED: u32 = 10;

/// Step interval for a speed slider value, clamped to 1..=10
pub fn interval_for_speed(base_interval_ms: f64, speed: u32) -> f64 {
    base_interval_ms / speed.clamp(MIN_SPEED, MAX_SPEED) as f64
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimulationClock {
    step_interval_ms: f64,
    accumulated_ms: f64,
    last_frame_ms: Option<f64>,
    running: bool,
    steps_fired: u64,
}

impl SimulationClock {
    pub fn new(step_interval_ms: f64) -> Self {
        SimulationClock {
            step_interval_ms: step_interval_ms.max(f64::EPSILON),
            accumulated_ms: 0.0,
            last_frame_ms: None,
            running: true,
            steps_fired: 0,
        }
    }

    pub fn from_speed(base_interval_ms: f64, speed: u32) -> Self {
        Self::new(interval_for_speed(base_interval_ms, speed))
    }

    pub fn step_interval_ms(&self) -> f64 {
        self.step_interval_ms
    }

    pub fn set_step_interval(&mut self, step_interval_ms: f64) {
        self.step_interval_ms = step_interval_ms.max(f64::EPSILON);
    }

    pub fn set_speed(&mut self, base_interval_ms: f64, speed: u32) {
        self.set_step_interval(interval_for_speed(base_interval_ms, speed));
    }

    pub fn accumulated_ms(&self) -> f64 {
        self.accumulated_ms
    }

    pub fn steps_fired(&self) -> u64 {
        self.steps_fired
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Stop firing steps. Time passing while paused is not accumulated.
    pub fn pause(&mut self) {
        self.running = false;
    }

    /// Resume, forgetting the timestamp of the last frame seen before pausing
    pub fn resume(&mut self) {
        self.running = true;
        self.last_frame_ms = None;
    }

    pub fn reset(&mut self) {
        self.accumulated_ms = 0.0;
        self.last_frame_ms = None;
        self.steps_fired = 0;
    }

    /// Feed `delta_ms` of elapsed time. Returns true when a step is due.
    pub fn advance(&mut self, delta_ms: f64) -> bool {
        if !self.running {
            return false;
        }
        if delta_ms.is_finite() && delta_ms > 0.0 {
            self.accumulated_ms += delta_ms;
        }
        if self.accumulated_ms >= self.step_interval_ms {
            trace!(
                accumulated_ms = self.accumulated_ms,
                interval_ms = self.step_interval_ms,
                "step due"
            );
            self.accumulated_ms = 0.0;
            self.steps_fired += 1;
            return true;
        }
        false
    }

    /// Feed an absolute frame timestamp; the first frame only sets the
    /// reference point.
    pub fn on_frame(&mut self, now_ms: f64) -> bool {
        let delta = match self.last_frame_ms {
            Some(last) => now_ms - last,
            None => 0.0,
        };
        self.last_frame_ms = Some(now_ms);
        self.advance(delta)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_speed_mapping() {
        assert_eq!(interval_for_speed(500.0, 1), 500.0);
        assert_eq!(interval_for_speed(500.0, 5), 100.0);
        assert_eq!(interval_for_speed(500.0, 0), 500.0);
        assert_eq!(interval_for_speed(500.0, 99), 50.0);
    }

    #[test]
    fn test_fires_on_interval() {
        let mut clock = SimulationClock::new(100.0);
        assert!(!clock.advance(60.0));
        assert!(clock.advance(40.0));
        assert_eq!(clock.accumulated_ms(), 0.0);
        assert!(!clock.advance(99.0));
    }

    #[test]
    fn test_long_frame_fires_once() {
        let mut clock = SimulationClock::new(100.0);
        assert!(clock.advance(1000.0));
        assert_eq!(clock.accumulated_ms(), 0.0);
        assert!(!clock.advance(0.0));
        assert_eq!(clock.steps_fired(), 1);
    }

    #[test]
    fn test_pause_ignores_time() {
        let mut clock = SimulationClock::new(100.0);
        clock.advance(50.0);
        clock.pause();
        assert!(!clock.advance(500.0));
        clock.resume();
        assert!(!clock.advance(49.0));
        assert!(clock.advance(1.0));
    }

    #[test]
    fn test_on_frame_timestamps() {
        let mut clock = SimulationClock::new(16.0);
        assert!(!clock.on_frame(1000.0));
        assert!(!clock.on_frame(1010.0));
        assert!(clock.on_frame(1016.0));
        assert!(!clock.on_frame(1020.0));
    }

    #[test]
    fn test_negative_delta_ignored() {
        let mut clock = SimulationClock::new(10.0);
        clock.advance(5.0);
        assert!(!clock.advance(-100.0));
        assert_eq!(clock.accumulated_ms(), 5.0);
    }
}
