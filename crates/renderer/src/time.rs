use std::time::Instant;

/// Wrap point for the `time` uniform, in milliseconds.
///
/// Keeping the shader-visible value below ten seconds bounds float
/// precision loss over long sessions; shaders are expected to animate in
/// cycles anyway.
pub const TIME_WRAP_MILLIS: f64 = 10_000.0;

/// Snapshot of the clock taken immediately before a draw.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeSample {
    /// Raw milliseconds since the source's origin; strictly increasing for
    /// monotonic sources and never wrapped.
    pub millis: f64,
}

impl TimeSample {
    pub fn new(millis: f64) -> Self {
        Self { millis }
    }

    /// The value handed to the shader: wall-clock milliseconds wrapped at
    /// [`TIME_WRAP_MILLIS`].
    pub fn uniform_millis(&self) -> f32 {
        (self.millis % TIME_WRAP_MILLIS) as f32
    }
}

/// Abstraction over where time values originate from.
pub trait TimeSource {
    /// Resets the source to its initial state.
    fn reset(&mut self);
    /// Produces a time sample for the next draw.
    fn sample(&mut self) -> TimeSample;
}

/// Time source backed by the system monotonic clock.
#[derive(Debug, Clone, Copy)]
pub struct SystemTimeSource {
    origin: Instant,
}

impl SystemTimeSource {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Default for SystemTimeSource {
    fn default() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl TimeSource for SystemTimeSource {
    fn reset(&mut self) {
        self.origin = Instant::now();
    }

    fn sample(&mut self) -> TimeSample {
        TimeSample::new(self.origin.elapsed().as_secs_f64() * 1_000.0)
    }
}

/// Time source that always reports a fixed timestamp.
#[derive(Debug, Clone, Copy)]
pub struct FixedTimeSource {
    millis: f64,
}

impl FixedTimeSource {
    pub fn new(millis: f64) -> Self {
        Self { millis }
    }
}

impl TimeSource for FixedTimeSource {
    fn reset(&mut self) {}

    fn sample(&mut self) -> TimeSample {
        TimeSample::new(self.millis)
    }
}

/// Deterministic source advancing by a fixed step per sample; used by tests
/// and replay-style captures where wall-clock jitter is unwanted.
#[derive(Debug, Clone, Copy)]
pub struct SteppingTimeSource {
    start: f64,
    step: f64,
    current: f64,
}

impl SteppingTimeSource {
    pub fn new(start_millis: f64, step_millis: f64) -> Self {
        Self {
            start: start_millis,
            step: step_millis,
            current: start_millis,
        }
    }
}

impl TimeSource for SteppingTimeSource {
    fn reset(&mut self) {
        self.current = self.start;
    }

    fn sample(&mut self) -> TimeSample {
        let sample = TimeSample::new(self.current);
        self.current += self.step;
        sample
    }
}

/// Convenient alias for owning time sources behind trait objects.
pub type BoxedTimeSource = Box<dyn TimeSource>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_value_wraps_at_ten_seconds() {
        assert_eq!(TimeSample::new(0.0).uniform_millis(), 0.0);
        assert_eq!(TimeSample::new(9_999.0).uniform_millis(), 9_999.0);
        assert_eq!(TimeSample::new(10_000.0).uniform_millis(), 0.0);
        assert_eq!(TimeSample::new(23_500.0).uniform_millis(), 3_500.0);
    }

    #[test]
    fn system_source_is_monotonic() {
        let mut source = SystemTimeSource::new();
        let first = source.sample();
        let second = source.sample();
        assert!(second.millis >= first.millis);
    }

    #[test]
    fn stepping_source_advances_and_resets() {
        let mut source = SteppingTimeSource::new(100.0, 16.0);
        assert_eq!(source.sample().millis, 100.0);
        assert_eq!(source.sample().millis, 116.0);
        source.reset();
        assert_eq!(source.sample().millis, 100.0);
    }
}
