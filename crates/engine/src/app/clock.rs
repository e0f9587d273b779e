pub const DEFAULT_MAX_FRAME_DELTA_SECONDS: f32 = 0.1;

/// Turns raw frame timestamps into a clamped simulation delta.
///
/// The first timestamp measures from zero, so a clock started at `0.016`
/// produces a 16 ms first step.
#[derive(Debug, Clone, Copy)]
pub struct FrameClock {
    last_timestamp_seconds: f64,
    max_delta_seconds: f32,
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FRAME_DELTA_SECONDS)
    }
}

impl FrameClock {
    pub fn new(max_delta_seconds: f32) -> Self {
        let max_delta_seconds = if max_delta_seconds.is_finite() && max_delta_seconds > 0.0 {
            max_delta_seconds
        } else {
            DEFAULT_MAX_FRAME_DELTA_SECONDS
        };
        Self {
            last_timestamp_seconds: 0.0,
            max_delta_seconds,
        }
    }

    /// `dt = clamp(raw - last, 0, max)`; `last` always moves to `raw`.
    pub fn advance(&mut self, raw_timestamp_seconds: f64) -> f32 {
        if !raw_timestamp_seconds.is_finite() {
            return 0.0;
        }
        let raw_delta = raw_timestamp_seconds - self.last_timestamp_seconds;
        self.last_timestamp_seconds = raw_timestamp_seconds;
        (raw_delta as f32).clamp(0.0, self.max_delta_seconds)
    }

    pub fn last_timestamp_seconds(&self) -> f64 {
        self.last_timestamp_seconds
    }

    pub fn max_delta_seconds(&self) -> f32 {
        self.max_delta_seconds
    }
}
