//! Frame time
//!
//! Raw frame intervals are clamped so a long stall (tab switch, debugger)
//! never turns into one giant simulation step.

/// Longest simulation step handed to `EntityManager::update`, in seconds.
pub const MAX_STEP_SECONDS: f32 = 1.0 / 30.0;

/// Converts wall-clock frame intervals into simulation steps.
#[derive(Debug, Clone)]
pub struct FrameClock {
    max_step: f32,
    frames: u64,
    elapsed: f64,
}

impl FrameClock {
    pub fn new(max_step: f32) -> Self {
        Self {
            max_step: max_step.max(0.0),
            frames: 0,
            elapsed: 0.0,
        }
    }

    /// Advance by a raw interval in milliseconds and return the clamped step
    /// in seconds.
    pub fn advance(&mut self, raw_ms: f64) -> f32 {
        let step = ((raw_ms.max(0.0) * 0.001) as f32).min(self.max_step);
        self.frames += 1;
        self.elapsed += f64::from(step);
        step
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Total simulated time in seconds.
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new(MAX_STEP_SECONDS)
    }
}
