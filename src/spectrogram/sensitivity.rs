//! Bounded gain applied to magnitudes before color mapping.

pub const MIN_SENSITIVITY: f32 = 0.5;
pub const MAX_SENSITIVITY: f32 = 5.0;
pub const DEFAULT_SENSITIVITY: f32 = 1.5;
pub const SENSITIVITY_STEP: f32 = 0.5;

/// Sensitivity multiplier, always within `[MIN_SENSITIVITY, MAX_SENSITIVITY]`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Sensitivity(f32);

impl Default for Sensitivity {
    fn default() -> Self {
        Self(DEFAULT_SENSITIVITY)
    }
}

impl Sensitivity {
    /// Creates a sensitivity, clamping into bounds. NaN falls back to the default.
    pub fn new(value: f32) -> Self {
        if value.is_nan() {
            return Self::default();
        }
        Self(value.clamp(MIN_SENSITIVITY, MAX_SENSITIVITY))
    }

    pub fn value(self) -> f32 {
        self.0
    }

    /// Adds `delta` and clamps. Returns the new value.
    pub fn adjust(&mut self, delta: f32) -> f32 {
        if !delta.is_nan() {
            self.0 = (self.0 + delta).clamp(MIN_SENSITIVITY, MAX_SENSITIVITY);
        }
        self.0
    }

    pub fn apply(self, magnitude: f32) -> f32 {
        magnitude * self.0
    }
}

impl std::fmt::Display for Sensitivity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.1}x", self.0)
    }
}
