//! Mosh Metrics - frame sweep instrumentation
//!
//! Tracks how long each `EntityManager::update` sweep takes and what it did
//! (entities updated, failures isolated, cross-entity messages delivered).
//! Everything here vanishes in production builds via feature flags.
//!
//! # Feature Flags
//!
//! - `metrics` - Enable metrics collection (default: disabled)
//!
//! # Usage
//!
//! ```ignore
//! use mosh_metrics::{SweepProfile, SweepSample};
//!
//! let mut profile = SweepProfile::new(120); // Keep the last 120 sweeps
//! profile.begin();
//! // ... update every entity ...
//! profile.end(SweepSample { entities: 12, failures: 0, messages: 3 });
//! println!("sweep: {:.3} ms", profile.mean_sweep_ms());
//! ```

#[cfg(feature = "metrics")]
mod counter;
#[cfg(feature = "metrics")]
mod rolling;
#[cfg(feature = "metrics")]
mod sweep;

#[cfg(feature = "metrics")]
pub use rolling::RollingWindow;
#[cfg(feature = "metrics")]
pub use sweep::SweepProfile;

/// What a single sweep did, reported by the entity manager.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepSample {
    pub entities: usize,
    pub failures: usize,
    pub messages: usize,
}

// ============================================================================
// No-op stubs when metrics disabled
// ============================================================================

#[cfg(not(feature = "metrics"))]
#[derive(Debug, Default)]
pub struct SweepProfile;

#[cfg(not(feature = "metrics"))]
impl SweepProfile {
    pub fn new(_capacity: usize) -> Self { Self }
    pub fn begin(&mut self) {}
    pub fn end(&mut self, _sample: SweepSample) {}
    pub fn sweeps(&self) -> u64 { 0 }
    pub fn total_failures(&self) -> u64 { 0 }
    pub fn total_messages(&self) -> u64 { 0 }
    pub fn last(&self) -> Option<SweepSample> { None }
    pub fn mean_sweep_ms(&self) -> f64 { 0.0 }
    pub fn worst_sweep_ms(&self) -> f64 { 0.0 }
}
