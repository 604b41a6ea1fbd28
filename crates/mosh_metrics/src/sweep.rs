//! Per-sweep timing and bookkeeping

use super::counter::EventCounter;
use super::rolling::RollingWindow;
use super::SweepSample;
use std::time::{Duration, Instant};

pub struct SweepProfile {
    started: Option<Instant>,
    durations: RollingWindow<Duration>,
    last: Option<SweepSample>,
    totals: EventCounter,
}

impl SweepProfile {
    pub fn new(capacity: usize) -> Self {
        Self {
            started: None,
            durations: RollingWindow::new(capacity),
            last: None,
            totals: EventCounter::new(),
        }
    }

    pub fn begin(&mut self) {
        self.started = Some(Instant::now());
    }

    /// Close the sweep opened by [`SweepProfile::begin`]. A sample without a
    /// matching `begin` is still counted, with a zero duration.
    pub fn end(&mut self, sample: SweepSample) {
        let elapsed = self
            .started
            .take()
            .map(|start| start.elapsed())
            .unwrap_or(Duration::ZERO);
        self.durations.push(elapsed);
        self.last = Some(sample);
        self.totals.add("sweeps", 1);
        self.totals.add("entities", sample.entities as u64);
        self.totals.add("failures", sample.failures as u64);
        self.totals.add("messages", sample.messages as u64);
    }

    pub fn sweeps(&self) -> u64 {
        self.totals.get("sweeps")
    }

    pub fn total_failures(&self) -> u64 {
        self.totals.get("failures")
    }

    pub fn total_messages(&self) -> u64 {
        self.totals.get("messages")
    }

    pub fn last(&self) -> Option<SweepSample> {
        self.last
    }

    pub fn mean_sweep_ms(&self) -> f64 {
        self.durations.mean().as_secs_f64() * 1000.0
    }

    pub fn worst_sweep_ms(&self) -> f64 {
        self.durations.max().as_secs_f64() * 1000.0
    }
}

impl Default for SweepProfile {
    fn default() -> Self {
        Self::new(120)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_totals_accumulate_across_sweeps() {
        let mut profile = SweepProfile::new(4);
        for failures in [0, 2, 1] {
            profile.begin();
            profile.end(SweepSample {
                entities: 5,
                failures,
                messages: 1,
            });
        }

        assert_eq!(profile.sweeps(), 3);
        assert_eq!(profile.total_failures(), 3);
        assert_eq!(profile.total_messages(), 3);
        assert_eq!(
            profile.last(),
            Some(SweepSample {
                entities: 5,
                failures: 1,
                messages: 1
            })
        );
        assert!(profile.worst_sweep_ms() >= profile.mean_sweep_ms());
    }
}
