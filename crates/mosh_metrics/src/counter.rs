//! Named event counters

use std::collections::BTreeMap;

/// Monotonic counters keyed by a static event name.
///
/// Backed by a `BTreeMap` so dumps come out in a stable order.
#[derive(Debug, Default)]
pub(crate) struct EventCounter {
    events: BTreeMap<&'static str, u64>,
}

impl EventCounter {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn add(&mut self, event: &'static str, amount: u64) {
        *self.events.entry(event).or_insert(0) += amount;
    }

    pub(crate) fn get(&self, event: &str) -> u64 {
        self.events.get(event).copied().unwrap_or(0)
    }
}
