//! Thread-safe operation counters.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// A fixed set of named counters, safe to bump from any thread.
///
/// Names are registered up front; bumping an unknown name is ignored so a
/// typo never panics a hot path.
pub struct StatsCounter {
    counters: BTreeMap<&'static str, AtomicU64>,
}

impl StatsCounter {
    pub fn new(names: &[&'static str]) -> Self {
        let counters = names.iter().map(|&name| (name, AtomicU64::new(0))).collect();
        Self { counters }
    }

    pub fn increment(&self, name: &str) {
        self.add(name, 1);
    }

    pub fn add(&self, name: &str, value: u64) {
        if let Some(counter) = self.counters.get(name) {
            counter.fetch_add(value, Ordering::Relaxed);
        }
    }

    pub fn get(&self, name: &str) -> u64 {
        self.counters
            .get(name)
            .map(|c| c.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    /// Current values, ordered by name.
    pub fn snapshot(&self) -> BTreeMap<&'static str, u64> {
        self.counters
            .iter()
            .map(|(&k, v)| (k, v.load(Ordering::Relaxed)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_names_are_ignored() {
        let stats = StatsCounter::new(&["votes"]);
        stats.increment("votes");
        stats.increment("typo");
        assert_eq!(stats.get("votes"), 1);
        assert_eq!(stats.get("typo"), 0);
        assert_eq!(stats.snapshot().len(), 1);
    }

    #[test]
    fn concurrent_increments_are_counted() {
        let stats = StatsCounter::new(&["votes"]);
        std::thread::scope(|s| {
            for _ in 0..4 {
                s.spawn(|| {
                    for _ in 0..1000 {
                        stats.increment("votes");
                    }
                });
            }
        });
        assert_eq!(stats.get("votes"), 4000);
    }
}
