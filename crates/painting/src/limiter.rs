use std::collections::HashMap;

/// Per-category cap on drawable emission within one paint pass.
///
/// A best-effort throttle, not a correctness mechanism: hitting a cap means
/// fewer objects drawn, never an error. Categories that were never registered
/// get an effectively unlimited cap.
#[derive(Debug, Default)]
pub struct PlotLimiter {
    limits: HashMap<String, usize>,
    counts: HashMap<String, usize>,
}

impl PlotLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limits<I, S>(limits: I) -> Self
    where
        I: IntoIterator<Item = (S, usize)>,
        S: Into<String>,
    {
        let mut limiter = Self::new();
        for (category, limit) in limits {
            limiter.register(category, limit);
        }
        limiter
    }

    pub fn register(&mut self, category: impl Into<String>, limit: usize) {
        self.limits.insert(category.into(), limit);
    }

    /// Zeroes all counters; called at the start of every paint pass.
    pub fn reset(&mut self) {
        self.counts.clear();
    }

    /// Checks-and-increments the counter for `category`. Returns whether the
    /// caller may emit one more drawable for it this pass.
    pub fn try_acquire(&mut self, category: &str) -> bool {
        let limit = self.limits.get(category).copied().unwrap_or(usize::MAX);
        let count = self.counts.entry(category.to_string()).or_insert(0);
        if *count >= limit {
            return false;
        }
        *count += 1;
        true
    }

    pub fn emitted(&self, category: &str) -> usize {
        self.counts.get(category).copied().unwrap_or(0)
    }
}
