use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Inclusive `[low, high]` date bound for the temporal filter stage.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub low: DateTime<Utc>,
    pub high: DateTime<Utc>,
}

impl TimeRange {
    pub fn new(low: DateTime<Utc>, high: DateTime<Utc>) -> Self {
        Self { low, high }
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        at >= self.low && at <= self.high
    }
}

#[cfg(test)]
mod tests {
    use super::TimeRange;
    use chrono::{TimeZone, Utc};

    #[test]
    fn bounds_are_inclusive() {
        let low = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let high = Utc.with_ymd_and_hms(2024, 3, 31, 0, 0, 0).unwrap();
        let r = TimeRange::new(low, high);
        assert!(r.contains(low));
        assert!(r.contains(high));
        assert!(r.contains(Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap()));
        assert!(!r.contains(low - chrono::Duration::seconds(1)));
        assert!(!r.contains(high + chrono::Duration::seconds(1)));
    }
}
