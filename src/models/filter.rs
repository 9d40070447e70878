//! Export filter criteria.

use super::{MemoryRecord, MemoryType};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeSet;

/// Inclusive date window. Open bounds default to the epoch and "now".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DateRange {
    /// Earliest creation time to keep.
    pub start: Option<DateTime<Utc>>,
    /// Latest creation time to keep.
    pub end: Option<DateTime<Utc>>,
}

impl DateRange {
    /// Creates an unbounded range.
    #[must_use]
    pub const fn unbounded() -> Self {
        Self {
            start: None,
            end: None,
        }
    }

    /// Returns true when neither bound is set.
    #[must_use]
    pub const fn is_unbounded(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    /// Returns true if `ts` falls inside `[start ?? epoch, end ?? now]`.
    #[must_use]
    pub fn contains(&self, ts: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        let start = self.start.unwrap_or(DateTime::<Utc>::UNIX_EPOCH);
        let end = self.end.unwrap_or(now);
        ts >= start && ts <= end
    }
}

/// Criteria applied to a collection before export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportFilter {
    /// Types to keep.
    pub types: BTreeSet<MemoryType>,
    /// Creation time window.
    pub date_range: DateRange,
}

impl Default for ExportFilter {
    fn default() -> Self {
        Self::all()
    }
}

impl ExportFilter {
    /// A filter that keeps everything.
    #[must_use]
    pub fn all() -> Self {
        Self {
            types: MemoryType::all().iter().copied().collect(),
            date_range: DateRange::unbounded(),
        }
    }

    /// Restricts the filter to the given types.
    #[must_use]
    pub fn with_types(mut self, types: impl IntoIterator<Item = MemoryType>) -> Self {
        self.types = types.into_iter().collect();
        self
    }

    /// Sets the date window.
    #[must_use]
    pub const fn with_date_range(mut self, date_range: DateRange) -> Self {
        self.date_range = date_range;
        self
    }

    /// Returns true when every known type is selected, so the type pass can
    /// be skipped.
    #[must_use]
    pub fn covers_all_types(&self) -> bool {
        MemoryType::all().iter().all(|t| self.types.contains(t))
    }

    /// Returns true if the record's type is selected.
    #[must_use]
    pub fn matches_type(&self, record: &MemoryRecord) -> bool {
        self.types.contains(&record.memory_type)
    }

    /// Returns true if the record's creation time is within the window.
    ///
    /// Unparseable timestamps are read as `now`.
    #[must_use]
    pub fn matches_date(&self, record: &MemoryRecord, now: DateTime<Utc>) -> bool {
        self.date_range.contains(record.created_at_or(now), now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::parse_timestamp;
    use chrono::Duration;

    #[test]
    fn test_default_covers_all_types() {
        assert!(ExportFilter::default().covers_all_types());
        assert!(
            !ExportFilter::all()
                .with_types([MemoryType::Search])
                .covers_all_types()
        );
    }

    #[test]
    fn test_date_range_inclusive() {
        let now = Utc::now();
        let start = parse_timestamp("2024-01-01").unwrap();
        let end = parse_timestamp("2024-01-31T23:59:59Z").unwrap();
        let range = DateRange {
            start: Some(start),
            end: Some(end),
        };
        assert!(range.contains(start, now));
        assert!(range.contains(end, now));
        assert!(!range.contains(end + Duration::seconds(1), now));
        assert!(!range.contains(start - Duration::seconds(1), now));
    }

    #[test]
    fn test_open_end_defaults_to_now() {
        let now = Utc::now();
        let range = DateRange::unbounded();
        assert!(range.contains(now, now));
        assert!(!range.contains(now + Duration::days(1), now));
    }

    #[test]
    fn test_matches_date_uses_now_for_garbage() {
        let now = Utc::now();
        let filter = ExportFilter::all().with_date_range(DateRange {
            start: Some(now - Duration::hours(1)),
            end: None,
        });
        let record = MemoryRecord::new("1", "x").with_created_at("garbage");
        assert!(filter.matches_date(&record, now));
    }
}
