// crates/siac-gate-core/src/core/widget.rs
// ============================================================================
// Module: SIAC Gate Widget State
// Description: UI preference state persisted per business subject.
// Purpose: Define widget state, partial updates, and the timestamped merge.
// Dependencies: serde, time
// ============================================================================

//! ## Overview
//! Widget state is a tiny per-subject record (time filter, selected metric,
//! last update). Each field carries its own write timestamp so that merging a
//! partial update is last-writer-wins per field: an update is accepted for a
//! field only when its timestamp is not older than the one already stored.
//! Applying the same set of updates in any order yields the same record.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use time::OffsetDateTime;

use crate::core::clock::Clock;
use crate::core::identifiers::SubjectId;

// ============================================================================
// SECTION: Enumerations
// ============================================================================

/// Reporting window selected in the metrics widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TimeFilter {
    /// Last 24 hours.
    #[serde(rename = "24h")]
    Last24Hours,
    /// Last 7 days.
    #[default]
    #[serde(rename = "7d")]
    Last7Days,
    /// Last 30 days.
    #[serde(rename = "30d")]
    Last30Days,
    /// Last 90 days.
    #[serde(rename = "90d")]
    Last90Days,
}

impl TimeFilter {
    /// Returns the wire literal.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Last24Hours => "24h",
            Self::Last7Days => "7d",
            Self::Last30Days => "30d",
            Self::Last90Days => "90d",
        }
    }

    /// Parses a wire literal.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "24h" => Some(Self::Last24Hours),
            "7d" => Some(Self::Last7Days),
            "30d" => Some(Self::Last30Days),
            "90d" => Some(Self::Last90Days),
            _ => None,
        }
    }
}

/// Metric highlighted in the metrics widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectedMetric {
    /// Delivered over sent.
    #[default]
    DeliveryRate,
    /// Spend breakdown.
    Cost,
    /// Sender quality rating.
    QualityScore,
    /// Open, click and response rates.
    Engagement,
}

impl SelectedMetric {
    /// Returns the wire literal.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::DeliveryRate => "delivery_rate",
            Self::Cost => "cost",
            Self::QualityScore => "quality_score",
            Self::Engagement => "engagement",
        }
    }

    /// Parses a wire literal.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "delivery_rate" => Some(Self::DeliveryRate),
            "cost" => Some(Self::Cost),
            "quality_score" => Some(Self::QualityScore),
            "engagement" => Some(Self::Engagement),
            _ => None,
        }
    }
}

// ============================================================================
// SECTION: Public State
// ============================================================================

/// Widget state as returned to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetState {
    /// Subject the state belongs to.
    pub subject_id: SubjectId,
    /// Selected reporting window.
    pub time_filter: TimeFilter,
    /// Selected metric.
    pub selected_metric: SelectedMetric,
    /// Timestamp of the newest accepted field write; `None` before any write.
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub last_updated: Option<OffsetDateTime>,
}

impl WidgetState {
    /// Default state for a subject that has never been written.
    #[must_use]
    pub fn default_for(subject_id: SubjectId) -> Self {
        Self {
            subject_id,
            time_filter: TimeFilter::default(),
            selected_metric: SelectedMetric::default(),
            last_updated: None,
        }
    }
}

// ============================================================================
// SECTION: Updates
// ============================================================================

/// Partial update as received from a rendering surface.
///
/// `updatedAt` is optional on the wire; [`WidgetStatePatch::stamp`] fills it
/// from the gateway clock when absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct WidgetStatePatch {
    /// New reporting window, if changing.
    #[serde(default)]
    pub time_filter: Option<TimeFilter>,
    /// New selected metric, if changing.
    #[serde(default)]
    pub selected_metric: Option<SelectedMetric>,
    /// Client-side timestamp of the change.
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub updated_at: Option<OffsetDateTime>,
}

impl WidgetStatePatch {
    /// True when the patch changes no field.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.time_filter.is_none() && self.selected_metric.is_none()
    }

    /// Resolves the update timestamp, defaulting to `clock.now()`.
    #[must_use]
    pub fn stamp(self, clock: &dyn Clock) -> WidgetStateUpdate {
        WidgetStateUpdate {
            time_filter: self.time_filter,
            selected_metric: self.selected_metric,
            updated_at: self.updated_at.unwrap_or_else(|| clock.now()),
        }
    }
}

/// Timestamped partial update applied by a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WidgetStateUpdate {
    /// New reporting window, if changing.
    pub time_filter: Option<TimeFilter>,
    /// New selected metric, if changing.
    pub selected_metric: Option<SelectedMetric>,
    /// Timestamp ordering this update against others.
    pub updated_at: OffsetDateTime,
}

impl WidgetStateUpdate {
    /// Creates an update carrying no field changes.
    #[must_use]
    pub const fn at(updated_at: OffsetDateTime) -> Self {
        Self {
            time_filter: None,
            selected_metric: None,
            updated_at,
        }
    }

    /// Sets the time filter.
    #[must_use]
    pub const fn with_time_filter(mut self, value: TimeFilter) -> Self {
        self.time_filter = Some(value);
        self
    }

    /// Sets the selected metric.
    #[must_use]
    pub const fn with_selected_metric(mut self, value: SelectedMetric) -> Self {
        self.selected_metric = Some(value);
        self
    }
}

// ============================================================================
// SECTION: Stored Record
// ============================================================================

/// A field value with the timestamp of the write that set it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Stamped<T> {
    /// Current value.
    pub value: T,
    /// Timestamp of the accepted write; `None` while still the default.
    pub written_at: Option<OffsetDateTime>,
}

impl<T: Copy> Stamped<T> {
    /// Accepts `value` when `at` is not older than the current write.
    fn offer(&mut self, value: T, at: OffsetDateTime) -> bool {
        if self.written_at.is_some_and(|current| at < current) {
            return false;
        }
        self.value = value;
        self.written_at = Some(at);
        true
    }
}

/// Stored representation of a subject's widget state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WidgetStateRecord {
    /// Time filter and its write timestamp.
    pub time_filter: Stamped<TimeFilter>,
    /// Selected metric and its write timestamp.
    pub selected_metric: Stamped<SelectedMetric>,
}

impl WidgetStateRecord {
    /// Merges `update` into the record. Returns true when any field changed;
    /// an update that names no field changes nothing.
    pub fn merge(&mut self, update: &WidgetStateUpdate) -> bool {
        let mut changed = false;
        if let Some(value) = update.time_filter {
            changed |= self.time_filter.offer(value, update.updated_at);
        }
        if let Some(value) = update.selected_metric {
            changed |= self.selected_metric.offer(value, update.updated_at);
        }
        changed
    }

    /// Newest field timestamp.
    #[must_use]
    pub fn last_updated(&self) -> Option<OffsetDateTime> {
        match (self.time_filter.written_at, self.selected_metric.written_at) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        }
    }

    /// Projects the record into the public state shape.
    #[must_use]
    pub fn to_state(&self, subject_id: SubjectId) -> WidgetState {
        WidgetState {
            subject_id,
            time_filter: self.time_filter.value,
            selected_metric: self.selected_metric.value,
            last_updated: self.last_updated(),
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test-only assertions use unwrap for clarity."
    )]

    use time::Duration;

    use super::*;

    fn t(seconds: i64) -> OffsetDateTime {
        OffsetDateTime::UNIX_EPOCH + Duration::seconds(seconds)
    }

    #[test]
    fn older_update_does_not_overwrite_newer_field() {
        let mut record = WidgetStateRecord::default();
        record.merge(&WidgetStateUpdate::at(t(20)).with_time_filter(TimeFilter::Last90Days));
        let changed =
            record.merge(&WidgetStateUpdate::at(t(10)).with_time_filter(TimeFilter::Last24Hours));
        assert!(!changed);
        assert_eq!(record.time_filter.value, TimeFilter::Last90Days);
        assert_eq!(record.last_updated(), Some(t(20)));
    }

    #[test]
    fn older_update_still_lands_on_untouched_fields() {
        let mut record = WidgetStateRecord::default();
        record.merge(&WidgetStateUpdate::at(t(20)).with_time_filter(TimeFilter::Last30Days));
        record.merge(&WidgetStateUpdate::at(t(10)).with_selected_metric(SelectedMetric::Cost));
        assert_eq!(record.time_filter.value, TimeFilter::Last30Days);
        assert_eq!(record.selected_metric.value, SelectedMetric::Cost);
        assert_eq!(record.last_updated(), Some(t(20)));
    }

    #[test]
    fn equal_timestamps_take_the_later_arrival() {
        let mut record = WidgetStateRecord::default();
        record.merge(&WidgetStateUpdate::at(t(5)).with_selected_metric(SelectedMetric::Cost));
        record.merge(&WidgetStateUpdate::at(t(5)).with_selected_metric(SelectedMetric::Engagement));
        assert_eq!(record.selected_metric.value, SelectedMetric::Engagement);
    }

    #[test]
    fn patch_without_timestamp_uses_clock() {
        let clock = crate::core::clock::ManualClock::new(t(42));
        let patch: WidgetStatePatch = serde_json::from_str(r#"{"timeFilter":"30d"}"#).unwrap();
        let update = patch.stamp(&clock);
        assert_eq!(update.updated_at, t(42));
        assert_eq!(update.time_filter, Some(TimeFilter::Last30Days));
        assert_eq!(update.selected_metric, None);
    }

    #[test]
    fn patch_rejects_unknown_fields_and_literals() {
        assert!(serde_json::from_str::<WidgetStatePatch>(r#"{"theme":"dark"}"#).is_err());
        assert!(serde_json::from_str::<WidgetStatePatch>(r#"{"timeFilter":"1y"}"#).is_err());
    }

    #[test]
    fn default_state_serializes_with_null_last_updated() {
        let state = WidgetState::default_for(SubjectId::parse("c1").unwrap());
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["subjectId"], "c1");
        assert_eq!(json["timeFilter"], "7d");
        assert_eq!(json["selectedMetric"], "delivery_rate");
        assert!(json["lastUpdated"].is_null());
    }
}
