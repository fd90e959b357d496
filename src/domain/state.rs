//! Persisted availability state: the memory of the edge detector.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{CampaignResult, StoreAvailability};

/// Singleton record describing the last successful poll.
///
/// `last_available` is the stored side of the edge trigger. A failed poll
/// never touches this record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AvailabilityState {
    /// Availability observed by the most recent successful poll.
    pub last_available: bool,
    /// When that poll completed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_check: Option<DateTime<Utc>>,
    /// Per-store availability seen by that poll.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_stores: Option<Vec<StoreAvailability>>,
}

impl AvailabilityState {
    /// Returns `true` if `result` is a rising edge relative to this state.
    #[must_use]
    pub const fn is_rising_edge(&self, result: &CampaignResult) -> bool {
        result.available && !self.last_available
    }

    /// Overwrites the state with the outcome of a successful poll.
    pub fn record(&mut self, result: &CampaignResult, checked_at: DateTime<Utc>) {
        self.last_available = result.available;
        self.last_check = Some(checked_at);
        self.last_stores = Some(result.per_store.clone());
    }

    /// Re-arms the edge trigger. Returns `true` if the flag changed.
    pub fn reset(&mut self) -> bool {
        std::mem::replace(&mut self.last_available, false)
    }
}
