//! Availability monitor: one poll, the edge detector, and the follow-up
//! broadcasts.
//!
//! The stored flag only ever moves on a successful poll. A rising edge
//! (unavailable to available) sends exactly one alert; every other
//! transition is silent. Manual checks additionally broadcast a status
//! summary, or a diagnostic when the upstream cannot be read.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{CampaignSource, Notifier};
use crate::domain::messages::{availability_alert, failure_diagnostic, format_store_line, status_summary};
use crate::domain::{CampaignResult, parse_availability};
use crate::error::{PersistenceError, UpstreamError};
use crate::persistence::StateStore;

/// What caused a check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckTrigger {
    /// The periodic timer.
    Timer,
    /// An explicit command; broadcasts a status summary afterwards.
    Manual,
}

impl CheckTrigger {
    /// Returns `true` for [`CheckTrigger::Manual`].
    #[must_use]
    pub const fn is_manual(self) -> bool {
        matches!(self, Self::Manual)
    }
}

impl fmt::Display for CheckTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timer => f.write_str("timer"),
            Self::Manual => f.write_str("manual"),
        }
    }
}

/// Result of one check.
#[derive(Debug)]
pub enum CheckOutcome {
    /// The upstream was read and the state updated.
    Completed {
        /// Parsed availability.
        result: CampaignResult,
        /// Whether this poll was an unavailable-to-available transition.
        rising_edge: bool,
        /// Timestamp recorded as `lastCheck`.
        checked_at: DateTime<Utc>,
    },
    /// The upstream could not be read; the state was left untouched.
    Failed(UpstreamError),
}

impl CheckOutcome {
    /// Returns `true` if this check fired the availability alert.
    #[must_use]
    pub const fn notified(&self) -> bool {
        matches!(
            self,
            Self::Completed {
                rising_edge: true,
                ..
            }
        )
    }
}

/// Upper bound on one fetch unless overridden with
/// [`AvailabilityMonitor::with_fetch_timeout`].
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Runs polls against a [`CampaignSource`] and keeps the edge-trigger
/// state in a [`StateStore`].
#[derive(Debug, Clone)]
pub struct AvailabilityMonitor {
    source: Arc<dyn CampaignSource>,
    state: StateStore,
    notifier: Notifier,
    target_url: String,
    fetch_timeout: Duration,
}

impl AvailabilityMonitor {
    /// Creates a monitor.
    #[must_use]
    pub fn new(
        source: Arc<dyn CampaignSource>,
        state: StateStore,
        notifier: Notifier,
        target_url: impl Into<String>,
    ) -> Self {
        Self {
            source,
            state,
            notifier,
            target_url: target_url.into(),
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }

    /// Sets the deadline for one upstream fetch.
    #[must_use]
    pub fn with_fetch_timeout(mut self, fetch_timeout: Duration) -> Self {
        self.fetch_timeout = fetch_timeout;
        self
    }

    /// Returns the notifier used for broadcasts.
    #[must_use]
    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    /// Returns the state handle.
    #[must_use]
    pub fn state(&self) -> &StateStore {
        &self.state
    }

    /// Performs one poll.
    ///
    /// Never fails: upstream errors are logged (and broadcast for manual
    /// checks) and returned as [`CheckOutcome::Failed`].
    pub async fn check_once(&self, trigger: CheckTrigger) -> CheckOutcome {
        let check_id = Uuid::new_v4();

        let fetched = tokio::time::timeout(self.fetch_timeout, self.source.fetch_campaign())
            .await
            .unwrap_or_else(|_| Err(UpstreamError::Timeout(self.fetch_timeout)));

        let raw = match fetched {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(%check_id, %trigger, error = %e, "campaign fetch failed");
                if trigger.is_manual() {
                    self.notifier.notify_all(&failure_diagnostic(&e)).await;
                }
                return CheckOutcome::Failed(e);
            }
        };

        let result = parse_availability(&raw);
        tracing::info!(
            %check_id,
            %trigger,
            active = result.campaign_active,
            available = result.available,
            stores = %format_store_line(&result.per_store),
            "campaign checked"
        );

        let checked_at = Utc::now();
        let rising_edge = match self.record(&result, checked_at).await {
            Ok(edge) => edge,
            Err((edge, e)) => {
                tracing::error!(%check_id, error = %e, "failed to persist availability state");
                edge
            }
        };

        if rising_edge {
            tracing::info!(%check_id, "voucher became available, notifying subscribers");
            self.notifier
                .notify_all(&availability_alert(&result, &self.target_url))
                .await;
        }

        if trigger.is_manual() {
            self.notifier
                .notify_all(&status_summary(&result, checked_at))
                .await;
        }

        CheckOutcome::Completed {
            result,
            rising_edge,
            checked_at,
        }
    }

    /// Re-arms the edge trigger without notifying anyone.
    ///
    /// # Errors
    ///
    /// Returns a [`PersistenceError`] if the state cannot be saved.
    pub async fn reset(&self) -> Result<bool, PersistenceError> {
        self.state.reset().await
    }

    /// Evaluates the edge and stores the poll. The edge is reported even
    /// when the save fails, so an alert is never lost to a disk error.
    async fn record(
        &self,
        result: &CampaignResult,
        checked_at: DateTime<Utc>,
    ) -> Result<bool, (bool, PersistenceError)> {
        let mut rising_edge = false;
        let saved = self
            .state
            .update(|state| {
                rising_edge = state.is_rising_edge(result);
                state.record(result, checked_at);
            })
            .await;
        match saved {
            Ok(_) => Ok(rising_edge),
            Err(e) => Err((rising_edge, e)),
        }
    }
}
