//! Text of every message the watcher broadcasts.

use chrono::{DateTime, SecondsFormat, Utc};

use super::{CampaignResult, StoreAvailability};
use crate::error::{FailureClass, UpstreamError};

/// Broadcast by the `/testnotif` command.
pub const TEST_NOTIFICATION: &str = "✅ TEST: notification delivered successfully. (test run)";

/// Renders the per-store summary: `A=AVAILABLE | B=SOLD OUT`, or `-`.
#[must_use]
pub fn format_store_line(per_store: &[StoreAvailability]) -> String {
    if per_store.is_empty() {
        return "-".to_string();
    }
    per_store
        .iter()
        .map(|s| {
            let label = if s.available { "AVAILABLE" } else { "SOLD OUT" };
            format!("{}={label}", s.name)
        })
        .collect::<Vec<_>>()
        .join(" | ")
}

/// The rising-edge alert.
#[must_use]
pub fn availability_alert(result: &CampaignResult, target_url: &str) -> String {
    let stores = result.available_store_names().collect::<Vec<_>>().join(", ");
    format!("🚨 VOUCHER AVAILABLE!\nStores with vouchers: {stores}\nLink: {target_url}")
}

/// Full status summary sent after a manual check.
#[must_use]
pub fn status_summary(result: &CampaignResult, checked_at: DateTime<Utc>) -> String {
    format!(
        "📌 CURRENT STATUS\nCampaign active: {}\nAvailable: {}\nStores: {}\nLast check: {}",
        result.campaign_active,
        result.available,
        format_store_line(&result.per_store),
        checked_at.to_rfc3339_opts(SecondsFormat::Millis, true),
    )
}

/// Diagnostic sent when a manual check cannot reach the upstream.
///
/// The status-band guidance is always listed in full; when the failure has
/// a status, the matching line is marked.
#[must_use]
pub fn failure_diagnostic(error: &UpstreamError) -> String {
    let class = error.failure_class();
    let mut text = format!("⚠️ API check failed.\nError: {error}\n\nNotes:");
    for (label, band) in [
        ("400", FailureClass::BadRequest),
        ("429", FailureClass::RateLimited),
        ("5xx", FailureClass::ServerFault),
    ] {
        let marker = if band == class { "→" } else { "-" };
        text.push_str(&format!("\n{marker} If {label}: {}", band.hint()));
    }
    text
}
