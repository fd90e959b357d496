//! Campaign availability as derived from the upstream document.
//!
//! The upstream response is untyped JSON. [`parse_availability`] walks it
//! defensively: every nested field is optional and an absent or
//! wrongly-typed field counts as "not satisfied".

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Name used for a store option that carries no `options_name`.
pub const UNNAMED_STORE: &str = "(unnamed)";

/// Availability of one store option within the campaign.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreAvailability {
    /// Store option name.
    pub name: String,
    /// `true` while the store still has coupons.
    pub available: bool,
}

impl StoreAvailability {
    /// Creates a store entry.
    #[must_use]
    pub fn new(name: impl Into<String>, available: bool) -> Self {
        Self {
            name: name.into(),
            available,
        }
    }
}

/// Why a [`CampaignResult`] looks the way it does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AvailabilityReason {
    /// The document carried a `result` object and was evaluated.
    Ok,
    /// The document had no `result`, or a falsy one.
    NoResult,
}

/// Outcome of one poll, computed fresh from the upstream document.
///
/// Invariant: `available` implies `campaign_active`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CampaignResult {
    /// Campaign status is `active` and it is neither expired nor outdated.
    pub campaign_active: bool,
    /// Campaign is active and at least one store has coupons left.
    pub available: bool,
    /// Per-store availability, in upstream order.
    pub per_store: Vec<StoreAvailability>,
    /// Evaluation outcome.
    pub reason: AvailabilityReason,
}

impl CampaignResult {
    /// The result reported when the document has no `result`.
    #[must_use]
    pub const fn no_result() -> Self {
        Self {
            campaign_active: false,
            available: false,
            per_store: Vec::new(),
            reason: AvailabilityReason::NoResult,
        }
    }

    /// Names of the stores that currently have coupons.
    pub fn available_store_names(&self) -> impl Iterator<Item = &str> {
        self.per_store
            .iter()
            .filter(|s| s.available)
            .map(|s| s.name.as_str())
    }
}

/// Derives a [`CampaignResult`] from the raw upstream document.
///
/// Total over any JSON value. Only an absent or falsy `result` (`null`,
/// `false`, `0`, `""`) yields [`AvailabilityReason::NoResult`]; any other
/// value is evaluated, and a non-object simply satisfies no condition.
/// Flags must be literally `false` (or the status literally `"active"`) to
/// count. `coupons_finished: false` means the store still has coupons.
#[must_use]
pub fn parse_availability(raw: &Value) -> CampaignResult {
    let Some(result) = raw.get("result").filter(|r| !is_falsy(r)) else {
        return CampaignResult::no_result();
    };

    let campaign_active = result.get("campaign_status").and_then(Value::as_str) == Some("active")
        && is_false(result.get("expired"))
        && is_false(result.get("outdated"));

    let per_store: Vec<StoreAvailability> = result
        .get("campaign_options")
        .and_then(|o| o.get("options"))
        .and_then(Value::as_array)
        .map(|options| options.iter().map(parse_store).collect())
        .unwrap_or_default();

    let any_available = per_store.iter().any(|s| s.available);

    CampaignResult {
        campaign_active,
        available: campaign_active && any_available,
        per_store,
        reason: AvailabilityReason::Ok,
    }
}

fn parse_store(option: &Value) -> StoreAvailability {
    let name = option
        .get("options_name")
        .and_then(Value::as_str)
        .unwrap_or(UNNAMED_STORE);
    StoreAvailability::new(name, is_false(option.get("coupons_finished")))
}

fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(_) | Value::Object(_) => false,
    }
}

fn is_false(value: Option<&Value>) -> bool {
    matches!(value, Some(Value::Bool(false)))
}

#[cfg(test)]
#[allow(clippy::panic, clippy::indexing_slicing)]
mod tests {
    use serde_json::json;

    use super::*;

    fn active_doc(options: Value) -> Value {
        json!({
            "result": {
                "campaign_status": "active",
                "expired": false,
                "outdated": false,
                "campaign_options": { "options": options }
            }
        })
    }

    #[test]
    fn empty_object_is_no_result() {
        let r = parse_availability(&json!({}));
        assert_eq!(r, CampaignResult::no_result());
        assert_eq!(r.reason, AvailabilityReason::NoResult);
        assert!(!r.campaign_active);
        assert!(!r.available);
        assert!(r.per_store.is_empty());
    }

    #[test]
    fn absent_or_falsy_result_is_no_result() {
        for raw in [
            json!(null),
            json!([]),
            json!("x"),
            json!({ "result": null }),
            json!({ "result": false }),
            json!({ "result": 0 }),
            json!({ "result": "" }),
        ] {
            assert_eq!(parse_availability(&raw).reason, AvailabilityReason::NoResult);
        }
    }

    #[test]
    fn truthy_non_object_result_is_evaluated_as_unfavourable() {
        for result in [json!("x"), json!([]), json!(1), json!(true)] {
            let r = parse_availability(&json!({ "result": result }));
            assert_eq!(r.reason, AvailabilityReason::Ok);
            assert!(!r.campaign_active);
            assert!(!r.available);
            assert!(r.per_store.is_empty());
        }
    }

    #[test]
    fn store_flag_is_inverted() {
        let r = parse_availability(&active_doc(json!([
            { "options_name": "StoreA", "coupons_finished": false },
            { "options_name": "StoreB", "coupons_finished": true }
        ])));
        assert_eq!(r.per_store[0], StoreAvailability::new("StoreA", true));
        assert_eq!(r.per_store[1], StoreAvailability::new("StoreB", false));
        assert!(r.available);
        assert_eq!(r.available_store_names().collect::<Vec<_>>(), vec!["StoreA"]);
    }

    #[test]
    fn all_finished_is_unavailable_but_active() {
        let r = parse_availability(&active_doc(json!([
            { "options_name": "StoreA", "coupons_finished": true }
        ])));
        assert!(r.campaign_active);
        assert!(!r.available);
        assert_eq!(r.reason, AvailabilityReason::Ok);
    }

    #[test]
    fn inactive_campaign_is_never_available() {
        let docs = [
            json!({ "result": { "campaign_status": "ended", "expired": false, "outdated": false,
                "campaign_options": { "options": [{ "options_name": "A", "coupons_finished": false }] } } }),
            json!({ "result": { "campaign_status": "active", "expired": true, "outdated": false,
                "campaign_options": { "options": [{ "options_name": "A", "coupons_finished": false }] } } }),
            json!({ "result": { "campaign_status": "active", "outdated": false,
                "campaign_options": { "options": [{ "options_name": "A", "coupons_finished": false }] } } }),
        ];
        for doc in docs {
            let r = parse_availability(&doc);
            assert!(!r.campaign_active);
            assert!(!r.available);
            assert_eq!(r.per_store.len(), 1);
        }
    }

    #[test]
    fn missing_nested_fields_default_to_unavailable() {
        let r = parse_availability(&active_doc(json!([{}, { "coupons_finished": "no" }])));
        assert_eq!(r.per_store.len(), 2);
        assert!(r.per_store.iter().all(|s| !s.available));
        assert_eq!(r.per_store[0].name, UNNAMED_STORE);

        let r = parse_availability(&json!({ "result": { "campaign_options": 7 } }));
        assert!(r.per_store.is_empty());
        assert_eq!(r.reason, AvailabilityReason::Ok);
    }

    #[test]
    fn available_implies_active() {
        let docs = [
            json!({}),
            active_doc(json!([])),
            active_doc(json!([{ "options_name": "A", "coupons_finished": false }])),
            json!({ "result": { "campaign_status": "active", "expired": false, "outdated": true,
                "campaign_options": { "options": [{ "options_name": "A", "coupons_finished": false }] } } }),
        ];
        for doc in docs {
            let r = parse_availability(&doc);
            assert!(!r.available || r.campaign_active);
        }
    }
}
