//! In-memory fakes shared by the service and scheduler tests.

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Value, json};

use super::{CampaignSource, MessageSink};
use crate::domain::{AvailabilityState, Subscriber, SubscriberId};
use crate::error::{DeliveryError, UpstreamError};
use crate::persistence::{DocumentStore, MemoryStore, StateStore, SubscriberRegistry};

/// Records every message; fails for the configured ids.
#[derive(Debug, Default)]
pub(crate) struct RecordingSink {
    sent: Mutex<Vec<(SubscriberId, String)>>,
    failing: HashSet<i64>,
}

impl RecordingSink {
    pub(crate) fn failing_for(ids: &[i64]) -> Self {
        Self {
            sent: Mutex::default(),
            failing: ids.iter().copied().collect(),
        }
    }

    pub(crate) fn clone_dyn(self: &Arc<Self>) -> Arc<dyn MessageSink> {
        let shared: Arc<Self> = Arc::clone(self);
        shared
    }

    pub(crate) fn sent(&self) -> Vec<(SubscriberId, String)> {
        self.sent.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Messages received by one subscriber.
    pub(crate) fn texts_for(&self, id: i64) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter(|(to, _)| to.get() == id)
            .map(|(_, text)| text)
            .collect()
    }
}

#[async_trait]
impl MessageSink for RecordingSink {
    async fn send(&self, to: SubscriberId, text: &str) -> Result<(), DeliveryError> {
        if self.failing.contains(&to.get()) {
            return Err(DeliveryError::new(to, "bot was blocked by the user"));
        }
        self.sent
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((to, text.to_string()));
        Ok(())
    }
}

/// Replays a fixed sequence of upstream responses.
#[derive(Debug, Default)]
pub(crate) struct ScriptedSource {
    script: Mutex<VecDeque<Result<Value, UpstreamError>>>,
    calls: AtomicUsize,
    delay: Option<Duration>,
}

impl ScriptedSource {
    pub(crate) fn new(script: Vec<Result<Value, UpstreamError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            calls: AtomicUsize::new(0),
            delay: None,
        }
    }

    /// One document per availability value.
    pub(crate) fn availability(values: &[bool]) -> Self {
        Self::new(values.iter().map(|v| Ok(campaign_doc(*v))).collect())
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CampaignSource for ScriptedSource {
    async fn fetch_campaign(&self) -> Result<Value, UpstreamError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let next = self
            .script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front();
        next.unwrap_or_else(|| Err(UpstreamError::status(503, "Service Unavailable", "script exhausted")))
    }
}

/// An active campaign with one store, available or sold out.
pub(crate) fn campaign_doc(available: bool) -> Value {
    json!({
        "result": {
            "campaign_status": "active",
            "expired": false,
            "outdated": false,
            "campaign_options": { "options": [
                { "options_name": "StoreA", "coupons_finished": !available },
                { "options_name": "StoreB", "coupons_finished": true }
            ]}
        }
    })
}

/// Registry pre-populated with the given chat ids.
pub(crate) async fn registry_with(ids: &[i64]) -> SubscriberRegistry {
    let subscribers: Vec<Subscriber> = ids
        .iter()
        .map(|id| Subscriber::new(SubscriberId::new(*id), "tester", "private", Utc::now()))
        .collect();
    let store: Arc<MemoryStore<Vec<Subscriber>>> = Arc::new(MemoryStore::new(subscribers));
    let dyn_store: Arc<dyn DocumentStore<Vec<Subscriber>>> = store;
    SubscriberRegistry::new(dyn_store)
}

/// State handle over an in-memory record.
pub(crate) fn memory_state(initial: AvailabilityState) -> StateStore {
    let store: Arc<MemoryStore<AvailabilityState>> = Arc::new(MemoryStore::new(initial));
    let dyn_store: Arc<dyn DocumentStore<AvailabilityState>> = store;
    StateStore::new(dyn_store)
}
