//! Best-effort broadcast to every registered subscriber.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::StreamExt;
use futures_util::stream;

use crate::domain::SubscriberId;
use crate::error::DeliveryError;
use crate::persistence::SubscriberRegistry;

/// Outbound side of the messaging transport.
#[async_trait]
pub trait MessageSink: Send + Sync + fmt::Debug {
    /// Delivers `text` to one subscriber.
    ///
    /// # Errors
    ///
    /// Returns a [`DeliveryError`] if the transport rejects the message.
    async fn send(&self, to: SubscriberId, text: &str) -> Result<(), DeliveryError>;
}

/// Per-recipient outcome of one broadcast.
#[derive(Debug, Default)]
pub struct DeliveryReport {
    /// Subscribers that received the message.
    pub delivered: Vec<SubscriberId>,
    /// Subscribers whose delivery failed, with the reason.
    pub failed: Vec<(SubscriberId, DeliveryError)>,
}

impl DeliveryReport {
    /// Total number of delivery attempts.
    #[must_use]
    pub fn attempts(&self) -> usize {
        self.delivered.len() + self.failed.len()
    }
}

/// Fans a message out to the whole [`SubscriberRegistry`].
///
/// Deliveries run with bounded concurrency. A failure for one subscriber is
/// logged and recorded but never stops the others. No retries.
#[derive(Debug, Clone)]
pub struct Notifier {
    registry: SubscriberRegistry,
    sink: Arc<dyn MessageSink>,
    concurrency: usize,
}

impl Notifier {
    /// Creates a notifier sending through `sink`.
    #[must_use]
    pub fn new(registry: SubscriberRegistry, sink: Arc<dyn MessageSink>, concurrency: usize) -> Self {
        Self {
            registry,
            sink,
            concurrency: concurrency.max(1),
        }
    }

    /// Returns the registry this notifier reads from.
    #[must_use]
    pub fn registry(&self) -> &SubscriberRegistry {
        &self.registry
    }

    /// Sends `message` to every subscriber.
    pub async fn notify_all(&self, message: &str) -> DeliveryReport {
        let subscribers = self.registry.list().await;
        if subscribers.is_empty() {
            tracing::info!("no subscribers registered yet, send /start to the bot first");
            return DeliveryReport::default();
        }

        let outcomes: Vec<(SubscriberId, Result<(), DeliveryError>)> = stream::iter(subscribers)
            .map(|subscriber| {
                let sink = Arc::clone(&self.sink);
                async move { (subscriber.id, sink.send(subscriber.id, message).await) }
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let mut report = DeliveryReport::default();
        for (id, outcome) in outcomes {
            match outcome {
                Ok(()) => report.delivered.push(id),
                Err(e) => {
                    tracing::warn!(subscriber = %id, error = %e, "delivery failed");
                    report.failed.push((id, e));
                }
            }
        }
        tracing::debug!(
            delivered = report.delivered.len(),
            failed = report.failed.len(),
            "broadcast finished"
        );
        report
    }
}
