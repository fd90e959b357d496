//! Subscriber registry over a [`DocumentStore`].

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Mutex;

use super::DocumentStore;
use crate::domain::{Subscriber, SubscriberId};
use crate::error::PersistenceError;

/// Persistent set of notification targets.
///
/// At most one record per [`SubscriberId`]. Records are never mutated or
/// removed. Read-modify-write sequences are serialized within the process.
#[derive(Debug, Clone)]
pub struct SubscriberRegistry {
    store: Arc<dyn DocumentStore<Vec<Subscriber>>>,
    write_lock: Arc<Mutex<()>>,
}

impl SubscriberRegistry {
    /// Creates a registry backed by `store`.
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore<Vec<Subscriber>>>) -> Self {
        Self {
            store,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Adds a subscriber unless one with the same id exists.
    ///
    /// Returns `true` if a record was appended, `false` if the id was
    /// already registered.
    ///
    /// # Errors
    ///
    /// Returns a [`PersistenceError`] if the updated list cannot be saved.
    pub async fn register_if_absent(
        &self,
        id: SubscriberId,
        display_name: &str,
        kind: &str,
    ) -> Result<bool, PersistenceError> {
        let _guard = self.write_lock.lock().await;
        let mut subscribers = self.store.load().await;
        if subscribers.iter().any(|s| s.id == id) {
            return Ok(false);
        }
        subscribers.push(Subscriber::new(id, display_name, kind, Utc::now()));
        self.store.save(&subscribers).await?;
        tracing::info!(subscriber = %id, display_name, kind, "subscriber registered");
        Ok(true)
    }

    /// Returns every registered subscriber in registration order.
    pub async fn list(&self) -> Vec<Subscriber> {
        self.store.load().await
    }

    /// Returns the number of registered subscribers.
    pub async fn len(&self) -> usize {
        self.list().await.len()
    }

    /// Returns `true` if nobody is registered.
    pub async fn is_empty(&self) -> bool {
        self.list().await.is_empty()
    }
}
