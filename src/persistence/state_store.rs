//! Availability state over a [`DocumentStore`].

use std::sync::Arc;

use tokio::sync::Mutex;

use super::DocumentStore;
use crate::domain::AvailabilityState;
use crate::error::PersistenceError;

/// Handle to the singleton [`AvailabilityState`] record.
///
/// [`StateStore::update`] performs load, mutate and save under one
/// in-process lock. Separate processes sharing the file are not
/// coordinated.
#[derive(Debug, Clone)]
pub struct StateStore {
    store: Arc<dyn DocumentStore<AvailabilityState>>,
    write_lock: Arc<Mutex<()>>,
}

impl StateStore {
    /// Creates a state handle backed by `store`.
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore<AvailabilityState>>) -> Self {
        Self {
            store,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Reads the current state.
    pub async fn load(&self) -> AvailabilityState {
        self.store.load().await
    }

    /// Applies `f` to the stored state and saves the result.
    ///
    /// Returns the saved state together with whatever `f` returned.
    ///
    /// # Errors
    ///
    /// Returns a [`PersistenceError`] if the save fails; the document is
    /// then left as it was.
    pub async fn update<R, F>(&self, f: F) -> Result<(AvailabilityState, R), PersistenceError>
    where
        F: FnOnce(&mut AvailabilityState) -> R + Send,
    {
        let _guard = self.write_lock.lock().await;
        let mut state = self.store.load().await;
        let out = f(&mut state);
        self.store.save(&state).await?;
        Ok((state, out))
    }

    /// Forces the stored flag back to unavailable without notifying.
    ///
    /// Writes only when the flag actually changes. Returns `true` in that
    /// case.
    ///
    /// # Errors
    ///
    /// Returns a [`PersistenceError`] if the save fails.
    pub async fn reset(&self) -> Result<bool, PersistenceError> {
        let _guard = self.write_lock.lock().await;
        let mut state = self.store.load().await;
        let changed = state.reset();
        if changed {
            self.store.save(&state).await?;
        }
        tracing::info!(changed, "availability state reset");
        Ok(changed)
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::persistence::MemoryStore;

    fn store_with(initial: AvailabilityState) -> (StateStore, Arc<MemoryStore<AvailabilityState>>) {
        let mem = Arc::new(MemoryStore::new(initial));
        let shared: Arc<MemoryStore<AvailabilityState>> = Arc::clone(&mem);
        let dyn_store: Arc<dyn DocumentStore<AvailabilityState>> = shared;
        (StateStore::new(dyn_store), mem)
    }

    #[tokio::test]
    async fn update_persists_mutation() {
        let (store, mem) = store_with(AvailabilityState::default());
        let Ok((state, out)) = store
            .update(|s| {
                s.last_available = true;
                "done"
            })
            .await
        else {
            panic!("update failed");
        };
        assert!(state.last_available);
        assert_eq!(out, "done");
        assert!(store.load().await.last_available);
        assert_eq!(mem.save_count(), 1);
    }

    #[tokio::test]
    async fn reset_when_unavailable_writes_nothing() {
        let (store, mem) = store_with(AvailabilityState::default());
        assert!(matches!(store.reset().await, Ok(false)));
        assert_eq!(mem.save_count(), 0);
        assert_eq!(store.load().await, AvailabilityState::default());
    }

    #[tokio::test]
    async fn reset_when_available_flips_flag() {
        let initial = AvailabilityState {
            last_available: true,
            ..AvailabilityState::default()
        };
        let (store, mem) = store_with(initial);
        assert!(matches!(store.reset().await, Ok(true)));
        assert!(!store.load().await.last_available);
        assert_eq!(mem.save_count(), 1);
    }
}
