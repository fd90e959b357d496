//! In-process document store.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use super::DocumentStore;
use crate::error::PersistenceError;

/// Keeps the document in memory. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryStore<T> {
    value: Mutex<T>,
    saves: AtomicUsize,
}

impl<T> MemoryStore<T> {
    /// Creates a store holding `initial`.
    #[must_use]
    pub fn new(initial: T) -> Self {
        Self {
            value: Mutex::new(initial),
            saves: AtomicUsize::new(0),
        }
    }

    /// Number of completed `save` calls.
    #[cfg(test)]
    #[must_use]
    pub(crate) fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<T> DocumentStore<T> for MemoryStore<T>
where
    T: Clone + Send + Sync + std::fmt::Debug + 'static,
{
    async fn load(&self) -> T {
        self.value.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    async fn save(&self, value: &T) -> Result<(), PersistenceError> {
        *self.value.lock().unwrap_or_else(|e| e.into_inner()) = value.clone();
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
