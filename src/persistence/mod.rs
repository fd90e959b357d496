//! Persistence layer: JSON documents for subscribers and availability state.
//!
//! Both documents sit behind the [`DocumentStore`] trait. Loading never
//! fails (a missing or malformed document yields the default value);
//! saving is a whole-document overwrite. [`JsonFileStore`] is the durable
//! implementation and [`MemoryStore`] the ephemeral one.

pub mod json_file;
pub mod memory;
pub mod state_store;
pub mod subscribers;

use std::fmt;

use async_trait::async_trait;

use crate::error::PersistenceError;

pub use json_file::JsonFileStore;
pub use memory::MemoryStore;
pub use state_store::StateStore;
pub use subscribers::SubscriberRegistry;

/// Load/save access to a single JSON document of type `T`.
#[async_trait]
pub trait DocumentStore<T>: Send + Sync + fmt::Debug {
    /// Reads the document, falling back to `T::default()` when it is
    /// missing or cannot be decoded.
    async fn load(&self) -> T;

    /// Replaces the whole document with `value`.
    ///
    /// # Errors
    ///
    /// Returns a [`PersistenceError`] if the value cannot be encoded or
    /// written.
    async fn save(&self, value: &T) -> Result<(), PersistenceError>;
}
