//! Service layer: polling, edge detection and broadcast.
//!
//! [`AvailabilityMonitor`] drives one poll: it asks a [`CampaignSource`]
//! for the upstream document, runs the edge detector against the
//! [`crate::persistence::StateStore`] and hands messages to the
//! [`Notifier`].

pub mod campaign_client;
pub mod monitor;
pub mod notifier;

#[cfg(test)]
pub(crate) mod testing;

pub use campaign_client::{CampaignClient, CampaignSource};
pub use monitor::{AvailabilityMonitor, CheckOutcome, CheckTrigger};
pub use notifier::{DeliveryReport, MessageSink, Notifier};
