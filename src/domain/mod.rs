//! Domain layer: subscribers, campaign availability and persisted state.
//!
//! Everything in here is pure: no I/O, no clocks except where a timestamp
//! is passed in. The upstream document is parsed by
//! [`campaign::parse_availability`], a total function over any JSON value.

pub mod campaign;
pub mod messages;
pub mod state;
pub mod subscriber;

pub use campaign::{AvailabilityReason, CampaignResult, StoreAvailability, parse_availability};
pub use state::AvailabilityState;
pub use subscriber::{Subscriber, SubscriberId};
