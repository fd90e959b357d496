//! # voucher-watch
//!
//! Polls a campaign availability endpoint on a fixed interval and tells
//! every registered Telegram chat when vouchers become available.
//!
//! Only the unavailable-to-available edge produces an alert. The state
//! behind that edge lives in a small JSON document so restarts do not
//! re-alert.
//!
//! ## Architecture
//!
//! ```text
//! Telegram (commands)        interval timer
//!     │                           │
//!     ├── CommandRouter (bot/)    │
//!     │        │                  │
//!     │        └──► Scheduler ◄───┘
//!     │                 │
//!     │        AvailabilityMonitor (service/)
//!     │           │            │
//!     │   CampaignClient    Notifier ──► TelegramSink
//!     │                        │
//!     └──► SubscriberRegistry / StateStore (persistence/)
//! ```

pub mod bot;
pub mod config;
pub mod domain;
pub mod error;
pub mod persistence;
pub mod scheduler;
pub mod service;
