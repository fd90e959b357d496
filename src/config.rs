//! Watcher configuration loaded from environment variables.
//!
//! All settings come from the environment (or a `.env` file via
//! `dotenvy`). The bot token, upstream client identifier and domain tag are
//! required; everything else has a default.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;

/// Default upstream endpoint.
pub const DEFAULT_API_URL: &str =
    "https://us-central1-grivy-barcode.cloudfunctions.net/getCampaign";

/// Default campaign public code.
pub const DEFAULT_CAMPAIGN_PUBLIC_CODE: &str = "frestea-ramadan-911";

/// Default storefront origin, sent as `origin` and `referer`.
pub const DEFAULT_STOREFRONT_ORIGIN: &str = "https://paduannya-nikmat.frestea.co.id";

/// Default link included in availability notifications.
pub const DEFAULT_TARGET_URL: &str =
    "https://paduannya-nikmat.frestea.co.id/c/frestea-ramadan-911";

/// Default poll interval in milliseconds.
pub const DEFAULT_INTERVAL_MS: u64 = 90_000;

/// Default upper bound on one upstream fetch, in milliseconds.
pub const DEFAULT_FETCH_TIMEOUT_MS: u64 = 30_000;

/// Upstream request settings.
#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    /// Endpoint receiving the `POST`.
    pub api_url: String,
    /// Campaign public code (`publicCode`).
    pub campaign_public_code: String,
    /// Client identifier (`gaCid`).
    pub ga_cid: String,
    /// Domain tag (`domain`).
    pub domain: String,
    /// Storefront origin used for the `origin`/`referer` headers.
    pub storefront_origin: String,
}

/// Top-level watcher configuration.
///
/// Loaded once at startup via [`WatcherConfig::from_env`].
#[derive(Debug, Clone)]
pub struct WatcherConfig {
    /// Telegram bot token.
    pub bot_token: SecretString,

    /// Upstream request settings.
    pub upstream: UpstreamConfig,

    /// Link shown in availability notifications.
    pub target_url: String,

    /// Delay between background polls.
    pub interval: Duration,

    /// Upper bound on one upstream fetch. Never longer than `interval`.
    pub fetch_timeout: Duration,

    /// JSON document holding the subscriber list.
    pub chats_file: PathBuf,

    /// JSON document holding the availability state.
    pub state_file: PathBuf,

    /// Maximum concurrent deliveries during a broadcast.
    pub notify_concurrency: usize,
}

impl WatcherConfig {
    /// Loads configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv().ok()` to optionally load a `.env` file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Missing`] when `BOT_TOKEN`, `GA_CID` or
    /// `DOMAIN` is unset or blank, and [`ConfigError::Invalid`] when
    /// `INTERVAL_MS` is zero.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Same as [`WatcherConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bot_token = required(&lookup, "BOT_TOKEN", "Create a bot with @BotFather.")?;
        let ga_cid = required(
            &lookup,
            "GA_CID",
            "Copy the gaCid field from the getCampaign request payload in DevTools.",
        )?;
        let domain = required(
            &lookup,
            "DOMAIN",
            "Copy the domain field from the getCampaign request payload in DevTools.",
        )?;

        let interval_ms = parse_env(&lookup, "INTERVAL_MS", DEFAULT_INTERVAL_MS);
        if interval_ms == 0 {
            return Err(ConfigError::Invalid {
                key: "INTERVAL_MS",
                reason: "must be greater than zero".to_string(),
            });
        }

        let fetch_timeout_ms = match parse_env(&lookup, "FETCH_TIMEOUT_MS", DEFAULT_FETCH_TIMEOUT_MS) {
            0 => DEFAULT_FETCH_TIMEOUT_MS,
            ms => ms,
        };

        let upstream = UpstreamConfig {
            api_url: string_env(&lookup, "API_URL", DEFAULT_API_URL),
            campaign_public_code: string_env(
                &lookup,
                "CAMPAIGN_PUBLIC_CODE",
                DEFAULT_CAMPAIGN_PUBLIC_CODE,
            ),
            ga_cid,
            domain,
            storefront_origin: string_env(&lookup, "STOREFRONT_ORIGIN", DEFAULT_STOREFRONT_ORIGIN),
        };

        Ok(Self {
            bot_token: SecretString::new(bot_token),
            upstream,
            target_url: string_env(&lookup, "TARGET_URL", DEFAULT_TARGET_URL),
            interval: Duration::from_millis(interval_ms),
            fetch_timeout: Duration::from_millis(fetch_timeout_ms.min(interval_ms)),
            chats_file: PathBuf::from(string_env(&lookup, "CHATS_FILE", "./chats.json")),
            state_file: PathBuf::from(string_env(&lookup, "STATE_FILE", "./state.json")),
            notify_concurrency: parse_env(&lookup, "NOTIFY_CONCURRENCY", 8_usize).max(1),
        })
    }
}

/// Returns the trimmed value of `key`, or [`ConfigError::Missing`].
fn required<F>(lookup: &F, key: &'static str, hint: &'static str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or(ConfigError::Missing { key, hint })
}

/// Returns the value of `key`, or `default` when unset or blank.
fn string_env<F>(lookup: &F, key: &str, default: &str) -> String
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

/// Parses an environment variable as `T`, returning `default` on missing
/// or invalid values.
fn parse_env<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}
