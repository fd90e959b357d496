//! voucher-watch entry point.
//!
//! Starts the campaign poller and the Telegram command loop, then waits for
//! SIGINT/SIGTERM.

use std::sync::Arc;

use secrecy::ExposeSecret;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use voucher_watch::bot::{CommandRouter, TelegramSink, build_bot, start_polling};
use voucher_watch::config::WatcherConfig;
use voucher_watch::domain::{AvailabilityState, Subscriber};
use voucher_watch::persistence::{DocumentStore, JsonFileStore, StateStore, SubscriberRegistry};
use voucher_watch::scheduler::Scheduler;
use voucher_watch::service::{
    AvailabilityMonitor, CampaignClient, CampaignSource, MessageSink, Notifier,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration; missing credentials are fatal before anything starts.
    let config = match WatcherConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("{e}");
            std::process::exit(1);
        }
    };
    tracing::info!(
        interval = ?config.interval,
        fetch_timeout = ?config.fetch_timeout,
        api_url = %config.upstream.api_url,
        campaign = %config.upstream.campaign_public_code,
        authorization = "none",
        "starting voucher-watch"
    );

    // Persistence
    let chats: Arc<dyn DocumentStore<Vec<Subscriber>>> =
        Arc::new(JsonFileStore::<Vec<Subscriber>>::new(config.chats_file.clone()));
    let state: Arc<dyn DocumentStore<AvailabilityState>> =
        Arc::new(JsonFileStore::<AvailabilityState>::new(config.state_file.clone()));
    let registry = SubscriberRegistry::new(chats);
    let state = StateStore::new(state);

    // Transport
    let bot = build_bot(config.bot_token.expose_secret())?;
    let sink: Arc<dyn MessageSink> = Arc::new(TelegramSink::new(bot.clone()));

    // Service layer
    let notifier = Notifier::new(registry, Arc::clone(&sink), config.notify_concurrency);
    let source: Arc<dyn CampaignSource> = Arc::new(CampaignClient::new(
        config.upstream.clone(),
        config.fetch_timeout,
    )?);
    let monitor = AvailabilityMonitor::new(source, state, notifier, config.target_url.clone())
        .with_fetch_timeout(config.fetch_timeout);

    // Scheduler: first check runs immediately.
    let cancel = CancellationToken::new();
    let scheduler = Scheduler::spawn(monitor.clone(), config.interval, cancel.clone());

    let router = CommandRouter::new(monitor, scheduler.handle(), sink);
    let polling = match start_polling(bot, router, cancel.clone()).await {
        Ok(handle) => handle,
        Err(e) => {
            tracing::error!(error = %e, "failed to start telegram bot");
            cancel.cancel();
            scheduler.join().await;
            return Err(e);
        }
    };
    tracing::info!("bot running");

    tokio::select! {
        () = shutdown_signal() => tracing::info!("shutdown signal received"),
        () = cancel.cancelled() => tracing::warn!("stopped by the telegram loop"),
    }

    cancel.cancel();
    scheduler.join().await;
    if let Err(e) = polling.await {
        tracing::error!(error = %e, "telegram polling task panicked");
    }
    tracing::info!("shut down");
    Ok(())
}

/// Resolves on Ctrl-C, or on SIGTERM where available.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
