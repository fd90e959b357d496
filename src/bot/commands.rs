//! Chat command surface, independent of the Telegram wire types.
//!
//! [`CommandRouter::dispatch`] implements every command against the
//! registry, the monitor and the scheduler. Replies go through the same
//! [`MessageSink`] used for broadcasts.

use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::domain::SubscriberId;
use crate::domain::messages::TEST_NOTIFICATION;
use crate::error::DeliveryError;
use crate::scheduler::SchedulerHandle;
use crate::service::{AvailabilityMonitor, MessageSink};

/// A recognised slash command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Register this chat for notifications.
    Start,
    /// Broadcast a test notification.
    TestNotif,
    /// Show the number of registered chats.
    List,
    /// Check the campaign now and broadcast its status.
    Status,
    /// Re-arm the availability alert.
    Reset,
}

impl Command {
    /// Every command, in menu order.
    pub const ALL: [Self; 5] = [Self::Start, Self::TestNotif, Self::List, Self::Status, Self::Reset];

    /// Command name without the leading slash.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::TestNotif => "testnotif",
            Self::List => "list",
            Self::Status => "status",
            Self::Reset => "reset",
        }
    }

    /// Short description shown in the client's command menu.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Start => "Register this chat for voucher alerts",
            Self::TestNotif => "Send a test notification to every chat",
            Self::List => "Show how many chats are registered",
            Self::Status => "Check the campaign now",
            Self::Reset => "Re-arm the availability alert",
        }
    }

    /// Parses the first word of a message.
    ///
    /// Accepts `/name` and `/name@bot` (case-insensitive); addressed
    /// commands for another bot are ignored. Trailing arguments are ignored.
    #[must_use]
    pub fn parse(text: &str, bot_username: Option<&str>) -> Option<Self> {
        let word = text.trim_start().strip_prefix('/')?.split_whitespace().next()?;
        let (name, target) = match word.split_once('@') {
            Some((name, target)) => (name, Some(target)),
            None => (word, None),
        };
        if let (Some(target), Some(me)) = (target, bot_username)
            && !target.eq_ignore_ascii_case(me)
        {
            return None;
        }
        Self::ALL
            .into_iter()
            .find(|cmd| cmd.name().eq_ignore_ascii_case(name))
    }
}

/// Who sent a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatOrigin {
    /// Chat the command came from; replies go here.
    pub chat: SubscriberId,
    /// Sender username, else first name, else `unknown`.
    pub display_name: String,
    /// Chat kind (`private`, `group`, `supergroup`, `channel`).
    pub kind: String,
}

/// Executes commands.
#[derive(Debug, Clone)]
pub struct CommandRouter {
    monitor: AvailabilityMonitor,
    scheduler: SchedulerHandle,
    replies: Arc<dyn MessageSink>,
}

impl CommandRouter {
    /// Creates a router.
    #[must_use]
    pub fn new(
        monitor: AvailabilityMonitor,
        scheduler: SchedulerHandle,
        replies: Arc<dyn MessageSink>,
    ) -> Self {
        Self {
            monitor,
            scheduler,
            replies,
        }
    }

    /// Runs `command` on behalf of `origin`.
    ///
    /// # Errors
    ///
    /// Returns a [`DeliveryError`] if a direct reply cannot be sent.
    /// Broadcast failures are handled by the notifier and never surface
    /// here.
    pub async fn dispatch(&self, command: Command, origin: &ChatOrigin) -> Result<(), DeliveryError> {
        tracing::debug!(command = command.name(), chat = %origin.chat, "command received");
        match command {
            Command::Start => self.start(origin).await,
            Command::TestNotif => {
                self.reply(origin, "✅ OK, sending a test notification...").await?;
                self.monitor.notifier().notify_all(TEST_NOTIFICATION).await;
                Ok(())
            }
            Command::List => {
                let count = self.monitor.notifier().registry().len().await;
                self.reply(origin, &format!("Registered: {count} chat(s)")).await
            }
            Command::Status => {
                self.reply(origin, "🔍 Fetching status from the API...").await?;
                match self.scheduler.request_manual_check().await {
                    Ok(_) => self.reply(origin, "✅ Done.").await,
                    Err(e) => {
                        tracing::warn!(error = %e, "manual check not run");
                        self.reply(origin, "⚠️ The checker is shutting down, try again later.")
                            .await
                    }
                }
            }
            Command::Reset => match self.monitor.reset().await {
                Ok(_) => {
                    self.reply(
                        origin,
                        "♻️ State reset. You will be notified again when vouchers become available.",
                    )
                    .await
                }
                Err(e) => {
                    tracing::error!(error = %e, "state reset failed");
                    self.reply(origin, "⚠️ Could not save the reset state.").await
                }
            },
        }
    }

    /// Runs `command` on its own task so a slow check never holds up other
    /// commands or the update loop. Reply failures are logged.
    pub fn spawn_dispatch(&self, command: Command, origin: ChatOrigin) -> JoinHandle<()> {
        let router = self.clone();
        tokio::spawn(async move {
            if let Err(e) = router.dispatch(command, &origin).await {
                tracing::error!(chat = %origin.chat, command = command.name(), error = %e, "command reply failed");
            }
        })
    }

    async fn start(&self, origin: &ChatOrigin) -> Result<(), DeliveryError> {
        let registry = self.monitor.notifier().registry();
        match registry
            .register_if_absent(origin.chat, &origin.display_name, &origin.kind)
            .await
        {
            Ok(true) => {
                self.reply(
                    origin,
                    "✅ This chat is now registered.\nYou will get a message when vouchers become available.",
                )
                .await
            }
            Ok(false) => self.reply(origin, "ℹ️ This chat was already registered.").await,
            Err(e) => {
                tracing::error!(chat = %origin.chat, error = %e, "registration failed");
                self.reply(origin, "⚠️ Registration failed, please try again.").await
            }
        }
    }

    async fn reply(&self, origin: &ChatOrigin, text: &str) -> Result<(), DeliveryError> {
        self.replies.send(origin.chat, text).await
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::time::Duration;

    use tokio_util::sync::CancellationToken;

    use super::*;
    use crate::domain::AvailabilityState;
    use crate::scheduler::Scheduler;
    use crate::service::testing::{RecordingSink, ScriptedSource, memory_state, registry_with};
    use crate::service::{CampaignSource, Notifier};

    struct Fixture {
        router: CommandRouter,
        sink: Arc<RecordingSink>,
        monitor: AvailabilityMonitor,
        scheduler: Scheduler,
        cancel: CancellationToken,
    }

    async fn fixture(subscribers: &[i64], script: ScriptedSource, state: AvailabilityState) -> Fixture {
        let sink = Arc::new(RecordingSink::default());
        let notifier = Notifier::new(registry_with(subscribers).await, sink.clone_dyn(), 4);
        let source: Arc<dyn CampaignSource> = Arc::new(script);
        let monitor = AvailabilityMonitor::new(source, memory_state(state), notifier, "https://shop.example");
        let cancel = CancellationToken::new();
        let scheduler = Scheduler::spawn(monitor.clone(), Duration::from_secs(3600), cancel.clone());
        // Let the startup check run before the test drives commands.
        tokio::time::sleep(Duration::from_millis(10)).await;
        let router = CommandRouter::new(monitor.clone(), scheduler.handle(), sink.clone_dyn());
        Fixture {
            router,
            sink,
            monitor,
            scheduler,
            cancel,
        }
    }

    impl Fixture {
        async fn shutdown(self) {
            self.cancel.cancel();
            self.scheduler.join().await;
        }
    }

    fn origin(chat: i64) -> ChatOrigin {
        ChatOrigin {
            chat: SubscriberId::new(chat),
            display_name: "alice".to_string(),
            kind: "private".to_string(),
        }
    }

    #[test]
    fn parses_commands() {
        assert_eq!(Command::parse("/start", None), Some(Command::Start));
        assert_eq!(Command::parse("  /STATUS now", None), Some(Command::Status));
        assert_eq!(Command::parse("/testnotif@watch_bot", Some("Watch_Bot")), Some(Command::TestNotif));
        assert_eq!(Command::parse("/reset@other_bot", Some("watch_bot")), None);
        assert_eq!(Command::parse("/unknown", None), None);
        assert_eq!(Command::parse("start", None), None);
        assert_eq!(Command::parse("/", None), None);
    }

    #[test]
    fn every_command_round_trips_through_its_name() {
        for cmd in Command::ALL {
            assert_eq!(Command::parse(&format!("/{}", cmd.name()), None), Some(cmd));
            assert!(!cmd.description().is_empty());
        }
    }

    #[tokio::test(start_paused = true)]
    async fn start_registers_once() {
        let fx = fixture(&[], ScriptedSource::availability(&[false]), AvailabilityState::default()).await;

        assert!(fx.router.dispatch(Command::Start, &origin(5)).await.is_ok());
        assert!(fx.router.dispatch(Command::Start, &origin(5)).await.is_ok());

        let replies = fx.sink.texts_for(5);
        assert_eq!(replies.len(), 2);
        assert!(replies.first().is_some_and(|t| t.contains("now registered")));
        assert!(replies.get(1).is_some_and(|t| t.contains("already registered")));
        assert_eq!(fx.monitor.notifier().registry().len().await, 1);
        fx.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn list_reports_count() {
        let fx = fixture(&[1, 2, 3], ScriptedSource::availability(&[false]), AvailabilityState::default()).await;
        assert!(fx.router.dispatch(Command::List, &origin(9)).await.is_ok());
        assert_eq!(fx.sink.texts_for(9), vec!["Registered: 3 chat(s)".to_string()]);
        fx.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn testnotif_acks_then_broadcasts() {
        let fx = fixture(&[1, 2], ScriptedSource::availability(&[false]), AvailabilityState::default()).await;
        assert!(fx.router.dispatch(Command::TestNotif, &origin(1)).await.is_ok());

        let to_sender = fx.sink.texts_for(1);
        assert_eq!(to_sender.len(), 2);
        assert!(to_sender.first().is_some_and(|t| t.contains("sending a test")));
        assert_eq!(fx.sink.texts_for(2), vec![TEST_NOTIFICATION.to_string()]);
        fx.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn status_runs_manual_check_and_confirms() {
        let fx = fixture(&[1], ScriptedSource::availability(&[false, false]), AvailabilityState::default()).await;
        assert!(fx.router.dispatch(Command::Status, &origin(1)).await.is_ok());

        let texts = fx.sink.texts_for(1);
        assert_eq!(texts.len(), 3);
        assert!(texts.first().is_some_and(|t| t.starts_with("🔍")));
        assert!(texts.get(1).is_some_and(|t| t.starts_with("📌")));
        assert!(texts.get(2).is_some_and(|t| t.starts_with("✅")));
        fx.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn slow_status_does_not_block_other_commands() {
        let source = ScriptedSource::availability(&[false, false]).with_delay(Duration::from_secs(3600));
        let fx = fixture(&[1], source, AvailabilityState::default()).await;

        let status = fx.router.spawn_dispatch(Command::Status, origin(1));
        let list = fx.router.spawn_dispatch(Command::List, origin(2));
        assert!(list.await.is_ok());
        assert_eq!(fx.sink.texts_for(2), vec!["Registered: 1 chat(s)".to_string()]);
        assert!(!status.is_finished());

        // Startup and manual checks both hit the fetch deadline.
        assert!(status.await.is_ok());
        let texts = fx.sink.texts_for(1);
        assert!(texts.first().is_some_and(|t| t.starts_with("🔍")));
        assert!(texts.last().is_some_and(|t| t.starts_with("✅")));
        fx.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn reset_clears_flag_silently() {
        let available = AvailabilityState {
            last_available: true,
            ..AvailabilityState::default()
        };
        // Script exhausted: the startup check fails and leaves the flag set.
        let fx = fixture(&[1, 2], ScriptedSource::availability(&[]), available).await;
        assert!(fx.monitor.state().load().await.last_available);

        assert!(fx.router.dispatch(Command::Reset, &origin(1)).await.is_ok());
        assert!(!fx.monitor.state().load().await.last_available);
        assert_eq!(fx.sink.texts_for(1).len(), 1);
        assert!(fx.sink.texts_for(2).is_empty());
        fx.shutdown().await;
    }
}
