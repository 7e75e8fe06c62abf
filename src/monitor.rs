//! Channel monitor: the auto-reply loop.
//!
//! One `ChannelSession` per monitored channel, each running as its own tokio
//! task. A session validates the acting identity once, then either polls the
//! channel and replies to new foreign messages (AI mode) or broadcasts corpus
//! lines on an interval (idle mode). Every wait races the session's
//! cancellation token.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::config::{Language, ReplySettings, ERROR_BACKOFF_SECS};
use crate::dedup::DedupState;
use crate::discord::{BotIdentity, DiscordClient};
use crate::error::{Error, Result};
use crate::generator::ReplyGenerator;
use crate::logger::{LogLevel, LogSink};
use crate::metrics;

/// Immutable per-run loop configuration.
#[derive(Debug, Clone)]
pub struct LoopSettings {
    pub use_ai: bool,
    pub language: Language,
    pub use_reply: bool,
    pub read_delay: Duration,
    pub delay_interval: Duration,
    pub error_backoff: Duration,
    /// Delete own messages after this many seconds; None keeps them.
    pub delete_after: Option<u64>,
    pub delete_immediately: bool,
}

impl Default for LoopSettings {
    fn default() -> Self {
        Self::from(&ReplySettings::default())
    }
}

impl From<&ReplySettings> for LoopSettings {
    fn from(settings: &ReplySettings) -> Self {
        Self {
            use_ai: settings.use_ai,
            language: settings.language,
            use_reply: settings.use_reply,
            read_delay: Duration::from_secs(settings.read_delay),
            delay_interval: Duration::from_secs(settings.delay_interval),
            error_backoff: Duration::from_secs(ERROR_BACKOFF_SECS),
            delete_after: settings.delete_after,
            delete_immediately: settings.delete_immediately,
        }
    }
}

/// A monitor session for one channel.
pub struct ChannelSession {
    channel_id: String,
    discord: DiscordClient,
    generator: Arc<ReplyGenerator>,
    dedup: Arc<DedupState>,
    settings: LoopSettings,
    sink: LogSink,
    cancel: CancellationToken,
}

impl ChannelSession {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        channel_id: impl Into<String>,
        discord: DiscordClient,
        generator: Arc<ReplyGenerator>,
        dedup: Arc<DedupState>,
        settings: LoopSettings,
        sink: LogSink,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            channel_id: channel_id.into(),
            discord,
            generator,
            dedup,
            settings,
            sink,
            cancel,
        }
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Sleep `duration` unless the session is cancelled first. Returns true
    /// when the wait was interrupted by cancellation.
    async fn wait(&self, duration: Duration) -> bool {
        tokio::select! {
            _ = self.cancel.cancelled() => true,
            _ = tokio::time::sleep(duration) => false,
        }
    }

    /// Run the session until cancelled or identity validation fails.
    pub async fn run(self) {
        metrics::session_started();

        let identity = match self.discord.current_user().await {
            Ok(identity) => identity,
            Err(err) => {
                self.sink.log(
                    LogLevel::Error,
                    format!(
                        "[{}] Failed to start: token {} rejected ({})",
                        self.channel_id,
                        self.discord.token_hint(),
                        err
                    ),
                );
                metrics::session_stopped();
                return;
            }
        };

        self.sink.log(
            LogLevel::Info,
            format!(
                "[{}] Logged in as {}#{}",
                self.channel_id, identity.username, identity.discriminator
            ),
        );

        let (server_name, channel_name) = self.discord.channel_info(&self.channel_id).await;
        self.sink.log(
            LogLevel::Info,
            format!(
                "[{}] Monitoring \"{}\" in {}",
                self.channel_id, channel_name, server_name
            ),
        );

        loop {
            if self.cancel.is_cancelled() {
                break;
            }

            let cycle = if self.settings.use_ai {
                self.poll_cycle(&identity).await
            } else {
                self.broadcast_cycle().await
            };

            match cycle {
                Ok(()) => {
                    if self.wait(self.settings.delay_interval).await {
                        break;
                    }
                }
                Err(Error::Cancelled) => break,
                Err(err) => {
                    self.sink
                        .log(LogLevel::Error, format!("[{}] Error: {}", self.channel_id, err));
                    if self.wait(self.settings.error_backoff).await {
                        break;
                    }
                }
            }
        }

        self.sink.log(
            LogLevel::Info,
            format!("[{}] Session stopped.", self.channel_id),
        );
        metrics::session_stopped();
    }

    /// One polling iteration: fetch the newest message and reply to it if it
    /// is foreign, unseen, and non-empty.
    async fn poll_cycle(&self, identity: &BotIdentity) -> Result<()> {
        if self.wait(self.settings.read_delay).await {
            return Err(Error::Cancelled);
        }

        let Some(message) = self.discord.latest_message(&self.channel_id).await? else {
            return Ok(());
        };

        if message.author.id == identity.id {
            return Ok(());
        }
        if !self.dedup.mark_processed(&message.id) {
            return Ok(());
        }

        let content = message.content.trim().to_string();
        if content.is_empty() {
            return Ok(());
        }

        self.sink.log(
            LogLevel::Info,
            format!("[{}] Message received: {}", self.channel_id, content),
        );

        match self
            .generator
            .generate(&content, self.settings.language, true, &self.cancel)
            .await
        {
            Ok(Some(text)) => {
                let reply_to = self.settings.use_reply.then(|| message.id.as_str());
                self.deliver(&text, reply_to).await;
            }
            Ok(None) => {}
            // Already logged by the generator; the next cycle retries
            Err(Error::NoCredentials) => {}
            Err(err) => return Err(err),
        }

        Ok(())
    }

    /// One broadcast iteration: post a corpus line unconditionally.
    async fn broadcast_cycle(&self) -> Result<()> {
        if self.wait(self.settings.delay_interval).await {
            return Err(Error::Cancelled);
        }

        match self
            .generator
            .generate("", self.settings.language, false, &self.cancel)
            .await
        {
            Ok(Some(text)) => self.deliver(&text, None).await,
            Ok(None) => {}
            Err(err) => return Err(err),
        }

        Ok(())
    }

    /// Send a message and, when configured, schedule its deletion. Send
    /// failures are logged and dropped; the loop keeps its normal cadence.
    async fn deliver(&self, text: &str, reply_to: Option<&str>) {
        match self
            .discord
            .send_message(&self.channel_id, text, reply_to)
            .await
        {
            Ok(message_id) => {
                metrics::record_message_sent(&self.channel_id, true);
                self.sink.log(
                    LogLevel::Success,
                    format!("[{}] Message sent: \"{}\"", self.channel_id, text),
                );

                if let Some(delete_after) = self.settings.delete_after {
                    let delay_secs = if self.settings.delete_immediately {
                        0
                    } else {
                        delete_after
                    };
                    if delay_secs > 0 {
                        self.sink.log(
                            LogLevel::Wait,
                            format!(
                                "[{}] Message will be deleted in {} seconds.",
                                self.channel_id, delay_secs
                            ),
                        );
                    }
                    self.schedule_delete(message_id, Duration::from_secs(delay_secs));
                }
            }
            Err(err) => {
                metrics::record_message_sent(&self.channel_id, false);
                self.sink.log(
                    LogLevel::Error,
                    format!("[{}] Failed to send message: {}", self.channel_id, err),
                );
            }
        }
    }

    /// Fire-and-forget deletion task, tied to the session's cancellation
    /// token so a stopped session leaves no pending timers behind.
    fn schedule_delete(&self, message_id: String, delay: Duration) {
        let discord = self.discord.clone();
        let sink = self.sink.clone();
        let channel_id = self.channel_id.clone();
        let cancel = self.cancel.clone();

        tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {}
                _ = tokio::time::sleep(delay) => {
                    match discord.delete_message(&channel_id, &message_id).await {
                        Ok(()) => {
                            metrics::record_deletion(true);
                            sink.log(
                                LogLevel::Success,
                                format!("[{}] Message {} deleted.", channel_id, message_id),
                            );
                        }
                        Err(err) => {
                            metrics::record_deletion(false);
                            sink.log(
                                LogLevel::Error,
                                format!(
                                    "[{}] Failed to delete {}: {}",
                                    channel_id, message_id, err
                                ),
                            );
                        }
                    }
                }
            }
        });
    }
}
