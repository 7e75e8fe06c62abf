//! One-shot message send with optional self-deletion
//!
//! Unlike the monitor loop's fire-and-forget deletion tasks, the one-shot
//! command awaits the deletion inline so the process does not exit with the
//! timer still pending.

use std::time::Duration;

use crate::config::Config;
use crate::discord::DiscordClient;
use crate::error::Result;
use crate::logger::{LogLevel, LogSink};

#[derive(Debug, Clone, Default)]
pub struct SendOptions {
    pub reply_to: Option<String>,
    pub delete_after: Option<u64>,
    pub delete_immediately: bool,
}

pub async fn send_once(
    discord: &DiscordClient,
    sink: &LogSink,
    channel_id: &str,
    message: &str,
    options: &SendOptions,
) -> Result<()> {
    let message_id = discord
        .send_message(channel_id, message, options.reply_to.as_deref())
        .await?;
    sink.log(
        LogLevel::Success,
        format!("[{}] Message sent: \"{}\"", channel_id, message),
    );

    if let Some(delete_after) = options.delete_after {
        let delay_secs = if options.delete_immediately {
            0
        } else {
            delete_after
        };
        if delay_secs > 0 {
            sink.log(
                LogLevel::Wait,
                format!(
                    "[{}] Message will be deleted in {} seconds.",
                    channel_id, delay_secs
                ),
            );
            tokio::time::sleep(Duration::from_secs(delay_secs)).await;
        }
        discord.delete_message(channel_id, &message_id).await?;
        sink.log(
            LogLevel::Success,
            format!("[{}] Message {} deleted.", channel_id, message_id),
        );
    }

    Ok(())
}

pub async fn run(
    config: &Config,
    channel_id: &str,
    message: &str,
    options: &SendOptions,
) -> Result<()> {
    let discord = DiscordClient::new(config.token.clone())?;
    let sink = LogSink::stdout();
    send_once(&discord, &sink, channel_id, message, options).await
}
