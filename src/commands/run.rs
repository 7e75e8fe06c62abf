//! Start auto-reply sessions for every configured channel
//!
//! One `ChannelSession` task per channel, all sharing one credential pool and
//! one dedup state. Ctrl+C cancels the parent token and waits for the
//! sessions to drain.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::dedup::DedupState;
use crate::discord::DiscordClient;
use crate::error::{Error, Result};
use crate::gemini::GeminiClient;
use crate::generator::ReplyGenerator;
use crate::keypool::CredentialPool;
use crate::logger::{LogLevel, LogSink};
use crate::monitor::{ChannelSession, LoopSettings};

pub async fn run(config: Config) -> Result<()> {
    if config.channels.is_empty() {
        return Err(Error::InvalidArgument(
            "no channels configured (add a channels: list to config.yml)".to_string(),
        ));
    }

    let sink = LogSink::stdout();
    let discord = DiscordClient::new(config.token.clone())?;
    let gemini = GeminiClient::new()?.with_model(config.model());

    let pool = Arc::new(CredentialPool::new(config.api_keys.clone()));
    let dedup = Arc::new(DedupState::new());
    let generator = Arc::new(ReplyGenerator::new(
        gemini,
        pool,
        Arc::clone(&dedup),
        config.reply.corpus_file.clone(),
        sink.clone(),
    ));

    let settings = LoopSettings::from(&config.reply);
    let root = CancellationToken::new();

    let mut tasks = Vec::new();
    for channel_id in &config.channels {
        let session = ChannelSession::new(
            channel_id.clone(),
            discord.clone(),
            Arc::clone(&generator),
            Arc::clone(&dedup),
            settings.clone(),
            sink.clone(),
            root.child_token(),
        );
        tasks.push(tokio::spawn(session.run()));
    }

    sink.log(
        LogLevel::Info,
        format!(
            "Started {} channel session(s). Press Ctrl+C to stop.",
            tasks.len()
        ),
    );

    tokio::signal::ctrl_c().await?;
    sink.log(LogLevel::Wait, "Stopping sessions...");
    root.cancel();
    futures::future::join_all(tasks).await;

    sink.log(LogLevel::Success, "All sessions stopped.");
    Ok(())
}
