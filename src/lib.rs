//! Discord Channel Auto-responder Library
//!
//! This library provides tools to:
//! - Monitor Discord channels and reply to new messages using Gemini
//! - Broadcast lines from a local corpus file on an interval
//! - Rotate Gemini API keys on rate limits with a cooldown reset
//! - Schedule delayed self-deletion of sent messages
//! - Run multiple channel sessions concurrently with shared state
//! - Expose Prometheus metrics for sends, generations, and deletions

pub mod config;
pub mod dedup;
pub mod discord;
pub mod error;
pub mod gemini;
pub mod generator;
pub mod keypool;
pub mod logger;
pub mod metrics;
pub mod monitor;

// Re-export common types
pub use config::{Config, Language, ReplySettings};
pub use dedup::DedupState;
pub use discord::{BotIdentity, ChannelMessage, DiscordClient};
pub use error::{Error, Result};
pub use gemini::GeminiClient;
pub use generator::ReplyGenerator;
pub use keypool::CredentialPool;
pub use logger::{LogLevel, LogSink};
pub use monitor::{ChannelSession, LoopSettings};

// Commands module uses re-exported types, so it must be declared after the re-exports
pub mod commands;
