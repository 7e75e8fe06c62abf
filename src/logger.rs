//! Leveled log sink with timestamped, icon-prefixed lines.
//!
//! Rendered lines are either printed to stdout or enqueued on a channel so an
//! embedding UI can drain them. Every line is also mirrored into `tracing`.

use chrono::Local;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{error, info, warn};

/// Log levels understood by the sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Success,
    Error,
    Warning,
    Wait,
    Info,
}

impl LogLevel {
    /// Icon rendered in front of the message.
    pub fn icon(&self) -> &'static str {
        match self {
            LogLevel::Success => "✅",
            LogLevel::Error => "🚨",
            LogLevel::Warning => "⚠️",
            LogLevel::Wait => "⌛",
            LogLevel::Info => "ℹ️",
        }
    }
}

/// Destination for rendered log lines.
#[derive(Debug, Clone)]
pub struct LogSink {
    queue: Option<UnboundedSender<String>>,
}

impl LogSink {
    /// Sink that prints rendered lines to stdout.
    pub fn stdout() -> Self {
        Self { queue: None }
    }

    /// Sink that enqueues rendered lines, plus the receiving end.
    pub fn channel() -> (Self, UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { queue: Some(tx) }, rx)
    }

    /// Render and emit a message at the given level.
    pub fn log(&self, level: LogLevel, message: impl AsRef<str>) {
        let message = message.as_ref();
        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S");
        let line = format!("[{}] {} {}", timestamp, level.icon(), message);

        match level {
            LogLevel::Error => error!("{}", message),
            LogLevel::Warning => warn!("{}", message),
            LogLevel::Success | LogLevel::Wait | LogLevel::Info => info!("{}", message),
        }

        match &self.queue {
            // Receiver may already be gone during shutdown; the line was
            // mirrored into tracing above either way.
            Some(tx) => {
                let _ = tx.send(line);
            }
            None => println!("{}", line),
        }
    }
}
