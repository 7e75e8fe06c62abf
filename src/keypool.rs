//! Gemini API key pool with rate-limit rotation.
//!
//! Keys that hit 429 are parked in an exhausted set. Once every key is
//! parked, `acquire` sleeps through a cooldown (24 hours by default), clears
//! the set, and tries again. The wait races the session's cancellation token
//! so shutdown never blocks on it.

use std::collections::HashSet;
use std::sync::Mutex;
use std::time::Duration;

use rand::seq::SliceRandom;
use tokio_util::sync::CancellationToken;

use crate::config::KEY_COOLDOWN_SECS;
use crate::error::{Error, Result};
use crate::logger::{LogLevel, LogSink};

#[derive(Debug)]
pub struct CredentialPool {
    keys: Vec<String>,
    exhausted: Mutex<HashSet<String>>,
    cooldown: Duration,
}

impl CredentialPool {
    /// Build a pool from candidate keys. Empty and whitespace-only entries
    /// are discarded.
    pub fn new(keys: Vec<String>) -> Self {
        let keys = keys
            .into_iter()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .collect();
        Self {
            keys,
            exhausted: Mutex::new(HashSet::new()),
            cooldown: Duration::from_secs(KEY_COOLDOWN_SECS),
        }
    }

    /// Override the exhaustion cooldown (tests use short durations).
    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }

    /// True if the pool holds at least one usable-looking key.
    pub fn has_credentials(&self) -> bool {
        !self.keys.is_empty()
    }

    /// Park a key after a 429 response.
    pub fn mark_rate_limited(&self, key: &str) {
        let mut exhausted = self.exhausted.lock().unwrap_or_else(|e| e.into_inner());
        exhausted.insert(key.to_string());
    }

    /// True if the key is currently parked.
    pub fn is_rate_limited(&self, key: &str) -> bool {
        let exhausted = self.exhausted.lock().unwrap_or_else(|e| e.into_inner());
        exhausted.contains(key)
    }

    /// Keys currently usable (pool minus exhausted).
    pub fn available(&self) -> Vec<String> {
        let exhausted = self.exhausted.lock().unwrap_or_else(|e| e.into_inner());
        self.keys
            .iter()
            .filter(|k| !exhausted.contains(k.as_str()))
            .cloned()
            .collect()
    }

    /// Clear the exhausted set, making every key usable again.
    pub fn reset(&self) {
        let mut exhausted = self.exhausted.lock().unwrap_or_else(|e| e.into_inner());
        exhausted.clear();
    }

    fn pick(&self) -> Option<String> {
        let available = self.available();
        available.choose(&mut rand::thread_rng()).cloned()
    }

    /// Return a uniformly random usable key. If every key is exhausted, wait
    /// out the cooldown, reset the pool, and try again. Cancellation aborts
    /// the wait with `Error::Cancelled`.
    pub async fn acquire(&self, sink: &LogSink, cancel: &CancellationToken) -> Result<String> {
        loop {
            if let Some(key) = self.pick() {
                return Ok(key);
            }

            sink.log(
                LogLevel::Error,
                format!(
                    "All Gemini API keys hit 429. Waiting {} seconds before reset...",
                    self.cooldown.as_secs()
                ),
            );

            tokio::select! {
                _ = cancel.cancelled() => return Err(Error::Cancelled),
                _ = tokio::time::sleep(self.cooldown) => self.reset(),
            }
        }
    }
}
