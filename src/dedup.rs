//! Shared dedup state: processed message ids and the last generated reply.
//!
//! One instance is shared by every channel session, so the id set spans all
//! monitored channels and the non-repetition check on generated text is
//! global rather than per-channel.

use std::collections::HashSet;
use std::sync::Mutex;

#[derive(Debug, Default)]
pub struct DedupState {
    seen: Mutex<HashSet<String>>,
    last_reply: Mutex<Option<String>>,
}

impl DedupState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a message id. Returns false if the id was already processed.
    pub fn mark_processed(&self, message_id: &str) -> bool {
        let mut seen = self.seen.lock().unwrap_or_else(|e| e.into_inner());
        seen.insert(message_id.to_string())
    }

    /// Accept a generated reply if it is non-empty and differs
    /// case-insensitively from the previous accepted reply. Stores the
    /// normalized text on acceptance.
    pub fn accept_reply(&self, text: &str) -> bool {
        let normalized = text.trim().to_lowercase();
        if normalized.is_empty() {
            return false;
        }
        let mut last = self.last_reply.lock().unwrap_or_else(|e| e.into_inner());
        if last.as_deref() == Some(normalized.as_str()) {
            return false;
        }
        *last = Some(normalized);
        true
    }

    /// Last accepted reply, normalized (trimmed and lowercased).
    pub fn last_reply(&self) -> Option<String> {
        self.last_reply
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_mark_processed_once() {
        let state = DedupState::new();
        assert!(state.mark_processed("100"));
        assert!(!state.mark_processed("100"));
        assert!(state.mark_processed("101"));
    }

    #[test]
    fn test_accept_reply_rejects_consecutive_duplicate() {
        let state = DedupState::new();
        assert!(state.accept_reply("Hello there"));
        assert!(!state.accept_reply("hello THERE"));
        assert!(state.accept_reply("something else"));
        // The earlier text is allowed again once it is no longer the latest
        assert!(state.accept_reply("Hello there"));
    }

    #[test]
    fn test_accept_reply_rejects_empty() {
        let state = DedupState::new();
        assert!(!state.accept_reply(""));
        assert!(!state.accept_reply("   "));
        assert_eq!(state.last_reply(), None);
    }

    #[test]
    fn test_last_reply_is_normalized() {
        let state = DedupState::new();
        assert!(state.accept_reply("  Nice Day  "));
        assert_eq!(state.last_reply().as_deref(), Some("nice day"));
    }

    #[tokio::test]
    async fn test_concurrent_mark_processed_is_race_free() {
        let state = Arc::new(DedupState::new());

        let mut handles = Vec::new();
        for _ in 0..8 {
            let state = Arc::clone(&state);
            handles.push(tokio::spawn(async move {
                let mut wins = 0;
                for id in 0..100 {
                    if state.mark_processed(&id.to_string()) {
                        wins += 1;
                    }
                }
                wins
            }));
        }

        let mut total = 0;
        for handle in handles {
            total += handle.await.expect("task");
        }
        // Each of the 100 ids is claimed by exactly one task
        assert_eq!(total, 100);
    }
}
