//! Reply generation: Gemini with key rotation, or a local corpus file.
//!
//! The AI path enforces non-repetition against the last accepted reply
//! (shared across every channel) with a bounded regenerate loop. The corpus
//! path never touches the network and never fails; unreadable or empty
//! corpus files produce placeholder replies.

use std::path::PathBuf;
use std::sync::Arc;

use rand::seq::SliceRandom;
use tokio_util::sync::CancellationToken;

use crate::config::Language;
use crate::dedup::DedupState;
use crate::error::{Error, Result};
use crate::gemini::{mask_key, GeminiClient};
use crate::keypool::CredentialPool;
use crate::logger::{LogLevel, LogSink};
use crate::metrics;

/// Reply when the corpus file exists but holds no usable lines.
pub const NO_MESSAGES_PLACEHOLDER: &str = "No messages available in the corpus file";
/// Reply when the corpus file cannot be read.
pub const CORPUS_MISSING_PLACEHOLDER: &str = "Message corpus file not found!";

/// Regenerate attempts before giving up on a distinct, non-empty reply.
const MAX_GENERATION_ATTEMPTS: usize = 5;

pub struct ReplyGenerator {
    gemini: GeminiClient,
    pool: Arc<CredentialPool>,
    dedup: Arc<DedupState>,
    corpus_path: PathBuf,
    sink: LogSink,
}

impl ReplyGenerator {
    pub fn new(
        gemini: GeminiClient,
        pool: Arc<CredentialPool>,
        dedup: Arc<DedupState>,
        corpus_path: impl Into<PathBuf>,
        sink: LogSink,
    ) -> Self {
        Self {
            gemini,
            pool,
            dedup,
            corpus_path: corpus_path.into(),
            sink,
        }
    }

    /// Produce a reply for `prompt`. `Ok(None)` means "nothing to send this
    /// cycle" (rate limit, request failure, or only duplicate output); the
    /// caller simply retries on its next cycle.
    pub async fn generate(
        &self,
        prompt: &str,
        language: Language,
        use_ai: bool,
        cancel: &CancellationToken,
    ) -> Result<Option<String>> {
        if !use_ai {
            return Ok(Some(self.corpus_reply()));
        }

        if !self.pool.has_credentials() {
            self.sink
                .log(LogLevel::Error, "No Gemini API keys configured.");
            return Err(Error::NoCredentials);
        }

        let instruction = build_instruction(prompt, language);

        for _ in 0..MAX_GENERATION_ATTEMPTS {
            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }

            let key = self.pool.acquire(&self.sink, cancel).await?;

            match self.gemini.generate(&instruction, &key).await {
                Ok(text) => {
                    if self.dedup.accept_reply(&text) {
                        metrics::record_generation("ok");
                        return Ok(Some(text));
                    }
                    // Empty or same as the previous reply: regenerate
                }
                Err(Error::RateLimited(_)) => {
                    self.pool.mark_rate_limited(&key);
                    metrics::record_generation("rate_limited");
                    metrics::record_key_rate_limited();
                    self.sink.log(
                        LogLevel::Warning,
                        format!("API key {} hit rate limit (429). Key paused.", mask_key(&key)),
                    );
                    return Ok(None);
                }
                Err(err) => {
                    metrics::record_generation("error");
                    self.sink
                        .log(LogLevel::Error, format!("Generation request failed: {}", err));
                    return Ok(None);
                }
            }
        }

        metrics::record_generation("duplicate");
        self.sink.log(
            LogLevel::Warning,
            format!(
                "Gemini produced duplicate or empty output {} times in a row; skipping this cycle.",
                MAX_GENERATION_ATTEMPTS
            ),
        );
        Ok(None)
    }

    /// Uniformly random non-empty line of the corpus file. An unreadable or
    /// empty corpus degrades to a placeholder reply instead of an error.
    fn corpus_reply(&self) -> String {
        match self.read_corpus() {
            Ok(lines) => lines
                .choose(&mut rand::thread_rng())
                .cloned()
                .unwrap_or_else(|| NO_MESSAGES_PLACEHOLDER.to_string()),
            Err(_) => CORPUS_MISSING_PLACEHOLDER.to_string(),
        }
    }

    fn read_corpus(&self) -> Result<Vec<String>> {
        let contents = std::fs::read_to_string(&self.corpus_path)
            .map_err(|err| Error::CorpusUnavailable(err.to_string()))?;

        Ok(contents
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(String::from)
            .collect())
    }
}

/// Language-specific instruction wrapping the user message.
fn build_instruction(prompt: &str, language: Language) -> String {
    match language {
        Language::Indonesian => format!(
            "Balas pesan berikut dalam Bahasa Indonesia: '{}'. Buat balasan menjadi \
             satu kalimat santai dan kasual tanpa simbol seperti yang diucapkan \
             manusia sehari-hari.",
            prompt
        ),
        Language::English => format!(
            "Reply to the following message in English: '{}'. Make the reply a \
             single, casual sentence like a human would say.",
            prompt
        ),
    }
}
