//! Configuration for the Discord token, Gemini keys, and reply behavior
//!
//! Loads configuration from config.yml file with environment overrides

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::Result;

/// Default constants (fallback if config.yml not found)
pub const DEFAULT_CONFIG_FILE: &str = "config.yml";
pub const DEFAULT_CORPUS_FILE: &str = "messages.txt";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";

/// Seconds between reads of the monitored channel.
pub const DEFAULT_READ_DELAY_SECS: u64 = 10;
/// Seconds between loop iterations (and between broadcast sends).
pub const DEFAULT_DELAY_INTERVAL_SECS: u64 = 30;
/// Backoff after a recoverable error inside the monitor loop.
pub const ERROR_BACKOFF_SECS: u64 = 60;
/// Cooldown once every Gemini key has hit a rate limit.
pub const KEY_COOLDOWN_SECS: u64 = 86_400;
/// Timeout for Discord identity/channel/message lookups.
pub const LOOKUP_TIMEOUT_SECS: u64 = 10;
/// Timeout for Gemini generation calls.
pub const GENERATION_TIMEOUT_SECS: u64 = 20;

/// Language of the generated replies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Language {
    #[default]
    English,
    Indonesian,
}

impl Language {
    /// Parse a language tag; anything other than "id" means English.
    pub fn from_tag(tag: &str) -> Self {
        match tag.trim().to_lowercase().as_str() {
            "id" => Language::Indonesian,
            _ => Language::English,
        }
    }
}

/// Reply behavior for every monitored channel.
#[derive(Debug, Clone)]
pub struct ReplySettings {
    /// Generate replies with Gemini; false switches to corpus broadcasting.
    pub use_ai: bool,
    pub language: Language,
    /// Thread replies onto the triggering message.
    pub use_reply: bool,
    pub read_delay: u64,
    pub delay_interval: u64,
    /// Delete own messages after this many seconds; None keeps them.
    pub delete_after: Option<u64>,
    pub delete_immediately: bool,
    pub corpus_file: PathBuf,
}

impl Default for ReplySettings {
    fn default() -> Self {
        Self {
            use_ai: true,
            language: Language::English,
            use_reply: true,
            read_delay: DEFAULT_READ_DELAY_SECS,
            delay_interval: DEFAULT_DELAY_INTERVAL_SECS,
            delete_after: None,
            delete_immediately: false,
            corpus_file: PathBuf::from(DEFAULT_CORPUS_FILE),
        }
    }
}

/// Resolved configuration.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub token: String,
    pub api_keys: Vec<String>,
    pub model: String,
    pub channels: Vec<String>,
    pub reply: ReplySettings,
}

/// YAML config structures
#[derive(Debug, Deserialize)]
struct YamlConfig {
    discord: Option<DiscordSection>,
    gemini: Option<GeminiSection>,
    reply: Option<ReplySection>,
    channels: Option<Vec<serde_yaml::Value>>,
}

#[derive(Debug, Deserialize)]
struct DiscordSection {
    token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiSection {
    api_keys: Option<Vec<String>>,
    model: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ReplySection {
    use_ai: Option<bool>,
    language: Option<String>,
    use_reply: Option<bool>,
    read_delay: Option<u64>,
    delay_interval: Option<u64>,
    delete_after: Option<u64>,
    delete_immediately: Option<bool>,
    corpus_file: Option<String>,
}

/// Channel ids appear in YAML both quoted and bare; accept either.
fn value_to_string(value: &serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::String(s) => Some(s.clone()),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

impl Config {
    /// Load config.yml from the working directory, falling back to defaults.
    /// Environment overrides are applied either way.
    pub fn new() -> Self {
        let mut config = if Path::new(DEFAULT_CONFIG_FILE).exists() {
            Self::load(DEFAULT_CONFIG_FILE).unwrap_or_default()
        } else {
            Self::default()
        };
        config.apply_env_overrides();
        config
    }

    /// Load configuration from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml_str(&contents)
    }

    /// Parse configuration from a YAML string.
    pub fn from_yaml_str(contents: &str) -> Result<Self> {
        let yaml: YamlConfig = serde_yaml::from_str(contents)?;
        let mut config = Config::default();

        if let Some(discord) = yaml.discord {
            if let Some(token) = discord.token {
                config.token = token;
            }
        }

        if let Some(gemini) = yaml.gemini {
            if let Some(keys) = gemini.api_keys {
                config.api_keys = keys;
            }
            if let Some(model) = gemini.model {
                config.model = model;
            }
        }

        if let Some(reply) = yaml.reply {
            if let Some(use_ai) = reply.use_ai {
                config.reply.use_ai = use_ai;
            }
            if let Some(language) = reply.language {
                config.reply.language = Language::from_tag(&language);
            }
            if let Some(use_reply) = reply.use_reply {
                config.reply.use_reply = use_reply;
            }
            if let Some(read_delay) = reply.read_delay {
                config.reply.read_delay = read_delay;
            }
            if let Some(delay_interval) = reply.delay_interval {
                config.reply.delay_interval = delay_interval;
            }
            config.reply.delete_after = reply.delete_after;
            if let Some(delete_immediately) = reply.delete_immediately {
                config.reply.delete_immediately = delete_immediately;
            }
            if let Some(corpus_file) = reply.corpus_file {
                config.reply.corpus_file = PathBuf::from(corpus_file);
            }
        }

        if let Some(channels) = yaml.channels {
            config.channels = channels.iter().filter_map(value_to_string).collect();
        }

        Ok(config)
    }

    /// DISCORD_TOKEN and GEMINI_API_KEYS (comma separated) beat config.yml.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(token) = std::env::var("DISCORD_TOKEN") {
            if !token.trim().is_empty() {
                self.token = token;
            }
        }
        if let Ok(keys) = std::env::var("GEMINI_API_KEYS") {
            let keys: Vec<String> = keys
                .split(',')
                .map(str::trim)
                .filter(|k| !k.is_empty())
                .map(String::from)
                .collect();
            if !keys.is_empty() {
                self.api_keys = keys;
            }
        }
    }

    /// Gemini model, falling back to the default.
    pub fn model(&self) -> &str {
        if self.model.is_empty() {
            DEFAULT_GEMINI_MODEL
        } else {
            &self.model
        }
    }
}
