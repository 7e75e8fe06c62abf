//! Discord REST client: identity lookup, channel polling, message send and
//! delete, and best-effort channel/guild display names.
//!
//! Uses the raw user token in the `Authorization` header, the way the
//! first-party client does. Lookup calls carry a 10 second timeout.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::LOOKUP_TIMEOUT_SECS;
use crate::error::{Error, Result};

const DISCORD_API_URL: &str = "https://discord.com/api/v9";

/// Placeholders when channel metadata cannot be resolved.
pub const SERVER_NAME_PLACEHOLDER: &str = "Access Error";
pub const CHANNEL_NAME_PLACEHOLDER: &str = "Check Token/ID";

/// The acting account, resolved from `/users/@me`.
#[derive(Debug, Clone, Deserialize)]
pub struct BotIdentity {
    pub id: String,
    pub username: String,
    #[serde(default = "default_discriminator")]
    pub discriminator: String,
}

fn default_discriminator() -> String {
    "0000".to_string()
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessageAuthor {
    #[serde(default)]
    pub id: String,
}

/// A channel message as returned by the listing endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ChannelMessage {
    pub id: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub author: MessageAuthor,
}

#[derive(Debug, Serialize)]
struct SendMessagePayload<'a> {
    content: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    message_reference: Option<MessageReference<'a>>,
}

#[derive(Debug, Serialize)]
struct MessageReference<'a> {
    message_id: &'a str,
}

#[derive(Debug, Deserialize)]
struct SentMessage {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ChannelInfo {
    name: Option<String>,
    guild_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GuildInfo {
    name: Option<String>,
}

/// Discord REST client.
#[derive(Debug, Clone)]
pub struct DiscordClient {
    http: Client,
    token: String,
    base_url: String,
}

impl DiscordClient {
    /// Create a client with a user token.
    pub fn new<S: Into<String>>(token: S) -> Result<Self> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(Error::InvalidCredential("token is empty".to_string()));
        }

        let http = Client::builder()
            .user_agent("discord_responder/0.1.0")
            .build()
            .map_err(|e| Error::InvalidArgument(format!("HTTP client error: {}", e)))?;

        Ok(Self {
            http,
            token,
            base_url: DISCORD_API_URL.to_string(),
        })
    }

    /// Create a client from the DISCORD_TOKEN environment variable.
    pub fn from_env() -> Result<Self> {
        let token = std::env::var("DISCORD_TOKEN")
            .map_err(|_| Error::InvalidCredential("DISCORD_TOKEN not set".to_string()))?;
        Self::new(token)
    }

    /// Point the client at a different API root (tests use a mock server).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Last characters of the token, for log lines.
    pub fn token_hint(&self) -> String {
        let tail: String = self
            .token
            .chars()
            .rev()
            .take(4)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();
        format!("...{}", tail)
    }

    /// Resolve the acting identity. Any failure here means the token is not
    /// usable, which is fatal for a session.
    pub async fn current_user(&self) -> Result<BotIdentity> {
        let response = self
            .http
            .get(format!("{}/users/@me", self.base_url))
            .header("Authorization", &self.token)
            .timeout(Duration::from_secs(LOOKUP_TIMEOUT_SECS))
            .send()
            .await
            .map_err(|e| Error::InvalidCredential(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::InvalidCredential(format!(
                "identity lookup returned {}",
                status
            )));
        }

        response
            .json::<BotIdentity>()
            .await
            .map_err(|e| Error::InvalidCredential(e.to_string()))
    }

    /// Fetch the single most recent message of a channel.
    pub async fn latest_message(&self, channel_id: &str) -> Result<Option<ChannelMessage>> {
        let response = self
            .http
            .get(format!(
                "{}/channels/{}/messages",
                self.base_url, channel_id
            ))
            .query(&[("limit", "1")])
            .header("Authorization", &self.token)
            .timeout(Duration::from_secs(LOOKUP_TIMEOUT_SECS))
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(Error::HttpError {
                status: status.as_u16(),
                message: text,
            });
        }

        let messages: Vec<ChannelMessage> = serde_json::from_str(&text)?;
        Ok(messages.into_iter().next())
    }

    /// Post a message, optionally threaded onto `reply_to`. Returns the
    /// assigned message id.
    pub async fn send_message(
        &self,
        channel_id: &str,
        content: &str,
        reply_to: Option<&str>,
    ) -> Result<String> {
        let payload = SendMessagePayload {
            content,
            message_reference: reply_to.map(|message_id| MessageReference { message_id }),
        };

        let response = self
            .http
            .post(format!(
                "{}/channels/{}/messages",
                self.base_url, channel_id
            ))
            .header("Authorization", &self.token)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(Error::HttpError {
                status: status.as_u16(),
                message: text,
            });
        }

        let sent: SentMessage = serde_json::from_str(&text)?;
        Ok(sent.id)
    }

    /// Delete a message. Discord answers 204 on success; anything else is a
    /// failure.
    pub async fn delete_message(&self, channel_id: &str, message_id: &str) -> Result<()> {
        let response = self
            .http
            .delete(format!(
                "{}/channels/{}/messages/{}",
                self.base_url, channel_id, message_id
            ))
            .header("Authorization", &self.token)
            .send()
            .await?;

        let status = response.status();
        if status.as_u16() == 204 {
            return Ok(());
        }

        let text = response.text().await.unwrap_or_default();
        Err(Error::HttpError {
            status: status.as_u16(),
            message: text,
        })
    }

    /// Best-effort (server name, channel name) for display. Failures yield
    /// placeholder strings, never errors.
    pub async fn channel_info(&self, channel_id: &str) -> (String, String) {
        match self.fetch_channel_info(channel_id).await {
            Ok(names) => names,
            Err(_) => (
                SERVER_NAME_PLACEHOLDER.to_string(),
                CHANNEL_NAME_PLACEHOLDER.to_string(),
            ),
        }
    }

    async fn fetch_channel_info(&self, channel_id: &str) -> Result<(String, String)> {
        let response = self
            .http
            .get(format!("{}/channels/{}", self.base_url, channel_id))
            .header("Authorization", &self.token)
            .timeout(Duration::from_secs(LOOKUP_TIMEOUT_SECS))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::HttpError {
                status: status.as_u16(),
                message: String::new(),
            });
        }

        let channel: ChannelInfo = response.json::<ChannelInfo>().await.map_err(Error::from)?;
        let channel_name = channel
            .name
            .unwrap_or_else(|| "Unknown Channel".to_string());

        // DM channels have no guild
        let Some(guild_id) = channel.guild_id else {
            return Ok(("Direct Message".to_string(), channel_name));
        };

        let response = self
            .http
            .get(format!("{}/guilds/{}", self.base_url, guild_id))
            .header("Authorization", &self.token)
            .timeout(Duration::from_secs(LOOKUP_TIMEOUT_SECS))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Error::HttpError {
                status: response.status().as_u16(),
                message: String::new(),
            });
        }

        let guild: GuildInfo = response.json::<GuildInfo>().await.map_err(Error::from)?;
        let server_name = guild.name.unwrap_or_else(|| "Unknown Server".to_string());

        Ok((server_name, channel_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    fn client(server: &MockServer) -> DiscordClient {
        DiscordClient::new("test-token")
            .expect("client")
            .with_base_url(server.base_url())
    }

    #[test]
    fn test_new_rejects_empty_token() {
        let err = DiscordClient::new("   ").unwrap_err();
        assert!(matches!(err, Error::InvalidCredential(_)));
    }

    #[test]
    fn test_token_hint_shows_tail_only() {
        let client = DiscordClient::new("secret-token-abcd").expect("client");
        assert_eq!(client.token_hint(), "...abcd");
    }

    #[tokio::test]
    async fn current_user_parses_identity() {
        let server = MockServer::start_async().await;

        server.mock(|when, then| {
            when.method(GET)
                .path("/users/@me")
                .header("Authorization", "test-token");
            then.status(200).json_body(json!({
                "id": "42",
                "username": "responder",
                "discriminator": "1234"
            }));
        });

        let identity = client(&server).current_user().await.expect("identity");
        assert_eq!(identity.id, "42");
        assert_eq!(identity.username, "responder");
        assert_eq!(identity.discriminator, "1234");
    }

    #[tokio::test]
    async fn current_user_401_is_invalid_credential() {
        let server = MockServer::start_async().await;

        server.mock(|when, then| {
            when.method(GET).path("/users/@me");
            then.status(401).json_body(json!({"message": "401: Unauthorized"}));
        });

        let err = client(&server).current_user().await.unwrap_err();
        assert!(matches!(err, Error::InvalidCredential(_)));
        assert!(err.to_string().contains("401"));
    }

    #[tokio::test]
    async fn latest_message_returns_most_recent() {
        let server = MockServer::start_async().await;

        server.mock(|when, then| {
            when.method(GET)
                .path("/channels/777/messages")
                .query_param("limit", "1");
            then.status(200).json_body(json!([
                { "id": "900", "content": "newest", "author": { "id": "5" } }
            ]));
        });

        let message = client(&server)
            .latest_message("777")
            .await
            .expect("request ok")
            .expect("one message");

        assert_eq!(message.id, "900");
        assert_eq!(message.content, "newest");
        assert_eq!(message.author.id, "5");
    }

    #[tokio::test]
    async fn latest_message_empty_channel_is_none() {
        let server = MockServer::start_async().await;

        server.mock(|when, then| {
            when.method(GET).path("/channels/777/messages");
            then.status(200).json_body(json!([]));
        });

        let message = client(&server).latest_message("777").await.expect("ok");
        assert!(message.is_none());
    }

    #[tokio::test]
    async fn latest_message_forbidden_is_http_error() {
        let server = MockServer::start_async().await;

        server.mock(|when, then| {
            when.method(GET).path("/channels/777/messages");
            then.status(403).body("Missing Access");
        });

        let err = client(&server).latest_message("777").await.unwrap_err();
        match err {
            Error::HttpError { status, message } => {
                assert_eq!(status, 403);
                assert!(message.contains("Missing Access"));
            }
            other => panic!("expected HttpError, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn send_message_posts_content_and_returns_id() {
        let server = MockServer::start_async().await;

        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/channels/777/messages")
                .header("Authorization", "test-token")
                .json_body(json!({ "content": "hi" }));
            then.status(200).json_body(json!({ "id": "901" }));
        });

        let id = client(&server)
            .send_message("777", "hi", None)
            .await
            .expect("sent");

        mock.assert();
        assert_eq!(id, "901");
    }

    #[tokio::test]
    async fn send_message_includes_reply_reference() {
        let server = MockServer::start_async().await;

        let mock = server.mock(|when, then| {
            when.method(POST).path("/channels/777/messages").json_body(json!({
                "content": "hi",
                "message_reference": { "message_id": "900" }
            }));
            then.status(200).json_body(json!({ "id": "902" }));
        });

        let id = client(&server)
            .send_message("777", "hi", Some("900"))
            .await
            .expect("sent");

        mock.assert();
        assert_eq!(id, "902");
    }

    #[tokio::test]
    async fn delete_message_accepts_204_only() {
        let server = MockServer::start_async().await;

        server.mock(|when, then| {
            when.method(DELETE).path("/channels/777/messages/900");
            then.status(204);
        });
        server.mock(|when, then| {
            when.method(DELETE).path("/channels/777/messages/901");
            then.status(403).body("Missing Access");
        });

        let discord = client(&server);
        discord.delete_message("777", "900").await.expect("deleted");

        let err = discord.delete_message("777", "901").await.unwrap_err();
        assert!(matches!(err, Error::HttpError { status: 403, .. }));
    }

    #[tokio::test]
    async fn channel_info_resolves_guild_and_channel_names() {
        let server = MockServer::start_async().await;

        server.mock(|when, then| {
            when.method(GET).path("/channels/777");
            then.status(200)
                .json_body(json!({ "name": "general", "guild_id": "g1" }));
        });
        server.mock(|when, then| {
            when.method(GET).path("/guilds/g1");
            then.status(200).json_body(json!({ "name": "My Server" }));
        });

        let (server_name, channel_name) = client(&server).channel_info("777").await;
        assert_eq!(server_name, "My Server");
        assert_eq!(channel_name, "general");
    }

    #[tokio::test]
    async fn channel_info_dm_has_no_guild() {
        let server = MockServer::start_async().await;

        server.mock(|when, then| {
            when.method(GET).path("/channels/888");
            then.status(200).json_body(json!({ "name": null }));
        });

        let (server_name, channel_name) = client(&server).channel_info("888").await;
        assert_eq!(server_name, "Direct Message");
        assert_eq!(channel_name, "Unknown Channel");
    }

    #[tokio::test]
    async fn channel_info_error_yields_placeholders() {
        let server = MockServer::start_async().await;

        server.mock(|when, then| {
            when.method(GET).path("/channels/999");
            then.status(403);
        });

        let (server_name, channel_name) = client(&server).channel_info("999").await;
        assert_eq!(server_name, SERVER_NAME_PLACEHOLDER);
        assert_eq!(channel_name, CHANNEL_NAME_PLACEHOLDER);
    }
}
