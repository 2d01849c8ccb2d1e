//! Discord REST client
//!
//! Covers the handful of endpoints the bot uses: channel rename, slash
//! command registration and interaction responses.

use crate::{
    commands::Reply,
    constants::{DISCORD_API_URL, DISCORD_USER_AGENT},
    error::PlatformError,
    types::ChannelId,
};
use reqwest::{header, Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

/// Interaction callback types
const CALLBACK_CHANNEL_MESSAGE: u8 = 4;
const CALLBACK_DEFERRED_CHANNEL_MESSAGE: u8 = 5;

/// Message flag hiding a response from everyone but the invoking user
const FLAG_EPHEMERAL: u64 = 1 << 6;

#[derive(Debug, Deserialize)]
struct RateLimitBody {
    retry_after: f64,
}

/// Authenticated Discord REST client
#[derive(Clone)]
pub struct DiscordRest {
    client: Client,
    base_url: String,
    token: String,
}

impl DiscordRest {
    /// Creates a client for the public Discord API
    pub fn new(client: Client, token: impl Into<String>) -> Self {
        Self::with_base_url(client, DISCORD_API_URL, token)
    }

    /// Creates a client against another API base URL
    pub fn with_base_url(
        client: Client,
        base_url: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header(header::AUTHORIZATION, format!("Bot {}", self.token))
            .header(header::USER_AGENT, DISCORD_USER_AGENT)
    }

    /// Maps error statuses onto [`PlatformError`]
    async fn check(response: Response) -> Result<Response, PlatformError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        match status {
            StatusCode::TOO_MANY_REQUESTS => {
                let retry_after = response
                    .json::<RateLimitBody>()
                    .await
                    .map(|body| Duration::from_secs_f64(body.retry_after.max(0.0)))
                    .unwrap_or_default();
                Err(PlatformError::RateLimited { retry_after })
            }
            StatusCode::FORBIDDEN => Err(PlatformError::Forbidden),
            StatusCode::NOT_FOUND => Err(PlatformError::NotFound),
            _ => Err(PlatformError::Api {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            }),
        }
    }

    /// Renames a guild channel
    pub async fn rename_channel(
        &self,
        channel: ChannelId,
        name: &str,
    ) -> Result<(), PlatformError> {
        let url = format!("{}/channels/{}", self.base_url, channel);
        let response = self
            .authorized(self.client.patch(&url))
            .json(&json!({ "name": name }))
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    /// Replaces the application's slash commands
    ///
    /// Registers globally, or for a single guild when `guild_id` is set.
    pub async fn register_commands(
        &self,
        application_id: u64,
        guild_id: Option<u64>,
        commands: &Value,
    ) -> Result<(), PlatformError> {
        let url = match guild_id {
            Some(guild) => format!(
                "{}/applications/{}/guilds/{}/commands",
                self.base_url, application_id, guild
            ),
            None => format!("{}/applications/{}/commands", self.base_url, application_id),
        };
        let response = self
            .authorized(self.client.put(&url))
            .json(commands)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    /// Answers an interaction immediately
    pub async fn respond(
        &self,
        interaction_id: u64,
        token: &str,
        reply: &Reply,
    ) -> Result<(), PlatformError> {
        self.callback(
            interaction_id,
            token,
            json!({ "type": CALLBACK_CHANNEL_MESSAGE, "data": message_payload(reply) }),
        )
        .await
    }

    /// Acknowledges an interaction whose answer will follow
    pub async fn defer(
        &self,
        interaction_id: u64,
        token: &str,
        ephemeral: bool,
    ) -> Result<(), PlatformError> {
        let flags = if ephemeral { FLAG_EPHEMERAL } else { 0 };
        self.callback(
            interaction_id,
            token,
            json!({ "type": CALLBACK_DEFERRED_CHANNEL_MESSAGE, "data": { "flags": flags } }),
        )
        .await
    }

    async fn callback(
        &self,
        interaction_id: u64,
        token: &str,
        body: Value,
    ) -> Result<(), PlatformError> {
        let url = format!(
            "{}/interactions/{}/{}/callback",
            self.base_url, interaction_id, token
        );
        let response = self
            .authorized(self.client.post(&url))
            .json(&body)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    /// Fills in the answer of a deferred interaction
    pub async fn edit_original(
        &self,
        application_id: u64,
        token: &str,
        reply: &Reply,
    ) -> Result<(), PlatformError> {
        let url = format!(
            "{}/webhooks/{}/{}/messages/@original",
            self.base_url, application_id, token
        );
        // visibility is fixed by the deferral; edits may not change it
        let mut body = message_payload(reply);
        if let Some(fields) = body.as_object_mut() {
            fields.remove("flags");
        }
        let response = self
            .authorized(self.client.patch(&url))
            .json(&body)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }
}

/// Discord message body for a command reply
pub fn message_payload(reply: &Reply) -> Value {
    let mut payload = json!({
        "content": reply.content,
        "embeds": reply.embed.iter().collect::<Vec<_>>(),
    });
    if reply.ephemeral {
        payload["flags"] = json!(FLAG_EPHEMERAL);
    }
    payload
}
