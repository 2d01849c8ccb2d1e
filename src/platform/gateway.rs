//! Minimal Discord gateway session
//!
//! Only what the bot needs: identify, heartbeat, presence updates and the
//! READY / INTERACTION_CREATE dispatches. There is no resume support; a
//! dropped session is replaced by a fresh one by the caller.

use crate::{constants::DISCORD_GATEWAY_URL, error::GatewayError};
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Deserializer};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::{interval_at, Instant};
use tokio_tungstenite::{connect_async, tungstenite::Message};

const OP_DISPATCH: u8 = 0;
const OP_HEARTBEAT: u8 = 1;
const OP_IDENTIFY: u8 = 2;
const OP_PRESENCE_UPDATE: u8 = 3;
const OP_RECONNECT: u8 = 7;
const OP_INVALID_SESSION: u8 = 9;
const OP_HELLO: u8 = 10;
const OP_HEARTBEAT_ACK: u8 = 11;

/// GUILDS intent; nothing privileged is requested
const INTENTS: u64 = 1;

/// Activity type shown as "Watching ..."
const ACTIVITY_WATCHING: u8 = 3;

/// Interaction type for slash commands
pub const INTERACTION_APPLICATION_COMMAND: u8 = 2;

#[derive(Debug, Deserialize)]
struct Payload {
    op: u8,
    #[serde(default)]
    d: Value,
    s: Option<u64>,
    t: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Hello {
    heartbeat_interval: u64,
}

#[derive(Debug, Deserialize)]
struct Ready {
    user: ReadyUser,
    application: ReadyApplication,
}

#[derive(Debug, Deserialize)]
struct ReadyUser {
    username: String,
}

#[derive(Debug, Deserialize)]
struct ReadyApplication {
    #[serde(deserialize_with = "snowflake")]
    id: u64,
}

/// Identity of the bot once the session is established
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadyInfo {
    pub application_id: u64,
    pub username: String,
}

/// Slash command invocation
#[derive(Debug, Clone, Deserialize)]
pub struct Interaction {
    #[serde(deserialize_with = "snowflake")]
    pub id: u64,
    #[serde(deserialize_with = "snowflake")]
    pub application_id: u64,
    #[serde(rename = "type")]
    pub kind: u8,
    pub token: String,
    pub data: Option<CommandData>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommandData {
    pub name: String,
    #[serde(default)]
    pub options: Vec<CommandOption>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommandOption {
    pub name: String,
    #[serde(default)]
    pub value: Value,
}

impl Interaction {
    /// String value of a named option
    pub fn option_str(&self, name: &str) -> Option<&str> {
        self.data
            .as_ref()?
            .options
            .iter()
            .find(|o| o.name == name)
            .and_then(|o| o.value.as_str())
    }
}

/// Events surfaced to the bot
#[derive(Debug, Clone)]
pub enum GatewayEvent {
    Ready(ReadyInfo),
    Interaction(Interaction),
}

/// Snowflakes arrive as strings; accept numbers too
fn snowflake<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Str(String),
        Num(u64),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Num(n) => Ok(n),
        Raw::Str(s) => s.parse().map_err(serde::de::Error::custom),
    }
}

/// Presence update body (op 3 `d`, also embedded in IDENTIFY)
fn presence_body(text: &str) -> Value {
    json!({
        "since": null,
        "activities": [{ "name": text, "type": ACTIVITY_WATCHING }],
        "status": "online",
        "afk": false,
    })
}

/// Gateway connection settings shared by every session
pub struct Gateway {
    url: String,
    token: String,
    presence: watch::Receiver<Option<String>>,
    latency_ms: Arc<AtomicU64>,
}

impl Gateway {
    /// Creates a gateway client for the public Discord gateway
    ///
    /// `presence` carries the text published by the refresher; each session
    /// forwards changes and re-applies the latest value on identify.
    pub fn new(token: impl Into<String>, presence: watch::Receiver<Option<String>>) -> Self {
        Self::with_url(DISCORD_GATEWAY_URL, token, presence)
    }

    pub fn with_url(
        url: impl Into<String>,
        token: impl Into<String>,
        presence: watch::Receiver<Option<String>>,
    ) -> Self {
        Self {
            url: url.into(),
            token: token.into(),
            presence,
            latency_ms: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Shared heartbeat round-trip gauge, in milliseconds
    pub fn latency(&self) -> Arc<AtomicU64> {
        self.latency_ms.clone()
    }

    fn identify(&self, presence: Option<&str>) -> Value {
        let mut d = json!({
            "token": self.token,
            "intents": INTENTS,
            "properties": {
                "os": std::env::consts::OS,
                "browser": "htn-status-bot",
                "device": "htn-status-bot",
            },
        });
        if let Some(text) = presence {
            d["presence"] = presence_body(text);
        }
        json!({ "op": OP_IDENTIFY, "d": d })
    }

    /// Runs one session until it ends
    ///
    /// Returns `Ok(())` when `shutdown` fires (or the event receiver is gone)
    /// and an error when the session dies on its own.
    pub async fn run(
        &self,
        events: mpsc::Sender<GatewayEvent>,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<(), GatewayError> {
        let (ws, _response) = connect_async(self.url.as_str()).await?;
        let (mut write, mut read) = ws.split();

        let hello: Hello = loop {
            match read.next().await {
                Some(Ok(Message::Text(text))) => {
                    let payload: Payload = serde_json::from_str(&text)?;
                    if payload.op != OP_HELLO {
                        return Err(GatewayError::Protocol(format!(
                            "expected HELLO, got op {}",
                            payload.op
                        )));
                    }
                    break serde_json::from_value(payload.d)?;
                }
                Some(Ok(Message::Close(frame))) => {
                    return Err(GatewayError::Closed(format!("{:?}", frame)))
                }
                Some(Ok(_)) => continue,
                Some(Err(e)) => return Err(e.into()),
                None => return Err(GatewayError::Closed("before HELLO".to_string())),
            }
        };

        let heartbeat_every = Duration::from_millis(hello.heartbeat_interval);
        tracing::debug!(heartbeat_ms = hello.heartbeat_interval, "Gateway HELLO");

        let mut presence = self.presence.clone();
        let initial = presence.borrow_and_update().clone();
        write
            .send(Message::Text(self.identify(initial.as_deref()).to_string()))
            .await?;

        let mut heartbeat = interval_at(Instant::now() + heartbeat_every, heartbeat_every);
        let mut seq: Option<u64> = None;
        let mut acked = true;
        let mut sent_at = Instant::now();
        let mut presence_open = true;

        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    tracing::debug!("Closing gateway session");
                    let _ = write.send(Message::Close(None)).await;
                    return Ok(());
                }
                _ = heartbeat.tick() => {
                    if !acked {
                        return Err(GatewayError::Zombie);
                    }
                    write.send(heartbeat_message(seq)).await?;
                    acked = false;
                    sent_at = Instant::now();
                }
                changed = presence.changed(), if presence_open => {
                    if changed.is_err() {
                        presence_open = false;
                        continue;
                    }
                    let text = presence.borrow_and_update().clone();
                    if let Some(text) = text {
                        let update = json!({ "op": OP_PRESENCE_UPDATE, "d": presence_body(&text) });
                        write.send(Message::Text(update.to_string())).await?;
                        tracing::debug!(presence = %text, "Presence updated");
                    }
                }
                message = read.next() => {
                    let text = match message {
                        Some(Ok(Message::Text(text))) => text,
                        Some(Ok(Message::Close(frame))) => {
                            return Err(GatewayError::Closed(format!("{:?}", frame)));
                        }
                        Some(Ok(_)) => continue,
                        Some(Err(e)) => return Err(e.into()),
                        None => return Err(GatewayError::Closed("stream ended".to_string())),
                    };

                    let payload: Payload = serde_json::from_str(&text)?;
                    if let Some(s) = payload.s {
                        seq = Some(s);
                    }

                    match payload.op {
                        OP_DISPATCH => {
                            let Some(event) = dispatch_event(payload.t.as_deref(), payload.d) else {
                                continue;
                            };
                            if events.send(event).await.is_err() {
                                return Ok(());
                            }
                        }
                        OP_HEARTBEAT => {
                            write.send(heartbeat_message(seq)).await?;
                        }
                        OP_HEARTBEAT_ACK => {
                            acked = true;
                            let rtt = sent_at.elapsed().as_millis() as u64;
                            self.latency_ms.store(rtt, Ordering::Relaxed);
                        }
                        OP_RECONNECT => return Err(GatewayError::ReconnectRequested),
                        OP_INVALID_SESSION => return Err(GatewayError::InvalidSession),
                        op => tracing::trace!(op, "Ignoring gateway opcode"),
                    }
                }
            }
        }
    }
}

fn heartbeat_message(seq: Option<u64>) -> Message {
    Message::Text(json!({ "op": OP_HEARTBEAT, "d": seq }).to_string())
}

/// Decodes the dispatches the bot cares about
fn dispatch_event(name: Option<&str>, data: Value) -> Option<GatewayEvent> {
    match name {
        Some("READY") => match serde_json::from_value::<Ready>(data) {
            Ok(ready) => Some(GatewayEvent::Ready(ReadyInfo {
                application_id: ready.application.id,
                username: ready.user.username,
            })),
            Err(e) => {
                tracing::warn!(error = %e, "Undecodable READY payload");
                None
            }
        },
        Some("INTERACTION_CREATE") => match serde_json::from_value::<Interaction>(data) {
            Ok(interaction) => Some(GatewayEvent::Interaction(interaction)),
            Err(e) => {
                tracing::warn!(error = %e, "Undecodable interaction payload");
                None
            }
        },
        _ => None,
    }
}
