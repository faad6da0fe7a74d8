// File: src/push.rs
//! Server push over Socket.IO (protocol v5 on Engine.IO v4, websocket
//! transport only). The backend emits `notes_updated` with the full task
//! list whenever anything changes; that list is forwarded as a
//! [`PushEvent::NotesUpdated`].
use crate::error::PushError;
use crate::model::Task;

use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message as WsMessage;

pub const NOTES_UPDATED: &str = "notes_updated";

const RECONNECT_BASE: Duration = Duration::from_secs(1);
const RECONNECT_MAX: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq)]
pub enum SocketPacket {
    Connect,
    Disconnect,
    Event { name: String, payload: Value },
    ConnectError(String),
    /// Acks and binary packets; we never ask for either.
    Unsupported(char),
}

#[derive(Debug, Clone, PartialEq)]
pub enum EnginePacket {
    Open(String),
    Close,
    Ping(String),
    Pong(String),
    Message(SocketPacket),
    Upgrade,
    Noop,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PushEvent {
    Connected,
    Disconnected(String),
    NotesUpdated(Vec<Task>),
}

#[derive(Deserialize)]
struct NotesPayload {
    notes: Vec<Task>,
}

fn split_type(frame: &str) -> Result<(char, &str), PushError> {
    let mut chars = frame.chars();
    let kind = chars
        .next()
        .ok_or_else(|| PushError::Protocol("empty frame".into()))?;
    Ok((kind, chars.as_str()))
}

fn decode_socket(body: &str) -> Result<SocketPacket, PushError> {
    let (kind, mut rest) = split_type(body)?;
    // Optional namespace: "/admin,..."
    if rest.starts_with('/') {
        rest = rest.split_once(',').map(|(_, r)| r).unwrap_or("");
    }
    Ok(match kind {
        '0' => SocketPacket::Connect,
        '1' => SocketPacket::Disconnect,
        '2' => {
            let json = rest.trim_start_matches(|c: char| c.is_ascii_digit());
            let mut parts = match serde_json::from_str::<Value>(json)? {
                Value::Array(parts) => parts.into_iter(),
                other => {
                    return Err(PushError::Protocol(format!(
                        "event is not an array: {}",
                        other
                    )));
                }
            };
            let name = match parts.next() {
                Some(Value::String(name)) => name,
                _ => return Err(PushError::Protocol("event without a name".into())),
            };
            SocketPacket::Event {
                name,
                payload: parts.next().unwrap_or(Value::Null),
            }
        }
        '4' => SocketPacket::ConnectError(rest.to_string()),
        other => SocketPacket::Unsupported(other),
    })
}

/// Decodes one websocket text frame.
pub fn decode_frame(frame: &str) -> Result<EnginePacket, PushError> {
    let (kind, rest) = split_type(frame)?;
    Ok(match kind {
        '0' => EnginePacket::Open(rest.to_string()),
        '1' => EnginePacket::Close,
        '2' => EnginePacket::Ping(rest.to_string()),
        '3' => EnginePacket::Pong(rest.to_string()),
        '4' => EnginePacket::Message(decode_socket(rest)?),
        '5' => EnginePacket::Upgrade,
        '6' => EnginePacket::Noop,
        other => return Err(PushError::Protocol(format!("unknown packet type {:?}", other))),
    })
}

/// Socket.IO CONNECT to the default namespace.
pub fn connect_frame() -> &'static str {
    "40"
}

pub fn pong_frame(data: &str) -> String {
    format!("3{}", data)
}

/// Maps a named event to something the client acts on. Unknown events are
/// ignored.
pub fn decode_event(name: &str, payload: Value) -> Result<Option<PushEvent>, PushError> {
    if name != NOTES_UPDATED {
        tracing::debug!(event = name, "ignoring push event");
        return Ok(None);
    }
    let payload: NotesPayload = serde_json::from_value(payload)?;
    Ok(Some(PushEvent::NotesUpdated(payload.notes)))
}

/// Reconnect delays: 1 s doubling up to 30 s, back to 1 s once a connection
/// is accepted.
#[derive(Debug, Default)]
struct Backoff {
    attempt: u32,
}

impl Backoff {
    fn next_delay(&mut self) -> Duration {
        let delay = RECONNECT_BASE
            .saturating_mul(2u32.saturating_pow(self.attempt.min(8)))
            .min(RECONNECT_MAX);
        self.attempt = self.attempt.saturating_add(1);
        delay
    }

    fn reset(&mut self) {
        self.attempt = 0;
    }
}

/// Keeps a push connection open until the receiving side goes away.
pub async fn listen(url: String, events: mpsc::Sender<PushEvent>) {
    let mut backoff = Backoff::default();
    loop {
        match run_once(&url, &events, &mut backoff).await {
            Ok(()) => tracing::info!("push connection closed"),
            Err(e) => tracing::warn!(error = %e, attempt = backoff.attempt, "push connection failed"),
        }
        if events.is_closed() {
            break;
        }
        let _ = events
            .send(PushEvent::Disconnected("connection lost".into()))
            .await;
        let delay = backoff.next_delay();
        tracing::debug!(?delay, "reconnecting push channel");
        tokio::time::sleep(delay).await;
    }
    tracing::debug!("push listener stopped");
}

async fn run_once(
    url: &str,
    events: &mpsc::Sender<PushEvent>,
    backoff: &mut Backoff,
) -> Result<(), PushError> {
    let (ws, _response) = tokio_tungstenite::connect_async(url).await?;
    tracing::info!(url, "push channel connected");
    let (mut write, mut read) = ws.split();

    while let Some(message) = read.next().await {
        let text = match message? {
            WsMessage::Text(text) => text,
            WsMessage::Close(_) => return Ok(()),
            _ => continue,
        };
        let packet = match decode_frame(text.as_str()) {
            Ok(packet) => packet,
            Err(e) => {
                tracing::warn!(error = %e, "dropping push frame");
                continue;
            }
        };
        match packet {
            EnginePacket::Open(handshake) => {
                tracing::debug!(%handshake, "engine.io open");
                write.send(WsMessage::text(connect_frame())).await?;
            }
            EnginePacket::Ping(data) => {
                write.send(WsMessage::text(pong_frame(&data))).await?;
            }
            EnginePacket::Close => return Ok(()),
            EnginePacket::Message(SocketPacket::Connect) => {
                backoff.reset();
                if events.send(PushEvent::Connected).await.is_err() {
                    return Ok(());
                }
            }
            EnginePacket::Message(SocketPacket::Disconnect) => return Ok(()),
            EnginePacket::Message(SocketPacket::ConnectError(reason)) => {
                return Err(PushError::Protocol(format!("connect refused: {}", reason)));
            }
            EnginePacket::Message(SocketPacket::Event { name, payload }) => {
                match decode_event(&name, payload) {
                    Ok(Some(event)) => {
                        if events.send(event).await.is_err() {
                            return Ok(());
                        }
                    }
                    Ok(None) => {}
                    Err(e) => tracing::warn!(error = %e, event = %name, "bad push payload"),
                }
            }
            _ => {}
        }
    }
    Ok(())
}
