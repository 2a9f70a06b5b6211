//! # Realtime channel — one push connection per app session
//!
//! A single WebSocket connection established at login and torn down at
//! logout, used to push walk transitions between the two counterparts with
//! lower latency than polling. Frames are JSON objects of the form
//! `{"event": <name>, "data": <payload>}`; the event names are the external
//! contract shared with the deployed apps:
//!
//! | Event | Payload | Direction |
//! |-------|---------|-----------|
//! | `socket id` | string | server → client, on connect |
//! | `walk status` | bool | User → all Safewalkers (request availability) |
//! | `walker walk status` | `{userId, status}` | Safewalker → one User |
//! | `user walk status` | `{walkerId, status}` | User → one Safewalker |
//! | `walker location` | `{lat, lng}` | Safewalker → one User |
//! | `connection lost` | bool | either side |
//!
//! Status codes on the wire: accept = 1, complete = 2, deny = -1,
//! cancel = -2 ([`StatusSignal`]).
//!
//! Delivery is at-most-once, best-effort: no acks, no retransmit. A dropped
//! event is recovered only by the pending-request timeout or by boot
//! reconciliation.
//!
//! ## Subscriptions
//!
//! [`RealtimeChannel::subscribe`] returns a [`Subscription`] guard; dropping
//! it detaches the listener. A consumer that re-subscribes on every mount
//! therefore never accumulates stale listeners — removal is tied to scope
//! exit, not to a cleanup call the consumer has to remember.
//!
//! ## Connection loss
//!
//! When the read side errors or the server closes, the reader publishes a
//! `connection lost` event locally before exiting, so coordinators can run
//! their cancellation fallback.

use std::sync::{Arc, Mutex};

use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;

use store::LatLng;

use crate::error::ClientError;

/// Walk transition code carried by the status events.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "i8", into = "i8")]
pub enum StatusSignal {
    Accept,
    Complete,
    Deny,
    Cancel,
}

impl StatusSignal {
    pub fn code(&self) -> i8 {
        match self {
            StatusSignal::Accept => 1,
            StatusSignal::Complete => 2,
            StatusSignal::Deny => -1,
            StatusSignal::Cancel => -2,
        }
    }
}

impl TryFrom<i8> for StatusSignal {
    type Error = String;

    fn try_from(code: i8) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(StatusSignal::Accept),
            2 => Ok(StatusSignal::Complete),
            -1 => Ok(StatusSignal::Deny),
            -2 => Ok(StatusSignal::Cancel),
            other => Err(format!("unknown status signal {other}")),
        }
    }
}

impl From<StatusSignal> for i8 {
    fn from(signal: StatusSignal) -> i8 {
        signal.code()
    }
}

/// One realtime frame, in either direction.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum Event {
    /// Socket identifier the server assigned to this connection.
    #[serde(rename = "socket id")]
    SocketId(String),
    /// A pending request appeared (`true`) or went away (`false`).
    #[serde(rename = "walk status")]
    WalkStatus(bool),
    /// Safewalker → User transition, keyed by the User's socket id.
    #[serde(rename = "walker walk status")]
    WalkerWalkStatus {
        #[serde(rename = "userId")]
        user_id: String,
        status: StatusSignal,
    },
    /// User → Safewalker transition, keyed by the Safewalker's socket id.
    #[serde(rename = "user walk status")]
    UserWalkStatus {
        #[serde(rename = "walkerId")]
        walker_id: String,
        status: StatusSignal,
    },
    /// Periodic position push during an active walk.
    #[serde(rename = "walker location")]
    WalkerLocation(LatLng),
    /// The counterpart's connection dropped.
    #[serde(rename = "connection lost")]
    ConnectionLost(bool),
}

/// Handle for emitting events without holding the channel itself. Sends
/// never block: frames queue on the writer task.
#[derive(Clone, Debug)]
pub struct EventSender {
    tx: mpsc::UnboundedSender<Event>,
}

impl EventSender {
    pub(crate) fn new(tx: mpsc::UnboundedSender<Event>) -> Self {
        Self { tx }
    }

    pub fn emit(&self, event: Event) {
        if self.tx.send(event).is_err() {
            tracing::warn!("realtime channel closed, dropping outbound event");
        }
    }
}

/// Listener guard returned by [`RealtimeChannel::subscribe`]. Dropping it
/// detaches the listener.
pub struct Subscription {
    rx: broadcast::Receiver<Event>,
}

impl Subscription {
    /// Wait for the next event. `None` once the channel is gone. A lagged
    /// listener skips ahead rather than erroring.
    pub async fn next(&mut self) -> Option<Event> {
        loop {
            match self.rx.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "realtime subscriber lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

/// The process-wide push connection.
pub struct RealtimeChannel {
    outbound: mpsc::UnboundedSender<Event>,
    inbound: broadcast::Sender<Event>,
    socket_id: Arc<Mutex<Option<String>>>,
    reader: JoinHandle<()>,
    writer: JoinHandle<()>,
}

impl RealtimeChannel {
    /// Open the connection and spawn the reader/writer tasks.
    pub async fn connect(url: &str) -> Result<Self, ClientError> {
        let (ws, _) = tokio_tungstenite::connect_async(url).await?;
        tracing::info!(url, "realtime channel connected");
        let (mut sink, mut stream) = ws.split();

        let (outbound, mut outbound_rx) = mpsc::unbounded_channel::<Event>();
        let (inbound, _) = broadcast::channel(64);
        let socket_id = Arc::new(Mutex::new(None));

        let writer = tokio::spawn(async move {
            while let Some(event) = outbound_rx.recv().await {
                let json = match serde_json::to_string(&event) {
                    Ok(json) => json,
                    Err(err) => {
                        tracing::error!(%err, "failed to serialize outbound event");
                        continue;
                    }
                };
                if sink.send(Message::Text(json)).await.is_err() {
                    tracing::debug!("websocket send failed, writer exiting");
                    break;
                }
            }
        });

        let fanout = inbound.clone();
        let assigned = socket_id.clone();
        let reader = tokio::spawn(async move {
            while let Some(result) = stream.next().await {
                let text = match result {
                    Ok(Message::Text(text)) => text,
                    Ok(Message::Close(_)) => {
                        tracing::info!("server closed realtime channel");
                        break;
                    }
                    Ok(_) => continue,
                    Err(err) => {
                        tracing::warn!(%err, "realtime channel read error");
                        break;
                    }
                };
                let event: Event = match serde_json::from_str(&text) {
                    Ok(event) => event,
                    Err(err) => {
                        tracing::warn!(%err, "unparseable realtime frame, skipping");
                        continue;
                    }
                };
                if let Event::SocketId(id) = &event {
                    *assigned.lock().unwrap() = Some(id.clone());
                }
                // No listeners is fine; events are best-effort.
                let _ = fanout.send(event);
            }
            // Surface the loss locally so coordinators can run their
            // cancellation fallback.
            let _ = fanout.send(Event::ConnectionLost(true));
        });

        Ok(Self {
            outbound,
            inbound,
            socket_id,
            reader,
            writer,
        })
    }

    /// The socket identifier the server assigned, once received.
    pub fn socket_id(&self) -> Option<String> {
        self.socket_id.lock().unwrap().clone()
    }

    pub fn sender(&self) -> EventSender {
        EventSender::new(self.outbound.clone())
    }

    pub fn subscribe(&self) -> Subscription {
        Subscription {
            rx: self.inbound.subscribe(),
        }
    }

    /// Tear the connection down (logout). Outstanding frames are dropped.
    pub fn close(self) {
        self.reader.abort();
        self.writer.abort();
    }
}
