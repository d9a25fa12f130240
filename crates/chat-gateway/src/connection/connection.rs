//! Individual WebSocket connection
//!
//! Identity is fixed at construction: a connection only exists once its
//! credential has been verified.

use crate::events::GatewayEventType;
use crate::protocol::{CloseCode, GatewayMessage};
use chat_core::{Profile, Snowflake};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, Notify};

use super::GroupKey;

/// Why a dispatch did not reach a connection's outbound queue
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DeliveryError {
    #[error("outbound queue full")]
    Full,
    #[error("connection closed")]
    Closed,
}

/// A single authenticated WebSocket connection
pub struct Connection {
    session_id: String,

    user: Profile,

    /// Channel to the socket writer
    sender: mpsc::Sender<GatewayMessage>,

    /// Last dispatch sequence; held while enqueuing so `s` follows queue order
    sequence: Mutex<u64>,

    last_heartbeat: Mutex<Instant>,

    /// Groups this connection belongs to, mirrored in the manager's index
    groups: Mutex<HashSet<GroupKey>>,

    /// Set once when the server decides to drop the connection
    eviction: Mutex<Option<CloseCode>>,
    evicted: Notify,

    created_at: Instant,
}

impl Connection {
    pub fn new(
        session_id: String,
        user: Profile,
        sender: mpsc::Sender<GatewayMessage>,
    ) -> Arc<Self> {
        Arc::new(Self {
            session_id,
            user,
            sender,
            sequence: Mutex::new(0),
            last_heartbeat: Mutex::new(Instant::now()),
            groups: Mutex::new(HashSet::new()),
            eviction: Mutex::new(None),
            evicted: Notify::new(),
            created_at: Instant::now(),
        })
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn user(&self) -> &Profile {
        &self.user
    }

    pub fn user_id(&self) -> Snowflake {
        self.user.id
    }

    pub fn current_sequence(&self) -> u64 {
        *self.sequence.lock()
    }

    /// Enqueue a dispatch without waiting. A full queue is reported, not awaited.
    pub fn dispatch(&self, event: GatewayEventType, data: Value) -> Result<u64, DeliveryError> {
        let mut sequence = self.sequence.lock();
        let next = *sequence + 1;
        self.sender
            .try_send(GatewayMessage::dispatch(event, next, data))
            .map_err(|e| match e {
                mpsc::error::TrySendError::Full(_) => DeliveryError::Full,
                mpsc::error::TrySendError::Closed(_) => DeliveryError::Closed,
            })?;
        *sequence = next;
        Ok(next)
    }

    /// Send a reply (hello, ack, heartbeat ack) to this connection
    pub async fn send(&self, message: GatewayMessage) -> Result<(), DeliveryError> {
        self.sender
            .send(message)
            .await
            .map_err(|_| DeliveryError::Closed)
    }

    pub fn record_heartbeat(&self) {
        *self.last_heartbeat.lock() = Instant::now();
    }

    pub fn time_since_heartbeat(&self) -> Duration {
        self.last_heartbeat.lock().elapsed()
    }

    pub(crate) fn add_group(&self, key: GroupKey) -> bool {
        self.groups.lock().insert(key)
    }

    pub(crate) fn remove_group(&self, key: GroupKey) -> bool {
        self.groups.lock().remove(&key)
    }

    pub fn groups(&self) -> Vec<GroupKey> {
        let mut groups: Vec<_> = self.groups.lock().iter().copied().collect();
        groups.sort_unstable();
        groups
    }

    pub fn is_in_group(&self, key: GroupKey) -> bool {
        self.groups.lock().contains(&key)
    }

    /// Ask the socket task to close with `code`. Only the first call counts.
    pub fn evict(&self, code: CloseCode) {
        let mut eviction = self.eviction.lock();
        if eviction.is_none() {
            *eviction = Some(code);
            self.evicted.notify_one();
        }
    }

    pub fn eviction(&self) -> Option<CloseCode> {
        *self.eviction.lock()
    }

    /// Resolves once [`Connection::evict`] has been called
    pub async fn evicted(&self) -> CloseCode {
        loop {
            if let Some(code) = self.eviction() {
                return code;
            }
            self.evicted.notified().await;
        }
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("session_id", &self.session_id)
            .field("user_id", &self.user.id)
            .field("sequence", &self.current_sequence())
            .field("created_at", &self.created_at)
            .finish()
    }
}
