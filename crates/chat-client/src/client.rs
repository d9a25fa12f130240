//! Async gateway client
//!
//! One reader task routes Acks to their waiting request by nonce and turns
//! dispatches into [`ServerEvent`]s. One writer task drains the outbound
//! queue and sends heartbeats at the interval announced in Hello.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chat_core::Snowflake;
use chat_gateway::events::{GatewayEventType, PresenceSnapshotEvent, ReadyEvent};
use chat_gateway::protocol::{AckError, GatewayMessage, HelloPayload, OpCode, PresenceUpdatePayload};
use chat_service::dto::{ConversationRequest, MessageResponse, SendMessageRequest, UserResponse};
use futures_util::{SinkExt, Stream, StreamExt};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::{header::AUTHORIZATION, HeaderValue};
use tokio_tungstenite::tungstenite::Message;

use crate::error::{ClientError, ClientResult};
use crate::state::ClientCommand;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// How long a request waits for its Ack before giving up
    pub ack_timeout: Duration,
    /// Send heartbeats at the server's interval
    pub heartbeat: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            ack_timeout: Duration::from_secs(5),
            heartbeat: true,
        }
    }
}

/// Result of waiting for an Ack
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AckOutcome {
    Acked,
    Rejected(AckError),
    /// No Ack within the timeout, or the connection dropped first. The
    /// request may or may not have been applied.
    Indeterminate,
}

impl AckOutcome {
    pub fn is_acked(&self) -> bool {
        matches!(self, Self::Acked)
    }

    pub fn error(&self) -> Option<&AckError> {
        match self {
            Self::Rejected(error) => Some(error),
            _ => None,
        }
    }
}

/// Server pushes after the handshake
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerEvent {
    PresenceSnapshot(Vec<Snowflake>),
    MessageDelivered(MessageResponse),
    /// The connection ended, with the server's close code if it sent one
    Closed(Option<u16>),
}

type AckWaiters = Mutex<HashMap<u64, oneshot::Sender<Option<AckError>>>>;

#[derive(Default)]
struct Shared {
    acks: AckWaiters,
    last_sequence: Mutex<Option<u64>>,
}

pub struct GatewayClient {
    outbound: mpsc::UnboundedSender<Message>,
    events: mpsc::UnboundedReceiver<ServerEvent>,
    shared: Arc<Shared>,
    next_nonce: AtomicU64,
    config: ClientConfig,
    user: UserResponse,
    session_id: String,
    heartbeat_interval: Duration,
    reader: JoinHandle<()>,
    writer: Option<JoinHandle<()>>,
}

impl GatewayClient {
    /// Open a session at `url` (e.g. `ws://host:port/gateway`) with `token`
    /// sent as a Bearer credential.
    ///
    /// Resolves after Hello and READY. A refused credential surfaces as
    /// [`ClientError::WebSocket`] carrying the HTTP response.
    pub async fn connect(url: &str, token: &str, config: ClientConfig) -> ClientResult<Self> {
        let mut request = url.into_client_request()?;
        let bearer = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|e| ClientError::Handshake(format!("invalid credential: {e}")))?;
        request.headers_mut().insert(AUTHORIZATION, bearer);

        let (ws, _response) = connect_async(request).await?;
        let (sink, mut stream) = ws.split();

        let hello_frame = next_frame(&mut stream).await?;
        if hello_frame.op != OpCode::Hello {
            return Err(ClientError::Handshake(format!("expected Hello, got {}", hello_frame.op)));
        }
        let hello: HelloPayload = hello_frame.payload()?;

        let ready_frame = next_frame(&mut stream).await?;
        if ready_frame.event_type() != Some(GatewayEventType::Ready) {
            return Err(ClientError::Handshake(format!("expected READY, got {ready_frame}")));
        }
        let ready: ReadyEvent = ready_frame.payload()?;

        let shared = Arc::new(Shared::default());
        *shared.last_sequence.lock() = ready_frame.s;

        let heartbeat_interval = Duration::from_millis(hello.heartbeat_interval);
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        let reader = tokio::spawn(read_loop(stream, shared.clone(), events_tx));
        let writer = tokio::spawn(write_loop(
            sink,
            outbound_rx,
            shared.clone(),
            config.heartbeat.then_some(heartbeat_interval),
        ));

        tracing::debug!(session_id = %ready.session_id, user_id = %ready.user.id, "gateway session ready");

        Ok(Self {
            outbound: outbound_tx,
            events: events_rx,
            shared,
            next_nonce: AtomicU64::new(1),
            config,
            user: ready.user,
            session_id: ready.session_id,
            heartbeat_interval,
            reader,
            writer: Some(writer),
        })
    }

    pub fn user(&self) -> &UserResponse {
        &self.user
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn heartbeat_interval(&self) -> Duration {
        self.heartbeat_interval
    }

    pub fn last_sequence(&self) -> Option<u64> {
        *self.shared.last_sequence.lock()
    }

    // === Requests ===

    pub async fn join(&self, conversation_id: Snowflake) -> ClientResult<AckOutcome> {
        self.request(OpCode::JoinConversation, &ConversationRequest { conversation_id })
            .await
    }

    pub async fn leave(&self, conversation_id: Snowflake) -> ClientResult<AckOutcome> {
        self.request(OpCode::LeaveConversation, &ConversationRequest { conversation_id })
            .await
    }

    pub async fn send_message(&self, request: &SendMessageRequest) -> ClientResult<AckOutcome> {
        self.request(OpCode::SendMessage, request).await
    }

    pub async fn mark_read(&self, conversation_id: Snowflake) -> ClientResult<AckOutcome> {
        self.request(OpCode::MarkRead, &ConversationRequest { conversation_id })
            .await
    }

    /// Presence declarations are not acknowledged
    pub fn declare_online(&self) -> ClientResult<()> {
        self.send_frame(&GatewayMessage::request(
            OpCode::PresenceUpdate,
            None,
            &PresenceUpdatePayload::online(),
        )?)
    }

    pub fn declare_offline(&self) -> ClientResult<()> {
        self.send_frame(&GatewayMessage::request(
            OpCode::PresenceUpdate,
            None,
            &PresenceUpdatePayload::offline(),
        )?)
    }

    pub fn heartbeat(&self) -> ClientResult<()> {
        self.send_frame(&GatewayMessage::heartbeat(self.last_sequence()))
    }

    /// Replay one step of [`ChatState::rejoin_plan`](crate::ChatState::rejoin_plan)
    pub async fn execute(&self, command: ClientCommand) -> ClientResult<AckOutcome> {
        match command {
            ClientCommand::DeclareOnline => {
                self.declare_online()?;
                Ok(AckOutcome::Acked)
            }
            ClientCommand::Join(conversation_id) => self.join(conversation_id).await,
        }
    }

    /// Send `payload` under a fresh nonce and wait for its Ack
    pub async fn request<T: Serialize>(&self, op: OpCode, payload: &T) -> ClientResult<AckOutcome> {
        let nonce = self.next_nonce.fetch_add(1, Ordering::Relaxed);
        let frame = GatewayMessage::request(op, Some(nonce), payload)?;

        let (tx, rx) = oneshot::channel();
        self.shared.acks.lock().insert(nonce, tx);
        if let Err(e) = self.send_frame(&frame) {
            self.shared.acks.lock().remove(&nonce);
            return Err(e);
        }

        let outcome = wait_for_ack(rx, self.config.ack_timeout).await;
        if outcome == AckOutcome::Indeterminate {
            self.shared.acks.lock().remove(&nonce);
            tracing::warn!(nonce, op = %op, "no acknowledgment received");
        }
        Ok(outcome)
    }

    /// Queue a frame as is
    pub fn send_frame(&self, frame: &GatewayMessage) -> ClientResult<()> {
        self.send_text(frame.to_json()?)
    }

    /// Queue raw text, bypassing frame encoding
    pub fn send_text(&self, text: impl Into<String>) -> ClientResult<()> {
        self.outbound
            .send(Message::Text(text.into()))
            .map_err(|_| ClientError::Closed)
    }

    // === Events ===

    pub async fn next_event(&mut self) -> Option<ServerEvent> {
        self.events.recv().await
    }

    /// `None` when nothing arrived within `wait`
    pub async fn next_event_timeout(&mut self, wait: Duration) -> Option<ServerEvent> {
        tokio::time::timeout(wait, self.events.recv()).await.ok().flatten()
    }

    /// Next delivered message, skipping other events
    pub async fn next_message(&mut self, wait: Duration) -> Option<MessageResponse> {
        let deadline = tokio::time::Instant::now() + wait;
        loop {
            match tokio::time::timeout_at(deadline, self.events.recv()).await {
                Ok(Some(ServerEvent::MessageDelivered(message))) => return Some(message),
                Ok(Some(ServerEvent::Closed(_)) | None) | Err(_) => return None,
                Ok(Some(_)) => {}
            }
        }
    }

    /// Next presence snapshot, skipping other events
    pub async fn next_presence(&mut self, wait: Duration) -> Option<Vec<Snowflake>> {
        let deadline = tokio::time::Instant::now() + wait;
        loop {
            match tokio::time::timeout_at(deadline, self.events.recv()).await {
                Ok(Some(ServerEvent::PresenceSnapshot(online))) => return Some(online),
                Ok(Some(ServerEvent::Closed(_)) | None) | Err(_) => return None,
                Ok(Some(_)) => {}
            }
        }
    }

    /// Close the session and wait for the close frame to be written
    pub async fn close(mut self) {
        let _ = self.outbound.send(Message::Close(None));
        if let Some(writer) = self.writer.take() {
            let _ = tokio::time::timeout(Duration::from_secs(1), writer).await;
        }
    }
}

impl Drop for GatewayClient {
    fn drop(&mut self) {
        self.reader.abort();
        if let Some(writer) = &self.writer {
            writer.abort();
        }
    }
}

impl std::fmt::Debug for GatewayClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayClient")
            .field("session_id", &self.session_id)
            .field("user_id", &self.user.id)
            .field("pending_acks", &self.shared.acks.lock().len())
            .finish()
    }
}

async fn next_frame<S>(stream: &mut S) -> ClientResult<GatewayMessage>
where
    S: Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    while let Some(message) = stream.next().await {
        match message? {
            Message::Text(text) => return Ok(GatewayMessage::from_json(&text)?),
            Message::Close(_) => return Err(ClientError::Closed),
            _ => {}
        }
    }
    Err(ClientError::Closed)
}

/// A dropped waiter means the connection ended first, which says nothing
/// about whether the server applied the request
async fn wait_for_ack(rx: oneshot::Receiver<Option<AckError>>, timeout: Duration) -> AckOutcome {
    match tokio::time::timeout(timeout, rx).await {
        Ok(Ok(None)) => AckOutcome::Acked,
        Ok(Ok(Some(error))) => AckOutcome::Rejected(error),
        Ok(Err(_)) | Err(_) => AckOutcome::Indeterminate,
    }
}

async fn read_loop<S>(mut stream: S, shared: Arc<Shared>, events: mpsc::UnboundedSender<ServerEvent>)
where
    S: Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    let mut close_code = None;

    while let Some(message) = stream.next().await {
        let text = match message {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(frame)) => {
                close_code = frame.map(|f| u16::from(f.code));
                break;
            }
            Ok(_) => continue,
            Err(e) => {
                tracing::debug!(error = %e, "gateway read failed");
                break;
            }
        };

        let frame = match GatewayMessage::from_json(&text) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::warn!(error = %e, "undecodable frame from gateway");
                continue;
            }
        };

        match frame.op {
            OpCode::Ack => {
                let Some(nonce) = frame.n else { continue };
                if let Some(waiter) = shared.acks.lock().remove(&nonce) {
                    let _ = waiter.send(frame.ack_error());
                }
            }
            OpCode::Dispatch => {
                if frame.s.is_some() {
                    *shared.last_sequence.lock() = frame.s;
                }
                if let Some(event) = decode_dispatch(&frame) {
                    let _ = events.send(event);
                }
            }
            OpCode::HeartbeatAck => tracing::trace!("heartbeat acknowledged"),
            other => tracing::debug!(op = %other, "ignoring frame"),
        }
    }

    // wake every waiter with a closed channel
    shared.acks.lock().clear();
    let _ = events.send(ServerEvent::Closed(close_code));
}

fn decode_dispatch(frame: &GatewayMessage) -> Option<ServerEvent> {
    let event = match frame.event_type()? {
        GatewayEventType::PresenceSnapshot => frame
            .payload::<PresenceSnapshotEvent>()
            .map(|snapshot| ServerEvent::PresenceSnapshot(snapshot.online_users)),
        GatewayEventType::MessageDelivered => frame
            .payload::<MessageResponse>()
            .map(ServerEvent::MessageDelivered),
        GatewayEventType::Ready => return None,
    };
    event
        .map_err(|e| tracing::warn!(error = %e, "malformed dispatch payload"))
        .ok()
}

async fn write_loop<S>(
    mut sink: S,
    mut outbound: mpsc::UnboundedReceiver<Message>,
    shared: Arc<Shared>,
    heartbeat: Option<Duration>,
) where
    S: futures_util::Sink<Message, Error = tokio_tungstenite::tungstenite::Error> + Unpin,
{
    let period = heartbeat.unwrap_or(Duration::from_secs(3600));
    let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);

    loop {
        let message = tokio::select! {
            next = outbound.recv() => match next {
                Some(message) => message,
                None => break,
            },
            _ = ticker.tick(), if heartbeat.is_some() => {
                let last_sequence = *shared.last_sequence.lock();
                match GatewayMessage::heartbeat(last_sequence).to_json() {
                    Ok(json) => Message::Text(json),
                    Err(_) => continue,
                }
            }
        };

        let closing = matches!(message, Message::Close(_));
        if let Err(e) = sink.send(message).await {
            tracing::debug!(error = %e, "gateway write failed");
            return;
        }
        if closing {
            break;
        }
    }

    let _ = sink.close().await;
}
