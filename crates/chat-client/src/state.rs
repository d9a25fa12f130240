//! Client reconciliation state
//!
//! A send is shown immediately as a [`PendingMessage`] with a temporary id.
//! The server's `MESSAGE_DELIVERED` echo later replaces it in place. Every
//! delivery goes through [`ChatState::on_delivered`], which is idempotent per
//! message id, so redundant fan-out never duplicates an entry.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

use chat_core::Snowflake;
use chat_gateway::protocol::AckError;
use chat_service::dto::{MessageResponse, SendMessageRequest};
use chrono::{DateTime, Utc};

use crate::client::AckOutcome;

/// Local id of an unconfirmed send, never reused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TempId(u64);

impl TempId {
    pub const fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TempId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tmp-{}", self.0)
    }
}

/// Optimistic placeholder for a send awaiting its echo
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingMessage {
    pub temp_id: TempId,
    pub sender_id: Snowflake,
    pub request: SendMessageRequest,
    pub created_at: DateTime<Utc>,
}

impl PendingMessage {
    /// Body compared against the echo. A blank body is stored as none, so
    /// it is dropped here too.
    pub fn body(&self) -> Option<&str> {
        self.request
            .content
            .as_deref()
            .filter(|body| !body.trim().is_empty())
    }

    fn matches(&self, message: &MessageResponse) -> bool {
        self.sender_id == message.sender.id && self.body() == message.content.as_deref()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimelineEntry {
    Pending(PendingMessage),
    Delivered(MessageResponse),
}

impl TimelineEntry {
    pub fn message_id(&self) -> Option<Snowflake> {
        match self {
            Self::Pending(_) => None,
            Self::Delivered(message) => Some(message.id),
        }
    }

    pub fn temp_id(&self) -> Option<TempId> {
        match self {
            Self::Pending(pending) => Some(pending.temp_id),
            Self::Delivered(_) => None,
        }
    }

    pub fn sender_id(&self) -> Snowflake {
        match self {
            Self::Pending(pending) => pending.sender_id,
            Self::Delivered(message) => message.sender.id,
        }
    }

    pub fn body(&self) -> Option<&str> {
        match self {
            Self::Pending(pending) => pending.body(),
            Self::Delivered(message) => message.content.as_deref(),
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending(_))
    }
}

/// Lifecycle of one outbound message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundStatus {
    Pending,
    Confirmed(Snowflake),
    Failed(String),
}

/// What [`ChatState::on_delivered`] did with a delivery
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// The id was already in the timeline
    Duplicate,
    /// Replaced the earliest matching placeholder
    Confirmed(TempId),
    Appended,
}

/// Side effects the embedding application carries out
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEffect {
    /// Persist a read receipt for the whole conversation (op `MarkRead`)
    MarkRead(Snowflake),
    /// Surface a rejected send to the user
    SendFailed { temp_id: TempId, reason: String },
}

/// Requests to replay after a reconnect
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientCommand {
    DeclareOnline,
    Join(Snowflake),
}

/// Local view of one signed-in user's conversations
#[derive(Debug)]
pub struct ChatState {
    local_user: Snowflake,
    next_temp_id: u64,
    timelines: HashMap<Snowflake, Vec<TimelineEntry>>,
    outbound: BTreeMap<TempId, OutboundStatus>,
    // temp id -> conversation of a still pending placeholder
    pending_index: HashMap<TempId, Snowflake>,
    unread: HashMap<Snowflake, u32>,
    previews: HashMap<Snowflake, String>,
    open: Option<Snowflake>,
    online: BTreeSet<Snowflake>,
    effects: Vec<ClientEffect>,
}

impl ChatState {
    pub fn new(local_user: Snowflake) -> Self {
        Self {
            local_user,
            next_temp_id: 1,
            timelines: HashMap::new(),
            outbound: BTreeMap::new(),
            pending_index: HashMap::new(),
            unread: HashMap::new(),
            previews: HashMap::new(),
            open: None,
            online: BTreeSet::new(),
            effects: Vec::new(),
        }
    }

    pub fn local_user(&self) -> Snowflake {
        self.local_user
    }

    /// Insert an optimistic placeholder for `request`
    pub fn begin_send(&mut self, request: &SendMessageRequest) -> TempId {
        let temp_id = TempId(self.next_temp_id);
        self.next_temp_id += 1;

        let conversation_id = request.conversation_id;
        self.timelines
            .entry(conversation_id)
            .or_default()
            .push(TimelineEntry::Pending(PendingMessage {
                temp_id,
                sender_id: self.local_user,
                request: request.clone(),
                created_at: Utc::now(),
            }));
        self.outbound.insert(temp_id, OutboundStatus::Pending);
        self.pending_index.insert(temp_id, conversation_id);

        self.previews
            .insert(conversation_id, request_preview(request));
        self.unread.insert(conversation_id, 0);

        tracing::debug!(%temp_id, conversation_id = %conversation_id, "send started");
        temp_id
    }

    /// Merge a `MESSAGE_DELIVERED` event
    pub fn on_delivered(&mut self, message: MessageResponse) -> MergeOutcome {
        let conversation_id = message.conversation_id;
        let timeline = self.timelines.entry(conversation_id).or_default();

        if timeline.iter().any(|e| e.message_id() == Some(message.id)) {
            tracing::trace!(message_id = %message.id, "duplicate delivery dropped");
            return MergeOutcome::Duplicate;
        }

        let from_self = message.sender.id == self.local_user;
        let preview = message.preview_text();
        let message_id = message.id;

        let pending_slot = timeline.iter().position(|entry| match entry {
            TimelineEntry::Pending(pending) => pending.matches(&message),
            TimelineEntry::Delivered(_) => false,
        });

        let outcome = match pending_slot {
            Some(index) => {
                let replaced = std::mem::replace(&mut timeline[index], TimelineEntry::Delivered(message));
                match replaced.temp_id() {
                    Some(temp_id) => {
                        self.pending_index.remove(&temp_id);
                        self.outbound
                            .insert(temp_id, OutboundStatus::Confirmed(message_id));
                        MergeOutcome::Confirmed(temp_id)
                    }
                    None => MergeOutcome::Appended,
                }
            }
            None => {
                timeline.push(TimelineEntry::Delivered(message));
                MergeOutcome::Appended
            }
        };

        self.previews.insert(conversation_id, preview);

        if from_self {
            self.unread.insert(conversation_id, 0);
        } else if self.open == Some(conversation_id) {
            self.unread.insert(conversation_id, 0);
            self.effects.push(ClientEffect::MarkRead(conversation_id));
        } else {
            *self.unread.entry(conversation_id).or_default() += 1;
        }

        outcome
    }

    /// Apply the acknowledgment of the send that produced `temp_id`
    pub fn on_ack(&mut self, temp_id: TempId, outcome: AckOutcome) {
        match outcome {
            AckOutcome::Acked => {}
            AckOutcome::Rejected(error) => self.on_ack_error(temp_id, &error),
            AckOutcome::Indeterminate => self.on_ack_timeout(temp_id),
        }
    }

    /// Drop the placeholder and record the failure.
    ///
    /// A placeholder already confirmed by its echo is left alone.
    pub fn on_ack_error(&mut self, temp_id: TempId, error: &AckError) {
        let Some(conversation_id) = self.pending_index.remove(&temp_id) else {
            return;
        };
        if let Some(timeline) = self.timelines.get_mut(&conversation_id) {
            timeline.retain(|entry| entry.temp_id() != Some(temp_id));
        }
        self.outbound
            .insert(temp_id, OutboundStatus::Failed(error.error.clone()));
        self.effects.push(ClientEffect::SendFailed {
            temp_id,
            reason: error.error.clone(),
        });
        tracing::warn!(%temp_id, code = %error.code, "send rejected: {}", error.error);
    }

    /// The ack never came: the outcome is unknown, so nothing changes and
    /// nothing is resent. A later echo still confirms the placeholder.
    pub fn on_ack_timeout(&mut self, temp_id: TempId) {
        if self.pending_index.contains_key(&temp_id) {
            tracing::warn!(%temp_id, "no acknowledgment, message left pending");
        }
    }

    pub fn open_conversation(&mut self, conversation_id: Snowflake) {
        self.open = Some(conversation_id);
        self.unread.insert(conversation_id, 0);
        self.effects.push(ClientEffect::MarkRead(conversation_id));
    }

    pub fn close_conversation(&mut self) {
        self.open = None;
    }

    /// Replace the online set with the server's snapshot
    pub fn on_presence_snapshot(&mut self, online_users: impl IntoIterator<Item = Snowflake>) {
        self.online = online_users.into_iter().collect();
    }

    /// Requests that restore server-side state after a reconnect.
    /// Local state is kept as is.
    pub fn rejoin_plan(&self) -> Vec<ClientCommand> {
        let mut plan = vec![ClientCommand::DeclareOnline];
        if let Some(conversation_id) = self.open {
            plan.push(ClientCommand::Join(conversation_id));
        }
        plan
    }

    /// Effects produced since the last call
    pub fn take_effects(&mut self) -> Vec<ClientEffect> {
        std::mem::take(&mut self.effects)
    }

    // === Queries ===

    pub fn timeline(&self, conversation_id: Snowflake) -> &[TimelineEntry] {
        self.timelines
            .get(&conversation_id)
            .map_or(&[], Vec::as_slice)
    }

    pub fn outbound_status(&self, temp_id: TempId) -> Option<&OutboundStatus> {
        self.outbound.get(&temp_id)
    }

    pub fn pending_count(&self) -> usize {
        self.pending_index.len()
    }

    pub fn unread(&self, conversation_id: Snowflake) -> u32 {
        self.unread.get(&conversation_id).copied().unwrap_or(0)
    }

    pub fn preview(&self, conversation_id: Snowflake) -> Option<&str> {
        self.previews.get(&conversation_id).map(String::as_str)
    }

    pub fn open_conversation_id(&self) -> Option<Snowflake> {
        self.open
    }

    pub fn online_users(&self) -> &BTreeSet<Snowflake> {
        &self.online
    }

    pub fn is_online(&self, user_id: Snowflake) -> bool {
        self.online.contains(&user_id)
    }
}

fn request_preview(request: &SendMessageRequest) -> String {
    request
        .to_content()
        .map(|content| content.preview_text())
        .unwrap_or_else(|_| request.content.clone().unwrap_or_default())
}
