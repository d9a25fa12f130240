//! Connection manager
//!
//! Owns every live connection and the group index. Both maps are `DashMap`s;
//! group membership changes go through per-key entry locks and empty groups
//! are dropped with `remove_if`.

use super::{Connection, GroupKey};
use crate::protocol::GatewayMessage;
use chat_core::{Profile, Snowflake};
use dashmap::DashMap;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::mpsc;

pub struct ConnectionManager {
    /// Active connections by session ID
    connections: DashMap<String, Arc<Connection>>,

    /// Group key to session IDs
    groups: DashMap<GroupKey, HashSet<String>>,
}

impl ConnectionManager {
    #[must_use]
    pub fn new() -> Self {
        Self {
            connections: DashMap::new(),
            groups: DashMap::new(),
        }
    }

    #[must_use]
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Register an authenticated connection and place it in its personal group
    pub fn add_connection(
        &self,
        session_id: String,
        user: Profile,
        sender: mpsc::Sender<GatewayMessage>,
    ) -> Arc<Connection> {
        let connection = Connection::new(session_id, user, sender);
        self.insert_connection(connection.clone());
        connection
    }

    /// Publish an already built connection. Anything queued on it beforehand
    /// stays ahead of every broadcast.
    pub fn insert_connection(&self, connection: Arc<Connection>) {
        let user_id = connection.user_id();
        let session_id = connection.session_id().to_string();
        self.connections.insert(session_id.clone(), connection.clone());
        self.join_group(&connection, GroupKey::Personal(user_id));

        tracing::debug!(session_id = %session_id, user_id = %user_id, "Connection added");
    }

    /// Remove a connection from the table and from every group it joined
    pub fn remove_connection(&self, session_id: &str) -> Option<Arc<Connection>> {
        let (_, connection) = self.connections.remove(session_id)?;

        for key in connection.groups() {
            self.leave_group(&connection, key);
        }

        tracing::debug!(session_id = %session_id, "Connection removed");
        Some(connection)
    }

    pub fn get_connection(&self, session_id: &str) -> Option<Arc<Connection>> {
        self.connections.get(session_id).map(|r| r.clone())
    }

    /// Add a connection to a group. Returns `false` if it was already a member.
    pub fn join_group(&self, connection: &Connection, key: GroupKey) -> bool {
        let added = self
            .groups
            .entry(key)
            .or_default()
            .insert(connection.session_id().to_string());
        connection.add_group(key);

        tracing::trace!(session_id = %connection.session_id(), group = %key, added, "Joined group");
        added
    }

    /// Remove a connection from a group. Leaving a group never joined is a no-op.
    pub fn leave_group(&self, connection: &Connection, key: GroupKey) -> bool {
        let removed = self
            .groups
            .get_mut(&key)
            .is_some_and(|mut sessions| sessions.remove(connection.session_id()));
        self.groups.remove_if(&key, |_, sessions| sessions.is_empty());
        connection.remove_group(key);

        tracing::trace!(session_id = %connection.session_id(), group = %key, removed, "Left group");
        removed
    }

    /// Connections currently in a group
    pub fn group_members(&self, key: GroupKey) -> Vec<Arc<Connection>> {
        self.groups
            .get(&key)
            .map(|sessions| {
                sessions
                    .iter()
                    .filter_map(|sid| self.connections.get(sid).map(|c| c.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Every live connection of a user
    pub fn user_connections(&self, user_id: Snowflake) -> Vec<Arc<Connection>> {
        self.group_members(GroupKey::Personal(user_id))
    }

    pub fn all_connections(&self) -> Vec<Arc<Connection>> {
        self.connections.iter().map(|r| r.value().clone()).collect()
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Number of non-empty groups
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    pub fn has_session(&self, session_id: &str) -> bool {
        self.connections.contains_key(session_id)
    }
}

impl Default for ConnectionManager {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("connections", &self.connections.len())
            .field("groups", &self.groups.len())
            .finish()
    }
}
