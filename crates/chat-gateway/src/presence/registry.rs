//! Presence registry
//!
//! Liveness is counted per connection and aggregated per user only here. A
//! user is online while at least one registered connection of theirs is not
//! hidden by an offline declaration. Every mutation broadcasts the new
//! snapshot to all connections while the table lock is held, so snapshots
//! reach each connection in mutation order.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use chat_core::Snowflake;
use parking_lot::Mutex;
use serde_json::Value;
use tracing::{debug, warn};

use crate::broadcast;
use crate::connection::{Connection, ConnectionManager};
use crate::events::{GatewayEventType, PresenceSnapshotEvent};

/// Effect of one registry call on the calling user's presence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresenceTransition {
    CameOnline,
    WentOffline,
    Unchanged,
    /// Declaration named another identity and was dropped
    Ignored,
}

#[derive(Default)]
struct PresenceTable {
    /// Registered sessions per user
    sessions: BTreeMap<Snowflake, HashSet<String>>,
    /// Sessions that declared themselves offline
    hidden: HashSet<String>,
}

impl PresenceTable {
    fn is_online(&self, user_id: Snowflake) -> bool {
        self.sessions
            .get(&user_id)
            .is_some_and(|sessions| sessions.iter().any(|s| !self.hidden.contains(s)))
    }

    fn snapshot(&self) -> Vec<Snowflake> {
        self.sessions
            .keys()
            .copied()
            .filter(|user_id| self.is_online(*user_id))
            .collect()
    }

    fn is_registered(&self, user_id: Snowflake, session_id: &str) -> bool {
        self.sessions
            .get(&user_id)
            .is_some_and(|sessions| sessions.contains(session_id))
    }
}

pub struct PresenceRegistry {
    table: Mutex<PresenceTable>,
    connections: Arc<ConnectionManager>,
}

impl PresenceRegistry {
    #[must_use]
    pub fn new(connections: Arc<ConnectionManager>) -> Self {
        Self {
            table: Mutex::new(PresenceTable::default()),
            connections,
        }
    }

    /// Count a connection as live. Idempotent per session id.
    pub fn register(&self, connection: &Connection) -> PresenceTransition {
        self.mutate(connection.user_id(), |table| {
            table
                .sessions
                .entry(connection.user_id())
                .or_default()
                .insert(connection.session_id().to_string());
        })
    }

    /// Stop counting a connection. Unknown sessions change nothing.
    pub fn unregister(&self, connection: &Connection) -> PresenceTransition {
        let user_id = connection.user_id();
        let session_id = connection.session_id();
        self.mutate(user_id, |table| {
            if let Some(sessions) = table.sessions.get_mut(&user_id) {
                sessions.remove(session_id);
                if sessions.is_empty() {
                    table.sessions.remove(&user_id);
                }
            }
            table.hidden.remove(session_id);
        })
    }

    /// Un-hide (and if needed re-register) the declaring connection
    pub fn declare_online(
        &self,
        connection: &Connection,
        claimed: Option<Snowflake>,
    ) -> PresenceTransition {
        if !Self::claim_matches(connection, claimed) {
            return PresenceTransition::Ignored;
        }
        self.mutate(connection.user_id(), |table| {
            table.hidden.remove(connection.session_id());
            table
                .sessions
                .entry(connection.user_id())
                .or_default()
                .insert(connection.session_id().to_string());
        })
    }

    /// Hide the declaring connection until it declares online again or closes
    pub fn declare_offline(
        &self,
        connection: &Connection,
        claimed: Option<Snowflake>,
    ) -> PresenceTransition {
        if !Self::claim_matches(connection, claimed) {
            return PresenceTransition::Ignored;
        }
        self.mutate(connection.user_id(), |table| {
            if table.is_registered(connection.user_id(), connection.session_id()) {
                table.hidden.insert(connection.session_id().to_string());
            }
        })
    }

    /// Online user ids, ascending
    pub fn snapshot(&self) -> Vec<Snowflake> {
        self.table.lock().snapshot()
    }

    pub fn is_online(&self, user_id: Snowflake) -> bool {
        self.table.lock().is_online(user_id)
    }

    /// Number of live, visible connections of a user
    pub fn connection_count(&self, user_id: Snowflake) -> usize {
        let table = self.table.lock();
        table.sessions.get(&user_id).map_or(0, |sessions| {
            sessions.iter().filter(|s| !table.hidden.contains(*s)).count()
        })
    }

    /// Registered sessions per user, hidden ones included
    pub fn session_counts(&self) -> HashMap<Snowflake, usize> {
        self.table
            .lock()
            .sessions
            .iter()
            .map(|(user_id, sessions)| (*user_id, sessions.len()))
            .collect()
    }

    fn claim_matches(connection: &Connection, claimed: Option<Snowflake>) -> bool {
        match claimed {
            Some(user_id) if user_id != connection.user_id() => {
                warn!(
                    session_id = %connection.session_id(),
                    user_id = %connection.user_id(),
                    claimed = %user_id,
                    "Presence declaration for another user ignored"
                );
                false
            }
            _ => true,
        }
    }

    fn mutate<F>(&self, user_id: Snowflake, change: F) -> PresenceTransition
    where
        F: FnOnce(&mut PresenceTable),
    {
        let mut table = self.table.lock();
        let before = table.is_online(user_id);
        change(&mut table);
        let after = table.is_online(user_id);

        let snapshot = PresenceSnapshotEvent {
            online_users: table.snapshot(),
        };
        let data = serde_json::to_value(&snapshot).unwrap_or(Value::Null);
        let targets = self.connections.all_connections();
        let report = broadcast::deliver(&targets, GatewayEventType::PresenceSnapshot, &data);
        drop(table);

        let transition = match (before, after) {
            (false, true) => PresenceTransition::CameOnline,
            (true, false) => PresenceTransition::WentOffline,
            _ => PresenceTransition::Unchanged,
        };
        debug!(
            user_id = %user_id,
            ?transition,
            online = snapshot.online_users.len(),
            delivered = report.delivered,
            "Presence snapshot broadcast"
        );
        transition
    }
}

impl std::fmt::Debug for PresenceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let table = self.table.lock();
        f.debug_struct("PresenceRegistry")
            .field("users", &table.sessions.len())
            .field("hidden", &table.hidden.len())
            .finish()
    }
}
