//! Message database models

use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Database model for messages table
#[derive(Debug, Clone, FromRow)]
pub struct MessageModel {
    pub id: i64,
    pub conversation_id: i64,
    pub sender_id: i64,
    pub kind: String,
    pub body: Option<String>,
    pub file_url: Option<String>,
    pub file_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Database model for message_reads table
#[derive(Debug, Clone, FromRow)]
pub struct MessageReadModel {
    pub message_id: i64,
    pub user_id: i64,
    pub read_at: DateTime<Utc>,
}
