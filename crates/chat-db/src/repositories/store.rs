//! PostgreSQL implementation of Store

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::{debug, instrument};

use chat_core::{
    Message, NewMessage, ReadTarget, RepoResult, Snowflake, SnowflakeGenerator, Store,
};

use crate::mappers::MessageColumns;
use crate::models::{MessageModel, MessageReadModel};

use super::error::{conversation_not_found, map_db_error, map_fk_violation};

/// Message ids are minted here, so the store is the authority on both id
/// and timestamp.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
    ids: Arc<SnowflakeGenerator>,
}

impl PgStore {
    pub fn new(pool: PgPool, worker_id: u16) -> Self {
        Self {
            pool,
            ids: Arc::new(SnowflakeGenerator::new(worker_id)),
        }
    }
}

#[async_trait]
impl Store for PgStore {
    #[instrument(skip(self, draft), fields(conversation_id = %draft.conversation_id, sender_id = %draft.sender_id))]
    async fn create_message(&self, draft: NewMessage) -> RepoResult<Message> {
        let id = self.ids.generate();
        let created_at = Utc::now();
        let columns = MessageColumns::new(&draft.content);
        let conversation_id = draft.conversation_id;

        // message row and the sender's own receipt land together
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;

        let model = sqlx::query_as::<_, MessageModel>(
            r"
            INSERT INTO messages (id, conversation_id, sender_id, kind, body, file_url, file_name, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id, conversation_id, sender_id, kind, body, file_url, file_name, created_at
            ",
        )
        .bind(id.into_inner())
        .bind(draft.conversation_id.into_inner())
        .bind(draft.sender_id.into_inner())
        .bind(columns.kind)
        .bind(columns.body)
        .bind(columns.file_url)
        .bind(columns.file_name)
        .bind(created_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_fk_violation(e, || conversation_not_found(conversation_id)))?;

        let receipt = sqlx::query_as::<_, MessageReadModel>(
            r"
            INSERT INTO message_reads (message_id, user_id, read_at)
            VALUES ($1, $2, $3)
            RETURNING message_id, user_id, read_at
            ",
        )
        .bind(id.into_inner())
        .bind(draft.sender_id.into_inner())
        .bind(created_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_db_error)?;

        tx.commit().await.map_err(map_db_error)?;

        debug!(message_id = %id, "message persisted");
        model.into_message(vec![receipt])
    }

    #[instrument(skip(self))]
    async fn set_latest_message(&self, conversation_id: Snowflake, message_id: Snowflake) -> RepoResult<()> {
        let result = sqlx::query(
            r"
            UPDATE conversations
            SET latest_message_id = $2, updated_at = NOW()
            WHERE id = $1
            ",
        )
        .bind(conversation_id.into_inner())
        .bind(message_id.into_inner())
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        if result.rows_affected() == 0 {
            return Err(conversation_not_found(conversation_id));
        }

        Ok(())
    }

    #[instrument(skip(self))]
    async fn append_read_receipt(
        &self,
        target: ReadTarget,
        user_id: Snowflake,
        at: DateTime<Utc>,
    ) -> RepoResult<u64> {
        let query = match target {
            ReadTarget::Message(message_id) => sqlx::query(
                r"
                INSERT INTO message_reads (message_id, user_id, read_at)
                SELECT id, $2, $3 FROM messages WHERE id = $1
                ON CONFLICT (message_id, user_id) DO NOTHING
                ",
            )
            .bind(message_id.into_inner()),
            ReadTarget::Conversation(conversation_id) => sqlx::query(
                r"
                INSERT INTO message_reads (message_id, user_id, read_at)
                SELECT id, $2, $3 FROM messages WHERE conversation_id = $1
                ON CONFLICT (message_id, user_id) DO NOTHING
                ",
            )
            .bind(conversation_id.into_inner()),
        };

        let result = query
            .bind(user_id.into_inner())
            .bind(at)
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?;

        Ok(result.rows_affected())
    }
}
