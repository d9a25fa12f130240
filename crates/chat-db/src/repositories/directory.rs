//! PostgreSQL implementation of Directory

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::instrument;

use chat_core::{Conversation, Directory, Profile, RepoResult, Snowflake};

use crate::models::{ConversationModel, UserModel};

use super::error::map_db_error;

#[derive(Clone)]
pub struct PgDirectory {
    pool: PgPool,
}

impl PgDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Directory for PgDirectory {
    #[instrument(skip(self))]
    async fn resolve_user(&self, user_id: Snowflake) -> RepoResult<Option<Profile>> {
        let result = sqlx::query_as::<_, UserModel>(
            r"
            SELECT id, username, avatar, created_at
            FROM users
            WHERE id = $1
            ",
        )
        .bind(user_id.into_inner())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.map(Profile::from))
    }

    #[instrument(skip(self))]
    async fn find_conversation(&self, conversation_id: Snowflake) -> RepoResult<Option<Conversation>> {
        let Some(model) = sqlx::query_as::<_, ConversationModel>(
            r"
            SELECT id, name, is_group, latest_message_id, created_at, updated_at
            FROM conversations
            WHERE id = $1
            ",
        )
        .bind(conversation_id.into_inner())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?
        else {
            return Ok(None);
        };

        let participants: Vec<i64> = sqlx::query_scalar(
            r"
            SELECT user_id
            FROM conversation_participants
            WHERE conversation_id = $1
            ORDER BY user_id
            ",
        )
        .bind(conversation_id.into_inner())
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(Some(model.into_entity(participants)))
    }

    #[instrument(skip(self))]
    async fn is_participant(&self, conversation_id: Snowflake, user_id: Snowflake) -> RepoResult<bool> {
        sqlx::query_scalar::<_, bool>(
            r"
            SELECT EXISTS(
                SELECT 1 FROM conversation_participants
                WHERE conversation_id = $1 AND user_id = $2
            )
            ",
        )
        .bind(conversation_id.into_inner())
        .bind(user_id.into_inner())
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)
    }
}
