//! PostgreSQL implementation of ConversationStore.
//!
//! Positions are assigned inside the insert transaction after locking the
//! conversation row, so concurrent appends to one conversation serialize.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::domain::conversation::{Conversation, ConversationSummary, Message, Role};
use crate::domain::foundation::{
    ConversationId, DomainError, ErrorCode, MessageId, Timestamp, UserId,
};
use crate::ports::ConversationStore;

#[derive(Clone)]
pub struct PostgresConversationStore {
    pool: PgPool,
}

impl PostgresConversationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ConversationStore for PostgresConversationStore {
    async fn create_conversation(
        &self,
        owner_id: &UserId,
        title: &str,
    ) -> Result<Conversation, DomainError> {
        let conversation = Conversation::new(owner_id.clone(), Some(title));

        sqlx::query(
            r#"
            INSERT INTO conversations (id, owner_id, title, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(conversation.id().as_uuid())
        .bind(conversation.owner_id().as_str())
        .bind(conversation.title())
        .bind(conversation.created_at().as_datetime())
        .bind(conversation.updated_at().as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("insert conversation", e))?;

        Ok(conversation)
    }

    async fn find_conversation(
        &self,
        id: &ConversationId,
    ) -> Result<Option<Conversation>, DomainError> {
        let row = sqlx::query(
            r#"
            SELECT id, owner_id, title, created_at, updated_at
            FROM conversations
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("fetch conversation", e))?;

        row.map(|row| row_to_conversation(&row)).transpose()
    }

    async fn list_conversations(
        &self,
        owner_id: &UserId,
    ) -> Result<Vec<ConversationSummary>, DomainError> {
        let rows = sqlx::query(
            r#"
            SELECT c.id, c.owner_id, c.title, c.created_at, c.updated_at,
                   m.id AS preview_id, m.role AS preview_role,
                   m.content AS preview_content, m.position AS preview_position,
                   m.created_at AS preview_created_at
            FROM conversations c
            LEFT JOIN LATERAL (
                SELECT id, role, content, position, created_at
                FROM messages
                WHERE conversation_id = c.id
                ORDER BY position ASC
                LIMIT 1
            ) m ON TRUE
            WHERE c.owner_id = $1
            ORDER BY c.updated_at DESC
            "#,
        )
        .bind(owner_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("list conversations", e))?;

        rows.iter().map(row_to_summary).collect()
    }

    async fn rename_conversation(
        &self,
        id: &ConversationId,
        title: &str,
    ) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE conversations SET title = $2, updated_at = $3
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .bind(title)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("rename conversation", e))?;

        if result.rows_affected() == 0 {
            return Err(conversation_not_found(id));
        }
        Ok(())
    }

    async fn delete_conversation(&self, id: &ConversationId) -> Result<(), DomainError> {
        // messages go with it (ON DELETE CASCADE)
        let result = sqlx::query("DELETE FROM conversations WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("delete conversation", e))?;

        if result.rows_affected() == 0 {
            return Err(conversation_not_found(id));
        }
        Ok(())
    }

    async fn create_message(
        &self,
        conversation_id: &ConversationId,
        role: Role,
        content: &str,
    ) -> Result<Message, DomainError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| db_error("begin transaction", e))?;
        let now = Utc::now();

        // Locks the conversation row until commit.
        let touched = sqlx::query("UPDATE conversations SET updated_at = $2 WHERE id = $1")
            .bind(conversation_id.as_uuid())
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(|e| db_error("touch conversation", e))?;
        if touched.rows_affected() == 0 {
            return Err(conversation_not_found(conversation_id));
        }

        let id = MessageId::new();
        let row = sqlx::query(
            r#"
            INSERT INTO messages (id, conversation_id, role, content, position, created_at)
            SELECT $1, $2, $3, $4, COALESCE(MAX(position) + 1, 0), $5
            FROM messages
            WHERE conversation_id = $2
            RETURNING position
            "#,
        )
        .bind(id.as_uuid())
        .bind(conversation_id.as_uuid())
        .bind(role.as_str())
        .bind(content)
        .bind(now)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| db_error("insert message", e))?;

        tx.commit()
            .await
            .map_err(|e| db_error("commit message", e))?;

        let position: i32 = get(&row, "position")?;
        Ok(Message::reconstitute(
            id,
            *conversation_id,
            role,
            content.to_string(),
            to_position(position)?,
            Timestamp::from_datetime(now),
        ))
    }

    async fn update_message_content(
        &self,
        message_id: &MessageId,
        content: &str,
    ) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            WITH edited AS (
                UPDATE messages SET content = $2 WHERE id = $1
                RETURNING conversation_id
            )
            UPDATE conversations SET updated_at = $3
            FROM edited
            WHERE conversations.id = edited.conversation_id
            "#,
        )
        .bind(message_id.as_uuid())
        .bind(content)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("update message", e))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::new(ErrorCode::MessageNotFound, "Message not found")
                .with_detail("message_id", message_id.to_string()));
        }
        Ok(())
    }

    async fn delete_messages_after(
        &self,
        conversation_id: &ConversationId,
        position: u32,
    ) -> Result<u64, DomainError> {
        let position = i64::from(position);
        let result =
            sqlx::query("DELETE FROM messages WHERE conversation_id = $1 AND position > $2")
                .bind(conversation_id.as_uuid())
                .bind(position)
                .execute(&self.pool)
                .await
                .map_err(|e| db_error("truncate messages", e))?;

        Ok(result.rows_affected())
    }

    async fn list_messages(
        &self,
        conversation_id: &ConversationId,
    ) -> Result<Vec<Message>, DomainError> {
        let rows = sqlx::query(
            r#"
            SELECT id, conversation_id, role, content, position, created_at
            FROM messages
            WHERE conversation_id = $1
            ORDER BY position ASC, created_at ASC
            "#,
        )
        .bind(conversation_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("list messages", e))?;

        rows.iter().map(row_to_message).collect()
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Row mapping
// ════════════════════════════════════════════════════════════════════════════

fn row_to_conversation(row: &PgRow) -> Result<Conversation, DomainError> {
    let id: Uuid = get(row, "id")?;
    let owner_id: String = get(row, "owner_id")?;
    let title: String = get(row, "title")?;
    let created_at: DateTime<Utc> = get(row, "created_at")?;
    let updated_at: DateTime<Utc> = get(row, "updated_at")?;

    let owner_id = UserId::new(owner_id).map_err(|e| {
        DomainError::new(ErrorCode::DatabaseError, format!("Invalid owner_id: {}", e))
    })?;

    Ok(Conversation::reconstitute(
        ConversationId::from_uuid(id),
        owner_id,
        title,
        Timestamp::from_datetime(created_at),
        Timestamp::from_datetime(updated_at),
    ))
}

fn row_to_summary(row: &PgRow) -> Result<ConversationSummary, DomainError> {
    let conversation = row_to_conversation(row)?;
    let preview_id: Option<Uuid> = get(row, "preview_id")?;

    let preview = match preview_id {
        Some(id) => {
            let role: String = get(row, "preview_role")?;
            let content: String = get(row, "preview_content")?;
            let position: i32 = get(row, "preview_position")?;
            let created_at: DateTime<Utc> = get(row, "preview_created_at")?;
            Some(Message::reconstitute(
                MessageId::from_uuid(id),
                *conversation.id(),
                parse_role(&role)?,
                content,
                to_position(position)?,
                Timestamp::from_datetime(created_at),
            ))
        }
        None => None,
    };

    Ok(ConversationSummary {
        conversation,
        preview,
    })
}

fn row_to_message(row: &PgRow) -> Result<Message, DomainError> {
    let id: Uuid = get(row, "id")?;
    let conversation_id: Uuid = get(row, "conversation_id")?;
    let role: String = get(row, "role")?;
    let content: String = get(row, "content")?;
    let position: i32 = get(row, "position")?;
    let created_at: DateTime<Utc> = get(row, "created_at")?;

    Ok(Message::reconstitute(
        MessageId::from_uuid(id),
        ConversationId::from_uuid(conversation_id),
        parse_role(&role)?,
        content,
        to_position(position)?,
        Timestamp::from_datetime(created_at),
    ))
}

fn get<'r, T>(row: &'r PgRow, column: &str) -> Result<T, DomainError>
where
    T: sqlx::Decode<'r, sqlx::Postgres> + sqlx::Type<sqlx::Postgres>,
{
    row.try_get(column).map_err(|e| {
        DomainError::new(
            ErrorCode::DatabaseError,
            format!("Failed to get {}: {}", column, e),
        )
    })
}

fn parse_role(s: &str) -> Result<Role, DomainError> {
    s.parse::<Role>().map_err(|e| {
        DomainError::new(ErrorCode::DatabaseError, format!("Invalid stored role: {}", e))
    })
}

fn to_position(position: i32) -> Result<u32, DomainError> {
    u32::try_from(position).map_err(|_| {
        DomainError::new(
            ErrorCode::DatabaseError,
            format!("Invalid stored position: {}", position),
        )
    })
}

fn db_error(action: &str, e: sqlx::Error) -> DomainError {
    DomainError::new(ErrorCode::DatabaseError, format!("Failed to {}: {}", action, e))
}

fn conversation_not_found(id: &ConversationId) -> DomainError {
    DomainError::new(ErrorCode::ConversationNotFound, "Conversation not found")
        .with_detail("conversation_id", id.to_string())
}
