use chrono::{DateTime, Utc};
use classsight_models::assistant::{ChatMessage, ChatSessionSummary};
use classsight_observability::log_db;
use serde_json::{json, Value};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::errors::ApiError;

/// Owner of sessions opened without an identity.
pub const ANONYMOUS_USER: Uuid = Uuid::nil();

pub const DEFAULT_SESSION_TITLE: &str = "New Conversation";

#[derive(Debug, FromRow)]
struct MessageRecord {
    id: Uuid,
    role: String,
    content: String,
    metadata: Option<Value>,
    created_at: DateTime<Utc>,
}

impl From<MessageRecord> for ChatMessage {
    fn from(record: MessageRecord) -> Self {
        ChatMessage {
            message_id: record.id,
            role: record.role,
            content: record.content,
            sources: sources_from_metadata(record.metadata.as_ref()),
            created_at: record.created_at,
        }
    }
}

fn sources_from_metadata(metadata: Option<&Value>) -> Vec<Value> {
    metadata
        .and_then(|m| m.get("sources"))
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default()
}

pub struct ChatRepository {
    pool: PgPool,
}

impl ChatRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates the session or bumps its `updated_at`.
    pub async fn ensure_session(&self, session_id: Uuid, user_id: Uuid) -> Result<(), ApiError> {
        log_db!("UPSERT", "chat_sessions", session_id);
        sqlx::query(
            "INSERT INTO chat_sessions (id, user_id, title, created_at, updated_at) \
             VALUES ($1, $2, $3, NOW(), NOW()) \
             ON CONFLICT (id) DO UPDATE SET updated_at = NOW()",
        )
        .bind(session_id)
        .bind(user_id)
        .bind(DEFAULT_SESSION_TITLE)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn store_message(&self, session_id: Uuid, role: &str, content: &str, sources: &[Value]) -> Result<Uuid, ApiError> {
        let message_id = Uuid::new_v4();
        log_db!("INSERT", "chat_messages", message_id);
        sqlx::query(
            "INSERT INTO chat_messages (id, session_id, role, content, metadata, created_at) \
             VALUES ($1, $2, $3, $4, $5, NOW())",
        )
        .bind(message_id)
        .bind(session_id)
        .bind(role)
        .bind(content)
        .bind(json!({ "sources": sources }))
        .execute(&self.pool)
        .await?;
        Ok(message_id)
    }

    pub async fn session_owned_by(&self, session_id: Uuid, user_id: Uuid) -> Result<bool, ApiError> {
        let found = sqlx::query_scalar::<_, Uuid>("SELECT id FROM chat_sessions WHERE id = $1 AND user_id = $2")
            .bind(session_id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(found.is_some())
    }

    pub async fn messages(&self, session_id: Uuid) -> Result<Vec<ChatMessage>, ApiError> {
        let rows = sqlx::query_as::<_, MessageRecord>(
            "SELECT id, role, content, metadata, created_at FROM chat_messages \
             WHERE session_id = $1 ORDER BY created_at ASC",
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(ChatMessage::from).collect())
    }

    pub async fn sessions(&self, user_id: Uuid) -> Result<Vec<ChatSessionSummary>, ApiError> {
        let rows = sqlx::query_as::<_, ChatSessionSummary>(
            "SELECT cs.id AS session_id, cs.title, cs.created_at, cs.updated_at, COUNT(cm.id) AS message_count \
             FROM chat_sessions cs \
             LEFT JOIN chat_messages cm ON cs.id = cm.session_id \
             WHERE cs.user_id = $1 \
             GROUP BY cs.id, cs.title, cs.created_at, cs.updated_at \
             ORDER BY cs.updated_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
