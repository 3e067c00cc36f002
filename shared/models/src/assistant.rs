use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Backend used to answer an assistant query.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RagSystem {
    /// Text-to-SQL over the analytics tables (V2).
    Sql,
    /// Embedding retrieval over pre-chunked documents (V1).
    Vector,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantQuery {
    pub session_id: Option<Uuid>,
    pub query: String,
    pub kb: Option<String>,
    pub bootcamp_id: Option<i32>,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub rag_system: Option<RagSystem>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AssistantReply {
    pub session_id: Uuid,
    pub answer: String,
    #[serde(default)]
    pub sources: Vec<Value>,
    pub tokens_used: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub message_id: Uuid,
    pub role: String,
    pub content: String,
    pub sources: Vec<Value>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatHistory {
    pub session_id: Uuid,
    pub messages: Vec<ChatMessage>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
pub struct ChatSessionSummary {
    pub session_id: Uuid,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub message_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatSessions {
    pub sessions: Vec<ChatSessionSummary>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_accepts_minimal_body() {
        let q: AssistantQuery = serde_json::from_str(r#"{"query":"who has the best attendance?"}"#).unwrap();
        assert!(q.session_id.is_none());
        assert!(q.rag_system.is_none());
    }

    #[test]
    fn rag_system_is_lowercase() {
        let q: AssistantQuery =
            serde_json::from_str(r#"{"query":"q","rag_system":"vector","session_id":null}"#).unwrap();
        assert_eq!(q.rag_system, Some(RagSystem::Vector));
    }
}
