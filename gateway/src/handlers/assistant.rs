use actix_web::{web, HttpRequest, HttpResponse};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::errors::UpstreamError;
use crate::state::GatewayState;

const DEFAULT_RAG_SYSTEM: &str = "vector";
const APOLOGY: &str =
    "I apologize, but I encountered an error processing your request. Please try again later.";

/// Chat message as posted by the assistant page. `conversation_history` is
/// accepted but not forwarded.
#[derive(Debug, Deserialize)]
struct ChatMessage {
    message: Option<String>,
    rag_system: Option<String>,
}

fn upstream_query(msg: &ChatMessage) -> Value {
    let rag_system = msg
        .rag_system
        .as_deref()
        .filter(|s| !s.is_empty())
        .unwrap_or(DEFAULT_RAG_SYSTEM);
    json!({
        "query": msg.message,
        "rag_system": rag_system,
        "session_id": null,
        "bootcamp_id": null,
    })
}

fn reply(data: &Value) -> Value {
    json!({
        "response": data.get("answer").cloned().unwrap_or(Value::Null),
        "sources": data.get("sources").filter(|s| !s.is_null()).cloned().unwrap_or_else(|| json!([])),
        "session_id": data.get("session_id").cloned().unwrap_or(Value::Null),
    })
}

fn failure() -> HttpResponse {
    HttpResponse::InternalServerError().json(json!({
        "error": "Failed to process request",
        "response": APOLOGY,
        "sources": [],
    }))
}

async fn ask(state: web::Data<GatewayState>, req: HttpRequest, body: web::Bytes) -> HttpResponse {
    let msg: ChatMessage = match serde_json::from_slice(&body) {
        Ok(msg) => msg,
        Err(e) => {
            tracing::warn!(error = %e, "unreadable assistant request");
            return failure();
        }
    };

    match state.client.post_json(&req, "/assistant/query", &upstream_query(&msg)).await {
        Ok(data) => HttpResponse::Ok().json(reply(&data)),
        Err(e) => {
            if let UpstreamError::Status { status, body } = &e {
                tracing::error!(status, body = %body, "assistant query rejected");
            } else {
                tracing::error!(error = %e, "assistant query failed");
            }
            failure()
        }
    }
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/assistant", web::post().to(ask));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_vector_rag() {
        let msg = ChatMessage { message: Some("hi".into()), rag_system: Some(String::new()) };
        let body = upstream_query(&msg);
        assert_eq!(body["rag_system"], "vector");
        assert_eq!(body["query"], "hi");
        assert!(body["session_id"].is_null());

        let msg = ChatMessage { message: Some("hi".into()), rag_system: Some("sql".into()) };
        assert_eq!(upstream_query(&msg)["rag_system"], "sql");
    }

    #[test]
    fn reply_renames_answer() {
        let shaped = reply(&json!({ "answer": "42", "session_id": "s-1", "sources": null }));
        assert_eq!(shaped, json!({ "response": "42", "sources": [], "session_id": "s-1" }));
    }
}
