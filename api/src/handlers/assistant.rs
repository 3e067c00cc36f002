use actix_web::{web, HttpResponse};
use classsight_middleware::CurrentUser;
use classsight_models::assistant::{AssistantQuery, AssistantReply, ChatHistory, ChatSessions};
use uuid::Uuid;

use crate::errors::ApiError;
use crate::repositories::chat::ANONYMOUS_USER;
use crate::repositories::ChatRepository;
use crate::state::AppState;

/// Open to unauthenticated callers; sessions are filed under the anonymous user.
async fn query_assistant(
    state: web::Data<AppState>,
    body: web::Json<AssistantQuery>,
) -> Result<HttpResponse, ApiError> {
    let query = body.into_inner();
    if query.query.trim().is_empty() {
        return Err(ApiError::Validation("Query cannot be empty".to_string()));
    }

    let session_id = query.session_id.unwrap_or_else(Uuid::new_v4);
    let chat = ChatRepository::new(state.pool.clone());
    chat.ensure_session(session_id, ANONYMOUS_USER).await?;
    chat.store_message(session_id, "user", &query.query, &[]).await?;

    let reply = state.assistant.dispatch(&query.query, query.rag_system).await;
    chat.store_message(session_id, "assistant", &reply.answer, &reply.sources)
        .await?;

    tracing::info!(
        session_id = %session_id,
        rag_system = ?query.rag_system,
        sources = reply.sources.len(),
        "assistant answered"
    );

    Ok(HttpResponse::Ok().json(AssistantReply {
        session_id,
        answer: reply.answer,
        sources: reply.sources,
        tokens_used: None,
    }))
}

async fn session_messages(
    state: web::Data<AppState>,
    user: CurrentUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    let session_id = path.into_inner();
    let chat = ChatRepository::new(state.pool.clone());
    if !chat.session_owned_by(session_id, user.user_id).await? {
        return Err(ApiError::not_found("Chat session not found"));
    }

    Ok(HttpResponse::Ok().json(ChatHistory {
        session_id,
        messages: chat.messages(session_id).await?,
    }))
}

async fn sessions(state: web::Data<AppState>, user: CurrentUser) -> Result<HttpResponse, ApiError> {
    let sessions = ChatRepository::new(state.pool.clone()).sessions(user.user_id).await?;
    Ok(HttpResponse::Ok().json(ChatSessions { sessions }))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/assistant")
            .route("/query", web::post().to(query_assistant))
            .route("/sessions", web::get().to(sessions))
            .route("/sessions/{session_id}/messages", web::get().to(session_messages)),
    );
}
