//! Assistant backends and the dispatcher that picks between them.

pub mod llm;
pub mod memory;
pub mod sql;
pub mod vector;

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use classsight_config::ApiSettings;
use classsight_models::assistant::RagSystem;
use classsight_observability::log_feature;
use serde_json::Value;
use sqlx::PgPool;

pub use llm::{LanguageModel, OpenAiModel};
pub use sql::SqlRag;
pub use vector::VectorRag;

pub const VECTOR_UNAVAILABLE: &str =
    "I apologize, but the Vector RAG system (V1) is not available at the moment. Please try using V2 instead.";
pub const BOTH_UNAVAILABLE: &str = "I apologize, but both AI systems are currently unavailable. \
Please try again later or contact support if the issue persists.";
pub const FALLBACK_NOTE: &str =
    "\n\n*Note: Answered using backup system (V1) due to primary system unavailability.*";

#[derive(Debug, Clone, PartialEq)]
pub struct RagAnswer {
    pub answer: String,
    pub sources: Vec<Value>,
}

#[async_trait]
pub trait RagEngine: Send + Sync {
    fn name(&self) -> &'static str;

    async fn answer(&self, question: &str) -> Result<RagAnswer>;
}

/// Routes questions to the SQL engine first and the vector engine as backup.
pub struct Assistant {
    sql: Option<Arc<dyn RagEngine>>,
    vector: Option<Arc<dyn RagEngine>>,
}

impl Assistant {
    pub fn new(sql: Option<Arc<dyn RagEngine>>, vector: Option<Arc<dyn RagEngine>>) -> Self {
        Self { sql, vector }
    }

    pub fn disabled() -> Self {
        Self::new(None, None)
    }

    pub fn from_settings(pool: &PgPool, settings: &ApiSettings) -> Self {
        if !settings.llm_enabled() {
            tracing::warn!("OPENAI_API_KEY not set, assistant disabled");
            return Self::disabled();
        }

        let llm: Arc<dyn LanguageModel> = Arc::new(OpenAiModel::new(
            &settings.openai_api_key,
            settings.openai_model.clone(),
            settings.embed_model.clone(),
        ));
        let toggles = &settings.feature_toggles;

        let sql_enabled = toggles.sql_rag_enabled();
        log_feature!("SqlRag", sql_enabled);
        let sql = sql_enabled.then(|| Arc::new(SqlRag::new(pool.clone(), llm.clone())) as Arc<dyn RagEngine>);

        let vector_enabled = toggles.vector_rag_enabled();
        log_feature!("VectorRag", vector_enabled);
        let vector = if vector_enabled {
            match VectorRag::new(pool.clone(), llm, settings.rag_table.clone()) {
                Ok(engine) => Some(Arc::new(engine) as Arc<dyn RagEngine>),
                Err(e) => {
                    tracing::warn!(error = %e, "Vector RAG disabled");
                    None
                }
            }
        } else {
            None
        };

        Self::new(sql, vector)
    }

    pub fn sql_available(&self) -> bool {
        self.sql.is_some()
    }

    pub fn vector_available(&self) -> bool {
        self.vector.is_some()
    }

    /// Always yields an answer; backend failures become apology text.
    pub async fn dispatch(&self, question: &str, requested: Option<RagSystem>) -> RagAnswer {
        if requested == Some(RagSystem::Vector) {
            return match &self.vector {
                None => apology(VECTOR_UNAVAILABLE),
                Some(engine) => match engine.answer(question).await {
                    Ok(answer) => answer,
                    Err(e) => {
                        tracing::error!(error = %e, "Vector RAG failed");
                        apology(&format!(
                            "I apologize, but the Vector RAG system (V1) encountered an error. \
                             Please try using V2 instead. Error: {}",
                            e
                        ))
                    }
                },
            };
        }

        if let Some(engine) = &self.sql {
            match engine.answer(question).await {
                Ok(answer) => return answer,
                Err(e) => tracing::warn!(error = %e, "SQL RAG failed, falling back to vector search"),
            }
        }

        match &self.vector {
            Some(engine) => match engine.answer(question).await {
                Ok(mut answer) => {
                    answer.answer.push_str(FALLBACK_NOTE);
                    answer
                }
                Err(e) => {
                    tracing::error!(error = %e, "Vector RAG fallback failed");
                    apology(BOTH_UNAVAILABLE)
                }
            },
            None => apology(BOTH_UNAVAILABLE),
        }
    }
}

fn apology(text: &str) -> RagAnswer {
    RagAnswer {
        answer: text.to_string(),
        sources: Vec::new(),
    }
}
