//! Retrieval over pre-embedded chunks in a pgvector table.

use std::sync::Arc;

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use classsight_observability::log_db;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Value};
use sqlx::PgPool;

use super::llm::LanguageModel;
use super::memory::{ConversationMemory, PROMPT_TURNS};
use super::{RagAnswer, RagEngine};

const TOP_K: i64 = 50;
const MAX_SOURCES: usize = 5;
const PREVIEW_CHARS: usize = 200;
const UNDEFINED_TABLE: &str = "42P01";
const ARCHIVE_SCHEMA: &str = "archive";

pub const NO_CONTEXT_ANSWER: &str = "No relevant information was found in the knowledge base.";

static IDENTIFIER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap());

#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    pub text: String,
    pub metadata: Value,
}

pub fn is_identifier(name: &str) -> bool {
    IDENTIFIER.is_match(name)
}

/// Unit length; a zero vector is returned unchanged.
pub fn normalize(embedding: &[f32]) -> Vec<f32> {
    let norm = embedding.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm == 0.0 {
        return embedding.to_vec();
    }
    embedding.iter().map(|v| v / norm).collect()
}

/// pgvector text form, e.g. `[0.6,0.8]`.
pub fn vector_literal(embedding: &[f32]) -> String {
    let values = embedding.iter().map(|v| v.to_string()).collect::<Vec<_>>().join(",");
    format!("[{}]", values)
}

pub fn preview(text: &str) -> String {
    if text.chars().count() > PREVIEW_CHARS {
        format!("{}...", text.chars().take(PREVIEW_CHARS).collect::<String>())
    } else {
        text.to_string()
    }
}

pub fn build_prompt(today: NaiveDate, memory: &str, chunks: &[Chunk], question: &str) -> String {
    let context = chunks
        .iter()
        .map(|c| format!("- {}", c.text))
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        "You are a precise assistant. Today is {today}. Use only the following context to answer the question.\n\
         The context may include individual assessments or units, bootcamp summaries, and attendance breakdowns.\n\
         Use only what is relevant. Always check whether the student has taken the unit or is enrolled in the bootcamp.\n\
         Do not mention the calculations you did in your final output.\n\n\
         Memory:\n{memory}\n\n\
         Context:\n{context}\n\n\
         Question:\n{question}\n\n\
         Answer:",
        today = today.format("%Y-%m-%d"),
        memory = memory,
        context = context,
        question = question,
    )
}

pub fn chunk_sources(chunks: &[Chunk]) -> Vec<Value> {
    chunks
        .iter()
        .take(MAX_SOURCES)
        .enumerate()
        .map(|(i, chunk)| {
            json!({
                "type": "document_chunk",
                "content": preview(&chunk.text),
                "metadata": chunk.metadata,
                "relevance_rank": i + 1,
            })
        })
        .collect()
}

pub struct VectorRag {
    pool: PgPool,
    llm: Arc<dyn LanguageModel>,
    memory: ConversationMemory,
    table: String,
}

impl VectorRag {
    pub fn new(pool: PgPool, llm: Arc<dyn LanguageModel>, table: impl Into<String>) -> Result<Self> {
        let table = table.into();
        if !is_identifier(&table) {
            bail!("invalid vector table name: {}", table);
        }
        Ok(Self {
            pool,
            llm,
            memory: ConversationMemory::default(),
            table,
        })
    }

    async fn search(&self, table: &str, literal: &str) -> Result<Vec<Chunk>, sqlx::Error> {
        log_db!("SELECT", table);
        let sql = format!(
            "SELECT chunk_text, metadata::jsonb AS metadata FROM {} ORDER BY embedding <#> $1::vector LIMIT $2",
            table
        );
        let rows = sqlx::query_as::<_, (String, Option<Value>)>(&sql)
            .bind(literal)
            .bind(TOP_K)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .map(|(text, metadata)| Chunk {
                text,
                metadata: metadata.unwrap_or(Value::Null),
            })
            .collect())
    }

    /// Nearest chunks by inner product; falls back to the archive schema when the table is missing.
    pub async fn top_chunks(&self, question: &str) -> Result<Vec<Chunk>> {
        let embedding = normalize(&self.llm.embed(question).await?);
        let literal = vector_literal(&embedding);

        match self.search(&self.table, &literal).await {
            Ok(chunks) => Ok(chunks),
            Err(sqlx::Error::Database(db)) if db.code().as_deref() == Some(UNDEFINED_TABLE) => {
                tracing::warn!(table = %self.table, "vector table missing, trying {} schema", ARCHIVE_SCHEMA);
                let archived = format!("{}.{}", ARCHIVE_SCHEMA, self.table);
                Ok(self.search(&archived, &literal).await?)
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl RagEngine for VectorRag {
    fn name(&self) -> &'static str {
        "vector"
    }

    async fn answer(&self, question: &str) -> Result<RagAnswer> {
        let chunks = self.top_chunks(question).await?;
        if chunks.is_empty() {
            return Ok(RagAnswer {
                answer: NO_CONTEXT_ANSWER.to_string(),
                sources: Vec::new(),
            });
        }

        let prompt = build_prompt(
            Utc::now().date_naive(),
            &self.memory.render(PROMPT_TURNS),
            &chunks,
            question,
        );
        let answer = self.llm.complete("", &prompt).await?;
        self.memory.remember(question, answer.clone());

        Ok(RagAnswer {
            answer,
            sources: chunk_sources(&chunks),
        })
    }
}
