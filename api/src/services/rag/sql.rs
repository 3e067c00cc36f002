//! Text-to-SQL answering over the analytics tables.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use classsight_observability::{log_db, log_retry};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Value};
use sqlx::PgPool;
use thiserror::Error;
use tokio::sync::OnceCell;

use super::llm::LanguageModel;
use super::memory::{ConversationMemory, PROMPT_TURNS};
use super::{RagAnswer, RagEngine};

/// Tables described to the model.
pub const ANALYTICS_TABLES: &[&str] = &[
    "students",
    "units",
    "grades",
    "attendance",
    "bootcamps",
    "assessments",
    "grades_summary",
    "classroom_synthetic_data_filtered",
];

const SAMPLE_ROWS: i64 = 10;
const STATEMENT_TIMEOUT_MS: u32 = 5000;
const DEFAULT_LIMIT: u32 = 200;

pub const SQL_SYSTEM_INSTRUCTIONS: &str = "You are a careful SQL writer.
- Output ONLY a single SQL statement that answers the user's question.
- Use ANSI SQL compatible with PostgreSQL.
- It must be a single SELECT query (no DDL/DML, no CTEs that modify data).
- Prefer JOINs using the schema; avoid guessing column names that don't exist.
- Use ILIKE with wildcards for fuzzy text (e.g., ILIKE '%' || term || '%') when helpful.
- Always include an ORDER BY where relevant and a LIMIT (<= 100) to cap rows.
- Do not wrap the SQL in code fences or add commentary.
- If multiple rows tie for the same top score / value / result, return all of them.
- When asked for average attendance, give percentages.
";

const ANALYST_INSTRUCTIONS: &str = "You are a precise analyst. Use the provided rows and context to answer succinctly. \
Always check whether the student has taken the unit or is enrolled in the bootcamp. \
Do not mention the SQL query in your final output.";

pub const NO_DATA_ANSWER: &str =
    "No relevant data found. Please check that you entered the correct student name, bootcamp, or unit title.";

pub const RETRY_FAILED_ANSWER: &str = "I encountered an error while processing your query. \
Please try rephrasing your question or contact support if the issue persists.";

static FORBIDDEN_KEYWORDS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(INSERT|UPDATE|DELETE|DROP|TRUNCATE|ALTER|CREATE|GRANT|REVOKE|MERGE)\b").unwrap()
});
static LEADING_SELECT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^\s*SELECT\b").unwrap());
static HAS_LIMIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bLIMIT\s+\d+\b").unwrap());
static CODE_FENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?im)^```(?:sql)?|```$").unwrap());
static TABLE_REF: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\b(?:FROM|JOIN)\s+(\w+)").unwrap());

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SqlGuardError {
    #[error("Unsafe SQL detected. Only SELECT queries are allowed.")]
    Unsafe,
    #[error("Only a single SELECT statement is allowed.")]
    NotSelect,
    #[error("Multiple statements detected. Provide exactly one SELECT.")]
    MultipleStatements,
}

pub fn strip_code_fences(raw: &str) -> String {
    CODE_FENCE.replace_all(raw.trim(), "").trim().to_string()
}

/// Removes `--` comments outside string literals so nothing appended later is commented out.
pub fn strip_line_comments(sql: &str) -> String {
    let mut out = String::with_capacity(sql.len());
    let mut chars = sql.chars().peekable();
    let mut in_string = false;

    while let Some(c) = chars.next() {
        if c == '\'' {
            in_string = !in_string;
        } else if c == '-' && !in_string && chars.peek() == Some(&'-') {
            while chars.peek().is_some_and(|next| *next != '\n') {
                chars.next();
            }
            continue;
        }
        out.push(c);
    }

    out.lines().map(str::trim_end).filter(|line| !line.is_empty()).collect::<Vec<_>>().join("\n")
}

/// Accepts exactly one SELECT and caps it with `LIMIT 200` when it has no limit.
pub fn sanitize_sql(sql: &str) -> Result<String, SqlGuardError> {
    let sql = strip_line_comments(sql);
    let sql = sql.as_str();
    if FORBIDDEN_KEYWORDS.is_match(sql) {
        return Err(SqlGuardError::Unsafe);
    }
    if !LEADING_SELECT.is_match(sql) {
        return Err(SqlGuardError::NotSelect);
    }

    // A single trailing semicolon is allowed.
    let trimmed = sql.trim();
    let body = trimmed.strip_suffix(';').unwrap_or(trimmed);
    if body.contains(';') {
        return Err(SqlGuardError::MultipleStatements);
    }

    if HAS_LIMIT.is_match(sql) {
        Ok(sql.to_string())
    } else {
        Ok(format!("{} LIMIT {};", body.trim_end(), DEFAULT_LIMIT))
    }
}

/// Table names after FROM / JOIN, first occurrence order.
pub fn extract_table_names(sql: &str) -> Vec<String> {
    let mut tables: Vec<String> = Vec::new();
    for cap in TABLE_REF.captures_iter(sql) {
        let name = cap[1].to_string();
        if !tables.contains(&name) {
            tables.push(name);
        }
    }
    tables
}

/// Wraps a sanitized SELECT so the rows come back as one JSON array.
pub fn wrap_as_json(sql: &str) -> String {
    let body = sql.trim().trim_end_matches(';').trim_end();
    format!("SELECT COALESCE(json_agg(t), '[]'::json) FROM ({}\n) t", body)
}

pub fn render_table(name: &str, columns: &[(String, String, String)], fks: &[(String, String, String)], samples: &Value) -> String {
    let cols = columns
        .iter()
        .map(|(column, data_type, nullable)| {
            format!("{} {}{}", column, data_type, if nullable == "YES" { " NULL" } else { "" })
        })
        .collect::<Vec<_>>()
        .join(", ");
    let fk_str = if fks.is_empty() {
        "None".to_string()
    } else {
        fks.iter()
            .map(|(column, table, target)| format!("{} -> {}.{}", column, table, target))
            .collect::<Vec<_>>()
            .join("; ")
    };
    format!("TABLE {}\n  COLUMNS: {}\n  FKs: {}\n  SAMPLES: {}", name, cols, fk_str, samples)
}

/// Runs one statement in a read-only transaction with a statement timeout.
pub async fn run_readonly(pool: &PgPool, sql: &str) -> Result<Vec<Value>, sqlx::Error> {
    log_db!("SELECT", "sql_rag");
    let mut tx = pool.begin().await?;
    sqlx::query("SET TRANSACTION READ ONLY").execute(&mut *tx).await?;
    sqlx::query(&format!("SET LOCAL statement_timeout = {}", STATEMENT_TIMEOUT_MS))
        .execute(&mut *tx)
        .await?;

    let rows = sqlx::query_scalar::<_, Value>(&wrap_as_json(sql)).fetch_one(&mut *tx).await?;
    tx.rollback().await?;

    Ok(match rows {
        Value::Array(rows) => rows,
        _ => Vec::new(),
    })
}

pub struct SqlRag {
    pool: PgPool,
    llm: Arc<dyn LanguageModel>,
    memory: ConversationMemory,
    schema: OnceCell<String>,
}

impl SqlRag {
    pub fn new(pool: PgPool, llm: Arc<dyn LanguageModel>) -> Self {
        Self {
            pool,
            llm,
            memory: ConversationMemory::default(),
            schema: OnceCell::new(),
        }
    }

    /// Columns, foreign keys and sample rows of the analytics tables; built once per process.
    pub async fn schema_snapshot(&self) -> Result<&str> {
        let snapshot = self
            .schema
            .get_or_try_init(|| async { self.load_schema().await })
            .await?;
        Ok(snapshot.as_str())
    }

    async fn load_schema(&self) -> Result<String> {
        log_db!("SELECT", "information_schema.tables");
        let wanted: Vec<String> = ANALYTICS_TABLES.iter().map(|t| t.to_string()).collect();
        let tables = sqlx::query_scalar::<_, String>(
            "SELECT table_name::text FROM information_schema.tables \
             WHERE table_schema = 'public' AND table_name = ANY($1) ORDER BY table_name",
        )
        .bind(&wanted)
        .fetch_all(&self.pool)
        .await?;

        let mut parts = Vec::with_capacity(tables.len());
        for table in &tables {
            let columns = sqlx::query_as::<_, (String, String, String)>(
                "SELECT column_name::text, data_type::text, is_nullable::text \
                 FROM information_schema.columns \
                 WHERE table_schema = 'public' AND table_name = $1 ORDER BY ordinal_position",
            )
            .bind(table)
            .fetch_all(&self.pool)
            .await?;

            let fks = sqlx::query_as::<_, (String, String, String)>(
                "SELECT kcu.column_name::text, ccu.table_name::text, ccu.column_name::text \
                 FROM information_schema.table_constraints tc \
                 JOIN information_schema.key_column_usage kcu \
                   ON tc.constraint_name = kcu.constraint_name AND tc.table_schema = kcu.table_schema \
                 JOIN information_schema.constraint_column_usage ccu \
                   ON ccu.constraint_name = tc.constraint_name AND ccu.table_schema = tc.table_schema \
                 WHERE tc.table_schema = 'public' AND tc.table_name = $1 AND tc.constraint_type = 'FOREIGN KEY'",
            )
            .bind(table)
            .fetch_all(&self.pool)
            .await?;

            // Table names come from ANALYTICS_TABLES only.
            let samples = sqlx::query_scalar::<_, Value>(&format!(
                "SELECT COALESCE(json_agg(t), '[]'::json) FROM (SELECT * FROM \"{}\" LIMIT {}) t",
                table, SAMPLE_ROWS
            ))
            .fetch_one(&self.pool)
            .await?;

            parts.push(render_table(table, &columns, &fks, &samples));
        }

        tracing::info!(tables = parts.len(), "SQL RAG schema snapshot cached");
        Ok(parts.join("\n\n"))
    }

    async fn generate_sql(&self, prompt: &str) -> Result<String> {
        let raw = self.llm.complete(SQL_SYSTEM_INSTRUCTIONS, prompt).await?;
        Ok(strip_code_fences(&raw))
    }

    async fn summarize(&self, question: &str, sql: &str, rows: &[Value]) -> Result<String> {
        if rows.is_empty() {
            return Ok(NO_DATA_ANSWER.to_string());
        }
        let prompt = format!(
            "Conversation so far:\n{}\n\nCurrent Question: {}\nSQL: {}\nRows: {}",
            self.memory.render(PROMPT_TURNS),
            question,
            sql,
            Value::Array(rows.to_vec())
        );
        let answer = self.llm.complete(ANALYST_INSTRUCTIONS, &prompt).await?;
        self.memory.remember(question, answer.clone());
        Ok(answer)
    }

    async fn execute_and_answer(&self, question: &str, sql: &str, retry: bool) -> Result<RagAnswer> {
        let rows = run_readonly(&self.pool, sql).await?;
        let answer = self.summarize(question, sql, &rows).await?;

        let mut sources = Vec::new();
        if !rows.is_empty() {
            let mut source = json!({
                "type": "database_query",
                "sql": sql,
                "row_count": rows.len(),
                "tables_used": extract_table_names(sql),
            });
            if retry {
                source["retry"] = Value::Bool(true);
            }
            sources.push(source);
        }
        Ok(RagAnswer { answer, sources })
    }

    async fn retry(&self, question: &str, schema: &str, error: &str) -> Result<RagAnswer> {
        let prompt = format!(
            "Schema:\n{}\n\nQuestion:\n{}\n\nThe previous SQL failed with error:\n{}\n\n\
             Revise and return ONLY a safe single SELECT with LIMIT.",
            schema, question, error
        );
        let sql = sanitize_sql(&self.generate_sql(&prompt).await?)?;
        self.execute_and_answer(question, &sql, true).await
    }
}

#[async_trait]
impl RagEngine for SqlRag {
    fn name(&self) -> &'static str {
        "sql"
    }

    /// Errors only when the schema or the first SQL draft cannot be produced.
    async fn answer(&self, question: &str) -> Result<RagAnswer> {
        let schema = self.schema_snapshot().await?;
        let generated = self
            .generate_sql(&format!("Schema:\n{}\n\nQuestion:\n{}", schema, question))
            .await?;

        let sql = match sanitize_sql(&generated) {
            Ok(sql) => sql,
            Err(e) => {
                return Ok(RagAnswer {
                    answer: format!("Failed to validate SQL. Error: {}", e),
                    sources: Vec::new(),
                })
            }
        };

        match self.execute_and_answer(question, &sql, false).await {
            Ok(answer) => Ok(answer),
            Err(first) => {
                log_retry!("sql_rag", 1, 1, first);
                match self.retry(question, schema, &first.to_string()).await {
                    Ok(answer) => Ok(answer),
                    Err(e) => {
                        tracing::warn!(error = %e, "SQL RAG retry failed");
                        Ok(RagAnswer {
                            answer: RETRY_FAILED_ANSWER.to_string(),
                            sources: Vec::new(),
                        })
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_writes() {
        assert_eq!(sanitize_sql("DELETE FROM grades"), Err(SqlGuardError::Unsafe));
        assert_eq!(
            sanitize_sql("SELECT * FROM students; drop table students"),
            Err(SqlGuardError::Unsafe)
        );
        assert_eq!(sanitize_sql("select 1 where 'x' = 'update'"), Err(SqlGuardError::Unsafe));
    }

    #[test]
    fn requires_single_select() {
        assert_eq!(sanitize_sql("WITH x AS (SELECT 1) SELECT * FROM x"), Err(SqlGuardError::NotSelect));
        assert_eq!(
            sanitize_sql("SELECT 1; SELECT 2;"),
            Err(SqlGuardError::MultipleStatements)
        );
    }

    #[test]
    fn appends_limit_when_missing() {
        assert_eq!(
            sanitize_sql("SELECT full_name FROM students;").unwrap(),
            "SELECT full_name FROM students LIMIT 200;"
        );
        assert_eq!(
            sanitize_sql("select * from grades limit 5").unwrap(),
            "select * from grades limit 5"
        );
    }

    #[test]
    fn trailing_comments_do_not_swallow_wrapping() {
        let sql = sanitize_sql("SELECT full_name FROM students -- all of them\n-- sorted later").unwrap();
        assert_eq!(sql, "SELECT full_name FROM students LIMIT 200;");
        assert_eq!(
            wrap_as_json(&sql),
            "SELECT COALESCE(json_agg(t), '[]'::json) FROM (SELECT full_name FROM students LIMIT 200\n) t"
        );

        let limited = sanitize_sql("SELECT * FROM grades LIMIT 5 -- top five").unwrap();
        assert!(wrap_as_json(&limited).ends_with("LIMIT 5\n) t"));

        assert_eq!(
            strip_line_comments("SELECT '--not a comment' AS s -- note"),
            "SELECT '--not a comment' AS s"
        );
    }

    #[test]
    fn strips_fences() {
        assert_eq!(strip_code_fences("```sql\nSELECT 1\n```"), "SELECT 1");
        assert_eq!(strip_code_fences("SELECT 2"), "SELECT 2");
    }

    #[test]
    fn table_names_deduplicated() {
        let tables = extract_table_names(
            "SELECT * FROM grades g JOIN students s ON s.student_id = g.student_id JOIN grades g2 ON true",
        );
        assert_eq!(tables, vec!["grades", "students"]);
    }

    #[test]
    fn wraps_without_trailing_semicolon() {
        assert_eq!(
            wrap_as_json("SELECT 1 LIMIT 200;"),
            "SELECT COALESCE(json_agg(t), '[]'::json) FROM (SELECT 1 LIMIT 200\n) t"
        );
    }

    #[test]
    fn renders_schema_block() {
        let columns = vec![
            ("student_id".to_string(), "integer".to_string(), "NO".to_string()),
            ("full_name".to_string(), "text".to_string(), "YES".to_string()),
        ];
        let fks = vec![("bootcamp_id".to_string(), "bootcamps".to_string(), "bootcamp_id".to_string())];
        let block = render_table("students", &columns, &fks, &json!([]));
        assert_eq!(
            block,
            "TABLE students\n  COLUMNS: student_id integer, full_name text NULL\n  FKs: bootcamp_id -> bootcamps.bootcamp_id\n  SAMPLES: []"
        );
        assert!(render_table("units", &[], &[], &json!([])).contains("FKs: None"));
    }
}
