//! Logging macros with fixed targets so filters like `RUST_LOG=database=debug` work.

/// Database access.
#[macro_export]
macro_rules! log_db {
    ($operation:expr, $table:expr) => {
        tracing::debug!(target: "database", operation = $operation, table = $table, "db operation");
    };
    ($operation:expr, $table:expr, $id:expr) => {
        tracing::debug!(target: "database", operation = $operation, table = $table, id = ?$id, "db operation");
    };
}

/// Outgoing call to another service (upstream API, LLM provider).
#[macro_export]
macro_rules! log_external_call {
    ($service:expr, $endpoint:expr) => {
        tracing::debug!(target: "external", service = $service, endpoint = %$endpoint, "calling external service");
    };
    ($service:expr, $endpoint:expr, $duration_ms:expr, $status:expr) => {
        tracing::info!(target: "external", service = $service, endpoint = %$endpoint, duration_ms = $duration_ms, status = $status, "external call completed");
    };
}

/// Feature toggle evaluation.
#[macro_export]
macro_rules! log_feature {
    ($feature:expr, $enabled:expr) => {
        tracing::debug!(target: "features", feature = $feature, enabled = $enabled, "feature check");
    };
}

#[macro_export]
macro_rules! log_retry {
    ($operation:expr, $attempt:expr, $max_attempts:expr, $error:expr) => {
        tracing::warn!(target: "retry", operation = $operation, attempt = $attempt, max_attempts = $max_attempts, error = %$error, "retrying after error");
    };
}

/// Rejected identity or access attempt.
#[macro_export]
macro_rules! log_security {
    ($event:expr) => {
        tracing::warn!(target: "security", event = $event, "security event");
    };
    ($event:expr, $($key:ident = $value:expr),* $(,)?) => {
        tracing::warn!(target: "security", event = $event, $($key = ?$value),*, "security event");
    };
}
