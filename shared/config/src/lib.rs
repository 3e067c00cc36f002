pub mod feature_toggles;

use std::env;
use std::str::FromStr;

use feature_toggles::FeatureToggles;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {0}: {1}")]
    Invalid(&'static str, String),
}

/// Settings for the analytics API service.
#[derive(Debug, Clone)]
pub struct ApiSettings {
    pub database_url: String,
    pub allowed_origins: String,
    pub openai_api_key: String,
    pub openai_model: String,
    pub embed_model: String,
    pub rag_table: String,
    pub log_level: String,
    pub port: u16,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub feature_toggles: FeatureToggles,
}

impl ApiSettings {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();

        let database_url = env_opt("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;

        Ok(Self {
            database_url,
            allowed_origins: env_or("ALLOWED_ORIGINS", "http://localhost:3000"),
            openai_api_key: env_or("OPENAI_API_KEY", ""),
            openai_model: env_or("OPENAI_MODEL", "gpt-4o-mini"),
            embed_model: env_or("EMBED_MODEL", "text-embedding-3-small"),
            rag_table: env_or("RAG_TABLE", "rag_chunks4"),
            log_level: env_or("LOG_LEVEL", "info"),
            port: env_parse("API_PORT", 8000)?,
            db_max_connections: env_parse("DB_MAX_CONNECTIONS", 20)?,
            db_min_connections: env_parse("DB_MIN_CONNECTIONS", 5)?,
            feature_toggles: FeatureToggles::from_env_path(),
        })
    }

    /// Comma separated `ALLOWED_ORIGINS` as a list.
    pub fn cors_origins(&self) -> Vec<String> {
        split_origins(&self.allowed_origins)
    }

    pub fn llm_enabled(&self) -> bool {
        !self.openai_api_key.trim().is_empty()
    }
}

/// Settings for the dashboard gateway that fronts the analytics API.
#[derive(Debug, Clone)]
pub struct GatewaySettings {
    pub fastapi_url: String,
    pub port: u16,
    pub default_user_id: String,
    pub default_user_role: String,
    pub upstream_timeout_secs: u64,
    pub allowed_origins: String,
}

/// Identity the dashboard's mocked login hands out.
pub const MOCK_USER_ID: &str = "550e8400-e29b-41d4-a716-446655440000";

impl GatewaySettings {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();

        let fastapi_url = env_or("FASTAPI_URL", "http://localhost:8000")
            .trim_end_matches('/')
            .to_string();
        if !fastapi_url.starts_with("http://") && !fastapi_url.starts_with("https://") {
            return Err(ConfigError::Invalid("FASTAPI_URL", fastapi_url));
        }

        let default_user_role = env_or("DEFAULT_USER_ROLE", "admin");
        if default_user_role != "admin" && default_user_role != "instructor" {
            return Err(ConfigError::Invalid("DEFAULT_USER_ROLE", default_user_role));
        }

        Ok(Self {
            fastapi_url,
            port: env_parse("GATEWAY_PORT", 3000)?,
            default_user_id: env_or("DEFAULT_USER_ID", MOCK_USER_ID),
            default_user_role,
            upstream_timeout_secs: env_parse("UPSTREAM_TIMEOUT_SECS", 30)?,
            allowed_origins: env_or("ALLOWED_ORIGINS", "http://localhost:3000"),
        })
    }

    pub fn cors_origins(&self) -> Vec<String> {
        split_origins(&self.allowed_origins)
    }
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            fastapi_url: "http://localhost:8000".to_string(),
            port: 3000,
            default_user_id: MOCK_USER_ID.to_string(),
            default_user_role: "admin".to_string(),
            upstream_timeout_secs: 30,
            allowed_origins: "http://localhost:3000".to_string(),
        }
    }
}

fn split_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|origin| origin.trim().to_string())
        .filter(|origin| !origin.is_empty())
        .collect()
}

// Settings are read case-insensitively, upper case first.
fn env_opt(name: &str) -> Option<String> {
    env::var(name)
        .or_else(|_| env::var(name.to_lowercase()))
        .ok()
        .filter(|v| !v.trim().is_empty())
}

fn env_or(name: &str, default: &str) -> String {
    env_opt(name).unwrap_or_else(|| default.to_string())
}

fn env_parse<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env_opt(name) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::Invalid(name, raw)),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear(vars: &[&str]) {
        for var in vars {
            env::remove_var(var);
            env::remove_var(var.to_lowercase());
        }
    }

    #[test]
    #[serial]
    fn api_settings_require_database_url() {
        clear(&["DATABASE_URL"]);
        let err = ApiSettings::from_env().unwrap_err();
        assert_eq!(err, ConfigError::Missing("DATABASE_URL"));
    }

    #[test]
    #[serial]
    fn api_settings_defaults() {
        clear(&["ALLOWED_ORIGINS", "API_PORT", "OPENAI_API_KEY", "RAG_TABLE"]);
        env::set_var("DATABASE_URL", "postgres://localhost/classsight");

        let settings = ApiSettings::from_env().unwrap();
        assert_eq!(settings.port, 8000);
        assert_eq!(settings.rag_table, "rag_chunks4");
        assert_eq!(settings.cors_origins(), vec!["http://localhost:3000".to_string()]);
        assert!(!settings.llm_enabled());

        env::remove_var("DATABASE_URL");
    }

    #[test]
    #[serial]
    fn invalid_port_is_reported() {
        env::set_var("DATABASE_URL", "postgres://localhost/classsight");
        env::set_var("API_PORT", "eighty");

        let err = ApiSettings::from_env().unwrap_err();
        assert_eq!(err, ConfigError::Invalid("API_PORT", "eighty".to_string()));

        clear(&["DATABASE_URL", "API_PORT"]);
    }

    #[test]
    #[serial]
    fn gateway_settings_strip_trailing_slash() {
        clear(&["DEFAULT_USER_ROLE", "DEFAULT_USER_ID", "GATEWAY_PORT"]);
        env::set_var("FASTAPI_URL", "http://analytics:8000/");

        let settings = GatewaySettings::from_env().unwrap();
        assert_eq!(settings.fastapi_url, "http://analytics:8000");
        assert_eq!(settings.default_user_id, MOCK_USER_ID);
        assert_eq!(settings.default_user_role, "admin");

        env::remove_var("FASTAPI_URL");
    }

    #[test]
    #[serial]
    fn gateway_rejects_unknown_fallback_role() {
        clear(&["FASTAPI_URL"]);
        env::set_var("DEFAULT_USER_ROLE", "student");

        assert!(matches!(
            GatewaySettings::from_env(),
            Err(ConfigError::Invalid("DEFAULT_USER_ROLE", _))
        ));

        env::remove_var("DEFAULT_USER_ROLE");
    }

    #[test]
    fn origins_are_trimmed() {
        let origins = split_origins(" http://a.test , http://b.test,,");
        assert_eq!(origins, vec!["http://a.test", "http://b.test"]);
    }
}
