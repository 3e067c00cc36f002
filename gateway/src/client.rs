//! HTTP client for the analytics API.
//!
//! Every call carries `Content-Type: application/json`, the caller's identity
//! headers (or the configured fallback identity) and the caller's trace ids.

use std::time::{Duration, Instant};

use actix_web::HttpRequest;
use classsight_config::GatewaySettings;
use classsight_middleware::{USER_ID_HEADER, USER_ROLE_HEADER};
use classsight_observability::{get_trace_context, log_external_call};
use reqwest::{header::CONTENT_TYPE, Client, Method, RequestBuilder};
use serde::Serialize;
use serde_json::Value;

use crate::errors::UpstreamError;

const SERVICE: &str = "analytics-api";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: String,
    pub role: String,
}

impl Identity {
    /// Headers sent by the caller win; each missing one falls back on its own.
    pub fn resolve(req: &HttpRequest, fallback: &Identity) -> Self {
        let header = |name: &str| {
            req.headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(String::from)
        };

        Self {
            user_id: header(USER_ID_HEADER).unwrap_or_else(|| fallback.user_id.clone()),
            role: header(USER_ROLE_HEADER).unwrap_or_else(|| fallback.role.clone()),
        }
    }
}

/// Raw upstream reply for routes that relay status and body untouched.
#[derive(Debug)]
pub struct RawResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

#[derive(Clone)]
pub struct AnalyticsClient {
    base_url: String,
    client: Client,
    fallback: Identity,
}

impl AnalyticsClient {
    pub fn new(settings: &GatewaySettings) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.upstream_timeout_secs))
            .build()?;

        Ok(Self {
            base_url: settings.fastapi_url.trim_end_matches('/').to_string(),
            client,
            fallback: Identity {
                user_id: settings.default_user_id.clone(),
                role: settings.default_user_role.clone(),
            },
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn request(&self, req: &HttpRequest, method: Method, path: &str) -> RequestBuilder {
        let identity = Identity::resolve(req, &self.fallback);
        let mut builder = self
            .client
            .request(method, self.url(path))
            .header(CONTENT_TYPE, "application/json")
            .header(USER_ID_HEADER, identity.user_id)
            .header(USER_ROLE_HEADER, identity.role);

        for (name, value) in get_trace_context(req).child().to_headers() {
            builder = builder.header(name, value);
        }
        builder
    }

    pub async fn get_json(
        &self,
        req: &HttpRequest,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Value, UpstreamError> {
        self.send_json(self.request(req, Method::GET, path).query(query), path).await
    }

    pub async fn post_json<B: Serialize + ?Sized>(
        &self,
        req: &HttpRequest,
        path: &str,
        body: &B,
    ) -> Result<Value, UpstreamError> {
        self.send_json(self.request(req, Method::POST, path).json(body), path).await
    }

    async fn send_json(&self, builder: RequestBuilder, path: &str) -> Result<Value, UpstreamError> {
        log_external_call!(SERVICE, path);
        let start = Instant::now();

        let response = builder.send().await?;
        let status = response.status().as_u16();
        log_external_call!(SERVICE, path, start.elapsed().as_millis() as u64, status);

        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(path, status, body = %body, "analytics API returned an error");
            return Err(UpstreamError::Status { status, body });
        }

        Ok(response.json::<Value>().await?)
    }

    /// Sends the caller's method and body to `path_and_query`, keeping any status.
    pub async fn forward(
        &self,
        req: &HttpRequest,
        path_and_query: &str,
        body: Vec<u8>,
    ) -> Result<RawResponse, UpstreamError> {
        let method = Method::from_bytes(req.method().as_str().as_bytes()).unwrap_or(Method::GET);
        let mut builder = self.request(req, method, path_and_query);
        if !body.is_empty() {
            builder = builder.body(body);
        }

        log_external_call!(SERVICE, path_and_query);
        let start = Instant::now();
        let response = builder.send().await?;
        let status = response.status().as_u16();
        log_external_call!(SERVICE, path_and_query, start.elapsed().as_millis() as u64, status);

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        let body = response.bytes().await?.to_vec();

        Ok(RawResponse { status, content_type, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    fn fallback() -> Identity {
        Identity { user_id: "fallback-id".into(), role: "admin".into() }
    }

    #[test]
    fn caller_identity_wins() {
        let req = TestRequest::default()
            .insert_header((USER_ID_HEADER, "abc"))
            .insert_header((USER_ROLE_HEADER, "instructor"))
            .to_http_request();
        let identity = Identity::resolve(&req, &fallback());
        assert_eq!(identity, Identity { user_id: "abc".into(), role: "instructor".into() });
    }

    #[test]
    fn missing_headers_fall_back_independently() {
        let req = TestRequest::default()
            .insert_header((USER_ROLE_HEADER, "instructor"))
            .insert_header((USER_ID_HEADER, "  "))
            .to_http_request();
        let identity = Identity::resolve(&req, &fallback());
        assert_eq!(identity.user_id, "fallback-id");
        assert_eq!(identity.role, "instructor");
    }

    #[test]
    fn base_url_loses_trailing_slash() {
        let settings = GatewaySettings { fastapi_url: "http://api.test/".into(), ..GatewaySettings::default() };
        let client = AnalyticsClient::new(&settings).unwrap();
        assert_eq!(client.base_url(), "http://api.test");
        assert_eq!(client.url("/health"), "http://api.test/health");
    }
}
