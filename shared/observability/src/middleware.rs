//! Request logging middleware.
//!
//! Every request gets a [`TraceContext`] in its extensions, one span and one
//! completion line whose level follows the status code and latency. The
//! request id is echoed back in `x-request-id`.

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::{HeaderName, HeaderValue},
    Error, HttpMessage, HttpRequest,
};
use futures_util::future::LocalBoxFuture;
use std::{
    future::{ready, Ready},
    rc::Rc,
    time::Instant,
};
use tracing::{error, info, span, warn, Instrument, Level};

use crate::trace_context::{TraceContext, REQUEST_ID_HEADER};

#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    pub service_name: String,
    /// Exact paths that are served without logging.
    pub exclude_paths: Vec<String>,
    pub slow_request_threshold_ms: u64,
}

impl ObservabilityConfig {
    pub fn for_service(name: impl Into<String>) -> Self {
        Self {
            service_name: name.into(),
            exclude_paths: vec!["/health".to_string(), "/favicon.ico".to_string()],
            slow_request_threshold_ms: 1000,
        }
    }

    pub fn with_slow_threshold(mut self, ms: u64) -> Self {
        self.slow_request_threshold_ms = ms;
        self
    }

    pub fn exclude_path(mut self, path: impl Into<String>) -> Self {
        self.exclude_paths.push(path.into());
        self
    }

    fn is_excluded(&self, path: &str) -> bool {
        self.exclude_paths.iter().any(|p| p == path)
    }
}

#[derive(Clone)]
pub struct ObservabilityMiddleware {
    config: ObservabilityConfig,
}

impl ObservabilityMiddleware {
    pub fn new(config: ObservabilityConfig) -> Self {
        Self { config }
    }
}

impl<S, B> Transform<S, ServiceRequest> for ObservabilityMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = ObservabilityMiddlewareService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(ObservabilityMiddlewareService {
            service: Rc::new(service),
            config: self.config.clone(),
        }))
    }
}

pub struct ObservabilityMiddlewareService<S> {
    service: Rc<S>,
    config: ObservabilityConfig,
}

impl<S, B> Service<ServiceRequest> for ObservabilityMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let config = self.config.clone();
        let service = self.service.clone();

        Box::pin(async move {
            let path = req.path().to_string();
            if config.is_excluded(&path) {
                return service.call(req).await;
            }

            let method = req.method().to_string();
            let trace_ctx = TraceContext::from_request(req.request()).with_service(&config.service_name);
            req.extensions_mut().insert(trace_ctx.clone());

            let request_span = span!(
                Level::INFO,
                "http_request",
                service = %config.service_name,
                trace_id = %trace_ctx.trace_id,
                method = %method,
                path = %path,
                user_id = trace_ctx.user_id.as_deref().unwrap_or("-"),
            );

            let start = Instant::now();
            let result = service.call(req).instrument(request_span).await;
            let duration_ms = start.elapsed().as_millis() as u64;

            match result {
                Ok(mut res) => {
                    let status = res.status().as_u16();
                    if let Ok(value) = HeaderValue::from_str(&trace_ctx.request_id) {
                        res.headers_mut().insert(HeaderName::from_static(REQUEST_ID_HEADER), value);
                    }

                    if status >= 500 {
                        error!(trace_id = %trace_ctx.trace_id, status, duration_ms, "{} {} -> {} in {}ms", method, path, status, duration_ms);
                    } else if status >= 400 {
                        warn!(trace_id = %trace_ctx.trace_id, status, duration_ms, "{} {} -> {} in {}ms", method, path, status, duration_ms);
                    } else if duration_ms > config.slow_request_threshold_ms {
                        warn!(trace_id = %trace_ctx.trace_id, status, duration_ms, "slow request {} {} -> {} in {}ms", method, path, status, duration_ms);
                    } else {
                        info!(trace_id = %trace_ctx.trace_id, status, duration_ms, "{} {} -> {} in {}ms", method, path, status, duration_ms);
                    }
                    Ok(res)
                }
                Err(e) => {
                    error!(trace_id = %trace_ctx.trace_id, duration_ms, error = %e, "{} {} failed after {}ms", method, path, duration_ms);
                    Err(e)
                }
            }
        })
    }
}

pub fn observability(service_name: impl Into<String>) -> ObservabilityMiddleware {
    ObservabilityMiddleware::new(ObservabilityConfig::for_service(service_name))
}

/// Trace context stored by the middleware, or a fresh one outside of it.
pub fn get_trace_context(req: &HttpRequest) -> TraceContext {
    req.extensions()
        .get::<TraceContext>()
        .cloned()
        .unwrap_or_else(|| TraceContext::from_request(req))
}
