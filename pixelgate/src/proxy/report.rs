use super::ProxyError;
use crate::prelude::*;
use hyper::header::{HeaderValue, CACHE_CONTROL, CONTENT_TYPE, X_CONTENT_TYPE_OPTIONS};
use hyper::{Body, Response, StatusCode};

/// Renders the terminal not-found response for a failed request.
pub trait Reporter: Send + Sync {
    fn not_found(&self, original_url: &str, error: &ProxyError) -> Response<Body>;
}

/// Logs the failure and answers with a plain-text 404.
#[derive(Debug, Default, Clone, Copy)]
pub struct NotFoundReporter;

impl Reporter for NotFoundReporter {
    fn not_found(&self, original_url: &str, error: &ProxyError) -> Response<Body> {
        match error {
            ProxyError::Aborted => debug!("[{}] {} ({})", error.kind(), error, original_url),
            _ => error!("[{}] {} ({})", error.kind(), error, original_url),
        }

        let mut response = Response::new(Body::from("Not Found"));
        *response.status_mut() = StatusCode::NOT_FOUND;
        let headers = response.headers_mut();
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        );
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache, no-store"));
        headers.insert(X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
        response
    }
}
