use super::fetcher::OriginFetcher;
use super::report::Reporter;
use super::streamer::{self, OriginBody};
use super::{guard, redirect, ProxyError};
use crate::app::metrics::Metrics;
use crate::config::ProxyConfig;
use crate::prelude::*;
use hyper::header::{HeaderMap, HeaderName, CONTENT_LENGTH, CONTENT_TYPE, LOCATION};
use hyper::{Body, Response};
use std::borrow::Cow;
use tokio_util::sync::CancellationToken;

/// How a single hop ended when it did not fail.
enum Hop {
    /// The client response is decided; no further hop runs.
    Finished(Response<Body>),
    Redirect(TargetUrl),
}

/// Resolves a client request into exactly one client response.
pub struct Pipeline {
    config: Arc<ProxyConfig>,
    fetcher: OriginFetcher,
    reporter: Arc<dyn Reporter>,
    metrics: Arc<Metrics>,
}

impl Pipeline {
    pub fn new(
        config: Arc<ProxyConfig>,
        fetcher: OriginFetcher,
        reporter: Arc<dyn Reporter>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            config,
            fetcher,
            reporter,
            metrics,
        }
    }

    /// Follows `target` through at most `ctx.redirects_remaining` redirects.
    ///
    /// Every outcome, including failures and cancellation through `cancel`,
    /// is turned into the returned response; nothing else writes to the
    /// client.
    pub async fn resolve(
        &self,
        target: TargetUrl,
        ctx: RequestContext,
        cancel: CancellationToken,
    ) -> Response<Body> {
        self.metrics.add_request();
        let mut target = target;
        let mut ctx = ctx;

        // One iteration per fetch, so the budget caps the loop itself.
        for _ in 0..=ctx.redirects_remaining {
            match self.hop(&target, &ctx, &cancel).await {
                Ok(Hop::Finished(response)) => return response,
                Ok(Hop::Redirect(next)) => match ctx.next_hop() {
                    Some(next_ctx) => {
                        target = next;
                        ctx = next_ctx;
                    }
                    None => break,
                },
                Err(err) => return self.fail(&ctx, err),
            }
        }
        self.fail(&ctx, ProxyError::RedirectDepthExceeded)
    }

    async fn hop(
        &self,
        target: &TargetUrl,
        ctx: &RequestContext,
        cancel: &CancellationToken,
    ) -> Result<Hop, ProxyError> {
        if target.host().is_none() {
            return Err(ProxyError::MissingHost(target.to_string()));
        }
        if !matches!(target.scheme(), "http" | "https") {
            return Err(ProxyError::UnknownProtocol);
        }

        debug!(
            "Fetching {} ({} redirects left)",
            target, ctx.redirects_remaining
        );
        let response = self.fetcher.fetch(target, &ctx.conditional, cancel).await?;
        let (parts, body) = response.into_parts();
        let status = parts.status;
        let headers = &parts.headers;

        let content_length = header_str(headers, &CONTENT_LENGTH);
        if guard::is_oversized(content_length.as_deref(), self.config.length_limit) {
            drop(body);
            return Err(ProxyError::SizeLimitExceeded);
        }

        if guard::is_redirect_status(status) {
            drop(body);
            if ctx.redirects_remaining == 0 {
                return Err(ProxyError::RedirectDepthExceeded);
            }
            let location =
                header_str(headers, &LOCATION).ok_or(ProxyError::RedirectMissingLocation)?;
            let next = redirect::next_target(&location, target)?;
            debug!("{} redirected to {} ({})", target, next, status);
            self.metrics.add_redirect();
            return Ok(Hop::Redirect(next));
        }

        if guard::is_not_modified(status) {
            drop(body);
            self.metrics.add_not_modified();
            let head = streamer::write_headers(status, headers, &self.config);
            return Ok(Hop::Finished(streamer::end(head)));
        }

        let content_type = match header_str(headers, &CONTENT_TYPE) {
            Some(content_type) => content_type,
            None => {
                drop(body);
                return Err(ProxyError::MissingContentType);
            }
        };
        let accepted = &self.config.accepted_types;
        if !guard::is_accepted_image_type(Some(content_type.as_ref()), accepted) {
            drop(body);
            return Err(ProxyError::UnacceptableContentType(
                content_type.into_owned(),
            ));
        }

        debug!(
            "Streaming {} {} (transform: {:?})",
            status, target, ctx.transform
        );
        let head = streamer::write_headers(status, headers, &self.config);
        let body = OriginBody::new(
            body,
            self.config.socket_timeout,
            cancel.clone(),
            self.metrics.clone(),
        );
        Ok(Hop::Finished(streamer::pipe(head, body)))
    }

    fn fail(&self, ctx: &RequestContext, err: ProxyError) -> Response<Body> {
        self.metrics.add_failure();
        self.reporter.not_found(&ctx.original_url, &err)
    }
}

/// A present header decoded lossily; `None` only when it is absent or blank.
fn header_str<'a>(headers: &'a HeaderMap, name: &HeaderName) -> Option<Cow<'a, str>> {
    headers
        .get(name)
        .map(|value| String::from_utf8_lossy(value.as_bytes()))
        .filter(|value| !value.trim().is_empty())
}
