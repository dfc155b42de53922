//! Client-facing response construction.
use super::ProxyError;
use crate::app::metrics::Metrics;
use crate::config::ProxyConfig;
use crate::prelude::*;
use futures::{Future, Stream};
use hyper::body::HttpBody;
use hyper::header::{
    HeaderMap, HeaderName, HeaderValue, CONTENT_ENCODING, CONTENT_LENGTH, CONTENT_TYPE, ETAG,
    EXPIRES, LAST_MODIFIED, TRANSFER_ENCODING, X_CONTENT_TYPE_OPTIONS,
};
use hyper::{Body, Response, StatusCode};
use pin_project::{pin_project, pinned_drop};
use std::task::Context;
use std::time::Duration;
use tokio::time::{sleep, Instant, Sleep};
use tokio_util::sync::CancellationToken;

/// Origin headers copied to the client. Everything else is dropped.
const FORWARDED_HEADERS: [HeaderName; 7] = [
    CONTENT_TYPE,
    ETAG,
    EXPIRES,
    LAST_MODIFIED,
    CONTENT_LENGTH,
    TRANSFER_ENCODING,
    CONTENT_ENCODING,
];

const TIMING_ALLOW_ORIGIN: &str = "timing-allow-origin";

#[derive(Debug)]
pub struct ResponseHead {
    pub status: StatusCode,
    pub headers: HeaderMap,
}

pub fn write_headers(status: StatusCode, origin: &HeaderMap, config: &ProxyConfig) -> ResponseHead {
    let mut headers = HeaderMap::new();
    for name in FORWARDED_HEADERS.iter() {
        if let Some(value) = origin.get(name) {
            headers.insert(name.clone(), value.clone());
        }
    }
    if let Some(timing_origin) = &config.timing_origin {
        headers.insert(
            HeaderName::from_static(TIMING_ALLOW_ORIGIN),
            timing_origin.clone(),
        );
    }
    ResponseHead { status, headers }
}

/// Streams `body` to the client under `head`.
pub fn pipe(head: ResponseHead, body: OriginBody) -> Response<Body> {
    let mut response = Response::new(Body::wrap_stream(body));
    *response.status_mut() = head.status;
    *response.headers_mut() = head.headers;
    response
        .headers_mut()
        .insert(X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    response
}

/// Finishes the client response without a body.
pub fn end(mut head: ResponseHead) -> Response<Body> {
    head.headers.remove(CONTENT_LENGTH);
    head.headers.remove(TRANSFER_ENCODING);

    let mut response = Response::new(Body::empty());
    *response.status_mut() = head.status;
    *response.headers_mut() = head.headers;
    response
}

/// The origin body on its way to the client.
///
/// A read error or an idle gap longer than the socket timeout aborts the
/// origin exchange and fails the client body once. Dropping the stream before
/// it finished means the client went away.
#[pin_project(PinnedDrop)]
pub struct OriginBody {
    #[pin]
    inner: Body,
    timer: Option<Pin<Box<Sleep>>>,
    timeout_idle: Option<Duration>,
    cancel: CancellationToken,
    metrics: Arc<Metrics>,
    done: bool,
}

impl OriginBody {
    pub fn new(
        inner: Body,
        timeout_idle: Option<Duration>,
        cancel: CancellationToken,
        metrics: Arc<Metrics>,
    ) -> Self {
        let mut this = Self {
            inner,
            timer: None,
            timeout_idle,
            cancel,
            metrics,
            done: false,
        };
        this.reset();
        this
    }

    fn reset(&mut self) {
        let idle = match self.timeout_idle {
            Some(idle) => idle,
            None => return,
        };
        if let Some(timer) = &mut self.timer {
            timer.as_mut().reset(Instant::now() + idle);
        } else {
            self.timer = Some(Box::pin(sleep(idle)));
        }
    }

    fn fail(&mut self, err: ProxyError) -> Poll<Option<Result<Bytes, ProxyError>>> {
        error!("{}", err);
        self.done = true;
        self.cancel.cancel();
        self.metrics.add_failure();
        Poll::Ready(Some(Err(err)))
    }
}

impl Stream for OriginBody {
    type Item = Result<Bytes, ProxyError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.done {
            return Poll::Ready(None);
        }

        let me = self.as_mut().project();
        match me.inner.poll_data(cx) {
            Poll::Ready(Some(Ok(chunk))) => {
                self.metrics.add_bytes_out(chunk.len());
                self.reset();
                Poll::Ready(Some(Ok(chunk)))
            }
            Poll::Ready(Some(Err(err))) => {
                self.fail(ProxyError::OriginResponseFailed(err.to_string()))
            }
            Poll::Ready(None) => {
                self.done = true;
                self.metrics.add_streamed();
                Poll::Ready(None)
            }
            Poll::Pending => {
                if let Some(Poll::Ready(())) = self.timer.as_mut().map(|t| t.as_mut().poll(cx)) {
                    self.fail(ProxyError::OriginResponseFailed(
                        ProxyError::SocketTimeout.to_string(),
                    ))
                } else {
                    Poll::Pending
                }
            }
        }
    }
}

#[pinned_drop]
impl PinnedDrop for OriginBody {
    fn drop(self: Pin<&mut Self>) {
        if !self.done {
            warn!("Request aborted");
            self.cancel.cancel();
        }
    }
}
