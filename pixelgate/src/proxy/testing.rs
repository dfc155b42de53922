//! Test doubles for the pipeline's injected collaborators.
use super::{OriginFetcher, OriginTransport, Pipeline, ProxyError, Reporter};
use crate::app::metrics::Metrics;
use crate::config::ProxyConfig;
use crate::prelude::*;
use futures::StreamExt;
use hyper::header::{HeaderMap, HeaderName, HeaderValue};
use hyper::{Body, Method, Request, Response, StatusCode, Uri};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

type Handler = Box<dyn Fn(usize, &Request<Body>) -> Result<Response<Body>> + Send + Sync>;

/// Answers each request with whatever `handler` returns for the n-th call.
pub struct MockTransport {
    handler: Handler,
    requests: Mutex<Vec<(Method, Uri, HeaderMap)>>,
}

impl MockTransport {
    pub fn new<F>(handler: F) -> Arc<Self>
    where
        F: Fn(usize, &Request<Body>) -> Result<Response<Body>> + Send + Sync + 'static,
    {
        Arc::new(Self {
            handler: Box::new(handler),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<(Method, Uri, HeaderMap)> {
        self.requests.lock().unwrap().clone()
    }

    pub fn uris(&self) -> Vec<String> {
        self.requests()
            .into_iter()
            .map(|(_, uri, _)| uri.to_string())
            .collect()
    }
}

#[async_trait]
impl OriginTransport for MockTransport {
    async fn get(&self, request: Request<Body>) -> Result<Response<Body>> {
        let n = {
            let mut requests = self.requests.lock().unwrap();
            requests.push((
                request.method().clone(),
                request.uri().clone(),
                request.headers().clone(),
            ));
            requests.len() - 1
        };
        (self.handler)(n, &request)
    }
}

/// Never answers. Counts how often an in-flight exchange gets dropped.
#[derive(Default)]
pub struct PendingTransport {
    calls: AtomicUsize,
    aborts: Arc<AtomicUsize>,
}

struct AbortProbe(Arc<AtomicUsize>);

impl Drop for AbortProbe {
    fn drop(&mut self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

impl PendingTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn aborts(&self) -> usize {
        self.aborts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OriginTransport for PendingTransport {
    async fn get(&self, _request: Request<Body>) -> Result<Response<Body>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let _probe = AbortProbe(self.aborts.clone());
        futures::future::pending::<Result<Response<Body>>>().await
    }
}

/// Records every not-found message instead of logging it.
#[derive(Default)]
pub struct RecordingReporter {
    messages: Mutex<Vec<String>>,
}

impl RecordingReporter {
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }
}

impl Reporter for RecordingReporter {
    fn not_found(&self, _original_url: &str, error: &ProxyError) -> Response<Body> {
        self.messages.lock().unwrap().push(error.to_string());
        let mut response = Response::new(Body::empty());
        *response.status_mut() = StatusCode::NOT_FOUND;
        response
    }
}

pub fn pipeline(
    config: ProxyConfig,
    plain: Arc<dyn OriginTransport>,
    tls: Arc<dyn OriginTransport>,
    reporter: Arc<dyn Reporter>,
) -> Pipeline {
    let fetcher = OriginFetcher::new(plain, tls, &config);
    Pipeline::new(
        Arc::new(config),
        fetcher,
        reporter,
        Arc::new(Metrics::default()),
    )
}

pub fn origin(status: u16, headers: &[(&'static str, &'static str)], body: Body) -> Response<Body> {
    let mut response = Response::new(body);
    *response.status_mut() = StatusCode::from_u16(status).unwrap();
    for (name, value) in headers {
        response.headers_mut().insert(
            HeaderName::from_static(*name),
            HeaderValue::from_static(*value),
        );
    }
    response
}

pub fn ok_image() -> Response<Body> {
    origin(200, &[("content-type", "image/png")], Body::from("png"))
}

/// A body whose flag flips as soon as anything reads from it.
pub fn tracked_body(content: &'static str) -> (Body, Arc<AtomicBool>) {
    let read = Arc::new(AtomicBool::new(false));
    let flag = read.clone();
    let chunks = futures::stream::iter(vec![Ok::<_, std::io::Error>(Bytes::from_static(
        content.as_bytes(),
    ))])
    .inspect(move |_| flag.store(true, Ordering::SeqCst));
    (Body::wrap_stream(chunks), read)
}
