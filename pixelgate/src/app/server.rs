//! The HTTP front door: accepts client connections and routes signed proxy
//! URLs into the pipeline.
use crate::context::AppContext;
use crate::prelude::*;
use crate::proxy::ProxyError;
use crate::signing::decode_url;
use anyhow::Context;
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::server::conn::Http;
use hyper::service::service_fn;
use hyper::{Body, Method, Request, Response};
use std::convert::Infallible;
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;
use url::ParseError;

pub async fn bind(ctx: &AppContextRef) -> Result<TcpListener> {
    let listener = TcpListener::bind(ctx.config.listen)
        .await
        .with_context(|| format!("Failed to bind {}", ctx.config.listen))?;
    info!("Listening on {}", listener.local_addr()?);
    Ok(listener)
}

pub async fn serve(listener: TcpListener, ctx: AppContextRef) -> Result<()> {
    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(err) => {
                warn!("Failed to accept connection: {}", err);
                continue;
            }
        };
        let ctx = ctx.clone();
        tokio::spawn(async move {
            if let Err(err) = handle_conn(stream, ctx).await {
                debug!("Connection from {} closed: {}", peer, err);
            }
        });
    }
}

async fn handle_conn(stream: TcpStream, ctx: AppContextRef) -> Result<()> {
    stream.set_nodelay(true)?;
    // Cancelled once the client connection is gone, whatever state the
    // request on it is in.
    let closed = CancellationToken::new();
    let _closed_guard = closed.clone().drop_guard();

    let service = service_fn(move |req| {
        let ctx = ctx.clone();
        let cancel = closed.child_token();
        async move { Ok::<_, Infallible>(handle_request(req, ctx, cancel).await) }
    });
    Http::new()
        .http1_only(true)
        .http1_keep_alive(true)
        .serve_connection(stream, service)
        .await?;
    Ok(())
}

/// Answers one client request. Dropping the returned future before it
/// completes cancels `cancel`.
pub async fn handle_request(
    req: Request<Body>,
    ctx: AppContextRef,
    cancel: CancellationToken,
) -> Response<Body> {
    let guard = cancel.clone().drop_guard();
    let response = route(req, &ctx, cancel).await;
    let _ = guard.disarm();
    response
}

enum Route {
    Status,
    Proxy(TargetUrl, RequestContext),
}

async fn route(req: Request<Body>, ctx: &AppContextRef, cancel: CancellationToken) -> Response<Body> {
    let original_url = req.uri().to_string();
    let parsed = parse_route(&req, ctx, &original_url);
    match parsed {
        Ok(Route::Status) => status(),
        Ok(Route::Proxy(target, request_ctx)) => ctx.pipeline.resolve(target, request_ctx, cancel).await,
        Err(err) => reject(ctx, &original_url, err),
    }
}

/// Maps `GET /<hex digest>/<hex url>?<transform>` onto a proxy target.
fn parse_route(req: &Request<Body>, ctx: &AppContext, original_url: &str) -> Result<Route, ProxyError> {
    if req.method() != Method::GET {
        return Err(ProxyError::UnknownRoute);
    }

    let path = req.uri().path();
    if path == "/status" {
        return Ok(Route::Status);
    }

    let mut segments = path.trim_start_matches('/').split('/');
    let (digest, encoded) = match (segments.next(), segments.next(), segments.next()) {
        (Some(digest), Some(encoded), None) if !digest.is_empty() && !encoded.is_empty() => {
            (digest, encoded)
        }
        _ => return Err(ProxyError::UnknownRoute),
    };
    let url = decode_url(encoded)?;
    if !ctx.signer.verify(digest, &url) {
        return Err(ProxyError::InvalidSignature);
    }
    let target = TargetUrl::parse(&url).map_err(|err| match err {
        ParseError::RelativeUrlWithoutBase | ParseError::EmptyHost => {
            ProxyError::MissingHost(url.clone())
        }
        _ => ProxyError::MalformedUrl,
    })?;

    let request_ctx = RequestContext::new(ctx.proxy_config.redirects, original_url)
        .with_transform(req.uri().query())
        .with_conditional_headers(req.headers());
    Ok(Route::Proxy(target, request_ctx))
}

fn reject(ctx: &AppContextRef, original_url: &str, err: ProxyError) -> Response<Body> {
    ctx.metrics.add_failure();
    ctx.reporter.not_found(original_url, &err)
}

fn status() -> Response<Body> {
    let mut response = Response::new(Body::from("ok"));
    response.headers_mut().insert(
        CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    response
}
