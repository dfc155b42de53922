use super::connector::TlsConnector;
use super::ProxyError;
use crate::config::ProxyConfig;
use crate::prelude::*;
use hyper::client::connect::Connect;
use hyper::client::HttpConnector;
use hyper::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT, VIA};
use hyper::{Body, Client, Method, Request, Response};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Issues a single GET to an origin.
#[async_trait]
pub trait OriginTransport: Send + Sync {
    async fn get(&self, request: Request<Body>) -> Result<Response<Body>>;
}

pub struct HyperTransport<C> {
    client: Client<C, Body>,
}

impl HyperTransport<HttpConnector> {
    pub fn plain() -> Self {
        let mut connector = HttpConnector::new();
        connector.set_nodelay(true);
        Self {
            client: Client::builder().build(connector),
        }
    }
}

impl HyperTransport<TlsConnector> {
    pub fn tls() -> Self {
        Self {
            client: Client::builder().build(TlsConnector::new()),
        }
    }
}

#[async_trait]
impl<C> OriginTransport for HyperTransport<C>
where
    C: Connect + Clone + Send + Sync + 'static,
{
    async fn get(&self, request: Request<Body>) -> Result<Response<Body>> {
        Ok(self.client.request(request).await?)
    }
}

/// Picks the transport for a target's scheme and races the exchange against
/// client cancellation and the socket timeout.
pub struct OriginFetcher {
    plain: Arc<dyn OriginTransport>,
    tls: Arc<dyn OriginTransport>,
    user_agent: HeaderValue,
    via: HeaderValue,
    socket_timeout: Option<Duration>,
}

impl OriginFetcher {
    pub fn new(
        plain: Arc<dyn OriginTransport>,
        tls: Arc<dyn OriginTransport>,
        config: &ProxyConfig,
    ) -> Self {
        Self {
            plain,
            tls,
            user_agent: config.user_agent.clone(),
            via: config.via.clone(),
            socket_timeout: config.socket_timeout,
        }
    }

    fn build_request(
        &self,
        target: &TargetUrl,
        conditional: &HeaderMap,
    ) -> Result<Request<Body>, ProxyError> {
        let uri = target.to_uri().map_err(|_| ProxyError::MalformedUrl)?;
        let mut request = Request::new(Body::empty());
        *request.method_mut() = Method::GET;
        *request.uri_mut() = uri;

        let headers = request.headers_mut();
        headers.insert(USER_AGENT, self.user_agent.clone());
        headers.insert(VIA, self.via.clone());
        headers.insert(ACCEPT, HeaderValue::from_static("image/*"));
        for (name, value) in conditional {
            headers.insert(name.clone(), value.clone());
        }
        Ok(request)
    }

    /// Dropping the in-flight exchange aborts it, so cancellation and the
    /// timeout both tear the origin connection down.
    pub async fn fetch(
        &self,
        target: &TargetUrl,
        conditional: &HeaderMap,
        cancel: &CancellationToken,
    ) -> Result<Response<Body>, ProxyError> {
        let transport = match target.scheme() {
            "http" => &self.plain,
            "https" => &self.tls,
            _ => return Err(ProxyError::UnknownProtocol),
        };
        let request = self.build_request(target, conditional)?;
        let socket_timeout = self.socket_timeout;

        let exchange = async move {
            let response = transport.get(request);
            let result = match socket_timeout {
                Some(limit) => match tokio::time::timeout(limit, response).await {
                    Ok(result) => result,
                    Err(_) => return Err(ProxyError::SocketTimeout),
                },
                None => response.await,
            };
            result.map_err(|err| ProxyError::OriginRequestFailed(format!("{:#}", err)))
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                warn!("Request aborted");
                Err(ProxyError::Aborted)
            }
            result = exchange => result,
        }
    }
}
