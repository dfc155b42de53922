use crate::prelude::*;
use anyhow::{anyhow, bail};
use futures::Future;
use hyper::client::connect::{Connected, Connection};
use hyper::Uri;
use pin_project::pin_project;
use std::convert::TryFrom;
use std::io;
use std::task::Context;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::TcpStream;
use tokio_rustls::client::TlsStream;
use tokio_rustls::rustls::{ClientConfig, OwnedTrustAnchor, RootCertStore, ServerName};

/// Connects to `https` origins over TLS, trusting the webpki root set.
#[derive(Clone)]
pub struct TlsConnector {
    tls: tokio_rustls::TlsConnector,
}

impl TlsConnector {
    pub fn new() -> Self {
        let mut roots = RootCertStore::empty();
        roots.add_server_trust_anchors(webpki_roots::TLS_SERVER_ROOTS.0.iter().map(|ta| {
            OwnedTrustAnchor::from_subject_spki_name_constraints(
                ta.subject,
                ta.spki,
                ta.name_constraints,
            )
        }));
        let config = ClientConfig::builder()
            .with_safe_defaults()
            .with_root_certificates(roots)
            .with_no_client_auth();

        Self {
            tls: tokio_rustls::TlsConnector::from(Arc::new(config)),
        }
    }

    async fn call_async(self, dst: Uri) -> Result<OriginStream> {
        let host = match dst.host() {
            Some(s) => s.trim_start_matches('[').trim_end_matches(']'),
            None => bail!("URL Host is missing"),
        };
        let port = dst.port_u16().unwrap_or(443);

        let tcp = TcpStream::connect((host, port)).await?;
        tcp.set_nodelay(true)?;
        let server_name = ServerName::try_from(host)
            .map_err(|_| anyhow!("Invalid server name {}", host))?;
        let stream = self.tls.connect(server_name, tcp).await?;
        Ok(OriginStream { inner: stream })
    }
}

impl Default for TlsConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl hyper::service::Service<Uri> for TlsConnector {
    type Response = OriginStream;
    type Error = anyhow::Error;
    type Future = ConnectingFut;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Uri) -> Self::Future {
        let this = self.clone();
        ConnectingFut(Box::pin(this.call_async(req)))
    }
}

#[pin_project]
pub struct ConnectingFut(#[pin] Pin<Box<dyn Future<Output = Result<OriginStream>> + Send>>);

impl Future for ConnectingFut {
    type Output = Result<OriginStream>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.project().0.poll(cx)
    }
}

/// An established TLS connection to an origin.
#[pin_project]
pub struct OriginStream {
    #[pin]
    inner: TlsStream<TcpStream>,
}

impl Connection for OriginStream {
    fn connected(&self) -> Connected {
        Connected::new()
    }
}

impl AsyncRead for OriginStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        self.project().inner.poll_read(cx, buf)
    }
}

impl AsyncWrite for OriginStream {
    fn poll_write(self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &[u8]) -> Poll<io::Result<usize>> {
        self.project().inner.poll_write(cx, buf)
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        self.project().inner.poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        self.project().inner.poll_shutdown(cx)
    }
}
