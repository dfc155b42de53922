use anyhow::Context;

use crate::app::metrics::Metrics;
use crate::config::{Config, ProxyConfig};
use crate::prelude::*;
use crate::proxy::{HyperTransport, NotFoundReporter, OriginFetcher, OriginTransport, Pipeline, Reporter};
use crate::signing::Signer;

pub type AppContextRef = Arc<AppContext>;

pub struct AppContext {
    pub config: Config,
    pub proxy_config: Arc<ProxyConfig>,
    pub signer: Signer,
    pub pipeline: Pipeline,
    pub reporter: Arc<dyn Reporter>,
    pub metrics: Arc<Metrics>,
}

impl AppContext {
    pub fn new(config: &Config) -> Result<Self> {
        Self::with_collaborators(
            config,
            Arc::new(HyperTransport::plain()),
            Arc::new(HyperTransport::tls()),
            Arc::new(NotFoundReporter),
        )
    }

    /// Builds a context around the given origin transports and reporter.
    pub fn with_collaborators(
        config: &Config,
        plain: Arc<dyn OriginTransport>,
        tls: Arc<dyn OriginTransport>,
        reporter: Arc<dyn Reporter>,
    ) -> Result<Self> {
        let proxy_config =
            Arc::new(ProxyConfig::new(config).with_context(|| "When building proxy config")?);
        let metrics = Arc::new(Metrics::default());
        let fetcher = OriginFetcher::new(plain, tls, &proxy_config);

        Ok(AppContext {
            config: config.clone(),
            signer: Signer::new(config.proxy_key.as_bytes())
                .with_context(|| "When creating signer")?,
            pipeline: Pipeline::new(
                proxy_config.clone(),
                fetcher,
                reporter.clone(),
                metrics.clone(),
            ),
            proxy_config,
            reporter,
            metrics,
        })
    }
}
