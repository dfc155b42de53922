pub mod app;
pub mod common;
pub mod config;
pub mod context;
pub mod proxy;
pub mod signing;

use crate::app::server;
use crate::config::Config;
use crate::context::AppContext;
use crate::prelude::*;

use anyhow::Context;
use std::time::Duration;

pub async fn run(ctx: AppContextRef) -> Result<()> {
    let listener = server::bind(&ctx).await?;

    let ctx_server = ctx.clone();
    let _server_handle = tokio::spawn(async move {
        if let Err(err) = server::serve(listener, ctx_server).await {
            error!("Proxy server stopped: {:#}", err);
        }
    });

    if ctx.config.metrics_interval > 0 {
        let ctx1 = ctx.clone();
        tokio::spawn(async move {
            let mut interval =
                tokio::time::interval(Duration::from_secs(ctx1.config.metrics_interval));
            loop {
                interval.tick().await;
                info!("{:?}", ctx1.metrics);
            }
        });
    }
    Ok(())
}

pub async fn run_bin(config: Config) -> Result<()> {
    debug!("{:#?}", config);
    let ctx = Arc::new(AppContext::new(&config).with_context(|| "Failed to build app context")?);
    drop(config);

    run(ctx).await?;
    Ok(())
}

pub mod prelude {
    pub use crate::common::*;
    pub use crate::context::AppContextRef;
    pub use anyhow::Result;
    pub use async_trait::async_trait;
    pub use bytes::Bytes;
    pub use log::*;
    pub use serde::{Deserialize, Serialize};
    pub use smol_str::SmolStr;
    pub use std::collections::HashMap;
    pub use std::pin::Pin;
    pub use std::sync::Arc;
    pub use std::task::Poll;
}
