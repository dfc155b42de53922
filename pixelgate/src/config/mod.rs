use crate::prelude::*;
use anyhow::{anyhow, Context};
use hyper::header::HeaderValue;
use std::collections::HashSet;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_USER_AGENT: &str = concat!("pixelgate/", env!("CARGO_PKG_VERSION"));

pub const DEFAULT_ACCEPTED_TYPES: &[&str] = &[
    "image/bmp",
    "image/cgm",
    "image/g3fax",
    "image/gif",
    "image/ief",
    "image/jp2",
    "image/jpeg",
    "image/jpg",
    "image/pict",
    "image/png",
    "image/prs.btif",
    "image/svg+xml",
    "image/tiff",
    "image/vnd.adobe.photoshop",
    "image/vnd.djvu",
    "image/vnd.dwg",
    "image/vnd.dxf",
    "image/vnd.fastbidsheet",
    "image/vnd.fpx",
    "image/vnd.fst",
    "image/vnd.fujixerox.edmics-mmr",
    "image/vnd.fujixerox.edmics-rlc",
    "image/vnd.microsoft.icon",
    "image/vnd.ms-modi",
    "image/vnd.net-fpx",
    "image/vnd.wap.wbmp",
    "image/vnd.xiff",
    "image/webp",
    "image/x-cmu-raster",
    "image/x-cmx",
    "image/x-icon",
    "image/x-macpaint",
    "image/x-pcx",
    "image/x-pict",
    "image/x-portable-anymap",
    "image/x-portable-bitmap",
    "image/x-portable-graymap",
    "image/x-portable-pixmap",
    "image/x-quicktime",
    "image/x-rgb",
    "image/x-xbitmap",
    "image/x-xpixmap",
    "image/x-xwindowdump",
];

/// Process configuration as read from `config.yml`.
#[derive(Deserialize, Clone, Debug)]
#[serde(default)]
pub struct Config {
    pub listen: SocketAddr,
    /// Public base URL, used when generating proxy URLs.
    pub host: String,
    pub proxy_key: String,
    /// Upper bound for the origin's declared `content-length`, in bytes.
    pub length_limit: u64,
    /// Milliseconds. 0 disables the timeout.
    pub socket_timeout: u64,
    pub timing_origin: Option<String>,
    pub redirects: u32,
    pub accepted_types: Vec<SmolStr>,
    pub user_agent: String,
    pub via: String,
    /// Seconds between metrics log lines. 0 disables them.
    pub metrics_interval: u64,
    pub log_level: SmolStr,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from(([0, 0, 0, 0], 8081)),
            host: "http://localhost:8081".to_string(),
            proxy_key: "0x24FEEDFACEDEADBEEFCAFE".to_string(),
            length_limit: 5 * 1024 * 1024,
            socket_timeout: 10_000,
            timing_origin: None,
            redirects: 4,
            accepted_types: DEFAULT_ACCEPTED_TYPES
                .iter()
                .map(|t| SmolStr::new(t))
                .collect(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            via: "pixelgate".to_string(),
            metrics_interval: 60,
            log_level: "info".into(),
        }
    }
}

pub async fn load_file<P: AsRef<Path>>(path: P) -> Result<Config> {
    let buffer = tokio::fs::read_to_string(path).await?;
    load_string(&buffer)
}

pub fn load_string(input: &str) -> Result<Config> {
    Ok(serde_yaml::from_str(input)?)
}

/// The read-only tunables the proxy pipeline runs with.
#[derive(Debug, Clone)]
pub struct ProxyConfig {
    pub length_limit: u64,
    pub socket_timeout: Option<Duration>,
    pub timing_origin: Option<HeaderValue>,
    pub redirects: u32,
    pub accepted_types: HashSet<SmolStr>,
    pub user_agent: HeaderValue,
    pub via: HeaderValue,
}

impl ProxyConfig {
    pub fn new(config: &Config) -> Result<Self> {
        let timing_origin = match &config.timing_origin {
            Some(origin) => Some(
                HeaderValue::from_str(origin)
                    .with_context(|| format!("Invalid timing_origin {:?}", origin))?,
            ),
            None => None,
        };
        if config.accepted_types.is_empty() {
            return Err(anyhow!("accepted_types must not be empty"));
        }

        Ok(Self {
            length_limit: config.length_limit,
            socket_timeout: millis(config.socket_timeout),
            timing_origin,
            redirects: config.redirects,
            accepted_types: normalize_types(&config.accepted_types),
            user_agent: HeaderValue::from_str(&config.user_agent)
                .with_context(|| "Invalid user_agent")?,
            via: HeaderValue::from_str(&config.via).with_context(|| "Invalid via")?,
        })
    }
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            length_limit: 5 * 1024 * 1024,
            socket_timeout: millis(10_000),
            timing_origin: None,
            redirects: 4,
            accepted_types: DEFAULT_ACCEPTED_TYPES.iter().map(SmolStr::new).collect(),
            user_agent: HeaderValue::from_static(DEFAULT_USER_AGENT),
            via: HeaderValue::from_static("pixelgate"),
        }
    }
}

fn millis(value: u64) -> Option<Duration> {
    if value > 0 {
        Some(Duration::from_millis(value))
    } else {
        None
    }
}

fn normalize_types(types: &[SmolStr]) -> HashSet<SmolStr> {
    types
        .iter()
        .map(|t| SmolStr::new(t.trim().to_ascii_lowercase()))
        .collect()
}
