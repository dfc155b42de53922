//! Signed proxy URLs: `<host>/<hex hmac-sha1 of url>/<hex url>`.
use crate::config::Config;
use crate::prelude::*;
use crate::proxy::ProxyError;
use anyhow::anyhow;
use hmac::{Hmac, Mac};
use sha1::Sha1;

type HmacSha1 = Hmac<Sha1>;

#[derive(Clone)]
pub struct Signer {
    mac: HmacSha1,
}

impl Signer {
    pub fn new(key: &[u8]) -> Result<Self> {
        let mac = HmacSha1::new_from_slice(key).map_err(|_| anyhow!("Invalid proxy key"))?;
        Ok(Self { mac })
    }

    /// Hex digest of `url`.
    pub fn sign(&self, url: &str) -> String {
        let mut mac = self.mac.clone();
        mac.update(url.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    /// Checks `digest` against `url` in constant time.
    pub fn verify(&self, digest: &str, url: &str) -> bool {
        let expected = match hex::decode(digest) {
            Ok(expected) => expected,
            Err(_) => return false,
        };
        let mut mac = self.mac.clone();
        mac.update(url.as_bytes());
        mac.verify_slice(&expected).is_ok()
    }

    pub fn proxy_url(&self, host: &str, url: &str) -> String {
        format!(
            "{}/{}/{}",
            host.trim_end_matches('/'),
            self.sign(url),
            encode_url(url)
        )
    }
}

/// Proxy URL for `url` under the configured public host and key.
pub fn proxy_url_for(config: &Config, url: &str) -> Result<String> {
    Ok(Signer::new(config.proxy_key.as_bytes())?.proxy_url(&config.host, url))
}

pub fn encode_url(url: &str) -> String {
    hex::encode(url)
}

pub fn decode_url(encoded: &str) -> Result<String, ProxyError> {
    let bytes = hex::decode(encoded).map_err(|_| ProxyError::MalformedUrl)?;
    String::from_utf8(bytes).map_err(|_| ProxyError::MalformedUrl)
}

#[cfg(test)]
mod test {
    use super::*;

    const KEY: &[u8] = b"0x24FEEDFACEDEADBEEFCAFE";
    const URL: &str = "http://www.some-domain.com/some/path.png";
    const DIGEST: &str = "2b33f96713ab208a8bfc1f201002073e74b10809";
    const ENCODED: &str =
        "687474703a2f2f7777772e736f6d652d646f6d61696e2e636f6d2f736f6d652f706174682e706e67";

    #[test]
    fn sign_matches_hmac_sha1() {
        let signer = Signer::new(KEY).unwrap();
        assert_eq!(signer.sign(URL), DIGEST);
        assert_eq!(encode_url(URL), ENCODED);
    }

    #[test]
    fn proxy_url_layout() {
        let signer = Signer::new(KEY).unwrap();
        assert_eq!(
            signer.proxy_url("http://localhost:8081/", URL),
            format!("http://localhost:8081/{}/{}", DIGEST, ENCODED)
        );
    }

    #[test]
    fn proxy_url_from_config() {
        let config = Config::default();
        assert_eq!(
            proxy_url_for(&config, URL).unwrap(),
            format!("http://localhost:8081/{}/{}", DIGEST, ENCODED)
        );
    }

    #[test]
    fn verify() {
        let signer = Signer::new(KEY).unwrap();
        assert!(signer.verify(DIGEST, URL));
        assert!(!signer.verify(DIGEST, "http://www.some-domain.com/other.png"));
        assert!(!signer.verify("not-hex", URL));
        assert!(!Signer::new(b"other key").unwrap().verify(DIGEST, URL));
    }

    #[test]
    fn decode() {
        assert_eq!(decode_url(ENCODED).unwrap(), URL);
        assert!(matches!(decode_url("zz"), Err(ProxyError::MalformedUrl)));
        assert!(matches!(decode_url("ff"), Err(ProxyError::MalformedUrl)));
    }
}
