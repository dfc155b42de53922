use hyper::Uri;
use std::fmt;
use url::{ParseError, Url};

/// The origin location a single hop fetches from.
///
/// Unlike `hyper::Uri`, a `TargetUrl` may lack a host or carry a scheme the
/// proxy cannot speak; both are rejected by the pipeline before any I/O.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetUrl {
    url: Url,
}

impl TargetUrl {
    pub fn parse(raw: &str) -> Result<Self, ParseError> {
        Ok(Self {
            url: Url::parse(raw.trim())?,
        })
    }

    pub fn scheme(&self) -> &str {
        self.url.scheme()
    }

    pub fn host(&self) -> Option<&str> {
        self.url.host_str().filter(|h| !h.is_empty())
    }

    /// Resolves `reference` against this URL, keeping host, scheme and port
    /// where the reference leaves them out.
    pub fn join(&self, reference: &str) -> Result<Self, ParseError> {
        Ok(Self {
            url: self.url.join(reference.trim())?,
        })
    }

    pub fn to_uri(&self) -> Result<Uri, hyper::http::uri::InvalidUri> {
        let mut url = self.url.clone();
        url.set_fragment(None);
        url.as_str().parse()
    }

    pub fn as_str(&self) -> &str {
        self.url.as_str()
    }
}

impl fmt::Display for TargetUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.url)
    }
}

#[cfg(test)]
mod test {
    use super::TargetUrl;

    #[test]
    fn hostless_urls_parse() {
        let target = TargetUrl::parse("data:image/png;base64,AAAA").unwrap();
        assert_eq!(target.host(), None);
        assert_eq!(target.scheme(), "data");
    }

    #[test]
    fn uri_drops_fragment() {
        let target = TargetUrl::parse("http://a.com/img.png?w=1#frag").unwrap();
        let uri = target.to_uri().unwrap();
        assert_eq!(uri.host(), Some("a.com"));
        assert_eq!(uri.path_and_query().unwrap().as_str(), "/img.png?w=1");
    }
}
