use hyper::header::{HeaderMap, IF_MODIFIED_SINCE, IF_NONE_MATCH};
use smol_str::SmolStr;

/// Per client request state, carried across every redirect hop.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub redirects_remaining: u32,
    /// Image transform instructions, forwarded untouched.
    pub transform: Option<SmolStr>,
    /// The proxy URL the client asked for. Only used in diagnostics.
    pub original_url: String,
    /// Conditional request headers from the client, replayed on each hop.
    pub conditional: HeaderMap,
}

impl RequestContext {
    pub fn new<S: Into<String>>(redirects: u32, original_url: S) -> Self {
        Self {
            redirects_remaining: redirects,
            transform: None,
            original_url: original_url.into(),
            conditional: HeaderMap::new(),
        }
    }

    pub fn with_transform<T: Into<SmolStr>>(mut self, transform: Option<T>) -> Self {
        self.transform = transform.map(Into::into);
        self
    }

    /// Keeps the client's cache validators so origin 304s can pass through.
    pub fn with_conditional_headers(mut self, headers: &HeaderMap) -> Self {
        for name in [IF_NONE_MATCH, IF_MODIFIED_SINCE].iter() {
            if let Some(value) = headers.get(name) {
                self.conditional.insert(name.clone(), value.clone());
            }
        }
        self
    }

    /// Context for the hop after a redirect, or `None` once the budget is spent.
    pub fn next_hop(&self) -> Option<Self> {
        let redirects_remaining = self.redirects_remaining.checked_sub(1)?;
        Some(Self {
            redirects_remaining,
            ..self.clone()
        })
    }
}
