use thiserror::Error;

/// Everything that can end a client request with a not-found response.
///
/// The `Display` output is the diagnostic message handed to the reporter.
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("No host provided by url: {0}")]
    MissingHost(String),

    #[error("Unknown protocol")]
    UnknownProtocol,

    /// The origin connection failed before a response arrived.
    #[error("Media request error {0}")]
    OriginRequestFailed(String),

    /// Reading the origin body failed after the client status was sent.
    #[error("Request error: {0}")]
    OriginResponseFailed(String),

    #[error("Content-Length exceeded")]
    SizeLimitExceeded,

    #[error("Exceeded max depth")]
    RedirectDepthExceeded,

    #[error("Redirect with no location")]
    RedirectMissingLocation,

    #[error("Invalid redirect location '{0}'")]
    InvalidLocation(String),

    #[error("No content-type returned")]
    MissingContentType,

    #[error("Non-Image content-type returned '{0}'")]
    UnacceptableContentType(String),

    #[error("Socket timeout")]
    SocketTimeout,

    #[error("Request aborted")]
    Aborted,

    #[error("checksum mismatch")]
    InvalidSignature,

    #[error("Invalid url")]
    MalformedUrl,

    #[error("Not found")]
    UnknownRoute,
}

impl ProxyError {
    /// Short label used in log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            ProxyError::MissingHost(_) => "missing_host",
            ProxyError::UnknownProtocol => "unknown_protocol",
            ProxyError::OriginRequestFailed(_) => "origin_request_failed",
            ProxyError::OriginResponseFailed(_) => "origin_response_failed",
            ProxyError::SizeLimitExceeded => "size_limit_exceeded",
            ProxyError::RedirectDepthExceeded => "redirect_depth_exceeded",
            ProxyError::RedirectMissingLocation => "redirect_missing_location",
            ProxyError::InvalidLocation(_) => "invalid_location",
            ProxyError::MissingContentType => "missing_content_type",
            ProxyError::UnacceptableContentType(_) => "unacceptable_content_type",
            ProxyError::SocketTimeout => "socket_timeout",
            ProxyError::Aborted => "aborted",
            ProxyError::InvalidSignature => "invalid_signature",
            ProxyError::MalformedUrl => "malformed_url",
            ProxyError::UnknownRoute => "unknown_route",
        }
    }
}

#[cfg(test)]
mod test {
    use super::ProxyError;

    #[test]
    fn messages() {
        assert_eq!(
            ProxyError::MissingHost("data:,x".into()).to_string(),
            "No host provided by url: data:,x"
        );
        assert_eq!(
            ProxyError::OriginRequestFailed("stack".into()).to_string(),
            "Media request error stack"
        );
        assert_eq!(
            ProxyError::UnacceptableContentType("invalid/type".into()).to_string(),
            "Non-Image content-type returned 'invalid/type'"
        );
        assert_eq!(
            ProxyError::OriginResponseFailed("some error".into()).to_string(),
            "Request error: some error"
        );
    }
}
