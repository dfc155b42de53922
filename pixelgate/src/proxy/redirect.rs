use super::ProxyError;
use crate::common::TargetUrl;

/// Computes the target a redirect points at.
///
/// A `Location` carrying its own host is used as is; anything else is
/// resolved against `current`, so it stays on the current origin.
pub fn next_target(location: &str, current: &TargetUrl) -> Result<TargetUrl, ProxyError> {
    let invalid = || ProxyError::InvalidLocation(location.to_string());
    match TargetUrl::parse(location) {
        Ok(next) if next.host().is_some() => Ok(next),
        Ok(_) | Err(url::ParseError::RelativeUrlWithoutBase) => {
            current.join(location).map_err(|_| invalid())
        }
        Err(_) => Err(invalid()),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn current() -> TargetUrl {
        TargetUrl::parse("http://www.some-domain.com:8080/some/path?x=1").unwrap()
    }

    #[test]
    fn absolute_location_keeps_its_host() {
        let next = next_target("http://new-domain.com/some/path", &current()).unwrap();
        assert_eq!(next.host(), Some("new-domain.com"));
        assert_eq!(next.as_str(), "http://new-domain.com/some/path");
    }

    #[test]
    fn host_relative_location_stays_on_origin() {
        let next = next_target("/relative/path?y=2", &current()).unwrap();
        assert_eq!(next.host(), Some("www.some-domain.com"));
        assert_eq!(
            next.as_str(),
            "http://www.some-domain.com:8080/relative/path?y=2"
        );
    }

    #[test]
    fn path_relative_location() {
        let next = next_target("other.png", &current()).unwrap();
        assert_eq!(next.as_str(), "http://www.some-domain.com:8080/some/other.png");
    }

    #[test]
    fn scheme_relative_location() {
        let base = TargetUrl::parse("https://a.com/x").unwrap();
        let next = next_target("//b.com/y", &base).unwrap();
        assert_eq!(next.host(), Some("b.com"));
        assert_eq!(next.scheme(), "https");
    }

    #[test]
    fn input_is_untouched() {
        let base = current();
        let copy = base.clone();
        let _ = next_target("/elsewhere", &base).unwrap();
        assert_eq!(base, copy);
    }

    #[test]
    fn garbage_location() {
        let err = next_target("http://[::1", &current()).unwrap_err();
        assert_eq!(err.to_string(), "Invalid redirect location 'http://[::1'");
    }
}
