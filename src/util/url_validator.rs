use std::net::IpAddr;
use thiserror::Error;
use url::Url;

/// Reasons a feed URL is refused by `addfeed`/`follow`.
#[derive(Error, Debug)]
pub enum UrlValidationError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("Unsupported scheme: {0} (only http/https allowed)")]
    UnsupportedScheme(String),
    #[error("Feed URL has no host")]
    MissingHost,
    /// The host resolves to loopback, a private range, or link-local space.
    #[error("Feed URL points at a local or private address: {0}")]
    PrivateHost(String),
}

/// Checks that `raw` is something the fetcher should be allowed to poll.
///
/// Only `http`/`https` URLs with a host are accepted. Unless `allow_private`
/// is set, literal loopback, private, link-local and unspecified addresses
/// (and `localhost`) are refused so that a shared instance cannot be used to
/// probe its own network. Hostnames are not resolved.
///
/// ```
/// use gator::util::validate_feed_url;
///
/// assert!(validate_feed_url("https://blog.boot.dev/index.xml", false).is_ok());
/// assert!(validate_feed_url("http://192.168.1.1/rss", false).is_err());
/// assert!(validate_feed_url("http://192.168.1.1/rss", true).is_ok());
/// assert!(validate_feed_url("file:///etc/passwd", true).is_err());
/// ```
pub fn validate_feed_url(raw: &str, allow_private: bool) -> Result<Url, UrlValidationError> {
    let url = Url::parse(raw.trim())?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(UrlValidationError::UnsupportedScheme(url.scheme().to_owned()));
    }

    let host = url.host_str().ok_or(UrlValidationError::MissingHost)?;
    if allow_private {
        return Ok(url);
    }

    if host.eq_ignore_ascii_case("localhost") {
        return Err(UrlValidationError::PrivateHost(host.to_owned()));
    }

    let literal = host.trim_start_matches('[').trim_end_matches(']');
    if let Ok(ip) = literal.parse::<IpAddr>() {
        if is_non_public(&ip) {
            return Err(UrlValidationError::PrivateHost(ip.to_string()));
        }
    }

    Ok(url)
}

fn is_non_public(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            v4.is_loopback() || v4.is_private() || v4.is_link_local() || v4.is_unspecified()
        }
        IpAddr::V6(v6) => {
            let first = v6.segments()[0];
            v6.is_loopback()
                || v6.is_unspecified()
                || (first & 0xfe00) == 0xfc00 // unique local
                || (first & 0xffc0) == 0xfe80 // link-local
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_feeds_accepted() {
        for raw in [
            "https://blog.boot.dev/index.xml",
            "http://news.ycombinator.com/rss",
            "https://example.com:8443/feed.xml",
            "  https://example.com/feed  ",
        ] {
            assert!(validate_feed_url(raw, false).is_ok(), "{raw} should pass");
        }
    }

    #[test]
    fn test_non_http_schemes_rejected() {
        assert!(matches!(
            validate_feed_url("ftp://example.com/feed", false),
            Err(UrlValidationError::UnsupportedScheme(s)) if s == "ftp"
        ));
        assert!(validate_feed_url("file:///etc/passwd", true).is_err());
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(matches!(
            validate_feed_url("not a url", false),
            Err(UrlValidationError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_local_and_private_hosts_rejected() {
        for raw in [
            "http://localhost/feed",
            "http://LOCALHOST:8080/feed",
            "http://127.0.0.1/feed",
            "http://10.0.0.1:3000/feed",
            "http://172.16.0.1/feed",
            "http://192.168.1.1/feed",
            "http://169.254.1.1/feed",
            "http://0.0.0.0/feed",
            "http://[::1]/feed",
            "http://[fe80::1]/feed",
            "http://[fd00::1]/feed",
        ] {
            assert!(
                matches!(
                    validate_feed_url(raw, false),
                    Err(UrlValidationError::PrivateHost(_))
                ),
                "{raw} should be refused"
            );
        }
    }

    #[test]
    fn test_private_hosts_allowed_when_opted_in() {
        let url = validate_feed_url("http://127.0.0.1:9000/rss", true).unwrap();
        assert_eq!(url.port(), Some(9000));
    }
}
