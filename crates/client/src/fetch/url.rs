//! URL resolution against the site origin.

use url::Url;

/// Error type for URL resolution failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UrlError {
    #[error("empty URL")]
    Empty,

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

/// Resolve a request target against `origin`.
///
/// Normalization steps:
/// 1. Trim leading/trailing whitespace
/// 2. Absolute URLs are parsed as-is; anything else is joined onto `origin`
/// 3. Only http and https are accepted
/// 4. Remove fragment (#...); the query string is kept
pub fn resolve(origin: &Url, input: &str) -> Result<Url, UrlError> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let mut parsed = if trimmed.contains("://") {
        Url::parse(trimmed)
    } else {
        origin.join(trimmed)
    }
    .map_err(|e| UrlError::InvalidUrl(e.to_string()))?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => return Err(UrlError::UnsupportedScheme(scheme.to_string())),
    }

    parsed.set_fragment(None);

    Ok(parsed)
}

/// Parse the configured origin.
pub fn parse_origin(origin: &str) -> Result<Url, UrlError> {
    let parsed = Url::parse(origin.trim()).map_err(|e| UrlError::InvalidUrl(e.to_string()))?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        scheme => Err(UrlError::UnsupportedScheme(scheme.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn origin() -> Url {
        Url::parse("https://club.example.org").unwrap()
    }

    #[test]
    fn test_resolve_path() {
        let url = resolve(&origin(), "/about/").unwrap();
        assert_eq!(url.as_str(), "https://club.example.org/about/");
    }

    #[test]
    fn test_resolve_keeps_query() {
        let url = resolve(&origin(), "/about/?x=1").unwrap();
        assert_eq!(url.query(), Some("x=1"));
    }

    #[test]
    fn test_resolve_absolute() {
        let url = resolve(&origin(), "https://EXAMPLE.COM/team/").unwrap();
        assert_eq!(url.as_str(), "https://example.com/team/");
    }

    #[test]
    fn test_resolve_removes_fragment() {
        let url = resolve(&origin(), "/events/#june").unwrap();
        assert_eq!(url.fragment(), None);
        assert_eq!(url.path(), "/events/");
    }

    #[test]
    fn test_resolve_trim_whitespace() {
        let url = resolve(&origin(), "  /team/  ").unwrap();
        assert_eq!(url.as_str(), "https://club.example.org/team/");
    }

    #[test]
    fn test_resolve_unsupported_scheme() {
        let result = resolve(&origin(), "file:///etc/passwd");
        assert!(matches!(result, Err(UrlError::UnsupportedScheme(_))));
    }

    #[test]
    fn test_resolve_empty() {
        assert!(matches!(resolve(&origin(), ""), Err(UrlError::Empty)));
        assert!(matches!(resolve(&origin(), "   "), Err(UrlError::Empty)));
    }

    #[test]
    fn test_parse_origin() {
        assert!(parse_origin("http://localhost:8080").is_ok());
        assert!(matches!(parse_origin("ftp://example.com"), Err(UrlError::UnsupportedScheme(_))));
        assert!(matches!(parse_origin("example.com"), Err(UrlError::InvalidUrl(_))));
    }
}
