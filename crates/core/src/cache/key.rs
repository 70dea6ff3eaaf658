//! Request key normalization.

use sha2::{Digest, Sha256};

/// Compute the row key for a stored request within a generation.
///
/// Re-storing the same method and URL in the same generation yields the same
/// key, so repeated installs replace entries instead of duplicating them.
pub fn compute_entry_key(generation: &str, method: &str, url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(generation.as_bytes());
    hasher.update(b"\n");
    hasher.update(normalize_method(method).as_bytes());
    hasher.update(b"\n");
    hasher.update(url.as_bytes());
    hex::encode(hasher.finalize())
}

/// Upper-case an HTTP method name.
pub fn normalize_method(method: &str) -> String {
    method.trim().to_ascii_uppercase()
}

/// Drop the query string and fragment from a URL.
///
/// Unparseable input is cut at the first `?` or `#`.
pub fn strip_search(input: &str) -> String {
    match url::Url::parse(input) {
        Ok(mut parsed) => {
            parsed.set_query(None);
            parsed.set_fragment(None);
            parsed.into()
        }
        Err(_) => input
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_key_stability() {
        let a = compute_entry_key("v1", "GET", "https://example.com/");
        let b = compute_entry_key("v1", "get", "https://example.com/");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_entry_key_scoped_by_generation() {
        let a = compute_entry_key("v1", "GET", "https://example.com/");
        let b = compute_entry_key("v2", "GET", "https://example.com/");
        assert_ne!(a, b);
    }

    #[test]
    fn test_strip_search() {
        assert_eq!(strip_search("https://example.com/about/?x=1"), "https://example.com/about/");
        assert_eq!(strip_search("https://example.com/about/?x=1#top"), "https://example.com/about/");
        assert_eq!(strip_search("https://example.com/team/"), "https://example.com/team/");
    }

    #[test]
    fn test_strip_search_relative() {
        assert_eq!(strip_search("/about/?x=1"), "/about/");
        assert_eq!(strip_search("/events/#later"), "/events/");
    }
}
