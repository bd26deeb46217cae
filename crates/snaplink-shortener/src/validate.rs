use snaplink_core::ShortenerError;
use url::Url;

/// Longest destination URL accepted, in bytes.
pub const MAX_URL_LENGTH: usize = 2048;

/// Checks that `url` is an absolute http(s) URL with a host and returns it
/// parsed.
///
/// Callers store the parsed serialization, never the input: parsing drops
/// tabs and newlines and percent-encodes what a `Location` header cannot carry.
pub fn validate_url(url: &str) -> Result<Url, ShortenerError> {
    if url.trim().is_empty() {
        return Err(ShortenerError::InvalidUrl("URL cannot be empty".to_string()));
    }

    if url.len() > MAX_URL_LENGTH {
        return Err(ShortenerError::InvalidUrl(format!(
            "URL is longer than {MAX_URL_LENGTH} bytes"
        )));
    }

    let parsed = Url::parse(url)
        .map_err(|e| ShortenerError::InvalidUrl(format!("{url}: {e}")))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ShortenerError::InvalidUrl(format!(
            "URL scheme must be http or https: {}",
            parsed.scheme()
        )));
    }

    if parsed.host_str().is_none_or(str::is_empty) {
        return Err(ShortenerError::InvalidUrl(format!("URL has no host: {url}")));
    }

    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_http_and_https() {
        assert!(validate_url("https://example.com/long/url?q=1").is_ok());
        assert!(validate_url("http://localhost:8080").is_ok());
    }

    #[test]
    fn rejects_malformed_urls() {
        for url in [
            "",
            "   ",
            "example.com",
            "ftp://example.com/file",
            "javascript:alert(1)",
            "mailto:someone@example.com",
            "https://",
        ] {
            assert!(
                matches!(validate_url(url), Err(ShortenerError::InvalidUrl(_))),
                "{url:?} should be rejected"
            );
        }
    }

    #[test]
    fn control_characters_do_not_survive_parsing() {
        let url = validate_url("https://exa\nmple.com/x\t?q=a b").unwrap();
        assert_eq!(url.as_str(), "https://example.com/x?q=a%20b");
        assert!(!url.as_str().chars().any(|c| c.is_ascii_control() || c == ' '));
    }

    #[test]
    fn non_ascii_is_encoded() {
        let url = validate_url("https://bücher.example/straße").unwrap();
        assert!(url.as_str().is_ascii());
    }

    #[test]
    fn rejects_oversized_urls() {
        let url = format!("https://example.com/{}", "a".repeat(MAX_URL_LENGTH));
        assert!(validate_url(&url).is_err());

        let path = "a".repeat(MAX_URL_LENGTH - "https://example.com/".len());
        assert!(validate_url(&format!("https://example.com/{path}")).is_ok());
    }
}
