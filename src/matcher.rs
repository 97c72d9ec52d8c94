/// URL pattern matching for Auto Tab Grouper
use regex::RegexBuilder;
use serde::{Deserialize, Serialize};

/// How a rule's pattern text is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatternKind {
    Simple,
    Regex,
}

impl Default for PatternKind {
    fn default() -> Self {
        PatternKind::Simple
    }
}

/// Extract the hostname from a URL, with any leading "www." stripped.
///
/// Returns None for strings the URL parser rejects and for URLs without a
/// host (e.g. "about:blank").
pub fn extract_hostname(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    let host = parsed.host_str()?;
    Some(host.strip_prefix("www.").unwrap_or(host).to_string())
}

/// Normalize a URL to its "hostname + pathname" form.
///
/// The hostname loses its "www." prefix and the path loses its trailing
/// slash; a root path contributes nothing, so "https://www.example.com/" and
/// "https://example.com" both normalize to "example.com".
pub fn extract_url_pattern(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    let host = parsed.host_str()?;
    let host = host.strip_prefix("www.").unwrap_or(host);
    let path = parsed.path();
    let path = if path == "/" {
        ""
    } else {
        path.trim_end_matches('/')
    };
    Some(format!("{host}{path}"))
}

/// Decide whether `url` is claimed by a rule pattern.
///
/// Simple patterns without a "/" must equal the hostname exactly. Patterns
/// with a path are prefix matches against the normalized URL pattern, so
/// "example.com/do" also claims "example.com/docs-old" (prefix semantics,
/// not segment-boundary matching). Regex patterns are compiled
/// case-insensitively and search anywhere in the raw URL string; a pattern
/// that fails to compile matches nothing.
pub fn matches_pattern(url: &str, pattern: &str, kind: PatternKind) -> bool {
    match kind {
        PatternKind::Regex => RegexBuilder::new(pattern)
            .case_insensitive(true)
            .build()
            .map(|re| re.is_match(url))
            .unwrap_or(false),
        PatternKind::Simple => {
            let Some(url_pattern) = extract_url_pattern(url) else {
                return false;
            };
            if !pattern.contains('/') {
                return extract_hostname(url).is_some_and(|hostname| hostname == pattern);
            }
            url_pattern.starts_with(pattern)
        }
    }
}

/// Check a pattern at rule-creation time. Simple patterns are always
/// accepted; regex patterns must compile.
pub fn validate_pattern(pattern: &str, kind: PatternKind) -> Result<(), regex::Error> {
    if kind == PatternKind::Regex {
        RegexBuilder::new(pattern).case_insensitive(true).build()?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_hostname_strips_www() {
        assert_eq!(
            extract_hostname("https://www.example.com/docs"),
            Some("example.com".to_string())
        );
        assert_eq!(
            extract_hostname("https://example.com"),
            Some("example.com".to_string())
        );
        assert_eq!(
            extract_hostname("https://mail.example.com"),
            Some("mail.example.com".to_string())
        );
    }

    #[test]
    fn test_extract_hostname_invalid() {
        assert_eq!(extract_hostname(""), None);
        assert_eq!(extract_hostname("not a url"), None);
        assert_eq!(extract_hostname("about:blank"), None);
    }

    #[test]
    fn test_extract_url_pattern_basic() {
        assert_eq!(
            extract_url_pattern("https://www.example.com/docs"),
            Some("example.com/docs".to_string())
        );
        assert_eq!(
            extract_url_pattern("https://example.com"),
            Some("example.com".to_string())
        );
    }

    #[test]
    fn test_extract_url_pattern_root_path_is_empty() {
        assert_eq!(
            extract_url_pattern("https://example.com/"),
            Some("example.com".to_string())
        );
    }

    #[test]
    fn test_extract_url_pattern_trailing_slash_idempotent() {
        // "u/" and "u" normalize identically for non-root paths
        assert_eq!(
            extract_url_pattern("https://example.com/docs/"),
            extract_url_pattern("https://example.com/docs")
        );
    }

    #[test]
    fn test_simple_hostname_pattern_is_exact() {
        assert!(matches_pattern(
            "https://www.example.com/anything",
            "example.com",
            PatternKind::Simple
        ));
        // A hostname-only pattern does not claim subdomains
        assert!(!matches_pattern(
            "https://mail.example.com",
            "example.com",
            PatternKind::Simple
        ));
        assert!(!matches_pattern(
            "https://example.org",
            "example.com",
            PatternKind::Simple
        ));
    }

    #[test]
    fn test_simple_path_pattern_is_prefix() {
        assert!(matches_pattern(
            "https://example.com/docs/intro",
            "example.com/docs",
            PatternKind::Simple
        ));
        assert!(!matches_pattern(
            "https://example.com/blog",
            "example.com/docs",
            PatternKind::Simple
        ));
    }

    #[test]
    fn test_simple_prefix_overmatch_is_accepted_behavior() {
        // Known edge case: prefix matching is not segment-aware, so
        // "example.com/do" also claims "example.com/docs-old".
        assert!(matches_pattern(
            "https://example.com/docs-old",
            "example.com/do",
            PatternKind::Simple
        ));
    }

    #[test]
    fn test_regex_pattern_case_insensitive() {
        assert!(matches_pattern(
            "https://EXAMPLE.com/Docs",
            "example\\.com/docs",
            PatternKind::Regex
        ));
        assert!(matches_pattern(
            "https://issues.example.com/browse/ABC-123",
            "ABC-\\d+",
            PatternKind::Regex
        ));
        assert!(!matches_pattern(
            "https://example.com",
            "example\\.org",
            PatternKind::Regex
        ));
    }

    #[test]
    fn test_invalid_regex_never_matches() {
        assert!(!matches_pattern(
            "https://example.com",
            "[unclosed",
            PatternKind::Regex
        ));
    }

    #[test]
    fn test_malformed_url_never_matches() {
        assert!(!matches_pattern("not a url", "example.com", PatternKind::Simple));
        assert!(!matches_pattern("", "example.com", PatternKind::Simple));
    }

    #[test]
    fn test_validate_pattern() {
        assert!(validate_pattern("example.com/docs", PatternKind::Simple).is_ok());
        assert!(validate_pattern("[unclosed", PatternKind::Simple).is_ok());
        assert!(validate_pattern("ABC-\\d+", PatternKind::Regex).is_ok());
        assert!(validate_pattern("[unclosed", PatternKind::Regex).is_err());
    }
}
