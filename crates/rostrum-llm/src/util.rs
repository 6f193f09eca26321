//! Redaction helpers
//!
//! Provider error text can echo request details back, including the key.
//! Anything that may reach a transcript or a log line goes through here.

/// Longest provider detail kept verbatim
const MAX_DETAIL_BYTES: usize = 300;

/// Trailing key characters left visible by [`mask_api_key`]
const KEY_VISIBLE_TAIL: usize = 4;

/// Keys shorter than this are masked entirely
const KEY_MIN_PARTIAL_LEN: usize = 12;

/// Message families that are replaced with a fixed line, checked in order
const FAMILIES: &[(&[&str], &str)] = &[
    (
        &[
            "api key",
            "api_key",
            "api-key",
            "apikey",
            "invalid key",
            "unauthorized",
            "authentication",
            "permission denied",
            "credential",
            "bearer",
            "secret",
            "password",
        ],
        "The AI service rejected the request's authentication. Check GEMINI_API_KEY.",
    ),
    (
        &["rate limit", "quota", "resource_exhausted"],
        "The AI service is rate limiting requests. Please try again later.",
    ),
    (
        &["internal", "server error", "unavailable"],
        "The AI service had an internal error. Please retry.",
    ),
];

/// Mask an API key for logs: `****` followed by the last four characters.
///
/// # Examples
/// ```
/// use rostrum_llm::util::mask_api_key;
/// assert_eq!(mask_api_key("AIzaSyExampleKey1234"), "****1234");
/// assert_eq!(mask_api_key("short"), "****");
/// ```
#[must_use]
pub fn mask_api_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() < KEY_MIN_PARTIAL_LEN {
        return "****".to_string();
    }
    let tail: String = chars[chars.len() - KEY_VISIBLE_TAIL..].iter().collect();
    format!("****{tail}")
}

/// Replace a provider message with a fixed line when it touches
/// credentials, rate limits or server faults; otherwise bound its length.
///
/// # Examples
/// ```
/// use rostrum_llm::util::redact_provider_message;
/// assert!(redact_provider_message("API key not valid").contains("GEMINI_API_KEY"));
/// assert_eq!(redact_provider_message("Unsupported MIME type"), "Unsupported MIME type");
/// ```
#[must_use]
pub fn redact_provider_message(detail: &str) -> String {
    let lower = detail.to_lowercase();
    let family = FAMILIES
        .iter()
        .find(|(needles, _)| needles.iter().any(|n| lower.contains(n)));

    match family {
        Some((_, line)) => (*line).to_string(),
        None if detail.len() > MAX_DETAIL_BYTES => {
            format!("{}... (truncated)", truncate_safe(detail, MAX_DETAIL_BYTES))
        }
        None => detail.to_string(),
    }
}

/// Truncate to at most `max_bytes` on a char boundary.
#[must_use]
pub fn truncate_safe(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let end = (0..=max_bytes)
        .rev()
        .find(|&i| s.is_char_boundary(i))
        .unwrap_or(0);
    &s[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_counts_chars() {
        assert_eq!(mask_api_key("ключключключключ"), "****ключ");
        assert_eq!(mask_api_key(""), "****");
    }

    #[test]
    fn test_redact_families() {
        assert!(redact_provider_message("Request had invalid authentication credentials")
            .contains("GEMINI_API_KEY"));
        assert!(redact_provider_message("RESOURCE_EXHAUSTED: quota").contains("rate limiting"));
        assert!(redact_provider_message("503 UNAVAILABLE").contains("internal error"));
    }

    #[test]
    fn test_redact_truncates_long_detail() {
        let long = "x".repeat(500);
        let out = redact_provider_message(&long);
        assert!(out.starts_with(&"x".repeat(300)));
        assert!(out.ends_with("(truncated)"));
    }

    #[test]
    fn test_truncate_safe_respects_char_boundary() {
        assert_eq!(truncate_safe("é", 1), "");
        assert_eq!(truncate_safe("hello", 3), "hel");
        assert_eq!(truncate_safe("hi", 10), "hi");
    }
}
