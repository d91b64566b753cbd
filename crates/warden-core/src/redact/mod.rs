//! Secret redaction for captured output
//!
//! Every stdout/stderr string and every internal error message passes through
//! [`SecretRedactor::redact`] before it leaves the sandbox boundary.

use regex::{Captures, Regex};
use sha2::{Digest, Sha256};
use std::sync::LazyLock;

/// Replacement for a redacted value
pub const REDACTED: &str = "REDACTED";

/// `label <sep> value` secrets; the label and separator survive
static KEY_VALUE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r#"(?i)(token["']?\s*[:=]\s*["']?)([A-Za-z0-9_\-]{20,})"#,
        r#"(?i)(api[_-]?key["']?\s*[:=]\s*["']?)([A-Za-z0-9_\-]{20,})"#,
        r#"(?i)(password["']?\s*[:=]\s*["']?)([^\s"']+)"#,
        r#"(?i)(secret["']?\s*[:=]\s*["']?)([A-Za-z0-9_\-]{20,})"#,
        r#"(?i)(dsn["']?\s*[:=]\s*["']?)([^\s"']+)"#,
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

/// Free-standing sensitive values; the whole match is replaced
static VALUE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        // SSN
        r"\b\d{3}-\d{2}-\d{4}\b",
        // Card number
        r"\b\d{4}[\s-]?\d{4}[\s-]?\d{4}[\s-]?\d{4}\b",
        // Email, including chained `a@b.cc@d.ee` forms
        r"(?i)\b[A-Za-z0-9._%+-]+(?:@[A-Za-z0-9.-]+\.[A-Za-z]{2,})+\b",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

/// Upper bound on full pattern passes per call
const MAX_PASSES: usize = 4;

/// Pattern-based scrubber for sensitive strings
#[derive(Debug, Clone, Copy, Default)]
pub struct SecretRedactor;

impl SecretRedactor {
    /// Replace every sensitive value in `text`
    ///
    /// Deterministic and idempotent. Passes repeat until the output stops
    /// changing, since a replacement can join with neighbouring text into a
    /// new match.
    pub fn redact(text: &str) -> String {
        let mut redacted = Self::redact_pass(text);
        for _ in 1..MAX_PASSES {
            let next = Self::redact_pass(&redacted);
            if next == redacted {
                break;
            }
            redacted = next;
        }
        redacted
    }

    fn redact_pass(text: &str) -> String {
        let mut redacted = text.to_string();
        for pattern in KEY_VALUE_PATTERNS.iter() {
            redacted = pattern
                .replace_all(&redacted, |caps: &Captures| format!("{}{}", &caps[1], REDACTED))
                .into_owned();
        }
        for pattern in VALUE_PATTERNS.iter() {
            redacted = pattern.replace_all(&redacted, REDACTED).into_owned();
        }
        redacted
    }

    /// Stable, non-reversible identifier: first 16 hex chars of SHA-256
    pub fn hash_pii(value: &str) -> String {
        let digest = Sha256::digest(value.as_bytes());
        format!("{:x}", digest)[..16].to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_key_keeps_label() {
        let out = SecretRedactor::redact("api_key=abcdefghijklmnopqrstuvwxyz123");
        assert_eq!(out, "api_key=REDACTED");
    }

    #[test]
    fn test_quoted_json_secret() {
        let out = SecretRedactor::redact(r#"{"password": "hunter2", "user": "bob"}"#);
        assert_eq!(out, r#"{"password": "REDACTED", "user": "bob"}"#);
    }

    #[test]
    fn test_short_token_not_redacted() {
        // Tokens shorter than twenty characters are not credential-shaped
        assert_eq!(SecretRedactor::redact("token=abc"), "token=abc");
    }

    #[test]
    fn test_dsn_redacted() {
        let out = SecretRedactor::redact("DSN: postgres://u:p@db.internal/app");
        assert_eq!(out, "DSN: REDACTED");
    }

    #[test]
    fn test_ssn_card_email() {
        let out = SecretRedactor::redact(
            "ssn 123-45-6789 card 4111 1111 1111 1111 mail alice@example.com",
        );
        assert_eq!(out, "ssn REDACTED card REDACTED mail REDACTED");
    }

    #[test]
    fn test_plain_text_untouched() {
        let text = "result = 4\nall good";
        assert_eq!(SecretRedactor::redact(text), text);
    }

    #[test]
    fn test_redact_is_idempotent() {
        let samples = [
            "api_key=abcdefghijklmnopqrstuvwxyz123",
            "Token: 'ghp_ABCDEFGHIJKLMNOPQRSTUVWX'",
            "password=REDACTED",
            "secret=0123456789abcdefghij0123 and password: p@ss",
            "contact bob.smith+tag@corp.example.org or 555-12-3456",
            "cards 4111-1111-1111-1111 and 5500 0000 0000 0004",
            "dsn=https://key@sentry.io/42 email=root@localhost.dev",
            "a@b.cc@d.ee",
            "reply to a@b.cc@d.ee",
            "x@y.zz@REDACTED.io and a@b.c@d.ee",
        ];
        for sample in samples {
            let once = SecretRedactor::redact(sample);
            assert_eq!(SecretRedactor::redact(&once), once, "input: {}", sample);
        }
    }

    #[test]
    fn test_chained_email_redacted_whole() {
        assert_eq!(SecretRedactor::redact("reply to a@b.cc@d.ee"), "reply to REDACTED");
    }

    #[test]
    fn test_hash_pii() {
        let hash = SecretRedactor::hash_pii("alice@example.com");
        assert_eq!(hash.len(), 16);
        assert_eq!(hash, SecretRedactor::hash_pii("alice@example.com"));
        assert_ne!(hash, SecretRedactor::hash_pii("bob@example.com"));
    }
}
