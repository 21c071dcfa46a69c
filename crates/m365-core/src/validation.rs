use crate::error::{AdminError, Result};
use regex::Regex;
use std::sync::OnceLock;

static EMAIL_RE: OnceLock<Regex> = OnceLock::new();
static GUID_RE: OnceLock<Regex> = OnceLock::new();
static URL_RE: OnceLock<Regex> = OnceLock::new();

fn email_re() -> &'static Regex {
    EMAIL_RE.get_or_init(|| Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").unwrap())
}

fn guid_re() -> &'static Regex {
    GUID_RE.get_or_init(|| {
        Regex::new(
            r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$",
        )
        .unwrap()
    })
}

fn url_re() -> &'static Regex {
    URL_RE.get_or_init(|| Regex::new(r"^([a-zA-Z][a-zA-Z0-9+.-]*)://([^/?#\s]+)").unwrap())
}

/// Simplified RFC 5322 address check.
pub fn is_valid_email(email: &str) -> bool {
    email_re().is_match(email)
}

pub fn is_valid_guid(guid: &str) -> bool {
    guid_re().is_match(guid)
}

/// True when `url` has a host and one of `allowed_schemes`
/// (`http`/`https` when empty).
pub fn is_valid_url(url: &str, allowed_schemes: &[&str]) -> bool {
    let default = ["http", "https"];
    let allowed = if allowed_schemes.is_empty() {
        &default[..]
    } else {
        allowed_schemes
    };
    match url_re().captures(url) {
        Some(caps) => {
            let scheme = caps[1].to_ascii_lowercase();
            allowed.iter().any(|s| s.eq_ignore_ascii_case(&scheme))
        }
        None => false,
    }
}

/// Check an address and return it, or fail with `InvalidEmail`.
pub fn validate_email(email: &str) -> Result<&str> {
    if is_valid_email(email) {
        Ok(email)
    } else {
        Err(AdminError::InvalidEmail(email.to_string()))
    }
}

/// Reject empty or whitespace-only required text fields.
pub fn require_non_empty<'a>(field: &str, value: &'a str) -> Result<&'a str> {
    if value.trim().is_empty() {
        Err(AdminError::MissingField(field.to_string()))
    } else {
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_accepts_common_forms() {
        assert!(is_valid_email("user@example.com"));
        assert!(is_valid_email("first.last+tag@sub.example.co.uk"));
        assert!(is_valid_email("a_b%c-d@contoso.onmicrosoft.com"));
    }

    #[test]
    fn email_rejects_malformed() {
        assert!(!is_valid_email("invalid.email"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("user@"));
        assert!(!is_valid_email("user@example"));
        assert!(!is_valid_email("user@example.c"));
        assert!(!is_valid_email("user name@example.com"));
        assert!(!is_valid_email(""));
    }

    #[test]
    fn validate_email_returns_typed_error() {
        assert_eq!(validate_email("ops@contoso.com").unwrap(), "ops@contoso.com");
        assert!(matches!(
            validate_email("nope"),
            Err(AdminError::InvalidEmail(e)) if e == "nope"
        ));
    }

    #[test]
    fn guid_format() {
        assert!(is_valid_guid("00000000-0000-0000-0000-000000000000"));
        assert!(is_valid_guid("3F2504E0-4F89-11D3-9A0C-0305E82C3301"));
        assert!(!is_valid_guid("invalid-guid"));
        assert!(!is_valid_guid("00000000-0000-0000-0000-00000000000"));
    }

    #[test]
    fn url_schemes() {
        assert!(is_valid_url("https://example.com", &[]));
        assert!(is_valid_url("http://example.com/path?q=1", &[]));
        assert!(is_valid_url("ftp://example.com", &["ftp"]));
        assert!(!is_valid_url("ftp://example.com", &[]));
        assert!(!is_valid_url("javascript:alert('xss')", &[]));
        assert!(!is_valid_url("https://", &[]));
    }

    #[test]
    fn non_empty_fields() {
        assert!(require_non_empty("teamName", "Ops").is_ok());
        assert!(matches!(
            require_non_empty("teamName", "   "),
            Err(AdminError::MissingField(f)) if f == "teamName"
        ));
    }
}
