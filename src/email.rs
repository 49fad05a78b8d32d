//! Email address shape check.

use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

/// Something, an `@`, something, a `.`, something. Deliberately lenient.
static EMAIL_SHAPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^@]+@[^@]+\.[^@]+$").expect("email pattern is a valid regex")
});

/// Rejected email input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("please enter a valid email address")]
pub struct ValidationError {
    input: String,
}

impl ValidationError {
    /// The input that failed the check, so the form can be refilled.
    pub fn input(&self) -> &str {
        &self.input
    }
}

/// An email address that passed the structural check.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EmailAddress(String);

impl EmailAddress {
    /// Validates `raw` after trimming surrounding whitespace.
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let trimmed = raw.trim();
        if EMAIL_SHAPE.is_match(trimmed) {
            Ok(Self(trimmed.to_string()))
        } else {
            Err(ValidationError {
                input: raw.to_string(),
            })
        }
    }

    /// The validated address.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// A log-safe rendering: first character of the local part, then the domain.
    pub fn masked(&self) -> String {
        match self.0.split_once('@') {
            Some((local, domain)) => {
                let first = local.chars().next().unwrap_or('*');
                format!("{first}***@{domain}")
            }
            None => "***".to_string(),
        }
    }
}

impl fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_basic_shapes() {
        for ok in ["a@b.co", "jane.doe@example.com", "x@y.z", "a+tag@sub.domain.org"] {
            assert!(EmailAddress::parse(ok).is_ok(), "{ok} should pass");
        }
    }

    #[test]
    fn test_rejects_missing_at_or_dot() {
        for bad in ["a@b", "ab.com", "", "@b.co", "a@.co", "a@b.", "a@@b.co", "a@b@c.d"] {
            assert!(EmailAddress::parse(bad).is_err(), "{bad:?} should fail");
        }
    }

    #[test]
    fn test_dot_must_follow_at() {
        assert!(EmailAddress::parse("first.last@localhost").is_err());
    }

    #[test]
    fn test_lenient_about_content() {
        // Not RFC validation: spaces inside parts are tolerated
        assert!(EmailAddress::parse("a b@c.d").is_ok());
    }

    #[test]
    fn test_trims_whitespace() {
        let email = EmailAddress::parse("  a@b.co \n").unwrap();
        assert_eq!(email.as_str(), "a@b.co");
    }

    #[test]
    fn test_error_keeps_input() {
        let err = EmailAddress::parse("nope").unwrap_err();
        assert_eq!(err.input(), "nope");
        assert_eq!(err.to_string(), "please enter a valid email address");
    }

    #[test]
    fn test_masked() {
        let email = EmailAddress::parse("jane@example.com").unwrap();
        assert_eq!(email.masked(), "j***@example.com");
    }
}
