use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use validator::ValidateEmail;

/// Domains whose mailboxes ignore dots in the local part.
const DOTLESS_DOMAINS: &[&str] = &["gmail.com"];

/// Domains that use `-` rather than `+` for subaddressing.
const HYPHEN_SUBADDRESS_DOMAINS: &[&str] = &["yahoo.com", "ymail.com", "rocketmail.com"];

/// A syntactically valid email address as the visitor typed it.
///
/// Comparisons between addresses go through [`Email::canonical`], never
/// through the raw string.
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq, Hash)]
pub struct Email(String);

impl Email {
    pub fn parse(s: &str) -> Result<Email, InvalidEmailError> {
        let s = s.trim();
        if ValidateEmail::validate_email(&s) {
            Ok(Self(s.to_string()))
        } else {
            Err(InvalidEmailError { s: s.to_string() })
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Canonical form used as the identity key for this address.
    pub fn canonical(&self) -> String {
        canonicalize(&self.0)
    }

    /// True when both addresses reach the same mailbox.
    pub fn is_equivalent_to(&self, other: &str) -> bool {
        self.canonical() == canonicalize(other)
    }
}

impl AsRef<str> for Email {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_ref())
    }
}

#[derive(Debug, Error)]
#[error("{s} is not a valid email")]
pub struct InvalidEmailError {
    s: String,
}

/// Folds an address to the form mailbox providers deliver to.
///
/// Lowercases, drops `+tag` subaddresses, maps `googlemail.com` onto
/// `gmail.com` and removes dots from Gmail local parts. Input without an
/// `@` is only trimmed and lowercased.
pub fn canonicalize(raw: &str) -> String {
    let lowered = raw.trim().to_lowercase();
    let Some((local, domain)) = lowered.rsplit_once('@') else {
        return lowered;
    };

    let domain = match domain {
        "googlemail.com" => "gmail.com",
        other => other,
    };

    let mut local = local.split('+').next().unwrap_or(local);
    if HYPHEN_SUBADDRESS_DOMAINS.contains(&domain) {
        local = local.split('-').next().unwrap_or(local);
    }

    let local = if DOTLESS_DOMAINS.contains(&domain) {
        local.replace('.', "")
    } else {
        local.to_string()
    };

    // "+news@example.com" has no mailbox left after folding
    if local.is_empty() {
        return lowered;
    }

    format!("{}@{}", local, domain)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn subaddress_and_case_are_folded() {
        let email = Email::parse("User+tag@Example.com").unwrap();
        assert_eq!(email.canonical(), "user@example.com");
        assert!(email.is_equivalent_to("user@example.com"));
    }

    #[test]
    fn gmail_dots_and_googlemail_are_folded() {
        assert_eq!(canonicalize("First.Last@googlemail.com"), "firstlast@gmail.com");
        assert_eq!(canonicalize("f.i.r.s.t.last+x@gmail.com"), "firstlast@gmail.com");
    }

    #[test]
    fn dots_are_kept_outside_gmail() {
        assert_ne!(
            canonicalize("first.last@example.com"),
            canonicalize("firstlast@example.com")
        );
    }

    #[test]
    fn yahoo_hyphen_subaddress_is_folded() {
        assert_eq!(canonicalize("someone-lists@yahoo.com"), "someone@yahoo.com");
        assert_eq!(canonicalize("some-one@example.com"), "some-one@example.com");
    }

    #[test]
    fn distinct_addresses_stay_distinct() {
        let email = Email::parse("alice@example.com").unwrap();
        assert!(!email.is_equivalent_to("alicia@example.com"));
        assert!(!email.is_equivalent_to("alice@example.org"));
    }

    #[test]
    fn bare_subaddress_is_not_emptied() {
        assert_eq!(canonicalize("+news@example.com"), "+news@example.com");
    }

    #[test]
    fn parse_trims_and_rejects_garbage() {
        assert_eq!(Email::parse("  a@x.com ").unwrap().as_str(), "a@x.com");
        assert!(Email::parse("not-an-email").is_err());
        assert!(Email::parse("").is_err());
    }
}
