//! Account email address.
//!
//! Emails identify accounts alongside usernames and are unique per user, so
//! two spellings of the same address must compare equal. Surrounding
//! whitespace is dropped and the domain is lowercased; the local part is kept
//! as typed because mail servers may treat it case-sensitively.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Why an address was rejected. The messages are shown to API clients.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum EmailError {
    #[error("This field may not be blank.")]
    Blank,
    #[error("Ensure this field has no more than {max} characters.")]
    TooLong { max: usize },
    #[error("Enter a valid email address.")]
    Invalid,
}

/// A normalized account email.
///
/// ```
/// use storefront_core::Email;
///
/// let email = Email::parse("  Jane@Shop.Example ").unwrap();
/// assert_eq!(email.as_str(), "Jane@shop.example");
/// assert!(Email::parse("jane@localhost").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(try_from = "String", into = "String")]
pub struct Email(String);

impl Email {
    /// Width of the `email` column.
    pub const MAX_LENGTH: usize = 254;

    /// Validate and normalize an address.
    ///
    /// # Errors
    ///
    /// Returns `EmailError::Blank` for empty input, `EmailError::TooLong` past
    /// [`Self::MAX_LENGTH`], and `EmailError::Invalid` when the address is not
    /// `local@domain.tld`.
    pub fn parse(s: &str) -> Result<Self, EmailError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(EmailError::Blank);
        }
        if s.chars().count() > Self::MAX_LENGTH {
            return Err(EmailError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }

        let (local, domain) = s.split_once('@').ok_or(EmailError::Invalid)?;
        if !is_valid_local(local) || !is_valid_domain(domain) {
            return Err(EmailError::Invalid);
        }

        Ok(Self(format!("{local}@{}", domain.to_ascii_lowercase())))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn is_valid_local(local: &str) -> bool {
    !local.is_empty()
        && !local.starts_with('.')
        && !local.ends_with('.')
        && !local.contains("..")
        && local
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "!#$%&'*+/=?^_`{|}~.-".contains(c))
}

/// At least two dot-separated labels of letters, digits and inner hyphens.
fn is_valid_domain(domain: &str) -> bool {
    let labels: Vec<&str> = domain.split('.').collect();
    labels.len() >= 2
        && labels.iter().all(|label| {
            !label.is_empty()
                && !label.starts_with('-')
                && !label.ends_with('-')
                && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        })
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Email {
    type Err = EmailError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Email {
    type Error = EmailError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Email> for String {
    fn from(email: Email) -> Self {
        email.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_common_addresses() {
        for raw in [
            "user@example.com",
            "first.last+orders@mail.example.co.uk",
            "o'brien@shop-1.example",
            "a@b.c",
        ] {
            assert!(Email::parse(raw).is_ok(), "{raw}");
        }
    }

    #[test]
    fn test_normalizes_domain_and_whitespace() {
        let email = Email::parse("  Jane.Doe@Example.COM\n").unwrap();
        assert_eq!(email.as_str(), "Jane.Doe@example.com");
        assert_eq!(email, Email::parse("Jane.Doe@example.com").unwrap());
        assert_ne!(email, Email::parse("jane.doe@example.com").unwrap());
    }

    #[test]
    fn test_blank_and_length() {
        assert_eq!(Email::parse("   "), Err(EmailError::Blank));

        let at_limit = format!("{}@example.com", "a".repeat(Email::MAX_LENGTH - 12));
        assert!(Email::parse(&at_limit).is_ok());
        let too_long = format!("a{at_limit}");
        assert_eq!(
            Email::parse(&too_long).unwrap_err().to_string(),
            "Ensure this field has no more than 254 characters."
        );
    }

    #[test]
    fn test_rejects_malformed() {
        for raw in [
            "no-at-symbol",
            "@example.com",
            "user@",
            "user@localhost",
            "two@@example.com",
            "a@b@example.com",
            "has space@example.com",
            ".dot@example.com",
            "dot.@example.com",
            "dou..ble@example.com",
            "user@-example.com",
            "user@example..com",
            "user@exa_mple.com",
        ] {
            assert_eq!(Email::parse(raw), Err(EmailError::Invalid), "{raw}");
        }
        assert_eq!(
            EmailError::Invalid.to_string(),
            "Enter a valid email address."
        );
    }

    #[test]
    fn test_serde_validates() {
        let email: Email = serde_json::from_str("\" user@Example.com \"").unwrap();
        assert_eq!(serde_json::to_string(&email).unwrap(), "\"user@example.com\"");
        assert!(serde_json::from_str::<Email>("\"not-an-email\"").is_err());
    }
}
