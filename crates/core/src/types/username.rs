//! Account username type.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`Username`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum UsernameError {
    /// The input string is empty.
    #[error("This field may not be blank.")]
    Empty,
    /// The input string is too long.
    #[error("Ensure this field has no more than {max} characters.")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
    },
    /// The input contains a character outside the allowed set.
    #[error(
        "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters."
    )]
    InvalidCharacter,
}

/// A login name.
///
/// ## Constraints
///
/// - Length: 1-150 characters
/// - Letters, digits and `@ . + - _` only
///
/// ## Examples
///
/// ```
/// use storefront_core::Username;
///
/// assert!(Username::parse("jane.doe+shop").is_ok());
/// assert!(Username::parse("").is_err());
/// assert!(Username::parse("has space").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(try_from = "String", into = "String")]
pub struct Username(String);

impl Username {
    /// Maximum length of a username.
    pub const MAX_LENGTH: usize = 150;

    /// Parse a `Username` from a string.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is empty, longer than 150 characters, or
    /// contains characters other than letters, digits and `@.+-_`.
    pub fn parse(s: &str) -> Result<Self, UsernameError> {
        if s.is_empty() {
            return Err(UsernameError::Empty);
        }

        if s.chars().count() > Self::MAX_LENGTH {
            return Err(UsernameError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }

        if !s
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'))
        {
            return Err(UsernameError::InvalidCharacter);
        }

        Ok(Self(s.to_owned()))
    }

    /// Returns the username as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Username {
    type Error = UsernameError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Username> for String {
    fn from(username: Username) -> Self {
        username.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid() {
        assert!(Username::parse("admin").is_ok());
        assert!(Username::parse("a.b-c_d+e@f").is_ok());
        assert!(Username::parse("ünïcödé").is_ok());
    }

    #[test]
    fn test_parse_empty() {
        assert_eq!(Username::parse(""), Err(UsernameError::Empty));
    }

    #[test]
    fn test_parse_too_long() {
        let long = "a".repeat(151);
        assert!(matches!(
            Username::parse(&long),
            Err(UsernameError::TooLong { max: 150 })
        ));
        assert!(Username::parse(&"a".repeat(150)).is_ok());
    }

    #[test]
    fn test_parse_invalid_characters() {
        assert_eq!(
            Username::parse("bad name"),
            Err(UsernameError::InvalidCharacter)
        );
        assert_eq!(Username::parse("semi;colon"), Err(UsernameError::InvalidCharacter));
    }
}
