//! Content types for generic relations.
//!
//! Tags and likes attach to "any" entity through a `(content_type, object_id)`
//! pair. The set of attachable entities is closed and known at compile time,
//! so the content type is an enum rather than a foreign key into a registry
//! table. Each variant is named `<app>.<model>` on the wire and in the
//! database.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Error returned for an unknown `<app>.<model>` label.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown content type: {0}")]
pub struct ContentTypeError(pub String);

/// An entity kind that tags and likes can point at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ContentType {
    Product,
    Collection,
    Review,
    Promotion,
    Customer,
}

impl ContentType {
    /// All attachable content types.
    pub const ALL: [Self; 5] = [
        Self::Product,
        Self::Collection,
        Self::Review,
        Self::Promotion,
        Self::Customer,
    ];

    /// The `<app>.<model>` label.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Product => "store.product",
            Self::Collection => "store.collection",
            Self::Review => "store.review",
            Self::Promotion => "store.promotion",
            Self::Customer => "store.customer",
        }
    }

    /// The fully-qualified table holding objects of this type.
    #[must_use]
    pub const fn table(&self) -> &'static str {
        match self {
            Self::Product => "store.product",
            Self::Collection => "store.collection",
            Self::Review => "store.review",
            Self::Promotion => "store.promotion",
            Self::Customer => "store.customer",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl std::str::FromStr for ContentType {
    type Err = ContentTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|ct| ct.label() == lower)
            .ok_or_else(|| ContentTypeError(s.to_owned()))
    }
}

impl TryFrom<String> for ContentType {
    type Error = ContentTypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ContentType> for String {
    fn from(ct: ContentType) -> Self {
        ct.label().to_owned()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_labels() {
        assert_eq!(
            "store.product".parse::<ContentType>().unwrap(),
            ContentType::Product
        );
        assert_eq!(
            "Store.Collection".parse::<ContentType>().unwrap(),
            ContentType::Collection
        );
    }

    #[test]
    fn test_parse_unknown() {
        let err = "store.widget".parse::<ContentType>().unwrap_err();
        assert_eq!(err.to_string(), "unknown content type: store.widget");
    }

    #[test]
    fn test_every_label_round_trips() {
        for ct in ContentType::ALL {
            assert_eq!(ct.label().parse::<ContentType>().unwrap(), ct);
            let json = serde_json::to_string(&ct).unwrap();
            assert_eq!(serde_json::from_str::<ContentType>(&json).unwrap(), ct);
        }
    }
}
