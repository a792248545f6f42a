//! Status enums for orders and customers.
//!
//! Both are persisted and serialized as single-letter codes (`P`, `C`, `F`
//! and `B`, `S`, `G`), which keeps the wire format compact and stable.

use serde::{Deserialize, Serialize};

/// Order payment status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum PaymentStatus {
    #[default]
    #[serde(rename = "P")]
    Pending,
    #[serde(rename = "C")]
    Complete,
    #[serde(rename = "F")]
    Failed,
}

impl PaymentStatus {
    /// The single-letter code stored in the database.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Pending => "P",
            Self::Complete => "C",
            Self::Failed => "F",
        }
    }

    /// Human-readable label.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Complete => "Complete",
            Self::Failed => "Failed",
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

impl std::str::FromStr for PaymentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "P" => Ok(Self::Pending),
            "C" => Ok(Self::Complete),
            "F" => Ok(Self::Failed),
            _ => Err(format!("\"{s}\" is not a valid choice.")),
        }
    }
}

/// Customer membership tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Membership {
    #[default]
    #[serde(rename = "B")]
    Bronze,
    #[serde(rename = "S")]
    Silver,
    #[serde(rename = "G")]
    Gold,
}

impl Membership {
    /// The single-letter code stored in the database.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Bronze => "B",
            Self::Silver => "S",
            Self::Gold => "G",
        }
    }
}

impl std::fmt::Display for Membership {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

impl std::str::FromStr for Membership {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "B" => Ok(Self::Bronze),
            "S" => Ok(Self::Silver),
            "G" => Ok(Self::Gold),
            _ => Err(format!("\"{s}\" is not a valid choice.")),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_payment_status_codes_round_trip() {
        for status in [
            PaymentStatus::Pending,
            PaymentStatus::Complete,
            PaymentStatus::Failed,
        ] {
            assert_eq!(status.code().parse::<PaymentStatus>().unwrap(), status);
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{}\"", status.code()));
        }
    }

    #[test]
    fn test_payment_status_default_is_pending() {
        assert_eq!(PaymentStatus::default(), PaymentStatus::Pending);
    }

    #[test]
    fn test_invalid_choices() {
        let err = "X".parse::<PaymentStatus>().unwrap_err();
        assert_eq!(err, "\"X\" is not a valid choice.");
        assert!("gold".parse::<Membership>().is_err());
        assert!(serde_json::from_str::<Membership>("\"Z\"").is_err());
    }

    #[test]
    fn test_membership_default_is_bronze() {
        assert_eq!(Membership::default(), Membership::Bronze);
        assert_eq!(Membership::Gold.to_string(), "G");
    }
}
