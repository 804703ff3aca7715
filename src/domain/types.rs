//! Shared domain enumerations.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use super::error::DomainError;

/// Moderation state of a catalog product.
///
/// Only `Approved` products are visible to customers; the other states are
/// reachable through vendor submission and admin moderation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ProductStatus {
    Pending,
    Approved,
    Rejected,
    Suspended,
}

impl ProductStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ProductStatus::Pending => "Pending",
            ProductStatus::Approved => "Approved",
            ProductStatus::Rejected => "Rejected",
            ProductStatus::Suspended => "Suspended",
        }
    }
}

impl fmt::Display for ProductStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProductStatus {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(ProductStatus::Pending),
            "approved" => Ok(ProductStatus::Approved),
            "rejected" => Ok(ProductStatus::Rejected),
            "suspended" => Ok(ProductStatus::Suspended),
            other => Err(DomainError::validation(format!(
                "unknown product status `{other}`"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_status_case_insensitively() {
        assert_eq!(
            "approved".parse::<ProductStatus>().expect("status"),
            ProductStatus::Approved
        );
        assert_eq!(
            " SUSPENDED ".parse::<ProductStatus>().expect("status"),
            ProductStatus::Suspended
        );
    }

    #[test]
    fn rejects_unknown_status() {
        let err = "archived"
            .parse::<ProductStatus>()
            .expect_err("unknown status rejected");
        assert!(matches!(err, DomainError::Validation { .. }));
    }

    #[test]
    fn serializes_as_pascal_case() {
        let json = serde_json::to_string(&ProductStatus::Pending).expect("serialize");
        assert_eq!(json, "\"Pending\"");
    }
}
