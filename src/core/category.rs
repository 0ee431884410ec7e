//! Lead categories and their wire representation.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Follow-up segment a lead is routed to.
///
/// The serialized names match previously persisted data and must not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LeadCategory {
    /// Premium segment.
    #[serde(rename = "bch")]
    Bch,
    /// Luminaire, optional scholarship.
    #[serde(rename = "lum-l1")]
    LumL1,
    /// Luminaire, partial scholarship.
    #[serde(rename = "lum-l2")]
    LumL2,
    /// Masters, top 20-50 universities.
    #[serde(rename = "masters-l1")]
    MastersL1,
    /// Masters, top 50-100 or partner universities.
    #[serde(rename = "masters-l2")]
    MastersL2,
    /// Long-term follow-up.
    #[serde(rename = "nurture")]
    Nurture,
    /// Below minimum eligibility.
    #[serde(rename = "drop")]
    Drop,
}

/// Every category, in declaration order.
pub const ALL_CATEGORIES: [LeadCategory; 7] = [
    LeadCategory::Bch,
    LeadCategory::LumL1,
    LeadCategory::LumL2,
    LeadCategory::MastersL1,
    LeadCategory::MastersL2,
    LeadCategory::Nurture,
    LeadCategory::Drop,
];

impl LeadCategory {
    /// The persisted wire value.
    pub fn as_str(&self) -> &'static str {
        match self {
            LeadCategory::Bch => "bch",
            LeadCategory::LumL1 => "lum-l1",
            LeadCategory::LumL2 => "lum-l2",
            LeadCategory::MastersL1 => "masters-l1",
            LeadCategory::MastersL2 => "masters-l2",
            LeadCategory::Nurture => "nurture",
            LeadCategory::Drop => "drop",
        }
    }

    /// Qualified leads may book a counselling slot: bch and both Luminaire tiers.
    pub fn is_qualified(&self) -> bool {
        matches!(
            self,
            LeadCategory::Bch | LeadCategory::LumL1 | LeadCategory::LumL2
        )
    }

    /// Categories that continue to the counselling step.
    ///
    /// Wider than [`is_qualified`](Self::is_qualified): masters leads book
    /// counselling too but are not counted as qualified leads downstream.
    pub fn routes_to_counselling(&self) -> bool {
        self.is_qualified() || self.is_masters()
    }

    /// Masters tiers.
    pub fn is_masters(&self) -> bool {
        matches!(self, LeadCategory::MastersL1 | LeadCategory::MastersL2)
    }

    /// Map a raw stored value onto a category.
    ///
    /// Trims and matches case-insensitively against the wire values. Anything
    /// else becomes `Nurture`, and the original value is logged.
    pub fn sanitize(raw: &str) -> LeadCategory {
        match raw.parse::<LeadCategory>() {
            Ok(category) => category,
            Err(_) => {
                tracing::warn!(
                    original = raw,
                    "unrecognized lead category, falling back to nurture"
                );
                LeadCategory::Nurture
            }
        }
    }
}

impl fmt::Display for LeadCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string is not a category wire value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown lead category: {0}")]
pub struct UnknownCategory(pub String);

impl FromStr for LeadCategory {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        ALL_CATEGORIES
            .iter()
            .copied()
            .find(|c| c.as_str() == normalized)
            .ok_or_else(|| UnknownCategory(s.to_string()))
    }
}

/// Deserialize an optional category through [`LeadCategory::sanitize`].
///
/// Used for persisted state so a corrupted value never fails the load.
pub fn deserialize_sanitized<'de, D>(deserializer: D) -> Result<Option<LeadCategory>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Value::deserialize(deserializer)?;
    Ok(match raw {
        Value::Null => None,
        Value::String(value) => Some(LeadCategory::sanitize(&value)),
        other => {
            tracing::warn!(
                original = %other,
                "non-string lead category, falling back to nurture"
            );
            Some(LeadCategory::Nurture)
        }
    })
}
