//! Shared value types for the classifier and its sub-classifiers.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Final risk tier returned by the classifier.
///
/// Ordered `none < low < medium < high` so that `max(a, b)` implements the
/// numeric-max half of the merge algebra directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    None,
    Low,
    Medium,
    High,
}

impl Tier {
    fn rank(self) -> u8 {
        match self {
            Tier::None => 1,
            Tier::Low => 2,
            Tier::Medium => 3,
            Tier::High => 4,
        }
    }
}

impl PartialOrd for Tier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Tier {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank().cmp(&other.rank())
    }
}

/// Intermediate result of one sub-classifier (IP side or email side) before merge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubVerdict {
    pub tier: Tier,
    pub reasons: Vec<String>,
}

impl SubVerdict {
    pub fn none() -> Self {
        Self {
            tier: Tier::None,
            reasons: Vec::new(),
        }
    }

    pub fn new(tier: Tier, reason: impl Into<String>) -> Self {
        Self {
            tier,
            reasons: vec![reason.into()],
        }
    }
}

/// The classifier's final, externally-visible output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    #[serde(rename = "risk_level")]
    pub level: Tier,
    pub reasons: Vec<String>,
}

/// Result of an MX lookup, cached by domain for the lifetime of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MxStatus {
    ValidMx,
    NoMx,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_ordering_matches_rank() {
        assert!(Tier::High > Tier::Medium);
        assert!(Tier::Medium > Tier::Low);
        assert!(Tier::Low > Tier::None);
        assert_eq!(Tier::High.max(Tier::Low), Tier::High);
    }

    #[test]
    fn verdict_serializes_risk_level_key() {
        let v = Verdict {
            level: Tier::High,
            reasons: vec!["tor_network_ip".to_string()],
        };
        let json = serde_json::to_value(&v).unwrap();
        assert_eq!(json["risk_level"], "high");
        assert_eq!(json["reasons"][0], "tor_network_ip");
    }
}
