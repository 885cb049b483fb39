use crate::error::{LearnError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Severity
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Critical,
    Medium,
    Low,
}

impl Severity {
    /// Threshold ordering: critical > medium > low.
    pub fn rank(self) -> u8 {
        match self {
            Severity::Critical => 3,
            Severity::Medium => 2,
            Severity::Low => 1,
        }
    }

    /// Multiplier used by the impact score.
    pub fn weight(self) -> u32 {
        match self {
            Severity::Critical => 10,
            Severity::Medium => 5,
            Severity::Low => 1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::Medium => "medium",
            Severity::Low => "low",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Severity {
    type Err = LearnError;
    fn from_str(s: &str) -> Result<Self> {
        match s {
            "critical" => Ok(Severity::Critical),
            "medium" => Ok(Severity::Medium),
            "low" => Ok(Severity::Low),
            _ => Err(LearnError::InvalidSeverity(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// PatternStatus
// ---------------------------------------------------------------------------

/// Lifecycle of a stored pattern.
///
/// Stores are shared with other tooling, so any status string is accepted
/// and round-trips unchanged through `Other`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PatternStatus {
    #[default]
    Identified,
    Implemented,
    Verified,
    Other(String),
}

impl PatternStatus {
    pub fn as_str(&self) -> &str {
        match self {
            PatternStatus::Identified => "IDENTIFIED",
            PatternStatus::Implemented => "IMPLEMENTED",
            PatternStatus::Verified => "VERIFIED",
            PatternStatus::Other(s) => s,
        }
    }
}

impl From<String> for PatternStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "IDENTIFIED" => PatternStatus::Identified,
            "IMPLEMENTED" => PatternStatus::Implemented,
            "VERIFIED" => PatternStatus::Verified,
            _ => PatternStatus::Other(s),
        }
    }
}

impl From<&str> for PatternStatus {
    fn from(s: &str) -> Self {
        PatternStatus::from(s.to_string())
    }
}

impl From<PatternStatus> for String {
    fn from(status: PatternStatus) -> Self {
        match status {
            PatternStatus::Other(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for PatternStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
