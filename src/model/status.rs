//! Normalized status and priority types
//!
//! Every provider exposes its own status names and priority scales; these
//! types are the closed vocabulary the rest of the system works in.

use serde::{Deserialize, Serialize};

/// Normalized status category
///
/// A closed enumeration: every provider status maps into exactly one of
/// these buckets. Unmapped labels degrade to [`StatusCategory::Todo`]
/// rather than blocking sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusCategory {
    Backlog,
    Todo,
    InProgress,
    Review,
    Done,
    Cancelled,
}

impl StatusCategory {
    /// The wire name of this category
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusCategory::Backlog => "backlog",
            StatusCategory::Todo => "todo",
            StatusCategory::InProgress => "in_progress",
            StatusCategory::Review => "review",
            StatusCategory::Done => "done",
            StatusCategory::Cancelled => "cancelled",
        }
    }

    /// Whether this category counts as terminal (no further work expected)
    pub fn is_terminal(&self) -> bool {
        matches!(self, StatusCategory::Done | StatusCategory::Cancelled)
    }
}

impl std::fmt::Display for StatusCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalized task status
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UniversalStatus {
    /// Normalized category
    pub category: StatusCategory,

    /// Original provider status label
    pub name: String,

    /// Provider-side status identifier, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_id: Option<String>,
}

impl UniversalStatus {
    /// Create a status from a category and the provider's label
    pub fn new(category: StatusCategory, name: impl Into<String>) -> Self {
        Self {
            category,
            name: name.into(),
            provider_id: None,
        }
    }
}

/// Fixed priority name ladder, indexed by level
pub const PRIORITY_NAMES: [&str; 5] = ["None", "Low", "Medium", "High", "Urgent"];

/// Normalized priority on a 0-4 scale (0 = none, 4 = urgent)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UniversalPriority {
    /// Priority level, clamped to 0..=4
    pub level: u8,

    /// Human-readable name from the fixed ladder
    pub name: String,
}

impl UniversalPriority {
    /// Create a priority from a numeric level, clamping to the 0-4 scale
    pub fn from_level(level: i64) -> Self {
        let level = level.clamp(0, 4) as u8;
        Self {
            level,
            name: PRIORITY_NAMES[level as usize].to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_serializes_snake_case() {
        let json = serde_json::to_string(&StatusCategory::InProgress).unwrap();
        assert_eq!(json, "\"in_progress\"");
    }

    #[test]
    fn test_terminal_categories() {
        assert!(StatusCategory::Done.is_terminal());
        assert!(StatusCategory::Cancelled.is_terminal());
        assert!(!StatusCategory::Review.is_terminal());
    }

    #[test]
    fn test_priority_clamps_to_scale() {
        assert_eq!(UniversalPriority::from_level(-3).level, 0);
        assert_eq!(UniversalPriority::from_level(9).level, 4);
        assert_eq!(UniversalPriority::from_level(9).name, "Urgent");
        assert_eq!(UniversalPriority::from_level(2).name, "Medium");
    }
}
