//! Universal task, project, user, and comment records

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::status::{UniversalPriority, UniversalStatus};

/// Normalized user record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UniversalUser {
    /// Internal identifier (assigned by the hosting system)
    pub id: String,

    /// Identifier in the source provider
    pub external_id: String,

    /// Provider name (e.g., "jira", "linear")
    pub provider: String,

    /// Display name
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,

    /// Provider-specific extras, preserved verbatim
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, Value>,
}

impl UniversalUser {
    /// Create a user with the required identity fields
    pub fn new(
        id: impl Into<String>,
        external_id: impl Into<String>,
        provider: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            external_id: external_id.into(),
            provider: provider.into(),
            name: name.into(),
            email: None,
            avatar_url: None,
            metadata: HashMap::new(),
        }
    }
}

/// Normalized label/tag
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UniversalLabel {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

/// Normalized task record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UniversalTask {
    /// Internal identifier
    pub id: String,

    /// Identifier in the source provider
    pub external_id: String,

    /// Provider name
    pub provider: String,

    /// Task title/summary
    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Normalized status
    pub status: UniversalStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<UniversalPriority>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub assignees: Vec<UniversalUser>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<UniversalLabel>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,

    /// URL to view in the source provider
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Provider custom fields, preserved for lossless round-trip
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub custom_fields: HashMap<String, Value>,

    /// Additional provider extras
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, Value>,
}

/// Normalized project/board record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UniversalProject {
    /// Internal identifier
    pub id: String,

    /// Identifier in the source provider
    pub external_id: String,

    /// Provider name
    pub provider: String,

    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(default)]
    pub archived: bool,

    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, Value>,
}

/// Normalized comment record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UniversalComment {
    /// Internal identifier
    pub id: String,

    /// Identifier in the source provider
    pub external_id: String,

    /// Provider name
    pub provider: String,

    /// Task this comment belongs to
    pub task_id: String,

    /// Comment body (markdown)
    pub body: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<UniversalUser>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, Value>,
}
