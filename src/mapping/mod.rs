//! Field mapping / schema normalization
//!
//! Every provider exposes task/board data under different field names and
//! nesting. Rather than hand-writing N bespoke transform functions, a
//! declarative rule list ([`FieldMapping`]) is interpreted uniformly by the
//! [`FieldMapper`]: read a path, apply a transform, write a path. One rule
//! table serves both sync directions via per-rule direction filters.

mod mapper;
mod normalize;
mod path;
mod transform;

pub use mapper::{FieldMapper, FieldMapping};
pub use normalize::{PriorityTable, StatusTable};
pub use path::{get_path, set_path};
pub use transform::{Transform, TransformRegistry};

use serde::{Deserialize, Serialize};

/// Direction of a mapping rule relative to the universal model
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Provider record into the universal model
    Inbound,
    /// Universal model out to a provider record
    Outbound,
    /// Rule applies in both directions
    #[default]
    Bidirectional,
}

/// A known workspace member, used to resolve provider user references
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberRef {
    /// Internal identifier
    pub id: String,

    /// Identifier in the provider being mapped
    pub external_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// Context supplied by the adapter for one mapping call
#[derive(Debug, Clone, Default)]
pub struct TransformContext {
    /// Provider the record is coming from
    pub source_provider: String,

    /// Provider the record is going to ("universal" for inbound calls)
    pub target_provider: String,

    /// Configured status table; falls back to built-in names when absent
    pub statuses: Option<StatusTable>,

    /// Configured priority table; falls back to the fixed ladder when absent
    pub priorities: Option<PriorityTable>,

    /// Known members for user-reference resolution
    pub members: Vec<MemberRef>,
}
