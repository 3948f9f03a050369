//! Status, priority, user, and label normalization
//!
//! Lookups are case-insensitive exact matches against configured tables,
//! with built-in fallbacks for common provider vocabulary. Unmapped labels
//! degrade to a sensible default rather than failing the sync; blocking on
//! an unmapped label would stall every record behind it.

use std::collections::HashMap;

use serde_json::{json, Map, Value};

use super::MemberRef;
use crate::model::{StatusCategory, UniversalPriority, UniversalStatus};

/// Configured status lookup table
///
/// Keys match case-insensitively; insertion order is preserved so reverse
/// lookups (category back to a provider label) are deterministic.
#[derive(Debug, Clone, Default)]
pub struct StatusTable {
    entries: Vec<(String, StatusCategory)>,
    index: HashMap<String, StatusCategory>,
}

impl StatusTable {
    /// Build a table from (provider label, category) pairs
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, StatusCategory)>,
        S: Into<String>,
    {
        let entries: Vec<(String, StatusCategory)> =
            entries.into_iter().map(|(s, c)| (s.into(), c)).collect();
        let index = entries
            .iter()
            .map(|(label, category)| (label.to_lowercase(), *category))
            .collect();
        Self { entries, index }
    }

    /// Case-insensitive lookup of a provider label
    pub fn lookup(&self, label: &str) -> Option<StatusCategory> {
        self.index.get(&label.to_lowercase()).copied()
    }

    /// First provider label configured for a category
    pub fn label_for(&self, category: StatusCategory) -> Option<&str> {
        self.entries
            .iter()
            .find(|(_, c)| *c == category)
            .map(|(label, _)| label.as_str())
    }
}

/// Configured priority lookup table (provider label to 0-4 level)
#[derive(Debug, Clone, Default)]
pub struct PriorityTable {
    entries: Vec<(String, u8)>,
    index: HashMap<String, u8>,
}

impl PriorityTable {
    /// Build a table from (provider label, level) pairs; levels clamp to 0-4
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, u8)>,
        S: Into<String>,
    {
        let entries: Vec<(String, u8)> = entries
            .into_iter()
            .map(|(s, level)| (s.into(), level.min(4)))
            .collect();
        let index = entries
            .iter()
            .map(|(label, level)| (label.to_lowercase(), *level))
            .collect();
        Self { entries, index }
    }

    /// Case-insensitive lookup of a provider label
    pub fn lookup(&self, label: &str) -> Option<u8> {
        self.index.get(&label.to_lowercase()).copied()
    }

    /// First provider label configured for a level
    pub fn label_for(&self, level: u8) -> Option<&str> {
        self.entries
            .iter()
            .find(|(_, l)| *l == level)
            .map(|(label, _)| label.as_str())
    }
}

fn builtin_status(label_lower: &str) -> Option<StatusCategory> {
    match label_lower {
        "backlog" | "icebox" | "triage" => Some(StatusCategory::Backlog),
        "todo" | "to do" | "open" | "new" | "not started" => Some(StatusCategory::Todo),
        "in progress" | "doing" | "started" | "in development" => {
            Some(StatusCategory::InProgress)
        }
        "in review" | "review" | "code review" | "qa" | "testing" => {
            Some(StatusCategory::Review)
        }
        "done" | "closed" | "resolved" | "complete" | "completed" | "merged" => {
            Some(StatusCategory::Done)
        }
        "cancelled" | "canceled" | "won't do" | "wontfix" | "duplicate" => {
            Some(StatusCategory::Cancelled)
        }
        _ => None,
    }
}

/// Normalize a provider status label
///
/// Configured table first, then the built-in vocabulary; an unmapped label
/// falls back to [`StatusCategory::Todo`].
pub fn map_status(label: &str, table: Option<&StatusTable>) -> UniversalStatus {
    let lower = label.to_lowercase();
    let category = table
        .and_then(|t| t.lookup(label))
        .or_else(|| builtin_status(&lower))
        .unwrap_or(StatusCategory::Todo);
    UniversalStatus::new(category, label)
}

fn builtin_priority(label_lower: &str) -> Option<u8> {
    match label_lower {
        "none" | "no priority" => Some(0),
        "low" | "lowest" | "minor" | "trivial" => Some(1),
        "medium" | "normal" | "moderate" => Some(2),
        "high" | "major" | "important" => Some(3),
        "urgent" | "highest" | "critical" | "blocker" => Some(4),
        _ => None,
    }
}

/// Normalize a provider priority value
///
/// Accepts a label, a bare number, or an object with a `name` field.
/// Numeric values clamp to the 0-4 scale; unmapped labels fall back to
/// Medium.
pub fn map_priority(value: &Value, table: Option<&PriorityTable>) -> UniversalPriority {
    match value {
        Value::Number(n) => UniversalPriority::from_level(n.as_i64().unwrap_or(2)),
        Value::String(s) => {
            let lower = s.to_lowercase();
            if let Some(level) = table.and_then(|t| t.lookup(s)) {
                return UniversalPriority::from_level(level as i64);
            }
            if let Some(level) = builtin_priority(&lower) {
                return UniversalPriority::from_level(level as i64);
            }
            if let Ok(level) = lower.parse::<i64>() {
                return UniversalPriority::from_level(level);
            }
            UniversalPriority::from_level(2)
        }
        Value::Object(map) => match map.get("name").or_else(|| map.get("priority")) {
            Some(inner) => map_priority(inner, table),
            None => UniversalPriority::from_level(2),
        },
        _ => UniversalPriority::from_level(2),
    }
}

fn string_of(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn pick<'a>(map: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|k| map.get(*k))
}

/// Normalize a provider user reference into a partial universal user
///
/// Provider payloads name users inconsistently (`accountId`, `gid`,
/// `login`, ...). When the reference resolves against the known members,
/// the internal `id` is attached.
pub fn map_user(value: &Value, provider: &str, members: &[MemberRef]) -> Value {
    let (external_id, name, email) = match value {
        Value::String(s) => (Some(s.clone()), Some(s.clone()), None),
        Value::Object(map) => {
            let external_id =
                pick(map, &["accountId", "gid", "id", "login", "username"]).and_then(string_of);
            let name = pick(map, &["displayName", "name", "login", "username"])
                .and_then(string_of)
                .or_else(|| external_id.clone());
            let email = pick(map, &["emailAddress", "email"]).and_then(string_of);
            (external_id, name, email)
        }
        _ => (None, None, None),
    };

    let mut user = Map::new();
    user.insert("provider".to_string(), json!(provider));
    if let Some(ref ext) = external_id {
        user.insert("external_id".to_string(), json!(ext));
    }
    if let Some(ref n) = name {
        user.insert("name".to_string(), json!(n));
    }
    if let Some(ref e) = email {
        user.insert("email".to_string(), json!(e));
    }

    let matched = members.iter().find(|m| {
        external_id.as_deref() == Some(m.external_id.as_str())
            || (email.is_some()
                && m.email.as_deref().map(str::to_lowercase)
                    == email.as_deref().map(str::to_lowercase))
    });
    if let Some(member) = matched {
        user.insert("id".to_string(), json!(member.id));
    }

    Value::Object(user)
}

/// Resolve a universal user back to a provider user reference
pub fn user_to_provider(value: &Value, members: &[MemberRef]) -> Value {
    let id = get_str(value, "id");
    let external_id = get_str(value, "external_id");
    let email = get_str(value, "email");

    let matched = members.iter().find(|m| {
        id.as_deref() == Some(m.id.as_str())
            || external_id.as_deref() == Some(m.external_id.as_str())
            || (email.is_some()
                && m.email.as_deref().map(str::to_lowercase)
                    == email.as_deref().map(str::to_lowercase))
    });

    match matched {
        Some(member) => json!({ "id": member.external_id }),
        None => match external_id.or(id) {
            Some(ext) => json!({ "id": ext }),
            None => value.clone(),
        },
    }
}

fn get_str(value: &Value, key: &str) -> Option<String> {
    value.as_object().and_then(|m| m.get(key)).and_then(string_of)
}

/// Normalize a provider label list into universal labels
///
/// Accepts arrays of strings or of objects with `name`/`color` fields;
/// anything unrecognized is skipped.
pub fn map_labels(value: &Value) -> Value {
    let items = match value.as_array() {
        Some(items) => items,
        None => return json!([]),
    };
    let labels: Vec<Value> = items
        .iter()
        .filter_map(|item| match item {
            Value::String(s) => Some(json!({ "name": s })),
            Value::Object(map) => {
                let name = pick(map, &["name", "label", "title"]).and_then(string_of)?;
                let mut label = Map::new();
                label.insert("name".to_string(), json!(name));
                if let Some(color) = map.get("color").and_then(string_of) {
                    label.insert("color".to_string(), json!(color));
                }
                Some(Value::Object(label))
            }
            _ => None,
        })
        .collect();
    Value::Array(labels)
}

/// Flatten universal labels back to a provider name list
pub fn labels_to_provider(value: &Value) -> Value {
    let items = match value.as_array() {
        Some(items) => items,
        None => return json!([]),
    };
    let names: Vec<Value> = items
        .iter()
        .filter_map(|item| match item {
            Value::String(s) => Some(json!(s)),
            Value::Object(map) => map.get("name").and_then(string_of).map(|n| json!(n)),
            _ => None,
        })
        .collect();
    Value::Array(names)
}
