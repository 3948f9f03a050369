//! Field transforms
//!
//! A closed set of named transforms applied by mapping rules, plus a
//! registry for adapter-supplied custom transforms. Referencing an
//! unregistered custom transform is a configuration error and fails fast;
//! it indicates a programmer mistake in a mapping table, not bad external
//! data.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use super::{normalize, Direction, TransformContext};
use crate::model::StatusCategory;
use crate::{Result, TaskWeaveError};

/// Named transform applied to a field value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transform {
    /// Normalize assorted date representations to RFC 3339 UTC
    Date,
    /// Unix epoch milliseconds to RFC 3339 (inbound) and back (outbound)
    UnixMs,
    /// Unix epoch seconds to RFC 3339 (inbound) and back (outbound)
    UnixS,
    /// Provider status to normalized status and back
    Status,
    /// Provider priority to the 0-4 scale and back
    Priority,
    /// Provider user reference to a universal user and back
    User,
    /// Array form of [`Transform::User`]
    Users,
    /// Provider labels to universal labels and back
    Labels,
    MarkdownToHtml,
    HtmlToMarkdown,
    /// Adapter-registered transform, dispatched by name
    #[serde(untagged)]
    Custom(String),
}

/// Signature of an adapter-registered transform
pub type CustomTransformFn =
    Arc<dyn Fn(&Value, Direction, &TransformContext) -> Result<Value> + Send + Sync>;

/// Registry of custom transforms keyed by name
#[derive(Clone, Default)]
pub struct TransformRegistry {
    transforms: HashMap<String, CustomTransformFn>,
}

impl TransformRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a custom transform under a name
    pub fn register<F>(&mut self, name: impl Into<String>, transform: F)
    where
        F: Fn(&Value, Direction, &TransformContext) -> Result<Value> + Send + Sync + 'static,
    {
        self.transforms.insert(name.into(), Arc::new(transform));
    }

    fn get(&self, name: &str) -> Option<&CustomTransformFn> {
        self.transforms.get(name)
    }
}

/// Apply a transform to a value in the given call direction
pub(super) fn apply(
    transform: &Transform,
    value: &Value,
    direction: Direction,
    ctx: &TransformContext,
    registry: &TransformRegistry,
) -> Result<Value> {
    match transform {
        Transform::Date => Ok(normalize_date(value)),
        Transform::UnixMs => Ok(convert_epoch(value, direction, true)),
        Transform::UnixS => Ok(convert_epoch(value, direction, false)),
        Transform::Status => Ok(convert_status(value, direction, ctx)),
        Transform::Priority => Ok(convert_priority(value, direction, ctx)),
        Transform::User => Ok(convert_user(value, direction, ctx)),
        Transform::Users => {
            let items = value.as_array().cloned().unwrap_or_default();
            let mapped: Vec<Value> = items
                .iter()
                .map(|item| convert_user(item, direction, ctx))
                .collect();
            Ok(Value::Array(mapped))
        }
        Transform::Labels => Ok(match direction {
            Direction::Outbound => normalize::labels_to_provider(value),
            _ => normalize::map_labels(value),
        }),
        Transform::MarkdownToHtml => Ok(markdown_to_html(value)),
        Transform::HtmlToMarkdown => Ok(html_to_markdown(value)),
        Transform::Custom(name) => match registry.get(name) {
            Some(custom) => custom(value, direction, ctx),
            None => Err(TaskWeaveError::MappingConfig(format!(
                "Unknown transform: {}",
                name
            ))),
        },
    }
}

/// Normalize assorted provider date formats to RFC 3339 UTC
///
/// Unparseable values pass through unchanged so a single odd record does
/// not block the rest of the sync.
fn normalize_date(value: &Value) -> Value {
    if let Some(s) = value.as_str() {
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Value::String(dt.with_timezone(&Utc).to_rfc3339());
        }
        // Jira-style offset without a colon: 2026-01-15T09:30:00.000+0100
        if let Ok(dt) = DateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.3f%z") {
            return Value::String(dt.with_timezone(&Utc).to_rfc3339());
        }
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
            return Value::String(Utc.from_utc_datetime(&naive).to_rfc3339());
        }
        if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
            let naive = date.and_time(NaiveTime::MIN);
            return Value::String(Utc.from_utc_datetime(&naive).to_rfc3339());
        }
        debug!(value = %s, "Unrecognized date format, passing through");
        return value.clone();
    }
    if let Some(n) = value.as_i64() {
        // Epochs past ~year 2286 in seconds are taken as milliseconds
        let millis = n > 10_000_000_000;
        if let Some(normalized) = epoch_to_rfc3339(n, millis) {
            return normalized;
        }
    }
    value.clone()
}

fn epoch_to_rfc3339(n: i64, millis: bool) -> Option<Value> {
    let dt = if millis {
        Utc.timestamp_millis_opt(n).single()?
    } else {
        Utc.timestamp_opt(n, 0).single()?
    };
    Some(Value::String(dt.to_rfc3339()))
}

fn convert_epoch(value: &Value, direction: Direction, millis: bool) -> Value {
    match direction {
        Direction::Outbound => {
            if let Some(s) = value.as_str() {
                if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
                    return if millis {
                        json!(dt.timestamp_millis())
                    } else {
                        json!(dt.timestamp())
                    };
                }
            }
            value.clone()
        }
        _ => {
            let epoch = match value {
                Value::Number(n) => n.as_i64(),
                Value::String(s) => s.parse::<i64>().ok(),
                _ => None,
            };
            epoch
                .and_then(|n| epoch_to_rfc3339(n, millis))
                .unwrap_or_else(|| value.clone())
        }
    }
}

fn convert_status(value: &Value, direction: Direction, ctx: &TransformContext) -> Value {
    match direction {
        Direction::Outbound => {
            // Universal status back to the provider's label
            let category = value
                .get("category")
                .and_then(Value::as_str)
                .and_then(|s| serde_json::from_value::<StatusCategory>(json!(s)).ok());
            if let Some(category) = category {
                if let Some(label) = ctx.statuses.as_ref().and_then(|t| t.label_for(category)) {
                    return json!(label);
                }
            }
            match value.get("name").and_then(Value::as_str) {
                Some(name) => json!(name),
                None => value.clone(),
            }
        }
        _ => {
            let label = match value {
                Value::String(s) => s.as_str(),
                Value::Object(map) => map
                    .get("name")
                    .or_else(|| map.get("status"))
                    .and_then(Value::as_str)
                    .unwrap_or(""),
                _ => "",
            };
            let status = normalize::map_status(label, ctx.statuses.as_ref());
            json!(status)
        }
    }
}

fn convert_priority(value: &Value, direction: Direction, ctx: &TransformContext) -> Value {
    match direction {
        Direction::Outbound => {
            let level = value
                .get("level")
                .and_then(Value::as_u64)
                .or_else(|| value.as_u64())
                .map(|l| l.min(4) as u8);
            if let Some(level) = level {
                if let Some(label) = ctx.priorities.as_ref().and_then(|t| t.label_for(level)) {
                    return json!(label);
                }
                return json!(crate::model::PRIORITY_NAMES[level as usize]);
            }
            value.clone()
        }
        _ => {
            let priority = normalize::map_priority(value, ctx.priorities.as_ref());
            json!(priority)
        }
    }
}

fn convert_user(value: &Value, direction: Direction, ctx: &TransformContext) -> Value {
    match direction {
        Direction::Outbound => normalize::user_to_provider(value, &ctx.members),
        _ => normalize::map_user(value, &ctx.source_provider, &ctx.members),
    }
}

fn markdown_to_html(value: &Value) -> Value {
    match value.as_str() {
        Some(markdown) => {
            let parser = pulldown_cmark::Parser::new(markdown);
            let mut html = String::new();
            pulldown_cmark::html::push_html(&mut html, parser);
            Value::String(html)
        }
        None => value.clone(),
    }
}

fn html_to_markdown(value: &Value) -> Value {
    match value.as_str() {
        Some(html) => Value::String(html2md::parse_html(html)),
        None => value.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::StatusTable;

    fn ctx() -> TransformContext {
        TransformContext {
            source_provider: "jira".to_string(),
            target_provider: "universal".to_string(),
            ..Default::default()
        }
    }

    fn apply_in(transform: &Transform, value: &Value) -> Value {
        apply(
            transform,
            value,
            Direction::Inbound,
            &ctx(),
            &TransformRegistry::new(),
        )
        .unwrap()
    }

    #[test]
    fn test_transform_serde_names() {
        assert_eq!(
            serde_json::from_value::<Transform>(json!("unix_ms")).unwrap(),
            Transform::UnixMs
        );
        assert_eq!(
            serde_json::from_value::<Transform>(json!("markdown_to_html")).unwrap(),
            Transform::MarkdownToHtml
        );
        assert_eq!(
            serde_json::from_value::<Transform>(json!("story_points")).unwrap(),
            Transform::Custom("story_points".to_string())
        );
    }

    #[test]
    fn test_date_normalizes_to_utc() {
        let out = apply_in(&Transform::Date, &json!("2026-01-15T09:30:00+02:00"));
        assert_eq!(out, json!("2026-01-15T07:30:00+00:00"));
    }

    #[test]
    fn test_date_jira_offset_format() {
        let out = apply_in(&Transform::Date, &json!("2026-01-15T09:30:00.000+0200"));
        assert_eq!(out, json!("2026-01-15T07:30:00+00:00"));
    }

    #[test]
    fn test_date_only_string() {
        let out = apply_in(&Transform::Date, &json!("2026-01-15"));
        assert_eq!(out, json!("2026-01-15T00:00:00+00:00"));
    }

    #[test]
    fn test_unparseable_date_passes_through() {
        let out = apply_in(&Transform::Date, &json!("next tuesday"));
        assert_eq!(out, json!("next tuesday"));
    }

    #[test]
    fn test_unix_ms_round_trip() {
        let inbound = apply_in(&Transform::UnixMs, &json!(1_767_945_600_000_i64));
        assert!(inbound.as_str().unwrap().starts_with("2026-01-09T08:00:00"));

        let outbound = apply(
            &Transform::UnixMs,
            &inbound,
            Direction::Outbound,
            &ctx(),
            &TransformRegistry::new(),
        )
        .unwrap();
        assert_eq!(outbound, json!(1_767_945_600_000_i64));
    }

    #[test]
    fn test_unix_s_accepts_string_digits() {
        let out = apply_in(&Transform::UnixS, &json!("1767945600"));
        assert!(out.as_str().unwrap().starts_with("2026-01-09T08:00:00"));
    }

    #[test]
    fn test_status_inbound_object() {
        let out = apply_in(&Transform::Status, &json!({"name": "In Progress"}));
        assert_eq!(out["category"], "in_progress");
        assert_eq!(out["name"], "In Progress");
    }

    #[test]
    fn test_status_outbound_prefers_table_label() {
        let mut context = ctx();
        context.statuses = Some(StatusTable::new([
            ("To Do", StatusCategory::Todo),
            ("Klaar", StatusCategory::Done),
        ]));
        let out = apply(
            &Transform::Status,
            &json!({"category": "done", "name": "done"}),
            Direction::Outbound,
            &context,
            &TransformRegistry::new(),
        )
        .unwrap();
        assert_eq!(out, json!("Klaar"));
    }

    #[test]
    fn test_users_maps_each_entry() {
        let out = apply_in(
            &Transform::Users,
            &json!([{"login": "alice"}, {"login": "bob"}]),
        );
        assert_eq!(out[0]["external_id"], "alice");
        assert_eq!(out[1]["external_id"], "bob");
    }

    #[test]
    fn test_markdown_to_html() {
        let out = apply_in(&Transform::MarkdownToHtml, &json!("**bold** move"));
        assert_eq!(out, json!("<p><strong>bold</strong> move</p>\n"));
    }

    #[test]
    fn test_unknown_custom_transform_fails_fast() {
        let err = apply(
            &Transform::Custom("nope".to_string()),
            &json!(1),
            Direction::Inbound,
            &ctx(),
            &TransformRegistry::new(),
        )
        .unwrap_err();
        assert!(matches!(err, TaskWeaveError::MappingConfig(_)));
        assert!(err.to_string().contains("nope"));
    }

    #[test]
    fn test_registered_custom_transform_runs() {
        let mut registry = TransformRegistry::new();
        registry.register("double", |value: &Value, _dir, _ctx| {
            Ok(json!(value.as_i64().unwrap_or(0) * 2))
        });
        let out = apply(
            &Transform::Custom("double".to_string()),
            &json!(21),
            Direction::Inbound,
            &ctx(),
            &registry,
        )
        .unwrap();
        assert_eq!(out, json!(42));
    }
}
