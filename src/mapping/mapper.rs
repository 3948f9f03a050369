//! Declarative field mapping between provider records and the universal model

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::trace;

use super::normalize;
use super::path::{get_path, set_path};
use super::transform::{apply, Transform, TransformRegistry};
use super::{Direction, TransformContext};
use crate::model::{UniversalPriority, UniversalStatus};
use crate::{Result, TaskWeaveError};

/// One declarative mapping rule
///
/// Immutable once registered with a mapper call; all rules that pass the
/// direction filter apply in list order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldMapping {
    /// Path in the provider record
    pub source_field: String,

    /// Path in the universal record
    pub target_field: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transform: Option<Transform>,

    /// Applied when the source path is missing or null
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Value>,

    /// Fail the mapping call when the value is absent after defaulting
    #[serde(default)]
    pub required: bool,

    #[serde(default)]
    pub direction: Direction,
}

impl FieldMapping {
    /// Create a bidirectional rule copying source to target verbatim
    pub fn new(source_field: impl Into<String>, target_field: impl Into<String>) -> Self {
        Self {
            source_field: source_field.into(),
            target_field: target_field.into(),
            transform: None,
            default_value: None,
            required: false,
            direction: Direction::Bidirectional,
        }
    }

    /// Attach a transform
    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = Some(transform);
        self
    }

    /// Attach a default applied when the source value is absent
    pub fn with_default(mut self, value: Value) -> Self {
        self.default_value = Some(value);
        self
    }

    /// Mark this rule required
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Restrict this rule to inbound mapping calls
    pub fn inbound_only(mut self) -> Self {
        self.direction = Direction::Inbound;
        self
    }

    /// Restrict this rule to outbound mapping calls
    pub fn outbound_only(mut self) -> Self {
        self.direction = Direction::Outbound;
        self
    }

    fn applies(&self, direction: Direction) -> bool {
        self.direction == Direction::Bidirectional || self.direction == direction
    }
}

/// Interprets mapping rule lists against JSON records
///
/// Holds the custom-transform registry; the rule tables and context arrive
/// per call so one mapper instance serves every record type of an adapter.
#[derive(Clone, Default)]
pub struct FieldMapper {
    registry: TransformRegistry,
}

impl FieldMapper {
    /// Create a mapper with no custom transforms
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a custom transform usable as [`Transform::Custom`]
    pub fn register_transform<F>(&mut self, name: impl Into<String>, transform: F)
    where
        F: Fn(&Value, Direction, &TransformContext) -> Result<Value> + Send + Sync + 'static,
    {
        self.registry.register(name, transform);
    }

    /// Map a provider record into a partial universal record
    pub fn map_to_universal(
        &self,
        record: &Value,
        provider: &str,
        mappings: &[FieldMapping],
        ctx: &TransformContext,
    ) -> Result<Value> {
        let mut out = Value::Object(Map::new());
        set_path(&mut out, "provider", Value::String(provider.to_string()));

        for rule in mappings.iter().filter(|r| r.applies(Direction::Inbound)) {
            self.apply_rule(
                record,
                &mut out,
                &rule.source_field,
                &rule.target_field,
                rule,
                Direction::Inbound,
                ctx,
            )?;
        }
        trace!(provider, rules = mappings.len(), "Mapped record to universal");
        Ok(out)
    }

    /// Map a universal record out to a provider-shaped record
    pub fn map_from_universal(
        &self,
        universal: &Value,
        provider: &str,
        mappings: &[FieldMapping],
        ctx: &TransformContext,
    ) -> Result<Value> {
        let mut out = Value::Object(Map::new());

        for rule in mappings.iter().filter(|r| r.applies(Direction::Outbound)) {
            self.apply_rule(
                universal,
                &mut out,
                &rule.target_field,
                &rule.source_field,
                rule,
                Direction::Outbound,
                ctx,
            )?;
        }
        trace!(provider, rules = mappings.len(), "Mapped record from universal");
        Ok(out)
    }

    #[allow(clippy::too_many_arguments)]
    fn apply_rule(
        &self,
        source: &Value,
        out: &mut Value,
        read_path: &str,
        write_path: &str,
        rule: &FieldMapping,
        direction: Direction,
        ctx: &TransformContext,
    ) -> Result<()> {
        let mut value = get_path(source, read_path)
            .filter(|v| !v.is_null())
            .cloned();
        if value.is_none() {
            value = rule.default_value.clone();
        }

        let value = match value {
            Some(value) => value,
            None => {
                if rule.required {
                    return Err(TaskWeaveError::MappingConfig(format!(
                        "Missing required field: {}",
                        read_path
                    )));
                }
                return Ok(());
            }
        };

        let value = match &rule.transform {
            Some(transform) => apply(transform, &value, direction, ctx, &self.registry)?,
            None => value,
        };
        set_path(out, write_path, value);
        Ok(())
    }

    /// Normalize a provider status label
    pub fn map_status(&self, label: &str, ctx: &TransformContext) -> UniversalStatus {
        normalize::map_status(label, ctx.statuses.as_ref())
    }

    /// Normalize a provider priority value
    pub fn map_priority(&self, value: &Value, ctx: &TransformContext) -> UniversalPriority {
        normalize::map_priority(value, ctx.priorities.as_ref())
    }

    /// Normalize a provider user reference
    pub fn map_user(&self, value: &Value, ctx: &TransformContext) -> Value {
        normalize::map_user(value, &ctx.source_provider, &ctx.members)
    }

    /// Normalize a provider label list
    pub fn map_labels(&self, value: &Value) -> Value {
        normalize::map_labels(value)
    }
}
