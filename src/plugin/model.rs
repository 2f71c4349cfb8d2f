//! Plugin capability and the persisted plugin configuration

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use validator::Validate;

use crate::core::binder::BindTarget;
use crate::core::entity::Entity;
use crate::core::error::{FieldValidationError, PlinthResult};
use crate::core::field::FieldValue;
use crate::core::registry::EntityServiceRegistry;
use crate::plugin::oauth::OAuthProvider;

/// An installable, independently configurable extension
///
/// One instance per plugin type, created at wiring time and shared by every
/// request. Implementations hold no per-request state: install state and
/// settings live in the store as a [`PluginConfig`].
pub trait Plugin: Send + Sync + 'static {
    /// Stable identifier, also the mount point under `/plugins/{id}`
    fn id(&self) -> &str;

    fn name(&self) -> &str;

    fn version(&self) -> &str;

    fn author(&self) -> &str;

    /// Extra checks run before an update is persisted
    ///
    /// May normalize `config` in place. Every returned error is reported in
    /// the result envelope and blocks the save.
    fn pre_update(&self, _config: &mut PluginConfig) -> Vec<FieldValidationError> {
        Vec::new()
    }

    /// OAuth capability, for plugins that sign users in with a provider
    fn as_oauth(&self) -> Option<&dyn OAuthProvider> {
        None
    }
}

/// Persisted enablement and settings record of one plugin
///
/// At most one exists per `plugin_id`; the store enforces it through the
/// `pluginId` unique key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PluginConfig {
    #[serde(default)]
    pub id: Option<i64>,

    #[serde(default)]
    #[validate(custom(function = "not_blank", message = "must not be blank"))]
    pub plugin_id: String,

    #[serde(default)]
    pub is_enabled: bool,

    #[serde(default)]
    pub attributes: BTreeMap<String, String>,

    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

fn not_blank(value: &str) -> Result<(), validator::ValidationError> {
    if value.trim().is_empty() {
        return Err(validator::ValidationError::new("blank"));
    }
    Ok(())
}

impl PluginConfig {
    /// A disabled config for `plugin_id`, without id
    pub fn for_plugin(plugin_id: impl Into<String>) -> Self {
        Self {
            plugin_id: plugin_id.into(),
            ..Default::default()
        }
    }

    /// Attribute value, `None` when unset
    pub fn get_attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.attributes.insert(name.into(), value.into());
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attribute(name, value);
        self
    }

    /// Structural violations as field errors
    pub fn violations(&self) -> Vec<FieldValidationError> {
        match self.validate() {
            Ok(()) => Vec::new(),
            Err(errors) => FieldValidationError::from_validation_errors(&errors),
        }
    }
}

impl Entity for PluginConfig {
    type Id = i64;

    fn resource_name() -> &'static str {
        "plugin_config"
    }

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = Some(id);
    }

    fn field_value(&self, field: &str) -> Option<FieldValue> {
        match field {
            "pluginId" | "plugin_id" => Some(FieldValue::String(self.plugin_id.clone())),
            "isEnabled" | "is_enabled" => Some(FieldValue::Boolean(self.is_enabled)),
            "createdAt" | "created_at" => Some(
                self.created_at
                    .map(FieldValue::DateTime)
                    .unwrap_or(FieldValue::Null),
            ),
            "updatedAt" | "updated_at" => Some(
                self.updated_at
                    .map(FieldValue::DateTime)
                    .unwrap_or(FieldValue::Null),
            ),
            _ => None,
        }
    }

    fn unique_keys(&self) -> Vec<(&'static str, String)> {
        vec![("pluginId", self.plugin_id.clone())]
    }
}

impl BindTarget for PluginConfig {
    const IS_ENTITY: bool = true;

    fn attribute_name() -> &'static str {
        "pluginConfig"
    }

    fn new_blank(services: &EntityServiceRegistry) -> PlinthResult<Self> {
        services.new_entity::<Self>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_serializes_camel_case() {
        let config = PluginConfig::for_plugin("github").with_attribute("client_id", "abc");
        let value = serde_json::to_value(&config).unwrap();
        assert_eq!(value["pluginId"], json!("github"));
        assert_eq!(value["isEnabled"], json!(false));
        assert_eq!(value["attributes"]["client_id"], json!("abc"));
    }

    #[test]
    fn test_deserializes_partial_payload() {
        let config: PluginConfig =
            serde_json::from_value(json!({ "pluginId": "github", "isEnabled": true })).unwrap();
        assert!(config.is_enabled);
        assert!(config.attributes.is_empty());
        assert!(config.id.is_none());
    }

    #[test]
    fn test_blank_plugin_id_violation() {
        let config = PluginConfig::for_plugin("   ");
        let violations = config.violations();
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].field, "pluginId");
        assert_eq!(violations[0].message, "must not be blank");

        assert!(PluginConfig::for_plugin("github").violations().is_empty());
    }

    #[test]
    fn test_missing_attribute_is_none() {
        let config = PluginConfig::for_plugin("github");
        assert_eq!(config.get_attribute("client_id"), None);
    }

    #[test]
    fn test_unique_key_on_plugin_id() {
        let config = PluginConfig::for_plugin("github");
        assert_eq!(
            config.unique_keys(),
            vec![("pluginId", "github".to_string())]
        );
    }
}
