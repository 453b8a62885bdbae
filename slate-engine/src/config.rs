//! Module configuration: capabilities and default schema shape.
//!
//! A module's config arrives either from the store's `/config` endpoint
//! (JSON) or from a declarative module file (YAML). Both deserialize into
//! the same `ModuleConfig`. The defaults seed a schema the first time a
//! module opens against an empty store; a store that already holds
//! properties or views always wins over the defaults.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use slate_schema::{Property, Schema, ViewDefinition};

use crate::error::Result;

/// Which list-endpoint features the backing store supports. Anything
/// unsupported is computed locally instead of being sent as a query
/// parameter.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Capabilities {
    pub search: bool,
    pub filters: bool,
    pub sorts: bool,
    pub pagination: bool,
    pub bulk: bool,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            search: true,
            filters: true,
            sorts: true,
            pagination: true,
            bulk: true,
        }
    }
}

/// Declarative description of one module.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModuleConfig {
    /// Path segment and schema id of the module, e.g. `books`.
    pub module: String,
    /// Human name; falls back to the module segment.
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub capabilities: Capabilities,
    #[serde(default)]
    pub default_properties: Vec<Property>,
    #[serde(default)]
    pub default_views: Vec<ViewDefinition>,
    /// Marks the whole schema frozen (no structural mutations).
    #[serde(default)]
    pub frozen: bool,
}

impl ModuleConfig {
    pub fn new(module: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            name: None,
            capabilities: Capabilities::default(),
            default_properties: Vec::new(),
            default_views: Vec::new(),
            frozen: false,
        }
    }

    /// Parse from the `/config` endpoint payload.
    pub fn from_json(value: JsonValue) -> Result<Self> {
        Ok(serde_json::from_value(value)?)
    }

    /// Parse from a declarative module file.
    pub fn from_yaml(source: &str) -> Result<Self> {
        Ok(serde_yaml_ng::from_str(source)?)
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.module)
    }

    /// Build the seed schema from the defaults. Used only when the store
    /// has nothing saved yet.
    pub fn seed_schema(&self) -> Schema {
        let mut schema = Schema::with_id(self.module.as_str(), self.display_name())
            .with_frozen(self.frozen);
        schema.properties = self.default_properties.clone();
        schema.views = self.default_views.clone();
        schema
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use slate_schema::{PropertyType, ViewType};

    #[test]
    fn capabilities_default_to_fully_supported() {
        let caps = Capabilities::default();
        assert!(caps.search && caps.filters && caps.sorts && caps.pagination && caps.bulk);
    }

    #[test]
    fn config_parses_from_json_with_partial_capabilities() {
        let config = ModuleConfig::from_json(json!({
            "module": "books",
            "capabilities": {"search": false},
            "default_properties": [
                {"id": "title", "name": "Title", "type": "TEXT"}
            ]
        }))
        .unwrap();
        assert_eq!(config.module, "books");
        assert!(!config.capabilities.search);
        // Unnamed capabilities keep their defaults.
        assert!(config.capabilities.filters);
        assert_eq!(config.default_properties.len(), 1);
        assert_eq!(config.default_properties[0].type_, PropertyType::Text);
    }

    #[test]
    fn config_parses_from_yaml() {
        let source = r#"
module: calendar
name: Calendar
capabilities:
  filters: false
  sorts: false
default_properties:
  - id: title
    name: Title
    type: TEXT
  - id: date
    name: Date
    type: DATE
default_views:
  - id: month
    name: Month
    type: CALENDAR
    is_default: true
"#;
        let config = ModuleConfig::from_yaml(source).unwrap();
        assert_eq!(config.display_name(), "Calendar");
        assert!(!config.capabilities.filters);
        assert_eq!(config.default_views[0].type_, ViewType::Calendar);
        assert!(config.default_views[0].is_default);
    }

    #[test]
    fn seed_schema_carries_defaults_and_frozen_flag() {
        let mut config = ModuleConfig::from_yaml(
            "module: books\nfrozen: true\ndefault_properties:\n  - id: title\n    name: Title\n    type: TEXT\n",
        )
        .unwrap();
        config.default_views.push(ViewDefinition::with_id("all", "All", ViewType::Table));
        let schema = config.seed_schema();
        assert_eq!(schema.id.as_str(), "books");
        assert!(schema.frozen);
        assert_eq!(schema.properties.len(), 1);
        assert_eq!(schema.views.len(), 1);
    }

    #[test]
    fn malformed_yaml_is_a_config_error() {
        let err = ModuleConfig::from_yaml("module: [unclosed").unwrap_err();
        assert!(err.to_string().contains("config error"));
    }
}
