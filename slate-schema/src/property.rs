//! Property definitions: the typed field schema shared by all records of a
//! module.
//!
//! A `Property` pairs a wire-stable id with a `PropertyType` and the
//! type-specific configuration (select options, relation target, formula
//! expression). Protection flags (`frozen` + `Protection`) govern which
//! mutations the guard will authorize.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SchemaError};
use crate::ids::{OptionId, PropertyId};

/// The type of a property. Determines value shape, operators, and editing
/// behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PropertyType {
    Text,
    Number,
    Select,
    MultiSelect,
    Date,
    Checkbox,
    Url,
    Email,
    Phone,
    Relation,
    Formula,
    Rollup,
    CreatedTime,
    CreatedBy,
    LastEditedTime,
    LastEditedBy,
}

impl PropertyType {
    /// Wire name of the type (matches the serialized form).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "TEXT",
            Self::Number => "NUMBER",
            Self::Select => "SELECT",
            Self::MultiSelect => "MULTI_SELECT",
            Self::Date => "DATE",
            Self::Checkbox => "CHECKBOX",
            Self::Url => "URL",
            Self::Email => "EMAIL",
            Self::Phone => "PHONE",
            Self::Relation => "RELATION",
            Self::Formula => "FORMULA",
            Self::Rollup => "ROLLUP",
            Self::CreatedTime => "CREATED_TIME",
            Self::CreatedBy => "CREATED_BY",
            Self::LastEditedTime => "LAST_EDITED_TIME",
            Self::LastEditedBy => "LAST_EDITED_BY",
        }
    }

    /// Whether values of this type live in the free-text family
    /// (TEXT/URL/EMAIL/PHONE share string coercion and operators).
    pub fn is_text_like(&self) -> bool {
        matches!(self, Self::Text | Self::Url | Self::Email | Self::Phone)
    }

    /// Whether the store populates values of this type (created/edited
    /// stamps). Direct writes are rejected.
    pub fn is_system(&self) -> bool {
        matches!(
            self,
            Self::CreatedTime | Self::CreatedBy | Self::LastEditedTime | Self::LastEditedBy
        )
    }

    /// Whether values are derived server-side (FORMULA/ROLLUP). Never
    /// directly editable.
    pub fn is_computed(&self) -> bool {
        matches!(self, Self::Formula | Self::Rollup)
    }

    /// Whether a cell of this type can be edited at all.
    pub fn is_editable(&self) -> bool {
        !self.is_system() && !self.is_computed()
    }

    /// Whether options are required for this type.
    pub fn requires_options(&self) -> bool {
        matches!(self, Self::Select | Self::MultiSelect)
    }

    /// Whether an edit commits immediately on selection rather than on
    /// blur/Enter (checkbox toggle, select pick, date pick, multi-select
    /// item toggle).
    pub fn commits_immediately(&self) -> bool {
        matches!(
            self,
            Self::Checkbox | Self::Select | Self::MultiSelect | Self::Date
        )
    }
}

impl std::fmt::Display for PropertyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single option in a select or multi-select property.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SelectOption {
    pub id: OptionId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default)]
    pub order: i32,
}

impl SelectOption {
    /// Create an option with a minted id.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: OptionId::new(),
            name: name.into(),
            color: None,
            order: 0,
        }
    }

    /// Create an option with an explicit id (store-issued).
    pub fn with_id(id: impl Into<OptionId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            color: None,
            order: 0,
        }
    }

    /// Set the badge color.
    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    /// Set the display order.
    pub fn with_order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }
}

fn default_true() -> bool {
    true
}

fn is_true(v: &bool) -> bool {
    *v
}

/// Fine-grained permissions on a frozen property.
///
/// `frozen` alone flags a property as protected; each permission opts out
/// of one operation. Unset flags default to true, so a frozen property with
/// no `Protection` block is visible-locked but otherwise unrestricted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Protection {
    #[serde(default = "default_true", skip_serializing_if = "is_true")]
    pub allow_edit: bool,
    #[serde(default = "default_true", skip_serializing_if = "is_true")]
    pub allow_hide: bool,
    #[serde(default = "default_true", skip_serializing_if = "is_true")]
    pub allow_delete: bool,
    /// Surfaced to the user when an operation is denied.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl Default for Protection {
    fn default() -> Self {
        Self {
            allow_edit: true,
            allow_hide: true,
            allow_delete: true,
            reason: None,
        }
    }
}

impl Protection {
    /// A fully locked protection block.
    pub fn locked() -> Self {
        Self {
            allow_edit: false,
            allow_hide: false,
            allow_delete: false,
            reason: None,
        }
    }

    /// Set the denial reason.
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}

/// Configuration for RELATION properties.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RelationConfig {
    /// Module whose records this property points at.
    pub target_module: String,
    /// Property of the target record shown as the link label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_property: Option<PropertyId>,
}

/// Configuration for FORMULA (and ROLLUP) properties. Evaluation happens in
/// the store; the engine only carries the expression through.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FormulaConfig {
    pub expression: String,
}

/// A property definition: one typed column shared by all records of a
/// schema.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Property {
    pub id: PropertyId,
    pub name: String,
    #[serde(rename = "type")]
    pub type_: PropertyType,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub frozen: bool,
    /// Global visibility. `false` hides the property in every view until an
    /// explicit global unhide; per-view toggling never touches this flag.
    #[serde(default = "default_true")]
    pub visible: bool,
    /// Column position; views render properties in ascending order.
    #[serde(default)]
    pub order: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub select_options: Option<Vec<SelectOption>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relation: Option<RelationConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formula: Option<FormulaConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protection: Option<Protection>,
}

impl Property {
    /// Create a property with a minted id.
    pub fn new(name: impl Into<String>, type_: PropertyType) -> Self {
        Self {
            id: PropertyId::new(),
            name: name.into(),
            type_,
            required: false,
            frozen: false,
            visible: true,
            order: 0,
            select_options: None,
            relation: None,
            formula: None,
            protection: None,
        }
    }

    /// Create a property with an explicit id (store-issued or well-known).
    pub fn with_id(
        id: impl Into<PropertyId>,
        name: impl Into<String>,
        type_: PropertyType,
    ) -> Self {
        let mut property = Self::new(name, type_);
        property.id = id.into();
        property
    }

    /// Set the select options.
    pub fn with_options(mut self, options: Vec<SelectOption>) -> Self {
        self.select_options = Some(options);
        self
    }

    /// Mark the property frozen (protected).
    pub fn with_frozen(mut self, frozen: bool) -> Self {
        self.frozen = frozen;
        self
    }

    /// Attach a protection block (implies frozen).
    pub fn with_protection(mut self, protection: Protection) -> Self {
        self.frozen = true;
        self.protection = Some(protection);
        self
    }

    /// Set global visibility.
    pub fn with_visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }

    /// Set the column position.
    pub fn with_order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }

    /// Mark the property required.
    pub fn with_required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    /// Set the relation configuration.
    pub fn with_relation(mut self, relation: RelationConfig) -> Self {
        self.relation = Some(relation);
        self
    }

    /// Set the formula configuration.
    pub fn with_formula(mut self, expression: impl Into<String>) -> Self {
        self.formula = Some(FormulaConfig {
            expression: expression.into(),
        });
        self
    }

    /// The options of a select/multi-select property, if any.
    pub fn options(&self) -> Option<&[SelectOption]> {
        self.select_options.as_deref()
    }

    /// Look up an option by id.
    pub fn option(&self, id: &OptionId) -> Option<&SelectOption> {
        self.options()?.iter().find(|o| &o.id == id)
    }

    /// Whether edits are permitted (type editable and not frozen-locked).
    pub fn allows_edit(&self) -> bool {
        self.type_.is_editable() && (!self.frozen || self.protection_flags().allow_edit)
    }

    /// Whether the property may be hidden (per view or globally).
    pub fn allows_hide(&self) -> bool {
        !self.frozen || self.protection_flags().allow_hide
    }

    /// Whether the property may be deleted from the schema.
    pub fn allows_delete(&self) -> bool {
        !self.frozen || self.protection_flags().allow_delete
    }

    /// Effective protection flags (defaults when no block is configured).
    pub fn protection_flags(&self) -> Protection {
        self.protection.clone().unwrap_or_default()
    }

    /// Validate the definition: non-empty name, options present and
    /// non-empty exactly for select-family types.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(SchemaError::validation("name", "property name cannot be empty"));
        }
        match (self.type_.requires_options(), self.options()) {
            (true, None) => Err(SchemaError::validation(
                "select_options",
                format!("{} property requires options", self.type_),
            )),
            (true, Some([])) => Err(SchemaError::validation(
                "select_options",
                format!("{} property requires at least one option", self.type_),
            )),
            (false, Some(_)) => Err(SchemaError::validation(
                "select_options",
                format!("{} property cannot carry options", self.type_),
            )),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn property_type_wire_names() {
        let json = serde_json::to_string(&PropertyType::MultiSelect).unwrap();
        assert_eq!(json, "\"MULTI_SELECT\"");
        let parsed: PropertyType = serde_json::from_str("\"CREATED_TIME\"").unwrap();
        assert_eq!(parsed, PropertyType::CreatedTime);
    }

    #[test]
    fn system_and_computed_types_are_not_editable() {
        assert!(!PropertyType::Formula.is_editable());
        assert!(!PropertyType::Rollup.is_editable());
        assert!(!PropertyType::CreatedBy.is_editable());
        assert!(!PropertyType::LastEditedTime.is_editable());
        assert!(PropertyType::Text.is_editable());
        assert!(PropertyType::Checkbox.is_editable());
    }

    #[test]
    fn immediate_commit_types() {
        assert!(PropertyType::Checkbox.commits_immediately());
        assert!(PropertyType::Select.commits_immediately());
        assert!(PropertyType::Date.commits_immediately());
        assert!(!PropertyType::Text.commits_immediately());
        assert!(!PropertyType::Number.commits_immediately());
    }

    #[test]
    fn property_serializes_type_under_type_key() {
        let property = Property::new("title", PropertyType::Text);
        let json = serde_json::to_string(&property).unwrap();
        assert!(json.contains("\"type\":\"TEXT\""));
        assert!(!json.contains("type_"));
    }

    #[test]
    fn select_requires_options() {
        let bare = Property::new("status", PropertyType::Select);
        assert!(bare.validate().is_err());

        let empty = Property::new("status", PropertyType::Select).with_options(vec![]);
        assert!(empty.validate().is_err());

        let ok = Property::new("status", PropertyType::Select)
            .with_options(vec![SelectOption::with_id("a", "Todo")]);
        assert!(ok.validate().is_ok());
    }

    #[test]
    fn non_select_rejects_options() {
        let bad = Property::new("count", PropertyType::Number)
            .with_options(vec![SelectOption::with_id("a", "Todo")]);
        assert!(bad.validate().is_err());
    }

    #[test]
    fn empty_name_is_invalid() {
        let property = Property::new("   ", PropertyType::Text);
        assert!(matches!(
            property.validate(),
            Err(SchemaError::Validation { .. })
        ));
    }

    #[test]
    fn frozen_without_protection_block_allows_everything_but_stays_flagged() {
        let property = Property::new("isbn", PropertyType::Text).with_frozen(true);
        assert!(property.frozen);
        assert!(property.allows_edit());
        assert!(property.allows_hide());
        assert!(property.allows_delete());
    }

    #[test]
    fn locked_protection_denies_all() {
        let property = Property::new("isbn", PropertyType::Text)
            .with_protection(Protection::locked().with_reason("catalog-managed"));
        assert!(!property.allows_edit());
        assert!(!property.allows_hide());
        assert!(!property.allows_delete());
        assert_eq!(
            property.protection_flags().reason.as_deref(),
            Some("catalog-managed")
        );
    }

    #[test]
    fn protection_defaults_round_trip() {
        // Flags left at default are omitted on the wire and restored on read.
        let protection = Protection {
            allow_edit: true,
            allow_hide: false,
            allow_delete: true,
            reason: None,
        };
        let json = serde_json::to_string(&protection).unwrap();
        assert!(!json.contains("allow_edit"));
        assert!(json.contains("allow_hide"));
        let parsed: Protection = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, protection);
    }

    #[test]
    fn option_lookup() {
        let property = Property::new("status", PropertyType::Select).with_options(vec![
            SelectOption::with_id("a", "Todo").with_order(0),
            SelectOption::with_id("b", "Done").with_order(1),
        ]);
        assert_eq!(
            property.option(&OptionId::from_string("b")).unwrap().name,
            "Done"
        );
        assert!(property.option(&OptionId::from_string("zzz")).is_none());
    }
}
