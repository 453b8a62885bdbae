//! Saved view definitions: typed projections of a schema with independent
//! filter, sort, and visibility state.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::ids::{PropertyId, ViewId};
use crate::registry::FilterOperator;

/// The layout a view renders with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ViewType {
    Table,
    Board,
    Gallery,
    List,
    Calendar,
    Timeline,
}

impl ViewType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Table => "TABLE",
            Self::Board => "BOARD",
            Self::Gallery => "GALLERY",
            Self::List => "LIST",
            Self::Calendar => "CALENDAR",
            Self::Timeline => "TIMELINE",
        }
    }
}

impl std::fmt::Display for ViewType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Sort direction for one rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

impl std::fmt::Display for SortDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One filter rule of a view.
///
/// `value` stays duck-typed JSON until evaluation; rules are saved from
/// loose UI state and coerced against the property's current type each time
/// they run. `order` is explicit priority so that serialization or list
/// reordering never changes semantics; ties keep array position.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FilterRule {
    pub property: PropertyId,
    pub operator: FilterOperator,
    #[serde(default, skip_serializing_if = "JsonValue::is_null")]
    pub value: JsonValue,
    #[serde(default)]
    pub order: i32,
}

impl FilterRule {
    pub fn new(property: impl Into<PropertyId>, operator: FilterOperator) -> Self {
        Self {
            property: property.into(),
            operator,
            value: JsonValue::Null,
            order: 0,
        }
    }

    pub fn with_value(mut self, value: impl Into<JsonValue>) -> Self {
        self.value = value.into();
        self
    }

    pub fn with_order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }
}

/// One sort rule of a view. `order` is priority: the lowest-ordered rule is
/// the primary key, later rules break ties.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SortRule {
    pub property: PropertyId,
    pub direction: SortDirection,
    #[serde(default)]
    pub order: i32,
}

impl SortRule {
    pub fn new(property: impl Into<PropertyId>, direction: SortDirection) -> Self {
        Self {
            property: property.into(),
            direction,
            order: 0,
        }
    }

    pub fn with_order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }
}

/// A saved view: one named projection of a schema.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ViewDefinition {
    pub id: ViewId,
    pub name: String,
    #[serde(rename = "type")]
    pub type_: ViewType,
    #[serde(default)]
    pub is_default: bool,
    #[serde(default)]
    pub filters: Vec<FilterRule>,
    #[serde(default)]
    pub sorts: Vec<SortRule>,
    /// Empty means "use defaults": every globally visible property.
    #[serde(default)]
    pub visible_properties: Vec<PropertyId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_by: Option<PropertyId>,
}

impl ViewDefinition {
    /// Create a view with a minted id.
    pub fn new(name: impl Into<String>, type_: ViewType) -> Self {
        Self {
            id: ViewId::new(),
            name: name.into(),
            type_,
            is_default: false,
            filters: Vec::new(),
            sorts: Vec::new(),
            visible_properties: Vec::new(),
            group_by: None,
        }
    }

    /// Create a view with an explicit id (store-issued).
    pub fn with_id(id: impl Into<ViewId>, name: impl Into<String>, type_: ViewType) -> Self {
        let mut view = Self::new(name, type_);
        view.id = id.into();
        view
    }

    /// Mark this view as the schema's default.
    pub fn with_default(mut self, is_default: bool) -> Self {
        self.is_default = is_default;
        self
    }

    /// Append a filter rule.
    pub fn with_filter(mut self, rule: FilterRule) -> Self {
        self.filters.push(rule);
        self
    }

    /// Append a sort rule.
    pub fn with_sort(mut self, rule: SortRule) -> Self {
        self.sorts.push(rule);
        self
    }

    /// Set the visible-property list.
    pub fn with_visible_properties(mut self, ids: Vec<PropertyId>) -> Self {
        self.visible_properties = ids;
        self
    }

    /// Set the group-by property.
    pub fn with_group_by(mut self, property: impl Into<PropertyId>) -> Self {
        self.group_by = Some(property.into());
        self
    }

    /// Whether the view inherits the schema's default column set.
    pub fn uses_default_visibility(&self) -> bool {
        self.visible_properties.is_empty()
    }

    /// Filter rules in priority order. Stable, so equal `order` values keep
    /// array position.
    pub fn ordered_filters(&self) -> Vec<&FilterRule> {
        let mut rules: Vec<&FilterRule> = self.filters.iter().collect();
        rules.sort_by_key(|r| r.order);
        rules
    }

    /// Sort rules in priority order. Stable, so equal `order` values keep
    /// array position.
    pub fn ordered_sorts(&self) -> Vec<&SortRule> {
        let mut rules: Vec<&SortRule> = self.sorts.iter().collect();
        rules.sort_by_key(|r| r.order);
        rules
    }

    /// A copy of this view under a fresh id, named "<name> (copy)", never
    /// default.
    pub fn duplicate(&self) -> Self {
        let mut copy = self.clone();
        copy.id = ViewId::new();
        copy.name = format!("{} (copy)", self.name);
        copy.is_default = false;
        copy
    }
}
