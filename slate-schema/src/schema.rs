//! The schema: a named collection of properties and saved views.
//!
//! Structural mutations (add/update/remove property or view) validate here,
//! before anything is dispatched to a store. Rendering is deliberately more
//! tolerant than mutation: a deserialized schema may carry views whose rules
//! reference deleted properties, and projection degrades instead of failing.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, SchemaError};
use crate::ids::{PropertyId, SchemaId, ViewId};
use crate::property::{Property, PropertyType};
use crate::registry::PropertyTypeRegistry;
use crate::view::ViewDefinition;

/// A schema (the "database" of one module): properties, saved views, and
/// schema-level protection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Schema {
    pub id: SchemaId,
    pub name: String,
    #[serde(default)]
    pub properties: Vec<Property>,
    #[serde(default)]
    pub views: Vec<ViewDefinition>,
    /// A frozen schema refuses all structural mutations.
    #[serde(default)]
    pub frozen: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub permissions: Vec<String>,
}

impl Schema {
    /// Create an empty schema with a minted id.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: SchemaId::new(),
            name: name.into(),
            properties: Vec::new(),
            views: Vec::new(),
            frozen: false,
            permissions: Vec::new(),
        }
    }

    /// Create an empty schema with an explicit id (store-issued).
    pub fn with_id(id: impl Into<SchemaId>, name: impl Into<String>) -> Self {
        let mut schema = Self::new(name);
        schema.id = id.into();
        schema
    }

    /// Append a property at construction time. Unvalidated; use
    /// [`add_property`](Self::add_property) for checked mutation.
    pub fn with_property(mut self, property: Property) -> Self {
        self.properties.push(property);
        self
    }

    /// Append a view at construction time.
    pub fn with_view(mut self, view: ViewDefinition) -> Self {
        self.views.push(view);
        self
    }

    /// Mark the schema frozen.
    pub fn with_frozen(mut self, frozen: bool) -> Self {
        self.frozen = frozen;
        self
    }

    pub fn property(&self, id: &PropertyId) -> Option<&Property> {
        self.properties.iter().find(|p| &p.id == id)
    }

    pub fn property_mut(&mut self, id: &PropertyId) -> Option<&mut Property> {
        self.properties.iter_mut().find(|p| &p.id == id)
    }

    pub fn view(&self, id: &ViewId) -> Option<&ViewDefinition> {
        self.views.iter().find(|v| &v.id == id)
    }

    pub fn view_mut(&mut self, id: &ViewId) -> Option<&mut ViewDefinition> {
        self.views.iter_mut().find(|v| &v.id == id)
    }

    /// The view consumers open by default: the first flagged `is_default`,
    /// else the first view in list order. Zero and multiple defaults are
    /// tolerated.
    pub fn default_view(&self) -> Option<&ViewDefinition> {
        self.views
            .iter()
            .find(|v| v.is_default)
            .or_else(|| self.views.first())
    }

    /// Validate the whole schema: every property valid, property and view
    /// ids unique. Stale rule references inside views are allowed here;
    /// they are a render-time concern.
    pub fn validate(&self) -> Result<()> {
        for property in &self.properties {
            property.validate()?;
        }
        for (i, property) in self.properties.iter().enumerate() {
            if self.properties[..i].iter().any(|p| p.id == property.id) {
                return Err(SchemaError::validation(
                    "properties",
                    format!("duplicate property id '{}'", property.id),
                ));
            }
        }
        for (i, view) in self.views.iter().enumerate() {
            if self.views[..i].iter().any(|v| v.id == view.id) {
                return Err(SchemaError::validation(
                    "views",
                    format!("duplicate view id '{}'", view.id),
                ));
            }
        }
        Ok(())
    }

    /// Validate a view against the current property set. Used when a view
    /// is created or updated; every rule, visibility entry, and group-by
    /// must reference a live property.
    pub fn validate_view(&self, view: &ViewDefinition) -> Result<()> {
        if view.name.trim().is_empty() {
            return Err(SchemaError::validation("name", "view name cannot be empty"));
        }
        let missing = |id: &PropertyId| self.property(id).is_none();
        for rule in &view.filters {
            if missing(&rule.property) {
                return Err(SchemaError::not_found("property", &rule.property));
            }
        }
        for rule in &view.sorts {
            if missing(&rule.property) {
                return Err(SchemaError::not_found("property", &rule.property));
            }
        }
        for id in &view.visible_properties {
            if missing(id) {
                return Err(SchemaError::not_found("property", id));
            }
        }
        if let Some(id) = &view.group_by {
            if missing(id) {
                return Err(SchemaError::not_found("property", id));
            }
        }
        Ok(())
    }

    /// Add a property. Rejects invalid definitions and duplicate ids.
    pub fn add_property(&mut self, property: Property) -> Result<()> {
        property.validate()?;
        if self.property(&property.id).is_some() {
            return Err(SchemaError::validation(
                "id",
                format!("property id '{}' already exists", property.id),
            ));
        }
        debug!(schema = %self.id, property = %property.id, "property added");
        self.properties.push(property);
        Ok(())
    }

    /// Replace a property definition wholesale.
    pub fn update_property(&mut self, property: Property) -> Result<()> {
        property.validate()?;
        let existing = self
            .property_mut(&property.id)
            .ok_or_else(|| SchemaError::not_found("property", &property.id))?;
        *existing = property;
        Ok(())
    }

    /// Remove a property. Saved views may still reference the id; their
    /// rules degrade at render time, and record values under the id become
    /// display-only garbage.
    pub fn remove_property(&mut self, id: &PropertyId) -> Result<Property> {
        let index = self
            .properties
            .iter()
            .position(|p| &p.id == id)
            .ok_or_else(|| SchemaError::not_found("property", id))?;
        debug!(schema = %self.id, property = %id, "property removed");
        Ok(self.properties.remove(index))
    }

    /// Rename a property.
    pub fn rename_property(&mut self, id: &PropertyId, name: impl Into<String>) -> Result<()> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(SchemaError::validation("name", "property name cannot be empty"));
        }
        let property = self
            .property_mut(id)
            .ok_or_else(|| SchemaError::not_found("property", id))?;
        property.name = name;
        Ok(())
    }

    /// Change a property's type, enforcing the compatibility matrix. Stored
    /// record values are not rewritten here; renderers tolerate stale
    /// shapes and the store migrates at its own pace.
    pub fn convert_property(
        &mut self,
        id: &PropertyId,
        to: PropertyType,
        registry: &PropertyTypeRegistry,
    ) -> Result<()> {
        let schema_id = self.id.clone();
        let property = self
            .property_mut(id)
            .ok_or_else(|| SchemaError::not_found("property", id))?;
        registry.check_convert(property.type_, to)?;
        debug!(schema = %schema_id, property = %id, from = %property.type_, to = %to, "property type changed");
        property.type_ = to;
        Ok(())
    }

    /// Set a property's global visibility. Unhiding here is the only way to
    /// reverse a global hide; per-view toggles never touch this flag.
    pub fn set_property_visibility(&mut self, id: &PropertyId, visible: bool) -> Result<()> {
        let property = self
            .property_mut(id)
            .ok_or_else(|| SchemaError::not_found("property", id))?;
        property.visible = visible;
        Ok(())
    }

    /// Add a view. Rules must reference live properties.
    pub fn add_view(&mut self, view: ViewDefinition) -> Result<()> {
        self.validate_view(&view)?;
        if self.view(&view.id).is_some() {
            return Err(SchemaError::validation(
                "id",
                format!("view id '{}' already exists", view.id),
            ));
        }
        debug!(schema = %self.id, view = %view.id, "view added");
        self.views.push(view);
        Ok(())
    }

    /// Replace a view definition wholesale.
    pub fn update_view(&mut self, view: ViewDefinition) -> Result<()> {
        self.validate_view(&view)?;
        let existing = self
            .view_mut(&view.id)
            .ok_or_else(|| SchemaError::not_found("view", &view.id))?;
        *existing = view;
        Ok(())
    }

    /// Remove a view.
    pub fn remove_view(&mut self, id: &ViewId) -> Result<ViewDefinition> {
        let index = self
            .views
            .iter()
            .position(|v| &v.id == id)
            .ok_or_else(|| SchemaError::not_found("view", id))?;
        debug!(schema = %self.id, view = %id, "view removed");
        Ok(self.views.remove(index))
    }

    /// Duplicate a view under a fresh id and append it. Returns the copy.
    pub fn duplicate_view(&mut self, id: &ViewId) -> Result<ViewDefinition> {
        let source = self
            .view(id)
            .ok_or_else(|| SchemaError::not_found("view", id))?;
        let copy = source.duplicate();
        self.views.push(copy.clone());
        Ok(copy)
    }
}
