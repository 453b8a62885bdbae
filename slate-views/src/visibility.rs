//! Effective column computation and per-view show/hide toggles.
//!
//! Three layers interact: the schema-global `visible` flag, the view's
//! advisory `visible_properties` list, and the frozen invariant. Frozen
//! properties are always in the resolved set, whatever the other two say.

use tracing::debug;

use slate_schema::{
    FrozenPropertyGuard, Property, PropertyAction, PropertyId, Result, Schema, SchemaError,
    ViewDefinition,
};

/// Computes visible columns and applies per-view visibility toggles.
#[derive(Debug, Clone, Copy, Default)]
pub struct VisibilityResolver {
    guard: FrozenPropertyGuard,
}

impl VisibilityResolver {
    pub fn new() -> Self {
        Self {
            guard: FrozenPropertyGuard::new(),
        }
    }

    /// The properties the view shows, in `Property::order` (ties keep
    /// schema position). A property is included iff it is frozen, or it is
    /// globally visible and either the view list is empty ("use defaults")
    /// or lists it. Stale list entries resolve to nothing and are ignored.
    pub fn visible_properties<'a>(
        &self,
        schema: &'a Schema,
        view: &ViewDefinition,
    ) -> Vec<&'a Property> {
        let mut visible: Vec<&Property> = schema
            .properties
            .iter()
            .filter(|property| {
                if property.frozen {
                    return true;
                }
                if !property.visible {
                    return false;
                }
                view.uses_default_visibility()
                    || view.visible_properties.contains(&property.id)
            })
            .collect();
        visible.sort_by_key(|p| p.order);
        visible
    }

    /// Hide a property in this view only. Materializes the default list on
    /// first use so the remaining columns stay explicit, then drops the id.
    /// The guard can deny hiding protected properties.
    pub fn hide_in_view(
        &self,
        schema: &Schema,
        view: &mut ViewDefinition,
        property: &PropertyId,
    ) -> Result<()> {
        let target = schema
            .property(property)
            .ok_or_else(|| SchemaError::not_found("property", property))?;
        self.guard.authorize(PropertyAction::Hide, target)?;
        if view.uses_default_visibility() {
            view.visible_properties = schema
                .properties
                .iter()
                .filter(|p| p.visible)
                .map(|p| p.id.clone())
                .collect();
        }
        view.visible_properties.retain(|id| id != property);
        debug!(view = %view.id, property = %property, "property hidden in view");
        Ok(())
    }

    /// Show a property in this view. A no-op while the view inherits
    /// defaults. Globally hidden properties stay hidden; lifting that takes
    /// [`Schema::set_property_visibility`].
    pub fn show_in_view(
        &self,
        schema: &Schema,
        view: &mut ViewDefinition,
        property: &PropertyId,
    ) -> Result<()> {
        if schema.property(property).is_none() {
            return Err(SchemaError::not_found("property", property));
        }
        if view.uses_default_visibility() {
            return Ok(());
        }
        if !view.visible_properties.contains(property) {
            view.visible_properties.push(property.clone());
        }
        Ok(())
    }
}
