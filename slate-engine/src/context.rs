//! Live module state and the mutation boundary.
//!
//! A [`ModuleContext`] owns one module's schema and record snapshot and is
//! the only place mutations happen. Every mutation follows the same
//! discipline: authorize locally, apply optimistically, dispatch through
//! the facade, then reconcile with the store's reply or roll the local
//! change back. Successful mutations and rollbacks both publish one coarse
//! invalidation for the schema; denials never reach the transport.

use std::sync::Arc;

use serde_json::Value as JsonValue;
use tracing::{debug, warn};

use slate_schema::{
    FrozenPropertyGuard, Property, PropertyAction, PropertyId, PropertyType,
    PropertyTypeRegistry, PropertyValue, Protection, Record, RecordId, Schema, SchemaError,
    ViewDefinition, ViewId,
};
use slate_views::{Projection, ViewProjection, VisibilityResolver};

use crate::config::{Capabilities, ModuleConfig};
use crate::error::Result;
use crate::events::{Invalidation, InvalidationBus};
use crate::facade::{InsertPosition, ModuleApiFacade};
use crate::query::ListQuery;
use crate::transport::Transport;

/// One module's schema, records, and mutation pipeline.
#[derive(Debug)]
pub struct ModuleContext {
    config: ModuleConfig,
    facade: ModuleApiFacade<Record>,
    schema: Schema,
    records: Vec<Record>,
    bus: InvalidationBus,
    guard: FrozenPropertyGuard,
    registry: PropertyTypeRegistry,
    projection: Projection,
    visibility: VisibilityResolver,
}

impl ModuleContext {
    /// Open a module: fetch its config, structure, and records.
    ///
    /// An empty store is seeded from the config's default properties and
    /// views; anything the store has saved wins over defaults.
    pub async fn open(transport: Arc<dyn Transport>, module: impl Into<String>) -> Result<Self> {
        let module = module.into();
        let facade = ModuleApiFacade::new(module.clone(), transport);
        let config = facade.fetch_config().await?;
        let properties = facade.fetch_properties().await?;
        let views = facade.fetch_views().await?;

        let schema = if properties.is_empty() && views.is_empty() {
            debug!(module = %module, "store is empty, seeding schema from config defaults");
            config.seed_schema()
        } else {
            let mut schema = Schema::with_id(module.as_str(), config.display_name())
                .with_frozen(config.frozen);
            schema.properties = properties;
            schema.views = views;
            schema
        };

        let records = facade
            .fetch_records(&ListQuery::new(), &config.capabilities)
            .await?;
        debug!(
            module = %module,
            properties = schema.properties.len(),
            views = schema.views.len(),
            records = records.len(),
            "module context opened"
        );
        Ok(Self {
            config,
            facade,
            schema,
            records,
            bus: InvalidationBus::default(),
            guard: FrozenPropertyGuard::new(),
            registry: PropertyTypeRegistry::new(),
            projection: Projection::new(),
            visibility: VisibilityResolver::new(),
        })
    }

    pub fn config(&self) -> &ModuleConfig {
        &self.config
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.config.capabilities
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn record(&self, id: &RecordId) -> Option<&Record> {
        self.records.iter().find(|r| &r.id == id)
    }

    pub fn registry(&self) -> &PropertyTypeRegistry {
        &self.registry
    }

    pub fn guard(&self) -> &FrozenPropertyGuard {
        &self.guard
    }

    /// Direct access to the store facade, for flows the context does not
    /// wrap (for example server-side pagination).
    pub fn facade(&self) -> &ModuleApiFacade<Record> {
        &self.facade
    }

    pub fn bus(&self) -> &InvalidationBus {
        &self.bus
    }

    fn publish_invalidation(&self) {
        self.bus.publish(Invalidation::new(self.schema.id.clone()));
    }

    // Reads

    /// Evaluate a view over the current snapshot.
    pub fn project(&self, view_id: &ViewId) -> Result<ViewProjection<'_>> {
        let view = self
            .schema
            .view(view_id)
            .ok_or_else(|| SchemaError::not_found("view", view_id))?;
        Ok(self.projection.project(&self.schema, view, &self.records))
    }

    /// Evaluate the default view (first in list order when none is
    /// flagged).
    pub fn project_default(&self) -> Result<ViewProjection<'_>> {
        let view = self
            .schema
            .default_view()
            .ok_or_else(|| SchemaError::not_found("view", "default"))?;
        Ok(self.projection.project(&self.schema, view, &self.records))
    }

    /// Evaluate a view with a local search term layered on. This is the
    /// fallback path for stores without the `search` capability; stores
    /// that support it get the term via [`ListQuery`] instead.
    pub fn project_with_search(
        &self,
        view_id: &ViewId,
        query: &str,
    ) -> Result<ViewProjection<'_>> {
        let view = self
            .schema
            .view(view_id)
            .ok_or_else(|| SchemaError::not_found("view", view_id))?;
        Ok(self
            .projection
            .project_with_search(&self.schema, view, &self.records, Some(query)))
    }

    /// Reload the record snapshot from the store.
    pub async fn refresh(&mut self) -> Result<()> {
        self.records = self
            .facade
            .fetch_records(&ListQuery::new(), &self.config.capabilities)
            .await?;
        self.publish_invalidation();
        Ok(())
    }

    // Property mutations

    /// Add a property. Optimistic; the store's saved copy replaces the
    /// local one on success.
    pub async fn add_property(&mut self, property: Property) -> Result<Property> {
        self.guard.authorize_structural(&self.schema)?;
        self.schema.add_property(property.clone())?;
        match self.facade.create_property(&property).await {
            Ok(saved) => {
                if let Some(slot) = self.schema.property_mut(&property.id) {
                    *slot = saved.clone();
                }
                self.publish_invalidation();
                Ok(saved)
            }
            Err(err) => {
                warn!(property = %property.id, error = %err, "property create failed, rolling back");
                self.schema.properties.retain(|p| p.id != property.id);
                self.publish_invalidation();
                Err(err)
            }
        }
    }

    /// Delete a property. Checks schema freeze and the property's own
    /// protection before anything leaves the process.
    pub async fn remove_property(&mut self, id: &PropertyId) -> Result<()> {
        self.guard.authorize_structural(&self.schema)?;
        let index = self
            .schema
            .properties
            .iter()
            .position(|p| &p.id == id)
            .ok_or_else(|| SchemaError::not_found("property", id))?;
        self.guard
            .authorize(PropertyAction::Delete, &self.schema.properties[index])?;
        let removed = self.schema.remove_property(id)?;
        match self.facade.delete_property(id).await {
            Ok(()) => {
                self.publish_invalidation();
                Ok(())
            }
            Err(err) => {
                warn!(property = %id, error = %err, "property delete failed, rolling back");
                self.schema.properties.insert(index, removed);
                self.publish_invalidation();
                Err(err)
            }
        }
    }

    pub async fn rename_property(
        &mut self,
        id: &PropertyId,
        name: impl Into<String>,
    ) -> Result<Property> {
        let name = name.into();
        let previous = self
            .schema
            .property(id)
            .ok_or_else(|| SchemaError::not_found("property", id))?
            .name
            .clone();
        self.schema.rename_property(id, name.clone())?;
        match self.facade.rename_property(id, &name).await {
            Ok(saved) => {
                if let Some(slot) = self.schema.property_mut(id) {
                    *slot = saved.clone();
                }
                self.publish_invalidation();
                Ok(saved)
            }
            Err(err) => {
                warn!(property = %id, error = %err, "property rename failed, rolling back");
                if let Some(slot) = self.schema.property_mut(id) {
                    slot.name = previous;
                }
                self.publish_invalidation();
                Err(err)
            }
        }
    }

    /// Change a property's type. The compatibility matrix is enforced
    /// locally first; an incompatible pair fails with `TypeConversion`
    /// before any request is dispatched.
    pub async fn change_property_type(
        &mut self,
        id: &PropertyId,
        to: PropertyType,
    ) -> Result<Property> {
        self.guard.authorize_structural(&self.schema)?;
        let previous = self
            .schema
            .property(id)
            .ok_or_else(|| SchemaError::not_found("property", id))?
            .type_;
        self.schema.convert_property(id, to, &self.registry)?;
        match self.facade.change_property_type(id, to).await {
            Ok(saved) => {
                if let Some(slot) = self.schema.property_mut(id) {
                    *slot = saved.clone();
                }
                self.publish_invalidation();
                Ok(saved)
            }
            Err(err) => {
                warn!(property = %id, error = %err, "type change failed, rolling back");
                if let Some(slot) = self.schema.property_mut(id) {
                    slot.type_ = previous;
                }
                self.publish_invalidation();
                Err(err)
            }
        }
    }

    /// Freeze or unfreeze a property, optionally replacing its protection
    /// flags.
    pub async fn freeze_property(
        &mut self,
        id: &PropertyId,
        frozen: bool,
        protection: Option<Protection>,
    ) -> Result<Property> {
        let previous = {
            let property = self
                .schema
                .property_mut(id)
                .ok_or_else(|| SchemaError::not_found("property", id))?;
            let previous = (property.frozen, property.protection.clone());
            property.frozen = frozen;
            property.protection = protection.clone();
            previous
        };
        match self.facade.freeze_property(id, frozen, protection.as_ref()).await {
            Ok(saved) => {
                if let Some(slot) = self.schema.property_mut(id) {
                    *slot = saved.clone();
                }
                self.publish_invalidation();
                Ok(saved)
            }
            Err(err) => {
                warn!(property = %id, error = %err, "freeze failed, rolling back");
                if let Some(slot) = self.schema.property_mut(id) {
                    slot.frozen = previous.0;
                    slot.protection = previous.1;
                }
                self.publish_invalidation();
                Err(err)
            }
        }
    }

    /// Set global visibility. Hiding consults the guard; unhiding is the
    /// schema-level escape hatch and is always allowed.
    pub async fn set_property_visibility(
        &mut self,
        id: &PropertyId,
        visible: bool,
    ) -> Result<Property> {
        let target = self
            .schema
            .property(id)
            .ok_or_else(|| SchemaError::not_found("property", id))?;
        if !visible {
            self.guard.authorize(PropertyAction::Hide, target)?;
        }
        let previous = target.visible;
        self.schema.set_property_visibility(id, visible)?;
        match self.facade.hide_property(id, visible).await {
            Ok(saved) => {
                if let Some(slot) = self.schema.property_mut(id) {
                    *slot = saved.clone();
                }
                self.publish_invalidation();
                Ok(saved)
            }
            Err(err) => {
                warn!(property = %id, error = %err, "visibility change failed, rolling back");
                if let Some(slot) = self.schema.property_mut(id) {
                    slot.visible = previous;
                }
                self.publish_invalidation();
                Err(err)
            }
        }
    }

    /// Duplicate a property. The store mints the copy, so this dispatches
    /// first and applies the saved result.
    pub async fn duplicate_property(&mut self, id: &PropertyId) -> Result<Property> {
        self.guard.authorize_structural(&self.schema)?;
        if self.schema.property(id).is_none() {
            return Err(SchemaError::not_found("property", id).into());
        }
        let saved = self.facade.duplicate_property(id).await?;
        self.schema.add_property(saved.clone())?;
        self.publish_invalidation();
        Ok(saved)
    }

    /// Insert a store-minted property next to an anchor column.
    pub async fn insert_property(
        &mut self,
        anchor: &PropertyId,
        position: InsertPosition,
    ) -> Result<Property> {
        self.guard.authorize_structural(&self.schema)?;
        let index = self
            .schema
            .properties
            .iter()
            .position(|p| &p.id == anchor)
            .ok_or_else(|| SchemaError::not_found("property", anchor))?;
        let saved = self.facade.insert_property(anchor, position).await?;
        let at = match position {
            InsertPosition::Left => index,
            InsertPosition::Right => index + 1,
        };
        self.schema.properties.insert(at, saved.clone());
        self.publish_invalidation();
        Ok(saved)
    }

    // View mutations

    pub async fn add_view(&mut self, view: ViewDefinition) -> Result<ViewDefinition> {
        self.guard.authorize_structural(&self.schema)?;
        self.schema.add_view(view.clone())?;
        match self.facade.create_view(&view).await {
            Ok(saved) => {
                if let Some(slot) = self.schema.view_mut(&view.id) {
                    *slot = saved.clone();
                }
                self.publish_invalidation();
                Ok(saved)
            }
            Err(err) => {
                warn!(view = %view.id, error = %err, "view create failed, rolling back");
                self.schema.views.retain(|v| v.id != view.id);
                self.publish_invalidation();
                Err(err)
            }
        }
    }

    pub async fn update_view(&mut self, view: ViewDefinition) -> Result<ViewDefinition> {
        let previous = self
            .schema
            .view(&view.id)
            .cloned()
            .ok_or_else(|| SchemaError::not_found("view", &view.id))?;
        self.schema.update_view(view.clone())?;
        match self.facade.update_view(&view).await {
            Ok(saved) => {
                if let Some(slot) = self.schema.view_mut(&view.id) {
                    *slot = saved.clone();
                }
                self.publish_invalidation();
                Ok(saved)
            }
            Err(err) => {
                warn!(view = %view.id, error = %err, "view update failed, rolling back");
                if let Some(slot) = self.schema.view_mut(&view.id) {
                    *slot = previous;
                }
                self.publish_invalidation();
                Err(err)
            }
        }
    }

    pub async fn remove_view(&mut self, id: &ViewId) -> Result<()> {
        self.guard.authorize_structural(&self.schema)?;
        let index = self
            .schema
            .views
            .iter()
            .position(|v| &v.id == id)
            .ok_or_else(|| SchemaError::not_found("view", id))?;
        let removed = self.schema.remove_view(id)?;
        match self.facade.delete_view(id).await {
            Ok(()) => {
                self.publish_invalidation();
                Ok(())
            }
            Err(err) => {
                warn!(view = %id, error = %err, "view delete failed, rolling back");
                self.schema.views.insert(index, removed);
                self.publish_invalidation();
                Err(err)
            }
        }
    }

    /// Duplicate a view. The store mints the copy's id.
    pub async fn duplicate_view(&mut self, id: &ViewId) -> Result<ViewDefinition> {
        self.guard.authorize_structural(&self.schema)?;
        if self.schema.view(id).is_none() {
            return Err(SchemaError::not_found("view", id).into());
        }
        let saved = self.facade.duplicate_view(id).await?;
        self.schema.views.push(saved.clone());
        self.publish_invalidation();
        Ok(saved)
    }

    /// Hide a property in one view. Persists through the regular view
    /// update path, so it shares its optimistic/rollback behavior.
    pub async fn hide_property_in_view(
        &mut self,
        view_id: &ViewId,
        property: &PropertyId,
    ) -> Result<ViewDefinition> {
        let mut view = self
            .schema
            .view(view_id)
            .cloned()
            .ok_or_else(|| SchemaError::not_found("view", view_id))?;
        self.visibility.hide_in_view(&self.schema, &mut view, property)?;
        self.update_view(view).await
    }

    /// Show a property in one view. A no-op while the view inherits
    /// default visibility.
    pub async fn show_property_in_view(
        &mut self,
        view_id: &ViewId,
        property: &PropertyId,
    ) -> Result<ViewDefinition> {
        let mut view = self
            .schema
            .view(view_id)
            .cloned()
            .ok_or_else(|| SchemaError::not_found("view", view_id))?;
        self.visibility.show_in_view(&self.schema, &mut view, property)?;
        self.update_view(view).await
    }

    // Record mutations

    pub async fn create_record(&mut self, record: Record) -> Result<Record> {
        self.records.push(record.clone());
        match self.facade.create_record(&record).await {
            Ok(saved) => {
                if let Some(slot) = self.records.iter_mut().find(|r| r.id == record.id) {
                    *slot = saved.clone();
                }
                self.publish_invalidation();
                Ok(saved)
            }
            Err(err) => {
                warn!(record = %record.id, error = %err, "record create failed, rolling back");
                self.records.retain(|r| r.id != record.id);
                self.publish_invalidation();
                Err(err)
            }
        }
    }

    pub async fn delete_record(&mut self, id: &RecordId) -> Result<()> {
        let index = self
            .records
            .iter()
            .position(|r| &r.id == id)
            .ok_or_else(|| SchemaError::not_found("record", id))?;
        let removed = self.records.remove(index);
        match self.facade.delete_record(id).await {
            Ok(()) => {
                self.publish_invalidation();
                Ok(())
            }
            Err(err) => {
                warn!(record = %id, error = %err, "record delete failed, rolling back");
                self.records.insert(index, removed);
                self.publish_invalidation();
                Err(err)
            }
        }
    }

    /// Patch several records in one round-trip when the store supports
    /// bulk, per-record otherwise. Replies for records deleted locally in
    /// the meantime are discarded.
    pub async fn bulk_patch_records(
        &mut self,
        ids: &[RecordId],
        patch: JsonValue,
    ) -> Result<Vec<Record>> {
        let saved = if self.config.capabilities.bulk {
            self.facade.bulk_patch_records(ids, patch).await?
        } else {
            let mut saved = Vec::with_capacity(ids.len());
            for id in ids {
                saved.push(self.facade.patch_record(id, patch.clone()).await?);
            }
            saved
        };
        for record in &saved {
            if let Some(slot) = self.records.iter_mut().find(|r| r.id == record.id) {
                *slot = record.clone();
            } else {
                debug!(record = %record.id, "bulk reply for a record deleted locally, discarded");
            }
        }
        self.publish_invalidation();
        Ok(saved)
    }

    pub async fn bulk_delete_records(&mut self, ids: &[RecordId]) -> Result<()> {
        if self.config.capabilities.bulk {
            self.facade.bulk_delete_records(ids).await?;
        } else {
            for id in ids {
                self.facade.delete_record(id).await?;
            }
        }
        self.records.retain(|r| !ids.contains(&r.id));
        self.publish_invalidation();
        Ok(())
    }

    /// Commit one cell value: optimistic local apply, PATCH, reconcile.
    ///
    /// `captured` is the pre-edit value the caller snapshotted; a failed
    /// dispatch restores it, along with the record's previous `updated_at`.
    /// A reply for a record that vanished locally is discarded. Callers
    /// are expected to have skipped the write when nothing changed.
    pub(crate) async fn commit_value(
        &mut self,
        record_id: &RecordId,
        property_id: &PropertyId,
        value: Option<PropertyValue>,
        captured: Option<PropertyValue>,
    ) -> Result<()> {
        let record = self
            .records
            .iter_mut()
            .find(|r| &r.id == record_id)
            .ok_or_else(|| SchemaError::not_found("record", record_id))?;
        let previous_updated = record.updated_at;
        record.set_value(property_id.clone(), value.clone());

        let mut changed = serde_json::Map::new();
        changed.insert(property_id.to_string(), serde_json::to_value(&value)?);
        let mut body = serde_json::Map::new();
        body.insert("properties".to_string(), JsonValue::Object(changed));
        let body = JsonValue::Object(body);

        match self.facade.patch_record(record_id, body).await {
            Ok(saved) => {
                if let Some(slot) = self.records.iter_mut().find(|r| &r.id == record_id) {
                    *slot = saved;
                } else {
                    debug!(record = %record_id, "commit reply for a record deleted locally, discarded");
                }
                self.publish_invalidation();
                Ok(())
            }
            Err(err) => {
                warn!(record = %record_id, property = %property_id, error = %err, "commit failed, rolling back");
                if let Some(slot) = self.records.iter_mut().find(|r| &r.id == record_id) {
                    slot.set_value(property_id.clone(), captured);
                    slot.updated_at = previous_updated;
                }
                self.publish_invalidation();
                Err(err)
            }
        }
    }
}
