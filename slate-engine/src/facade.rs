//! The per-module store facade.
//!
//! One generic client replaces per-module service code: everything a module
//! needs from its store is a path built from the module segment plus a
//! typed payload. `R` is the record payload type; the engine itself uses
//! [`slate_schema::Record`], domain crates may substitute their own.

use std::marker::PhantomData;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};
use tracing::debug;

use slate_schema::{Property, PropertyId, PropertyType, Protection, RecordId, ViewDefinition, ViewId};

use crate::config::{Capabilities, ModuleConfig};
use crate::envelope;
use crate::error::Result;
use crate::query::ListQuery;
use crate::transport::{ApiRequest, Method, Transport};

/// Where an inserted column lands relative to its anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InsertPosition {
    Left,
    Right,
}

/// Typed access to one module's REST surface.
pub struct ModuleApiFacade<R> {
    module: String,
    transport: Arc<dyn Transport>,
    _record: PhantomData<fn() -> R>,
}

impl<R> std::fmt::Debug for ModuleApiFacade<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleApiFacade")
            .field("module", &self.module)
            .finish_non_exhaustive()
    }
}

impl<R> ModuleApiFacade<R>
where
    R: Serialize + DeserializeOwned + Send + Sync,
{
    pub fn new(module: impl Into<String>, transport: Arc<dyn Transport>) -> Self {
        Self {
            module: module.into(),
            transport,
            _record: PhantomData,
        }
    }

    pub fn module(&self) -> &str {
        &self.module
    }

    fn path(&self, rest: &str) -> String {
        format!("/{}{}", self.module, rest)
    }

    async fn send<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T> {
        debug!(method = %request.method, path = %request.path, "store request");
        let raw = self.transport.send(request).await?;
        envelope::decode(raw)
    }

    // Config

    pub async fn fetch_config(&self) -> Result<ModuleConfig> {
        self.send(ApiRequest::new(Method::Get, self.path("/config")))
            .await
    }

    // Views

    pub async fn fetch_views(&self) -> Result<Vec<ViewDefinition>> {
        self.send(ApiRequest::new(Method::Get, self.path("/views")))
            .await
    }

    pub async fn fetch_view(&self, id: &ViewId) -> Result<ViewDefinition> {
        self.send(ApiRequest::new(Method::Get, self.path(&format!("/views/{id}"))))
            .await
    }

    pub async fn create_view(&self, view: &ViewDefinition) -> Result<ViewDefinition> {
        let request = ApiRequest::new(Method::Post, self.path("/views"))
            .with_body(serde_json::to_value(view)?);
        self.send(request).await
    }

    pub async fn update_view(&self, view: &ViewDefinition) -> Result<ViewDefinition> {
        let request = ApiRequest::new(Method::Put, self.path(&format!("/views/{}", view.id)))
            .with_body(serde_json::to_value(view)?);
        self.send(request).await
    }

    pub async fn patch_view(&self, id: &ViewId, patch: JsonValue) -> Result<ViewDefinition> {
        let request =
            ApiRequest::new(Method::Patch, self.path(&format!("/views/{id}"))).with_body(patch);
        self.send(request).await
    }

    pub async fn delete_view(&self, id: &ViewId) -> Result<()> {
        self.send(ApiRequest::new(Method::Delete, self.path(&format!("/views/{id}"))))
            .await
    }

    pub async fn duplicate_view(&self, id: &ViewId) -> Result<ViewDefinition> {
        self.send(ApiRequest::new(
            Method::Post,
            self.path(&format!("/views/{id}/duplicate")),
        ))
        .await
    }

    // Properties

    pub async fn fetch_properties(&self) -> Result<Vec<Property>> {
        self.send(ApiRequest::new(Method::Get, self.path("/properties")))
            .await
    }

    pub async fn create_property(&self, property: &Property) -> Result<Property> {
        let request = ApiRequest::new(Method::Post, self.path("/properties"))
            .with_body(serde_json::to_value(property)?);
        self.send(request).await
    }

    pub async fn update_property(&self, property: &Property) -> Result<Property> {
        let request = ApiRequest::new(
            Method::Put,
            self.path(&format!("/properties/{}", property.id)),
        )
        .with_body(serde_json::to_value(property)?);
        self.send(request).await
    }

    pub async fn patch_property(&self, id: &PropertyId, patch: JsonValue) -> Result<Property> {
        let request = ApiRequest::new(Method::Patch, self.path(&format!("/properties/{id}")))
            .with_body(patch);
        self.send(request).await
    }

    pub async fn delete_property(&self, id: &PropertyId) -> Result<()> {
        self.send(ApiRequest::new(
            Method::Delete,
            self.path(&format!("/properties/{id}")),
        ))
        .await
    }

    pub async fn freeze_property(
        &self,
        id: &PropertyId,
        frozen: bool,
        protection: Option<&Protection>,
    ) -> Result<Property> {
        let request = ApiRequest::new(
            Method::Patch,
            self.path(&format!("/properties/{id}/freeze")),
        )
        .with_body(json!({"frozen": frozen, "protection": protection}));
        self.send(request).await
    }

    pub async fn hide_property(&self, id: &PropertyId, visible: bool) -> Result<Property> {
        let request = ApiRequest::new(Method::Patch, self.path(&format!("/properties/{id}/hide")))
            .with_body(json!({"visible": visible}));
        self.send(request).await
    }

    pub async fn change_property_type(
        &self,
        id: &PropertyId,
        to: PropertyType,
    ) -> Result<Property> {
        let request = ApiRequest::new(Method::Patch, self.path(&format!("/properties/{id}/type")))
            .with_body(json!({"type": to}));
        self.send(request).await
    }

    pub async fn rename_property(&self, id: &PropertyId, name: &str) -> Result<Property> {
        let request = ApiRequest::new(Method::Patch, self.path(&format!("/properties/{id}/name")))
            .with_body(json!({"name": name}));
        self.send(request).await
    }

    pub async fn duplicate_property(&self, id: &PropertyId) -> Result<Property> {
        self.send(ApiRequest::new(
            Method::Post,
            self.path(&format!("/properties/{id}/duplicate")),
        ))
        .await
    }

    pub async fn insert_property(
        &self,
        anchor: &PropertyId,
        position: InsertPosition,
    ) -> Result<Property> {
        let request = ApiRequest::new(
            Method::Post,
            self.path(&format!("/properties/{anchor}/insert")),
        )
        .with_body(json!({"position": position}));
        self.send(request).await
    }

    // Records

    pub async fn fetch_records(
        &self,
        query: &ListQuery,
        capabilities: &Capabilities,
    ) -> Result<Vec<R>> {
        let request = ApiRequest::new(Method::Get, self.path("/records"))
            .with_query(query.encode(capabilities));
        self.send(request).await
    }

    pub async fn fetch_record(&self, id: &RecordId) -> Result<R> {
        self.send(ApiRequest::new(Method::Get, self.path(&format!("/records/{id}"))))
            .await
    }

    pub async fn create_record(&self, record: &R) -> Result<R> {
        let request = ApiRequest::new(Method::Post, self.path("/records"))
            .with_body(serde_json::to_value(record)?);
        self.send(request).await
    }

    pub async fn update_record(&self, id: &RecordId, record: &R) -> Result<R> {
        let request = ApiRequest::new(Method::Put, self.path(&format!("/records/{id}")))
            .with_body(serde_json::to_value(record)?);
        self.send(request).await
    }

    pub async fn patch_record(&self, id: &RecordId, patch: JsonValue) -> Result<R> {
        let request =
            ApiRequest::new(Method::Patch, self.path(&format!("/records/{id}"))).with_body(patch);
        self.send(request).await
    }

    pub async fn delete_record(&self, id: &RecordId) -> Result<()> {
        self.send(ApiRequest::new(
            Method::Delete,
            self.path(&format!("/records/{id}")),
        ))
        .await
    }

    pub async fn bulk_patch_records(&self, ids: &[RecordId], patch: JsonValue) -> Result<Vec<R>> {
        let request = ApiRequest::new(Method::Patch, self.path("/records/bulk"))
            .with_body(json!({"ids": ids, "patch": patch}));
        self.send(request).await
    }

    pub async fn bulk_delete_records(&self, ids: &[RecordId]) -> Result<()> {
        let request = ApiRequest::new(Method::Delete, self.path("/records/bulk"))
            .with_body(json!({"ids": ids}));
        self.send(request).await
    }
}
