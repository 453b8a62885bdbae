//! An in-memory store speaking the module REST surface.
//!
//! Backs integration tests without a server: it implements [`Transport`]
//! over mutexed state, records every request for call-count assertions,
//! and can be armed to fail the next exchange at either the transport or
//! the store level.

use std::sync::Mutex;

use chrono::Utc;
use serde_json::{json, Value as JsonValue};

use slate_schema::{Property, PropertyId, PropertyType, Record, RecordId, ViewDefinition, ViewId};

use crate::config::ModuleConfig;
use crate::error::{EngineError, Result};
use crate::transport::{ApiRequest, Method, Transport};

#[derive(Debug, Clone)]
enum InjectedFailure {
    Transport(String),
    Store(String),
}

#[derive(Debug, Clone)]
struct StoreState {
    config: ModuleConfig,
    properties: Vec<Property>,
    views: Vec<ViewDefinition>,
    records: Vec<Record>,
}

/// In-memory module store.
#[derive(Debug)]
pub struct InMemoryStore {
    state: Mutex<StoreState>,
    calls: Mutex<Vec<ApiRequest>>,
    failure: Mutex<Option<InjectedFailure>>,
}

impl InMemoryStore {
    /// An empty store for the given module config. Opening a context on it
    /// exercises the default-seeding path.
    pub fn new(config: ModuleConfig) -> Self {
        Self::with_state(config, Vec::new(), Vec::new(), Vec::new())
    }

    /// A pre-populated store.
    pub fn with_state(
        config: ModuleConfig,
        properties: Vec<Property>,
        views: Vec<ViewDefinition>,
        records: Vec<Record>,
    ) -> Self {
        Self {
            state: Mutex::new(StoreState {
                config,
                properties,
                views,
                records,
            }),
            calls: Mutex::new(Vec::new()),
            failure: Mutex::new(None),
        }
    }

    /// Make the next exchange fail before reaching the store.
    pub fn fail_next_with_transport(&self, message: impl Into<String>) {
        *self.lock_failure() = Some(InjectedFailure::Transport(message.into()));
    }

    /// Make the next exchange return a `success: false` envelope.
    pub fn fail_next_with_store(&self, message: impl Into<String>) {
        *self.lock_failure() = Some(InjectedFailure::Store(message.into()));
    }

    /// Every request seen so far, in order.
    pub fn calls(&self) -> Vec<ApiRequest> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Requests matching a method whose path contains the fragment.
    pub fn calls_matching(&self, method: Method, fragment: &str) -> Vec<ApiRequest> {
        self.calls()
            .into_iter()
            .filter(|c| c.method == method && c.path.contains(fragment))
            .collect()
    }

    pub fn records(&self) -> Vec<Record> {
        self.lock_state().records.clone()
    }

    pub fn properties(&self) -> Vec<Property> {
        self.lock_state().properties.clone()
    }

    pub fn views(&self) -> Vec<ViewDefinition> {
        self.lock_state().views.clone()
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_failure(&self) -> std::sync::MutexGuard<'_, Option<InjectedFailure>> {
        self.failure.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn success(data: JsonValue) -> JsonValue {
        json!({
            "success": true,
            "message": "ok",
            "data": data,
            "timestamp": Utc::now().to_rfc3339(),
        })
    }

    fn rejection(message: &str) -> JsonValue {
        json!({
            "success": false,
            "message": message,
            "error": { "message": message },
        })
    }

    fn route(&self, request: &ApiRequest) -> JsonValue {
        let segments: Vec<String> = request
            .path_segments()
            .into_iter()
            .map(str::to_string)
            .collect();
        let mut state = self.lock_state();
        if segments.first().map(String::as_str) != Some(state.config.module.as_str()) {
            return Self::rejection("unknown module");
        }
        let rest: Vec<&str> = segments.iter().skip(1).map(String::as_str).collect();
        match (request.method, rest.as_slice()) {
            (Method::Get, ["config"]) => match serde_json::to_value(&state.config) {
                Ok(data) => Self::success(data),
                Err(_) => Self::rejection("config serialization failed"),
            },

            (Method::Get, ["views"]) => match serde_json::to_value(&state.views) {
                Ok(data) => Self::success(data),
                Err(_) => Self::rejection("view serialization failed"),
            },
            (Method::Post, ["views"]) => match Self::body_as::<ViewDefinition>(request) {
                Ok(view) => {
                    state.views.push(view.clone());
                    Self::reply_with(&view)
                }
                Err(message) => Self::rejection(&message),
            },
            (Method::Get, ["views", id]) => {
                let id = ViewId::from_string(*id);
                match state.views.iter().find(|v| v.id == id) {
                    Some(view) => Self::reply_with(view),
                    None => Self::rejection("view not found"),
                }
            }
            (Method::Put, ["views", id]) => {
                let id = ViewId::from_string(*id);
                match Self::body_as::<ViewDefinition>(request) {
                    Ok(view) => match state.views.iter_mut().find(|v| v.id == id) {
                        Some(slot) => {
                            *slot = view.clone();
                            Self::reply_with(&view)
                        }
                        None => Self::rejection("view not found"),
                    },
                    Err(message) => Self::rejection(&message),
                }
            }
            (Method::Patch, ["views", id]) => {
                let id = ViewId::from_string(*id);
                match state.views.iter_mut().find(|v| v.id == id) {
                    Some(slot) => match Self::merge_into(slot, request) {
                        Ok(view) => {
                            *slot = view.clone();
                            Self::reply_with(&view)
                        }
                        Err(message) => Self::rejection(&message),
                    },
                    None => Self::rejection("view not found"),
                }
            }
            (Method::Delete, ["views", id]) => {
                let id = ViewId::from_string(*id);
                let before = state.views.len();
                state.views.retain(|v| v.id != id);
                if state.views.len() < before {
                    Self::success(JsonValue::Null)
                } else {
                    Self::rejection("view not found")
                }
            }
            (Method::Post, ["views", id, "duplicate"]) => {
                let id = ViewId::from_string(*id);
                match state.views.iter().find(|v| v.id == id) {
                    Some(view) => {
                        let copy = view.duplicate();
                        state.views.push(copy.clone());
                        Self::reply_with(&copy)
                    }
                    None => Self::rejection("view not found"),
                }
            }

            (Method::Get, ["properties"]) => match serde_json::to_value(&state.properties) {
                Ok(data) => Self::success(data),
                Err(_) => Self::rejection("property serialization failed"),
            },
            (Method::Post, ["properties"]) => match Self::body_as::<Property>(request) {
                Ok(property) => {
                    state.properties.push(property.clone());
                    Self::reply_with(&property)
                }
                Err(message) => Self::rejection(&message),
            },
            (Method::Put, ["properties", id]) => {
                let id = PropertyId::from_string(*id);
                match Self::body_as::<Property>(request) {
                    Ok(property) => {
                        match state.properties.iter_mut().find(|p| p.id == id) {
                            Some(slot) => {
                                *slot = property.clone();
                                Self::reply_with(&property)
                            }
                            None => Self::rejection("property not found"),
                        }
                    }
                    Err(message) => Self::rejection(&message),
                }
            }
            (Method::Patch, ["properties", id]) => {
                let id = PropertyId::from_string(*id);
                match state.properties.iter_mut().find(|p| p.id == id) {
                    Some(slot) => match Self::merge_into(slot, request) {
                        Ok(property) => {
                            *slot = property.clone();
                            Self::reply_with(&property)
                        }
                        Err(message) => Self::rejection(&message),
                    },
                    None => Self::rejection("property not found"),
                }
            }
            (Method::Delete, ["properties", id]) => {
                let id = PropertyId::from_string(*id);
                let before = state.properties.len();
                state.properties.retain(|p| p.id != id);
                if state.properties.len() < before {
                    Self::success(JsonValue::Null)
                } else {
                    Self::rejection("property not found")
                }
            }
            (Method::Patch, ["properties", id, "freeze"]) => {
                let id = PropertyId::from_string(*id);
                match state.properties.iter_mut().find(|p| p.id == id) {
                    Some(property) => {
                        let body = request.body.clone().unwrap_or(JsonValue::Null);
                        property.frozen = body
                            .get("frozen")
                            .and_then(JsonValue::as_bool)
                            .unwrap_or(property.frozen);
                        match body.get("protection") {
                            Some(JsonValue::Null) | None => property.protection = None,
                            Some(raw) => match serde_json::from_value(raw.clone()) {
                                Ok(protection) => property.protection = Some(protection),
                                Err(_) => return Self::rejection("malformed protection"),
                            },
                        }
                        Self::reply_with(property)
                    }
                    None => Self::rejection("property not found"),
                }
            }
            (Method::Patch, ["properties", id, "hide"]) => {
                let id = PropertyId::from_string(*id);
                match state.properties.iter_mut().find(|p| p.id == id) {
                    Some(property) => {
                        if let Some(visible) =
                            request.body.as_ref().and_then(|b| b.get("visible")).and_then(JsonValue::as_bool)
                        {
                            property.visible = visible;
                        }
                        Self::reply_with(property)
                    }
                    None => Self::rejection("property not found"),
                }
            }
            (Method::Patch, ["properties", id, "type"]) => {
                let id = PropertyId::from_string(*id);
                let parsed: Option<PropertyType> = request
                    .body
                    .as_ref()
                    .and_then(|b| b.get("type"))
                    .and_then(|t| serde_json::from_value(t.clone()).ok());
                match (state.properties.iter_mut().find(|p| p.id == id), parsed) {
                    (Some(property), Some(type_)) => {
                        property.type_ = type_;
                        Self::reply_with(property)
                    }
                    (None, _) => Self::rejection("property not found"),
                    (_, None) => Self::rejection("malformed type"),
                }
            }
            (Method::Patch, ["properties", id, "name"]) => {
                let id = PropertyId::from_string(*id);
                let name = request
                    .body
                    .as_ref()
                    .and_then(|b| b.get("name"))
                    .and_then(JsonValue::as_str)
                    .map(str::to_string);
                match (state.properties.iter_mut().find(|p| p.id == id), name) {
                    (Some(property), Some(name)) => {
                        property.name = name;
                        Self::reply_with(property)
                    }
                    (None, _) => Self::rejection("property not found"),
                    (_, None) => Self::rejection("malformed name"),
                }
            }
            (Method::Post, ["properties", id, "duplicate"]) => {
                let id = PropertyId::from_string(*id);
                match state.properties.iter().find(|p| p.id == id).cloned() {
                    Some(source) => {
                        let mut copy = source;
                        copy.id = PropertyId::new();
                        copy.name = format!("{} (copy)", copy.name);
                        state.properties.push(copy.clone());
                        Self::reply_with(&copy)
                    }
                    None => Self::rejection("property not found"),
                }
            }
            (Method::Post, ["properties", id, "insert"]) => {
                let id = PropertyId::from_string(*id);
                let to_right = request
                    .body
                    .as_ref()
                    .and_then(|b| b.get("position"))
                    .and_then(JsonValue::as_str)
                    == Some("right");
                match state.properties.iter().position(|p| p.id == id) {
                    Some(index) => {
                        let minted = Property::new("Untitled", PropertyType::Text);
                        let at = if to_right { index + 1 } else { index };
                        state.properties.insert(at, minted.clone());
                        Self::reply_with(&minted)
                    }
                    None => Self::rejection("property not found"),
                }
            }

            (Method::Get, ["records"]) => match serde_json::to_value(&state.records) {
                Ok(data) => Self::success(data),
                Err(_) => Self::rejection("record serialization failed"),
            },
            (Method::Post, ["records"]) => match Self::body_as::<Record>(request) {
                Ok(record) => {
                    state.records.push(record.clone());
                    Self::reply_with(&record)
                }
                Err(message) => Self::rejection(&message),
            },
            (Method::Patch, ["records", "bulk"]) => {
                let body = request.body.clone().unwrap_or(JsonValue::Null);
                let ids: Vec<RecordId> = body
                    .get("ids")
                    .and_then(|v| serde_json::from_value(v.clone()).ok())
                    .unwrap_or_default();
                let patch = body.get("patch").cloned().unwrap_or(JsonValue::Null);
                let mut touched = Vec::new();
                for record in state.records.iter_mut().filter(|r| ids.contains(&r.id)) {
                    if let Err(message) = Self::apply_record_patch(record, &patch) {
                        return Self::rejection(&message);
                    }
                    touched.push(record.clone());
                }
                match serde_json::to_value(&touched) {
                    Ok(data) => Self::success(data),
                    Err(_) => Self::rejection("record serialization failed"),
                }
            }
            (Method::Delete, ["records", "bulk"]) => {
                let ids: Vec<RecordId> = request
                    .body
                    .as_ref()
                    .and_then(|b| b.get("ids"))
                    .and_then(|v| serde_json::from_value(v.clone()).ok())
                    .unwrap_or_default();
                state.records.retain(|r| !ids.contains(&r.id));
                Self::success(JsonValue::Null)
            }
            (Method::Get, ["records", id]) => {
                let id = RecordId::from_string(*id);
                match state.records.iter().find(|r| r.id == id) {
                    Some(record) => Self::reply_with(record),
                    None => Self::rejection("record not found"),
                }
            }
            (Method::Put, ["records", id]) => {
                let id = RecordId::from_string(*id);
                match Self::body_as::<Record>(request) {
                    Ok(record) => match state.records.iter_mut().find(|r| r.id == id) {
                        Some(slot) => {
                            *slot = record.clone();
                            Self::reply_with(&record)
                        }
                        None => Self::rejection("record not found"),
                    },
                    Err(message) => Self::rejection(&message),
                }
            }
            (Method::Patch, ["records", id]) => {
                let id = RecordId::from_string(*id);
                let patch = request.body.clone().unwrap_or(JsonValue::Null);
                match state.records.iter_mut().find(|r| r.id == id) {
                    Some(record) => {
                        if let Err(message) = Self::apply_record_patch(record, &patch) {
                            return Self::rejection(&message);
                        }
                        Self::reply_with(record)
                    }
                    None => Self::rejection("record not found"),
                }
            }
            (Method::Delete, ["records", id]) => {
                let id = RecordId::from_string(*id);
                let before = state.records.len();
                state.records.retain(|r| r.id != id);
                if state.records.len() < before {
                    Self::success(JsonValue::Null)
                } else {
                    Self::rejection("record not found")
                }
            }

            _ => Self::rejection("unsupported path"),
        }
    }

    fn body_as<T: serde::de::DeserializeOwned>(request: &ApiRequest) -> std::result::Result<T, String> {
        let body = request.body.clone().ok_or_else(|| "missing body".to_string())?;
        serde_json::from_value(body).map_err(|e| format!("malformed body: {e}"))
    }

    fn reply_with<T: serde::Serialize>(value: &T) -> JsonValue {
        match serde_json::to_value(value) {
            Ok(data) => Self::success(data),
            Err(_) => Self::rejection("serialization failed"),
        }
    }

    /// Shallow-merge a PATCH body over a stored entity.
    fn merge_into<T>(current: &T, request: &ApiRequest) -> std::result::Result<T, String>
    where
        T: serde::Serialize + serde::de::DeserializeOwned,
    {
        let mut raw = serde_json::to_value(current).map_err(|e| e.to_string())?;
        if let (JsonValue::Object(target), Some(JsonValue::Object(patch))) =
            (&mut raw, request.body.as_ref())
        {
            for (key, value) in patch {
                target.insert(key.clone(), value.clone());
            }
        }
        serde_json::from_value(raw).map_err(|e| format!("malformed patch: {e}"))
    }

    fn apply_record_patch(record: &mut Record, patch: &JsonValue) -> std::result::Result<(), String> {
        let Some(JsonValue::Object(properties)) = patch.get("properties") else {
            return Err("patch must carry a properties object".to_string());
        };
        for (key, raw) in properties {
            let value = serde_json::from_value(raw.clone())
                .map_err(|e| format!("malformed value under '{key}': {e}"))?;
            record.set_value(PropertyId::from_string(key.as_str()), value);
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl Transport for InMemoryStore {
    async fn send(&self, request: ApiRequest) -> Result<JsonValue> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(request.clone());
        if let Some(failure) = self.lock_failure().take() {
            return match failure {
                InjectedFailure::Transport(message) => Err(EngineError::transport(message)),
                InjectedFailure::Store(message) => Ok(Self::rejection(&message)),
            };
        }
        Ok(self.route(&request))
    }
}
