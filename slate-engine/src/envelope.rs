//! Response envelope decoding.
//!
//! Every store response wraps its payload as
//! `{success, message, data, timestamp}`; declared failures carry
//! `{success: false, error: {message, code?, errors?}}` instead of data.
//! Anything that does not fit the envelope at all is a protocol error, not
//! a store error; the two are surfaced differently.

use std::collections::HashMap;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value as JsonValue;

use crate::error::{EngineError, Result};

#[derive(Debug, Deserialize)]
struct StoreFailure {
    message: String,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    errors: HashMap<String, Vec<String>>,
}

/// Decode a raw response body into the payload type.
///
/// On `success: false` the declared failure becomes
/// [`EngineError::Store`]; a body without a boolean `success`, or whose
/// `data` does not match `T`, is [`EngineError::Protocol`].
pub fn decode<T: DeserializeOwned>(raw: JsonValue) -> Result<T> {
    let Some(success) = raw.get("success").and_then(JsonValue::as_bool) else {
        return Err(EngineError::protocol(
            "response envelope missing boolean 'success'",
        ));
    };
    if success {
        let data = raw.get("data").cloned().unwrap_or(JsonValue::Null);
        return serde_json::from_value(data).map_err(|e| {
            EngineError::protocol(format!("envelope data did not match the expected shape: {e}"))
        });
    }
    match raw.get("error") {
        Some(error) => {
            let failure: StoreFailure = serde_json::from_value(error.clone()).map_err(|e| {
                EngineError::protocol(format!("failure envelope missing error detail: {e}"))
            })?;
            Err(EngineError::Store {
                message: failure.message,
                code: failure.code,
                field_errors: failure.errors,
            })
        }
        None => {
            let message = raw
                .get("message")
                .and_then(JsonValue::as_str)
                .unwrap_or("store reported failure without detail");
            Err(EngineError::store(message, None))
        }
    }
}
