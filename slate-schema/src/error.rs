//! Error types for schema and property-type operations

use thiserror::Error;

use crate::property::PropertyType;

/// Result type for schema operations
pub type Result<T> = std::result::Result<T, SchemaError>;

/// Errors that can occur while validating or mutating schema state.
///
/// Validation and permission failures are raised before any mutation is
/// dispatched to a backing store; none of these variants implies partial
/// state.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// Malformed property name, value, or definition
    #[error("validation failed for {field}: {message}")]
    Validation { field: String, message: String },

    /// A frozen/protected property or schema denied the operation
    #[error("operation not permitted on '{property}': {reason}")]
    Permission { property: String, reason: String },

    /// Disallowed property type change
    #[error("cannot convert property type {from} to {to}")]
    TypeConversion {
        from: PropertyType,
        to: PropertyType,
    },

    /// Referenced schema/property/view/record is absent
    #[error("{resource} not found: {id}")]
    NotFound { resource: String, id: String },

    /// Operation is meaningless for the property type (e.g. writing a formula)
    #[error("unsupported operation: {message}")]
    UnsupportedOperation { message: String },
}

impl SchemaError {
    /// Create a validation error
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a permission error
    pub fn permission(property: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Permission {
            property: property.into(),
            reason: reason.into(),
        }
    }

    /// Create a not-found error
    pub fn not_found(resource: impl Into<String>, id: impl std::fmt::Display) -> Self {
        Self::NotFound {
            resource: resource.into(),
            id: id.to_string(),
        }
    }

    /// Create an unsupported-operation error
    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::UnsupportedOperation {
            message: message.into(),
        }
    }
}
