//! Authorization for operations touching protected properties.
//!
//! The guard runs before a mutation reaches the registry or the transport;
//! a denial never leaves the local process. Frozen alone means "flagged",
//! not locked: the per-operation permissions opt out individually.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, SchemaError};
use crate::property::Property;
use crate::schema::Schema;

/// An operation the guard authorizes against a property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyAction {
    Edit,
    Hide,
    Delete,
}

impl PropertyAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Edit => "edit",
            Self::Hide => "hide",
            Self::Delete => "delete",
        }
    }
}

impl std::fmt::Display for PropertyAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Evaluates protection flags. Stateless; construct once and share.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrozenPropertyGuard;

impl FrozenPropertyGuard {
    pub fn new() -> Self {
        Self
    }

    /// Authorize an action on a property. Unfrozen properties always pass.
    /// A denial carries the configured reason when one is set and mutates
    /// nothing.
    pub fn authorize(&self, action: PropertyAction, property: &Property) -> Result<()> {
        if !property.frozen {
            return Ok(());
        }
        let flags = property.protection_flags();
        let allowed = match action {
            PropertyAction::Edit => flags.allow_edit,
            PropertyAction::Hide => flags.allow_hide,
            PropertyAction::Delete => flags.allow_delete,
        };
        if allowed {
            return Ok(());
        }
        debug!(property = %property.id, %action, "denied by protection flags");
        let reason = flags
            .reason
            .unwrap_or_else(|| format!("property '{}' is protected from {action}", property.name));
        Err(SchemaError::permission(property.name.clone(), reason))
    }

    /// Authorize a structural mutation (add/remove/convert a property, add/
    /// remove a view) against schema-level freeze.
    pub fn authorize_structural(&self, schema: &Schema) -> Result<()> {
        if schema.frozen {
            debug!(schema = %schema.id, "structural mutation denied, schema is frozen");
            return Err(SchemaError::permission(
                schema.name.clone(),
                "schema is frozen",
            ));
        }
        Ok(())
    }
}
