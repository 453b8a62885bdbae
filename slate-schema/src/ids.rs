//! String-backed id newtypes for schema entities.
//!
//! Ids minted locally are ULIDs; ids issued by a module's backing store are
//! accepted verbatim via `from_string`. The newtypes are serde-transparent so
//! they serialize as plain strings on the wire.

use serde::{Deserialize, Serialize};
use ulid::Ulid;

macro_rules! string_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Mint a new ULID-backed id.
            pub fn new() -> Self {
                Self(Ulid::new().to_string())
            }

            /// Wrap an existing id (e.g. one issued by the backing store).
            pub fn from_string(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// The id as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }
    };
}

string_id!(
    /// Identifies a schema (one per module database).
    SchemaId
);
string_id!(
    /// Identifies a property within a schema.
    PropertyId
);
string_id!(
    /// Identifies a saved view of a schema.
    ViewId
);
string_id!(
    /// Identifies a record (row).
    RecordId
);
string_id!(
    /// Identifies a select/multi-select option.
    OptionId
);
