//! Schema model and property-type system
//!
//! `slate-schema` is a standalone, model-only crate: properties, saved
//! views, records, the per-type behavior registry, and the protection
//! guard. It knows nothing about books, calendars, or any concrete module
//! and never talks to a store; consumers layer projection and transport on
//! top.
//!
//! # Architecture
//!
//! - **Closed type system**: `PropertyType` and `PropertyValue` are closed
//!   enums; behavior dispatches by match, not runtime inspection
//! - **Duck-typed edges**: raw values and filter-rule values are JSON until
//!   the registry coerces them
//! - **Tolerant rendering, strict mutation**: structural changes validate
//!   up front; stale view rules and orphaned record values degrade at
//!   render time instead of failing
//! - **Protection before transport**: the guard answers locally, so a
//!   denied operation never costs a network round-trip

pub mod error;
pub mod guard;
pub mod ids;
pub mod property;
pub mod record;
pub mod registry;
pub mod schema;
pub mod value;
pub mod view;

pub use error::{Result, SchemaError};
pub use guard::{FrozenPropertyGuard, PropertyAction};
pub use ids::{OptionId, PropertyId, RecordId, SchemaId, ViewId};
pub use property::{
    FormulaConfig, Property, PropertyType, Protection, RelationConfig, SelectOption,
};
pub use record::Record;
pub use registry::{FilterOperator, PropertyTypeRegistry};
pub use schema::Schema;
pub use value::PropertyValue;
pub use view::{FilterRule, SortDirection, SortRule, ViewDefinition, ViewType};
