//! View evaluation engines
//!
//! `slate-views` turns a schema, a saved view, and a record snapshot into
//! what a table or board actually renders: visible columns, matching rows
//! in order, and optional group buckets. Everything here is pure and
//! synchronous; nothing talks to a store or caches across calls.
//!
//! # Architecture
//!
//! - **Pipeline order**: visibility narrows columns, filters narrow rows,
//!   sort orders rows, group-by buckets them
//! - **Fail open on drift**: stale rules left behind by deleted properties
//!   or type changes pass records instead of blanking views
//! - **Stable everywhere**: sorting and column ordering preserve input
//!   order on ties, so projections never jitter

pub mod filter;
pub mod group;
pub mod projection;
pub mod sort;
pub mod visibility;

pub use filter::FilterEngine;
pub use group::{GroupEngine, RecordGroup};
pub use projection::{Projection, ViewProjection};
pub use sort::SortEngine;
pub use visibility::VisibilityResolver;
