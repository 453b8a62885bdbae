//! Module runtime: transport, mutation pipeline, and edit sessions
//!
//! `slate-engine` connects the pure model and view crates to a REST-shaped
//! backing store. It owns the async boundary: a [`ModuleContext`] loads a
//! module's config, schema, and records, evaluates views locally, and runs
//! every mutation through one optimistic-apply/reconcile pipeline.
//! [`RecordEditSession`] drives per-cell editing on top of that pipeline.
//!
//! # Architecture
//!
//! - **One wire shape**: every store exchange is an [`ApiRequest`] sent
//!   through the [`Transport`] trait and decoded from the standard
//!   success/error envelope
//! - **Authorize, apply, dispatch, reconcile**: mutations fail locally
//!   before they cost a round-trip; transport failures roll back exactly
//!   the one optimistic change
//! - **Coarse invalidation**: any successful mutation (and any rollback)
//!   publishes one event for the whole schema; subscribers drop every
//!   derived projection rather than diffing
//! - **Capability-gated queries**: list parameters the store does not
//!   support are never sent; filtering, sorting, and search fall back to
//!   local evaluation

pub mod cache;
pub mod config;
pub mod context;
pub mod envelope;
pub mod error;
pub mod events;
pub mod facade;
pub mod query;
pub mod session;
pub mod transport;

// Test support utilities, enabled via the `test-support` feature.
#[cfg(feature = "test-support")]
pub mod testing;

pub use cache::{CachedProjection, ProjectionCache};
pub use config::{Capabilities, ModuleConfig};
pub use context::ModuleContext;
pub use error::{EngineError, Result};
pub use events::{Invalidation, InvalidationBus};
pub use facade::{InsertPosition, ModuleApiFacade};
pub use query::ListQuery;
pub use session::{CommitOutcome, CommitTrigger, RecordEditSession, SessionState};
pub use transport::{ApiRequest, Method, Transport};

#[cfg(feature = "test-support")]
pub use testing::InMemoryStore;
