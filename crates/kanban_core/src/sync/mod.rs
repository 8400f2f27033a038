//! Remote sync shim.
//!
//! # Responsibility
//! - Describe server mutations that mirror committed local changes.
//! - Deliver them in the background with retry and cancellation.
//!
//! # Invariants
//! - The server is an eventually-consistent mirror; remote failures are
//!   reported, never reconciled into local state.
//!
//! # See also
//! - `client::KanbanClient` for the commit-then-enqueue flows.

pub mod queue;
pub mod remote;

pub use queue::{QueueClosed, SyncNotice, SyncQueue, SyncTicket};
pub use remote::{
    ColumnBody, EntityKey, RemoteBackend, RemoteCall, RemoteError, TaskBody, TaskPatchBody,
};
