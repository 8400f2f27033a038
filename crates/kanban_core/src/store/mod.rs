//! Normalized entity store.
//!
//! # Responsibility
//! - Hold boards, columns and tasks in three independent keyed collections.
//! - Preserve insertion order for enumeration.
//!
//! # Invariants
//! - Collections never reach into each other; cross-entity consistency is the
//!   engine's job.
//! - Every successful mutation bumps the owning collection's revision.

mod collection;

use crate::model::board::Board;
use crate::model::column::Column;
use crate::model::id::EntityKind;
use crate::model::task::Task;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub use collection::EntityCollection;

pub type StoreResult<T> = Result<T, StoreError>;

/// Errors from single-collection CRUD operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// An entity with the same id is already present.
    DuplicateId { kind: EntityKind, id: String },
    /// No entity with the id is present.
    NotFound { kind: EntityKind, id: String },
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DuplicateId { kind, id } => write!(f, "{kind} id already exists: {id}"),
            Self::NotFound { kind, id } => write!(f, "{kind} not found: {id}"),
        }
    }
}

impl Error for StoreError {}

/// Revision triple identifying one observable store state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct StoreRevision {
    pub boards: u64,
    pub columns: u64,
    pub tasks: u64,
}

/// The three entity collections.
#[derive(Debug, Clone, Default)]
pub struct EntityStore {
    pub boards: EntityCollection<Board>,
    pub columns: EntityCollection<Column>,
    pub tasks: EntityCollection<Task>,
}

impl EntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn revision(&self) -> StoreRevision {
        StoreRevision {
            boards: self.boards.revision(),
            columns: self.columns.revision(),
            tasks: self.tasks.revision(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.boards.is_empty() && self.columns.is_empty() && self.tasks.is_empty()
    }
}
