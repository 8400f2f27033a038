//! Normalized Kanban domain model.
//!
//! # Responsibility
//! - Define the board/column/task records held by the entity store.
//! - Define partial patches accepted by update commands.
//!
//! # Invariants
//! - Parents own child order (`Board::column_ids`, `Column::task_ids`).
//! - Children hold lookup-only back-references (`Column::board_id`,
//!   `Task::column`, `Task::board`).

pub mod board;
pub mod column;
pub mod id;
pub mod task;

use std::fmt::{Debug, Display};
use std::hash::Hash;

pub use id::EntityKind;

/// Record stored in one keyed entity collection.
pub trait Entity: Clone + Debug {
    type Id: Clone + Eq + Hash + Debug + Display;
    type Patch;

    const KIND: EntityKind;

    fn id(&self) -> &Self::Id;

    /// Merges set fields of `patch` into this record.
    fn merge(&mut self, patch: Self::Patch);
}
