//! Core state model for the Kanban client.
//! This crate is the single source of truth for board, column and task
//! consistency rules.

pub mod client;
pub mod config;
pub mod drag;
pub mod engine;
pub mod logging;
pub mod model;
pub mod projection;
pub mod snapshot;
pub mod store;
pub mod sync;

pub use client::{ClientError, ClientResult, KanbanClient};
pub use config::{
    ColumnDeleteMode, ConfigError, EngineConfig, KanbanConfig, LoggingConfig, MoveIndexPolicy,
    SyncConfig,
};
pub use drag::{DragSession, DragTracker, DropTarget};
pub use engine::{
    Command, CommandOutcome, EngineError, EngineResult, KanbanEngine, NewBoard, NewColumn,
    NewTask, Removal,
};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::board::{Board, BoardPatch};
pub use model::column::{Column, ColumnPatch};
pub use model::id::{BoardId, ColumnId, EntityKind, TaskId};
pub use model::task::{Subtask, Task, TaskPatch};
pub use projection::ActiveBoardProjection;
pub use snapshot::{BoardsSnapshot, LoadSummary, SnapshotError};
pub use store::{EntityCollection, EntityStore, StoreError, StoreRevision};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
