use crate::model::id::{BoardId, ColumnId, EntityKind};
use crate::store::StoreError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type EngineResult<T> = Result<T, EngineError>;

/// Errors from consistency engine commands.
///
/// A command that returns an error has not mutated the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// Create with an id already present.
    DuplicateId { kind: EntityKind, id: String },
    /// Update/remove/move referencing an absent entity.
    NotFound { kind: EntityKind, id: String },
    /// Create/move referencing an absent parent.
    DanglingReference {
        kind: EntityKind,
        id: String,
        target_kind: EntityKind,
        target_id: String,
    },
    /// Task create naming a board other than its column's board.
    BoardMismatch {
        column_id: ColumnId,
        column_board: BoardId,
        requested_board: BoardId,
    },
    /// Move target index past the end under the strict index policy.
    InvalidIndex { index: usize, len: usize },
    /// Column removal refused because the column still holds tasks.
    ColumnNotEmpty {
        column_id: ColumnId,
        task_count: usize,
    },
    /// Order array argument that is not a permutation of the current order.
    OrderMismatch { kind: EntityKind, id: String },
}

impl Display for EngineError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DuplicateId { kind, id } => write!(f, "{kind} id already exists: {id}"),
            Self::NotFound { kind, id } => write!(f, "{kind} not found: {id}"),
            Self::DanglingReference {
                kind,
                id,
                target_kind,
                target_id,
            } => write!(
                f,
                "{kind} {id} references missing {target_kind} {target_id}"
            ),
            Self::BoardMismatch {
                column_id,
                column_board,
                requested_board,
            } => write!(
                f,
                "column {column_id} belongs to board {column_board}, not {requested_board}"
            ),
            Self::InvalidIndex { index, len } => {
                write!(f, "target index {index} out of range (0-{len})")
            }
            Self::ColumnNotEmpty {
                column_id,
                task_count,
            } => write!(f, "column {column_id} still holds {task_count} task(s)"),
            Self::OrderMismatch { kind, id } => {
                write!(f, "order array for {kind} {id} must reorder existing children only")
            }
        }
    }
}

impl Error for EngineError {}

impl From<StoreError> for EngineError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::DuplicateId { kind, id } => Self::DuplicateId { kind, id },
            StoreError::NotFound { kind, id } => Self::NotFound { kind, id },
        }
    }
}

impl EngineError {
    /// Stable snake_case code for log events and FFI envelopes.
    pub fn code(&self) -> &'static str {
        match self {
            Self::DuplicateId { .. } => "duplicate_id",
            Self::NotFound { .. } => "not_found",
            Self::DanglingReference { .. } => "dangling_reference",
            Self::BoardMismatch { .. } => "board_mismatch",
            Self::InvalidIndex { .. } => "invalid_index",
            Self::ColumnNotEmpty { .. } => "column_not_empty",
            Self::OrderMismatch { .. } => "order_mismatch",
        }
    }

    pub(crate) fn not_found(kind: EntityKind, id: impl Display) -> Self {
        Self::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    pub(crate) fn dangling(
        kind: EntityKind,
        id: impl Display,
        target_kind: EntityKind,
        target_id: impl Display,
    ) -> Self {
        Self::DanglingReference {
            kind,
            id: id.to_string(),
            target_kind,
            target_id: target_id.to_string(),
        }
    }
}
