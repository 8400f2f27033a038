//! Command vocabulary accepted by the consistency engine.

use crate::model::board::BoardPatch;
use crate::model::column::ColumnPatch;
use crate::model::id::{BoardId, ColumnId, TaskId};
use crate::model::task::{Subtask, TaskPatch};

/// Board creation draft. `column_ids` must be empty; columns join a board
/// through `column_added`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewBoard {
    pub id: Option<BoardId>,
    pub title: String,
    pub column_ids: Vec<ColumnId>,
}

impl NewBoard {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn with_id(mut self, id: BoardId) -> Self {
        self.id = Some(id);
        self
    }
}

/// Column creation draft. `task_ids` must be empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewColumn {
    pub id: Option<ColumnId>,
    pub title: String,
    pub board_id: BoardId,
    pub task_ids: Vec<TaskId>,
}

impl NewColumn {
    pub fn new(title: impl Into<String>, board_id: BoardId) -> Self {
        Self {
            id: None,
            title: title.into(),
            board_id,
            task_ids: Vec::new(),
        }
    }

    pub fn with_id(mut self, id: ColumnId) -> Self {
        self.id = Some(id);
        self
    }
}

/// Task creation draft.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTask {
    pub id: Option<TaskId>,
    pub title: String,
    pub description: String,
    pub subtasks: Vec<Subtask>,
    pub column: ColumnId,
    pub board: BoardId,
}

impl NewTask {
    pub fn new(title: impl Into<String>, column: ColumnId, board: BoardId) -> Self {
        Self {
            id: None,
            title: title.into(),
            description: String::new(),
            subtasks: Vec::new(),
            column,
            board,
        }
    }

    pub fn with_id(mut self, id: TaskId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_subtasks(mut self, subtasks: Vec<Subtask>) -> Self {
        self.subtasks = subtasks;
        self
    }
}

/// One state transition. Applied strictly in issue order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    BoardAdded(NewBoard),
    BoardUpdated { id: BoardId, patch: BoardPatch },
    BoardRemoved(BoardId),
    BoardsRemoved(Vec<BoardId>),
    ColumnAdded(NewColumn),
    ColumnUpdated { id: ColumnId, patch: ColumnPatch },
    ColumnsRemoved(Vec<ColumnId>),
    TaskAdded(NewTask),
    TaskUpdated { id: TaskId, patch: TaskPatch },
    TaskRemoved(TaskId),
    TasksRemoved(Vec<TaskId>),
    TaskMoved {
        task_id: TaskId,
        new_column_id: ColumnId,
        index: usize,
    },
}

impl Command {
    /// Event name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::BoardAdded(_) => "board_added",
            Self::BoardUpdated { .. } => "board_updated",
            Self::BoardRemoved(_) => "board_removed",
            Self::BoardsRemoved(_) => "boards_removed",
            Self::ColumnAdded(_) => "column_added",
            Self::ColumnUpdated { .. } => "column_updated",
            Self::ColumnsRemoved(_) => "columns_removed",
            Self::TaskAdded(_) => "task_added",
            Self::TaskUpdated { .. } => "task_updated",
            Self::TaskRemoved(_) => "task_removed",
            Self::TasksRemoved(_) => "tasks_removed",
            Self::TaskMoved { .. } => "task_moved",
        }
    }
}

/// Ids deleted by one command, cascades included.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Removal {
    pub boards: Vec<BoardId>,
    pub columns: Vec<ColumnId>,
    pub tasks: Vec<TaskId>,
}

impl Removal {
    pub fn is_empty(&self) -> bool {
        self.boards.is_empty() && self.columns.is_empty() && self.tasks.is_empty()
    }
}

/// Result of a successfully applied command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    BoardCreated(BoardId),
    ColumnCreated(ColumnId),
    TaskCreated(TaskId),
    Removed(Removal),
    Updated,
    /// Valid command with no observable effect.
    Unchanged,
}
