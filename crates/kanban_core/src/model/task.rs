use crate::model::id::{BoardId, ColumnId, TaskId};
use crate::model::{Entity, EntityKind};
use serde::{Deserialize, Serialize};

/// Checkable step inside a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subtask {
    pub title: String,
    #[serde(default)]
    pub completed: bool,
}

impl Subtask {
    pub fn open(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            completed: false,
        }
    }
}

/// Unit of work. `column` is the single source of truth for membership.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    pub description: String,
    pub subtasks: Vec<Subtask>,
    pub column: ColumnId,
    pub board: BoardId,
}

impl Task {
    /// Returns `(completed, total)` subtask counts for card rendering.
    pub fn subtask_progress(&self) -> (usize, usize) {
        let completed = self.subtasks.iter().filter(|s| s.completed).count();
        (completed, self.subtasks.len())
    }
}

/// Partial task update.
///
/// Setting `column` to a different column moves the task to the top of that
/// column; placement at an arbitrary index goes through `task_moved`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub subtasks: Option<Vec<Subtask>>,
    pub column: Option<ColumnId>,
}

impl TaskPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.subtasks.is_none()
            && self.column.is_none()
    }
}

impl Entity for Task {
    type Id = TaskId;
    type Patch = TaskPatch;

    const KIND: EntityKind = EntityKind::Task;

    fn id(&self) -> &TaskId {
        &self.id
    }

    fn merge(&mut self, patch: TaskPatch) {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(subtasks) = patch.subtasks {
            self.subtasks = subtasks;
        }
        if let Some(column) = patch.column {
            self.column = column;
        }
    }
}
