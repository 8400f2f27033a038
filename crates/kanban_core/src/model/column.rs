use crate::model::id::{BoardId, ColumnId, TaskId};
use crate::model::{Entity, EntityKind};
use serde::{Deserialize, Serialize};

/// Ordered bucket of tasks, typically one workflow stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    pub id: ColumnId,
    pub title: String,
    pub board_id: BoardId,
    pub task_ids: Vec<TaskId>,
}

impl Column {
    pub fn new(id: ColumnId, title: impl Into<String>, board_id: BoardId) -> Self {
        Self {
            id,
            title: title.into(),
            board_id,
            task_ids: Vec::new(),
        }
    }

    /// Position of `task_id` in this column's order.
    pub fn position_of(&self, task_id: &TaskId) -> Option<usize> {
        self.task_ids.iter().position(|id| id == task_id)
    }
}

/// Partial column update. `task_ids` may only reorder existing tasks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnPatch {
    pub title: Option<String>,
    pub task_ids: Option<Vec<TaskId>>,
}

impl ColumnPatch {
    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Self::default()
        }
    }
}

impl Entity for Column {
    type Id = ColumnId;
    type Patch = ColumnPatch;

    const KIND: EntityKind = EntityKind::Column;

    fn id(&self) -> &ColumnId {
        &self.id
    }

    fn merge(&mut self, patch: ColumnPatch) {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(task_ids) = patch.task_ids {
            self.task_ids = task_ids;
        }
    }
}
