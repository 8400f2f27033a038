//! Remote call descriptions and the backend seam.

use crate::model::id::EntityKind;
use crate::model::task::{Subtask, Task};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Column body of a board creation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnBody {
    pub title: String,
    #[serde(default)]
    pub tasks: Vec<TaskBody>,
}

/// Task body of a create request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskBody {
    pub title: String,
    pub description: String,
    pub subtasks: Vec<Subtask>,
    /// Title of the column holding the task.
    pub status: String,
}

impl TaskBody {
    /// Builds a create body. A lone blank subtask row is sent as none.
    pub fn for_create(task: &Task, status: impl Into<String>) -> Self {
        let subtasks = match task.subtasks.as_slice() {
            [only] if only.title.trim().is_empty() => Vec::new(),
            other => other.to_vec(),
        };
        Self {
            title: task.title.clone(),
            description: task.description.clone(),
            subtasks,
            status: status.into(),
        }
    }
}

/// Partial task body of an update request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskPatchBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtasks: Option<Vec<Subtask>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

/// One server mutation mirroring a committed local change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum RemoteCall {
    CreateBoard {
        board_id: String,
        title: String,
        columns: Vec<ColumnBody>,
    },
    CreateColumn {
        board_id: String,
        column_id: String,
        title: String,
    },
    DeleteColumn {
        board_id: String,
        column_id: String,
    },
    DeleteBoard {
        board_id: String,
    },
    CreateTask {
        board_id: String,
        task_id: String,
        task: TaskBody,
    },
    DeleteTask {
        board_id: String,
        task_id: String,
    },
    UpdateTask {
        board_id: String,
        task_id: String,
        task: TaskPatchBody,
    },
    MoveTask {
        board_id: String,
        task_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        new_status: Option<String>,
        position: usize,
    },
}

/// Entity touched by a remote call; the unit of cancellation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntityKey {
    pub kind: EntityKind,
    pub id: String,
}

impl EntityKey {
    pub fn new(kind: EntityKind, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
        }
    }
}

impl RemoteCall {
    pub fn op(&self) -> &'static str {
        match self {
            Self::CreateBoard { .. } => "create_board",
            Self::CreateColumn { .. } => "create_column",
            Self::DeleteColumn { .. } => "delete_column",
            Self::DeleteBoard { .. } => "delete_board",
            Self::CreateTask { .. } => "create_task",
            Self::DeleteTask { .. } => "delete_task",
            Self::UpdateTask { .. } => "update_task",
            Self::MoveTask { .. } => "move_task",
        }
    }

    pub fn board_id(&self) -> &str {
        match self {
            Self::CreateBoard { board_id, .. }
            | Self::CreateColumn { board_id, .. }
            | Self::DeleteColumn { board_id, .. }
            | Self::DeleteBoard { board_id }
            | Self::CreateTask { board_id, .. }
            | Self::DeleteTask { board_id, .. }
            | Self::UpdateTask { board_id, .. }
            | Self::MoveTask { board_id, .. } => board_id,
        }
    }

    /// Every entity this call touches, owning board first.
    pub fn touches(&self) -> Vec<EntityKey> {
        let mut keys = vec![EntityKey::new(EntityKind::Board, self.board_id())];
        match self {
            Self::CreateColumn { column_id, .. } | Self::DeleteColumn { column_id, .. } => {
                keys.push(EntityKey::new(EntityKind::Column, column_id.as_str()));
            }
            Self::CreateTask { task_id, .. }
            | Self::DeleteTask { task_id, .. }
            | Self::UpdateTask { task_id, .. }
            | Self::MoveTask { task_id, .. } => {
                keys.push(EntityKey::new(EntityKind::Task, task_id.as_str()));
            }
            Self::CreateBoard { .. } | Self::DeleteBoard { .. } => {}
        }
        keys
    }

    /// Entity brought into existence on the server by this call.
    pub fn created_entity(&self) -> Option<EntityKey> {
        match self {
            Self::CreateBoard { board_id, .. } => {
                Some(EntityKey::new(EntityKind::Board, board_id.as_str()))
            }
            Self::CreateColumn { column_id, .. } => {
                Some(EntityKey::new(EntityKind::Column, column_id.as_str()))
            }
            Self::CreateTask { task_id, .. } => {
                Some(EntityKey::new(EntityKind::Task, task_id.as_str()))
            }
            _ => None,
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Transport failure reported by a backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteError {
    pub message: String,
    /// Whether another attempt may succeed.
    pub retryable: bool,
}

impl RemoteError {
    pub fn transient(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retryable: true,
        }
    }

    pub fn permanent(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retryable: false,
        }
    }
}

impl Display for RemoteError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let kind = if self.retryable {
            "transient"
        } else {
            "permanent"
        };
        write!(f, "{kind} remote failure: {}", self.message)
    }
}

impl Error for RemoteError {}

/// Blocking transport for remote calls.
///
/// Calls run on the blocking pool, one at a time, in enqueue order.
pub trait RemoteBackend: Send + Sync + 'static {
    fn send(&self, call: &RemoteCall) -> Result<(), RemoteError>;
}

impl<F> RemoteBackend for F
where
    F: Fn(&RemoteCall) -> Result<(), RemoteError> + Send + Sync + 'static,
{
    fn send(&self, call: &RemoteCall) -> Result<(), RemoteError> {
        self(call)
    }
}
