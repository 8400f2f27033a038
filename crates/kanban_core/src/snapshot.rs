//! Bulk import of server board snapshots.
//!
//! # Responsibility
//! - Parse the nested `boards -> columns -> tasks` JSON document.
//! - Replay it through ordinary engine commands.
//!
//! # Invariants
//! - A load is all-or-nothing: a failing command leaves the target engine
//!   unchanged.
//! - Nesting decides membership; a task's `status` text is informational.

use crate::engine::{EngineError, KanbanEngine, NewBoard, NewColumn, NewTask};
use crate::model::id::{BoardId, ColumnId, TaskId};
use crate::model::task::Subtask;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;

/// Server document listing a user's boards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardsSnapshot {
    #[serde(default)]
    pub boards: Vec<SnapshotBoard>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotBoard {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub columns: Vec<SnapshotColumn>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotColumn {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub tasks: Vec<SnapshotTask>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotTask {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub subtasks: Vec<Subtask>,
}

/// Counts and ids of what a load inserted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadSummary {
    pub boards: Vec<BoardId>,
    pub columns: Vec<ColumnId>,
    pub tasks: Vec<TaskId>,
}

#[derive(Debug)]
pub enum SnapshotError {
    Io(std::io::Error),
    Parse(serde_json::Error),
    /// A replayed command was rejected; nothing was loaded.
    Engine(EngineError),
}

impl Display for SnapshotError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "snapshot read failed: {err}"),
            Self::Parse(err) => write!(f, "snapshot parse failed: {err}"),
            Self::Engine(err) => write!(f, "snapshot rejected: {err}"),
        }
    }
}

impl Error for SnapshotError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Parse(err) => Some(err),
            Self::Engine(err) => Some(err),
        }
    }
}

impl From<serde_json::Error> for SnapshotError {
    fn from(value: serde_json::Error) -> Self {
        Self::Parse(value)
    }
}

impl From<EngineError> for SnapshotError {
    fn from(value: EngineError) -> Self {
        Self::Engine(value)
    }
}

impl BoardsSnapshot {
    pub fn from_json(text: &str) -> Result<Self, SnapshotError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn read(path: impl AsRef<Path>) -> Result<Self, SnapshotError> {
        let text = std::fs::read_to_string(path).map_err(SnapshotError::Io)?;
        Self::from_json(&text)
    }

    pub fn column_count(&self) -> usize {
        self.boards.iter().map(|board| board.columns.len()).sum()
    }

    pub fn task_count(&self) -> usize {
        self.boards
            .iter()
            .flat_map(|board| &board.columns)
            .map(|column| column.tasks.len())
            .sum()
    }

    /// Replays the snapshot into `engine`.
    ///
    /// Commands run against a staged clone that replaces `engine` only
    /// after every command succeeded.
    pub fn load_into(&self, engine: &mut KanbanEngine) -> Result<LoadSummary, SnapshotError> {
        let mut staged = engine.clone();
        match self.replay(&mut staged) {
            Ok(summary) => {
                *engine = staged;
                info!(
                    "event=snapshot_load module=snapshot status=ok boards={} columns={} tasks={}",
                    summary.boards.len(),
                    summary.columns.len(),
                    summary.tasks.len()
                );
                Ok(summary)
            }
            Err(err) => {
                warn!(
                    "event=snapshot_load module=snapshot status=error error_code={}",
                    err.code()
                );
                Err(err.into())
            }
        }
    }

    fn replay(&self, engine: &mut KanbanEngine) -> Result<LoadSummary, EngineError> {
        let mut summary = LoadSummary::default();
        for board in &self.boards {
            let board_id = engine
                .board_added(NewBoard::titled(&board.title).with_id(BoardId::new(&board.id)))?;
            for column in &board.columns {
                let column_id = engine.column_added(
                    NewColumn::new(&column.title, board_id.clone())
                        .with_id(ColumnId::new(&column.id)),
                )?;
                for task in &column.tasks {
                    let task_id = engine.task_added(
                        NewTask::new(&task.title, column_id.clone(), board_id.clone())
                            .with_id(TaskId::new(&task.id))
                            .with_description(&task.description)
                            .with_subtasks(task.subtasks.clone()),
                    )?;
                    summary.tasks.push(task_id);
                }
                summary.columns.push(column_id);
            }
            summary.boards.push(board_id);
        }
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::BoardsSnapshot;

    #[test]
    fn parses_server_field_names_with_defaults() {
        let snapshot = BoardsSnapshot::from_json(
            r#"{"boards":[{"_id":"b1","title":"Launch","columns":[
                {"_id":"c1","title":"Todo","tasks":[
                    {"_id":"t1","title":"Logo","status":"Todo",
                     "subtasks":[{"title":"Sketch","completed":true}]}
                ]}
            ]}]}"#,
        )
        .expect("snapshot should parse");

        assert_eq!(snapshot.column_count(), 1);
        assert_eq!(snapshot.task_count(), 1);
        let task = &snapshot.boards[0].columns[0].tasks[0];
        assert_eq!(task.id, "t1");
        assert!(task.description.is_empty());
        assert!(task.subtasks[0].completed);
    }
}
