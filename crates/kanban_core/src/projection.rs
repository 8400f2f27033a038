//! Memoized read model of the selected board.
//!
//! # Responsibility
//! - Derive the active board's ordered columns and its task lookup.
//! - Recompute only when the store revision or the selection changes.
//!
//! # Invariants
//! - Views are a pure function of `(store revision, active board id)`.
//! - Column order follows `Board::column_ids`, task order `Column::task_ids`.

use crate::engine::KanbanEngine;
use crate::model::board::Board;
use crate::model::column::Column;
use crate::model::id::{BoardId, ColumnId, TaskId};
use crate::model::task::Task;
use crate::store::StoreRevision;
use std::collections::HashMap;

type ProjectionKey = (StoreRevision, Option<BoardId>);

#[derive(Debug, Clone, Default)]
struct ProjectionView {
    board: Option<Board>,
    columns: Vec<Column>,
    tasks: HashMap<TaskId, Task>,
}

/// Cached views over the active board.
#[derive(Debug, Clone, Default)]
pub struct ActiveBoardProjection {
    key: Option<ProjectionKey>,
    view: ProjectionView,
    recomputations: u64,
}

impl ActiveBoardProjection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Brings the cached views up to date for `active`.
    ///
    /// Returns `true` when a recomputation happened.
    pub fn refresh(&mut self, engine: &KanbanEngine, active: Option<&BoardId>) -> bool {
        let key = (engine.revision(), active.cloned());
        if self.key.as_ref() == Some(&key) {
            return false;
        }

        self.view = active
            .and_then(|board_id| engine.board_by_id(board_id))
            .map(|board| build_view(engine, board))
            .unwrap_or_default();
        self.key = Some(key);
        self.recomputations += 1;
        true
    }

    pub fn board(&self) -> Option<&Board> {
        self.view.board.as_ref()
    }

    /// Active board columns in display order.
    pub fn columns(&self) -> &[Column] {
        &self.view.columns
    }

    /// Every task on the active board keyed by id.
    pub fn tasks(&self) -> &HashMap<TaskId, Task> {
        &self.view.tasks
    }

    pub fn task(&self, id: &TaskId) -> Option<&Task> {
        self.view.tasks.get(id)
    }

    /// Tasks of one active-board column in display order.
    pub fn column_tasks(&self, column_id: &ColumnId) -> Vec<&Task> {
        self.view
            .columns
            .iter()
            .find(|column| column.id == *column_id)
            .map(|column| {
                column
                    .task_ids
                    .iter()
                    .filter_map(|id| self.view.tasks.get(id))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Number of recomputations since construction.
    pub fn recompute_count(&self) -> u64 {
        self.recomputations
    }
}

fn build_view(engine: &KanbanEngine, board: &Board) -> ProjectionView {
    let columns = engine
        .columns_for_board(&board.id)
        .into_iter()
        .cloned()
        .collect::<Vec<_>>();
    let tasks = columns
        .iter()
        .flat_map(|column| engine.tasks_by_ids(&column.task_ids))
        .map(|task| (task.id.clone(), task.clone()))
        .collect();

    ProjectionView {
        board: Some(board.clone()),
        columns,
        tasks,
    }
}

#[cfg(test)]
mod tests {
    use super::ActiveBoardProjection;
    use crate::engine::{KanbanEngine, NewBoard, NewColumn};
    use crate::model::id::BoardId;

    #[test]
    fn unknown_board_yields_empty_views() {
        let engine = KanbanEngine::default();
        let mut projection = ActiveBoardProjection::new();
        projection.refresh(&engine, Some(&BoardId::new("missing")));

        assert!(projection.board().is_none());
        assert!(projection.columns().is_empty());
        assert!(projection.tasks().is_empty());
    }

    #[test]
    fn refresh_is_skipped_when_key_is_unchanged() {
        let mut engine = KanbanEngine::default();
        let board = engine
            .board_added(NewBoard::titled("Roadmap"))
            .expect("board should be created");
        let mut projection = ActiveBoardProjection::new();

        assert!(projection.refresh(&engine, Some(&board)));
        assert!(!projection.refresh(&engine, Some(&board)));
        assert_eq!(projection.recompute_count(), 1);

        engine
            .column_added(NewColumn::new("Todo", board.clone()))
            .expect("column should be created");
        assert!(projection.refresh(&engine, Some(&board)));
        assert_eq!(projection.columns().len(), 1);
        assert_eq!(projection.recompute_count(), 2);
    }
}
