//! Cross-entity consistency engine.
//!
//! # Responsibility
//! - Own the three entity collections and apply every mutation command.
//! - Keep denormalized order arrays (`Board::column_ids`,
//!   `Column::task_ids`) in step with entity back-references.
//!
//! # Invariants
//! - A command either applies all of its effects or none: every
//!   precondition is checked before the first write.
//! - Side effects run in a fixed order: children, then parent order arrays.
//! - Display order always comes from order arrays, never from map iteration.
//! - The engine never creates placeholder entities for missing references.

mod command;
mod error;
pub mod invariants;

use crate::config::{ColumnDeleteMode, EngineConfig, MoveIndexPolicy};
use crate::model::board::{Board, BoardPatch};
use crate::model::column::{Column, ColumnPatch};
use crate::model::id::{BoardId, ColumnId, EntityKind, TaskId};
use crate::model::task::{Task, TaskPatch};
use crate::store::{EntityStore, StoreRevision};
use log::{debug, error, warn};
use std::collections::HashSet;
use std::hash::Hash;

pub use command::{Command, CommandOutcome, NewBoard, NewColumn, NewTask, Removal};
pub use error::{EngineError, EngineResult};

/// Single-writer state engine over boards, columns and tasks.
#[derive(Debug, Clone, Default)]
pub struct KanbanEngine {
    store: EntityStore,
    config: EngineConfig,
}

impl KanbanEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            store: EntityStore::new(),
            config,
        }
    }

    pub fn config(&self) -> EngineConfig {
        self.config
    }

    pub fn store(&self) -> &EntityStore {
        &self.store
    }

    pub fn revision(&self) -> StoreRevision {
        self.store.revision()
    }

    /// Applies one command.
    pub fn apply(&mut self, command: Command) -> EngineResult<CommandOutcome> {
        match command {
            Command::BoardAdded(draft) => self.board_added(draft).map(CommandOutcome::BoardCreated),
            Command::BoardUpdated { id, patch } => {
                self.board_updated(&id, patch).map(|()| CommandOutcome::Updated)
            }
            Command::BoardRemoved(id) => self.board_removed(&id).map(CommandOutcome::Removed),
            Command::BoardsRemoved(ids) => self.boards_removed(&ids).map(CommandOutcome::Removed),
            Command::ColumnAdded(draft) => {
                self.column_added(draft).map(CommandOutcome::ColumnCreated)
            }
            Command::ColumnUpdated { id, patch } => {
                self.column_updated(&id, patch).map(|()| CommandOutcome::Updated)
            }
            Command::ColumnsRemoved(ids) => {
                self.columns_removed(&ids).map(CommandOutcome::Removed)
            }
            Command::TaskAdded(draft) => self.task_added(draft).map(CommandOutcome::TaskCreated),
            Command::TaskUpdated { id, patch } => {
                self.task_updated(&id, patch).map(changed_outcome)
            }
            Command::TaskRemoved(id) => self.task_removed(&id).map(|task| {
                CommandOutcome::Removed(Removal {
                    tasks: vec![task.id],
                    ..Removal::default()
                })
            }),
            Command::TasksRemoved(ids) => self.tasks_removed(&ids).map(CommandOutcome::Removed),
            Command::TaskMoved {
                task_id,
                new_column_id,
                index,
            } => self
                .task_moved(&task_id, &new_column_id, index)
                .map(changed_outcome),
        }
    }

    // ----- boards -------------------------------------------------------

    /// Creates a board with an empty column order.
    pub fn board_added(&mut self, draft: NewBoard) -> EngineResult<BoardId> {
        let result = self.add_board(draft);
        self.finish("board_added", result)
    }

    fn add_board(&mut self, draft: NewBoard) -> EngineResult<BoardId> {
        let id = draft.id.unwrap_or_else(BoardId::generate);
        if !draft.column_ids.is_empty() {
            return Err(EngineError::OrderMismatch {
                kind: EntityKind::Board,
                id: id.to_string(),
            });
        }
        self.store.boards.add(Board::new(id.clone(), draft.title))?;
        Ok(id)
    }

    /// Patches a board. A `column_ids` patch may only reorder its columns.
    pub fn board_updated(&mut self, id: &BoardId, patch: BoardPatch) -> EngineResult<()> {
        let result = self.update_board(id, patch);
        self.finish("board_updated", result)
    }

    fn update_board(&mut self, id: &BoardId, patch: BoardPatch) -> EngineResult<()> {
        let board = self
            .store
            .boards
            .get_by_id(id)
            .ok_or_else(|| EngineError::not_found(EntityKind::Board, id))?;
        if let Some(column_ids) = &patch.column_ids {
            if !is_permutation(&board.column_ids, column_ids) {
                return Err(EngineError::OrderMismatch {
                    kind: EntityKind::Board,
                    id: id.to_string(),
                });
            }
        }
        self.store.boards.update_by_id(id, patch)?;
        Ok(())
    }

    /// Removes a board together with its columns and their tasks.
    pub fn board_removed(&mut self, id: &BoardId) -> EngineResult<Removal> {
        let result = self.remove_boards(std::slice::from_ref(id));
        self.finish("board_removed", result)
    }

    /// Removes several boards with cascade. Fails if any id is absent.
    pub fn boards_removed(&mut self, ids: &[BoardId]) -> EngineResult<Removal> {
        let result = self.remove_boards(ids);
        self.finish("boards_removed", result)
    }

    fn remove_boards(&mut self, ids: &[BoardId]) -> EngineResult<Removal> {
        let ids = dedup(ids);
        let mut removal = Removal::default();
        for id in &ids {
            let board = self
                .store
                .boards
                .get_by_id(id)
                .ok_or_else(|| EngineError::not_found(EntityKind::Board, id))?;
            for column_id in &board.column_ids {
                if let Some(column) = self.store.columns.get_by_id(column_id) {
                    removal.tasks.extend(column.task_ids.iter().cloned());
                }
                removal.columns.push(column_id.clone());
            }
            removal.boards.push(id.clone());
        }

        self.store.tasks.remove_many(&removal.tasks);
        self.store.columns.remove_many(&removal.columns);
        self.store.boards.remove_many(&removal.boards);
        Ok(removal)
    }

    // ----- columns ------------------------------------------------------

    /// Creates a column and appends it to its board's column order.
    pub fn column_added(&mut self, draft: NewColumn) -> EngineResult<ColumnId> {
        let result = self.add_column(draft);
        self.finish("column_added", result)
    }

    fn add_column(&mut self, draft: NewColumn) -> EngineResult<ColumnId> {
        let id = draft.id.unwrap_or_else(ColumnId::generate);
        if !draft.task_ids.is_empty() {
            return Err(EngineError::OrderMismatch {
                kind: EntityKind::Column,
                id: id.to_string(),
            });
        }
        if self.store.columns.contains(&id) {
            return Err(EngineError::DuplicateId {
                kind: EntityKind::Column,
                id: id.to_string(),
            });
        }
        if !self.store.boards.contains(&draft.board_id) {
            return Err(EngineError::dangling(
                EntityKind::Column,
                &id,
                EntityKind::Board,
                &draft.board_id,
            ));
        }

        let board_id = draft.board_id.clone();
        self.store
            .columns
            .add(Column::new(id.clone(), draft.title, draft.board_id))?;
        if let Some(board) = self.store.boards.get_mut(&board_id) {
            board.column_ids.push(id.clone());
        }
        self.store.boards.touch();
        Ok(id)
    }

    /// Patches a column. A `task_ids` patch may only reorder its tasks.
    pub fn column_updated(&mut self, id: &ColumnId, patch: ColumnPatch) -> EngineResult<()> {
        let result = self.update_column(id, patch);
        self.finish("column_updated", result)
    }

    fn update_column(&mut self, id: &ColumnId, patch: ColumnPatch) -> EngineResult<()> {
        let column = self
            .store
            .columns
            .get_by_id(id)
            .ok_or_else(|| EngineError::not_found(EntityKind::Column, id))?;
        if let Some(task_ids) = &patch.task_ids {
            if !is_permutation(&column.task_ids, task_ids) {
                return Err(EngineError::OrderMismatch {
                    kind: EntityKind::Column,
                    id: id.to_string(),
                });
            }
        }
        self.store.columns.update_by_id(id, patch)?;
        Ok(())
    }

    /// Removes columns, splicing them out of their boards' column order.
    ///
    /// Contained tasks follow the configured [`ColumnDeleteMode`].
    pub fn columns_removed(&mut self, ids: &[ColumnId]) -> EngineResult<Removal> {
        let result = self.remove_columns(ids);
        self.finish("columns_removed", result)
    }

    fn remove_columns(&mut self, ids: &[ColumnId]) -> EngineResult<Removal> {
        let ids = dedup(ids);
        let mut removal = Removal::default();
        let mut owners = Vec::with_capacity(ids.len());
        for id in &ids {
            let column = self
                .store
                .columns
                .get_by_id(id)
                .ok_or_else(|| EngineError::not_found(EntityKind::Column, id))?;
            if self.config.column_delete_mode == ColumnDeleteMode::RejectNonEmpty
                && !column.task_ids.is_empty()
            {
                return Err(EngineError::ColumnNotEmpty {
                    column_id: id.clone(),
                    task_count: column.task_ids.len(),
                });
            }
            removal.tasks.extend(column.task_ids.iter().cloned());
            removal.columns.push(id.clone());
            owners.push(column.board_id.clone());
        }

        self.store.tasks.remove_many(&removal.tasks);
        for (column_id, board_id) in removal.columns.iter().zip(&owners) {
            if let Some(board) = self.store.boards.get_mut(board_id) {
                board.column_ids.retain(|id| id != column_id);
            }
        }
        if !removal.columns.is_empty() {
            self.store.boards.touch();
        }
        self.store.columns.remove_many(&removal.columns);
        Ok(removal)
    }

    // ----- tasks --------------------------------------------------------

    /// Creates a task and appends it to its column's task order.
    pub fn task_added(&mut self, draft: NewTask) -> EngineResult<TaskId> {
        let result = self.add_task(draft);
        self.finish("task_added", result)
    }

    fn add_task(&mut self, draft: NewTask) -> EngineResult<TaskId> {
        let id = draft.id.unwrap_or_else(TaskId::generate);
        if self.store.tasks.contains(&id) {
            return Err(EngineError::DuplicateId {
                kind: EntityKind::Task,
                id: id.to_string(),
            });
        }
        if !self.store.boards.contains(&draft.board) {
            return Err(EngineError::dangling(
                EntityKind::Task,
                &id,
                EntityKind::Board,
                &draft.board,
            ));
        }
        let column = self.store.columns.get_by_id(&draft.column).ok_or_else(|| {
            EngineError::dangling(EntityKind::Task, &id, EntityKind::Column, &draft.column)
        })?;
        if column.board_id != draft.board {
            return Err(EngineError::BoardMismatch {
                column_id: column.id.clone(),
                column_board: column.board_id.clone(),
                requested_board: draft.board,
            });
        }

        let column_id = draft.column.clone();
        self.store.tasks.add(Task {
            id: id.clone(),
            title: draft.title,
            description: draft.description,
            subtasks: draft.subtasks,
            column: draft.column,
            board: draft.board,
        })?;
        if let Some(column) = self.store.columns.get_mut(&column_id) {
            column.task_ids.push(id.clone());
        }
        self.store.columns.touch();
        Ok(id)
    }

    /// Patches a task. A changed `column` lands the task at index 0 of the
    /// new column.
    ///
    /// Returns whether anything changed.
    pub fn task_updated(&mut self, id: &TaskId, patch: TaskPatch) -> EngineResult<bool> {
        let result = self.update_task(id, patch);
        self.finish("task_updated", result)
    }

    fn update_task(&mut self, id: &TaskId, mut patch: TaskPatch) -> EngineResult<bool> {
        let task = self
            .store
            .tasks
            .get_by_id(id)
            .ok_or_else(|| EngineError::not_found(EntityKind::Task, id))?;
        let target_column = match patch.column.take() {
            Some(column_id) if column_id != task.column => {
                if !self.store.columns.contains(&column_id) {
                    return Err(EngineError::dangling(
                        EntityKind::Task,
                        id,
                        EntityKind::Column,
                        &column_id,
                    ));
                }
                Some(column_id)
            }
            _ => None,
        };

        let mut changed = false;
        if !patch.is_empty() {
            self.store.tasks.update_by_id(id, patch)?;
            changed = true;
        }
        if let Some(column_id) = target_column {
            self.relocate_task(id, &column_id, 0);
            changed = true;
        }
        Ok(changed)
    }

    /// Removes a task and splices it out of its column.
    pub fn task_removed(&mut self, id: &TaskId) -> EngineResult<Task> {
        let result = self.remove_task(id);
        self.finish("task_removed", result)
    }

    fn remove_task(&mut self, id: &TaskId) -> EngineResult<Task> {
        let task = self.store.tasks.remove_by_id(id)?;
        if let Some(column) = self.store.columns.get_mut(&task.column) {
            column.task_ids.retain(|current| current != id);
        }
        self.store.columns.touch();
        Ok(task)
    }

    /// Removes several tasks. Fails without changes if any id is absent.
    pub fn tasks_removed(&mut self, ids: &[TaskId]) -> EngineResult<Removal> {
        let result = self.remove_tasks(ids);
        self.finish("tasks_removed", result)
    }

    fn remove_tasks(&mut self, ids: &[TaskId]) -> EngineResult<Removal> {
        let ids = dedup(ids);
        if let Some(missing) = ids.iter().find(|id| !self.store.tasks.contains(id)) {
            return Err(EngineError::not_found(EntityKind::Task, missing));
        }
        let removed = self.store.tasks.remove_many(&ids);
        for task in &removed {
            if let Some(column) = self.store.columns.get_mut(&task.column) {
                column.task_ids.retain(|current| current != &task.id);
            }
        }
        if !removed.is_empty() {
            self.store.columns.touch();
        }
        Ok(Removal {
            tasks: ids,
            ..Removal::default()
        })
    }

    /// Moves a task to `index` of `new_column_id`.
    ///
    /// Within one column this is a stable array move: the task is removed
    /// first and `index` addresses the remaining sequence. Returns whether
    /// the order changed.
    pub fn task_moved(
        &mut self,
        id: &TaskId,
        new_column_id: &ColumnId,
        index: usize,
    ) -> EngineResult<bool> {
        let result = self.move_task(id, new_column_id, index);
        self.finish("task_moved", result)
    }

    fn move_task(
        &mut self,
        id: &TaskId,
        new_column_id: &ColumnId,
        index: usize,
    ) -> EngineResult<bool> {
        let task = self
            .store
            .tasks
            .get_by_id(id)
            .ok_or_else(|| EngineError::not_found(EntityKind::Task, id))?;
        let target = self.store.columns.get_by_id(new_column_id).ok_or_else(|| {
            EngineError::dangling(EntityKind::Task, id, EntityKind::Column, new_column_id)
        })?;

        let index = if task.column == *new_column_id {
            let current = target
                .position_of(id)
                .ok_or_else(|| EngineError::not_found(EntityKind::Task, id))?;
            let index = self.resolve_index(index, target.task_ids.len() - 1)?;
            if index == current {
                return Ok(false);
            }
            index
        } else {
            self.resolve_index(index, target.task_ids.len())?
        };

        self.relocate_task(id, new_column_id, index);
        Ok(true)
    }

    /// Applies a task relocation whose preconditions are already checked.
    fn relocate_task(&mut self, id: &TaskId, new_column_id: &ColumnId, index: usize) {
        let Some(task) = self.store.tasks.get_by_id(id) else {
            return;
        };
        let old_column_id = task.column.clone();

        if let Some(column) = self.store.columns.get_mut(&old_column_id) {
            column.task_ids.retain(|current| current != id);
        }
        let mut new_board = None;
        if let Some(column) = self.store.columns.get_mut(new_column_id) {
            let index = index.min(column.task_ids.len());
            column.task_ids.insert(index, id.clone());
            new_board = Some(column.board_id.clone());
        }
        self.store.columns.touch();

        if old_column_id != *new_column_id {
            if let Some(task) = self.store.tasks.get_mut(id) {
                task.column = new_column_id.clone();
                if let Some(board) = new_board {
                    task.board = board;
                }
            }
            self.store.tasks.touch();
        }
    }

    fn resolve_index(&self, index: usize, len: usize) -> EngineResult<usize> {
        match self.config.move_index_policy {
            MoveIndexPolicy::Clamp => Ok(index.min(len)),
            MoveIndexPolicy::Strict if index > len => {
                Err(EngineError::InvalidIndex { index, len })
            }
            MoveIndexPolicy::Strict => Ok(index),
        }
    }

    // ----- queries ------------------------------------------------------

    pub fn all_boards(&self) -> Vec<&Board> {
        self.store.boards.get_all()
    }

    pub fn board_by_id(&self, id: &BoardId) -> Option<&Board> {
        self.store.boards.get_by_id(id)
    }

    pub fn board_ids(&self) -> &[BoardId] {
        self.store.boards.ids()
    }

    pub fn all_columns(&self) -> Vec<&Column> {
        self.store.columns.get_all()
    }

    pub fn column_by_id(&self, id: &ColumnId) -> Option<&Column> {
        self.store.columns.get_by_id(id)
    }

    /// Columns of a board in the board's display order.
    pub fn columns_for_board(&self, board_id: &BoardId) -> Vec<&Column> {
        self.store
            .boards
            .get_by_id(board_id)
            .map(|board| {
                board
                    .column_ids
                    .iter()
                    .filter_map(|id| self.store.columns.get_by_id(id))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn task_by_id(&self, id: &TaskId) -> Option<&Task> {
        self.store.tasks.get_by_id(id)
    }

    /// Tasks in the requested order; absent ids are skipped.
    pub fn tasks_by_ids(&self, ids: &[TaskId]) -> Vec<&Task> {
        ids.iter()
            .filter_map(|id| self.store.tasks.get_by_id(id))
            .collect()
    }

    pub fn all_tasks(&self) -> Vec<&Task> {
        self.store.tasks.get_all()
    }

    /// Tasks of a column in the column's display order.
    pub fn tasks_for_column(&self, column_id: &ColumnId) -> Vec<&Task> {
        self.store
            .columns
            .get_by_id(column_id)
            .map(|column| self.tasks_by_ids(&column.task_ids))
            .unwrap_or_default()
    }

    /// Runs the full invariant checker.
    pub fn verify(&self) -> Result<(), invariants::InvariantViolation> {
        invariants::verify(&self.store)
    }

    fn finish<T>(&self, event: &'static str, result: EngineResult<T>) -> EngineResult<T> {
        match &result {
            Ok(_) => debug!("event={event} module=engine status=ok"),
            Err(err) => warn!(
                "event={event} module=engine status=rejected error_code={} error={err}",
                err.code()
            ),
        }
        if cfg!(debug_assertions) {
            if let Err(violation) = self.verify() {
                error!("event=invariant_check module=engine status=error violation={violation}");
                debug_assert!(false, "store invariant violated after {event}: {violation}");
            }
        }
        result
    }
}

fn changed_outcome(changed: bool) -> CommandOutcome {
    if changed {
        CommandOutcome::Updated
    } else {
        CommandOutcome::Unchanged
    }
}

fn dedup<T: Clone + Eq + Hash>(ids: &[T]) -> Vec<T> {
    let mut seen = HashSet::new();
    ids.iter().filter(|id| seen.insert(*id)).cloned().collect()
}

fn is_permutation<T: Eq + Hash>(current: &[T], proposed: &[T]) -> bool {
    if current.len() != proposed.len() {
        return false;
    }
    let expected = current.iter().collect::<HashSet<_>>();
    let proposed_set = proposed.iter().collect::<HashSet<_>>();
    proposed_set.len() == proposed.len() && expected == proposed_set
}
