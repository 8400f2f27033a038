//! Kanban client state container.
//!
//! # Responsibility
//! - Compose the engine, UI selection state, projection, drag tracker and
//!   the optional sync queue behind use-case level operations.
//! - Implement optimistic flows: commit locally, then enqueue the mirror
//!   remote call.
//!
//! # Invariants
//! - A remote call is enqueued only after its local commit succeeded.
//! - Sync failures never fail or roll back a local operation.
//! - `active_board_id`, when set, names an existing board.
//!
//! # See also
//! - `sync::SyncQueue` for delivery and cancellation.

use crate::config::{KanbanConfig, SyncConfig};
use crate::drag::{DragTracker, DropTarget};
use crate::engine::{
    Command, CommandOutcome, EngineError, KanbanEngine, NewBoard, NewColumn, NewTask, Removal,
};
use crate::model::board::{Board, BoardPatch};
use crate::model::column::{Column, ColumnPatch};
use crate::model::id::{BoardId, ColumnId, EntityKind, TaskId};
use crate::model::task::{Task, TaskPatch};
use crate::projection::ActiveBoardProjection;
use crate::snapshot::{BoardsSnapshot, LoadSummary, SnapshotError};
use crate::sync::{ColumnBody, RemoteCall, SyncQueue, TaskBody, TaskPatchBody};
use log::{debug, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type ClientResult<T> = Result<T, ClientError>;

/// Errors from client use-case operations.
#[derive(Debug)]
pub enum ClientError {
    Engine(EngineError),
    Snapshot(SnapshotError),
    /// Selection names a board that does not exist.
    UnknownBoard(BoardId),
    /// Subtask index past the end of the task's subtask list.
    SubtaskOutOfRange {
        task_id: TaskId,
        index: usize,
        len: usize,
    },
}

impl Display for ClientError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Engine(err) => write!(f, "{err}"),
            Self::Snapshot(err) => write!(f, "{err}"),
            Self::UnknownBoard(id) => write!(f, "board not found for selection: {id}"),
            Self::SubtaskOutOfRange {
                task_id,
                index,
                len,
            } => write!(
                f,
                "subtask index {index} out of range for task {task_id} with {len} subtasks"
            ),
        }
    }
}

impl Error for ClientError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Engine(err) => Some(err),
            Self::Snapshot(err) => Some(err),
            Self::UnknownBoard(_) | Self::SubtaskOutOfRange { .. } => None,
        }
    }
}

impl From<EngineError> for ClientError {
    fn from(value: EngineError) -> Self {
        Self::Engine(value)
    }
}

impl From<SnapshotError> for ClientError {
    fn from(value: SnapshotError) -> Self {
        Self::Snapshot(value)
    }
}

/// Explicit state container for one Kanban session.
pub struct KanbanClient {
    engine: KanbanEngine,
    active_board_id: Option<BoardId>,
    data_loaded: bool,
    projection: ActiveBoardProjection,
    drag: DragTracker,
    sync: Option<SyncQueue>,
    sync_config: SyncConfig,
}

impl Default for KanbanClient {
    fn default() -> Self {
        Self::new(&KanbanConfig::default())
    }
}

impl KanbanClient {
    /// Creates a client without a sync queue.
    pub fn new(config: &KanbanConfig) -> Self {
        Self {
            engine: KanbanEngine::new(config.engine),
            active_board_id: None,
            data_loaded: false,
            projection: ActiveBoardProjection::new(),
            drag: DragTracker::new(),
            sync: None,
            sync_config: config.sync.clone(),
        }
    }

    /// Attaches a sync queue. Ignored when sync is disabled by config.
    pub fn with_sync(mut self, queue: SyncQueue) -> Self {
        if self.sync_config.enabled {
            self.sync = Some(queue);
        } else {
            info!("event=sync_attach module=client status=skipped reason=disabled");
        }
        self
    }

    pub fn engine(&self) -> &KanbanEngine {
        &self.engine
    }

    pub fn sync_queue(&self) -> Option<&SyncQueue> {
        self.sync.as_ref()
    }

    pub fn active_board_id(&self) -> Option<&BoardId> {
        self.active_board_id.as_ref()
    }

    pub fn data_loaded(&self) -> bool {
        self.data_loaded
    }

    pub fn drag(&self) -> &DragTracker {
        &self.drag
    }

    /// Applies a raw command without remote mirroring.
    pub fn apply(&mut self, command: Command) -> ClientResult<CommandOutcome> {
        let name = command.name();
        let outcome = self.engine.apply(command)?;
        self.repair_selection();
        debug!("event=client_apply module=client status=ok command={name}");
        Ok(outcome)
    }

    // ----- loading ------------------------------------------------------

    /// Bulk-loads a server snapshot and marks data as loaded.
    ///
    /// The first loaded board becomes active when nothing is selected.
    pub fn load_snapshot(&mut self, snapshot: &BoardsSnapshot) -> ClientResult<LoadSummary> {
        let summary = snapshot.load_into(&mut self.engine)?;
        self.data_loaded = true;
        if self.active_board_id.is_none() {
            self.active_board_id = self.engine.board_ids().first().cloned();
        }
        Ok(summary)
    }

    /// Unloads every board, column and task.
    pub fn clear(&mut self) -> ClientResult<Removal> {
        self.drag.cancel();
        let ids = self.engine.board_ids().to_vec();
        let removal = self.engine.boards_removed(&ids)?;
        self.active_board_id = None;
        self.data_loaded = false;
        if removal.is_empty() {
            debug!("event=client_clear module=client status=noop");
            return Ok(removal);
        }
        info!(
            "event=client_clear module=client status=ok boards={} columns={} tasks={}",
            removal.boards.len(),
            removal.columns.len(),
            removal.tasks.len()
        );
        Ok(removal)
    }

    pub fn select_board(&mut self, board_id: &BoardId) -> ClientResult<()> {
        if self.engine.board_by_id(board_id).is_none() {
            return Err(ClientError::UnknownBoard(board_id.clone()));
        }
        self.active_board_id = Some(board_id.clone());
        Ok(())
    }

    // ----- boards and columns -------------------------------------------

    /// Creates a board with initial columns and selects it.
    ///
    /// All or nothing: a failing column removes the new board again and no
    /// remote call is sent.
    pub fn create_board(
        &mut self,
        title: &str,
        column_titles: &[String],
    ) -> ClientResult<BoardId> {
        let board_id = BoardId::generate();
        let columns = column_titles
            .iter()
            .map(|column_title| NewColumn::new(column_title.as_str(), board_id.clone()))
            .collect();
        self.add_board_with_columns(NewBoard::titled(title).with_id(board_id.clone()), columns)?;
        self.active_board_id = Some(board_id.clone());

        self.mirror(RemoteCall::CreateBoard {
            board_id: board_id.to_string(),
            title: title.to_string(),
            columns: column_titles
                .iter()
                .map(|title| ColumnBody {
                    title: title.clone(),
                    tasks: Vec::new(),
                })
                .collect(),
        });
        Ok(board_id)
    }

    fn add_board_with_columns(
        &mut self,
        draft: NewBoard,
        columns: Vec<NewColumn>,
    ) -> ClientResult<BoardId> {
        let board_id = self.engine.board_added(draft)?;
        for column in columns {
            if let Err(err) = self.engine.column_added(column) {
                // Cascade takes the columns added so far.
                if let Err(cleanup) = self.engine.board_removed(&board_id) {
                    warn!(
                        "event=create_board module=client status=error board_id={board_id} cleanup_error={cleanup}"
                    );
                }
                return Err(err.into());
            }
        }
        Ok(board_id)
    }

    /// Board editor submit: renames the board, renames kept columns in
    /// order, appends new columns and removes trailing extras.
    pub fn edit_board(
        &mut self,
        board_id: &BoardId,
        title: &str,
        column_titles: &[String],
    ) -> ClientResult<()> {
        let existing = self
            .engine
            .board_by_id(board_id)
            .map(|board| board.column_ids.clone())
            .ok_or_else(|| EngineError::not_found(EntityKind::Board, board_id))?;

        if column_titles.len() < existing.len() {
            let extras = existing[column_titles.len()..].to_vec();
            self.remove_columns(board_id, &extras)?;
        }

        for (column_id, column_title) in existing.iter().zip(column_titles) {
            let unchanged = self
                .engine
                .column_by_id(column_id)
                .is_some_and(|column| column.title == *column_title);
            if !unchanged {
                self.engine
                    .column_updated(column_id, ColumnPatch::title(column_title.as_str()))?;
            }
        }
        for column_title in column_titles.iter().skip(existing.len()) {
            self.add_column(board_id, column_title)?;
        }

        self.engine.board_updated(board_id, BoardPatch::title(title))?;
        Ok(())
    }

    pub fn add_column(&mut self, board_id: &BoardId, title: &str) -> ClientResult<ColumnId> {
        let column_id = self
            .engine
            .column_added(NewColumn::new(title, board_id.clone()))?;
        self.mirror(RemoteCall::CreateColumn {
            board_id: board_id.to_string(),
            column_id: column_id.to_string(),
            title: title.to_string(),
        });
        Ok(column_id)
    }

    /// Deletes one column; contained tasks follow the configured delete mode.
    pub fn delete_column(&mut self, column_id: &ColumnId) -> ClientResult<Removal> {
        let board_id = self
            .engine
            .column_by_id(column_id)
            .map(|column| column.board_id.clone())
            .ok_or_else(|| EngineError::not_found(EntityKind::Column, column_id))?;
        self.remove_columns(&board_id, std::slice::from_ref(column_id))
    }

    fn remove_columns(&mut self, board_id: &BoardId, ids: &[ColumnId]) -> ClientResult<Removal> {
        let removal = self.engine.columns_removed(ids)?;
        if self.drag_touches(&removal) {
            self.drag.cancel();
        }
        for task_id in &removal.tasks {
            self.cancel_pending(EntityKind::Task, task_id.as_str());
        }
        for column_id in &removal.columns {
            if self.cancel_pending(EntityKind::Column, column_id.as_str()) {
                continue;
            }
            self.mirror(RemoteCall::DeleteColumn {
                board_id: board_id.to_string(),
                column_id: column_id.to_string(),
            });
        }
        Ok(removal)
    }

    /// Deletes a board with its columns and tasks.
    ///
    /// Deleting the active board clears the selection.
    pub fn delete_board(&mut self, board_id: &BoardId) -> ClientResult<Removal> {
        let removal = self.engine.board_removed(board_id)?;
        if self.drag_touches(&removal) {
            self.drag.cancel();
        }
        if self.active_board_id.as_ref() == Some(board_id) {
            self.active_board_id = None;
        }
        if !self.cancel_pending(EntityKind::Board, board_id.as_str()) {
            self.mirror(RemoteCall::DeleteBoard {
                board_id: board_id.to_string(),
            });
        }
        Ok(removal)
    }

    // ----- tasks --------------------------------------------------------

    pub fn create_task(&mut self, draft: NewTask) -> ClientResult<TaskId> {
        let task_id = self.engine.task_added(draft)?;
        if let Some(task) = self.engine.task_by_id(&task_id) {
            let body = TaskBody::for_create(task, self.column_title(&task.column));
            let call = RemoteCall::CreateTask {
                board_id: task.board.to_string(),
                task_id: task_id.to_string(),
                task: body,
            };
            self.mirror(call);
        }
        Ok(task_id)
    }

    /// Task form submit. A changed column moves the task to the top of it.
    pub fn edit_task(&mut self, task_id: &TaskId, patch: TaskPatch) -> ClientResult<bool> {
        let body = TaskPatchBody {
            title: patch.title.clone(),
            description: patch.description.clone(),
            subtasks: patch.subtasks.clone(),
            status: patch.column.as_ref().map(|id| self.column_title(id)),
        };
        let changed = self.engine.task_updated(task_id, patch)?;
        if changed {
            self.mirror_task_update(task_id, body);
        }
        Ok(changed)
    }

    /// Status dropdown: moves the task to index 0 of `column_id`.
    pub fn set_task_status(&mut self, task_id: &TaskId, column_id: &ColumnId) -> ClientResult<bool> {
        let changed = self.engine.task_moved(task_id, column_id, 0)?;
        if changed {
            let body = TaskPatchBody {
                status: Some(self.column_title(column_id)),
                ..TaskPatchBody::default()
            };
            self.mirror_task_update(task_id, body);
        }
        Ok(changed)
    }

    /// Flips one subtask's completion. Returns the new state.
    pub fn toggle_subtask(&mut self, task_id: &TaskId, index: usize) -> ClientResult<bool> {
        let mut subtasks = self
            .engine
            .task_by_id(task_id)
            .map(|task| task.subtasks.clone())
            .ok_or_else(|| EngineError::not_found(EntityKind::Task, task_id))?;
        let len = subtasks.len();
        let subtask = subtasks
            .get_mut(index)
            .ok_or_else(|| ClientError::SubtaskOutOfRange {
                task_id: task_id.clone(),
                index,
                len,
            })?;
        subtask.completed = !subtask.completed;
        let completed = subtask.completed;

        let patch = TaskPatch {
            subtasks: Some(subtasks.clone()),
            ..TaskPatch::default()
        };
        self.engine.task_updated(task_id, patch)?;
        self.mirror_task_update(
            task_id,
            TaskPatchBody {
                subtasks: Some(subtasks),
                ..TaskPatchBody::default()
            },
        );
        Ok(completed)
    }

    /// Deletes a task, cancelling its pending remote calls first.
    ///
    /// No delete is sent for a task whose create never left the queue.
    pub fn delete_task(&mut self, task_id: &TaskId) -> ClientResult<Task> {
        let task = self.engine.task_removed(task_id)?;
        if self
            .drag
            .session()
            .is_some_and(|session| session.dragged_task_id == *task_id)
        {
            self.drag.cancel();
        }
        if !self.cancel_pending(EntityKind::Task, task_id.as_str()) {
            self.mirror(RemoteCall::DeleteTask {
                board_id: task.board.to_string(),
                task_id: task_id.to_string(),
            });
        }
        Ok(task)
    }

    // ----- drag and drop ------------------------------------------------

    pub fn drag_start(&mut self, task_id: TaskId) {
        self.drag.start(task_id);
    }

    pub fn drag_over(&mut self, target: &DropTarget) -> Option<(ColumnId, usize)> {
        self.drag.over(target, &self.engine)
    }

    /// Finishes a drag. Returns whether a move was committed.
    pub fn drag_drop(&mut self, target: &DropTarget) -> ClientResult<bool> {
        let Some(command) = self.drag.drop(target, &self.engine) else {
            return Ok(false);
        };
        let Command::TaskMoved {
            task_id,
            new_column_id,
            index,
        } = command
        else {
            return Ok(false);
        };

        let changed = self.engine.task_moved(&task_id, &new_column_id, index)?;
        if changed {
            if let Some(task) = self.engine.task_by_id(&task_id) {
                let call = RemoteCall::MoveTask {
                    board_id: task.board.to_string(),
                    task_id: task_id.to_string(),
                    new_status: Some(self.column_title(&new_column_id)),
                    position: index,
                };
                self.mirror(call);
            }
        }
        Ok(changed)
    }

    pub fn drag_cancel(&mut self) {
        self.drag.cancel();
    }

    // ----- queries ------------------------------------------------------

    pub fn boards(&self) -> Vec<&Board> {
        self.engine.all_boards()
    }

    /// Up-to-date projection of the active board.
    pub fn active_view(&mut self) -> &ActiveBoardProjection {
        self.projection
            .refresh(&self.engine, self.active_board_id.as_ref());
        &self.projection
    }

    pub fn active_board(&self) -> Option<&Board> {
        self.active_board_id
            .as_ref()
            .and_then(|id| self.engine.board_by_id(id))
    }

    pub fn active_columns(&mut self) -> Vec<Column> {
        self.active_view().columns().to_vec()
    }

    // ----- internals ----------------------------------------------------

    fn column_title(&self, column_id: &ColumnId) -> String {
        self.engine
            .column_by_id(column_id)
            .map(|column| column.title.clone())
            .unwrap_or_default()
    }

    fn mirror_task_update(&self, task_id: &TaskId, body: TaskPatchBody) {
        if let Some(task) = self.engine.task_by_id(task_id) {
            self.mirror(RemoteCall::UpdateTask {
                board_id: task.board.to_string(),
                task_id: task_id.to_string(),
                task: body,
            });
        }
    }

    fn mirror(&self, call: RemoteCall) {
        let Some(queue) = &self.sync else {
            return;
        };
        let op = call.op();
        match queue.enqueue(call) {
            Ok(ticket) => debug!("event=mirror module=client status=ok op={op} ticket={ticket}"),
            Err(err) => warn!("event=mirror module=client status=error op={op} error={err}"),
        }
    }

    /// Cancels queued calls for the entity. True when its create was never
    /// sent, so the server has nothing to delete.
    fn cancel_pending(&self, kind: EntityKind, id: &str) -> bool {
        let Some(queue) = &self.sync else {
            return false;
        };
        let create_caught = queue.cancel_entity(kind, id);
        if create_caught {
            debug!("event=mirror module=client status=skipped reason=unsent_create kind={kind} id={id}");
        }
        create_caught
    }

    fn drag_touches(&self, removal: &Removal) -> bool {
        self.drag
            .session()
            .is_some_and(|session| removal.tasks.contains(&session.dragged_task_id))
    }

    fn repair_selection(&mut self) {
        let stale = self
            .active_board_id
            .as_ref()
            .is_some_and(|id| self.engine.board_by_id(id).is_none());
        if stale {
            self.active_board_id = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ClientError, KanbanClient};
    use crate::engine::{Command, CommandOutcome, EngineError, NewBoard, NewColumn};
    use crate::model::id::{BoardId, ColumnId};

    #[test]
    fn selecting_unknown_board_is_rejected() {
        let mut client = KanbanClient::default();
        let error = client
            .select_board(&BoardId::new("missing"))
            .expect_err("unknown board should be rejected");
        assert!(matches!(error, ClientError::UnknownBoard(_)));
        assert!(client.active_board_id().is_none());
    }

    #[test]
    fn raw_board_removal_drops_stale_selection() {
        let mut client = KanbanClient::default();
        let board_id = client
            .create_board("Roadmap", &[])
            .expect("board should be created");

        let outcome = client
            .apply(Command::BoardRemoved(board_id))
            .expect("removal should succeed");
        assert!(matches!(outcome, CommandOutcome::Removed(_)));
        assert!(client.active_board_id().is_none());
    }

    #[test]
    fn failing_initial_column_leaves_no_board_behind() {
        let mut client = KanbanClient::default();
        let board_id = BoardId::new("b1");
        let duplicate = ColumnId::new("todo");
        let columns = vec![
            NewColumn::new("Todo", board_id.clone()).with_id(duplicate.clone()),
            NewColumn::new("Doing", board_id.clone()).with_id(duplicate),
        ];

        let error = client
            .add_board_with_columns(NewBoard::titled("Broken").with_id(board_id.clone()), columns)
            .expect_err("duplicate column id should fail");
        assert!(matches!(
            error,
            ClientError::Engine(EngineError::DuplicateId { .. })
        ));
        assert!(client.engine().board_by_id(&board_id).is_none());
        assert!(client.engine().all_columns().is_empty());
        assert!(client.active_board_id().is_none());
    }

    #[test]
    fn clearing_an_empty_client_removes_nothing() {
        let mut client = KanbanClient::default();
        let removal = client.clear().expect("clear should succeed");
        assert!(removal.is_empty());
        assert!(!client.data_loaded());
    }

    #[test]
    fn create_board_selects_it_and_appends_columns_in_order() {
        let mut client = KanbanClient::default();
        let columns = vec!["Todo".to_string(), "Doing".to_string()];
        let board_id = client
            .create_board("Platform Launch", &columns)
            .expect("board should be created");

        assert_eq!(client.active_board_id(), Some(&board_id));
        let titles = client
            .active_columns()
            .into_iter()
            .map(|column| column.title)
            .collect::<Vec<_>>();
        assert_eq!(titles, columns);
    }
}
