//! FFI use-case API for Flutter-facing calls.
//!
//! # Responsibility
//! - Expose board, column, task and drag flows to Dart via FRB.
//! - Flatten core results into plain response envelopes.
//!
//! # Invariants
//! - Exported functions must not panic across FFI boundary.
//! - One process-wide `KanbanClient` serves every call; access is
//!   serialized by a mutex.
//! - Remote sync is not wired here; the UI shell owns transport.

use kanban_core::{
    core_version as core_version_inner, ping as ping_inner, BoardId, BoardsSnapshot, Column,
    ColumnId, DropTarget, KanbanClient, KanbanConfig, LoggingConfig, NewTask, Subtask, Task,
    TaskId, TaskPatch,
};
use std::sync::{Mutex, MutexGuard, OnceLock, PoisonError};

static CLIENT: OnceLock<Mutex<KanbanClient>> = OnceLock::new();

/// Minimal health-check API for FRB smoke integration.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Expose core crate version through FFI.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes Rust core logging once per process.
///
/// # FFI contract
/// - `level`: `trace|debug|info|warn|error`, case-insensitive.
/// - `log_dir`: absolute directory for rolling log files.
/// - Same arguments twice are accepted; different ones return an error.
/// - Returns empty string on success and error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    let config = LoggingConfig {
        level,
        log_dir: Some(log_dir),
    };
    match kanban_core::init_logging(&config) {
        Ok(_) => String::new(),
        Err(err) => err.to_string(),
    }
}

/// Generic action response envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionResponse {
    pub ok: bool,
    /// Created or affected entity id, when the action yields one.
    pub id: Option<String>,
    /// Human-readable message for diagnostics/UI.
    pub message: String,
}

impl ActionResponse {
    fn success(message: impl Into<String>, id: Option<String>) -> Self {
        Self {
            ok: true,
            id,
            message: message.into(),
        }
    }

    fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            id: None,
            message: message.into(),
        }
    }
}

/// Sidebar entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardItem {
    pub id: String,
    pub title: String,
    pub active: bool,
}

/// Task card as rendered inside a column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskCard {
    pub id: String,
    pub title: String,
    pub completed_subtasks: u32,
    pub total_subtasks: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnView {
    pub id: String,
    pub title: String,
    pub tasks: Vec<TaskCard>,
}

/// Ordered columns and cards of one board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardView {
    pub board_id: Option<String>,
    pub title: String,
    pub columns: Vec<ColumnView>,
    pub data_loaded: bool,
}

/// Replaces the process client with one built from JSON config.
///
/// Loaded boards are discarded.
#[flutter_rust_bridge::frb(sync)]
pub fn configure(config_json: String) -> ActionResponse {
    let config = match KanbanConfig::from_json_str(&config_json) {
        Ok(config) => config,
        Err(err) => {
            log::warn!("event=ffi_configure module=ffi status=error error={err}");
            return ActionResponse::failure(format!("configure failed: {err}"));
        }
    };
    *client() = KanbanClient::new(&config);
    log::info!(
        "event=ffi_configure module=ffi status=ok column_delete_mode={:?} move_index_policy={:?}",
        config.engine.column_delete_mode,
        config.engine.move_index_policy
    );
    ActionResponse::success("Configured.", None)
}

/// Loads the server `{ boards: [...] }` document.
#[flutter_rust_bridge::frb(sync)]
pub fn load_boards_json(json: String) -> ActionResponse {
    let snapshot = match BoardsSnapshot::from_json(&json) {
        Ok(snapshot) => snapshot,
        Err(err) => return ActionResponse::failure(format!("load_boards_json failed: {err}")),
    };
    match client().load_snapshot(&snapshot) {
        Ok(summary) => ActionResponse::success(
            format!(
                "Loaded {} board(s), {} column(s), {} task(s).",
                summary.boards.len(),
                summary.columns.len(),
                summary.tasks.len()
            ),
            None,
        ),
        Err(err) => ActionResponse::failure(format!("load_boards_json failed: {err}")),
    }
}

/// Unloads every board.
#[flutter_rust_bridge::frb(sync)]
pub fn clear_boards() -> ActionResponse {
    match client().clear() {
        Ok(removal) => {
            ActionResponse::success(format!("Removed {} board(s).", removal.boards.len()), None)
        }
        Err(err) => ActionResponse::failure(format!("clear_boards failed: {err}")),
    }
}

#[flutter_rust_bridge::frb(sync)]
pub fn list_boards() -> Vec<BoardItem> {
    let client = client();
    let active = client.active_board_id();
    client
        .boards()
        .into_iter()
        .map(|board| BoardItem {
            id: board.id.to_string(),
            title: board.title.clone(),
            active: active == Some(&board.id),
        })
        .collect()
}

#[flutter_rust_bridge::frb(sync)]
pub fn select_board(board_id: String) -> ActionResponse {
    let board_id = BoardId::new(board_id);
    match client().select_board(&board_id) {
        Ok(()) => ActionResponse::success("Board selected.", Some(board_id.to_string())),
        Err(err) => ActionResponse::failure(format!("select_board failed: {err}")),
    }
}

/// Columns and cards of `board_id`, or of the active board when absent.
///
/// The active board renders from the client's memoized projection.
#[flutter_rust_bridge::frb(sync)]
pub fn board_view(board_id: Option<String>) -> BoardView {
    render_board(&mut client(), board_id.map(BoardId::new))
}

fn render_board(client: &mut KanbanClient, board_id: Option<BoardId>) -> BoardView {
    let data_loaded = client.data_loaded();
    let empty = BoardView {
        board_id: None,
        title: String::new(),
        columns: Vec::new(),
        data_loaded,
    };

    let on_active = match &board_id {
        None => true,
        Some(id) => client.active_board_id() == Some(id),
    };
    if on_active {
        let view = client.active_view();
        let Some(board) = view.board() else {
            return empty;
        };
        return BoardView {
            board_id: Some(board.id.to_string()),
            title: board.title.clone(),
            columns: view
                .columns()
                .iter()
                .map(|column| column_view(column, view.column_tasks(&column.id)))
                .collect(),
            data_loaded,
        };
    }

    let engine = client.engine();
    let Some(board) = board_id.as_ref().and_then(|id| engine.board_by_id(id)) else {
        return empty;
    };
    BoardView {
        board_id: Some(board.id.to_string()),
        title: board.title.clone(),
        columns: engine
            .columns_for_board(&board.id)
            .into_iter()
            .map(|column| column_view(column, engine.tasks_for_column(&column.id)))
            .collect(),
        data_loaded,
    }
}

fn column_view(column: &Column, tasks: Vec<&Task>) -> ColumnView {
    ColumnView {
        id: column.id.to_string(),
        title: column.title.clone(),
        tasks: tasks
            .into_iter()
            .map(|task| {
                let (completed, total) = task.subtask_progress();
                TaskCard {
                    id: task.id.to_string(),
                    title: task.title.clone(),
                    completed_subtasks: saturating_u32(completed),
                    total_subtasks: saturating_u32(total),
                }
            })
            .collect(),
    }
}

#[flutter_rust_bridge::frb(sync)]
pub fn create_board(title: String, column_titles: Vec<String>) -> ActionResponse {
    let title = title.trim();
    if title.is_empty() {
        return ActionResponse::failure("create_board failed: title must not be blank");
    }
    match client().create_board(title, &column_titles) {
        Ok(id) => ActionResponse::success("Board created.", Some(id.to_string())),
        Err(err) => ActionResponse::failure(format!("create_board failed: {err}")),
    }
}

#[flutter_rust_bridge::frb(sync)]
pub fn edit_board(board_id: String, title: String, column_titles: Vec<String>) -> ActionResponse {
    let board_id = BoardId::new(board_id);
    match client().edit_board(&board_id, title.trim(), &column_titles) {
        Ok(()) => ActionResponse::success("Board updated.", Some(board_id.to_string())),
        Err(err) => ActionResponse::failure(format!("edit_board failed: {err}")),
    }
}

#[flutter_rust_bridge::frb(sync)]
pub fn delete_board(board_id: String) -> ActionResponse {
    let board_id = BoardId::new(board_id);
    match client().delete_board(&board_id) {
        Ok(removal) => ActionResponse::success(
            format!(
                "Board deleted with {} column(s) and {} task(s).",
                removal.columns.len(),
                removal.tasks.len()
            ),
            Some(board_id.to_string()),
        ),
        Err(err) => ActionResponse::failure(format!("delete_board failed: {err}")),
    }
}

/// Creates a task at the end of `column_id`. Blank subtask rows are dropped.
#[flutter_rust_bridge::frb(sync)]
pub fn create_task(
    column_id: String,
    title: String,
    description: String,
    subtasks: Vec<String>,
) -> ActionResponse {
    let column_id = ColumnId::new(column_id);
    let mut client = client();
    let Some(board_id) = client
        .engine()
        .column_by_id(&column_id)
        .map(|column| column.board_id.clone())
    else {
        return ActionResponse::failure(format!("create_task failed: column not found: {column_id}"));
    };

    let draft = NewTask::new(title.trim(), column_id, board_id)
        .with_description(description)
        .with_subtasks(subtask_rows(subtasks));
    match client.create_task(draft) {
        Ok(id) => ActionResponse::success("Task created.", Some(id.to_string())),
        Err(err) => ActionResponse::failure(format!("create_task failed: {err}")),
    }
}

/// Task form submit. Subtask rows replace the current list as open items.
#[flutter_rust_bridge::frb(sync)]
pub fn edit_task(
    task_id: String,
    title: String,
    description: String,
    subtasks: Vec<String>,
    column_id: String,
) -> ActionResponse {
    let task_id = TaskId::new(task_id);
    let patch = TaskPatch {
        title: Some(title.trim().to_string()),
        description: Some(description),
        subtasks: Some(subtask_rows(subtasks)),
        column: Some(ColumnId::new(column_id)),
    };
    match client().edit_task(&task_id, patch) {
        Ok(_) => ActionResponse::success("Task updated.", Some(task_id.to_string())),
        Err(err) => ActionResponse::failure(format!("edit_task failed: {err}")),
    }
}

#[flutter_rust_bridge::frb(sync)]
pub fn set_task_status(task_id: String, column_id: String) -> ActionResponse {
    let task_id = TaskId::new(task_id);
    match client().set_task_status(&task_id, &ColumnId::new(column_id)) {
        Ok(_) => ActionResponse::success("Status changed.", Some(task_id.to_string())),
        Err(err) => ActionResponse::failure(format!("set_task_status failed: {err}")),
    }
}

#[flutter_rust_bridge::frb(sync)]
pub fn toggle_subtask(task_id: String, index: u32) -> ActionResponse {
    let task_id = TaskId::new(task_id);
    match client().toggle_subtask(&task_id, index as usize) {
        Ok(completed) => ActionResponse::success(
            if completed {
                "Subtask completed."
            } else {
                "Subtask reopened."
            },
            Some(task_id.to_string()),
        ),
        Err(err) => ActionResponse::failure(format!("toggle_subtask failed: {err}")),
    }
}

#[flutter_rust_bridge::frb(sync)]
pub fn delete_task(task_id: String) -> ActionResponse {
    let task_id = TaskId::new(task_id);
    match client().delete_task(&task_id) {
        Ok(_) => ActionResponse::success("Task deleted.", Some(task_id.to_string())),
        Err(err) => ActionResponse::failure(format!("delete_task failed: {err}")),
    }
}

#[flutter_rust_bridge::frb(sync)]
pub fn drag_start(task_id: String) {
    client().drag_start(TaskId::new(task_id));
}

/// Hover over a task card (`over_task = true`) or a column body.
///
/// Returns the candidate index, or `None` for unknown targets.
#[flutter_rust_bridge::frb(sync)]
pub fn drag_over(target_id: String, over_task: bool) -> Option<u32> {
    client()
        .drag_over(&drop_target(target_id, over_task))
        .map(|(_, index)| saturating_u32(index))
}

/// Finishes a drag. `ok` with id set when a move was committed.
#[flutter_rust_bridge::frb(sync)]
pub fn drag_drop(target_id: String, over_task: bool) -> ActionResponse {
    let mut client = client();
    let dragged = client
        .drag()
        .session()
        .map(|session| session.dragged_task_id.to_string());
    match client.drag_drop(&drop_target(target_id, over_task)) {
        Ok(true) => ActionResponse::success("Task moved.", dragged),
        Ok(false) => ActionResponse::success("No move.", None),
        Err(err) => ActionResponse::failure(format!("drag_drop failed: {err}")),
    }
}

#[flutter_rust_bridge::frb(sync)]
pub fn drag_cancel() {
    client().drag_cancel();
}

/// Locks the process client. A poisoned lock is recovered; engine state is
/// consistent between commands.
fn client() -> MutexGuard<'static, KanbanClient> {
    CLIENT
        .get_or_init(|| Mutex::new(KanbanClient::default()))
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
}

fn drop_target(target_id: String, over_task: bool) -> DropTarget {
    if over_task {
        DropTarget::Task(TaskId::new(target_id))
    } else {
        DropTarget::Column(ColumnId::new(target_id))
    }
}

fn subtask_rows(rows: Vec<String>) -> Vec<Subtask> {
    rows.into_iter()
        .map(|row| row.trim().to_string())
        .filter(|row| !row.is_empty())
        .map(Subtask::open)
        .collect()
}

fn saturating_u32(value: usize) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::{
        board_view, core_version, create_board, create_task, delete_board, drag_drop,
        drag_over, drag_start, init_logging, ping, render_board, set_task_status,
        toggle_subtask, BoardView,
    };
    use kanban_core::{BoardId, KanbanClient, NewTask};
    use std::time::{SystemTime, UNIX_EPOCH};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }

    #[test]
    fn init_logging_rejects_relative_dir() {
        let error = init_logging("info".to_string(), "tmp/logs".to_string());
        assert!(!error.is_empty());
    }

    #[test]
    fn create_board_rejects_blank_title() {
        let response = create_board("   ".to_string(), Vec::new());
        assert!(!response.ok);
    }

    #[test]
    fn task_lifecycle_through_envelopes() {
        let (board_id, view) = new_board("lifecycle");
        let todo = view.columns[0].id.clone();
        let doing = view.columns[1].id.clone();

        let created = create_task(
            todo.clone(),
            "Design logo".to_string(),
            String::new(),
            vec!["Sketch".to_string(), "  ".to_string()],
        );
        assert!(created.ok, "{}", created.message);
        let task_id = created.id.expect("task id should be returned");

        let toggled = toggle_subtask(task_id.clone(), 0);
        assert!(toggled.ok, "{}", toggled.message);
        let out_of_range = toggle_subtask(task_id.clone(), 5);
        assert!(!out_of_range.ok);

        let moved = set_task_status(task_id.clone(), doing.clone());
        assert!(moved.ok, "{}", moved.message);

        let view = board_view(Some(board_id.clone()));
        assert!(view.columns[0].tasks.is_empty());
        let card = &view.columns[1].tasks[0];
        assert_eq!(card.id, task_id);
        assert_eq!((card.completed_subtasks, card.total_subtasks), (1, 1));

        let deleted = delete_board(board_id.clone());
        assert!(deleted.ok, "{}", deleted.message);
        assert!(board_view(Some(board_id)).board_id.is_none());
    }

    #[test]
    fn drag_drop_moves_card_between_columns() {
        let (board_id, view) = new_board("drag");
        let todo = view.columns[0].id.clone();
        let doing = view.columns[1].id.clone();
        let task_id = create_task(todo, "Card".to_string(), String::new(), Vec::new())
            .id
            .expect("task id should be returned");

        drag_start(task_id.clone());
        assert_eq!(drag_over(doing.clone(), false), Some(0));
        let dropped = drag_drop(doing, false);
        assert!(dropped.ok, "{}", dropped.message);
        assert_eq!(dropped.id.as_deref(), Some(task_id.as_str()));

        let view = board_view(Some(board_id));
        assert_eq!(view.columns[1].tasks[0].id, task_id);
    }

    #[test]
    fn active_board_view_reuses_projection_until_state_changes() {
        let mut client = KanbanClient::default();
        let board_id = client
            .create_board("Platform Launch", &["Todo".to_string(), "Doing".to_string()])
            .expect("board should be created");

        let first = render_board(&mut client, None);
        let count = client.active_view().recompute_count();
        let second = render_board(&mut client, Some(board_id.clone()));
        assert_eq!(first, second);
        assert_eq!(client.active_view().recompute_count(), count);

        let todo = client.active_columns()[0].id.clone();
        client
            .create_task(NewTask::new("Design logo", todo, board_id))
            .expect("task should be created");
        let third = render_board(&mut client, None);
        assert_eq!(third.columns[0].tasks.len(), 1);
        assert_eq!(client.active_view().recompute_count(), count + 1);
    }

    #[test]
    fn inactive_board_view_reads_engine_directly() {
        let mut client = KanbanClient::default();
        let first = client
            .create_board("First", &["Todo".to_string()])
            .expect("board should be created");
        client
            .create_board("Second", &[])
            .expect("board should be created");

        let view = render_board(&mut client, Some(first.clone()));
        assert_eq!(view.board_id, Some(first.to_string()));
        assert_eq!(view.columns.len(), 1);
        assert!(render_board(&mut client, Some(BoardId::new("missing")))
            .board_id
            .is_none());
    }

    fn new_board(prefix: &str) -> (String, BoardView) {
        let response = create_board(
            unique_token(prefix),
            vec!["Todo".to_string(), "Doing".to_string()],
        );
        assert!(response.ok, "{}", response.message);
        let board_id = response.id.expect("board id should be returned");
        let view = board_view(Some(board_id.clone()));
        assert_eq!(view.columns.len(), 2);
        (board_id, view)
    }

    fn unique_token(prefix: &str) -> String {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("time went backwards")
            .as_nanos();
        format!("{prefix}-{nanos}")
    }
}
