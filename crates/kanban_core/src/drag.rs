//! Drag-and-drop session tracking.
//!
//! # Responsibility
//! - Hold the ephemeral state of one pointer drag.
//! - Translate a drop into at most one `TaskMoved` command.
//!
//! # Invariants
//! - At most one session is active; `start` replaces a stale one.
//! - The tracker never mutates the engine.
//! - Candidate indexes address the destination sequence with the dragged
//!   task removed, matching `task_moved` semantics.

use crate::engine::{Command, KanbanEngine};
use crate::model::id::{ColumnId, TaskId};
use log::debug;

/// What the pointer is over.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DropTarget {
    /// Column body. Resolves to the end of that column.
    Column(ColumnId),
    /// Another task card. Resolves to that card's position.
    Task(TaskId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DragSession {
    pub dragged_task_id: TaskId,
    pub hover_column_id: Option<ColumnId>,
    pub candidate_index: Option<usize>,
}

#[derive(Debug, Clone, Default)]
pub struct DragTracker {
    session: Option<DragSession>,
}

impl DragTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn session(&self) -> Option<&DragSession> {
        self.session.as_ref()
    }

    pub fn is_dragging(&self) -> bool {
        self.session.is_some()
    }

    /// Begins dragging `task_id`.
    pub fn start(&mut self, task_id: TaskId) {
        if let Some(stale) = self.session.take() {
            debug!(
                "event=drag_start module=drag status=replaced stale_task_id={}",
                stale.dragged_task_id
            );
        }
        self.session = Some(DragSession {
            dragged_task_id: task_id,
            hover_column_id: None,
            candidate_index: None,
        });
    }

    /// Updates the hover position. Returns the resolved `(column, index)`.
    ///
    /// Unknown targets leave the previous hover state untouched.
    pub fn over(
        &mut self,
        target: &DropTarget,
        engine: &KanbanEngine,
    ) -> Option<(ColumnId, usize)> {
        let session = self.session.as_mut()?;
        let (column_id, index) = resolve(target, &session.dragged_task_id, engine)?;
        session.hover_column_id = Some(column_id.clone());
        session.candidate_index = Some(index);
        Some((column_id, index))
    }

    /// Ends the session and yields the move command, if any.
    pub fn drop(&mut self, target: &DropTarget, engine: &KanbanEngine) -> Option<Command> {
        let session = self.session.take()?;
        let task_id = session.dragged_task_id;
        if *target == DropTarget::Task(task_id.clone()) {
            debug!("event=drag_drop module=drag status=noop reason=self task_id={task_id}");
            return None;
        }

        let origin = origin_of(&task_id, engine)?;
        let (column_id, index) = resolve(target, &task_id, engine)?;
        if origin == (column_id.clone(), index) {
            debug!("event=drag_drop module=drag status=noop reason=origin task_id={task_id}");
            return None;
        }

        debug!(
            "event=drag_drop module=drag status=ok task_id={task_id} column_id={column_id} index={index}"
        );
        Some(Command::TaskMoved {
            task_id,
            new_column_id: column_id,
            index,
        })
    }

    /// Abandons the session without a command.
    pub fn cancel(&mut self) {
        self.session = None;
    }
}

fn origin_of(task_id: &TaskId, engine: &KanbanEngine) -> Option<(ColumnId, usize)> {
    let task = engine.task_by_id(task_id)?;
    let index = engine.column_by_id(&task.column)?.position_of(task_id)?;
    Some((task.column.clone(), index))
}

fn resolve(
    target: &DropTarget,
    dragged: &TaskId,
    engine: &KanbanEngine,
) -> Option<(ColumnId, usize)> {
    match target {
        DropTarget::Task(task_id) => {
            let task = engine.task_by_id(task_id)?;
            let index = engine.column_by_id(&task.column)?.position_of(task_id)?;
            Some((task.column.clone(), index))
        }
        DropTarget::Column(column_id) => {
            let column = engine.column_by_id(column_id)?;
            let len = column.task_ids.len();
            let end = if column.position_of(dragged).is_some() {
                len.saturating_sub(1)
            } else {
                len
            };
            Some((column_id.clone(), end))
        }
    }
}
