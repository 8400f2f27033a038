//! Cross-collection invariant checker.
//!
//! Walks every collection and reports the first broken rule:
//! - `column_order`: `column.task_ids` lists exactly the tasks pointing at it.
//! - `board_order`: `board.column_ids` lists exactly the columns pointing at it.
//! - `foreign_key`: back-references resolve, and a task's board matches its
//!   column's board.

use crate::store::EntityStore;
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// One broken store invariant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvariantViolation {
    pub rule: &'static str,
    pub detail: String,
}

impl InvariantViolation {
    fn new(rule: &'static str, detail: String) -> Self {
        Self { rule, detail }
    }
}

impl Display for InvariantViolation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.rule, self.detail)
    }
}

impl Error for InvariantViolation {}

/// Checks every store invariant.
pub fn verify(store: &EntityStore) -> Result<(), InvariantViolation> {
    for board in store.boards.iter() {
        let mut seen = HashSet::new();
        for column_id in &board.column_ids {
            if !seen.insert(column_id) {
                return Err(InvariantViolation::new(
                    "board_order",
                    format!("board {} lists column {column_id} twice", board.id),
                ));
            }
            match store.columns.get_by_id(column_id) {
                None => {
                    return Err(InvariantViolation::new(
                        "board_order",
                        format!("board {} lists missing column {column_id}", board.id),
                    ))
                }
                Some(column) if column.board_id != board.id => {
                    return Err(InvariantViolation::new(
                        "board_order",
                        format!(
                            "board {} lists column {column_id} owned by board {}",
                            board.id, column.board_id
                        ),
                    ))
                }
                Some(_) => {}
            }
        }
    }

    for column in store.columns.iter() {
        let Some(board) = store.boards.get_by_id(&column.board_id) else {
            return Err(InvariantViolation::new(
                "foreign_key",
                format!("column {} points at missing board {}", column.id, column.board_id),
            ));
        };
        if !board.column_ids.contains(&column.id) {
            return Err(InvariantViolation::new(
                "board_order",
                format!("column {} is not listed by board {}", column.id, board.id),
            ));
        }

        let mut seen = HashSet::new();
        for task_id in &column.task_ids {
            if !seen.insert(task_id) {
                return Err(InvariantViolation::new(
                    "column_order",
                    format!("column {} lists task {task_id} twice", column.id),
                ));
            }
            match store.tasks.get_by_id(task_id) {
                None => {
                    return Err(InvariantViolation::new(
                        "column_order",
                        format!("column {} lists missing task {task_id}", column.id),
                    ))
                }
                Some(task) if task.column != column.id => {
                    return Err(InvariantViolation::new(
                        "column_order",
                        format!(
                            "column {} lists task {task_id} owned by column {}",
                            column.id, task.column
                        ),
                    ))
                }
                Some(_) => {}
            }
        }
    }

    for task in store.tasks.iter() {
        let Some(column) = store.columns.get_by_id(&task.column) else {
            return Err(InvariantViolation::new(
                "foreign_key",
                format!("task {} points at missing column {}", task.id, task.column),
            ));
        };
        if !column.task_ids.contains(&task.id) {
            return Err(InvariantViolation::new(
                "column_order",
                format!("task {} is not listed by column {}", task.id, column.id),
            ));
        }
        if task.board != column.board_id {
            return Err(InvariantViolation::new(
                "foreign_key",
                format!(
                    "task {} claims board {} but its column belongs to {}",
                    task.id, task.board, column.board_id
                ),
            ));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::verify;
    use crate::model::board::Board;
    use crate::model::column::Column;
    use crate::model::id::{BoardId, ColumnId};
    use crate::store::EntityStore;

    #[test]
    fn empty_store_is_consistent() {
        assert!(verify(&EntityStore::new()).is_ok());
    }

    #[test]
    fn detects_unlisted_column() {
        let mut store = EntityStore::new();
        let board_id = BoardId::new("b1");
        store
            .boards
            .add(Board::new(board_id.clone(), "Board"))
            .expect("board add");
        store
            .columns
            .add(Column::new(ColumnId::new("c1"), "Todo", board_id))
            .expect("column add");

        let violation = verify(&store).expect_err("unlisted column must be reported");
        assert_eq!(violation.rule, "board_order");
    }
}
