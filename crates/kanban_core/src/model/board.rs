use crate::model::id::{BoardId, ColumnId};
use crate::model::{Entity, EntityKind};
use serde::{Deserialize, Serialize};

/// Top-level container owning the order of its columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Board {
    pub id: BoardId,
    pub title: String,
    pub column_ids: Vec<ColumnId>,
}

impl Board {
    pub fn new(id: BoardId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            column_ids: Vec::new(),
        }
    }
}

/// Partial board update. `column_ids` may only reorder existing columns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BoardPatch {
    pub title: Option<String>,
    pub column_ids: Option<Vec<ColumnId>>,
}

impl BoardPatch {
    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Self::default()
        }
    }
}

impl Entity for Board {
    type Id = BoardId;
    type Patch = BoardPatch;

    const KIND: EntityKind = EntityKind::Board;

    fn id(&self) -> &BoardId {
        &self.id
    }

    fn merge(&mut self, patch: BoardPatch) {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(column_ids) = patch.column_ids {
            self.column_ids = column_ids;
        }
    }
}
