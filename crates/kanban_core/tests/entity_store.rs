use kanban_core::{
    Board, BoardId, BoardPatch, Column, ColumnId, EntityCollection, EntityKind, EntityStore,
    StoreError,
};

fn board(id: &str) -> Board {
    Board::new(BoardId::new(id), format!("Board {id}"))
}

#[test]
fn enumeration_follows_insertion_order_after_removals() {
    let mut boards = EntityCollection::<Board>::new();
    for id in ["b3", "b1", "b2", "b4"] {
        boards.add(board(id)).unwrap();
    }

    boards.remove_by_id(&BoardId::new("b1")).unwrap();
    boards.add(board("b1")).unwrap();

    let ids = boards
        .get_all()
        .into_iter()
        .map(|board| board.id.to_string())
        .collect::<Vec<_>>();
    assert_eq!(ids, ["b3", "b2", "b4", "b1"]);
    assert_eq!(boards.ids().len(), 4);
}

#[test]
fn update_merges_only_present_fields() {
    let mut boards = EntityCollection::<Board>::new();
    let mut original = board("b1");
    original.column_ids = vec![ColumnId::new("c1")];
    boards.add(original).unwrap();

    boards
        .update_by_id(&BoardId::new("b1"), BoardPatch::title("Renamed"))
        .unwrap();

    let stored = boards.get_by_id(&BoardId::new("b1")).unwrap();
    assert_eq!(stored.title, "Renamed");
    assert_eq!(stored.column_ids, vec![ColumnId::new("c1")]);
}

#[test]
fn missing_ids_fail_with_kind() {
    let mut columns = EntityCollection::<Column>::new();
    let err = columns
        .remove_by_id(&ColumnId::new("ghost"))
        .unwrap_err();
    assert_eq!(
        err,
        StoreError::NotFound {
            kind: EntityKind::Column,
            id: "ghost".to_string()
        }
    );
    assert_eq!(columns.revision(), 0);
}

#[test]
fn store_revision_tracks_each_collection() {
    let mut store = EntityStore::new();
    assert!(store.is_empty());
    let start = store.revision();

    store.boards.add(board("b1")).unwrap();
    let after = store.revision();

    assert_eq!(after.boards, start.boards + 1);
    assert_eq!(after.columns, start.columns);
    assert_eq!(after.tasks, start.tasks);
    assert!(!store.is_empty());
}
