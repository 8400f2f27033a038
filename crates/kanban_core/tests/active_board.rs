use kanban_core::{
    ActiveBoardProjection, BoardId, ColumnId, EngineConfig, KanbanEngine, NewBoard, NewColumn,
    NewTask, TaskId,
};

fn two_boards() -> (KanbanEngine, BoardId, BoardId) {
    let mut engine = KanbanEngine::new(EngineConfig::default());
    let launch = engine
        .board_added(NewBoard::titled("Launch").with_id(BoardId::new("launch")))
        .unwrap();
    let roadmap = engine
        .board_added(NewBoard::titled("Roadmap").with_id(BoardId::new("roadmap")))
        .unwrap();
    for (board, column) in [(&launch, "todo"), (&launch, "done"), (&roadmap, "later")] {
        engine
            .column_added(NewColumn::new(column, board.clone()).with_id(ColumnId::new(column)))
            .unwrap();
    }
    for (column, board, task) in [
        ("todo", &launch, "t1"),
        ("todo", &launch, "t2"),
        ("later", &roadmap, "t3"),
    ] {
        engine
            .task_added(
                NewTask::new(task, ColumnId::new(column), board.clone())
                    .with_id(TaskId::new(task)),
            )
            .unwrap();
    }
    (engine, launch, roadmap)
}

#[test]
fn projects_only_the_active_board() {
    let (engine, launch, _) = two_boards();
    let mut projection = ActiveBoardProjection::new();
    projection.refresh(&engine, Some(&launch));

    let columns = projection
        .columns()
        .iter()
        .map(|column| column.id.to_string())
        .collect::<Vec<_>>();
    assert_eq!(columns, ["todo", "done"]);
    assert_eq!(projection.tasks().len(), 2);
    assert!(projection.task(&TaskId::new("t3")).is_none());

    let todo_tasks = projection
        .column_tasks(&ColumnId::new("todo"))
        .into_iter()
        .map(|task| task.id.to_string())
        .collect::<Vec<_>>();
    assert_eq!(todo_tasks, ["t1", "t2"]);
}

#[test]
fn recomputes_on_selection_or_store_change_only() {
    let (mut engine, launch, roadmap) = two_boards();
    let mut projection = ActiveBoardProjection::new();

    projection.refresh(&engine, Some(&launch));
    projection.refresh(&engine, Some(&launch));
    assert_eq!(projection.recompute_count(), 1);

    projection.refresh(&engine, Some(&roadmap));
    assert_eq!(projection.recompute_count(), 2);
    assert_eq!(projection.columns().len(), 1);

    engine
        .task_moved(&TaskId::new("t2"), &ColumnId::new("todo"), 0)
        .unwrap();
    projection.refresh(&engine, Some(&roadmap));
    assert_eq!(projection.recompute_count(), 3);

    projection.refresh(&engine, None);
    assert!(projection.board().is_none());
    assert!(projection.columns().is_empty());
    assert_eq!(projection.recompute_count(), 4);
}

#[test]
fn reflects_reordered_tasks_after_refresh() {
    let (mut engine, launch, _) = two_boards();
    let mut projection = ActiveBoardProjection::new();
    projection.refresh(&engine, Some(&launch));

    engine
        .task_moved(&TaskId::new("t2"), &ColumnId::new("todo"), 0)
        .unwrap();
    assert!(projection.refresh(&engine, Some(&launch)));

    let order = projection
        .column_tasks(&ColumnId::new("todo"))
        .into_iter()
        .map(|task| task.id.to_string())
        .collect::<Vec<_>>();
    assert_eq!(order, ["t2", "t1"]);
}
