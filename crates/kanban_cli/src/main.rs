//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `kanban_core` linkage with deterministic output.
//! - Summarize a boards snapshot file passed as the first argument.
//!
//! Usage: `kanban_cli [snapshot.json] [config.json]`

use kanban_core::{BoardsSnapshot, KanbanClient, KanbanConfig};
use std::process::ExitCode;

fn main() -> ExitCode {
    println!("kanban_core ping={}", kanban_core::ping());
    println!("kanban_core version={}", kanban_core::core_version());

    let mut args = std::env::args().skip(1);
    let Some(snapshot_path) = args.next() else {
        return ExitCode::SUCCESS;
    };
    match summarize(&snapshot_path, args.next().as_deref()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("error: {message}");
            ExitCode::FAILURE
        }
    }
}

fn summarize(snapshot_path: &str, config_path: Option<&str>) -> Result<(), String> {
    let config = match config_path {
        Some(path) => KanbanConfig::load(path).map_err(|err| err.to_string())?,
        None => KanbanConfig::default(),
    };
    if let Err(err) = kanban_core::init_logging(&config.logging) {
        eprintln!("warning: logging disabled: {err}");
    }

    let snapshot = BoardsSnapshot::read(snapshot_path).map_err(|err| err.to_string())?;
    let mut client = KanbanClient::new(&config);
    let summary = client
        .load_snapshot(&snapshot)
        .map_err(|err| err.to_string())?;
    println!(
        "loaded boards={} columns={} tasks={}",
        summary.boards.len(),
        summary.columns.len(),
        summary.tasks.len()
    );

    let engine = client.engine();
    for board in engine.all_boards() {
        println!("board {} \"{}\"", board.id, board.title);
        for column in engine.columns_for_board(&board.id) {
            println!("  column \"{}\" tasks={}", column.title, column.task_ids.len());
        }
    }
    if let Err(violation) = engine.verify() {
        return Err(format!("loaded state is inconsistent: {violation}"));
    }
    Ok(())
}
