//! Flutter bridge surface for the Kanban core.

pub mod api;
