pub mod agenda;
pub mod board_ops;
pub mod project_ops;
pub mod search;
pub mod task_ops;
