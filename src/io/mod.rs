pub mod atomic;
pub mod board_io;
pub mod config_io;
pub mod note_io;
pub mod scanner;
pub mod task_store;
pub mod workspace_io;
