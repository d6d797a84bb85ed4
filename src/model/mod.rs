pub mod board;
pub mod config;
pub mod manifest;
pub mod note;
pub mod project;
pub mod task;
pub mod workspace;

pub use board::*;
pub use config::*;
pub use manifest::*;
pub use note::*;
pub use project::*;
pub use task::*;
pub use workspace::*;
