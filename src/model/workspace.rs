use std::path::PathBuf;

use super::board::{Board, CardRef};
use super::config::WorkspaceConfig;
use super::manifest::TaskDir;
use super::note::Note;
use super::project::ProjectRegistry;
use super::task::Task;
use crate::io::task_store::{TaskStore, TaskStoreError};

/// A fully loaded workspace snapshot.
///
/// Built fresh by every load; after mutating anything on disk, call
/// `reload` rather than patching the snapshot.
#[derive(Debug)]
pub struct Workspace {
    /// The scanned root directory
    pub root: PathBuf,
    pub config: WorkspaceConfig,
    pub boards: Vec<Board>,
    /// Tasks from every task file that loaded cleanly
    pub tasks: Vec<Task>,
    pub notes: Vec<Note>,
    pub projects: ProjectRegistry,
    /// Raw `tasks/` directory manifest
    pub task_dirs: Vec<TaskDir>,
    /// Task files that failed to load; their tasks are absent from `tasks`
    pub task_errors: Vec<TaskStoreError>,
    /// Owns the lock for task-file writes in this workspace
    pub store: TaskStore,
}

impl Workspace {
    /// Every card with its board and column
    pub fn cards(&self) -> impl Iterator<Item = CardRef<'_>> {
        self.boards.iter().flat_map(|b| b.cards())
    }

    pub fn pending_tasks(&self) -> impl Iterator<Item = &Task> {
        self.tasks.iter().filter(|t| !t.done)
    }

    pub fn done_tasks(&self) -> impl Iterator<Item = &Task> {
        self.tasks.iter().filter(|t| t.done)
    }

    pub fn find_task(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    /// Board whose directory name or title matches
    pub fn find_board(&self, name: &str) -> Option<&Board> {
        self.boards
            .iter()
            .find(|b| b.dir_name() == name || b.name == name)
    }

    pub fn find_board_mut(&mut self, name: &str) -> Option<&mut Board> {
        self.boards
            .iter_mut()
            .find(|b| b.dir_name() == name || b.name == name)
    }

    /// Tasks belonging to a project: tagged with it, or stored in one of
    /// its `tasks/` directories
    pub fn tasks_for_project<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Task> {
        let dirs: Vec<&PathBuf> = self
            .task_dirs
            .iter()
            .filter(|d| d.project.as_deref() == Some(name))
            .map(|d| &d.path)
            .collect();
        self.tasks.iter().filter(move |t| {
            t.has_project(name)
                || t
                    .file
                    .as_ref()
                    .and_then(|f| f.parent())
                    .is_some_and(|parent| dirs.iter().any(|d| d.as_path() == parent))
        })
    }

    /// Cards belonging to a project: tagged with it, or on one of its boards
    pub fn cards_for_project<'a>(&'a self, name: &'a str) -> impl Iterator<Item = CardRef<'a>> {
        self.cards().filter(move |c| {
            c.card.has_project(name) || c.board.project.as_deref() == Some(name)
        })
    }
}
