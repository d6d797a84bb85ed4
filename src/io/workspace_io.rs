use std::fs;
use std::path::Path;

use crate::io::board_io::load_boards;
use crate::io::config_io::{ConfigError, read_config};
use crate::io::note_io::load_notes;
use crate::io::scanner::{ScanOptions, scan_workspace};
use crate::io::task_store::{LoadedTasks, TaskStore};
use crate::model::config::WorkspaceConfig;
use crate::model::project::ProjectRegistry;
use crate::model::workspace::Workspace;
use crate::parse::frontmatter::{get_bool, parse_front_matter};

/// Error type for loading a workspace
#[derive(Debug, thiserror::Error)]
pub enum WorkspaceError {
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Load a workspace, reading `.workdesk.toml` from its root first
pub fn load_workspace(root: &Path) -> Result<Workspace, WorkspaceError> {
    let config = read_config(root)?;
    Ok(load_with_config(root, config))
}

/// Scan and load everything under `root`. Files that fail to load are
/// skipped; task files that fail are listed in `task_errors`.
pub fn load_with_config(root: &Path, config: WorkspaceConfig) -> Workspace {
    let options = ScanOptions::with_skips(config.scan.skip.iter().cloned());
    let manifest = scan_workspace(root, &options);

    let boards = load_boards(&manifest.boards);
    let store = TaskStore::new(root, manifest.task_dirs.clone(), config.tasks.clone());
    let LoadedTasks { tasks, errors } = store.load_all();
    let notes = load_notes(root, &manifest.notes);

    let mut projects = ProjectRegistry::build(&manifest.projects, &tasks, &boards);
    read_archived_flags(&mut projects);

    tracing::info!(
        root = %root.display(),
        boards = boards.len(),
        tasks = tasks.len(),
        notes = notes.len(),
        projects = projects.len(),
        "loaded workspace"
    );

    Workspace {
        root: root.to_path_buf(),
        config,
        boards,
        tasks,
        notes,
        projects,
        task_dirs: manifest.task_dirs,
        task_errors: errors,
        store,
    }
}

/// A project is archived when its index note says `archived: true`
fn read_archived_flags(projects: &mut ProjectRegistry) {
    let notes: Vec<(String, std::path::PathBuf)> = projects
        .iter()
        .filter_map(|p| p.index_note_path().map(|path| (p.name.clone(), path)))
        .collect();
    for (name, path) in notes {
        let Ok(content) = fs::read_to_string(&path) else {
            continue;
        };
        let fm = parse_front_matter(&content);
        projects.set_archived(&name, get_bool(&fm.meta, "archived"));
    }
}

impl Workspace {
    /// Load the workspace rooted at `root`
    pub fn load(root: &Path) -> Result<Self, WorkspaceError> {
        load_workspace(root)
    }

    /// Replace this snapshot with a fresh load of the same root
    pub fn reload(&mut self) -> Result<(), WorkspaceError> {
        *self = load_workspace(&self.root)?;
        Ok(())
    }
}
