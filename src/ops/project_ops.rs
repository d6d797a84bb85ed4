use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_yaml::Value;

use crate::io::atomic::replace_file;
use crate::io::board_io::{BoardError, write_card};
use crate::io::task_store::TaskStoreError;
use crate::io::workspace_io::WorkspaceError;
use crate::model::project::ProjectRegistry;
use crate::model::task::Task;
use crate::model::workspace::Workspace;
use crate::parse::{parse_front_matter, render_front_matter};

/// Error type for project operations
#[derive(Debug, thiserror::Error)]
pub enum ProjectError {
    #[error("project not found: {0}")]
    NotFound(String),
    #[error("{0} has no directory")]
    Virtual(String),
    #[error("invalid project name: {0:?}")]
    InvalidName(String),
    #[error("destination already exists: {path}")]
    DestinationExists { path: PathBuf },
    #[error("{path}: {source}")]
    Io { path: PathBuf, source: io::Error },
    #[error(transparent)]
    Task(#[from] TaskStoreError),
    #[error(transparent)]
    Board(#[from] BoardError),
    #[error(transparent)]
    Workspace(#[from] WorkspaceError),
}

fn io_err(path: &Path) -> impl FnOnce(io::Error) -> ProjectError + '_ {
    move |source| ProjectError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// What a rename changed on disk
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RenameReport {
    /// The project directory after the rename, if it has one
    pub dir: Option<PathBuf>,
    /// Set when the directory was merged into an existing one
    pub merged: bool,
    /// Destination `.txt` files that had a source file appended
    pub appended: Vec<PathBuf>,
    /// Source files left in place because the name was taken
    pub skipped: Vec<PathBuf>,
    pub tasks_updated: usize,
    pub cards_updated: usize,
}

fn validate_name(name: &str) -> Result<(), ProjectError> {
    let ok = !name.is_empty()
        && !name.starts_with('.')
        && !name.contains(['/', '\\'])
        && !name.chars().any(char::is_whitespace);
    if ok {
        Ok(())
    } else {
        Err(ProjectError::InvalidName(name.to_string()))
    }
}

/// Rename project `old` to `new`, merging into `new` if it exists.
///
/// Not transactional: a failure part way leaves earlier steps applied.
/// Running the same rename again finishes the job, and a rename whose
/// source no longer exists does nothing.
pub fn rename_project(
    ws: &mut Workspace,
    old: &str,
    new: &str,
) -> Result<RenameReport, ProjectError> {
    validate_name(new)?;
    let mut report = RenameReport::default();
    if old == new {
        return Ok(report);
    }
    let Some(source) = ws.projects.get(old).cloned() else {
        tracing::debug!("rename {} -> {}: nothing named {}", old, new, old);
        return Ok(report);
    };
    let target_dir = ws.projects.get(new).and_then(|p| p.dir_path.clone());

    report.dir = target_dir.clone();
    if let Some(old_dir) = source.dir_path.as_deref() {
        let new_dir = match target_dir {
            Some(new_dir) => {
                merge_dirs(old_dir, &new_dir, &mut report)?;
                report.merged = true;
                new_dir
            }
            None => {
                let dest = old_dir.parent().unwrap_or(Path::new(".")).join(new);
                if dest.exists() {
                    return Err(ProjectError::DestinationExists { path: dest });
                }
                fs::rename(old_dir, &dest).map_err(io_err(old_dir))?;
                dest
            }
        };
        rename_index_note(&new_dir, old, new)?;
        report.dir = Some(new_dir);
        // Task files moved; positions must come from disk again
        ws.reload()?;
    }

    report.tasks_updated = rewrite_task_refs(ws, old, new)?;
    report.cards_updated = rewrite_card_refs(ws, old, new)?;
    ws.projects.rename_entry(old, new, report.dir.as_deref());

    tracing::info!(
        old,
        new,
        tasks = report.tasks_updated,
        cards = report.cards_updated,
        skipped = report.skipped.len(),
        "renamed project"
    );
    Ok(report)
}

/// `<dir>/<old>.md` becomes `<dir>/<new>.md` unless that already exists
fn rename_index_note(dir: &Path, old: &str, new: &str) -> Result<(), ProjectError> {
    let from = dir.join(format!("{}.md", old));
    let to = dir.join(format!("{}.md", new));
    if from.is_file() && !to.exists() {
        fs::rename(&from, &to).map_err(io_err(&from))?;
    }
    Ok(())
}

fn rewrite_task_refs(ws: &mut Workspace, old: &str, new: &str) -> Result<usize, ProjectError> {
    let mut changed: Vec<Task> = ws
        .tasks
        .iter()
        .filter(|t| t.has_project(old))
        .cloned()
        .collect();
    if changed.is_empty() {
        return Ok(0);
    }
    for task in &mut changed {
        task.rename_project(old, new);
    }
    let count = ws.store.update_all(&mut changed)?;
    for task in changed {
        if let Some(slot) = ws.tasks.iter_mut().find(|t| t.id == task.id) {
            *slot = task;
        }
    }
    Ok(count)
}

fn rewrite_card_refs(ws: &mut Workspace, old: &str, new: &str) -> Result<usize, ProjectError> {
    let mut count = 0;
    for board in &mut ws.boards {
        for ci in 0..board.columns.len() {
            for k in 0..board.columns[ci].cards.len() {
                let card = &board.columns[ci].cards[k];
                if !card.has_project(old) {
                    continue;
                }
                let mut updated = card.clone();
                if updated.has_project(new) {
                    updated.projects.retain(|p| p != old);
                } else {
                    for p in &mut updated.projects {
                        if p == old {
                            *p = new.to_string();
                        }
                    }
                }
                write_card(board, &updated)?;
                board.columns[ci].cards[k] = updated;
                count += 1;
            }
        }
    }
    Ok(count)
}

fn is_txt(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("txt"))
}

/// Move the contents of `src` into `dst`.
///
/// Same-named directories merge recursively and anything missing on the
/// destination side is moved over whole. A `.txt` file present on both
/// sides is appended to the destination and removed. Any other name
/// collision is left in `src` and listed in `report.skipped`. `src` is
/// removed once empty.
pub fn merge_dirs(src: &Path, dst: &Path, report: &mut RenameReport) -> Result<(), ProjectError> {
    let mut entries: Vec<fs::DirEntry> = fs::read_dir(src)
        .map_err(io_err(src))?
        .collect::<Result<_, _>>()
        .map_err(io_err(src))?;
    entries.sort_by_key(|e| e.file_name());

    for entry in entries {
        let from = entry.path();
        let to = dst.join(entry.file_name());
        let is_dir = entry.file_type().map_err(io_err(&from))?.is_dir();

        if !to.exists() {
            fs::rename(&from, &to).map_err(io_err(&from))?;
        } else if is_dir && to.is_dir() {
            merge_dirs(&from, &to, report)?;
        } else if !is_dir && to.is_file() && is_txt(&from) {
            append_file(&from, &to)?;
            fs::remove_file(&from).map_err(io_err(&from))?;
            report.appended.push(to);
        } else {
            tracing::warn!("merge: leaving {} in place, {} exists", from.display(), to.display());
            report.skipped.push(from);
        }
    }

    let empty = fs::read_dir(src).map_err(io_err(src))?.next().is_none();
    if empty {
        fs::remove_dir(src).map_err(io_err(src))?;
    }
    Ok(())
}

/// Append `from`'s bytes to `to`, starting on a fresh line
fn append_file(from: &Path, to: &Path) -> Result<(), ProjectError> {
    let bytes = fs::read(from).map_err(io_err(from))?;
    if bytes.is_empty() {
        return Ok(());
    }
    let existing = fs::read(to).map_err(io_err(to))?;
    let mut file = OpenOptions::new()
        .append(true)
        .open(to)
        .map_err(io_err(to))?;
    if !existing.is_empty() && !existing.ends_with(b"\n") {
        file.write_all(b"\n").map_err(io_err(to))?;
    }
    file.write_all(&bytes).map_err(io_err(to))
}

/// Directories new physical projects can be created in: every `projects`
/// directory holding an existing project, then `<root>/projects`
pub fn projects_dirs(root: &Path, projects: &ProjectRegistry) -> Vec<PathBuf> {
    let mut dirs: Vec<PathBuf> = Vec::new();
    for dir in projects.iter().filter_map(|p| p.dir_path.as_deref()) {
        let Some(parent) = dir.parent() else {
            continue;
        };
        if parent.file_name().is_some_and(|n| n == "projects") && !dirs.iter().any(|d| d == parent)
        {
            dirs.push(parent.to_path_buf());
        }
    }
    let fallback = root.join("projects");
    if !dirs.contains(&fallback) {
        dirs.push(fallback);
    }
    dirs
}

/// Persist a project's archived flag in its index note, creating the note
/// if needed. Other front-matter keys and the body are kept.
pub fn set_project_archived(
    ws: &mut Workspace,
    name: &str,
    archived: bool,
) -> Result<(), ProjectError> {
    let project = ws
        .projects
        .get(name)
        .ok_or_else(|| ProjectError::NotFound(name.to_string()))?;
    let path = project
        .index_note_path()
        .ok_or_else(|| ProjectError::Virtual(name.to_string()))?;

    let content = match fs::read_to_string(&path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => format!("# {}\n", name),
        Err(e) => return Err(io_err(&path)(e)),
    };
    let fm = parse_front_matter(&content);
    let mut meta = fm.meta.clone();
    if archived {
        meta.insert("archived".into(), Value::Bool(true));
    } else {
        meta.remove("archived");
    }
    replace_file(&path, render_front_matter(&meta, fm.body).as_bytes()).map_err(io_err(&path))?;
    ws.projects.set_archived(name, archived);
    Ok(())
}
