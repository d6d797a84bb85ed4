//! Workspace directory walk.
//!
//! The walk only classifies paths; nothing is parsed here. It runs against
//! a `DirSource` so tests can feed it an in-memory tree.

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::io;
use std::path::Path;

use crate::model::manifest::{BoardEntry, Manifest, NoteEntry, ProjectDir, TaskDir};

/// Directory names never descended into
pub const DEFAULT_SKIP: &[&str] = &[
    "node_modules",
    "vendor",
    "__pycache__",
    "target",
    "build",
    "dist",
];

/// How a directory is treated, decided by its name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirKind {
    /// Children with a `board.md` are boards
    Boards,
    /// `*.txt` children are task files
    Tasks,
    /// Each child directory is a project
    Projects,
    /// Only reached through a board
    Cards,
    /// Walked normally
    Plain,
}

/// The naming convention for workspace directories
pub fn classify_dir(name: &str) -> DirKind {
    match name {
        "boards" => DirKind::Boards,
        "tasks" => DirKind::Tasks,
        "projects" => DirKind::Projects,
        "cards" => DirKind::Cards,
        _ => DirKind::Plain,
    }
}

/// Options for a scan
#[derive(Debug, Clone)]
pub struct ScanOptions {
    pub skip: HashSet<String>,
    pub classify: fn(&str) -> DirKind,
}

impl Default for ScanOptions {
    fn default() -> Self {
        ScanOptions {
            skip: DEFAULT_SKIP.iter().map(|s| s.to_string()).collect(),
            classify: classify_dir,
        }
    }
}

impl ScanOptions {
    /// Default options plus extra directory names to skip
    pub fn with_skips<I, S>(extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut options = ScanOptions::default();
        options.skip.extend(extra.into_iter().map(Into::into));
        options
    }
}

/// One directory entry as seen by the scanner
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntryInfo {
    pub name: String,
    pub is_dir: bool,
}

/// Read-only view of a directory tree
pub trait DirSource {
    fn read_dir(&self, path: &Path) -> io::Result<Vec<DirEntryInfo>>;
    fn is_file(&self, path: &Path) -> bool;
}

/// The real filesystem. Symlinked directories are not followed.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsSource;

impl DirSource for FsSource {
    fn read_dir(&self, path: &Path) -> io::Result<Vec<DirEntryInfo>> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(path)? {
            let entry = entry?;
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
            entries.push(DirEntryInfo { name, is_dir });
        }
        Ok(entries)
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }
}

/// Scan a workspace root on disk
pub fn scan_workspace(root: &Path, options: &ScanOptions) -> Manifest {
    scan_with(&FsSource, root, options)
}

/// Scan using any directory source. A missing root gives an empty
/// manifest; unreadable subtrees are skipped.
pub fn scan_with(src: &impl DirSource, root: &Path, options: &ScanOptions) -> Manifest {
    let mut manifest = Manifest::default();
    let mut scanner = Scanner {
        src,
        options,
        manifest: &mut manifest,
    };
    scanner.walk(root, None);
    manifest
}

struct Scanner<'a, S: DirSource> {
    src: &'a S,
    options: &'a ScanOptions,
    manifest: &'a mut Manifest,
}

impl<S: DirSource> Scanner<'_, S> {
    /// Visible entries of `dir`, sorted by name, or None if unreadable
    fn entries(&self, dir: &Path) -> Option<Vec<DirEntryInfo>> {
        match self.src.read_dir(dir) {
            Ok(entries) => {
                let sorted: BTreeMap<String, DirEntryInfo> = entries
                    .into_iter()
                    .filter(|e| !e.name.starts_with('.'))
                    .filter(|e| !(e.is_dir && self.options.skip.contains(&e.name)))
                    .map(|e| (e.name.clone(), e))
                    .collect();
                Some(sorted.into_values().collect())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => {
                tracing::warn!("skipping {}: {}", dir.display(), e);
                None
            }
        }
    }

    fn walk(&mut self, dir: &Path, project: Option<&str>) {
        let Some(entries) = self.entries(dir) else {
            return;
        };
        for entry in entries {
            let path = dir.join(&entry.name);
            if entry.is_dir {
                match (self.options.classify)(&entry.name) {
                    DirKind::Boards => self.scan_boards(&path, project),
                    DirKind::Tasks => self.scan_tasks(&path, project),
                    DirKind::Projects => self.scan_projects(&path, project),
                    DirKind::Cards => {}
                    DirKind::Plain => self.walk(&path, project),
                }
            } else if is_note_candidate(dir, &entry.name) {
                self.manifest.notes.push(NoteEntry {
                    path,
                    project: project.map(str::to_string),
                });
            }
        }
    }

    fn scan_boards(&mut self, dir: &Path, project: Option<&str>) {
        let Some(entries) = self.entries(dir) else {
            return;
        };
        for entry in entries.into_iter().filter(|e| e.is_dir) {
            let path = dir.join(&entry.name);
            if self.src.is_file(&path.join("board.md")) {
                self.manifest.boards.push(BoardEntry {
                    path,
                    project: project.map(str::to_string),
                });
            }
        }
    }

    fn scan_tasks(&mut self, dir: &Path, project: Option<&str>) {
        let Some(entries) = self.entries(dir) else {
            return;
        };
        let txt_files: Vec<String> = entries
            .into_iter()
            .filter(|e| !e.is_dir && has_extension(&e.name, "txt"))
            .map(|e| e.name)
            .collect();
        if !txt_files.is_empty() {
            self.manifest.task_dirs.push(TaskDir {
                path: dir.to_path_buf(),
                txt_files,
                project: project.map(str::to_string),
            });
        }
    }

    fn scan_projects(&mut self, dir: &Path, parent: Option<&str>) {
        let Some(entries) = self.entries(dir) else {
            return;
        };
        for entry in entries.into_iter().filter(|e| e.is_dir) {
            let path = dir.join(&entry.name);
            self.manifest.projects.push(ProjectDir {
                name: entry.name.clone(),
                path: path.clone(),
                parent: parent.map(str::to_string),
            });
            self.walk(&path, Some(&entry.name));
        }
    }
}

fn has_extension(name: &str, ext: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(ext))
}

/// Markdown outside board indexes, card directories and project index notes
fn is_note_candidate(dir: &Path, name: &str) -> bool {
    if !has_extension(name, "md") || name == "board.md" {
        return false;
    }
    let dir_name = dir.file_name().and_then(|n| n.to_str()).unwrap_or("");
    if dir_name == "cards" {
        return false;
    }
    !is_project_index_note(dir, name)
}

/// `projects/<name>/<name>.md`
pub fn is_project_index_note(dir: &Path, name: &str) -> bool {
    let dir_name = dir.file_name().and_then(|n| n.to_str());
    let parent_name = dir
        .parent()
        .and_then(|p| p.file_name())
        .and_then(|n| n.to_str());
    let stem = Path::new(name).file_stem().and_then(|s| s.to_str());
    parent_name == Some("projects") && dir_name.is_some() && dir_name == stem
}
