use std::path::PathBuf;

use serde::Serialize;

/// Everything a directory scan discovered, before any file is parsed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Manifest {
    pub boards: Vec<BoardEntry>,
    pub task_dirs: Vec<TaskDir>,
    pub projects: Vec<ProjectDir>,
    pub notes: Vec<NoteEntry>,
}

/// A directory containing `board.md`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BoardEntry {
    pub path: PathBuf,
    pub project: Option<String>,
}

/// A `tasks/` directory with at least one `.txt` file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskDir {
    pub path: PathBuf,
    /// File names, sorted
    pub txt_files: Vec<String>,
    pub project: Option<String>,
}

impl TaskDir {
    pub fn files(&self) -> impl Iterator<Item = PathBuf> + '_ {
        self.txt_files.iter().map(|f| self.path.join(f))
    }

    /// Case-insensitive lookup of an existing file name
    pub fn find_file(&self, name: &str) -> Option<PathBuf> {
        self.txt_files
            .iter()
            .find(|f| f.eq_ignore_ascii_case(name))
            .map(|f| self.path.join(f))
    }
}

/// A `projects/<name>/` directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectDir {
    pub name: String,
    pub path: PathBuf,
    pub parent: Option<String>,
}

/// A markdown file that may be a note
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NoteEntry {
    pub path: PathBuf,
    pub project: Option<String>,
}
