//! Reading and writing todo.txt files.
//!
//! Writes are line-level: only the lines belonging to the tasks being
//! changed are replaced, and everything else in the file (blank lines,
//! line endings, a missing final newline) is written back as it was read.
//! Every read-modify-write cycle runs under the store's lock.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use chrono::{Local, NaiveDate};

use crate::io::atomic::replace_file;
use crate::model::config::TasksConfig;
use crate::model::manifest::TaskDir;
use crate::model::task::{Task, task_id};
use crate::parse::{TaskParseError, parse_task_line, parse_task_text, serialize_task};

/// Error type for task file operations
#[derive(Debug, thiserror::Error)]
pub enum TaskStoreError {
    /// A line that would not be written back unchanged. The whole file is
    /// refused so a later save cannot rewrite it.
    #[error("{path}:{}: {source}", .line + 1)]
    Mismatch {
        path: PathBuf,
        line: usize,
        source: TaskParseError,
    },
    #[error("task not found: {0}")]
    NotFound(String),
    #[error("{path}:{}: line changed on disk since it was loaded", .line + 1)]
    Stale { path: PathBuf, line: usize },
    #[error("task has not been saved to a file")]
    NotPersisted,
    #[error("invalid task text: {0}")]
    InvalidText(TaskParseError),
    #[error("could not read {path}: {source}")]
    ReadError { path: PathBuf, source: io::Error },
    #[error("could not write {path}: {source}")]
    WriteError { path: PathBuf, source: io::Error },
}

/// Result of loading every task file
#[derive(Debug, Default)]
pub struct LoadedTasks {
    pub tasks: Vec<Task>,
    /// One entry per file that was refused
    pub errors: Vec<TaskStoreError>,
}

/// The task operations the CLI depends on
pub trait TaskService {
    fn list(&self) -> LoadedTasks;
    /// Append a task parsed from `text`, to `file` or the default file
    fn add(&self, text: &str, file: Option<&Path>) -> Result<Task, TaskStoreError>;
    fn complete(&self, id: &str) -> Result<Task, TaskStoreError>;
    fn delete(&self, id: &str) -> Result<Task, TaskStoreError>;
    /// Move completed tasks into each directory's done file
    fn archive(&self) -> Result<usize, TaskStoreError>;
    /// Pick up task files created or removed since the last scan
    fn reload(&mut self) -> Result<(), TaskStoreError>;
}

/// Raw lines of one task file, each with the terminator it was read with
#[derive(Debug, Clone, PartialEq, Eq)]
struct TaskFile {
    lines: Vec<String>,
    /// `"\r\n"`, `"\n"`, or `""` for a last line without one
    endings: Vec<&'static str>,
}

impl TaskFile {
    fn from_text(text: &str) -> Self {
        let mut file = TaskFile {
            lines: Vec::new(),
            endings: Vec::new(),
        };
        for chunk in text.split_inclusive('\n') {
            let (line, ending) = if let Some(line) = chunk.strip_suffix("\r\n") {
                (line, "\r\n")
            } else if let Some(line) = chunk.strip_suffix('\n') {
                (line, "\n")
            } else {
                (chunk, "")
            };
            file.lines.push(line.to_string());
            file.endings.push(ending);
        }
        file
    }

    /// A missing file reads as empty
    fn read(path: &Path) -> Result<Self, TaskStoreError> {
        match fs::read_to_string(path) {
            Ok(text) => Ok(TaskFile::from_text(&text)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(TaskFile::from_text("")),
            Err(e) => Err(TaskStoreError::ReadError {
                path: path.to_path_buf(),
                source: e,
            }),
        }
    }

    fn render(&self) -> String {
        let mut out = String::new();
        for (line, ending) in self.lines.iter().zip(&self.endings) {
            out.push_str(line);
            out.push_str(ending);
        }
        out
    }

    fn write(&self, path: &Path) -> Result<(), TaskStoreError> {
        replace_file(path, self.render().as_bytes()).map_err(|e| TaskStoreError::WriteError {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// The terminator new lines get: the file's first one, else `\n`
    fn default_ending(&self) -> &'static str {
        self.endings
            .iter()
            .copied()
            .find(|e| !e.is_empty())
            .unwrap_or("\n")
    }

    fn push(&mut self, line: String) {
        let ending = self.default_ending();
        if let Some(last) = self.endings.last_mut()
            && last.is_empty()
        {
            *last = ending;
        }
        self.lines.push(line);
        self.endings.push(ending);
    }

    /// Remove a line. Removing the last line hands its terminator to the
    /// new last line, so a missing final newline stays missing.
    fn remove(&mut self, index: usize) -> String {
        let ending = self.endings.remove(index);
        if index == self.endings.len()
            && let Some(last) = self.endings.last_mut()
        {
            *last = ending;
        }
        self.lines.remove(index)
    }

    fn is_task_line(&self, index: usize) -> bool {
        self.lines
            .get(index)
            .is_some_and(|l| !l.trim().is_empty())
    }

    /// Index of the task line whose positional id is `id`
    fn find_id(&self, path: &Path, id: &str) -> Option<usize> {
        (0..self.lines.len()).find(|&i| self.is_task_line(i) && task_id(path, i) == id)
    }

    fn parse_line(&self, path: &Path, index: usize) -> Result<Task, TaskStoreError> {
        let mut task =
            parse_task_line(&self.lines[index]).map_err(|source| TaskStoreError::Mismatch {
                path: path.to_path_buf(),
                line: index,
                source,
            })?;
        task.set_source(path, index);
        Ok(task)
    }

    fn parse_all(&self, path: &Path) -> Result<Vec<Task>, TaskStoreError> {
        (0..self.lines.len())
            .filter(|&i| self.is_task_line(i))
            .map(|i| self.parse_line(path, i))
            .collect()
    }

    /// Fails if the line no longer holds what `task` was loaded from
    fn check_unchanged(&self, path: &Path, task: &Task) -> Result<usize, TaskStoreError> {
        let index = task.line.ok_or(TaskStoreError::NotPersisted)?;
        let current = self.lines.get(index).map(String::as_str);
        if current.is_none() || current != task.source_text.as_deref() {
            return Err(TaskStoreError::Stale {
                path: path.to_path_buf(),
                line: index,
            });
        }
        Ok(index)
    }
}

/// One file's contents before and after a multi-file change
#[derive(Debug)]
struct Rewrite {
    path: PathBuf,
    before: TaskFile,
    after: TaskFile,
}

/// Write each file in order. If one write fails, the files already
/// written get their previous contents back.
fn write_or_restore(rewrites: &[Rewrite]) -> Result<(), TaskStoreError> {
    for (i, rewrite) in rewrites.iter().enumerate() {
        if let Err(e) = rewrite.after.write(&rewrite.path) {
            for written in rewrites[..i].iter().rev() {
                if let Err(undo) = written.before.write(&written.path) {
                    tracing::error!("could not restore {}: {}", written.path.display(), undo);
                }
            }
            return Err(e);
        }
    }
    Ok(())
}

/// Load every task in one file. Blank lines are skipped but keep their
/// line numbers.
pub fn load_task_file(path: &Path) -> Result<Vec<Task>, TaskStoreError> {
    TaskFile::read(path)?.parse_all(path)
}

/// Task files of a workspace and the lock that serializes writes to them
#[derive(Debug)]
pub struct TaskStore {
    root: PathBuf,
    dirs: Vec<TaskDir>,
    config: TasksConfig,
    lock: Mutex<()>,
}

impl TaskStore {
    pub fn new(root: &Path, dirs: Vec<TaskDir>, config: TasksConfig) -> Self {
        TaskStore {
            root: root.to_path_buf(),
            dirs,
            config,
            lock: Mutex::new(()),
        }
    }

    pub fn dirs(&self) -> &[TaskDir] {
        &self.dirs
    }

    fn guard(&self) -> MutexGuard<'_, ()> {
        self.lock.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// The workspace-level `tasks/` directory, whether or not it exists yet
    fn default_dir(&self) -> PathBuf {
        let root_tasks = self.root.join("tasks");
        self.dirs
            .iter()
            .find(|d| d.path == root_tasks)
            .or_else(|| self.dirs.iter().find(|d| d.project.is_none()))
            .map(|d| d.path.clone())
            .unwrap_or(root_tasks)
    }

    /// `name` inside `dir`, reusing an existing file whose name differs
    /// only in case
    fn file_in(&self, dir: &Path, name: &str) -> PathBuf {
        self.dirs
            .iter()
            .find(|d| d.path == dir)
            .and_then(|d| d.find_file(name))
            .unwrap_or_else(|| dir.join(name))
    }

    /// Where `add` writes when no file is given
    pub fn default_file(&self) -> PathBuf {
        self.file_in(&self.default_dir(), &self.config.default_file)
    }

    /// The archive target for a task directory
    pub fn done_file(&self, dir: &Path) -> PathBuf {
        self.file_in(dir, &self.config.done_file)
    }

    /// Every known task file, plus the default file once it exists
    pub fn files(&self) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = self.dirs.iter().flat_map(|d| d.files()).collect();
        let default = self.default_file();
        if !files.contains(&default) && default.is_file() {
            files.push(default);
        }
        files
    }

    pub fn load_all(&self) -> LoadedTasks {
        let _guard = self.guard();
        let mut loaded = LoadedTasks::default();
        for path in self.files() {
            match load_task_file(&path) {
                Ok(tasks) => loaded.tasks.extend(tasks),
                Err(e) => {
                    tracing::warn!("skipping task file: {}", e);
                    loaded.errors.push(e);
                }
            }
        }
        loaded
    }

    /// Look up one task by id, reading only as far as the file holding it
    pub fn find(&self, id: &str) -> Result<Task, TaskStoreError> {
        let _guard = self.guard();
        let (path, file, index) = self.locate(id)?;
        file.parse_line(&path, index)
    }

    fn locate(&self, id: &str) -> Result<(PathBuf, TaskFile, usize), TaskStoreError> {
        for path in self.files() {
            let file = TaskFile::read(&path)?;
            if let Some(index) = file.find_id(&path, id) {
                return Ok((path, file, index));
            }
        }
        Err(TaskStoreError::NotFound(id.to_string()))
    }

    /// Append `task` to `file` (or the default file), creating it if needed.
    /// On success the task carries its new position and id.
    pub fn add_task(&self, task: &mut Task, file: Option<&Path>) -> Result<(), TaskStoreError> {
        let _guard = self.guard();
        let path = file.map(Path::to_path_buf).unwrap_or_else(|| self.default_file());
        let mut contents = TaskFile::read(&path)?;
        let line = serialize_task(task);
        contents.push(line.clone());
        contents.write(&path)?;
        task.set_source(&path, contents.lines.len() - 1);
        task.source_text = Some(line);
        tracing::debug!(id = %task.id, path = %path.display(), "added task");
        Ok(())
    }

    /// Write back a task changed in memory
    pub fn update(&self, task: &mut Task) -> Result<(), TaskStoreError> {
        self.update_all(std::slice::from_mut(task)).map(|_| ())
    }

    /// Write back a set of changed tasks, one write per file. A file is
    /// only written if none of its lines changed on disk since loading.
    pub fn update_all(&self, tasks: &mut [Task]) -> Result<usize, TaskStoreError> {
        let _guard = self.guard();
        let mut by_file: BTreeMap<PathBuf, Vec<usize>> = BTreeMap::new();
        for (i, task) in tasks.iter().enumerate() {
            let path = task.file.clone().ok_or(TaskStoreError::NotPersisted)?;
            by_file.entry(path).or_default().push(i);
        }

        let mut written = 0;
        for (path, indices) in by_file {
            let mut contents = TaskFile::read(&path)?;
            for &i in &indices {
                contents.check_unchanged(&path, &tasks[i])?;
            }
            let mut new_lines = Vec::with_capacity(indices.len());
            for &i in &indices {
                let line = serialize_task(&tasks[i]);
                if let Some(index) = tasks[i].line {
                    contents.lines[index] = line.clone();
                }
                new_lines.push((i, line));
            }
            contents.write(&path)?;
            for (i, line) in new_lines {
                tasks[i].source_text = Some(line);
                written += 1;
            }
        }
        Ok(written)
    }

    /// Delete a task's line. Tasks below it move up a line and get new ids.
    pub fn remove(&self, task: &Task) -> Result<(), TaskStoreError> {
        let _guard = self.guard();
        let path = task.file.as_deref().ok_or(TaskStoreError::NotPersisted)?;
        let mut contents = TaskFile::read(path)?;
        let index = contents.check_unchanged(path, task)?;
        contents.remove(index);
        contents.write(path)
    }

    /// Mark the task with `id` done as of `today`
    pub fn complete_task(&self, id: &str, today: NaiveDate) -> Result<Task, TaskStoreError> {
        let _guard = self.guard();
        let (path, mut contents, index) = self.locate(id)?;
        let mut task = contents.parse_line(&path, index)?;
        task.complete(today);
        let line = serialize_task(&task);
        contents.lines[index] = line.clone();
        contents.write(&path)?;
        task.source_text = Some(line);
        Ok(task)
    }

    /// Delete the task with `id`, returning it as it was
    pub fn delete_task(&self, id: &str) -> Result<Task, TaskStoreError> {
        let _guard = self.guard();
        let (path, mut contents, index) = self.locate(id)?;
        let task = contents.parse_line(&path, index)?;
        contents.remove(index);
        contents.write(&path)?;
        Ok(task)
    }

    /// Move completed tasks from every file of a task directory into that
    /// directory's done file. Files that fail to parse are left alone.
    pub fn archive_done(&self) -> Result<usize, TaskStoreError> {
        let _guard = self.guard();
        let mut moved = 0;
        for dir in &self.dirs {
            let done_path = self.done_file(&dir.path);
            let mut archived = Vec::new();
            let mut rewrites = Vec::new();
            for path in dir.files().filter(|p| *p != done_path) {
                let mut contents = TaskFile::read(&path)?;
                let tasks = match contents.parse_all(&path) {
                    Ok(tasks) => tasks,
                    Err(e) => {
                        tracing::warn!("not archiving from {}: {}", path.display(), e);
                        continue;
                    }
                };
                let done_lines: Vec<usize> =
                    tasks.iter().filter(|t| t.done).filter_map(|t| t.line).collect();
                if done_lines.is_empty() {
                    continue;
                }
                let before = contents.clone();
                for &index in done_lines.iter().rev() {
                    archived.push((path.clone(), index, contents.remove(index)));
                }
                rewrites.push(Rewrite {
                    path,
                    before,
                    after: contents,
                });
            }
            if archived.is_empty() {
                continue;
            }
            // Source order: by file, then by line
            archived.sort();

            let mut done = TaskFile::read(&done_path)?;
            let done_before = done.clone();
            for (_, _, line) in archived.iter() {
                done.push(line.clone());
            }
            // Done file last; sources are restored if any write fails
            rewrites.push(Rewrite {
                path: done_path,
                before: done_before,
                after: done,
            });
            write_or_restore(&rewrites)?;
            tracing::info!(count = archived.len(), dir = %dir.path.display(), "archived tasks");
            moved += archived.len();
        }
        Ok(moved)
    }

    /// Re-list the `.txt` files of the known task directories
    pub fn rescan(&mut self) -> Result<(), TaskStoreError> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        for dir in &mut self.dirs {
            let entries = match fs::read_dir(&dir.path) {
                Ok(entries) => entries,
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    dir.txt_files.clear();
                    continue;
                }
                Err(e) => {
                    return Err(TaskStoreError::ReadError {
                        path: dir.path.clone(),
                        source: e,
                    });
                }
            };
            let mut files: Vec<String> = entries
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_ok_and(|t| t.is_file()))
                .filter_map(|e| e.file_name().into_string().ok())
                .filter(|name| !name.starts_with('.'))
                .filter(|name| {
                    Path::new(name)
                        .extension()
                        .and_then(|e| e.to_str())
                        .is_some_and(|e| e.eq_ignore_ascii_case("txt"))
                })
                .collect();
            files.sort();
            dir.txt_files = files;
        }
        Ok(())
    }
}

impl TaskService for TaskStore {
    fn list(&self) -> LoadedTasks {
        self.load_all()
    }

    fn add(&self, text: &str, file: Option<&Path>) -> Result<Task, TaskStoreError> {
        let mut task = parse_task_text(text).map_err(TaskStoreError::InvalidText)?;
        if task.created_date.is_none() && !task.done {
            task.created_date = Some(Local::now().date_naive());
        }
        self.add_task(&mut task, file)?;
        Ok(task)
    }

    fn complete(&self, id: &str) -> Result<Task, TaskStoreError> {
        self.complete_task(id, Local::now().date_naive())
    }

    fn delete(&self, id: &str) -> Result<Task, TaskStoreError> {
        self.delete_task(id)
    }

    fn archive(&self) -> Result<usize, TaskStoreError> {
        self.archive_done()
    }

    fn reload(&mut self) -> Result<(), TaskStoreError> {
        self.rescan()
    }
}
