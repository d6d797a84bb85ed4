use std::fmt;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Tag key holding the due date
pub const DUE_KEY: &str = "due";
/// Tag key holding the scheduled date
pub const SCHEDULED_KEY: &str = "scheduled";
/// Tag key a completed task's priority is parked under
pub const PRIORITY_KEY: &str = "pri";
/// Date format used everywhere in task lines
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// One token of a task body in source order.
///
/// The parser records the layout so the serializer can put tags back
/// between the words they were written between.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BodyToken {
    Word,
    Project(String),
    Context(String),
    Tag(String),
}

/// A single todo.txt task
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// Stable id derived from `file` and `line` (empty until persisted)
    pub id: String,
    /// Task text with tag tokens stripped
    pub name: String,
    pub done: bool,
    /// Priority letter `A`-`Z`
    pub priority: Option<char>,
    pub created_date: Option<NaiveDate>,
    /// Only serialized when `done` is set
    pub completion_date: Option<NaiveDate>,
    /// `+project` tags, in first-seen order
    pub projects: IndexSet<String>,
    /// `@context` tags, in first-seen order
    pub contexts: IndexSet<String>,
    /// `key:value` tags, in first-seen order
    pub tags: IndexMap<String, String>,

    // --- Source tracking ---
    /// The `.txt` file this task lives in (None = not yet persisted)
    pub file: Option<PathBuf>,
    /// 0-indexed line within `file`
    pub line: Option<usize>,
    /// Token layout of the parsed body
    #[serde(skip)]
    pub(crate) layout: Vec<BodyToken>,
    /// The line as it was read, for detecting edits made on disk since
    #[serde(skip)]
    pub(crate) source_text: Option<String>,
}

impl Task {
    /// Create an unpersisted, pending task with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Task {
            id: String::new(),
            name: name.into(),
            done: false,
            priority: None,
            created_date: None,
            completion_date: None,
            projects: IndexSet::new(),
            contexts: IndexSet::new(),
            tags: IndexMap::new(),
            file: None,
            line: None,
            layout: Vec::new(),
            source_text: None,
        }
    }

    /// Attach the task to a position in a file and derive its id
    pub fn set_source(&mut self, file: &Path, line: usize) {
        self.id = task_id(file, line);
        self.file = Some(file.to_path_buf());
        self.line = Some(line);
    }

    pub fn is_persisted(&self) -> bool {
        self.file.is_some()
    }

    pub fn has_project(&self, name: &str) -> bool {
        self.projects.contains(name)
    }

    /// Add a `+project` tag. Returns false if it was already present.
    pub fn add_project(&mut self, name: &str) -> bool {
        self.projects.insert(name.to_string())
    }

    /// Remove a `+project` tag. Returns false if it was not present.
    pub fn remove_project(&mut self, name: &str) -> bool {
        self.projects.shift_remove(name)
    }

    /// Replace project `old` with `new`, keeping its place in the line.
    /// If `new` is already present, `old` is just dropped. Returns false if
    /// `old` was not present.
    pub fn rename_project(&mut self, old: &str, new: &str) -> bool {
        if !self.projects.contains(old) {
            return false;
        }
        if self.projects.contains(new) {
            self.projects.shift_remove(old);
            return true;
        }
        self.projects = self
            .projects
            .iter()
            .map(|p| if p == old { new.to_string() } else { p.clone() })
            .collect();
        for token in &mut self.layout {
            if let BodyToken::Project(name) = token
                && name == old
            {
                *name = new.to_string();
            }
        }
        true
    }

    /// Add a `@context` tag. Returns false if it was already present.
    pub fn add_context(&mut self, name: &str) -> bool {
        self.contexts.insert(name.to_string())
    }

    /// Remove a `@context` tag. Returns false if it was not present.
    pub fn remove_context(&mut self, name: &str) -> bool {
        self.contexts.shift_remove(name)
    }

    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(|s| s.as_str())
    }

    pub fn set_tag(&mut self, key: &str, value: &str) {
        self.tags.insert(key.to_string(), value.to_string());
    }

    pub fn remove_tag(&mut self, key: &str) -> Option<String> {
        self.tags.shift_remove(key)
    }

    pub fn due_date(&self) -> Option<NaiveDate> {
        self.date_tag(DUE_KEY)
    }

    pub fn set_due_date(&mut self, date: Option<NaiveDate>) {
        self.set_date_tag(DUE_KEY, date);
    }

    pub fn scheduled_date(&self) -> Option<NaiveDate> {
        self.date_tag(SCHEDULED_KEY)
    }

    pub fn set_scheduled_date(&mut self, date: Option<NaiveDate>) {
        self.set_date_tag(SCHEDULED_KEY, date);
    }

    /// Mark done on `today`. The priority moves to a `pri:` tag, as
    /// todo.txt convention has no priority on completed tasks.
    pub fn complete(&mut self, today: NaiveDate) {
        if self.done {
            return;
        }
        self.done = true;
        self.completion_date = Some(today);
        if let Some(p) = self.priority.take() {
            self.set_tag(PRIORITY_KEY, &p.to_string());
        }
    }

    /// Undo `complete`, restoring a parked priority
    pub fn reopen(&mut self) {
        if !self.done {
            return;
        }
        self.done = false;
        self.completion_date = None;
        if let Some(p) = self.remove_tag(PRIORITY_KEY) {
            self.priority = p.chars().next().filter(|c| c.is_ascii_uppercase());
        }
    }

    fn date_tag(&self, key: &str) -> Option<NaiveDate> {
        self.tag(key)
            .and_then(|v| NaiveDate::parse_from_str(v, DATE_FORMAT).ok())
    }

    fn set_date_tag(&mut self, key: &str, date: Option<NaiveDate>) {
        match date {
            Some(d) => self.set_tag(key, &d.format(DATE_FORMAT).to_string()),
            None => {
                self.remove_tag(key);
            }
        }
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&crate::parse::serialize_task(self))
    }
}

impl PartialEq for Task {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.done == other.done
            && self.priority == other.priority
            && self.created_date == other.created_date
            && self.completion_date == other.completion_date
            && self.projects == other.projects
            && self.contexts == other.contexts
            && self.tags == other.tags
    }
}

impl Eq for Task {}

/// Derive a task id from its position. Content is not hashed, so editing a
/// line in place keeps the id.
pub fn task_id(file: &Path, line: usize) -> String {
    let mut hasher = Sha256::new();
    hasher.update(file.to_string_lossy().as_bytes());
    hasher.update(b":");
    hasher.update(line.to_le_bytes());
    let digest = hasher.finalize();
    digest[..6].iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, DATE_FORMAT).unwrap()
    }

    #[test]
    fn test_project_set_semantics() {
        let mut task = Task::new("Write report");
        assert!(task.add_project("work"));
        assert!(!task.add_project("work"));
        assert_eq!(task.projects.len(), 1);
        assert!(!task.remove_project("home"));
        assert!(task.remove_project("work"));
        assert!(task.projects.is_empty());
    }

    #[test]
    fn test_context_set_semantics() {
        let mut task = Task::new("Call");
        assert!(task.add_context("phone"));
        assert!(!task.add_context("phone"));
        assert!(!task.remove_context("office"));
        assert_eq!(task.contexts.len(), 1);
    }

    #[test]
    fn test_due_and_scheduled_accessors() {
        let mut task = Task::new("Pay rent");
        assert_eq!(task.due_date(), None);
        task.set_due_date(Some(date("2026-02-06")));
        assert_eq!(task.tag("due"), Some("2026-02-06"));
        assert_eq!(task.due_date(), Some(date("2026-02-06")));
        task.set_scheduled_date(Some(date("2026-02-01")));
        assert_eq!(task.scheduled_date(), Some(date("2026-02-01")));
        task.set_due_date(None);
        assert_eq!(task.tag("due"), None);
    }

    #[test]
    fn test_unparsable_due_is_none() {
        let mut task = Task::new("x");
        task.set_tag("due", "tomorrow");
        assert_eq!(task.due_date(), None);
    }

    #[test]
    fn test_complete_parks_priority() {
        let mut task = Task::new("Ship it");
        task.priority = Some('A');
        task.complete(date("2026-02-06"));
        assert!(task.done);
        assert_eq!(task.priority, None);
        assert_eq!(task.tag("pri"), Some("A"));
        assert_eq!(task.completion_date, Some(date("2026-02-06")));

        task.reopen();
        assert!(!task.done);
        assert_eq!(task.priority, Some('A'));
        assert_eq!(task.completion_date, None);
    }

    #[test]
    fn test_task_id_is_positional() {
        let a = task_id(Path::new("/w/tasks/todo.txt"), 0);
        let b = task_id(Path::new("/w/tasks/todo.txt"), 1);
        let c = task_id(Path::new("/w/tasks/done.txt"), 0);
        assert_eq!(a, task_id(Path::new("/w/tasks/todo.txt"), 0));
        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 12);
    }

    #[test]
    fn test_rename_project_keeps_position() {
        let mut task = crate::parse::parse_task_line("Fix +old header @web").unwrap();
        assert!(task.rename_project("old", "new"));
        assert_eq!(task.to_string(), "Fix +new header @web");
        assert!(!task.rename_project("old", "new"));

        let mut both = crate::parse::parse_task_line("Fix +old +new").unwrap();
        assert!(both.rename_project("old", "new"));
        assert_eq!(both.to_string(), "Fix +new");
    }
}
