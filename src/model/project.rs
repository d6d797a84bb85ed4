use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::Serialize;

use super::board::{Board, CardRef};
use super::manifest::ProjectDir;
use super::task::Task;

/// A project known to a workspace
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Project {
    /// Identity; case-sensitive
    pub name: String,
    /// Backing directory (None = virtual, known only from tags)
    pub dir_path: Option<PathBuf>,
    /// Enclosing project
    pub parent: Option<String>,
    /// Filled in after every entry exists
    pub children: Vec<String>,
    /// Persisted in the project index note
    pub archived: bool,
}

impl Project {
    fn new(name: &str) -> Self {
        Project {
            name: name.to_string(),
            dir_path: None,
            parent: None,
            children: Vec::new(),
            archived: false,
        }
    }

    pub fn is_virtual(&self) -> bool {
        self.dir_path.is_none()
    }

    /// `<dir>/<name>.md`, the note holding the archived flag
    pub fn index_note_path(&self) -> Option<PathBuf> {
        self.dir_path
            .as_ref()
            .map(|dir| dir.join(format!("{}.md", self.name)))
    }
}

/// Deduplicated project graph for one workspace.
///
/// Holds identity and metadata only. Membership of tasks and cards is
/// resolved on demand against the workspace's own vectors.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProjectRegistry {
    projects: IndexMap<String, Project>,
}

impl ProjectRegistry {
    /// Build from the three discovery origins, in order: directories,
    /// task `+tags`, card `projects:` entries.
    pub fn build(dirs: &[ProjectDir], tasks: &[Task], boards: &[Board]) -> Self {
        let mut reg = ProjectRegistry::default();

        for dir in dirs {
            reg.upsert(&dir.name, Some(&dir.path), dir.parent.as_deref());
        }
        for task in tasks {
            for name in &task.projects {
                reg.upsert(name, None, None);
            }
        }
        for board in boards {
            for card in board.cards() {
                for name in &card.card.projects {
                    reg.upsert(name, None, None);
                }
            }
        }

        reg.link_children();
        reg
    }

    /// Insert or merge. Empty `dir_path`/`parent` are upgraded, never
    /// downgraded.
    fn upsert(&mut self, name: &str, dir_path: Option<&Path>, parent: Option<&str>) {
        if name.is_empty() {
            return;
        }
        let entry = self
            .projects
            .entry(name.to_string())
            .or_insert_with(|| Project::new(name));
        if entry.dir_path.is_none()
            && let Some(dir) = dir_path
        {
            entry.dir_path = Some(dir.to_path_buf());
        }
        if entry.parent.is_none()
            && let Some(parent) = parent
            && parent != name
        {
            entry.parent = Some(parent.to_string());
        }
    }

    /// Recompute every `children` list from the `parent` links
    fn link_children(&mut self) {
        for project in self.projects.values_mut() {
            project.children.clear();
        }
        let links: Vec<(String, String)> = self
            .projects
            .values()
            .filter_map(|p| p.parent.clone().map(|parent| (parent, p.name.clone())))
            .collect();
        for (parent, child) in links {
            if let Some(entry) = self.projects.get_mut(&parent)
                && !entry.children.contains(&child)
            {
                entry.children.push(child);
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&Project> {
        self.projects.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.projects.contains_key(name)
    }

    /// Projects in discovery order
    pub fn iter(&self) -> impl Iterator<Item = &Project> {
        self.projects.values()
    }

    pub fn len(&self) -> usize {
        self.projects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.projects.is_empty()
    }

    pub fn top_level(&self) -> impl Iterator<Item = &Project> {
        self.projects.values().filter(|p| p.parent.is_none())
    }

    pub fn children_of(&self, name: &str) -> impl Iterator<Item = &Project> {
        self.projects
            .get(name)
            .into_iter()
            .flat_map(|p| p.children.iter())
            .filter_map(|child| self.projects.get(child))
    }

    /// Tasks tagged with the project
    pub fn tasks_for<'a>(&self, name: &'a str, tasks: &'a [Task]) -> impl Iterator<Item = &'a Task> {
        tasks.iter().filter(move |t| t.has_project(name))
    }

    /// Cards tagged with the project
    pub fn cards_for<'a>(
        &self,
        name: &'a str,
        boards: &'a [Board],
    ) -> impl Iterator<Item = CardRef<'a>> {
        boards
            .iter()
            .flat_map(|b| b.cards())
            .filter(move |c| c.card.has_project(name))
    }

    pub fn set_archived(&mut self, name: &str, archived: bool) {
        if let Some(p) = self.projects.get_mut(name) {
            p.archived = archived;
        }
    }

    /// Fold `old` into `new` after a rename on disk. `new_dir` is where
    /// the project's directory ended up, if it has one; nested project
    /// directories under the old location are re-rooted there.
    pub(crate) fn rename_entry(&mut self, old: &str, new: &str, new_dir: Option<&Path>) {
        let Some(old_entry) = self.projects.shift_remove(old) else {
            return;
        };

        match self.projects.get_mut(new) {
            Some(target) => {
                if target.dir_path.is_none() {
                    target.dir_path = new_dir.map(Path::to_path_buf);
                }
                if target.parent.is_none() {
                    target.parent = old_entry.parent.clone();
                }
            }
            None => {
                let mut entry = Project::new(new);
                entry.dir_path = new_dir.map(Path::to_path_buf);
                entry.parent = old_entry.parent.clone();
                entry.archived = old_entry.archived;
                self.projects.insert(new.to_string(), entry);
            }
        }

        for project in self.projects.values_mut() {
            if project.parent.as_deref() == Some(old) {
                project.parent = Some(new.to_string());
            }
            if project.name == new {
                continue;
            }
            if let (Some(old_dir), Some(new_dir), Some(dir)) =
                (&old_entry.dir_path, new_dir, project.dir_path.as_mut())
                && let Ok(rest) = dir.strip_prefix(old_dir)
            {
                let rebased = new_dir.join(rest);
                *dir = rebased;
            }
        }

        self.link_children();
    }
}
