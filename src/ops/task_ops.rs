use std::cmp::Ordering;

use chrono::NaiveDate;

use crate::model::task::Task;
use crate::parse::{TaskParseError, parse_task_text};

/// Which tasks a listing shows
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskFilter {
    /// Include completed tasks
    pub include_done: bool,
    pub project: Option<String>,
    pub context: Option<String>,
    /// Only tasks due on or before this day
    pub due_by: Option<NaiveDate>,
}

impl TaskFilter {
    pub fn matches(&self, task: &Task) -> bool {
        if task.done && !self.include_done {
            return false;
        }
        if let Some(project) = &self.project
            && !task.has_project(project)
        {
            return false;
        }
        if let Some(context) = &self.context
            && !task.contexts.contains(context)
        {
            return false;
        }
        if let Some(cutoff) = self.due_by {
            return task.due_date().is_some_and(|d| d <= cutoff);
        }
        true
    }
}

pub fn filter_tasks<'a>(tasks: &'a [Task], filter: &TaskFilter) -> Vec<&'a Task> {
    tasks.iter().filter(|t| filter.matches(t)).collect()
}

/// Display order: pending before done, then priority (A first, none
/// last), then due date (undated last). Ties keep file order.
pub fn sort_for_display(tasks: &mut [&Task]) {
    tasks.sort_by(|a, b| compare_tasks(a, b));
}

fn compare_tasks(a: &Task, b: &Task) -> Ordering {
    a.done
        .cmp(&b.done)
        .then_with(|| compare_present_first(a.priority, b.priority))
        .then_with(|| compare_present_first(a.due_date(), b.due_date()))
}

fn compare_present_first<T: Ord>(a: Option<T>, b: Option<T>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Replace a task's text, keeping its position in its file
pub fn replace_text(task: &Task, text: &str) -> Result<Task, TaskParseError> {
    let mut edited = parse_task_text(text)?;
    edited.id = task.id.clone();
    edited.file = task.file.clone();
    edited.line = task.line;
    edited.source_text = task.source_text.clone();
    Ok(edited)
}
