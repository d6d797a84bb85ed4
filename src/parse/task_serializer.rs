use std::collections::HashSet;

use crate::model::task::{BodyToken, DATE_FORMAT, Task};

/// Serialize a task to one todo.txt line.
///
/// Prefix segments are written in grammar order. The body replays the
/// token layout captured at parse time, so tags stay where the user put
/// them; words and tags added since then are appended.
pub fn serialize_task(task: &Task) -> String {
    let mut out = String::new();

    if task.done {
        out.push_str("x ");
    }
    if let Some(p) = task.priority {
        out.push('(');
        out.push(p);
        out.push_str(") ");
    }
    if task.done
        && let Some(date) = task.completion_date
    {
        out.push_str(&date.format(DATE_FORMAT).to_string());
        out.push(' ');
    }
    if let Some(date) = task.created_date {
        out.push_str(&date.format(DATE_FORMAT).to_string());
        out.push(' ');
    }

    out.push_str(&body_tokens(task).join(" "));
    out
}

fn body_tokens(task: &Task) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut words = task.name.split(' ');
    let mut projects: HashSet<&str> = HashSet::new();
    let mut contexts: HashSet<&str> = HashSet::new();
    let mut tags: HashSet<&str> = HashSet::new();

    for slot in &task.layout {
        match slot {
            BodyToken::Word => {
                if let Some(word) = words.next() {
                    tokens.push(word.to_string());
                }
            }
            BodyToken::Project(name) => {
                if task.projects.contains(name) && projects.insert(name) {
                    tokens.push(format!("+{}", name));
                }
            }
            BodyToken::Context(name) => {
                if task.contexts.contains(name) && contexts.insert(name) {
                    tokens.push(format!("@{}", name));
                }
            }
            BodyToken::Tag(key) => {
                if let Some(value) = task.tags.get(key)
                    && tags.insert(key)
                {
                    tokens.push(format!("{}:{}", key, value));
                }
            }
        }
    }

    if !task.name.is_empty() {
        tokens.extend(words.map(str::to_string));
    }
    for name in &task.projects {
        if !projects.contains(name.as_str()) {
            tokens.push(format!("+{}", name));
        }
    }
    for name in &task.contexts {
        if !contexts.contains(name.as_str()) {
            tokens.push(format!("@{}", name));
        }
    }
    for (key, value) in &task.tags {
        if !tags.contains(key.as_str()) {
            tokens.push(format!("{}:{}", key, value));
        }
    }
    tokens
}
