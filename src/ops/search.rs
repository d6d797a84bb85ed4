use std::fs;
use std::ops::Range;
use std::path::PathBuf;

use regex::Regex;
use serde::Serialize;

use crate::model::board::Board;
use crate::model::note::Note;
use crate::model::task::Task;
use crate::model::workspace::Workspace;
use crate::parse::parse_front_matter;

/// Which field of an entity matched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchField {
    /// Task name or card/note title
    Title,
    Project,
    Context,
    /// A `key:value` task tag or a card tag
    Tag,
    /// Card or note body text
    Body,
}

/// The entity a hit belongs to
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum HitTarget {
    Task { id: String },
    Card { board: PathBuf, filename: String },
    Note { path: PathBuf },
}

/// A search hit for one field
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchHit {
    pub target: HitTarget,
    pub field: MatchField,
    /// The matched field's text
    pub text: String,
    pub spans: Vec<Range<usize>>,
}

/// Collect all non-overlapping match byte-ranges for a regex in the given text.
fn find_matches(re: &Regex, text: &str) -> Vec<Range<usize>> {
    re.find_iter(text).map(|m| m.start()..m.end()).collect()
}

fn push_hit(
    hits: &mut Vec<SearchHit>,
    re: &Regex,
    target: &HitTarget,
    field: MatchField,
    text: &str,
) {
    let spans = find_matches(re, text);
    if !spans.is_empty() {
        hits.push(SearchHit {
            target: target.clone(),
            field,
            text: text.to_string(),
            spans,
        });
    }
}

/// Search everything in a workspace: tasks, then visible cards, then notes
pub fn search_workspace(ws: &Workspace, re: &Regex) -> Vec<SearchHit> {
    let mut hits = search_tasks(&ws.tasks, re);
    hits.extend(search_cards(&ws.boards, re));
    hits.extend(search_notes(&ws.notes, re));
    hits
}

pub fn search_tasks(tasks: &[Task], re: &Regex) -> Vec<SearchHit> {
    let mut hits = Vec::new();
    for task in tasks {
        let target = HitTarget::Task {
            id: task.id.clone(),
        };
        push_hit(&mut hits, re, &target, MatchField::Title, &task.name);
        for project in &task.projects {
            push_hit(&mut hits, re, &target, MatchField::Project, project);
        }
        for context in &task.contexts {
            push_hit(&mut hits, re, &target, MatchField::Context, context);
        }
        for (key, value) in &task.tags {
            push_hit(&mut hits, re, &target, MatchField::Tag, &format!("{}:{}", key, value));
        }
    }
    hits
}

/// Cards on archived boards and archived cards are skipped
pub fn search_cards(boards: &[Board], re: &Regex) -> Vec<SearchHit> {
    let mut hits = Vec::new();
    for card_ref in boards.iter().flat_map(|b| b.cards()) {
        if card_ref.is_hidden() {
            continue;
        }
        let card = card_ref.card;
        let target = HitTarget::Card {
            board: card_ref.board.path.clone(),
            filename: card.filename.clone(),
        };
        push_hit(&mut hits, re, &target, MatchField::Title, &card.title);
        for project in &card.projects {
            push_hit(&mut hits, re, &target, MatchField::Project, project);
        }
        for tag in &card.tags {
            push_hit(&mut hits, re, &target, MatchField::Tag, tag);
        }
        push_hit(&mut hits, re, &target, MatchField::Body, &card.content);
    }
    hits
}

/// Note titles, plus bodies read from disk. Unreadable bodies are skipped.
pub fn search_notes(notes: &[Note], re: &Regex) -> Vec<SearchHit> {
    let mut hits = Vec::new();
    for note in notes {
        let target = HitTarget::Note {
            path: note.rel_path.clone(),
        };
        push_hit(&mut hits, re, &target, MatchField::Title, &note.title);
        match fs::read_to_string(&note.file_path) {
            Ok(content) => {
                let body = parse_front_matter(&content).body;
                push_hit(&mut hits, re, &target, MatchField::Body, body);
            }
            Err(e) => tracing::debug!("not searching {}: {}", note.file_path.display(), e),
        }
    }
    hits
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::board::{Card, Column};
    use crate::parse::parse_task_line;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn tasks() -> Vec<Task> {
        ["Add handler syntax +parser @desk", "Write docs due:2026-02-06"]
            .iter()
            .enumerate()
            .map(|(i, line)| {
                let mut t = parse_task_line(line).unwrap();
                t.set_source(std::path::Path::new("/w/tasks/todo.txt"), i);
                t
            })
            .collect()
    }

    #[test]
    fn test_search_task_title_spans() {
        let tasks = tasks();
        let re = Regex::new("handler").unwrap();
        let hits = search_tasks(&tasks, &re);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].field, MatchField::Title);
        assert_eq!(hits[0].spans, vec![4..11]); // "Add [handler] syntax"
        assert_eq!(
            hits[0].target,
            HitTarget::Task {
                id: tasks[0].id.clone()
            }
        );
    }

    #[test]
    fn test_search_task_tags() {
        let tasks = tasks();
        let fields: Vec<MatchField> = search_tasks(&tasks, &Regex::new("parser|desk|2026").unwrap())
            .iter()
            .map(|h| h.field)
            .collect();
        assert_eq!(
            fields,
            vec![MatchField::Project, MatchField::Context, MatchField::Tag]
        );
    }

    #[test]
    fn test_search_cards_skips_hidden() {
        let mut board = Board::new("Sprint", "/w/boards/sprint");
        let mut column = Column::new("To Do");
        let mut visible = Card::new("login.md", "Login flow");
        visible.content.push_str("\nOAuth login via provider.\n");
        let mut hidden = Card::new("old.md", "Old login");
        hidden.archived = true;
        column.cards = vec![visible, hidden];
        board.columns.push(column);

        let hits = search_cards(std::slice::from_ref(&board), &Regex::new("(?i)login").unwrap());
        let fields: Vec<MatchField> = hits.iter().map(|h| h.field).collect();
        assert_eq!(fields, vec![MatchField::Title, MatchField::Body]);
        assert!(hits.iter().all(|h| matches!(
            &h.target,
            HitTarget::Card { filename, .. } if filename == "login.md"
        )));
    }

    #[test]
    fn test_search_note_body() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("2026-02-06-sync.md");
        fs::write(&path, "---\ntitle: Sync\n---\nDiscussed the budget.\n").unwrap();
        let note = Note {
            title: "Sync".into(),
            file_path: path,
            rel_path: "2026-02-06-sync.md".into(),
            date: NaiveDate::from_ymd_opt(2026, 2, 6).unwrap(),
            project: None,
        };
        let hits = search_notes(&[note], &Regex::new("budget|title").unwrap());
        // Front matter is not searched
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].field, MatchField::Body);
    }
}
