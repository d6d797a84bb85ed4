use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::model::board::Board;
use crate::model::project::Project;
use crate::model::task::{DATE_FORMAT, Task};
use crate::ops::agenda::{AgendaItem, AgendaSource, DateBucket, Reason};
use crate::ops::search::{HitTarget, MatchField, SearchHit};
use crate::parse::serialize_task;

// ---------------------------------------------------------------------------
// JSON output structs
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct TaskJson {
    pub id: String,
    pub text: String,
    pub name: String,
    pub done: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<char>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub projects: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub contexts: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduled: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

#[derive(Serialize)]
pub struct AgendaItemJson {
    pub kind: &'static str,
    pub reason: Reason,
    pub date: String,
    pub title: String,
    /// Task id, card file name or note path
    pub target: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub board: Option<String>,
}

#[derive(Serialize)]
pub struct DateBucketJson {
    pub date: String,
    pub tasks: Vec<AgendaItemJson>,
    pub cards: Vec<AgendaItemJson>,
    pub completed_tasks: Vec<AgendaItemJson>,
    pub completed_cards: Vec<AgendaItemJson>,
    pub notes: Vec<AgendaItemJson>,
}

#[derive(Serialize)]
pub struct ProjectJson {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    pub archived: bool,
    pub tasks: usize,
    pub cards: usize,
}

#[derive(Serialize)]
pub struct ColumnJson {
    pub name: String,
    pub cards: usize,
}

#[derive(Serialize)]
pub struct BoardJson {
    pub name: String,
    pub path: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    pub archived: bool,
    pub columns: Vec<ColumnJson>,
    pub orphans: Vec<String>,
}

#[derive(Serialize)]
pub struct ScanJson {
    pub root: PathBuf,
    pub boards: usize,
    pub cards: usize,
    pub tasks: usize,
    pub notes: usize,
    pub projects: usize,
    pub errors: Vec<String>,
}

#[derive(Serialize)]
pub struct RenameJson {
    pub old: String,
    pub new: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
    pub merged: bool,
    pub appended: Vec<PathBuf>,
    pub skipped: Vec<PathBuf>,
    pub tasks_updated: usize,
    pub cards_updated: usize,
}

// ---------------------------------------------------------------------------
// Conversions
// ---------------------------------------------------------------------------

pub fn task_to_json(task: &Task) -> TaskJson {
    TaskJson {
        id: task.id.clone(),
        text: serialize_task(task),
        name: task.name.clone(),
        done: task.done,
        priority: task.priority,
        projects: task.projects.iter().cloned().collect(),
        contexts: task.contexts.iter().cloned().collect(),
        due: task.due_date().map(|d| d.format(DATE_FORMAT).to_string()),
        scheduled: task
            .scheduled_date()
            .map(|d| d.format(DATE_FORMAT).to_string()),
        file: task.file.clone(),
    }
}

pub fn agenda_item_to_json(item: &AgendaItem) -> AgendaItemJson {
    let (kind, target, board) = match item.source {
        AgendaSource::Task(task) => ("task", task.id.clone(), None),
        AgendaSource::Card(card) => (
            "card",
            card.card.filename.clone(),
            Some(card.board.name.clone()),
        ),
        AgendaSource::Note(note) => ("note", note.rel_path.display().to_string(), None),
    };
    AgendaItemJson {
        kind,
        reason: item.reason,
        date: item.date.format(DATE_FORMAT).to_string(),
        title: item.title().to_string(),
        target,
        board,
    }
}

fn items_to_json(items: &[AgendaItem]) -> Vec<AgendaItemJson> {
    items.iter().map(agenda_item_to_json).collect()
}

pub fn bucket_to_json(bucket: &DateBucket) -> DateBucketJson {
    DateBucketJson {
        date: bucket.date.format(DATE_FORMAT).to_string(),
        tasks: items_to_json(&bucket.tasks),
        cards: items_to_json(&bucket.cards),
        completed_tasks: items_to_json(&bucket.completed_tasks),
        completed_cards: items_to_json(&bucket.completed_cards),
        notes: items_to_json(&bucket.notes),
    }
}

pub fn project_to_json(project: &Project, tasks: usize, cards: usize) -> ProjectJson {
    ProjectJson {
        name: project.name.clone(),
        dir: project.dir_path.clone(),
        parent: project.parent.clone(),
        archived: project.archived,
        tasks,
        cards,
    }
}

pub fn board_to_json(board: &Board, orphans: Vec<String>) -> BoardJson {
    BoardJson {
        name: board.name.clone(),
        path: board.path.clone(),
        project: board.project.clone(),
        archived: board.archived,
        columns: board
            .columns
            .iter()
            .map(|c| ColumnJson {
                name: c.name.clone(),
                cards: c.cards.len(),
            })
            .collect(),
        orphans,
    }
}

// ---------------------------------------------------------------------------
// Text formatting
// ---------------------------------------------------------------------------

/// `<id>  <todo.txt line>`
pub fn format_task_line(task: &Task) -> String {
    format!("{}  {}", task.id, serialize_task(task))
}

fn kind_marker(item: &AgendaItem) -> &'static str {
    match item.source {
        AgendaSource::Task(_) => "task",
        AgendaSource::Card(_) => "card",
        AgendaSource::Note(_) => "note",
    }
}

fn reason_marker(reason: Reason) -> &'static str {
    match reason {
        Reason::Due => "due",
        Reason::Scheduled => "sched",
        Reason::Note => "note",
    }
}

/// One agenda or overdue row
pub fn format_agenda_item(item: &AgendaItem, done: bool) -> String {
    let check = if done { "x " } else { "" };
    let suffix = match item.source {
        AgendaSource::Card(card) => format!("  [{}]", card.board.name),
        AgendaSource::Task(task) => format!("  ({})", task.id),
        AgendaSource::Note(_) => String::new(),
    };
    format!(
        "  {:<4} {:<5} {}{}{}",
        kind_marker(item),
        reason_marker(item.reason),
        check,
        item.title(),
        suffix
    )
}

/// A day header followed by its items, pending before completed
pub fn format_bucket(bucket: &DateBucket) -> Vec<String> {
    let mut lines = vec![format!("== {} ==", bucket.date.format("%a %Y-%m-%d"))];
    for item in bucket.tasks.iter().chain(&bucket.cards) {
        lines.push(format_agenda_item(item, false));
    }
    for item in bucket.completed_tasks.iter().chain(&bucket.completed_cards) {
        lines.push(format_agenda_item(item, true));
    }
    for item in &bucket.notes {
        lines.push(format_agenda_item(item, false));
    }
    lines
}

/// Project row, indented by nesting depth
pub fn format_project(project: &Project, depth: usize, tasks: usize, cards: usize) -> String {
    let kind = if project.is_virtual() { " (tag)" } else { "" };
    let archived = if project.archived { " [archived]" } else { "" };
    format!(
        "{}{}{}{}  {} tasks, {} cards",
        "  ".repeat(depth),
        project.name,
        kind,
        archived,
        tasks,
        cards
    )
}

pub fn format_board(board: &Board, root: &Path, orphans: usize) -> String {
    let path = board.path.strip_prefix(root).unwrap_or(&board.path);
    let columns = board
        .columns
        .iter()
        .map(|c| format!("{} ({})", c.name, c.cards.len()))
        .collect::<Vec<_>>()
        .join(", ");
    let mut line = format!("{}  {}  {}", board.name, path.display(), columns);
    if board.archived {
        line.push_str("  [archived]");
    }
    if orphans > 0 {
        line.push_str(&format!("  {} orphan card(s)", orphans));
    }
    line
}

fn field_name(field: MatchField) -> &'static str {
    match field {
        MatchField::Title => "title",
        MatchField::Project => "project",
        MatchField::Context => "context",
        MatchField::Tag => "tag",
        MatchField::Body => "body",
    }
}

/// `[kind:target] field: text`, body text cut to its first matching line
pub fn format_search_hit(hit: &SearchHit) -> String {
    let target = match &hit.target {
        HitTarget::Task { id } => format!("task:{}", id),
        HitTarget::Card { board, filename } => {
            let board = board.file_name().unwrap_or(board.as_os_str());
            format!("card:{}/{}", board.to_string_lossy(), filename)
        }
        HitTarget::Note { path } => format!("note:{}", path.display()),
    };
    let text = match hit.spans.first() {
        Some(span) if hit.field == MatchField::Body => {
            let start = hit.text[..span.start].rfind('\n').map_or(0, |i| i + 1);
            let end = hit.text[span.end..]
                .find('\n')
                .map_or(hit.text.len(), |i| span.end + i);
            hit.text[start..end].trim()
        }
        _ => hit.text.as_str(),
    };
    format!("[{}] {}: {}", target, field_name(hit.field), text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::board::{Card, Column};
    use crate::parse::parse_task_line;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, DATE_FORMAT).unwrap()
    }

    #[test]
    fn test_task_to_json() {
        let mut task = parse_task_line("(A) Call +work @phone due:2026-02-06").unwrap();
        task.set_source(Path::new("/w/tasks/todo.txt"), 0);
        let json = serde_json::to_value(task_to_json(&task)).unwrap();
        assert_eq!(json["text"], "(A) Call +work @phone due:2026-02-06");
        assert_eq!(json["priority"], "A");
        assert_eq!(json["due"], "2026-02-06");
        assert_eq!(json["projects"][0], "work");
        assert!(json.get("scheduled").is_none());
    }

    #[test]
    fn test_format_bucket() {
        let mut board = Board::new("Sprint", "/w/boards/sprint");
        let mut column = Column::new("To Do");
        column.cards.push(Card::new("login.md", "Login"));
        board.columns.push(column);
        let card = board.cards().next().unwrap();

        let mut task = parse_task_line("Call due:2026-02-06").unwrap();
        task.set_source(Path::new("/w/tasks/todo.txt"), 0);

        let mut bucket = DateBucket {
            date: date("2026-02-06"),
            tasks: Vec::new(),
            cards: Vec::new(),
            completed_tasks: Vec::new(),
            completed_cards: Vec::new(),
            notes: Vec::new(),
        };
        bucket.tasks.push(AgendaItem {
            source: AgendaSource::Task(&task),
            reason: Reason::Due,
            date: date("2026-02-06"),
        });
        bucket.completed_cards.push(AgendaItem {
            source: AgendaSource::Card(card),
            reason: Reason::Scheduled,
            date: date("2026-02-06"),
        });

        let lines = format_bucket(&bucket);
        assert_eq!(
            lines,
            vec![
                "== Fri 2026-02-06 ==".to_string(),
                format!("  task due   Call  ({})", task.id),
                "  card sched x Login  [Sprint]".to_string(),
            ]
        );
    }

    #[test]
    fn test_format_search_hit_body_line() {
        let hit = SearchHit {
            target: HitTarget::Card {
                board: PathBuf::from("/w/boards/sprint"),
                filename: "login.md".into(),
            },
            field: MatchField::Body,
            text: "# Login\n\nUse OAuth here.\nMore text.".into(),
            spans: vec![13..18],
        };
        assert_eq!(
            format_search_hit(&hit),
            "[card:sprint/login.md] body: Use OAuth here."
        );
    }
}
