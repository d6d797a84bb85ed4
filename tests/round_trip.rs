use chrono::{FixedOffset, NaiveDate, TimeZone};
use pretty_assertions::assert_eq;
use std::fs;
use std::path::Path;
use tempfile::TempDir;
use workdesk::io::task_store::TaskService;
use workdesk::model::workspace::Workspace;
use workdesk::ops::agenda::{AgendaInput, DayRange, Reason, query_agenda, query_overdue};
use workdesk::ops::board_ops::{add_card, move_card};
use workdesk::ops::project_ops::rename_project;
use workdesk::parse::{parse_task_line, serialize_task};

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn read(root: &Path, rel: &str) -> String {
    fs::read_to_string(root.join(rel)).unwrap()
}

fn day(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

/// Tasks, a sprint board, a project and a note
fn sample_workspace() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path();
    write(
        root,
        "tasks/todo.txt",
        "(A) 2026-01-20 Call plumber +home @phone due:2026-02-06\n\
         Renew passport +travel scheduled:2026-02-04\n\
         x 2026-02-03 2026-01-15 Pay rent +home due:2026-02-03\n",
    );
    write(
        root,
        "boards/sprint/board.md",
        "# Sprint\n\n## To Do\n\n- [X](./cards/x.md)\n\n## Done\n",
    );
    write(
        root,
        "boards/sprint/cards/x.md",
        "---\ndue: \"2026-02-06\"\nprojects: [web]\n---\n# X\n",
    );
    write(root, "projects/web/tasks/todo.txt", "Fix header due:2026-02-01\n");
    write(root, "notes/2026-02-05-standup.md", "---\ntitle: Standup\n---\n# Standup\n");
    tmp
}

// ============================================================================
// Task files
// ============================================================================

#[test]
fn task_files_round_trip_through_the_store() {
    let tmp = sample_workspace();
    let before = read(tmp.path(), "tasks/todo.txt");
    let mut ws = Workspace::load(tmp.path()).unwrap();

    // Writing every task back unchanged leaves the file byte-identical
    let mut tasks: Vec<_> = ws
        .tasks
        .iter()
        .filter(|t| t.file == Some(tmp.path().join("tasks/todo.txt")))
        .cloned()
        .collect();
    assert_eq!(ws.store.update_all(&mut tasks).unwrap(), 3);
    assert_eq!(read(tmp.path(), "tasks/todo.txt"), before);

    // Every line parses back to the text it came from
    for line in before.lines() {
        assert_eq!(serialize_task(&parse_task_line(line).unwrap()), line);
    }

    ws.reload().unwrap();
    assert_eq!(ws.tasks.len(), 4);
}

#[test]
fn complete_and_archive() {
    let tmp = sample_workspace();
    let ws = Workspace::load(tmp.path()).unwrap();
    let passport = ws
        .tasks
        .iter()
        .find(|t| t.name == "Renew passport")
        .unwrap()
        .id
        .clone();

    let done = ws.store.complete(&passport).unwrap();
    assert!(done.done);
    assert_eq!(ws.store.archive().unwrap(), 2);

    assert_eq!(
        read(tmp.path(), "tasks/todo.txt"),
        "(A) 2026-01-20 Call plumber +home @phone due:2026-02-06\n"
    );
    let archived = read(tmp.path(), "tasks/done.txt");
    assert_eq!(archived.lines().count(), 2);
    assert!(archived.lines().all(|l| l.starts_with("x ")));
}

// ============================================================================
// Agenda
// ============================================================================

#[test]
fn sprint_card_lands_on_its_due_day() {
    let tmp = sample_workspace();
    let ws = Workspace::load(tmp.path()).unwrap();
    let input = AgendaInput::from_workspace(&ws);

    let buckets = query_agenda(&input, DayRange::new(day("2026-02-06"), day("2026-02-06")));
    assert_eq!(buckets.len(), 1);
    let bucket = &buckets[0];
    assert_eq!(bucket.cards.len(), 1);
    assert_eq!(bucket.cards[0].title(), "X");
    assert!(bucket.completed_cards.is_empty());
    assert_eq!(bucket.tasks.len(), 1);
    assert_eq!(bucket.tasks[0].title(), "Call plumber");
}

#[test]
fn agenda_week_buckets() {
    let tmp = sample_workspace();
    let ws = Workspace::load(tmp.path()).unwrap();
    let input = AgendaInput::from_workspace(&ws);
    let buckets = query_agenda(&input, DayRange::starting(day("2026-02-01"), 7));

    let summary: Vec<(String, usize)> = buckets
        .iter()
        .map(|b| (b.date.to_string(), b.len()))
        .collect();
    assert_eq!(
        summary,
        vec![
            ("2026-02-01".to_string(), 1), // Fix header
            ("2026-02-03".to_string(), 1), // Pay rent, completed
            ("2026-02-04".to_string(), 1), // passport, scheduled
            ("2026-02-05".to_string(), 1), // standup note
            ("2026-02-06".to_string(), 2),
        ]
    );
    assert_eq!(buckets[1].completed_tasks.len(), 1);
    assert_eq!(buckets[2].tasks[0].reason, Reason::Scheduled);
    assert_eq!(buckets[3].notes[0].reason, Reason::Note);
}

#[test]
fn overdue_across_two_workspaces() {
    let first = sample_workspace();
    let second = TempDir::new().unwrap();
    write(second.path(), "tasks/todo.txt", "File taxes due:2026-01-31\n");

    let workspaces = vec![
        Workspace::load(first.path()).unwrap(),
        Workspace::load(second.path()).unwrap(),
    ];
    let input = AgendaInput::from_workspaces(&workspaces);
    let overdue = query_overdue(&input, day("2026-02-05"));
    let titles: Vec<&str> = overdue
        .iter()
        .map(|i| i.title())
        .collect();
    assert_eq!(titles, vec!["File taxes", "Fix header", "Renew passport"]);
}

// ============================================================================
// Boards
// ============================================================================

#[test]
fn moving_a_card_to_done_completes_it() {
    let tmp = sample_workspace();
    let mut ws = Workspace::load(tmp.path()).unwrap();
    let now = FixedOffset::east_opt(0)
        .unwrap()
        .with_ymd_and_hms(2026, 2, 6, 9, 30, 0)
        .unwrap();

    let board = ws.find_board_mut("sprint").unwrap();
    let added = add_card(board, "To Do", "Write release notes", now).unwrap();
    move_card(board, "x.md", "Done", None, now).unwrap();
    assert_eq!(added, "write-release-notes.md");

    ws.reload().unwrap();
    let board = ws.find_board("sprint").unwrap();
    assert_eq!(board.columns[0].cards[0].title, "Write release notes");
    assert_eq!(board.columns[1].cards[0].filename, "x.md");
    assert_eq!(board.columns[1].cards[0].date_completed, Some(now));

    let input = AgendaInput::from_workspace(&ws);
    let buckets = query_agenda(&input, DayRange::new(day("2026-02-06"), day("2026-02-06")));
    assert!(buckets[0].cards.is_empty());
    assert_eq!(buckets[0].completed_cards.len(), 1);
}

// ============================================================================
// Projects
// ============================================================================

#[test]
fn rename_physical_project_rewrites_everything() {
    let tmp = sample_workspace();
    let mut ws = Workspace::load(tmp.path()).unwrap();

    let report = rename_project(&mut ws, "web", "site").unwrap();
    assert!(!report.merged);
    assert_eq!(report.cards_updated, 1);

    assert!(!tmp.path().join("projects/web").exists());
    assert_eq!(read(tmp.path(), "projects/site/tasks/todo.txt"), "Fix header due:2026-02-01\n");
    assert!(read(tmp.path(), "boards/sprint/cards/x.md").contains("- site"));

    // A second run has nothing left to do
    let again = rename_project(&mut ws, "web", "site").unwrap();
    assert_eq!(again.tasks_updated + again.cards_updated, 0);

    let reloaded = Workspace::load(tmp.path()).unwrap();
    assert!(reloaded.projects.contains("site"));
    assert!(!reloaded.projects.contains("web"));
    assert_eq!(reloaded.tasks_for_project("site").count(), 1);
}

#[test]
fn rename_virtual_project_rewrites_tags() {
    let tmp = sample_workspace();
    let mut ws = Workspace::load(tmp.path()).unwrap();

    let report = rename_project(&mut ws, "home", "house").unwrap();
    assert_eq!(report.tasks_updated, 2);
    assert_eq!(
        read(tmp.path(), "tasks/todo.txt"),
        "(A) 2026-01-20 Call plumber +house @phone due:2026-02-06\n\
         Renew passport +travel scheduled:2026-02-04\n\
         x 2026-02-03 2026-01-15 Pay rent +house due:2026-02-03\n"
    );
}
