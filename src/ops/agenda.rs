use std::collections::BTreeMap;

use chrono::{Days, NaiveDate};
use serde::Serialize;

use crate::model::board::CardRef;
use crate::model::note::Note;
use crate::model::task::Task;
use crate::model::workspace::Workspace;

/// Why an item landed on a day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Reason {
    Due,
    Scheduled,
    Note,
}

/// What an agenda item points at
#[derive(Debug, Clone, Copy)]
pub enum AgendaSource<'a> {
    Task(&'a Task),
    Card(CardRef<'a>),
    Note(&'a Note),
}

/// One dated occurrence of a task, card or note
#[derive(Debug, Clone, Copy)]
pub struct AgendaItem<'a> {
    pub source: AgendaSource<'a>,
    pub reason: Reason,
    pub date: NaiveDate,
}

impl AgendaItem<'_> {
    pub fn title(&self) -> &str {
        match self.source {
            AgendaSource::Task(task) => &task.name,
            AgendaSource::Card(card) => &card.card.title,
            AgendaSource::Note(note) => &note.title,
        }
    }
}

/// Everything on one day, split by kind and state
#[derive(Debug, Clone)]
pub struct DateBucket<'a> {
    pub date: NaiveDate,
    pub tasks: Vec<AgendaItem<'a>>,
    pub cards: Vec<AgendaItem<'a>>,
    pub completed_tasks: Vec<AgendaItem<'a>>,
    pub completed_cards: Vec<AgendaItem<'a>>,
    pub notes: Vec<AgendaItem<'a>>,
}

impl<'a> DateBucket<'a> {
    fn new(date: NaiveDate) -> Self {
        DateBucket {
            date,
            tasks: Vec::new(),
            cards: Vec::new(),
            completed_tasks: Vec::new(),
            completed_cards: Vec::new(),
            notes: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
            + self.cards.len()
            + self.completed_tasks.len()
            + self.completed_cards.len()
            + self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All items in display order
    pub fn items(&self) -> impl Iterator<Item = &AgendaItem<'a>> {
        self.tasks
            .iter()
            .chain(&self.cards)
            .chain(&self.completed_tasks)
            .chain(&self.completed_cards)
            .chain(&self.notes)
    }
}

/// Inclusive range of calendar days
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DayRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        DayRange { start, end }
    }

    /// `days` days beginning at `start` (at least one)
    pub fn starting(start: NaiveDate, days: u32) -> Self {
        let end = start
            .checked_add_days(Days::new(u64::from(days.max(1) - 1)))
            .unwrap_or(NaiveDate::MAX);
        DayRange { start, end }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// The entities an agenda query looks at, borrowed from loaded workspaces
#[derive(Debug, Clone, Default)]
pub struct AgendaInput<'a> {
    pub pending_tasks: Vec<&'a Task>,
    pub done_tasks: Vec<&'a Task>,
    pub cards: Vec<CardRef<'a>>,
    pub notes: Vec<&'a Note>,
}

impl<'a> AgendaInput<'a> {
    pub fn from_workspace(workspace: &'a Workspace) -> Self {
        let mut input = AgendaInput::default();
        input.extend(workspace);
        input
    }

    /// Merge several workspaces into one query
    pub fn from_workspaces<I>(workspaces: I) -> Self
    where
        I: IntoIterator<Item = &'a Workspace>,
    {
        let mut input = AgendaInput::default();
        for workspace in workspaces {
            input.extend(workspace);
        }
        input
    }

    pub fn extend(&mut self, workspace: &'a Workspace) {
        self.pending_tasks.extend(workspace.pending_tasks());
        self.done_tasks.extend(workspace.done_tasks());
        self.cards.extend(workspace.cards());
        self.notes.extend(workspace.notes.iter());
    }
}

/// Due and scheduled occurrences inside `range`. A scheduled date equal
/// to the due date is folded into the due occurrence.
fn occurrences(
    due: Option<NaiveDate>,
    scheduled: Option<NaiveDate>,
    range: DayRange,
) -> impl Iterator<Item = (Reason, NaiveDate)> {
    let due_hit = due.filter(|d| range.contains(*d)).map(|d| (Reason::Due, d));
    let scheduled_hit = scheduled
        .filter(|s| range.contains(*s) && Some(*s) != due)
        .map(|s| (Reason::Scheduled, s));
    due_hit.into_iter().chain(scheduled_hit)
}

fn bucket_for<'m, 'a>(
    buckets: &'m mut BTreeMap<NaiveDate, DateBucket<'a>>,
    date: NaiveDate,
) -> &'m mut DateBucket<'a> {
    buckets.entry(date).or_insert_with(|| DateBucket::new(date))
}

/// Bucket every dated item in `range` by day, ascending
pub fn query_agenda<'a>(input: &AgendaInput<'a>, range: DayRange) -> Vec<DateBucket<'a>> {
    let mut buckets: BTreeMap<NaiveDate, DateBucket<'a>> = BTreeMap::new();

    for &task in &input.pending_tasks {
        for (reason, date) in occurrences(task.due_date(), task.scheduled_date(), range) {
            bucket_for(&mut buckets, date).tasks.push(AgendaItem {
                source: AgendaSource::Task(task),
                reason,
                date,
            });
        }
    }
    for &task in &input.done_tasks {
        for (reason, date) in occurrences(task.due_date(), task.scheduled_date(), range) {
            bucket_for(&mut buckets, date).completed_tasks.push(AgendaItem {
                source: AgendaSource::Task(task),
                reason,
                date,
            });
        }
    }
    for &card in input.cards.iter().filter(|c| !c.is_hidden()) {
        for (reason, date) in occurrences(card.card.due, card.card.scheduled, range) {
            let item = AgendaItem {
                source: AgendaSource::Card(card),
                reason,
                date,
            };
            let bucket = bucket_for(&mut buckets, date);
            if card.in_done_column() {
                bucket.completed_cards.push(item);
            } else {
                bucket.cards.push(item);
            }
        }
    }
    for &note in input.notes.iter().filter(|n| range.contains(n.date)) {
        bucket_for(&mut buckets, note.date).notes.push(AgendaItem {
            source: AgendaSource::Note(note),
            reason: Reason::Note,
            date: note.date,
        });
    }

    buckets.into_values().collect()
}

/// The first date strictly before `cutoff`, checking due before scheduled
fn overdue_reason(
    due: Option<NaiveDate>,
    scheduled: Option<NaiveDate>,
    cutoff: NaiveDate,
) -> Option<(Reason, NaiveDate)> {
    if let Some(d) = due
        && d < cutoff
    {
        return Some((Reason::Due, d));
    }
    scheduled
        .filter(|s| *s < cutoff)
        .map(|s| (Reason::Scheduled, s))
}

/// Pending tasks and live cards dated before `cutoff`, oldest first
pub fn query_overdue<'a>(input: &AgendaInput<'a>, cutoff: NaiveDate) -> Vec<AgendaItem<'a>> {
    let mut items = Vec::new();
    for &task in &input.pending_tasks {
        if let Some((reason, date)) = overdue_reason(task.due_date(), task.scheduled_date(), cutoff)
        {
            items.push(AgendaItem {
                source: AgendaSource::Task(task),
                reason,
                date,
            });
        }
    }
    for &card in &input.cards {
        if card.is_hidden() || card.in_done_column() {
            continue;
        }
        if let Some((reason, date)) = overdue_reason(card.card.due, card.card.scheduled, cutoff) {
            items.push(AgendaItem {
                source: AgendaSource::Card(card),
                reason,
                date,
            });
        }
    }
    items.sort_by_key(|item| item.date);
    items
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::board::{Board, Card, Column};
    use crate::parse::parse_task_line;

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn task(line: &str) -> Task {
        parse_task_line(line).unwrap()
    }

    fn sprint_board() -> Board {
        let mut board = Board::new("Sprint", "/w/boards/sprint");
        let mut todo = Column::new("To Do");
        let mut x = Card::new("x.md", "X");
        x.due = Some(day("2026-02-06"));
        todo.cards.push(x);
        let mut done = Column::new("Done");
        let mut shipped = Card::new("shipped.md", "Shipped");
        shipped.due = Some(day("2026-02-06"));
        done.cards.push(shipped);
        let mut hidden = Card::new("hidden.md", "Hidden");
        hidden.due = Some(day("2026-02-06"));
        hidden.archived = true;
        done.cards.push(hidden);
        board.columns = vec![todo, done];
        board
    }

    #[test]
    fn test_date_window() {
        let t = task("Pay rent due:2026-02-06");
        let input = AgendaInput {
            pending_tasks: vec![&t],
            ..AgendaInput::default()
        };

        let buckets = query_agenda(&input, DayRange::new(day("2026-02-02"), day("2026-02-08")));
        assert_eq!(buckets.len(), 1);
        assert_eq!(buckets[0].date, day("2026-02-06"));
        assert_eq!(buckets[0].tasks.len(), 1);
        assert_eq!(buckets[0].tasks[0].reason, Reason::Due);

        let buckets = query_agenda(&input, DayRange::new(day("2026-02-10"), day("2026-02-16")));
        assert!(buckets.is_empty());
    }

    #[test]
    fn test_same_day_emitted_once_as_due() {
        let t = task("Dentist due:2026-02-06 scheduled:2026-02-06");
        let input = AgendaInput {
            pending_tasks: vec![&t],
            ..AgendaInput::default()
        };
        let buckets = query_agenda(&input, DayRange::starting(day("2026-02-06"), 1));
        assert_eq!(buckets.len(), 1);
        assert_eq!(buckets[0].len(), 1);
        assert_eq!(buckets[0].tasks[0].reason, Reason::Due);
    }

    #[test]
    fn test_due_and_scheduled_on_different_days() {
        let t = task("Draft due:2026-02-06 scheduled:2026-02-03");
        let input = AgendaInput {
            pending_tasks: vec![&t],
            ..AgendaInput::default()
        };
        let buckets = query_agenda(&input, DayRange::starting(day("2026-02-01"), 7));
        let days: Vec<(NaiveDate, Reason)> = buckets
            .iter()
            .flat_map(|b| b.items().map(|i| (i.date, i.reason)))
            .collect();
        assert_eq!(
            days,
            vec![
                (day("2026-02-03"), Reason::Scheduled),
                (day("2026-02-06"), Reason::Due)
            ]
        );
    }

    #[test]
    fn test_sprint_board_scenario() {
        let board = sprint_board();
        let input = AgendaInput {
            cards: board.cards().collect(),
            ..AgendaInput::default()
        };
        let buckets = query_agenda(&input, DayRange::starting(day("2026-02-06"), 1));
        assert_eq!(buckets.len(), 1);
        let bucket = &buckets[0];
        assert_eq!(bucket.cards.len(), 1);
        assert_eq!(bucket.cards[0].title(), "X");
        // Done-column cards are completed; archived cards are gone
        assert_eq!(bucket.completed_cards.len(), 1);
        assert_eq!(bucket.completed_cards[0].title(), "Shipped");
        assert_eq!(bucket.len(), 2);
    }

    #[test]
    fn test_archived_board_excluded() {
        let mut board = sprint_board();
        board.archived = true;
        let input = AgendaInput {
            cards: board.cards().collect(),
            ..AgendaInput::default()
        };
        assert!(query_agenda(&input, DayRange::starting(day("2026-02-06"), 1)).is_empty());
        assert!(query_overdue(&input, day("2026-03-01")).is_empty());
    }

    #[test]
    fn test_done_tasks_and_notes() {
        let done = task("x 2026-02-05 Filed taxes due:2026-02-05");
        let note = Note {
            title: "Sync".into(),
            file_path: "/w/notes/2026-02-04-sync.md".into(),
            rel_path: "notes/2026-02-04-sync.md".into(),
            date: day("2026-02-04"),
            project: None,
        };
        let input = AgendaInput {
            done_tasks: vec![&done],
            notes: vec![&note],
            ..AgendaInput::default()
        };
        let buckets = query_agenda(&input, DayRange::starting(day("2026-02-01"), 7));
        assert_eq!(buckets.len(), 2);
        assert_eq!(buckets[0].date, day("2026-02-04"));
        assert_eq!(buckets[0].notes[0].reason, Reason::Note);
        assert_eq!(buckets[1].completed_tasks[0].title(), "Filed taxes");
        assert!(buckets[1].tasks.is_empty());
    }

    #[test]
    fn test_overdue_boundary() {
        let before = task("A due:2026-02-05");
        let on = task("B due:2026-02-06");
        let after = task("C due:2026-02-07");
        let input = AgendaInput {
            pending_tasks: vec![&before, &on, &after],
            ..AgendaInput::default()
        };
        let overdue = query_overdue(&input, day("2026-02-06"));
        let titles: Vec<&str> = overdue.iter().map(|i| i.title()).collect();
        assert_eq!(titles, vec!["A"]);
    }

    #[test]
    fn test_overdue_due_beats_scheduled() {
        let both = task("Renew due:2026-01-01 scheduled:2026-01-01");
        let later_due = task("Plan due:2026-03-01 scheduled:2026-01-15");
        let input = AgendaInput {
            pending_tasks: vec![&later_due, &both],
            ..AgendaInput::default()
        };
        let overdue = query_overdue(&input, day("2026-02-06"));
        let found: Vec<(&str, Reason, NaiveDate)> = overdue
            .iter()
            .map(|i| (i.title(), i.reason, i.date))
            .collect();
        assert_eq!(
            found,
            vec![
                ("Renew", Reason::Due, day("2026-01-01")),
                ("Plan", Reason::Scheduled, day("2026-01-15")),
            ]
        );
    }

    #[test]
    fn test_overdue_skips_done_column_and_done_tasks() {
        let board = sprint_board();
        let done = task("x 2026-01-02 Old due:2026-01-01");
        let input = AgendaInput {
            done_tasks: vec![&done],
            cards: board.cards().collect(),
            ..AgendaInput::default()
        };
        let overdue = query_overdue(&input, day("2026-03-01"));
        let titles: Vec<&str> = overdue.iter().map(|i| i.title()).collect();
        assert_eq!(titles, vec!["X"]);
    }
}
