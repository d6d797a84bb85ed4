use std::path::PathBuf;

use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};

/// Name of the terminal column (matched case-insensitively)
pub const DONE_COLUMN: &str = "Done";

/// A labelled link attached to a card
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardUrl {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub url: String,
}

/// A kanban card, backed by `cards/<filename>`
#[derive(Debug, Clone, Serialize)]
pub struct Card {
    /// File name inside the board's `cards/` directory
    pub filename: String,
    /// First H1 of the body
    pub title: String,
    pub tags: Vec<String>,
    pub projects: Vec<String>,
    pub urls: Vec<CardUrl>,
    pub due: Option<NaiveDate>,
    pub scheduled: Option<NaiveDate>,
    pub date_completed: Option<DateTime<FixedOffset>>,
    /// 0 = unset
    pub priority: u32,
    pub archived: bool,
    /// Markdown body without front matter
    pub content: String,
    /// Front-matter keys this crate does not interpret, kept for rewrites
    #[serde(skip)]
    pub extra: serde_yaml::Mapping,
}

impl Card {
    pub fn new(filename: impl Into<String>, title: impl Into<String>) -> Self {
        let title = title.into();
        Card {
            filename: filename.into(),
            content: format!("# {}\n", title),
            title,
            tags: Vec::new(),
            projects: Vec::new(),
            urls: Vec::new(),
            due: None,
            scheduled: None,
            date_completed: None,
            priority: 0,
            archived: false,
            extra: serde_yaml::Mapping::new(),
        }
    }

    pub fn has_project(&self, name: &str) -> bool {
        self.projects.iter().any(|p| p == name)
    }

    /// Short display text taken from the body
    pub fn preview(&self) -> String {
        crate::parse::card::preview(&self.content)
    }
}

/// A board column
#[derive(Debug, Clone, Serialize)]
pub struct Column {
    pub name: String,
    pub cards: Vec<Card>,
}

impl Column {
    pub fn new(name: impl Into<String>) -> Self {
        Column {
            name: name.into(),
            cards: Vec::new(),
        }
    }

    /// Whether this is the terminal Done column
    pub fn is_done(&self) -> bool {
        is_done_column(&self.name)
    }
}

pub fn is_done_column(name: &str) -> bool {
    name.trim().eq_ignore_ascii_case(DONE_COLUMN)
}

/// A kanban board: `board.md` plus a `cards/` directory
#[derive(Debug, Clone, Serialize)]
pub struct Board {
    /// H1 heading of `board.md`
    pub name: String,
    /// Directory containing `board.md`
    pub path: PathBuf,
    pub columns: Vec<Column>,
    pub archived: bool,
    /// Enclosing project, from the directory it was found in
    pub project: Option<String>,
}

impl Board {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Board {
            name: name.into(),
            path: path.into(),
            columns: Vec::new(),
            archived: false,
            project: None,
        }
    }

    pub fn board_file(&self) -> PathBuf {
        self.path.join("board.md")
    }

    pub fn cards_dir(&self) -> PathBuf {
        self.path.join("cards")
    }

    pub fn card_path(&self, filename: &str) -> PathBuf {
        self.cards_dir().join(filename)
    }

    pub fn done_column_index(&self) -> Option<usize> {
        self.columns.iter().position(|c| c.is_done())
    }

    /// Find a column by name (case-insensitive)
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.name.trim().eq_ignore_ascii_case(name.trim()))
    }

    /// Locate a card as `(column index, card index)`
    pub fn find_card(&self, filename: &str) -> Option<(usize, usize)> {
        self.columns.iter().enumerate().find_map(|(ci, col)| {
            col.cards
                .iter()
                .position(|c| c.filename == filename)
                .map(|pos| (ci, pos))
        })
    }

    /// All cards with their column context, in board order
    pub fn cards(&self) -> impl Iterator<Item = CardRef<'_>> {
        self.columns.iter().flat_map(move |column| {
            column.cards.iter().map(move |card| CardRef {
                board: self,
                column,
                card,
            })
        })
    }

    pub fn dir_name(&self) -> &str {
        self.path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("")
    }
}

/// A card together with the board and column it sits in
#[derive(Debug, Clone, Copy)]
pub struct CardRef<'a> {
    pub board: &'a Board,
    pub column: &'a Column,
    pub card: &'a Card,
}

impl CardRef<'_> {
    pub fn in_done_column(&self) -> bool {
        self.column.is_done()
    }

    /// Archived cards and cards on archived boards are hidden everywhere
    pub fn is_hidden(&self) -> bool {
        self.board.archived || self.card.archived
    }
}
