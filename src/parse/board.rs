use std::path::{Component, Path};
use std::sync::LazyLock;

use regex::Regex;
use serde_yaml::Mapping;

use crate::model::board::Board;
use crate::parse::frontmatter::{get_bool, parse_front_matter, render_front_matter};

/// `[text](dest)` or `[text](<dest with spaces>)`
static LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[([^\]]*)\]\((?:<([^<>\n]+)>|([^)\s]+))\)").expect("valid regex")
});

/// The structure of a `board.md`, before card files are loaded
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BoardIndex {
    pub name: String,
    pub archived: bool,
    pub columns: Vec<ColumnIndex>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnIndex {
    pub name: String,
    /// Card paths relative to `cards/`, in order
    pub cards: Vec<String>,
}

/// Parse `board.md`. The first H1 names the board; each H2 opens a column;
/// links into `cards/` attach to the open column. Links before any column
/// are dropped.
pub fn parse_board_index(content: &str) -> BoardIndex {
    let fm = parse_front_matter(content);
    let mut index = BoardIndex {
        archived: get_bool(&fm.meta, "archived"),
        ..BoardIndex::default()
    };
    let mut named = false;

    for line in fm.body.lines() {
        let trimmed = line.trim();
        if let Some(name) = trimmed.strip_prefix("## ") {
            index.columns.push(ColumnIndex {
                name: name.trim().to_string(),
                cards: Vec::new(),
            });
            continue;
        }
        if let Some(name) = trimmed.strip_prefix("# ") {
            if !named {
                index.name = name.trim().to_string();
                named = true;
            }
            continue;
        }
        for caps in LINK.captures_iter(line) {
            let Some(dest) = caps.get(2).or_else(|| caps.get(3)) else {
                continue;
            };
            let Some(file) = card_target(dest.as_str()) else {
                continue;
            };
            match index.columns.last_mut() {
                Some(column) => column.cards.push(file.to_string()),
                None => tracing::debug!("dropping card link outside any column: {}", file),
            }
        }
    }
    index
}

/// `./cards/x.md` or `cards/x.md` → `x.md`. Targets that would leave
/// `cards/` are rejected.
fn card_target(dest: &str) -> Option<&str> {
    let file = dest
        .strip_prefix("./cards/")
        .or_else(|| dest.strip_prefix("cards/"))
        .filter(|f| !f.is_empty())?;
    let inside = Path::new(file)
        .components()
        .all(|c| matches!(c, Component::Normal(_)));
    if !inside {
        tracing::warn!("ignoring card link outside cards/: {}", dest);
        return None;
    }
    Some(file)
}

/// Serialize a board's index. Card content lives in the card files; this
/// only records names, order and grouping.
pub fn serialize_board(board: &Board) -> String {
    let mut body = format!("# {}\n", board.name);
    for column in &board.columns {
        body.push('\n');
        body.push_str(&format!("## {}\n", column.name));
        if !column.cards.is_empty() {
            body.push('\n');
        }
        for card in &column.cards {
            body.push_str(&format!(
                "- [{}]({})\n",
                link_text(&card.title),
                link_dest(&card.filename)
            ));
        }
    }

    let mut meta = Mapping::new();
    if board.archived {
        meta.insert("archived".into(), true.into());
    }
    render_front_matter(&meta, &body)
}

/// Destinations with whitespace are wrapped in `<>`
fn link_dest(filename: &str) -> String {
    if filename.contains(char::is_whitespace) {
        format!("<./cards/{}>", filename)
    } else {
        format!("./cards/{}", filename)
    }
}

/// Brackets would end the link text early
fn link_text(title: &str) -> String {
    title.replace('[', "(").replace(']', ")")
}
