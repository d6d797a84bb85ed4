use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

use crate::model::task::DATE_FORMAT;
use crate::parse::card::{first_heading, parse_day};
use crate::parse::frontmatter::{get_str, parse_front_matter};

static FILENAME_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{4}-\d{2}-\d{2})").expect("valid regex"));

/// Title and date resolved from a note's text and file name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteHeader {
    pub title: String,
    pub date: NaiveDate,
}

/// Resolve a note's header. Returns `None` when no date can be found,
/// meaning the file is not a note.
pub fn parse_note(file_stem: &str, content: &str) -> Option<NoteHeader> {
    let fm = parse_front_matter(content);
    let date = get_str(&fm.meta, "date")
        .and_then(|s| parse_day(&s))
        .or_else(|| date_in_filename(file_stem))?;

    let title = get_str(&fm.meta, "title")
        .map(|t| t.trim().to_string())
        .or_else(|| first_heading(fm.body))
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| title_from_stem(file_stem));

    Some(NoteHeader { title, date })
}

/// The first valid `yyyy-mm-dd` anywhere in the name
pub fn date_in_filename(name: &str) -> Option<NaiveDate> {
    FILENAME_DATE
        .captures_iter(name)
        .find_map(|c| NaiveDate::parse_from_str(&c[1], DATE_FORMAT).ok())
}

/// `2026-02-06-weekly-sync` → `weekly sync`; falls back to the whole stem
fn title_from_stem(stem: &str) -> String {
    let stripped = FILENAME_DATE.replace(stem, "");
    let words: Vec<&str> = stripped
        .split(['-', '_', ' '])
        .filter(|w| !w.is_empty())
        .collect();
    if words.is_empty() {
        stem.to_string()
    } else {
        words.join(" ")
    }
}
