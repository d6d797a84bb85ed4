use chrono::{DateTime, NaiveDate};
use serde_yaml::{Mapping, Value};

use crate::model::board::{Card, CardUrl};
use crate::model::task::DATE_FORMAT;
use crate::parse::frontmatter::{
    get_bool, get_str, get_str_list, get_u32, parse_front_matter, render_front_matter,
};
use crate::util::text::truncate_to_width;

/// Display cells in a card preview
pub const PREVIEW_WIDTH: usize = 60;

/// Front-matter keys interpreted by the card codec
const CARD_KEYS: &[&str] = &[
    "tags",
    "projects",
    "url",
    "urls",
    "due",
    "scheduled",
    "date_completed",
    "priority",
    "archived",
];

/// Parse a card file. Never fails: bad metadata just leaves fields unset.
pub fn parse_card(filename: &str, content: &str) -> Card {
    let fm = parse_front_matter(content);
    let meta = &fm.meta;

    let mut urls = Vec::new();
    if let Some(url) = get_str(meta, "url") {
        urls.push(CardUrl { label: None, url });
    }
    if let Some(Value::Sequence(items)) = meta.get("urls") {
        urls.extend(items.iter().filter_map(parse_url_entry));
    }

    let extra: Mapping = meta
        .iter()
        .filter(|(k, _)| !k.as_str().is_some_and(|k| CARD_KEYS.contains(&k)))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();

    Card {
        filename: filename.to_string(),
        title: first_heading(fm.body).unwrap_or_default(),
        tags: get_str_list(meta, "tags"),
        projects: get_str_list(meta, "projects"),
        urls,
        due: get_str(meta, "due").and_then(|s| parse_day(&s)),
        scheduled: get_str(meta, "scheduled").and_then(|s| parse_day(&s)),
        date_completed: get_str(meta, "date_completed")
            .and_then(|s| DateTime::parse_from_rfc3339(s.trim()).ok()),
        priority: get_u32(meta, "priority").unwrap_or(0),
        archived: get_bool(meta, "archived"),
        content: fm.body.to_string(),
        extra,
    }
}

/// Serialize a card: non-empty fields only, then unknown keys, then the
/// body exactly as stored.
pub fn serialize_card(card: &Card) -> String {
    let mut meta = Mapping::new();

    if !card.tags.is_empty() {
        meta.insert("tags".into(), string_seq(&card.tags));
    }
    if !card.projects.is_empty() {
        meta.insert("projects".into(), string_seq(&card.projects));
    }
    if !card.urls.is_empty() {
        let urls = card
            .urls
            .iter()
            .map(|u| {
                let mut entry = Mapping::new();
                if let Some(label) = u.label.as_deref().filter(|l| !l.is_empty()) {
                    entry.insert("label".into(), label.into());
                }
                entry.insert("url".into(), u.url.as_str().into());
                Value::Mapping(entry)
            })
            .collect();
        meta.insert("urls".into(), Value::Sequence(urls));
    }
    if let Some(due) = card.due {
        meta.insert("due".into(), due.format(DATE_FORMAT).to_string().into());
    }
    if let Some(scheduled) = card.scheduled {
        meta.insert(
            "scheduled".into(),
            scheduled.format(DATE_FORMAT).to_string().into(),
        );
    }
    if let Some(done) = card.date_completed {
        meta.insert("date_completed".into(), done.to_rfc3339().into());
    }
    if card.priority > 0 {
        meta.insert("priority".into(), card.priority.into());
    }
    if card.archived {
        meta.insert("archived".into(), true.into());
    }
    for (k, v) in &card.extra {
        meta.insert(k.clone(), v.clone());
    }

    render_front_matter(&meta, &card.content)
}

/// Change a card's title, rewriting the first H1 of its body (or adding
/// one at the top)
pub fn set_card_title(card: &mut Card, title: &str) {
    let mut out = String::with_capacity(card.content.len() + title.len());
    let mut replaced = false;
    let mut in_fence = false;
    for line in card.content.split_inclusive('\n') {
        if line.trim_start().starts_with("```") {
            in_fence = !in_fence;
        }
        if !replaced && !in_fence && heading_text(line).is_some() {
            out.push_str("# ");
            out.push_str(title);
            out.push_str(if line.ends_with("\r\n") {
                "\r\n"
            } else if line.ends_with('\n') {
                "\n"
            } else {
                ""
            });
            replaced = true;
        } else {
            out.push_str(line);
        }
    }
    if !replaced {
        out = format!("# {}\n\n{}", title, card.content);
    }
    card.content = out;
    card.title = title.to_string();
}

/// The first `# ` heading outside code fences
pub fn first_heading(body: &str) -> Option<String> {
    let mut in_fence = false;
    for line in body.lines() {
        if line.trim_start().starts_with("```") {
            in_fence = !in_fence;
            continue;
        }
        if !in_fence && let Some(text) = heading_text(line) {
            return Some(text.to_string());
        }
    }
    None
}

fn heading_text(line: &str) -> Option<&str> {
    let text = line.trim_end_matches(['\r', '\n']).strip_prefix("# ")?;
    Some(text.trim())
}

/// First two non-heading paragraphs, joined by a space and truncated
pub fn preview(body: &str) -> String {
    let mut paragraphs: Vec<String> = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut in_fence = false;

    for line in body.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with("```") {
            in_fence = !in_fence;
            continue;
        }
        if in_fence {
            continue;
        }
        if trimmed.is_empty() || trimmed.starts_with('#') {
            if !current.is_empty() {
                paragraphs.push(current.join(" "));
                current.clear();
            }
            if paragraphs.len() >= 2 {
                break;
            }
            continue;
        }
        current.push(trimmed);
    }
    if !current.is_empty() && paragraphs.len() < 2 {
        paragraphs.push(current.join(" "));
    }

    truncate_to_width(&paragraphs.join(" "), PREVIEW_WIDTH)
}

/// A calendar day. Accepts a full timestamp and keeps its date part.
pub(crate) fn parse_day(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    let day = s.get(..10)?;
    if !crate::parse::task_parser::looks_like_date(day) {
        return None;
    }
    if s.len() > 10 && !s[10..].starts_with(['T', ' ']) {
        return None;
    }
    NaiveDate::parse_from_str(day, DATE_FORMAT).ok()
}

fn parse_url_entry(v: &Value) -> Option<CardUrl> {
    match v {
        Value::String(url) if !url.trim().is_empty() => Some(CardUrl {
            label: None,
            url: url.clone(),
        }),
        Value::Mapping(m) => {
            let url = get_str(m, "url")?;
            Some(CardUrl {
                label: get_str(m, "label"),
                url,
            })
        }
        _ => None,
    }
}

fn string_seq(items: &[String]) -> Value {
    Value::Sequence(items.iter().map(|s| Value::String(s.clone())).collect())
}
