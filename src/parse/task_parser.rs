use chrono::NaiveDate;

use crate::model::task::{BodyToken, DATE_FORMAT, Task};
use crate::parse::serialize_task;

/// Error type for task line parsing
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TaskParseError {
    #[error("empty task line")]
    Empty,
    /// The line parses, but writing it back would change it (duplicate
    /// tags, for example). Saving would rewrite the user's text.
    #[error("task line does not round-trip: {original:?} would be written as {parsed:?}")]
    Mismatch { parsed: String, original: String },
}

/// Parse one todo.txt line.
///
/// Grammar: `[x ][(P) ][COMPLETION ][CREATED ]NAME TOKENS`. The completion
/// date is only recognized on done tasks. The result is checked to
/// serialize back to exactly `line`.
pub fn parse_task_line(line: &str) -> Result<Task, TaskParseError> {
    if line.trim().is_empty() {
        return Err(TaskParseError::Empty);
    }

    let mut task = Task::new(String::new());
    let mut rest = line;

    if let Some(after) = rest.strip_prefix("x ") {
        task.done = true;
        rest = after;
    }

    if let Some((priority, after)) = take_priority(rest) {
        task.priority = Some(priority);
        rest = after;
    }

    if task.done
        && let Some((date, after)) = take_date(rest)
    {
        task.completion_date = Some(date);
        rest = after;
    }

    if let Some((date, after)) = take_date(rest) {
        task.created_date = Some(date);
        rest = after;
    }

    let mut words: Vec<&str> = Vec::new();
    for token in rest.split(' ') {
        match classify_token(token) {
            Token::Project(name) => {
                task.projects.insert(name.to_string());
                task.layout.push(BodyToken::Project(name.to_string()));
            }
            Token::Context(name) => {
                task.contexts.insert(name.to_string());
                task.layout.push(BodyToken::Context(name.to_string()));
            }
            Token::Tag(key, value) => {
                // First value wins; a repeated key fails the round-trip check
                task.tags
                    .entry(key.to_string())
                    .or_insert_with(|| value.to_string());
                task.layout.push(BodyToken::Tag(key.to_string()));
            }
            Token::Word(word) => {
                words.push(word);
                task.layout.push(BodyToken::Word);
            }
        }
    }
    task.name = words.join(" ");

    let parsed = serialize_task(&task);
    if parsed != line {
        return Err(TaskParseError::Mismatch {
            parsed,
            original: line.to_string(),
        });
    }
    task.source_text = Some(parsed);
    Ok(task)
}

/// Parse free text typed by a user into a new task. Unlike
/// `parse_task_line`, duplicate tags are collapsed rather than rejected.
pub fn parse_task_text(text: &str) -> Result<Task, TaskParseError> {
    match parse_task_line(text.trim()) {
        Ok(task) => Ok(task),
        Err(TaskParseError::Mismatch { parsed, .. }) => parse_task_line(&parsed),
        Err(e) => Err(e),
    }
}

enum Token<'a> {
    Word(&'a str),
    Project(&'a str),
    Context(&'a str),
    Tag(&'a str, &'a str),
}

fn classify_token(token: &str) -> Token<'_> {
    if let Some(name) = token.strip_prefix('+')
        && is_tag_name(name)
    {
        return Token::Project(name);
    }
    if let Some(name) = token.strip_prefix('@')
        && is_tag_name(name)
    {
        return Token::Context(name);
    }
    if let Some((key, value)) = token.split_once(':')
        && is_tag_name(key)
        && !key.starts_with(['+', '@'])
        && !value.is_empty()
        && !value.starts_with("//")
        && !value.chars().any(char::is_whitespace)
    {
        return Token::Tag(key, value);
    }
    Token::Word(token)
}

fn is_tag_name(s: &str) -> bool {
    !s.is_empty() && !s.chars().any(char::is_whitespace)
}

/// `(A) ` at the start of `s`
fn take_priority(s: &str) -> Option<(char, &str)> {
    let bytes = s.as_bytes();
    if bytes.len() >= 4
        && bytes[0] == b'('
        && bytes[1].is_ascii_uppercase()
        && bytes[2] == b')'
        && bytes[3] == b' '
    {
        Some((bytes[1] as char, &s[4..]))
    } else {
        None
    }
}

/// `yyyy-mm-dd ` at the start of `s`
fn take_date(s: &str) -> Option<(NaiveDate, &str)> {
    let candidate = s.get(..10)?;
    if s.as_bytes().get(10) != Some(&b' ') || !looks_like_date(candidate) {
        return None;
    }
    let date = NaiveDate::parse_from_str(candidate, DATE_FORMAT).ok()?;
    Some((date, &s[11..]))
}

/// Strict `dddd-dd-dd` shape; chrono alone accepts unpadded fields
pub(crate) fn looks_like_date(s: &str) -> bool {
    let b = s.as_bytes();
    b.len() == 10
        && b.iter().enumerate().all(|(i, c)| match i {
            4 | 7 => *c == b'-',
            _ => c.is_ascii_digit(),
        })
}
