//! Leading YAML front matter on markdown files.
//!
//! Front matter is a block delimited by `---` lines at the very top of the
//! file. Anything unusual about it (no closing delimiter, YAML that does
//! not parse, a value of the wrong type) degrades to "field absent": a
//! human-edited file never fails to load because of its metadata.

use serde_yaml::{Mapping, Value};

/// Parsed front matter plus the untouched body
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrontMatter<'a> {
    pub meta: Mapping,
    /// Everything after the closing delimiter, byte for byte
    pub body: &'a str,
}

/// Split `content` into its YAML block and body. Returns `None` for the
/// YAML when there is no terminated block.
pub fn split_front_matter(content: &str) -> (Option<&str>, &str) {
    let Some(rest) = content
        .strip_prefix("---\n")
        .or_else(|| content.strip_prefix("---\r\n"))
    else {
        return (None, content);
    };

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end_matches(['\r', '\n']) == "---" {
            return (Some(&rest[..offset]), &rest[offset + line.len()..]);
        }
        offset += line.len();
    }
    (None, content)
}

/// Parse front matter into a YAML mapping
pub fn parse_front_matter(content: &str) -> FrontMatter<'_> {
    let (yaml, body) = split_front_matter(content);
    let meta = match yaml {
        Some(yaml) if !yaml.trim().is_empty() => match serde_yaml::from_str::<Value>(yaml) {
            Ok(Value::Mapping(map)) => map,
            Ok(_) => Mapping::new(),
            Err(e) => {
                tracing::debug!("ignoring malformed front matter: {}", e);
                Mapping::new()
            }
        },
        _ => Mapping::new(),
    };
    FrontMatter { meta, body }
}

/// Render `meta` as a front-matter block followed by `body`. An empty
/// mapping writes no block at all.
pub fn render_front_matter(meta: &Mapping, body: &str) -> String {
    if meta.is_empty() {
        return body.to_string();
    }
    let yaml = serde_yaml::to_string(meta).unwrap_or_default();
    let mut out = String::with_capacity(yaml.len() + body.len() + 8);
    out.push_str("---\n");
    out.push_str(&yaml);
    if !yaml.ends_with('\n') {
        out.push('\n');
    }
    out.push_str("---\n");
    out.push_str(body);
    out
}

// ---------------------------------------------------------------------------
// Lenient field access
// ---------------------------------------------------------------------------

/// A scalar as text. Numbers and booleans are stringified.
pub fn get_str(meta: &Mapping, key: &str) -> Option<String> {
    match meta.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
    .filter(|s| !s.trim().is_empty())
}

/// A list of strings. A single scalar counts as a one-element list.
pub fn get_str_list(meta: &Mapping, key: &str) -> Vec<String> {
    match meta.get(key) {
        Some(Value::Sequence(items)) => items
            .iter()
            .filter_map(|v| match v {
                Value::String(s) => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .filter(|s| !s.trim().is_empty())
            .collect(),
        Some(_) => get_str(meta, key).into_iter().collect(),
        None => Vec::new(),
    }
}

pub fn get_bool(meta: &Mapping, key: &str) -> bool {
    match meta.get(key) {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => s.trim().eq_ignore_ascii_case("true"),
        _ => false,
    }
}

pub fn get_u32(meta: &Mapping, key: &str) -> Option<u32> {
    match meta.get(key)? {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
