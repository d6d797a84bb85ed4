use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde_yaml::Mapping;

use crate::model::manifest::NoteEntry;
use crate::model::note::Note;
use crate::model::task::DATE_FORMAT;
use crate::parse::{parse_note, render_front_matter};
use crate::util::text::slugify;

/// Error type for note writes
#[derive(Debug, thiserror::Error)]
pub enum NoteError {
    #[error("note already exists: {path}")]
    Exists { path: PathBuf },
    #[error("could not write {path}: {source}")]
    WriteError { path: PathBuf, source: io::Error },
}

/// Read the candidate files and keep the ones that resolve to a date.
/// Unreadable files are skipped.
pub fn load_notes(root: &Path, entries: &[NoteEntry]) -> Vec<Note> {
    let mut notes = Vec::new();
    for entry in entries {
        let content = match fs::read_to_string(&entry.path) {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!("skipping note {}: {}", entry.path.display(), e);
                continue;
            }
        };
        if let Some(note) = note_from(root, entry, &content) {
            notes.push(note);
        }
    }
    notes
}

fn note_from(root: &Path, entry: &NoteEntry, content: &str) -> Option<Note> {
    let stem = entry.path.file_stem()?.to_str()?;
    let header = parse_note(stem, content)?;
    Some(Note {
        title: header.title,
        rel_path: entry
            .path
            .strip_prefix(root)
            .unwrap_or(&entry.path)
            .to_path_buf(),
        file_path: entry.path.clone(),
        date: header.date,
        project: entry.project.clone(),
    })
}

/// Create `<dir>/<date>-<slug>.md` with the title in front matter and as
/// the first heading
pub fn create_note(
    root: &Path,
    dir: &Path,
    title: &str,
    date: NaiveDate,
    project: Option<String>,
) -> Result<Note, NoteError> {
    let day = date.format(DATE_FORMAT).to_string();
    let slug = slugify(title);
    let file_name = if slug.is_empty() {
        format!("{}.md", day)
    } else {
        format!("{}-{}.md", day, slug)
    };
    let path = dir.join(file_name);
    if path.exists() {
        return Err(NoteError::Exists { path });
    }

    let mut meta = Mapping::new();
    meta.insert("title".into(), title.into());
    meta.insert("date".into(), day.into());
    let content = render_front_matter(&meta, &format!("# {}\n", title));

    let write_err = |source| NoteError::WriteError {
        path: path.clone(),
        source,
    };
    fs::create_dir_all(dir).map_err(write_err)?;
    fs::write(&path, content).map_err(write_err)?;
    tracing::debug!(path = %path.display(), "created note");

    Ok(Note {
        title: title.to_string(),
        rel_path: path.strip_prefix(root).unwrap_or(&path).to_path_buf(),
        file_path: path.clone(),
        date,
        project,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, DATE_FORMAT).unwrap()
    }

    #[test]
    fn test_load_notes_keeps_dated_files() {
        let tmp = TempDir::new().unwrap();
        let notes_dir = tmp.path().join("notes");
        fs::create_dir_all(&notes_dir).unwrap();
        fs::write(notes_dir.join("2026-02-06-sync.md"), "# Weekly sync\n").unwrap();
        fs::write(notes_dir.join("ideas.md"), "# Ideas\n").unwrap();
        fs::write(
            notes_dir.join("retro.md"),
            "---\ndate: 2026-02-03\n---\nNo heading\n",
        )
        .unwrap();

        let entries: Vec<NoteEntry> = ["2026-02-06-sync.md", "ideas.md", "retro.md", "gone.md"]
            .iter()
            .map(|name| NoteEntry {
                path: notes_dir.join(name),
                project: None,
            })
            .collect();
        let notes = load_notes(tmp.path(), &entries);

        let summary: Vec<(&str, NaiveDate, PathBuf)> = notes
            .iter()
            .map(|n| (n.title.as_str(), n.date, n.rel_path.clone()))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("Weekly sync", day("2026-02-06"), PathBuf::from("notes/2026-02-06-sync.md")),
                ("retro", day("2026-02-03"), PathBuf::from("notes/retro.md")),
            ]
        );
    }

    #[test]
    fn test_create_note() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("projects/web");
        let note = create_note(
            tmp.path(),
            &dir,
            "Kickoff: API!",
            day("2026-03-01"),
            Some("web".into()),
        )
        .unwrap();
        assert_eq!(note.rel_path, PathBuf::from("projects/web/2026-03-01-kickoff-api.md"));
        assert_eq!(note.project.as_deref(), Some("web"));

        let content = fs::read_to_string(&note.file_path).unwrap();
        let header = parse_note("2026-03-01-kickoff-api", &content).unwrap();
        assert_eq!(header.title, "Kickoff: API!");
        assert_eq!(header.date, day("2026-03-01"));

        assert!(matches!(
            create_note(tmp.path(), &dir, "Kickoff: API!", day("2026-03-01"), None),
            Err(NoteError::Exists { .. })
        ));
    }
}
