use std::path::PathBuf;

use chrono::NaiveDate;
use serde::Serialize;

/// A dated markdown note
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Note {
    pub title: String,
    /// Absolute path of the note file
    pub file_path: PathBuf,
    /// Path relative to the workspace root
    pub rel_path: PathBuf,
    /// Front-matter `date:`, else a `yyyy-mm-dd` found in the file name
    pub date: NaiveDate,
    /// Enclosing project, from the directory it was found in
    pub project: Option<String>,
}
