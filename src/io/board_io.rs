use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::io::atomic::replace_file;
use crate::model::board::{Board, Card, Column};
use crate::model::manifest::BoardEntry;
use crate::parse::{parse_board_index, parse_card, serialize_board, serialize_card};

/// Error type for board and card file I/O
#[derive(Debug, thiserror::Error)]
pub enum BoardError {
    #[error("no board.md in {path}")]
    NotFound { path: PathBuf },
    #[error("could not read {path}: {source}")]
    ReadError { path: PathBuf, source: io::Error },
    #[error("could not write {path}: {source}")]
    WriteError { path: PathBuf, source: io::Error },
}

fn read_err(path: &Path) -> impl FnOnce(io::Error) -> BoardError + '_ {
    move |source| BoardError::ReadError {
        path: path.to_path_buf(),
        source,
    }
}

fn write_err(path: &Path) -> impl FnOnce(io::Error) -> BoardError + '_ {
    move |source| BoardError::WriteError {
        path: path.to_path_buf(),
        source,
    }
}

/// Load a board directory: `board.md` and every card it links.
///
/// Linked cards whose files are missing or unreadable are skipped, and a
/// card linked twice keeps its first position.
pub fn read_board(dir: &Path, project: Option<String>) -> Result<Board, BoardError> {
    let board_file = dir.join("board.md");
    let content = fs::read_to_string(&board_file).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => BoardError::NotFound {
            path: dir.to_path_buf(),
        },
        _ => read_err(&board_file)(e),
    })?;
    let index = parse_board_index(&content);

    let mut board = Board::new(index.name, dir);
    if board.name.is_empty() {
        board.name = board.dir_name().to_string();
    }
    board.archived = index.archived;
    board.project = project;

    let mut seen = HashSet::new();
    for column_index in index.columns {
        let mut column = Column::new(column_index.name);
        for filename in column_index.cards {
            if !seen.insert(filename.clone()) {
                tracing::debug!(board = %board.name, "card linked twice: {}", filename);
                continue;
            }
            match read_card(&board.card_path(&filename), &filename) {
                Ok(card) => column.cards.push(card),
                Err(e) => tracing::warn!(board = %board.name, "skipping card: {}", e),
            }
        }
        board.columns.push(column);
    }
    Ok(board)
}

/// Read one card file. `filename` is its path relative to `cards/`.
pub fn read_card(path: &Path, filename: &str) -> Result<Card, BoardError> {
    let content = fs::read_to_string(path).map_err(read_err(path))?;
    Ok(parse_card(filename, &content))
}

/// Rewrite `board.md` from the in-memory board
pub fn write_board(board: &Board) -> Result<(), BoardError> {
    let path = board.board_file();
    replace_file(&path, serialize_board(board).as_bytes()).map_err(write_err(&path))
}

/// Write one card file into the board's `cards/` directory
pub fn write_card(board: &Board, card: &Card) -> Result<(), BoardError> {
    let path = board.card_path(&card.filename);
    replace_file(&path, serialize_card(card).as_bytes()).map_err(write_err(&path))
}

/// Remove a card file; a file that is already gone is not an error
pub fn delete_card_file(board: &Board, filename: &str) -> Result<(), BoardError> {
    let path = board.card_path(filename);
    match fs::remove_file(&path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(write_err(&path)(e)),
    }
}

/// Markdown files in `cards/` that no column links to, sorted
pub fn orphan_cards(board: &Board) -> Result<Vec<String>, BoardError> {
    let dir = board.cards_dir();
    let entries = match fs::read_dir(&dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(read_err(&dir)(e)),
    };
    let linked: HashSet<&str> = board.cards().map(|c| c.card.filename.as_str()).collect();
    let mut orphans: Vec<String> = entries
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_ok_and(|t| t.is_file()))
        .filter_map(|e| e.file_name().into_string().ok())
        .filter(|name| name.ends_with(".md") && !name.starts_with('.'))
        .filter(|name| !linked.contains(name.as_str()))
        .collect();
    orphans.sort();
    Ok(orphans)
}

/// Load every discovered board, skipping ones that fail to read
pub fn load_boards(entries: &[BoardEntry]) -> Vec<Board> {
    entries
        .iter()
        .filter_map(|entry| match read_board(&entry.path, entry.project.clone()) {
            Ok(board) => Some(board),
            Err(e) => {
                tracing::warn!("skipping board: {}", e);
                None
            }
        })
        .collect()
}
