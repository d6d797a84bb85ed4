//! Structural board edits.
//!
//! Every operation edits a copy of the board, writes it, and only then
//! replaces the caller's board, so a failed write leaves memory matching
//! disk.

use std::collections::HashSet;
use std::path::Path;

use chrono::{DateTime, FixedOffset};

use crate::io::board_io::{BoardError, delete_card_file, write_board, write_card};
use crate::model::board::{Board, Card, Column, DONE_COLUMN, is_done_column};
use crate::util::text::slugify;

/// Error type for board operations
#[derive(Debug, thiserror::Error)]
pub enum BoardOpError {
    #[error("the {0} column cannot be renamed, deleted or moved")]
    DoneColumnLocked(String),
    #[error("column already exists: {0}")]
    ColumnExists(String),
    #[error("column not found: {0}")]
    ColumnNotFound(String),
    #[error("card not found: {0}")]
    CardNotFound(String),
    #[error("invalid position: {0}")]
    InvalidPosition(String),
    #[error(transparent)]
    Io(#[from] BoardError),
}

/// Columns for a new board
pub const DEFAULT_COLUMNS: &[&str] = &["To Do", "In Progress", DONE_COLUMN];

/// Create `board.md` in `dir` with the given columns
pub fn create_board(dir: &Path, name: &str, columns: &[&str]) -> Result<Board, BoardOpError> {
    let mut board = Board::new(name, dir);
    let mut seen = HashSet::new();
    for column in columns {
        if !seen.insert(column.trim().to_lowercase()) {
            return Err(BoardOpError::ColumnExists(column.to_string()));
        }
        board.columns.push(Column::new(*column));
    }
    write_board(&board)?;
    Ok(board)
}

fn column_or_err(board: &Board, name: &str) -> Result<usize, BoardOpError> {
    board
        .column_index(name)
        .ok_or_else(|| BoardOpError::ColumnNotFound(name.to_string()))
}

fn unlocked_column(board: &Board, name: &str) -> Result<usize, BoardOpError> {
    let index = column_or_err(board, name)?;
    if board.columns[index].is_done() {
        return Err(BoardOpError::DoneColumnLocked(board.columns[index].name.clone()));
    }
    Ok(index)
}

fn commit(board: &mut Board, next: Board) -> Result<(), BoardOpError> {
    write_board(&next)?;
    *board = next;
    Ok(())
}

// ---------------------------------------------------------------------------
// Columns
// ---------------------------------------------------------------------------

/// Add a column just before Done (or at the end if there is none)
pub fn add_column(board: &mut Board, name: &str) -> Result<(), BoardOpError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(BoardOpError::InvalidPosition("column name is empty".into()));
    }
    if board.column_index(name).is_some() {
        return Err(BoardOpError::ColumnExists(name.to_string()));
    }
    let mut next = board.clone();
    let at = next.done_column_index().unwrap_or(next.columns.len());
    next.columns.insert(at, Column::new(name));
    commit(board, next)
}

pub fn rename_column(board: &mut Board, old: &str, new: &str) -> Result<(), BoardOpError> {
    let index = unlocked_column(board, old)?;
    let new = new.trim();
    if new.is_empty() {
        return Err(BoardOpError::InvalidPosition("column name is empty".into()));
    }
    if is_done_column(new) {
        return Err(BoardOpError::DoneColumnLocked(new.to_string()));
    }
    if let Some(existing) = board.column_index(new)
        && existing != index
    {
        return Err(BoardOpError::ColumnExists(new.to_string()));
    }
    let mut next = board.clone();
    next.columns[index].name = new.to_string();
    commit(board, next)
}

/// Delete a column. Its cards move to the column on the left, or the one
/// on the right when it is the first column. Cards landing in Done are
/// stamped the way `move_card` stamps them.
pub fn delete_column(
    board: &mut Board,
    name: &str,
    now: DateTime<FixedOffset>,
) -> Result<(), BoardOpError> {
    let index = unlocked_column(board, name)?;
    let mut next = board.clone();
    let removed = next.columns.remove(index);
    if !removed.cards.is_empty() {
        let target = if index > 0 {
            index - 1
        } else if index < next.columns.len() {
            index
        } else {
            return Err(BoardOpError::InvalidPosition(format!(
                "{} is the only column and has cards",
                removed.name
            )));
        };
        let was_done = removed.is_done();
        let now_done = next.columns[target].is_done();
        for mut card in removed.cards {
            if was_done != now_done {
                card.date_completed = now_done.then_some(now);
                write_card(&next, &card)?;
            }
            next.columns[target].cards.push(card);
        }
    }
    commit(board, next)
}

/// Move a column to `to` (an index in the final column order). Columns
/// cannot cross the Done column.
pub fn move_column(board: &mut Board, name: &str, to: usize) -> Result<(), BoardOpError> {
    let from = unlocked_column(board, name)?;
    let mut next = board.clone();
    let column = next.columns.remove(from);
    if to > next.columns.len() {
        return Err(BoardOpError::InvalidPosition(format!(
            "{} is past the last column",
            to
        )));
    }
    if let Some(done) = next.done_column_index() {
        let was_before = from <= done;
        let stays_before = to <= done;
        if was_before != stays_before {
            return Err(BoardOpError::InvalidPosition(format!(
                "{} cannot move past {}",
                column.name, next.columns[done].name
            )));
        }
    }
    next.columns.insert(to, column);
    commit(board, next)
}

// ---------------------------------------------------------------------------
// Cards
// ---------------------------------------------------------------------------

/// A file name in `cards/` not used by the board or present on disk
fn unique_card_filename(board: &Board, title: &str) -> String {
    let slug = slugify(title);
    let base = if slug.is_empty() { "card".to_string() } else { slug };
    let taken: HashSet<&str> = board.cards().map(|c| c.card.filename.as_str()).collect();
    let free = |name: &str| !taken.contains(name) && !board.card_path(name).exists();

    let first = format!("{}.md", base);
    if free(&first) {
        return first;
    }
    (2..)
        .map(|n| format!("{}-{}.md", base, n))
        .find(|name| free(name))
        .unwrap_or(first)
}

/// Create a card file and append it to `column`. Returns the file name.
pub fn add_card(
    board: &mut Board,
    column: &str,
    title: &str,
    now: DateTime<FixedOffset>,
) -> Result<String, BoardOpError> {
    let index = column_or_err(board, column)?;
    let mut card = Card::new(unique_card_filename(board, title), title.trim());
    if board.columns[index].is_done() {
        card.date_completed = Some(now);
    }
    write_card(board, &card)?;

    let filename = card.filename.clone();
    let mut next = board.clone();
    next.columns[index].cards.push(card);
    commit(board, next)?;
    Ok(filename)
}

/// Move a card to `column` at `position` (end of column if None). Moving
/// into Done stamps `date_completed`; moving out of Done clears it.
pub fn move_card(
    board: &mut Board,
    filename: &str,
    column: &str,
    position: Option<usize>,
    now: DateTime<FixedOffset>,
) -> Result<(), BoardOpError> {
    let (from_col, from_idx) = board
        .find_card(filename)
        .ok_or_else(|| BoardOpError::CardNotFound(filename.to_string()))?;
    let to_col = column_or_err(board, column)?;

    let mut next = board.clone();
    let mut card = next.columns[from_col].cards.remove(from_idx);
    let target_len = next.columns[to_col].cards.len();
    let at = position.unwrap_or(target_len);
    if at > target_len {
        return Err(BoardOpError::InvalidPosition(format!(
            "{} is past the end of {}",
            at, next.columns[to_col].name
        )));
    }

    let was_done = next.columns[from_col].is_done();
    let now_done = next.columns[to_col].is_done();
    if was_done != now_done {
        card.date_completed = now_done.then_some(now);
        write_card(&next, &card)?;
    }
    next.columns[to_col].cards.insert(at, card);
    commit(board, next)
}

/// Remove a card from its column and delete its file
pub fn delete_card(board: &mut Board, filename: &str) -> Result<Card, BoardOpError> {
    let (col, idx) = board
        .find_card(filename)
        .ok_or_else(|| BoardOpError::CardNotFound(filename.to_string()))?;
    let mut next = board.clone();
    let card = next.columns[col].cards.remove(idx);
    commit(board, next)?;
    delete_card_file(board, filename)?;
    Ok(card)
}

pub fn set_board_archived(board: &mut Board, archived: bool) -> Result<(), BoardOpError> {
    if board.archived == archived {
        return Ok(());
    }
    let mut next = board.clone();
    next.archived = archived;
    commit(board, next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::board_io::read_board;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn now() -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339("2026-02-06T10:30:00+01:00").unwrap()
    }

    fn column_names(board: &Board) -> Vec<String> {
        board.columns.iter().map(|c| c.name.clone()).collect()
    }

    fn new_board(tmp: &TempDir) -> Board {
        create_board(&tmp.path().join("boards/sprint"), "Sprint", DEFAULT_COLUMNS).unwrap()
    }

    /// The in-memory board matches a fresh read of disk
    fn assert_persisted(board: &Board) {
        let loaded = read_board(&board.path, None).unwrap();
        assert_eq!(column_names(&loaded), column_names(board));
        for (a, b) in loaded.columns.iter().zip(&board.columns) {
            let a: Vec<&str> = a.cards.iter().map(|c| c.filename.as_str()).collect();
            let b: Vec<&str> = b.cards.iter().map(|c| c.filename.as_str()).collect();
            assert_eq!(a, b);
        }
        assert_eq!(loaded.archived, board.archived);
    }

    #[test]
    fn test_add_column_goes_before_done() {
        let tmp = TempDir::new().unwrap();
        let mut board = new_board(&tmp);
        add_column(&mut board, "Review").unwrap();
        assert_eq!(column_names(&board), vec!["To Do", "In Progress", "Review", "Done"]);
        assert!(matches!(
            add_column(&mut board, "review"),
            Err(BoardOpError::ColumnExists(_))
        ));
        assert_persisted(&board);
    }

    #[test]
    fn test_done_column_locked() {
        let tmp = TempDir::new().unwrap();
        let mut board = new_board(&tmp);
        assert!(matches!(
            rename_column(&mut board, "done", "Finished"),
            Err(BoardOpError::DoneColumnLocked(_))
        ));
        assert!(matches!(
            delete_column(&mut board, "Done", now()),
            Err(BoardOpError::DoneColumnLocked(_))
        ));
        assert!(matches!(
            move_column(&mut board, "Done", 0),
            Err(BoardOpError::DoneColumnLocked(_))
        ));
        assert!(matches!(
            rename_column(&mut board, "To Do", "DONE"),
            Err(BoardOpError::DoneColumnLocked(_))
        ));
    }

    #[test]
    fn test_rename_column() {
        let tmp = TempDir::new().unwrap();
        let mut board = new_board(&tmp);
        rename_column(&mut board, "to do", "Backlog").unwrap();
        rename_column(&mut board, "Backlog", "backlog").unwrap();
        assert!(matches!(
            rename_column(&mut board, "backlog", "In progress"),
            Err(BoardOpError::ColumnExists(_))
        ));
        assert_eq!(column_names(&board), vec!["backlog", "In Progress", "Done"]);
        assert_persisted(&board);
    }

    #[test]
    fn test_move_column_cannot_cross_done() {
        let tmp = TempDir::new().unwrap();
        let mut board = new_board(&tmp);
        move_column(&mut board, "In Progress", 0).unwrap();
        assert_eq!(column_names(&board), vec!["In Progress", "To Do", "Done"]);
        assert!(matches!(
            move_column(&mut board, "To Do", 2),
            Err(BoardOpError::InvalidPosition(_))
        ));
        assert!(matches!(
            move_column(&mut board, "To Do", 9),
            Err(BoardOpError::InvalidPosition(_))
        ));
        assert_persisted(&board);
    }

    #[test]
    fn test_delete_column_migrates_cards_left_then_right() {
        let tmp = TempDir::new().unwrap();
        let mut board = new_board(&tmp);
        let a = add_card(&mut board, "In Progress", "Alpha", now()).unwrap();
        let b = add_card(&mut board, "To Do", "Beta", now()).unwrap();

        delete_column(&mut board, "In Progress", now()).unwrap();
        assert_eq!(column_names(&board), vec!["To Do", "Done"]);
        let todo: Vec<&str> = board.columns[0].cards.iter().map(|c| c.filename.as_str()).collect();
        assert_eq!(todo, vec![b.as_str(), a.as_str()]);

        // First column: cards go right, here into Done
        delete_column(&mut board, "To Do", now()).unwrap();
        assert_eq!(column_names(&board), vec!["Done"]);
        assert_eq!(board.columns[0].cards.len(), 2);
        assert_persisted(&board);
    }

    #[test]
    fn test_delete_column_into_done_stamps_cards() {
        let tmp = TempDir::new().unwrap();
        let mut board =
            create_board(&tmp.path().join("boards/ship"), "Ship", &["Shipping", "Done"]).unwrap();
        let card = add_card(&mut board, "Shipping", "Release", now()).unwrap();
        assert_eq!(board.columns[0].cards[0].date_completed, None);

        delete_column(&mut board, "Shipping", now()).unwrap();
        assert_eq!(column_names(&board), vec!["Done"]);
        assert_eq!(board.columns[0].cards[0].filename, card);
        assert_eq!(board.columns[0].cards[0].date_completed, Some(now()));

        let loaded = read_board(&board.path, None).unwrap();
        assert_eq!(loaded.columns[0].cards[0].date_completed, Some(now()));
    }

    #[test]
    fn test_delete_only_column_with_cards_fails() {
        let tmp = TempDir::new().unwrap();
        let mut board =
            create_board(&tmp.path().join("boards/solo"), "Solo", &["Ideas"]).unwrap();
        add_card(&mut board, "Ideas", "One", now()).unwrap();
        assert!(matches!(
            delete_column(&mut board, "Ideas", now()),
            Err(BoardOpError::InvalidPosition(_))
        ));
        assert_eq!(board.columns[0].cards.len(), 1);
    }

    #[test]
    fn test_add_card_unique_filenames() {
        let tmp = TempDir::new().unwrap();
        let mut board = new_board(&tmp);
        let first = add_card(&mut board, "To Do", "Fix login", now()).unwrap();
        let second = add_card(&mut board, "To Do", "Fix Login!", now()).unwrap();
        assert_eq!(first, "fix-login.md");
        assert_eq!(second, "fix-login-2.md");
        assert!(board.card_path(&second).is_file());

        let loaded = read_board(&board.path, None).unwrap();
        assert_eq!(loaded.columns[0].cards[1].title, "Fix Login!");
    }

    #[test]
    fn test_move_card_stamps_completion() {
        let tmp = TempDir::new().unwrap();
        let mut board = new_board(&tmp);
        let name = add_card(&mut board, "To Do", "Ship it", now()).unwrap();

        move_card(&mut board, &name, "Done", None, now()).unwrap();
        let loaded = read_board(&board.path, None).unwrap();
        let card = &loaded.columns[2].cards[0];
        assert_eq!(card.date_completed, Some(now()));

        move_card(&mut board, &name, "In Progress", Some(0), now()).unwrap();
        let loaded = read_board(&board.path, None).unwrap();
        assert_eq!(loaded.columns[1].cards[0].date_completed, None);
        assert_persisted(&board);
    }

    #[test]
    fn test_move_card_position() {
        let tmp = TempDir::new().unwrap();
        let mut board = new_board(&tmp);
        let a = add_card(&mut board, "To Do", "A", now()).unwrap();
        let b = add_card(&mut board, "To Do", "B", now()).unwrap();
        move_card(&mut board, &b, "To Do", Some(0), now()).unwrap();
        let order: Vec<&str> = board.columns[0].cards.iter().map(|c| c.filename.as_str()).collect();
        assert_eq!(order, vec![b.as_str(), a.as_str()]);
        assert!(matches!(
            move_card(&mut board, &a, "Done", Some(3), now()),
            Err(BoardOpError::InvalidPosition(_))
        ));
        assert!(matches!(
            move_card(&mut board, "nope.md", "Done", None, now()),
            Err(BoardOpError::CardNotFound(_))
        ));
    }

    #[test]
    fn test_delete_card_removes_file() {
        let tmp = TempDir::new().unwrap();
        let mut board = new_board(&tmp);
        let name = add_card(&mut board, "To Do", "Temp", now()).unwrap();
        let removed = delete_card(&mut board, &name).unwrap();
        assert_eq!(removed.title, "Temp");
        assert!(!board.card_path(&name).exists());
        assert_persisted(&board);
    }

    #[test]
    fn test_set_board_archived() {
        let tmp = TempDir::new().unwrap();
        let mut board = new_board(&tmp);
        set_board_archived(&mut board, true).unwrap();
        assert!(read_board(&board.path, None).unwrap().archived);
        set_board_archived(&mut board, false).unwrap();
        assert!(!read_board(&board.path, None).unwrap().archived);
    }
}
