pub mod board;
pub mod card;
pub mod frontmatter;
pub mod note;
pub mod task_parser;
pub mod task_serializer;

pub use board::{BoardIndex, ColumnIndex, parse_board_index, serialize_board};
pub use card::{parse_card, serialize_card, set_card_title};
pub use frontmatter::{parse_front_matter, render_front_matter};
pub use note::{NoteHeader, parse_note};
pub use task_parser::{TaskParseError, parse_task_line, parse_task_text};
pub use task_serializer::serialize_task;
