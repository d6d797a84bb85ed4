use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "wd", about = concat!("workdesk v", env!("CARGO_PKG_VERSION"), " - tasks, boards and notes in plain files"), version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Workspace root (repeatable; agenda and overdue merge all of them)
    #[arg(short = 'C', long = "workspace", global = true)]
    pub workspace: Vec<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Summarize what the workspace contains
    Scan,
    /// List tasks
    Tasks(TasksArgs),
    /// Append a task
    Add(AddArgs),
    /// Mark a task done
    Done(IdArgs),
    /// Delete a task
    Rm(IdArgs),
    /// Replace a task's text
    Edit(EditArgs),
    /// Move completed tasks into done files
    Archive,
    /// Show dated items over a range of days
    Agenda(AgendaArgs),
    /// Show items due or scheduled before a day
    Overdue(OverdueArgs),
    /// List projects
    Projects,
    /// Rename a project, merging into the target if it exists
    RenameProject(RenameProjectArgs),
    /// Archive or unarchive a project
    ArchiveProject(ArchiveProjectArgs),
    /// List boards
    Boards,
    /// Search tasks, cards and notes by regex
    Search(SearchArgs),
    /// Create a dated note
    Note(NoteArgs),
}

// ---------------------------------------------------------------------------
// Task args
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct TasksArgs {
    /// Include completed tasks
    #[arg(long)]
    pub done: bool,
    /// Filter by project
    #[arg(long)]
    pub project: Option<String>,
    /// Filter by context
    #[arg(long)]
    pub context: Option<String>,
    /// Only tasks due on or before this date (YYYY-MM-DD)
    #[arg(long)]
    pub due_by: Option<String>,
}

#[derive(Args)]
pub struct AddArgs {
    /// Task text in todo.txt format
    pub text: String,
    /// Task file to append to (default: the configured default file)
    #[arg(long)]
    pub file: Option<String>,
}

#[derive(Args)]
pub struct IdArgs {
    /// Task ID
    pub id: String,
}

#[derive(Args)]
pub struct EditArgs {
    /// Task ID
    pub id: String,
    /// New task text
    pub text: String,
}

// ---------------------------------------------------------------------------
// Agenda args
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct AgendaArgs {
    /// First day (YYYY-MM-DD, default: today)
    #[arg(long)]
    pub from: Option<String>,
    /// Number of days (default: from config)
    #[arg(long)]
    pub days: Option<u32>,
}

#[derive(Args)]
pub struct OverdueArgs {
    /// Items dated before this day are overdue (default: today)
    #[arg(long)]
    pub cutoff: Option<String>,
}

// ---------------------------------------------------------------------------
// Project args
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct RenameProjectArgs {
    pub old: String,
    pub new: String,
}

#[derive(Args)]
pub struct ArchiveProjectArgs {
    /// Project name
    pub name: String,
    /// Unarchive instead
    #[arg(long)]
    pub undo: bool,
}

// ---------------------------------------------------------------------------
// Search and notes
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct SearchArgs {
    /// Regex pattern
    pub pattern: String,
}

#[derive(Args)]
pub struct NoteArgs {
    /// Note title
    pub title: String,
    /// Create the note in this project's directory
    #[arg(long)]
    pub project: Option<String>,
}
