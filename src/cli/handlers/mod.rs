use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDate};
use regex::Regex;

use crate::cli::commands::*;
use crate::cli::output::*;
use crate::io::board_io::orphan_cards;
use crate::io::config_io::discover_workspace;
use crate::io::note_io::create_note;
use crate::io::task_store::TaskService;
use crate::model::project::Project;
use crate::model::task::DATE_FORMAT;
use crate::model::workspace::Workspace;
use crate::ops::agenda::{AgendaInput, DayRange, query_agenda, query_overdue};
use crate::ops::project_ops::{projects_dirs, rename_project, set_project_archived};
use crate::ops::search::search_workspace;
use crate::ops::task_ops::{TaskFilter, filter_tasks, replace_text, sort_for_display};

type CmdResult = Result<(), Box<dyn std::error::Error>>;

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

pub fn dispatch(cli: Cli) -> CmdResult {
    let json = cli.json;
    let roots = resolve_roots(&cli.workspace)?;

    match cli.command {
        // Multi-workspace commands
        Commands::Scan => cmd_scan(&roots, json),
        Commands::Agenda(args) => cmd_agenda(&roots, args, json),
        Commands::Overdue(args) => cmd_overdue(&roots, args, json),

        // Read commands
        Commands::Tasks(args) => cmd_tasks(&roots[0], args, json),
        Commands::Projects => cmd_projects(&roots[0], json),
        Commands::Boards => cmd_boards(&roots[0], json),
        Commands::Search(args) => cmd_search(&roots[0], args, json),

        // Write commands
        Commands::Add(args) => cmd_add(&roots[0], args, json),
        Commands::Done(args) => cmd_done(&roots[0], args, json),
        Commands::Rm(args) => cmd_rm(&roots[0], args, json),
        Commands::Edit(args) => cmd_edit(&roots[0], args, json),
        Commands::Archive => cmd_archive(&roots[0], json),
        Commands::RenameProject(args) => cmd_rename_project(&roots[0], args, json),
        Commands::ArchiveProject(args) => cmd_archive_project(&roots[0], args),
        Commands::Note(args) => cmd_note(&roots[0], args, json),
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Canonical workspace roots from `-C`, or the workspace around the cwd.
/// Never empty.
fn resolve_roots(dirs: &[String]) -> Result<Vec<PathBuf>, Box<dyn std::error::Error>> {
    if dirs.is_empty() {
        let cwd = std::env::current_dir()?;
        let root = discover_workspace(&cwd).unwrap_or(cwd);
        return Ok(vec![std::fs::canonicalize(&root)?]);
    }
    dirs.iter()
        .map(|dir| {
            std::fs::canonicalize(dir)
                .map_err(|e| -> Box<dyn std::error::Error> {
                    format!("cannot resolve -C path '{}': {}", dir, e).into()
                })
        })
        .collect()
}

fn load(root: &Path) -> Result<Workspace, Box<dyn std::error::Error>> {
    let ws = Workspace::load(root)?;
    for e in &ws.task_errors {
        eprintln!("warning: {}", e);
    }
    Ok(ws)
}

fn load_all(roots: &[PathBuf]) -> Result<Vec<Workspace>, Box<dyn std::error::Error>> {
    roots.iter().map(|root| load(root)).collect()
}

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, DATE_FORMAT)
        .map_err(|_| format!("invalid date '{}' (expected YYYY-MM-DD)", s))
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

fn print_json<T: serde::Serialize>(value: &T) -> CmdResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

// ---------------------------------------------------------------------------
// Scan
// ---------------------------------------------------------------------------

fn cmd_scan(roots: &[PathBuf], json: bool) -> CmdResult {
    let workspaces = roots
        .iter()
        .map(|root| Workspace::load(root))
        .collect::<Result<Vec<_>, _>>()?;
    let summaries: Vec<ScanJson> = workspaces
        .iter()
        .map(|ws| ScanJson {
            root: ws.root.clone(),
            boards: ws.boards.len(),
            cards: ws.cards().count(),
            tasks: ws.tasks.len(),
            notes: ws.notes.len(),
            projects: ws.projects.len(),
            errors: ws.task_errors.iter().map(|e| e.to_string()).collect(),
        })
        .collect();

    if json {
        return print_json(&summaries);
    }
    for s in &summaries {
        println!("{}", s.root.display());
        println!(
            "  {} boards, {} cards, {} tasks, {} notes, {} projects",
            s.boards, s.cards, s.tasks, s.notes, s.projects
        );
        for e in &s.errors {
            println!("  error: {}", e);
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tasks
// ---------------------------------------------------------------------------

fn cmd_tasks(root: &Path, args: TasksArgs, json: bool) -> CmdResult {
    let ws = load(root)?;
    let filter = TaskFilter {
        include_done: args.done,
        project: args.project,
        context: args.context,
        due_by: args.due_by.as_deref().map(parse_date).transpose()?,
    };
    let mut tasks = filter_tasks(&ws.tasks, &filter);
    sort_for_display(&mut tasks);

    if json {
        let out: Vec<TaskJson> = tasks.iter().map(|t| task_to_json(t)).collect();
        return print_json(&out);
    }
    for task in tasks {
        println!("{}", format_task_line(task));
    }
    Ok(())
}

fn cmd_add(root: &Path, args: AddArgs, json: bool) -> CmdResult {
    let ws = load(root)?;
    let file = args.file.map(|f| {
        let path = PathBuf::from(f);
        if path.is_absolute() { path } else { root.join(path) }
    });
    let task = ws.store.add(&args.text, file.as_deref())?;
    if json {
        return print_json(&task_to_json(&task));
    }
    println!("{}", format_task_line(&task));
    Ok(())
}

fn cmd_done(root: &Path, args: IdArgs, json: bool) -> CmdResult {
    let ws = load(root)?;
    let task = ws.store.complete(&args.id)?;
    if json {
        return print_json(&task_to_json(&task));
    }
    println!("{}", format_task_line(&task));
    Ok(())
}

fn cmd_rm(root: &Path, args: IdArgs, json: bool) -> CmdResult {
    let ws = load(root)?;
    let task = ws.store.delete(&args.id)?;
    if json {
        return print_json(&task_to_json(&task));
    }
    println!("deleted: {}", format_task_line(&task));
    Ok(())
}

fn cmd_edit(root: &Path, args: EditArgs, json: bool) -> CmdResult {
    let ws = load(root)?;
    let current = ws.store.find(&args.id)?;
    let mut edited = replace_text(&current, &args.text)?;
    ws.store.update(&mut edited)?;
    if json {
        return print_json(&task_to_json(&edited));
    }
    println!("{}", format_task_line(&edited));
    Ok(())
}

fn cmd_archive(root: &Path, json: bool) -> CmdResult {
    let ws = load(root)?;
    let moved = ws.store.archive()?;
    if json {
        return print_json(&serde_json::json!({ "archived": moved }));
    }
    println!("archived {} task(s)", moved);
    Ok(())
}

// ---------------------------------------------------------------------------
// Agenda
// ---------------------------------------------------------------------------

fn cmd_agenda(roots: &[PathBuf], args: AgendaArgs, json: bool) -> CmdResult {
    let workspaces = load_all(roots)?;
    let start = match args.from.as_deref() {
        Some(s) => parse_date(s)?,
        None => today(),
    };
    // The first workspace's config sets the default window
    let days = args.days.unwrap_or(workspaces[0].config.agenda.days);
    let input = AgendaInput::from_workspaces(&workspaces);
    let buckets = query_agenda(&input, DayRange::starting(start, days));

    if json {
        let out: Vec<DateBucketJson> = buckets.iter().map(bucket_to_json).collect();
        return print_json(&out);
    }
    let mut first = true;
    for bucket in &buckets {
        if !first {
            println!();
        }
        first = false;
        for line in format_bucket(bucket) {
            println!("{}", line);
        }
    }
    Ok(())
}

fn cmd_overdue(roots: &[PathBuf], args: OverdueArgs, json: bool) -> CmdResult {
    let workspaces = load_all(roots)?;
    let cutoff = match args.cutoff.as_deref() {
        Some(s) => parse_date(s)?,
        None => today(),
    };
    let input = AgendaInput::from_workspaces(&workspaces);
    let items = query_overdue(&input, cutoff);

    if json {
        let out: Vec<AgendaItemJson> = items.iter().map(agenda_item_to_json).collect();
        return print_json(&out);
    }
    for item in &items {
        println!(
            "{}{}",
            item.date.format(DATE_FORMAT),
            format_agenda_item(item, false)
        );
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Projects
// ---------------------------------------------------------------------------

fn project_counts(ws: &Workspace, project: &Project) -> (usize, usize) {
    (
        ws.tasks_for_project(&project.name).count(),
        ws.cards_for_project(&project.name).count(),
    )
}

fn print_project_tree(ws: &Workspace, project: &Project, depth: usize) {
    let (tasks, cards) = project_counts(ws, project);
    println!("{}", format_project(project, depth, tasks, cards));
    for child in ws.projects.children_of(&project.name) {
        print_project_tree(ws, child, depth + 1);
    }
}

fn cmd_projects(root: &Path, json: bool) -> CmdResult {
    let ws = load(root)?;
    if json {
        let out: Vec<ProjectJson> = ws
            .projects
            .iter()
            .map(|p| {
                let (tasks, cards) = project_counts(&ws, p);
                project_to_json(p, tasks, cards)
            })
            .collect();
        return print_json(&out);
    }
    for project in ws.projects.top_level() {
        print_project_tree(&ws, project, 0);
    }
    let dirs = projects_dirs(&ws.root, &ws.projects);
    let dirs: Vec<String> = dirs
        .iter()
        .map(|d| d.strip_prefix(&ws.root).unwrap_or(d).display().to_string())
        .collect();
    println!();
    println!("new projects go in: {}", dirs.join(", "));
    Ok(())
}

fn cmd_rename_project(root: &Path, args: RenameProjectArgs, json: bool) -> CmdResult {
    let mut ws = load(root)?;
    let report = rename_project(&mut ws, &args.old, &args.new)?;
    for path in &report.skipped {
        eprintln!("warning: left in place: {}", path.display());
    }
    if json {
        return print_json(&RenameJson {
            old: args.old,
            new: args.new,
            dir: report.dir,
            merged: report.merged,
            appended: report.appended,
            skipped: report.skipped,
            tasks_updated: report.tasks_updated,
            cards_updated: report.cards_updated,
        });
    }
    let verb = if report.merged { "merged" } else { "renamed" };
    println!(
        "{} {} -> {} ({} tasks, {} cards updated)",
        verb, args.old, args.new, report.tasks_updated, report.cards_updated
    );
    Ok(())
}

fn cmd_archive_project(root: &Path, args: ArchiveProjectArgs) -> CmdResult {
    let mut ws = load(root)?;
    set_project_archived(&mut ws, &args.name, !args.undo)?;
    let state = if args.undo { "unarchived" } else { "archived" };
    println!("{} {}", state, args.name);
    Ok(())
}

// ---------------------------------------------------------------------------
// Boards, search, notes
// ---------------------------------------------------------------------------

fn cmd_boards(root: &Path, json: bool) -> CmdResult {
    let ws = load(root)?;
    let mut rows = Vec::new();
    for board in &ws.boards {
        let orphans = orphan_cards(board).unwrap_or_else(|e| {
            tracing::warn!("cannot list orphans: {}", e);
            Vec::new()
        });
        rows.push((board, orphans));
    }
    if json {
        let out: Vec<BoardJson> = rows
            .into_iter()
            .map(|(board, orphans)| board_to_json(board, orphans))
            .collect();
        return print_json(&out);
    }
    for (board, orphans) in &rows {
        println!("{}", format_board(board, &ws.root, orphans.len()));
    }
    Ok(())
}

fn cmd_search(root: &Path, args: SearchArgs, json: bool) -> CmdResult {
    let ws = load(root)?;
    let re = Regex::new(&args.pattern)?;
    let hits = search_workspace(&ws, &re);
    if json {
        return print_json(&hits);
    }
    for hit in &hits {
        println!("{}", format_search_hit(hit));
    }
    Ok(())
}

fn cmd_note(root: &Path, args: NoteArgs, json: bool) -> CmdResult {
    let ws = load(root)?;
    let dir = match args.project.as_deref() {
        Some(name) => {
            let project = ws
                .projects
                .get(name)
                .ok_or_else(|| format!("project not found: {}", name))?;
            project
                .dir_path
                .clone()
                .ok_or_else(|| format!("project has no directory: {}", name))?
        }
        None => ws.root.join("notes"),
    };
    let note = create_note(&ws.root, &dir, &args.title, today(), args.project)?;
    if json {
        return print_json(&serde_json::json!({
            "title": note.title,
            "path": note.rel_path,
            "date": note.date.format(DATE_FORMAT).to_string(),
        }));
    }
    println!("{}", note.rel_path.display());
    Ok(())
}
