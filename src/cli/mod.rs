use std::{
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use clap::{Args, Subcommand};
use serde_json::{Value, json};
use tracing::{error, warn};

use crate::{
    board::{ColumnBuckets, group_tasks},
    board_file::BoardFile,
    drag::{DragIntent, DragReorderCoordinator, DropTarget},
    error::PersistenceError,
    persistence::PersistenceGuard,
    scheduler::SystemClock,
    settings::Settings,
    storage::FileStore,
    types::{STATUS_ARCHIVED, Task, visible_tasks},
    ui_state::{UI_STATE_KEY, UiState, migrate_ui_state, validate_ui_state},
};

const SCHEMA_VERSION: &str = "taskboard.cli.v1";

#[derive(Debug, Clone, Subcommand)]
pub enum RootCommand {
    Board {
        #[command(subcommand)]
        command: BoardCommand,
    },
    Task {
        #[command(subcommand)]
        command: TaskCommand,
    },
    State {
        #[command(subcommand)]
        command: StateCommand,
    },
}

#[derive(Debug, Clone, Subcommand)]
pub enum BoardCommand {
    Show(BoardShowArgs),
}

#[derive(Debug, Clone, Subcommand)]
pub enum TaskCommand {
    Move(TaskMoveArgs),
    Reorder(TaskReorderArgs),
    Archive(TaskArchiveArgs),
}

#[derive(Debug, Clone, Subcommand)]
pub enum StateCommand {
    Get(StateGetArgs),
    Set(StateSetArgs),
    Reset,
}

#[derive(Debug, Clone, Args)]
pub struct BoardFileArgs {
    #[arg(long, value_name = "FILE")]
    pub file: PathBuf,
}

#[derive(Debug, Clone, Args)]
pub struct BoardShowArgs {
    #[command(flatten)]
    pub board: BoardFileArgs,

    #[arg(long)]
    pub include_archived: bool,
}

#[derive(Debug, Clone, Args)]
pub struct TaskMoveArgs {
    #[command(flatten)]
    pub board: BoardFileArgs,

    #[arg(long, value_name = "TASK_ID")]
    pub id: String,

    #[arg(long, value_name = "COLUMN")]
    pub to: String,
}

#[derive(Debug, Clone, Args)]
pub struct TaskReorderArgs {
    #[command(flatten)]
    pub board: BoardFileArgs,

    #[arg(long, value_name = "TASK_ID")]
    pub id: String,

    #[arg(long, value_name = "N")]
    pub index: usize,
}

#[derive(Debug, Clone, Args)]
pub struct TaskArchiveArgs {
    #[command(flatten)]
    pub board: BoardFileArgs,

    #[arg(long, value_name = "TASK_ID")]
    pub id: String,
}

#[derive(Debug, Clone, Args)]
pub struct StateGetArgs {
    #[arg(long, value_name = "NAME")]
    pub property: Option<String>,
}

#[derive(Debug, Clone, Args)]
pub struct StateSetArgs {
    #[arg(long, value_name = "NAME")]
    pub property: String,

    /// JSON value; bare words are taken as strings.
    #[arg(long, value_name = "VALUE")]
    pub value: String,
}

pub fn run(settings: &Settings, command: RootCommand, json_output: bool, quiet: bool) -> i32 {
    match execute(settings, command) {
        Ok(output) => {
            print_success(output, json_output, quiet);
            0
        }
        Err(err) => {
            print_error(&err, json_output);
            err.exit_code
        }
    }
}

#[derive(Debug)]
struct CommandOutput {
    command: &'static str,
    data: Value,
    text: String,
}

#[derive(Debug)]
struct CliError {
    exit_code: i32,
    code: &'static str,
    message: String,
    details: Option<Value>,
}

type CliResult<T> = Result<T, CliError>;

fn execute(settings: &Settings, command: RootCommand) -> CliResult<CommandOutput> {
    match command {
        RootCommand::Board {
            command: BoardCommand::Show(args),
        } => board_show(settings, args),
        RootCommand::Task { command } => match command {
            TaskCommand::Move(args) => task_move(settings, args),
            TaskCommand::Reorder(args) => task_reorder(settings, args),
            TaskCommand::Archive(args) => task_archive(args),
        },
        RootCommand::State { command } => {
            let store_dir = settings
                .persistence
                .state_dir
                .clone()
                .unwrap_or_else(FileStore::default_dir);
            execute_state_command(settings, &store_dir, command)
        }
    }
}

/// Loads the board with tasks in stored order so grouping sees column order.
fn load_board(path: &Path) -> CliResult<BoardFile> {
    if !path.exists() {
        return Err(not_found_error(
            "BOARD_NOT_FOUND",
            format!("board file '{}' not found", path.display()),
        ));
    }
    let mut board = BoardFile::load(path).map_err(runtime_error)?;
    board.tasks.sort_by_key(|task| task.order);
    Ok(board)
}

fn board_show(settings: &Settings, args: BoardShowArgs) -> CliResult<CommandOutput> {
    let board = load_board(&args.board.file)?;
    let columns = board.columns_or(&settings.columns);
    let tasks = if args.include_archived {
        board.tasks.clone()
    } else {
        visible_tasks(&board.tasks)
    };
    let buckets = group_tasks(&tasks, columns, &settings.status_mapper());

    let over_limit: Vec<&str> = buckets
        .over_limit()
        .into_iter()
        .map(|column| column.id.as_str())
        .collect();
    for column in &over_limit {
        warn!(column, "column exceeds its WIP limit");
    }

    let data = json!({
        "columns": buckets.iter().map(|bucket| json!({
            "id": bucket.column.id,
            "name": bucket.column.name,
            "wip_limit": bucket.column.wip_limit,
            "over_limit": bucket.is_over_limit(),
            "tasks": bucket.tasks.iter().map(task_json).collect::<Vec<_>>(),
        })).collect::<Vec<_>>(),
        "total": buckets.total_len(),
    });

    Ok(CommandOutput {
        command: "board show",
        data,
        text: render_board_text(&buckets),
    })
}

fn render_board_text(buckets: &ColumnBuckets) -> String {
    if buckets.buckets().is_empty() {
        return "No columns configured.".to_string();
    }

    let headers = ["Column", "Count", "WIP", "Tasks"];
    let rows = buckets
        .iter()
        .map(|bucket| {
            let wip = match bucket.column.wip_limit {
                Some(limit) if bucket.is_over_limit() => format!("{limit} (over)"),
                Some(limit) => limit.to_string(),
                None => "-".to_string(),
            };
            let titles = bucket
                .tasks
                .iter()
                .map(|task| task.title.replace('\n', " "))
                .collect::<Vec<_>>()
                .join(", ");

            vec![
                bucket.column.id.clone(),
                bucket.tasks.len().to_string(),
                wip,
                titles,
            ]
        })
        .collect::<Vec<_>>();

    render_text_table(&headers, &rows)
}

fn render_text_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths = headers
        .iter()
        .map(|header| header.chars().count())
        .collect::<Vec<_>>();

    for row in rows {
        for (index, cell) in row.iter().enumerate() {
            widths[index] = widths[index].max(cell.chars().count());
        }
    }

    let border = format!(
        "+{}+",
        widths
            .iter()
            .map(|width| "-".repeat(*width + 2))
            .collect::<Vec<_>>()
            .join("+")
    );
    let format_row = |cells: Vec<&str>| {
        format!(
            "| {} |",
            cells
                .iter()
                .enumerate()
                .map(|(index, cell)| format!("{cell:<width$}", width = widths[index]))
                .collect::<Vec<_>>()
                .join(" | ")
        )
    };

    let mut lines = vec![border.clone(), format_row(headers.to_vec()), border.clone()];
    for row in rows {
        lines.push(format_row(row.iter().map(String::as_str).collect()));
    }
    lines.push(border);
    lines.join("\n")
}

fn task_move(settings: &Settings, args: TaskMoveArgs) -> CliResult<CommandOutput> {
    let mut board = load_board(&args.board.file)?;
    let task_id = resolve_task_id_selector(&board.tasks, &args.id)?;
    let columns = board.columns_or(&settings.columns).to_vec();
    if !columns.iter().any(|column| column.id == args.to) {
        return Err(not_found_error(
            "COLUMN_NOT_FOUND",
            format!("column '{}' not found", args.to),
        ));
    }

    let mut coordinator = DragReorderCoordinator::new(columns, settings.status_mapper());
    coordinator.start(&task_id, &board.tasks);
    let intent = coordinator.end(Some(DropTarget::Column(args.to.clone())), &board.tasks);

    commit_intent(
        "task move",
        &args.board.file,
        &mut board,
        &coordinator,
        &task_id,
        intent,
        format!("task {task_id} is already in {}", args.to),
    )
}

fn task_reorder(settings: &Settings, args: TaskReorderArgs) -> CliResult<CommandOutput> {
    let mut board = load_board(&args.board.file)?;
    let task_id = resolve_task_id_selector(&board.tasks, &args.id)?;
    let columns = board.columns_or(&settings.columns).to_vec();
    let mapper = settings.status_mapper();

    let buckets = group_tasks(&board.tasks, &columns, &mapper);
    let Some((column_id, _)) = buckets.position_of(&task_id) else {
        return Err(not_found_error(
            "TASK_NOT_ON_BOARD",
            format!("task {task_id} is not in any column"),
        ));
    };
    let column_tasks = buckets.get(column_id).unwrap_or_default();
    let Some(over) = column_tasks.get(args.index) else {
        return Err(usage_error(
            "INDEX_OUT_OF_RANGE",
            format!(
                "index {} is out of range for column '{}' ({} tasks)",
                args.index,
                column_id,
                column_tasks.len()
            ),
        ));
    };
    let target = DropTarget::Task(over.id.clone());

    let mut coordinator = DragReorderCoordinator::new(columns.clone(), mapper);
    coordinator.start(&task_id, &board.tasks);
    let intent = coordinator.end(Some(target), &board.tasks);

    commit_intent(
        "task reorder",
        &args.board.file,
        &mut board,
        &coordinator,
        &task_id,
        intent,
        format!("task {task_id} is already at index {}", args.index),
    )
}

fn commit_intent(
    command: &'static str,
    path: &Path,
    board: &mut BoardFile,
    coordinator: &DragReorderCoordinator,
    task_id: &str,
    intent: Option<DragIntent>,
    unchanged_text: String,
) -> CliResult<CommandOutput> {
    let Some(intent) = intent else {
        return Ok(CommandOutput {
            command,
            data: json!({ "intent": Value::Null, "changed": false }),
            text: unchanged_text,
        });
    };

    coordinator.apply(&mut board.tasks, &intent);
    board.save(path).map_err(runtime_error)?;

    let text = match &intent {
        DragIntent::StatusUpdate { status, .. } => format!("moved task {task_id} to {status}"),
        DragIntent::Reorder { column_id, orders } => {
            format!("reordered {} tasks in {column_id}", orders.len())
        }
    };
    let intent_json = serde_json::to_value(&intent).map_err(runtime_error)?;

    Ok(CommandOutput {
        command,
        data: json!({ "intent": intent_json, "changed": true }),
        text,
    })
}

fn task_archive(args: TaskArchiveArgs) -> CliResult<CommandOutput> {
    let mut board = load_board(&args.board.file)?;
    let task_id = resolve_task_id_selector(&board.tasks, &args.id)?;
    let task = board
        .tasks
        .iter_mut()
        .find(|task| task.id == task_id)
        .ok_or_else(|| not_found_error("TASK_NOT_FOUND", format!("task {task_id} not found")))?;

    if !task.is_archived() {
        task.status = Some(STATUS_ARCHIVED.to_string());
    }
    let data = json!({ "task": task_json(task) });
    board.save(&args.board.file).map_err(runtime_error)?;

    Ok(CommandOutput {
        command: "task archive",
        data,
        text: format!("archived task {task_id}"),
    })
}

fn execute_state_command(
    settings: &Settings,
    store_dir: &Path,
    command: StateCommand,
) -> CliResult<CommandOutput> {
    let failures: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&failures);
    let mut guard = PersistenceGuard::new(
        Arc::new(FileStore::new(store_dir)),
        Arc::new(SystemClock),
    )
    .with_config(settings.persistence_config())
    .with_migration(migrate_ui_state)
    .with_validation(validate_ui_state)
    .on_error(move |err| {
        sink.lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(format!("{}: {err}", err.kind()));
    });

    let output = match command {
        StateCommand::Get(args) => state_get(&guard, args),
        StateCommand::Set(args) => state_set(&mut guard, args),
        StateCommand::Reset => {
            let state = guard.reset(UI_STATE_KEY, UiState::default());
            Ok(CommandOutput {
                command: "state reset",
                data: json!({ "state": state }),
                text: "ui state reset to defaults".to_string(),
            })
        }
    };

    let warnings = failures.lock().unwrap_or_else(|e| e.into_inner()).clone();
    let mut output = output?;
    if !warnings.is_empty() {
        output.data["warnings"] = json!(warnings);
    }
    Ok(output)
}

fn state_get(guard: &PersistenceGuard, args: StateGetArgs) -> CliResult<CommandOutput> {
    match args.property {
        Some(name) => {
            ensure_known_property(&name)?;
            let value = guard
                .get_property(UI_STATE_KEY, UiState::default(), &name)
                .unwrap_or(Value::Null);
            Ok(CommandOutput {
                command: "state get",
                text: format!("{name} = {value}"),
                data: json!({ "property": name, "value": value }),
            })
        }
        None => {
            let state = guard.load(UI_STATE_KEY, UiState::default());
            let value = serde_json::to_value(&state).map_err(runtime_error)?;
            let text = serde_json::to_string_pretty(&value).map_err(runtime_error)?;
            Ok(CommandOutput {
                command: "state get",
                data: json!({ "state": value }),
                text,
            })
        }
    }
}

fn state_set(guard: &mut PersistenceGuard, args: StateSetArgs) -> CliResult<CommandOutput> {
    ensure_known_property(&args.property)?;
    let value = parse_property_value(&args.value);

    let state = guard
        .set_property(UI_STATE_KEY, UiState::default(), &args.property, value)
        .map_err(persistence_error)?;
    if guard.flush() == 0 {
        return Err(runtime_error(format!(
            "failed to write ui state for property '{}'",
            args.property
        )));
    }

    Ok(CommandOutput {
        command: "state set",
        data: json!({ "state": state }),
        text: format!("updated {}", args.property),
    })
}

fn ensure_known_property(name: &str) -> CliResult<()> {
    let known = match serde_json::to_value(UiState::default()) {
        Ok(Value::Object(map)) => map.keys().cloned().collect::<Vec<_>>(),
        _ => Vec::new(),
    };
    if known.iter().any(|key| key == name) {
        return Ok(());
    }
    Err(CliError {
        exit_code: 2,
        code: "UNKNOWN_PROPERTY",
        message: format!("unknown ui state property '{name}'"),
        details: Some(json!({ "known": known })),
    })
}

fn parse_property_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

/// Exact id, or a unique prefix of one.
fn resolve_task_id_selector(tasks: &[Task], selector: &str) -> CliResult<String> {
    let trimmed = selector.trim();
    if trimmed.is_empty() {
        return Err(usage_error("TASK_ID_REQUIRED", "task id cannot be empty"));
    }

    if tasks.iter().any(|task| task.id == trimmed) {
        return Ok(trimmed.to_string());
    }

    let matches = tasks
        .iter()
        .filter(|task| task.id.starts_with(trimmed))
        .map(|task| task.id.clone())
        .collect::<Vec<_>>();

    match matches.as_slice() {
        [single] => Ok(single.clone()),
        [] => Err(not_found_error(
            "TASK_NOT_FOUND",
            format!("task '{selector}' not found"),
        )),
        many => Err(CliError {
            exit_code: 4,
            code: "TASK_ID_AMBIGUOUS",
            message: format!(
                "task id prefix '{selector}' matches {} tasks; use a longer id",
                many.len()
            ),
            details: Some(json!({ "matches": many })),
        }),
    }
}

fn task_json(task: &Task) -> Value {
    json!({
        "id": task.id,
        "title": task.title,
        "status": task.status,
        "priority": task.priority.as_str(),
        "due_date": task.due_date,
        "assignee": task.assignee,
        "tags": task.tags,
        "subtasks": task.subtasks,
        "order": task.order,
    })
}

fn usage_error(code: &'static str, message: impl Into<String>) -> CliError {
    CliError {
        exit_code: 2,
        code,
        message: message.into(),
        details: None,
    }
}

fn not_found_error(code: &'static str, message: impl Into<String>) -> CliError {
    CliError {
        exit_code: 3,
        code,
        message: message.into(),
        details: None,
    }
}

fn runtime_error(err: impl std::fmt::Display) -> CliError {
    CliError {
        exit_code: 5,
        code: "RUNTIME_ERROR",
        message: err.to_string(),
        details: None,
    }
}

fn persistence_error(err: PersistenceError) -> CliError {
    match err {
        PersistenceError::Validation { .. } => CliError {
            exit_code: 2,
            code: "INVALID_PROPERTY_VALUE",
            message: err.to_string(),
            details: None,
        },
        PersistenceError::InfiniteLoopDetected { .. } => CliError {
            exit_code: 5,
            code: "SAVE_LOOP_DETECTED",
            message: err.to_string(),
            details: None,
        },
        other => runtime_error(other),
    }
}

fn print_success(output: CommandOutput, json_output: bool, quiet: bool) {
    if json_output {
        let payload = json!({
            "schema_version": SCHEMA_VERSION,
            "command": output.command,
            "data": output.data
        });
        match serde_json::to_string_pretty(&payload) {
            Ok(value) => println!("{value}"),
            Err(_) => println!("{}", payload),
        }
        return;
    }

    if quiet {
        return;
    }

    if output.text.is_empty() {
        println!("ok");
    } else {
        println!("{}", output.text);
    }
}

fn print_error(err: &CliError, json_output: bool) {
    error!(
        code = err.code,
        message = %err.message,
        details = ?err.details,
        "cli command failed"
    );

    if json_output {
        let payload = json!({
            "schema_version": SCHEMA_VERSION,
            "error": {
                "code": err.code,
                "message": err.message,
                "details": err.details
            }
        });
        match serde_json::to_string_pretty(&payload) {
            Ok(value) => eprintln!("{value}"),
            Err(_) => eprintln!("{}", payload),
        }
        return;
    }

    eprintln!("error[{}]: {}", err.code, err.message);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Column;
    use tempfile::TempDir;

    fn write_board(temp: &TempDir, tasks: Vec<Task>) -> PathBuf {
        let path = temp.path().join("board.json");
        BoardFile {
            columns: Vec::new(),
            tasks,
        }
        .save(&path)
        .expect("board should save");
        path
    }

    fn sample_tasks() -> Vec<Task> {
        vec![
            Task::with_id("alpha-1", "Alpha", "todo"),
            Task::with_id("beta-1", "Beta", "Not Started"),
            Task::with_id("gamma-1", "Gamma", "todo"),
            Task::with_id("delta-1", "Delta", "Completed"),
        ]
    }

    fn board_args(path: &Path) -> BoardFileArgs {
        BoardFileArgs {
            file: path.to_path_buf(),
        }
    }

    #[test]
    fn resolve_task_id_accepts_unique_prefix() {
        let tasks = sample_tasks();
        assert_eq!(
            resolve_task_id_selector(&tasks, "gam").expect("prefix resolves"),
            "gamma-1"
        );
        assert_eq!(
            resolve_task_id_selector(&tasks, "alpha-1").expect("exact resolves"),
            "alpha-1"
        );
    }

    #[test]
    fn resolve_task_id_reports_ambiguity_and_absence() {
        let mut tasks = sample_tasks();
        tasks.push(Task::with_id("alpha-2", "Alpha 2", "todo"));

        let err = resolve_task_id_selector(&tasks, "alpha").expect_err("ambiguous");
        assert_eq!(err.exit_code, 4);
        assert_eq!(err.code, "TASK_ID_AMBIGUOUS");

        let err = resolve_task_id_selector(&tasks, "zeta").expect_err("missing");
        assert_eq!(err.exit_code, 3);

        let err = resolve_task_id_selector(&tasks, "  ").expect_err("empty");
        assert_eq!(err.code, "TASK_ID_REQUIRED");
    }

    #[test]
    fn board_show_groups_tasks() {
        let temp = TempDir::new().expect("tempdir");
        let path = write_board(&temp, sample_tasks());
        let output = board_show(
            &Settings::default(),
            BoardShowArgs {
                board: board_args(&path),
                include_archived: false,
            },
        )
        .expect("board show");

        assert_eq!(output.data["total"], 4);
        assert_eq!(output.data["columns"][0]["id"], "todo");
        assert_eq!(
            output.data["columns"][0]["tasks"]
                .as_array()
                .map(Vec::len),
            Some(3)
        );
        assert!(output.text.contains("Alpha, Beta, Gamma"));
    }

    #[test]
    fn board_show_hides_archived_by_default() {
        let temp = TempDir::new().expect("tempdir");
        let mut tasks = sample_tasks();
        tasks[0].status = Some(STATUS_ARCHIVED.to_string());
        let path = write_board(&temp, tasks);

        let hidden = board_show(
            &Settings::default(),
            BoardShowArgs {
                board: board_args(&path),
                include_archived: false,
            },
        )
        .expect("board show");
        assert_eq!(hidden.data["total"], 3);

        let shown = board_show(
            &Settings::default(),
            BoardShowArgs {
                board: board_args(&path),
                include_archived: true,
            },
        )
        .expect("board show");
        assert_eq!(shown.data["total"], 4);
    }

    #[test]
    fn board_text_marks_over_limit_columns() {
        let mut settings = Settings::default();
        settings.columns[0] = Column::new("todo", "To Do", "#000").with_wip_limit(2);
        let temp = TempDir::new().expect("tempdir");
        let path = write_board(&temp, sample_tasks());

        let output = board_show(
            &settings,
            BoardShowArgs {
                board: board_args(&path),
                include_archived: false,
            },
        )
        .expect("board show");
        assert!(output.text.contains("2 (over)"));
        assert_eq!(output.data["columns"][0]["over_limit"], true);
    }

    #[test]
    fn task_move_writes_status() {
        let temp = TempDir::new().expect("tempdir");
        let path = write_board(&temp, sample_tasks());

        let output = task_move(
            &Settings::default(),
            TaskMoveArgs {
                board: board_args(&path),
                id: "alpha".to_string(),
                to: "done".to_string(),
            },
        )
        .expect("task move");
        assert_eq!(output.data["intent"]["kind"], "status_update");

        let board = BoardFile::load(&path).expect("reload");
        let alpha = board
            .tasks
            .iter()
            .find(|task| task.id == "alpha-1")
            .expect("alpha exists");
        assert_eq!(alpha.status.as_deref(), Some("done"));
    }

    #[test]
    fn task_move_to_unknown_column_fails() {
        let temp = TempDir::new().expect("tempdir");
        let path = write_board(&temp, sample_tasks());
        let err = task_move(
            &Settings::default(),
            TaskMoveArgs {
                board: board_args(&path),
                id: "alpha-1".to_string(),
                to: "nowhere".to_string(),
            },
        )
        .expect_err("unknown column");
        assert_eq!(err.code, "COLUMN_NOT_FOUND");
    }

    #[test]
    fn task_move_to_same_column_is_unchanged() {
        let temp = TempDir::new().expect("tempdir");
        let path = write_board(&temp, sample_tasks());
        let output = task_move(
            &Settings::default(),
            TaskMoveArgs {
                board: board_args(&path),
                id: "beta-1".to_string(),
                to: "todo".to_string(),
            },
        )
        .expect("task move");
        assert_eq!(output.data["changed"], false);
    }

    #[test]
    fn task_reorder_persists_orders() {
        let temp = TempDir::new().expect("tempdir");
        let path = write_board(&temp, sample_tasks());

        let output = task_reorder(
            &Settings::default(),
            TaskReorderArgs {
                board: board_args(&path),
                id: "gamma-1".to_string(),
                index: 0,
            },
        )
        .expect("task reorder");
        assert_eq!(output.data["intent"]["kind"], "reorder");

        let board = BoardFile::load(&path).expect("reload");
        let order_of = |id: &str| {
            board
                .tasks
                .iter()
                .find(|task| task.id == id)
                .map(|task| task.order)
        };
        assert_eq!(order_of("gamma-1"), Some(0));
        assert_eq!(order_of("alpha-1"), Some(1));
        assert_eq!(order_of("beta-1"), Some(2));
    }

    #[test]
    fn task_reorder_rejects_out_of_range_index() {
        let temp = TempDir::new().expect("tempdir");
        let path = write_board(&temp, sample_tasks());
        let err = task_reorder(
            &Settings::default(),
            TaskReorderArgs {
                board: board_args(&path),
                id: "gamma-1".to_string(),
                index: 7,
            },
        )
        .expect_err("out of range");
        assert_eq!(err.exit_code, 2);
        assert_eq!(err.code, "INDEX_OUT_OF_RANGE");
    }

    #[test]
    fn task_archive_soft_deletes() {
        let temp = TempDir::new().expect("tempdir");
        let path = write_board(&temp, sample_tasks());
        task_archive(TaskArchiveArgs {
            board: board_args(&path),
            id: "delta".to_string(),
        })
        .expect("archive");

        let board = BoardFile::load(&path).expect("reload");
        assert_eq!(board.tasks.len(), 4);
        assert!(
            board
                .tasks
                .iter()
                .any(|task| task.id == "delta-1" && task.is_archived())
        );
    }

    #[test]
    fn missing_board_is_not_found() {
        let temp = TempDir::new().expect("tempdir");
        let err = load_board(&temp.path().join("nope.json")).expect_err("missing");
        assert_eq!(err.exit_code, 3);
        assert_eq!(err.code, "BOARD_NOT_FOUND");
    }

    #[test]
    fn state_set_then_get_roundtrip() {
        let temp = TempDir::new().expect("tempdir");
        let settings = Settings::default();

        execute_state_command(
            &settings,
            temp.path(),
            StateCommand::Set(StateSetArgs {
                property: "view_mode".to_string(),
                value: "list".to_string(),
            }),
        )
        .expect("state set");

        let output = execute_state_command(
            &settings,
            temp.path(),
            StateCommand::Get(StateGetArgs {
                property: Some("view_mode".to_string()),
            }),
        )
        .expect("state get");
        assert_eq!(output.data["value"], "list");

        let reset =
            execute_state_command(&settings, temp.path(), StateCommand::Reset).expect("reset");
        assert_eq!(reset.data["state"]["view_mode"], "board");
    }

    #[test]
    fn state_set_rejects_unknown_property_and_bad_value() {
        let temp = TempDir::new().expect("tempdir");
        let settings = Settings::default();

        let err = execute_state_command(
            &settings,
            temp.path(),
            StateCommand::Set(StateSetArgs {
                property: "colour".to_string(),
                value: "red".to_string(),
            }),
        )
        .expect_err("unknown property");
        assert_eq!(err.code, "UNKNOWN_PROPERTY");

        let err = execute_state_command(
            &settings,
            temp.path(),
            StateCommand::Set(StateSetArgs {
                property: "view_mode".to_string(),
                value: "spiral".to_string(),
            }),
        )
        .expect_err("invalid value");
        assert_eq!(err.code, "INVALID_PROPERTY_VALUE");
    }

    #[test]
    fn state_get_reports_corrupt_storage_as_warning() {
        let temp = TempDir::new().expect("tempdir");
        std::fs::write(
            temp.path().join(format!("{UI_STATE_KEY}.json")),
            "{not valid json",
        )
        .expect("write corrupt state");

        let output = execute_state_command(
            &Settings::default(),
            temp.path(),
            StateCommand::Get(StateGetArgs { property: None }),
        )
        .expect("state get");
        assert_eq!(output.data["state"]["view_mode"], "board");
        let warnings = output.data["warnings"].as_array().expect("warnings");
        assert!(
            warnings
                .iter()
                .any(|w| w.as_str().is_some_and(|s| s.starts_with("parse_error")))
        );
    }

    #[test]
    fn parse_property_value_falls_back_to_string() {
        assert_eq!(parse_property_value("true"), json!(true));
        assert_eq!(parse_property_value("{\"a\":1}"), json!({ "a": 1 }));
        assert_eq!(parse_property_value("list"), json!("list"));
    }

    #[test]
    fn text_table_pads_columns() {
        let table = render_text_table(
            &["A", "Long header"],
            &[vec!["value".to_string(), "x".to_string()]],
        );
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines[0], "+-------+-------------+");
        assert_eq!(lines[1], "| A     | Long header |");
        assert_eq!(lines[3], "| value | x           |");
    }
}
