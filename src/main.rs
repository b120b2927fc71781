use std::path::PathBuf;

use clap::Parser;

use taskboard::{
    cli::{self, RootCommand},
    logging::init_logging,
    settings::Settings,
};

#[derive(Parser, Debug)]
#[command(
    name = "taskboard",
    about = "Kanban board tooling: column grouping, drag reordering and UI-state persistence",
    version
)]
struct Cli {
    /// Settings file; defaults to the per-user config directory.
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[arg(long, global = true)]
    json: bool,

    #[arg(long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: RootCommand,
}

fn main() {
    if let Err(err) = init_logging() {
        eprintln!("warning: failed to initialize logging: {err}");
    }

    let cli = Cli::parse();
    let settings = match cli.config.as_deref() {
        Some(path) => Settings::load_from_path(path),
        None => Settings::load(),
    };

    let code = cli::run(&settings, cli.command, cli.json, cli.quiet);
    std::process::exit(code);
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "taskboard",
            "task",
            "move",
            "--file",
            "board.json",
            "--id",
            "abc",
            "--to",
            "done",
            "--json",
        ])
        .expect("arguments should parse");
        assert!(cli.json);
        assert!(matches!(cli.command, RootCommand::Task { .. }));
    }
}
