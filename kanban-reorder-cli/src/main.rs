//! kanban-reorder - reorder cards and lists on a file-backed kanban board.
//!
//! Commands:
//! - `kanban-reorder init <name>`: Create a board in ./.kanban
//! - `kanban-reorder add-list [--id ID]`: Append a list
//! - `kanban-reorder add-card <list> [--id ID]`: Append a card to a list
//! - `kanban-reorder show [--json]`: Show lists and cards in order
//! - `kanban-reorder move-card <card> (--before CARD | --to LIST)`: Move a card
//! - `kanban-reorder move-list <list> [--before LIST]`: Move a list
//! - `kanban-reorder rebalance [list]`: Renumber positions evenly
//! - `kanban-reorder replay <script>`: Drive a pointer event script
//!
//! Environment variables:
//! - KANBAN_REORDER_*: Override configuration values
//! - RUST_LOG: Log filter when --debug is not given
//!
//! Exit codes:
//! - 0: Success
//! - 1: Error

use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use kanban_reorder_cli::{commands, replay, Cli, CliError, Commands};

/// Map a command result to an exit code, reporting errors on stderr.
fn handle_result(result: Result<(), CliError>) -> i32 {
    match result {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn configure_logging(debug: bool) {
    let filter = if debug {
        EnvFilter::new("kanban_reorder=debug,kanban_reorder_cli=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(false)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    configure_logging(cli.debug);

    let dir = cli.board.unwrap_or_else(|| PathBuf::from("."));

    let exit_code = match cli.command {
        Commands::Init { name } => handle_result(commands::run_init(&dir, &name).await),
        Commands::AddList { id } => {
            handle_result(commands::run_add_list(&dir, id.as_deref()).await)
        }
        Commands::AddCard { list, id } => {
            handle_result(commands::run_add_card(&dir, &list, id.as_deref()).await)
        }
        Commands::Show { json } => handle_result(commands::run_show(&dir, json).await),
        Commands::MoveCard { card, target } => {
            handle_result(commands::run_move_card(&dir, &card, &target).await)
        }
        Commands::MoveList { list, before } => {
            handle_result(commands::run_move_list(&dir, &list, before.as_deref()).await)
        }
        Commands::Rebalance { list } => {
            handle_result(commands::run_rebalance(&dir, list.as_deref()).await)
        }
        Commands::Replay { script } => handle_result(replay::run_replay(&dir, &script).await),
    };

    std::process::exit(exit_code);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing_init() {
        let cli = Cli::parse_from(["kanban-reorder", "init", "Roadmap"]);
        assert!(matches!(cli.command, Commands::Init { ref name } if name == "Roadmap"));
        assert!(!cli.debug);
    }

    #[test]
    fn test_cli_parsing_global_flags() {
        let cli = Cli::parse_from(["kanban-reorder", "show", "--json", "--board", "/tmp/x", "-d"]);
        assert!(cli.debug);
        assert_eq!(cli.board, Some(PathBuf::from("/tmp/x")));
        assert!(matches!(cli.command, Commands::Show { json: true }));
    }

    #[test]
    fn test_cli_parsing_move_card_before() {
        let cli = Cli::parse_from(["kanban-reorder", "move-card", "a", "--before", "b"]);
        match cli.command {
            Commands::MoveCard { card, target } => {
                assert_eq!(card, "a");
                assert_eq!(target.before.as_deref(), Some("b"));
                assert!(target.to.is_none());
            }
            _ => panic!("Expected MoveCard command"),
        }
    }

    #[test]
    fn test_cli_move_card_needs_exactly_one_target() {
        assert!(Cli::try_parse_from(["kanban-reorder", "move-card", "a"]).is_err());
        assert!(Cli::try_parse_from([
            "kanban-reorder",
            "move-card",
            "a",
            "--before",
            "b",
            "--to",
            "done"
        ])
        .is_err());
    }

    #[test]
    fn test_cli_parsing_rebalance_board() {
        let cli = Cli::parse_from(["kanban-reorder", "rebalance"]);
        assert!(matches!(cli.command, Commands::Rebalance { list: None }));
    }

    #[test]
    fn test_handle_result_exit_codes() {
        assert_eq!(handle_result(Ok(())), 0);
        let err = CliError::RolledBack {
            reason: "lock busy".into(),
        };
        assert_eq!(handle_result(Err(err)), 1);
    }
}
