//! CLI definition for the kanban-reorder command-line interface.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// kanban-reorder - reorder cards and lists on a file-backed kanban board.
///
/// The board lives in a `.kanban` directory. Commands other than `init` search
/// for it from `--board` (or the current directory) upwards.
#[derive(Parser, Debug)]
#[command(name = "kanban-reorder")]
#[command(version)]
#[command(about = "Reorder cards and lists on a file-backed kanban board")]
#[command(
    long_about = "Reorder cards and lists on a file-backed kanban board.\n\n\
    Every move is applied locally first and then written to disk; a failed write \
    is rolled back.\n\n\
    Configuration is read from reorder.{toml,yaml,yml,json} in the .kanban \
    directory and from KANBAN_REORDER_* environment variables."
)]
pub struct Cli {
    /// Enable debug output to stderr
    #[arg(short, long, global = true)]
    pub debug: bool,

    /// Directory to start searching for the board from
    #[arg(long, global = true, value_name = "DIR")]
    pub board: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a new board in <DIR>/.kanban
    Init {
        /// Board name
        name: String,
    },

    /// Append a list to the board
    AddList {
        /// List id (generated when omitted)
        #[arg(long)]
        id: Option<String>,
    },

    /// Append a card to a list
    AddCard {
        /// List to add the card to
        list: String,
        /// Card id (generated when omitted)
        #[arg(long)]
        id: Option<String>,
    },

    /// Show lists and cards in order
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Move a card before another card or to the end of a list
    MoveCard {
        /// Card to move
        card: String,
        #[command(flatten)]
        target: CardTarget,
    },

    /// Move a list before another list or to the end of the board
    MoveList {
        /// List to move
        list: String,
        /// Place it before this list
        #[arg(long, value_name = "LIST")]
        before: Option<String>,
    },

    /// Renumber positions evenly
    ///
    /// Rewrites one list's cards, or the board's lists when no list is given.
    Rebalance {
        /// List whose cards to renumber
        list: Option<String>,
    },

    /// Drive a pointer event script through a drag session
    ///
    /// The script is JSON or YAML (by extension) with a `steps` array of
    /// press / move / release / cancel steps.
    Replay {
        /// Path to the script
        script: PathBuf,
    },
}

/// Where `move-card` puts the card
#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
pub struct CardTarget {
    /// Place it before this card
    #[arg(long, value_name = "CARD")]
    pub before: Option<String>,

    /// Place it at the end of this list
    #[arg(long, value_name = "LIST")]
    pub to: Option<String>,
}
