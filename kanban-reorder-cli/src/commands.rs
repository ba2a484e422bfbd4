//! Command implementations against a file-backed board

use crate::cli::CardTarget;
use crate::error::{CliError, Result};
use crate::table::{format_position, new_table};
use kanban_reorder::gateway::BOARD_DIR;
use kanban_reorder::{
    BoardController, BoardState, ContainerId, DropResult, FileGateway, HoverTarget, ItemId,
    MoveOutcome, OptimisticStore, PositionAllocator, ReorderConfig, ReorderError,
};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Find the board at or above `dir` and read its configuration
fn open_gateway(dir: &Path) -> Result<(FileGateway, ReorderConfig)> {
    let gateway = FileGateway::find(dir)?;
    let config = ReorderConfig::load(Some(gateway.root())).map_err(ReorderError::from)?;
    let gateway = gateway.with_allocator(PositionAllocator::from_config(&config));
    Ok((gateway, config))
}

/// Open the board found at or above `dir` and load it into a fresh store
pub async fn open_controller(dir: &Path) -> Result<BoardController> {
    let (gateway, config) = open_gateway(dir)?;
    let board = gateway.read_board().await?;

    let controller = BoardController::new(
        board.id,
        OptimisticStore::new(config.event_buffer),
        Arc::new(gateway),
        &config,
    );
    controller.load().await?;
    Ok(controller)
}

pub async fn run_init(dir: &Path, name: &str) -> Result<()> {
    let gateway = FileGateway::new(dir.join(BOARD_DIR));
    let board = gateway.init_board(name).await?;
    println!("Initialized board '{}' ({})", board.name, board.id);
    Ok(())
}

pub async fn run_add_list(dir: &Path, id: Option<&str>) -> Result<()> {
    let (gateway, _) = open_gateway(dir)?;
    let list = gateway.add_list(id.map(ContainerId::from)).await?;
    println!("{}", list.id);
    Ok(())
}

pub async fn run_add_card(dir: &Path, list: &str, id: Option<&str>) -> Result<()> {
    let (gateway, _) = open_gateway(dir)?;
    let card = gateway
        .add_card(&ContainerId::from(list), id.map(ItemId::from))
        .await?;
    println!("{}", card.id);
    Ok(())
}

pub async fn run_show(dir: &Path, json: bool) -> Result<()> {
    let gateway = FileGateway::find(dir)?;
    let state = gateway.read_board_state().await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&state)?);
    } else {
        println!("{}", render_board(&state));
    }
    Ok(())
}

/// One row per list followed by one row per card, in order
pub fn render_board(state: &BoardState) -> String {
    let mut table = new_table();
    table.set_header(vec!["list", "card", "position"]);
    for list in state.containers() {
        table.add_row(vec![
            list.id.to_string(),
            String::new(),
            format_position(list.position),
        ]);
        for card in state.items(&list.id) {
            table.add_row(vec![
                String::new(),
                card.id.to_string(),
                format_position(card.position),
            ]);
        }
    }
    table.to_string()
}

pub async fn run_move_card(dir: &Path, card: &str, target: &CardTarget) -> Result<()> {
    let mut controller = open_controller(dir).await?;
    let card = ItemId::from(card);
    let target = match (&target.before, &target.to) {
        (Some(before), _) => HoverTarget::Item(before.as_str().into()),
        (None, Some(to)) => HoverTarget::Container(to.as_str().into()),
        (None, None) => {
            return Err(CliError::Cancelled {
                reason: kanban_reorder::CancelReason::NoDropTarget,
            })
        }
    };

    let known = controller
        .store()
        .with_board(controller.board_id(), |board| {
            let card_known = board.item(&card).is_some();
            (card_known, target.exists_in(board))
        })
        .unwrap_or_default();
    match (known, &target) {
        ((false, _), _) => return Err(ReorderError::ItemNotFound { id: card.to_string() }.into()),
        ((_, false), HoverTarget::Item(id)) => {
            return Err(ReorderError::ItemNotFound { id: id.to_string() }.into())
        }
        ((_, false), HoverTarget::Container(id)) => {
            return Err(ReorderError::ContainerNotFound { id: id.to_string() }.into())
        }
        _ => {}
    }

    let result = controller.move_card(&card, &target)?;
    finish(result, card.as_str()).await
}

pub async fn run_move_list(dir: &Path, list: &str, before: Option<&str>) -> Result<()> {
    let mut controller = open_controller(dir).await?;
    let list = ContainerId::from(list);
    let before = before.map(ContainerId::from);

    for id in std::iter::once(&list).chain(before.as_ref()) {
        let exists = controller
            .store()
            .with_board(controller.board_id(), |board| board.container(id).is_some())
            .unwrap_or(false);
        if !exists {
            return Err(ReorderError::ContainerNotFound { id: id.to_string() }.into());
        }
    }

    let result = controller.move_list(&list, before.as_ref())?;
    finish(result, list.as_str()).await
}

pub async fn run_rebalance(dir: &Path, list: Option<&str>) -> Result<()> {
    let controller = open_controller(dir).await?;
    let rebalancer = controller.rebalancer();
    let writes = match list {
        Some(list) => {
            let list = ContainerId::from(list);
            let exists = controller
                .store()
                .with_board(controller.board_id(), |board| board.container(&list).is_some())
                .unwrap_or(false);
            if !exists {
                return Err(ReorderError::ContainerNotFound { id: list.to_string() }.into());
            }
            rebalancer.rebalance_container(&list).await?
        }
        None => rebalancer.rebalance_board().await?,
    };
    println!("Rebalanced {} position(s)", writes);
    Ok(())
}

/// Persist a drop and report it
async fn finish(result: DropResult, subject: &str) -> Result<()> {
    match result {
        DropResult::Pending(write) => {
            let exhausted = write.precision_exhausted();
            match write.persist().await {
                MoveOutcome::Confirmed => {
                    println!("Moved {}", subject);
                    if exhausted {
                        println!(
                            "Positions around {} are out of precision; run `kanban-reorder rebalance`",
                            subject
                        );
                    }
                    Ok(())
                }
                MoveOutcome::RolledBack { reason, .. } => Err(CliError::RolledBack { reason }),
            }
        }
        DropResult::Unchanged => {
            println!("{} is already in place", subject);
            Ok(())
        }
        DropResult::Cancelled(reason) => Err(CliError::Cancelled { reason }),
        DropResult::Ignored(reason) => {
            debug!(?reason, "move ignored");
            Ok(())
        }
    }
}
