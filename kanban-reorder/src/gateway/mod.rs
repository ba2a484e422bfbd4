//! Persistence gateway - the boundary to the authoritative store
//!
//! The engine only ever talks to the remote store through [`PersistenceGateway`].
//! Writes are single-row and the gateway never retries on its own; a failed
//! write is reported to the caller, who rolls back.

mod file;
mod memory;

pub use file::{BoardLock, FileGateway, BOARD_DIR};
pub use memory::InMemoryGateway;

use crate::error::Result;
use crate::store::PlannedMove;
use crate::types::{BoardId, BoardState, Container, ContainerId, Item, ItemId};
use async_trait::async_trait;

/// Async access to the authoritative store.
///
/// Implementations must be safe to share across tasks. Reads return
/// entities in ascending position order.
#[async_trait]
pub trait PersistenceGateway: Send + Sync {
    /// Set a card's list and position
    async fn move_item(&self, item: &ItemId, to: &ContainerId, position: f64) -> Result<()>;

    /// Set a list's board and position
    async fn move_container(
        &self,
        container: &ContainerId,
        board: &BoardId,
        position: f64,
    ) -> Result<()>;

    /// Cards of one list, ordered
    async fn fetch_container_items(&self, container: &ContainerId) -> Result<Vec<Item>>;

    /// Lists of one board, ordered
    async fn fetch_board_containers(&self, board: &BoardId) -> Result<Vec<Container>>;

    /// Persist one planned move
    async fn persist(&self, planned: &PlannedMove) -> Result<()> {
        match planned {
            PlannedMove::Item { item, to, position } => self.move_item(item, to, *position).await,
            PlannedMove::Container {
                container,
                board,
                position,
            } => self.move_container(container, board, *position).await,
        }
    }

    /// Fetch a whole board: its lists, then each list's cards
    async fn fetch_board(&self, board: &BoardId) -> Result<BoardState> {
        let containers = self.fetch_board_containers(board).await?;
        let mut items = Vec::new();
        for container in &containers {
            items.extend(self.fetch_container_items(&container.id).await?);
        }
        Ok(BoardState::from_parts(board.clone(), containers, items))
    }
}
