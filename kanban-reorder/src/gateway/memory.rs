//! In-process gateway used by tests and by the replay harness

use super::PersistenceGateway;
use crate::error::{ReorderError, Result};
use crate::realtime::BroadcastRealtime;
use crate::types::{
    sort_containers, sort_items, BoardId, BoardState, Container, ContainerId, Item, ItemId,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;
use tracing::{debug, warn};

#[derive(Debug, Default)]
struct Remote {
    containers: HashMap<ContainerId, Container>,
    items: HashMap<ItemId, Item>,
}

/// Authoritative store held in memory.
///
/// Writes can be made to fail on demand, and every accepted write can be
/// announced on a [`BroadcastRealtime`] hub the way a hosted database would.
#[derive(Debug, Default)]
pub struct InMemoryGateway {
    remote: RwLock<Remote>,
    failures: AtomicUsize,
    fetch_failures: AtomicUsize,
    writes: AtomicUsize,
    realtime: Option<BroadcastRealtime>,
}

impl InMemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the remote with a board's lists and cards
    pub fn from_board(state: &BoardState) -> Self {
        let mut remote = Remote::default();
        for container in state.containers() {
            remote
                .containers
                .insert(container.id.clone(), container.clone());
            for item in state.items(&container.id) {
                remote.items.insert(item.id.clone(), item.clone());
            }
        }
        Self {
            remote: RwLock::new(remote),
            ..Self::default()
        }
    }

    /// Announce accepted writes on `hub`
    pub fn with_realtime(mut self, hub: BroadcastRealtime) -> Self {
        self.realtime = Some(hub);
        self
    }

    /// Reject the next `count` writes
    pub fn fail_next_writes(&self, count: usize) {
        self.failures.store(count, Ordering::SeqCst);
    }

    /// Make the next `count` fetches fail as if the remote were offline
    pub fn fail_next_fetches(&self, count: usize) {
        self.fetch_failures.store(count, Ordering::SeqCst);
    }

    /// Number of writes accepted so far
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Change a card behind the engine's back, as another client would
    pub async fn put_item(&self, item: Item) {
        let board = {
            let mut remote = self.remote.write().await;
            let board = remote
                .containers
                .get(&item.container_id)
                .map(|c| c.board_id.clone());
            remote.items.insert(item.id.clone(), item);
            board
        };
        if let Some(board) = board {
            self.announce(&board);
        }
    }

    /// Change a list behind the engine's back, as another client would
    pub async fn put_container(&self, container: Container) {
        let board = container.board_id.clone();
        self.remote
            .write()
            .await
            .containers
            .insert(container.id.clone(), container);
        self.announce(&board);
    }

    fn take_failure(&self) -> bool {
        take_one(&self.failures)
    }

    fn check_fetch(&self) -> Result<()> {
        if take_one(&self.fetch_failures) {
            warn!("injected fetch failure");
            return Err(ReorderError::unavailable("injected fetch failure"));
        }
        Ok(())
    }

    fn announce(&self, board: &BoardId) {
        if let Some(hub) = &self.realtime {
            hub.publish(board);
        }
    }
}

#[async_trait]
impl PersistenceGateway for InMemoryGateway {
    async fn move_item(&self, item: &ItemId, to: &ContainerId, position: f64) -> Result<()> {
        if self.take_failure() {
            warn!(card = %item, "injected write failure");
            return Err(ReorderError::rejected("injected failure"));
        }

        let board = {
            let mut remote = self.remote.write().await;
            let board = remote
                .containers
                .get(to)
                .map(|c| c.board_id.clone())
                .ok_or_else(|| ReorderError::ContainerNotFound { id: to.to_string() })?;
            let stored = remote
                .items
                .get_mut(item)
                .ok_or_else(|| ReorderError::ItemNotFound {
                    id: item.to_string(),
                })?;
            stored.container_id = to.clone();
            stored.position = position;
            board
        };

        self.writes.fetch_add(1, Ordering::SeqCst);
        debug!(card = %item, list = %to, position, "remote card updated");
        self.announce(&board);
        Ok(())
    }

    async fn move_container(
        &self,
        container: &ContainerId,
        board: &BoardId,
        position: f64,
    ) -> Result<()> {
        if self.take_failure() {
            warn!(list = %container, "injected write failure");
            return Err(ReorderError::rejected("injected failure"));
        }

        {
            let mut remote = self.remote.write().await;
            let stored = remote.containers.get_mut(container).ok_or_else(|| {
                ReorderError::ContainerNotFound {
                    id: container.to_string(),
                }
            })?;
            stored.board_id = board.clone();
            stored.position = position;
        }

        self.writes.fetch_add(1, Ordering::SeqCst);
        debug!(list = %container, position, "remote list updated");
        self.announce(board);
        Ok(())
    }

    async fn fetch_container_items(&self, container: &ContainerId) -> Result<Vec<Item>> {
        self.check_fetch()?;
        let remote = self.remote.read().await;
        let mut items: Vec<Item> = remote
            .items
            .values()
            .filter(|i| &i.container_id == container)
            .cloned()
            .collect();
        sort_items(&mut items);
        Ok(items)
    }

    async fn fetch_board_containers(&self, board: &BoardId) -> Result<Vec<Container>> {
        self.check_fetch()?;
        let remote = self.remote.read().await;
        let mut containers: Vec<Container> = remote
            .containers
            .values()
            .filter(|c| &c.board_id == board)
            .cloned()
            .collect();
        sort_containers(&mut containers);
        Ok(containers)
    }
}

fn take_one(counter: &AtomicUsize) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}
