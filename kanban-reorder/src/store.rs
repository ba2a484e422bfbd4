//! Optimistic local cache of board state.
//!
//! The store holds one [`BoardState`] per board. All access goes through the
//! operations below; every successful mutation bumps a revision counter and is
//! broadcast to subscribers. Mutations are synchronous and never await, so a
//! move is fully applied before the next event is processed.

use crate::error::{ReorderError, Result};
use crate::logging::Pretty;
use crate::types::{BoardId, BoardState, Container, ContainerId, Item, ItemId};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, trace};

/// Immutable copy of a board taken before a move; the rollback target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DragSnapshot(BoardState);

impl DragSnapshot {
    pub fn capture(state: &BoardState) -> Self {
        Self(state.clone())
    }

    pub fn board_id(&self) -> &BoardId {
        self.0.board_id()
    }

    pub fn state(&self) -> &BoardState {
        &self.0
    }

    pub fn into_state(self) -> BoardState {
        self.0
    }
}

/// A single logical write
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PlannedMove {
    /// Move a card into a list at a position
    Item {
        item: ItemId,
        to: ContainerId,
        position: f64,
    },
    /// Move a list to a position on its board
    Container {
        container: ContainerId,
        board: BoardId,
        position: f64,
    },
}

impl PlannedMove {
    pub fn position(&self) -> f64 {
        match self {
            Self::Item { position, .. } | Self::Container { position, .. } => *position,
        }
    }

    pub fn subject_id(&self) -> &str {
        match self {
            Self::Item { item, .. } => item.as_str(),
            Self::Container { container, .. } => container.as_str(),
        }
    }
}

/// What changed the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeCause {
    Loaded,
    Applied,
    RolledBack,
    Reconciled,
}

/// Broadcast after every successful mutation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreEvent {
    pub board_id: BoardId,
    pub cause: ChangeCause,
    pub revision: u64,
}

struct Inner {
    boards: DashMap<BoardId, BoardState>,
    revision: AtomicU64,
    events: broadcast::Sender<StoreEvent>,
}

/// Shared handle to the local cache. Clones refer to the same boards.
#[derive(Clone)]
pub struct OptimisticStore {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for OptimisticStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OptimisticStore")
            .field("boards", &self.inner.boards.len())
            .field("revision", &self.revision())
            .finish()
    }
}

impl Default for OptimisticStore {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_EVENT_BUFFER)
    }
}

impl OptimisticStore {
    /// Create an empty store whose subscribers may lag `buffer` events.
    pub fn new(buffer: usize) -> Self {
        let (events, _) = broadcast::channel(buffer.max(1));
        Self {
            inner: Arc::new(Inner {
                boards: DashMap::new(),
                revision: AtomicU64::new(0),
                events,
            }),
        }
    }

    /// Subscribe to change notifications
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.inner.events.subscribe()
    }

    /// Revision of the last successful mutation across all boards
    pub fn revision(&self) -> u64 {
        self.inner.revision.load(Ordering::SeqCst)
    }

    pub fn contains(&self, board: &BoardId) -> bool {
        self.inner.boards.contains_key(board)
    }

    /// Clone of one board's current state
    pub fn snapshot(&self, board: &BoardId) -> Option<BoardState> {
        self.inner.boards.get(board).map(|state| state.value().clone())
    }

    /// Read one board's state without cloning it
    pub fn with_board<R>(&self, board: &BoardId, f: impl FnOnce(&BoardState) -> R) -> Option<R> {
        self.inner.boards.get(board).map(|state| f(state.value()))
    }

    /// Install or replace a board wholesale
    pub fn load(&self, state: BoardState) {
        let board_id = state.board_id().clone();
        debug!(
            board = %board_id,
            lists = state.containers().len(),
            cards = state.item_count(),
            "board loaded"
        );
        trace!("loaded board: {}", Pretty(&state));
        self.inner.boards.insert(board_id.clone(), state);
        self.notify(board_id, ChangeCause::Loaded);
    }

    /// Move a card. Returns the full board as it was before the move.
    ///
    /// Only the card's existence is checked; the position is taken as given.
    pub fn apply_move(
        &self,
        board: &BoardId,
        item: &ItemId,
        to: &ContainerId,
        position: f64,
    ) -> Result<DragSnapshot> {
        let previous = self.mutate(board, |state| {
            let mut moved = state
                .remove_item(item)
                .ok_or_else(|| ReorderError::ItemNotFound {
                    id: item.to_string(),
                })?;
            moved.container_id = to.clone();
            moved.position = position;
            state.insert_item(moved);
            Ok(())
        })?;
        debug!(board = %board, item = %item, to = %to, position, "applied card move");
        self.notify(board.clone(), ChangeCause::Applied);
        Ok(previous)
    }

    /// Move a list. Returns the full board as it was before the move.
    pub fn apply_container_move(
        &self,
        board: &BoardId,
        container: &ContainerId,
        position: f64,
    ) -> Result<DragSnapshot> {
        let previous = self.mutate(board, |state| {
            let mut moved =
                state
                    .remove_container(container)
                    .ok_or_else(|| ReorderError::ContainerNotFound {
                        id: container.to_string(),
                    })?;
            moved.position = position;
            state.insert_container(moved);
            Ok(())
        })?;
        debug!(board = %board, list = %container, position, "applied list move");
        self.notify(board.clone(), ChangeCause::Applied);
        Ok(previous)
    }

    /// Apply a planned move to the board it belongs to
    pub fn apply(&self, board: &BoardId, planned: &PlannedMove) -> Result<DragSnapshot> {
        match planned {
            PlannedMove::Item { item, to, position } => {
                self.apply_move(board, item, to, *position)
            }
            PlannedMove::Container {
                container,
                position,
                ..
            } => self.apply_container_move(board, container, *position),
        }
    }

    /// Restore a board exactly as captured
    pub fn rollback(&self, snapshot: DragSnapshot) {
        let state = snapshot.into_state();
        let board_id = state.board_id().clone();
        debug!(board = %board_id, "rolled back to snapshot");
        self.inner.boards.insert(board_id.clone(), state);
        self.notify(board_id, ChangeCause::RolledBack);
    }

    /// Replace one list's cards with authoritative data
    pub fn reconcile(&self, board: &BoardId, container: &ContainerId, items: Vec<Item>) -> Result<()> {
        let count = items.len();
        self.mutate(board, |state| {
            state.replace_items(container, items);
            Ok(())
        })?;
        debug!(board = %board, list = %container, cards = count, "reconciled list");
        self.notify(board.clone(), ChangeCause::Reconciled);
        Ok(())
    }

    /// Replace several lists' cards in one mutation, with a single
    /// notification.
    pub fn reconcile_lists(
        &self,
        board: &BoardId,
        lists: Vec<(ContainerId, Vec<Item>)>,
    ) -> Result<()> {
        let count = lists.len();
        self.mutate(board, |state| {
            for (container, items) in lists {
                state.replace_items(&container, items);
            }
            Ok(())
        })?;
        debug!(board = %board, lists = count, "reconciled lists' cards");
        self.notify(board.clone(), ChangeCause::Reconciled);
        Ok(())
    }

    /// Replace a whole board with an authoritative copy in one mutation
    pub fn reconcile_board(&self, fetched: BoardState) -> Result<()> {
        let board = fetched.board_id().clone();
        let (lists, cards) = (fetched.containers().len(), fetched.item_count());
        self.mutate(&board, |state| {
            *state = fetched;
            Ok(())
        })?;
        debug!(board = %board, lists, cards, "reconciled board");
        self.notify(board, ChangeCause::Reconciled);
        Ok(())
    }

    /// Replace a board's lists with authoritative data
    pub fn reconcile_containers(&self, board: &BoardId, containers: Vec<Container>) -> Result<()> {
        let count = containers.len();
        self.mutate(board, |state| {
            state.replace_containers(containers);
            Ok(())
        })?;
        debug!(board = %board, lists = count, "reconciled lists");
        self.notify(board.clone(), ChangeCause::Reconciled);
        Ok(())
    }

    /// Run `f` against a board, returning the state from before the call.
    /// On error the board is left exactly as it was.
    fn mutate(
        &self,
        board: &BoardId,
        f: impl FnOnce(&mut BoardState) -> Result<()>,
    ) -> Result<DragSnapshot> {
        let mut entry =
            self.inner
                .boards
                .get_mut(board)
                .ok_or_else(|| ReorderError::BoardNotFound {
                    id: board.to_string(),
                })?;
        let previous = DragSnapshot::capture(entry.value());
        if let Err(e) = f(entry.value_mut()) {
            *entry.value_mut() = previous.into_state();
            return Err(e);
        }
        Ok(previous)
    }

    fn notify(&self, board_id: BoardId, cause: ChangeCause) {
        let revision = self.inner.revision.fetch_add(1, Ordering::SeqCst) + 1;
        let event = StoreEvent {
            board_id,
            cause,
            revision,
        };
        if self.inner.events.send(event).is_err() {
            trace!(revision, "no store subscribers");
        }
    }
}
