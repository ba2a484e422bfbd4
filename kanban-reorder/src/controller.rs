//! BoardController - one board's drag flow from pointer to persisted write
//!
//! The controller feeds pointer events to its [`DragSession`] against the
//! current store state. A drop is applied to the [`OptimisticStore`] at once
//! and handed back as a [`PendingWrite`]; awaiting that persists the move and
//! either confirms it with a refetch or rolls the board back to the snapshot
//! taken when the drag started.

use crate::config::ReorderConfig;
use crate::drag::{
    plan_container_move, plan_item_move, CancelReason, DragEffect, DragSession, DragState,
    DragSubject, DropPlan, InputContext, NoopReason, PointerEvent,
};
use crate::error::{ReorderError, Result};
use crate::gateway::PersistenceGateway;
use crate::insertion::{resolve_item_insertion, HoverTarget};
use crate::position::PositionAllocator;
use crate::store::{DragSnapshot, OptimisticStore, PlannedMove};
use crate::types::{BoardId, ContainerId, ItemId, Point, Rect};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// What a release (or a programmatic move) turned into
#[derive(Debug)]
pub enum DropResult {
    /// Applied locally; the write still has to be persisted
    Pending(PendingWrite),
    /// Dropped onto its own slot; nothing applied, nothing written
    Unchanged,
    Cancelled(CancelReason),
    Ignored(NoopReason),
}

impl DropResult {
    pub fn pending(self) -> Option<PendingWrite> {
        match self {
            Self::Pending(write) => Some(write),
            _ => None,
        }
    }
}

/// Final outcome of a persisted move
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveOutcome {
    /// The store accepted the write
    Confirmed,
    /// The write failed and the board was restored to its pre-drag state
    RolledBack { reason: String, transient: bool },
}

/// A move applied locally whose write has not been persisted yet
#[must_use = "an unpersisted move is never written or rolled back"]
pub struct PendingWrite {
    board_id: BoardId,
    planned: PlannedMove,
    snapshot: DragSnapshot,
    precision_exhausted: bool,
    reconcile: bool,
    store: OptimisticStore,
    gateway: Arc<dyn PersistenceGateway>,
}

impl std::fmt::Debug for PendingWrite {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingWrite")
            .field("board_id", &self.board_id)
            .field("planned", &self.planned)
            .field("precision_exhausted", &self.precision_exhausted)
            .finish_non_exhaustive()
    }
}

impl PendingWrite {
    pub fn planned(&self) -> &PlannedMove {
        &self.planned
    }

    /// The board as it was when the drag started
    pub fn snapshot(&self) -> &DragSnapshot {
        &self.snapshot
    }

    /// The new position could not be placed strictly between its neighbours
    pub fn precision_exhausted(&self) -> bool {
        self.precision_exhausted
    }

    /// Write the move. On failure the board is rolled back; there is no retry.
    pub async fn persist(self) -> MoveOutcome {
        match self.gateway.persist(&self.planned).await {
            Ok(()) => {
                debug!(
                    board = %self.board_id,
                    subject = self.planned.subject_id(),
                    "move persisted"
                );
                if self.reconcile {
                    self.confirm().await;
                }
                MoveOutcome::Confirmed
            }
            Err(e) => {
                warn!(
                    board = %self.board_id,
                    subject = self.planned.subject_id(),
                    error = %e,
                    "move not persisted; rolling back"
                );
                let transient = e.is_transient();
                self.store.rollback(self.snapshot);
                MoveOutcome::RolledBack {
                    reason: e.to_string(),
                    transient,
                }
            }
        }
    }

    /// Replace the touched orderings with authoritative data. A failed
    /// refetch leaves the optimistic state in place.
    async fn confirm(&self) {
        if let Err(e) = self.refetch().await {
            warn!(board = %self.board_id, error = %e, "confirmation refetch failed");
        }
    }

    /// Both lists a card touched are fetched before either is reconciled, so
    /// a failed fetch changes nothing.
    async fn refetch(&self) -> Result<()> {
        match &self.planned {
            PlannedMove::Item { item, to, .. } => {
                let items = self.gateway.fetch_container_items(to).await?;
                let mut lists = vec![(to.clone(), items)];
                let from = self.snapshot.state().item(item).map(|i| &i.container_id);
                if let Some(from) = from.filter(|from| *from != to) {
                    let items = self.gateway.fetch_container_items(from).await?;
                    lists.push((from.clone(), items));
                }
                self.store.reconcile_lists(&self.board_id, lists)
            }
            PlannedMove::Container { board, .. } => {
                let containers = self.gateway.fetch_board_containers(board).await?;
                self.store.reconcile_containers(board, containers)
            }
        }
    }
}

/// Drives drags for one board
pub struct BoardController {
    board_id: BoardId,
    store: OptimisticStore,
    gateway: Arc<dyn PersistenceGateway>,
    session: DragSession,
    allocator: PositionAllocator,
    reconcile_after_write: bool,
}

impl std::fmt::Debug for BoardController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoardController")
            .field("board_id", &self.board_id)
            .field("phase", &self.session.phase().name())
            .finish_non_exhaustive()
    }
}

impl BoardController {
    pub fn new(
        board_id: BoardId,
        store: OptimisticStore,
        gateway: Arc<dyn PersistenceGateway>,
        config: &ReorderConfig,
    ) -> Self {
        Self {
            board_id,
            store,
            gateway,
            session: DragSession::new(config),
            allocator: PositionAllocator::from_config(config),
            reconcile_after_write: config.reconcile_after_write,
        }
    }

    pub fn board_id(&self) -> &BoardId {
        &self.board_id
    }

    pub fn store(&self) -> &OptimisticStore {
        &self.store
    }

    pub fn session(&self) -> &DragSession {
        &self.session
    }

    /// The "currently dragging" indicator
    pub fn indicator(&self) -> Option<&DragState> {
        self.session.indicator()
    }

    /// Fetch the board from the gateway and install it in the store
    pub async fn load(&self) -> Result<()> {
        let state = self.gateway.fetch_board(&self.board_id).await?;
        self.store.load(state);
        Ok(())
    }

    /// Explicit rebalancing for this board
    pub fn rebalancer(&self) -> Rebalancer {
        Rebalancer {
            board_id: self.board_id.clone(),
            store: self.store.clone(),
            gateway: Arc::clone(&self.gateway),
            allocator: self.allocator,
        }
    }

    pub fn pointer_down(&mut self, subject: DragSubject, bounds: Rect, at: Point) -> DragEffect {
        self.session.press(subject, bounds, at)
    }

    pub fn pointer_move(&mut self, event: &PointerEvent, ctx: InputContext) -> Result<DragEffect> {
        let session = &mut self.session;
        self.store
            .with_board(&self.board_id, |board| session.pointer_move(board, event, ctx))
            .ok_or_else(|| self.board_missing())
    }

    /// Release the pointer. A drop is applied to the store before this returns.
    pub fn pointer_up(&mut self, event: &PointerEvent) -> Result<DropResult> {
        let session = &mut self.session;
        let effect = self
            .store
            .with_board(&self.board_id, |board| session.release(board, event))
            .ok_or_else(|| self.board_missing())?;

        match effect {
            DragEffect::Dropped(plan) => self.commit(plan),
            DragEffect::Cancelled(reason) => Ok(DropResult::Cancelled(reason)),
            DragEffect::Noop(reason) => Ok(DropResult::Ignored(reason)),
            DragEffect::Pressed | DragEffect::Activated(_) | DragEffect::HoverUpdated(_) => {
                Ok(DropResult::Ignored(NoopReason::IdleWithoutActiveDrag))
            }
        }
    }

    pub fn cancel(&mut self) -> DragEffect {
        self.session.cancel()
    }

    /// Move a card without pointer geometry, as a keyboard move would.
    ///
    /// The target follows drop rules: a card means "before it", a list means
    /// "at the end".
    pub fn move_card(&mut self, item: &ItemId, target: &HoverTarget) -> Result<DropResult> {
        self.ensure_idle()?;
        let allocator = self.allocator;
        let plan = self
            .store
            .with_board(&self.board_id, |board| {
                let hit = resolve_item_insertion(board, item, target)?;
                plan_item_move(
                    board,
                    item,
                    &hit.container_id,
                    hit.index,
                    &allocator,
                    DragSnapshot::capture(board),
                )
            })
            .ok_or_else(|| self.board_missing())?;

        match plan {
            Some(plan) => self.commit(plan),
            None => Ok(DropResult::Cancelled(CancelReason::StaleTarget)),
        }
    }

    /// Move a list before `before`, or to the end of the board.
    pub fn move_list(
        &mut self,
        list: &ContainerId,
        before: Option<&ContainerId>,
    ) -> Result<DropResult> {
        self.ensure_idle()?;
        let allocator = self.allocator;
        let plan = self
            .store
            .with_board(&self.board_id, |board| {
                let others = board.containers().iter().filter(|c| &c.id != list);
                let index = match before {
                    Some(before) if before == list => board.container_index(list)?,
                    Some(before) => others.clone().position(|c| &c.id == before)?,
                    None => others.count(),
                };
                plan_container_move(board, list, index, &allocator, DragSnapshot::capture(board))
            })
            .ok_or_else(|| self.board_missing())?;

        match plan {
            Some(plan) => self.commit(plan),
            None => Ok(DropResult::Cancelled(CancelReason::StaleTarget)),
        }
    }

    fn commit(&self, plan: DropPlan) -> Result<DropResult> {
        if plan.unchanged {
            debug!(subject = plan.planned.subject_id(), "dropped in place");
            return Ok(DropResult::Unchanged);
        }

        self.store.apply(&self.board_id, &plan.planned)?;
        Ok(DropResult::Pending(PendingWrite {
            board_id: self.board_id.clone(),
            planned: plan.planned,
            snapshot: plan.snapshot,
            precision_exhausted: plan.precision_exhausted,
            reconcile: self.reconcile_after_write,
            store: self.store.clone(),
            gateway: Arc::clone(&self.gateway),
        }))
    }

    fn ensure_idle(&self) -> Result<()> {
        if self.session.is_idle() {
            Ok(())
        } else {
            Err(ReorderError::DragInProgress)
        }
    }

    fn board_missing(&self) -> ReorderError {
        ReorderError::BoardNotFound {
            id: self.board_id.to_string(),
        }
    }
}

/// Renumbers an ordering to evenly spaced positions.
///
/// Every changed entry is applied locally and written one by one. The first
/// failed write rolls the local board back and stops; entries written before
/// it stay written remotely and are picked up by the next refetch.
#[derive(Clone)]
pub struct Rebalancer {
    board_id: BoardId,
    store: OptimisticStore,
    gateway: Arc<dyn PersistenceGateway>,
    allocator: PositionAllocator,
}

impl std::fmt::Debug for Rebalancer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rebalancer")
            .field("board_id", &self.board_id)
            .field("allocator", &self.allocator)
            .finish_non_exhaustive()
    }
}

impl Rebalancer {
    /// Renumber one list's cards. Returns the number of writes made.
    pub async fn rebalance_container(&self, container: &ContainerId) -> Result<usize> {
        let moves = self
            .store
            .with_board(&self.board_id, |board| {
                let items = board.items(container);
                self.allocator
                    .rebalance(items.len())
                    .into_iter()
                    .zip(items)
                    .filter(|(position, item)| *position != item.position)
                    .map(|(position, item)| PlannedMove::Item {
                        item: item.id.clone(),
                        to: container.clone(),
                        position,
                    })
                    .collect::<Vec<_>>()
            })
            .ok_or_else(|| ReorderError::BoardNotFound {
                id: self.board_id.to_string(),
            })?;
        self.run(moves).await
    }

    /// Renumber the board's lists. Returns the number of writes made.
    pub async fn rebalance_board(&self) -> Result<usize> {
        let moves = self
            .store
            .with_board(&self.board_id, |board| {
                let containers = board.containers();
                self.allocator
                    .rebalance(containers.len())
                    .into_iter()
                    .zip(containers)
                    .filter(|(position, container)| *position != container.position)
                    .map(|(position, container)| PlannedMove::Container {
                        container: container.id.clone(),
                        board: self.board_id.clone(),
                        position,
                    })
                    .collect::<Vec<_>>()
            })
            .ok_or_else(|| ReorderError::BoardNotFound {
                id: self.board_id.to_string(),
            })?;
        self.run(moves).await
    }

    async fn run(&self, moves: Vec<PlannedMove>) -> Result<usize> {
        let Some(before) = self.store.snapshot(&self.board_id) else {
            return Err(ReorderError::BoardNotFound {
                id: self.board_id.to_string(),
            });
        };
        let before = DragSnapshot::capture(&before);

        // Apply everything first so the renumbered order never shows a
        // half-moved state locally.
        for planned in &moves {
            if let Err(e) = self.store.apply(&self.board_id, planned) {
                self.store.rollback(before);
                return Err(e);
            }
        }

        for (written, planned) in moves.iter().enumerate() {
            if let Err(e) = self.gateway.persist(planned).await {
                warn!(
                    board = %self.board_id,
                    written,
                    error = %e,
                    "rebalance write failed; rolling back"
                );
                self.store.rollback(before);
                return Err(e);
            }
        }

        info!(board = %self.board_id, writes = moves.len(), "rebalanced");
        Ok(moves.len())
    }
}
