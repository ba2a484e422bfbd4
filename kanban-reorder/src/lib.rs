//! Ordered-collection reordering engine for kanban boards
//!
//! Cards live in lists and lists live on boards. Both are ordered by a
//! fractional `position`, so a move rewrites exactly one row. Moves are applied
//! to a local cache first and persisted afterwards; a failed write restores the
//! board exactly as it was before the drag.
//!
//! ## Overview
//!
//! - **Positions** - midpoint insertion between neighbours, with exhaustion
//!   detection and explicit rebalancing
//! - **Insertion** - cards go before the hovered card; lists switch sides with
//!   hysteresis once they overlap the hovered list far enough
//! - **Drag session** - an explicit state machine, one drag at a time
//! - **Optimistic store** - synchronous mutations, snapshots, rollback
//! - **Gateway / realtime** - async persistence and "board changed" signals
//!   that trigger a refetch
//!
//! ## Basic Usage
//!
//! ```rust,no_run
//! use kanban_reorder::{
//!     BoardController, FileGateway, HoverTarget, OptimisticStore, ReorderConfig,
//! };
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let gateway = FileGateway::find(".")?;
//! let board = gateway.read_board().await?;
//! let config = ReorderConfig::load(Some(gateway.root()))?;
//!
//! let mut controller =
//!     BoardController::new(board.id, OptimisticStore::default(), Arc::new(gateway), &config);
//! controller.load().await?;
//!
//! // Move a card to the end of another list
//! let result = controller.move_card(&"card-id".into(), &HoverTarget::Container("done".into()))?;
//! if let Some(write) = result.pending() {
//!     println!("{:?}", write.persist().await);
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod controller;
pub mod drag;
mod error;
pub mod gateway;
pub mod insertion;
mod logging;
pub mod position;
pub mod realtime;
pub mod store;
pub mod types;

pub use config::{ConfigError, ReorderConfig};
pub use controller::{BoardController, DropResult, MoveOutcome, PendingWrite, Rebalancer};
pub use drag::{
    CancelReason, DragEffect, DragKind, DragPhase, DragSession, DragState, DragSubject, DropPlan,
    InputContext, NoopReason, PointerEvent,
};
pub use error::{ReorderError, Result};
pub use gateway::{FileGateway, InMemoryGateway, PersistenceGateway};
pub use insertion::{HoverTarget, Side};
pub use logging::Pretty;
pub use position::{allocate, PositionAllocator};
pub use realtime::{BoardChanged, BroadcastRealtime, RealtimeSync, Reconciler};
pub use store::{ChangeCause, DragSnapshot, OptimisticStore, PlannedMove, StoreEvent};

// Re-export commonly used types
pub use types::{
    Board, BoardId, BoardState, Container, ContainerId, Item, ItemId, Point, Rect,
};
