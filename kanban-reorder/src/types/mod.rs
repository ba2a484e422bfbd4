//! Core types for the reorder engine

mod board;
mod geometry;
mod ids;

// Re-export all types
pub use board::{sort_containers, sort_items, Board, BoardState, Container, Item};
pub use geometry::{Point, Rect};
pub use ids::{BoardId, ContainerId, ItemId};
