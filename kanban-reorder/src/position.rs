//! Fractional positions for ordering cards and lists.
//!
//! Positions are plain `f64` sort keys. Inserting between two neighbours takes
//! their midpoint, so no other entry has to be renumbered. Each insertion at the
//! same spot halves the remaining gap; after roughly fifty of them the midpoint
//! collapses onto a neighbour. [`PositionAllocator::is_exhausted`] detects that
//! and [`PositionAllocator::rebalance`] produces fresh, evenly spaced positions.

use crate::config::{ReorderConfig, DEFAULT_POSITION_BASE, DEFAULT_POSITION_STEP};

/// Position between two optional neighbours using the default constants.
pub fn allocate(prev: Option<f64>, next: Option<f64>) -> f64 {
    PositionAllocator::default().allocate(prev, next)
}

/// Computes positions from neighbouring positions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionAllocator {
    base: f64,
    step: f64,
}

impl Default for PositionAllocator {
    fn default() -> Self {
        Self {
            base: DEFAULT_POSITION_BASE,
            step: DEFAULT_POSITION_STEP,
        }
    }
}

impl PositionAllocator {
    pub fn new(base: f64, step: f64) -> Self {
        Self { base, step }
    }

    pub fn from_config(config: &ReorderConfig) -> Self {
        Self::new(config.position_base, config.position_step)
    }

    /// Position for an empty container
    pub fn first(&self) -> f64 {
        self.base
    }

    /// Position after the last entry
    pub fn after(&self, last: f64) -> f64 {
        last + self.step
    }

    /// Position before the first entry
    pub fn before(&self, first: f64) -> f64 {
        first - self.step
    }

    /// Midpoint of two neighbours
    pub fn between(&self, prev: f64, next: f64) -> f64 {
        (prev + next) / 2.0
    }

    /// Position for an entry placed between `prev` and `next`, either of
    /// which may be absent at the ends of a container.
    pub fn allocate(&self, prev: Option<f64>, next: Option<f64>) -> f64 {
        match (prev, next) {
            (None, None) => self.first(),
            (None, Some(next)) => self.before(next),
            (Some(prev), None) => self.after(prev),
            (Some(prev), Some(next)) => self.between(prev, next),
        }
    }

    /// Position for inserting at `index` into an ascending list of positions
    /// that does not contain the moving entry. `index` past the end appends.
    pub fn position_at(&self, ordered: &[f64], index: usize) -> f64 {
        let index = index.min(ordered.len());
        let prev = index.checked_sub(1).map(|i| ordered[i]);
        let next = ordered.get(index).copied();
        self.allocate(prev, next)
    }

    /// True when `candidate` is not strictly between its neighbours, which
    /// happens once repeated midpoints have used up the available precision.
    pub fn is_exhausted(prev: Option<f64>, next: Option<f64>, candidate: f64) -> bool {
        if !candidate.is_finite() {
            return true;
        }
        prev.is_some_and(|p| candidate <= p) || next.is_some_and(|n| candidate >= n)
    }

    /// Evenly spaced positions for `count` entries: `base, base + step, ...`
    pub fn rebalance(&self, count: usize) -> Vec<f64> {
        (0..count).map(|i| self.base + self.step * i as f64).collect()
    }
}
