//! Insertion point resolution from drag geometry.
//!
//! Cards resolve against the card they hover ("insert before") or the list they
//! hover ("append"). Lists resolve against the hovered list with a hysteresis
//! rule: the side only flips once the dragged list covers a fixed share of the
//! hovered list's width, so the index does not flicker at the boundary.
//!
//! All indices are into the target's ordering with the dragged entry removed.

use crate::types::{BoardState, ContainerId, ItemId, Rect};
use serde::{Deserialize, Serialize};
use tracing::trace;

/// What the pointer is over
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum HoverTarget {
    /// A card
    Item(ItemId),
    /// A list, either its body or its empty tail
    Container(ContainerId),
}

impl HoverTarget {
    pub fn id(&self) -> &str {
        match self {
            Self::Item(id) => id.as_str(),
            Self::Container(id) => id.as_str(),
        }
    }

    /// Whether the target still exists on the board
    pub fn exists_in(&self, board: &BoardState) -> bool {
        match self {
            Self::Item(id) => board.item(id).is_some(),
            Self::Container(id) => board.container(id).is_some(),
        }
    }
}

/// Where a dragged card would land
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemInsertion {
    pub container_id: ContainerId,
    pub index: usize,
}

/// Which side of the hovered list the dragged list goes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Before,
    After,
}

impl Side {
    pub fn opposite(self) -> Self {
        match self {
            Self::Before => Self::After,
            Self::After => Self::Before,
        }
    }
}

/// Where a dragged list would land
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerInsertion {
    /// The list the decision was made against
    pub target: ContainerId,
    pub side: Side,
    pub index: usize,
}

/// Resolve the insertion point of a dragged card.
///
/// Returns `None` when the target (or the dragged card) is not on the board.
pub fn resolve_item_insertion(
    board: &BoardState,
    dragged: &ItemId,
    target: &HoverTarget,
) -> Option<ItemInsertion> {
    board.item(dragged)?;

    match target {
        HoverTarget::Item(over) => {
            let over_item = board.item(over)?;
            let container_id = over_item.container_id.clone();
            // Hovering itself resolves to its own slot, which is the same index
            // as the next card in the dragged-removed ordering.
            let index = board
                .items(&container_id)
                .iter()
                .filter(|i| &i.id != dragged || over == dragged)
                .position(|i| &i.id == over)?;
            Some(ItemInsertion {
                container_id,
                index,
            })
        }
        HoverTarget::Container(container_id) => {
            board.container(container_id)?;
            let index = board
                .items(container_id)
                .iter()
                .filter(|i| &i.id != dragged)
                .count();
            Some(ItemInsertion {
                container_id: container_id.clone(),
                index,
            })
        }
    }
}

/// Side decision with hysteresis.
///
/// The natural side is where the dragged centre sits relative to the hovered
/// centre. Once the horizontal overlap covers at least `threshold` of the
/// hovered width the dragged list commits to jumping past it, so the side is
/// the opposite of the natural one.
pub fn resolve_side(dragged: &Rect, hovered: &Rect, threshold: f64) -> Side {
    let ratio = overlap_ratio(dragged, hovered);
    let natural = if dragged.center_x() < hovered.center_x() {
        Side::Before
    } else {
        Side::After
    };
    if ratio >= threshold {
        natural.opposite()
    } else {
        natural
    }
}

/// Horizontal overlap as a share of the hovered width; zero for a zero-width box.
pub fn overlap_ratio(dragged: &Rect, hovered: &Rect) -> f64 {
    if hovered.width <= 0.0 {
        return 0.0;
    }
    dragged.horizontal_overlap(hovered) / hovered.width
}

/// List insertion with a remembered current target.
#[derive(Debug, Clone, PartialEq)]
pub struct ContainerInsertionResolver {
    threshold: f64,
    current: Option<(ContainerId, Rect)>,
}

impl ContainerInsertionResolver {
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold,
            current: None,
        }
    }

    /// The last list overlapped
    pub fn current_target(&self) -> Option<&ContainerId> {
        self.current.as_ref().map(|(id, _)| id)
    }

    /// Resolve against the hovered list, or against the last one overlapped
    /// when the pointer is over no list.
    pub fn resolve(
        &mut self,
        board: &BoardState,
        dragged: &ContainerId,
        dragged_rect: &Rect,
        hovered: Option<(&ContainerId, &Rect)>,
    ) -> Option<ContainerInsertion> {
        if let Some((id, rect)) = hovered {
            self.current = Some((id.clone(), *rect));
        }
        let (target, target_rect) = self.current.clone()?;

        board.container(dragged)?;
        if &target == dragged {
            // Over its own slot: stay put.
            let index = board.container_index(dragged)?;
            return Some(ContainerInsertion {
                target,
                side: Side::Before,
                index,
            });
        }

        let target_index = board
            .containers()
            .iter()
            .filter(|c| &c.id != dragged)
            .position(|c| c.id == target)?;
        let side = resolve_side(dragged_rect, &target_rect, self.threshold);
        let index = match side {
            Side::Before => target_index,
            Side::After => target_index + 1,
        };
        trace!(target = %target, ?side, index, "resolved list insertion");

        Some(ContainerInsertion {
            target,
            side,
            index,
        })
    }
}
