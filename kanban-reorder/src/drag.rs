//! Drag lifecycle state machine.
//!
//! ```text
//! Idle -> Pressed -> Active -> Hovering <-> Hovering
//!            |          |         |
//!            v          v         v
//!          Idle     Cancelled  Dropped | Cancelled -> Idle
//! ```
//!
//! The session never mutates the store. It reads a `&BoardState` on each
//! transition, keeps the snapshot captured at activation, and on release hands
//! back a [`DropPlan`] for the caller to apply and persist.

use crate::config::ReorderConfig;
use crate::insertion::{resolve_item_insertion, ContainerInsertionResolver, HoverTarget};
use crate::position::PositionAllocator;
use crate::store::{DragSnapshot, PlannedMove};
use crate::types::{BoardState, ContainerId, ItemId, Point, Rect};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

/// Whether a card or a list is being dragged
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DragKind {
    Item,
    Container,
}

/// The entity picked up
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum DragSubject {
    Item(ItemId),
    Container(ContainerId),
}

impl DragSubject {
    pub fn kind(&self) -> DragKind {
        match self {
            Self::Item(_) => DragKind::Item,
            Self::Container(_) => DragKind::Container,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Self::Item(id) => id.as_str(),
            Self::Container(id) => id.as_str(),
        }
    }

    fn exists_in(&self, board: &BoardState) -> bool {
        match self {
            Self::Item(id) => board.item(id).is_some(),
            Self::Container(id) => board.container(id).is_some(),
        }
    }
}

/// Ambient input conditions checked on every pointer move.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputContext {
    /// A modal or overlay owns the pointer
    #[serde(default)]
    pub input_locked: bool,
}

impl InputContext {
    pub const fn unlocked() -> Self {
        Self {
            input_locked: false,
        }
    }

    pub const fn locked() -> Self {
        Self { input_locked: true }
    }
}

/// A pointer event as delivered by the presentation layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointerEvent {
    #[serde(default)]
    pub target: Option<HoverTarget>,
    #[serde(default)]
    pub target_bounds: Option<Rect>,
    pub position: Point,
}

impl PointerEvent {
    pub fn at(position: Point) -> Self {
        Self {
            target: None,
            target_bounds: None,
            position,
        }
    }

    pub fn over(mut self, target: HoverTarget) -> Self {
        self.target = Some(target);
        self
    }

    pub fn with_bounds(mut self, bounds: Rect) -> Self {
        self.target_bounds = Some(bounds);
        self
    }
}

/// The "currently dragging" indicator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DragState {
    pub kind: DragKind,
    pub dragged: DragSubject,
    /// For card drags, the list the card would land in
    pub current_container: Option<ContainerId>,
    pub hover_target: Option<HoverTarget>,
    pub insertion_index: Option<usize>,
}

/// An activated drag
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveDrag {
    state: DragState,
    snapshot: DragSnapshot,
    origin: Point,
    bounds: Rect,
    lists: ContainerInsertionResolver,
}

impl ActiveDrag {
    pub fn state(&self) -> &DragState {
        &self.state
    }

    pub fn snapshot(&self) -> &DragSnapshot {
        &self.snapshot
    }
}

/// Lifecycle phase
#[derive(Debug, Clone, PartialEq)]
pub enum DragPhase {
    Idle,
    /// Pointer is down but has not travelled the activation distance
    Pressed {
        subject: DragSubject,
        origin: Point,
        bounds: Rect,
    },
    /// Activated, nothing hovered yet
    Active(Box<ActiveDrag>),
    /// Activated with a resolved insertion point
    Hovering(Box<ActiveDrag>),
}

impl DragPhase {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Pressed { .. } => "pressed",
            Self::Active(_) => "active",
            Self::Hovering(_) => "hovering",
        }
    }
}

/// Why an event was ignored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoopReason {
    IdleWithoutActiveDrag,
    DragAlreadyInProgress,
    ActivationDistanceNotReached,
    NoHoverTarget,
    UnknownTarget,
}

/// Why a drag ended without a drop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CancelReason {
    /// Explicit cancel signal
    Requested,
    /// A modal or overlay took the pointer
    InputLocked,
    /// Released before anything was hovered
    NoDropTarget,
    /// The dragged entity or its target vanished before the drop
    StaleTarget,
}

/// A resolved drop, ready to apply and persist
#[derive(Debug, Clone, PartialEq)]
pub struct DropPlan {
    pub planned: PlannedMove,
    /// Index in the target ordering with the dragged entry removed
    pub index: usize,
    /// Board state at activation; the rollback target
    pub snapshot: DragSnapshot,
    /// Dropped back onto its own slot; nothing to apply or write
    pub unchanged: bool,
    /// The allocated position is not strictly between its neighbours
    pub precision_exhausted: bool,
}

/// Result of one transition
#[derive(Debug, Clone, PartialEq)]
pub enum DragEffect {
    Pressed,
    Activated(DragState),
    HoverUpdated(DragState),
    Dropped(DropPlan),
    Cancelled(CancelReason),
    Noop(NoopReason),
}

/// Plan moving a card to `index` of list `to`.
pub(crate) fn plan_item_move(
    board: &BoardState,
    item: &ItemId,
    to: &ContainerId,
    index: usize,
    allocator: &PositionAllocator,
    snapshot: DragSnapshot,
) -> Option<DropPlan> {
    let current = board.item(item)?;
    board.container(to)?;

    let siblings: Vec<f64> = board
        .items(to)
        .iter()
        .filter(|i| &i.id != item)
        .map(|i| i.position)
        .collect();
    let index = index.min(siblings.len());
    let unchanged = &current.container_id == to
        && board.items(to).iter().position(|i| &i.id == item) == Some(index);

    let (position, precision_exhausted) = if unchanged {
        (current.position, false)
    } else {
        allocate_at(&siblings, index, allocator)
    };

    Some(DropPlan {
        planned: PlannedMove::Item {
            item: item.clone(),
            to: to.clone(),
            position,
        },
        index,
        snapshot,
        unchanged,
        precision_exhausted,
    })
}

/// Plan moving a list to `index` of the board's list ordering.
pub(crate) fn plan_container_move(
    board: &BoardState,
    container: &ContainerId,
    index: usize,
    allocator: &PositionAllocator,
    snapshot: DragSnapshot,
) -> Option<DropPlan> {
    let current = board.container(container)?;

    let siblings: Vec<f64> = board
        .containers()
        .iter()
        .filter(|c| &c.id != container)
        .map(|c| c.position)
        .collect();
    let index = index.min(siblings.len());
    let unchanged = board.container_index(container) == Some(index);

    let (position, precision_exhausted) = if unchanged {
        (current.position, false)
    } else {
        allocate_at(&siblings, index, allocator)
    };

    Some(DropPlan {
        planned: PlannedMove::Container {
            container: container.clone(),
            board: board.board_id().clone(),
            position,
        },
        index,
        snapshot,
        unchanged,
        precision_exhausted,
    })
}

fn allocate_at(siblings: &[f64], index: usize, allocator: &PositionAllocator) -> (f64, bool) {
    let position = allocator.position_at(siblings, index);
    let prev = index.checked_sub(1).map(|i| siblings[i]);
    let next = siblings.get(index).copied();
    let exhausted = PositionAllocator::is_exhausted(prev, next, position);
    if exhausted {
        warn!(
            ?prev,
            ?next,
            position,
            "position precision exhausted between neighbours; rebalance this container"
        );
    }
    (position, exhausted)
}

/// One drag interaction for one board.
#[derive(Debug, Clone)]
pub struct DragSession {
    phase: DragPhase,
    activation_distance: f64,
    overlap_threshold: f64,
    allocator: PositionAllocator,
}

impl Default for DragSession {
    fn default() -> Self {
        Self::new(&ReorderConfig::default())
    }
}

impl DragSession {
    pub fn new(config: &ReorderConfig) -> Self {
        Self {
            phase: DragPhase::Idle,
            activation_distance: config.activation_distance_px,
            overlap_threshold: config.list_switch_overlap_ratio,
            allocator: PositionAllocator::from_config(config),
        }
    }

    pub fn phase(&self) -> &DragPhase {
        &self.phase
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.phase, DragPhase::Idle)
    }

    /// True once the activation distance has been crossed
    pub fn is_dragging(&self) -> bool {
        matches!(self.phase, DragPhase::Active(_) | DragPhase::Hovering(_))
    }

    /// The presentation layer's "currently dragging" indicator
    pub fn indicator(&self) -> Option<&DragState> {
        self.active().map(ActiveDrag::state)
    }

    /// The snapshot captured when the drag activated
    pub fn snapshot(&self) -> Option<&DragSnapshot> {
        self.active().map(ActiveDrag::snapshot)
    }

    fn active(&self) -> Option<&ActiveDrag> {
        match &self.phase {
            DragPhase::Active(drag) | DragPhase::Hovering(drag) => Some(drag),
            _ => None,
        }
    }

    /// Pointer down on a card or list.
    ///
    /// A second press while any drag is underway is ignored.
    pub fn press(&mut self, subject: DragSubject, bounds: Rect, at: Point) -> DragEffect {
        if !self.is_idle() {
            debug!(
                phase = self.phase.name(),
                subject = subject.id(),
                "ignoring press while a drag is in progress"
            );
            return DragEffect::Noop(NoopReason::DragAlreadyInProgress);
        }
        trace!(subject = subject.id(), "pressed");
        self.phase = DragPhase::Pressed {
            subject,
            origin: at,
            bounds,
        };
        DragEffect::Pressed
    }

    /// Pointer moved. Activates a pressed drag once it has travelled far
    /// enough, then recomputes the insertion point on every later move.
    pub fn pointer_move(
        &mut self,
        board: &BoardState,
        event: &PointerEvent,
        ctx: InputContext,
    ) -> DragEffect {
        match std::mem::replace(&mut self.phase, DragPhase::Idle) {
            DragPhase::Idle => DragEffect::Noop(NoopReason::IdleWithoutActiveDrag),
            DragPhase::Pressed {
                subject,
                origin,
                bounds,
            } => {
                if origin.distance_to(event.position) < self.activation_distance {
                    self.phase = DragPhase::Pressed {
                        subject,
                        origin,
                        bounds,
                    };
                    return DragEffect::Noop(NoopReason::ActivationDistanceNotReached);
                }
                if ctx.input_locked {
                    debug!(subject = subject.id(), "drag blocked by locked input");
                    return DragEffect::Cancelled(CancelReason::InputLocked);
                }
                self.activate(board, subject, origin, bounds)
            }
            DragPhase::Active(drag) | DragPhase::Hovering(drag) => {
                if ctx.input_locked {
                    debug!(
                        subject = drag.state.dragged.id(),
                        "input locked mid-drag; cancelling"
                    );
                    return DragEffect::Cancelled(CancelReason::InputLocked);
                }
                self.hover(board, drag, event)
            }
        }
    }

    fn activate(
        &mut self,
        board: &BoardState,
        subject: DragSubject,
        origin: Point,
        bounds: Rect,
    ) -> DragEffect {
        let current_container = match &subject {
            DragSubject::Item(id) => board.item(id).map(|i| i.container_id.clone()),
            DragSubject::Container(_) => None,
        };
        let state = DragState {
            kind: subject.kind(),
            dragged: subject,
            current_container,
            hover_target: None,
            insertion_index: None,
        };
        debug!(
            kind = ?state.kind,
            dragged = state.dragged.id(),
            "drag activated"
        );
        let drag = ActiveDrag {
            state: state.clone(),
            snapshot: DragSnapshot::capture(board),
            origin,
            bounds,
            lists: ContainerInsertionResolver::new(self.overlap_threshold),
        };
        self.phase = DragPhase::Active(Box::new(drag));
        DragEffect::Activated(state)
    }

    fn hover(
        &mut self,
        board: &BoardState,
        mut drag: Box<ActiveDrag>,
        event: &PointerEvent,
    ) -> DragEffect {
        let resolved = match drag.state.dragged.clone() {
            DragSubject::Item(dragged) => match &event.target {
                None => Err(NoopReason::NoHoverTarget),
                Some(target) => resolve_item_insertion(board, &dragged, target)
                    .map(|hit| (Some(hit.container_id), target.clone(), hit.index))
                    .ok_or(NoopReason::UnknownTarget),
            },
            DragSubject::Container(dragged) => {
                let dragged_rect = drag.bounds.translated(drag.origin, event.position);
                // Overlap is measured against list bounds only; a card target
                // falls back to the remembered list.
                let hovered = match (&event.target, event.target_bounds) {
                    (Some(HoverTarget::Container(id)), Some(rect)) => Some((id.clone(), rect)),
                    _ => None,
                };
                drag.lists
                    .resolve(
                        board,
                        &dragged,
                        &dragged_rect,
                        hovered.as_ref().map(|(id, rect)| (id, rect)),
                    )
                    .map(|hit| (None, HoverTarget::Container(hit.target), hit.index))
                    .ok_or(match event.target {
                        Some(HoverTarget::Container(_)) => NoopReason::UnknownTarget,
                        _ => NoopReason::NoHoverTarget,
                    })
            }
        };

        match resolved {
            Ok((container, target, index)) => {
                if container.is_some() {
                    drag.state.current_container = container;
                }
                drag.state.hover_target = Some(target);
                drag.state.insertion_index = Some(index);
                trace!(
                    dragged = drag.state.dragged.id(),
                    index,
                    "insertion point updated"
                );
                let state = drag.state.clone();
                self.phase = DragPhase::Hovering(drag);
                DragEffect::HoverUpdated(state)
            }
            Err(reason) => {
                self.phase = if drag.state.insertion_index.is_some() {
                    DragPhase::Hovering(drag)
                } else {
                    DragPhase::Active(drag)
                };
                DragEffect::Noop(reason)
            }
        }
    }

    /// Pointer released. The drop is resolved from the last drag state, never
    /// from the release event, and validated against `board`.
    pub fn release(&mut self, board: &BoardState, _event: &PointerEvent) -> DragEffect {
        match std::mem::replace(&mut self.phase, DragPhase::Idle) {
            DragPhase::Idle => DragEffect::Noop(NoopReason::IdleWithoutActiveDrag),
            DragPhase::Pressed { .. } => DragEffect::Noop(NoopReason::ActivationDistanceNotReached),
            DragPhase::Active(drag) => {
                debug!(
                    dragged = drag.state.dragged.id(),
                    "released without a drop target"
                );
                DragEffect::Cancelled(CancelReason::NoDropTarget)
            }
            DragPhase::Hovering(drag) => self.drop_on(board, *drag),
        }
    }

    fn drop_on(&self, board: &BoardState, drag: ActiveDrag) -> DragEffect {
        let ActiveDrag {
            state, snapshot, ..
        } = drag;

        let stale = !state.dragged.exists_in(board)
            || state
                .hover_target
                .as_ref()
                .is_some_and(|target| !target.exists_in(board));
        let plan = match (&state.dragged, state.insertion_index, stale) {
            (_, None, _) => return DragEffect::Cancelled(CancelReason::NoDropTarget),
            (_, _, true) => None,
            (DragSubject::Item(item), Some(index), false) => match &state.current_container {
                Some(to) => {
                    plan_item_move(board, item, to, index, &self.allocator, snapshot)
                }
                None => None,
            },
            (DragSubject::Container(container), Some(index), false) => {
                plan_container_move(board, container, index, &self.allocator, snapshot)
            }
        };

        match plan {
            Some(plan) => {
                debug!(
                    dragged = state.dragged.id(),
                    index = plan.index,
                    unchanged = plan.unchanged,
                    "dropped"
                );
                DragEffect::Dropped(plan)
            }
            None => {
                debug!(dragged = state.dragged.id(), "drop target went stale");
                DragEffect::Cancelled(CancelReason::StaleTarget)
            }
        }
    }

    /// Explicit cancel. Never touches the store.
    pub fn cancel(&mut self) -> DragEffect {
        match std::mem::replace(&mut self.phase, DragPhase::Idle) {
            DragPhase::Idle => DragEffect::Noop(NoopReason::IdleWithoutActiveDrag),
            _ => DragEffect::Cancelled(CancelReason::Requested),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Container, Item};

    fn board() -> BoardState {
        BoardState::from_parts(
            "b1",
            [Container::new("l1", "b1", 1.0), Container::new("l2", "b1", 2.0)],
            [
                Item::new("a", "l1", 1.0),
                Item::new("b", "l1", 2.0),
                Item::new("c", "l2", 1.0),
            ],
        )
    }

    fn card_bounds() -> Rect {
        Rect::new(0.0, 0.0, 200.0, 40.0)
    }

    fn far() -> Point {
        Point::new(50.0, 50.0)
    }

    fn start_card_drag(session: &mut DragSession, board: &BoardState, id: &str) {
        assert_eq!(
            session.press(DragSubject::Item(id.into()), card_bounds(), Point::new(0.0, 0.0)),
            DragEffect::Pressed
        );
        let effect = session.pointer_move(board, &PointerEvent::at(far()), InputContext::unlocked());
        assert!(matches!(effect, DragEffect::Activated(_)));
    }

    #[test]
    fn test_activation_needs_distance() {
        let board = board();
        let mut session = DragSession::default();
        session.press(DragSubject::Item("a".into()), card_bounds(), Point::new(0.0, 0.0));

        let effect = session.pointer_move(
            &board,
            &PointerEvent::at(Point::new(3.0, 4.0)),
            InputContext::unlocked(),
        );
        assert_eq!(effect, DragEffect::Noop(NoopReason::ActivationDistanceNotReached));
        assert_eq!(session.phase().name(), "pressed");

        let effect = session.pointer_move(
            &board,
            &PointerEvent::at(Point::new(6.0, 8.0)),
            InputContext::unlocked(),
        );
        match effect {
            DragEffect::Activated(state) => {
                assert_eq!(state.kind, DragKind::Item);
                assert_eq!(state.insertion_index, None);
                assert_eq!(state.current_container, Some("l1".into()));
            }
            other => panic!("expected activation, got {other:?}"),
        }
        assert_eq!(session.snapshot().unwrap().state(), &board);
    }

    #[test]
    fn test_click_is_not_a_drag() {
        let board = board();
        let mut session = DragSession::default();
        session.press(DragSubject::Item("a".into()), card_bounds(), Point::new(0.0, 0.0));
        let effect = session.release(&board, &PointerEvent::at(Point::new(1.0, 1.0)));
        assert_eq!(effect, DragEffect::Noop(NoopReason::ActivationDistanceNotReached));
        assert!(session.is_idle());
    }

    #[test]
    fn test_second_press_is_ignored() {
        let board = board();
        let mut session = DragSession::default();
        start_card_drag(&mut session, &board, "a");

        let effect = session.press(DragSubject::Item("b".into()), card_bounds(), far());
        assert_eq!(effect, DragEffect::Noop(NoopReason::DragAlreadyInProgress));
        assert_eq!(session.indicator().unwrap().dragged, DragSubject::Item("a".into()));
    }

    #[test]
    fn test_locked_input_blocks_activation() {
        let board = board();
        let mut session = DragSession::default();
        session.press(DragSubject::Item("a".into()), card_bounds(), Point::new(0.0, 0.0));
        let effect = session.pointer_move(&board, &PointerEvent::at(far()), InputContext::locked());
        assert_eq!(effect, DragEffect::Cancelled(CancelReason::InputLocked));
        assert!(session.is_idle());
    }

    #[test]
    fn test_overlay_mid_drag_cancels() {
        let board = board();
        let mut session = DragSession::default();
        start_card_drag(&mut session, &board, "a");
        let effect = session.pointer_move(
            &board,
            &PointerEvent::at(far()).over(HoverTarget::Item("c".into())),
            InputContext::locked(),
        );
        assert_eq!(effect, DragEffect::Cancelled(CancelReason::InputLocked));
        assert!(session.is_idle());
    }

    #[test]
    fn test_hover_updates_indicator() {
        let board = board();
        let mut session = DragSession::default();
        start_card_drag(&mut session, &board, "a");

        let effect = session.pointer_move(
            &board,
            &PointerEvent::at(far()).over(HoverTarget::Item("c".into())),
            InputContext::unlocked(),
        );
        assert!(matches!(effect, DragEffect::HoverUpdated(_)));
        let indicator = session.indicator().unwrap();
        assert_eq!(indicator.current_container, Some("l2".into()));
        assert_eq!(indicator.insertion_index, Some(0));
        assert_eq!(session.phase().name(), "hovering");

        // Moving over nothing keeps the last insertion point.
        let effect =
            session.pointer_move(&board, &PointerEvent::at(far()), InputContext::unlocked());
        assert_eq!(effect, DragEffect::Noop(NoopReason::NoHoverTarget));
        assert_eq!(session.indicator().unwrap().insertion_index, Some(0));
    }

    #[test]
    fn test_drop_plans_move_from_last_state() {
        let board = board();
        let mut session = DragSession::default();
        start_card_drag(&mut session, &board, "a");
        session.pointer_move(
            &board,
            &PointerEvent::at(far()).over(HoverTarget::Item("c".into())),
            InputContext::unlocked(),
        );

        // The release event points somewhere else; it must be ignored.
        let release = PointerEvent::at(far()).over(HoverTarget::Container("l1".into()));
        let plan = match session.release(&board, &release) {
            DragEffect::Dropped(plan) => plan,
            other => panic!("expected drop, got {other:?}"),
        };
        match &plan.planned {
            PlannedMove::Item { item, to, position } => {
                assert_eq!(item.as_str(), "a");
                assert_eq!(to.as_str(), "l2");
                assert!(*position < 1.0);
            }
            other => panic!("unexpected move {other:?}"),
        }
        assert!(!plan.unchanged);
        assert_eq!(plan.snapshot.state(), &board);
        assert!(session.is_idle());
        assert!(session.snapshot().is_none());
    }

    #[test]
    fn test_drop_on_own_slot_is_unchanged() {
        let board = board();
        let mut session = DragSession::default();
        start_card_drag(&mut session, &board, "b");
        session.pointer_move(
            &board,
            &PointerEvent::at(far()).over(HoverTarget::Item("b".into())),
            InputContext::unlocked(),
        );
        match session.release(&board, &PointerEvent::at(far())) {
            DragEffect::Dropped(plan) => {
                assert!(plan.unchanged);
                assert_eq!(
                    plan.planned,
                    PlannedMove::Item {
                        item: "b".into(),
                        to: "l1".into(),
                        position: 2.0
                    }
                );
            }
            other => panic!("expected drop, got {other:?}"),
        }
    }

    #[test]
    fn test_stale_target_cancels() {
        let board = board();
        let mut session = DragSession::default();
        start_card_drag(&mut session, &board, "a");
        session.pointer_move(
            &board,
            &PointerEvent::at(far()).over(HoverTarget::Item("c".into())),
            InputContext::unlocked(),
        );

        // Another client deleted list l2 (and card c with it).
        let mut after = board.clone();
        after.replace_containers(vec![Container::new("l1", "b1", 1.0)]);

        let effect = session.release(&after, &PointerEvent::at(far()));
        assert_eq!(effect, DragEffect::Cancelled(CancelReason::StaleTarget));
        assert!(session.is_idle());
    }

    #[test]
    fn test_release_without_hover_cancels() {
        let board = board();
        let mut session = DragSession::default();
        start_card_drag(&mut session, &board, "a");
        let effect = session.release(&board, &PointerEvent::at(far()));
        assert_eq!(effect, DragEffect::Cancelled(CancelReason::NoDropTarget));
    }

    #[test]
    fn test_cancel_from_any_phase() {
        let board = board();
        let mut session = DragSession::default();
        assert_eq!(session.cancel(), DragEffect::Noop(NoopReason::IdleWithoutActiveDrag));

        start_card_drag(&mut session, &board, "a");
        assert_eq!(session.cancel(), DragEffect::Cancelled(CancelReason::Requested));
        assert!(session.is_idle());
    }

    #[test]
    fn test_list_drag_uses_hysteresis() {
        let board = board();
        let mut session = DragSession::default();
        let l1 = Rect::new(0.0, 0.0, 200.0, 600.0);
        let l2 = Rect::new(220.0, 0.0, 200.0, 600.0);

        session.press(DragSubject::Container("l1".into()), l1, Point::new(100.0, 10.0));
        session.pointer_move(
            &board,
            &PointerEvent::at(Point::new(130.0, 10.0)),
            InputContext::unlocked(),
        );

        // Dragged box now spans [30, 230]: overlaps l2 by 10px, stays before.
        let effect = session.pointer_move(
            &board,
            &PointerEvent::at(Point::new(130.0, 10.0))
                .over(HoverTarget::Container("l2".into()))
                .with_bounds(l2),
            InputContext::unlocked(),
        );
        match effect {
            DragEffect::HoverUpdated(state) => assert_eq!(state.insertion_index, Some(0)),
            other => panic!("expected hover, got {other:?}"),
        }

        // Dragged box spans [200, 400]: overlap 180/200, jumps after l2.
        session.pointer_move(
            &board,
            &PointerEvent::at(Point::new(300.0, 10.0))
                .over(HoverTarget::Container("l2".into()))
                .with_bounds(l2),
            InputContext::unlocked(),
        );
        assert_eq!(session.indicator().unwrap().insertion_index, Some(1));

        match session.release(&board, &PointerEvent::at(Point::new(300.0, 10.0))) {
            DragEffect::Dropped(plan) => match plan.planned {
                PlannedMove::Container {
                    container,
                    board: board_id,
                    position,
                } => {
                    assert_eq!(container.as_str(), "l1");
                    assert_eq!(board_id.as_str(), "b1");
                    assert!(position > 2.0);
                }
                other => panic!("unexpected move {other:?}"),
            },
            other => panic!("expected drop, got {other:?}"),
        }
    }

    #[test]
    fn test_list_drag_over_card_keeps_list_bounds() {
        let board = board();
        let mut session = DragSession::default();
        let l1 = Rect::new(0.0, 0.0, 200.0, 600.0);
        let l2 = Rect::new(220.0, 0.0, 200.0, 600.0);
        let card_c = Rect::new(380.0, 50.0, 100.0, 40.0);

        session.press(DragSubject::Container("l1".into()), l1, Point::new(100.0, 10.0));
        session.pointer_move(
            &board,
            &PointerEvent::at(Point::new(130.0, 10.0)),
            InputContext::unlocked(),
        );

        // nothing remembered yet: a card alone is no list target
        let effect = session.pointer_move(
            &board,
            &PointerEvent::at(Point::new(130.0, 10.0))
                .over(HoverTarget::Item("c".into()))
                .with_bounds(card_c),
            InputContext::unlocked(),
        );
        assert_eq!(effect, DragEffect::Noop(NoopReason::NoHoverTarget));
        assert_eq!(session.phase().name(), "active");

        session.pointer_move(
            &board,
            &PointerEvent::at(Point::new(130.0, 10.0))
                .over(HoverTarget::Container("l2".into()))
                .with_bounds(l2),
            InputContext::unlocked(),
        );
        assert_eq!(session.indicator().unwrap().insertion_index, Some(0));

        // Dragged box spans [200, 400]. Against the card it would overlap
        // 20/100 and stay before; against l2 it overlaps 180/200.
        session.pointer_move(
            &board,
            &PointerEvent::at(Point::new(300.0, 10.0))
                .over(HoverTarget::Item("c".into()))
                .with_bounds(card_c),
            InputContext::unlocked(),
        );
        let indicator = session.indicator().unwrap();
        assert_eq!(indicator.insertion_index, Some(1));
        assert_eq!(indicator.hover_target, Some(HoverTarget::Container("l2".into())));
    }

    #[test]
    fn test_plan_flags_exhausted_precision() {
        let next = 1.0 + f64::EPSILON;
        let board = BoardState::from_parts(
            "b1",
            [Container::new("l1", "b1", 1.0)],
            [
                Item::new("a", "l1", 1.0),
                Item::new("b", "l1", next),
                Item::new("z", "l1", 9.0),
            ],
        );
        let plan = plan_item_move(
            &board,
            &"z".into(),
            &"l1".into(),
            1,
            &PositionAllocator::default(),
            DragSnapshot::capture(&board),
        )
        .unwrap();
        assert!(plan.precision_exhausted);
    }
}
