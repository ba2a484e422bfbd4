//! Board-level types: Board, Container, Item, BoardState

use super::ids::{BoardId, ContainerId, ItemId};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};

/// Board metadata. Lists and cards are stored separately.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Board {
    pub id: BoardId,
    pub name: String,
}

impl Board {
    /// Create a new board with a fresh id
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: BoardId::new(),
            name: name.into(),
        }
    }
}

/// A list on a board. Lists of one board are ordered by `position`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Container {
    pub id: ContainerId,
    pub board_id: BoardId,
    pub position: f64,
}

impl Container {
    pub fn new(id: impl Into<ContainerId>, board_id: impl Into<BoardId>, position: f64) -> Self {
        Self {
            id: id.into(),
            board_id: board_id.into(),
            position,
        }
    }
}

/// A card in a list. Cards of one list are ordered by `position`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub container_id: ContainerId,
    pub position: f64,
}

impl Item {
    pub fn new(id: impl Into<ItemId>, container_id: impl Into<ContainerId>, position: f64) -> Self {
        Self {
            id: id.into(),
            container_id: container_id.into(),
            position,
        }
    }
}

/// Sort key: position first, id only to break ties deterministically.
fn by_position<I: Ord>(a: (f64, &I), b: (f64, &I)) -> Ordering {
    a.0.total_cmp(&b.0).then_with(|| a.1.cmp(b.1))
}

/// Sort cards into list order
pub fn sort_items(items: &mut [Item]) {
    items.sort_by(|a, b| by_position((a.position, &a.id), (b.position, &b.id)));
}

/// Sort lists into board order
pub fn sort_containers(containers: &mut [Container]) {
    containers.sort_by(|a, b| by_position((a.position, &a.id), (b.position, &b.id)));
}

/// Full local copy of one board: its lists and every list's cards.
///
/// Lists are kept sorted by `(position, id)`, and so are the cards of each list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "BoardStateRepr", into = "BoardStateRepr")]
pub struct BoardState {
    board_id: BoardId,
    containers: Vec<Container>,
    items: BTreeMap<ContainerId, Vec<Item>>,
}

#[derive(Serialize, Deserialize)]
struct BoardStateRepr {
    board_id: BoardId,
    #[serde(default)]
    containers: Vec<Container>,
    #[serde(default)]
    items: Vec<Item>,
}

impl From<BoardStateRepr> for BoardState {
    fn from(repr: BoardStateRepr) -> Self {
        BoardState::from_parts(repr.board_id, repr.containers, repr.items)
    }
}

impl From<BoardState> for BoardStateRepr {
    fn from(state: BoardState) -> Self {
        BoardStateRepr {
            board_id: state.board_id,
            containers: state.containers,
            items: state.items.into_values().flatten().collect(),
        }
    }
}

impl BoardState {
    /// An empty board
    pub fn new(board_id: impl Into<BoardId>) -> Self {
        Self {
            board_id: board_id.into(),
            containers: Vec::new(),
            items: BTreeMap::new(),
        }
    }

    /// Build a board from unordered lists and cards
    pub fn from_parts(
        board_id: impl Into<BoardId>,
        containers: impl IntoIterator<Item = Container>,
        items: impl IntoIterator<Item = Item>,
    ) -> Self {
        let mut state = Self::new(board_id);
        for container in containers {
            state.insert_container(container);
        }
        for item in items {
            state.insert_item(item);
        }
        state
    }

    /// Builder-style list insertion
    pub fn with_container(mut self, container: Container) -> Self {
        self.insert_container(container);
        self
    }

    /// Builder-style card insertion
    pub fn with_item(mut self, item: Item) -> Self {
        self.insert_item(item);
        self
    }

    pub fn board_id(&self) -> &BoardId {
        &self.board_id
    }

    /// Lists in board order
    pub fn containers(&self) -> &[Container] {
        &self.containers
    }

    pub fn container(&self, id: &ContainerId) -> Option<&Container> {
        self.containers.iter().find(|c| &c.id == id)
    }

    pub fn container_index(&self, id: &ContainerId) -> Option<usize> {
        self.containers.iter().position(|c| &c.id == id)
    }

    /// Cards of a list in list order; empty when the list holds none
    pub fn items(&self, container: &ContainerId) -> &[Item] {
        self.items.get(container).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Find a card anywhere on the board
    pub fn item(&self, id: &ItemId) -> Option<&Item> {
        self.items.values().flatten().find(|i| &i.id == id)
    }

    /// Index of a card within its own list
    pub fn item_index(&self, id: &ItemId) -> Option<(ContainerId, usize)> {
        self.items.iter().find_map(|(container, items)| {
            items
                .iter()
                .position(|i| &i.id == id)
                .map(|index| (container.clone(), index))
        })
    }

    /// Total number of cards
    pub fn item_count(&self) -> usize {
        self.items.values().map(Vec::len).sum()
    }

    /// True when every list's cards, and the lists themselves, have strictly
    /// ascending positions.
    pub fn is_strictly_ordered(&self) -> bool {
        let lists_ok = self
            .containers
            .windows(2)
            .all(|w| w[0].position < w[1].position);
        lists_ok
            && self
                .items
                .values()
                .all(|items| items.windows(2).all(|w| w[0].position < w[1].position))
    }

    pub(crate) fn insert_item(&mut self, item: Item) {
        let items = self.items.entry(item.container_id.clone()).or_default();
        let index = items.partition_point(|existing| {
            by_position((existing.position, &existing.id), (item.position, &item.id))
                != Ordering::Greater
        });
        items.insert(index, item);
    }

    pub(crate) fn remove_item(&mut self, id: &ItemId) -> Option<Item> {
        let (container, index) = self.item_index(id)?;
        let items = self.items.get_mut(&container)?;
        let removed = items.remove(index);
        if items.is_empty() {
            self.items.remove(&container);
        }
        Some(removed)
    }

    pub(crate) fn insert_container(&mut self, container: Container) {
        let index = self.containers.partition_point(|existing| {
            by_position(
                (existing.position, &existing.id),
                (container.position, &container.id),
            ) != Ordering::Greater
        });
        self.containers.insert(index, container);
    }

    pub(crate) fn remove_container(&mut self, id: &ContainerId) -> Option<Container> {
        let index = self.container_index(id)?;
        Some(self.containers.remove(index))
    }

    /// Replace one list's cards with authoritative data.
    ///
    /// A card can only live in one list, so incoming cards are first removed
    /// from whichever list held them before.
    pub(crate) fn replace_items(&mut self, container: &ContainerId, items: Vec<Item>) {
        self.items.remove(container);
        let incoming: HashSet<&ItemId> = items.iter().map(|i| &i.id).collect();
        self.items.retain(|_, cards| {
            cards.retain(|card| !incoming.contains(&card.id));
            !cards.is_empty()
        });
        for mut item in items {
            item.container_id = container.clone();
            self.insert_item(item);
        }
    }

    /// Replace the board's lists with authoritative data.
    ///
    /// Cards of lists that no longer exist are dropped with them.
    pub(crate) fn replace_containers(&mut self, containers: Vec<Container>) {
        self.containers.clear();
        for container in containers {
            self.insert_container(container);
        }
        let live: Vec<ContainerId> = self.containers.iter().map(|c| c.id.clone()).collect();
        self.items.retain(|id, _| live.contains(id));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board() -> BoardState {
        BoardState::from_parts(
            "b1",
            [Container::new("l2", "b1", 2.0), Container::new("l1", "b1", 1.0)],
            [
                Item::new("b", "l1", 2.0),
                Item::new("a", "l1", 1.0),
                Item::new("c", "l2", 1.0),
            ],
        )
    }

    #[test]
    fn test_from_parts_sorts() {
        let state = board();
        let lists: Vec<_> = state.containers().iter().map(|c| c.id.as_str()).collect();
        assert_eq!(lists, vec!["l1", "l2"]);
        let cards: Vec<_> = state
            .items(&"l1".into())
            .iter()
            .map(|i| i.id.as_str())
            .collect();
        assert_eq!(cards, vec!["a", "b"]);
        assert!(state.is_strictly_ordered());
    }

    #[test]
    fn test_ties_break_by_id() {
        let state = BoardState::new("b1")
            .with_item(Item::new("z", "l1", 1.0))
            .with_item(Item::new("a", "l1", 1.0));
        assert_eq!(state.items(&"l1".into())[0].id.as_str(), "a");
        assert!(!state.is_strictly_ordered());
    }

    #[test]
    fn test_item_lookup() {
        let state = board();
        assert_eq!(state.item(&"c".into()).unwrap().container_id.as_str(), "l2");
        assert_eq!(state.item_index(&"b".into()), Some(("l1".into(), 1)));
        assert!(state.item(&"missing".into()).is_none());
        assert_eq!(state.item_count(), 3);
        assert!(state.items(&"nowhere".into()).is_empty());
    }

    #[test]
    fn test_replace_containers_drops_orphans() {
        let mut state = board();
        state.replace_containers(vec![Container::new("l2", "b1", 5.0)]);
        assert_eq!(state.containers().len(), 1);
        assert!(state.items(&"l1".into()).is_empty());
        assert_eq!(state.items(&"l2".into()).len(), 1);
    }

    #[test]
    fn test_replace_items_takes_cards_from_other_lists() {
        let mut state = board();
        state.replace_items(
            &"l2".into(),
            vec![Item::new("a", "l2", 0.5), Item::new("c", "l2", 1.0)],
        );
        let l1: Vec<_> = state.items(&"l1".into()).iter().map(|i| i.id.as_str()).collect();
        let l2: Vec<_> = state.items(&"l2".into()).iter().map(|i| i.id.as_str()).collect();
        assert_eq!(l1, vec!["b"]);
        assert_eq!(l2, vec!["a", "c"]);
        assert_eq!(state.item_count(), 3);
    }

    #[test]
    fn test_replace_items_drops_emptied_list() {
        let mut state = BoardState::new("b1")
            .with_item(Item::new("a", "l1", 1.0))
            .with_item(Item::new("c", "l2", 1.0));
        state.replace_items(
            &"l2".into(),
            vec![Item::new("a", "l2", 0.5), Item::new("c", "l2", 1.0)],
        );
        let expected = BoardState::new("b1")
            .with_item(Item::new("a", "l2", 0.5))
            .with_item(Item::new("c", "l2", 1.0));
        assert_eq!(state, expected);
    }

    #[test]
    fn test_serde_roundtrip_preserves_order() {
        let state = board();
        let json = serde_json::to_string(&state).unwrap();
        let parsed: BoardState = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, state);
    }

    #[test]
    fn test_board_new_generates_id() {
        let board = Board::new("Roadmap");
        assert_eq!(board.name, "Roadmap");
        assert_eq!(board.id.as_str().len(), 26);
    }
}
