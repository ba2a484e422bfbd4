//! FileGateway - file-per-entity storage for one board
//!
//! Layout under the `.kanban` directory:
//!
//! ```text
//! .kanban/
//!   board.json
//!   lists/{id}.json
//!   cards/{id}.json
//!   .lock
//! ```
//!
//! Every write rewrites a single entity file atomically while holding the
//! board lock. A busy lock is reported, not waited for.

use super::PersistenceGateway;
use crate::error::{ReorderError, Result};
use crate::position::PositionAllocator;
use crate::types::{
    sort_containers, sort_items, Board, BoardId, BoardState, Container, ContainerId, Item, ItemId,
};
use async_trait::async_trait;
use fs2::FileExt;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Directory name searched for by [`FileGateway::find`]
pub const BOARD_DIR: &str = ".kanban";

/// Gateway over a `.kanban` directory
#[derive(Debug, Clone)]
pub struct FileGateway {
    root: PathBuf,
    allocator: PositionAllocator,
}

impl FileGateway {
    /// Create a gateway for the given .kanban directory
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            allocator: PositionAllocator::default(),
        }
    }

    /// Use `allocator` for positions of appended lists and cards
    pub fn with_allocator(mut self, allocator: PositionAllocator) -> Self {
        self.allocator = allocator;
        self
    }

    /// Find the nearest .kanban directory at or above `start`
    pub fn find(start: impl AsRef<Path>) -> Result<Self> {
        let mut current = start.as_ref().to_path_buf();

        loop {
            let board_dir = current.join(BOARD_DIR);
            if board_dir.is_dir() {
                return Ok(Self::new(board_dir));
            }

            if !current.pop() {
                return Err(ReorderError::NotInitialized {
                    path: start.as_ref().to_path_buf(),
                });
            }
        }
    }

    // =========================================================================
    // Paths
    // =========================================================================

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn board_path(&self) -> PathBuf {
        self.root.join("board.json")
    }

    pub fn lists_dir(&self) -> PathBuf {
        self.root.join("lists")
    }

    /// Fails with `InvalidId` for ids that cannot be a file name
    pub fn list_path(&self, id: &ContainerId) -> Result<PathBuf> {
        validate_id(id.as_str())?;
        Ok(self.lists_dir().join(format!("{}.json", id)))
    }

    pub fn cards_dir(&self) -> PathBuf {
        self.root.join("cards")
    }

    /// Fails with `InvalidId` for ids that cannot be a file name
    pub fn card_path(&self, id: &ItemId) -> Result<PathBuf> {
        validate_id(id.as_str())?;
        Ok(self.cards_dir().join(format!("{}.json", id)))
    }

    pub fn lock_path(&self) -> PathBuf {
        self.root.join(".lock")
    }

    pub fn is_initialized(&self) -> bool {
        self.board_path().exists()
    }

    // =========================================================================
    // Board setup
    // =========================================================================

    /// Create the directory structure and board file
    pub async fn init_board(&self, name: &str) -> Result<Board> {
        if self.is_initialized() {
            return Err(ReorderError::AlreadyExists {
                path: self.root.clone(),
            });
        }

        fs::create_dir_all(self.lists_dir()).await?;
        fs::create_dir_all(self.cards_dir()).await?;

        let board = Board::new(name);
        write_json(&self.board_path(), &board).await?;
        debug!(board = %board.id, path = %self.root.display(), "board initialized");
        Ok(board)
    }

    pub async fn read_board(&self) -> Result<Board> {
        let path = self.board_path();
        if !path.exists() {
            return Err(ReorderError::NotInitialized {
                path: self.root.clone(),
            });
        }
        read_json(&path).await
    }

    /// Append a new list after the board's last list
    pub async fn add_list(&self, id: Option<ContainerId>) -> Result<Container> {
        let id = id.unwrap_or_default();
        let path = self.list_path(&id)?;
        let board = self.read_board().await?;
        let _lock = self.lock().await?;

        if path.exists() {
            return Err(ReorderError::duplicate_id("list", id.as_str()));
        }

        let lists = self.read_all_lists().await?;
        let position = match lists.last() {
            Some(last) => self.allocator.after(last.position),
            None => self.allocator.first(),
        };

        let list = Container::new(id, board.id, position);
        write_json(&path, &list).await?;
        Ok(list)
    }

    /// Append a new card at the end of a list
    pub async fn add_card(&self, list: &ContainerId, id: Option<ItemId>) -> Result<Item> {
        let id = id.unwrap_or_default();
        let path = self.card_path(&id)?;
        let list_path = self.list_path(list)?;
        let _lock = self.lock().await?;

        if !list_path.exists() {
            return Err(ReorderError::ContainerNotFound {
                id: list.to_string(),
            });
        }
        if path.exists() {
            return Err(ReorderError::duplicate_id("card", id.as_str()));
        }

        let cards = self.read_list_cards(list).await?;
        let position = match cards.last() {
            Some(last) => self.allocator.after(last.position),
            None => self.allocator.first(),
        };

        let card = Item::new(id, list.clone(), position);
        write_json(&path, &card).await?;
        Ok(card)
    }

    /// Read the complete board from disk
    pub async fn read_board_state(&self) -> Result<BoardState> {
        let board = self.read_board().await?;
        let lists = self.read_all_lists().await?;
        let cards = self.read_all_cards().await?;
        Ok(BoardState::from_parts(board.id, lists, cards))
    }

    // =========================================================================
    // Entity I/O
    // =========================================================================

    pub async fn read_list(&self, id: &ContainerId) -> Result<Container> {
        let path = self.list_path(id)?;
        if !path.exists() {
            return Err(ReorderError::ContainerNotFound { id: id.to_string() });
        }
        read_json(&path).await
    }

    pub async fn read_card(&self, id: &ItemId) -> Result<Item> {
        let path = self.card_path(id)?;
        if !path.exists() {
            return Err(ReorderError::ItemNotFound { id: id.to_string() });
        }
        read_json(&path).await
    }

    /// All lists, in board order
    pub async fn read_all_lists(&self) -> Result<Vec<Container>> {
        let mut lists = Vec::new();
        for id in list_ids(&self.lists_dir()).await? {
            lists.push(self.read_list(&ContainerId::from_string(id)).await?);
        }
        sort_containers(&mut lists);
        Ok(lists)
    }

    /// All cards, unordered
    pub async fn read_all_cards(&self) -> Result<Vec<Item>> {
        let mut cards = Vec::new();
        for id in list_ids(&self.cards_dir()).await? {
            cards.push(self.read_card(&ItemId::from_string(id)).await?);
        }
        Ok(cards)
    }

    /// Cards of one list, in list order
    pub async fn read_list_cards(&self, list: &ContainerId) -> Result<Vec<Item>> {
        let mut cards: Vec<Item> = self
            .read_all_cards()
            .await?
            .into_iter()
            .filter(|c| &c.container_id == list)
            .collect();
        sort_items(&mut cards);
        Ok(cards)
    }

    // =========================================================================
    // Locking
    // =========================================================================

    /// Try to acquire an exclusive lock (non-blocking)
    pub async fn lock(&self) -> Result<BoardLock> {
        let lock_path = self.lock_path();

        if let Some(parent) = lock_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let file = std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&lock_path)?;

        match file.try_lock_exclusive() {
            Ok(()) => Ok(BoardLock { file }),
            Err(_) => Err(ReorderError::LockBusy),
        }
    }
}

#[async_trait]
impl PersistenceGateway for FileGateway {
    async fn move_item(&self, item: &ItemId, to: &ContainerId, position: f64) -> Result<()> {
        let _lock = self.lock().await?;

        if !self.list_path(to)?.exists() {
            return Err(ReorderError::ContainerNotFound { id: to.to_string() });
        }
        let mut card = self.read_card(item).await?;
        card.container_id = to.clone();
        card.position = position;
        write_json(&self.card_path(item)?, &card).await?;

        debug!(card = %item, list = %to, position, "card written");
        Ok(())
    }

    async fn move_container(
        &self,
        container: &ContainerId,
        board: &BoardId,
        position: f64,
    ) -> Result<()> {
        let _lock = self.lock().await?;

        let stored = self.read_board().await?;
        if &stored.id != board {
            return Err(ReorderError::BoardNotFound {
                id: board.to_string(),
            });
        }
        let mut list = self.read_list(container).await?;
        list.position = position;
        write_json(&self.list_path(container)?, &list).await?;

        debug!(list = %container, position, "list written");
        Ok(())
    }

    async fn fetch_container_items(&self, container: &ContainerId) -> Result<Vec<Item>> {
        self.read_list_cards(container).await
    }

    async fn fetch_board_containers(&self, board: &BoardId) -> Result<Vec<Container>> {
        let stored = self.read_board().await?;
        if &stored.id != board {
            return Err(ReorderError::BoardNotFound {
                id: board.to_string(),
            });
        }
        self.read_all_lists().await
    }
}

/// RAII lock guard - releases on drop
#[derive(Debug)]
pub struct BoardLock {
    file: std::fs::File,
}

impl Drop for BoardLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}

/// Ids name files, so they must stay inside their directory
fn validate_id(id: &str) -> Result<()> {
    let unsafe_id = id.is_empty()
        || id.contains(['/', '\\', '\0'])
        || id.contains("..");
    if unsafe_id {
        return Err(ReorderError::InvalidId { id: id.to_string() });
    }
    Ok(())
}

async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = fs::read_to_string(path).await?;
    Ok(serde_json::from_str(&content)?)
}

async fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let content = serde_json::to_string_pretty(value)?;
    atomic_write(path, content.as_bytes()).await
}

/// Stems of the `.json` files in a directory
async fn list_ids(dir: &Path) -> Result<Vec<String>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut ids = Vec::new();
    let mut entries = fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().and_then(|s| s.to_str()) == Some("json") {
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                ids.push(stem.to_string());
            }
        }
    }
    Ok(ids)
}

/// Atomic write via temp file and rename
async fn atomic_write(path: &Path, content: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }

    let temp_path = path.with_extension("tmp");
    fs::write(&temp_path, content).await?;
    fs::rename(&temp_path, path).await?;
    Ok(())
}
