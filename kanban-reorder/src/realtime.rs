//! Push-based invalidation from other clients
//!
//! A change signal only says "this board changed". The payload is never
//! applied directly; the [`Reconciler`] answers every signal by refetching
//! from the gateway and reconciling the store.

use crate::error::Result;
use crate::gateway::PersistenceGateway;
use crate::store::OptimisticStore;
use crate::types::BoardId;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

/// Something on a board changed remotely
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardChanged {
    pub board_id: BoardId,
}

/// Subscription side of the push channel
pub trait RealtimeSync: Send + Sync {
    fn on_board_changed(&self, board: &BoardId) -> broadcast::Receiver<BoardChanged>;
}

/// In-process hub, one broadcast channel per board
#[derive(Debug, Clone)]
pub struct BroadcastRealtime {
    channels: Arc<DashMap<BoardId, broadcast::Sender<BoardChanged>>>,
    buffer: usize,
}

impl Default for BroadcastRealtime {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_EVENT_BUFFER)
    }
}

impl BroadcastRealtime {
    pub fn new(buffer: usize) -> Self {
        Self {
            channels: Arc::new(DashMap::new()),
            buffer: buffer.max(1),
        }
    }

    /// Signal a change on `board`. Returns how many subscribers were reached.
    pub fn publish(&self, board: &BoardId) -> usize {
        let Some(sender) = self.channels.get(board) else {
            trace!(board = %board, "change signal with no listeners");
            return 0;
        };
        sender
            .send(BoardChanged {
                board_id: board.clone(),
            })
            .unwrap_or(0)
    }

    pub fn subscriber_count(&self, board: &BoardId) -> usize {
        self.channels
            .get(board)
            .map(|s| s.receiver_count())
            .unwrap_or(0)
    }

    /// Drop a board's channel, closing every receiver
    pub fn close(&self, board: &BoardId) {
        self.channels.remove(board);
    }
}

impl RealtimeSync for BroadcastRealtime {
    fn on_board_changed(&self, board: &BoardId) -> broadcast::Receiver<BoardChanged> {
        self.channels
            .entry(board.clone())
            .or_insert_with(|| broadcast::channel(self.buffer).0)
            .subscribe()
    }
}

/// Refetches boards from the gateway and reconciles them into the store
#[derive(Clone)]
pub struct Reconciler {
    store: OptimisticStore,
    gateway: Arc<dyn PersistenceGateway>,
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}

impl Reconciler {
    pub fn new(store: OptimisticStore, gateway: Arc<dyn PersistenceGateway>) -> Self {
        Self { store, gateway }
    }

    /// Fetch a board's lists, then each list's cards, and reconcile them in
    /// one store mutation.
    ///
    /// A board the store has never seen is installed wholesale.
    pub async fn refresh_board(&self, board: &BoardId) -> Result<()> {
        let fetched = self.gateway.fetch_board(board).await?;

        if !self.store.contains(board) {
            self.store.load(fetched);
            return Ok(());
        }

        self.store.reconcile_board(fetched)?;
        debug!(board = %board, "board refreshed from remote");
        Ok(())
    }

    /// Listen for change signals on `board` until the channel closes.
    ///
    /// Signals that queue up while a refresh is running are folded into the
    /// next refresh. A lagged receiver counts as a change.
    pub fn spawn(self, realtime: &dyn RealtimeSync, board: BoardId) -> JoinHandle<()> {
        let mut rx = realtime.on_board_changed(&board);
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(_) => {}
                    Err(RecvError::Lagged(skipped)) => {
                        debug!(board = %board, skipped, "change listener lagged");
                    }
                    Err(RecvError::Closed) => break,
                }

                let closed = drain(&mut rx);
                if let Err(e) = self.refresh_board(&board).await {
                    warn!(board = %board, error = %e, "refresh after remote change failed");
                }
                if closed {
                    break;
                }
            }
            debug!(board = %board, "change listener stopped");
        })
    }
}

/// Discard queued signals. Returns true when the channel has closed.
fn drain(rx: &mut broadcast::Receiver<BoardChanged>) -> bool {
    loop {
        match rx.try_recv() {
            Ok(_) | Err(TryRecvError::Lagged(_)) => continue,
            Err(TryRecvError::Empty) => return false,
            Err(TryRecvError::Closed) => return true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::InMemoryGateway;
    use crate::types::{BoardState, Container, Item};

    fn remote() -> BoardState {
        BoardState::new("b1")
            .with_container(Container::new("l1", "b1", 1.0))
            .with_item(Item::new("a", "l1", 1.0))
            .with_item(Item::new("b", "l1", 3.0))
    }

    #[test]
    fn test_publish_without_listeners() {
        let hub = BroadcastRealtime::new(4);
        assert_eq!(hub.publish(&"b1".into()), 0);
        let _rx = hub.on_board_changed(&"b1".into());
        assert_eq!(hub.subscriber_count(&"b1".into()), 1);
        assert_eq!(hub.publish(&"b1".into()), 1);
    }

    #[tokio::test]
    async fn test_refresh_installs_missing_board() {
        let store = OptimisticStore::default();
        let gateway = Arc::new(InMemoryGateway::from_board(&remote()));
        let reconciler = Reconciler::new(store.clone(), gateway);

        reconciler.refresh_board(&"b1".into()).await.unwrap();
        assert_eq!(store.snapshot(&"b1".into()), Some(remote()));
    }

    #[tokio::test]
    async fn test_refresh_overwrites_local_changes() {
        let store = OptimisticStore::default();
        store.load(remote());
        store
            .apply_move(&"b1".into(), &"a".into(), &"l1".into(), 9.0)
            .unwrap();

        let gateway = Arc::new(InMemoryGateway::from_board(&remote()));
        Reconciler::new(store.clone(), gateway)
            .refresh_board(&"b1".into())
            .await
            .unwrap();
        assert_eq!(store.snapshot(&"b1".into()), Some(remote()));
    }

    #[tokio::test]
    async fn test_spawned_listener_reconciles() {
        let hub = BroadcastRealtime::new(8);
        let store = OptimisticStore::default();
        store.load(remote());
        let gateway = Arc::new(InMemoryGateway::from_board(&remote()).with_realtime(hub.clone()));

        let mut events = store.subscribe();
        let handle = Reconciler::new(store.clone(), gateway.clone()).spawn(&hub, "b1".into());

        // another client moves b to the top
        gateway.put_item(Item::new("b", "l1", 0.0)).await;

        loop {
            let event = events.recv().await.unwrap();
            if event.cause == crate::store::ChangeCause::Reconciled
                && store.with_board(&"b1".into(), |s| s.items(&"l1".into())[0].id.as_str() == "b")
                    == Some(true)
            {
                break;
            }
        }

        hub.close(&"b1".into());
        handle.await.unwrap();
    }
}
