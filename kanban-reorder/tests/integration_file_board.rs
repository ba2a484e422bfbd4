//! Integration tests for a file-backed board and remote change signals

use kanban_reorder::{
    BoardController, BroadcastRealtime, ChangeCause, FileGateway, HoverTarget, InMemoryGateway,
    Item, MoveOutcome, OptimisticStore, PersistenceGateway, Reconciler, ReorderConfig,
    ReorderError,
};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

async fn file_board() -> (TempDir, Arc<FileGateway>, BoardController) {
    let temp = TempDir::new().unwrap();
    let gateway = Arc::new(FileGateway::new(temp.path().join(".kanban")));
    let board = gateway.init_board("Roadmap").await.unwrap();

    let todo = gateway.add_list(Some("todo".into())).await.unwrap();
    gateway.add_list(Some("done".into())).await.unwrap();
    for card in ["a", "b", "c"] {
        gateway.add_card(&todo.id, Some(card.into())).await.unwrap();
    }

    let controller = BoardController::new(
        board.id,
        OptimisticStore::default(),
        gateway.clone(),
        &ReorderConfig::default(),
    );
    controller.load().await.unwrap();
    (temp, gateway, controller)
}

#[tokio::test]
async fn test_moves_survive_reload() {
    let (_temp, gateway, mut controller) = file_board().await;

    let write = controller
        .move_card(&"c".into(), &HoverTarget::Item("a".into()))
        .unwrap()
        .pending()
        .unwrap();
    assert_eq!(write.persist().await, MoveOutcome::Confirmed);

    let write = controller
        .move_card(&"a".into(), &HoverTarget::Container("done".into()))
        .unwrap()
        .pending()
        .unwrap();
    assert_eq!(write.persist().await, MoveOutcome::Confirmed);

    let on_disk = gateway.read_board_state().await.unwrap();
    assert_eq!(
        controller.store().snapshot(controller.board_id()),
        Some(on_disk.clone())
    );
    let todo: Vec<_> = on_disk
        .items(&"todo".into())
        .iter()
        .map(|i| i.id.as_str())
        .collect();
    assert_eq!(todo, vec!["c", "b"]);
    assert_eq!(on_disk.items(&"done".into())[0].id.as_str(), "a");
}

#[tokio::test]
async fn test_busy_lock_rolls_back() {
    let (_temp, gateway, mut controller) = file_board().await;
    let before = controller.store().snapshot(controller.board_id()).unwrap();

    let _held = gateway.lock().await.unwrap();
    let write = controller
        .move_list(&"done".into(), Some(&"todo".into()))
        .unwrap()
        .pending()
        .unwrap();
    let outcome = write.persist().await;

    let MoveOutcome::RolledBack { reason, transient } = outcome else {
        panic!("expected a rollback, got {outcome:?}");
    };
    assert!(transient);
    assert_eq!(reason, ReorderError::LockBusy.to_string());
    assert_eq!(
        controller.store().snapshot(controller.board_id()),
        Some(before)
    );
}

#[tokio::test]
async fn test_rebalance_after_repeated_inserts() {
    let (_temp, gateway, mut controller) = file_board().await;

    // keep dropping the last card between the first two
    let mut exhausted = false;
    for _ in 0..60 {
        let last = controller
            .store()
            .with_board(controller.board_id(), |b| {
                b.items(&"todo".into()).last().map(|i| i.id.clone())
            })
            .flatten()
            .unwrap();
        let second = controller
            .store()
            .with_board(controller.board_id(), |b| b.items(&"todo".into())[1].id.clone())
            .unwrap();
        let write = controller
            .move_card(&last, &HoverTarget::Item(second))
            .unwrap()
            .pending()
            .unwrap();
        exhausted |= write.precision_exhausted();
        assert_eq!(write.persist().await, MoveOutcome::Confirmed);
        if exhausted {
            break;
        }
    }
    assert!(exhausted);

    controller
        .rebalancer()
        .rebalance_container(&"todo".into())
        .await
        .unwrap();
    let on_disk = gateway.read_board_state().await.unwrap();
    let positions: Vec<f64> = on_disk
        .items(&"todo".into())
        .iter()
        .map(|i| i.position)
        .collect();
    assert_eq!(positions, vec![1.0, 3.0, 5.0]);
    assert!(on_disk.is_strictly_ordered());
}

#[tokio::test]
async fn test_remote_change_signal_reconciles() {
    let hub = BroadcastRealtime::default();
    let seed = kanban_reorder::BoardState::new("b")
        .with_container(kanban_reorder::Container::new("l", "b", 1.0))
        .with_item(Item::new("x", "l", 1.0))
        .with_item(Item::new("y", "l", 3.0));
    let gateway = Arc::new(InMemoryGateway::from_board(&seed).with_realtime(hub.clone()));
    let store = OptimisticStore::default();
    store.load(seed);

    let mut events = store.subscribe();
    let listener = Reconciler::new(store.clone(), gateway.clone()).spawn(&hub, "b".into());

    // another client moves y to the top
    gateway
        .move_item(&"y".into(), &"l".into(), 0.0)
        .await
        .unwrap();

    let reconciled = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let event = events.recv().await.unwrap();
            if event.cause == ChangeCause::Reconciled
                && store.with_board(&"b".into(), |s| s.items(&"l".into())[0].id.to_string())
                    == Some("y".to_string())
            {
                break;
            }
        }
    })
    .await;
    assert!(reconciled.is_ok());

    hub.close(&"b".into());
    listener.await.unwrap();
}
