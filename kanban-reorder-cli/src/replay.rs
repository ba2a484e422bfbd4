//! Pointer event scripts
//!
//! A script is a list of steps fed to a [`BoardController`] in order:
//!
//! ```yaml
//! steps:
//!   - press:
//!       subject: { type: item, id: A }
//!       bounds: { x: 0, y: 0, width: 200, height: 40 }
//!       at: { x: 10, y: 10 }
//!   - move:
//!       position: { x: 60, y: 60 }
//!   - move:
//!       position: { x: 300, y: 60 }
//!       target: { type: item, id: C }
//!   - release:
//!       position: { x: 300, y: 60 }
//! ```
//!
//! A `move` may set `input_locked: true` to simulate an overlay taking the
//! pointer. `cancel` aborts the current drag.

use crate::error::{CliError, Result};
use kanban_reorder::{
    BoardController, DragEffect, DragSubject, DropResult, InputContext, MoveOutcome, Point,
    PointerEvent, Rect,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayScript {
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Press {
        subject: DragSubject,
        #[serde(default)]
        bounds: Rect,
        at: Point,
    },
    Move {
        #[serde(flatten)]
        event: PointerEvent,
        #[serde(default)]
        input_locked: bool,
    },
    Release {
        #[serde(flatten)]
        event: PointerEvent,
    },
    Cancel,
}

impl ReplayScript {
    /// Read a script; `.json` files are JSON, anything else is YAML
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let is_json = path.extension().and_then(|e| e.to_str()) == Some("json");
        if is_json {
            serde_json::from_str(&content).map_err(|e| CliError::script(path, e))
        } else {
            serde_yaml_ng::from_str(&content).map_err(|e| CliError::script(path, e))
        }
    }
}

/// Run every step and describe what each one did.
///
/// Failed writes are reported as rollbacks rather than errors, so a script
/// always runs to the end.
pub async fn replay(controller: &mut BoardController, script: &ReplayScript) -> Result<Vec<String>> {
    let mut lines = Vec::with_capacity(script.steps.len());
    for (index, step) in script.steps.iter().enumerate() {
        let line = match step {
            Step::Press {
                subject,
                bounds,
                at,
            } => describe(&controller.pointer_down(subject.clone(), *bounds, *at)),
            Step::Move {
                event,
                input_locked,
            } => {
                let ctx = InputContext {
                    input_locked: *input_locked,
                };
                describe(&controller.pointer_move(event, ctx)?)
            }
            Step::Release { event } => match controller.pointer_up(event)? {
                DropResult::Pending(write) => {
                    let subject = write.planned().subject_id().to_string();
                    match write.persist().await {
                        MoveOutcome::Confirmed => format!("moved {}", subject),
                        MoveOutcome::RolledBack { reason, .. } => {
                            format!("rolled back {}: {}", subject, reason)
                        }
                    }
                }
                DropResult::Unchanged => "dropped in place".to_string(),
                DropResult::Cancelled(reason) => format!("cancelled ({:?})", reason),
                DropResult::Ignored(reason) => format!("ignored ({:?})", reason),
            },
            Step::Cancel => describe(&controller.cancel()),
        };
        debug!(step = index + 1, "{}", line);
        lines.push(line);
    }
    Ok(lines)
}

fn describe(effect: &DragEffect) -> String {
    match effect {
        DragEffect::Pressed => "pressed".to_string(),
        DragEffect::Activated(state) => format!("dragging {}", state.dragged.id()),
        DragEffect::HoverUpdated(state) => {
            let index = state
                .insertion_index
                .map(|i| i.to_string())
                .unwrap_or_else(|| "-".to_string());
            match &state.current_container {
                Some(list) => format!("over {} at {}", list, index),
                None => format!("at {}", index),
            }
        }
        DragEffect::Dropped(plan) => format!("dropped at {}", plan.index),
        DragEffect::Cancelled(reason) => format!("cancelled ({:?})", reason),
        DragEffect::Noop(reason) => format!("ignored ({:?})", reason),
    }
}

/// Replay a script file against the board at or above `dir`
pub async fn run_replay(dir: &Path, script: &Path) -> Result<()> {
    let script = ReplayScript::load(script)?;
    let mut controller = crate::commands::open_controller(dir).await?;
    for (index, line) in replay(&mut controller, &script).await?.iter().enumerate() {
        println!("{:>3}  {}", index + 1, line);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use kanban_reorder::{
        BoardState, Container, InMemoryGateway, Item, OptimisticStore, ReorderConfig,
    };
    use std::sync::Arc;

    const SCRIPT: &str = r#"
steps:
  - press:
      subject: { type: item, id: A }
      bounds: { x: 0, y: 0, width: 200, height: 40 }
      at: { x: 10, y: 10 }
  - move:
      position: { x: 60, y: 60 }
  - move:
      position: { x: 300, y: 60 }
      target: { type: item, id: C }
  - release:
      position: { x: 300, y: 60 }
"#;

    fn controller(gateway: Arc<InMemoryGateway>, state: BoardState) -> BoardController {
        let store = OptimisticStore::default();
        store.load(state);
        BoardController::new("b".into(), store, gateway, &ReorderConfig::default())
    }

    fn board() -> BoardState {
        BoardState::new("b")
            .with_container(Container::new("L1", "b", 1.0))
            .with_container(Container::new("L2", "b", 3.0))
            .with_item(Item::new("A", "L1", 1.0))
            .with_item(Item::new("B", "L1", 2.0))
            .with_item(Item::new("C", "L2", 1.0))
    }

    #[tokio::test]
    async fn test_replay_yaml_script() {
        let script: ReplayScript = serde_yaml_ng::from_str(SCRIPT).unwrap();
        let gateway = Arc::new(InMemoryGateway::from_board(&board()));
        let mut controller = controller(gateway.clone(), board());

        let lines = replay(&mut controller, &script).await.unwrap();
        assert_eq!(
            lines,
            vec!["pressed", "dragging A", "over L2 at 0", "moved A"]
        );
        assert_eq!(gateway.write_count(), 1);
    }

    #[tokio::test]
    async fn test_replay_reports_rollback() {
        let script: ReplayScript = serde_yaml_ng::from_str(SCRIPT).unwrap();
        let gateway = Arc::new(InMemoryGateway::from_board(&board()));
        gateway.fail_next_writes(1);
        let mut controller = controller(gateway, board());

        let lines = replay(&mut controller, &script).await.unwrap();
        assert!(lines[3].starts_with("rolled back A"));
        assert_eq!(controller.store().snapshot(&"b".into()), Some(board()));
    }

    #[tokio::test]
    async fn test_replay_locked_input_and_cancel() {
        let script = ReplayScript {
            steps: vec![
                Step::Press {
                    subject: DragSubject::Item("A".into()),
                    bounds: Rect::default(),
                    at: Point::new(0.0, 0.0),
                },
                Step::Move {
                    event: PointerEvent::at(Point::new(40.0, 0.0)),
                    input_locked: true,
                },
                Step::Cancel,
            ],
        };
        let gateway = Arc::new(InMemoryGateway::from_board(&board()));
        let mut controller = controller(gateway, board());

        let lines = replay(&mut controller, &script).await.unwrap();
        assert_eq!(
            lines,
            vec!["pressed", "cancelled (InputLocked)", "ignored (IdleWithoutActiveDrag)"]
        );
    }

    #[test]
    fn test_load_json_script() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("script.json");
        std::fs::write(
            &path,
            r#"{"steps": ["cancel", {"release": {"position": {"x": 1, "y": 2}}}]}"#,
        )
        .unwrap();

        let script = ReplayScript::load(&path).unwrap();
        assert_eq!(script.steps[0], Step::Cancel);
        assert!(matches!(script.steps[1], Step::Release { .. }));
    }

    #[test]
    fn test_load_rejects_bad_script() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("script.yaml");
        std::fs::write(&path, "steps: [jump]").unwrap();
        assert!(matches!(
            ReplayScript::load(&path),
            Err(CliError::Script { .. })
        ));
    }
}
