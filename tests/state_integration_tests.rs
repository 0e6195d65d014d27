//! Integration tests for StateManager with state change events
//!
//! These tests verify that the StateManager correctly:
//! - Emits state change events on sequencing transitions
//! - Supports multiple subscribers
//! - Handles concurrent access from multiple tasks
//! - Leaves state untouched when a transition is rejected

use camino::Utf8PathBuf;
use fieldcapture::models::{CaptureControls, LabelingMode, ManualIndexEdit, SessionState};
use fieldcapture::{
    AppState, CaptureIndex, EditOutcome, Metrics, Session, StateChange, StateManager,
};
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use tokio::sync::broadcast;
use tokio::time::{Duration, timeout};

fn session(name: &str) -> Session {
    Session {
        name: name.to_string(),
        path: Utf8PathBuf::from(format!("/captures/{}", name)),
        is_empty: true,
    }
}

fn manager(mode: LabelingMode) -> StateManager {
    let state =
        SessionState::for_session(session("Site_20240101_090000"), 0, HashSet::new(), mode);
    StateManager::new(AppState::new(state, CaptureControls::default()))
}

async fn next_event(rx: &mut broadcast::Receiver<StateChange>) -> StateChange {
    timeout(Duration::from_millis(100), rx.recv())
        .await
        .expect("Timeout waiting for event")
        .expect("Channel closed")
}

#[tokio::test]
async fn test_capture_emits_index_changed() {
    let state = manager(LabelingMode::Single);
    let mut rx = state.subscribe();

    let index = state.capture_target().unwrap();
    state.capture_succeeded(&index);

    let event = next_event(&mut rx).await;
    assert_eq!(
        event,
        StateChange::IndexChanged {
            sequence: 2,
            sub_sequence: 1,
            text_label: None
        }
    );
}

#[tokio::test]
async fn test_multiple_subscribers_receive_events() {
    let state = manager(LabelingMode::Single);
    let mut rx1 = state.subscribe();
    let mut rx2 = state.subscribe();

    state.set_labeling_mode(LabelingMode::TextGroup);

    for rx in [&mut rx1, &mut rx2] {
        let event = next_event(rx).await;
        assert!(
            matches!(
                event,
                StateChange::LabelingModeChanged {
                    mode: LabelingMode::TextGroup
                }
            ),
            "Expected LabelingModeChanged, got: {:?}",
            event
        );
    }
}

#[tokio::test]
async fn test_session_switch_replaces_state_wholesale() {
    let state = manager(LabelingMode::TextGroup);
    state.set_text_label("Beam").unwrap();
    state.enter_retake("003.jpg").unwrap();
    let mut rx = state.subscribe();

    let labels: HashSet<String> = ["Deck".to_string()].into_iter().collect();
    let fresh = SessionState::for_session(
        session("Other_20240102_100000"),
        41,
        labels,
        LabelingMode::TextGroup,
    );
    state.replace_session(fresh);

    let event = next_event(&mut rx).await;
    assert!(matches!(event, StateChange::SessionChanged { .. }));

    let snapshot = state.snapshot().session;
    assert_eq!(snapshot.sequence, 42);
    assert_eq!(snapshot.text_label, None);
    assert!(snapshot.retake_target.is_none());
    assert!(snapshot.used_labels.contains("Deck"));
    assert!(!snapshot.used_labels.contains("Beam"));
}

#[tokio::test]
async fn test_retake_events() {
    let state = manager(LabelingMode::Single);
    let mut rx = state.subscribe();

    state.enter_retake("Beam-2.jpg").unwrap();
    assert_eq!(
        next_event(&mut rx).await,
        StateChange::RetakeChanged {
            target: Some(CaptureIndex::label("Beam").with_sub(2))
        }
    );

    state.cancel_retake();
    assert_eq!(
        next_event(&mut rx).await,
        StateChange::RetakeChanged { target: None }
    );
}

#[tokio::test]
async fn test_overwrite_warning_event() {
    let state = manager(LabelingMode::Single);
    let mut rx = state.subscribe();
    let edit = ManualIndexEdit {
        sequence: Some("1".to_string()),
        sub_sequence: None,
    };

    let outcome = state
        .apply_manual_edit(&edit, Some("001.jpg".to_string()))
        .unwrap();

    assert!(matches!(outcome, EditOutcome::OverwriteWarning { .. }));
    assert_eq!(
        next_event(&mut rx).await,
        StateChange::OverwriteWarning {
            filename: "001.jpg".to_string()
        }
    );
}

#[tokio::test]
async fn test_rejected_transition_emits_nothing() {
    let state = manager(LabelingMode::TextGroup);
    state.set_text_label("Beam").unwrap();
    let index = state.capture_target().unwrap();
    state.capture_succeeded(&index);
    let mut rx = state.subscribe();

    assert!(state.advance_group(Some("Beam")).is_err());
    assert!(state.advance_group(None).is_err());

    assert!(rx.try_recv().is_err());
    let snapshot = state.snapshot().session;
    assert_eq!(snapshot.text_label.as_deref(), Some("Beam"));
    assert_eq!(snapshot.sub_sequence, 2);
}

#[tokio::test]
async fn test_concurrent_state_access() {
    let state = Arc::new(manager(LabelingMode::Single));
    let mut handles = vec![];

    for _ in 0..10 {
        let state_clone = Arc::clone(&state);
        let handle = tokio::spawn(async move {
            for _ in 0..10 {
                let index = state_clone.capture_target().unwrap();
                state_clone.capture_succeeded(&index);
                state_clone.toggle_flash();
            }
        });
        handles.push(handle);
    }

    for handle in handles {
        handle.await.unwrap();
    }

    // Every capture_succeeded advanced the sequence exactly once
    assert_eq!(state.read(|s| s.session.sequence), 101);
}

#[tokio::test]
async fn test_metrics_count_updates_and_broadcasts() {
    let metrics = Arc::new(Metrics::new());
    let initial = SessionState::for_session(
        session("Site_20240101_090000"),
        0,
        HashSet::new(),
        LabelingMode::Single,
    );
    let state = StateManager::with_metrics(
        AppState::new(initial, CaptureControls::default()),
        Arc::clone(&metrics),
    );

    // No subscriber yet
    state.toggle_flash();
    let _rx = state.subscribe();
    state.toggle_camera_position();

    assert_eq!(metrics.state_updates.load(Ordering::Relaxed), 2);
    assert_eq!(metrics.state_broadcast_errors.load(Ordering::Relaxed), 1);
    assert_eq!(metrics.state_broadcasts.load(Ordering::Relaxed), 1);
}
