//! Continuous preview sequencer tests

mod common;

use common::{harness, run_for};
use encore_playback::{ContinuousPreview, PlayRequest, PlaybackError, SequencerConfig, Track};
use parking_lot::Mutex;
use std::sync::Arc;

fn track(id: &str, start: f64, end: f64) -> Track {
    Track::new(id, id).with_preview(start, end)
}

#[tokio::test]
async fn degenerate_window_is_skipped_at_start() {
    let h = harness(&[("A", 60.0), ("B", 60.0)]);
    let sequencer = ContinuousPreview::new(
        h.engine.clone(),
        vec![track("A", 40.0, 40.1), track("B", 10.0, 40.0)],
    );

    sequencer.start_from_index(0).await.unwrap();

    assert!(sequencer.running());
    assert_eq!(sequencer.current_index(), Some(1));
    assert_eq!(sequencer.current_id().as_deref(), Some("B"));
    assert_eq!(h.engine.current_id().as_deref(), Some("B"));
    assert_eq!(h.engine.active_preview_end(), Some(40.0));
    assert_eq!(h.engine.state().current_time, 10.0);
}

#[tokio::test]
async fn advances_through_list_and_stops_at_end() {
    let h = harness(&[("A", 10.0), ("B", 10.0), ("C", 10.0), ("D", 10.0)]);
    let sequencer = ContinuousPreview::new(
        h.engine.clone(),
        vec![
            track("A", 0.0, 0.5),
            track("B", 1.0, 1.5),
            track("C", 2.0, 2.05),
            track("D", 0.0, 0.5),
        ],
    );

    let changes = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&changes);
    sequencer.on_track_change(move |index, id| log.lock().push((index, id.to_string())));

    sequencer.start_from_index(0).await.unwrap();
    run_for(&h.engine, 3.0);

    assert_eq!(
        *changes.lock(),
        vec![(0, "A".to_string()), (1, "B".to_string()), (3, "D".to_string())]
    );
    assert!(!sequencer.running());
    assert_eq!(sequencer.current_index(), None);
    assert_eq!(sequencer.current_id(), None);
    assert!(h.engine.state().paused);
}

#[tokio::test]
async fn default_window_applies_without_bounds() {
    let h = harness(&[("A", 90.0), ("B", 4.0)]);
    let sequencer = ContinuousPreview::with_config(
        h.engine.clone(),
        vec![
            Track::new("A", "A").with_duration(90.0),
            Track::new("B", "B").with_duration(4.0),
        ],
        SequencerConfig {
            default_window_sec: 1.0,
        },
    );

    sequencer.start_from_id("A").await.unwrap();
    assert_eq!(h.engine.active_preview_end(), Some(1.0));

    run_for(&h.engine, 1.2);
    assert_eq!(sequencer.current_id().as_deref(), Some("B"));
    assert_eq!(h.engine.active_preview_end(), Some(1.0));
}

#[tokio::test]
async fn natural_end_also_advances() {
    let h = harness(&[("short", 0.4), ("next", 10.0)]);
    let sequencer = ContinuousPreview::new(
        h.engine.clone(),
        vec![
            Track::new("S", "short").with_preview(0.0, 20.0),
            Track::new("N", "next").with_preview(0.0, 5.0),
        ],
    );

    sequencer.start_from_index(0).await.unwrap();
    run_for(&h.engine, 0.6);

    assert_eq!(sequencer.current_id().as_deref(), Some("N"));
    assert!(!h.engine.state().paused);
}

#[tokio::test]
async fn all_degenerate_leaves_sequencer_idle() {
    let h = harness(&[("A", 60.0)]);
    let sequencer = ContinuousPreview::new(
        h.engine.clone(),
        vec![track("A", 5.0, 5.1), track("B", 9.0, 3.0)],
    );

    sequencer.start_from_index(0).await.unwrap();
    assert!(!sequencer.running());
    assert_eq!(sequencer.current_index(), None);
    assert!(h.engine.current_id().is_none());
}

#[tokio::test]
async fn unknown_id_is_an_error() {
    let h = harness(&[]);
    let sequencer = ContinuousPreview::new(h.engine.clone(), vec![track("A", 0.0, 5.0)]);
    let result = sequencer.start_from_id("missing").await;
    assert!(matches!(result, Err(PlaybackError::UnknownTrack(_))));
}

#[tokio::test]
async fn stop_continuous_clears_and_fades() {
    let h = harness(&[("A", 10.0), ("B", 10.0)]);
    let sequencer = ContinuousPreview::new(
        h.engine.clone(),
        vec![track("A", 0.0, 1.0), track("B", 0.0, 1.0)],
    );
    sequencer.start_from_index(0).await.unwrap();
    run_for(&h.engine, 0.3);

    sequencer.stop_continuous();
    assert!(!sequencer.running());
    assert_eq!(sequencer.current_id(), None);

    run_for(&h.engine, 2.0);
    assert!(h.engine.state().paused);
    assert_eq!(h.engine.current_id().as_deref(), Some("A"));
}

#[tokio::test]
async fn ignores_terminal_events_for_other_tracks() {
    let h = harness(&[("A", 10.0), ("B", 10.0), ("X", 10.0)]);
    let sequencer = ContinuousPreview::new(
        h.engine.clone(),
        vec![track("A", 0.0, 2.0), track("B", 0.0, 2.0)],
    );
    sequencer.start_from_index(0).await.unwrap();

    // Something else takes over the engine
    h.engine
        .play(PlayRequest::preview("X", "X", 0.0, 0.3))
        .await
        .unwrap();
    run_for(&h.engine, 0.6);

    assert_eq!(sequencer.current_id().as_deref(), Some("A"));
    assert_eq!(h.engine.current_id().as_deref(), Some("X"));
    assert!(h.engine.state().paused);
}

#[tokio::test]
async fn dropping_sequencer_detaches_listener() {
    let h = harness(&[("A", 10.0), ("B", 10.0)]);
    {
        let sequencer = ContinuousPreview::new(
            h.engine.clone(),
            vec![track("A", 0.0, 0.3), track("B", 0.0, 1.0)],
        );
        sequencer.start_from_index(0).await.unwrap();
    }
    run_for(&h.engine, 0.6);
    assert_eq!(h.engine.current_id().as_deref(), Some("A"));
}

#[tokio::test]
async fn restart_from_later_index() {
    let h = harness(&[("A", 10.0), ("B", 10.0), ("C", 10.0)]);
    let sequencer = ContinuousPreview::new(
        h.engine.clone(),
        vec![track("A", 0.0, 1.0), track("B", 0.0, 1.0), track("C", 3.0, 4.0)],
    );
    sequencer.start_from_index(0).await.unwrap();
    sequencer.start_from_index(2).await.unwrap();

    assert_eq!(sequencer.current_index(), Some(2));
    assert_eq!(h.engine.state().current_time, 3.0);
}
