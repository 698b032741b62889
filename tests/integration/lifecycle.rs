//! Player lifecycle integration tests
//!
//! State machine transitions, idempotent control and restart semantics.

use crate::helpers::tolerances::NOTIFY_TIMEOUT_MS;
use crate::helpers::*;
use std::time::Duration;
use tactus::midi::cc;
use tactus::prelude::*;

/// An empty score finishes straight away, exactly once.
#[test]
fn test_empty_score_finishes_once() {
    init_tracing();
    let (player, sink) = recording_player(Score::empty(TEST_RESOLUTION));
    let notifications = player.subscribe();

    player.play().unwrap();

    assert!(matches!(
        notifications.recv_timeout(notify_timeout()),
        Ok(PlayerNotification::Finished(PassSummary {
            play_delta_time: 0,
            events_dispatched: 0,
        }))
    ));
    player.wait();

    assert_eq!(player.state(), PlaybackState::Stopped);
    assert!(notifications
        .recv_timeout(Duration::from_millis(100))
        .is_err());

    // Reset on entry, mute on exit, nothing in between
    assert_eq!(sink.broadcast_count(cc::RESET_ALL_CONTROLLERS), 16);
    assert_eq!(sink.broadcast_count(cc::ALL_SOUND_OFF), 16);
    assert_eq!(sink.score_event_count(), 0);
}

/// Stop on a stopped player changes nothing.
#[test]
fn test_stop_when_stopped_is_noop() {
    let (player, sink) = recording_player(note_run(4, 48));
    let notifications = player.subscribe();

    player.stop();
    player.stop();

    assert_eq!(player.state(), PlaybackState::Stopped);
    assert_eq!(player.position(), 0);
    assert!(sink.events().is_empty());
    assert!(notifications
        .recv_timeout(Duration::from_millis(50))
        .is_err());
}

/// Pause on a stopped player has no observable effect.
#[test]
fn test_pause_when_stopped_is_noop() {
    let (player, sink) = recording_player(note_run(4, 48));

    player.pause();
    std::thread::sleep(Duration::from_millis(20));

    assert_eq!(player.state(), PlaybackState::Stopped);
    assert!(sink.events().is_empty());
}

/// Stopping mid-pass and playing again restarts from the first event and
/// replays the same order.
#[test]
fn test_restart_replays_from_the_top() {
    init_tracing();
    let score = note_run(20, 48); // 50 ms apart at the default tempo
    let expected = score
        .events()
        .iter()
        .map(|e| e.event.clone())
        .collect::<Vec<_>>();

    let (player, sink) = recording_player(score);
    let notifications = player.subscribe();

    player.play().unwrap();
    assert!(wait_until(NOTIFY_TIMEOUT_MS, || sink.score_event_count() >= 3));
    player.stop();

    assert_eq!(
        notifications.recv_timeout(notify_timeout()),
        Ok(PlayerNotification::Stopped)
    );
    player.wait();
    assert_eq!(player.state(), PlaybackState::Stopped);
    assert_eq!(player.position(), 0);

    let first_pass = sink.score_events();
    assert!(first_pass.len() < expected.len());
    assert_eq!(first_pass[..], expected[..first_pass.len()]);

    sink.clear();
    player.play().unwrap();
    assert!(matches!(
        notifications.recv_timeout(notify_timeout()),
        Ok(PlayerNotification::Finished(_))
    ));
    player.wait();

    assert_eq!(sink.score_events(), expected);
}

/// A finished player can be played again.
#[test]
fn test_replay_after_finish() {
    let (player, sink) = recording_player(note_run(3, 24));
    let notifications = player.subscribe();

    for _ in 0..2 {
        player.play().unwrap();
        assert!(matches!(
            notifications.recv_timeout(notify_timeout()),
            Ok(PlayerNotification::Finished(summary)) if summary.events_dispatched == 3
        ));
        player.wait();
    }

    assert_eq!(sink.score_event_count(), 6);
    assert_eq!(player.state(), PlaybackState::Stopped);
}

/// Building without a score is an invalid-argument error.
#[test]
fn test_builder_requires_score() {
    let result = AsyncPlayer::builder().build();
    assert!(matches!(
        result,
        Err(Error::Core(tactus::core::Error::InvalidArgument(_)))
    ));
}

/// Dropping a playing player stops the loop without blocking.
#[test]
fn test_drop_requests_stop() {
    let (player, sink) = recording_player(note_run(2, 48_000));
    let engine = player.engine().clone();

    player.play().unwrap();
    assert!(wait_until(NOTIFY_TIMEOUT_MS, || sink.score_event_count() == 1));
    drop(player);

    assert!(wait_until(NOTIFY_TIMEOUT_MS, || {
        engine.state() == PlaybackState::Stopped && !engine.is_running()
    }));
    assert_eq!(sink.score_event_count(), 1);
}
