//! Concurrency integration tests
//!
//! Controller threads racing the dispatch loop: pause/resume position,
//! stop during a delay and repeated play/stop cycles.

use crate::helpers::tolerances::NOTIFY_TIMEOUT_MS;
use crate::helpers::*;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tactus::midi::cc;
use tactus::prelude::*;

/// Pause holds the cursor; play resumes from it rather than from 0.
#[test]
fn test_pause_resume_keeps_position() {
    init_tracing();
    let score = note_run(30, 24); // 25 ms apart
    let expected: Vec<Event> = score.events().iter().map(|e| e.event.clone()).collect();
    let (player, sink) = recording_player(score);
    let notifications = player.subscribe();

    player.play().unwrap();
    assert!(wait_until(NOTIFY_TIMEOUT_MS, || sink.score_event_count() >= 5));

    player.pause();
    assert!(wait_for_state(&player, PlaybackState::Paused, NOTIFY_TIMEOUT_MS));
    let paused_at = player.position();
    let dispatched = sink.score_event_count();
    assert!(paused_at > 0);
    assert_eq!(paused_at, dispatched);

    // Pause mutes immediately
    assert!(sink.broadcast_count(cc::ALL_SOUND_OFF) >= 16);

    thread::sleep(Duration::from_millis(100));
    assert_eq!(player.position(), paused_at);
    assert_eq!(sink.score_event_count(), dispatched);
    assert_eq!(player.state(), PlaybackState::Paused);

    player.play().unwrap();
    assert!(matches!(
        notifications.recv_timeout(notify_timeout()),
        Ok(PlayerNotification::Finished(summary)) if summary.events_dispatched == 30
    ));
    player.wait();

    // Nothing replayed, nothing skipped
    assert_eq!(sink.score_events(), expected);
}

/// Stop while paused ends the pass without Finished.
#[test]
fn test_stop_while_paused() {
    let (player, sink) = recording_player(note_run(30, 24));
    let notifications = player.subscribe();

    player.play().unwrap();
    assert!(wait_until(NOTIFY_TIMEOUT_MS, || sink.score_event_count() >= 2));
    player.pause();
    assert!(wait_for_state(&player, PlaybackState::Paused, NOTIFY_TIMEOUT_MS));

    player.stop();
    assert_eq!(
        notifications.recv_timeout(notify_timeout()),
        Ok(PlayerNotification::Stopped)
    );
    player.wait();
    assert_eq!(player.state(), PlaybackState::Stopped);
    assert_eq!(player.position(), 0);
}

/// Stop during a long delay returns promptly and skips the pending event.
#[test]
fn test_stop_interrupts_delay() {
    init_tracing();
    // Second event is ten seconds out
    let (player, sink) = recording_player(note_run(2, 9_600));
    let notifications = player.subscribe();

    player.play().unwrap();
    assert!(wait_until(NOTIFY_TIMEOUT_MS, || sink.score_event_count() == 1));
    thread::sleep(Duration::from_millis(20));

    let requested = Instant::now();
    player.stop();
    assert_eq!(
        notifications.recv_timeout(notify_timeout()),
        Ok(PlayerNotification::Stopped)
    );
    assert!(requested.elapsed() < Duration::from_secs(1));
    player.wait();

    assert_eq!(player.state(), PlaybackState::Stopped);
    assert_eq!(player.position(), 0);
    assert_eq!(sink.score_event_count(), 1);
}

/// With uninterruptible delays, stop lands at the next event boundary.
#[test]
fn test_stop_waits_for_delay_when_uninterruptible() {
    let sink = RecordingSink::new();
    let player = AsyncPlayer::builder()
        .score(note_run(3, 192)) // 200 ms apart
        .interruptible_delays(false)
        .sink(sink.clone())
        .build()
        .unwrap();
    let notifications = player.subscribe();

    player.play().unwrap();
    assert!(wait_until(NOTIFY_TIMEOUT_MS, || sink.score_event_count() == 1));

    player.stop();
    assert_eq!(
        notifications.recv_timeout(notify_timeout()),
        Ok(PlayerNotification::Stopped)
    );
    player.wait();

    // The pending event is dispatched once its delay elapses, then the loop stops
    assert_eq!(sink.score_event_count(), 2);
}

/// Repeated play/pause/stop cycles always settle in Stopped at cursor 0.
#[test]
fn test_play_stop_stress() {
    let (player, _sink) = recording_player(note_run(50, 4));

    for cycle in 0..50 {
        player.play().unwrap();
        if cycle % 3 == 0 {
            thread::sleep(Duration::from_millis(2));
        }
        if cycle % 5 == 0 {
            player.pause();
        }
        player.stop();
        player.wait();

        assert_eq!(player.state(), PlaybackState::Stopped, "cycle {cycle}");
        assert_eq!(player.position(), 0, "cycle {cycle}");
        assert!(!player.engine().is_running(), "cycle {cycle}");
    }
}

/// Several controller threads hammering the same player leave it consistent.
#[test]
fn test_concurrent_controllers() {
    let (player, sink) = recording_player(note_run(200, 4));
    let player = Arc::new(player);

    let controllers: Vec<_> = (0..4)
        .map(|id| {
            let player = player.clone();
            thread::spawn(move || {
                for i in 0..25 {
                    match (id + i) % 3 {
                        0 => player.play().unwrap(),
                        1 => player.pause(),
                        _ => {
                            let _ = player.set_tempo_ratio(1.0 + (i % 4) as f64);
                        }
                    }
                    let _ = player.state();
                    let _ = player.position();
                    thread::sleep(Duration::from_millis(1));
                }
            })
        })
        .collect();

    for controller in controllers {
        controller.join().unwrap();
    }

    player.stop();
    player.wait();

    assert_eq!(player.state(), PlaybackState::Stopped);
    assert_eq!(player.position(), 0);

    // Events were dispatched in score order, possibly across several passes
    let notes: Vec<u8> = sink
        .score_events()
        .iter()
        .filter_map(|e| match e.as_channel()?.message {
            tactus::ChannelVoice::NoteOn { note, .. } => Some(note),
            _ => None,
        })
        .collect();
    for pair in notes.windows(2) {
        let next_in_score = pair[1] == 40 + ((pair[0] - 40 + 1) % 80);
        let restarted = pair[1] == 40;
        assert!(next_in_score || restarted, "out of order: {pair:?}");
    }
}
