//! Integration tests for the transport controller
//!
//! Covers voice ownership across play/stop, zero sentinels with nothing
//! playing, forwarding queries and setup-time failures.

mod common;

use chiptune_stream::{PlayerConfig, PlayerError, TickOutcome};
use common::{player, record_events, Read, ScriptedEngine};
use std::io::Write;

#[test]
fn test_back_to_back_play_releases_first_voice() {
    let engine = ScriptedEngine::default();
    let mut player = player(&engine, PlayerConfig::default());

    player.play(b"MOD-a").unwrap();
    player.play(b"MOD-b").unwrap();

    let journal = engine.journal.lock();
    assert_eq!(
        journal.entries,
        vec!["create MOD-a", "repeat 0", "destroy MOD-a", "create MOD-b", "repeat 0"]
    );
    assert_eq!(journal.max_live, 1);
    assert_eq!(journal.live, 1);
}

#[test]
fn test_stop_without_voice_is_noop() {
    let engine = ScriptedEngine::default();
    let mut player = player(&engine, PlayerConfig::default());
    let events = record_events(&mut player);

    player.stop();
    player.stop();

    assert!(events.lock().is_empty());
    assert!(engine.journal.lock().entries.is_empty());
    assert!(!player.is_playing());
}

#[test]
fn test_stop_after_natural_end_does_not_release_twice() {
    let engine = ScriptedEngine::new(vec![Read::Frames(0)]);
    let mut player = player(&engine, PlayerConfig::default());
    player.play(b"MOD-empty").unwrap();

    let (mut left, mut right) = (vec![0.0; 256], vec![0.0; 256]);
    assert_eq!(
        player.render(&mut left, &mut right),
        TickOutcome::Ended { frames: 0 }
    );
    player.stop();
    player.stop();

    assert_eq!(engine.journal.lock().count("destroy"), 1);
}

#[test]
fn test_stop_silences_following_ticks() {
    let engine = ScriptedEngine::default();
    let mut player = player(&engine, PlayerConfig::default());
    let events = record_events(&mut player);
    player.play(b"MOD-a").unwrap();

    let (mut left, mut right) = (vec![0.0; 256], vec![0.0; 256]);
    player.render(&mut left, &mut right);
    player.stop();
    events.lock().clear();

    assert_eq!(player.render(&mut left, &mut right), TickOutcome::Disconnected);
    assert!(left.iter().chain(&right).all(|&s| s == 0.0));
    assert!(events.lock().is_empty());
    assert_eq!(engine.journal.lock().reads(), vec![256]);
}

#[test]
fn test_zero_sentinels_without_voice() {
    let engine = ScriptedEngine::default();
    let mut player = player(&engine, PlayerConfig::default());

    assert_eq!(player.position(), 0.0);
    assert_eq!(player.duration(), 0.0);
    assert_eq!(player.pattern(), 0);
    assert_eq!(player.row(), 0);
    assert_eq!(player.num_patterns(), 0);
    assert_eq!(player.pattern_num_rows(0), 0);
    assert_eq!(player.pattern_row_channel(0, 0, 0), "");
    assert_eq!(player.channel_count(), 0);

    player.seek(12.0);
    player.repeat(-1);
    player.toggle_pause();
    assert!(engine.journal.lock().entries.is_empty());
}

#[test]
fn test_queries_forward_to_active_decoder() {
    let engine = ScriptedEngine::default();
    let mut player = player(&engine, PlayerConfig::default().with_repeat_count(2));
    player.play(b"MOD-query").unwrap();

    assert_eq!(player.duration(), 64.0);
    assert_eq!(player.num_patterns(), 16);
    assert_eq!(player.pattern_num_rows(3), 4);
    assert_eq!(player.pattern_num_rows(99), 0);
    assert_eq!(player.channel_count(), 8);
    // Pattern cells are formatted unpadded-width, padded
    assert_eq!(player.pattern_row_channel(1, 2, 3), "1.2.3 w0 true");

    player.seek(1.0);
    approx::assert_relative_eq!(player.position(), 1.0, epsilon = 1e-4);

    player.repeat(-1);
    let journal = engine.journal.lock();
    assert!(journal.entries.contains(&"repeat 2".to_string()));
    assert!(journal.entries.contains(&"repeat -1".to_string()));
}

#[test]
fn test_metadata_of_active_module() {
    let engine = ScriptedEngine::default();
    let mut player = player(&engine, PlayerConfig::default());
    assert!(player.metadata().is_empty());

    player.play(b"MOD-meta").unwrap();
    let metadata = player.metadata();
    assert_eq!(metadata.title(), "MOD-meta");
    assert_eq!(metadata.format(), "it");
    assert_eq!(metadata.tracker(), "Impulse Tracker 2.14");
    assert_eq!(metadata.artist(), "");
    assert_eq!(metadata.len(), 5);
}

#[test]
fn test_rejected_module_leaves_no_voice() {
    let engine = ScriptedEngine::default();
    let mut player = player(&engine, PlayerConfig::default());
    player.play(b"MOD-a").unwrap();

    let err = player.play(b"garbage").unwrap_err();
    assert!(matches!(err, PlayerError::DecoderInit(_)));
    assert!(!player.is_playing());

    let err = player.play(b"").unwrap_err();
    assert!(matches!(err, PlayerError::DecoderInit(_)));

    let journal = engine.journal.lock();
    assert_eq!(journal.live, 0);
    assert_eq!(journal.count("create"), 1);
}

#[test]
fn test_play_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(b"MOD-from-disk").unwrap();

    let engine = ScriptedEngine::default();
    let mut player = player(&engine, PlayerConfig::default());
    player.play_file(file.path()).unwrap();
    assert_eq!(player.metadata().title(), "MOD-from-disk");

    let err = player.play_file("/no/such/module.it").unwrap_err();
    assert!(matches!(err, PlayerError::Acquisition { .. }));
    // The acquisition failure happens before the active voice is touched
    assert!(player.is_playing());
}

#[test]
fn test_play_while_paused_starts_unpaused() {
    let engine = ScriptedEngine::default();
    let mut player = player(&engine, PlayerConfig::default());
    player.play(b"MOD-a").unwrap();
    player.pause();
    assert!(player.is_paused());

    player.play(b"MOD-b").unwrap();
    assert!(!player.is_paused());
}

#[test]
fn test_clear_handlers_stops_notifications() {
    let engine = ScriptedEngine::default();
    let mut player = player(&engine, PlayerConfig::default());
    let events = record_events(&mut player);
    player.clear_handlers();
    player.play(b"MOD-a").unwrap();

    let (mut left, mut right) = (vec![0.0; 256], vec![0.0; 256]);
    player.render(&mut left, &mut right);
    assert!(events.lock().is_empty());
}
