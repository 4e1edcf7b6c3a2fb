//! Session persistence tests
//!
//! Round-trips the durable state through both stores and checks restore
//! validation and failure tolerance.

mod common;

use aria_playback::persistence::StoreResult;
use aria_playback::{
    JsonFileStore, MemoryStore, PersistedSession, PrimitiveEventKind, RepeatMode, StateStore,
};
use common::*;
use std::cell::Cell;
use std::rc::Rc;

const KEY: &str = "aria.player-state";

fn saved_record(store: &MemoryStore) -> serde_json::Value {
    serde_json::from_str(&store.get(KEY).expect("nothing persisted")).unwrap()
}

// ===== Round Trip =====

#[test]
fn state_round_trips_into_fresh_engine() {
    let store = MemoryStore::new();
    {
        let mut engine = engine_with(FakePrimitive::new(), store.clone());
        engine.load_playlist(create_tracks(&["a", "b"]));
        engine.set_volume(0.3).unwrap();
        engine.toggle_shuffle();
        engine.toggle_repeat();
        engine.toggle_repeat();
        engine.play_track_at_index(1).unwrap();
        engine.dispose();
    }

    let engine = engine_with(FakePrimitive::new(), store);
    let state = engine.state();

    assert_eq!(state.volume, 0.3);
    assert!(state.shuffle_enabled);
    assert_eq!(state.repeat_mode, RepeatMode::One);
    assert_eq!(state.current_index, Some(1));
    assert_eq!(state.playlist.len(), 2);
    assert_eq!(state.playlist[0].id, "a");
    assert!(!state.is_playing);
    assert_eq!(engine.primitive().last_loaded(), Some("b"));
}

#[test]
fn every_mutation_is_persisted() {
    let store = MemoryStore::new();
    let mut engine = engine_with(FakePrimitive::new(), store.clone());

    engine.toggle_expanded();
    assert_eq!(saved_record(&store)["isExpanded"], true);

    engine.toggle_mute();
    assert_eq!(saved_record(&store)["isMuted"], true);

    engine.load_playlist(create_tracks(&["a"]));
    let record = saved_record(&store);
    assert_eq!(record["currentIndex"], 0);
    assert_eq!(record["playlist"][0]["sourceRef"], "blob:a");
    assert_eq!(record["repeatMode"], "none");
}

#[test]
fn saved_position_resumes_when_inside_new_duration() {
    let store = MemoryStore::new();
    {
        let mut engine = engine_with(FakePrimitive::new(), store.clone());
        engine.load_playlist(create_tracks(&["a"]));
        ready(&mut engine, 200.0);
        engine
            .primitive()
            .emit(PrimitiveEventKind::TimeUpdate { position: 75.0 });
        engine.process_events();
        engine.dispose();
    }

    let mut engine = engine_with(FakePrimitive::new(), store);
    ready(&mut engine, 200.0);

    assert_eq!(engine.state().current_time_seconds, 75.0);
    assert!(engine.primitive().calls.contains(&Call::Seek(75.0)));
    assert!(!engine.state().is_playing);
    assert_eq!(engine.primitive().play_count(), 0);
}

#[test]
fn saved_position_beyond_new_duration_is_dropped() {
    let store = MemoryStore::new();
    store.insert(
        KEY,
        r#"{"currentIndex":0,"currentTimeSeconds":300.0,
            "playlist":[{"id":"a","title":"A","artist":"X","sourceRef":"blob:a"}]}"#,
    );

    let mut engine = engine_with(FakePrimitive::new(), store);
    ready(&mut engine, 120.0);

    assert_eq!(engine.state().current_time_seconds, 0.0);
    assert!(!engine
        .primitive()
        .calls
        .iter()
        .any(|c| matches!(c, Call::Seek(_))));
}

#[test]
fn saved_position_follows_track_past_removed_duplicate() {
    let store = MemoryStore::new();
    store.insert(
        KEY,
        r#"{"currentIndex":2,"currentTimeSeconds":42.0,
            "playlist":[
              {"id":"a","title":"A","artist":"X","sourceRef":"blob:a"},
              {"id":"a","title":"A again","artist":"X","sourceRef":"blob:a2"},
              {"id":"b","title":"B","artist":"X","sourceRef":"blob:b"},
              {"id":"c","title":"C","artist":"X","sourceRef":"blob:c"}]}"#,
    );

    let mut engine = engine_with(FakePrimitive::new(), store);
    assert_eq!(engine.state().playlist.len(), 3);
    assert_eq!(engine.state().current_index, Some(1));
    assert_eq!(engine.primitive().last_loaded(), Some("b"));

    ready(&mut engine, 200.0);
    assert_eq!(engine.state().current_time_seconds, 42.0);
    assert!(engine.primitive().calls.contains(&Call::Seek(42.0)));
}

// ===== Validation & Failure Tolerance =====

#[test]
fn corrupt_record_falls_back_to_defaults() {
    let store = MemoryStore::new();
    store.insert(KEY, "{\"volume\": 0.2, \"playlist\": [");

    let engine = engine_with(FakePrimitive::new(), store);
    let state = engine.state();

    assert_eq!(state.volume, 1.0);
    assert!(state.playlist.is_empty());
    assert_eq!(state.current_index, None);
    assert!(engine.primitive().loads.is_empty());
}

#[test]
fn restored_values_are_revalidated() {
    let store = MemoryStore::new();
    store.insert(
        KEY,
        r#"{"volume":4.0,"currentIndex":9,"currentTimeSeconds":-3.0,"repeatMode":"all",
            "playlist":[
              {"id":"a","title":"A","artist":"X","sourceRef":"blob:a"},
              {"id":"a","title":"A again","artist":"X","sourceRef":"blob:a2"},
              {"id":"b","title":"B","artist":"X","sourceRef":"blob:b"}]}"#,
    );

    let engine = engine_with(FakePrimitive::new(), store);
    let state = engine.state();

    assert_eq!(state.volume, 1.0);
    assert_eq!(state.playlist.len(), 2);
    assert_eq!(state.current_index, Some(0));
    assert_eq!(state.current_time_seconds, 0.0);
    assert_eq!(state.repeat_mode, RepeatMode::All);
    assert!(state.is_visible);
}

#[test]
fn empty_record_restores_nothing() {
    let store = MemoryStore::new();
    store.insert(KEY, r#"{"currentIndex":-1,"playlist":[]}"#);

    let engine = engine_with(FakePrimitive::new(), store);
    assert_eq!(engine.state().current_index, None);
    assert!(!engine.state().is_visible);
}

#[test]
fn persisted_record_omits_transient_fields() {
    let store = MemoryStore::new();
    let mut engine = engine_with(FakePrimitive::new(), store.clone());
    engine.load_playlist(create_tracks(&["a"]));
    ready(&mut engine, 100.0);

    let record = saved_record(&store);
    let keys: Vec<&str> = record
        .as_object()
        .unwrap()
        .keys()
        .map(String::as_str)
        .collect();
    for transient in ["isPlaying", "isLoading", "isVisible", "lastError", "durationSeconds"] {
        assert!(!keys.contains(&transient), "{} should not be persisted", transient);
    }
}

/// Counts writes reaching the backing store
#[derive(Clone, Default)]
struct CountingStore {
    inner: MemoryStore,
    writes: Rc<Cell<usize>>,
}

impl StateStore for CountingStore {
    fn read(&self, key: &str) -> StoreResult<Option<String>> {
        self.inner.read(key)
    }

    fn write(&mut self, key: &str, value: &str) -> StoreResult<()> {
        self.writes.set(self.writes.get() + 1);
        self.inner.write(key, value)
    }

    fn remove(&mut self, key: &str) -> StoreResult<()> {
        self.inner.remove(key)
    }
}

#[test]
fn transient_changes_do_not_rewrite_record() {
    let store = CountingStore::default();
    let mut engine = engine_with(FakePrimitive::new(), store.clone());
    engine.load_playlist(create_tracks(&["a", "b"]));
    let after_load = store.writes.get();
    assert!(after_load > 0);

    // Ready, autoplay and duration only touch transient fields
    ready(&mut engine, 100.0);
    assert!(engine.state().is_playing);
    assert_eq!(store.writes.get(), after_load);

    engine
        .primitive()
        .emit(PrimitiveEventKind::TimeUpdate { position: 5.0 });
    engine.process_events();
    assert_eq!(store.writes.get(), after_load + 1);
    assert_eq!(saved_record(&store.inner)["currentTimeSeconds"], 5.0);
}

// ===== File Store =====

#[test]
fn file_store_survives_engine_restart() {
    let dir = tempfile::tempdir().unwrap();
    {
        let mut engine = engine_with(FakePrimitive::new(), JsonFileStore::new(dir.path()));
        engine.load_playlist(create_tracks(&["a", "b", "c"]));
        engine.next();
        engine.dispose();
    }

    assert!(dir.path().join("aria.player-state.json").exists());

    let engine = engine_with(FakePrimitive::new(), JsonFileStore::new(dir.path()));
    assert_eq!(engine.state().current_index, Some(1));
    assert_eq!(engine.state().playlist.len(), 3);
}

#[test]
fn file_store_record_is_readable_json() {
    let dir = tempfile::tempdir().unwrap();
    let mut engine = engine_with(FakePrimitive::new(), JsonFileStore::new(dir.path()));
    engine.load_playlist(create_tracks(&["a"]));

    let store = JsonFileStore::new(dir.path());
    let raw = store.read(KEY).unwrap().unwrap();
    let session: PersistedSession = serde_json::from_str(&raw).unwrap();
    assert_eq!(session.selected_index(), Some(0));
    assert_eq!(session.playlist[0].album.as_deref(), Some("Test Album"));
}

#[test]
fn unwritable_store_does_not_block_playback() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("not-a-dir");
    std::fs::write(&blocker, b"file").unwrap();

    let mut engine = engine_with(FakePrimitive::new(), JsonFileStore::new(&blocker));
    engine.load_playlist(create_tracks(&["a"]));
    ready(&mut engine, 100.0);

    assert!(engine.state().is_playing);
}
