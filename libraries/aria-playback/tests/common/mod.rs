//! Shared fixtures for integration tests

use aria_playback::{
    EngineConfig, EventSender, Generation, MemoryStore, PlaybackEngine, PlaybackPrimitive,
    PrimitiveError, PrimitiveEventKind, PrimitiveResult, StateStore, Track,
};
use std::collections::HashSet;

/// Command received by [`FakePrimitive`]
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Load(String),
    Play,
    Pause,
    Stop,
    Seek(f64),
    Volume(f64),
    Muted(bool),
    Release(String),
}

/// Scriptable primitive
///
/// Loads stay pending until the test emits `MetadataReady` (unless
/// `auto_ready` is set). Events are sent through the real channel, so tests
/// drive them with `PlaybackEngine::process_events`.
#[derive(Debug, Default)]
pub struct FakePrimitive {
    events: Option<EventSender>,
    pub calls: Vec<Call>,
    pub loads: Vec<(Generation, String)>,
    pub failing_sources: HashSet<String>,
    pub reject_play: bool,
    pub auto_ready: Option<f64>,
}

impl FakePrimitive {
    pub fn new() -> Self {
        Self::default()
    }

    /// Primitive that reports `MetadataReady(duration)` for every load
    pub fn instant(duration: f64) -> Self {
        Self {
            auto_ready: Some(duration),
            ..Self::default()
        }
    }

    pub fn last_generation(&self) -> Generation {
        self.loads.last().map(|(g, _)| *g).expect("nothing loaded")
    }

    pub fn last_loaded(&self) -> Option<&str> {
        self.loads.last().map(|(_, id)| id.as_str())
    }

    /// Emit an event for the most recent load
    pub fn emit(&self, kind: PrimitiveEventKind) {
        self.emit_for(self.last_generation(), kind);
    }

    pub fn emit_for(&self, generation: Generation, kind: PrimitiveEventKind) {
        let events = self.events.as_ref().expect("primitive not attached");
        assert!(events.emit(generation, kind), "engine dropped");
    }

    pub fn released(&self) -> Vec<String> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                Call::Release(id) => Some(id.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn play_count(&self) -> usize {
        self.calls.iter().filter(|c| **c == Call::Play).count()
    }
}

impl PlaybackPrimitive for FakePrimitive {
    fn attach(&mut self, events: EventSender) {
        self.events = Some(events);
    }

    fn load(&mut self, generation: Generation, track: &Track) -> PrimitiveResult {
        self.calls.push(Call::Load(track.id.clone()));
        self.loads.push((generation, track.id.clone()));

        if self.failing_sources.contains(&track.source_ref) {
            return Err(PrimitiveError::Unreachable(track.source_ref.clone()));
        }
        if let Some(duration) = self.auto_ready {
            self.emit_for(generation, PrimitiveEventKind::LoadStart);
            self.emit_for(generation, PrimitiveEventKind::MetadataReady { duration });
        }
        Ok(())
    }

    fn play(&mut self) -> PrimitiveResult {
        self.calls.push(Call::Play);
        if self.reject_play {
            return Err(PrimitiveError::Rejected("autoplay blocked".to_string()));
        }
        Ok(())
    }

    fn pause(&mut self) -> PrimitiveResult {
        self.calls.push(Call::Pause);
        Ok(())
    }

    fn stop(&mut self) -> PrimitiveResult {
        self.calls.push(Call::Stop);
        Ok(())
    }

    fn seek(&mut self, position: f64) -> PrimitiveResult {
        self.calls.push(Call::Seek(position));
        Ok(())
    }

    fn set_volume(&mut self, volume: f64) -> PrimitiveResult {
        self.calls.push(Call::Volume(volume));
        Ok(())
    }

    fn set_muted(&mut self, muted: bool) -> PrimitiveResult {
        self.calls.push(Call::Muted(muted));
        Ok(())
    }

    fn release(&mut self, track: &Track) {
        self.calls.push(Call::Release(track.id.clone()));
    }
}

pub type TestEngine = PlaybackEngine<FakePrimitive>;

pub fn create_test_track(id: &str) -> Track {
    Track::new(id, format!("Track {}", id), "Test Artist", format!("blob:{}", id))
        .with_album("Test Album")
        .with_duration(180.0)
}

pub fn create_tracks(ids: &[&str]) -> Vec<Track> {
    ids.iter().map(|id| create_test_track(id)).collect()
}

pub fn test_config() -> EngineConfig {
    EngineConfig {
        shuffle_seed: Some(7),
        ..EngineConfig::default()
    }
}

pub fn engine_with(primitive: FakePrimitive, store: impl StateStore + 'static) -> TestEngine {
    let mut engine = PlaybackEngine::new(primitive, Box::new(store), test_config());
    engine.init();
    engine
}

/// Fresh engine with an empty in-memory store
pub fn engine() -> TestEngine {
    engine_with(FakePrimitive::new(), MemoryStore::new())
}

/// Complete the pending load with `duration`
pub fn ready(engine: &mut TestEngine, duration: f64) {
    engine
        .primitive()
        .emit(PrimitiveEventKind::MetadataReady { duration });
    engine.process_events();
}

/// Report the end of the current track
pub fn finish_track(engine: &mut TestEngine) {
    engine.primitive().emit(PrimitiveEventKind::Ended);
    engine.process_events();
}
