//! Aria Player - Playback Engine
//!
//! Platform-agnostic global playback engine for Aria Player.
//!
//! This crate provides:
//! - Playlist store (replace, append, remove, reorder, clear)
//! - Sequential and shuffled navigation (Fisher-Yates)
//! - Repeat modes (None, All, One)
//! - Generation-guarded transport adapter with deferred commands
//! - Session persistence (in-memory or JSON file store)
//! - State snapshots broadcast to subscribers
//!
//! # Architecture
//!
//! `aria-playback` never decodes audio and never renders anything:
//! - The media transport is provided through the [`PlaybackPrimitive`] trait
//! - Primitives report progress as [`PrimitiveEvent`]s tagged with the
//!   [`Generation`] of the load that caused them
//! - Events from superseded loads are discarded
//!
//! The engine is single-threaded. Primitives may emit events from any thread
//! through their [`EventSender`]; the owner drains them with
//! [`PlaybackEngine::process_events`].
//!
//! # Example: Basic Playback
//!
//! ```rust
//! use aria_playback::{
//!     EngineConfig, EventSender, Generation, MemoryStore, PlaybackEngine, PlaybackPrimitive,
//!     PrimitiveEventKind, PrimitiveResult, Track,
//! };
//!
//! // A primitive that becomes ready as soon as it is asked to load
//! #[derive(Default)]
//! struct InstantPrimitive {
//!     events: Option<EventSender>,
//! }
//!
//! impl PlaybackPrimitive for InstantPrimitive {
//!     fn attach(&mut self, events: EventSender) {
//!         self.events = Some(events);
//!     }
//!
//!     fn load(&mut self, generation: Generation, _track: &Track) -> PrimitiveResult {
//!         if let Some(events) = &self.events {
//!             events.emit(generation, PrimitiveEventKind::MetadataReady { duration: 180.0 });
//!         }
//!         Ok(())
//!     }
//!
//!     fn play(&mut self) -> PrimitiveResult { Ok(()) }
//!     fn pause(&mut self) -> PrimitiveResult { Ok(()) }
//!     fn stop(&mut self) -> PrimitiveResult { Ok(()) }
//!     fn seek(&mut self, _position: f64) -> PrimitiveResult { Ok(()) }
//!     fn set_volume(&mut self, _volume: f64) -> PrimitiveResult { Ok(()) }
//!     fn set_muted(&mut self, _muted: bool) -> PrimitiveResult { Ok(()) }
//! }
//!
//! let mut engine = PlaybackEngine::new(
//!     InstantPrimitive::default(),
//!     Box::new(MemoryStore::new()),
//!     EngineConfig::default(),
//! );
//! engine.init();
//!
//! let subscription = engine.subscribe(|state| {
//!     println!("playing={} index={:?}", state.is_playing, state.current_index);
//! });
//!
//! engine.load_playlist(vec![
//!     Track::new("t1", "First Song", "Artist", "blob:t1"),
//!     Track::new("t2", "Second Song", "Artist", "blob:t2"),
//! ]);
//! engine.process_events();
//! assert!(engine.state().is_playing);
//!
//! engine.next();
//! engine.process_events();
//! assert_eq!(engine.state().current_index, Some(1));
//!
//! subscription.unsubscribe();
//! ```
//!
//! # Example: Shuffle and Repeat
//!
//! ```rust,no_run
//! # use aria_playback::{PlaybackEngine, PlaybackPrimitive, RepeatMode};
//! # fn demo<P: PlaybackPrimitive>(engine: &mut PlaybackEngine<P>) {
//! engine.toggle_shuffle();
//! engine.toggle_repeat();
//! assert_eq!(engine.state().repeat_mode, RepeatMode::All);
//! # }
//! ```

pub mod config;
mod engine;
mod error;
mod events;
mod generation;
pub mod navigation;
pub mod persistence;
pub mod playlist;
mod primitive;
pub mod repeat;
mod subscribers;
pub mod transport;
pub mod types;
mod volume;

// Public exports
pub use config::EngineConfig;
pub use engine::PlaybackEngine;
pub use error::{PersistenceError, PlaybackError, PrimitiveError, Result};
pub use events::{EventSender, PrimitiveEvent, PrimitiveEventKind};
pub use generation::{Generation, GenerationGuard};
pub use persistence::{JsonFileStore, MemoryStore, PersistedSession, StateStore};
pub use primitive::{PlaybackPrimitive, PrimitiveResult};
pub use subscribers::{SubscriberRegistry, Subscription};
pub use transport::TransportState;
pub use types::{PlayerState, RepeatMode, Track, TrackMetadata};
pub use volume::Volume;
