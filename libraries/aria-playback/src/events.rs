//! Primitive lifecycle events
//!
//! Events are emitted by a [`PlaybackPrimitive`](crate::PlaybackPrimitive)
//! and routed back to the engine:
//! - Load progress (start, metadata ready)
//! - Position updates (periodic)
//! - End of track and transport errors
//! - Play state and volume changes made by the platform

use crate::generation::Generation;
use crossbeam_channel::{Receiver, Sender};
use serde::{Deserialize, Serialize};

/// Event emitted by the playback primitive, tagged with its load generation
#[derive(Debug, Clone, PartialEq)]
pub struct PrimitiveEvent {
    pub generation: Generation,
    pub kind: PrimitiveEventKind,
}

impl PrimitiveEvent {
    pub fn new(generation: Generation, kind: PrimitiveEventKind) -> Self {
        Self { generation, kind }
    }
}

/// What happened on the transport
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PrimitiveEventKind {
    /// Transport started fetching the source
    LoadStart,

    /// Duration is known and the transport can play
    MetadataReady {
        /// Track duration in seconds
        duration: f64,
    },

    /// Position update (periodic while playing)
    TimeUpdate {
        /// Current position in seconds
        position: f64,
    },

    /// Track reached its end
    Ended,

    /// Transport failure
    Error {
        /// Platform-supplied reason
        reason: String,
    },

    /// Transport started or stopped producing audio
    PlayStateChanged { playing: bool },

    /// Volume changed on the platform side
    VolumeChanged { volume: f64, muted: bool },
}

/// Handle a primitive uses to report events back to the engine
///
/// Cheap to clone and safe to move to another thread.
#[derive(Debug, Clone)]
pub struct EventSender {
    tx: Sender<PrimitiveEvent>,
}

impl EventSender {
    /// Send an event; returns `false` once the engine is gone
    pub fn emit(&self, generation: Generation, kind: PrimitiveEventKind) -> bool {
        self.tx.send(PrimitiveEvent::new(generation, kind)).is_ok()
    }
}

/// Create the channel pair linking a primitive to the engine
pub(crate) fn event_channel() -> (EventSender, Receiver<PrimitiveEvent>) {
    let (tx, rx) = crossbeam_channel::unbounded();
    (EventSender { tx }, rx)
}
