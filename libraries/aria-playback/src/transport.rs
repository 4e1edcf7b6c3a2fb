//! Playback primitive adapter
//!
//! Owns the single [`PlaybackPrimitive`] and layers the transport state
//! machine on top of it:
//!
//! ```text
//! Idle → Loading → Ready → Playing ⇄ Paused → Ended
//!           │        │        │
//!           └────────┴────────┴──→ Error
//! ```
//!
//! Commands issued while `Loading` are parked and replayed (seek first, then
//! play/pause) when the primitive reports `MetadataReady` for the active
//! generation. Events from any other generation are dropped here.

use crate::error::PrimitiveError;
use crate::events::{PrimitiveEvent, PrimitiveEventKind};
use crate::generation::{Generation, GenerationGuard};
use crate::primitive::{PlaybackPrimitive, PrimitiveResult};
use crate::types::Track;
use std::time::{Duration, Instant};
use tracing::debug;

/// Transport state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportState {
    /// Nothing loaded
    Idle,
    /// Waiting for the primitive to report metadata
    Loading,
    /// Loaded, not started
    Ready,
    Playing,
    Paused,
    /// Reached the end of the track
    Ended,
    /// Load or transport failure; a new load is required
    Error,
}

/// What happened to a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// Forwarded to the primitive
    Sent,
    /// Parked until the load completes
    Deferred,
    /// Meaningless in the current state
    Ignored,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum PendingSeek {
    /// User seek, clamped into the track once the duration is known
    User(f64),
    /// Session restore, applied only if it falls inside the new duration
    Resume(f64),
}

#[derive(Debug, Default)]
struct Deferred {
    play: Option<bool>,
    seek: Option<PendingSeek>,
}

/// Accepted event, translated for the engine
#[derive(Debug, Clone, PartialEq)]
pub enum Signal {
    LoadStarted,
    Ready {
        duration: f64,
        position: f64,
        playing: bool,
        play_error: Option<PrimitiveError>,
    },
    Position(f64),
    Ended,
    Failed {
        reason: String,
        during_load: bool,
    },
    PlayState(bool),
    Volume {
        volume: f64,
        muted: bool,
    },
}

/// Adapter around the exclusive playback primitive
#[derive(Debug)]
pub struct Transport<P> {
    primitive: P,
    guard: GenerationGuard,
    state: TransportState,
    duration: f64,
    position: f64,
    deferred: Deferred,
    loading_since: Option<Instant>,
}

impl<P: PlaybackPrimitive> Transport<P> {
    pub fn new(primitive: P) -> Self {
        Self {
            primitive,
            guard: GenerationGuard::new(),
            state: TransportState::Idle,
            duration: 0.0,
            position: 0.0,
            deferred: Deferred::default(),
            loading_since: None,
        }
    }

    pub fn primitive(&self) -> &P {
        &self.primitive
    }

    pub fn primitive_mut(&mut self) -> &mut P {
        &mut self.primitive
    }

    pub fn into_primitive(self) -> P {
        self.primitive
    }

    pub fn state(&self) -> TransportState {
        self.state
    }

    pub fn position(&self) -> f64 {
        self.position
    }

    pub fn active_generation(&self) -> Option<Generation> {
        self.guard.active()
    }

    /// Whether a play issued during the current load is waiting for `Ready`
    pub fn play_pending(&self) -> bool {
        self.state == TransportState::Loading && self.deferred.play == Some(true)
    }

    /// Whether `play` needs a fresh load first
    pub fn needs_load(&self) -> bool {
        matches!(self.state, TransportState::Idle | TransportState::Error)
    }

    /// Load `track` under a new generation
    ///
    /// `resume_at` is a saved position applied once the duration is known,
    /// provided it is still inside the track.
    pub fn load(
        &mut self,
        track: &Track,
        resume_at: Option<f64>,
    ) -> Result<Generation, PrimitiveError> {
        let generation = self.guard.advance();
        self.state = TransportState::Loading;
        self.duration = 0.0;
        self.position = 0.0;
        self.deferred = Deferred {
            play: None,
            seek: resume_at.map(PendingSeek::Resume),
        };
        self.loading_since = Some(Instant::now());

        debug!(%generation, track_id = %track.id, "loading track");

        if let Err(e) = self.primitive.load(generation, track) {
            self.guard.invalidate();
            self.state = TransportState::Error;
            self.loading_since = None;
            self.deferred = Deferred::default();
            return Err(e);
        }

        Ok(generation)
    }

    pub fn play(&mut self) -> Result<Dispatch, PrimitiveError> {
        match self.state {
            TransportState::Idle | TransportState::Error | TransportState::Playing => {
                Ok(Dispatch::Ignored)
            }
            TransportState::Loading => {
                self.deferred.play = Some(true);
                Ok(Dispatch::Deferred)
            }
            TransportState::Ended => {
                self.primitive.seek(0.0)?;
                self.position = 0.0;
                self.primitive.play()?;
                self.state = TransportState::Playing;
                Ok(Dispatch::Sent)
            }
            TransportState::Ready | TransportState::Paused => {
                self.primitive.play()?;
                self.state = TransportState::Playing;
                Ok(Dispatch::Sent)
            }
        }
    }

    pub fn pause(&mut self) -> Result<Dispatch, PrimitiveError> {
        match self.state {
            TransportState::Loading => {
                self.deferred.play = Some(false);
                Ok(Dispatch::Deferred)
            }
            TransportState::Playing => {
                self.primitive.pause()?;
                self.state = TransportState::Paused;
                Ok(Dispatch::Sent)
            }
            _ => Ok(Dispatch::Ignored),
        }
    }

    /// Pause and rewind to the start
    pub fn stop(&mut self) -> Result<Dispatch, PrimitiveError> {
        match self.state {
            TransportState::Idle | TransportState::Error => Ok(Dispatch::Ignored),
            TransportState::Loading => {
                self.deferred = Deferred::default();
                Ok(Dispatch::Deferred)
            }
            TransportState::Ready => {
                self.primitive.stop()?;
                self.position = 0.0;
                Ok(Dispatch::Sent)
            }
            TransportState::Playing | TransportState::Paused | TransportState::Ended => {
                self.primitive.stop()?;
                self.position = 0.0;
                self.state = TransportState::Paused;
                Ok(Dispatch::Sent)
            }
        }
    }

    /// Seek to `target` seconds, clamped into `[0, duration]`
    ///
    /// Returns the dispatch outcome and the position the transport will end
    /// up at. `target` must be finite.
    pub fn seek(&mut self, target: f64) -> Result<(Dispatch, f64), PrimitiveError> {
        match self.state {
            TransportState::Idle | TransportState::Error => {
                Ok((Dispatch::Ignored, self.position))
            }
            TransportState::Loading => {
                let target = target.max(0.0);
                self.deferred.seek = Some(PendingSeek::User(target));
                Ok((Dispatch::Deferred, target))
            }
            TransportState::Ready
            | TransportState::Playing
            | TransportState::Paused
            | TransportState::Ended => {
                let clamped = target.clamp(0.0, self.duration.max(0.0));
                self.primitive.seek(clamped)?;
                self.position = clamped;
                if self.state == TransportState::Ended && clamped < self.duration {
                    self.state = TransportState::Paused;
                }
                Ok((Dispatch::Sent, clamped))
            }
        }
    }

    pub fn set_volume(&mut self, volume: f64) -> PrimitiveResult {
        self.primitive.set_volume(volume)
    }

    pub fn set_muted(&mut self, muted: bool) -> PrimitiveResult {
        self.primitive.set_muted(muted)
    }

    pub fn release(&mut self, track: &Track) {
        self.primitive.release(track);
    }

    /// Stop everything and forget the active load
    pub fn halt(&mut self) -> PrimitiveResult {
        self.guard.invalidate();
        self.deferred = Deferred::default();
        self.loading_since = None;
        self.duration = 0.0;
        self.position = 0.0;
        let was_idle = self.state == TransportState::Idle;
        self.state = TransportState::Idle;
        if was_idle {
            Ok(())
        } else {
            self.primitive.stop()
        }
    }

    /// Fail a load that has been pending for longer than `timeout`
    ///
    /// Returns `true` if the load was abandoned. Its eventual completion is
    /// stale and will be dropped.
    pub fn expire_load(&mut self, now: Instant, timeout: Duration) -> bool {
        let Some(since) = self.loading_since else {
            return false;
        };
        if self.state != TransportState::Loading || now.saturating_duration_since(since) < timeout
        {
            return false;
        }

        self.guard.invalidate();
        self.state = TransportState::Error;
        self.deferred = Deferred::default();
        self.loading_since = None;
        true
    }

    /// Apply a primitive event
    ///
    /// Returns `None` for stale events (wrong generation).
    pub fn accept(&mut self, event: PrimitiveEvent) -> Option<Signal> {
        let load_bound = !matches!(event.kind, PrimitiveEventKind::VolumeChanged { .. });
        if load_bound && !self.guard.is_current(event.generation) {
            debug!(
                generation = %event.generation,
                active = ?self.guard.active(),
                kind = ?event.kind,
                "dropping stale primitive event"
            );
            return None;
        }

        let signal = match event.kind {
            PrimitiveEventKind::LoadStart => Signal::LoadStarted,
            PrimitiveEventKind::MetadataReady { duration } => self.on_metadata_ready(duration),
            PrimitiveEventKind::TimeUpdate { position } => {
                self.position = position.max(0.0);
                Signal::Position(self.position)
            }
            PrimitiveEventKind::Ended => {
                self.state = TransportState::Ended;
                self.position = self.duration;
                Signal::Ended
            }
            PrimitiveEventKind::Error { reason } => {
                let during_load = self.state == TransportState::Loading;
                self.state = TransportState::Error;
                self.deferred = Deferred::default();
                self.loading_since = None;
                Signal::Failed {
                    reason,
                    during_load,
                }
            }
            PrimitiveEventKind::PlayStateChanged { playing } => {
                match (playing, self.state) {
                    (
                        true,
                        TransportState::Ready | TransportState::Paused | TransportState::Ended,
                    ) => self.state = TransportState::Playing,
                    (false, TransportState::Playing) => self.state = TransportState::Paused,
                    _ => {}
                }
                Signal::PlayState(playing)
            }
            PrimitiveEventKind::VolumeChanged { volume, muted } => Signal::Volume { volume, muted },
        };

        Some(signal)
    }

    fn on_metadata_ready(&mut self, duration: f64) -> Signal {
        self.duration = if duration.is_finite() {
            duration.max(0.0)
        } else {
            0.0
        };

        if self.state != TransportState::Loading {
            // Duration refresh on an already-ready transport
            return Signal::Ready {
                duration: self.duration,
                position: self.position,
                playing: self.state == TransportState::Playing,
                play_error: None,
            };
        }

        self.state = TransportState::Ready;
        self.loading_since = None;
        let deferred = std::mem::take(&mut self.deferred);

        let seek_to = match deferred.seek {
            Some(PendingSeek::User(t)) => Some(t.clamp(0.0, self.duration)),
            Some(PendingSeek::Resume(t)) if t > 0.0 && t < self.duration => Some(t),
            Some(PendingSeek::Resume(t)) => {
                debug!(saved = t, duration = self.duration, "saved position outside track");
                None
            }
            None => None,
        };
        if let Some(position) = seek_to {
            match self.primitive.seek(position) {
                Ok(()) => self.position = position,
                Err(e) => debug!(error = %e, "deferred seek failed"),
            }
        }

        let mut play_error = None;
        if deferred.play == Some(true) {
            match self.primitive.play() {
                Ok(()) => self.state = TransportState::Playing,
                Err(e) => play_error = Some(e),
            }
        }

        Signal::Ready {
            duration: self.duration,
            position: self.position,
            playing: self.state == TransportState::Playing,
            play_error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitive::{Command, RecordingPrimitive};

    fn track(id: &str) -> Track {
        Track::new(id, format!("Track {}", id), "Artist", format!("file:///{}.mp3", id))
    }

    fn ready(transport: &mut Transport<RecordingPrimitive>, duration: f64) -> Option<Signal> {
        let generation = transport.active_generation().unwrap();
        transport.accept(PrimitiveEvent::new(
            generation,
            PrimitiveEventKind::MetadataReady { duration },
        ))
    }

    #[test]
    fn load_enters_loading_state() {
        let mut transport = Transport::new(RecordingPrimitive::default());
        let generation = transport.load(&track("a"), None).unwrap();

        assert_eq!(transport.state(), TransportState::Loading);
        assert_eq!(
            transport.primitive().commands,
            vec![Command::Load(generation, "a".to_string())]
        );
    }

    #[test]
    fn play_while_loading_is_deferred_until_ready() {
        let mut transport = Transport::new(RecordingPrimitive::default());
        transport.load(&track("a"), None).unwrap();

        assert_eq!(transport.play().unwrap(), Dispatch::Deferred);
        assert!(!transport.primitive().commands.contains(&Command::Play));

        let signal = ready(&mut transport, 200.0).unwrap();
        assert!(matches!(signal, Signal::Ready { playing: true, .. }));
        assert_eq!(transport.state(), TransportState::Playing);
        assert!(transport.primitive().commands.contains(&Command::Play));
    }

    #[test]
    fn pause_while_loading_cancels_deferred_play() {
        let mut transport = Transport::new(RecordingPrimitive::default());
        transport.load(&track("a"), None).unwrap();
        transport.play().unwrap();
        assert!(transport.play_pending());
        transport.pause().unwrap();
        assert!(!transport.play_pending());

        ready(&mut transport, 200.0);
        assert_eq!(transport.state(), TransportState::Ready);
        assert!(!transport.primitive().commands.contains(&Command::Play));
    }

    #[test]
    fn deferred_seek_is_clamped_to_duration() {
        let mut transport = Transport::new(RecordingPrimitive::default());
        transport.load(&track("a"), None).unwrap();
        transport.seek(500.0).unwrap();

        ready(&mut transport, 120.0);
        assert_eq!(transport.position(), 120.0);
        assert!(transport.primitive().commands.contains(&Command::Seek(120.0)));
    }

    #[test]
    fn resume_position_beyond_duration_is_skipped() {
        let mut transport = Transport::new(RecordingPrimitive::default());
        transport.load(&track("a"), Some(300.0)).unwrap();

        ready(&mut transport, 120.0);
        assert_eq!(transport.position(), 0.0);
        assert!(!transport
            .primitive()
            .commands
            .iter()
            .any(|c| matches!(c, Command::Seek(_))));
    }

    #[test]
    fn resume_position_inside_track_is_applied() {
        let mut transport = Transport::new(RecordingPrimitive::default());
        transport.load(&track("a"), Some(42.0)).unwrap();

        ready(&mut transport, 120.0);
        assert_eq!(transport.position(), 42.0);
    }

    #[test]
    fn seek_clamps_into_track() {
        let mut transport = Transport::new(RecordingPrimitive::default());
        transport.load(&track("a"), None).unwrap();
        ready(&mut transport, 100.0);

        assert_eq!(transport.seek(-5.0).unwrap(), (Dispatch::Sent, 0.0));
        assert_eq!(transport.seek(150.0).unwrap(), (Dispatch::Sent, 100.0));
    }

    #[test]
    fn stale_events_are_dropped() {
        let mut transport = Transport::new(RecordingPrimitive::default());
        let old = transport.load(&track("a"), None).unwrap();
        transport.load(&track("b"), None).unwrap();

        let signal = transport.accept(PrimitiveEvent::new(
            old,
            PrimitiveEventKind::MetadataReady { duration: 10.0 },
        ));
        assert!(signal.is_none());
        assert_eq!(transport.state(), TransportState::Loading);
    }

    #[test]
    fn volume_events_ignore_generation() {
        let mut transport = Transport::new(RecordingPrimitive::default());
        let old = transport.load(&track("a"), None).unwrap();
        transport.halt().unwrap();

        let signal = transport.accept(PrimitiveEvent::new(
            old,
            PrimitiveEventKind::VolumeChanged {
                volume: 0.5,
                muted: true,
            },
        ));
        assert_eq!(
            signal,
            Some(Signal::Volume {
                volume: 0.5,
                muted: true
            })
        );
    }

    #[test]
    fn play_after_end_rewinds() {
        let mut transport = Transport::new(RecordingPrimitive::default());
        let generation = transport.load(&track("a"), None).unwrap();
        ready(&mut transport, 10.0);
        transport.play().unwrap();
        transport.accept(PrimitiveEvent::new(generation, PrimitiveEventKind::Ended));
        assert_eq!(transport.state(), TransportState::Ended);

        transport.primitive_mut().commands.clear();
        transport.play().unwrap();

        assert_eq!(
            transport.primitive().commands,
            vec![Command::Seek(0.0), Command::Play]
        );
        assert_eq!(transport.state(), TransportState::Playing);
    }

    #[test]
    fn load_failure_enters_error_state() {
        let mut transport = Transport::new(RecordingPrimitive {
            fail_loads: true,
            ..Default::default()
        });

        assert!(transport.load(&track("a"), None).is_err());
        assert_eq!(transport.state(), TransportState::Error);
        assert!(transport.needs_load());
    }

    #[test]
    fn error_event_reports_load_phase() {
        let mut transport = Transport::new(RecordingPrimitive::default());
        let generation = transport.load(&track("a"), None).unwrap();

        let signal = transport.accept(PrimitiveEvent::new(
            generation,
            PrimitiveEventKind::Error {
                reason: "404".to_string(),
            },
        ));
        assert_eq!(
            signal,
            Some(Signal::Failed {
                reason: "404".to_string(),
                during_load: true
            })
        );
    }

    #[test]
    fn expired_load_invalidates_generation() {
        let mut transport = Transport::new(RecordingPrimitive::default());
        let generation = transport.load(&track("a"), None).unwrap();
        let timeout = Duration::from_secs(5);

        assert!(!transport.expire_load(Instant::now(), timeout));
        assert!(transport.expire_load(Instant::now() + timeout, timeout));
        assert_eq!(transport.state(), TransportState::Error);

        let late = transport.accept(PrimitiveEvent::new(
            generation,
            PrimitiveEventKind::MetadataReady { duration: 10.0 },
        ));
        assert!(late.is_none());
    }

    #[test]
    fn play_rejection_on_ready_is_reported() {
        let mut transport = Transport::new(RecordingPrimitive {
            reject_play: true,
            ..Default::default()
        });
        transport.load(&track("a"), None).unwrap();
        transport.play().unwrap();

        let signal = ready(&mut transport, 10.0).unwrap();
        assert!(matches!(
            signal,
            Signal::Ready {
                playing: false,
                play_error: Some(PrimitiveError::Rejected(_)),
                ..
            }
        ));
        assert_eq!(transport.state(), TransportState::Ready);
    }
}
