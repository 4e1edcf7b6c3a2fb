//! Platform-agnostic playback primitive trait
//!
//! Abstracts the one exclusive media transport (an audio element, a native
//! player, a simulated clock in tests).

use crate::error::PrimitiveError;
use crate::events::EventSender;
use crate::generation::Generation;
use crate::types::Track;

/// Result type for primitive commands
pub type PrimitiveResult = std::result::Result<(), PrimitiveError>;

/// Platform playback transport
///
/// Implementors perform the actual decoding and output. Commands return
/// synchronously; completion is reported later through the [`EventSender`]
/// handed over in [`attach`](Self::attach), tagged with the generation passed
/// to [`load`](Self::load).
///
/// Only the engine's transport adapter ever calls these methods.
pub trait PlaybackPrimitive {
    /// Receive the channel used to report events
    ///
    /// Called once by [`PlaybackEngine::new`](crate::PlaybackEngine::new).
    fn attach(&mut self, _events: EventSender) {}

    /// Start loading a track
    ///
    /// Every event caused by this load must carry `generation`.
    fn load(&mut self, generation: Generation, track: &Track) -> PrimitiveResult;

    /// Start or resume playback
    ///
    /// # Returns
    /// * `Err(PrimitiveError::Rejected)` - platform refused (e.g. autoplay policy)
    fn play(&mut self) -> PrimitiveResult;

    /// Pause playback
    fn pause(&mut self) -> PrimitiveResult;

    /// Pause and rewind to the start
    fn stop(&mut self) -> PrimitiveResult;

    /// Seek to `position` seconds (already clamped by the adapter)
    fn seek(&mut self, position: f64) -> PrimitiveResult;

    /// Set output volume in `[0, 1]`
    fn set_volume(&mut self, volume: f64) -> PrimitiveResult;

    fn set_muted(&mut self, muted: bool) -> PrimitiveResult;

    /// Release any transient resource backing `track` (object URLs, handles)
    ///
    /// Called when the track leaves the playlist.
    fn release(&mut self, _track: &Track) {}
}

impl<P: PlaybackPrimitive + ?Sized> PlaybackPrimitive for Box<P> {
    fn attach(&mut self, events: EventSender) {
        (**self).attach(events);
    }

    fn load(&mut self, generation: Generation, track: &Track) -> PrimitiveResult {
        (**self).load(generation, track)
    }

    fn play(&mut self) -> PrimitiveResult {
        (**self).play()
    }

    fn pause(&mut self) -> PrimitiveResult {
        (**self).pause()
    }

    fn stop(&mut self) -> PrimitiveResult {
        (**self).stop()
    }

    fn seek(&mut self, position: f64) -> PrimitiveResult {
        (**self).seek(position)
    }

    fn set_volume(&mut self, volume: f64) -> PrimitiveResult {
        (**self).set_volume(volume)
    }

    fn set_muted(&mut self, muted: bool) -> PrimitiveResult {
        (**self).set_muted(muted)
    }

    fn release(&mut self, track: &Track) {
        (**self).release(track);
    }
}

/// Command log entry recorded by [`RecordingPrimitive`]
#[cfg(test)]
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Load(Generation, String),
    Play,
    Pause,
    Stop,
    Seek(f64),
    SetVolume(f64),
    SetMuted(bool),
    Release(String),
}

/// Primitive that records every command, for unit tests
#[cfg(test)]
#[derive(Debug, Default)]
pub struct RecordingPrimitive {
    pub commands: Vec<Command>,
    pub fail_loads: bool,
    pub reject_play: bool,
}

#[cfg(test)]
impl PlaybackPrimitive for RecordingPrimitive {
    fn load(&mut self, generation: Generation, track: &Track) -> PrimitiveResult {
        self.commands.push(Command::Load(generation, track.id.clone()));
        if self.fail_loads {
            return Err(PrimitiveError::Unreachable(track.source_ref.clone()));
        }
        Ok(())
    }

    fn play(&mut self) -> PrimitiveResult {
        self.commands.push(Command::Play);
        if self.reject_play {
            return Err(PrimitiveError::Rejected("autoplay blocked".to_string()));
        }
        Ok(())
    }

    fn pause(&mut self) -> PrimitiveResult {
        self.commands.push(Command::Pause);
        Ok(())
    }

    fn stop(&mut self) -> PrimitiveResult {
        self.commands.push(Command::Stop);
        Ok(())
    }

    fn seek(&mut self, position: f64) -> PrimitiveResult {
        self.commands.push(Command::Seek(position));
        Ok(())
    }

    fn set_volume(&mut self, volume: f64) -> PrimitiveResult {
        self.commands.push(Command::SetVolume(volume));
        Ok(())
    }

    fn set_muted(&mut self, muted: bool) -> PrimitiveResult {
        self.commands.push(Command::SetMuted(muted));
        Ok(())
    }

    fn release(&mut self, track: &Track) {
        self.commands.push(Command::Release(track.id.clone()));
    }
}
