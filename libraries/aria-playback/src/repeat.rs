//! End-of-track policy

use crate::navigation::Navigator;
use crate::types::RepeatMode;

/// What the engine should do when the current track ends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndedAction {
    /// Load and play the track at this index
    Advance(usize),
    /// Reload and replay the current track
    Replay,
    /// Stop; the current index stays put
    Stop,
}

/// Decide the follow-up to a finished track
///
/// `Off` advances only while a next track is reachable without wrapping,
/// `All` always advances (wrapping at the end), `One` replays.
pub fn on_track_ended(
    mode: RepeatMode,
    navigator: &mut Navigator,
    current: usize,
    len: usize,
) -> EndedAction {
    match mode {
        RepeatMode::One => EndedAction::Replay,
        RepeatMode::Off | RepeatMode::All => navigator
            .next_index(current, len, mode.wraps())
            .map_or(EndedAction::Stop, EndedAction::Advance),
    }
}
