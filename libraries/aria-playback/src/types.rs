//! Core types for the playback engine

use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Opaque metadata bag attached by Media Ingest
pub type TrackMetadata = serde_json::Map<String, serde_json::Value>;

/// A ready-to-play track
///
/// Produced by the Media Ingest collaborator; the engine never inspects
/// `source_ref` beyond handing it to the playback primitive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    /// Unique track identifier
    pub id: String,

    /// Track title
    pub title: String,

    /// Artist name
    pub artist: String,

    /// Album name (optional)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub album: Option<String>,

    /// Artwork reference (optional)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artwork_ref: Option<String>,

    /// Opaque playable URI
    pub source_ref: String,

    /// Duration reported by ingest, if known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<TrackMetadata>,
}

impl Track {
    /// Create a track with the required fields only
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        artist: impl Into<String>,
        source_ref: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            artist: artist.into(),
            album: None,
            artwork_ref: None,
            source_ref: source_ref.into(),
            duration_seconds: None,
            metadata: None,
        }
    }

    pub fn with_album(mut self, album: impl Into<String>) -> Self {
        self.album = Some(album.into());
        self
    }

    pub fn with_duration(mut self, seconds: f64) -> Self {
        self.duration_seconds = Some(seconds);
        self
    }
}

/// Repeat mode
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepeatMode {
    /// Stop when the playlist ends
    #[default]
    #[serde(rename = "none", alias = "off")]
    Off,

    /// Loop entire playlist
    All,

    /// Loop current track only
    One,
}

impl RepeatMode {
    /// Next mode in the toggle cycle: Off → All → One → Off
    pub fn cycle(self) -> Self {
        match self {
            RepeatMode::Off => RepeatMode::All,
            RepeatMode::All => RepeatMode::One,
            RepeatMode::One => RepeatMode::Off,
        }
    }

    /// Whether navigation wraps around the playlist boundaries
    pub fn wraps(self) -> bool {
        self != RepeatMode::Off
    }
}

/// Immutable snapshot of the engine state
///
/// Handed to subscribers and returned by
/// [`PlaybackEngine::state`](crate::PlaybackEngine::state). The playlist is
/// shared with the engine, so cloning a snapshot is cheap.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerState {
    pub is_playing: bool,
    pub current_time_seconds: f64,
    pub duration_seconds: f64,

    /// Volume in `[0, 1]`
    pub volume: f64,
    pub is_muted: bool,

    /// UI hint, carried through untouched
    pub is_expanded: bool,

    pub playlist: Arc<Vec<Track>>,

    /// Position in `playlist`; `None` iff the playlist is empty
    pub current_index: Option<usize>,

    pub is_visible: bool,
    pub shuffle_enabled: bool,
    pub repeat_mode: RepeatMode,
    pub is_loading: bool,
    pub last_error: Option<String>,
}

impl PlayerState {
    /// Currently selected track, if any
    pub fn current_track(&self) -> Option<&Track> {
        self.current_index.and_then(|i| self.playlist.get(i))
    }
}

impl Default for PlayerState {
    fn default() -> Self {
        Self {
            is_playing: false,
            current_time_seconds: 0.0,
            duration_seconds: 0.0,
            volume: 1.0,
            is_muted: false,
            is_expanded: false,
            playlist: Arc::new(Vec::new()),
            current_index: None,
            is_visible: false,
            shuffle_enabled: false,
            repeat_mode: RepeatMode::Off,
            is_loading: false,
            last_error: None,
        }
    }
}
