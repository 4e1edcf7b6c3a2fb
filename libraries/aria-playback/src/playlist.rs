//! Playlist store
//!
//! Ordered tracks plus the current position. The store only does index
//! bookkeeping; loading and releasing media is left to the engine, which
//! reads the returned outcomes.

use crate::error::{PlaybackError, Result};
use crate::types::Track;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::warn;

/// Effect of a removal on the current position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalEffect {
    /// Removed before the current track; index shifted down, same track
    BeforeCurrent,
    /// Removed the current track; `reload` is the new current index
    Current { reload: Option<usize> },
    /// Removed after the current track; nothing changes
    AfterCurrent,
}

/// A removed track and what it did to the current position
#[derive(Debug, Clone, PartialEq)]
pub struct Removed {
    pub track: Track,
    pub effect: RemovalEffect,
}

/// Ordered playlist with a current-position pointer
///
/// Invariant: `current` is `None` iff the playlist is empty, and otherwise a
/// valid index.
#[derive(Debug, Clone, Default)]
pub struct Playlist {
    tracks: Arc<Vec<Track>>,
    current: Option<usize>,
}

impl Playlist {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a playlist from restored parts, repairing whatever is invalid
    ///
    /// `current` follows its track through duplicate removal. An index that
    /// points nowhere falls back to the first track.
    pub fn from_parts(tracks: Vec<Track>, current: Option<usize>) -> Self {
        let current_id = current
            .and_then(|index| tracks.get(index))
            .map(|track| track.id.clone());
        let tracks = dedupe(&HashSet::new(), tracks);
        let current = if tracks.is_empty() {
            None
        } else {
            current_id
                .and_then(|id| tracks.iter().position(|track| track.id == id))
                .or(Some(0))
        };
        Self {
            tracks: Arc::new(tracks),
            current,
        }
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    /// Shared handle to the track list, for snapshots
    pub fn shared(&self) -> Arc<Vec<Track>> {
        Arc::clone(&self.tracks)
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    pub fn current_track(&self) -> Option<&Track> {
        self.current.and_then(|i| self.tracks.get(i))
    }

    /// Replace the whole playlist
    ///
    /// Selects the first track if any. Returns the discarded tracks.
    pub fn replace(&mut self, tracks: Vec<Track>) -> Vec<Track> {
        let tracks = dedupe(&HashSet::new(), tracks);
        self.current = if tracks.is_empty() { None } else { Some(0) };
        let old = std::mem::replace(&mut self.tracks, Arc::new(tracks));
        Arc::try_unwrap(old).unwrap_or_else(|shared| shared.as_ref().clone())
    }

    /// Append tracks at the end
    ///
    /// Returns `true` if the playlist was empty and the first appended track
    /// is now selected.
    pub fn append(&mut self, tracks: Vec<Track>) -> bool {
        let existing: HashSet<&str> = self.tracks.iter().map(|t| t.id.as_str()).collect();
        let tracks = dedupe(&existing, tracks);
        if tracks.is_empty() {
            return false;
        }

        let was_empty = self.tracks.is_empty();
        Arc::make_mut(&mut self.tracks).extend(tracks);
        if was_empty {
            self.current = Some(0);
        }
        was_empty
    }

    /// Remove the track at `index`
    pub fn remove_at(&mut self, index: usize) -> Result<Removed> {
        let len = self.tracks.len();
        let Some(current) = self.current.filter(|_| index < len) else {
            return Err(PlaybackError::IndexOutOfBounds { index, len });
        };

        let track = Arc::make_mut(&mut self.tracks).remove(index);
        let new_len = len - 1;

        let effect = if index < current {
            self.current = Some(current - 1);
            RemovalEffect::BeforeCurrent
        } else if index > current {
            RemovalEffect::AfterCurrent
        } else {
            self.current = match new_len {
                0 => None,
                _ if index == new_len => Some(new_len - 1),
                _ => Some(index),
            };
            RemovalEffect::Current {
                reload: self.current,
            }
        };

        Ok(Removed { track, effect })
    }

    /// Rearrange tracks so that `new[k] = old[order[k]]`
    ///
    /// The current index follows the current track.
    pub fn reorder(&mut self, order: &[usize]) -> Result<()> {
        let len = self.tracks.len();
        if order.len() != len {
            return Err(PlaybackError::InvalidPermutation(format!(
                "expected {} indices, got {}",
                len,
                order.len()
            )));
        }

        let mut seen = vec![false; len];
        for &index in order {
            if index >= len || seen[index] {
                return Err(PlaybackError::InvalidPermutation(format!(
                    "index {} is out of range or repeated",
                    index
                )));
            }
            seen[index] = true;
        }

        let reordered: Vec<Track> = order.iter().map(|&i| self.tracks[i].clone()).collect();
        self.current = self
            .current
            .and_then(|current| order.iter().position(|&i| i == current));
        self.tracks = Arc::new(reordered);
        Ok(())
    }

    /// Move one track from `from` to `to`
    pub fn move_track(&mut self, from: usize, to: usize) -> Result<()> {
        let len = self.tracks.len();
        for index in [from, to] {
            if index >= len {
                return Err(PlaybackError::IndexOutOfBounds { index, len });
            }
        }

        let mut order: Vec<usize> = (0..len).collect();
        let moved = order.remove(from);
        order.insert(to, moved);
        self.reorder(&order)
    }

    /// Make `index` the current track
    pub fn select(&mut self, index: usize) -> Result<()> {
        if index >= self.tracks.len() {
            return Err(PlaybackError::IndexOutOfBounds {
                index,
                len: self.tracks.len(),
            });
        }
        self.current = Some(index);
        Ok(())
    }

    /// Empty the playlist, returning the removed tracks
    pub fn clear(&mut self) -> Vec<Track> {
        self.replace(Vec::new())
    }
}

/// Drop tracks whose id is already present (in `existing` or earlier in the batch)
fn dedupe(existing: &HashSet<&str>, tracks: Vec<Track>) -> Vec<Track> {
    let mut seen: HashSet<String> = HashSet::new();
    tracks
        .into_iter()
        .filter(|track| {
            let fresh = !existing.contains(track.id.as_str()) && seen.insert(track.id.clone());
            if !fresh {
                warn!(track_id = %track.id, "skipping duplicate track");
            }
            fresh
        })
        .collect()
}
