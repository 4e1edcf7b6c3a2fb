//! Playback engine - core orchestration
//!
//! Coordinates the playlist, navigation, repeat policy, transport, session
//! persistence and subscribers. Every public command runs to completion
//! synchronously and ends with a commit: the new snapshot is compared with
//! the last committed one and, if it differs, persisted and broadcast.

use crate::{
    config::EngineConfig,
    error::{PlaybackError, PrimitiveError, Result},
    events::{event_channel, EventSender, PrimitiveEvent},
    navigation::Navigator,
    persistence::{PersistedSession, SessionStore, StateStore},
    playlist::{Playlist, RemovalEffect},
    primitive::PlaybackPrimitive,
    repeat::{on_track_ended, EndedAction},
    subscribers::{SubscriberRegistry, Subscription},
    transport::{Dispatch, Signal, Transport, TransportState},
    types::{PlayerState, RepeatMode, Track},
    volume::Volume,
};
use crossbeam_channel::Receiver;
use std::collections::HashSet;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Global playback engine
///
/// Owns the single transport. Not `Send`: all commands, event handling and
/// listener callbacks happen on the owning thread.
pub struct PlaybackEngine<P: PlaybackPrimitive> {
    config: EngineConfig,

    // Components
    transport: Transport<P>,
    playlist: Playlist,
    navigator: Navigator,
    volume: Volume,
    repeat_mode: RepeatMode,

    // Observable flags
    is_playing: bool,
    is_loading: bool,
    position: f64,
    duration: f64,
    is_expanded: bool,
    is_visible: bool,
    last_error: Option<String>,

    // Wiring
    sessions: SessionStore,
    subscribers: SubscriberRegistry,
    events_tx: EventSender,
    events: Receiver<PrimitiveEvent>,
    committed: PlayerState,
}

impl<P: PlaybackPrimitive> PlaybackEngine<P> {
    /// Create an engine around `primitive`
    ///
    /// Nothing is restored or loaded until [`init`](Self::init).
    pub fn new(mut primitive: P, store: Box<dyn StateStore>, config: EngineConfig) -> Self {
        let (events_tx, events) = event_channel();
        primitive.attach(events_tx.clone());

        let mut engine = Self {
            transport: Transport::new(primitive),
            playlist: Playlist::new(),
            navigator: Navigator::new(config.shuffle_seed),
            volume: Volume::new(config.initial_volume),
            repeat_mode: RepeatMode::Off,
            is_playing: false,
            is_loading: false,
            position: 0.0,
            duration: 0.0,
            is_expanded: false,
            is_visible: false,
            last_error: None,
            sessions: SessionStore::new(store, config.storage_key.clone()),
            subscribers: SubscriberRegistry::new(),
            events_tx,
            events,
            committed: PlayerState::default(),
            config,
        };
        engine.committed = engine.snapshot();
        engine
    }

    // ===== Lifecycle =====

    /// Restore the persisted session and load its current track
    ///
    /// The restored track is loaded paused; it never autoplays. A missing or
    /// unreadable record leaves the defaults in place.
    pub fn init(&mut self) {
        let resume_at = match self.sessions.restore() {
            Some(session) => self.apply_session(session),
            None => None,
        };

        self.push_volume();
        if self.playlist.current_track().is_some() {
            self.load_current(resume_at, false);
        }

        info!(
            tracks = self.playlist.len(),
            current = ?self.playlist.current_index(),
            "playback engine initialised"
        );
        self.commit();
    }

    /// Save one last time, stop the transport and drop every listener
    ///
    /// Returns the primitive.
    pub fn dispose(mut self) -> P {
        self.is_playing = false;
        self.is_loading = false;
        let snapshot = self.snapshot();
        self.sessions.save(&snapshot);

        if let Err(e) = self.transport.halt() {
            warn!(error = %e, "failed to stop transport on dispose");
        }
        self.subscribers.clear();
        debug!("playback engine disposed");

        self.transport.into_primitive()
    }

    // ===== Playlist =====

    /// Replace the playlist and load its first track
    pub fn load_playlist(&mut self, tracks: Vec<Track>) {
        let discarded = self.playlist.replace(tracks);
        self.release_missing(discarded);
        self.navigator
            .playlist_changed(self.playlist.len(), self.playlist.current_index());

        if self.playlist.is_empty() {
            self.halt_transport();
        } else {
            self.is_visible = true;
            self.load_current(None, self.config.autoplay_on_load);
        }

        debug!(tracks = self.playlist.len(), "playlist loaded");
        self.commit();
    }

    /// Append tracks
    ///
    /// On an empty playlist this behaves like [`load_playlist`](Self::load_playlist).
    pub fn add_to_playlist(&mut self, tracks: Vec<Track>) {
        let before = self.playlist.len();
        let selected_first = self.playlist.append(tracks);
        if self.playlist.len() == before {
            return;
        }

        self.navigator
            .playlist_changed(self.playlist.len(), self.playlist.current_index());
        self.is_visible = true;
        if selected_first {
            self.load_current(None, self.config.autoplay_on_load);
        }

        debug!(added = self.playlist.len() - before, "tracks appended");
        self.commit();
    }

    /// Remove the track at `index` and release it
    ///
    /// Removing the current track loads its successor (or the new last track),
    /// which keeps playing if the removed one was.
    pub fn remove_at(&mut self, index: usize) -> Result<()> {
        let was_playing = self.is_playing || self.transport.play_pending();
        let removed = self.playlist.remove_at(index)?;
        self.navigator
            .playlist_changed(self.playlist.len(), self.playlist.current_index());

        match removed.effect {
            RemovalEffect::Current { reload: Some(_) } => self.load_current(None, was_playing),
            RemovalEffect::Current { reload: None } => self.halt_transport(),
            RemovalEffect::BeforeCurrent | RemovalEffect::AfterCurrent => {}
        }
        self.transport.release(&removed.track);

        debug!(index, track_id = %removed.track.id, "track removed");
        self.commit();
        Ok(())
    }

    /// Rearrange the playlist so that `new[k] = old[order[k]]`
    pub fn reorder(&mut self, order: &[usize]) -> Result<()> {
        self.playlist.reorder(order)?;
        self.navigator
            .playlist_changed(self.playlist.len(), self.playlist.current_index());
        self.commit();
        Ok(())
    }

    /// Move a single track from `from` to `to`
    pub fn move_track(&mut self, from: usize, to: usize) -> Result<()> {
        self.playlist.move_track(from, to)?;
        self.navigator
            .playlist_changed(self.playlist.len(), self.playlist.current_index());
        self.commit();
        Ok(())
    }

    /// Stop playback, empty the playlist and hide the player
    pub fn clear_playlist(&mut self) {
        self.halt_transport();
        for track in self.playlist.clear() {
            self.transport.release(&track);
        }
        self.navigator.playlist_changed(0, None);
        self.is_visible = false;

        debug!("playlist cleared");
        self.commit();
    }

    // ===== Playback Control =====

    /// Start or resume playback of the current track
    ///
    /// Reloads the track first if the last load failed or timed out.
    pub fn play(&mut self) {
        if self.playlist.current_track().is_none() {
            debug!("play ignored: playlist is empty");
            return;
        }

        if self.transport.needs_load() {
            let resume_at = Some(self.position).filter(|&t| t > 0.0);
            self.load_current(resume_at, true);
        } else {
            self.dispatch_play();
        }
        self.commit();
    }

    pub fn pause(&mut self) {
        match self.transport.pause() {
            Ok(Dispatch::Sent) => self.is_playing = false,
            Ok(Dispatch::Deferred | Dispatch::Ignored) => {}
            Err(e) => self.fail_play(&e),
        }
        self.commit();
    }

    /// Pause and rewind to the start
    pub fn stop(&mut self) {
        if let Err(e) = self.transport.stop() {
            warn!(error = %e, "transport refused to stop");
        }
        self.is_playing = false;
        self.position = 0.0;
        self.commit();
    }

    /// Go to the next track in navigation order
    ///
    /// At the end of the playlist this wraps only when repeat is on.
    pub fn next(&mut self) {
        let Some(current) = self.playlist.current_index() else {
            return;
        };

        match self
            .navigator
            .next_index(current, self.playlist.len(), self.repeat_mode.wraps())
        {
            Some(index) => self.jump_to(index),
            None => debug!(current, "no next track"),
        }
        self.commit();
    }

    /// Go to the previous track in navigation order
    ///
    /// Past the restart threshold this rewinds the current track instead.
    pub fn previous(&mut self) {
        let Some(current) = self.playlist.current_index() else {
            return;
        };

        if self.position > self.config.previous_restart_threshold_secs {
            self.restart_current();
        } else {
            match self.navigator.previous_index(
                current,
                self.playlist.len(),
                self.repeat_mode.wraps(),
            ) {
                Some(index) => self.jump_to(index),
                None => debug!(current, "no previous track"),
            }
        }
        self.commit();
    }

    /// Load and play the track at `index`
    pub fn play_track_at_index(&mut self, index: usize) -> Result<()> {
        self.playlist.select(index)?;
        self.load_current(None, true);
        self.commit();
        Ok(())
    }

    // ===== Seek =====

    /// Seek to `seconds`, clamped into the track
    ///
    /// While the track is still loading the seek is applied once it is ready.
    pub fn seek(&mut self, seconds: f64) -> Result<()> {
        if !seconds.is_finite() {
            return Err(PlaybackError::InvalidSeekPosition(seconds));
        }
        if self.playlist.current_track().is_none() {
            return Err(PlaybackError::NoTrackLoaded);
        }

        match self.transport.seek(seconds) {
            Ok((Dispatch::Ignored, _)) => debug!(seconds, "seek ignored: nothing loaded"),
            Ok((_, position)) => self.position = position,
            Err(e) => self.fail_play(&e),
        }
        self.commit();
        Ok(())
    }

    // ===== Volume =====

    /// Set volume, clamped into `[0, 1]`
    pub fn set_volume(&mut self, volume: f64) -> Result<()> {
        if volume.is_nan() {
            return Err(PlaybackError::InvalidVolume(volume));
        }

        let level = self.volume.set_level(volume);
        if let Err(e) = self.transport.set_volume(level) {
            warn!(error = %e, "transport refused volume change");
        }
        self.commit();
        Ok(())
    }

    pub fn toggle_mute(&mut self) {
        let muted = self.volume.toggle_mute();
        if let Err(e) = self.transport.set_muted(muted) {
            warn!(error = %e, "transport refused mute change");
        }
        self.commit();
    }

    // ===== Shuffle, Repeat & UI =====

    /// Turn shuffle on (fresh permutation anchored at the current track) or off
    pub fn toggle_shuffle(&mut self) {
        if self.navigator.is_shuffled() {
            self.navigator.disable_shuffle();
        } else {
            self.navigator
                .enable_shuffle(self.playlist.len(), self.playlist.current_index());
        }
        debug!(enabled = self.navigator.is_shuffled(), "shuffle toggled");
        self.commit();
    }

    /// Cycle repeat: none → all → one → none
    pub fn toggle_repeat(&mut self) {
        self.repeat_mode = self.repeat_mode.cycle();
        debug!(mode = ?self.repeat_mode, "repeat toggled");
        self.commit();
    }

    pub fn toggle_expanded(&mut self) {
        self.is_expanded = !self.is_expanded;
        self.commit();
    }

    pub fn show(&mut self) {
        self.is_visible = true;
        self.commit();
    }

    pub fn hide(&mut self) {
        self.is_visible = false;
        self.commit();
    }

    // ===== Subscriptions & Queries =====

    /// Register a listener for state snapshots
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: FnMut(&PlayerState) + 'static,
    {
        self.subscribers.subscribe(listener)
    }

    /// Current state snapshot
    pub fn state(&self) -> PlayerState {
        self.snapshot()
    }

    pub fn current_track(&self) -> Option<&Track> {
        self.playlist.current_track()
    }

    /// Whether `next()` would move, given the repeat mode
    pub fn has_next(&self) -> bool {
        self.playlist.current_index().is_some_and(|current| {
            self.navigator
                .has_next(current, self.playlist.len(), self.repeat_mode.wraps())
        })
    }

    /// Whether `previous()` would move, given the repeat mode
    pub fn has_previous(&self) -> bool {
        self.playlist.current_index().is_some_and(|current| {
            self.navigator
                .has_previous(current, self.playlist.len(), self.repeat_mode.wraps())
        })
    }

    /// Shuffle permutation in play order, if shuffle is on
    pub fn shuffle_order(&self) -> Option<&[usize]> {
        self.navigator.shuffle_order()
    }

    pub fn primitive(&self) -> &P {
        self.transport.primitive()
    }

    pub fn primitive_mut(&mut self) -> &mut P {
        self.transport.primitive_mut()
    }

    pub fn transport_state(&self) -> TransportState {
        self.transport.state()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // ===== Primitive Events & Time =====

    /// Sender for primitive events, for callers that own the event source
    pub fn event_sender(&self) -> EventSender {
        self.events_tx.clone()
    }

    /// Drain queued primitive events; returns how many were read
    pub fn process_events(&mut self) -> usize {
        let events: Vec<PrimitiveEvent> = self.events.try_iter().collect();
        let count = events.len();
        for event in events {
            self.apply_event(event);
        }
        if count > 0 {
            self.commit();
        }
        count
    }

    /// Apply one primitive event
    ///
    /// Events from superseded or abandoned loads are dropped.
    pub fn handle_event(&mut self, event: PrimitiveEvent) {
        self.apply_event(event);
        self.commit();
    }

    /// Check the pending load against the timeout
    pub fn tick(&mut self) -> bool {
        self.tick_at(Instant::now())
    }

    /// [`tick`](Self::tick) with an explicit clock
    ///
    /// Returns `true` if a load was abandoned.
    pub fn tick_at(&mut self, now: Instant) -> bool {
        let timeout = self.config.load_timeout();
        if !self.transport.expire_load(now, timeout) {
            return false;
        }

        let track_id = self
            .playlist
            .current_track()
            .map(|t| t.id.clone())
            .unwrap_or_default();
        self.record_load_failure(PlaybackError::LoadTimeout { track_id, timeout });
        self.commit();
        true
    }

    // ===== Internals =====

    fn apply_event(&mut self, event: PrimitiveEvent) {
        let Some(signal) = self.transport.accept(event) else {
            return;
        };

        match signal {
            Signal::LoadStarted => self.is_loading = true,
            Signal::Ready {
                duration,
                position,
                playing,
                play_error,
            } => {
                self.is_loading = false;
                self.duration = duration;
                self.position = position;
                self.is_playing = playing;
                self.last_error = None;
                if let Some(e) = play_error {
                    self.fail_play(&e);
                }
            }
            Signal::Position(position) => self.position = position,
            Signal::Ended => {
                self.is_playing = false;
                self.on_ended();
            }
            Signal::Failed {
                reason,
                during_load,
            } => {
                let track_id = self
                    .playlist
                    .current_track()
                    .map(|t| t.id.clone())
                    .unwrap_or_default();
                if during_load {
                    self.record_load_failure(PlaybackError::Load { track_id, reason });
                } else {
                    warn!(%track_id, %reason, "transport failed during playback");
                    self.is_playing = false;
                    self.last_error = Some(PlaybackError::Play(reason).to_string());
                }
            }
            Signal::PlayState(playing) => self.is_playing = playing,
            Signal::Volume { volume, muted } => {
                self.volume.set_level(volume);
                self.volume.set_muted(muted);
            }
        }
    }

    fn on_ended(&mut self) {
        let Some(current) = self.playlist.current_index() else {
            return;
        };

        match on_track_ended(
            self.repeat_mode,
            &mut self.navigator,
            current,
            self.playlist.len(),
        ) {
            EndedAction::Advance(index) => {
                debug!(from = current, to = index, "advancing after track end");
                self.jump_to(index);
            }
            EndedAction::Replay => {
                debug!(index = current, "replaying track");
                self.load_current(None, true);
            }
            EndedAction::Stop => {
                debug!("end of playlist");
                if let Err(e) = self.transport.stop() {
                    warn!(error = %e, "transport refused to stop");
                }
                self.is_playing = false;
                self.position = 0.0;
            }
        }
    }

    fn jump_to(&mut self, index: usize) {
        match self.playlist.select(index) {
            Ok(()) => self.load_current(None, true),
            Err(e) => warn!(error = %e, "navigation produced an invalid index"),
        }
    }

    fn restart_current(&mut self) {
        if self.transport.needs_load() {
            self.load_current(None, self.is_playing);
            return;
        }
        match self.transport.seek(0.0) {
            Ok((_, position)) => self.position = position,
            Err(e) => self.fail_play(&e),
        }
    }

    /// Load the current track under a new generation
    fn load_current(&mut self, resume_at: Option<f64>, autoplay: bool) {
        let Some(track) = self.playlist.current_track().cloned() else {
            return;
        };

        self.is_playing = false;
        self.position = resume_at.unwrap_or(0.0);
        self.duration = track.duration_seconds.unwrap_or(0.0).max(0.0);

        match self.transport.load(&track, resume_at) {
            Ok(generation) => {
                self.is_loading = true;
                debug!(%generation, track_id = %track.id, autoplay, "track loading");
                if autoplay {
                    self.dispatch_play();
                }
            }
            Err(e) => self.record_load_failure(PlaybackError::Load {
                track_id: track.id,
                reason: e.to_string(),
            }),
        }
    }

    fn dispatch_play(&mut self) {
        match self.transport.play() {
            Ok(Dispatch::Sent) => {
                self.is_playing = true;
                self.position = self.transport.position();
            }
            Ok(Dispatch::Deferred | Dispatch::Ignored) => {}
            Err(e) => self.fail_play(&e),
        }
    }

    fn halt_transport(&mut self) {
        if let Err(e) = self.transport.halt() {
            warn!(error = %e, "transport refused to stop");
        }
        self.is_playing = false;
        self.is_loading = false;
        self.position = 0.0;
        self.duration = 0.0;
    }

    fn record_load_failure(&mut self, error: PlaybackError) {
        warn!(error = %error, "load failed");
        self.is_loading = false;
        self.is_playing = false;
        self.last_error = Some(error.to_string());
    }

    fn fail_play(&mut self, error: &PrimitiveError) {
        let error = PlaybackError::Play(error.to_string());
        warn!(error = %error, "playback command refused");
        self.is_playing = self.transport.state() == TransportState::Playing;
        self.last_error = Some(error.to_string());
    }

    /// Release discarded tracks that are not part of the new playlist
    fn release_missing(&mut self, discarded: Vec<Track>) {
        let kept: HashSet<String> = self.playlist.tracks().iter().map(|t| t.id.clone()).collect();
        for track in discarded.iter().filter(|t| !kept.contains(&t.id)) {
            self.transport.release(track);
        }
    }

    fn push_volume(&mut self) {
        if let Err(e) = self.transport.set_volume(self.volume.level()) {
            warn!(error = %e, "transport refused volume change");
        }
        if let Err(e) = self.transport.set_muted(self.volume.is_muted()) {
            warn!(error = %e, "transport refused mute change");
        }
    }

    /// Adopt a restored session; returns the saved position to resume at
    fn apply_session(&mut self, session: PersistedSession) -> Option<f64> {
        let current = session.selected_index();
        let saved_id = current
            .and_then(|index| session.playlist.get(index))
            .map(|track| track.id.clone());
        self.volume = Volume::new(session.volume);
        self.volume.set_muted(session.is_muted);
        self.repeat_mode = session.repeat_mode;
        self.is_expanded = session.is_expanded;
        self.playlist = Playlist::from_parts(session.playlist, current);
        self.is_visible = !self.playlist.is_empty();

        if session.shuffle_enabled {
            self.navigator
                .enable_shuffle(self.playlist.len(), self.playlist.current_index());
        } else {
            self.navigator.disable_shuffle();
        }

        // Only resume on the track the position was saved for
        let resume_valid = saved_id.is_some()
            && saved_id.as_deref() == self.playlist.current_track().map(|t| t.id.as_str());
        let saved = session.current_time_seconds;
        (resume_valid && saved.is_finite() && saved > 0.0).then_some(saved)
    }

    fn snapshot(&self) -> PlayerState {
        PlayerState {
            is_playing: self.is_playing,
            current_time_seconds: self.position.max(0.0),
            duration_seconds: self.duration.max(0.0),
            volume: self.volume.level(),
            is_muted: self.volume.is_muted(),
            is_expanded: self.is_expanded,
            playlist: self.playlist.shared(),
            current_index: self.playlist.current_index(),
            is_visible: self.is_visible,
            shuffle_enabled: self.navigator.is_shuffled(),
            repeat_mode: self.repeat_mode,
            is_loading: self.is_loading,
            last_error: self.last_error.clone(),
        }
    }

    /// Persist and broadcast the snapshot if anything changed
    fn commit(&mut self) {
        let snapshot = self.snapshot();
        if snapshot == self.committed {
            return;
        }
        self.sessions.save(&snapshot);
        self.committed = snapshot.clone();
        self.subscribers.notify(&snapshot);
    }
}

impl<P: PlaybackPrimitive + std::fmt::Debug> std::fmt::Debug for PlaybackEngine<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackEngine")
            .field("transport", &self.transport)
            .field("state", &self.committed)
            .field("subscribers", &self.subscribers)
            .finish_non_exhaustive()
    }
}
