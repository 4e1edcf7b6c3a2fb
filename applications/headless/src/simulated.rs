//! Simulated playback primitive
//!
//! Stands in for a real media transport. A worker thread runs a virtual clock
//! and reports load completion, progress and track end through the engine's
//! event channel.
//!
//! Source references are interpreted as follows:
//! - empty or `error:` → the load is refused immediately
//! - `broken:` → the load fails asynchronously after the load latency
//! - anything else plays for the track's duration (or the configured default)

use crate::config::SimulatorSettings;
use aria_playback::{
    EventSender, Generation, PlaybackPrimitive, PrimitiveError, PrimitiveEventKind,
    PrimitiveResult, Track,
};
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Commands sent to the simulator thread
#[derive(Debug, Clone, PartialEq)]
enum SimCommand {
    Load {
        generation: Generation,
        duration: f64,
        failure: Option<String>,
    },
    Play,
    Pause,
    Stop,
    Seek(f64),
    Shutdown,
}

/// Playback primitive backed by a virtual clock
pub struct SimulatedPrimitive {
    settings: SimulatorSettings,
    commands: Option<Sender<SimCommand>>,
    worker: Option<JoinHandle<()>>,
    volume: f64,
    muted: bool,
}

impl SimulatedPrimitive {
    pub fn new(settings: SimulatorSettings) -> Self {
        Self {
            settings,
            commands: None,
            worker: None,
            volume: 1.0,
            muted: false,
        }
    }

    fn send(&self, command: SimCommand) -> PrimitiveResult {
        let Some(commands) = &self.commands else {
            return Err(PrimitiveError::Transport("simulator not attached".to_string()));
        };
        commands
            .send(command)
            .map_err(|_| PrimitiveError::Transport("simulator stopped".to_string()))
    }
}

impl PlaybackPrimitive for SimulatedPrimitive {
    fn attach(&mut self, events: EventSender) {
        let (tx, rx) = unbounded();
        let worker = Worker::new(&self.settings, events);

        match thread::Builder::new()
            .name("aria-simulator".to_string())
            .spawn(move || worker.run(&rx))
        {
            Ok(handle) => {
                self.commands = Some(tx);
                self.worker = Some(handle);
            }
            Err(e) => warn!(error = %e, "failed to start simulator thread"),
        }
    }

    fn load(&mut self, generation: Generation, track: &Track) -> PrimitiveResult {
        let source = track.source_ref.trim();
        if source.is_empty() {
            return Err(PrimitiveError::Unreachable(format!(
                "track '{}' has no source",
                track.id
            )));
        }
        if source.starts_with("error:") {
            return Err(PrimitiveError::Unsupported(source.to_string()));
        }

        let failure = source
            .starts_with("broken:")
            .then(|| format!("cannot decode {}", source));
        let duration = track
            .duration_seconds
            .filter(|d| d.is_finite() && *d > 0.0)
            .unwrap_or(self.settings.default_track_seconds);

        self.send(SimCommand::Load {
            generation,
            duration,
            failure,
        })
    }

    fn play(&mut self) -> PrimitiveResult {
        self.send(SimCommand::Play)
    }

    fn pause(&mut self) -> PrimitiveResult {
        self.send(SimCommand::Pause)
    }

    fn stop(&mut self) -> PrimitiveResult {
        self.send(SimCommand::Stop)
    }

    fn seek(&mut self, position: f64) -> PrimitiveResult {
        self.send(SimCommand::Seek(position))
    }

    fn set_volume(&mut self, volume: f64) -> PrimitiveResult {
        self.volume = volume;
        debug!(volume, "simulator volume");
        Ok(())
    }

    fn set_muted(&mut self, muted: bool) -> PrimitiveResult {
        self.muted = muted;
        debug!(muted, "simulator mute");
        Ok(())
    }

    fn release(&mut self, track: &Track) {
        debug!(track_id = %track.id, "released track resource");
    }
}

impl Drop for SimulatedPrimitive {
    fn drop(&mut self) {
        if let Some(commands) = self.commands.take() {
            // The worker may already be gone
            let _ = commands.send(SimCommand::Shutdown);
        }
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("simulator thread panicked");
            }
        }
    }
}

/// Virtual transport running on the simulator thread
struct Worker {
    events: EventSender,
    latency: Duration,
    interval: Duration,
    generation: Option<Generation>,
    duration: f64,
    position: f64,
    playing: bool,
    ready_at: Option<Instant>,
    failure: Option<String>,
    last_tick: Instant,
}

impl Worker {
    fn new(settings: &SimulatorSettings, events: EventSender) -> Self {
        Self {
            events,
            latency: Duration::from_millis(settings.load_latency_ms),
            interval: Duration::from_millis(settings.time_update_interval_ms.max(1)),
            generation: None,
            duration: 0.0,
            position: 0.0,
            playing: false,
            ready_at: None,
            failure: None,
            last_tick: Instant::now(),
        }
    }

    fn run(mut self, commands: &Receiver<SimCommand>) {
        loop {
            match commands.recv_timeout(self.interval) {
                Ok(SimCommand::Shutdown) | Err(RecvTimeoutError::Disconnected) => break,
                Ok(command) => self.apply(command, Instant::now()),
                Err(RecvTimeoutError::Timeout) => {}
            }
            self.advance(Instant::now());
        }
        debug!("simulator stopped");
    }

    fn apply(&mut self, command: SimCommand, now: Instant) {
        match command {
            SimCommand::Load {
                generation,
                duration,
                failure,
            } => {
                self.generation = Some(generation);
                self.duration = duration;
                self.position = 0.0;
                self.playing = false;
                self.failure = failure;
                self.ready_at = Some(now + self.latency);
                self.emit(PrimitiveEventKind::LoadStart);
            }
            SimCommand::Play => {
                if self.ready_at.is_none() && self.generation.is_some() && !self.playing {
                    if self.position >= self.duration {
                        self.position = 0.0;
                    }
                    self.playing = true;
                    self.last_tick = now;
                    self.emit(PrimitiveEventKind::PlayStateChanged { playing: true });
                }
            }
            SimCommand::Pause => self.halt_clock(),
            SimCommand::Stop => {
                self.halt_clock();
                self.position = 0.0;
            }
            SimCommand::Seek(position) => {
                self.position = position.clamp(0.0, self.duration);
                self.last_tick = now;
            }
            SimCommand::Shutdown => {}
        }
    }

    fn halt_clock(&mut self) {
        if self.playing {
            self.playing = false;
            self.emit(PrimitiveEventKind::PlayStateChanged { playing: false });
        }
    }

    fn advance(&mut self, now: Instant) {
        if let Some(ready_at) = self.ready_at {
            if now >= ready_at {
                self.ready_at = None;
                self.last_tick = now;
                match self.failure.take() {
                    Some(reason) => self.emit(PrimitiveEventKind::Error { reason }),
                    None => self.emit(PrimitiveEventKind::MetadataReady {
                        duration: self.duration,
                    }),
                }
            }
            return;
        }

        let elapsed = now.saturating_duration_since(self.last_tick);
        self.last_tick = now;
        if !self.playing {
            return;
        }

        self.position = (self.position + elapsed.as_secs_f64()).min(self.duration);
        self.emit(PrimitiveEventKind::TimeUpdate {
            position: self.position,
        });
        if self.position >= self.duration {
            self.playing = false;
            self.emit(PrimitiveEventKind::Ended);
        }
    }

    fn emit(&self, kind: PrimitiveEventKind) {
        if let Some(generation) = self.generation {
            self.events.emit(generation, kind);
        }
    }
}
