//! Line-oriented command protocol
//!
//! Every stdin line is parsed into a [`Command`] and applied to the engine.

use aria_playback::{PlaybackEngine, PlaybackPrimitive, PlayerState, RepeatMode, Track};
use std::fmt::Write as _;
use std::str::FromStr;
use thiserror::Error;

pub const HELP: &str = "\
commands:
  play | pause | stop           transport control
  next | prev                   navigate the playlist
  goto <index>                  play the track at <index>
  seek <seconds>                seek within the current track
  vol <0..1> | mute             volume control
  shuffle | repeat              toggle shuffle, cycle repeat mode
  expand | show | hide          player visibility
  add <json>                    append a track or an array of tracks
  remove <index>                remove the track at <index>
  move <from> <to>              move a track within the playlist
  clear                         empty the playlist
  state                         print the current state
  quit                          save and exit";

#[derive(Debug, Error, PartialEq)]
pub enum CommandError {
    #[error("unknown command '{0}' (try 'help')")]
    Unknown(String),

    #[error("'{command}' expects {expected}")]
    MissingArgument {
        command: &'static str,
        expected: &'static str,
    },

    #[error("invalid {what}: '{value}'")]
    InvalidArgument { what: &'static str, value: String },

    #[error("invalid track JSON: {0}")]
    InvalidTracks(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Play,
    Pause,
    Stop,
    Next,
    Previous,
    Goto(usize),
    Seek(f64),
    Volume(f64),
    Mute,
    Shuffle,
    Repeat,
    Expand,
    Show,
    Hide,
    Add(Vec<Track>),
    Remove(usize),
    Move(usize, usize),
    Clear,
    State,
    Help,
    Quit,
}

/// What the input loop should do after a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };

        let command = match word.to_ascii_lowercase().as_str() {
            "play" => Command::Play,
            "pause" => Command::Pause,
            "stop" => Command::Stop,
            "next" => Command::Next,
            "prev" | "previous" => Command::Previous,
            "goto" => Command::Goto(parse_arg(rest, "goto", "a track index")?),
            "seek" => Command::Seek(parse_arg(rest, "seek", "a position in seconds")?),
            "vol" | "volume" => Command::Volume(parse_arg(rest, "vol", "a level between 0 and 1")?),
            "mute" => Command::Mute,
            "shuffle" => Command::Shuffle,
            "repeat" => Command::Repeat,
            "expand" => Command::Expand,
            "show" => Command::Show,
            "hide" => Command::Hide,
            "add" => Command::Add(parse_tracks(rest)?),
            "remove" | "rm" => Command::Remove(parse_arg(rest, "remove", "a track index")?),
            "move" | "mv" => {
                let mut args = rest.split_whitespace();
                let from = parse_arg(args.next().unwrap_or(""), "move", "two track indices")?;
                let to = parse_arg(args.next().unwrap_or(""), "move", "two track indices")?;
                Command::Move(from, to)
            }
            "clear" => Command::Clear,
            "state" | "status" => Command::State,
            "help" | "?" => Command::Help,
            "quit" | "exit" => Command::Quit,
            other => return Err(CommandError::Unknown(other.to_string())),
        };

        Ok(command)
    }
}

fn parse_arg<T: FromStr>(
    raw: &str,
    command: &'static str,
    expected: &'static str,
) -> Result<T, CommandError> {
    if raw.is_empty() {
        return Err(CommandError::MissingArgument { command, expected });
    }
    raw.parse().map_err(|_| CommandError::InvalidArgument {
        what: expected,
        value: raw.to_string(),
    })
}

/// Accept either a single track object or an array of tracks
fn parse_tracks(raw: &str) -> Result<Vec<Track>, CommandError> {
    if raw.is_empty() {
        return Err(CommandError::MissingArgument {
            command: "add",
            expected: "a track as JSON",
        });
    }

    let value: serde_json::Value =
        serde_json::from_str(raw).map_err(|e| CommandError::InvalidTracks(e.to_string()))?;
    let tracks = if value.is_array() {
        serde_json::from_value(value)
    } else {
        serde_json::from_value(value).map(|track: Track| vec![track])
    };
    tracks.map_err(|e| CommandError::InvalidTracks(e.to_string()))
}

/// Apply a command to the engine
///
/// Out-of-range indices and invalid values come back as errors for the
/// caller to report; the engine state is left untouched in that case.
pub fn run<P: PlaybackPrimitive>(
    engine: &mut PlaybackEngine<P>,
    command: Command,
) -> aria_playback::Result<Flow> {
    match command {
        Command::Play => engine.play(),
        Command::Pause => engine.pause(),
        Command::Stop => engine.stop(),
        Command::Next => engine.next(),
        Command::Previous => engine.previous(),
        Command::Goto(index) => engine.play_track_at_index(index)?,
        Command::Seek(seconds) => engine.seek(seconds)?,
        Command::Volume(level) => engine.set_volume(level)?,
        Command::Mute => engine.toggle_mute(),
        Command::Shuffle => engine.toggle_shuffle(),
        Command::Repeat => engine.toggle_repeat(),
        Command::Expand => engine.toggle_expanded(),
        Command::Show => engine.show(),
        Command::Hide => engine.hide(),
        Command::Add(tracks) => engine.add_to_playlist(tracks),
        Command::Remove(index) => engine.remove_at(index)?,
        Command::Move(from, to) => engine.move_track(from, to)?,
        Command::Clear => engine.clear_playlist(),
        Command::State => println!("{}", describe(&engine.state())),
        Command::Help => println!("{}", HELP),
        Command::Quit => return Ok(Flow::Quit),
    }
    Ok(Flow::Continue)
}

/// One-line summary of a state snapshot
pub fn summarize(state: &PlayerState) -> String {
    let status = if state.is_loading {
        "loading"
    } else if state.is_playing {
        "playing"
    } else {
        "paused"
    };

    let track = state
        .current_track()
        .map(|t| format!("{} - {}", t.artist, t.title))
        .unwrap_or_else(|| "(nothing)".to_string());

    format!(
        "[{}] {} {:.1}/{:.1}s",
        status, track, state.current_time_seconds, state.duration_seconds
    )
}

/// Multi-line description of a state snapshot, including the playlist
pub fn describe(state: &PlayerState) -> String {
    let repeat = match state.repeat_mode {
        RepeatMode::Off => "off",
        RepeatMode::All => "all",
        RepeatMode::One => "one",
    };

    let mut out = summarize(state);
    let _ = write!(
        out,
        "\nvolume {:.2}{} | shuffle {} | repeat {} | {}{}",
        state.volume,
        if state.is_muted { " (muted)" } else { "" },
        if state.shuffle_enabled { "on" } else { "off" },
        repeat,
        if state.is_visible { "visible" } else { "hidden" },
        if state.is_expanded { ", expanded" } else { "" },
    );
    if let Some(error) = &state.last_error {
        let _ = write!(out, "\nerror: {}", error);
    }
    for (i, track) in state.playlist.iter().enumerate() {
        let marker = if Some(i) == state.current_index { ">" } else { " " };
        let _ = write!(out, "\n{} {:>3}  {} - {}", marker, i, track.artist, track.title);
    }
    out
}
