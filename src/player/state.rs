//! Playback state machine fed by parsed player output.

use crate::player::protocol::{MediaField, ProtocolEvent};
use std::collections::HashMap;
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex};

/// Lifecycle of the controlled player process.
///
/// Discriminants match the classic Phonon-style numbering, with an extra
/// state for "no process yet".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i8)]
pub enum PlaybackState {
    NotStarted = -1,
    Loading = 0,
    Stopped = 1,
    Playing = 2,
    Buffering = 3,
    Paused = 4,
    Error = 5,
}

/// Media metadata accumulated from the player's `-identify` output.
///
/// `ok` stays false until playback has actually started; before that the
/// other fields may be partially filled in.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MediaInfo {
    pub video_format: String,
    pub video_bitrate: i32,
    pub width: i32,
    pub height: i32,
    pub frames_per_second: f64,

    pub audio_format: String,
    pub audio_bitrate: i32,
    pub sample_rate: i32,
    pub num_channels: i32,

    pub tags: HashMap<String, String>,

    pub ok: bool,
    pub length: f64,
    pub seekable: bool,
}

/// Position reported when no status line has been seen yet.
pub const POSITION_UNKNOWN: f64 = -1.0;

/// Notifications delivered to the embedding application.
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerEvent {
    StateChanged(PlaybackState),
    PositionChanged(f64),
    /// The player reported an error; the comment is human-readable.
    Error(String),
    /// The pipe decode session died; playback control is unaffected.
    DecodeFailed(String),
}

/// Tracks playback state, media info and stream position.
///
/// Written only by the protocol thread; external callers read snapshots
/// through the surrounding mutex. All notifications leave through the event
/// channel so no listener code ever runs on the protocol thread's stack.
pub struct PlaybackTracker {
    state: PlaybackState,
    media_info: MediaInfo,
    position: f64,
    // ID_CLIP_INFO_NAMEn waiting for its ID_CLIP_INFO_VALUEn counterpart
    pending_tags: HashMap<usize, String>,
    events: Sender<PlayerEvent>,
}

pub type SharedTracker = Arc<Mutex<PlaybackTracker>>;

impl PlaybackTracker {
    pub fn new(events: Sender<PlayerEvent>) -> Self {
        Self {
            state: PlaybackState::NotStarted,
            media_info: MediaInfo::default(),
            position: POSITION_UNKNOWN,
            pending_tags: HashMap::new(),
            events,
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn media_info(&self) -> MediaInfo {
        self.media_info.clone()
    }

    pub fn position(&self) -> f64 {
        self.position
    }

    /// Applies one parsed output line.
    pub fn apply(&mut self, event: ProtocolEvent) {
        match event {
            ProtocolEvent::State(state) => self.change_state(state, None),
            ProtocolEvent::Started => {
                // No more identification output follows this line
                self.media_info.ok = true;
                self.change_state(PlaybackState::Playing, None);
            }
            ProtocolEvent::FileNotFound(path) => {
                self.change_state(PlaybackState::Error, Some(format!("File not found: {}", path)));
            }
            ProtocolEvent::Field(field) => self.apply_field(field),
            ProtocolEvent::Position(position) => {
                if position != self.position {
                    self.position = position;
                    let _ = self.events.send(PlayerEvent::PositionChanged(position));
                }
            }
        }
    }

    /// Called by the supervisor when the child exits without having printed
    /// `Exiting...` (crash, kill, broken pipe). A clean exit is treated like
    /// a normal shutdown; anything else surfaces as an error.
    pub fn process_exited(&mut self, clean: bool, detail: &str) {
        if self.state == PlaybackState::NotStarted {
            return;
        }
        if clean {
            log::debug!("player exited without announcement ({})", detail);
            self.change_state(PlaybackState::NotStarted, None);
        } else {
            log::warn!("player exited abnormally: {}", detail);
            self.change_state(
                PlaybackState::Error,
                Some(format!("player exited unexpectedly: {}", detail)),
            );
        }
    }

    fn change_state(&mut self, state: PlaybackState, comment: Option<String>) {
        self.state = state;
        let _ = self.events.send(PlayerEvent::StateChanged(state));

        match state {
            PlaybackState::NotStarted => self.reset_values(),
            PlaybackState::Error => {
                let _ = self
                    .events
                    .send(PlayerEvent::Error(comment.unwrap_or_default()));
                self.reset_values();
            }
            _ => {}
        }
    }

    fn apply_field(&mut self, field: MediaField) {
        let info = &mut self.media_info;
        match field {
            MediaField::VideoFormat(v) => info.video_format = v,
            MediaField::VideoBitrate(v) => info.video_bitrate = v,
            MediaField::VideoWidth(v) => info.width = v,
            MediaField::VideoHeight(v) => info.height = v,
            MediaField::VideoFps(v) => info.frames_per_second = v,
            MediaField::AudioFormat(v) => info.audio_format = v,
            MediaField::AudioBitrate(v) => info.audio_bitrate = v,
            MediaField::SampleRate(v) => info.sample_rate = v,
            MediaField::NumChannels(v) => info.num_channels = v,
            MediaField::Length(v) => info.length = v,
            MediaField::Seekable(v) => info.seekable = v,
            MediaField::TagName(index, name) => {
                self.pending_tags.insert(index, name);
            }
            MediaField::TagValue(index, value) => {
                if let Some(name) = self.pending_tags.remove(&index) {
                    info.tags.insert(name, value);
                }
            }
        }
    }

    // Media info and position are always cleared together, inside the same
    // critical section, so readers never observe one without the other.
    fn reset_values(&mut self) {
        self.media_info = MediaInfo::default();
        self.position = POSITION_UNKNOWN;
        self.pending_tags.clear();
    }
}
