//! Remote control for an MPlayer process running in slave mode.
//!
//! The player is spawned as a child process and driven through newline
//! terminated text commands on its stdin. Everything it prints on stdout and
//! stderr is parsed into typed events that feed a playback state machine, so
//! embedders can observe state transitions, media metadata and position
//! updates without touching the wire protocol themselves.
//!
//! When the player cannot render into a host window it is pointed at a named
//! pipe instead (`-vo yuv4mpeg`), and a decoder thread turns the raw 4:2:0
//! stream into RGBA frames delivered over a channel.

pub mod core;
pub mod pipe;
pub mod player;

pub use crate::core::{PlayerConfig, PlayerError, VideoMode};
pub use crate::pipe::{ChannelSink, Frame, FrameDecoder, FrameSink, PipeHeader};
pub use crate::player::{
    MediaInfo, PlaybackState, PlayerController, PlayerEvent, SeekMode,
};
