//! Destination for decoded frames.

use std::sync::mpsc::Sender;

/// One decoded video frame, tightly packed RGBA.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub width: usize,
    pub height: usize,
    /// `width * height * BYTES_PER_PIXEL` bytes, row-major.
    pub data: Vec<u8>,
}

impl Frame {
    pub const BYTES_PER_PIXEL: usize = 4;
}

/// Receives ownership of each decoded frame.
///
/// The concrete sink is chosen when the decode session is constructed; the
/// decoder itself neither knows nor cares where frames end up and keeps no
/// reference after handoff.
pub trait FrameSink: Send {
    fn accept(&mut self, frame: Frame);
}

/// Sink that forwards frames over a channel to a consumer on another thread.
pub struct ChannelSink {
    frames: Sender<Frame>,
}

impl ChannelSink {
    pub fn new(frames: Sender<Frame>) -> Self {
        Self { frames }
    }
}

impl FrameSink for ChannelSink {
    fn accept(&mut self, frame: Frame) {
        if self.frames.send(frame).is_err() {
            log::debug!("frame receiver is gone, dropping frame");
        }
    }
}
