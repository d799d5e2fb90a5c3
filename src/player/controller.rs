//! Facade owning the player process, seek coalescer and decode session.

use crate::core::{PlayerConfig, Result, VideoMode};
use crate::pipe::{ChannelSink, Frame, FrameDecoder};
use crate::player::process::PlayerProcess;
use crate::player::seek::{SeekCoalescer, SeekMode};
use crate::player::state::{
    MediaInfo, PlaybackState, PlaybackTracker, PlayerEvent, SharedTracker,
};
use std::path::PathBuf;
use std::sync::mpsc::{Receiver, Sender};
use std::sync::{mpsc, Arc, Mutex};

/// Single owner of one player instance and everything attached to it.
///
/// All mutations of playback state come from the player's own output; the
/// methods here only send commands downstream and read snapshots. Events and
/// decoded frames are consumed by polling, so no library code ever calls
/// back into the embedder.
pub struct PlayerController {
    config: PlayerConfig,
    tracker: SharedTracker,
    process: PlayerProcess,
    seek: SeekCoalescer,
    decoder: Option<FrameDecoder>,

    event_tx: Sender<PlayerEvent>,
    events: Receiver<PlayerEvent>,
    frame_tx: Sender<Frame>,
    frames: Receiver<Frame>,
}

impl PlayerController {
    pub fn new(config: PlayerConfig) -> Self {
        let (event_tx, events) = mpsc::channel();
        let (frame_tx, frames) = mpsc::channel();

        let tracker: SharedTracker =
            Arc::new(Mutex::new(PlaybackTracker::new(event_tx.clone())));
        let process = PlayerProcess::new(config.player_path.clone(), tracker.clone());
        let seek = SeekCoalescer::new(process.command_writer());

        Self {
            config,
            tracker,
            process,
            seek,
            decoder: None,
            event_tx,
            events,
            frame_tx,
            frames,
        }
    }

    /// Starts playback of the given media arguments, terminating any
    /// currently running player instance first.
    pub fn start(&mut self, args: &[String]) -> Result<()> {
        self.teardown_session();

        let mode_args = match &self.config.video_mode {
            VideoMode::Embedded { window_id } => {
                let mut mode_args = vec!["-wid".to_string(), window_id.to_string()];
                if let Some(driver) = &self.config.video_output {
                    mode_args.push("-vo".to_string());
                    mode_args.push(driver.clone());
                }
                mode_args
            }
            VideoMode::Pipe => {
                let fifo = self.fifo_path();
                let sink = Box::new(ChannelSink::new(self.frame_tx.clone()));
                let decoder = FrameDecoder::spawn(fifo.clone(), sink, self.event_tx.clone())?;
                self.decoder = Some(decoder);
                vec![
                    "-vo".to_string(),
                    format!("yuv4mpeg:file={}", fifo.display()),
                ]
            }
        };

        if let Err(e) = self.process.start(&mode_args, args) {
            if let Some(decoder) = self.decoder.take() {
                decoder.shutdown();
            }
            return Err(e);
        }
        Ok(())
    }

    /// Resumes playback if currently paused.
    pub fn play(&self) -> Result<()> {
        if self.state() == PlaybackState::Paused {
            self.process.pause()?;
        }
        Ok(())
    }

    /// Pauses playback if currently playing.
    pub fn pause(&self) -> Result<()> {
        if self.state() == PlaybackState::Playing {
            self.process.pause()?;
        }
        Ok(())
    }

    /// Stops playback, keeping the player process around.
    pub fn stop(&self) -> Result<()> {
        self.process.stop()
    }

    /// Shuts the player down and blocks until the process has exited; the
    /// decode session is then joined and its fifo removed.
    pub fn quit(&mut self) {
        if let Some(decoder) = &self.decoder {
            decoder.request_stop();
        }
        // Quitting the child first detaches the pipe's writer, so a decode
        // thread blocked mid-read runs into end of stream instead of hanging
        self.process.quit();
        if let Some(decoder) = self.decoder.take() {
            decoder.shutdown();
        }
    }

    /// Schedules a debounced seek.
    pub fn seek(&self, offset: f64, mode: SeekMode) {
        self.seek.request(offset, mode);
    }

    /// Seek variant for callers holding a raw mode number, e.g. a slider
    /// binding. An unknown mode fails without scheduling anything and
    /// without touching a pending seek.
    pub fn seek_raw(&self, offset: f64, whence: i32) -> Result<()> {
        let mode =
            SeekMode::from_code(whence).ok_or(crate::core::PlayerError::InvalidSeekMode(whence))?;
        self.seek(offset, mode);
        Ok(())
    }

    /// Sends a raw slave-mode command line, newline appended internally.
    ///
    /// Escape hatch for the parts of the protocol this interface does not
    /// wrap; see the MPlayer slave-mode documentation for the full list.
    pub fn write_command(&self, command: &str) -> Result<()> {
        self.process.write_command(command)
    }

    pub fn adjust_audio_delay(&self, seconds: f64) -> Result<()> {
        self.write_command(&format!("audio_delay {}", seconds))
    }

    pub fn adjust_sub_delay(&self, seconds: f64) -> Result<()> {
        self.write_command(&format!("sub_delay {}", seconds))
    }

    pub fn adjust_volume(&self, step: i32) -> Result<()> {
        self.write_command(&format!("volume {}", step))
    }

    pub fn state(&self) -> PlaybackState {
        self.tracker.lock().unwrap().state()
    }

    pub fn media_info(&self) -> MediaInfo {
        self.tracker.lock().unwrap().media_info()
    }

    /// Last reported stream position in seconds, or -1 when unknown.
    pub fn tell(&self) -> f64 {
        self.tracker.lock().unwrap().position()
    }

    pub fn is_running(&self) -> bool {
        self.process.is_running()
    }

    /// Drains all pending notifications.
    pub fn poll_events(&self) -> Vec<PlayerEvent> {
        self.events.try_iter().collect()
    }

    /// Drains all frames decoded since the last poll (pipe mode only).
    pub fn poll_frames(&self) -> Vec<Frame> {
        self.frames.try_iter().collect()
    }

    fn fifo_path(&self) -> PathBuf {
        self.config
            .fifo_directory
            .join(format!("mplayer-host-{}.y4m", std::process::id()))
    }

    fn teardown_session(&mut self) {
        if self.decoder.is_some() || self.process.is_running() {
            self.quit();
        }
    }
}

impl Drop for PlayerController {
    fn drop(&mut self) {
        self.quit();
    }
}
