//! Decode thread for the raw video pipe.
//!
//! The player writes an uncompressed 4:2:0 stream into a fifo. Reads against
//! a fifo block, so the whole session lives on its own thread: open the pipe
//! (which waits for the player to attach), parse the prologue, then loop
//! reading planes, upsampling chroma and converting to RGBA until the stream
//! ends or a stop is requested.

use crate::core::{PlayerError, Result};
use crate::pipe::color::ColorTables;
use crate::pipe::header::PipeHeader;
use crate::pipe::sink::{Frame, FrameSink};
use crate::pipe::upsample::upsample_chroma;
use crate::player::state::PlayerEvent;
use std::fs;
use std::io::{BufReader, ErrorKind, Read};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Per-frame marker preceding the planes (`FRAME\n`).
const FRAME_MARKER_LEN: usize = 6;

/// Longest prologue line the header reader will accept.
const MAX_HEADER_LEN: usize = 512;

/// A running pipe decode session.
pub struct FrameDecoder {
    stop: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
    fifo_path: PathBuf,
}

impl FrameDecoder {
    /// Creates the fifo and starts the decode thread.
    ///
    /// Decode failures never tear down playback control; they are reported
    /// through the event channel and the session simply produces no more
    /// frames.
    pub fn spawn(
        fifo_path: PathBuf,
        mut sink: Box<dyn FrameSink>,
        events: Sender<PlayerEvent>,
    ) -> Result<Self> {
        create_fifo(&fifo_path)?;

        let stop = Arc::new(AtomicBool::new(false));
        let worker = thread::spawn({
            let stop = stop.clone();
            let path = fifo_path.clone();
            move || {
                log::debug!("decode thread waiting for writer on {}", path.display());
                match fs::File::open(&path) {
                    Ok(file) => {
                        let reader = BufReader::new(file);
                        match decode_stream(reader, sink.as_mut(), &stop) {
                            Ok(frames) => {
                                log::info!("pipe stream ended after {} frames", frames);
                            }
                            Err(e) => {
                                log::warn!("decode session failed: {}", e);
                                let _ = events.send(PlayerEvent::DecodeFailed(e.to_string()));
                            }
                        }
                    }
                    Err(e) => {
                        log::warn!("failed to open fifo {}: {}", path.display(), e);
                        let _ = events.send(PlayerEvent::DecodeFailed(e.to_string()));
                    }
                }
            }
        });

        Ok(Self {
            stop,
            worker: Some(worker),
            fifo_path,
        })
    }

    pub fn fifo_path(&self) -> &Path {
        &self.fifo_path
    }

    /// Signals the decode loop to exit at the next frame boundary.
    pub fn request_stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }

    /// Stops the session: signal, join the thread, remove the fifo.
    pub fn shutdown(self) {
        drop(self);
    }
}

impl Drop for FrameDecoder {
    fn drop(&mut self) {
        self.request_stop();

        if let Some(worker) = self.worker.take() {
            if !worker.is_finished() {
                // The decode thread may still be blocked in open(), which
                // only returns once a writer attaches. Attach one from a
                // throwaway thread; if the decoder raced past already, the
                // helper parks on a fifo nobody reads and leaks harmlessly.
                let path = self.fifo_path.clone();
                thread::spawn(move || {
                    let _ = fs::OpenOptions::new().write(true).open(path);
                });
            }
            let _ = worker.join();
        }

        if let Err(e) = fs::remove_file(&self.fifo_path) {
            log::debug!("failed to remove fifo {}: {}", self.fifo_path.display(), e);
        }
    }
}

fn create_fifo(path: &Path) -> Result<()> {
    if path.exists() {
        fs::remove_file(path).map_err(|e| PlayerError::Fifo {
            path: path.to_path_buf(),
            source: e,
        })?;
    }

    let status = Command::new("mkfifo")
        .arg("-m")
        .arg("600")
        .arg(path)
        .status()
        .map_err(|e| PlayerError::Fifo {
            path: path.to_path_buf(),
            source: e,
        })?;

    if !status.success() {
        return Err(PlayerError::Fifo {
            path: path.to_path_buf(),
            source: std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("mkfifo exited with {}", status),
            ),
        });
    }
    Ok(())
}

/// Runs one decode session against an already-open stream.
///
/// Returns the number of frames emitted. End of stream between frames is a
/// normal end of session; end of stream inside a frame is an error.
pub(crate) fn decode_stream<R: Read>(
    mut reader: R,
    sink: &mut dyn FrameSink,
    stop: &AtomicBool,
) -> Result<u64> {
    let header = PipeHeader::parse(&read_header_line(&mut reader)?)?;
    log::info!(
        "pipe stream: {}x{} @ {:.3} fps",
        header.width,
        header.height,
        header.frames_per_second()
    );

    let luma_size = header.luma_size();
    let chroma_size = header.chroma_size();

    let mut marker = [0u8; FRAME_MARKER_LEN];
    let mut luma = vec![0u8; luma_size];
    // Chroma buffers are full-size so the planes can be expanded in place
    let mut cb = vec![0u8; luma_size];
    let mut cr = vec![0u8; luma_size];

    let tables = ColorTables::get();
    let mut frames = 0u64;

    loop {
        if stop.load(Ordering::SeqCst) {
            log::debug!("decode loop stopping on request");
            break;
        }

        match reader.read_exact(&mut marker) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => break,
            Err(e) => return Err(e.into()),
        }

        reader.read_exact(&mut luma)?;
        reader.read_exact(&mut cb[..chroma_size])?;
        reader.read_exact(&mut cr[..chroma_size])?;

        upsample_chroma(&mut cb, header.width, header.height);
        upsample_chroma(&mut cr, header.width, header.height);

        sink.accept(convert_frame(tables, &luma, &cb, &cr, &header));
        frames += 1;
    }

    Ok(frames)
}

fn convert_frame(
    tables: &ColorTables,
    luma: &[u8],
    cb: &[u8],
    cr: &[u8],
    header: &PipeHeader,
) -> Frame {
    let pixels = header.luma_size();
    let mut data = Vec::with_capacity(pixels * Frame::BYTES_PER_PIXEL);

    for i in 0..pixels {
        let [r, g, b] = tables.pixel(luma[i], cb[i], cr[i]);
        data.extend_from_slice(&[r, g, b, 0xff]);
    }

    Frame {
        width: header.width,
        height: header.height,
        data,
    }
}

/// Reads the prologue line, up to and excluding the terminating newline.
fn read_header_line<R: Read>(reader: &mut R) -> Result<String> {
    let mut line = Vec::new();
    let mut byte = [0u8; 1];

    loop {
        if reader.read(&mut byte)? == 0 {
            return Err(PlayerError::BadHeader("stream ended before prologue".to_string()));
        }
        if byte[0] == b'\n' {
            return Ok(String::from_utf8_lossy(&line).into_owned());
        }
        line.push(byte[0]);
        if line.len() > MAX_HEADER_LEN {
            return Err(PlayerError::BadHeader("prologue line too long".to_string()));
        }
    }
}
