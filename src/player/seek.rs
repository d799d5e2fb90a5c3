//! Debouncing of rapid seek requests.
//!
//! Sliders and scroll wheels produce bursts of seek requests; only the last
//! one within the quiescence window should reach the player. Requests go
//! through a channel to a dedicated thread that keeps replacing the pending
//! command until the burst dies down, then writes it once.

use crate::player::process::CommandWriter;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Interpretation of a seek offset, numbered the way the slave protocol
/// expects it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekMode {
    Relative = 0,
    Percentage = 1,
    Absolute = 2,
}

impl SeekMode {
    pub fn code(self) -> i32 {
        self as i32
    }

    /// Maps a raw mode number, e.g. from a UI binding table. Anything outside
    /// 0..=2 is rejected before a seek is ever scheduled.
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(SeekMode::Relative),
            1 => Some(SeekMode::Percentage),
            2 => Some(SeekMode::Absolute),
            _ => None,
        }
    }
}

pub struct SeekCoalescer {
    requests: Option<Sender<String>>,
    worker: Option<JoinHandle<()>>,
}

impl SeekCoalescer {
    /// Quiescence window before a pending seek is actually sent.
    pub const DEBOUNCE: Duration = Duration::from_millis(50);

    pub fn new(writer: CommandWriter) -> Self {
        let (tx, rx) = mpsc::channel();
        let worker = thread::spawn(move || Self::run(rx, writer));
        Self {
            requests: Some(tx),
            worker: Some(worker),
        }
    }

    /// Schedules a seek, replacing any still-pending one and restarting the
    /// debounce window.
    pub fn request(&self, offset: f64, mode: SeekMode) {
        let command = format!("seek {} {}", offset, mode.code());
        if let Some(requests) = &self.requests {
            if requests.send(command).is_err() {
                log::warn!("seek worker is gone, dropping request");
            }
        }
    }

    fn run(requests: Receiver<String>, writer: CommandWriter) {
        while let Ok(mut command) = requests.recv() {
            // Newer requests within the window replace the pending command
            // and reset the clock.
            loop {
                match requests.recv_timeout(Self::DEBOUNCE) {
                    Ok(newer) => command = newer,
                    Err(RecvTimeoutError::Timeout) => break,
                    Err(RecvTimeoutError::Disconnected) => break,
                }
            }
            if let Err(e) = writer.send(&command) {
                log::warn!("failed to send '{}': {}", command, e);
            }
        }
        log::debug!("seek worker terminating");
    }
}

impl Drop for SeekCoalescer {
    fn drop(&mut self) {
        // Closing the channel lets the worker drain and exit
        self.requests.take();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl SharedBuffer {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    #[test]
    fn test_burst_collapses_to_last_request() {
        let buffer = SharedBuffer::default();
        let writer = CommandWriter::for_tests(Box::new(buffer.clone()));
        let coalescer = SeekCoalescer::new(writer);

        coalescer.request(10.0, SeekMode::Relative);
        coalescer.request(20.0, SeekMode::Relative);
        coalescer.request(30.0, SeekMode::Absolute);

        std::thread::sleep(SeekCoalescer::DEBOUNCE * 5);
        assert_eq!(buffer.contents(), "seek 30 2\n");
    }

    #[test]
    fn test_separated_requests_are_sent_individually() {
        let buffer = SharedBuffer::default();
        let writer = CommandWriter::for_tests(Box::new(buffer.clone()));
        let coalescer = SeekCoalescer::new(writer);

        coalescer.request(25.0, SeekMode::Percentage);
        std::thread::sleep(SeekCoalescer::DEBOUNCE * 5);
        coalescer.request(-10.0, SeekMode::Relative);
        std::thread::sleep(SeekCoalescer::DEBOUNCE * 5);

        assert_eq!(buffer.contents(), "seek 25 1\nseek -10 0\n");
    }

    #[test]
    fn test_pending_request_survives_drop() {
        let buffer = SharedBuffer::default();
        let writer = CommandWriter::for_tests(Box::new(buffer.clone()));
        let coalescer = SeekCoalescer::new(writer);

        coalescer.request(5.5, SeekMode::Absolute);
        drop(coalescer);

        assert_eq!(buffer.contents(), "seek 5.5 2\n");
    }

    #[test]
    fn test_mode_codes() {
        assert_eq!(SeekMode::from_code(0), Some(SeekMode::Relative));
        assert_eq!(SeekMode::from_code(1), Some(SeekMode::Percentage));
        assert_eq!(SeekMode::from_code(2), Some(SeekMode::Absolute));
        assert_eq!(SeekMode::from_code(3), None);
        assert_eq!(SeekMode::from_code(-1), None);
        assert_eq!(SeekMode::Percentage.code(), 1);
    }
}
