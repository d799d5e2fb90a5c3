//! Child process supervision for the slave-mode player.
//!
//! The player binary is spawned with all three standard streams piped. Two
//! reader threads drain stdout and stderr into a line channel, and a single
//! protocol thread parses those lines and drives the playback tracker. The
//! protocol thread also owns the `Child` handle, so waiting for process exit
//! is just joining the thread.

use crate::core::{PlayerError, Result};
use crate::player::protocol::parse_line;
use crate::player::state::SharedTracker;
use std::io::{ErrorKind, Read, Write};
use std::path::PathBuf;
use std::process::{ChildStdin, Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

/// Accumulates raw stream bytes and yields complete lines.
///
/// The player writes in unpredictable chunks, so a line can arrive split
/// across two reads; the partial tail is kept until its terminator shows up.
/// Carriage returns are treated as terminators too, which both strips them
/// and keeps `\r`-separated status updates apart.
#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds a chunk of bytes, returning every line completed by it.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(bytes);

        let mut lines = Vec::new();
        while let Some(end) = self.pending.iter().position(|&b| b == b'\n' || b == b'\r') {
            let line: Vec<u8> = self.pending.drain(..=end).take(end).collect();
            if !line.is_empty() {
                lines.push(String::from_utf8_lossy(&line).into_owned());
            }
        }
        lines
    }

    /// Flushes a trailing unterminated line, if any. Called at end of stream.
    pub fn take_remainder(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let line = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        Some(line)
    }
}

/// Thread-safe handle for writing commands to the child's stdin.
///
/// Cloned into the seek coalescer thread; a single mutex keeps interleaved
/// commands whole.
#[derive(Clone)]
pub struct CommandWriter {
    inner: Arc<Mutex<Option<Box<dyn Write + Send>>>>,
}

impl CommandWriter {
    fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(None)),
        }
    }

    fn attach(&self, stdin: ChildStdin) {
        *self.inner.lock().unwrap() = Some(Box::new(stdin));
    }

    fn detach(&self) {
        *self.inner.lock().unwrap() = None;
    }

    /// Writes one command, appending the newline terminator.
    pub fn send(&self, command: &str) -> Result<()> {
        let mut guard = self.inner.lock().unwrap();
        let stdin = guard.as_mut().ok_or(PlayerError::StdinClosed)?;
        log::debug!("sending command: {}", command);
        stdin.write_all(command.as_bytes())?;
        stdin.write_all(b"\n")?;
        stdin.flush()?;
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn for_tests(writer: Box<dyn Write + Send>) -> Self {
        let handle = Self::new();
        *handle.inner.lock().unwrap() = Some(writer);
        handle
    }
}

/// Fixed slave-mode flag set plus mode and caller arguments.
///
/// The input override points at an empty bindings file so the player never
/// interprets keyboard input on its own.
pub(crate) fn build_args(mode_args: &[String], user_args: &[String]) -> Vec<String> {
    let mut args: Vec<String> = [
        "-slave",
        "-noquiet",
        "-identify",
        "-nomouseinput",
        "-nokeepaspect",
        "-monitorpixelaspect",
        "1",
        "-input",
        "nodefault-bindings:conf=/dev/null",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();
    args.extend_from_slice(mode_args);
    args.extend_from_slice(user_args);
    args
}

/// Owns the player child process and its supervision threads.
pub struct PlayerProcess {
    player_path: PathBuf,
    writer: CommandWriter,
    running: Arc<AtomicBool>,
    supervisor: Option<JoinHandle<()>>,
    tracker: SharedTracker,
}

impl PlayerProcess {
    pub fn new(player_path: PathBuf, tracker: SharedTracker) -> Self {
        Self {
            player_path,
            writer: CommandWriter::new(),
            running: Arc::new(AtomicBool::new(false)),
            supervisor: None,
            tracker,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Shared stdin handle, also used by the seek coalescer.
    pub fn command_writer(&self) -> CommandWriter {
        self.writer.clone()
    }

    /// Launches the player, terminating any currently running instance first.
    pub fn start(&mut self, mode_args: &[String], user_args: &[String]) -> Result<()> {
        self.quit();

        let args = build_args(mode_args, user_args);
        log::info!("starting player: {} {}", self.player_path.display(), args.join(" "));

        let mut child = Command::new(&self.player_path)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| PlayerError::Spawn {
                path: self.player_path.display().to_string(),
                source: e,
            })?;

        let stdin = child.stdin.take().ok_or(PlayerError::StdinClosed)?;
        let stdout = child.stdout.take().ok_or(PlayerError::PipesUnavailable)?;
        let stderr = child.stderr.take().ok_or(PlayerError::PipesUnavailable)?;

        self.writer.attach(stdin);
        self.running.store(true, Ordering::SeqCst);

        let (line_tx, line_rx) = mpsc::channel::<String>();
        let stderr_tx = line_tx.clone();

        let tracker = self.tracker.clone();
        let running = self.running.clone();
        let writer = self.writer.clone();

        self.supervisor = Some(thread::spawn(move || {
            let stdout_reader = thread::spawn(move || drain_stream(stdout, line_tx));
            let stderr_reader = thread::spawn(move || drain_stream(stderr, stderr_tx));

            // Both output streams feed the same parser; the channel closes
            // once both readers hit end of stream.
            while let Ok(line) = line_rx.recv() {
                if let Some(event) = parse_line(&line) {
                    tracker.lock().unwrap().apply(event);
                }
            }
            let _ = stdout_reader.join();
            let _ = stderr_reader.join();

            let exit = child.wait();
            running.store(false, Ordering::SeqCst);
            writer.detach();

            match exit {
                Ok(status) => {
                    log::info!("player exited with {}", status);
                    tracker
                        .lock()
                        .unwrap()
                        .process_exited(status.success(), &status.to_string());
                }
                Err(e) => {
                    log::error!("failed to collect player exit status: {}", e);
                    tracker.lock().unwrap().process_exited(false, &e.to_string());
                }
            }
        }));

        Ok(())
    }

    /// Writes a raw slave-mode command line.
    pub fn write_command(&self, command: &str) -> Result<()> {
        self.writer.send(command)
    }

    pub fn pause(&self) -> Result<()> {
        self.write_command("pause")
    }

    pub fn stop(&self) -> Result<()> {
        self.write_command("stop")
    }

    /// Asks the player to exit and blocks until the process is gone.
    pub fn quit(&mut self) {
        if self.is_running() {
            // The child may already be on its way down; a failed write just
            // means there is nothing left to ask.
            let _ = self.writer.send("quit");
        }
        if let Some(handle) = self.supervisor.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for PlayerProcess {
    fn drop(&mut self) {
        self.quit();
    }
}

/// Reader-thread body: drains one output stream into the line channel.
fn drain_stream<R: Read>(mut stream: R, lines: Sender<String>) {
    let mut buffer = LineBuffer::new();
    let mut chunk = [0u8; 4096];

    loop {
        match stream.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => {
                for line in buffer.push(&chunk[..n]) {
                    if lines.send(line).is_err() {
                        return;
                    }
                }
            }
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => {
                log::debug!("player output stream closed: {}", e);
                break;
            }
        }
    }

    if let Some(line) = buffer.take_remainder() {
        let _ = lines.send(line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_split_across_chunks() {
        let mut buffer = LineBuffer::new();
        assert!(buffer.push(b"ID_VIDEO_W").is_empty());
        assert_eq!(buffer.push(b"IDTH=1920\n"), vec!["ID_VIDEO_WIDTH=1920"]);
    }

    #[test]
    fn test_multiple_lines_in_one_chunk() {
        let mut buffer = LineBuffer::new();
        assert_eq!(
            buffer.push(b"Playing foo.\nID_LENGTH=1.0\n"),
            vec!["Playing foo.", "ID_LENGTH=1.0"]
        );
    }

    #[test]
    fn test_carriage_returns_are_stripped() {
        let mut buffer = LineBuffer::new();
        assert_eq!(buffer.push(b"Playing foo.\r\n"), vec!["Playing foo."]);
        assert_eq!(
            buffer.push(b"A: 1.0 V: 1.0\rA: 2.0 V: 2.0\r"),
            vec!["A: 1.0 V: 1.0", "A: 2.0 V: 2.0"]
        );
    }

    #[test]
    fn test_remainder_is_flushed_only_at_end_of_stream() {
        let mut buffer = LineBuffer::new();
        assert!(buffer.push(b"Exiting..").is_empty());
        assert_eq!(buffer.take_remainder(), Some("Exiting..".to_string()));
        assert_eq!(buffer.take_remainder(), None);
    }

    #[test]
    fn test_build_args_contains_slave_mode_flags() {
        let mode = vec!["-wid".to_string(), "42".to_string()];
        let user = vec!["movie.mkv".to_string()];
        let args = build_args(&mode, &user);

        for flag in ["-slave", "-noquiet", "-identify", "-nomouseinput", "-nokeepaspect"] {
            assert!(args.contains(&flag.to_string()), "missing {}", flag);
        }
        let aspect = args.iter().position(|a| a == "-monitorpixelaspect").unwrap();
        assert_eq!(args[aspect + 1], "1");
        let input = args.iter().position(|a| a == "-input").unwrap();
        assert_eq!(args[input + 1], "nodefault-bindings:conf=/dev/null");

        // Mode flags come before caller arguments
        let wid = args.iter().position(|a| a == "-wid").unwrap();
        let media = args.iter().position(|a| a == "movie.mkv").unwrap();
        assert!(wid < media);
    }

    #[test]
    fn test_build_args_pipe_mode() {
        let mode = vec!["-vo".to_string(), "yuv4mpeg:file=/tmp/p.y4m".to_string()];
        let args = build_args(&mode, &[]);
        let vo = args.iter().position(|a| a == "-vo").unwrap();
        assert_eq!(args[vo + 1], "yuv4mpeg:file=/tmp/p.y4m");
    }
}
