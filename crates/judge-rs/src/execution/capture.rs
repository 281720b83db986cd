//! Output capture for the submission's pipes
//!
//! A reader thread per pipe appends bytes into a shared buffer as they
//! arrive, so whatever was written before a kill is still there afterwards.
//! Past the cap the reader keeps draining the pipe (a full pipe would block
//! the writer) but discards the excess and marks the capture truncated.

use std::io::{self, Read};
use std::sync::mpsc::{channel, Receiver, RecvTimeoutError};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use judge_checker::CapturedOutput;
use judge_core::{JudgeError, Result};
use log::debug;

const READ_CHUNK: usize = 8192;

#[derive(Debug, Default)]
struct CaptureBuffer {
    bytes: Vec<u8>,
    truncated: bool,
}

/// Shared, append-only byte buffer
#[derive(Debug, Clone, Default)]
pub struct OutputCapture {
    inner: Arc<Mutex<CaptureBuffer>>,
}

impl OutputCapture {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, CaptureBuffer> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Append bytes, keeping at most `cap` in total. Returns false once
    /// anything has been discarded.
    pub fn append(&self, bytes: &[u8], cap: usize) -> bool {
        let mut buffer = self.lock();
        let room = cap.saturating_sub(buffer.bytes.len());
        if bytes.len() > room {
            buffer.bytes.extend_from_slice(&bytes[..room]);
            buffer.truncated = true;
            return false;
        }
        buffer.bytes.extend_from_slice(bytes);
        !buffer.truncated
    }

    /// Copy of everything captured so far
    pub fn snapshot(&self) -> CapturedOutput {
        let buffer = self.lock();
        CapturedOutput::new(buffer.bytes.clone(), buffer.truncated)
    }

    pub fn len(&self) -> usize {
        self.lock().bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_truncated(&self) -> bool {
        self.lock().truncated
    }
}

/// Completion signal for one reader thread
pub struct ReaderHandle {
    done: Receiver<u64>,
}

impl ReaderHandle {
    /// Wait up to `grace` for the pipe to reach end-of-file. Returns false if
    /// the pipe is still open, e.g. held by an escaped descendant.
    pub fn wait(&self, grace: Duration) -> bool {
        match self.done.recv_timeout(grace) {
            Ok(_) => true,
            Err(RecvTimeoutError::Timeout) => false,
            Err(RecvTimeoutError::Disconnected) => true,
        }
    }
}

/// Spawn a thread that drains `reader` into `capture` until end-of-file
pub fn spawn_reader<R>(
    name: &str,
    mut reader: R,
    capture: OutputCapture,
    cap: usize,
) -> Result<ReaderHandle>
where
    R: Read + Send + 'static,
{
    let (tx, rx) = channel();
    let label = name.to_string();

    thread::Builder::new()
        .name(format!("judge-{}", name))
        .spawn(move || {
            let mut chunk = [0u8; READ_CHUNK];
            let mut total: u64 = 0;
            loop {
                match reader.read(&mut chunk) {
                    Ok(0) => break,
                    Ok(n) => {
                        total += n as u64;
                        capture.append(&chunk[..n], cap);
                    }
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                    Err(e) => {
                        debug!("{} reader stopped: {}", label, e);
                        break;
                    }
                }
            }
            let _ = tx.send(total);
        })
        .map_err(JudgeError::Io)?;

    Ok(ReaderHandle { done: rx })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_append_and_snapshot() {
        let capture = OutputCapture::new();
        assert!(capture.is_empty());
        assert!(capture.append(b"hello ", 64));
        assert!(capture.append(b"world", 64));

        let output = capture.snapshot();
        assert_eq!(output.bytes(), b"hello world");
        assert!(!output.is_truncated());
    }

    #[test]
    fn test_append_past_cap_truncates() {
        let capture = OutputCapture::new();
        assert!(capture.append(b"1234", 6));
        assert!(!capture.append(b"5678", 6));
        assert!(!capture.append(b"9", 6));

        let output = capture.snapshot();
        assert_eq!(output.bytes(), b"123456");
        assert!(output.is_truncated());
        assert_eq!(capture.len(), 6);
    }

    #[test]
    fn test_clones_share_the_buffer() {
        let capture = OutputCapture::new();
        let writer = capture.clone();
        writer.append(b"shared", 64);
        assert_eq!(capture.snapshot().bytes(), b"shared");
    }

    #[test]
    fn test_reader_drains_to_eof() {
        let capture = OutputCapture::new();
        let data = vec![b'x'; READ_CHUNK * 3 + 17];
        let handle = spawn_reader("stdout", Cursor::new(data.clone()), capture.clone(), usize::MAX)
            .unwrap();

        assert!(handle.wait(Duration::from_secs(5)));
        assert_eq!(capture.snapshot().bytes(), data.as_slice());
    }

    #[test]
    fn test_reader_keeps_draining_past_cap() {
        let capture = OutputCapture::new();
        let data = vec![b'y'; 100_000];
        let handle = spawn_reader("stdout", Cursor::new(data), capture.clone(), 1000).unwrap();

        assert!(handle.wait(Duration::from_secs(5)));
        assert_eq!(capture.len(), 1000);
        assert!(capture.is_truncated());
    }
}
