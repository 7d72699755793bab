// src/system/log_reader.rs

use crate::constants::LOG_CHUNK_SIZE;
use crate::system::task::TaskInfo;
use std::io::{ErrorKind, Read};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Background copier tailing a byte stream into a task's log.
///
/// Each non-empty read of up to 360 bytes is decoded lossily and written as
/// `"<elapsed seconds>: <text>"`. Chunks are not aligned to lines or to
/// character boundaries, so a multi-byte character split across two reads is
/// replaced by U+FFFD on both sides.
#[derive(Debug)]
pub struct LogReader {
    label: String,
    handle: JoinHandle<()>,
}

impl LogReader {
    /// Starts tailing `source` into `task`'s log on a detached thread.
    pub fn spawn<R>(label: &str, source: R, task: Arc<TaskInfo>) -> std::io::Result<Self>
    where
        R: Read + Send + 'static,
    {
        let thread_label = label.to_string();
        let handle = thread::Builder::new()
            .name(format!("log-{label}"))
            .spawn(move || copy_chunks(&thread_label, source, &task))?;
        Ok(Self {
            label: label.to_string(),
            handle,
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Waits up to `timeout` for the stream to reach its end. On timeout the
    /// thread is left running detached and `false` is returned.
    pub fn join_timeout(self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while !self.handle.is_finished() {
            if Instant::now() >= deadline {
                log::debug!("Log reader '{}' still busy; detaching it.", self.label);
                return false;
            }
            thread::sleep(Duration::from_millis(10));
        }
        self.handle.join().is_ok()
    }
}

fn copy_chunks<R: Read>(label: &str, mut source: R, task: &TaskInfo) {
    let mut buffer = [0u8; LOG_CHUNK_SIZE];
    loop {
        match source.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => {
                let chunk = buffer.get(..n).unwrap_or_default();
                let text = String::from_utf8_lossy(chunk);
                let elapsed = task.elapsed_seconds().unwrap_or(0);
                log::trace!("[{} {}] {} bytes", task.id(), label, n);
                task.log().write(&format!("{elapsed}: {text}"));
            }
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => {
                log::debug!("Log reader '{}' stopped: {}", label, e);
                break;
            }
        }
    }
}
