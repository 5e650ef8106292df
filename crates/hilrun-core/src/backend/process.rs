//! Child process helpers shared by the backends.

use std::io::{self, BufRead, BufReader, ErrorKind, Read};
use std::path::Path;
use std::process::{Child, Command};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, trace, warn};

use crate::error::{HarnessError, HarnessResult};
use crate::interpreter::read_lines;
use crate::types::line::decode_lenient;
use crate::types::OutputLine;

/// Spawn `command`, reporting a missing executable as [`HarnessError::ToolNotFound`].
pub(crate) fn spawn(command: &mut Command, tool: &Path, hint: &'static str) -> HarnessResult<Child>
{
    debug!(tool = %tool.display(), args = ?command.get_args().collect::<Vec<_>>(), "spawning");
    command.spawn().map_err(|err| {
        if err.kind() == ErrorKind::NotFound {
            HarnessError::ToolNotFound {
                tool: tool.display().to_string(),
                hint,
            }
        } else {
            HarnessError::Io(err)
        }
    })
}

/// Shared handle to a child process that is killed and reaped on drop.
#[derive(Debug, Clone)]
pub(crate) struct ChildGuard
{
    name: String,
    child: Arc<Mutex<Child>>,
}

impl ChildGuard
{
    pub(crate) fn new(name: impl Into<String>, child: Child) -> Self
    {
        Self {
            name: name.into(),
            child: Arc::new(Mutex::new(child)),
        }
    }

    /// Exit status if the process has already exited.
    pub(crate) fn try_status(&self) -> Option<String>
    {
        let mut child = self.child.lock().ok()?;
        match child.try_wait() {
            Ok(Some(status)) => Some(status.to_string()),
            Ok(None) => None,
            Err(err) => Some(err.to_string()),
        }
    }

    pub(crate) fn kill(&self)
    {
        if let Ok(mut child) = self.child.lock() {
            if let Ok(None) = child.try_wait() {
                trace!(name = %self.name, "killing");
                let _ = child.kill();
            }
            let _ = child.wait();
        }
    }
}

impl Drop for ChildGuard
{
    fn drop(&mut self)
    {
        // Clones share the process; only the last handle tears it down.
        if Arc::strong_count(&self.child) == 1 {
            self.kill();
        }
    }
}

/// Read a pipe to the end on a named thread, returning what it produced.
pub(crate) fn collect<R>(name: &str, pipe: R) -> HarnessResult<JoinHandle<String>>
where
    R: Read + Send + 'static,
{
    let handle = thread::Builder::new().name(name.to_string()).spawn(move || {
        let mut raw = Vec::new();
        let mut reader = BufReader::new(pipe);
        if let Err(err) = reader.read_to_end(&mut raw) {
            warn!(error = %err, "failed reading child output");
        }
        decode_lenient(&raw)
    })?;
    Ok(handle)
}

/// Keep a pipe drained on a named thread, logging each line at debug level.
pub(crate) fn drain_to_log<R>(name: &str, pipe: R) -> HarnessResult<()>
where
    R: Read + Send + 'static,
{
    let target = name.to_string();
    thread::Builder::new().name(name.to_string()).spawn(move || {
        let mut reader = BufReader::new(pipe);
        let mut buf = Vec::new();
        while let Ok(n) = reader.read_until(b'\n', &mut buf) {
            if n == 0 {
                break;
            }
            let line = decode_lenient(&buf);
            debug!(pipe = %target, line = line.trim_end(), "child output");
            buf.clear();
        }
    })?;
    Ok(())
}

/// Read a pipe line by line on a named thread, signalling once a line
/// containing `banner` shows up.
///
/// The channel yields `Ok(())` on the banner, or `Err(output)` with
/// everything read if the pipe closes first. Lines after the banner are
/// drained and logged so the child never blocks on a full pipe.
pub(crate) fn watch_for_banner<R>(
    name: &str,
    pipe: R,
    banner: &'static str,
) -> HarnessResult<mpsc::Receiver<Result<(), String>>>
where
    R: Read + Send + 'static,
{
    let (tx, rx) = mpsc::channel();
    thread::Builder::new().name(name.to_string()).spawn(move || {
        let mut seen = String::new();
        let mut ready = false;
        let mut reader = BufReader::new(pipe);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf) {
                Ok(0) | Err(_) => break,
                Ok(_) => {}
            }
            let line = decode_lenient(&buf);
            trace!(line = line.trim_end(), "backend");
            if !ready {
                seen.push_str(&line);
                if line.contains(banner) {
                    ready = true;
                    let _ = tx.send(Ok(()));
                }
            }
        }
        if !ready {
            let _ = tx.send(Err(seen));
        }
    })?;
    Ok(rx)
}

/// Message on a forwarded line channel; `None` ends the stream.
pub(crate) type Forwarded = Option<io::Result<OutputLine>>;

/// Lines read from a backend stream on a separate thread.
///
/// Iteration ends at end of stream, at the first read error, or as soon as
/// anyone holding the cutoff sender sends `None`, even while the reader
/// thread is still blocked on a pipe some other process keeps open.
pub(crate) struct ForwardedLines
{
    rx: mpsc::Receiver<Forwarded>,
}

impl Iterator for ForwardedLines
{
    type Item = io::Result<OutputLine>;

    fn next(&mut self) -> Option<Self::Item>
    {
        self.rx.recv().ok().flatten()
    }
}

/// Read `stream` on a named thread. Returns a cutoff sender and the lines.
pub(crate) fn forward_lines<R>(name: &str, stream: R) -> HarnessResult<(mpsc::Sender<Forwarded>, ForwardedLines)>
where
    R: BufRead + Send + 'static,
{
    let (tx, rx) = mpsc::channel();
    let reader_tx = tx.clone();
    thread::Builder::new().name(name.to_string()).spawn(move || {
        for line in read_lines(stream) {
            let failed = line.is_err();
            if reader_tx.send(Some(line)).is_err() || failed {
                return;
            }
        }
        let _ = reader_tx.send(None);
    })?;
    Ok((tx, ForwardedLines { rx }))
}

/// Kills a child once a deadline passes, unless disarmed first.
pub(crate) struct Watchdog
{
    fired: Arc<AtomicBool>,
    disarm: Option<mpsc::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl Watchdog
{
    /// Start the countdown. At the deadline `target` is killed and then
    /// `on_fire` runs.
    pub(crate) fn arm<F>(target: ChildGuard, timeout: Duration, on_fire: F) -> HarnessResult<Self>
    where
        F: FnOnce() + Send + 'static,
    {
        let fired = Arc::new(AtomicBool::new(false));
        let (tx, rx) = mpsc::channel::<()>();
        let flag = Arc::clone(&fired);
        let handle = thread::Builder::new().name("watchdog".to_string()).spawn(move || {
            if let Err(RecvTimeoutError::Timeout) = rx.recv_timeout(timeout) {
                warn!(timeout_ms = timeout.as_millis(), "run timed out, killing backend");
                flag.store(true, Ordering::SeqCst);
                target.kill();
                on_fire();
            }
        })?;

        Ok(Self {
            fired,
            disarm: Some(tx),
            handle: Some(handle),
        })
    }

    /// Whether the deadline passed and the child was killed.
    pub(crate) fn fired(&self) -> bool
    {
        self.fired.load(Ordering::SeqCst)
    }
}

impl Drop for Watchdog
{
    fn drop(&mut self)
    {
        drop(self.disarm.take());
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
