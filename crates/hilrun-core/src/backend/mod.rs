//! # Backends
//!
//! A backend runs the firmware image and produces the text stream the
//! [`StreamInterpreter`] consumes:
//!
//! - [`JlinkBackend`]: J-Link GDB server plus an `arm-none-eabi-gdb` client;
//!   the client's stderr carries the semihosting output
//! - [`QemuBackend`]: `qemu-system-arm` with semihosting on stdout
//! - [`ReplayBackend`]: a previously captured log, for triage without hardware
//!
//! [`run`] ties a backend, a symbolizer and the interpreter together and
//! owns process teardown and the overall run deadline.

mod jlink;
mod process;
mod qemu;
mod replay;

use std::io::{self, BufRead, Write};

pub use jlink::{JlinkBackend, JLINK_READY_BANNER};
pub use qemu::QemuBackend;
pub use replay::ReplayBackend;
use tracing::{info, info_span, warn};

use self::process::{forward_lines, ChildGuard, Watchdog};
use crate::config::HarnessConfig;
use crate::error::{HarnessError, HarnessResult};
use crate::interpreter::{read_lines, RunOutcome, StreamInterpreter};
use crate::symbols::SymbolResolver;
use crate::types::{OutputLine, Verdict};

type LineSource = dyn Iterator<Item = io::Result<OutputLine>>;

/// Something that can run a firmware image and expose its output.
pub trait Backend
{
    /// Short name used in diagnostics.
    fn name(&self) -> &'static str;

    /// Launch the backend and return its output stream.
    ///
    /// Must not return before the backend is ready to produce output.
    ///
    /// ## Errors
    ///
    /// Any launch failure is fatal for the run.
    fn start(&self, config: &HarnessConfig) -> HarnessResult<Session>;
}

/// A started backend: the stream to interpret plus the processes behind it.
///
/// Dropping the session kills and reaps every process it owns.
pub struct Session
{
    stream: Box<dyn BufRead + Send>,
    /// Process producing `stream`; the run deadline kills this one.
    producer: Option<ChildGuard>,
    /// Other processes that must live as long as the run.
    companions: Vec<ChildGuard>,
    /// Line substring that means the backend lost its connection.
    connection_lost: Option<&'static str>,
}

impl Session
{
    /// Session over a plain reader with no processes attached.
    pub fn from_reader(stream: impl BufRead + Send + 'static) -> Self
    {
        Self {
            stream: Box::new(stream),
            producer: None,
            companions: Vec::new(),
            connection_lost: None,
        }
    }

    pub(crate) fn with_producer(mut self, producer: ChildGuard) -> Self
    {
        self.producer = Some(producer);
        self
    }

    pub(crate) fn with_companion(mut self, companion: ChildGuard) -> Self
    {
        self.companions.push(companion);
        self
    }

    pub(crate) fn abort_on(mut self, marker: &'static str) -> Self
    {
        self.connection_lost = Some(marker);
        self
    }
}

/// Run `config`'s image on `backend`, writing the annotated transcript to `sink`.
///
/// The symbolizer is probed before the backend starts, so a missing tool
/// aborts before any output is produced. When the configuration carries a
/// run timeout and the deadline kills the backend before a verdict, the
/// outcome is [`Verdict::Timeout`].
///
/// ## Errors
///
/// Returns fatal launch and connection errors. The caller reports them as
/// [`Verdict::Error`].
pub fn run<B, R, W>(config: &HarnessConfig, backend: &B, resolver: R, sink: &mut W) -> HarnessResult<RunOutcome>
where
    B: Backend + ?Sized,
    R: SymbolResolver,
    W: Write,
{
    let span = info_span!("run", backend = backend.name(), image = %config.image().display());
    let _enter = span.enter();

    resolver.probe()?;
    let Session {
        stream,
        producer,
        companions,
        connection_lost,
    } = backend.start(config)?;
    info!("backend ready");

    // Under a deadline the stream is read on its own thread so the run can
    // end even if a forked grandchild keeps the pipe open after the kill.
    let (watchdog, source): (Option<Watchdog>, Box<LineSource>) = match (config.run_timeout(), &producer) {
        (Some(timeout), Some(producer)) => {
            let (cutoff, lines) = forward_lines("backend-stream", stream)?;
            let watchdog = Watchdog::arm(producer.clone(), timeout, move || {
                let _ = cutoff.send(None);
            })?;
            (Some(watchdog), Box::new(lines) as Box<LineSource>)
        }
        _ => (None, Box::new(read_lines(stream)) as Box<LineSource>),
    };

    let lines = source.map(move |line| -> HarnessResult<OutputLine> {
        let line = line?;
        match connection_lost {
            Some(marker) if line.contains(marker) => Err(HarnessError::ConnectionTimeout(line.into_string())),
            _ => Ok(line),
        }
    });
    let result = StreamInterpreter::new(resolver).interpret(lines, sink);

    let timed_out = watchdog.as_ref().is_some_and(Watchdog::fired);
    drop(watchdog);
    drop(producer);
    drop(companions);

    let mut outcome = result?;
    if timed_out && outcome.verdict == Verdict::Fail {
        outcome.verdict = Verdict::Timeout;
    }
    if outcome.verdict != Verdict::Pass {
        warn!(verdict = %outcome.verdict, lines = outcome.lines_read, "run did not pass");
    }
    Ok(outcome)
}
