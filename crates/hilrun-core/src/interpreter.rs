//! # Stream Interpreter
//!
//! Drives classification and annotation over a backend's output, one line
//! at a time, in arrival order, and derives the run's verdict.
//!
//! ```text
//! Running --line--> classify --Noise--> (dropped)            --> Running
//!                            --other--> annotate --> emit     --> Running
//!                            --Verdict(v)--> annotate --> emit --> Terminated(v)
//! (a register or banner line starting with `OK` also terminates with Pass)
//! Running --end of stream-------------------------------------> Terminated(Fail)
//! ```
//!
//! The interpreter is synchronous and single-threaded. It never decides
//! `Timeout`; a run killed from outside simply ends its stream and the
//! supervising caller maps that to a timeout.

use std::io::{self, BufRead, Write};

use tracing::{debug, info, trace};

use crate::annotate::{FaultAnnotator, ParseState};
use crate::classify::{classify, verdict_marker, LineKind};
use crate::error::HarnessResult;
use crate::symbols::SymbolResolver;
use crate::types::{OutputLine, Verdict};

/// Result of feeding one line to the interpreter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Feed
{
    /// Noise line, not part of the transcript.
    Suppressed,
    /// Line to append to the transcript.
    Emit(OutputLine),
    /// Line to append to the transcript; the run is now over.
    Terminate(OutputLine, Verdict),
    /// A verdict was already reached; the line was not looked at.
    Ignored,
}

/// Final result of interpreting one stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome
{
    pub verdict: Verdict,
    /// Emitted lines, noise removed, annotations applied. Empty unless the
    /// interpreter was built with [`StreamInterpreter::keep_transcript`].
    pub transcript: Vec<String>,
    /// Lines consumed from the backend, including suppressed ones.
    pub lines_read: usize,
    /// Lines dropped as noise.
    pub suppressed: usize,
}

/// Stateful line-by-line interpreter for one run.
pub struct StreamInterpreter<R>
{
    annotator: FaultAnnotator<R>,
    state: ParseState,
    transcript: Option<Vec<String>>,
    lines_read: usize,
    suppressed: usize,
}

impl<R: SymbolResolver> StreamInterpreter<R>
{
    pub fn new(resolver: R) -> Self
    {
        Self {
            annotator: FaultAnnotator::new(resolver),
            state: ParseState::new(),
            transcript: None,
            lines_read: 0,
            suppressed: 0,
        }
    }

    /// Also collect emitted lines into [`RunOutcome::transcript`].
    #[must_use]
    pub fn keep_transcript(mut self) -> Self
    {
        self.transcript = Some(Vec::new());
        self
    }

    #[must_use]
    pub fn state(&self) -> &ParseState
    {
        &self.state
    }

    /// Whether a verdict has been reached.
    #[must_use]
    pub fn is_terminated(&self) -> bool
    {
        self.state.verdict().is_some()
    }

    /// Process one line of raw backend output.
    pub fn feed(&mut self, raw: &str) -> Feed
    {
        self.feed_line(OutputLine::sanitize(raw))
    }

    /// Process one already sanitized line.
    pub fn feed_line(&mut self, line: OutputLine) -> Feed
    {
        if self.is_terminated() {
            return Feed::Ignored;
        }
        self.lines_read += 1;

        let kind = classify(&line);
        trace!(?kind, line = %line, "classified");
        if kind == LineKind::Noise {
            self.suppressed += 1;
            return Feed::Suppressed;
        }

        let line = self.annotator.annotate(line, kind, &mut self.state);
        if let Some(transcript) = &mut self.transcript {
            transcript.push(line.as_str().to_string());
        }

        let verdict = match kind {
            LineKind::Verdict(verdict) => Some(verdict),
            _ => verdict_marker(&line),
        };
        match verdict {
            Some(verdict) => {
                self.state.set_verdict(verdict);
                info!(%verdict, "verdict marker seen");
                Feed::Terminate(line, verdict)
            }
            None => Feed::Emit(line),
        }
    }

    /// Conclude the run. Without a verdict marker the run failed.
    #[must_use]
    pub fn finish(self) -> RunOutcome
    {
        let verdict = self.state.verdict().unwrap_or_else(|| {
            debug!(lines = self.lines_read, "stream ended without a pass marker");
            Verdict::Fail
        });

        RunOutcome {
            verdict,
            transcript: self.transcript.unwrap_or_default(),
            lines_read: self.lines_read,
            suppressed: self.suppressed,
        }
    }

    /// Interpret `lines` until a verdict or the end of the stream, writing
    /// every emitted line to `sink` as it is produced.
    ///
    /// ## Errors
    ///
    /// Propagates the first error yielded by `lines` and any error writing
    /// to `sink`.
    pub fn interpret<I, W>(mut self, lines: I, sink: &mut W) -> HarnessResult<RunOutcome>
    where
        I: IntoIterator<Item = HarnessResult<OutputLine>>,
        W: Write,
    {
        for line in lines {
            match self.feed_line(line?) {
                Feed::Emit(line) => write_line(sink, &line)?,
                Feed::Terminate(line, _) => {
                    write_line(sink, &line)?;
                    break;
                }
                Feed::Suppressed | Feed::Ignored => {}
            }
        }
        Ok(self.finish())
    }

    /// Interpret everything readable from `reader`.
    ///
    /// ## Errors
    ///
    /// Returns read errors from `reader` and write errors from `sink`.
    pub fn run<B, W>(self, reader: B, sink: &mut W) -> HarnessResult<RunOutcome>
    where
        B: BufRead,
        W: Write,
    {
        self.interpret(read_lines(reader).map(|line| line.map_err(Into::into)), sink)
    }
}

fn write_line<W: Write>(sink: &mut W, line: &OutputLine) -> io::Result<()>
{
    writeln!(sink, "{line}")?;
    sink.flush()
}

/// Iterator over leniently decoded, sanitized lines of a byte stream.
pub struct Lines<B>
{
    reader: B,
    buf: Vec<u8>,
}

/// Split `reader` into [`OutputLine`]s without failing on invalid UTF-8.
pub fn read_lines<B: BufRead>(reader: B) -> Lines<B>
{
    Lines {
        reader,
        buf: Vec::with_capacity(256),
    }
}

impl<B: BufRead> Iterator for Lines<B>
{
    type Item = io::Result<OutputLine>;

    fn next(&mut self) -> Option<Self::Item>
    {
        self.buf.clear();
        match self.reader.read_until(b'\n', &mut self.buf) {
            Ok(0) => None,
            Ok(_) => Some(Ok(OutputLine::from_bytes(&self.buf))),
            Err(err) => Some(Err(err)),
        }
    }
}

#[cfg(test)]
mod tests
{
    use std::io::Cursor;

    use super::*;
    use crate::symbols::FnResolver;
    use crate::types::Location;

    fn fixed(location: &'static str) -> impl SymbolResolver
    {
        FnResolver::new(move |_: &str| Ok(Location::new(location)))
    }

    #[test]
    fn feed_after_verdict_is_ignored()
    {
        let mut interp = StreamInterpreter::new(fixed("a.c:1")).keep_transcript();
        assert!(matches!(interp.feed("OK"), Feed::Terminate(_, Verdict::Pass)));
        assert_eq!(interp.feed("garbage"), Feed::Ignored);
        assert_eq!(interp.feed("OK"), Feed::Ignored);

        let outcome = interp.finish();
        assert_eq!(outcome.verdict, Verdict::Pass);
        assert_eq!(outcome.transcript, vec!["OK"]);
        assert_eq!(outcome.lines_read, 1);
    }

    #[test]
    fn run_handles_crlf_and_invalid_bytes()
    {
        let input: &[u8] = b"hello\r\n\xfftest\r\nOK\r\n";
        let mut sink = Vec::new();
        let outcome = StreamInterpreter::new(fixed("a.c:1"))
            .run(Cursor::new(input), &mut sink)
            .unwrap();

        assert_eq!(outcome.verdict, Verdict::Pass);
        assert_eq!(String::from_utf8(sink).unwrap(), "hello\ntest\nOK\n");
    }

    #[test]
    fn last_line_without_newline_is_processed()
    {
        let mut sink = Vec::new();
        let outcome = StreamInterpreter::new(fixed("a.c:1"))
            .keep_transcript()
            .run(Cursor::new("line\nOK"), &mut sink)
            .unwrap();
        assert_eq!(outcome.verdict, Verdict::Pass);
        assert_eq!(outcome.transcript, vec!["line", "OK"]);
    }

    #[test]
    fn pass_marker_on_register_line_ends_run()
    {
        let mut interp = StreamInterpreter::new(fixed("a.c:1"));
        match interp.feed("OK PC   : 0x1") {
            Feed::Terminate(line, Verdict::Pass) => assert_eq!(line.as_str(), "OK PC   : 0x1 (a.c:1)"),
            other => panic!("expected pass, got {other:?}"),
        }
        assert_eq!(interp.state().last_resolved_pc().map(Location::as_str), Some("a.c:1"));
    }

    #[test]
    fn transcript_is_not_kept_by_default()
    {
        let mut sink = Vec::new();
        let outcome = StreamInterpreter::new(fixed("a.c:1"))
            .run(Cursor::new("line\nOK\n"), &mut sink)
            .unwrap();
        assert!(outcome.transcript.is_empty());
        assert_eq!(outcome.lines_read, 2);
        assert_eq!(sink, b"line\nOK\n");
    }

    #[test]
    fn source_errors_propagate()
    {
        let lines = vec![
            Ok(OutputLine::sanitize("first")),
            Err(crate::error::HarnessError::ConnectionTimeout("gdb".to_string())),
        ];
        let mut sink = Vec::new();
        let result = StreamInterpreter::new(fixed("a.c:1")).interpret(lines, &mut sink);
        assert!(matches!(result, Err(crate::error::HarnessError::ConnectionTimeout(_))));
        assert_eq!(sink, b"first\n");
    }
}
