//! Tests for running backends end to end

use std::fs;
use std::io::Cursor;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};

use hilrun_core::backend::{run, Backend, ReplayBackend, Session};
use hilrun_core::config::HarnessConfig;
use hilrun_core::error::{HarnessError, HarnessResult};
use hilrun_core::symbols::{Addr2LineTool, FnResolver};
use hilrun_core::types::{Location, Verdict};

const MISSING_ADDR2LINE: &str = "/nonexistent/hilrun-test/arm-none-eabi-addr2line";

/// Backend serving fixed text and recording whether it was started.
struct CannedBackend
{
    text: &'static str,
    started: AtomicBool,
}

impl CannedBackend
{
    fn new(text: &'static str) -> Self
    {
        Self {
            text,
            started: AtomicBool::new(false),
        }
    }
}

impl Backend for CannedBackend
{
    fn name(&self) -> &'static str
    {
        "canned"
    }

    fn start(&self, _config: &HarnessConfig) -> HarnessResult<Session>
    {
        self.started.store(true, Ordering::SeqCst);
        Ok(Session::from_reader(Cursor::new(self.text)))
    }
}

fn config() -> HarnessConfig
{
    HarnessConfig::builder("build/test_sample.elf").build().unwrap()
}

#[test]
fn test_missing_symbolizer_aborts_before_any_output()
{
    let backend = CannedBackend::new("PC   : 0x08001000\nOK\n");
    let mut sink = Vec::new();
    let result = run(
        &config(),
        &backend,
        Addr2LineTool::new(MISSING_ADDR2LINE, "build/test_sample.elf"),
        &mut sink,
    );

    match result {
        Err(HarnessError::ToolNotFound { tool, .. }) => assert_eq!(tool, MISSING_ADDR2LINE),
        other => panic!("expected ToolNotFound, got {:?}", other.map(|o| o.verdict)),
    }
    assert!(sink.is_empty());
    assert!(!backend.started.load(Ordering::SeqCst));
}

#[test]
fn test_run_over_canned_backend()
{
    let backend = CannedBackend::new("Semihosting init\nPC   : 0x08001000\nOK\ntrailing\n");
    let mut sink = Vec::new();
    let outcome = run(
        &config(),
        &backend,
        FnResolver::new(|_: &str| Ok(Location::new("main.c:42"))),
        &mut sink,
    )
    .unwrap();

    assert_eq!(outcome.verdict, Verdict::Pass);
    assert_eq!(String::from_utf8(sink).unwrap(), "PC   : 0x08001000 (main.c:42)\nOK\n");
}

#[test]
fn test_replay_from_file()
{
    let path = std::env::temp_dir().join(format!("hilrun-replay-{}.log", std::process::id()));
    fs::write(&path, b"LR   : 0x2\r\nHard Fault Handler Called :0:\r\n").unwrap();

    let mut sink = Vec::new();
    let outcome = run(
        &config(),
        &ReplayBackend::new(&path),
        FnResolver::new(|_: &str| Ok(Location::new("b.c:20"))),
        &mut sink,
    )
    .unwrap();
    fs::remove_file(&path).unwrap();

    assert_eq!(outcome.verdict, Verdict::Fail);
    assert!(outcome.transcript.is_empty());
    assert_eq!(
        String::from_utf8(sink).unwrap(),
        "LR   : 0x2 (b.c:20)\nHard Fault Handler Called :20:\n"
    );
}

#[test]
fn test_replay_missing_log_is_invalid_argument()
{
    let backend = ReplayBackend::new(PathBuf::from("/nonexistent/hilrun-test/run.log"));
    let mut sink = Vec::new();
    let result = run(&config(), &backend, FnResolver::new(|_: &str| Ok(Location::unknown())), &mut sink);
    assert!(matches!(result, Err(HarnessError::InvalidArgument(_))));
}
