//! # hilrun-core
//!
//! Output interpretation engine for hardware-in-the-loop firmware tests.
//!
//! A debug probe's GDB server or a CPU emulator runs a firmware image whose
//! test framework talks through semihosting. This crate consumes that
//! textual stream and turns it into:
//!
//! - an annotated transcript, with backend chatter removed and fault-dump
//!   addresses resolved to `file:line`
//! - a terminal [`Verdict`] with a process exit code
//!
//! ## Pipeline
//!
//! ```text
//! backend stream --> OutputLine::sanitize --> classify --> FaultAnnotator --> transcript
//!                                                 |                               |
//!                                                 +--------> verdict <------------+
//! ```
//!
//! - [`classify`]: ordered marker rules, pure
//! - [`annotate`]: register-line suffixes and fault-banner line patching
//! - [`symbols`]: `addr2line` tool, in-process DWARF, and caching resolvers
//! - [`interpreter`]: the per-run state machine
//! - [`backend`]: J-Link, QEMU and replay launchers plus [`backend::run`]
//!
//! ## Example
//!
//! ```rust
//! use hilrun_core::interpreter::StreamInterpreter;
//! use hilrun_core::symbols::FnResolver;
//! use hilrun_core::types::{Location, Verdict};
//!
//! let resolver = FnResolver::new(|_: &str| Ok(Location::new("main.c:42")));
//! let input = "Semihosting init\nPC   : 0x08001000\nOK\n";
//! let mut transcript = Vec::new();
//!
//! let outcome = StreamInterpreter::new(resolver).run(input.as_bytes(), &mut transcript).unwrap();
//! assert_eq!(outcome.verdict, Verdict::Pass);
//! assert_eq!(String::from_utf8(transcript).unwrap(), "PC   : 0x08001000 (main.c:42)\nOK\n");
//! ```

pub mod annotate;
pub mod backend;
pub mod classify;
pub mod config;
pub mod error;
pub mod interpreter;
pub mod prelude;
pub mod symbols;
pub mod types;

pub use backend::{run, Backend};
// Re-export commonly used types
pub use error::{HarnessError, HarnessResult};
pub use interpreter::{RunOutcome, StreamInterpreter};
pub use symbols::SymbolResolver;
pub use types::{Location, OutputLine, Verdict};
