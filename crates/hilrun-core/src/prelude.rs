//! Common module for library exports

pub use crate::annotate::{FaultAnnotator, ParseState};
pub use crate::backend::{run, Backend, JlinkBackend, QemuBackend, ReplayBackend, Session};
pub use crate::classify::{classify, LineKind};
pub use crate::config::{HarnessConfig, JlinkOptions, QemuOptions, SymbolizerKind, ToolPaths};
pub use crate::error::{HarnessError, HarnessResult};
pub use crate::interpreter::{Feed, RunOutcome, StreamInterpreter};
pub use crate::symbols::{create_resolver, Addr2LineTool, CachedResolver, DwarfResolver, FnResolver, SymbolResolver};
pub use crate::types::{Location, OutputLine, Verdict};
