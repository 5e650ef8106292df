//! # Fault Annotation
//!
//! Appends resolved source locations to fault-dump register lines and patches
//! the fault handler's failure line with the real faulting line number.
//!
//! The firmware's hard fault handler cannot know where it was called from, so
//! it reports its test failure with a `:0:` line placeholder. The register
//! dump printed just before it carries the stacked PC and LR; once those are
//! resolved the placeholder is rewritten:
//!
//! ```text
//! PC   : 0x08000F34                   ->  PC   : 0x08000F34 (test/test_bad_address.c:4)
//! test/test_bad_address.c:0:...:FAIL  ->  test/test_bad_address.c:4:...:FAIL
//! ```

use tracing::{debug, warn};

use crate::classify::{register_operand, LineKind};
use crate::symbols::{parse_hex_address, SymbolResolver};
use crate::types::{Location, OutputLine, Verdict};

/// Placeholder the fault handler prints instead of a line number.
pub const LINE_PLACEHOLDER: &str = ":0:";

/// Mutable state carried across the lines of one run.
///
/// Only the most recent PC and LR sightings are kept. The verdict is written
/// at most once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseState
{
    last_pc: Option<Location>,
    last_lr: Option<Location>,
    verdict: Option<Verdict>,
}

impl ParseState
{
    #[must_use]
    pub fn new() -> Self
    {
        Self::default()
    }

    #[must_use]
    pub fn last_resolved_pc(&self) -> Option<&Location>
    {
        self.last_pc.as_ref()
    }

    #[must_use]
    pub fn last_resolved_lr(&self) -> Option<&Location>
    {
        self.last_lr.as_ref()
    }

    #[must_use]
    pub fn verdict(&self) -> Option<Verdict>
    {
        self.verdict
    }

    /// Record the run's verdict. Later calls are ignored; returns whether
    /// this call set it.
    pub fn set_verdict(&mut self, verdict: Verdict) -> bool
    {
        if self.verdict.is_some() {
            return false;
        }
        self.verdict = Some(verdict);
        true
    }
}

/// Rewrites fault-related lines using a [`SymbolResolver`].
pub struct FaultAnnotator<R>
{
    resolver: R,
}

impl<R: SymbolResolver> FaultAnnotator<R>
{
    pub fn new(resolver: R) -> Self
    {
        Self { resolver }
    }

    #[must_use]
    pub fn resolver(&self) -> &R
    {
        &self.resolver
    }

    /// Annotate `line` according to its `kind`, updating `state`.
    ///
    /// Non-fault kinds are returned unchanged. Resolver failures never
    /// propagate: the address is reported as `??:0`.
    #[must_use]
    pub fn annotate(&self, line: OutputLine, kind: LineKind, state: &mut ParseState) -> OutputLine
    {
        match kind {
            LineKind::RegisterPc => {
                let (line, location) = self.annotate_register(&line, kind);
                state.last_pc = Some(location);
                line
            }
            LineKind::RegisterLr => {
                let (line, location) = self.annotate_register(&line, kind);
                state.last_lr = Some(location);
                line
            }
            LineKind::FaultBanner => patch_fault_banner(line, state),
            LineKind::Noise | LineKind::Verdict(_) | LineKind::Plain => line,
        }
    }

    fn annotate_register(&self, line: &OutputLine, kind: LineKind) -> (OutputLine, Location)
    {
        let location = kind
            .register_marker()
            .and_then(|marker| register_operand(line, marker))
            .map_or_else(
                || {
                    warn!(line = %line, "register line without address operand");
                    Location::unknown()
                },
                |operand| self.lookup(operand),
            );

        (line.with_suffix(&format!(" ({location})")), location)
    }

    fn lookup(&self, operand: &str) -> Location
    {
        if parse_hex_address(operand).is_none() {
            warn!(operand, "not a hexadecimal address, skipping symbolizer");
            return Location::unknown();
        }

        match self.resolver.resolve(operand) {
            Ok(location) => location,
            Err(err) => {
                warn!(operand, error = %err, "symbol resolution failed");
                Location::unknown()
            }
        }
    }
}

/// Replace the first `:0:` with the PC's line number, then the next with the LR's.
fn patch_fault_banner(line: OutputLine, state: &ParseState) -> OutputLine
{
    [state.last_resolved_pc(), state.last_resolved_lr()]
        .into_iter()
        .flatten()
        .filter(|location| !location.is_unknown())
        .filter_map(Location::line_number)
        .fold(line, |line, number| {
            if !line.contains(LINE_PLACEHOLDER) {
                return line;
            }
            debug!(number, "patching fault banner line number");
            line.replace_first(LINE_PLACEHOLDER, &format!(":{number}:"))
        })
}

#[cfg(test)]
mod tests
{
    use std::cell::RefCell;

    use super::*;
    use crate::error::HarnessError;
    use crate::symbols::FnResolver;

    fn table(entries: &'static [(&'static str, &'static str)]) -> impl SymbolResolver
    {
        FnResolver::new(move |addr: &str| {
            entries
                .iter()
                .find(|(a, _)| *a == addr)
                .map(|(_, loc)| Location::new(*loc))
                .ok_or_else(|| HarnessError::ResolverUnavailable {
                    address: addr.to_string(),
                    reason: "no entry".to_string(),
                })
        })
    }

    #[test]
    fn pc_line_gets_location_suffix_and_updates_state()
    {
        let annotator = FaultAnnotator::new(table(&[("0x08001000", "main.c:42")]));
        let mut state = ParseState::new();
        let out = annotator.annotate("PC   : 0x08001000".into(), LineKind::RegisterPc, &mut state);

        assert_eq!(out.as_str(), "PC   : 0x08001000 (main.c:42)");
        assert_eq!(state.last_resolved_pc().map(Location::as_str), Some("main.c:42"));
        assert!(state.last_resolved_lr().is_none());
    }

    #[test]
    fn most_recent_sighting_wins()
    {
        let annotator = FaultAnnotator::new(table(&[("0x1", "a.c:1"), ("0x2", "a.c:2")]));
        let mut state = ParseState::new();
        let _ = annotator.annotate("LR   : 0x1".into(), LineKind::RegisterLr, &mut state);
        let _ = annotator.annotate("LR   : 0x2".into(), LineKind::RegisterLr, &mut state);
        assert_eq!(state.last_resolved_lr().map(Location::as_str), Some("a.c:2"));
    }

    #[test]
    fn resolver_failure_degrades_to_unknown()
    {
        let annotator = FaultAnnotator::new(table(&[]));
        let mut state = ParseState::new();
        let out = annotator.annotate("LR   : 0xDEAD".into(), LineKind::RegisterLr, &mut state);

        assert_eq!(out.as_str(), "LR   : 0xDEAD (??:0)");
        assert!(state.last_resolved_lr().is_some_and(Location::is_unknown));
    }

    #[test]
    fn garbled_operand_skips_resolver()
    {
        let calls = RefCell::new(Vec::new());
        let annotator = FaultAnnotator::new(FnResolver::new(|addr: &str| {
            calls.borrow_mut().push(addr.to_string());
            Ok(Location::new("x.c:1"))
        }));
        let mut state = ParseState::new();
        let out = annotator.annotate("PC   : 0x08Z01000".into(), LineKind::RegisterPc, &mut state);

        assert_eq!(out.as_str(), "PC   : 0x08Z01000 (??:0)");
        assert!(calls.borrow().is_empty());
    }

    #[test]
    fn banner_patched_from_pc_then_lr()
    {
        let annotator = FaultAnnotator::new(table(&[]));
        let mut state = ParseState::new();
        state.last_pc = Some(Location::new("a.c:10"));
        state.last_lr = Some(Location::new("b.c:20"));

        let out = annotator.annotate("x.c:0:t:FAIL:0: Hard Fault Handler Called".into(), LineKind::FaultBanner, &mut state);
        assert_eq!(out.as_str(), "x.c:10:t:FAIL:20: Hard Fault Handler Called");
    }

    #[test]
    fn banner_uses_lr_when_pc_unknown()
    {
        let annotator = FaultAnnotator::new(table(&[]));
        let mut state = ParseState::new();
        state.last_pc = Some(Location::unknown());
        state.last_lr = Some(Location::new("b.c:20"));

        let out = annotator.annotate("Hard Fault Handler Called :0:".into(), LineKind::FaultBanner, &mut state);
        assert_eq!(out.as_str(), "Hard Fault Handler Called :20:");
    }

    #[test]
    fn banner_unchanged_without_resolved_registers()
    {
        let annotator = FaultAnnotator::new(table(&[]));
        let mut state = ParseState::new();
        let line = "Hard Fault Handler Called :0:";
        let out = annotator.annotate(line.into(), LineKind::FaultBanner, &mut state);
        assert_eq!(out.as_str(), line);
    }

    #[test]
    fn annotated_line_treated_as_plain_is_not_annotated_again()
    {
        let calls = RefCell::new(0);
        let annotator = FaultAnnotator::new(FnResolver::new(|_: &str| {
            *calls.borrow_mut() += 1;
            Ok(Location::new("main.c:42"))
        }));
        let mut state = ParseState::new();
        let annotated = annotator.annotate("PC   : 0x1".into(), LineKind::RegisterPc, &mut state);
        let again = annotator.annotate(annotated.clone(), LineKind::Plain, &mut state);

        assert_eq!(again, annotated);
        assert_eq!(*calls.borrow(), 1);
    }

    #[test]
    fn verdict_is_write_once()
    {
        let mut state = ParseState::new();
        assert!(state.set_verdict(Verdict::Pass));
        assert!(!state.set_verdict(Verdict::Fail));
        assert_eq!(state.verdict(), Some(Verdict::Pass));
    }
}
