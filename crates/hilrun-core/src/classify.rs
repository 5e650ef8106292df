//! # Line Classification
//!
//! Backend output is unversioned free text, but the markers below are
//! effectively a wire contract between the firmware's semihosting runtime,
//! the backend and this harness. They are exact, case-sensitive substrings:
//!
//! | Priority | Marker                                        | Kind                 |
//! |----------|-----------------------------------------------|----------------------|
//! | 1        | `Semihosting`, `Semi-hosting`, `SYSRESETREQ` anywhere | [`LineKind::Noise`] |
//! | 2        | `PC   :`                                      | [`LineKind::RegisterPc`] |
//! | 3        | `LR   :`                                      | [`LineKind::RegisterLr`] |
//! | 4        | `Hard Fault Handler Called`                   | [`LineKind::FaultBanner`] |
//! | 5        | `OK` at the start of the line                 | [`LineKind::Verdict`] |
//! | -        | anything else                                 | [`LineKind::Plain`]  |
//!
//! Rules are evaluated in priority order and the first match wins, so a
//! banner line is never treated as a register or verdict line. The pass
//! marker is the exception: a register or fault line that also starts with
//! `OK` still ends the run, so [`verdict_marker`] is checked on every
//! non-noise line after annotation.

use crate::types::Verdict;

/// Field marker preceding the program counter in a fault dump.
pub const PC_MARKER: &str = "PC   :";
/// Field marker preceding the link register in a fault dump.
pub const LR_MARKER: &str = "LR   :";
/// Substring identifying the fault handler's test failure line.
pub const FAULT_BANNER: &str = "Hard Fault Handler Called";
/// Prefix identifying a passing run.
pub const PASS_MARKER: &str = "OK";
/// Substrings identifying backend chatter that never reaches the transcript.
pub const NOISE_MARKERS: [&str; 3] = ["Semihosting", "Semi-hosting", "SYSRESETREQ"];

/// Category of one output line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LineKind
{
    /// Backend banner or semihosting chatter; dropped from the transcript.
    Noise,
    /// Fault dump program counter line.
    RegisterPc,
    /// Fault dump link register line.
    RegisterLr,
    /// Test failure emitted from the hard fault handler.
    FaultBanner,
    /// Terminal marker.
    Verdict(Verdict),
    /// Everything else, passed through untouched.
    Plain,
}

impl LineKind
{
    /// Register marker for register kinds.
    #[must_use]
    pub const fn register_marker(self) -> Option<&'static str>
    {
        match self {
            LineKind::RegisterPc => Some(PC_MARKER),
            LineKind::RegisterLr => Some(LR_MARKER),
            _ => None,
        }
    }
}

/// One predicate in the classification table.
struct Rule
{
    matches: fn(&str) -> bool,
    kind: LineKind,
}

const RULES: [Rule; 5] = [
    Rule {
        matches: |line| NOISE_MARKERS.iter().any(|marker| line.contains(marker)),
        kind: LineKind::Noise,
    },
    Rule {
        matches: |line| line.contains(PC_MARKER),
        kind: LineKind::RegisterPc,
    },
    Rule {
        matches: |line| line.contains(LR_MARKER),
        kind: LineKind::RegisterLr,
    },
    Rule {
        matches: |line| line.contains(FAULT_BANNER),
        kind: LineKind::FaultBanner,
    },
    Rule {
        matches: |line| verdict_marker(line).is_some(),
        kind: LineKind::Verdict(Verdict::Pass),
    },
];

/// Classify one sanitized line. Pure; performs no I/O.
///
/// ## Example
///
/// ```rust
/// use hilrun_core::classify::{classify, LineKind};
///
/// assert_eq!(classify("PC   : 0x08001000"), LineKind::RegisterPc);
/// assert_eq!(classify("SYSRESETREQ received, PC   : 0x0"), LineKind::Noise);
/// ```
#[must_use]
pub fn classify(line: &str) -> LineKind
{
    RULES
        .iter()
        .find(|rule| (rule.matches)(line))
        .map_or(LineKind::Plain, |rule| rule.kind)
}

/// Verdict announced by the start of `line`, whatever else it contains.
#[must_use]
pub fn verdict_marker(line: &str) -> Option<Verdict>
{
    line.starts_with(PASS_MARKER).then_some(Verdict::Pass)
}

/// Address operand of a register line.
///
/// The operand is the first whitespace-delimited token after `marker`,
/// stopping at any further `:`. Returns `None` if the marker is absent or
/// nothing follows it.
#[must_use]
pub fn register_operand<'a>(line: &'a str, marker: &str) -> Option<&'a str>
{
    let (_, rest) = line.split_once(marker)?;
    let field = rest.split(':').next().unwrap_or(rest);
    field.split_whitespace().next()
}
