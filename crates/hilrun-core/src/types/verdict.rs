//! Terminal test verdicts.

use std::fmt;

/// Outcome of one firmware test run
///
/// Only [`Verdict::Pass`] maps to exit code 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verdict
{
    /// The firmware printed the `OK` marker.
    Pass,
    /// The stream ended without a pass marker.
    Fail,
    /// The run was killed at its wall-clock deadline.
    Timeout,
    /// The harness itself could not complete the run.
    Error,
}

impl Verdict
{
    /// Process exit code for this verdict.
    #[must_use]
    pub const fn exit_code(self) -> i32
    {
        match self {
            Verdict::Pass => 0,
            Verdict::Fail => 1,
            Verdict::Timeout => 2,
            Verdict::Error => 3,
        }
    }

    #[must_use]
    pub const fn is_pass(self) -> bool
    {
        matches!(self, Verdict::Pass)
    }
}

impl fmt::Display for Verdict
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        let name = match self {
            Verdict::Pass => "PASS",
            Verdict::Fail => "FAIL",
            Verdict::Timeout => "TIMEOUT",
            Verdict::Error => "ERROR",
        };
        f.write_str(name)
    }
}
