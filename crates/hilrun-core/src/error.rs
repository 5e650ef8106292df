//! # Error Types
//!
//! General error handling for a harness run.
//!
//! We use `thiserror` to automatically generate `Error` trait implementations
//! and nice error messages.

use thiserror::Error;

use crate::types::Verdict;

/// Hint printed when an ARM GNU toolchain executable is missing.
pub const TOOLCHAIN_HINT: &str = "Check that the ARM GNU toolchain is installed and available in your PATH.";
/// Hint printed when a SEGGER J-Link executable is missing.
pub const JLINK_HINT: &str = "Check that the J-Link utilities are installed and available in your PATH.";
/// Hint printed when the emulator executable is missing.
pub const QEMU_HINT: &str = "Check that QEMU is installed and available in your PATH, or pass --qemu.";

/// Main error type for harness operations
///
/// ## Error Categories
///
/// 1. **Launch errors**: ToolNotFound, BackendExited, BackendFailed (fatal)
/// 2. **Connection errors**: ConnectionTimeout (fatal)
/// 3. **Symbolization errors**: ResolverUnavailable (degraded, never fatal inside a run)
/// 4. **Usage errors**: InvalidArgument
/// 5. **I/O errors**: Io
#[derive(Error, Debug)]
pub enum HarnessError
{
    /// A required executable could not be started because it does not exist
    ///
    /// Raised for the probe GDB server, the GDB client, the emulator and the
    /// symbolizer alike. `hint` tells the user which toolchain to install.
    #[error("{tool} not found. {hint}")]
    ToolNotFound
    {
        /// Executable name or path as configured
        tool: String,
        /// Installation hint printed with the diagnostic
        hint: &'static str,
    },

    /// The backend never became reachable
    ///
    /// Either the GDB server port did not open within the readiness window,
    /// or the GDB client reported `Connection timed out`.
    #[error("Connection timed out: {0}")]
    ConnectionTimeout(String),

    /// The symbolizer failed for one address
    ///
    /// The annotator degrades this to the unknown location `??:0`.
    #[error("Symbolizer unavailable for {address}: {reason}")]
    ResolverUnavailable
    {
        /// Address operand that was being resolved
        address: String,
        /// What went wrong
        reason: String,
    },

    /// A backend process exited before it became ready
    #[error("{tool} exited before becoming ready ({status})")]
    BackendExited
    {
        /// Backend executable
        tool: String,
        /// Exit status description
        status: String,
    },

    /// A backend reported a fatal condition on its own output
    #[error("Error starting {tool}:\n{output}")]
    BackendFailed
    {
        /// Backend executable
        tool: String,
        /// Captured diagnostic output
        output: String,
    },

    /// Invalid argument or configuration value
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// I/O error while talking to a child process or reading its output
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl HarnessError
{
    /// Verdict reported for a run aborted by this error.
    ///
    /// Every error that escapes a run is an internal failure of the harness,
    /// not a firmware failure, so it maps to [`Verdict::Error`].
    #[must_use]
    pub fn verdict(&self) -> Verdict
    {
        Verdict::Error
    }

    /// Whether this error must abort the run.
    ///
    /// Only per-address symbolization failures are recoverable.
    #[must_use]
    pub fn is_fatal(&self) -> bool
    {
        !matches!(self, Self::ResolverUnavailable { .. })
    }
}

/// Convenience type alias for `Result<T, HarnessError>`
///
/// ```rust
/// use hilrun_core::error::HarnessResult;
/// fn foo() -> HarnessResult<()>
/// {
///     Ok(())
/// }
/// ```
pub type HarnessResult<T> = std::result::Result<T, HarnessError>;
