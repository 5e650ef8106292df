//! # Run Configuration
//!
//! One immutable [`HarnessConfig`] is built per run (normally from the CLI)
//! and handed by reference to every component that needs a tool path or a
//! timeout. Nothing in the harness reads tool locations from globals.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{HarnessError, HarnessResult};

/// Default symbolizer executable.
pub const DEFAULT_ADDR2LINE: &str = "arm-none-eabi-addr2line";
/// Default emulator executable.
pub const DEFAULT_QEMU: &str = "qemu-system-arm";
/// Default time allowed for the GDB server to start listening.
pub const DEFAULT_READINESS_TIMEOUT: Duration = Duration::from_secs(5);

/// Default GDB client executable for the host OS.
#[must_use]
pub fn default_gdb() -> &'static str
{
    if cfg!(windows) {
        "arm-none-eabi-gdb.exe"
    } else {
        "arm-none-eabi-gdb"
    }
}

/// Default J-Link GDB server executable for the host OS.
///
/// Windows ships the console variant under a different name.
#[must_use]
pub fn default_jlink_server() -> &'static str
{
    if cfg!(windows) {
        "JLinkGDBServerCL.exe"
    } else {
        "JLinkGDBServer"
    }
}

/// Locations of every external tool the harness may launch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolPaths
{
    pub addr2line: PathBuf,
    pub gdb: PathBuf,
    pub jlink_server: PathBuf,
    pub qemu: PathBuf,
}

impl Default for ToolPaths
{
    fn default() -> Self
    {
        Self {
            addr2line: PathBuf::from(DEFAULT_ADDR2LINE),
            gdb: PathBuf::from(default_gdb()),
            jlink_server: PathBuf::from(default_jlink_server()),
            qemu: PathBuf::from(DEFAULT_QEMU),
        }
    }
}

/// How fault addresses are turned into source locations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SymbolizerKind
{
    /// Spawn the configured `addr2line` executable once per address.
    #[default]
    Tool,
    /// Read DWARF line tables from the image in-process.
    Builtin,
}

/// J-Link probe and GDB server settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JlinkOptions
{
    /// Probe selection (`USB`, `USB=<serial>`, `IP=<addr>`)
    pub select: String,
    /// Target device name as known to J-Link
    pub device: String,
    /// Debug interface, `SWD` or `JTAG`
    pub interface: String,
    /// Interface speed in kHz or `auto`
    pub speed: String,
    /// GDB server TCP port
    pub port: u16,
    /// Extra GDB script passed with `-x`
    pub gdbinit: Option<PathBuf>,
}

impl JlinkOptions
{
    #[must_use]
    pub fn new(device: impl Into<String>) -> Self
    {
        Self {
            select: "USB".to_string(),
            device: device.into(),
            interface: "SWD".to_string(),
            speed: "auto".to_string(),
            port: 3333,
            gdbinit: None,
        }
    }
}

/// QEMU machine settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QemuOptions
{
    pub cpu: String,
    pub machine: String,
}

impl Default for QemuOptions
{
    fn default() -> Self
    {
        Self {
            cpu: "cortex-m4".to_string(),
            machine: "netduinoplus2".to_string(),
        }
    }
}

/// Everything one run needs to know, fixed at construction time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarnessConfig
{
    image: PathBuf,
    tools: ToolPaths,
    symbolizer: SymbolizerKind,
    readiness_timeout: Duration,
    run_timeout: Option<Duration>,
}

impl HarnessConfig
{
    /// Start building a configuration for the firmware `image`.
    pub fn builder(image: impl Into<PathBuf>) -> HarnessConfigBuilder
    {
        HarnessConfigBuilder {
            image: image.into(),
            tools: ToolPaths::default(),
            symbolizer: SymbolizerKind::default(),
            readiness_timeout: DEFAULT_READINESS_TIMEOUT,
            run_timeout: None,
        }
    }

    #[must_use]
    pub fn image(&self) -> &Path
    {
        &self.image
    }

    #[must_use]
    pub fn tools(&self) -> &ToolPaths
    {
        &self.tools
    }

    #[must_use]
    pub fn symbolizer(&self) -> SymbolizerKind
    {
        self.symbolizer
    }

    #[must_use]
    pub fn readiness_timeout(&self) -> Duration
    {
        self.readiness_timeout
    }

    #[must_use]
    pub fn run_timeout(&self) -> Option<Duration>
    {
        self.run_timeout
    }
}

/// Builder for [`HarnessConfig`]
///
/// ## Example
///
/// ```rust
/// use std::time::Duration;
///
/// use hilrun_core::config::{HarnessConfig, SymbolizerKind};
///
/// let config = HarnessConfig::builder("build/test_sample.elf")
///     .symbolizer(SymbolizerKind::Builtin)
///     .run_timeout(Some(Duration::from_secs(30)))
///     .build()
///     .unwrap();
/// assert_eq!(config.symbolizer(), SymbolizerKind::Builtin);
/// ```
#[derive(Debug, Clone)]
pub struct HarnessConfigBuilder
{
    image: PathBuf,
    tools: ToolPaths,
    symbolizer: SymbolizerKind,
    readiness_timeout: Duration,
    run_timeout: Option<Duration>,
}

impl HarnessConfigBuilder
{
    #[must_use]
    pub fn tools(mut self, tools: ToolPaths) -> Self
    {
        self.tools = tools;
        self
    }

    #[must_use]
    pub fn symbolizer(mut self, kind: SymbolizerKind) -> Self
    {
        self.symbolizer = kind;
        self
    }

    #[must_use]
    pub fn readiness_timeout(mut self, timeout: Duration) -> Self
    {
        self.readiness_timeout = timeout;
        self
    }

    #[must_use]
    pub fn run_timeout(mut self, timeout: Option<Duration>) -> Self
    {
        self.run_timeout = timeout;
        self
    }

    /// Validate and freeze the configuration.
    ///
    /// ## Errors
    ///
    /// Returns [`HarnessError::InvalidArgument`] for an empty image path or a
    /// zero timeout.
    pub fn build(self) -> HarnessResult<HarnessConfig>
    {
        if self.image.as_os_str().is_empty() {
            return Err(HarnessError::InvalidArgument("firmware image path is empty".to_string()));
        }
        if self.readiness_timeout.is_zero() {
            return Err(HarnessError::InvalidArgument("readiness timeout must be non-zero".to_string()));
        }
        if self.run_timeout.is_some_and(|t| t.is_zero()) {
            return Err(HarnessError::InvalidArgument("run timeout must be non-zero".to_string()));
        }

        Ok(HarnessConfig {
            image: self.image,
            tools: self.tools,
            symbolizer: self.symbolizer,
            readiness_timeout: self.readiness_timeout,
            run_timeout: self.run_timeout,
        })
    }
}
