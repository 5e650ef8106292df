//! J-Link GDB server backend.
//!
//! The GDB server is started first and watched on its own threads. The GDB
//! client is only launched once the server prints its listening banner; if
//! the server exits first the run is over.

use std::io::BufReader;
use std::process::{Command, Stdio};
use std::sync::mpsc::RecvTimeoutError;

use tracing::{error, info};

use super::process::{collect, spawn, watch_for_banner, ChildGuard};
use super::{Backend, Session};
use crate::config::{HarnessConfig, JlinkOptions};
use crate::error::{HarnessError, HarnessResult, JLINK_HINT, TOOLCHAIN_HINT};

/// Line the GDB server prints once it accepts GDB connections.
pub const JLINK_READY_BANNER: &str = "Waiting for GDB connection";
/// Server output meaning no probe or target could be reached.
const PROBE_UNREACHABLE: &str = "Could not connect";
/// Client output meaning the server never answered.
const CLIENT_TIMED_OUT: &str = "Connection timed out";

/// Runs the image on real hardware through a J-Link probe.
#[derive(Debug, Clone)]
pub struct JlinkBackend
{
    options: JlinkOptions,
}

impl JlinkBackend
{
    #[must_use]
    pub fn new(options: JlinkOptions) -> Self
    {
        Self { options }
    }

    #[must_use]
    pub fn options(&self) -> &JlinkOptions
    {
        &self.options
    }

    /// Command line for the GDB server.
    #[must_use]
    pub fn server_command(&self, config: &HarnessConfig) -> Command
    {
        let opts = &self.options;
        let mut cmd = Command::new(&config.tools().jlink_server);
        cmd.args(["-select", &opts.select])
            .args(["-device", &opts.device])
            .args(["-if", &opts.interface])
            .args(["-speed", &opts.speed])
            .arg("-noir")
            .args(["-port", &opts.port.to_string()])
            .args(["-singlerun", "-nogui", "-strict"]);
        cmd
    }

    /// Command line for the GDB client that loads and runs the image.
    #[must_use]
    pub fn client_command(&self, config: &HarnessConfig) -> Command
    {
        let mut cmd = Command::new(&config.tools().gdb);
        cmd.args(["-q", "-batch"])
            .args(["-ex", &format!("target remote localhost:{}", self.options.port)])
            .args(["-ex", "mon reset 0"])
            .args(["-ex", "monitor semihosting enable"])
            .args(["-ex", "monitor semihosting thumbswi 0xab"])
            .args(["-ex", "monitor semihosting IOClient 2"])
            .args(["-ex", "load"])
            .args(["-ex", "continue"])
            .args(["-ex", "quit"])
            .arg(config.image());
        if let Some(gdbinit) = &self.options.gdbinit {
            cmd.arg("-x").arg(gdbinit);
        }
        cmd
    }

    fn start_server(&self, config: &HarnessConfig) -> HarnessResult<ChildGuard>
    {
        let tool = &config.tools().jlink_server;
        let mut child = spawn(
            self.server_command(config)
                .stdin(Stdio::null())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped()),
            tool,
            JLINK_HINT,
        )?;

        let stdout = child.stdout.take().ok_or_else(|| missing_pipe("GDB server stdout"))?;
        let stderr = child.stderr.take().ok_or_else(|| missing_pipe("GDB server stderr"))?;
        let guard = ChildGuard::new("jlink-gdb-server", child);

        let ready = watch_for_banner("jlink-server-out", stdout, JLINK_READY_BANNER)?;
        let errors = collect("jlink-server-err", stderr)?;

        match ready.recv_timeout(config.readiness_timeout()) {
            Ok(Ok(())) => {
                info!(port = self.options.port, "GDB server listening");
                Ok(guard)
            }
            Ok(Err(stdout)) => {
                let stderr = errors.join().unwrap_or_default();
                let output = format!("{stdout}{stderr}");
                let status = guard.try_status().unwrap_or_else(|| "still running".to_string());
                error!(%status, "GDB server stopped before accepting connections");
                if output.contains(PROBE_UNREACHABLE) {
                    Err(HarnessError::BackendFailed {
                        tool: tool.display().to_string(),
                        output: output.trim_end().to_string(),
                    })
                } else {
                    Err(HarnessError::BackendExited {
                        tool: tool.display().to_string(),
                        status,
                    })
                }
            }
            Err(RecvTimeoutError::Timeout) => Err(HarnessError::ConnectionTimeout(format!(
                "{} did not report readiness within {:?}",
                tool.display(),
                config.readiness_timeout()
            ))),
            Err(RecvTimeoutError::Disconnected) => Err(HarnessError::BackendExited {
                tool: tool.display().to_string(),
                status: guard.try_status().unwrap_or_else(|| "unknown".to_string()),
            }),
        }
    }
}

impl Backend for JlinkBackend
{
    fn name(&self) -> &'static str
    {
        "jlink"
    }

    fn start(&self, config: &HarnessConfig) -> HarnessResult<Session>
    {
        let server = self.start_server(config)?;

        let mut client = spawn(
            self.client_command(config)
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::piped()),
            &config.tools().gdb,
            TOOLCHAIN_HINT,
        )?;
        let stderr = client.stderr.take().ok_or_else(|| missing_pipe("GDB client stderr"))?;

        Ok(Session::from_reader(BufReader::new(stderr))
            .with_producer(ChildGuard::new("gdb-client", client))
            .with_companion(server)
            .abort_on(CLIENT_TIMED_OUT))
    }
}

fn missing_pipe(what: &str) -> HarnessError
{
    HarnessError::Io(std::io::Error::other(format!("{what} was not captured")))
}
