//! QEMU emulator backend.

use std::io::BufReader;
use std::process::{Command, Stdio};

use super::process::{drain_to_log, spawn, ChildGuard};
use super::{Backend, Session};
use crate::config::{HarnessConfig, QemuOptions};
use crate::error::{HarnessError, HarnessResult, QEMU_HINT};

/// Runs the image under `qemu-system-arm` with semihosting on stdout.
#[derive(Debug, Clone, Default)]
pub struct QemuBackend
{
    options: QemuOptions,
}

impl QemuBackend
{
    #[must_use]
    pub fn new(options: QemuOptions) -> Self
    {
        Self { options }
    }

    #[must_use]
    pub fn command(&self, config: &HarnessConfig) -> Command
    {
        let mut cmd = Command::new(&config.tools().qemu);
        cmd.args(["-cpu", &self.options.cpu])
            .args(["-M", &self.options.machine])
            .args(["-nographic", "-monitor", "null", "-serial", "null", "-semihosting"])
            .arg("-kernel")
            .arg(config.image());
        cmd
    }
}

impl Backend for QemuBackend
{
    fn name(&self) -> &'static str
    {
        "qemu"
    }

    fn start(&self, config: &HarnessConfig) -> HarnessResult<Session>
    {
        let mut child = spawn(
            self.command(config)
                .stdin(Stdio::null())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped()),
            &config.tools().qemu,
            QEMU_HINT,
        )?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| HarnessError::Io(std::io::Error::other("emulator stdout was not captured")))?;
        if let Some(stderr) = child.stderr.take() {
            drain_to_log("qemu-stderr", stderr)?;
        }

        Ok(Session::from_reader(BufReader::new(stdout)).with_producer(ChildGuard::new("qemu", child)))
    }
}

#[cfg(test)]
mod tests
{
    use std::path::PathBuf;

    use super::*;
    use crate::config::ToolPaths;

    #[test]
    fn emulator_arguments()
    {
        let config = HarnessConfig::builder("fw.elf").build().unwrap();
        let cmd = QemuBackend::default().command(&config);
        let args: Vec<_> = cmd.get_args().map(|a| a.to_string_lossy().into_owned()).collect();
        assert_eq!(
            args,
            [
                "-cpu",
                "cortex-m4",
                "-M",
                "netduinoplus2",
                "-nographic",
                "-monitor",
                "null",
                "-serial",
                "null",
                "-semihosting",
                "-kernel",
                "fw.elf"
            ]
        );
    }

    #[test]
    fn missing_emulator_is_tool_not_found()
    {
        let config = HarnessConfig::builder("fw.elf")
            .tools(ToolPaths {
                qemu: PathBuf::from("/nonexistent/hilrun-test/qemu-system-arm"),
                ..ToolPaths::default()
            })
            .build()
            .unwrap();
        let result = QemuBackend::default().start(&config);
        assert!(matches!(result, Err(HarnessError::ToolNotFound { hint: QEMU_HINT, .. })));
    }
}
