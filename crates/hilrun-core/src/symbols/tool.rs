//! External `addr2line` symbolizer.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use tracing::{debug, trace};

use super::SymbolResolver;
use crate::error::{HarnessError, HarnessResult, TOOLCHAIN_HINT};
use crate::types::line::decode_lenient;
use crate::types::Location;

/// Resolver that runs `<tool> -e <image> <address>` for every lookup.
#[derive(Debug, Clone)]
pub struct Addr2LineTool
{
    tool: PathBuf,
    image: PathBuf,
}

impl Addr2LineTool
{
    pub fn new(tool: impl Into<PathBuf>, image: impl Into<PathBuf>) -> Self
    {
        Self {
            tool: tool.into(),
            image: image.into(),
        }
    }

    #[must_use]
    pub fn tool(&self) -> &Path
    {
        &self.tool
    }

    fn not_found(&self) -> HarnessError
    {
        HarnessError::ToolNotFound {
            tool: self.tool.display().to_string(),
            hint: TOOLCHAIN_HINT,
        }
    }
}

impl SymbolResolver for Addr2LineTool
{
    fn resolve(&self, address: &str) -> HarnessResult<Location>
    {
        trace!(tool = %self.tool.display(), address, "spawning symbolizer");
        let output = Command::new(&self.tool)
            .arg("-e")
            .arg(&self.image)
            .arg(address)
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .output()
            .map_err(|err| HarnessError::ResolverUnavailable {
                address: address.to_string(),
                reason: err.to_string(),
            })?;

        if !output.status.success() {
            return Err(HarnessError::ResolverUnavailable {
                address: address.to_string(),
                reason: format!("{} exited with {}", self.tool.display(), output.status),
            });
        }

        let text = decode_lenient(&output.stdout);
        let location = Location::new(text.trim_end_matches(['\n', '\r']));
        debug!(address, %location, "resolved");
        Ok(location)
    }

    fn probe(&self) -> HarnessResult<()>
    {
        let status = Command::new(&self.tool)
            .arg("--version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();

        match status {
            Ok(_) => {}
            Err(err) if err.kind() == ErrorKind::NotFound => return Err(self.not_found()),
            Err(err) => return Err(err.into()),
        }

        if !self.image.is_file() {
            return Err(HarnessError::InvalidArgument(format!(
                "firmware image {} does not exist",
                self.image.display()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    const MISSING_TOOL: &str = "/nonexistent/hilrun-test/arm-none-eabi-addr2line";

    #[test]
    fn probe_reports_missing_tool()
    {
        let tool = Addr2LineTool::new(MISSING_TOOL, "fw.elf");
        match tool.probe() {
            Err(HarnessError::ToolNotFound { tool, .. }) => assert_eq!(tool, MISSING_TOOL),
            other => panic!("expected ToolNotFound, got {other:?}"),
        }
    }

    #[test]
    fn resolve_with_missing_tool_is_recoverable()
    {
        let tool = Addr2LineTool::new(MISSING_TOOL, "fw.elf");
        let err = tool.resolve("0x08001000").unwrap_err();
        assert!(matches!(err, HarnessError::ResolverUnavailable { ref address, .. } if address == "0x08001000"));
        assert!(!err.is_fatal());
    }
}
