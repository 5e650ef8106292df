//! Captured-log backend.

use std::fs::File;
use std::io::{self, BufReader};
use std::path::PathBuf;

use super::{Backend, Session};
use crate::config::HarnessConfig;
use crate::error::{HarnessError, HarnessResult};

/// Re-interprets a saved backend log, or stdin when the path is `-`.
///
/// Handy for symbolizing a fault dump copied from a CI log.
#[derive(Debug, Clone)]
pub struct ReplayBackend
{
    source: PathBuf,
}

impl ReplayBackend
{
    pub fn new(source: impl Into<PathBuf>) -> Self
    {
        Self { source: source.into() }
    }
}

impl Backend for ReplayBackend
{
    fn name(&self) -> &'static str
    {
        "replay"
    }

    fn start(&self, _config: &HarnessConfig) -> HarnessResult<Session>
    {
        if self.source.as_os_str() == "-" {
            return Ok(Session::from_reader(BufReader::new(io::stdin())));
        }

        let file = File::open(&self.source).map_err(|err| {
            HarnessError::InvalidArgument(format!("cannot open log {}: {err}", self.source.display()))
        })?;
        Ok(Session::from_reader(BufReader::new(file)))
    }
}
