//! In-process DWARF symbolizer.
//!
//! Useful on hosts without an ARM toolchain installed. The image is parsed
//! once, on first use, and the `addr2line` context is kept for the run.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use addr2line::Context;
use gimli::{Dwarf, EndianArcSlice, RunTimeEndian, SectionId};
use object::{Object, ObjectSection};
use once_cell::unsync::OnceCell;
use tracing::{debug, info};

use super::{parse_hex_address, SymbolResolver};
use crate::error::{HarnessError, HarnessResult};
use crate::types::Location;

type OwnedReader = EndianArcSlice<RunTimeEndian>;

/// Resolver reading line tables straight from the firmware ELF.
pub struct DwarfResolver
{
    image: PathBuf,
    context: OnceCell<Context<OwnedReader>>,
}

impl DwarfResolver
{
    pub fn new(image: impl Into<PathBuf>) -> Self
    {
        Self {
            image: image.into(),
            context: OnceCell::new(),
        }
    }

    fn context(&self) -> HarnessResult<&Context<OwnedReader>>
    {
        self.context.get_or_try_init(|| load_context(&self.image))
    }
}

impl std::fmt::Debug for DwarfResolver
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result
    {
        f.debug_struct("DwarfResolver")
            .field("image", &self.image)
            .field("loaded", &self.context.get().is_some())
            .finish()
    }
}

impl SymbolResolver for DwarfResolver
{
    fn resolve(&self, address: &str) -> HarnessResult<Location>
    {
        let unavailable = |reason: String| HarnessError::ResolverUnavailable {
            address: address.to_string(),
            reason,
        };

        let probe = parse_hex_address(address).ok_or_else(|| unavailable("not a hex address".to_string()))?;
        let context = self.context().map_err(|err| unavailable(err.to_string()))?;
        let found = context
            .find_location(probe)
            .map_err(|err| unavailable(format!("DWARF lookup failed: {err}")))?;

        let location = match found {
            Some(addr2line::Location {
                file: Some(file),
                line: Some(line),
                ..
            }) => Location::new(format!("{file}:{line}")),
            Some(addr2line::Location { file: Some(file), .. }) => Location::new(format!("{file}:?")),
            _ => Location::unknown(),
        };
        debug!(address, %location, "resolved from DWARF");
        Ok(location)
    }

    fn probe(&self) -> HarnessResult<()>
    {
        self.context().map(|_| ())
    }
}

fn load_context(path: &Path) -> HarnessResult<Context<OwnedReader>>
{
    let bytes = fs::read(path).map_err(|err| {
        HarnessError::InvalidArgument(format!("cannot read firmware image {}: {err}", path.display()))
    })?;
    let file = object::File::parse(&*bytes)
        .map_err(|err| HarnessError::InvalidArgument(format!("failed to parse {}: {err}", path.display())))?;

    let endian = if file.is_little_endian() {
        RunTimeEndian::Little
    } else {
        RunTimeEndian::Big
    };

    let dwarf = Dwarf::load(|section: SectionId| -> Result<OwnedReader, gimli::Error> {
        let data = file
            .section_by_name(section.name())
            .and_then(|s| s.uncompressed_data().ok())
            .map_or_else(|| Arc::<[u8]>::from(Vec::new()), |data| Arc::<[u8]>::from(&*data));
        Ok(EndianArcSlice::new(data, endian))
    })
    .map_err(|err| HarnessError::InvalidArgument(format!("failed to load DWARF: {err}")))?;

    let context = Context::from_dwarf(dwarf)
        .map_err(|err| HarnessError::InvalidArgument(format!("failed to build addr2line context: {err}")))?;
    info!(image = %path.display(), "loaded DWARF line tables");
    Ok(context)
}
