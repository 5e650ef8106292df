//! # Symbol Resolution
//!
//! Maps a code address printed by the firmware's fault handler to the
//! `file:line` it belongs to.
//!
//! Every resolver is bound to one firmware image at construction time, so
//! callers only pass the address. Three implementations are provided:
//!
//! - [`Addr2LineTool`]: runs the toolchain's `addr2line` once per address
//! - [`DwarfResolver`]: reads the image's DWARF line tables in-process
//! - [`CachedResolver`]: memoizing wrapper around either of the above
//!
//! A resolver error for a single address is never fatal to a run; the
//! annotator degrades it to [`Location::UNKNOWN`]. Only [`SymbolResolver::probe`]
//! failures abort, and they do so before any backend output is consumed.

pub mod cache;
pub mod dwarf;
pub mod tool;

pub use cache::CachedResolver;
pub use dwarf::DwarfResolver;
pub use tool::Addr2LineTool;

use crate::config::{HarnessConfig, SymbolizerKind};
use crate::error::HarnessResult;
use crate::types::Location;

/// Address to source-location lookup for one firmware image.
pub trait SymbolResolver
{
    /// Resolve a hexadecimal address operand such as `0x08001000`.
    ///
    /// ## Errors
    ///
    /// Returns [`crate::error::HarnessError::ResolverUnavailable`] when the
    /// lookup itself could not be performed. A lookup that ran but found
    /// nothing returns the unknown location instead.
    fn resolve(&self, address: &str) -> HarnessResult<Location>;

    /// Check that the resolver can work at all.
    ///
    /// Called once before a run starts so a missing symbolizer aborts the
    /// run before any output is printed.
    ///
    /// ## Errors
    ///
    /// Returns [`crate::error::HarnessError::ToolNotFound`] or an image
    /// loading error.
    fn probe(&self) -> HarnessResult<()>
    {
        Ok(())
    }
}

impl<R: SymbolResolver + ?Sized> SymbolResolver for Box<R>
{
    fn resolve(&self, address: &str) -> HarnessResult<Location>
    {
        (**self).resolve(address)
    }

    fn probe(&self) -> HarnessResult<()>
    {
        (**self).probe()
    }
}

impl<R: SymbolResolver + ?Sized> SymbolResolver for &R
{
    fn resolve(&self, address: &str) -> HarnessResult<Location>
    {
        (**self).resolve(address)
    }

    fn probe(&self) -> HarnessResult<()>
    {
        (**self).probe()
    }
}

/// Resolver backed by a closure, for embedding and tests.
///
/// ```rust
/// use hilrun_core::symbols::{FnResolver, SymbolResolver};
/// use hilrun_core::types::Location;
///
/// let resolver = FnResolver::new(|addr: &str| Ok(Location::new(format!("fw.c:{}", addr.len()))));
/// assert_eq!(resolver.resolve("0x1").unwrap().as_str(), "fw.c:3");
/// ```
pub struct FnResolver<F>(F);

impl<F> FnResolver<F>
where
    F: Fn(&str) -> HarnessResult<Location>,
{
    pub fn new(f: F) -> Self
    {
        FnResolver(f)
    }
}

impl<F> SymbolResolver for FnResolver<F>
where
    F: Fn(&str) -> HarnessResult<Location>,
{
    fn resolve(&self, address: &str) -> HarnessResult<Location>
    {
        (self.0)(address)
    }
}

/// Parse a `0x`-prefixed or bare hexadecimal address operand.
#[must_use]
pub fn parse_hex_address(operand: &str) -> Option<u64>
{
    let digits = operand
        .strip_prefix("0x")
        .or_else(|| operand.strip_prefix("0X"))
        .unwrap_or(operand);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    u64::from_str_radix(digits, 16).ok()
}

/// Build the memoizing resolver selected by `config`.
#[must_use]
pub fn create_resolver(config: &HarnessConfig) -> Box<dyn SymbolResolver>
{
    match config.symbolizer() {
        SymbolizerKind::Tool => Box::new(CachedResolver::new(Addr2LineTool::new(
            &config.tools().addr2line,
            config.image(),
        ))),
        SymbolizerKind::Builtin => Box::new(CachedResolver::new(DwarfResolver::new(config.image()))),
    }
}
