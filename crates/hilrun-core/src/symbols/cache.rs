//! Memoizing resolver wrapper.

use std::collections::HashMap;
use std::sync::RwLock;

use tracing::trace;

use super::SymbolResolver;
use crate::error::HarnessResult;
use crate::types::Location;

/// Caches successful lookups per address operand.
///
/// Fault dumps repeat the same PC across retries and multiple test cases;
/// spawning the symbolizer again for each is wasted time. Failures are not
/// cached, so a transient error does not stick for the rest of the run.
pub struct CachedResolver<R>
{
    inner: R,
    cache: RwLock<HashMap<String, Location>>,
}

impl<R: SymbolResolver> CachedResolver<R>
{
    pub fn new(inner: R) -> Self
    {
        Self {
            inner,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Number of distinct addresses resolved so far.
    #[must_use]
    pub fn len(&self) -> usize
    {
        self.cache.read().map_or(0, |cache| cache.len())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool
    {
        self.len() == 0
    }
}

impl<R: SymbolResolver> SymbolResolver for CachedResolver<R>
{
    fn resolve(&self, address: &str) -> HarnessResult<Location>
    {
        if let Some(hit) = self.cache.read().ok().and_then(|cache| cache.get(address).cloned()) {
            trace!(address, "symbol cache hit");
            return Ok(hit);
        }

        let location = self.inner.resolve(address)?;
        if let Ok(mut cache) = self.cache.write() {
            cache.insert(address.to_string(), location.clone());
        }
        Ok(location)
    }

    fn probe(&self) -> HarnessResult<()>
    {
        self.inner.probe()
    }
}

#[cfg(test)]
mod tests
{
    use std::cell::Cell;

    use super::*;
    use crate::error::HarnessError;
    use crate::symbols::FnResolver;

    #[test]
    fn repeated_address_hits_cache()
    {
        let calls = Cell::new(0);
        let resolver = CachedResolver::new(FnResolver::new(|_: &str| {
            calls.set(calls.get() + 1);
            Ok(Location::new("main.c:42"))
        }));

        assert_eq!(resolver.resolve("0x1").unwrap().as_str(), "main.c:42");
        assert_eq!(resolver.resolve("0x1").unwrap().as_str(), "main.c:42");
        assert_eq!(calls.get(), 1);
        assert_eq!(resolver.len(), 1);
    }

    #[test]
    fn failures_are_not_cached()
    {
        let calls = Cell::new(0);
        let resolver = CachedResolver::new(FnResolver::new(|addr: &str| {
            calls.set(calls.get() + 1);
            Err(HarnessError::ResolverUnavailable {
                address: addr.to_string(),
                reason: "offline".to_string(),
            })
        }));

        assert!(resolver.resolve("0x1").is_err());
        assert!(resolver.resolve("0x1").is_err());
        assert_eq!(calls.get(), 2);
        assert!(resolver.is_empty());
    }
}
