//! Resolved source locations.

use std::fmt;

/// A resolved `file:line` location for a code address
///
/// The text is kept exactly as the symbolizer produced it. Symbolizers report
/// a failed lookup with a `??` file component (`??:0`, `??:?`), which is
/// treated as [`Location::UNKNOWN`].
///
/// ## Example
///
/// ```rust
/// use hilrun_core::types::Location;
///
/// let loc = Location::new("src/main.c:42");
/// assert_eq!(loc.line_number(), Some("42"));
/// assert!(Location::unknown().is_unknown());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Location(String);

impl Location
{
    /// Sentinel text for an address that could not be resolved.
    pub const UNKNOWN: &'static str = "??:0";

    /// Wrap symbolizer output. Empty output becomes the unknown sentinel.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self
    {
        let text = text.into();
        if text.is_empty() {
            Self::unknown()
        } else {
            Location(text)
        }
    }

    /// The `??:0` sentinel.
    #[must_use]
    pub fn unknown() -> Self
    {
        Location(Self::UNKNOWN.to_string())
    }

    /// Whether the symbolizer failed to find this address.
    #[must_use]
    pub fn is_unknown(&self) -> bool
    {
        self.0.starts_with("??")
    }

    /// The line-number component of the `file:line` pair.
    ///
    /// Taken after the last `:` so drive-letter paths (`C:/src/a.c:12`) work,
    /// with GNU addr2line's ` (discriminator N)` suffix dropped. Returns `None`
    /// when the text has no `:` at all.
    #[must_use]
    pub fn line_number(&self) -> Option<&str>
    {
        let text = match self.0.find(" (discriminator") {
            Some(idx) => &self.0[..idx],
            None => self.0.as_str(),
        };
        text.rsplit_once(':').map(|(_, line)| line.trim())
    }

    /// Borrow the location text.
    #[must_use]
    pub fn as_str(&self) -> &str
    {
        &self.0
    }
}

impl fmt::Display for Location
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.write_str(&self.0)
    }
}
