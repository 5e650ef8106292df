//! One line of backend output.

use std::fmt;
use std::ops::Deref;

/// Characters removed from every line before classification.
const CONTROL_CHARS: [char; 3] = ['\0', '\r', '`'];

/// A single newline-stripped line of backend output
///
/// Construction always removes NUL, carriage return and backtick characters,
/// which semihosting consoles and GDB's stderr framing leave behind. Once
/// built the line is immutable; annotation produces a new `OutputLine`.
///
/// ## Example
///
/// ```rust
/// use hilrun_core::types::OutputLine;
///
/// let line = OutputLine::sanitize("`OK\r\0\n");
/// assert_eq!(line.as_str(), "OK");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OutputLine(String);

impl OutputLine
{
    /// Strip the trailing newline and all control characters from `raw`.
    #[must_use]
    pub fn sanitize(raw: &str) -> Self
    {
        let raw = raw.strip_suffix('\n').unwrap_or(raw);
        OutputLine(raw.chars().filter(|c| !CONTROL_CHARS.contains(c)).collect())
    }

    /// Decode raw bytes leniently, dropping invalid sequences, then sanitize.
    #[must_use]
    pub fn from_bytes(raw: &[u8]) -> Self
    {
        Self::sanitize(&decode_lenient(raw))
    }

    /// Borrow the line text.
    #[must_use]
    pub fn as_str(&self) -> &str
    {
        &self.0
    }

    /// Consume the line and return its text.
    #[must_use]
    pub fn into_string(self) -> String
    {
        self.0
    }

    /// Return a new line with `suffix` appended.
    #[must_use]
    pub(crate) fn with_suffix(&self, suffix: &str) -> Self
    {
        let mut text = String::with_capacity(self.0.len() + suffix.len());
        text.push_str(&self.0);
        text.push_str(suffix);
        OutputLine(text)
    }

    /// Return a new line with the first occurrence of `from` replaced by `to`.
    #[must_use]
    pub(crate) fn replace_first(&self, from: &str, to: &str) -> Self
    {
        OutputLine(self.0.replacen(from, to, 1))
    }
}

impl Deref for OutputLine
{
    type Target = str;

    fn deref(&self) -> &str
    {
        &self.0
    }
}

impl fmt::Display for OutputLine
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.write_str(&self.0)
    }
}

impl From<&str> for OutputLine
{
    fn from(raw: &str) -> Self
    {
        Self::sanitize(raw)
    }
}

/// Decode bytes as text, silently dropping anything that is not valid UTF-8.
///
/// Backends emit ASCII; stray bytes from a garbled transfer are removed
/// instead of being turned into replacement characters.
#[must_use]
pub fn decode_lenient(raw: &[u8]) -> String
{
    let mut out = String::with_capacity(raw.len());
    for chunk in raw.utf8_chunks() {
        out.push_str(chunk.valid());
    }
    out
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn strips_control_characters()
    {
        let line = OutputLine::sanitize("\0PC   : 0x1`\r");
        assert_eq!(line.as_str(), "PC   : 0x1");
    }

    #[test]
    fn invalid_bytes_are_dropped()
    {
        let line = OutputLine::from_bytes(b"O\xffK\xc3\n");
        assert_eq!(line.as_str(), "OK");
    }

    #[test]
    fn replace_first_only_touches_one_occurrence()
    {
        let line = OutputLine::sanitize("a:0:b:0:");
        assert_eq!(line.replace_first(":0:", ":7:").as_str(), "a:7:b:0:");
    }
}
