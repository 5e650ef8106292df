//! Tests for value types

use hilrun_core::types::{Location, OutputLine, Verdict};

#[test]
fn test_verdict_exit_codes()
{
    assert_eq!(Verdict::Pass.exit_code(), 0);
    for verdict in [Verdict::Fail, Verdict::Timeout, Verdict::Error] {
        assert_ne!(verdict.exit_code(), 0, "{verdict} must exit non-zero");
    }
}

#[test]
fn test_verdict_display()
{
    assert_eq!(Verdict::Pass.to_string(), "PASS");
    assert_eq!(Verdict::Fail.to_string(), "FAIL");
    assert_eq!(Verdict::Timeout.to_string(), "TIMEOUT");
    assert_eq!(Verdict::Error.to_string(), "ERROR");
}

#[test]
fn test_output_line_sanitize()
{
    let line = OutputLine::sanitize("`PC   : 0x08001000\r\n");
    assert_eq!(line.as_str(), "PC   : 0x08001000");
    assert_eq!(line.to_string(), "PC   : 0x08001000");
}

#[test]
fn test_output_line_keeps_interior_spacing()
{
    let line = OutputLine::sanitize("UFSR DIVBYZERO    : 0");
    assert_eq!(line.as_str(), "UFSR DIVBYZERO    : 0");
}

#[test]
fn test_location_unknown_sentinel()
{
    let unknown = Location::unknown();
    assert_eq!(unknown.as_str(), Location::UNKNOWN);
    assert!(unknown.is_unknown());
    assert_eq!(unknown.line_number(), Some("0"));
}

#[test]
fn test_location_line_number()
{
    assert_eq!(Location::new("test/test_sample.c:17").line_number(), Some("17"));
    assert_eq!(Location::new("no-colon").line_number(), None);
}
