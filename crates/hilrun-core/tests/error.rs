//! Tests for error handling

use hilrun_core::error::{HarnessError, HarnessResult, JLINK_HINT, TOOLCHAIN_HINT};
use hilrun_core::Verdict;

#[test]
fn test_tool_not_found_names_tool_and_hint()
{
    let error = HarnessError::ToolNotFound {
        tool: "arm-none-eabi-addr2line".to_string(),
        hint: TOOLCHAIN_HINT,
    };
    let message = format!("{}", error);
    assert!(message.contains("arm-none-eabi-addr2line not found"));
    assert!(message.contains("ARM GNU toolchain"));
}

#[test]
fn test_connection_timeout_display()
{
    let error = HarnessError::ConnectionTimeout("localhost:3333".to_string());
    let message = format!("{}", error);
    assert!(message.contains("Connection timed out"));
    assert!(message.contains("3333"));
}

#[test]
fn test_backend_failed_includes_output()
{
    let error = HarnessError::BackendFailed {
        tool: "JLinkGDBServer".to_string(),
        output: "Could not connect to J-Link.".to_string(),
    };
    let message = format!("{}", error);
    assert!(message.starts_with("Error starting JLinkGDBServer"));
    assert!(message.contains("Could not connect"));
}

#[test]
fn test_resolver_unavailable_is_the_only_recoverable_error()
{
    let recoverable = HarnessError::ResolverUnavailable {
        address: "0x1".to_string(),
        reason: "exit status 1".to_string(),
    };
    assert!(!recoverable.is_fatal());

    let fatal = [
        HarnessError::ToolNotFound {
            tool: "JLinkGDBServer".to_string(),
            hint: JLINK_HINT,
        },
        HarnessError::ConnectionTimeout("gdb".to_string()),
        HarnessError::BackendExited {
            tool: "JLinkGDBServer".to_string(),
            status: "exit status: 1".to_string(),
        },
        HarnessError::InvalidArgument("bad".to_string()),
    ];
    for error in &fatal {
        assert!(error.is_fatal(), "{error} should be fatal");
        assert_eq!(error.verdict(), Verdict::Error);
    }
}

#[test]
fn test_io_error_conversion()
{
    let io_error = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe closed");
    let error: HarnessError = io_error.into();

    match error {
        HarnessError::Io(_) => {
            // Expected
        }
        _ => panic!("Expected Io variant"),
    }
}

#[test]
fn test_result_type_alias()
{
    fn returns_result() -> HarnessResult<i32>
    {
        Ok(42)
    }

    assert_eq!(returns_result().unwrap(), 42);
}
