//! Tests for error types

use lst_bench::Error;

#[test]
fn test_retries_exhausted_error() {
    let error = Error::RetriesExhausted {
        max_retries: 3,
        diagnostic: "deadlock; SQL State: 40001; Error Code: 1205".to_string(),
    };
    let error_str = format!("{error}");
    assert!(error_str.contains("Query execution (3 retries) unsuccessful"));
    assert!(error_str.contains("SQL State: 40001"));
    assert!(error_str.contains("Error Code: 1205"));
    assert!(error.is_retries_exhausted());
}

#[test]
fn test_client_error() {
    let error = Error::Client("connection is closed".to_string());
    let error_str = format!("{error}");
    assert!(error_str.contains("Client error"));
    assert!(error_str.contains("connection is closed"));
    assert!(!error.is_retries_exhausted());
}

#[test]
fn test_invalid_workload_error() {
    let error = Error::InvalidWorkload("unknown task template 'x'".to_string());
    let error_str = format!("{error}");
    assert!(error_str.contains("Invalid workload"));
    assert!(error_str.contains("unknown task template"));
}

#[test]
fn test_invalid_config_error() {
    let error = Error::InvalidConfig("endpoint 4 out of range".to_string());
    let error_str = format!("{error}");
    assert!(error_str.contains("Invalid configuration"));
    assert!(error_str.contains("out of range"));
}

#[test]
fn test_invalid_input_error() {
    let error = Error::InvalidInput("row has 2 values but result has 3 columns".to_string());
    let error_str = format!("{error}");
    assert!(error_str.contains("Invalid input"));
    assert!(error_str.contains("3 columns"));
}

#[test]
fn test_session_failed_error_keeps_source() {
    use std::error::Error as _;

    let error = Error::SessionFailed {
        phase_id: "single_user".to_string(),
        session: 2,
        source: Box::new(Error::Client("failed to close connection: io".to_string())),
    };
    let error_str = format!("{error}");
    assert!(error_str.contains("Session 2 of phase 'single_user' failed"));
    assert!(error_str.contains("failed to close connection"));
    assert!(error.source().is_some());
}

#[test]
fn test_worker_panicked_error() {
    let error = Error::WorkerPanicked("task 7 panicked".to_string());
    let error_str = format!("{error}");
    assert!(error_str.contains("terminated abnormally"));
    assert!(error_str.contains("task 7 panicked"));
}

#[test]
fn test_regex_error_conversion() {
    let regex_error = regex::Regex::new("(unclosed").unwrap_err();
    let error: Error = regex_error.into();
    assert!(format!("{error}").contains("Invalid rewrite pattern"));
}

#[test]
fn test_io_error_conversion() {
    let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
    let error: Error = io_error.into();
    let error_str = format!("{error}");
    assert!(error_str.contains("IO error"));
    assert!(error_str.contains("file not found"));
}

#[test]
fn test_json_error_conversion() {
    let json_error = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
    let error: Error = json_error.into();
    assert!(format!("{error}").contains("JSON error"));
}

#[test]
fn test_other_error() {
    let error = Error::Other("custom error".to_string());
    assert_eq!(format!("{error}"), "custom error");
}

#[test]
fn test_error_debug() {
    let error = Error::Client("test".to_string());
    let debug_str = format!("{error:?}");
    assert!(debug_str.contains("Client"));
}
