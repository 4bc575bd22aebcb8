//! Common assertion helpers

use crate::types::PromptResponse;

/// Assert two strings are equal, with context on failure
pub fn assert_eq_str(actual: &str, expected: &str, label: &str) -> anyhow::Result<()> {
    if actual != expected {
        Err(anyhow::anyhow!("{label}: expected {:?} but got {:?}", expected, actual))
    } else {
        Ok(())
    }
}

/// Assert condition is true, with message
pub fn assert_true(cond: bool, msg: &str) -> anyhow::Result<()> {
    if !cond {
        Err(anyhow::anyhow!("{}", msg))
    } else {
        Ok(())
    }
}

/// Assert the relay opened an event stream
pub fn assert_stream(resp: &PromptResponse) -> anyhow::Result<()> {
    assert_true(resp.status == 200, &format!("Expected 200, got {}: {}", resp.status, resp.body))?;
    assert_true(
        resp.content_type.starts_with("text/event-stream"),
        &format!("Expected text/event-stream, got {:?}", resp.content_type),
    )
}

/// Assert a JSON error response with the given status and message
pub fn assert_json_error(resp: &PromptResponse, status: u16, message: &str) -> anyhow::Result<()> {
    assert_true(
        resp.status == status,
        &format!("Expected {}, got {}: {}", status, resp.status, resp.body),
    )?;
    let error = resp
        .json_error()
        .ok_or_else(|| anyhow::anyhow!("Response has no JSON error field: {}", resp.body))?;
    assert_eq_str(&error, message, "error message")
}

/// Assert the stream ended with the given ERROR payload and no [DONE]
pub fn assert_error_frame(resp: &PromptResponse, message: &str) -> anyhow::Result<()> {
    assert_stream(resp)?;
    assert_true(!resp.has_done_marker(), "Stream must not end with [DONE] after an error")?;
    let error = resp
        .error_frame()
        .ok_or_else(|| anyhow::anyhow!("Stream did not end with ERROR frame: {:?}", resp.frames))?;
    assert_eq_str(error, message, "error frame")
}
