//! Test registry - all test cases are registered here

pub mod helpers;

use crate::runner::TestCase;

/// Build and return all test cases
///
/// Tests are grouped by category. Each test:
/// 1. Queues a mock provider response (what the completion API would stream)
/// 2. Sends a chat history to the REAL relay
/// 3. Validates the frames and what the provider received
pub fn all_tests() -> Vec<TestCase> {
    macro_rules! test {
        ($name:expr, $desc:expr, $func:path) => {
            TestCase {
                name: $name,
                description: $desc,
                run: Box::new(|ctx| Box::pin($func(ctx))),
            }
        };
    }

    vec![
        // ── Streaming ─────────────────────────────────────────────────────────
        test!(
            "streaming/chunks_in_order",
            "Provider chunks arrive as ordered frames followed by [DONE]",
            streaming::test_chunks_forwarded_in_order
        ),
        test!(
            "streaming/conversation_forwarded",
            "Provider receives alternating roles, model, params and bearer key",
            streaming::test_conversation_forwarded
        ),
        test!(
            "streaming/history_sanitized",
            "Scripts removed and disallowed tags unwrapped before forwarding",
            streaming::test_history_sanitized
        ),
        test!(
            "streaming/invalid_entries_dropped",
            "Blank and non-string history entries are skipped",
            streaming::test_invalid_entries_dropped
        ),
        test!(
            "streaming/multiline_escaped",
            "Newlines inside chunks are escaped to keep one frame per chunk",
            streaming::test_multiline_chunk_escaped
        ),
        test!(
            "streaming/long_history_truncated",
            "Only the most recent 100 messages are forwarded",
            streaming::test_long_history_truncated
        ),
        test!(
            "streaming/headers",
            "Event stream carries no-cache, no-buffering and CORS headers",
            streaming::test_stream_headers
        ),

        // ── Errors ────────────────────────────────────────────────────────────
        test!(
            "errors/missing_history",
            "Bodies without chatHistory get 400 Missing chat data",
            errors::test_missing_history
        ),
        test!(
            "errors/no_valid_message",
            "Histories with nothing usable get 400 No valid message",
            errors::test_no_valid_message
        ),
        test!(
            "errors/payload_too_large",
            "Bodies over the configured limit get 413",
            errors::test_payload_too_large
        ),
        test!(
            "errors/provider_rate_limited",
            "Provider 429 becomes a rate limit ERROR frame",
            errors::test_provider_rate_limited
        ),
        test!(
            "errors/provider_invalid_key",
            "Provider 401 becomes an invalid key ERROR frame",
            errors::test_provider_invalid_key
        ),
        test!(
            "errors/provider_quota",
            "Quota exhaustion becomes a quota ERROR frame",
            errors::test_provider_quota
        ),
        test!(
            "errors/provider_server_error",
            "Unclassified provider errors carry the provider text",
            errors::test_provider_server_error
        ),
        test!(
            "errors/mid_stream_error",
            "Error object mid-stream ends the stream after forwarded chunks",
            errors::test_mid_stream_error
        ),
        test!(
            "errors/empty_completion",
            "Completion without content ends with the empty-response error",
            errors::test_empty_completion
        ),

        // ── Endpoints ─────────────────────────────────────────────────────────
        test!("endpoints/health", "/health returns OK", endpoints::test_health),
        test!("endpoints/index", "/ serves the chat page", endpoints::test_index_page),
        test!(
            "endpoints/security_headers",
            "All responses carry hardening headers",
            endpoints::test_security_headers
        ),
        test!(
            "endpoints/unknown_route",
            "Unknown routes return 404",
            endpoints::test_unknown_route
        ),
    ]
}
