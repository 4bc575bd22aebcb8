//! Stats formatting for different output formats

use super::RelayMetrics;
use crate::config::StatsFormat;

/// Format metrics according to the configured format
pub fn format_metrics(metrics: &RelayMetrics, format: StatsFormat) -> String {
    match format {
        StatsFormat::Pretty => format_pretty(metrics),
        StatsFormat::Json => format_json(metrics),
        StatsFormat::Compact => format_compact(metrics),
    }
}

fn outcome_str(m: &RelayMetrics) -> String {
    let outcome = m.outcome.map(|o| o.as_str()).unwrap_or("unknown");
    match m.error_category {
        Some(ref category) => format!("{} ({})", outcome, category),
        None => outcome.to_string(),
    }
}

fn first_chunk_str(m: &RelayMetrics) -> String {
    m.first_chunk_ms
        .map(|ms| format!("{:.1}ms", ms))
        .unwrap_or_else(|| "N/A".to_string())
}

/// Pretty box format for terminal output
fn format_pretty(m: &RelayMetrics) -> String {
    format!(
        r#"┌──────────────────────────────────────────────────────────────────┐
│ Chat Relay Stream                                                │
├──────────────────────────────────────────────────────────────────┤
│ Request: {:56}│
│ Client:  {:56}│
│ Time:    {:56}│
├──────────────────────────────────────────────────────────────────┤
│ Input:  {:6} messages │ Sent: {:6} turns                     │
│ Output: {:6} chunks   │ {:8} chars │ {:8.1} chars/sec      │
├──────────────────────────────────────────────────────────────────┤
│ First chunk: {:52}│
│ Outcome: {:56}│
│ Duration: {:54.1}ms│
└──────────────────────────────────────────────────────────────────┘
"#,
        m.request_id,
        truncate(&m.origin, 56),
        m.timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
        m.received_messages,
        m.conversation_turns,
        m.chunks,
        m.output_chars,
        m.chars_per_second(),
        first_chunk_str(m),
        truncate(&outcome_str(m), 56),
        m.duration_ms,
    )
}

/// JSON format for structured logging
fn format_json(m: &RelayMetrics) -> String {
    serde_json::to_string(m).unwrap_or_else(|_| "{}".to_string())
}

/// Compact single-line format
fn format_compact(m: &RelayMetrics) -> String {
    format!(
        "[{}] from={} turns={} chunks={} chars={} first={} outcome={} dur={:.1}ms",
        m.timestamp.format("%H:%M:%S"),
        m.origin,
        m.conversation_turns,
        m.chunks,
        m.output_chars,
        first_chunk_str(m),
        outcome_str(m),
        m.duration_ms
    )
}

/// Truncate a string to max length with ellipsis
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
