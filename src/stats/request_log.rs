//! One-line log of an inbound /prompt request

use crate::conversation::Conversation;

/// Longest message preview in the log line, in characters
const PREVIEW_CHARS: usize = 80;
/// Characters kept from the start of a long message; the rest come from its end
const PREVIEW_HEAD: usize = 30;
const PREVIEW_GAP: &str = " … ";

/// Format the inbound request line: origin, kept/received counts, last message preview
pub fn format_request_log(origin: &str, received: usize, conversation: &Conversation) -> String {
    let kept = conversation.len();
    let counts = if received == kept {
        format!("msgs={}", kept)
    } else {
        format!("msgs={}/{}", kept, received)
    };

    match conversation.last() {
        Some(turn) => format!(
            "→ /prompt from={} {} last={}:\"{}\"",
            origin,
            counts,
            turn.role,
            preview(turn.content.as_str())
        ),
        None => format!("→ /prompt from={} {}", origin, counts),
    }
}

/// Single-line preview: whitespace runs collapsed, long text elided in the middle
fn preview(text: &str) -> String {
    let words: Vec<&str> = text.split_whitespace().collect();
    let flat = words.join(" ");

    let chars: Vec<char> = flat.chars().collect();
    if chars.len() <= PREVIEW_CHARS {
        return flat;
    }

    let tail_len = PREVIEW_CHARS - PREVIEW_HEAD;
    let head: String = chars[..PREVIEW_HEAD].iter().collect();
    let tail: String = chars[chars.len() - tail_len..].iter().collect();
    format!("{}{}{}", head, PREVIEW_GAP, tail)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LimitsConfig;
    use crate::conversation::build_conversation;
    use crate::sanitize::Sanitizer;

    fn conversation(texts: &[&str]) -> Conversation {
        let sanitizer = Sanitizer::new(&LimitsConfig::default());
        build_conversation(texts.iter().filter_map(|t| sanitizer.sanitize_message(t)).collect())
    }

    #[test]
    fn test_log_line_all_kept() {
        let log = format_request_log("127.0.0.1", 3, &conversation(&["Hello", "Hi", "How are you?"]));
        assert_eq!(log, "→ /prompt from=127.0.0.1 msgs=3 last=user:\"How are you?\"");
    }

    #[test]
    fn test_log_line_reports_dropped() {
        let log = format_request_log("10.0.0.2", 5, &conversation(&["one", "two"]));
        assert!(log.contains("msgs=2/5"));
        assert!(log.contains("last=assistant:\"two\""));
    }

    #[test]
    fn test_log_line_empty_conversation() {
        let log = format_request_log("::1", 0, &Conversation::default());
        assert_eq!(log, "→ /prompt from=::1 msgs=0");
    }

    #[test]
    fn test_preview_collapses_whitespace() {
        assert_eq!(preview("a\nb\t\tc\r\n  d"), "a b c d");
    }

    #[test]
    fn test_preview_keeps_short_text() {
        let text = "y".repeat(PREVIEW_CHARS);
        assert_eq!(preview(&text), text);
    }

    #[test]
    fn test_preview_elides_middle() {
        let text = format!("{}{}{}", "a".repeat(40), "b".repeat(100), "c".repeat(60));
        let p = preview(&text);
        assert!(p.starts_with(&"a".repeat(PREVIEW_HEAD)));
        assert!(p.ends_with(&"c".repeat(PREVIEW_CHARS - PREVIEW_HEAD)));
        assert!(p.contains(PREVIEW_GAP));
        assert!(!p.contains('b'));
        assert_eq!(p.chars().count(), PREVIEW_CHARS + PREVIEW_GAP.chars().count());
    }

    #[test]
    fn test_preview_counts_chars_not_bytes() {
        let p = preview(&"é".repeat(200));
        assert_eq!(p.chars().count(), PREVIEW_CHARS + PREVIEW_GAP.chars().count());
    }
}
