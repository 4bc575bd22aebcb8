//! Client history validation and HTML allow-listing

use serde_json::Value;

use crate::config::LimitsConfig;
use crate::conversation::SanitizedMessage;

/// JSON field carrying the ordered list of message strings
pub const HISTORY_FIELD: &str = "chatHistory";

/// Formatting tags that survive cleaning
const ALLOWED_TAGS: &[&str] = &[
    "p", "br", "b", "strong", "i", "em", "code", "pre", "ul", "ol", "li", "h1", "h2", "h3", "blockquote",
];

/// Tags whose `class` attribute is kept (syntax highlighting hints)
const CLASS_ATTRIBUTE_TAGS: &[&str] = &["code", "pre"];

/// Tags removed together with their text content
const CONTENT_STRIPPED_TAGS: &[&str] = &["script", "style"];

/// Upper bound on re-cleaning passes while looking for a fixpoint
const MAX_CLEAN_PASSES: usize = 4;

/// Client-side input failures, detected before any provider call
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SanitizeError {
    #[error("Missing chat data")]
    MissingInput,

    #[error("No valid message")]
    NoValidInput,
}

/// Outcome of sanitizing one request body
#[derive(Debug, Clone)]
pub struct SanitizedHistory {
    pub messages: Vec<SanitizedMessage>,
    /// Entries in the submitted list before truncation
    pub received: usize,
}

impl SanitizedHistory {
    /// Entries that were truncated away or filtered out
    pub fn dropped(&self) -> usize {
        self.received.saturating_sub(self.messages.len())
    }
}

pub struct Sanitizer {
    cleaner: ammonia::Builder<'static>,
    max_messages: usize,
    max_message_chars: usize,
}

impl Sanitizer {
    pub fn new(limits: &LimitsConfig) -> Self {
        let mut cleaner = ammonia::Builder::empty();
        cleaner
            .add_tags(ALLOWED_TAGS)
            .add_clean_content_tags(CONTENT_STRIPPED_TAGS);
        for tag in CLASS_ATTRIBUTE_TAGS {
            cleaner.add_tag_attributes(*tag, &["class"]);
        }

        Self {
            cleaner,
            max_messages: limits.max_messages,
            max_message_chars: limits.max_message_chars,
        }
    }

    /// Strip every tag and attribute outside the allow-list.
    ///
    /// The HTML parser drops one newline after `<pre>` on every pass, so
    /// leading newlines inside `<pre>` are removed and the result re-cleaned
    /// until cleaning it again changes nothing.
    pub fn clean_html(&self, raw: &str) -> String {
        let mut cleaned = self.cleaner.clean(raw).to_string();
        for _ in 0..MAX_CLEAN_PASSES {
            let next = self.cleaner.clean(&trim_pre_leading_newlines(&cleaned)).to_string();
            if next == cleaned {
                break;
            }
            cleaned = next;
        }
        cleaned
    }

    /// Clean one message, or None if it is blank or too long once cleaned
    pub fn sanitize_message(&self, raw: &str) -> Option<SanitizedMessage> {
        if raw.trim().is_empty() {
            return None;
        }

        let cleaned = self.clean_html(raw);
        if cleaned.trim().is_empty() {
            tracing::debug!("Message empty after cleaning, dropped");
            return None;
        }

        let chars = cleaned.chars().count();
        if chars > self.max_message_chars {
            tracing::debug!(
                chars = chars,
                limit = self.max_message_chars,
                "Message over length limit after cleaning, dropped"
            );
            return None;
        }

        Some(SanitizedMessage::new_unchecked(cleaned))
    }

    /// Extract, bound and clean the history list of a request body.
    ///
    /// Only the most recent `max_messages` entries are considered; entries that
    /// are not strings, blank, or too long after cleaning are skipped.
    pub fn sanitize_history(&self, body: &Value) -> Result<SanitizedHistory, SanitizeError> {
        let history = match body.get(HISTORY_FIELD) {
            None | Some(Value::Null) => return Err(SanitizeError::MissingInput),
            Some(history) => history,
        };

        let entries = history.as_array().ok_or(SanitizeError::NoValidInput)?;
        let received = entries.len();
        let recent = &entries[received.saturating_sub(self.max_messages)..];

        let messages: Vec<SanitizedMessage> = recent
            .iter()
            .filter_map(Value::as_str)
            .filter_map(|raw| self.sanitize_message(raw))
            .collect();

        if messages.is_empty() {
            return Err(SanitizeError::NoValidInput);
        }

        Ok(SanitizedHistory { messages, received })
    }
}

/// Remove newlines directly following each `<pre>` start tag
fn trim_pre_leading_newlines(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut rest = html;
    while let Some(start) = rest.find("<pre") {
        let after = &rest[start + 4..];
        if !(after.starts_with('>') || after.starts_with(' ')) {
            out.push_str(&rest[..start + 4]);
            rest = after;
            continue;
        }
        let Some(close) = after.find('>') else {
            break;
        };
        let tag_end = start + 4 + close + 1;
        out.push_str(&rest[..tag_end]);
        rest = rest[tag_end..].trim_start_matches(|c: char| c == '\n' || c == '\r');
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sanitizer() -> Sanitizer {
        Sanitizer::new(&LimitsConfig::default())
    }

    fn texts(history: &SanitizedHistory) -> Vec<&str> {
        history.messages.iter().map(|m| m.as_str()).collect()
    }

    #[test]
    fn test_plain_text_unchanged() {
        let s = sanitizer();
        assert_eq!(s.clean_html("How are you?"), "How are you?");
    }

    #[test]
    fn test_script_removed_with_content() {
        let s = sanitizer();
        let cleaned = s.clean_html("Hello <script>alert('x')</script>world");
        assert_eq!(cleaned, "Hello world");
        assert!(!cleaned.contains("script"));
        assert!(!cleaned.contains("alert"));
    }

    #[test]
    fn test_allowed_tags_kept() {
        let s = sanitizer();
        assert_eq!(s.clean_html("<p>Hi <strong>there</strong></p>"), "<p>Hi <strong>there</strong></p>");
        assert_eq!(s.clean_html("<h1>Title</h1>"), "<h1>Title</h1>");
        assert_eq!(s.clean_html("<ul><li>one</li></ul>"), "<ul><li>one</li></ul>");
        assert_eq!(s.clean_html("<b>bold</b> <i>italic</i>"), "<b>bold</b> <i>italic</i>");
    }

    #[test]
    fn test_disallowed_tags_stripped_text_kept() {
        let s = sanitizer();
        assert_eq!(s.clean_html("<h4>Deep</h4>"), "Deep");
        assert_eq!(s.clean_html("<div>boxed</div>"), "boxed");
        assert_eq!(s.clean_html(r#"<a href="http://evil.example">link</a>"#), "link");
    }

    #[test]
    fn test_attributes_filtered() {
        let s = sanitizer();
        assert_eq!(s.clean_html(r#"<p onclick="steal()" class="x">Hi</p>"#), "<p>Hi</p>");
        assert_eq!(
            s.clean_html(r#"<pre class="block"><code class="language-rust" id="c1">fn main() {}</code></pre>"#),
            r#"<pre class="block"><code class="language-rust">fn main() {}</code></pre>"#
        );
    }

    #[test]
    fn test_cleaning_is_idempotent() {
        let s = sanitizer();
        let samples = [
            "plain text",
            "a < b && c > d",
            "<p onclick=\"x()\">Hi <em>you</em></p>",
            "Hello <script>alert(1)</script><b>bold</b>",
            "<pre class=\"x\"><code class=\"rust\">let a = 1;</code></pre>",
            "<ul><li>one<li>two</ul>",
            "<blockquote>quoted <img src=x onerror=alert(1)></blockquote>",
            "<pre>\n\nx</pre>",
            "<pre>\n\n\nx</pre>",
            "<pre class=\"x\">\n\n\n\nx\ny</pre>",
            "<p>a</p><pre>\n\nfirst</pre><pre>\n\nsecond</pre>",
        ];
        for sample in samples {
            let once = s.clean_html(sample);
            let twice = s.clean_html(&once);
            assert_eq!(once, twice, "not idempotent for {:?}", sample);
        }
    }

    #[test]
    fn test_pre_leading_newlines_removed() {
        let s = sanitizer();
        assert_eq!(s.clean_html("<pre>\n\nx</pre>"), "<pre>x</pre>");
        assert_eq!(s.clean_html("<pre>a\n\nb</pre>"), "<pre>a\n\nb</pre>");
        let message = s.sanitize_message("<pre>\n\n\nx</pre>").unwrap();
        assert_eq!(s.sanitize_message(message.as_str()).unwrap(), message);
    }

    #[test]
    fn test_trim_pre_leading_newlines() {
        assert_eq!(trim_pre_leading_newlines("<pre>\n\nx</pre>"), "<pre>x</pre>");
        assert_eq!(
            trim_pre_leading_newlines("<pre class=\"c\">\nx</pre><pre>\ny</pre>"),
            "<pre class=\"c\">x</pre><pre>y</pre>"
        );
        assert_eq!(trim_pre_leading_newlines("<preview>\nx"), "<preview>\nx");
        assert_eq!(trim_pre_leading_newlines("no tags\n"), "no tags\n");
    }

    #[test]
    fn test_sanitize_message_drops_blank() {
        let s = sanitizer();
        assert!(s.sanitize_message("").is_none());
        assert!(s.sanitize_message("   \n\t").is_none());
        // Nothing left once the script element is removed
        assert!(s.sanitize_message("<script>alert(1)</script>").is_none());
    }

    #[test]
    fn test_length_limit_inclusive() {
        let s = sanitizer();
        assert!(s.sanitize_message(&"a".repeat(8000)).is_some());
        assert!(s.sanitize_message(&"a".repeat(8001)).is_none());
    }

    #[test]
    fn test_length_measured_after_cleaning() {
        let s = sanitizer();
        // Each '<' is escaped to "&lt;" (4 chars)
        assert!(s.sanitize_message(&"<".repeat(2000)).is_some());
        assert!(s.sanitize_message(&"<".repeat(2001)).is_none());
        // Stripped markup does not count toward the limit
        let wrapped = format!("<div>{}</div>", "a".repeat(8000));
        assert!(s.sanitize_message(&wrapped).is_some());
    }

    #[test]
    fn test_length_counts_characters_not_bytes() {
        let s = sanitizer();
        assert!(s.sanitize_message(&"é".repeat(8000)).is_some());
    }

    #[test]
    fn test_history_scenario() {
        let s = sanitizer();
        let body = json!({"chatHistory": ["Hello", "Hi there", "How are you?"]});
        let history = s.sanitize_history(&body).unwrap();
        assert_eq!(texts(&history), vec!["Hello", "Hi there", "How are you?"]);
        assert_eq!(history.received, 3);
        assert_eq!(history.dropped(), 0);
    }

    #[test]
    fn test_history_missing_field() {
        let s = sanitizer();
        assert_eq!(s.sanitize_history(&json!({})).unwrap_err(), SanitizeError::MissingInput);
        assert_eq!(s.sanitize_history(&json!({"history": ["hi"]})).unwrap_err(), SanitizeError::MissingInput);
        assert_eq!(s.sanitize_history(&json!({"chatHistory": null})).unwrap_err(), SanitizeError::MissingInput);
        assert_eq!(s.sanitize_history(&json!(["hi"])).unwrap_err(), SanitizeError::MissingInput);
    }

    #[test]
    fn test_history_not_a_list() {
        let s = sanitizer();
        assert_eq!(
            s.sanitize_history(&json!({"chatHistory": "Hello"})).unwrap_err(),
            SanitizeError::NoValidInput
        );
    }

    #[test]
    fn test_history_all_filtered() {
        let s = sanitizer();
        let body = json!({"chatHistory": ["", "   ", 42, null, {"text": "hi"}]});
        assert_eq!(s.sanitize_history(&body).unwrap_err(), SanitizeError::NoValidInput);
        assert_eq!(s.sanitize_history(&json!({"chatHistory": []})).unwrap_err(), SanitizeError::NoValidInput);
    }

    #[test]
    fn test_history_skips_non_strings_and_blanks() {
        let s = sanitizer();
        let body = json!({"chatHistory": ["one", 2, "", "three", false]});
        let history = s.sanitize_history(&body).unwrap();
        assert_eq!(texts(&history), vec!["one", "three"]);
        assert_eq!(history.dropped(), 3);
    }

    #[test]
    fn test_history_keeps_most_recent() {
        let s = sanitizer();
        let raw: Vec<String> = (0..150).map(|i| format!("m{}", i)).collect();
        let history = s.sanitize_history(&json!({ "chatHistory": raw })).unwrap();

        assert_eq!(history.messages.len(), 100);
        assert_eq!(history.received, 150);
        let expected: Vec<String> = (50..150).map(|i| format!("m{}", i)).collect();
        assert_eq!(texts(&history), expected.iter().map(String::as_str).collect::<Vec<_>>());
    }

    #[test]
    fn test_history_truncates_before_filtering() {
        let s = sanitizer();
        let mut raw: Vec<String> = (0..101).map(|i| format!("m{}", i)).collect();
        raw[100] = String::new();
        let history = s.sanitize_history(&json!({ "chatHistory": raw })).unwrap();

        // m0 falls off the window; the blank last entry is then filtered
        assert_eq!(history.messages.len(), 99);
        assert_eq!(history.messages[0].as_str(), "m1");
        assert_eq!(history.messages[98].as_str(), "m99");
    }

    #[test]
    fn test_history_respects_configured_limits() {
        let limits = LimitsConfig {
            max_messages: 2,
            max_message_chars: 5,
            ..LimitsConfig::default()
        };
        let s = Sanitizer::new(&limits);
        let body = json!({"chatHistory": ["first", "too long", "ok"]});
        let history = s.sanitize_history(&body).unwrap();
        assert_eq!(texts(&history), vec!["ok"]);
    }

    #[test]
    fn test_history_cleans_markup() {
        let s = sanitizer();
        let body = json!({"chatHistory": ["<script>x()</script>Hi <span>there</span> <b>you</b>"]});
        let history = s.sanitize_history(&body).unwrap();
        assert_eq!(texts(&history), vec!["Hi there <b>you</b>"]);
    }
}
