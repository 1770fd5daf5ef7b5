//! Length-bounding helpers for text handed back to an agent.

/// Result of bounding a string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TruncatedText {
    pub text: String,
    pub truncated: bool,
}

/// Keep at most `max_chars` characters of `text`, appending `marker` when
/// anything was cut. Never splits a UTF-8 sequence.
pub fn truncate_chars(text: &str, max_chars: usize, marker: &str) -> TruncatedText {
    match text.char_indices().nth(max_chars) {
        None => TruncatedText {
            text: text.to_string(),
            truncated: false,
        },
        Some((byte_index, _)) => {
            let mut bounded = String::with_capacity(byte_index + marker.len());
            bounded.push_str(&text[..byte_index]);
            bounded.push_str(marker);
            TruncatedText {
                text: bounded,
                truncated: true,
            }
        }
    }
}
