//! Just enough shell syntax to split a command line into independently
//! checkable segments.
//!
//! ```text
//! Input:  "npm install && npm test | tail -5"
//! Output: ["npm install", "npm test", "tail -5"]
//! ```
//!
//! Segments keep their original quoting so they can be tokenized with
//! [`shell_words`] afterwards. Operators inside quotes or escaped with `\` do
//! not split.

use super::violation::PolicyViolation;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Quote {
    None,
    Single,
    Double,
}

/// Split `command` on `&&`, `||`, `;`, `|`, `|&`, a lone `&` and newlines.
///
/// Rejects command and process substitution anywhere it would be expanded,
/// since the substituted command would bypass segment extraction. Empty
/// segments are dropped.
///
/// `&` stays inside a segment only directly after an unescaped `>` or `<`
/// (`2>&1`, `>&2`, `<&0`). Commands run under `sh -c`, where `&>file` is a
/// background operator followed by a redirection, so it splits.
pub fn split_segments(command: &str) -> Result<Vec<String>, PolicyViolation> {
    let chars: Vec<char> = command.chars().collect();
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut quote = Quote::None;
    // Previous character was an unquoted, unescaped `>` or `<`.
    let mut after_redirect = false;
    let mut i = 0;

    while i < chars.len() {
        let ch = chars[i];
        let next = chars.get(i + 1).copied();

        match quote {
            Quote::Single => {
                if ch == '\'' {
                    quote = Quote::None;
                }
                current.push(ch);
                i += 1;
                continue;
            }
            Quote::Double => {
                match ch {
                    '\\' => {
                        current.push(ch);
                        if let Some(escaped) = next {
                            current.push(escaped);
                            i += 1;
                        }
                    }
                    '"' => {
                        quote = Quote::None;
                        current.push(ch);
                    }
                    '`' => return Err(PolicyViolation::CommandSubstitution),
                    '$' if next == Some('(') => return Err(PolicyViolation::CommandSubstitution),
                    _ => current.push(ch),
                }
                i += 1;
                continue;
            }
            Quote::None => {}
        }

        let redirect = after_redirect;
        after_redirect = false;
        match ch {
            '\\' => {
                current.push(ch);
                if let Some(escaped) = next {
                    current.push(escaped);
                    i += 1;
                }
            }
            '\'' => {
                quote = Quote::Single;
                current.push(ch);
            }
            '"' => {
                quote = Quote::Double;
                current.push(ch);
            }
            '`' => return Err(PolicyViolation::CommandSubstitution),
            '$' if next == Some('(') => return Err(PolicyViolation::CommandSubstitution),
            '<' | '>' if next == Some('(') => return Err(PolicyViolation::ProcessSubstitution),
            '<' | '>' => {
                after_redirect = true;
                current.push(ch);
            }
            ';' | '\n' => flush(&mut segments, &mut current),
            '|' => {
                if matches!(next, Some('|') | Some('&')) {
                    i += 1;
                }
                flush(&mut segments, &mut current);
            }
            '&' => {
                if redirect {
                    current.push(ch);
                } else {
                    if next == Some('&') {
                        i += 1;
                    }
                    flush(&mut segments, &mut current);
                }
            }
            _ => current.push(ch),
        }
        i += 1;
    }

    if quote != Quote::None {
        return Err(PolicyViolation::UnterminatedQuote);
    }
    flush(&mut segments, &mut current);
    Ok(segments)
}

fn flush(segments: &mut Vec<String>, current: &mut String) {
    let trimmed = current.trim();
    if !trimmed.is_empty() {
        segments.push(trimmed.to_string());
    }
    current.clear();
}

/// Tokenize a single segment with shell quoting rules.
pub fn tokenize_segment(segment: &str) -> Result<Vec<String>, PolicyViolation> {
    shell_words::split(segment).map_err(|err| PolicyViolation::Unparseable {
        segment: segment.to_string(),
        reason: err.to_string(),
    })
}
