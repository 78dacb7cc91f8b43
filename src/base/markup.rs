//! Markup escaping for user-controlled text.
//!
//! Only display names and other user-controlled fragments are escaped.
//! FAQ answers and LLM answers are inserted verbatim, since the model is
//! instructed to emit the target markup dialect itself.

use serde::{Deserialize, Serialize};

/// Markup dialect of the messenger the bot relays to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkupMode {
    #[default]
    Markdown,
    Html,
    Plain,
}

/// Special characters of the messenger markdown subset.
const MARKDOWN_SPECIALS: &[char] = &[
    '_', '*', '[', ']', '(', ')', '~', '`', '>', '#', '+', '-', '=', '|', '{', '}', '.', '!',
];

/// Escape `text` for the given markup mode.
pub fn escape_for_markup(mode: MarkupMode, text: &str) -> String {
    match mode {
        MarkupMode::Markdown => {
            let mut out = String::with_capacity(text.len());
            for c in text.chars() {
                if MARKDOWN_SPECIALS.contains(&c) {
                    out.push('\\');
                }
                out.push(c);
            }
            out
        }
        MarkupMode::Html => text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;"),
        MarkupMode::Plain => text.to_string(),
    }
}
