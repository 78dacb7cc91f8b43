//! Ordered substring lookup against the configured FAQ table.

use crate::base::config::{Config, FaqEntry};

/// Matches incoming text against a small ordered table of
/// question-fragment/answer pairs.  The first matching entry wins, so more
/// specific rules go earlier in the configured list.
#[derive(Clone)]
pub struct FaqMatcher {
    entries: Vec<FaqEntry>,
    case_insensitive: bool,
}

impl FaqMatcher {
    pub fn new(config: &Config) -> Self {
        Self {
            entries: config.faq.clone(),
            case_insensitive: config.faq_case_insensitive,
        }
    }

    /// Return the answer of the first entry whose fragment occurs in `text`,
    /// or `None` when nothing matches.  Absence is not an error.
    pub fn find(&self, text: &str) -> Option<&str> {
        if self.case_insensitive {
            let lowered = text.to_lowercase();
            self.entries
                .iter()
                .find(|entry| lowered.contains(&entry.question.to_lowercase()))
                .map(|entry| entry.answer.as_str())
        } else {
            self.entries
                .iter()
                .find(|entry| text.contains(&entry.question))
                .map(|entry| entry.answer.as_str())
        }
    }
}
