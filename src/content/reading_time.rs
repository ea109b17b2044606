//! Reading time estimate

use serde::Serialize;
use std::fmt;

use super::post::ArticleSection;

/// Reading speed, in words per minute
pub const WORDS_PER_MINUTE: usize = 225;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReadingTime {
    pub words: usize,
    pub minutes: usize,
}

impl ReadingTime {
    /// Estimate from article sections: `round(words / 225) + 1` minutes
    pub fn estimate(sections: &[ArticleSection]) -> Self {
        let words = sections
            .iter()
            .map(|s| count_words(s.heading.as_deref().unwrap_or("")) + count_words(&s.body_text()))
            .sum();
        Self::from_words(words)
    }

    pub fn from_words(words: usize) -> Self {
        let minutes = (words as f64 / WORDS_PER_MINUTE as f64).round() as usize + 1;
        Self { words, minutes }
    }
}

impl fmt::Display for ReadingTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} min", self.minutes)
    }
}

/// Count tokens separated by single spaces
///
/// Runs of spaces and empty strings still count as tokens (`""` is one word).
fn count_words(s: &str) -> usize {
    s.split(' ').count()
}
