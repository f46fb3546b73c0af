//! Pattern-driven segmentation of ordinary text into pretoken chunks.

use std::fmt;

use regexr::{Regex, RegexBuilder};

use super::encoding::EncodingError;

/// Splits ordinary text into the chunks handed to the merge engine.
///
/// The pattern is a list of `|`-separated alternatives. At each position the
/// leftmost match wins, and among alternatives matching there the first one
/// declared wins. Scanning resumes right after each match.
pub struct Segmenter {
    regex: Box<Regex>,
    pattern: String,
    use_jit: bool,
}

impl Segmenter {
    /// Compile `pattern` with JIT enabled.
    pub fn new(pattern: &str) -> Result<Self, EncodingError> {
        Self::with_jit(pattern, true)
    }

    /// Compile `pattern`, choosing whether the regex engine may JIT it.
    pub fn with_jit(pattern: &str, use_jit: bool) -> Result<Self, EncodingError> {
        let regex = RegexBuilder::new(pattern).jit(use_jit).build()?;
        Ok(Self {
            regex: Box::new(regex),
            pattern: pattern.to_string(),
            use_jit,
        })
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn uses_jit(&self) -> bool {
        self.use_jit
    }

    /// Lazily yield the chunks of `text`, left to right.
    ///
    /// Calling this again restarts from the beginning of `text`.
    pub fn segments<'a>(&'a self, text: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.regex
            .find_iter(text)
            .map(move |m| &text[m.start()..m.end()])
            .filter(|chunk| !chunk.is_empty())
    }
}

impl fmt::Debug for Segmenter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Segmenter")
            .field("pattern", &self.pattern)
            .field("use_jit", &self.use_jit)
            .finish()
    }
}
