//! Special-token table and the splitter that separates special literals from
//! ordinary text.
//!
//! All literals are compiled into one leftmost-first Aho-Corasick automaton.
//! Alternatives are declared in ascending id order, so when two literals
//! start at the same position (one a prefix of the other) the one with the
//! lower id is recognized.

use std::collections::BTreeSet;

use aho_corasick::{AhoCorasick, Input, MatchKind};
use rustc_hash::{FxHashMap, FxHashSet};

use super::encoding::EncodingError;
use super::vocab::{Rank, Vocabulary};

/// Selects a subset of the special-token literals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecialTokenSet<'a> {
    /// Every literal known to the encoding.
    All,
    /// Exactly the listed literals. Unknown literals are ignored.
    Only(&'a [&'a str]),
}

impl<'a> SpecialTokenSet<'a> {
    /// The empty set.
    pub const NONE: Self = SpecialTokenSet::Only(&[]);
}

/// One piece of text after special-token splitting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment<'t> {
    /// Text to run through segmentation and merging.
    Ordinary(&'t str),
    /// An allowed special literal and its reserved id.
    Special { literal: &'t str, id: Rank },
}

/// Bidirectional literal ↔ id table with its matchers.
pub struct SpecialTokens {
    encoder: FxHashMap<String, Rank>,
    decoder: FxHashMap<Rank, String>,
    /// Literals in ascending id order; indices match automaton pattern ids.
    declared: Vec<(String, Rank)>,
    /// Leftmost-first automaton used for splitting.
    matcher: Option<AhoCorasick>,
    /// Standard automaton reporting overlapping occurrences, used to find
    /// every disallowed literal.
    scanner: Option<AhoCorasick>,
}

impl SpecialTokens {
    /// Build the table. Literals must be non-empty and their ids must be
    /// distinct from each other and from every vocabulary rank.
    pub fn new(
        encoder: FxHashMap<String, Rank>,
        vocab: &Vocabulary,
    ) -> Result<Self, EncodingError> {
        let mut decoder = FxHashMap::default();
        for (literal, &id) in &encoder {
            if literal.is_empty() {
                return Err(EncodingError::InvalidSpecialToken {
                    literal: literal.clone(),
                    reason: "empty literal".to_string(),
                });
            }
            if vocab.contains_rank(id) {
                return Err(EncodingError::InvalidSpecialToken {
                    literal: literal.clone(),
                    reason: format!("id {id} is already a vocabulary rank"),
                });
            }
            if let Some(other) = decoder.insert(id, literal.clone()) {
                return Err(EncodingError::InvalidSpecialToken {
                    literal: literal.clone(),
                    reason: format!("id {id} is shared with {other:?}"),
                });
            }
        }

        let mut declared: Vec<(String, Rank)> =
            encoder.iter().map(|(k, &v)| (k.clone(), v)).collect();
        declared.sort_by_key(|&(_, id)| id);

        let (matcher, scanner) = if declared.is_empty() {
            (None, None)
        } else {
            let literals = declared.iter().map(|(literal, _)| literal.as_str());
            let matcher = AhoCorasick::builder()
                .match_kind(MatchKind::LeftmostFirst)
                .build(literals.clone())?;
            let scanner = AhoCorasick::new(literals)?;
            (Some(matcher), Some(scanner))
        };

        Ok(Self {
            encoder,
            decoder,
            declared,
            matcher,
            scanner,
        })
    }

    /// Id of a literal.
    #[inline]
    pub fn id(&self, literal: &str) -> Option<Rank> {
        self.encoder.get(literal).copied()
    }

    /// Literal with the given id.
    #[inline]
    pub fn literal(&self, id: Rank) -> Option<&str> {
        self.decoder.get(&id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.declared.len()
    }

    pub fn is_empty(&self) -> bool {
        self.declared.is_empty()
    }

    pub fn max_id(&self) -> Option<Rank> {
        self.declared.last().map(|&(_, id)| id)
    }

    /// All literals, in declared (ascending id) order.
    pub fn literals(&self) -> impl Iterator<Item = &str> {
        self.declared.iter().map(|(literal, _)| literal.as_str())
    }

    fn resolve<'s>(&'s self, set: &SpecialTokenSet<'s>) -> FxHashSet<&'s str> {
        match *set {
            SpecialTokenSet::All => self.literals().collect(),
            SpecialTokenSet::Only(literals) => literals.iter().copied().collect(),
        }
    }

    /// Split `text` into ordinary and special segments.
    ///
    /// Fails before producing anything if the text contains any occurrence of
    /// a disallowed literal. `disallowed = All` means every literal that is
    /// not allowed. Recognized literals that are neither allowed nor
    /// disallowed stay inside ordinary text.
    pub fn split<'t>(
        &self,
        text: &'t str,
        allowed: &SpecialTokenSet<'_>,
        disallowed: &SpecialTokenSet<'_>,
    ) -> Result<Vec<Segment<'t>>, EncodingError> {
        let allowed = self.resolve(allowed);
        let disallowed = match disallowed {
            SpecialTokenSet::All => self
                .literals()
                .filter(|literal| !allowed.contains(literal))
                .collect(),
            only => self.resolve(only),
        };

        self.check_disallowed(text, &disallowed)?;

        let mut segments = Vec::new();
        let mut last_end = 0;

        if let Some(matcher) = self.matcher.as_ref().filter(|_| !allowed.is_empty()) {
            let mut pos = 0;
            while pos < text.len() {
                let Some(m) = matcher.find(Input::new(text).span(pos..text.len())) else {
                    break;
                };
                let (literal, id) = &self.declared[m.pattern().as_usize()];
                if !allowed.contains(literal.as_str()) {
                    // Retry one byte later so a literal starting inside this
                    // occurrence can still be found.
                    pos = m.start() + 1;
                    continue;
                }
                if m.start() > last_end {
                    segments.push(Segment::Ordinary(&text[last_end..m.start()]));
                }
                segments.push(Segment::Special {
                    literal: &text[m.start()..m.end()],
                    id: *id,
                });
                last_end = m.end();
                pos = m.end();
            }
        }

        if last_end < text.len() {
            segments.push(Segment::Ordinary(&text[last_end..]));
        }

        Ok(segments)
    }

    fn check_disallowed(
        &self,
        text: &str,
        disallowed: &FxHashSet<&str>,
    ) -> Result<(), EncodingError> {
        let Some(scanner) = self.scanner.as_ref().filter(|_| !disallowed.is_empty()) else {
            return Ok(());
        };

        let found: BTreeSet<&str> = scanner
            .find_overlapping_iter(text)
            .map(|m| self.declared[m.pattern().as_usize()].0.as_str())
            .filter(|literal| disallowed.contains(literal))
            .collect();

        if found.is_empty() {
            Ok(())
        } else {
            Err(EncodingError::DisallowedSpecialTokenFound {
                literals: found.into_iter().map(str::to_string).collect(),
            })
        }
    }
}
