use std::fmt;
use std::path::Path;

use rayon::prelude::*;
use rustc_hash::{FxHashMap, FxHashSet};
use thiserror::Error;

use super::bpe::byte_pair_encode;
use super::segment::Segmenter;
use super::special::{Segment, SpecialTokenSet, SpecialTokens};
use super::vocab::{load_tiktoken_bpe_file, Rank, VocabError, Vocabulary};

#[derive(Error, Debug)]
pub enum EncodingError {
    #[error("disallowed special token(s) found in text: {}", literals.join(", "))]
    DisallowedSpecialTokenFound { literals: Vec<String> },
    #[error("token id {id} is neither a vocabulary rank nor a special token")]
    InvalidTokenId { id: Rank },
    #[error("decoded bytes are not valid UTF-8: {0}")]
    MalformedDecodedBytes(#[from] std::string::FromUtf8Error),
    #[error("vocabulary has no piece for byte 0x{byte:02x}")]
    MissingByteCoverage { byte: u8 },
    #[error("rank {rank} is assigned to more than one piece")]
    DuplicateRank { rank: Rank },
    #[error("invalid special token {literal:?}: {reason}")]
    InvalidSpecialToken { literal: String, reason: String },
    #[error("pattern compilation error: {0}")]
    Regex(#[from] regexr::Error),
    #[error("special token matcher build error: {0}")]
    SpecialMatcher(#[from] aho_corasick::BuildError),
    #[error("vocabulary error: {0}")]
    Vocab(#[from] VocabError),
    #[error("unknown encoding: {0}")]
    UnknownEncoding(String),
    #[error("unknown model: {0}")]
    UnknownModel(String),
}

/// A BPE encoding: vocabulary, special tokens and segmentation pattern.
///
/// An `Encoding` never changes after construction. Every method takes
/// `&self`, so one instance can serve any number of threads at once.
///
/// # Example
///
/// ```ignore
/// let enc = Encoding::new("mine", ranks, special_tokens, CL100K_BASE_PATTERN)?;
/// let ids = enc.encode_with_special_tokens("Hello<|endoftext|>")?;
/// assert_eq!(enc.decode(&ids)?, "Hello<|endoftext|>");
/// ```
pub struct Encoding {
    name: String,
    vocab: Vocabulary,
    special: SpecialTokens,
    segmenter: Segmenter,
}

impl Encoding {
    /// Create an encoding from a piece → rank table, special tokens and a
    /// segmentation pattern.
    ///
    /// Fails if a single byte has no piece, two pieces share a rank, a
    /// special id collides with a rank or another special id, or the pattern
    /// does not compile.
    pub fn new(
        name: impl Into<String>,
        ranks: FxHashMap<Vec<u8>, Rank>,
        special_tokens: FxHashMap<String, Rank>,
        pattern: &str,
    ) -> Result<Self, EncodingError> {
        let name = name.into();
        let vocab = Vocabulary::new(ranks)?;
        let special = SpecialTokens::new(special_tokens, &vocab)?;
        let segmenter = Segmenter::new(pattern)?;

        log::debug!(
            "built encoding {name}: {} pieces, {} special tokens",
            vocab.len(),
            special.len()
        );

        Ok(Self {
            name,
            vocab,
            special,
            segmenter,
        })
    }

    /// Create an encoding from a tiktoken vocabulary file.
    pub fn from_file(
        name: impl Into<String>,
        vocab_path: impl AsRef<Path>,
        special_tokens: FxHashMap<String, Rank>,
        pattern: &str,
    ) -> Result<Self, EncodingError> {
        let ranks = load_tiktoken_bpe_file(vocab_path)?;
        Self::new(name, ranks, special_tokens, pattern)
    }

    /// Recompile the pattern with JIT enabled or disabled.
    pub fn jit(mut self, use_jit: bool) -> Result<Self, EncodingError> {
        self.segmenter = Segmenter::with_jit(self.segmenter.pattern(), use_jit)?;
        Ok(self)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pattern(&self) -> &str {
        self.segmenter.pattern()
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocab
    }

    /// Encode text, treating special-token literals as plain text.
    pub fn encode_ordinary(&self, text: &str) -> Result<Vec<Rank>, EncodingError> {
        let mut tokens = Vec::new();
        self.encode_ordinary_into(text, &mut tokens)?;
        Ok(tokens)
    }

    /// Append the ranks of `text` to `tokens`, returning how many were added.
    fn encode_ordinary_into(
        &self,
        text: &str,
        tokens: &mut Vec<Rank>,
    ) -> Result<usize, EncodingError> {
        if text.is_empty() {
            return Ok(0);
        }

        let start = tokens.len();
        for chunk in self.segmenter.segments(text) {
            let bytes = chunk.as_bytes();
            match self.vocab.rank(bytes) {
                Some(rank) => tokens.push(rank),
                None => tokens.extend(byte_pair_encode(bytes, self.vocab.encoder())?),
            }
        }
        Ok(tokens.len() - start)
    }

    /// Encode text, emitting ids for allowed special tokens.
    ///
    /// Fails with [`EncodingError::DisallowedSpecialTokenFound`] if the text
    /// contains a disallowed literal. Use `SpecialTokenSet::NONE` for
    /// `allowed` and `SpecialTokenSet::All` for `disallowed` to reject every
    /// special literal.
    pub fn encode(
        &self,
        text: &str,
        allowed: &SpecialTokenSet<'_>,
        disallowed: &SpecialTokenSet<'_>,
    ) -> Result<Vec<Rank>, EncodingError> {
        self.encode_with_trailing(text, allowed, disallowed)
            .map(|(tokens, _)| tokens)
    }

    /// Like [`encode`](Self::encode), also returning how many tokens the
    /// final ordinary segment produced.
    ///
    /// The count is 0 when the output is empty or ends with a special token.
    /// Callers decoding in-progress output use it to find the tokens that may
    /// still change as more text arrives.
    pub fn encode_with_trailing(
        &self,
        text: &str,
        allowed: &SpecialTokenSet<'_>,
        disallowed: &SpecialTokenSet<'_>,
    ) -> Result<(Vec<Rank>, usize), EncodingError> {
        let segments = self.special.split(text, allowed, disallowed)?;

        let mut tokens = Vec::with_capacity(text.len() / 4);
        let mut trailing = 0;
        for segment in segments {
            match segment {
                Segment::Ordinary(span) => {
                    trailing = self.encode_ordinary_into(span, &mut tokens)?;
                }
                Segment::Special { id, .. } => {
                    tokens.push(id);
                    trailing = 0;
                }
            }
        }

        Ok((tokens, trailing))
    }

    /// Encode text with every special-token literal allowed.
    pub fn encode_with_special_tokens(&self, text: &str) -> Result<Vec<Rank>, EncodingError> {
        self.encode(text, &SpecialTokenSet::All, &SpecialTokenSet::NONE)
    }

    /// Id of a single piece or special literal, if it has one.
    pub fn encode_single_token(&self, piece: &[u8]) -> Option<Rank> {
        self.vocab.rank(piece).or_else(|| {
            std::str::from_utf8(piece)
                .ok()
                .and_then(|literal| self.special.id(literal))
        })
    }

    /// Bytes of one token id.
    pub fn decode_single_token_bytes(&self, id: Rank) -> Result<&[u8], EncodingError> {
        self.vocab
            .piece(id)
            .or_else(|| self.special.literal(id).map(str::as_bytes))
            .ok_or(EncodingError::InvalidTokenId { id })
    }

    /// Concatenated bytes of `tokens`, without UTF-8 validation.
    pub fn decode_bytes(&self, tokens: &[Rank]) -> Result<Vec<u8>, EncodingError> {
        let mut bytes = Vec::with_capacity(tokens.len() * 4);
        for &id in tokens {
            bytes.extend_from_slice(self.decode_single_token_bytes(id)?);
        }
        Ok(bytes)
    }

    /// Decode token ids to text.
    ///
    /// Fails on the first id that is neither a rank nor a special id, and
    /// when the bytes do not form valid UTF-8.
    pub fn decode(&self, tokens: &[Rank]) -> Result<String, EncodingError> {
        if tokens.is_empty() {
            return Ok(String::new());
        }
        let bytes = self.decode_bytes(tokens)?;
        Ok(String::from_utf8(bytes)?)
    }

    /// Decode token ids, replacing invalid UTF-8 with U+FFFD.
    ///
    /// Unknown ids are still rejected.
    pub fn decode_lossy(&self, tokens: &[Rank]) -> Result<String, EncodingError> {
        let bytes = self.decode_bytes(tokens)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Encode many texts in parallel, ignoring special tokens.
    pub fn encode_ordinary_batch<S>(&self, texts: &[S]) -> Result<Vec<Vec<Rank>>, EncodingError>
    where
        S: AsRef<str> + Sync,
    {
        texts
            .par_iter()
            .map(|text| self.encode_ordinary(text.as_ref()))
            .collect()
    }

    /// Encode many texts in parallel with the same special-token policy.
    pub fn encode_batch<S>(
        &self,
        texts: &[S],
        allowed: &SpecialTokenSet<'_>,
        disallowed: &SpecialTokenSet<'_>,
    ) -> Result<Vec<Vec<Rank>>, EncodingError>
    where
        S: AsRef<str> + Sync,
    {
        texts
            .par_iter()
            .map(|text| self.encode(text.as_ref(), allowed, disallowed))
            .collect()
    }

    /// Decode many token lists in parallel.
    pub fn decode_batch(&self, token_lists: &[Vec<Rank>]) -> Result<Vec<String>, EncodingError> {
        token_lists
            .par_iter()
            .map(|tokens| self.decode(tokens))
            .collect()
    }

    /// All special-token literals.
    pub fn special_token_literals(&self) -> FxHashSet<&str> {
        self.special.literals().collect()
    }

    /// Id of a special-token literal.
    pub fn special_token_id(&self, literal: &str) -> Option<Rank> {
        self.special.id(literal)
    }

    /// One past the highest id, counting ranks and special ids.
    pub fn n_vocab(&self) -> usize {
        let max_rank = self.vocab.max_rank().unwrap_or(0);
        let max_special = self.special.max_id().unwrap_or(0);
        max_rank.max(max_special) as usize + 1
    }
}

impl fmt::Debug for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Encoding")
            .field("name", &self.name)
            .field("pieces", &self.vocab.len())
            .field("special_tokens", &self.special.len())
            .field("pattern", &self.segmenter.pattern())
            .finish()
    }
}
