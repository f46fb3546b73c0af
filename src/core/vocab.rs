//! Vocabulary storage and tiktoken BPE file loading.
//!
//! A [`Vocabulary`] is the immutable bidirectional map between byte pieces and
//! their ranks. It is built once from a piece → rank table and validated on
//! construction: every single byte must be a piece, and no two pieces may
//! share a rank.
//!
//! # Tiktoken Format
//!
//! Vocabulary files carry one entry per line:
//!
//! ```text
//! # comment lines and blank lines are ignored
//! SGVsbG8= 9906
//! IQ== 0
//! ```
//!
//! The first field is the base64-encoded piece, the second its decimal rank.
//! Fields are separated by whitespace. Lower ranks are merged first.

use std::path::{Path, PathBuf};

use base64::{engine::general_purpose::STANDARD, Engine};
use rustc_hash::FxHashMap;
use thiserror::Error;

use super::encoding::EncodingError;

/// Priority of a vocabulary piece. Lower ranks merge first.
pub type Rank = u32;

/// Errors that can occur when reading vocabulary files.
#[derive(Error, Debug)]
pub enum VocabError {
    #[error("invalid vocabulary line {line} ({content:?}): {reason}")]
    Parse {
        line: usize,
        content: String,
        reason: String,
    },
    #[error("cannot read vocabulary file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl VocabError {
    fn parse(line: usize, content: &str, reason: impl Into<String>) -> Self {
        VocabError::Parse {
            line,
            content: content.to_string(),
            reason: reason.into(),
        }
    }
}

/// Parse a tiktoken BPE vocabulary from raw bytes.
///
/// Lines are trimmed; blank lines and lines starting with `#` are skipped.
/// Every other line must hold exactly two whitespace-separated fields.
/// A piece listed twice keeps the rank of its last occurrence.
pub fn parse_tiktoken_bpe(data: &[u8]) -> Result<FxHashMap<Vec<u8>, Rank>, VocabError> {
    let mut encoder = FxHashMap::default();

    for (idx, raw) in data.split(|&b| b == b'\n').enumerate() {
        let line_no = idx + 1;
        let line = std::str::from_utf8(raw)
            .map_err(|_| VocabError::parse(line_no, &String::from_utf8_lossy(raw), "not UTF-8"))?
            .trim();

        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let mut fields = line.split_whitespace();
        let (Some(piece_b64), Some(rank_str), None) = (fields.next(), fields.next(), fields.next())
        else {
            return Err(VocabError::parse(line_no, line, "expected `<base64> <rank>`"));
        };

        let piece = STANDARD
            .decode(piece_b64)
            .map_err(|e| VocabError::parse(line_no, line, format!("bad base64: {e}")))?;
        let rank: Rank = rank_str
            .parse()
            .map_err(|e| VocabError::parse(line_no, line, format!("bad rank: {e}")))?;

        encoder.insert(piece, rank);
    }

    Ok(encoder)
}

/// Load a tiktoken BPE vocabulary from a file path.
pub fn load_tiktoken_bpe_file(
    path: impl AsRef<Path>,
) -> Result<FxHashMap<Vec<u8>, Rank>, VocabError> {
    let path = path.as_ref();
    let data = std::fs::read(path).map_err(|source| VocabError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_tiktoken_bpe(&data)
}

/// Immutable piece ↔ rank mapping.
#[derive(Debug, Clone)]
pub struct Vocabulary {
    encoder: FxHashMap<Vec<u8>, Rank>,
    decoder: FxHashMap<Rank, Vec<u8>>,
}

impl Vocabulary {
    /// Build a vocabulary, rejecting tables that lack a single-byte piece or
    /// assign one rank to two pieces.
    pub fn new(encoder: FxHashMap<Vec<u8>, Rank>) -> Result<Self, EncodingError> {
        if let Some(byte) = (0..=u8::MAX).find(|b| !encoder.contains_key([*b].as_slice())) {
            return Err(EncodingError::MissingByteCoverage { byte });
        }

        let mut decoder = FxHashMap::with_capacity_and_hasher(encoder.len(), Default::default());
        for (piece, &rank) in &encoder {
            if decoder.insert(rank, piece.clone()).is_some() {
                return Err(EncodingError::DuplicateRank { rank });
            }
        }

        Ok(Self { encoder, decoder })
    }

    /// Rank of a piece, if the piece is in the vocabulary.
    #[inline]
    pub fn rank(&self, piece: &[u8]) -> Option<Rank> {
        self.encoder.get(piece).copied()
    }

    /// Bytes of the piece with the given rank.
    #[inline]
    pub fn piece(&self, rank: Rank) -> Option<&[u8]> {
        self.decoder.get(&rank).map(Vec::as_slice)
    }

    pub fn contains_rank(&self, rank: Rank) -> bool {
        self.decoder.contains_key(&rank)
    }

    /// Number of pieces.
    pub fn len(&self) -> usize {
        self.encoder.len()
    }

    pub fn is_empty(&self) -> bool {
        self.encoder.is_empty()
    }

    /// Highest assigned rank.
    pub fn max_rank(&self) -> Option<Rank> {
        self.decoder.keys().max().copied()
    }

    /// The piece → rank table, as handed to the merge engine.
    pub fn encoder(&self) -> &FxHashMap<Vec<u8>, Rank> {
        &self.encoder
    }
}
