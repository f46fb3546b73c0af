//! Core tokenization engine for tikbpe.
//!
//! - [`Encoding`]: the public facade. Splits out special tokens, segments
//!   ordinary text with the encoding's pattern, merges each chunk, and
//!   decodes ids back to bytes.
//! - [`bpe`]: the byte-pair merge engine.
//! - [`vocab`]: the rank table and the tiktoken file parser.
//! - [`special`]: special-token table and splitter built on Aho-Corasick.
//! - [`segment`]: regex-driven pretokenization.
//! - [`presets`]: data records for the r50k/p50k/cl100k/o200k encodings.
//! - [`EncodingCache`]: loads presets on first use.
//! - [`StreamingDecoder`]: UTF-8 safe token-by-token decoding.

pub mod bpe;
mod cache;
mod encoding;
pub mod presets;
pub mod segment;
pub mod special;
mod streaming;
pub mod vocab;

pub use bpe::{byte_pair_encode, byte_pair_merge};
pub use cache::{EncodingCache, BASE_DIR_ENV, DEFAULT_CAPACITY};
pub use encoding::{Encoding, EncodingError};
pub use presets::{
    encoding_name_for_model, list_encoding_names, list_model_names, Preset, PresetConfig,
    CL100K_BASE_PATTERN, O200K_BASE_PATTERN, R50K_BASE_PATTERN,
};
pub use segment::Segmenter;
pub use special::{Segment, SpecialTokenSet, SpecialTokens};
pub use streaming::StreamingDecoder;
pub use vocab::{load_tiktoken_bpe_file, parse_tiktoken_bpe, Rank, VocabError, Vocabulary};
