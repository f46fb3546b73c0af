//! tikbpe: byte-pair encoding tokenizer for tiktoken vocabularies.
//!
//! - Heap-driven BPE merge (O(n log n) per chunk, identical output to the
//!   naive lowest-rank-first rescan)
//! - Rayon parallelism for batch encoding and decoding
//! - FxHashMap for fast piece lookups
//! - Aho-Corasick for special-token matching
//! - UTF-8 streaming decoder for model output
//!
//! ```ignore
//! use tikbpe::{EncodingCache, SpecialTokenSet};
//!
//! let cache = EncodingCache::from_env();
//! let enc = cache.get_encoding("cl100k_base")?;
//! let ids = enc.encode("hello world", &SpecialTokenSet::NONE, &SpecialTokenSet::All)?;
//! assert_eq!(enc.decode(&ids)?, "hello world");
//! ```

pub mod core;

pub use core::{
    encoding_name_for_model, Encoding, EncodingCache, EncodingError, Preset, Rank,
    SpecialTokenSet, StreamingDecoder, VocabError, BASE_DIR_ENV, CL100K_BASE_PATTERN,
    O200K_BASE_PATTERN, R50K_BASE_PATTERN,
};
