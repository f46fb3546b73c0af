//! Preset encodings and the model-name lookup table.
//!
//! Presets differ only in data: the vocabulary file they read, their
//! segmentation pattern, and their special tokens. Each one is a
//! [`PresetConfig`] record; nothing about encode/decode behavior varies.
//!
//! | preset        | vocabulary file        | used by                       |
//! |---------------|------------------------|-------------------------------|
//! | `r50k_base`   | `r50k_base.tiktoken`   | GPT-3 (davinci, curie, ...)   |
//! | `p50k_base`   | `p50k_base.tiktoken`   | Codex, text-davinci-002/003   |
//! | `p50k_edit`   | `p50k_base.tiktoken`   | edit models                   |
//! | `cl100k_base` | `cl100k_base.tiktoken` | GPT-4, GPT-3.5-turbo, ada-002 |
//! | `o200k_base`  | `o200k_base.tiktoken`  | GPT-4o                        |

use std::path::Path;

use rustc_hash::FxHashMap;

use super::encoding::{Encoding, EncodingError};
use super::vocab::{load_tiktoken_bpe_file, Rank};

/// Segmentation pattern for r50k_base, p50k_base and p50k_edit.
pub const R50K_BASE_PATTERN: &str =
    r"'(?:[sdmt]|ll|ve|re)| ?\p{L}+| ?\p{N}+| ?[^\s\p{L}\p{N}]+|\s+(?!\S)|\s+";

/// Segmentation pattern for cl100k_base (GPT-4, GPT-3.5-turbo).
pub const CL100K_BASE_PATTERN: &str = r"(?i:'s|'t|'re|'ve|'m|'ll|'d)|[^\r\n\p{L}\p{N}]?\p{L}+|\p{N}{1,3}| ?[^\s\p{L}\p{N}]+[\r\n]*|\s*[\r\n]+|\s+(?!\S)|\s+";

/// Segmentation pattern for o200k_base (GPT-4o).
pub const O200K_BASE_PATTERN: &str = r"[^\r\n\p{L}\p{N}]?[\p{Lu}\p{Lt}\p{Lm}\p{Lo}\p{M}]*[\p{Ll}\p{Lm}\p{Lo}\p{M}]+(?i:'s|'t|'re|'ve|'m|'ll|'d)?|[^\r\n\p{L}\p{N}]?[\p{Lu}\p{Lt}\p{Lm}\p{Lo}\p{M}]+[\p{Ll}\p{Lm}\p{Lo}\p{M}]*(?i:'s|'t|'re|'ve|'m|'ll|'d)?|\p{N}{1,3}| ?[^\s\p{L}\p{N}]+[\r\n/]*|\s*[\r\n]+|\s+(?!\S)|\s+";

pub const ENDOFTEXT: &str = "<|endoftext|>";
pub const FIM_PREFIX: &str = "<|fim_prefix|>";
pub const FIM_MIDDLE: &str = "<|fim_middle|>";
pub const FIM_SUFFIX: &str = "<|fim_suffix|>";
pub const ENDOFPROMPT: &str = "<|endofprompt|>";

/// Supported preset encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Preset {
    R50kBase,
    P50kBase,
    P50kEdit,
    Cl100kBase,
    O200kBase,
}

/// Everything that distinguishes one preset from another.
#[derive(Debug, Clone, Copy)]
pub struct PresetConfig {
    pub name: &'static str,
    /// File name of the vocabulary, relative to the vocabulary directory.
    pub vocab_file: &'static str,
    pub pattern: &'static str,
    pub special_tokens: &'static [(&'static str, Rank)],
}

/// Rows are in `Preset` declaration order.
static PRESETS: [(Preset, PresetConfig); 5] = [
    (
        Preset::R50kBase,
        PresetConfig {
            name: "r50k_base",
            vocab_file: "r50k_base.tiktoken",
            pattern: R50K_BASE_PATTERN,
            special_tokens: &[(ENDOFTEXT, 50256)],
        },
    ),
    (
        Preset::P50kBase,
        PresetConfig {
            name: "p50k_base",
            vocab_file: "p50k_base.tiktoken",
            pattern: R50K_BASE_PATTERN,
            special_tokens: &[(ENDOFTEXT, 50256)],
        },
    ),
    (
        Preset::P50kEdit,
        PresetConfig {
            name: "p50k_edit",
            vocab_file: "p50k_base.tiktoken",
            pattern: R50K_BASE_PATTERN,
            special_tokens: &[
                (ENDOFTEXT, 50256),
                (FIM_PREFIX, 50281),
                (FIM_MIDDLE, 50282),
                (FIM_SUFFIX, 50283),
            ],
        },
    ),
    (
        Preset::Cl100kBase,
        PresetConfig {
            name: "cl100k_base",
            vocab_file: "cl100k_base.tiktoken",
            pattern: CL100K_BASE_PATTERN,
            special_tokens: &[
                (ENDOFTEXT, 100257),
                (FIM_PREFIX, 100258),
                (FIM_MIDDLE, 100259),
                (FIM_SUFFIX, 100260),
                (ENDOFPROMPT, 100276),
            ],
        },
    ),
    (
        Preset::O200kBase,
        PresetConfig {
            name: "o200k_base",
            vocab_file: "o200k_base.tiktoken",
            pattern: O200K_BASE_PATTERN,
            special_tokens: &[(ENDOFTEXT, 199999), (ENDOFPROMPT, 200018)],
        },
    ),
];

/// Model names and the preset each one uses.
static MODEL_TO_ENCODING: &[(&str, Preset)] = &[
    // GPT-4o
    ("gpt-4o", Preset::O200kBase),
    ("gpt-4o-mini", Preset::O200kBase),
    // GPT-4
    ("gpt-4", Preset::Cl100kBase),
    ("gpt-4-0314", Preset::Cl100kBase),
    ("gpt-4-0613", Preset::Cl100kBase),
    ("gpt-4-32k", Preset::Cl100kBase),
    ("gpt-4-32k-0314", Preset::Cl100kBase),
    ("gpt-4-32k-0613", Preset::Cl100kBase),
    // GPT-3.5
    ("gpt-3.5-turbo", Preset::Cl100kBase),
    ("gpt-3.5-turbo-0301", Preset::Cl100kBase),
    ("gpt-3.5-turbo-0613", Preset::Cl100kBase),
    ("gpt-3.5-turbo-16k", Preset::Cl100kBase),
    ("gpt-3.5-turbo-16k-0613", Preset::Cl100kBase),
    // Embeddings
    ("text-embedding-ada-002", Preset::Cl100kBase),
    // Codex and instruct
    ("text-davinci-003", Preset::P50kBase),
    ("text-davinci-002", Preset::P50kBase),
    ("code-davinci-002", Preset::P50kBase),
    ("code-davinci-001", Preset::P50kBase),
    ("code-cushman-002", Preset::P50kBase),
    ("code-cushman-001", Preset::P50kBase),
    ("davinci-codex", Preset::P50kBase),
    ("cushman-codex", Preset::P50kBase),
    // Edit
    ("text-davinci-edit-001", Preset::P50kEdit),
    ("code-davinci-edit-001", Preset::P50kEdit),
    // GPT-3
    ("text-davinci-001", Preset::R50kBase),
    ("text-curie-001", Preset::R50kBase),
    ("text-babbage-001", Preset::R50kBase),
    ("text-ada-001", Preset::R50kBase),
    ("davinci", Preset::R50kBase),
    ("curie", Preset::R50kBase),
    ("babbage", Preset::R50kBase),
    ("ada", Preset::R50kBase),
];

impl Preset {
    /// Look up a preset by encoding name.
    pub fn from_name(name: &str) -> Option<Self> {
        PRESETS
            .iter()
            .find(|(_, config)| config.name == name)
            .map(|&(preset, _)| preset)
    }

    /// Look up the preset used by a model.
    pub fn for_model(model: &str) -> Option<Self> {
        MODEL_TO_ENCODING
            .iter()
            .find(|&&(name, _)| name == model)
            .map(|&(_, preset)| preset)
    }

    pub fn config(self) -> &'static PresetConfig {
        &PRESETS[self as usize].1
    }

    pub fn name(self) -> &'static str {
        self.config().name
    }

    /// The preset's special tokens as an owned table.
    pub fn special_tokens(self) -> FxHashMap<String, Rank> {
        self.config()
            .special_tokens
            .iter()
            .map(|&(literal, id)| (literal.to_string(), id))
            .collect()
    }

    /// Build the preset from its vocabulary file in `vocab_dir`.
    pub fn load(self, vocab_dir: &Path) -> Result<Encoding, EncodingError> {
        let config = self.config();
        let path = vocab_dir.join(config.vocab_file);
        log::debug!("loading {} vocabulary from {}", config.name, path.display());
        let ranks = load_tiktoken_bpe_file(&path)?;
        Encoding::new(config.name, ranks, self.special_tokens(), config.pattern)
    }
}

/// Name of the encoding used by `model`.
pub fn encoding_name_for_model(model: &str) -> Option<&'static str> {
    Preset::for_model(model).map(Preset::name)
}

/// Names of all preset encodings.
pub fn list_encoding_names() -> Vec<&'static str> {
    PRESETS.iter().map(|(_, config)| config.name).collect()
}

/// Names of all models with a known encoding.
pub fn list_model_names() -> Vec<&'static str> {
    MODEL_TO_ENCODING.iter().map(|&(name, _)| name).collect()
}
