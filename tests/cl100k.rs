//! Integration tests for the cl100k_base preset (GPT-4, GPT-3.5-turbo).
//!
//! `tests/resources/cl100k_base.tiktoken` is a reduced vocabulary: every
//! single byte at its real cl100k rank plus a handful of merges. Tests that
//! need the full vocabulary run only when `TIKBPE_BASE_DIR` points at a
//! directory holding the real file.

use std::path::{Path, PathBuf};

use tikbpe::{EncodingCache, EncodingError, SpecialTokenSet, StreamingDecoder, BASE_DIR_ENV};

fn resources() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/resources")
}

fn cache() -> EncodingCache {
    EncodingCache::new(resources())
}

/// Known token ids for a short greeting.
#[test]
fn test_cl100k_hello_world_ids() {
    let enc = cache().get_encoding("cl100k_base").unwrap();
    let tokens = enc.encode_ordinary("Hello, world!").unwrap();
    assert_eq!(tokens, vec![9906, 11, 1917, 0]);
    assert_eq!(enc.decode(&tokens).unwrap(), "Hello, world!");
}

#[test]
fn test_cl100k_byte_ranks() {
    let enc = cache().get_encoding("cl100k_base").unwrap();
    assert_eq!(enc.encode_single_token(b"!"), Some(0));
    assert_eq!(enc.encode_single_token(b" "), Some(220));
    assert_eq!(enc.encode_single_token(b"\n"), Some(198));
}

#[test]
fn test_cl100k_merges_inside_chunk() {
    let enc = cache().get_encoding("cl100k_base").unwrap();
    // Ids come from the reduced fixture's merges, not the full vocabulary
    // (which has "hello" as a single token): he(383), then lo(385), then
    // l+lo -> llo(1685).
    assert_eq!(enc.encode_ordinary("hello").unwrap(), vec![383, 1685]);
}

#[test]
fn test_cl100k_encode_decode_roundtrip() {
    let enc = cache().get_encoding("cl100k_base").unwrap();

    let test_cases = [
        "Hello, world!",
        "The quick brown fox jumps over the lazy dog.",
        "1234567890",
        "Special characters: !@#$%^&*()",
        "Multi-line\ntext\nwith\nnewlines\r\n",
        "Unicode: こんにちは 世界 🦀",
        "   leading and trailing   ",
    ];

    for text in test_cases {
        let tokens = enc.encode_ordinary(text).unwrap();
        let decoded = enc.decode(&tokens).unwrap();
        assert_eq!(decoded, text, "Roundtrip failed for: {:?}", text);
    }
}

#[test]
fn test_cl100k_special_tokens() {
    let enc = cache().get_encoding("cl100k_base").unwrap();

    let tokens = enc
        .encode_with_special_tokens("Hello<|endoftext|>, world!")
        .unwrap();
    assert_eq!(tokens, vec![9906, 100257, 11, 1917, 0]);

    let tokens = enc
        .encode_with_special_tokens("<|fim_prefix|>x<|fim_suffix|>y<|fim_middle|>")
        .unwrap();
    assert!(tokens.contains(&100258));
    assert!(tokens.contains(&100259));
    assert!(tokens.contains(&100260));

    assert_eq!(
        enc.encode_with_special_tokens("<|endofprompt|>").unwrap(),
        vec![100276]
    );
    assert_eq!(enc.n_vocab(), 100277);
    assert_eq!(enc.special_token_literals().len(), 5);
}

#[test]
fn test_cl100k_default_policy_rejects_specials() {
    let enc = cache().get_encoding("cl100k_base").unwrap();
    let err = enc
        .encode(
            "Hello<|endoftext|>",
            &SpecialTokenSet::NONE,
            &SpecialTokenSet::All,
        )
        .unwrap_err();
    assert!(matches!(err, EncodingError::DisallowedSpecialTokenFound { .. }));

    // Treated as text, the literal survives a round trip.
    let tokens = enc.encode_ordinary("Hello<|endoftext|>").unwrap();
    assert!(!tokens.contains(&100257));
    assert_eq!(enc.decode(&tokens).unwrap(), "Hello<|endoftext|>");
}

#[test]
fn test_cl100k_streaming_decode() {
    let enc = cache().get_encoding("cl100k_base").unwrap();
    let text = "Hello, world! 世界 🦀";
    let tokens = enc.encode_ordinary(text).unwrap();

    let mut decoder = StreamingDecoder::new(&enc);
    let mut out = String::new();
    for &id in &tokens {
        if let Some(piece) = decoder.add_token(id).unwrap() {
            out.push_str(&piece);
        }
    }
    out.push_str(&decoder.flush());
    assert_eq!(out, text);
}

#[test]
fn test_model_name_resolves_to_cl100k() {
    let cache = cache();
    let enc = cache.encoding_for_model("gpt-4").unwrap();
    assert_eq!(enc.name(), "cl100k_base");
    assert!(std::sync::Arc::ptr_eq(
        &enc,
        &cache.get_encoding("cl100k_base").unwrap()
    ));
}

/// Full-vocabulary vectors, run when `TIKBPE_BASE_DIR` holds the real file.
#[test]
fn test_cl100k_real_vocabulary() {
    let Some(dir) = std::env::var_os(BASE_DIR_ENV).map(PathBuf::from) else {
        return;
    };
    if !dir.join("cl100k_base.tiktoken").is_file() {
        return;
    }

    let enc = EncodingCache::new(dir).get_encoding("cl100k_base").unwrap();
    assert_eq!(enc.encode_ordinary("hello world").unwrap(), vec![15339, 1917]);
    assert_eq!(
        enc.encode_ordinary("Hello, world!").unwrap(),
        vec![9906, 11, 1917, 0]
    );
    assert_eq!(
        enc.encode_with_special_tokens("hello <|endoftext|>").unwrap(),
        vec![15339, 220, 100257]
    );
}

#[test]
fn test_encoding_from_file_matches_preset() {
    use rustc_hash::FxHashMap;
    use tikbpe::{Encoding, CL100K_BASE_PATTERN};

    let custom = Encoding::from_file(
        "cl100k_plain",
        resources().join("cl100k_base.tiktoken"),
        FxHashMap::default(),
        CL100K_BASE_PATTERN,
    )
    .unwrap();
    let preset = cache().get_encoding("cl100k_base").unwrap();

    let text = "Hello, world! hello";
    assert_eq!(
        custom.encode_ordinary(text).unwrap(),
        preset.encode_ordinary(text).unwrap()
    );
    assert!(custom.special_token_literals().is_empty());

    assert!(matches!(
        Encoding::from_file(
            "missing",
            resources().join("nope.tiktoken"),
            FxHashMap::default(),
            CL100K_BASE_PATTERN,
        ),
        Err(EncodingError::Vocab(_))
    ));
}
