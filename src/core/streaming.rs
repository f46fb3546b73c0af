//! UTF-8 safe streaming decoder for token-by-token output.
//!
//! A token's bytes may end in the middle of a multi-byte character. The
//! decoder holds such trailing bytes back until the rest of the character
//! arrives, so every string it emits is complete text.

use std::str;

use super::encoding::{Encoding, EncodingError};
use super::vocab::Rank;

/// Incremental decoder over one [`Encoding`].
///
/// # Example
///
/// ```ignore
/// let mut decoder = StreamingDecoder::new(&encoding);
/// for id in token_stream {
///     if let Some(text) = decoder.add_token(id)? {
///         print!("{text}");
///     }
/// }
/// print!("{}", decoder.flush());
/// ```
pub struct StreamingDecoder<'a> {
    encoding: &'a Encoding,
    buffer: Vec<u8>,
}

impl<'a> StreamingDecoder<'a> {
    pub fn new(encoding: &'a Encoding) -> Self {
        Self {
            encoding,
            buffer: Vec::with_capacity(16),
        }
    }

    /// Add one token and return whatever text it completes.
    ///
    /// An unknown id fails with [`EncodingError::InvalidTokenId`] and leaves
    /// the buffer as it was.
    pub fn add_token(&mut self, id: Rank) -> Result<Option<String>, EncodingError> {
        let bytes = self.encoding.decode_single_token_bytes(id)?;
        self.buffer.extend_from_slice(bytes);
        Ok(self.take_complete())
    }

    /// Add several tokens and return the text they complete.
    ///
    /// Ids are checked before any bytes are buffered.
    pub fn add_tokens(&mut self, ids: &[Rank]) -> Result<Option<String>, EncodingError> {
        let bytes = self.encoding.decode_bytes(ids)?;
        self.buffer.extend_from_slice(&bytes);
        Ok(self.take_complete())
    }

    /// Emit any held-back bytes, replacing incomplete sequences with U+FFFD.
    pub fn flush(&mut self) -> String {
        let text = String::from_utf8_lossy(&self.buffer).into_owned();
        self.buffer.clear();
        text
    }

    /// Discard held-back bytes.
    pub fn reset(&mut self) {
        self.buffer.clear();
    }

    pub fn has_pending(&self) -> bool {
        !self.buffer.is_empty()
    }

    pub fn pending_bytes(&self) -> usize {
        self.buffer.len()
    }

    /// Drain the longest prefix that is final text.
    ///
    /// Invalid sequences that no later byte could repair become U+FFFD right
    /// away; only a truncated sequence at the very end is held back.
    fn take_complete(&mut self) -> Option<String> {
        let mut out = String::new();
        let mut consumed = 0;

        loop {
            let rest = &self.buffer[consumed..];
            match str::from_utf8(rest) {
                Ok(valid) => {
                    out.push_str(valid);
                    consumed = self.buffer.len();
                    break;
                }
                Err(err) => {
                    let valid_up_to = err.valid_up_to();
                    // Validated by from_utf8 above.
                    out.push_str(str::from_utf8(&rest[..valid_up_to]).unwrap_or_default());
                    match err.error_len() {
                        Some(bad) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            consumed += valid_up_to + bad;
                        }
                        None => {
                            consumed += valid_up_to;
                            break;
                        }
                    }
                }
            }
        }

        self.buffer.drain(..consumed);
        if out.is_empty() {
            None
        } else {
            Some(out)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustc_hash::FxHashMap;

    fn make_test_encoding() -> Encoding {
        let mut encoder: FxHashMap<Vec<u8>, Rank> =
            (0..=255u8).map(|b| (vec![b], b as Rank)).collect();
        encoder.insert("Hello".as_bytes().to_vec(), 256);
        encoder.insert("世界".as_bytes().to_vec(), 257);

        let mut special_tokens = FxHashMap::default();
        special_tokens.insert("<|endoftext|>".to_string(), 300);

        Encoding::new("stream", encoder, special_tokens, r"\S+|\s+").unwrap()
    }

    #[test]
    fn test_simple_ascii() {
        let encoding = make_test_encoding();
        let mut decoder = StreamingDecoder::new(&encoding);

        assert_eq!(decoder.add_token(b'H' as Rank).unwrap(), Some("H".to_string()));
        assert_eq!(decoder.add_token(b'i' as Rank).unwrap(), Some("i".to_string()));
        assert!(!decoder.has_pending());
    }

    #[test]
    fn test_multi_byte_complete() {
        let encoding = make_test_encoding();
        let mut decoder = StreamingDecoder::new(&encoding);

        assert_eq!(decoder.add_token(257).unwrap(), Some("世界".to_string()));
        assert!(!decoder.has_pending());
    }

    #[test]
    fn test_multi_byte_split() {
        let encoding = make_test_encoding();
        let mut decoder = StreamingDecoder::new(&encoding);

        // "世" is E4 B8 96.
        assert_eq!(decoder.add_token(0xE4).unwrap(), None);
        assert_eq!(decoder.pending_bytes(), 1);
        assert_eq!(decoder.add_token(0xB8).unwrap(), None);
        assert_eq!(decoder.pending_bytes(), 2);
        assert_eq!(decoder.add_token(0x96).unwrap(), Some("世".to_string()));
        assert!(!decoder.has_pending());
    }

    #[test]
    fn test_text_before_partial_character_is_emitted() {
        let encoding = make_test_encoding();
        let mut decoder = StreamingDecoder::new(&encoding);

        assert_eq!(
            decoder.add_tokens(&[256, 0xE4, 0xB8]).unwrap(),
            Some("Hello".to_string())
        );
        assert_eq!(decoder.pending_bytes(), 2);
    }

    #[test]
    fn test_unrecoverable_bytes_become_replacement() {
        let encoding = make_test_encoding();
        let mut decoder = StreamingDecoder::new(&encoding);

        // A lone continuation byte can never start a character.
        assert_eq!(
            decoder.add_tokens(&[0x80, b'a' as Rank]).unwrap(),
            Some("\u{FFFD}a".to_string())
        );
        assert!(!decoder.has_pending());
    }

    #[test]
    fn test_special_token_and_unknown_id() {
        let encoding = make_test_encoding();
        let mut decoder = StreamingDecoder::new(&encoding);

        assert_eq!(decoder.add_token(0xE4).unwrap(), None);
        assert!(matches!(
            decoder.add_token(9999),
            Err(EncodingError::InvalidTokenId { id: 9999 })
        ));
        assert_eq!(decoder.pending_bytes(), 1);
        assert!(decoder.add_tokens(&[b'x' as Rank, 9999]).is_err());
        assert_eq!(decoder.pending_bytes(), 1);

        decoder.reset();
        assert_eq!(
            decoder.add_token(300).unwrap(),
            Some("<|endoftext|>".to_string())
        );
    }

    #[test]
    fn test_flush_incomplete() {
        let encoding = make_test_encoding();
        let mut decoder = StreamingDecoder::new(&encoding);

        decoder.add_token(0xE4).unwrap();
        decoder.add_token(0xB8).unwrap();

        assert!(decoder.flush().contains('\u{FFFD}'));
        assert!(!decoder.has_pending());
        assert_eq!(decoder.flush(), "");
    }

    #[test]
    fn test_stream_matches_decode() {
        let encoding = make_test_encoding();
        let text = "Hello 世界, héllo 🦀!";
        let tokens = encoding.encode_ordinary(text).unwrap();

        let mut decoder = StreamingDecoder::new(&encoding);
        let mut streamed = String::new();
        for &id in &tokens {
            if let Some(piece) = decoder.add_token(id).unwrap() {
                streamed.push_str(&piece);
            }
        }
        streamed.push_str(&decoder.flush());
        assert_eq!(streamed, text);
    }
}
