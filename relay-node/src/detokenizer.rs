//! Incremental detokenization for streaming output.
//!
//! Tokenizers may merge adjacent pieces across token boundaries, so a token
//! is not printable the moment it arrives. The decoder re-decodes its whole
//! buffer on every push and only releases text at a word boundary: a
//! trailing newline flushes and resets the buffer, a trailing U+FFFD marks
//! an incomplete multi-byte sequence and holds everything back, and an
//! ASCII space anywhere in the unprinted tail releases the tail.

use std::sync::Arc;

use relay_core::{Result, TextDecoder};

pub struct IncrementalDecoder {
    tokenizer: Arc<dyn TextDecoder>,
    token_cache: Vec<u32>,
    /// Byte offset into the decoded buffer text up to which chunks have
    /// already been emitted.
    printed_len: usize,
}

impl IncrementalDecoder {
    pub fn new(tokenizer: Arc<dyn TextDecoder>) -> Self {
        Self {
            tokenizer,
            token_cache: Vec::new(),
            printed_len: 0,
        }
    }

    /// Push one token and return the next wire-safe chunk, if any.
    pub fn put(&mut self, token: u32) -> Result<Option<String>> {
        self.token_cache.push(token);
        let text = self.tokenizer.decode(&self.token_cache)?;

        // Guard against decoders that rewrite earlier text on new tokens
        // (e.g. whitespace normalization).
        if text.len() < self.printed_len {
            self.printed_len = 0;
        }

        if !text.is_empty() && text.ends_with('\n') {
            // Word boundary and a natural point to bound retained history.
            let chunk = text[self.printed_len..].to_string();
            self.token_cache.clear();
            self.printed_len = 0;
            return Ok(Some(chunk));
        }
        if text.ends_with('\u{FFFD}') {
            // Incomplete multi-byte sequence; keep accumulating.
            return Ok(None);
        }
        if text.len() > self.printed_len && text.as_bytes()[self.printed_len..].contains(&b' ') {
            let chunk = text[self.printed_len..].to_string();
            self.printed_len = text.len();
            return Ok(Some(chunk));
        }
        Ok(None)
    }

    /// Flush any text still held back (e.g. on stream finish). The word
    /// boundary never arrives once the generation is over, so the
    /// remainder goes out as-is and the buffer resets.
    pub fn flush(&mut self) -> Result<Option<String>> {
        if self.token_cache.is_empty() {
            return Ok(None);
        }
        let text = self.tokenizer.decode(&self.token_cache)?;
        if text.len() < self.printed_len {
            self.printed_len = 0;
        }
        let remainder = text[self.printed_len..].to_string();
        self.token_cache.clear();
        self.printed_len = 0;
        if remainder.is_empty() {
            Ok(None)
        } else {
            Ok(Some(remainder))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    /// Decodes by concatenating fixed per-token pieces.
    struct PieceDecoder(HashMap<u32, &'static str>);

    impl TextDecoder for PieceDecoder {
        fn decode(&self, token_ids: &[u32]) -> Result<String> {
            Ok(token_ids
                .iter()
                .filter_map(|id| self.0.get(id).copied())
                .collect())
        }
    }

    /// Decodes a buffer of length N as the N-th scripted string, emulating
    /// tokenizers that merge pieces across token boundaries.
    struct ScriptDecoder(Vec<&'static str>);

    impl TextDecoder for ScriptDecoder {
        fn decode(&self, token_ids: &[u32]) -> Result<String> {
            Ok(self.0[token_ids.len() - 1].to_string())
        }
    }

    fn pieces(entries: &[(u32, &'static str)]) -> Arc<dyn TextDecoder> {
        Arc::new(PieceDecoder(entries.iter().copied().collect()))
    }

    #[test]
    fn holds_text_until_a_space_appears() {
        let decoder = pieces(&[(1, "hel"), (2, "lo"), (3, " world")]);
        let mut streamer = IncrementalDecoder::new(decoder);

        assert_eq!(streamer.put(1).unwrap(), None);
        assert_eq!(streamer.put(2).unwrap(), None);
        assert_eq!(streamer.put(3).unwrap(), Some("hello world".to_string()));
    }

    #[test]
    fn emits_only_the_unprinted_tail() {
        let decoder = pieces(&[(1, "a b"), (2, "c"), (3, " d")]);
        let mut streamer = IncrementalDecoder::new(decoder);

        assert_eq!(streamer.put(1).unwrap(), Some("a b".to_string()));
        assert_eq!(streamer.put(2).unwrap(), None);
        assert_eq!(streamer.put(3).unwrap(), Some("c d".to_string()));
    }

    #[test]
    fn newline_flushes_and_resets_the_buffer() {
        let decoder = pieces(&[(1, "hi"), (2, "!\n"), (3, "again ")]);
        let mut streamer = IncrementalDecoder::new(decoder);

        assert_eq!(streamer.put(1).unwrap(), None);
        assert_eq!(streamer.put(2).unwrap(), Some("hi!\n".to_string()));
        assert!(streamer.token_cache.is_empty());
        assert_eq!(streamer.printed_len, 0);

        // Post-reset decoding starts from an empty buffer.
        assert_eq!(streamer.put(3).unwrap(), Some("again ".to_string()));
    }

    #[test]
    fn newline_after_partial_print_emits_remainder_only() {
        let decoder = pieces(&[(1, "one "), (2, "two\n")]);
        let mut streamer = IncrementalDecoder::new(decoder);

        assert_eq!(streamer.put(1).unwrap(), Some("one ".to_string()));
        assert_eq!(streamer.put(2).unwrap(), Some("two\n".to_string()));
    }

    #[test]
    fn replacement_character_holds_even_across_spaces() {
        // Cumulative decodes: an incomplete multi-byte tail first, the
        // completed text with a trailing space second.
        let decoder = Arc::new(ScriptDecoder(vec!["caf\u{FFFD}", "caf\u{e9} "]));
        let mut streamer = IncrementalDecoder::new(decoder);

        assert_eq!(streamer.put(1).unwrap(), None);
        assert_eq!(streamer.put(2).unwrap(), Some("caf\u{e9} ".to_string()));
    }

    #[test]
    fn word_without_boundary_is_never_emitted() {
        let decoder = pieces(&[(1, "caf"), (2, "\u{e9}")]);
        let mut streamer = IncrementalDecoder::new(decoder);

        assert_eq!(streamer.put(1).unwrap(), None);
        assert_eq!(streamer.put(2).unwrap(), None);
    }

    #[test]
    fn printed_len_never_exceeds_decoded_length() {
        let decoder = pieces(&[(1, "alpha "), (2, "beta"), (3, " gamma\n")]);
        let mut streamer = IncrementalDecoder::new(decoder);

        for token in [1, 2, 3] {
            let _ = streamer.put(token).unwrap();
            let text = streamer.tokenizer.decode(&streamer.token_cache).unwrap();
            assert!(streamer.printed_len <= text.len());
        }
        assert_eq!(streamer.printed_len, 0);
    }

    #[test]
    fn flush_releases_held_text_and_resets() {
        let decoder = pieces(&[(1, "caf"), (2, "\u{e9}")]);
        let mut streamer = IncrementalDecoder::new(decoder);

        assert_eq!(streamer.put(1).unwrap(), None);
        assert_eq!(streamer.put(2).unwrap(), None);
        assert_eq!(streamer.flush().unwrap(), Some("caf\u{e9}".to_string()));
        assert!(streamer.token_cache.is_empty());
        assert_eq!(streamer.printed_len, 0);

        // Nothing left once the buffer has been reset.
        assert_eq!(streamer.flush().unwrap(), None);
    }

    #[test]
    fn flush_emits_only_the_unprinted_tail() {
        let decoder = pieces(&[(1, "one "), (2, "two")]);
        let mut streamer = IncrementalDecoder::new(decoder);

        assert_eq!(streamer.put(1).unwrap(), Some("one ".to_string()));
        assert_eq!(streamer.put(2).unwrap(), None);
        assert_eq!(streamer.flush().unwrap(), Some("two".to_string()));
    }

    #[test]
    fn flush_after_full_emission_returns_nothing() {
        let decoder = pieces(&[(1, "hi ")]);
        let mut streamer = IncrementalDecoder::new(decoder);

        assert_eq!(streamer.put(1).unwrap(), Some("hi ".to_string()));
        assert_eq!(streamer.flush().unwrap(), None);
    }

    #[test]
    fn rewritten_shorter_text_resets_print_offset() {
        let decoder = Arc::new(ScriptDecoder(vec!["one two ", "x ", "x y "]));
        let mut streamer = IncrementalDecoder::new(decoder);

        assert_eq!(streamer.put(1).unwrap(), Some("one two ".to_string()));
        // The decoder shrank the text; the offset snaps back to zero
        // instead of slicing out of bounds.
        assert_eq!(streamer.put(2).unwrap(), Some("x ".to_string()));
        assert_eq!(streamer.put(3).unwrap(), Some("y ".to_string()));
    }
}
