//! Phoneme symbol helpers and the codepoint phonemizer
//!
//! Piper voices address phonemes by single Unicode codepoints after NFD
//! decomposition, so both IPA output from espeak and raw text end up as a
//! sequence of one-character strings.

use super::{Phonemizer, PhonemeSentence};
use crate::Result;
use unicode_normalization::UnicodeNormalization;

/// Punctuation that ends a clause and is kept as a phoneme
pub const CLAUSE_PUNCTUATION: [char; 6] = ['.', ',', '?', '!', ';', ':'];

/// Split a phoneme string into codepoint phonemes (NFD)
///
/// Whitespace runs collapse into a single `" "` word separator; leading and
/// trailing whitespace is dropped.
pub fn codepoint_phonemes(text: &str) -> PhonemeSentence {
    let mut phonemes = Vec::with_capacity(text.len());
    let mut pending_space = false;

    for ch in text.nfd() {
        if ch.is_whitespace() {
            pending_space = !phonemes.is_empty();
            continue;
        }
        if ch.is_control() || ch == '\u{200D}' {
            continue;
        }
        if pending_space {
            phonemes.push(" ".to_string());
            pending_space = false;
        }
        phonemes.push(ch.to_string());
    }

    phonemes
}

/// Phonemizer for voices trained directly on text (`phoneme_type: text`)
#[derive(Debug, Default, Clone)]
pub struct TextPhonemizer;

impl TextPhonemizer {
    pub fn new() -> Self {
        Self
    }
}

impl Phonemizer for TextPhonemizer {
    fn name(&self) -> &str {
        "text"
    }

    fn phonemize(&self, text: &str, _voice: &str) -> Result<Vec<PhonemeSentence>> {
        let phonemes = codepoint_phonemes(&text.to_lowercase());
        if phonemes.is_empty() {
            Ok(Vec::new())
        } else {
            Ok(vec![phonemes])
        }
    }
}
