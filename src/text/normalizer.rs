//! Text normalization and sentence splitting

use crate::Result;
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashMap;

lazy_static! {
    static ref WHITESPACE_REGEX: Regex = Regex::new(r"\s+").unwrap();
}

/// Characters that end a sentence
const SENTENCE_TERMINATORS: [char; 3] = ['.', '!', '?'];

/// Closing characters that stay attached to the sentence before them
const TRAILING_CLOSERS: [char; 4] = ['"', '\'', ')', ']'];

#[derive(Debug)]
pub struct TextNormalizer {
    punct_map: HashMap<char, char>,
}

impl TextNormalizer {
    pub fn new() -> Self {
        let mut punct_map = HashMap::new();
        punct_map.insert('\u{FF0C}', ',');
        punct_map.insert('\u{3002}', '.');
        punct_map.insert('\u{FF01}', '!');
        punct_map.insert('\u{FF1F}', '?');
        punct_map.insert('\u{FF1B}', ';');
        punct_map.insert('\u{FF1A}', ':');
        punct_map.insert('\u{2026}', '.');
        punct_map.insert('\u{201C}', '\u{0022}');
        punct_map.insert('\u{201D}', '\u{0022}');
        punct_map.insert('\u{2018}', '\'');
        punct_map.insert('\u{2019}', '\'');

        Self { punct_map }
    }

    pub fn normalize(&self, text: &str) -> Result<String> {
        let mut result = self.normalize_punctuation(text);
        result = self.normalize_whitespace(&result);
        Ok(result)
    }

    pub fn normalize_punctuation(&self, text: &str) -> String {
        text.chars()
            .map(|c| *self.punct_map.get(&c).unwrap_or(&c))
            .collect()
    }

    pub fn normalize_whitespace(&self, text: &str) -> String {
        WHITESPACE_REGEX.replace_all(text, " ").trim().to_string()
    }

    /// Byte offset just past the first sentence of `text`
    ///
    /// A terminator only ends a sentence when followed by whitespace or the
    /// end of text, so `3.14` and `e.g.x` stay whole. Runs of terminators
    /// (`?!`, `...`) and closing quotes/brackets belong to the sentence.
    pub fn sentence_end(&self, text: &str) -> usize {
        let mut chars = text.char_indices().peekable();

        while let Some((_, ch)) = chars.next() {
            if !SENTENCE_TERMINATORS.contains(&ch) {
                continue;
            }

            let mut end = text.len();
            while let Some(&(idx, next)) = chars.peek() {
                if SENTENCE_TERMINATORS.contains(&next) || TRAILING_CLOSERS.contains(&next) {
                    chars.next();
                    continue;
                }
                end = idx;
                break;
            }

            match text[end..].chars().next() {
                None => return end,
                Some(c) if c.is_whitespace() => return end,
                Some(_) => {}
            }
        }

        text.len()
    }

    /// Next sentence of `text` at or after `*offset`, advancing the offset
    pub fn next_sentence<'t>(&self, text: &'t str, offset: &mut usize) -> Option<&'t str> {
        loop {
            let rest = &text[*offset..];
            if rest.trim().is_empty() {
                *offset = text.len();
                return None;
            }

            let end = self.sentence_end(rest);
            *offset += end;

            let sentence = rest[..end].trim();
            if !sentence.is_empty() {
                return Some(sentence);
            }
        }
    }

    pub fn split_sentences(&self, text: &str) -> Vec<String> {
        SentenceCursor::new(text).map(str::to_string).collect()
    }
}

impl Default for TextNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

/// Forward-only walk over the sentences of a text
///
/// Sentences are borrowed from the text; nothing beyond the current
/// position is examined until asked for.
#[derive(Debug)]
pub struct SentenceCursor<'a> {
    text: &'a str,
    offset: usize,
    normalizer: TextNormalizer,
}

impl<'a> SentenceCursor<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            text,
            offset: 0,
            normalizer: TextNormalizer::new(),
        }
    }

    /// Byte offset of the unread remainder
    pub fn offset(&self) -> usize {
        self.offset
    }
}

impl<'a> Iterator for SentenceCursor<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        self.normalizer.next_sentence(self.text, &mut self.offset)
    }
}
