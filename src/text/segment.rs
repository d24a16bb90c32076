//! Lazy segmentation of an utterance
//!
//! [`SegmentStream`] owns the utterance text and hands out one phonemized
//! [`Segment`] at a time. Sentences are phonemized only when needed; one
//! segment of lookahead is kept so the final segment can be tagged.

use super::{PhonemeSentence, Phonemizer, TextNormalizer};
use crate::config::SegmentErrorPolicy;
use crate::Result;
use std::collections::VecDeque;
use std::sync::Arc;

/// One phonemizable unit of an utterance
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    /// Position within the utterance, starting at 0
    pub index: usize,
    /// Phoneme symbols in order
    pub phonemes: PhonemeSentence,
    /// True for the final segment of the utterance
    pub is_last: bool,
}

/// Restartable, forward-only producer of segments
pub struct SegmentStream {
    phonemizer: Arc<dyn Phonemizer>,
    voice: String,
    normalizer: TextNormalizer,
    text: String,
    offset: usize,
    /// Clauses of the most recently phonemized sentence not yet handed out
    pending: VecDeque<PhonemeSentence>,
    lookahead: Option<Result<PhonemeSentence>>,
    next_index: usize,
    policy: SegmentErrorPolicy,
    sentences_phonemized: usize,
}

impl SegmentStream {
    pub fn new(
        phonemizer: Arc<dyn Phonemizer>,
        voice: impl Into<String>,
        text: &str,
        policy: SegmentErrorPolicy,
    ) -> Result<Self> {
        let normalizer = TextNormalizer::new();
        let text = normalizer.normalize(text)?;

        Ok(Self {
            phonemizer,
            voice: voice.into(),
            normalizer,
            text,
            offset: 0,
            pending: VecDeque::new(),
            lookahead: None,
            next_index: 0,
            policy,
            sentences_phonemized: 0,
        })
    }

    /// Number of phonemizer calls made so far
    pub fn sentences_phonemized(&self) -> usize {
        self.sentences_phonemized
    }

    /// Next non-empty clause, phonemizing another sentence if needed
    fn pull(&mut self) -> Option<Result<PhonemeSentence>> {
        loop {
            if let Some(clause) = self.pending.pop_front() {
                return Some(Ok(clause));
            }

            let sentence = self.normalizer.next_sentence(&self.text, &mut self.offset)?;
            self.sentences_phonemized += 1;

            match self.phonemizer.phonemize(sentence, &self.voice) {
                Ok(clauses) => {
                    log::trace!("{:?} -> {} clause(s)", sentence, clauses.len());
                    self.pending
                        .extend(clauses.into_iter().filter(|c| !c.is_empty()));
                }
                Err(e) => match self.policy {
                    SegmentErrorPolicy::Abort => return Some(Err(e)),
                    SegmentErrorPolicy::Skip => {
                        log::warn!("Skipping sentence {:?}: {}", sentence, e);
                    }
                },
            }
        }
    }
}

impl Iterator for SegmentStream {
    type Item = Result<Segment>;

    fn next(&mut self) -> Option<Self::Item> {
        let current = match self.lookahead.take() {
            Some(clause) => clause,
            None => self.pull()?,
        };

        let phonemes = match current {
            Ok(phonemes) => phonemes,
            Err(e) => return Some(Err(e)),
        };

        self.lookahead = self.pull();

        let segment = Segment {
            index: self.next_index,
            phonemes,
            is_last: self.lookahead.is_none(),
        };
        self.next_index += 1;
        Some(Ok(segment))
    }
}

impl std::fmt::Debug for SegmentStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SegmentStream")
            .field("phonemizer", &self.phonemizer.name())
            .field("voice", &self.voice)
            .field("offset", &self.offset)
            .field("text_len", &self.text.len())
            .field("next_index", &self.next_index)
            .finish()
    }
}
