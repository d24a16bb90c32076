//! Text frontend for piper-stream
//!
//! Turns input text into phoneme ids: sentence splitting, phonemization
//! (espeak-ng or raw codepoints) and Piper id encoding.

mod encoder;
mod espeak;
mod normalizer;
mod phoneme;
mod segment;

pub use encoder::PhonemeEncoder;
pub use espeak::{parse_ipa_output, split_clauses, EspeakPhonemizer};
pub use normalizer::{SentenceCursor, TextNormalizer};
pub use phoneme::{codepoint_phonemes, TextPhonemizer, CLAUSE_PUNCTUATION};
pub use segment::{Segment, SegmentStream};

use crate::config::{EngineConfig, PhonemeType, VoiceConfig};
use crate::Result;
use std::path::Path;
use std::sync::Arc;

/// Phonemes of one clause, one symbol per entry
pub type PhonemeSentence = Vec<String>;

/// Converts text to phoneme symbols
///
/// Implementations return one [`PhonemeSentence`] per clause of the input
/// and must return the same output for the same input.
pub trait Phonemizer: Send + Sync {
    /// Short identifier used in logs
    fn name(&self) -> &str;

    /// Phonemize `text` using the phonemizer-specific `voice`
    fn phonemize(&self, text: &str, voice: &str) -> Result<Vec<PhonemeSentence>>;
}

/// Build the phonemizer a voice was trained with
pub fn create_phonemizer(
    voice: &VoiceConfig,
    engine: &EngineConfig,
    espeak_data: Option<&Path>,
) -> Result<Arc<dyn Phonemizer>> {
    match voice.phoneme_type {
        PhonemeType::Espeak => {
            let espeak = EspeakPhonemizer::new(engine.espeak_program.as_deref(), espeak_data)?;
            Ok(Arc::new(espeak))
        }
        PhonemeType::Text => {
            log::info!("Using codepoint phonemizer");
            Ok(Arc::new(TextPhonemizer::new()))
        }
    }
}
