//! Phoneme to id encoding
//!
//! Layout per segment: `^ _ p1 _ p2 _ ... pn _ $`, each symbol expanded to
//! its id list from the voice's `phoneme_id_map`. Substitutions from
//! `phoneme_map` are applied before lookup.

use crate::config::{VoiceConfig, BOS, EOS, PAD};
use crate::{Error, Result};
use std::collections::HashMap;

/// Stateless encoder borrowing a voice's id tables
#[derive(Debug, Clone, Copy)]
pub struct PhonemeEncoder<'a> {
    id_map: &'a HashMap<String, Vec<i64>>,
    phoneme_map: &'a HashMap<String, Vec<String>>,
}

impl<'a> PhonemeEncoder<'a> {
    pub fn new(
        id_map: &'a HashMap<String, Vec<i64>>,
        phoneme_map: &'a HashMap<String, Vec<String>>,
    ) -> Self {
        Self {
            id_map,
            phoneme_map,
        }
    }

    pub fn for_voice(voice: &'a VoiceConfig) -> Self {
        Self::new(&voice.phoneme_id_map, &voice.phoneme_map)
    }

    /// Encode one segment's phonemes
    ///
    /// `segment` is only used to label errors.
    pub fn encode(&self, phonemes: &[String], segment: usize) -> Result<Vec<i64>> {
        let bos = self.lookup(BOS, segment)?;
        let pad = self.lookup(PAD, segment)?;
        let eos = self.lookup(EOS, segment)?;

        let mut ids = Vec::with_capacity(2 * phonemes.len() + bos.len() + pad.len() + eos.len());
        ids.extend_from_slice(bos);
        ids.extend_from_slice(pad);

        for phoneme in phonemes {
            match self.phoneme_map.get(phoneme) {
                Some(replacements) => {
                    for replacement in replacements {
                        ids.extend_from_slice(self.lookup(replacement, segment)?);
                        ids.extend_from_slice(pad);
                    }
                }
                None => {
                    ids.extend_from_slice(self.lookup(phoneme, segment)?);
                    ids.extend_from_slice(pad);
                }
            }
        }

        ids.extend_from_slice(eos);
        Ok(ids)
    }

    fn lookup(&self, phoneme: &str, segment: usize) -> Result<&'a [i64]> {
        self.id_map
            .get(phoneme)
            .map(Vec::as_slice)
            .ok_or_else(|| Error::UnknownPhoneme {
                phoneme: phoneme.to_string(),
                segment,
            })
    }
}
