//! Per-utterance synthesis options

use super::VoiceConfig;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Options for one synthesis session
///
/// Resolved once when a session starts and never changed afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SynthesizeOptions {
    /// Speaker to use (multi-speaker voices only, 0 is the first speaker)
    pub speaker_id: u32,
    /// Phoneme duration scale: 0.5 speaks twice as fast, 2.0 twice as slow
    pub length_scale: f32,
    /// Amount of noise added during generation
    pub noise_scale: f32,
    /// Variation in phoneme durations
    pub noise_w_scale: f32,
}

impl SynthesizeOptions {
    /// Check option values against a voice
    pub fn validate(&self, voice: &VoiceConfig) -> Result<()> {
        if !self.length_scale.is_finite() || self.length_scale <= 0.0 {
            return Err(Error::InvalidOption(format!(
                "length_scale must be > 0, got {}",
                self.length_scale
            )));
        }
        if !self.noise_scale.is_finite() || self.noise_scale < 0.0 {
            return Err(Error::InvalidOption(format!(
                "noise_scale must be >= 0, got {}",
                self.noise_scale
            )));
        }
        if !self.noise_w_scale.is_finite() || self.noise_w_scale < 0.0 {
            return Err(Error::InvalidOption(format!(
                "noise_w_scale must be >= 0, got {}",
                self.noise_w_scale
            )));
        }
        if voice.is_multi_speaker() && self.speaker_id >= voice.num_speakers {
            return Err(Error::InvalidOption(format!(
                "speaker_id {} out of range (voice has {} speakers)",
                self.speaker_id, voice.num_speakers
            )));
        }
        Ok(())
    }

    /// Validate and normalize for a voice
    ///
    /// Single-speaker voices ignore the speaker id, so it is forced to 0.
    pub fn resolve(mut self, voice: &VoiceConfig) -> Result<Self> {
        self.validate(voice)?;
        if !voice.is_multi_speaker() && self.speaker_id != 0 {
            log::debug!(
                "Ignoring speaker_id {} for single-speaker voice",
                self.speaker_id
            );
            self.speaker_id = 0;
        }
        Ok(self)
    }

    /// Set speaker id
    pub fn with_speaker(mut self, speaker_id: u32) -> Self {
        self.speaker_id = speaker_id;
        self
    }

    /// Set length scale
    pub fn with_length_scale(mut self, length_scale: f32) -> Self {
        self.length_scale = length_scale;
        self
    }

    /// Set noise scale
    pub fn with_noise_scale(mut self, noise_scale: f32) -> Self {
        self.noise_scale = noise_scale;
        self
    }

    /// Set noise width scale
    pub fn with_noise_w_scale(mut self, noise_w_scale: f32) -> Self {
        self.noise_w_scale = noise_w_scale;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn voice(num_speakers: u32) -> VoiceConfig {
        let json = format!(
            r#"{{
                "audio": {{ "sample_rate": 22050 }},
                "num_speakers": {},
                "phoneme_id_map": {{ "_": [0], "^": [1], "$": [2] }}
            }}"#,
            num_speakers
        );
        VoiceConfig::from_json_str(&json).unwrap()
    }

    #[test]
    fn test_rejects_non_positive_length_scale() {
        let v = voice(1);
        let opts = v.default_options.with_length_scale(0.0);
        assert!(matches!(opts.validate(&v), Err(Error::InvalidOption(_))));
        let opts = v.default_options.with_length_scale(f32::NAN);
        assert!(opts.validate(&v).is_err());
    }

    #[test]
    fn test_rejects_negative_noise() {
        let v = voice(1);
        assert!(v.default_options.with_noise_scale(-0.1).validate(&v).is_err());
        assert!(v.default_options.with_noise_w_scale(-1.0).validate(&v).is_err());
        assert!(v.default_options.with_noise_scale(0.0).validate(&v).is_ok());
    }

    #[test]
    fn test_speaker_range_multi_speaker() {
        let v = voice(4);
        assert!(v.default_options.with_speaker(3).resolve(&v).is_ok());
        assert!(matches!(
            v.default_options.with_speaker(4).resolve(&v),
            Err(Error::InvalidOption(_))
        ));
    }

    #[test]
    fn test_speaker_ignored_single_speaker() {
        let v = voice(1);
        let resolved = v.default_options.with_speaker(7).resolve(&v).unwrap();
        assert_eq!(resolved.speaker_id, 0);
    }
}
