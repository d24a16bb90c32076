//! Voice configuration (`<model>.onnx.json`)
//!
//! Parses the JSON file that ships next to every voice model and turns it
//! into an immutable [`VoiceConfig`]. Default synthesis options are derived
//! once here and stored on the config.

use super::SynthesizeOptions;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Padding symbol inserted after BOS and after every phoneme
pub const PAD: &str = "_";
/// Beginning-of-sentence symbol
pub const BOS: &str = "^";
/// End-of-sentence symbol
pub const EOS: &str = "$";

const DEFAULT_NOISE_SCALE: f32 = 0.667;
const DEFAULT_LENGTH_SCALE: f32 = 1.0;
const DEFAULT_NOISE_W_SCALE: f32 = 0.8;
const DEFAULT_ESPEAK_VOICE: &str = "en-us";

/// How a voice expects its input to be phonemized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PhonemeType {
    /// IPA phonemes produced by espeak-ng
    #[default]
    Espeak,
    /// Unicode codepoints of the text itself
    Text,
}

/// Immutable voice metadata
#[derive(Debug, Clone)]
pub struct VoiceConfig {
    /// Output sample rate in Hz
    pub sample_rate: u32,
    /// Phonemizer flavour
    pub phoneme_type: PhonemeType,
    /// espeak-ng voice name (e.g. `en-us`)
    pub espeak_voice: String,
    /// Language code, informational
    pub language: Option<String>,
    /// Phoneme symbol to model ids
    pub phoneme_id_map: HashMap<String, Vec<i64>>,
    /// Phoneme substitutions applied before id lookup
    pub phoneme_map: HashMap<String, Vec<String>>,
    /// Size of the model's symbol table, when known
    pub num_symbols: Option<usize>,
    /// Number of speakers (at least 1)
    pub num_speakers: u32,
    /// Speaker name to speaker id
    pub speaker_id_map: HashMap<String, u32>,
    /// Default synthesis options
    pub default_options: SynthesizeOptions,
}

// On-disk layout

#[derive(Debug, Deserialize)]
struct RawVoiceConfig {
    audio: RawAudio,
    #[serde(default)]
    espeak: Option<RawEspeak>,
    #[serde(default)]
    language: Option<RawLanguage>,
    #[serde(default)]
    inference: RawInference,
    #[serde(default)]
    phoneme_type: PhonemeType,
    #[serde(default)]
    phoneme_map: HashMap<String, Vec<String>>,
    phoneme_id_map: HashMap<String, Vec<i64>>,
    #[serde(default)]
    num_symbols: Option<usize>,
    #[serde(default = "default_num_speakers")]
    num_speakers: u32,
    #[serde(default)]
    speaker_id_map: HashMap<String, u32>,
}

#[derive(Debug, Deserialize)]
struct RawAudio {
    sample_rate: u32,
}

#[derive(Debug, Deserialize)]
struct RawEspeak {
    voice: String,
}

#[derive(Debug, Deserialize)]
struct RawLanguage {
    code: String,
}

#[derive(Debug, Deserialize)]
struct RawInference {
    #[serde(default = "default_noise_scale")]
    noise_scale: f32,
    #[serde(default = "default_length_scale")]
    length_scale: f32,
    #[serde(default = "default_noise_w_scale")]
    noise_w: f32,
}

impl Default for RawInference {
    fn default() -> Self {
        Self {
            noise_scale: DEFAULT_NOISE_SCALE,
            length_scale: DEFAULT_LENGTH_SCALE,
            noise_w: DEFAULT_NOISE_W_SCALE,
        }
    }
}

fn default_num_speakers() -> u32 {
    1
}

fn default_noise_scale() -> f32 {
    DEFAULT_NOISE_SCALE
}

fn default_length_scale() -> f32 {
    DEFAULT_LENGTH_SCALE
}

fn default_noise_w_scale() -> f32 {
    DEFAULT_NOISE_W_SCALE
}

impl From<RawVoiceConfig> for VoiceConfig {
    fn from(raw: RawVoiceConfig) -> Self {
        let default_options = SynthesizeOptions {
            speaker_id: 0,
            length_scale: raw.inference.length_scale,
            noise_scale: raw.inference.noise_scale,
            noise_w_scale: raw.inference.noise_w,
        };

        Self {
            sample_rate: raw.audio.sample_rate,
            phoneme_type: raw.phoneme_type,
            espeak_voice: raw
                .espeak
                .map(|e| e.voice)
                .unwrap_or_else(|| DEFAULT_ESPEAK_VOICE.to_string()),
            language: raw.language.map(|l| l.code),
            phoneme_id_map: raw.phoneme_id_map,
            phoneme_map: raw.phoneme_map,
            num_symbols: raw.num_symbols,
            num_speakers: raw.num_speakers,
            speaker_id_map: raw.speaker_id_map,
            default_options,
        }
    }
}

impl VoiceConfig {
    /// Load and validate a voice config file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::FileNotFound(path.display().to_string()));
        }

        let content = std::fs::read_to_string(path)?;
        let config = Self::from_json_str(&content)?;
        log::debug!(
            "Loaded voice config {} ({} Hz, {} speaker(s), {} phonemes)",
            path.display(),
            config.sample_rate,
            config.num_speakers,
            config.phoneme_id_map.len()
        );
        Ok(config)
    }

    /// Parse and validate a voice config from JSON text
    pub fn from_json_str(json: &str) -> Result<Self> {
        let raw: RawVoiceConfig = serde_json::from_str(json)?;
        let config = VoiceConfig::from(raw);
        config.validate()?;
        Ok(config)
    }

    /// Config path used when none is given: `<model_path>.json`
    pub fn default_path_for<P: AsRef<Path>>(model_path: P) -> PathBuf {
        let mut path = model_path.as_ref().as_os_str().to_owned();
        path.push(".json");
        PathBuf::from(path)
    }

    /// True when the model conditions on a speaker id
    pub fn is_multi_speaker(&self) -> bool {
        self.num_speakers > 1
    }

    /// Look up a speaker id by name
    pub fn speaker_id(&self, name: &str) -> Option<u32> {
        self.speaker_id_map.get(name).copied()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 {
            return Err(Error::Config("Sample rate must be > 0".into()));
        }
        if self.num_speakers == 0 {
            return Err(Error::Config("num_speakers must be >= 1".into()));
        }

        for symbol in [PAD, BOS, EOS] {
            match self.phoneme_id_map.get(symbol) {
                Some(ids) if !ids.is_empty() => {}
                _ => {
                    return Err(Error::Config(format!(
                        "phoneme_id_map is missing required symbol {:?}",
                        symbol
                    )))
                }
            }
        }

        for (phoneme, ids) in &self.phoneme_id_map {
            if ids.is_empty() {
                return Err(Error::Config(format!(
                    "phoneme {:?} maps to no ids",
                    phoneme
                )));
            }
            for &id in ids {
                let out_of_range = match self.num_symbols {
                    Some(n) => id < 0 || id as usize >= n,
                    None => id < 0,
                };
                if out_of_range {
                    return Err(Error::Config(format!(
                        "phoneme {:?} has id {} outside the symbol table",
                        phoneme, id
                    )));
                }
            }
        }

        for (name, &id) in &self.speaker_id_map {
            if id >= self.num_speakers {
                return Err(Error::Config(format!(
                    "speaker {:?} has id {} but the voice has {} speaker(s)",
                    name, id, self.num_speakers
                )));
            }
        }

        self.default_options
            .validate(self)
            .map_err(|e| Error::Config(format!("default inference settings: {}", e)))?;

        Ok(())
    }
}
