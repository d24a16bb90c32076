//! Configuration management for piper-stream
//!
//! Two layers of configuration exist:
//! - [`VoiceConfig`]: per-voice metadata read from the model's JSON file
//! - [`EngineConfig`]: tunables of the synthesizer itself, stored as YAML

mod options;
mod voice;

pub use options::SynthesizeOptions;
pub use voice::{PhonemeType, VoiceConfig, BOS, EOS, PAD};

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// What to do when a single sentence fails to phonemize
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmentErrorPolicy {
    /// Fail the whole session
    #[default]
    Abort,
    /// Log the failure and continue with the next sentence
    Skip,
}

/// Synthesizer settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Maximum samples per chunk; `None` yields one chunk per segment
    pub max_chunk_samples: Option<usize>,
    /// Handling of per-sentence phonemization failures
    pub segment_error_policy: SegmentErrorPolicy,
    /// espeak executable; auto-detected on PATH when unset
    pub espeak_program: Option<String>,
    /// ONNX Runtime intra-op threads
    pub intra_threads: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_chunk_samples: None,
            segment_error_policy: SegmentErrorPolicy::Abort,
            espeak_program: None,
            intra_threads: 1,
        }
    }
}

impl EngineConfig {
    /// Load configuration from YAML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::FileNotFound(path.display().to_string()));
        }

        let content = std::fs::read_to_string(path)?;
        let config: EngineConfig = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to YAML file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_yaml::to_string(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.max_chunk_samples == Some(0) {
            return Err(Error::Config("max_chunk_samples must be > 0".into()));
        }
        if self.intra_threads == 0 {
            return Err(Error::Config("intra_threads must be > 0".into()));
        }
        if let Some(program) = &self.espeak_program {
            if program.trim().is_empty() {
                return Err(Error::Config("espeak_program must not be empty".into()));
            }
        }
        Ok(())
    }

    /// Set the chunk size limit
    pub fn with_max_chunk_samples(mut self, max: Option<usize>) -> Self {
        self.max_chunk_samples = max;
        self
    }

    /// Set the segment error policy
    pub fn with_segment_error_policy(mut self, policy: SegmentErrorPolicy) -> Self {
        self.segment_error_policy = policy;
        self
    }
}
