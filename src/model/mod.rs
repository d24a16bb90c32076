//! Neural voice models
//!
//! The synthesizer talks to its acoustic model through [`VoiceModel`], so the
//! ONNX Runtime backend can be replaced (or mocked in tests) without touching
//! the session logic.

mod session;

pub use session::{check_ort_availability, OnnxVoiceModel, OrtStatus};

use crate::config::SynthesizeOptions;
use crate::Result;

/// Phoneme ids in, mono PCM out
pub trait VoiceModel: Send {
    /// Run the model on one encoded segment
    ///
    /// Returns samples in `[-1.0, 1.0]` at [`VoiceModel::sample_rate`]. The
    /// result may be empty.
    fn infer(&mut self, ids: &[i64], options: &SynthesizeOptions) -> Result<Vec<f32>>;

    /// Output sample rate in Hz
    fn sample_rate(&self) -> u32;

    /// Model name for logging
    fn name(&self) -> &str {
        "voice-model"
    }
}
