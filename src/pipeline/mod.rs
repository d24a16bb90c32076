//! Streaming synthesis pipeline
//!
//! [`Synthesizer`] owns a voice (config, phonemizer and model) and at most
//! one [`SynthesisSession`]. Audio is pulled one [`AudioChunk`] at a time.
//!
//! # Example
//! ```no_run
//! use piper_stream::Synthesizer;
//!
//! let mut tts = Synthesizer::create("voices/en_US-lessac-medium.onnx", None, None).unwrap();
//! tts.start_synthesis("Hello. World.", None).unwrap();
//! while let Some(chunk) = tts.next_chunk().unwrap() {
//!     println!("{} samples (last: {})", chunk.num_samples(), chunk.is_last);
//! }
//! ```

mod session;

pub use session::{AudioChunk, SessionState, SynthesisSession};

use crate::config::{EngineConfig, SynthesizeOptions, VoiceConfig};
use crate::model::{OnnxVoiceModel, VoiceModel};
use crate::text::{create_phonemizer, PhonemeEncoder, Phonemizer, SegmentStream};
use crate::{Error, Result};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

/// Outcome of a pull, as reported across a C-style boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum StatusCode {
    Ok = 0,
    Done = 1,
    Error = -1,
}

impl StatusCode {
    /// Status for the result of [`Synthesizer::next_chunk`]
    pub fn of<T>(result: &Result<Option<T>>) -> Self {
        match result {
            Ok(Some(_)) => StatusCode::Ok,
            Ok(None) => StatusCode::Done,
            Err(_) => StatusCode::Error,
        }
    }
}

/// Fully drained utterance
#[derive(Debug)]
pub struct SynthesisResult {
    /// Generated audio samples
    pub audio: Vec<f32>,
    /// Sample rate
    pub sample_rate: u32,
    /// Duration in seconds
    pub duration: f32,
    /// Processing time in seconds
    pub processing_time: f32,
    /// Real-time factor
    pub rtf: f32,
}

impl SynthesisResult {
    /// Get duration formatted as MM:SS
    pub fn duration_formatted(&self) -> String {
        let minutes = (self.duration / 60.0) as u32;
        let seconds = (self.duration % 60.0) as u32;
        format!("{:02}:{:02}", minutes, seconds)
    }
}

/// Streaming text-to-speech synthesizer for one voice
pub struct Synthesizer {
    voice: VoiceConfig,
    engine: EngineConfig,
    phonemizer: Arc<dyn Phonemizer>,
    model: Box<dyn VoiceModel>,
    session: Option<SynthesisSession>,
}

impl Synthesizer {
    /// Load a voice
    ///
    /// # Arguments
    /// * `model_path` - Path to the voice's .onnx file
    /// * `config_path` - Voice JSON; defaults to `<model_path>.json`
    /// * `espeak_data` - espeak-ng data directory for espeak voices
    pub fn create<P: AsRef<Path>>(
        model_path: P,
        config_path: Option<&Path>,
        espeak_data: Option<&Path>,
    ) -> Result<Self> {
        Self::create_with_engine(model_path, config_path, espeak_data, EngineConfig::default())
    }

    /// Load a voice with explicit engine settings
    pub fn create_with_engine<P: AsRef<Path>>(
        model_path: P,
        config_path: Option<&Path>,
        espeak_data: Option<&Path>,
        engine: EngineConfig,
    ) -> Result<Self> {
        let model_path = model_path.as_ref();
        engine.validate()?;

        log::info!("Initializing synthesizer for {}", model_path.display());

        let config_path = config_path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| VoiceConfig::default_path_for(model_path));
        let voice = VoiceConfig::load(&config_path)?;

        let phonemizer = create_phonemizer(&voice, &engine, espeak_data)?;
        let model = OnnxVoiceModel::load(model_path, &voice, &engine)?;

        Self::from_parts(voice, phonemizer, Box::new(model), engine)
    }

    /// Assemble a synthesizer from already-loaded parts
    pub fn from_parts(
        voice: VoiceConfig,
        phonemizer: Arc<dyn Phonemizer>,
        model: Box<dyn VoiceModel>,
        engine: EngineConfig,
    ) -> Result<Self> {
        voice.validate()?;
        engine.validate()?;

        if model.sample_rate() != voice.sample_rate {
            return Err(Error::ModelLoading(format!(
                "model '{}' produces {} Hz but the voice config says {} Hz",
                model.name(),
                model.sample_rate(),
                voice.sample_rate
            )));
        }

        log::info!(
            "Synthesizer ready: {} Hz, {} speaker(s), phonemizer '{}'",
            voice.sample_rate,
            voice.num_speakers,
            phonemizer.name()
        );

        Ok(Self {
            voice,
            engine,
            phonemizer,
            model,
            session: None,
        })
    }

    /// The voice's default options
    pub fn default_options(&self) -> SynthesizeOptions {
        self.voice.default_options
    }

    pub fn voice(&self) -> &VoiceConfig {
        &self.voice
    }

    pub fn engine(&self) -> &EngineConfig {
        &self.engine
    }

    pub fn sample_rate(&self) -> u32 {
        self.voice.sample_rate
    }

    /// Look up a speaker id by name
    pub fn speaker_id(&self, name: &str) -> Option<u32> {
        self.voice.speaker_id(name)
    }

    /// State of the current session
    pub fn state(&self) -> SessionState {
        self.session
            .as_ref()
            .map_or(SessionState::Idle, SynthesisSession::state)
    }

    /// Begin synthesizing `text`, discarding any previous session
    ///
    /// Options are validated before the previous session is touched, so an
    /// invalid call leaves the synthesizer as it was. No phonemization or
    /// inference happens until [`Synthesizer::next_chunk`].
    pub fn start_synthesis(&mut self, text: &str, options: Option<SynthesizeOptions>) -> Result<()> {
        let options = options
            .unwrap_or(self.voice.default_options)
            .resolve(&self.voice)?;

        let segments = SegmentStream::new(
            Arc::clone(&self.phonemizer),
            self.voice.espeak_voice.clone(),
            text,
            self.engine.segment_error_policy,
        )?;

        // The previous session's buffer is recycled for the new one
        let buffer = match self.session.take() {
            Some(previous) => {
                if previous.state() == SessionState::Active {
                    log::debug!("Discarding unfinished session");
                }
                previous.into_buffer()
            }
            None => Vec::new(),
        };

        log::debug!("Starting synthesis of {} chars with {:?}", text.len(), options);

        self.session = Some(SynthesisSession::new(
            segments,
            options,
            self.engine.max_chunk_samples,
            buffer,
        ));
        Ok(())
    }

    /// Pull the next chunk of the current session
    ///
    /// `Ok(None)` means the utterance is complete. The returned chunk
    /// borrows the synthesizer and is invalidated by the next call.
    pub fn next_chunk(&mut self) -> Result<Option<AudioChunk<'_>>> {
        let session = self.session.as_mut().ok_or(Error::NoSession)?;
        let encoder = PhonemeEncoder::for_voice(&self.voice);
        session.next_chunk(&encoder, &mut *self.model)
    }

    /// Synthesize `text` completely into one buffer
    pub fn synthesize(&mut self, text: &str, options: Option<SynthesizeOptions>) -> Result<SynthesisResult> {
        let start_time = Instant::now();
        self.start_synthesis(text, options)?;

        let mut audio = Vec::new();
        while let Some(chunk) = self.next_chunk()? {
            audio.extend_from_slice(chunk.samples);
        }

        let sample_rate = self.voice.sample_rate;
        let duration = audio.len() as f32 / sample_rate as f32;
        let processing_time = start_time.elapsed().as_secs_f32();
        let rtf = if duration > 0.0 {
            processing_time / duration
        } else {
            0.0
        };

        log::info!(
            "Synthesized {:.2}s of audio in {:.2}s (RTF {:.3})",
            duration,
            processing_time,
            rtf
        );

        Ok(SynthesisResult {
            audio,
            sample_rate,
            duration,
            processing_time,
            rtf,
        })
    }
}

impl std::fmt::Debug for Synthesizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Synthesizer")
            .field("sample_rate", &self.voice.sample_rate)
            .field("num_speakers", &self.voice.num_speakers)
            .field("phonemizer", &self.phonemizer.name())
            .field("model", &self.model.name())
            .field("state", &self.state())
            .finish()
    }
}
