//! ONNX Runtime voice model
//!
//! Loads a Piper/VITS voice exported to ONNX and runs it one segment at a
//! time. The runtime library is loaded dynamically (`ORT_DYLIB_PATH`).
//!
//! # Example
//! ```no_run
//! use piper_stream::config::{EngineConfig, VoiceConfig};
//! use piper_stream::model::{OnnxVoiceModel, VoiceModel};
//!
//! let voice = VoiceConfig::load("voices/en_US-lessac-medium.onnx.json").unwrap();
//! let mut model = OnnxVoiceModel::load(
//!     "voices/en_US-lessac-medium.onnx",
//!     &voice,
//!     &EngineConfig::default(),
//! )
//! .unwrap();
//! let audio = model.infer(&[1, 0, 2], &voice.default_options).unwrap();
//! ```

use super::VoiceModel;
use crate::config::{EngineConfig, SynthesizeOptions, VoiceConfig};
use crate::{Error, Result};
use ndarray::{Array1, Array2};
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Tensor;
use std::path::{Path, PathBuf};

const INPUT_IDS: &str = "input";
const INPUT_LENGTHS: &str = "input_lengths";
const INPUT_SCALES: &str = "scales";
const INPUT_SPEAKER: &str = "sid";

/// Status of ONNX Runtime availability
#[derive(Debug, Clone, PartialEq)]
pub enum OrtStatus {
    /// ORT library found
    Available,
    /// ORT library not found (ORT_DYLIB_PATH not set)
    LibraryNotFound,
    /// ORT_DYLIB_PATH points at a missing file
    InvalidPath(String),
}

/// Check if ONNX Runtime is available
pub fn check_ort_availability() -> OrtStatus {
    match std::env::var("ORT_DYLIB_PATH") {
        Ok(path) => {
            if Path::new(&path).exists() {
                OrtStatus::Available
            } else {
                OrtStatus::InvalidPath(path)
            }
        }
        Err(_) => OrtStatus::LibraryNotFound,
    }
}

/// Piper voice running on ONNX Runtime
pub struct OnnxVoiceModel {
    session: Session,
    model_path: PathBuf,
    name: String,
    sample_rate: u32,
    num_symbols: Option<usize>,
    /// Graph declares a `sid` input
    has_speaker_input: bool,
}

impl OnnxVoiceModel {
    /// Load a voice model
    ///
    /// # Arguments
    /// * `path` - Path to the .onnx model file
    /// * `voice` - The voice's config, for sample rate and symbol table size
    /// * `engine` - Engine settings (thread count)
    pub fn load<P: AsRef<Path>>(path: P, voice: &VoiceConfig, engine: &EngineConfig) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::FileNotFound(path.display().to_string()));
        }

        let status = check_ort_availability();
        if status != OrtStatus::Available {
            return Err(Error::ModelLoading(format!(
                "ONNX Runtime not available: {:?}. Set ORT_DYLIB_PATH environment variable.",
                status
            )));
        }

        log::info!("Loading ONNX model from: {}", path.display());

        let loading = |e: ort::Error| {
            Error::ModelLoading(format!("{}: {}", path.display(), e))
        };

        let session = Session::builder()
            .map_err(loading)?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(loading)?
            .with_intra_threads(engine.intra_threads)
            .map_err(loading)?
            .commit_from_file(path)
            .map_err(loading)?;

        let input_names: Vec<&str> = session.inputs.iter().map(|i| i.name.as_str()).collect();
        for required in [INPUT_IDS, INPUT_LENGTHS, INPUT_SCALES] {
            if !input_names.contains(&required) {
                return Err(Error::ModelLoading(format!(
                    "{} has no '{}' input (inputs: {:?})",
                    path.display(),
                    required,
                    input_names
                )));
            }
        }
        let has_speaker_input = input_names.contains(&INPUT_SPEAKER);

        check_speaker_input(path, voice, has_speaker_input)?;

        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("model")
            .to_string();

        log::debug!(
            "Model '{}' inputs: {:?}, speaker input: {}",
            name,
            input_names,
            has_speaker_input
        );

        Ok(Self {
            session,
            model_path: path.to_path_buf(),
            name,
            sample_rate: voice.sample_rate,
            num_symbols: voice.num_symbols,
            has_speaker_input,
        })
    }

    /// Get model path
    pub fn model_path(&self) -> &Path {
        &self.model_path
    }

    /// True when the model accepts a speaker id
    pub fn has_speaker_input(&self) -> bool {
        self.has_speaker_input
    }

    fn run(&mut self, ids: &[i64], options: &SynthesizeOptions) -> Result<Vec<f32>> {
        let input = Array2::from_shape_vec((1, ids.len()), ids.to_vec())?;
        let lengths = Array1::from_vec(vec![ids.len() as i64]);
        let scales = Array1::from_vec(vec![
            options.noise_scale,
            options.length_scale,
            options.noise_w_scale,
        ]);

        let outputs = if self.has_speaker_input {
            let sid = Array1::from_vec(vec![options.speaker_id as i64]);
            self.session.run(ort::inputs![
                INPUT_IDS => Tensor::from_array(input)?,
                INPUT_LENGTHS => Tensor::from_array(lengths)?,
                INPUT_SCALES => Tensor::from_array(scales)?,
                INPUT_SPEAKER => Tensor::from_array(sid)?
            ])?
        } else {
            self.session.run(ort::inputs![
                INPUT_IDS => Tensor::from_array(input)?,
                INPUT_LENGTHS => Tensor::from_array(lengths)?,
                INPUT_SCALES => Tensor::from_array(scales)?
            ])?
        };

        if outputs.len() == 0 {
            return Err(Error::Inference("model returned no output tensors".into()));
        }

        let (_, data) = outputs[0].try_extract_tensor::<f32>()?;
        Ok(data.to_vec())
    }
}

impl VoiceModel for OnnxVoiceModel {
    fn infer(&mut self, ids: &[i64], options: &SynthesizeOptions) -> Result<Vec<f32>> {
        check_ids(ids, self.num_symbols)?;

        let audio = self.run(ids, options).map_err(|e| match e {
            Error::Inference(_) => e,
            other => Error::Inference(other.to_string()),
        })?;

        check_audio(&audio)?;
        Ok(audio)
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl std::fmt::Debug for OnnxVoiceModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxVoiceModel")
            .field("model_path", &self.model_path)
            .field("sample_rate", &self.sample_rate)
            .field("num_symbols", &self.num_symbols)
            .field("has_speaker_input", &self.has_speaker_input)
            .finish()
    }
}

/// A multi-speaker voice needs a graph that takes a speaker id
fn check_speaker_input(path: &Path, voice: &VoiceConfig, has_speaker_input: bool) -> Result<()> {
    if voice.is_multi_speaker() && !has_speaker_input {
        return Err(Error::ModelLoading(format!(
            "{}: voice declares {} speakers but the model has no '{}' input",
            path.display(),
            voice.num_speakers,
            INPUT_SPEAKER
        )));
    }
    Ok(())
}

/// Reject id sequences the model cannot embed
fn check_ids(ids: &[i64], num_symbols: Option<usize>) -> Result<()> {
    if ids.is_empty() {
        return Err(Error::Inference("empty phoneme id sequence".into()));
    }
    if let Some(&bad) = ids
        .iter()
        .find(|&&id| id < 0 || num_symbols.map_or(false, |n| id as usize >= n))
    {
        return Err(Error::Inference(format!(
            "phoneme id {} outside the symbol table",
            bad
        )));
    }
    Ok(())
}

fn check_audio(audio: &[f32]) -> Result<()> {
    if let Some(pos) = audio.iter().position(|s| !s.is_finite()) {
        return Err(Error::Inference(format!(
            "model produced a non-finite sample at index {}",
            pos
        )));
    }
    Ok(())
}
