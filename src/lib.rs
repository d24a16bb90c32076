//! piper-stream - Streaming text-to-speech for Piper voices
//!
//! Text is split into sentences, phonemized (espeak-ng or raw codepoints),
//! encoded with the voice's phoneme id table and run through a VITS model on
//! ONNX Runtime one sentence at a time. Audio comes back as a pull-based
//! sequence of chunks, so playback can start after the first sentence.
//!
//! # Features
//! - Lazy, bounded-memory synthesis of arbitrarily long text
//! - Multi-speaker voices with per-session speed and noise settings
//! - Pluggable phonemizer and model backends
//!
//! # Example
//! ```no_run
//! use piper_stream::Synthesizer;
//!
//! let mut tts = Synthesizer::create("voices/en_US-lessac-medium.onnx", None, None).unwrap();
//! let options = tts.default_options().with_length_scale(1.2);
//!
//! tts.start_synthesis("Hello. World.", Some(options)).unwrap();
//! while let Some(chunk) = tts.next_chunk().unwrap() {
//!     // play or store chunk.samples
//!     if chunk.is_last {
//!         println!("done");
//!     }
//! }
//! ```

pub mod config;
pub mod error;
pub mod model;
pub mod pipeline;
pub mod text;

pub use config::{EngineConfig, SegmentErrorPolicy, SynthesizeOptions, VoiceConfig};
pub use error::{Error, ErrorKind, Result};
pub use pipeline::{AudioChunk, SessionState, StatusCode, SynthesisResult, Synthesizer};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
