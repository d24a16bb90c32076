//! Error types for piper-stream

use thiserror::Error;

/// Main error type for piper-stream
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Phonemizer initialization error: {0}")]
    Phonemizer(String),

    #[error("Model loading error: {0}")]
    ModelLoading(String),

    #[error("ONNX Runtime error: {0}")]
    Onnx(String),

    #[error("Invalid option: {0}")]
    InvalidOption(String),

    #[error("No active synthesis session; call start_synthesis first")]
    NoSession,

    #[error("Phonemization error: {0}")]
    Phonemization(String),

    #[error("Unknown phoneme {phoneme:?} in segment {segment}")]
    UnknownPhoneme { phoneme: String, segment: usize },

    #[error("Inference error: {0}")]
    Inference(String),

    /// Returned by every pull after the session failed; `kind` is the
    /// kind of the error that failed it
    #[error("Synthesis session failed: {message}")]
    SessionFailed { kind: ErrorKind, message: String },
}

/// Coarse classification of an [`Error`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Model, config or phonemizer data could not be loaded
    Construction,
    /// Caller misuse: bad options or no active session
    Usage,
    /// A segment could not be phonemized
    Phonemization,
    /// A phoneme is missing from the voice's id map
    Encoding,
    /// The neural engine failed or returned malformed output
    Inference,
}

impl Error {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Config(_)
            | Error::Io(_)
            | Error::FileNotFound(_)
            | Error::Phonemizer(_)
            | Error::ModelLoading(_)
            | Error::Onnx(_) => ErrorKind::Construction,
            Error::InvalidOption(_) | Error::NoSession => ErrorKind::Usage,
            Error::Phonemization(_) => ErrorKind::Phonemization,
            Error::UnknownPhoneme { .. } => ErrorKind::Encoding,
            Error::Inference(_) => ErrorKind::Inference,
            Error::SessionFailed { kind, .. } => *kind,
        }
    }
}

/// Result type for piper-stream operations
pub type Result<T> = std::result::Result<T, Error>;

impl From<serde_yaml::Error> for Error {
    fn from(err: serde_yaml::Error) -> Self {
        Error::Config(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Config(err.to_string())
    }
}

impl From<ndarray::ShapeError> for Error {
    fn from(err: ndarray::ShapeError) -> Self {
        Error::Inference(format!("tensor shape: {}", err))
    }
}

impl From<ort::Error> for Error {
    fn from(err: ort::Error) -> Self {
        Error::Onnx(err.to_string())
    }
}
