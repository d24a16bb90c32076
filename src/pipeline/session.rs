//! Synthesis session state machine
//!
//! A session walks the segments of one utterance in order: each segment is
//! encoded, run through the model once, and its samples are handed out as
//! chunks until the buffer is drained. Only one segment's audio is held at a
//! time.

use crate::config::SynthesizeOptions;
use crate::model::VoiceModel;
use crate::text::{PhonemeEncoder, SegmentStream};
use crate::{Error, ErrorKind, Result};

/// Lifecycle of a synthesizer's session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No session started
    Idle,
    /// Chunks remain to be produced
    Active,
    /// Every chunk has been delivered
    Done,
    /// A segment failed; the session produces nothing more
    Failed,
}

/// One slice of synthesized audio
///
/// Borrows the session's buffer, so it must be dropped (or copied out)
/// before the next chunk is requested.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AudioChunk<'a> {
    /// Mono samples in `[-1.0, 1.0]`
    pub samples: &'a [f32],
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Index of the segment these samples belong to
    pub segment: usize,
    /// True only for the final chunk of the final segment
    pub is_last: bool,
}

impl AudioChunk<'_> {
    /// Number of samples in this chunk
    pub fn num_samples(&self) -> usize {
        self.samples.len()
    }

    /// Duration in seconds
    pub fn duration(&self) -> f32 {
        self.samples.len() as f32 / self.sample_rate as f32
    }
}

/// State of one utterance being synthesized
#[derive(Debug)]
pub struct SynthesisSession {
    segments: SegmentStream,
    options: SynthesizeOptions,
    state: SessionState,
    /// Kind and message of the error that failed the session
    failure: Option<(ErrorKind, String)>,
    max_chunk_samples: Option<usize>,

    /// Audio of the current segment, reused across segments
    buffer: Vec<f32>,
    /// Samples of `buffer` already delivered
    cursor: usize,
    segment: usize,
    segment_is_last: bool,
    /// Current segment has not produced a chunk yet
    fresh: bool,

    inference_calls: usize,
}

impl SynthesisSession {
    /// Prepare a session; no phonemization or inference happens here
    pub fn new(
        segments: SegmentStream,
        options: SynthesizeOptions,
        max_chunk_samples: Option<usize>,
        buffer: Vec<f32>,
    ) -> Self {
        let mut buffer = buffer;
        buffer.clear();

        Self {
            segments,
            options,
            state: SessionState::Active,
            failure: None,
            max_chunk_samples,
            buffer,
            cursor: 0,
            segment: 0,
            segment_is_last: false,
            fresh: false,
            inference_calls: 0,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn options(&self) -> &SynthesizeOptions {
        &self.options
    }

    /// Number of model invocations so far
    pub fn inference_calls(&self) -> usize {
        self.inference_calls
    }

    /// Give back the sample buffer for the next session
    pub fn into_buffer(self) -> Vec<f32> {
        self.buffer
    }

    /// Advance by one chunk
    ///
    /// Returns `Ok(None)` once the utterance is complete. After a failure
    /// every call returns [`Error::SessionFailed`] carrying the original
    /// error's kind.
    pub fn next_chunk(
        &mut self,
        encoder: &PhonemeEncoder<'_>,
        model: &mut dyn VoiceModel,
    ) -> Result<Option<AudioChunk<'_>>> {
        match self.state {
            SessionState::Active => {}
            SessionState::Done => return Ok(None),
            SessionState::Failed => {
                let (kind, message) = self
                    .failure
                    .clone()
                    .unwrap_or((ErrorKind::Usage, String::new()));
                return Err(Error::SessionFailed { kind, message });
            }
            SessionState::Idle => return Err(Error::NoSession),
        }

        if !self.fresh && self.cursor >= self.buffer.len() {
            let segment = match self.segments.next() {
                None => {
                    log::debug!("Session complete after {} segment(s)", self.inference_calls);
                    self.state = SessionState::Done;
                    return Ok(None);
                }
                Some(Err(e)) => return Err(self.fail(e)),
                Some(Ok(segment)) => segment,
            };

            let ids = match encoder.encode(&segment.phonemes, segment.index) {
                Ok(ids) => ids,
                Err(e) => return Err(self.fail(e)),
            };

            self.inference_calls += 1;
            let audio = match model.infer(&ids, &self.options) {
                Ok(audio) => audio,
                Err(e) => return Err(self.fail(e)),
            };

            log::debug!(
                "Segment {}: {} phonemes, {} ids -> {} samples{}",
                segment.index,
                segment.phonemes.len(),
                ids.len(),
                audio.len(),
                if segment.is_last { " (last)" } else { "" }
            );

            self.buffer.clear();
            self.buffer.extend_from_slice(&audio);
            self.cursor = 0;
            self.segment = segment.index;
            self.segment_is_last = segment.is_last;
            self.fresh = true;
        }

        let start = self.cursor;
        let end = match self.max_chunk_samples {
            Some(max) => (start + max).min(self.buffer.len()),
            None => self.buffer.len(),
        };
        self.cursor = end;
        self.fresh = false;

        let is_last = self.segment_is_last && end == self.buffer.len();
        if is_last {
            self.state = SessionState::Done;
        }

        Ok(Some(AudioChunk {
            samples: &self.buffer[start..end],
            sample_rate: model.sample_rate(),
            segment: self.segment,
            is_last,
        }))
    }

    /// Enter the failed state and hand the error back to the caller
    fn fail(&mut self, error: Error) -> Error {
        log::error!("Synthesis failed: {}", error);
        self.state = SessionState::Failed;
        self.failure = Some((error.kind(), error.to_string()));
        self.buffer.clear();
        self.cursor = 0;
        error
    }
}
