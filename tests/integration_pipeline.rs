//! Pipeline Integration Tests for piper-stream
//!
//! These tests drive the full flow (text → sentences → phonemes → ids →
//! model → chunks) against a deterministic in-process model, so they run
//! without ONNX Runtime or espeak-ng.
//!
//! # Test Categories
//!
//! 1. **Streaming contract**: ordering, terminal chunk, completion
//! 2. **Options**: defaults, length scale, speakers
//! 3. **Session lifecycle**: restart, failure, usage errors

use piper_stream::config::PhonemeType;
use piper_stream::model::VoiceModel;
use piper_stream::text::{PhonemeSentence, Phonemizer, TextPhonemizer};
use piper_stream::{
    EngineConfig, Error, ErrorKind, Result, SegmentErrorPolicy, SessionState, StatusCode,
    SynthesizeOptions, Synthesizer, VoiceConfig,
};
use std::sync::{Arc, Mutex};

// ============================================================================
// Test doubles
// ============================================================================

const SAMPLE_RATE: u32 = 16000;

/// Every output buffer the model produced, in call order
type Outputs = Arc<Mutex<Vec<Vec<f32>>>>;

/// Deterministic stand-in for a VITS model
///
/// Produces `10 * ids * length_scale` samples whose values depend on the
/// ids, and records everything it returns.
struct RecordingModel {
    outputs: Outputs,
}

impl VoiceModel for RecordingModel {
    fn infer(&mut self, ids: &[i64], options: &SynthesizeOptions) -> Result<Vec<f32>> {
        let len = (ids.len() as f32 * 10.0 * options.length_scale).round() as usize;
        let seed: i64 = ids.iter().sum::<i64>() + options.speaker_id as i64;
        let audio: Vec<f32> = (0..len)
            .map(|i| ((seed + i as i64) % 199) as f32 / 200.0)
            .collect();
        self.outputs.lock().unwrap().push(audio.clone());
        Ok(audio)
    }

    fn sample_rate(&self) -> u32 {
        SAMPLE_RATE
    }

    fn name(&self) -> &str {
        "recording"
    }
}

/// Model that fails on its n-th call
struct FailingModel {
    fail_on: usize,
    calls: usize,
}

impl VoiceModel for FailingModel {
    fn infer(&mut self, ids: &[i64], _options: &SynthesizeOptions) -> Result<Vec<f32>> {
        self.calls += 1;
        if self.calls == self.fail_on {
            return Err(Error::Inference("backend exploded".into()));
        }
        Ok(vec![0.1; ids.len()])
    }

    fn sample_rate(&self) -> u32 {
        SAMPLE_RATE
    }
}

/// Codepoint phonemizer that rejects sentences containing a digit
struct NoDigits;

impl Phonemizer for NoDigits {
    fn name(&self) -> &str {
        "no-digits"
    }

    fn phonemize(&self, text: &str, voice: &str) -> Result<Vec<PhonemeSentence>> {
        if text.chars().any(|c| c.is_ascii_digit()) {
            return Err(Error::Phonemization(format!("cannot read {:?}", text)));
        }
        TextPhonemizer.phonemize(text, voice)
    }
}

fn voice_json(num_speakers: u32) -> String {
    let mut ids = String::from(r#""_": [0], "^": [1], "$": [2], " ": [3], ".": [4], ",": [5], "!": [6], "?": [7]"#);
    for (i, c) in ('a'..='z').enumerate() {
        ids.push_str(&format!(r#", "{}": [{}]"#, c, 10 + i));
    }
    format!(
        r#"{{
            "audio": {{ "sample_rate": {} }},
            "phoneme_type": "text",
            "inference": {{ "noise_scale": 0.5, "length_scale": 1.0, "noise_w": 0.6 }},
            "num_speakers": {},
            "speaker_id_map": {{ "alice": 0 }},
            "phoneme_id_map": {{ {} }}
        }}"#,
        SAMPLE_RATE, num_speakers, ids
    )
}

fn voice(num_speakers: u32) -> VoiceConfig {
    let voice = VoiceConfig::from_json_str(&voice_json(num_speakers)).unwrap();
    assert_eq!(voice.phoneme_type, PhonemeType::Text);
    voice
}

fn synthesizer_with(engine: EngineConfig, num_speakers: u32) -> (Synthesizer, Outputs) {
    let outputs: Outputs = Arc::new(Mutex::new(Vec::new()));
    let model = RecordingModel {
        outputs: Arc::clone(&outputs),
    };
    let tts = Synthesizer::from_parts(
        voice(num_speakers),
        Arc::new(TextPhonemizer::new()),
        Box::new(model),
        engine,
    )
    .unwrap();
    (tts, outputs)
}

fn synthesizer() -> (Synthesizer, Outputs) {
    synthesizer_with(EngineConfig::default(), 1)
}

/// Drain the session, returning (samples, is_last flags)
fn drain(tts: &mut Synthesizer) -> (Vec<f32>, Vec<bool>) {
    let mut samples = Vec::new();
    let mut flags = Vec::new();
    while let Some(chunk) = tts.next_chunk().unwrap() {
        assert_eq!(chunk.sample_rate, SAMPLE_RATE);
        samples.extend_from_slice(chunk.samples);
        flags.push(chunk.is_last);
    }
    (samples, flags)
}

// ============================================================================
// Streaming contract
// ============================================================================

#[test]
fn test_empty_text_is_done_immediately() {
    let (mut tts, outputs) = synthesizer();

    for text in ["", "   ", "\n\t"] {
        tts.start_synthesis(text, None).unwrap();
        let status = StatusCode::of(&tts.next_chunk());
        assert_eq!(status, StatusCode::Done);
        assert_eq!(tts.state(), SessionState::Done);
    }

    assert!(outputs.lock().unwrap().is_empty());
}

#[test]
fn test_chunks_concatenate_to_inference_outputs() {
    let (mut tts, outputs) = synthesizer();

    tts.start_synthesis("The cat sat. It was happy! Was it, though?", None)
        .unwrap();
    let (samples, _) = drain(&mut tts);

    let expected: Vec<f32> = outputs.lock().unwrap().concat();
    assert_eq!(outputs.lock().unwrap().len(), 3);
    assert_eq!(samples, expected);
}

#[test]
fn test_exactly_one_last_chunk() {
    let engine = EngineConfig::default().with_max_chunk_samples(Some(37));
    let (mut tts, _) = synthesizer_with(engine, 1);

    tts.start_synthesis("One two. Three four five. Six.", None).unwrap();
    let (_, flags) = drain(&mut tts);

    assert!(flags.len() > 3);
    assert_eq!(flags.iter().filter(|&&f| f).count(), 1);
    assert_eq!(flags.last(), Some(&true));
}

#[test]
fn test_hello_world_two_segments() {
    let (mut tts, outputs) = synthesizer();

    tts.start_synthesis("Hello. World.", None).unwrap();

    let first = tts.next_chunk().unwrap().unwrap();
    assert_eq!(first.segment, 0);
    assert!(!first.is_last);

    let second = tts.next_chunk().unwrap().unwrap();
    assert_eq!(second.segment, 1);
    assert!(second.is_last);
    let last_samples = second.samples.to_vec();

    assert!(tts.next_chunk().unwrap().is_none());

    let outputs = outputs.lock().unwrap();
    assert_eq!(outputs.len(), 2);
    assert_eq!(outputs[1], last_samples);
}

#[test]
fn test_chunk_size_policy() {
    let engine = EngineConfig::default().with_max_chunk_samples(Some(64));
    let (mut tts, outputs) = synthesizer_with(engine, 1);
    assert_eq!(tts.engine().max_chunk_samples, Some(64));

    tts.start_synthesis("A fairly long sentence for chunking.", None)
        .unwrap();

    let mut sizes = Vec::new();
    while let Some(chunk) = tts.next_chunk().unwrap() {
        sizes.push(chunk.num_samples());
    }

    let total: usize = outputs.lock().unwrap().iter().map(Vec::len).sum();
    assert_eq!(sizes.iter().sum::<usize>(), total);
    assert!(sizes.iter().all(|&n| n <= 64));
    assert!(sizes[..sizes.len() - 1].iter().all(|&n| n == 64));
}

#[test]
fn test_done_is_sticky() {
    let (mut tts, _) = synthesizer();
    tts.start_synthesis("Hi.", None).unwrap();
    drain(&mut tts);

    for _ in 0..3 {
        assert!(tts.next_chunk().unwrap().is_none());
    }
    assert_eq!(tts.state(), SessionState::Done);
}

#[test]
fn test_start_is_lazy() {
    let (mut tts, outputs) = synthesizer();
    tts.start_synthesis("Nothing runs. Until pulled.", None).unwrap();
    assert_eq!(tts.state(), SessionState::Active);
    assert!(outputs.lock().unwrap().is_empty());

    tts.next_chunk().unwrap();
    assert_eq!(outputs.lock().unwrap().len(), 1);
}

// ============================================================================
// Options
// ============================================================================

#[test]
fn test_default_options_are_stable() {
    let (mut tts, _) = synthesizer();
    let before = tts.default_options();

    let custom = before.with_length_scale(2.0).with_noise_scale(0.1);
    tts.start_synthesis("Some speech here.", Some(custom)).unwrap();
    drain(&mut tts);

    assert_eq!(tts.default_options(), before);
    assert_eq!(before.noise_scale, 0.5);
    assert_eq!(before.noise_w_scale, 0.6);
}

#[test]
fn test_length_scale_monotonic() {
    let text = "Slow and steady wins the race. Or so they say.";
    let mut previous = 0;

    for scale in [0.5f32, 0.8, 1.0, 1.5, 2.5] {
        let (mut tts, _) = synthesizer();
        let options = tts.default_options().with_length_scale(scale);
        tts.start_synthesis(text, Some(options)).unwrap();
        let (samples, _) = drain(&mut tts);

        assert!(
            samples.len() >= previous,
            "length_scale {} produced {} samples, fewer than {}",
            scale,
            samples.len(),
            previous
        );
        previous = samples.len();
    }
}

#[test]
fn test_invalid_length_scale_is_usage_error() {
    let (mut tts, _) = synthesizer();
    let options = tts.default_options().with_length_scale(0.0);
    let err = tts.start_synthesis("Hi.", Some(options)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Usage);
}

#[test]
fn test_invalid_speaker_is_usage_error() {
    let (mut tts, outputs) = synthesizer_with(EngineConfig::default(), 4);

    let options = tts.default_options().with_speaker(4);
    let err = tts.start_synthesis("Hi.", Some(options)).unwrap_err();
    assert!(matches!(err, Error::InvalidOption(_)));
    assert_eq!(err.kind(), ErrorKind::Usage);
    assert!(outputs.lock().unwrap().is_empty());

    let options = tts.default_options().with_speaker(3);
    tts.start_synthesis("Hi.", Some(options)).unwrap();
    assert!(tts.next_chunk().unwrap().is_some());
}

#[test]
fn test_single_speaker_ignores_speaker_id() {
    let (mut a, _) = synthesizer();
    let (mut b, _) = synthesizer();

    a.start_synthesis("Same voice.", None).unwrap();
    let options = b.default_options().with_speaker(7);
    b.start_synthesis("Same voice.", Some(options)).unwrap();

    assert_eq!(drain(&mut a).0, drain(&mut b).0);
}

#[test]
fn test_speaker_lookup_by_name() {
    let (tts, _) = synthesizer_with(EngineConfig::default(), 2);
    assert!(tts.voice().is_multi_speaker());
    assert_eq!(tts.voice().num_speakers, 2);
    assert_eq!(tts.speaker_id("alice"), Some(0));
    assert_eq!(tts.speaker_id("bob"), None);
}

// ============================================================================
// Session lifecycle
// ============================================================================

#[test]
fn test_next_chunk_without_session() {
    let (mut tts, _) = synthesizer();
    assert_eq!(tts.state(), SessionState::Idle);
    let err = tts.next_chunk().unwrap_err();
    assert!(matches!(err, Error::NoSession));
    assert_eq!(err.kind(), ErrorKind::Usage);
}

#[test]
fn test_restart_discards_previous_session() {
    let (mut tts, outputs) = synthesizer();

    tts.start_synthesis("First utterance. It has more. And more.", None)
        .unwrap();
    tts.next_chunk().unwrap().unwrap();

    tts.start_synthesis("Second.", None).unwrap();
    outputs.lock().unwrap().clear();
    let (samples, flags) = drain(&mut tts);

    let outputs = outputs.lock().unwrap();
    assert_eq!(outputs.len(), 1);
    assert_eq!(samples, outputs[0]);
    assert_eq!(flags, vec![true]);
}

#[test]
fn test_invalid_restart_keeps_current_session() {
    let (mut tts, _) = synthesizer();
    tts.start_synthesis("Keep going. Please.", None).unwrap();
    tts.next_chunk().unwrap().unwrap();

    let bad = tts.default_options().with_noise_scale(-1.0);
    assert!(tts.start_synthesis("Other.", Some(bad)).is_err());

    let chunk = tts.next_chunk().unwrap().unwrap();
    assert_eq!(chunk.segment, 1);
    assert!(chunk.is_last);
}

#[test]
fn test_deterministic_across_synthesizers() {
    let text = "Repeat after me. Exactly the same, every time.";

    let (mut a, _) = synthesizer();
    a.start_synthesis(text, None).unwrap();
    let first = drain(&mut a);

    let (mut b, _) = synthesizer();
    b.start_synthesis(text, None).unwrap();
    let second = drain(&mut b);

    assert_eq!(first, second);
}

#[test]
fn test_inference_failure_is_sticky() {
    let mut tts = Synthesizer::from_parts(
        voice(1),
        Arc::new(TextPhonemizer::new()),
        Box::new(FailingModel { fail_on: 2, calls: 0 }),
        EngineConfig::default(),
    )
    .unwrap();

    tts.start_synthesis("Fine. Broken. Never.", None).unwrap();
    assert!(tts.next_chunk().unwrap().is_some());

    let err = tts.next_chunk().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Inference);
    assert_eq!(tts.state(), SessionState::Failed);

    let again = tts.next_chunk().map(|chunk| chunk.map(|_| ()));
    assert_eq!(StatusCode::of(&again), StatusCode::Error);
    assert!(matches!(again, Err(Error::SessionFailed { .. })));
    if let Err(again) = again {
        assert_eq!(again.kind(), ErrorKind::Inference);
    }

    // a new session recovers
    tts.start_synthesis("Fine.", None).unwrap();
    assert!(tts.next_chunk().unwrap().is_some());
}

#[test]
fn test_unknown_phoneme_fails_session() {
    let (mut tts, outputs) = synthesizer();
    tts.start_synthesis("Ünïcode.", None).unwrap();

    let err = tts.next_chunk().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Encoding);
    assert_eq!(tts.state(), SessionState::Failed);
    assert!(outputs.lock().unwrap().is_empty());
}

#[test]
fn test_phonemization_error_aborts_by_default() {
    let mut tts = Synthesizer::from_parts(
        voice(1),
        Arc::new(NoDigits),
        Box::new(RecordingModel {
            outputs: Arc::default(),
        }),
        EngineConfig::default(),
    )
    .unwrap();

    tts.start_synthesis("Fine. Call 911. Later.", None).unwrap();
    let first = tts.next_chunk().unwrap().unwrap();
    assert!(!first.is_last);

    let err = tts.next_chunk().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Phonemization);
    assert_eq!(tts.state(), SessionState::Failed);
}

#[test]
fn test_phonemization_error_skipped_when_configured() {
    let outputs: Outputs = Arc::default();
    let mut tts = Synthesizer::from_parts(
        voice(1),
        Arc::new(NoDigits),
        Box::new(RecordingModel {
            outputs: Arc::clone(&outputs),
        }),
        EngineConfig::default().with_segment_error_policy(SegmentErrorPolicy::Skip),
    )
    .unwrap();

    tts.start_synthesis("Fine. Call 911. Later.", None).unwrap();
    let (_, flags) = drain(&mut tts);

    assert_eq!(flags, vec![false, true]);
    assert_eq!(outputs.lock().unwrap().len(), 2);
}

#[test]
fn test_sample_rate_mismatch_rejected() {
    let mut json_voice = voice(1);
    json_voice.sample_rate = 22050;
    let result = Synthesizer::from_parts(
        json_voice,
        Arc::new(TextPhonemizer::new()),
        Box::new(RecordingModel {
            outputs: Arc::default(),
        }),
        EngineConfig::default(),
    );
    assert_eq!(result.unwrap_err().kind(), ErrorKind::Construction);
}

#[test]
fn test_synthesize_whole_utterance() {
    let (mut tts, outputs) = synthesizer();
    let result = tts.synthesize("Short one. Another.", None).unwrap();

    assert_eq!(result.sample_rate, SAMPLE_RATE);
    assert_eq!(result.audio, outputs.lock().unwrap().concat());
    assert!(result.duration > 0.0);
    assert_eq!(
        result.duration,
        result.audio.len() as f32 / SAMPLE_RATE as f32
    );
}
