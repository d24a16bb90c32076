//! Benchmark for the text frontend and chunk streaming

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use piper_stream::model::VoiceModel;
use piper_stream::text::{codepoint_phonemes, PhonemeEncoder, TextNormalizer, TextPhonemizer};
use piper_stream::{EngineConfig, Result, SynthesizeOptions, Synthesizer, VoiceConfig};
use std::sync::Arc;

const PARAGRAPH: &str = "The quick brown fox jumps over the lazy dog. \
    Pack my box with five dozen liquor jugs! \
    How vexingly quick daft zebras jump? \
    Sphinx of black quartz, judge my vow.";

fn voice() -> VoiceConfig {
    let mut ids = String::from(r#""_": [0], "^": [1], "$": [2], " ": [3], ".": [4], ",": [5], "!": [6], "?": [7]"#);
    for (i, c) in ('a'..='z').enumerate() {
        ids.push_str(&format!(r#", "{}": [{}]"#, c, 10 + i));
    }
    let json = format!(
        r#"{{ "audio": {{ "sample_rate": 22050 }}, "phoneme_type": "text", "phoneme_id_map": {{ {} }} }}"#,
        ids
    );
    VoiceConfig::from_json_str(&json).unwrap()
}

/// Returns silence sized like a real voice (~256 samples per id)
struct Silence;

impl VoiceModel for Silence {
    fn infer(&mut self, ids: &[i64], options: &SynthesizeOptions) -> Result<Vec<f32>> {
        let len = (ids.len() as f32 * 256.0 * options.length_scale) as usize;
        Ok(vec![0.0; len])
    }

    fn sample_rate(&self) -> u32 {
        22050
    }
}

fn bench_text_processing(c: &mut Criterion) {
    let normalizer = TextNormalizer::new();

    c.bench_function("split_sentences", |b| {
        b.iter(|| normalizer.split_sentences(black_box(PARAGRAPH)))
    });

    c.bench_function("codepoint_phonemes", |b| {
        b.iter(|| codepoint_phonemes(black_box("ðə kwˈɪk bɹˈaʊn fˈɑːks dʒˈʌmps")))
    });
}

fn bench_encoding(c: &mut Criterion) {
    let voice = voice();
    let encoder = PhonemeEncoder::for_voice(&voice);
    let phonemes = codepoint_phonemes(&PARAGRAPH.to_lowercase());

    c.bench_function("encode_paragraph", |b| {
        b.iter(|| encoder.encode(black_box(&phonemes), 0).unwrap())
    });
}

fn bench_streaming(c: &mut Criterion) {
    let mut group = c.benchmark_group("stream");

    for max_chunk in [None, Some(1024)] {
        let engine = EngineConfig::default().with_max_chunk_samples(max_chunk);
        let mut tts = Synthesizer::from_parts(
            voice(),
            Arc::new(TextPhonemizer::new()),
            Box::new(Silence),
            engine,
        )
        .unwrap();

        let name = match max_chunk {
            Some(n) => format!("chunks_{}", n),
            None => "whole_segments".to_string(),
        };

        group.bench_function(name, |b| {
            b.iter(|| {
                tts.start_synthesis(black_box(PARAGRAPH), None).unwrap();
                let mut total = 0;
                while let Some(chunk) = tts.next_chunk().unwrap() {
                    total += chunk.num_samples();
                }
                total
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_text_processing, bench_encoding, bench_streaming);
criterion_main!(benches);
