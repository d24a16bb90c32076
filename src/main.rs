//! piper-stream CLI
//!
//! Streams raw PCM for a Piper voice to stdout.

use clap::{Parser, Subcommand, ValueEnum};
use piper_stream::{EngineConfig, Error, Result, Synthesizer, VoiceConfig};
use std::io::{Read, Write};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "piper-stream",
    about = "Streaming text-to-speech for Piper voices",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SampleFormat {
    /// 16-bit signed little-endian
    S16,
    /// 32-bit float little-endian
    F32,
}

#[derive(Subcommand)]
enum Commands {
    /// Synthesize speech and write raw PCM to stdout
    Synthesize {
        /// Voice model (.onnx)
        #[arg(short, long)]
        model: PathBuf,

        /// Voice config; defaults to <model>.json
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// espeak-ng data directory
        #[arg(long)]
        espeak_data: Option<PathBuf>,

        /// Engine configuration (YAML)
        #[arg(short, long)]
        engine_config: Option<PathBuf>,

        /// Text to synthesize; read from stdin when omitted
        #[arg(short, long)]
        text: Option<String>,

        /// Speaker id or name
        #[arg(short, long)]
        speaker: Option<String>,

        /// Phoneme length scale (larger is slower)
        #[arg(long)]
        length_scale: Option<f32>,

        /// Generator noise
        #[arg(long)]
        noise_scale: Option<f32>,

        /// Phoneme width noise
        #[arg(long)]
        noise_w_scale: Option<f32>,

        /// Output sample format
        #[arg(short, long, value_enum, default_value = "s16")]
        format: SampleFormat,
    },

    /// Show information about a voice
    Info {
        /// Voice model (.onnx)
        #[arg(short, long)]
        model: PathBuf,

        /// Voice config; defaults to <model>.json
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Generate default engine configuration file
    InitConfig {
        /// Output path for config file
        #[arg(short, long, default_value = "engine.yaml")]
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    // stdout carries audio, so logs go to stderr
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Synthesize {
            model,
            config,
            espeak_data,
            engine_config,
            text,
            speaker,
            length_scale,
            noise_scale,
            noise_w_scale,
            format,
        } => {
            let engine = match engine_config {
                Some(path) => EngineConfig::load(path)?,
                None => EngineConfig::default(),
            };

            let mut tts = Synthesizer::create_with_engine(
                &model,
                config.as_deref(),
                espeak_data.as_deref(),
                engine,
            )?;

            let mut options = tts.default_options();
            if let Some(speaker) = speaker {
                let id = match speaker.parse::<u32>() {
                    Ok(id) => id,
                    Err(_) => tts.speaker_id(&speaker).ok_or_else(|| {
                        Error::InvalidOption(format!("unknown speaker '{}'", speaker))
                    })?,
                };
                options = options.with_speaker(id);
            }
            if let Some(scale) = length_scale {
                options = options.with_length_scale(scale);
            }
            if let Some(scale) = noise_scale {
                options = options.with_noise_scale(scale);
            }
            if let Some(scale) = noise_w_scale {
                options = options.with_noise_w_scale(scale);
            }

            let text = match text {
                Some(text) => text,
                None => {
                    let mut text = String::new();
                    std::io::stdin().read_to_string(&mut text)?;
                    text
                }
            };

            log::info!("Text length: {} characters", text.len());
            log::info!("Output: {} Hz mono {:?}", tts.sample_rate(), format);

            tts.start_synthesis(&text, Some(options))?;

            let stdout = std::io::stdout();
            let mut out = stdout.lock();
            let mut bytes = Vec::new();
            let mut total_samples = 0usize;

            while let Some(chunk) = tts.next_chunk()? {
                bytes.clear();
                encode_pcm(chunk.samples, format, &mut bytes);
                out.write_all(&bytes)?;
                out.flush()?;
                total_samples += chunk.num_samples();
            }

            log::info!(
                "Wrote {} samples ({:.2}s)",
                total_samples,
                total_samples as f32 / tts.sample_rate() as f32
            );
        }

        Commands::Info { model, config } => {
            let config_path = config.unwrap_or_else(|| VoiceConfig::default_path_for(&model));
            let voice = VoiceConfig::load(&config_path)?;

            println!("piper-stream {}", piper_stream::VERSION);
            println!("==================");
            println!("Model: {}", model.display());
            println!("Config: {}", config_path.display());
            println!("Sample Rate: {} Hz", voice.sample_rate);
            println!("Phoneme Type: {:?}", voice.phoneme_type);
            println!("espeak Voice: {}", voice.espeak_voice);
            if let Some(language) = &voice.language {
                println!("Language: {}", language);
            }
            println!("Phonemes: {}", voice.phoneme_id_map.len());
            println!("Speakers: {}", voice.num_speakers);

            let mut speakers: Vec<_> = voice.speaker_id_map.iter().collect();
            speakers.sort_by_key(|(_, id)| **id);
            for (name, id) in speakers {
                println!("  {:>4}  {}", id, name);
            }

            let defaults = voice.default_options;
            println!();
            println!("Defaults:");
            println!("  length_scale: {}", defaults.length_scale);
            println!("  noise_scale: {}", defaults.noise_scale);
            println!("  noise_w_scale: {}", defaults.noise_w_scale);
        }

        Commands::InitConfig { output } => {
            log::info!("Creating default configuration...");

            let config = EngineConfig::default();
            config.save(&output)?;

            eprintln!("✓ Configuration saved to: {}", output.display());
        }
    }

    Ok(())
}

/// Append samples to `out` in the requested little-endian format
fn encode_pcm(samples: &[f32], format: SampleFormat, out: &mut Vec<u8>) {
    match format {
        SampleFormat::S16 => {
            out.reserve(samples.len() * 2);
            for &s in samples {
                let v = (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
                out.extend_from_slice(&v.to_le_bytes());
            }
        }
        SampleFormat::F32 => {
            out.reserve(samples.len() * 4);
            for &s in samples {
                out.extend_from_slice(&s.to_le_bytes());
            }
        }
    }
}
