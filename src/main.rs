//! audio-master command line interface
//!
//! Decodes a file, runs one pipeline over it and writes the result as WAV
//! (or MP3 when a backend is available).

use audio_master::decoder::{Decoder, SymphoniaDecoder};
use audio_master::encoder::{Encoder, ExportFormat, Mp3Encoder, WavEncoder};
use audio_master::mastering::{master_offline, MasteringOptions, Preset};
use audio_master::processor::{self, Segment, SilenceConfig, TrimConfig};
use audio_master::render::{PacedSink, RealtimeContext};
use audio_master::core::duration_from_secs;
use audio_master::{AudioResult, SampleBuffer};
use clap::{Args, Parser, Subcommand};
use log::{info, warn};
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "audio-master")]
#[command(about = "Trim, slice and master voice and music recordings", long_about = None)]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Probe audio file for metadata
    Probe {
        /// Input audio file
        #[arg(value_name = "FILE")]
        input: PathBuf,
    },

    /// Crop leading and trailing silence
    Trim {
        /// Input audio file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Output file (.wav or .mp3)
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,

        /// Mean absolute level treated as signal
        #[arg(short, long, default_value_t = 0.015)]
        threshold: f32,
    },

    /// Cut out pauses, keeping the speech regions
    Silence {
        /// Input audio file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Output directory, or output file with --join
        #[arg(short, long, value_name = "PATH")]
        output: PathBuf,

        /// Energy threshold
        #[arg(short, long, default_value_t = 0.02)]
        threshold: f32,

        /// Pause length that splits regions, in milliseconds
        #[arg(long, default_value_t = 400)]
        min_silence_ms: u64,

        /// Plain mean-absolute detector without band-pass or trail
        #[arg(long)]
        raw: bool,

        /// Write the regions back to back into one file
        #[arg(long)]
        join: bool,
    },

    /// Split audio into fixed-length chunks
    Slice {
        /// Input audio file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Output directory
        #[arg(short, long, value_name = "DIR")]
        output: PathBuf,

        /// Chunk duration in seconds
        #[arg(short, long, default_value_t = 30.0)]
        duration: f64,
    },

    /// Render the mastering chain over a file
    Master {
        /// Input audio file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Output file (.wav or .mp3)
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,

        #[command(flatten)]
        mastering: MasteringArgs,
    },

    /// Play a file through the chain in real time
    Preview {
        /// Input audio file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Start position in seconds
        #[arg(long, default_value_t = 0.0)]
        offset: f64,

        /// Skip the mastering chain
        #[arg(long)]
        bypass: bool,

        #[command(flatten)]
        mastering: MasteringArgs,
    },
}

#[derive(Args)]
struct MasteringArgs {
    /// Preset: music, podcast or narration
    #[arg(short, long, default_value = "music")]
    preset: Preset,

    /// Tone boost, compression and makeup (0-1)
    #[arg(long, default_value_t = 0.0)]
    enhance: f32,

    /// Rumble and hiss reduction (0-1)
    #[arg(long, default_value_t = 0.0)]
    denoise: f32,

    /// De-esser depth (0-1)
    #[arg(long, default_value_t = 0.0)]
    sibilance: f32,

    /// Boxiness reduction (0-1)
    #[arg(long, default_value_t = 0.0)]
    room: f32,

    /// Reverb send (0-1)
    #[arg(long, default_value_t = 0.0)]
    reverb: f32,
}

impl MasteringArgs {
    fn options(&self) -> MasteringOptions {
        MasteringOptions::new(self.preset)
            .with_enhance(self.enhance)
            .with_denoise(self.denoise)
            .with_sibilance(self.sibilance)
            .with_room(self.room)
            .with_reverb(self.reverb)
    }
}

/// Write `buffer` as WAV or MP3 by extension
///
/// No MP3 backend is bundled, so `.mp3` output fails with `EncoderUnavailable`.
fn export(buffer: &SampleBuffer, path: &Path) -> AudioResult<()> {
    match ExportFormat::from_path(path)? {
        ExportFormat::Wav => WavEncoder::new().write_file(buffer, path)?,
        ExportFormat::Mp3 => Mp3Encoder::unavailable().write_file(buffer, path)?,
    }
    info!(
        "Wrote {} ({:.2}s)",
        path.display(),
        buffer.duration().as_secs_f64()
    );
    Ok(())
}

fn export_numbered(buffers: &[SampleBuffer], dir: &Path, stem: &str) -> AudioResult<()> {
    std::fs::create_dir_all(dir)?;
    for (index, buffer) in buffers.iter().enumerate() {
        export(buffer, &dir.join(format!("{}_{:03}.wav", stem, index + 1)))?;
    }
    Ok(())
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("audio")
        .to_string()
}

fn run(command: Commands) -> AudioResult<()> {
    let decoder = SymphoniaDecoder::new();

    match command {
        Commands::Probe { input } => {
            let metadata = decoder.probe_file(&input)?;
            println!("File:        {}", input.display());
            println!("Codec:       {}", metadata.codec);
            println!("Sample rate: {} Hz", metadata.sample_rate);
            println!("Channels:    {}", metadata.channels.name());
            if let Some(bits) = metadata.bits_per_sample {
                println!("Bits:        {}", bits);
            }
            match metadata.duration_secs() {
                Some(secs) => println!("Duration:    {:.3}s", secs),
                None => println!("Duration:    unknown"),
            }
        }
        Commands::Trim {
            input,
            output,
            threshold,
        } => {
            let buffer = decoder.decode_file(&input)?;
            let config = TrimConfig::default().with_threshold(threshold);
            let trimmed = processor::trim_silence(&buffer, &config)?;
            export(&trimmed, &output)?;
        }
        Commands::Silence {
            input,
            output,
            threshold,
            min_silence_ms,
            raw,
            join,
        } => {
            let buffer = decoder.decode_file(&input)?;
            let config = if raw {
                SilenceConfig::raw()
            } else {
                SilenceConfig::voice()
            }
            .with_threshold(threshold)
            .with_min_silence(Duration::from_millis(min_silence_ms));

            if join {
                let joined = processor::remove_silence_joined(&buffer, &config)?;
                export(&joined, &output)?;
            } else {
                let regions = processor::remove_silence(&buffer, &config)?;
                export_numbered(&regions, &output, &file_stem(&input))?;
            }
        }
        Commands::Slice {
            input,
            output,
            duration,
        } => {
            let buffer = decoder.decode_file(&input)?;
            let chunks = Segment::from_secs(duration)?.split(&buffer)?;
            export_numbered(&chunks, &output, &file_stem(&input))?;
        }
        Commands::Master {
            input,
            output,
            mastering,
        } => {
            let buffer = decoder.decode_file(&input)?;
            let mastered = master_offline(&buffer, &mastering.options())?;
            export(&mastered, &output)?;
        }
        Commands::Preview {
            input,
            offset,
            bypass,
            mastering,
        } => {
            let buffer = Arc::new(decoder.decode_file(&input)?);
            let options = mastering.options();
            let effects = (!bypass).then_some(&options);
            let offset = duration_from_secs(offset.max(0.0))?;

            let mut context = RealtimeContext::new(PacedSink::new());
            let (done_tx, done_rx) = mpsc::channel();
            let analyser = context.start_preview(buffer, effects, offset, move || {
                let _ = done_tx.send(());
            })?;

            while done_rx.recv_timeout(Duration::from_millis(500)).is_err() {
                if !context.is_playing() {
                    warn!("Preview stopped before the end of the file");
                    break;
                }
                let position = context.position().unwrap_or_default();
                let level = 20.0 * analyser.peak().max(1e-5).log10();
                println!("{:>8.2}s  peak {:>6.1} dBFS", position.as_secs_f64(), level);
            }
            context.close();
        }
    }

    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Setup logging
    if cli.verbose {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Debug)
            .init();
    } else {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Info)
            .init();
    }

    info!("audio-master {}", audio_master::VERSION);
    run(cli.command)?;
    Ok(())
}
