use anyhow::{bail, Result};
use clap::{Parser, ValueEnum};
use log::info;
use std::f32::consts::TAU;
use std::path::PathBuf;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Waveform {
    /// Steady sine at --freq
    Sine,
    /// Logarithmic sweep from --freq to --to
    Sweep,
    /// Kick-like bass pulses every --period seconds
    Pulse,
}

#[derive(Parser)]
#[command(name = "signal-gen")]
#[command(about = "Write test signals as WAV files for checking the visualizer")]
struct Args {
    /// Output WAV path
    #[arg(default_value = "signal.wav")]
    output: PathBuf,

    #[arg(long, value_enum, default_value = "sweep")]
    waveform: Waveform,

    /// Start frequency in Hz
    #[arg(long, default_value = "40")]
    freq: f32,

    /// End frequency of a sweep in Hz
    #[arg(long, default_value = "16000")]
    to: f32,

    /// Length in seconds
    #[arg(long, default_value = "10")]
    seconds: f32,

    /// Pulse period in seconds
    #[arg(long, default_value = "0.5")]
    period: f32,

    #[arg(long, default_value = "44100")]
    sample_rate: u32,

    /// Peak amplitude in [0, 1]
    #[arg(long, default_value = "0.8")]
    amplitude: f32,
}

fn generate(args: &Args) -> Vec<f32> {
    let rate = args.sample_rate as f32;
    let total = (args.seconds * rate) as usize;
    let mut phase = 0.0f32;
    let mut samples = Vec::with_capacity(total);

    for n in 0..total {
        let t = n as f32 / rate;
        let freq = match args.waveform {
            Waveform::Sine | Waveform::Pulse => args.freq,
            Waveform::Sweep => args.freq * (args.to / args.freq).powf(t / args.seconds),
        };
        phase = (phase + TAU * freq / rate) % TAU;

        let envelope = match args.waveform {
            Waveform::Pulse => {
                let since = t % args.period;
                (-since * 18.0).exp()
            }
            _ => 1.0,
        };
        samples.push(phase.sin() * envelope * args.amplitude);
    }
    samples
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    if args.freq <= 0.0 || args.to <= 0.0 {
        bail!("frequencies must be positive");
    }
    if args.seconds <= 0.0 || args.period <= 0.0 {
        bail!("durations must be positive");
    }
    if !(0.0..=1.0).contains(&args.amplitude) {
        bail!("amplitude must be within [0, 1]");
    }

    let samples = generate(&args);
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: args.sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(&args.output, spec)?;
    for &sample in &samples {
        writer.write_sample((sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)?;
    }
    writer.finalize()?;

    info!(
        "Wrote {:?} signal, {} samples at {} Hz, to {}",
        args.waveform,
        samples.len(),
        args.sample_rate,
        args.output.display()
    );
    Ok(())
}
