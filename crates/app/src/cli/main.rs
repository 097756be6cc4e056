//! Filteroid CLI Application

mod render;

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand, ValueEnum};
use filteroid_core::domain::{
    FilteroidConfig, Mode, ParameterSnapshot, ProcessSpec, VoiceProcessor,
};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "filteroid")]
#[command(about = "Telephone and radio voice filter", long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Render a WAV file through the voice filter
    Render {
        /// Input WAV file
        input: PathBuf,

        /// Output WAV file (32-bit float)
        output: PathBuf,

        #[command(flatten)]
        overrides: ParamOverrides,

        /// Frames handed to the processor per block
        #[arg(long)]
        block_size: Option<usize>,
    },

    /// Print the impulse response of a mode
    Impulse {
        #[command(flatten)]
        overrides: ParamOverrides,

        /// Sample rate in Hz
        #[arg(long, default_value_t = 48000)]
        sample_rate: u32,

        /// Number of samples to print
        #[arg(long, default_value_t = 32)]
        length: usize,
    },

    /// Write a default configuration file
    InitConfig {
        /// Destination path
        path: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

/// Parameter values that override the configuration file
#[derive(Args)]
struct ParamOverrides {
    /// Configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Filter mode
    #[arg(short, long, value_enum)]
    mode: Option<ModeArg>,

    /// Wet amount in [0, 1]
    #[arg(long)]
    mix: Option<f32>,

    /// Leave the effect disabled
    #[arg(long)]
    bypass: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum ModeArg {
    Telephone,
    Radio,
    Custom,
}

impl From<ModeArg> for Mode {
    fn from(arg: ModeArg) -> Self {
        match arg {
            ModeArg::Telephone => Mode::Telephone,
            ModeArg::Radio => Mode::Radio,
            ModeArg::Custom => Mode::Custom,
        }
    }
}

impl ParamOverrides {
    /// Load the configuration (or defaults) and apply the command-line values
    async fn resolve(&self) -> anyhow::Result<FilteroidConfig> {
        let mut config = match &self.config {
            Some(path) => FilteroidConfig::load_from_file(path)
                .await
                .with_context(|| format!("Failed to load config {}", path.display()))?,
            None => FilteroidConfig::default(),
        };

        if let Some(mode) = self.mode {
            config.params.mode = mode.into();
        }
        if let Some(mix) = self.mix {
            config.params.mix = mix;
        }
        if self.bypass {
            config.params.enabled = false;
        }

        config.validate().context("Invalid parameters")?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Render {
            input,
            output,
            overrides,
            block_size,
        } => {
            let mut config = overrides.resolve().await?;
            if let Some(block_size) = block_size {
                config.processing.block_size = block_size;
            }
            let stats = render::render_file(&input, &output, &config)?;
            tracing::info!(
                frames = stats.frames,
                blocks = stats.blocks,
                channels = stats.channels,
                sample_rate = stats.sample_rate,
                output = %output.display(),
                "Render complete"
            );
        }
        Command::Impulse {
            overrides,
            sample_rate,
            length,
        } => {
            let config = overrides.resolve().await?;
            print_impulse(&config, sample_rate, length)?;
        }
        Command::InitConfig { path, force } => {
            if path.exists() && !force {
                bail!("{} already exists (use --force to overwrite)", path.display());
            }
            FilteroidConfig::default()
                .save_to_file(&path)
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
        }
    }

    Ok(())
}

fn print_impulse(config: &FilteroidConfig, sample_rate: u32, length: usize) -> anyhow::Result<()> {
    let length = length.max(1);
    render::check_sample_rate(sample_rate)?;
    let mut processor = VoiceProcessor::with_parameters(config.params, config.chain);
    processor.prepare(ProcessSpec::new(sample_rate as f32, length, 1))?;

    let response = render::impulse_response(&mut processor, length);
    let ParameterSnapshot { mode, mix, enabled } = processor.parameters().snapshot();
    println!("# mode={} mix={mix} enabled={enabled} sample_rate={sample_rate}", mode.name());

    for (n, sample) in response.iter().enumerate() {
        println!("{n}\t{sample:+.9}");
    }

    if enabled {
        println!("# wet magnitude (dB)");
        for freq in [100.0, 300.0, 1000.0, 3400.0, 3500.0, 8000.0] {
            if freq >= sample_rate as f32 / 2.0 {
                continue;
            }
            let gain: f32 = mode
                .voices()
                .iter()
                .map(|&kind| processor.chain().voice(kind).magnitude_at(freq))
                .product();
            println!("{freq:>7.0} Hz\t{:+.2}", 20.0 * gain.log10());
        }
    }

    Ok(())
}
