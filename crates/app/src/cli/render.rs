//! Offline rendering through the voice processor

use anyhow::{bail, Context, Result};
use filteroid_core::domain::{AudioBuffer, FilteroidConfig, Mode, ProcessSpec, VoiceProcessor};
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use std::path::Path;
use tracing::{debug, info};

/// Summary of one render
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderStats {
    pub frames: usize,
    pub blocks: usize,
    pub channels: usize,
    pub sample_rate: u32,
}

/// Reject sample rates at which any voice stage is not realisable
///
/// Every mode is checked, since the mode can change while processing.
pub fn check_sample_rate(sample_rate: u32) -> Result<()> {
    let rate = sample_rate as f32;
    let offending = Mode::ALL
        .iter()
        .flat_map(|mode| mode.stage_specs())
        .find(|stage| !stage.is_valid_for(rate));

    if let Some(stage) = offending {
        bail!(
            "sample rate {sample_rate} Hz is too low: {:?} stage at {} Hz is at or above Nyquist ({} Hz)",
            stage.kind,
            stage.frequency_hz,
            rate / 2.0
        );
    }
    Ok(())
}

/// Read a WAV file as interleaved `f32` samples in [-1, 1]
pub fn read_wav(path: &Path) -> Result<(WavSpec, Vec<f32>)> {
    let reader = WavReader::open(path)
        .with_context(|| format!("Failed to open WAV file {}", path.display()))?;
    let spec = reader.spec();

    let samples: Vec<f32> = if spec.sample_format == SampleFormat::Float {
        reader
            .into_samples::<f32>()
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to read float samples")?
    } else {
        let max_val = (1_i64 << (spec.bits_per_sample - 1)) as f32;
        reader
            .into_samples::<i32>()
            .map(|s| s.map(|v| v as f32 / max_val))
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to read integer samples")?
    };

    debug!(
        path = %path.display(),
        channels = spec.channels,
        sample_rate = spec.sample_rate,
        samples = samples.len(),
        "WAV file read"
    );
    Ok((spec, samples))
}

/// Write interleaved samples as a 32-bit float WAV file
pub fn write_wav(path: &Path, channels: u16, sample_rate: u32, samples: &[f32]) -> Result<()> {
    let spec = WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 32,
        sample_format: SampleFormat::Float,
    };
    let mut writer = WavWriter::create(path, spec)
        .with_context(|| format!("Failed to create WAV file {}", path.display()))?;
    for &sample in samples {
        writer.write_sample(sample)?;
    }
    writer.finalize().context("Failed to finalize WAV file")?;
    Ok(())
}

/// Run interleaved audio through `processor` in blocks of at most
/// `block_size` frames, the way a host callback would
pub fn process_interleaved(
    processor: &mut VoiceProcessor,
    samples: &[f32],
    channels: usize,
    block_size: usize,
) -> (Vec<f32>, usize) {
    let mut buffer = AudioBuffer::new(channels, block_size);
    let mut output = Vec::with_capacity(samples.len());
    let mut blocks = 0;

    for chunk in samples.chunks(channels * block_size) {
        let frames = chunk.len() / channels;
        buffer.set_num_samples(frames);
        for ch in 0..channels {
            for (dst, frame) in buffer.channel_mut(ch).iter_mut().zip(chunk.chunks_exact(channels)) {
                *dst = frame[ch];
            }
        }

        processor.process(&mut buffer);
        output.extend(buffer.to_interleaved());
        blocks += 1;
    }

    (output, blocks)
}

/// Feed a unit impulse through a prepared mono processor
pub fn impulse_response(processor: &mut VoiceProcessor, length: usize) -> Vec<f32> {
    let mut impulse = vec![0.0; length];
    if let Some(first) = impulse.first_mut() {
        *first = 1.0;
    }
    let (response, _) = process_interleaved(processor, &impulse, 1, length.max(1));
    response
}

/// Render `input` through a processor built from `config` into `output`
///
/// Sample rate and channel count come from the input file; the block size
/// comes from the configuration.
pub fn render_file(input: &Path, output: &Path, config: &FilteroidConfig) -> Result<RenderStats> {
    let (wav, samples) = read_wav(input)?;
    let channels = wav.channels as usize;
    if channels == 0 {
        bail!("{} has no channels", input.display());
    }

    check_sample_rate(wav.sample_rate)
        .with_context(|| format!("Cannot render {}", input.display()))?;

    let block_size = config.processing.block_size;
    let mut processor = VoiceProcessor::with_parameters(config.params, config.chain);
    processor
        .prepare(ProcessSpec::new(wav.sample_rate as f32, block_size, channels))
        .context("Failed to prepare processor")?;

    info!(
        input = %input.display(),
        mode = config.params.mode.name(),
        mix = config.params.mix,
        enabled = config.params.enabled,
        block_size,
        "Rendering"
    );

    let (rendered, blocks) = process_interleaved(&mut processor, &samples, channels, block_size);
    write_wav(output, wav.channels, wav.sample_rate, &rendered)?;

    Ok(RenderStats {
        frames: rendered.len() / channels,
        blocks,
        channels,
        sample_rate: wav.sample_rate,
    })
}
