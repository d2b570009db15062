use crate::generator::template::{line_words, WORDS_PER_LINE, WORD_RATE_HZ};
use anyhow::Context;
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::f32::consts::PI;
use std::path::Path;

/// Configuration for generating a synthetic APT recording.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub sample_rate: u32,
    pub seconds: f32,
    pub channels: u16,
    pub subcarrier_hz: f32,
    pub amplitude: f32,
    pub noise: f32,
    pub seed: u64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            sample_rate: 11_025,
            seconds: 10.0,
            channels: 1,
            subcarrier_hz: 2_400.0,
            amplitude: 0.8,
            noise: 0.02,
            seed: 0,
        }
    }
}

/// Modulation floor so the subcarrier never vanishes entirely.
const FLOOR: f32 = 0.05;

pub fn build_samples(config: &GeneratorConfig) -> anyhow::Result<Vec<f32>> {
    if config.sample_rate == 0 {
        anyhow::bail!("generator sample rate must be positive");
    }
    let total = (config.seconds.max(0.0) * config.sample_rate as f32) as usize;
    let line_count = (total as u64 * WORD_RATE_HZ / u64::from(config.sample_rate)) as usize
        / WORDS_PER_LINE
        + 1;
    let words: Vec<f32> = (0..line_count).flat_map(line_words).collect();

    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut samples = Vec::with_capacity(total);
    for i in 0..total {
        let word_index = (i as u64 * WORD_RATE_HZ / u64::from(config.sample_rate)) as usize;
        let word = words
            .get(word_index)
            .copied()
            .context("word index beyond generated lines")?;
        let t = i as f32 / config.sample_rate as f32;
        let level = FLOOR + (1.0 - FLOOR) * word / 255.0;
        let jitter = if config.noise > 0.0 {
            rng.gen_range(-config.noise..config.noise)
        } else {
            0.0
        };
        let value = config.amplitude * level * (2.0 * PI * config.subcarrier_hz * t).sin() + jitter;
        samples.push(value.clamp(-1.0, 1.0));
    }

    Ok(samples)
}

/// Writes the synthetic pass as 16-bit PCM. Extra channels carry an inverted copy.
pub fn write_recording(config: &GeneratorConfig, path: &Path) -> anyhow::Result<usize> {
    let samples = build_samples(config)?;
    let spec = hound::WavSpec {
        channels: config.channels.max(1),
        sample_rate: config.sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    let mut writer = hound::WavWriter::create(path, spec)
        .with_context(|| format!("creating {}", path.display()))?;
    for &sample in &samples {
        let pcm = (sample * f32::from(i16::MAX)) as i16;
        writer.write_sample(pcm)?;
        for _ in 1..spec.channels {
            writer.write_sample(pcm.saturating_neg())?;
        }
    }
    writer
        .finalize()
        .with_context(|| format!("finalizing {}", path.display()))?;
    Ok(samples.len())
}
