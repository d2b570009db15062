use crate::prelude::{ProcessingStage, StageError, StageResult, Waveform};
use crate::telemetry::log::LogManager;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// Format details of a parsed recording, kept for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordingInfo {
    pub sample_rate: u32,
    pub channels: u16,
    pub frames: usize,
}

/// Interleaved PCM audio as read from a container.
#[derive(Debug, Clone, PartialEq)]
pub struct Recording {
    pub sample_rate: u32,
    pub channels: u16,
    pub samples: Vec<f32>,
}

impl Recording {
    pub fn mono(sample_rate: u32, samples: Vec<f32>) -> Self {
        Self {
            sample_rate,
            channels: 1,
            samples,
        }
    }

    /// Builds an interleaved recording from equal-length channel buffers.
    pub fn from_channels(sample_rate: u32, channels: &[Vec<f32>]) -> StageResult<Self> {
        let frames = channels.first().map(Vec::len).unwrap_or(0);
        if channels.iter().any(|channel| channel.len() != frames) {
            return Err(StageError::InvalidInput(
                "channel buffers differ in length".into(),
            ));
        }
        let mut samples = Vec::with_capacity(frames * channels.len());
        for frame in 0..frames {
            samples.extend(channels.iter().map(|channel| channel[frame]));
        }
        Ok(Self {
            sample_rate,
            channels: channels.len() as u16,
            samples,
        })
    }

    pub fn open<P: AsRef<Path>>(path: P) -> StageResult<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|err| {
            StageError::UnreadableRecording(format!("{}: {}", path.display(), err))
        })?;
        Self::from_reader(BufReader::new(file)).map_err(|err| match err {
            StageError::UnreadableRecording(reason) => {
                StageError::UnreadableRecording(format!("{}: {}", path.display(), reason))
            }
            other => other,
        })
    }

    /// Parses a WAV stream. Integer PCM keeps its raw magnitude.
    pub fn from_reader<R: Read>(reader: R) -> StageResult<Self> {
        let reader = hound::WavReader::new(reader)
            .map_err(|err| StageError::UnreadableRecording(err.to_string()))?;
        let spec = reader.spec();

        let samples: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Float => reader
                .into_samples::<f32>()
                .collect::<Result<_, _>>()
                .map_err(|err| StageError::UnreadableRecording(err.to_string()))?,
            hound::SampleFormat::Int => reader
                .into_samples::<i32>()
                .map(|sample| sample.map(|value| value as f32))
                .collect::<Result<_, _>>()
                .map_err(|err| StageError::UnreadableRecording(err.to_string()))?,
        };

        Ok(Self {
            sample_rate: spec.sample_rate,
            channels: spec.channels,
            samples,
        })
    }

    pub fn info(&self) -> RecordingInfo {
        RecordingInfo {
            sample_rate: self.sample_rate,
            channels: self.channels,
            frames: self.samples.len() / self.channels.max(1) as usize,
        }
    }
}

/// Reduces a recording to the mono waveform the pipeline runs on.
pub struct SignalLoader {
    logger: LogManager,
}

impl SignalLoader {
    pub fn new() -> Self {
        Self {
            logger: LogManager::for_stage("loader"),
        }
    }
}

impl Default for SignalLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessingStage for SignalLoader {
    type Input = Recording;
    type Output = Waveform;

    fn name(&self) -> &'static str {
        "loader"
    }

    fn execute(&self, input: Recording) -> StageResult<Waveform> {
        if input.sample_rate == 0 {
            return Err(StageError::UnreadableRecording(
                "sample rate must be positive".into(),
            ));
        }
        if input.channels == 0 {
            return Err(StageError::UnreadableRecording(
                "recording declares no channels".into(),
            ));
        }

        let samples = if input.channels == 1 {
            input.samples
        } else {
            self.logger.record(&format!(
                "recording has {} channels, using the first one",
                input.channels
            ));
            input
                .samples
                .iter()
                .step_by(input.channels as usize)
                .copied()
                .collect()
        };

        if samples.is_empty() {
            return Err(StageError::EmptySignal);
        }

        self.logger.detail(&format!(
            "loaded {} samples at {} Hz",
            samples.len(),
            input.sample_rate
        ));
        Ok(Waveform::new(input.sample_rate, samples))
    }
}
