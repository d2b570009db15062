use ndarray::{Array2, Array3};
use serde::{Deserialize, Serialize};

/// Sample rate every recording is normalized to before demodulation.
pub const TARGET_RATE_HZ: u32 = 20_800;

/// Sync-A tone as it appears in the normalized envelope: seven
/// `[0, 128, 255, 128]` cycles followed by seven low words.
pub fn sync_a_template() -> Vec<f32> {
    let mut template = Vec::with_capacity(35);
    for _ in 0..7 {
        template.extend_from_slice(&[0.0, 128.0, 255.0, 128.0]);
    }
    template.extend(std::iter::repeat(0.0).take(7));
    template
}

/// Shared configuration for each processing stage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StageConfig {
    pub target_rate_hz: u32,
    pub decimation_factor: usize,
    pub median_window: usize,
    pub decimation_phase: usize,
    pub min_peak_distance: usize,
    pub lines_per_second: u32,
    pub channel_split: usize,
    pub sync_template: Vec<f32>,
    pub false_color: bool,
    pub require_lines: bool,
}

impl Default for StageConfig {
    fn default() -> Self {
        Self {
            target_rate_hz: TARGET_RATE_HZ,
            decimation_factor: 5,
            median_window: 5,
            decimation_phase: 3,
            min_peak_distance: 2000,
            lines_per_second: 2,
            channel_split: 1040,
            sync_template: sync_a_template(),
            false_color: true,
            require_lines: false,
        }
    }
}

impl StageConfig {
    /// Sample rate of the envelope once decimation has run.
    ///
    /// A factor that does not fit in `u32` leaves no samples, so the rate is 0.
    pub fn line_rate_hz(&self) -> u32 {
        u32::try_from(self.decimation_factor.max(1))
            .map(|factor| self.target_rate_hz / factor)
            .unwrap_or(0)
    }

    /// Samples per scan line (2080 for the standard protocol).
    pub fn frame_width(&self) -> usize {
        (self.line_rate_hz() / self.lines_per_second.max(1)) as usize
    }

    pub fn validate(&self) -> StageResult<()> {
        if self.target_rate_hz == 0 {
            return Err(StageError::InvalidInput("target rate must be positive".into()));
        }
        if self.decimation_factor == 0 {
            return Err(StageError::InvalidInput(
                "decimation factor must be positive".into(),
            ));
        }
        if u32::try_from(self.decimation_factor).is_err() {
            return Err(StageError::InvalidInput(format!(
                "decimation factor {} is too large",
                self.decimation_factor
            )));
        }
        if self.decimation_phase >= self.decimation_factor {
            return Err(StageError::InvalidInput(format!(
                "decimation phase {} outside group of {}",
                self.decimation_phase, self.decimation_factor
            )));
        }
        if self.median_window == 0 || self.median_window % 2 == 0 {
            return Err(StageError::InvalidInput(format!(
                "median window must be odd, got {}",
                self.median_window
            )));
        }
        if self.lines_per_second == 0 {
            return Err(StageError::InvalidInput(
                "lines per second must be positive".into(),
            ));
        }
        if self.sync_template.is_empty() {
            return Err(StageError::InvalidInput("sync template is empty".into()));
        }
        if self.frame_width() == 0 {
            return Err(StageError::InvalidInput("frame width evaluates to zero".into()));
        }
        if self.false_color
            && (self.channel_split == 0
                || self.channel_split.saturating_mul(2) > self.frame_width())
        {
            return Err(StageError::InvalidInput(format!(
                "channel split {} does not fit a frame of {}",
                self.channel_split,
                self.frame_width()
            )));
        }
        Ok(())
    }
}

/// Mono sample sequence tagged with its sample rate.
#[derive(Debug, Clone, PartialEq)]
pub struct Waveform {
    pub sample_rate: u32,
    pub samples: Vec<f32>,
}

impl Waveform {
    pub fn new(sample_rate: u32, samples: Vec<f32>) -> Self {
        Self {
            sample_rate,
            samples,
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Non-negative amplitude envelope. Once normalized the values sit in `[0, 255]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub sample_rate: u32,
    pub samples: Vec<f32>,
}

impl Envelope {
    pub fn new(sample_rate: u32, samples: Vec<f32>) -> Self {
        Self {
            sample_rate,
            samples,
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Detected start of one scan line.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SyncPeak {
    pub offset: usize,
    pub score: f32,
}

impl SyncPeak {
    pub fn new(offset: usize, score: f32) -> Self {
        Self { offset, score }
    }
}

/// Scan lines in peak order, each exactly one frame wide.
pub type Raster = Array2<f32>;

/// `(rows, cols, 3)` false-color composite.
pub type RgbRaster = Array3<f32>;

/// Normalized envelope together with the line starts found in it.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncedEnvelope {
    pub envelope: Envelope,
    pub peaks: Vec<SyncPeak>,
}

/// Common error type for stage execution.
#[derive(thiserror::Error, Debug)]
pub enum StageError {
    #[error("unreadable recording: {0}")]
    UnreadableRecording(String),
    #[error("signal is empty")]
    EmptySignal,
    #[error("signal is degenerate: {0}")]
    DegenerateSignal(String),
    #[error("no usable scan lines")]
    InsufficientFrames,
    #[error("unsupported raster shape {0:?}")]
    UnsupportedRasterShape(Vec<usize>),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("image encoding failed: {0}")]
    ImageEncoding(String),
}

impl From<image::ImageError> for StageError {
    fn from(value: image::ImageError) -> Self {
        StageError::ImageEncoding(value.to_string())
    }
}

pub type StageResult<T> = Result<T, StageError>;

/// A single pipeline step. Stages keep only configuration, so `execute`
/// is a pure function of its input.
pub trait ProcessingStage {
    type Input;
    type Output;

    fn name(&self) -> &'static str;
    fn execute(&self, input: Self::Input) -> StageResult<Self::Output>;
}
