//! Signal-processing core for decoding APT weather-satellite recordings.
//!
//! A recording flows through resampling, envelope detection, median
//! decimation, intensity normalization, sync correlation and line assembly
//! into a greyscale raster, with an optional false-color composite.

pub mod math;
pub mod pipeline;
pub mod prelude;
pub mod processing;
pub mod recording;
pub mod telemetry;

pub use pipeline::{decode, DecodedImages, Decoder};
pub use prelude::{
    Envelope, ProcessingStage, Raster, RgbRaster, StageConfig, StageError, StageResult, SyncPeak,
    Waveform,
};
pub use recording::{ImageWriter, Recording, RecordingInfo};
