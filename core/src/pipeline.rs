use crate::prelude::{ProcessingStage, Raster, RgbRaster, StageConfig, StageError, StageResult, SyncPeak};
use crate::processing::{
    DecimationStage, EnvelopeStage, FalseColorComposer, FrameAssembler, IntensityNormalizer,
    LineSynchronizer, ResampleStage,
};
use crate::recording::{Recording, RecordingInfo, SignalLoader};
use crate::telemetry::log::LogManager;
use std::path::Path;

/// Images recovered from one recording.
#[derive(Debug, Clone)]
pub struct DecodedImages {
    pub info: RecordingInfo,
    pub peaks: Vec<SyncPeak>,
    pub raw: Raster,
    pub false_color: Option<RgbRaster>,
}

impl DecodedImages {
    pub fn line_count(&self) -> usize {
        self.raw.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.raw.nrows() == 0
    }
}

/// The full recording-to-image chain.
pub struct Decoder {
    config: StageConfig,
    loader: SignalLoader,
    resample: ResampleStage,
    envelope: EnvelopeStage,
    decimation: DecimationStage,
    normalizer: IntensityNormalizer,
    sync: LineSynchronizer,
    frames: FrameAssembler,
    false_color: FalseColorComposer,
    logger: LogManager,
}

impl Decoder {
    pub fn new(config: StageConfig) -> StageResult<Self> {
        config.validate()?;
        Ok(Self {
            loader: SignalLoader::new(),
            resample: ResampleStage::new(&config),
            envelope: EnvelopeStage::new(),
            decimation: DecimationStage::new(&config),
            normalizer: IntensityNormalizer::new(),
            sync: LineSynchronizer::new(&config),
            frames: FrameAssembler::new(&config),
            false_color: FalseColorComposer::new(&config),
            logger: LogManager::for_stage("decoder"),
            config,
        })
    }

    pub fn config(&self) -> &StageConfig {
        &self.config
    }

    pub fn decode_file<P: AsRef<Path>>(&self, path: P) -> StageResult<DecodedImages> {
        let path = path.as_ref();
        self.logger.record(&format!("reading {}", path.display()));
        self.decode(Recording::open(path)?)
    }

    pub fn decode(&self, recording: Recording) -> StageResult<DecodedImages> {
        let info = recording.info();
        let waveform = self.loader.execute(recording)?;
        let waveform = self.resample.execute(waveform)?;
        let envelope = self.envelope.execute(waveform)?;
        let envelope = self.decimation.execute(envelope)?;
        let envelope = self.normalizer.execute(envelope)?;
        let synced = self.sync.execute(envelope)?;
        let peaks = synced.peaks.clone();
        let raw = self.frames.execute(synced)?;

        if raw.nrows() == 0 {
            if self.config.require_lines {
                return Err(StageError::InsufficientFrames);
            }
            self.logger.record("no complete scan lines were found");
            return Ok(DecodedImages {
                info,
                peaks,
                raw,
                false_color: None,
            });
        }

        let false_color = if self.config.false_color {
            self.logger
                .record("combining channels and creating a false color image");
            Some(self.false_color.compose(raw.view())?)
        } else {
            None
        };

        Ok(DecodedImages {
            info,
            peaks,
            raw,
            false_color,
        })
    }
}

/// Decodes one recording with the protocol defaults.
pub fn decode(recording: Recording) -> StageResult<DecodedImages> {
    Decoder::new(StageConfig::default())?.decode(recording)
}
