use crate::prelude::{ProcessingStage, Raster, StageConfig, StageError, StageResult, SyncedEnvelope};
use crate::telemetry::log::LogManager;

/// Cuts one frame-wide row at each sync peak.
pub struct FrameAssembler {
    frame_width: usize,
    logger: LogManager,
}

impl FrameAssembler {
    pub fn new(config: &StageConfig) -> Self {
        Self {
            frame_width: config.frame_width(),
            logger: LogManager::for_stage("frame"),
        }
    }

    pub fn frame_width(&self) -> usize {
        self.frame_width
    }
}

impl ProcessingStage for FrameAssembler {
    type Input = SyncedEnvelope;
    type Output = Raster;

    fn name(&self) -> &'static str {
        "frame"
    }

    fn execute(&self, input: SyncedEnvelope) -> StageResult<Raster> {
        let samples = &input.envelope.samples;
        let mut data = Vec::with_capacity(input.peaks.len() * self.frame_width);
        let mut rows = 0;

        // Assembly stops at the first row that would run past the end.
        for peak in &input.peaks {
            let Some(row) = samples.get(peak.offset..peak.offset + self.frame_width) else {
                break;
            };
            data.extend_from_slice(row);
            rows += 1;
        }

        self.logger.record(&format!(
            "assembled {} lines of {} samples",
            rows, self.frame_width
        ));
        Raster::from_shape_vec((rows, self.frame_width), data)
            .map_err(|err| StageError::InvalidInput(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prelude::{Envelope, SyncPeak};

    fn synced(len: usize, offsets: &[usize]) -> SyncedEnvelope {
        SyncedEnvelope {
            envelope: Envelope::new(4_160, (0..len).map(|v| (v % 256) as f32).collect()),
            peaks: offsets.iter().map(|&o| SyncPeak::new(o, 1.0)).collect(),
        }
    }

    #[test]
    fn rows_start_at_peak_offsets() {
        let raster = FrameAssembler::new(&StageConfig::default())
            .execute(synced(7_000, &[0, 2_100, 4_300]))
            .unwrap();
        assert_eq!(raster.dim(), (3, 2080));
        assert_eq!(raster[[1, 0]], (2_100 % 256) as f32);
        assert_eq!(raster[[2, 2079]], ((4_300 + 2_079) % 256) as f32);
    }

    #[test]
    fn assembly_stops_at_first_short_row() {
        let raster = FrameAssembler::new(&StageConfig::default())
            .execute(synced(5_000, &[0, 2_500, 3_000, 10]))
            .unwrap();
        // The row at 3000 is short, so the later row at 10 is never reached.
        assert_eq!(raster.nrows(), 2);
        assert!(raster.rows().into_iter().all(|row| row.len() == 2080));
    }

    #[test]
    fn no_usable_rows_yields_empty_raster() {
        let raster = FrameAssembler::new(&StageConfig::default())
            .execute(synced(1_000, &[0]))
            .unwrap();
        assert_eq!(raster.dim(), (0, 2080));
    }
}
