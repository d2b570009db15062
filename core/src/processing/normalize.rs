use crate::math::stats::StatsHelper;
use crate::prelude::{Envelope, ProcessingStage, StageError, StageResult};
use crate::telemetry::log::LogManager;
use ndarray::{Array, ArrayView, Dimension};

/// Linear stretch into pixel range: `((x - min) / max) * 255`, clamped to `[0, 255]`.
///
/// The divisor is the raw maximum rather than the span. A zero maximum has no
/// meaningful stretch and is reported as [`StageError::DegenerateSignal`].
pub struct IntensityNormalizer {
    logger: LogManager,
}

impl IntensityNormalizer {
    pub fn new() -> Self {
        Self {
            logger: LogManager::for_stage("normalize"),
        }
    }

    pub fn normalize<D: Dimension>(&self, data: ArrayView<'_, f32, D>) -> StageResult<Array<f32, D>> {
        if data.iter().any(|v| !v.is_finite()) {
            return Err(StageError::DegenerateSignal("non-finite sample".into()));
        }
        let (min, max) = StatsHelper::min_max(data.iter()).ok_or(StageError::EmptySignal)?;
        if max == 0.0 {
            return Err(StageError::DegenerateSignal(format!(
                "maximum is zero (minimum {min})"
            )));
        }

        self.logger
            .detail(&format!("stretching range [{min:.4}, {max:.4}] to pixel values"));
        Ok(data.mapv(|x| (((x - min) / max) * 255.0).clamp(0.0, 255.0)))
    }
}

impl Default for IntensityNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessingStage for IntensityNormalizer {
    type Input = Envelope;
    type Output = Envelope;

    fn name(&self) -> &'static str {
        "normalize"
    }

    fn execute(&self, input: Envelope) -> StageResult<Envelope> {
        let normalized = self.normalize(ArrayView::from(input.samples.as_slice()))?;
        Ok(Envelope::new(input.sample_rate, normalized.into_raw_vec()))
    }
}
