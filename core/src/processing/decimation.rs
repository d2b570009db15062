use crate::math::stats::StatsHelper;
use crate::prelude::{Envelope, ProcessingStage, StageConfig, StageResult};
use crate::telemetry::log::LogManager;

/// Median filtering followed by a fixed-phase strided pick.
pub struct DecimationStage {
    factor: usize,
    window: usize,
    phase: usize,
    logger: LogManager,
}

impl DecimationStage {
    pub fn new(config: &StageConfig) -> Self {
        Self {
            factor: config.decimation_factor.max(1),
            window: config.median_window.max(1),
            phase: config.decimation_phase,
            logger: LogManager::for_stage("decimation"),
        }
    }

    /// Centered sliding median; positions outside the buffer repeat the edge value.
    pub fn median_filter(samples: &[f32], window: usize) -> Vec<f32> {
        if samples.is_empty() {
            return Vec::new();
        }
        let half = window / 2;
        let last = samples.len() - 1;
        let mut scratch = vec![0.0_f32; window];
        (0..samples.len())
            .map(|center| {
                for (slot, value) in scratch.iter_mut().enumerate() {
                    let index = (center + slot).saturating_sub(half).min(last);
                    *value = samples[index];
                }
                StatsHelper::median(&mut scratch)
            })
            .collect()
    }
}

impl ProcessingStage for DecimationStage {
    type Input = Envelope;
    type Output = Envelope;

    fn name(&self) -> &'static str {
        "decimation"
    }

    fn execute(&self, input: Envelope) -> StageResult<Envelope> {
        let usable = (input.len() / self.factor) * self.factor;
        let filtered = Self::median_filter(&input.samples[..usable], self.window);
        let samples: Vec<f32> = filtered
            .into_iter()
            .skip(self.phase)
            .step_by(self.factor)
            .collect();

        let sample_rate = u32::try_from(self.factor)
            .map(|factor| input.sample_rate / factor)
            .unwrap_or(0);
        self.logger.detail(&format!(
            "kept {} of {} samples, rate now {} Hz",
            samples.len(),
            input.len(),
            sample_rate
        ));
        Ok(Envelope::new(sample_rate, samples))
    }
}
