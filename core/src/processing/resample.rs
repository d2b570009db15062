use crate::math::fft::FftHelper;
use crate::prelude::{ProcessingStage, StageConfig, StageResult, Waveform};
use crate::telemetry::log::LogManager;

/// Fourier-method sample-rate conversion to the protocol rate.
pub struct ResampleStage {
    target_rate_hz: u32,
    logger: LogManager,
}

impl ResampleStage {
    pub fn new(config: &StageConfig) -> Self {
        Self {
            target_rate_hz: config.target_rate_hz,
            logger: LogManager::for_stage("resample"),
        }
    }

    /// `round(len * target / rate)` in integer arithmetic.
    pub fn output_len(len: usize, rate: u32, target: u32) -> usize {
        let rate = u128::from(rate.max(1));
        let scaled = len as u128 * u128::from(target);
        ((scaled + rate / 2) / rate) as usize
    }
}

impl ProcessingStage for ResampleStage {
    type Input = Waveform;
    type Output = Waveform;

    fn name(&self) -> &'static str {
        "resample"
    }

    fn execute(&self, input: Waveform) -> StageResult<Waveform> {
        if input.sample_rate == self.target_rate_hz {
            self.logger.detail(&format!(
                "recording already at {} Hz, no resampling needed",
                input.sample_rate
            ));
            return Ok(input);
        }

        let n_in = input.len();
        let n_out = Self::output_len(n_in, input.sample_rate, self.target_rate_hz);
        self.logger.record(&format!(
            "resampling {} samples from {} Hz to {} Hz ({} samples)",
            n_in, input.sample_rate, self.target_rate_hz, n_out
        ));
        if n_in == 0 || n_out == 0 {
            return Ok(Waveform::new(self.target_rate_hz, Vec::new()));
        }

        let mut fft = FftHelper::new();
        let spectrum = fft.forward(&input.samples);
        let mut resized = FftHelper::zeros(n_out);

        let n = n_in.min(n_out);
        let nyquist = n / 2 + 1;
        resized[..nyquist].copy_from_slice(&spectrum[..nyquist]);
        let tail = n - nyquist;
        if tail > 0 {
            resized[n_out - tail..].copy_from_slice(&spectrum[n_in - tail..]);
        }

        // Even-length spectra share the Nyquist bin between both halves.
        if n % 2 == 0 {
            let half = n / 2;
            if n_out < n_in {
                resized[half] += spectrum[n_in - half];
            } else if n_out > n_in {
                resized[half] *= 0.5;
                resized[n_out - half] = resized[half];
            }
        }

        let gain = n_out as f32 / n_in as f32;
        let samples = fft
            .inverse(resized)
            .into_iter()
            .map(|value| value.re * gain)
            .collect();

        Ok(Waveform::new(self.target_rate_hz, samples))
    }
}
