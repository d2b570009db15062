use crate::math::fft::FftHelper;
use crate::math::stats::StatsHelper;
use crate::prelude::{Envelope, ProcessingStage, StageResult, Waveform};
use crate::telemetry::log::LogManager;
use num_complex::Complex32;

/// Amplitude demodulation through the magnitude of the analytic signal.
pub struct EnvelopeStage {
    logger: LogManager,
}

impl EnvelopeStage {
    pub fn new() -> Self {
        Self {
            logger: LogManager::for_stage("envelope"),
        }
    }

    /// Analytic-signal magnitude of a real sequence.
    pub fn analytic_magnitude(samples: &[f32]) -> Vec<f32> {
        let len = samples.len();
        if len == 0 {
            return Vec::new();
        }

        let mut fft = FftHelper::new();
        let mut spectrum = fft.forward(samples);

        // DC (and Nyquist for even lengths) stay, positive bins double,
        // negative bins vanish.
        let positive_end = if len % 2 == 0 { len / 2 } else { (len + 1) / 2 };
        for bin in spectrum.iter_mut().take(positive_end).skip(1) {
            *bin *= 2.0;
        }
        let negative_start = if len % 2 == 0 { len / 2 + 1 } else { positive_end };
        for bin in spectrum.iter_mut().skip(negative_start) {
            *bin = Complex32::new(0.0, 0.0);
        }

        fft.inverse(spectrum)
            .into_iter()
            .map(|value| value.norm())
            .collect()
    }
}

impl Default for EnvelopeStage {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessingStage for EnvelopeStage {
    type Input = Waveform;
    type Output = Envelope;

    fn name(&self) -> &'static str {
        "envelope"
    }

    fn execute(&self, input: Waveform) -> StageResult<Envelope> {
        let samples = Self::analytic_magnitude(&input.samples);
        self.logger
            .detail(&format!("envelope RMS {:.4}", StatsHelper::rms(&samples)));
        Ok(Envelope::new(input.sample_rate, samples))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::f32::consts::PI;

    #[test]
    fn envelope_preserves_length_and_is_non_negative() {
        let samples: Vec<f32> = (0..1001).map(|i| ((i * 37) % 11) as f32 - 5.0).collect();
        let envelope = EnvelopeStage::new()
            .execute(Waveform::new(20_800, samples))
            .unwrap();
        assert_eq!(envelope.len(), 1001);
        assert!(envelope.samples.iter().all(|&v| v >= 0.0));
    }

    #[test]
    fn am_tone_recovers_modulation() {
        let rate = 20_800.0;
        let len = 20_800;
        let samples: Vec<f32> = (0..len)
            .map(|i| {
                let t = i as f32 / rate;
                let modulation = 1.0 + 0.5 * (2.0 * PI * 2.0 * t).cos();
                modulation * (2.0 * PI * 2_400.0 * t).sin()
            })
            .collect();
        let envelope = EnvelopeStage::analytic_magnitude(&samples);
        for i in (100..len - 100).step_by(97) {
            let t = i as f32 / rate;
            let expected = 1.0 + 0.5 * (2.0 * PI * 2.0 * t).cos();
            assert_abs_diff_eq!(envelope[i], expected, epsilon = 1e-2);
        }
    }

    #[test]
    fn constant_signal_keeps_its_level() {
        let envelope = EnvelopeStage::analytic_magnitude(&[2.0; 8]);
        for value in envelope {
            assert_abs_diff_eq!(value, 2.0, epsilon = 1e-5);
        }
    }
}
