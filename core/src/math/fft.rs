use num_complex::Complex32;
use rustfft::{num_traits::Zero, FftPlanner};

/// Helper that wraps the `rustfft` planner for reuse across transform sizes.
pub struct FftHelper {
    planner: FftPlanner<f32>,
}

impl FftHelper {
    pub fn new() -> Self {
        Self {
            planner: FftPlanner::new(),
        }
    }

    /// Forward transform of a real sequence.
    pub fn forward(&mut self, input: &[f32]) -> Vec<Complex32> {
        let mut buffer: Vec<Complex32> = input
            .iter()
            .map(|&value| Complex32::new(value, 0.0))
            .collect();
        if buffer.is_empty() {
            return buffer;
        }
        let fft = self.planner.plan_fft_forward(buffer.len());
        fft.process(&mut buffer);
        buffer
    }

    /// Inverse transform scaled by `1 / len`, so `inverse(forward(x)) == x`.
    pub fn inverse(&mut self, mut spectrum: Vec<Complex32>) -> Vec<Complex32> {
        if spectrum.is_empty() {
            return spectrum;
        }
        let len = spectrum.len();
        let fft = self.planner.plan_fft_inverse(len);
        fft.process(&mut spectrum);
        let scale = 1.0 / len as f32;
        for value in spectrum.iter_mut() {
            *value *= scale;
        }
        spectrum
    }

    pub fn zeros(len: usize) -> Vec<Complex32> {
        vec![Complex32::zero(); len]
    }
}

impl Default for FftHelper {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fft_helper_returns_same_length() {
        let mut helper = FftHelper::new();
        let output = helper.forward(&[1.0, 0.0, -1.0, 0.0]);
        assert_eq!(output.len(), 4);
    }

    #[test]
    fn inverse_undoes_forward() {
        let mut helper = FftHelper::new();
        let input = [0.5, -1.0, 2.0, 3.5, 0.0];
        let spectrum = helper.forward(&input);
        let restored = helper.inverse(spectrum);
        for (original, value) in input.iter().zip(restored.iter()) {
            assert!((original - value.re).abs() < 1e-5);
            assert!(value.im.abs() < 1e-5);
        }
    }

    #[test]
    fn empty_input_is_passed_through() {
        let mut helper = FftHelper::new();
        assert!(helper.forward(&[]).is_empty());
        assert!(helper.inverse(Vec::new()).is_empty());
    }
}
