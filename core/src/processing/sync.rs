use crate::prelude::{Envelope, ProcessingStage, StageConfig, StageResult, SyncPeak, SyncedEnvelope};
use crate::telemetry::log::LogManager;

const CENTER: f32 = 128.0;

/// Finds scan-line starts by sliding the sync template over the envelope.
pub struct LineSynchronizer {
    template: Vec<f32>,
    min_distance: usize,
    logger: LogManager,
}

impl LineSynchronizer {
    pub fn new(config: &StageConfig) -> Self {
        Self {
            template: config.sync_template.iter().map(|&v| v - CENTER).collect(),
            min_distance: config.min_peak_distance,
            logger: LogManager::for_stage("sync"),
        }
    }

    /// Zero-centered dot product of the template at every offset in
    /// `0..len - template_len`.
    pub fn correlate(&self, signal: &[f32]) -> Vec<f32> {
        let shifted: Vec<f32> = signal.iter().map(|&v| v - CENTER).collect();
        let offsets = shifted.len().saturating_sub(self.template.len());
        (0..offsets)
            .map(|i| {
                self.template
                    .iter()
                    .zip(&shifted[i..i + self.template.len()])
                    .map(|(t, s)| t * s)
                    .sum::<f32>()
            })
            .collect()
    }

    /// Greedy windowed maximum over correlation scores in offset order.
    ///
    /// An offset more than `min_distance` past the current peak opens a new
    /// peak; otherwise a strictly higher score moves the current peak forward.
    pub fn select_peaks(&self, scores: &[f32]) -> Vec<SyncPeak> {
        scores
            .iter()
            .enumerate()
            .fold(vec![SyncPeak::new(0, 0.0)], |mut peaks, (offset, &score)| {
                let last = peaks.len() - 1;
                if offset - peaks[last].offset > self.min_distance {
                    peaks.push(SyncPeak::new(offset, score));
                } else if score > peaks[last].score {
                    peaks[last] = SyncPeak::new(offset, score);
                }
                peaks
            })
    }
}

impl ProcessingStage for LineSynchronizer {
    type Input = Envelope;
    type Output = SyncedEnvelope;

    fn name(&self) -> &'static str {
        "sync"
    }

    fn execute(&self, input: Envelope) -> StageResult<SyncedEnvelope> {
        let scores = self.correlate(&input.samples);
        let peaks = self.select_peaks(&scores);
        self.logger.record(&format!(
            "found {} sync candidates over {} offsets",
            peaks.len(),
            scores.len()
        ));
        Ok(SyncedEnvelope {
            envelope: input,
            peaks,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prelude::sync_a_template;

    fn synchronizer(min_distance: usize) -> LineSynchronizer {
        LineSynchronizer::new(&StageConfig {
            min_peak_distance: min_distance,
            ..Default::default()
        })
    }

    fn envelope_with_syncs(len: usize, starts: &[usize]) -> Vec<f32> {
        let template = sync_a_template();
        let mut signal = vec![CENTER; len];
        for &start in starts {
            signal[start..start + template.len()].copy_from_slice(&template);
        }
        signal
    }

    #[test]
    fn correlation_peaks_at_embedded_template() {
        let signal = envelope_with_syncs(200, &[50]);
        let scores = synchronizer(2000).correlate(&signal);
        assert_eq!(scores.len(), 200 - 35);
        let best = scores
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i);
        assert_eq!(best, Some(50));
    }

    #[test]
    fn short_signal_keeps_only_seed_peak() {
        let sync = synchronizer(2000);
        let peaks = sync.select_peaks(&sync.correlate(&[0.0; 20]));
        assert_eq!(peaks, vec![SyncPeak::new(0, 0.0)]);
    }

    #[test]
    fn window_refines_to_strictly_higher_score() {
        let sync = synchronizer(3);
        let peaks = sync.select_peaks(&[1.0, 5.0, 5.0, 2.0, 0.5, 7.0, 9.0]);
        // Offset 5 is the first one more than 3 past the peak at 1.
        assert_eq!(
            peaks,
            vec![SyncPeak::new(1, 5.0), SyncPeak::new(6, 9.0)]
        );
    }

    #[test]
    fn negative_scores_never_displace_seed() {
        let sync = synchronizer(2);
        let peaks = sync.select_peaks(&[-1.0, -2.0, -3.0, -4.0]);
        assert_eq!(peaks, vec![SyncPeak::new(0, 0.0), SyncPeak::new(3, -4.0)]);
    }

    #[test]
    fn peaks_are_spaced_beyond_minimum_distance() {
        let starts: Vec<usize> = (0..8).map(|line| 37 + line * 2080).collect();
        let signal = envelope_with_syncs(8 * 2080 + 100, &starts);
        let synced = synchronizer(2000)
            .execute(Envelope::new(4_160, signal))
            .unwrap();
        for pair in synced.peaks.windows(2) {
            assert!(pair[1].offset - pair[0].offset > 2000);
        }
        let offsets: Vec<usize> = synced.peaks.iter().map(|p| p.offset).collect();
        assert_eq!(&offsets[..8], starts.as_slice());
    }
}
