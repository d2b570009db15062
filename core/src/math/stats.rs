pub struct StatsHelper;

impl StatsHelper {
    pub fn rms(samples: &[f32]) -> f32 {
        if samples.is_empty() {
            return 0.0;
        }
        let sum_sq: f32 = samples.iter().map(|&v| v * v).sum();
        (sum_sq / samples.len() as f32).sqrt()
    }

    /// Minimum and maximum over all values, `None` for an empty iterator.
    pub fn min_max<'a, I>(values: I) -> Option<(f32, f32)>
    where
        I: IntoIterator<Item = &'a f32>,
    {
        values.into_iter().fold(None, |acc, &v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
    }

    /// Median of an odd-length window. Reorders `window` in place.
    pub fn median(window: &mut [f32]) -> f32 {
        let mid = window.len() / 2;
        let (_, median, _) = window.select_nth_unstable_by(mid, |a, b| a.total_cmp(b));
        *median
    }
}
