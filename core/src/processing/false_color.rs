use crate::prelude::{ProcessingStage, Raster, RgbRaster, StageConfig, StageError, StageResult};
use crate::processing::normalize::IntensityNormalizer;
use crate::telemetry::log::LogManager;
use ndarray::{s, ArrayView2, ArrayViewMut2, Axis, Zip};

/// The two side-by-side image channels of a raster.
pub struct ChannelPair<'a> {
    pub a: ArrayView2<'a, f32>,
    pub b: ArrayView2<'a, f32>,
}

impl<'a> ChannelPair<'a> {
    /// Channel A is `[0, split)`, channel B is `[split, 2 * split)`.
    pub fn split(raster: ArrayView2<'a, f32>, split: usize) -> StageResult<Self> {
        if split == 0 || raster.ncols() < 2 * split {
            return Err(StageError::InvalidInput(format!(
                "raster width {} cannot hold two channels of {}",
                raster.ncols(),
                split
            )));
        }
        let (a, b) = raster
            .slice_move(s![.., ..2 * split])
            .split_at(Axis(1), split);
        Ok(Self { a, b })
    }
}

/// Heuristic RGB visualization mixing both channels. Approximate, not calibrated.
pub struct FalseColorComposer {
    split: usize,
    normalizer: IntensityNormalizer,
    logger: LogManager,
}

impl FalseColorComposer {
    pub fn new(config: &StageConfig) -> Self {
        Self {
            split: config.channel_split,
            normalizer: IntensityNormalizer::new(),
            logger: LogManager::for_stage("false-color"),
        }
    }

    pub fn compose(&self, raster: ArrayView2<'_, f32>) -> StageResult<RgbRaster> {
        if raster.nrows() == 0 {
            return Err(StageError::InsufficientFrames);
        }
        let pair = ChannelPair::split(raster, self.split)?;
        let composite = Self::mix(&pair);

        let mut composite = self.normalizer.normalize(composite.view())?;
        for channel in 0..3 {
            autocontrast(composite.index_axis_mut(Axis(2), channel));
        }

        self.logger.record(&format!(
            "composed {}x{} false-color image",
            self.split,
            composite.len_of(Axis(0))
        ));
        Ok(composite)
    }
}

impl FalseColorComposer {
    /// Red `1.5 A`, green `0.7 A + 0.3 B`, blue `0.5 B`, before any stretch.
    pub fn mix(pair: &ChannelPair<'_>) -> RgbRaster {
        let mut composite = RgbRaster::zeros((pair.a.nrows(), pair.a.ncols(), 3));
        Zip::from(composite.lanes_mut(Axis(2)))
            .and(&pair.a)
            .and(&pair.b)
            .for_each(|mut pixel, &a, &b| {
                pixel[0] = a * 1.5;
                pixel[1] = a * 0.7 + b * 0.3;
                pixel[2] = b * 0.5;
            });
        composite
    }
}

impl ProcessingStage for FalseColorComposer {
    type Input = Raster;
    type Output = RgbRaster;

    fn name(&self) -> &'static str {
        "false-color"
    }

    fn execute(&self, input: Raster) -> StageResult<RgbRaster> {
        self.compose(input.view())
    }
}

fn pixel_level(value: f32) -> u8 {
    value.clamp(0.0, 255.0) as u8
}

/// Per-channel histogram stretch of 8-bit levels onto the full `[0, 255]` range.
fn autocontrast(mut channel: ArrayViewMut2<'_, f32>) {
    let range = channel.iter().map(|&v| pixel_level(v)).fold(None, |acc, level| match acc {
        None => Some((level, level)),
        Some((lo, hi)) => Some((lo.min(level), hi.max(level))),
    });
    let Some((lo, hi)) = range else {
        return;
    };
    if hi <= lo {
        channel.mapv_inplace(|v| f32::from(pixel_level(v)));
        return;
    }
    let span = f64::from(hi - lo);
    channel.mapv_inplace(|v| {
        let stretched = f64::from(pixel_level(v) - lo) * 255.0 / span;
        stretched.clamp(0.0, 255.0).trunc() as f32
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::Array2;

    fn composer() -> FalseColorComposer {
        FalseColorComposer::new(&StageConfig::default())
    }

    fn two_channel_raster(rows: usize, a: f32, b: f32) -> Raster {
        let mut raster = Array2::<f32>::zeros((rows, 2080));
        raster.slice_mut(s![.., ..1040]).fill(a);
        raster.slice_mut(s![.., 1040..]).fill(b);
        raster
    }

    #[test]
    fn split_divides_at_channel_boundary() {
        let raster = two_channel_raster(3, 10.0, 20.0);
        let pair = ChannelPair::split(raster.view(), 1040).unwrap();
        assert_eq!(pair.a.dim(), (3, 1040));
        assert_eq!(pair.b.dim(), (3, 1040));
        assert!(pair.a.iter().all(|&v| v == 10.0));
        assert!(pair.b.iter().all(|&v| v == 20.0));
    }

    #[test]
    fn mix_applies_channel_weights() {
        let mut raster = two_channel_raster(2, 0.0, 0.0);
        raster[[0, 5]] = 100.0;
        raster[[1, 1040 + 5]] = 200.0;
        raster[[0, 7]] = 40.0;
        raster[[0, 1040 + 7]] = 60.0;
        let pair = ChannelPair::split(raster.view(), 1040).unwrap();
        let mixed = FalseColorComposer::mix(&pair);

        assert_eq!(mixed.dim(), (2, 1040, 3));
        // Only channel A lit: red and green respond, blue stays dark.
        assert_abs_diff_eq!(mixed[[0, 5, 0]], 150.0, epsilon = 1e-4);
        assert_abs_diff_eq!(mixed[[0, 5, 1]], 70.0, epsilon = 1e-4);
        assert_eq!(mixed[[0, 5, 2]], 0.0);
        // Only channel B lit: green and blue respond, red stays dark.
        assert_eq!(mixed[[1, 5, 0]], 0.0);
        assert_abs_diff_eq!(mixed[[1, 5, 1]], 60.0, epsilon = 1e-4);
        assert_abs_diff_eq!(mixed[[1, 5, 2]], 100.0, epsilon = 1e-4);
        // Both lit.
        assert_abs_diff_eq!(mixed[[0, 7, 0]], 60.0, epsilon = 1e-4);
        assert_abs_diff_eq!(mixed[[0, 7, 1]], 46.0, epsilon = 1e-4);
        assert_abs_diff_eq!(mixed[[0, 7, 2]], 30.0, epsilon = 1e-4);
    }

    #[test]
    fn narrow_raster_is_rejected() {
        let raster = Array2::<f32>::zeros((2, 2000));
        assert!(composer().compose(raster.view()).is_err());
    }

    #[test]
    fn composite_has_half_width_and_three_planes() {
        let mut raster = two_channel_raster(4, 100.0, 200.0);
        raster[[0, 0]] = 0.0;
        raster[[3, 1500]] = 0.0;
        let composite = composer().execute(raster).unwrap();
        assert_eq!(composite.dim(), (4, 1040, 3));
        assert!(composite.iter().all(|&v| (0.0..=255.0).contains(&v)));
    }

    #[test]
    fn each_plane_is_stretched_to_full_range() {
        let mut raster = Array2::<f32>::zeros((2, 2080));
        for col in 0..2080 {
            raster[[0, col]] = (col % 200) as f32 + 20.0;
            raster[[1, col]] = ((col * 7) % 150) as f32 + 40.0;
        }
        let composite = composer().compose(raster.view()).unwrap();
        for channel in 0..3 {
            let plane = composite.index_axis(Axis(2), channel);
            let lo = plane.iter().cloned().fold(f32::MAX, f32::min);
            let hi = plane.iter().cloned().fold(f32::MIN, f32::max);
            assert_eq!((lo, hi), (0.0, 255.0), "channel {channel}");
        }
    }

    #[test]
    fn flat_plane_is_left_at_its_level() {
        let mut values = Array2::<f32>::from_elem((1, 3), 42.7);
        autocontrast(values.view_mut());
        assert!(values.iter().all(|&v| v == 42.0));
    }

    #[test]
    fn empty_raster_has_no_composite() {
        let raster = Array2::<f32>::zeros((0, 2080));
        assert!(matches!(
            composer().compose(raster.view()),
            Err(StageError::InsufficientFrames)
        ));
    }
}
