use crate::prelude::{StageError, StageResult};
use crate::telemetry::log::LogManager;
use image::{DynamicImage, GrayImage, ImageFormat, RgbImage};
use ndarray::ArrayViewD;
use std::io::Cursor;
use std::path::{Path, PathBuf};

/// Output file name for a recording: its base name with a `.png` extension.
pub fn image_file_name(recording: &Path) -> PathBuf {
    let stem = recording
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "recording".to_string());
    PathBuf::from(format!("{stem}.png"))
}

/// Turns greyscale `(rows, cols)` or RGB `(rows, cols, 3)` rasters into images.
pub struct ImageWriter {
    logger: LogManager,
}

impl ImageWriter {
    pub fn new() -> Self {
        Self {
            logger: LogManager::for_stage("writer"),
        }
    }

    pub fn encode(&self, raster: ArrayViewD<'_, f32>) -> StageResult<DynamicImage> {
        let shape = raster.shape().to_vec();
        match shape.as_slice() {
            [rows, cols] => {
                let (width, height) = image_dimensions(*cols, *rows)?;
                let pixels = raster.iter().map(|&v| to_u8(v)).collect();
                GrayImage::from_raw(width, height, pixels)
                    .map(DynamicImage::ImageLuma8)
                    .ok_or_else(|| StageError::ImageEncoding("greyscale buffer size mismatch".into()))
            }
            [rows, cols, 3] => {
                let (width, height) = image_dimensions(*cols, *rows)?;
                let pixels = raster.iter().map(|&v| to_u8(v)).collect();
                RgbImage::from_raw(width, height, pixels)
                    .map(DynamicImage::ImageRgb8)
                    .ok_or_else(|| StageError::ImageEncoding("rgb buffer size mismatch".into()))
            }
            _ => Err(StageError::UnsupportedRasterShape(shape)),
        }
    }

    pub fn encode_png(&self, raster: ArrayViewD<'_, f32>) -> StageResult<Vec<u8>> {
        let image = self.encode(raster)?;
        let mut output = Vec::new();
        image.write_to(&mut Cursor::new(&mut output), ImageFormat::Png)?;
        Ok(output)
    }

    pub fn save(&self, raster: ArrayViewD<'_, f32>, path: &Path) -> StageResult<()> {
        let image = self.encode(raster)?;
        self.logger
            .record(&format!("writing image to {}", path.display()));
        image.save_with_format(path, ImageFormat::Png)?;
        Ok(())
    }
}

impl Default for ImageWriter {
    fn default() -> Self {
        Self::new()
    }
}

fn image_dimensions(cols: usize, rows: usize) -> StageResult<(u32, u32)> {
    if rows == 0 || cols == 0 {
        return Err(StageError::InsufficientFrames);
    }
    let width = u32::try_from(cols)
        .map_err(|_| StageError::ImageEncoding(format!("width {cols} too large")))?;
    let height = u32::try_from(rows)
        .map_err(|_| StageError::ImageEncoding(format!("height {rows} too large")))?;
    Ok((width, height))
}

/// Clamp then truncate.
fn to_u8(value: f32) -> u8 {
    if value.is_nan() {
        0
    } else {
        value.clamp(0.0, 255.0) as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array, Array2, Array3, IxDyn};

    #[test]
    fn greyscale_raster_becomes_luma_image() {
        let raster = Array2::from_shape_vec((2, 3), vec![0.0, 127.9, 255.0, 300.0, -4.0, 12.5])
            .unwrap();
        let image = ImageWriter::new().encode(raster.view().into_dyn()).unwrap();
        let luma = image.as_luma8().unwrap();
        assert_eq!(luma.dimensions(), (3, 2));
        assert_eq!(luma.as_raw(), &vec![0, 127, 255, 255, 0, 12]);
    }

    #[test]
    fn rgb_raster_becomes_rgb_image() {
        let mut raster = Array3::<f32>::zeros((1, 2, 3));
        raster[[0, 1, 0]] = 10.0;
        raster[[0, 1, 2]] = 200.0;
        let image = ImageWriter::new().encode(raster.view().into_dyn()).unwrap();
        let rgb = image.as_rgb8().unwrap();
        assert_eq!(rgb.get_pixel(1, 0).0, [10, 0, 200]);
        assert_eq!(rgb.get_pixel(0, 0).0, [0, 0, 0]);
    }

    #[test]
    fn one_dimensional_raster_is_rejected() {
        let raster = Array::<f32, _>::zeros(IxDyn(&[16]));
        let result = ImageWriter::new().encode(raster.view());
        assert!(matches!(
            result,
            Err(StageError::UnsupportedRasterShape(shape)) if shape == vec![16]
        ));
    }

    #[test]
    fn four_channel_raster_is_rejected() {
        let raster = Array3::<f32>::zeros((2, 2, 4));
        let result = ImageWriter::new().encode(raster.view().into_dyn());
        assert!(matches!(result, Err(StageError::UnsupportedRasterShape(_))));
    }

    #[test]
    fn zero_height_raster_cannot_be_encoded() {
        let raster = Array2::<f32>::zeros((0, 2080));
        let result = ImageWriter::new().encode(raster.view().into_dyn());
        assert!(matches!(result, Err(StageError::InsufficientFrames)));
    }

    #[test]
    fn png_bytes_carry_signature() {
        let raster = Array2::<f32>::from_elem((4, 4), 64.0);
        let bytes = ImageWriter::new()
            .encode_png(raster.view().into_dyn())
            .unwrap();
        assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");
    }

    #[test]
    fn output_name_uses_base_name() {
        assert_eq!(
            image_file_name(Path::new("recordings/noaa19_pass.wav")),
            PathBuf::from("noaa19_pass.png")
        );
    }
}
