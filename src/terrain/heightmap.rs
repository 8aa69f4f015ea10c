//! Height sample grids and the sources that produce them.
//!
//! - [`HeightGrid`] - Row-major grid of elevation samples
//! - [`HeightSampleSource`] - Anything that can fill a grid
//! - [`ImageHeightSource`] - Pixel intensity of a decoded heightmap image
//! - [`NoiseHeightSource`] - Fractal noise from [`NoiseField`]
//! - [`DecodedImage`] - Raw 8-bit pixels at the image decode boundary

use std::fmt;
use std::path::Path;

use glam::Vec2;

use super::noise::NoiseField;
use crate::error::{TerrainError, TerrainResult};

/// Grid size used by the procedural source when none is given
pub const DEFAULT_GRID_SIZE: u32 = 127;

/// A fully populated, row-major grid of height samples
#[derive(Debug, Clone, PartialEq)]
pub struct HeightGrid {
    width: u32,
    height: u32,
    samples: Vec<f32>,
}

impl HeightGrid {
    /// Wrap existing samples. The sample count must equal `width * height`.
    pub fn new(width: u32, height: u32, samples: Vec<f32>) -> TerrainResult<Self> {
        let expected = checked_cell_count(width, height)?;
        if samples.len() != expected {
            return Err(TerrainError::degenerate(format!(
                "{}x{} grid needs {} samples, got {}",
                width,
                height,
                expected,
                samples.len()
            )));
        }
        Ok(Self {
            width,
            height,
            samples,
        })
    }

    /// Build a grid by evaluating `f(x, y)` for every cell in row-major order
    pub fn from_fn(
        width: u32,
        height: u32,
        mut f: impl FnMut(u32, u32) -> f32,
    ) -> TerrainResult<Self> {
        let mut samples = Vec::with_capacity(checked_cell_count(width, height)?);
        for y in 0..height {
            for x in 0..width {
                samples.push(f(x, y));
            }
        }
        Ok(Self {
            width,
            height,
            samples,
        })
    }

    /// Grid filled with a constant height
    pub fn flat(width: u32, height: u32, value: f32) -> TerrainResult<Self> {
        Self::from_fn(width, height, |_, _| value)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Sample at column `x`, row `y`, or `None` outside the grid
    pub fn get(&self, x: u32, y: u32) -> Option<f32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.samples
            .get(y as usize * self.width as usize + x as usize)
            .copied()
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Whether the grid has at least one quad (2x2 or larger)
    pub fn has_quads(&self) -> bool {
        self.width >= 2 && self.height >= 2
    }

    pub fn stats(&self) -> HeightStats {
        let min = self.samples.iter().copied().fold(f32::INFINITY, f32::min);
        let max = self.samples.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        let mean = self.samples.iter().sum::<f32>() / self.samples.len() as f32;
        HeightStats { min, max, mean }
    }
}

fn checked_cell_count(width: u32, height: u32) -> TerrainResult<usize> {
    if width == 0 || height == 0 {
        return Err(TerrainError::degenerate(format!(
            "height grid must not be empty ({}x{})",
            width, height
        )));
    }
    (width as usize)
        .checked_mul(height as usize)
        .ok_or_else(|| TerrainError::degenerate(format!("{}x{} grid is too large", width, height)))
}

/// Summary statistics of a height grid
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeightStats {
    pub min: f32,
    pub max: f32,
    pub mean: f32,
}

impl fmt::Display for HeightStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "min={:.2} max={:.2} mean={:.2}",
            self.min, self.max, self.mean
        )
    }
}

/// Producer of height sample grids
pub trait HeightSampleSource {
    /// Fill a `width x height` grid
    fn sample_grid(&self, width: u32, height: u32) -> TerrainResult<HeightGrid>;

    /// Size the source naturally produces, if it has one
    fn native_size(&self) -> Option<(u32, u32)> {
        None
    }

    /// Short description for logs and the overlay
    fn label(&self) -> &str;
}

// ---------------------------------------------------------------------------
// Image decode boundary
// ---------------------------------------------------------------------------

/// Decoded 8-bit image, row-major with interleaved channels
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    pub channels: u8,
    pub data: Vec<u8>,
}

impl DecodedImage {
    /// Read and decode an image file
    pub fn open(path: impl AsRef<Path>) -> TerrainResult<Self> {
        let path = path.as_ref();
        let image = image::open(path)
            .map_err(|e| TerrainError::decode(path.display().to_string(), e))?;
        Self::from_dynamic(image)
    }

    /// Decode an encoded image held in memory (format is guessed)
    pub fn from_bytes(bytes: &[u8]) -> TerrainResult<Self> {
        let image = image::load_from_memory(bytes)
            .map_err(|e| TerrainError::decode("<memory>", e))?;
        Self::from_dynamic(image)
    }

    /// Keep the channel count, converting wider sample types to 8 bits
    fn from_dynamic(image: image::DynamicImage) -> TerrainResult<Self> {
        use image::DynamicImage;

        let (width, height) = (image.width(), image.height());
        if width == 0 || height == 0 {
            return Err(TerrainError::UnsupportedImage(format!(
                "image has no pixels ({}x{})",
                width, height
            )));
        }

        let (channels, data) = match image {
            DynamicImage::ImageLuma8(buf) => (1, buf.into_raw()),
            DynamicImage::ImageLumaA8(buf) => (2, buf.into_raw()),
            DynamicImage::ImageRgb8(buf) => (3, buf.into_raw()),
            DynamicImage::ImageRgba8(buf) => (4, buf.into_raw()),
            DynamicImage::ImageLuma16(_) => (1, image.to_luma8().into_raw()),
            DynamicImage::ImageLumaA16(_) => (2, image.to_luma_alpha8().into_raw()),
            DynamicImage::ImageRgb16(_) | DynamicImage::ImageRgb32F(_) => {
                (3, image.to_rgb8().into_raw())
            }
            _ => (4, image.to_rgba8().into_raw()),
        };

        Ok(Self {
            width,
            height,
            channels,
            data,
        })
    }

    /// First byte of the pixel's channel group
    pub fn first_channel(&self, x: u32, y: u32) -> Option<u8> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = (x as usize + self.width as usize * y as usize) * self.channels as usize;
        self.data.get(offset).copied()
    }
}

// ---------------------------------------------------------------------------
// Image-backed source
// ---------------------------------------------------------------------------

/// Mapping from raw pixel intensity to world height
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeightMapping {
    /// World units per intensity step
    pub height_scale: f32,
    /// Offset added after scaling
    pub height_shift: f32,
}

impl Default for HeightMapping {
    fn default() -> Self {
        Self {
            height_scale: 64.0 / 256.0,
            height_shift: -16.0,
        }
    }
}

impl HeightMapping {
    pub fn new(height_scale: f32, height_shift: f32) -> Self {
        Self {
            height_scale,
            height_shift,
        }
    }

    /// Raw intensity without scaling
    pub fn identity() -> Self {
        Self::new(1.0, 0.0)
    }

    pub fn apply(&self, intensity: u8) -> f32 {
        intensity as f32 * self.height_scale + self.height_shift
    }
}

/// Heights read from the first channel of a decoded image
#[derive(Debug, Clone)]
pub struct ImageHeightSource {
    image: DecodedImage,
    mapping: HeightMapping,
    label: String,
}

impl ImageHeightSource {
    /// Decode an image file as a heightmap
    pub fn open(path: impl AsRef<Path>, mapping: HeightMapping) -> TerrainResult<Self> {
        let path = path.as_ref();
        let image = DecodedImage::open(path)?;
        log::info!(
            "Loaded heightmap {} of size {} x {} ({} channels)",
            path.display(),
            image.width,
            image.height,
            image.channels
        );
        let label = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self {
            image,
            mapping,
            label,
        })
    }

    /// Decode an in-memory encoded image as a heightmap
    pub fn from_bytes(bytes: &[u8], mapping: HeightMapping) -> TerrainResult<Self> {
        Ok(Self::from_decoded(DecodedImage::from_bytes(bytes)?, mapping))
    }

    pub fn from_decoded(image: DecodedImage, mapping: HeightMapping) -> Self {
        Self {
            image,
            mapping,
            label: String::from("image"),
        }
    }

    pub fn image(&self) -> &DecodedImage {
        &self.image
    }

}

impl HeightSampleSource for ImageHeightSource {
    fn sample_grid(&self, width: u32, height: u32) -> TerrainResult<HeightGrid> {
        let img_w = self.image.width as u64;
        let img_h = self.image.height as u64;
        let mut missing = 0usize;

        // Nearest pixel, never interpolated
        let grid = HeightGrid::from_fn(width, height, |x, y| {
            let px = (x as u64 * img_w / width as u64) as u32;
            let py = (y as u64 * img_h / height as u64) as u32;
            match self.image.first_channel(px, py) {
                Some(intensity) => self.mapping.apply(intensity),
                None => {
                    missing += 1;
                    self.mapping.height_shift
                }
            }
        })?;

        if missing > 0 {
            return Err(TerrainError::UnsupportedImage(format!(
                "pixel buffer is shorter than {}x{}x{} ({} samples missing)",
                self.image.width, self.image.height, self.image.channels, missing
            )));
        }
        Ok(grid)
    }

    fn native_size(&self) -> Option<(u32, u32)> {
        Some((self.image.width, self.image.height))
    }

    fn label(&self) -> &str {
        &self.label
    }
}

// ---------------------------------------------------------------------------
// Procedural source
// ---------------------------------------------------------------------------

/// Heights synthesized from fractal noise
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoiseHeightSource {
    noise: NoiseField,
    grid_size: u32,
    offset: Vec2,
}

impl Default for NoiseHeightSource {
    fn default() -> Self {
        Self::new(DEFAULT_GRID_SIZE)
    }
}

impl NoiseHeightSource {
    /// `grid_size` is both the native grid dimension and the coordinate divisor
    pub fn new(grid_size: u32) -> Self {
        Self {
            noise: NoiseField::default(),
            grid_size: grid_size.max(1),
            offset: Vec2::ZERO,
        }
    }

    pub fn with_noise(mut self, noise: NoiseField) -> Self {
        self.noise = noise;
        self
    }

    /// Shift the sampled region, in grid cells
    pub fn with_offset(mut self, offset: Vec2) -> Self {
        self.offset = offset;
        self
    }

    pub fn noise(&self) -> NoiseField {
        self.noise
    }

    pub fn grid_size(&self) -> u32 {
        self.grid_size
    }

    pub fn offset(&self) -> Vec2 {
        self.offset
    }

    /// Height at grid cell `(x, y)`
    pub fn height_at(&self, x: u32, y: u32) -> f32 {
        let inv = 1.0 / self.grid_size as f32;
        self.noise.fractal(
            (x as f32 + self.offset.x) * inv,
            (y as f32 + self.offset.y) * inv,
        )
    }
}

impl HeightSampleSource for NoiseHeightSource {
    fn sample_grid(&self, width: u32, height: u32) -> TerrainResult<HeightGrid> {
        HeightGrid::from_fn(width, height, |x, y| self.height_at(x, y))
    }

    fn native_size(&self) -> Option<(u32, u32)> {
        Some((self.grid_size, self.grid_size))
    }

    fn label(&self) -> &str {
        "fractal noise"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, ImageOutputFormat, RgbImage};
    use std::io::Cursor;

    fn encode_png(image: image::DynamicImage) -> Vec<u8> {
        let mut bytes = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut bytes), ImageOutputFormat::Png)
            .unwrap();
        bytes
    }

    #[test]
    fn test_grid_rejects_wrong_sample_count() {
        assert!(HeightGrid::new(3, 3, vec![0.0; 8]).is_err());
        assert!(HeightGrid::new(3, 3, vec![0.0; 9]).is_ok());
    }

    #[test]
    fn test_grid_rejects_zero_size() {
        let err = HeightGrid::from_fn(0, 4, |_, _| 0.0).unwrap_err();
        assert!(matches!(err, TerrainError::DegenerateGeometry(_)));
    }

    #[test]
    fn test_grid_is_row_major() {
        let grid = HeightGrid::from_fn(3, 2, |x, y| (x + 10 * y) as f32).unwrap();
        assert_eq!(grid.samples(), &[0.0, 1.0, 2.0, 10.0, 11.0, 12.0]);
        assert_eq!(grid.get(2, 1), Some(12.0));
        assert_eq!(grid.get(3, 0), None);
    }

    #[test]
    fn test_grid_stats() {
        let grid = HeightGrid::new(2, 2, vec![-1.0, 0.0, 1.0, 4.0]).unwrap();
        let stats = grid.stats();
        assert_eq!(stats.min, -1.0);
        assert_eq!(stats.max, 4.0);
        assert_eq!(stats.mean, 1.0);
    }

    #[test]
    fn test_image_source_exact_pixels() {
        let gray = GrayImage::from_raw(2, 2, vec![0, 128, 255, 64]).unwrap();
        let bytes = encode_png(image::DynamicImage::ImageLuma8(gray));

        let source = ImageHeightSource::from_bytes(&bytes, HeightMapping::identity()).unwrap();
        assert_eq!(source.native_size(), Some((2, 2)));
        assert_eq!(source.image().channels, 1);

        let grid = source.sample_grid(2, 2).unwrap();
        assert_eq!(grid.samples(), &[0.0, 128.0, 255.0, 64.0]);
    }

    #[test]
    fn test_image_source_uses_first_channel() {
        let rgb = RgbImage::from_raw(2, 1, vec![10, 200, 200, 20, 0, 0]).unwrap();
        let bytes = encode_png(image::DynamicImage::ImageRgb8(rgb));

        let source = ImageHeightSource::from_bytes(&bytes, HeightMapping::new(2.0, -5.0)).unwrap();
        assert_eq!(source.image().channels, 3);

        let grid = source.sample_grid(2, 1).unwrap();
        assert_eq!(grid.samples(), &[15.0, 35.0]);
    }

    #[test]
    fn test_image_source_nearest_pixel_when_resized() {
        let image = DecodedImage {
            width: 2,
            height: 1,
            channels: 1,
            data: vec![10, 90],
        };
        let source = ImageHeightSource::from_decoded(image, HeightMapping::identity());
        let grid = source.sample_grid(4, 1).unwrap();
        assert_eq!(grid.samples(), &[10.0, 10.0, 90.0, 90.0]);
    }

    #[test]
    fn test_image_source_short_buffer_is_error() {
        let image = DecodedImage {
            width: 2,
            height: 2,
            channels: 1,
            data: vec![1, 2, 3],
        };
        let source = ImageHeightSource::from_decoded(image, HeightMapping::identity());
        assert!(source.sample_grid(2, 2).is_err());
    }

    #[test]
    fn test_decode_error_on_garbage() {
        let err = ImageHeightSource::from_bytes(b"not an image", HeightMapping::default())
            .unwrap_err();
        assert!(err.is_decode_error());
        assert!(matches!(err, TerrainError::Decode { .. }));
    }

    #[test]
    fn test_decode_error_on_missing_file() {
        let err = ImageHeightSource::open(
            "/nonexistent/terrain/heightmap.png",
            HeightMapping::default(),
        )
        .unwrap_err();
        assert!(err.is_decode_error());
    }

    #[test]
    fn test_default_mapping() {
        let mapping = HeightMapping::default();
        assert_eq!(mapping.apply(0), -16.0);
        assert_eq!(mapping.apply(128), 16.0);
    }

    #[test]
    fn test_noise_source_deterministic_and_clamped() {
        let source = NoiseHeightSource::new(32);
        let a = source.sample_grid(33, 17).unwrap();
        let b = source.sample_grid(33, 17).unwrap();
        assert_eq!(a, b);
        assert!(a.samples().iter().all(|v| (-1.0..=1.0).contains(v)));
        // Cell (0, 0) sits on the lattice
        assert_eq!(a.get(0, 0), Some(0.0));
    }

    #[test]
    fn test_noise_source_offset_shifts_region() {
        let base = NoiseHeightSource::new(16);
        let shifted = base.with_offset(Vec2::new(5.0, 3.0));
        assert_eq!(shifted.height_at(0, 0), base.height_at(5, 3));
        assert_eq!(shifted.height_at(2, 1), base.height_at(7, 4));
    }

    #[test]
    fn test_noise_source_far_offset_stays_in_range() {
        for offset in [Vec2::new(1.0e9, 0.0), Vec2::new(-3.0e9, 2.5e9)] {
            let grid = NoiseHeightSource::new(127)
                .with_offset(offset)
                .sample_grid(8, 8)
                .unwrap();
            assert!(grid.samples().iter().all(|v| (-1.0..=1.0).contains(v)));
        }
    }

    #[test]
    fn test_noise_source_thin_grid() {
        let source = NoiseHeightSource::default();
        let grid = source.sample_grid(1, 9).unwrap();
        assert_eq!(grid.len(), 9);
        assert!(!grid.has_quads());
    }
}
