use camkit_image::Image;

use crate::error::IoError;
use crate::{jpeg, png};

/// Image serialization format for [`Compressor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionFormat {
    /// Lossless PNG.
    Png,
    /// Lossy JPEG.
    Jpeg,
}

impl CompressionFormat {
    /// Parse a format from a file extension, with or without the leading
    /// dot. Anything else is rejected rather than silently defaulted.
    pub fn from_extension(fmt: &str) -> Result<Self, IoError> {
        match fmt.trim_start_matches('.') {
            "png" => Ok(CompressionFormat::Png),
            "jpg" | "jpeg" => Ok(CompressionFormat::Jpeg),
            other => Err(IoError::InvalidFormat(other.to_string())),
        }
    }
}

/// Serialize and compress images with either PNG or JPEG.
///
/// PNG round-trips pixel data exactly; JPEG preserves only the image shape.
#[derive(Debug, Clone, Copy)]
pub struct Compressor {
    format: CompressionFormat,
    jpeg_quality: u8,
}

impl Default for Compressor {
    fn default() -> Self {
        Self {
            format: CompressionFormat::Png,
            jpeg_quality: 90,
        }
    }
}

impl Compressor {
    /// Create a compressor for the given format.
    pub fn new(format: CompressionFormat) -> Self {
        Self {
            format,
            ..Default::default()
        }
    }

    /// The currently configured format.
    pub fn format(&self) -> CompressionFormat {
        self.format
    }

    /// Change the format by extension string (e.g. `".png"`, `"jpg"`).
    pub fn set_format(&mut self, fmt: &str) -> Result<(), IoError> {
        self.format = CompressionFormat::from_extension(fmt)?;
        Ok(())
    }

    /// Set the JPEG quality (0-100).
    pub fn with_jpeg_quality(mut self, quality: u8) -> Self {
        self.jpeg_quality = quality.min(100);
        self
    }

    /// Compress an RGB image to bytes.
    pub fn compress_rgb8(&self, image: &Image<u8, 3>) -> Result<Vec<u8>, IoError> {
        match self.format {
            CompressionFormat::Png => png::encode_image_png_rgb8(image),
            CompressionFormat::Jpeg => jpeg::encode_image_jpeg_rgb8(image, self.jpeg_quality),
        }
    }

    /// Compress a grayscale image to bytes.
    pub fn compress_gray8(&self, image: &Image<u8, 1>) -> Result<Vec<u8>, IoError> {
        match self.format {
            CompressionFormat::Png => png::encode_image_png_gray8(image),
            CompressionFormat::Jpeg => jpeg::encode_image_jpeg_gray8(image, self.jpeg_quality),
        }
    }

    /// Decompress bytes into an RGB image; the shape comes from the
    /// container header.
    pub fn decompress_rgb8(&self, bytes: &[u8]) -> Result<Image<u8, 3>, IoError> {
        match self.format {
            CompressionFormat::Png => png::decode_image_png_rgb8(bytes),
            CompressionFormat::Jpeg => jpeg::decode_image_jpeg_rgb8(bytes),
        }
    }

    /// Decompress bytes into a grayscale image.
    pub fn decompress_gray8(&self, bytes: &[u8]) -> Result<Image<u8, 1>, IoError> {
        match self.format {
            CompressionFormat::Png => png::decode_image_png_gray8(bytes),
            CompressionFormat::Jpeg => jpeg::decode_image_jpeg_gray8(bytes),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camkit_image::ImageSize;

    fn sample_rgb() -> Image<u8, 3> {
        let size = ImageSize {
            width: 24,
            height: 18,
        };
        let data = (0..24 * 18 * 3).map(|i| (i % 256) as u8).collect();
        Image::new(size, data).unwrap()
    }

    #[test]
    fn format_parsing_accepts_dots() {
        assert_eq!(
            CompressionFormat::from_extension(".png").unwrap(),
            CompressionFormat::Png
        );
        assert_eq!(
            CompressionFormat::from_extension("jpeg").unwrap(),
            CompressionFormat::Jpeg
        );
    }

    #[test]
    fn unknown_format_rejected() {
        assert!(matches!(
            CompressionFormat::from_extension(".bmp"),
            Err(IoError::InvalidFormat(_))
        ));
        let mut c = Compressor::default();
        assert!(c.set_format("gif").is_err());
        // the failed set leaves the old format in place
        assert_eq!(c.format(), CompressionFormat::Png);
    }

    #[test]
    fn png_compression_roundtrip_exact() -> Result<(), IoError> {
        let img = sample_rgb();
        let c = Compressor::new(CompressionFormat::Png);
        let bytes = c.compress_rgb8(&img)?;
        let back = c.decompress_rgb8(&bytes)?;
        assert_eq!(back.as_slice(), img.as_slice());
        Ok(())
    }

    #[test]
    fn jpeg_compression_roundtrip_shape_only() -> Result<(), IoError> {
        let img = sample_rgb();
        let c = Compressor::new(CompressionFormat::Jpeg).with_jpeg_quality(80);
        let bytes = c.compress_rgb8(&img)?;
        let back = c.decompress_rgb8(&bytes)?;
        assert_eq!(back.size(), img.size());
        assert_eq!(back.num_channels(), img.num_channels());
        Ok(())
    }
}
