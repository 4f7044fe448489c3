use jpeg_encoder::{ColorType, Encoder};

use camkit_image::{Image, ImageSize};

use crate::error::IoError;

/// Encode an RGB8 image as JPEG bytes.
///
/// # Arguments
///
/// * `image` - The image to encode.
/// * `quality` - JPEG quality from 0 (lowest) to 100 (highest).
pub fn encode_image_jpeg_rgb8(image: &Image<u8, 3>, quality: u8) -> Result<Vec<u8>, IoError> {
    encode_jpeg_impl(image, ColorType::Rgb, quality)
}

/// Encode a grayscale image as JPEG bytes.
pub fn encode_image_jpeg_gray8(image: &Image<u8, 1>, quality: u8) -> Result<Vec<u8>, IoError> {
    encode_jpeg_impl(image, ColorType::Luma, quality)
}

fn encode_jpeg_impl<const C: usize>(
    image: &Image<u8, C>,
    color_type: ColorType,
    quality: u8,
) -> Result<Vec<u8>, IoError> {
    let mut buf = Vec::new();
    let encoder = Encoder::new(&mut buf, quality);
    encoder.encode(
        image.as_slice(),
        image.width() as u16,
        image.height() as u16,
        color_type,
    )?;
    Ok(buf)
}

/// Decode JPEG bytes into an RGB8 image.
pub fn decode_image_jpeg_rgb8(src: &[u8]) -> Result<Image<u8, 3>, IoError> {
    decode_jpeg_impl(src)
}

/// Decode JPEG bytes into a grayscale image.
pub fn decode_image_jpeg_gray8(src: &[u8]) -> Result<Image<u8, 1>, IoError> {
    decode_jpeg_impl(src)
}

fn decode_jpeg_impl<const C: usize>(src: &[u8]) -> Result<Image<u8, C>, IoError> {
    let mut decoder = zune_jpeg::JpegDecoder::new(src);
    decoder.decode_headers()?;

    let image_info = decoder.info().ok_or_else(|| {
        IoError::JpegDecodingError(zune_jpeg::errors::DecodeErrors::Format(String::from(
            "Failed to find image info from its metadata",
        )))
    })?;

    let image_size = ImageSize {
        width: image_info.width as usize,
        height: image_info.height as usize,
    };

    let img_data = decoder.decode()?;

    Ok(Image::new(image_size, img_data)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jpeg_roundtrip_preserves_shape() -> Result<(), IoError> {
        let size = ImageSize {
            width: 32,
            height: 24,
        };
        let data = (0..32 * 24 * 3).map(|i| (i % 251) as u8).collect();
        let img = Image::<u8, 3>::new(size, data)?;

        let bytes = encode_image_jpeg_rgb8(&img, 90)?;
        let back = decode_image_jpeg_rgb8(&bytes)?;

        assert_eq!(back.size(), size);
        assert_eq!(back.num_channels(), 3);
        Ok(())
    }

    #[test]
    fn gray_jpeg_roundtrip_preserves_shape() -> Result<(), IoError> {
        let size = ImageSize {
            width: 16,
            height: 16,
        };
        let img = Image::<u8, 1>::from_size_val(size, 128)?;
        let bytes = encode_image_jpeg_gray8(&img, 95)?;
        let back = decode_image_jpeg_gray8(&bytes)?;
        assert_eq!(back.size(), size);
        Ok(())
    }

    #[test]
    fn garbage_bytes_fail_to_decode() {
        assert!(decode_image_jpeg_rgb8(&[0u8; 32]).is_err());
    }
}
