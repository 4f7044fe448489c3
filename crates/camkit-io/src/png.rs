use camkit_image::{Image, ImageSize};

use crate::error::IoError;

/// Encode a grayscale image as PNG bytes.
pub fn encode_image_png_gray8(image: &Image<u8, 1>) -> Result<Vec<u8>, IoError> {
    encode_png_impl(image, png::ColorType::Grayscale)
}

/// Encode an RGB8 image as PNG bytes.
pub fn encode_image_png_rgb8(image: &Image<u8, 3>) -> Result<Vec<u8>, IoError> {
    encode_png_impl(image, png::ColorType::Rgb)
}

fn encode_png_impl<const C: usize>(
    image: &Image<u8, C>,
    color_type: png::ColorType,
) -> Result<Vec<u8>, IoError> {
    let mut buf = Vec::new();
    {
        let mut encoder = png::Encoder::new(
            &mut buf,
            image.width() as u32,
            image.height() as u32,
        );
        encoder.set_color(color_type);
        encoder.set_depth(png::BitDepth::Eight);

        let mut writer = encoder
            .write_header()
            .map_err(|e| IoError::PngEncodingError(e.to_string()))?;
        writer
            .write_image_data(image.as_slice())
            .map_err(|e| IoError::PngEncodingError(e.to_string()))?;
    }
    Ok(buf)
}

/// Decode PNG bytes into a grayscale image.
pub fn decode_image_png_gray8(src: &[u8]) -> Result<Image<u8, 1>, IoError> {
    decode_png_impl(src)
}

/// Decode PNG bytes into an RGB8 image.
pub fn decode_image_png_rgb8(src: &[u8]) -> Result<Image<u8, 3>, IoError> {
    decode_png_impl(src)
}

fn decode_png_impl<const C: usize>(src: &[u8]) -> Result<Image<u8, C>, IoError> {
    let decoder = png::Decoder::new(src);
    let mut reader = decoder
        .read_info()
        .map_err(|e| IoError::PngDecodeError(e.to_string()))?;

    let mut buf = vec![0u8; reader.output_buffer_size()];
    let info = reader
        .next_frame(&mut buf)
        .map_err(|e| IoError::PngDecodeError(e.to_string()))?;

    let size = ImageSize {
        width: info.width as usize,
        height: info.height as usize,
    };
    buf.truncate(info.buffer_size());

    Ok(Image::new(size, buf)?)
}
