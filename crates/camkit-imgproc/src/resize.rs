use crate::interpolation::{interpolate_pixel, InterpolationMode};
use camkit_image::{Image, ImageError};

/// Resize an image to the size of the destination image.
///
/// The scale is derived from the source and destination sizes; the
/// destination is written in place.
pub fn resize<const C: usize>(
    src: &Image<f32, C>,
    dst: &mut Image<f32, C>,
    interpolation: InterpolationMode,
) -> Result<(), ImageError> {
    if dst.cols() == 0 || dst.rows() == 0 {
        return Err(ImageError::InvalidImageSize(
            dst.cols(),
            dst.rows(),
            src.cols(),
            src.rows(),
        ));
    }

    let scale_x = src.cols() as f32 / dst.cols() as f32;
    let scale_y = src.rows() as f32 / dst.rows() as f32;

    let cols = dst.cols();
    for y in 0..dst.rows() {
        for x in 0..cols {
            let u = (x as f32 + 0.5) * scale_x - 0.5;
            let v = (y as f32 + 0.5) * scale_y - 0.5;
            let pixel = interpolate_pixel(src, u, v, interpolation);
            let base = (y * cols + x) * C;
            dst.as_slice_mut()[base..base + C].copy_from_slice(&pixel);
        }
    }

    Ok(())
}

/// Resize a u8 image, converting through f32.
pub fn resize_u8<const C: usize>(
    src: &Image<u8, C>,
    dst_size: camkit_image::ImageSize,
    interpolation: InterpolationMode,
) -> Result<Image<u8, C>, ImageError> {
    let src_f = src.cast::<f32>()?;
    let mut dst_f = Image::<f32, C>::from_size_val(dst_size, 0.0)?;
    resize(&src_f, &mut dst_f, interpolation)?;

    let data = dst_f
        .as_slice()
        .iter()
        .map(|&v| v.round().clamp(0.0, 255.0) as u8)
        .collect();
    Image::new(dst_size, data)
}
