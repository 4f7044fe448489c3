use crate::parallel;
use camkit_image::{Image, ImageError};

/// Apply a binary threshold to a grayscale image.
///
/// Pixels strictly greater than `thresh` become `max_val`, all others zero.
pub fn threshold_binary(
    src: &Image<u8, 1>,
    dst: &mut Image<u8, 1>,
    thresh: u8,
    max_val: u8,
) -> Result<(), ImageError> {
    if src.size() != dst.size() {
        return Err(ImageError::InvalidImageSize(
            dst.cols(),
            dst.rows(),
            src.cols(),
            src.rows(),
        ));
    }

    parallel::par_iter_rows(src, dst, |src_pixel, dst_pixel| {
        dst_pixel[0] = if src_pixel[0] > thresh { max_val } else { 0 };
    });

    Ok(())
}

/// Apply an inverted binary threshold to a grayscale image.
///
/// Pixels less than or equal to `thresh` become `max_val`, all others zero.
/// Dark blobs on a light background (e.g. printed circle grids) become
/// foreground.
pub fn threshold_binary_inverse(
    src: &Image<u8, 1>,
    dst: &mut Image<u8, 1>,
    thresh: u8,
    max_val: u8,
) -> Result<(), ImageError> {
    if src.size() != dst.size() {
        return Err(ImageError::InvalidImageSize(
            dst.cols(),
            dst.rows(),
            src.cols(),
            src.rows(),
        ));
    }

    parallel::par_iter_rows(src, dst, |src_pixel, dst_pixel| {
        dst_pixel[0] = if src_pixel[0] <= thresh { max_val } else { 0 };
    });

    Ok(())
}

/// Compute the mean intensity of a grayscale image.
///
/// Useful to derive a threshold for roughly bimodal calibration images.
pub fn mean_intensity(src: &Image<u8, 1>) -> f64 {
    if src.as_slice().is_empty() {
        return 0.0;
    }
    let sum: u64 = src.as_slice().iter().map(|&v| v as u64).sum();
    sum as f64 / src.as_slice().len() as f64
}
