use crate::parallel;
use camkit_image::{Image, ImageError};

/// Swap the red and blue channels, converting RGB to BGR.
///
/// The swap is its own inverse, so applying it twice reproduces the input
/// exactly.
pub fn bgr_from_rgb<T>(src: &Image<T, 3>, dst: &mut Image<T, 3>) -> Result<(), ImageError>
where
    T: Copy + Send + Sync,
{
    if src.size() != dst.size() {
        return Err(ImageError::InvalidImageSize(
            dst.cols(),
            dst.rows(),
            src.cols(),
            src.rows(),
        ));
    }

    parallel::par_iter_rows(src, dst, |src_pixel, dst_pixel| {
        dst_pixel[0] = src_pixel[2];
        dst_pixel[1] = src_pixel[1];
        dst_pixel[2] = src_pixel[0];
    });

    Ok(())
}

/// Swap the blue and red channels, converting BGR to RGB.
pub fn rgb_from_bgr<T>(src: &Image<T, 3>, dst: &mut Image<T, 3>) -> Result<(), ImageError>
where
    T: Copy + Send + Sync,
{
    bgr_from_rgb(src, dst)
}

#[cfg(test)]
mod tests {
    use super::*;
    use camkit_image::ImageSize;

    #[test]
    fn rgb_bgr_rgb_roundtrip_exact() -> Result<(), ImageError> {
        let size = ImageSize {
            width: 2,
            height: 1,
        };
        let rgb = Image::<u8, 3>::new(size, vec![10, 20, 30, 40, 50, 60])?;

        let mut bgr = Image::<u8, 3>::from_size_val(size, 0)?;
        bgr_from_rgb(&rgb, &mut bgr)?;
        assert_eq!(bgr.as_slice(), &[30, 20, 10, 60, 50, 40]);

        let mut back = Image::<u8, 3>::from_size_val(size, 0)?;
        rgb_from_bgr(&bgr, &mut back)?;
        assert_eq!(back.as_slice(), rgb.as_slice());
        Ok(())
    }
}
