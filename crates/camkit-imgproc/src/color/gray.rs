use crate::parallel;
use camkit_image::{Image, ImageError};

/// RGB weights for the float grayscale conversion.
const RW: f32 = 0.299;
const GW: f32 = 0.587;
const BW: f32 = 0.114;

/// Integer RGB weights scaled by 256 for the u8 fast path.
const RW_U8: u16 = 77;
const GW_U8: u16 = 150;
const BW_U8: u16 = 29;

/// Convert an RGB image to grayscale using the formula:
///
/// Y = 0.299 * R + 0.587 * G + 0.114 * B
///
/// Precondition: the input and output images must have the same size.
///
/// # Example
///
/// ```
/// use camkit_image::{Image, ImageSize};
/// use camkit_imgproc::color::gray_from_rgb;
///
/// let image = Image::<f32, 3>::new(
///     ImageSize {
///         width: 4,
///         height: 5,
///     },
///     vec![0f32; 4 * 5 * 3],
/// )
/// .unwrap();
///
/// let mut gray = Image::<f32, 1>::from_size_val(image.size(), 0.0).unwrap();
///
/// gray_from_rgb(&image, &mut gray).unwrap();
/// assert_eq!(gray.num_channels(), 1);
/// ```
pub fn gray_from_rgb(src: &Image<f32, 3>, dst: &mut Image<f32, 1>) -> Result<(), ImageError> {
    check_same_size(src.size(), dst.size())?;

    parallel::par_iter_rows(src, dst, |src_pixel, dst_pixel| {
        dst_pixel[0] = RW * src_pixel[0] + GW * src_pixel[1] + BW * src_pixel[2];
    });

    Ok(())
}

/// Convert an RGB8 image to grayscale with integer arithmetic.
///
/// Y = (77 * R + 150 * G + 29 * B) >> 8
pub fn gray_from_rgb_u8(src: &Image<u8, 3>, dst: &mut Image<u8, 1>) -> Result<(), ImageError> {
    check_same_size(src.size(), dst.size())?;

    parallel::par_iter_rows(src, dst, |src_pixel, dst_pixel| {
        let y = RW_U8 * src_pixel[0] as u16 + GW_U8 * src_pixel[1] as u16
            + BW_U8 * src_pixel[2] as u16;
        dst_pixel[0] = (y >> 8) as u8;
    });

    Ok(())
}

/// Embed a grayscale image into three identical RGB channels.
///
/// The embedding is lossless: extracting any channel of the result yields the
/// original image.
pub fn rgb_from_gray<T>(src: &Image<T, 1>, dst: &mut Image<T, 3>) -> Result<(), ImageError>
where
    T: Copy + Send + Sync,
{
    check_same_size(src.size(), dst.size())?;

    parallel::par_iter_rows(src, dst, |src_pixel, dst_pixel| {
        dst_pixel[0] = src_pixel[0];
        dst_pixel[1] = src_pixel[0];
        dst_pixel[2] = src_pixel[0];
    });

    Ok(())
}

fn check_same_size(
    src: camkit_image::ImageSize,
    dst: camkit_image::ImageSize,
) -> Result<(), ImageError> {
    if src != dst {
        return Err(ImageError::InvalidImageSize(
            dst.width, dst.height, src.width, src.height,
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use camkit_image::ImageSize;

    #[test]
    fn gray_rgb_gray_roundtrip_exact() -> Result<(), ImageError> {
        let size = ImageSize {
            width: 3,
            height: 2,
        };
        let gray = Image::<u8, 1>::new(size, vec![0, 50, 100, 150, 200, 255])?;

        let mut rgb = Image::<u8, 3>::from_size_val(size, 0)?;
        rgb_from_gray(&gray, &mut rgb)?;

        let mut back = Image::<u8, 1>::from_size_val(size, 0)?;
        gray_from_rgb_u8(&rgb, &mut back)?;

        assert_eq!(back.as_slice(), gray.as_slice());
        Ok(())
    }

    #[test]
    fn gray_from_rgb_weights() -> Result<(), ImageError> {
        let size = ImageSize {
            width: 1,
            height: 1,
        };
        let rgb = Image::<f32, 3>::new(size, vec![255.0, 0.0, 0.0])?;
        let mut gray = Image::<f32, 1>::from_size_val(size, 0.0)?;
        gray_from_rgb(&rgb, &mut gray)?;
        approx::assert_relative_eq!(gray.as_slice()[0], 0.299 * 255.0, epsilon = 1e-4);
        Ok(())
    }

    #[test]
    fn size_mismatch_rejected() -> Result<(), ImageError> {
        let rgb = Image::<f32, 3>::from_size_val(
            ImageSize {
                width: 4,
                height: 4,
            },
            0.0,
        )?;
        let mut gray = Image::<f32, 1>::from_size_val(
            ImageSize {
                width: 2,
                height: 2,
            },
            0.0,
        )?;
        assert!(gray_from_rgb(&rgb, &mut gray).is_err());
        Ok(())
    }
}
