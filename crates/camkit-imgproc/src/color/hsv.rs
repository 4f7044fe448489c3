use crate::parallel;
use camkit_image::{Image, ImageError};

/// Convert an RGB8 image to an HSV image.
///
/// The output channels are scaled to the u8 range:
///
/// * H: hue, [0, 255] covering 0-360 degrees.
/// * S: saturation, [0, 255].
/// * V: value, [0, 255].
pub fn hsv_from_rgb(src: &Image<u8, 3>, dst: &mut Image<u8, 3>) -> Result<(), ImageError> {
    if src.size() != dst.size() {
        return Err(ImageError::InvalidImageSize(
            dst.cols(),
            dst.rows(),
            src.cols(),
            src.rows(),
        ));
    }

    parallel::par_iter_rows(src, dst, |src_pixel, dst_pixel| {
        let r = src_pixel[0] as f32 / 255.0;
        let g = src_pixel[1] as f32 / 255.0;
        let b = src_pixel[2] as f32 / 255.0;

        let max = r.max(g).max(b);
        let min = r.min(g).min(b);
        let delta = max - min;

        let h = if delta == 0.0 {
            0.0
        } else if max == r {
            60.0 * (((g - b) / delta) % 6.0)
        } else if max == g {
            60.0 * (((b - r) / delta) + 2.0)
        } else {
            60.0 * (((r - g) / delta) + 4.0)
        };
        let h = if h < 0.0 { h + 360.0 } else { h };

        let s = if max == 0.0 { 0.0 } else { delta / max };

        dst_pixel[0] = (h / 360.0 * 255.0).round() as u8;
        dst_pixel[1] = (s * 255.0).round() as u8;
        dst_pixel[2] = (max * 255.0).round() as u8;
    });

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use camkit_image::ImageSize;

    #[test]
    fn hsv_preserves_shape() -> Result<(), ImageError> {
        let size = ImageSize {
            width: 4,
            height: 3,
        };
        let rgb = Image::<u8, 3>::from_size_val(size, 128)?;
        let mut hsv = Image::<u8, 3>::from_size_val(size, 0)?;
        hsv_from_rgb(&rgb, &mut hsv)?;
        assert_eq!(hsv.size(), rgb.size());
        assert_eq!(hsv.num_channels(), 3);
        Ok(())
    }

    #[test]
    fn hsv_pure_red() -> Result<(), ImageError> {
        let size = ImageSize {
            width: 1,
            height: 1,
        };
        let rgb = Image::<u8, 3>::new(size, vec![255, 0, 0])?;
        let mut hsv = Image::<u8, 3>::from_size_val(size, 0)?;
        hsv_from_rgb(&rgb, &mut hsv)?;
        // hue 0, full saturation, full value
        assert_eq!(hsv.as_slice(), &[0, 255, 255]);
        Ok(())
    }
}
