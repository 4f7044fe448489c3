use camkit_image::{Image, ImageError, ImageSize};
use camkit_imgproc::interpolation::InterpolationMode;
use camkit_imgproc::resize::resize_u8;

/// Build a single thumbnail sheet from a batch of images.
///
/// Useful to eyeball a calibration image set at a glance. `across` sets how
/// many thumbnails go in each row; thumbnails keep the aspect ratio of the
/// first image and empty grid cells stay black.
pub fn mosaic<const C: usize>(
    images: &[Image<u8, C>],
    across: usize,
) -> Result<Image<u8, C>, ImageError> {
    let Some(first) = images.first() else {
        return Image::from_size_val(
            ImageSize {
                width: 0,
                height: 0,
            },
            0,
        );
    };
    let across = across.max(1);

    // thumbnail size derived from the first image, aspect preserved
    let thumb_h = (first.height() / across).max(1);
    let thumb_w = (first.width() * thumb_h / first.height()).max(1);
    let thumb_size = ImageSize {
        width: thumb_w,
        height: thumb_h,
    };

    let rows = images.len().div_ceil(across);
    let sheet_size = ImageSize {
        width: thumb_w * across,
        height: thumb_h * rows,
    };
    let mut sheet = Image::<u8, C>::from_size_val(sheet_size, 0)?;

    for (i, img) in images.iter().enumerate() {
        let thumb = resize_u8(img, thumb_size, InterpolationMode::Nearest)?;
        let (gx, gy) = (i % across, i / across);
        paste(&mut sheet, &thumb, gx * thumb_w, gy * thumb_h);
    }

    Ok(sheet)
}

fn paste<const C: usize>(dst: &mut Image<u8, C>, src: &Image<u8, C>, x0: usize, y0: usize) {
    let dst_cols = dst.cols();
    let src_cols = src.cols();
    for y in 0..src.rows() {
        let src_start = y * src_cols * C;
        let dst_start = ((y0 + y) * dst_cols + x0) * C;
        dst.as_slice_mut()[dst_start..dst_start + src_cols * C]
            .copy_from_slice(&src.as_slice()[src_start..src_start + src_cols * C]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sheet_dimensions_follow_grid() -> Result<(), ImageError> {
        let size = ImageSize {
            width: 40,
            height: 30,
        };
        let images: Vec<Image<u8, 1>> = (0..7)
            .map(|i| Image::from_size_val(size, (i * 30) as u8))
            .collect::<Result<_, _>>()?;

        let sheet = mosaic(&images, 3)?;
        // 3 across, 3 rows (7 images), thumbs 10 px tall
        assert_eq!(sheet.size().height, 30);
        assert_eq!(sheet.size().width, 39);
        Ok(())
    }

    #[test]
    fn empty_input_yields_empty_sheet() -> Result<(), ImageError> {
        let sheet = mosaic::<1>(&[], 5)?;
        assert_eq!(sheet.size().width, 0);
        Ok(())
    }

    #[test]
    fn tiles_carry_their_source_values() -> Result<(), ImageError> {
        let size = ImageSize {
            width: 8,
            height: 8,
        };
        let images = vec![
            Image::<u8, 1>::from_size_val(size, 10)?,
            Image::<u8, 1>::from_size_val(size, 200)?,
        ];
        let sheet = mosaic(&images, 2)?;
        assert_eq!(sheet.get_pixel(0, 0, 0)?, 10);
        assert_eq!(sheet.get_pixel(sheet.cols() - 1, 0, 0)?, 200);
        Ok(())
    }
}
