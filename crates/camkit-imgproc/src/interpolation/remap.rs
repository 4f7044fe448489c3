use rayon::prelude::*;

use super::{interpolate_pixel, InterpolationMode};
use camkit_image::{Image, ImageError};

/// Apply a generic geometric transformation to an image.
///
/// For every destination pixel, the value is sampled from the source at the
/// coordinate given by `map_x`/`map_y`.
///
/// # Errors
///
/// * The map images must have the same size.
/// * The output image must have the same size as the maps.
pub fn remap<const C: usize>(
    src: &Image<f32, C>,
    dst: &mut Image<f32, C>,
    map_x: &Image<f32, 1>,
    map_y: &Image<f32, 1>,
    interpolation: InterpolationMode,
) -> Result<(), ImageError> {
    if map_x.size() != map_y.size() {
        return Err(ImageError::InvalidImageSize(
            map_x.cols(),
            map_x.rows(),
            map_y.cols(),
            map_y.rows(),
        ));
    }

    if dst.size() != map_x.size() {
        return Err(ImageError::InvalidImageSize(
            dst.cols(),
            dst.rows(),
            map_x.cols(),
            map_x.rows(),
        ));
    }

    let cols = dst.cols();
    dst.as_slice_mut()
        .par_chunks_exact_mut(C * cols)
        .zip(map_x.as_slice().par_chunks_exact(cols))
        .zip(map_y.as_slice().par_chunks_exact(cols))
        .for_each(|((dst_row, mx_row), my_row)| {
            dst_row
                .chunks_exact_mut(C)
                .zip(mx_row.iter().zip(my_row.iter()))
                .for_each(|(dst_pixel, (&x, &y))| {
                    let pixel = interpolate_pixel(src, x, y, interpolation);
                    dst_pixel.copy_from_slice(&pixel);
                });
        });

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use camkit_image::ImageSize;

    #[test]
    fn remap_identity() -> Result<(), ImageError> {
        let size = ImageSize {
            width: 3,
            height: 3,
        };
        let src = Image::<f32, 1>::new(size, (0..9).map(|v| v as f32).collect())?;
        let (map_x, map_y) =
            super::super::meshgrid_from_fn(3, 3, |x, y| Ok((x as f32, y as f32)))?;

        let mut dst = Image::<f32, 1>::from_size_val(size, 0.0)?;
        remap(&src, &mut dst, &map_x, &map_y, InterpolationMode::Bilinear)?;
        assert_eq!(dst.as_slice(), src.as_slice());
        Ok(())
    }

    #[test]
    fn remap_flip_horizontal() -> Result<(), ImageError> {
        let size = ImageSize {
            width: 3,
            height: 1,
        };
        let src = Image::<f32, 1>::new(size, vec![1.0, 2.0, 3.0])?;
        let (map_x, map_y) = super::super::meshgrid_from_fn(3, 1, |x, y| {
            Ok(((2 - x) as f32, y as f32))
        })?;

        let mut dst = Image::<f32, 1>::from_size_val(size, 0.0)?;
        remap(&src, &mut dst, &map_x, &map_y, InterpolationMode::Nearest)?;
        assert_eq!(dst.as_slice(), &[3.0, 2.0, 1.0]);
        Ok(())
    }

    #[test]
    fn remap_size_mismatch_rejected() -> Result<(), ImageError> {
        let src = Image::<f32, 1>::from_size_val(
            ImageSize {
                width: 3,
                height: 3,
            },
            0.0,
        )?;
        let (map_x, map_y) =
            super::super::meshgrid_from_fn(2, 2, |x, y| Ok((x as f32, y as f32)))?;
        let mut dst = Image::<f32, 1>::from_size_val(
            ImageSize {
                width: 3,
                height: 3,
            },
            0.0,
        )?;
        assert!(remap(&src, &mut dst, &map_x, &map_y, InterpolationMode::Bilinear).is_err());
        Ok(())
    }
}
