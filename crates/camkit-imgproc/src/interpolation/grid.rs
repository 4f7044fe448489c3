use camkit_image::{Image, ImageError, ImageSize};

/// Build a pair of coordinate maps by evaluating a function on a pixel grid.
///
/// The callback receives the destination `(x, y)` integer coordinate and
/// returns the source `(x, y)` coordinate to sample from. The maps can be fed
/// to [`super::remap`].
pub fn meshgrid_from_fn(
    cols: usize,
    rows: usize,
    f: impl Fn(usize, usize) -> Result<(f32, f32), ImageError>,
) -> Result<(Image<f32, 1>, Image<f32, 1>), ImageError> {
    let size = ImageSize {
        width: cols,
        height: rows,
    };

    let mut map_x = vec![0f32; cols * rows];
    let mut map_y = vec![0f32; cols * rows];

    for y in 0..rows {
        for x in 0..cols {
            let (sx, sy) = f(x, y)?;
            map_x[y * cols + x] = sx;
            map_y[y * cols + x] = sy;
        }
    }

    Ok((Image::new(size, map_x)?, Image::new(size, map_y)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn meshgrid_identity() -> Result<(), ImageError> {
        let (map_x, map_y) = meshgrid_from_fn(3, 2, |x, y| Ok((x as f32, y as f32)))?;
        assert_eq!(map_x.size().width, 3);
        assert_eq!(map_x.size().height, 2);
        assert_eq!(map_x.as_slice(), &[0.0, 1.0, 2.0, 0.0, 1.0, 2.0]);
        assert_eq!(map_y.as_slice(), &[0.0, 0.0, 0.0, 1.0, 1.0, 1.0]);
        Ok(())
    }
}
