use camkit_image::Image;

/// Compute the variance of the Laplacian of a grayscale image.
///
/// A standard single-number focus measure: low values indicate a blurry
/// image. Border pixels are excluded from the response.
pub fn variance_of_laplacian(src: &Image<u8, 1>) -> f64 {
    let (cols, rows) = (src.cols(), src.rows());
    if cols < 3 || rows < 3 {
        return 0.0;
    }

    let data = src.as_slice();
    let n = (cols - 2) * (rows - 2);

    let mut sum = 0f64;
    let mut sum_sq = 0f64;

    for y in 1..rows - 1 {
        for x in 1..cols - 1 {
            let idx = y * cols + x;
            // 4-neighbor Laplacian kernel [0 1 0; 1 -4 1; 0 1 0]
            let v = data[idx - cols] as f64
                + data[idx + cols] as f64
                + data[idx - 1] as f64
                + data[idx + 1] as f64
                - 4.0 * data[idx] as f64;
            sum += v;
            sum_sq += v * v;
        }
    }

    let mean = sum / n as f64;
    sum_sq / n as f64 - mean * mean
}

/// Decide whether an image is blurry.
///
/// Returns the decision together with the measured focus value so callers can
/// report it.
pub fn is_blurry(src: &Image<u8, 1>, threshold: f64) -> (bool, f64) {
    let val = variance_of_laplacian(src);
    (val < threshold, val)
}

#[cfg(test)]
mod tests {
    use super::*;
    use camkit_image::{ImageError, ImageSize};

    #[test]
    fn flat_image_is_blurry() -> Result<(), ImageError> {
        let img = Image::<u8, 1>::from_size_val(
            ImageSize {
                width: 16,
                height: 16,
            },
            100,
        )?;
        let (blurry, val) = is_blurry(&img, 100.0);
        assert!(blurry);
        assert_eq!(val, 0.0);
        Ok(())
    }

    #[test]
    fn checkerboard_is_sharp() -> Result<(), ImageError> {
        let size = ImageSize {
            width: 16,
            height: 16,
        };
        let data = (0..16 * 16)
            .map(|i| {
                let (x, y) = (i % 16, i / 16);
                if (x + y) % 2 == 0 {
                    255
                } else {
                    0
                }
            })
            .collect();
        let img = Image::<u8, 1>::new(size, data)?;
        let (blurry, val) = is_blurry(&img, 100.0);
        assert!(!blurry);
        assert!(val > 100.0);
        Ok(())
    }
}
