use camkit_image::{Image, ImageError, ImageSize};
use camkit_imgproc::draw::draw_filled_circle;
use nalgebra::Point2;

/// Render a coverage map of the detected calibration points.
///
/// Every detected 2-D point across all accepted images becomes a red dot on
/// a white canvas. A well-covered calibration shows dots spread over the
/// whole image space, not clustered in the middle.
pub fn coverage(
    size: ImageSize,
    image_points: &[Vec<Point2<f64>>],
) -> Result<Image<u8, 3>, ImageError> {
    let mut canvas = Image::<u8, 3>::from_size_val(size, 255)?;

    let radius = 5 * ((size.height as i64) / 1000).max(1);
    for frame in image_points {
        for p in frame {
            draw_filled_circle(
                &mut canvas,
                (p.x.round() as i64, p.y.round() as i64),
                radius,
                [255, 0, 0],
            );
        }
    }

    Ok(canvas)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dots_land_on_the_canvas() -> Result<(), ImageError> {
        let size = ImageSize {
            width: 100,
            height: 80,
        };
        let pts = vec![vec![Point2::new(50.0, 40.0)], vec![Point2::new(10.0, 10.0)]];
        let map = coverage(size, &pts)?;

        assert_eq!(map.get_pixel(50, 40, 0)?, 255);
        assert_eq!(map.get_pixel(50, 40, 1)?, 0);
        assert_eq!(map.get_pixel(50, 40, 2)?, 0);
        // untouched area stays white
        assert_eq!(map.get_pixel(90, 70, 1)?, 255);
        Ok(())
    }
}
