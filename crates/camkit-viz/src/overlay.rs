use camkit_image::Image;
use camkit_imgproc::draw::{draw_filled_circle, draw_line, draw_polyline};
use nalgebra::Point2;

/// Draw detected pattern corners connected in detection order.
///
/// Mirrors the usual chessboard-corner overlay: dots at every corner with a
/// line snaking through them, so ordering mistakes stand out immediately.
pub fn draw_corners(img: &mut Image<u8, 3>, corners: &[Point2<f64>]) {
    let radius = ((img.height() as i64) / 200).max(2);

    for pair in corners.windows(2) {
        draw_line(
            img,
            (pair[0].x.round() as i64, pair[0].y.round() as i64),
            (pair[1].x.round() as i64, pair[1].y.round() as i64),
            [255, 160, 0],
            1,
        );
    }
    for p in corners {
        draw_filled_circle(
            img,
            (p.x.round() as i64, p.y.round() as i64),
            radius,
            [255, 0, 0],
        );
    }
}

/// Draw a detected tag outline.
///
/// Green edge polyline, blue corner dots, with the first corner in red so
/// the tag orientation is visible.
pub fn draw_tag(img: &mut Image<u8, 3>, corners: &[(f64, f64); 4]) {
    let pts: Vec<(i64, i64)> = corners
        .iter()
        .map(|&(x, y)| (x.round() as i64, y.round() as i64))
        .collect();

    draw_polyline(img, &pts, [0, 255, 0], 2);

    let radius = ((img.height() as i64) / 200).max(2);
    for (i, &p) in pts.iter().enumerate() {
        let color = if i == 0 { [255, 0, 0] } else { [0, 0, 255] };
        draw_filled_circle(img, p, radius, color);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camkit_image::{ImageError, ImageSize};

    #[test]
    fn corners_leave_marks() -> Result<(), ImageError> {
        let mut img = Image::<u8, 3>::from_size_val(
            ImageSize {
                width: 50,
                height: 50,
            },
            0,
        )?;
        draw_corners(
            &mut img,
            &[Point2::new(10.0, 10.0), Point2::new(40.0, 40.0)],
        );
        assert_eq!(img.get_pixel(10, 10, 0)?, 255);
        // some pixel on the connecting line is orange
        assert_eq!(img.get_pixel(25, 25, 1)?, 160);
        Ok(())
    }

    #[test]
    fn tag_orientation_corner_is_red() -> Result<(), ImageError> {
        let mut img = Image::<u8, 3>::from_size_val(
            ImageSize {
                width: 60,
                height: 60,
            },
            0,
        )?;
        let corners = [(10.0, 50.0), (50.0, 50.0), (50.0, 10.0), (10.0, 10.0)];
        draw_tag(&mut img, &corners);

        assert_eq!(img.get_pixel(10, 50, 0)?, 255);
        assert_eq!(img.get_pixel(10, 50, 2)?, 0);
        assert_eq!(img.get_pixel(50, 10, 2)?, 255);
        Ok(())
    }
}
