use camkit_image::Image;

/// Set a pixel's color, ignoring out-of-bounds coordinates.
#[inline]
fn set_pixel<const C: usize>(img: &mut Image<u8, C>, x: i64, y: i64, color: [u8; C]) {
    if x >= 0 && x < img.cols() as i64 && y >= 0 && y < img.rows() as i64 {
        let start = ((y as usize) * img.cols() + x as usize) * C;
        img.as_slice_mut()[start..start + C].copy_from_slice(&color);
    }
}

/// Draw a line on an image in place using Bresenham's algorithm.
///
/// # Arguments
///
/// * `img` - The image to draw on.
/// * `p0` - The start point of the line as (x, y).
/// * `p1` - The end point of the line as (x, y).
/// * `color` - The color of the line as an array of `C` elements.
/// * `thickness` - The line thickness in pixels (thickness > 1 is approximate).
pub fn draw_line<const C: usize>(
    img: &mut Image<u8, C>,
    p0: (i64, i64),
    p1: (i64, i64),
    color: [u8; C],
    thickness: usize,
) {
    let (mut x0, mut y0) = p0;
    let (x1, y1) = p1;

    let dx = (x1 - x0).abs();
    let dy = (y1 - y0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };

    let mut err = dx - dy;
    let half = thickness as i64 / 2;

    loop {
        if thickness <= 1 {
            set_pixel(img, x0, y0, color);
        } else {
            for i in -half..=half {
                for j in -half..=half {
                    set_pixel(img, x0 + i, y0 + j, color);
                }
            }
        }

        if x0 == x1 && y0 == y1 {
            break;
        }

        let e2 = 2 * err;
        if e2 > -dy {
            err -= dy;
            x0 += sx;
        }
        if e2 < dx {
            err += dx;
            y0 += sy;
        }
    }
}

/// Draw a filled circle on an image in place.
pub fn draw_filled_circle<const C: usize>(
    img: &mut Image<u8, C>,
    center: (i64, i64),
    radius: i64,
    color: [u8; C],
) {
    let (cx, cy) = center;
    for y in -radius..=radius {
        for x in -radius..=radius {
            if x * x + y * y <= radius * radius {
                set_pixel(img, cx + x, cy + y, color);
            }
        }
    }
}

/// Draw a closed polyline through the given points.
pub fn draw_polyline<const C: usize>(
    img: &mut Image<u8, C>,
    points: &[(i64, i64)],
    color: [u8; C],
    thickness: usize,
) {
    if points.len() < 2 {
        return;
    }
    for pair in points.windows(2) {
        draw_line(img, pair[0], pair[1], color, thickness);
    }
    draw_line(img, points[points.len() - 1], points[0], color, thickness);
}

#[cfg(test)]
mod tests {
    use super::*;
    use camkit_image::{ImageError, ImageSize};

    #[test]
    fn draw_line_horizontal() -> Result<(), ImageError> {
        let mut img = Image::<u8, 1>::from_size_val(
            ImageSize {
                width: 5,
                height: 3,
            },
            0,
        )?;
        draw_line(&mut img, (0, 1), (4, 1), [255], 1);
        for x in 0..5 {
            assert_eq!(img.get_pixel(x, 1, 0)?, 255);
        }
        assert_eq!(img.get_pixel(2, 0, 0)?, 0);
        Ok(())
    }

    #[test]
    fn draw_circle_center() -> Result<(), ImageError> {
        let mut img = Image::<u8, 3>::from_size_val(
            ImageSize {
                width: 7,
                height: 7,
            },
            0,
        )?;
        draw_filled_circle(&mut img, (3, 3), 2, [0, 255, 0]);
        assert_eq!(img.get_pixel(3, 3, 1)?, 255);
        assert_eq!(img.get_pixel(0, 0, 1)?, 0);
        Ok(())
    }

    #[test]
    fn draw_ignores_out_of_bounds() -> Result<(), ImageError> {
        let mut img = Image::<u8, 1>::from_size_val(
            ImageSize {
                width: 3,
                height: 3,
            },
            0,
        )?;
        draw_filled_circle(&mut img, (-10, -10), 2, [255]);
        assert!(img.as_slice().iter().all(|&v| v == 0));
        Ok(())
    }
}
