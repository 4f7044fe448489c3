use camkit_image::{Image, ImageError, ImageSize};
use camkit_imgproc::color::rgb_from_gray;
use camkit_imgproc::draw::draw_line;

/// Stack a rectified stereo pair side by side and draw horizontal
/// scanlines across both halves.
///
/// On a properly rectified pair, matching features sit on the same
/// scanline; the lines make vertical misalignment obvious.
pub fn epipolar_pair(
    left: &Image<u8, 1>,
    right: &Image<u8, 1>,
    lines: bool,
    thickness: usize,
) -> Result<Image<u8, 3>, ImageError> {
    if left.size() != right.size() {
        return Err(ImageError::InvalidImageSize(
            right.cols(),
            right.rows(),
            left.cols(),
            left.rows(),
        ));
    }

    let size = ImageSize {
        width: left.width() * 2,
        height: left.height(),
    };

    let mut gray = Image::<u8, 1>::from_size_val(size, 0)?;
    {
        let cols = left.width();
        let data = gray.as_slice_mut();
        for y in 0..left.height() {
            let dst = &mut data[y * 2 * cols..(y + 1) * 2 * cols];
            dst[..cols].copy_from_slice(&left.as_slice()[y * cols..(y + 1) * cols]);
            dst[cols..].copy_from_slice(&right.as_slice()[y * cols..(y + 1) * cols]);
        }
    }

    let mut pair = Image::<u8, 3>::from_size_val(size, 0)?;
    rgb_from_gray(&gray, &mut pair)?;

    if lines {
        let w = size.width as i64;
        for y in (0..size.height).step_by(20) {
            draw_line(
                &mut pair,
                (0, y as i64),
                (w - 1, y as i64),
                [0, 0, 200],
                thickness,
            );
        }
    }

    Ok(pair)
}

/// Blend the left stereo image over the right with pixel offsets.
///
/// A quick alignment check: tune the offsets until the two exposures line
/// up. The result covers only the overlapping region, so it will not be
/// pixel perfect at the borders.
pub fn stereo_overlay(
    left: &Image<u8, 1>,
    right: &Image<u8, 1>,
    x_offset: usize,
    y_offset: i64,
) -> Result<Image<u8, 1>, ImageError> {
    if left.size() != right.size() {
        return Err(ImageError::InvalidImageSize(
            right.cols(),
            right.rows(),
            left.cols(),
            left.rows(),
        ));
    }

    let (w, h) = (left.width(), left.height());
    let dy = y_offset.unsigned_abs() as usize;
    if x_offset >= w || dy >= h {
        return Err(ImageError::InvalidImageSize(x_offset, dy, w, h));
    }

    let out_w = w - x_offset;
    let out_h = h - dy;
    let mut out = Image::<u8, 1>::from_size_val(
        ImageSize {
            width: out_w,
            height: out_h,
        },
        0,
    )?;

    for y in 0..out_h {
        for x in 0..out_w {
            // positive y offset shifts the left image down
            let (ly, ry) = if y_offset >= 0 {
                (y + dy, y)
            } else {
                (y, y + dy)
            };
            let l = left.as_slice()[ly * w + (x + x_offset)];
            let r = right.as_slice()[ry * w + x];
            out.as_slice_mut()[y * out_w + x] = ((l as u16 + r as u16) / 2) as u8;
        }
    }

    Ok(out)
}
