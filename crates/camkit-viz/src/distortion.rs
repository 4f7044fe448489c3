use camkit_calib::Camera;
use camkit_image::{Image, ImageError, ImageSize};
use camkit_imgproc::draw::{draw_filled_circle, draw_line};

/// A sampled lens distortion displacement field.
///
/// Each node records where an ideal pixel lands after distortion, as the
/// displacement `(du, dv)` from its undistorted position.
#[derive(Debug, Clone)]
pub struct DistortionField {
    /// Grid step in pixels.
    pub step: usize,
    /// Sampled nodes: `(u, v, du, dv)`.
    pub nodes: Vec<(f64, f64, f64, f64)>,
    /// Largest displacement magnitude in the field.
    pub max_magnitude: f64,
}

/// Sample a camera's distortion model on a pixel grid.
pub fn distortion_field(camera: &Camera, step: usize) -> DistortionField {
    let step = step.max(1);
    let k = &camera.k;
    let (fx, fy) = (k[(0, 0)], k[(1, 1)]);
    let (cx, cy) = (k[(0, 2)], k[(1, 2)]);

    let mut nodes = Vec::new();
    let mut max_magnitude = 0.0f64;

    let mut v = 0usize;
    while v < camera.height {
        let mut u = 0usize;
        while u < camera.width {
            let x = (u as f64 - cx) / fx;
            let y = (v as f64 - cy) / fy;
            let (xd, yd) = camera.dist.distort(x, y);
            let du = fx * xd + cx - u as f64;
            let dv = fy * yd + cy - v as f64;

            max_magnitude = max_magnitude.max(du.hypot(dv));
            nodes.push((u as f64, v as f64, du, dv));
            u += step;
        }
        v += step;
    }

    DistortionField {
        step,
        nodes,
        max_magnitude,
    }
}

/// Render a distortion field as displacement segments on a white canvas.
///
/// Each node draws a line from the ideal position to the distorted one,
/// with a dot at the ideal end. The principal point is marked in red.
pub fn render_distortion_field(
    camera: &Camera,
    field: &DistortionField,
) -> Result<Image<u8, 3>, ImageError> {
    let size = ImageSize {
        width: camera.width,
        height: camera.height,
    };
    let mut canvas = Image::<u8, 3>::from_size_val(size, 255)?;

    for &(u, v, du, dv) in &field.nodes {
        let p0 = (u.round() as i64, v.round() as i64);
        let p1 = ((u + du).round() as i64, (v + dv).round() as i64);
        draw_line(&mut canvas, p0, p1, [30, 100, 220], 1);
        draw_filled_circle(&mut canvas, p0, 1, [0, 0, 0]);
    }

    let cx = camera.k[(0, 2)].round() as i64;
    let cy = camera.k[(1, 2)].round() as i64;
    draw_filled_circle(&mut canvas, (cx, cy), 3, [255, 0, 0]);

    Ok(canvas)
}
