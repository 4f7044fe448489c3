use camkit_image::Image;

/// Kernel for nearest neighbor interpolation.
pub(crate) fn nearest_neighbor_interpolation<const C: usize>(
    image: &Image<f32, C>,
    u: f32,
    v: f32,
) -> [f32; C] {
    let (rows, cols) = (image.rows(), image.cols());

    let iu = (u.round() as i64).clamp(0, cols as i64 - 1) as usize;
    let iv = (v.round() as i64).clamp(0, rows as i64 - 1) as usize;

    let base = (iv * cols + iu) * C;
    let data = image.as_slice();

    let mut pixel = [0.0; C];
    pixel.copy_from_slice(&data[base..base + C]);
    pixel
}
