use rayon::prelude::*;

use camkit_image::Image;

/// Apply a function to each pixel of `src`/`dst`, processing rows in parallel.
pub(crate) fn par_iter_rows<T1, const C1: usize, T2, const C2: usize>(
    src: &Image<T1, C1>,
    dst: &mut Image<T2, C2>,
    f: impl Fn(&[T1], &mut [T2]) + Send + Sync,
) where
    T1: Copy + Send + Sync,
    T2: Copy + Send + Sync,
{
    let cols = src.cols();
    src.as_slice()
        .par_chunks_exact(C1 * cols)
        .zip(dst.as_slice_mut().par_chunks_exact_mut(C2 * cols))
        .for_each(|(src_row, dst_row)| {
            src_row
                .chunks_exact(C1)
                .zip(dst_row.chunks_exact_mut(C2))
                .for_each(|(src_pixel, dst_pixel)| {
                    f(src_pixel, dst_pixel);
                });
        });
}
