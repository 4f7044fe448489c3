/// Order a cloud of exactly `rows * cols` grid points row-major.
///
/// The points are projected onto the cloud's principal axes, split into
/// `rows` bands along the second axis and sorted along the first within each
/// band. Axis signs are normalized so the ordering starts near the image
/// origin. Returns `None` when the points do not form a consistent grid at
/// the requested shape (the caller treats this as "pattern not found").
pub fn order_grid(points: &[(f64, f64)], rows: usize, cols: usize) -> Option<Vec<(f64, f64)>> {
    if rows == 0 || cols == 0 || points.len() != rows * cols {
        return None;
    }

    try_order(points, rows, cols, false).or_else(|| try_order(points, rows, cols, true))
}

fn try_order(
    points: &[(f64, f64)],
    rows: usize,
    cols: usize,
    swap_axes: bool,
) -> Option<Vec<(f64, f64)>> {
    let n = points.len() as f64;
    let (mut mx, mut my) = (0.0, 0.0);
    for &(x, y) in points {
        mx += x;
        my += y;
    }
    mx /= n;
    my /= n;

    // 2x2 covariance, closed-form eigenvectors
    let (mut sxx, mut sxy, mut syy) = (0.0, 0.0, 0.0);
    for &(x, y) in points {
        let (dx, dy) = (x - mx, y - my);
        sxx += dx * dx;
        sxy += dx * dy;
        syy += dy * dy;
    }

    let trace = sxx + syy;
    let det = sxx * syy - sxy * sxy;
    let disc = (trace * trace / 4.0 - det).max(0.0).sqrt();
    let l1 = trace / 2.0 + disc;

    let (mut ux, mut uy) = if sxy.abs() > 1e-12 {
        (l1 - syy, sxy)
    } else if sxx >= syy {
        (1.0, 0.0)
    } else {
        (0.0, 1.0)
    };
    let norm = (ux * ux + uy * uy).sqrt();
    if norm < 1e-12 {
        return None;
    }
    ux /= norm;
    uy /= norm;
    // second axis perpendicular to the first
    let (mut vx, mut vy) = (-uy, ux);

    // orient axes towards increasing pixel coordinates
    if ux < 0.0 || (ux.abs() < 1e-9 && uy < 0.0) {
        ux = -ux;
        uy = -uy;
    }
    if vy < 0.0 || (vy.abs() < 1e-9 && vx < 0.0) {
        vx = -vx;
        vy = -vy;
    }

    let (au, av) = if swap_axes {
        ((vx, vy), (ux, uy))
    } else {
        ((ux, uy), (vx, vy))
    };

    let mut projected: Vec<(f64, f64, (f64, f64))> = points
        .iter()
        .map(|&(x, y)| {
            let (dx, dy) = (x - mx, y - my);
            (dx * au.0 + dy * au.1, dx * av.0 + dy * av.1, (x, y))
        })
        .collect();

    // band along the second axis, then sort along the first within each band
    projected.sort_by(|a, b| a.1.total_cmp(&b.1));

    let mut ordered = Vec::with_capacity(points.len());
    let mut max_spread = 0.0f64;
    let mut min_gap = f64::INFINITY;
    let mut prev_band_max = f64::NEG_INFINITY;

    for r in 0..rows {
        let band = &mut projected[r * cols..(r + 1) * cols];
        let band_min = band.iter().map(|p| p.1).fold(f64::INFINITY, f64::min);
        let band_max = band.iter().map(|p| p.1).fold(f64::NEG_INFINITY, f64::max);
        if r > 0 {
            min_gap = min_gap.min(band_min - prev_band_max);
        }
        max_spread = max_spread.max(band_max - band_min);
        prev_band_max = band_max;

        band.sort_by(|a, b| a.0.total_cmp(&b.0));
        ordered.extend(band.iter().map(|p| p.2));
    }

    // a real grid separates its bands along the second axis: every band
    // must be tighter than the spacing to its neighbor, otherwise the
    // banding was ambiguous
    if rows > 1 && (min_gap <= 0.0 || max_spread >= min_gap) {
        return None;
    }

    Some(ordered)
}
