use nalgebra::{DMatrix, Matrix3, Point2, Point3, Rotation3, Vector3};

use crate::error::CalibError;

/// Estimate the plane-to-image homography with the normalized DLT.
///
/// `object_points` are planar target coordinates (z is ignored),
/// `image_points` the matching pixel observations. At least four
/// correspondences in general position are required.
pub fn homography_dlt(
    object_points: &[Point3<f64>],
    image_points: &[Point2<f64>],
) -> Result<Matrix3<f64>, CalibError> {
    if object_points.len() != image_points.len() || object_points.len() < 4 {
        return Err(CalibError::DegenerateGeometry(format!(
            "homography needs >= 4 matched points, got {}/{}",
            object_points.len(),
            image_points.len()
        )));
    }

    let src: Vec<Point2<f64>> = object_points
        .iter()
        .map(|p| Point2::new(p.x, p.y))
        .collect();

    let t_src = normalizing_transform(&src)?;
    let t_dst = normalizing_transform(image_points)?;

    let n = src.len();
    let mut a = DMatrix::<f64>::zeros(2 * n, 9);

    for (i, (s, d)) in src.iter().zip(image_points.iter()).enumerate() {
        let sh = t_src * s.to_homogeneous();
        let dh = t_dst * d.to_homogeneous();
        let (x, y) = (sh.x / sh.z, sh.y / sh.z);
        let (u, v) = (dh.x / dh.z, dh.y / dh.z);

        a.row_mut(2 * i)
            .copy_from_slice(&[-x, -y, -1.0, 0.0, 0.0, 0.0, u * x, u * y, u]);
        a.row_mut(2 * i + 1)
            .copy_from_slice(&[0.0, 0.0, 0.0, -x, -y, -1.0, v * x, v * y, v]);
    }

    let svd = a.svd(false, true);
    let v_t = svd
        .v_t
        .ok_or_else(|| CalibError::DegenerateGeometry("SVD failed".into()))?;
    let h = v_t.row(v_t.nrows() - 1);

    let h_norm = Matrix3::new(h[0], h[1], h[2], h[3], h[4], h[5], h[6], h[7], h[8]);

    let t_dst_inv = t_dst
        .try_inverse()
        .ok_or_else(|| CalibError::DegenerateGeometry("singular normalization".into()))?;
    let mut hmtx = t_dst_inv * h_norm * t_src;

    if hmtx[(2, 2)].abs() < 1e-12 {
        return Err(CalibError::DegenerateGeometry(
            "homography is singular at the origin".into(),
        ));
    }
    hmtx /= hmtx[(2, 2)];

    Ok(hmtx)
}

/// Hartley normalization: translate to the centroid, scale to mean length
/// sqrt(2).
fn normalizing_transform(points: &[Point2<f64>]) -> Result<Matrix3<f64>, CalibError> {
    let n = points.len() as f64;
    let (mut mx, mut my) = (0.0, 0.0);
    for p in points {
        mx += p.x;
        my += p.y;
    }
    mx /= n;
    my /= n;

    let mean_dist = points
        .iter()
        .map(|p| ((p.x - mx).powi(2) + (p.y - my).powi(2)).sqrt())
        .sum::<f64>()
        / n;

    if mean_dist < 1e-12 {
        return Err(CalibError::DegenerateGeometry(
            "coincident points in homography estimation".into(),
        ));
    }

    let s = std::f64::consts::SQRT_2 / mean_dist;
    Ok(Matrix3::new(s, 0.0, -s * mx, 0.0, s, -s * my, 0.0, 0.0, 1.0))
}

/// Recover the target pose from a plane homography and an intrinsic guess.
///
/// Decomposes `K^-1 H = lambda [r1 r2 t]`, rebuilds the third rotation
/// column and projects the result onto SO(3). The sign is chosen so the
/// target sits in front of the camera.
pub fn pose_from_homography(
    h: &Matrix3<f64>,
    k: &Matrix3<f64>,
) -> Result<(Vector3<f64>, Vector3<f64>), CalibError> {
    let k_inv = k
        .try_inverse()
        .ok_or_else(|| CalibError::DegenerateGeometry("singular intrinsic matrix".into()))?;
    let m = k_inv * h;

    let h1 = m.column(0).into_owned();
    let h2 = m.column(1).into_owned();
    let h3 = m.column(2).into_owned();

    let norm = (h1.norm() * h2.norm()).sqrt();
    if norm < 1e-12 {
        return Err(CalibError::DegenerateGeometry(
            "homography columns collapse to zero".into(),
        ));
    }

    let mut r1 = h1 / norm;
    let mut r2 = h2 / norm;
    let mut t = h3 / norm;

    if t.z < 0.0 {
        r1 = -r1;
        r2 = -r2;
        t = -t;
    }

    let r3 = r1.cross(&r2);
    let r_approx = Matrix3::from_columns(&[r1, r2, r3]);

    // nearest rotation in the Frobenius sense
    let svd = r_approx.svd(true, true);
    let u = svd
        .u
        .ok_or_else(|| CalibError::DegenerateGeometry("SVD failed".into()))?;
    let v_t = svd
        .v_t
        .ok_or_else(|| CalibError::DegenerateGeometry("SVD failed".into()))?;
    let mut r = u * v_t;
    if r.determinant() < 0.0 {
        let flip = Matrix3::from_diagonal(&Vector3::new(1.0, 1.0, -1.0));
        r = u * flip * v_t;
    }

    let rvec = Rotation3::from_matrix_unchecked(r).scaled_axis();
    Ok((rvec, t))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distortion::{project_points, DistortionCoefficients};
    use approx::assert_relative_eq;

    fn grid(rows: usize, cols: usize, step: f64) -> Vec<Point3<f64>> {
        let mut pts = Vec::new();
        for r in 0..rows {
            for c in 0..cols {
                pts.push(Point3::new(c as f64 * step, r as f64 * step, 0.0));
            }
        }
        pts
    }

    #[test]
    fn homography_recovers_projection() -> Result<(), CalibError> {
        let k = Matrix3::new(800.0, 0.0, 320.0, 0.0, 800.0, 240.0, 0.0, 0.0, 1.0);
        let rvec = Vector3::new(0.1, -0.2, 0.05);
        let tvec = Vector3::new(-0.05, 0.08, 0.6);
        let obj = grid(4, 5, 0.03);
        let img = project_points(&obj, &rvec, &tvec, &k, &DistortionCoefficients::default());

        let h = homography_dlt(&obj, &img)?;

        for (o, i) in obj.iter().zip(img.iter()) {
            let p = h * nalgebra::Vector3::new(o.x, o.y, 1.0);
            assert_relative_eq!(p.x / p.z, i.x, epsilon = 1e-6);
            assert_relative_eq!(p.y / p.z, i.y, epsilon = 1e-6);
        }
        Ok(())
    }

    #[test]
    fn pose_recovered_from_homography() -> Result<(), CalibError> {
        let k = Matrix3::new(800.0, 0.0, 320.0, 0.0, 800.0, 240.0, 0.0, 0.0, 1.0);
        let rvec = Vector3::new(0.15, -0.1, 0.02);
        let tvec = Vector3::new(0.02, -0.03, 0.5);
        let obj = grid(5, 6, 0.025);
        let img = project_points(&obj, &rvec, &tvec, &k, &DistortionCoefficients::default());

        let h = homography_dlt(&obj, &img)?;
        let (rvec_est, tvec_est) = pose_from_homography(&h, &k)?;

        assert_relative_eq!(rvec_est.x, rvec.x, epsilon = 1e-4);
        assert_relative_eq!(rvec_est.y, rvec.y, epsilon = 1e-4);
        assert_relative_eq!(rvec_est.z, rvec.z, epsilon = 1e-4);
        assert_relative_eq!(tvec_est.z, tvec.z, epsilon = 1e-4);
        Ok(())
    }

    #[test]
    fn too_few_points_rejected() {
        let obj = grid(1, 3, 0.03);
        let img = vec![
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(2.0, 0.0),
        ];
        assert!(homography_dlt(&obj, &img).is_err());
    }
}
