use nalgebra::{Matrix3, Vector3};

use crate::error::CalibError;

/// The skew-symmetric cross-product matrix `[v]x`.
pub fn skew_symmetric(v: &Vector3<f64>) -> Matrix3<f64> {
    Matrix3::new(0.0, -v.z, v.y, v.z, 0.0, -v.x, -v.y, v.x, 0.0)
}

/// Essential matrix from a relative pose: `E = [t]x R`.
pub fn essential_from_pose(r: &Matrix3<f64>, t: &Vector3<f64>) -> Matrix3<f64> {
    skew_symmetric(t) * r
}

/// Fundamental matrix from intrinsics and a relative pose.
///
/// Uses the camera-not-at-infinity construction
/// `F = K2^-T R K1^T [K1 R^T t]x`, optionally normalized to unit Frobenius
/// norm since the raw entries span many orders of magnitude.
pub fn fundamental_from_pose(
    k1: &Matrix3<f64>,
    k2: &Matrix3<f64>,
    r: &Matrix3<f64>,
    t: &Vector3<f64>,
    normalize: bool,
) -> Result<Matrix3<f64>, CalibError> {
    let k2_inv = k2
        .try_inverse()
        .ok_or_else(|| CalibError::DegenerateGeometry("singular K2".into()))?;

    let a = k1 * r.transpose() * t;
    let c = skew_symmetric(&a);

    let mut f = k2_inv.transpose() * r * k1.transpose() * c;
    if normalize {
        let norm = f.norm();
        if norm < 1e-15 {
            return Err(CalibError::DegenerateGeometry(
                "fundamental matrix collapsed to zero".into(),
            ));
        }
        f /= norm;
    }
    Ok(f)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distortion::{project_points, DistortionCoefficients};
    use approx::assert_relative_eq;
    use nalgebra::{Point3, Rotation3};

    #[test]
    fn skew_encodes_cross_product() {
        let a = Vector3::new(1.0, 2.0, 3.0);
        let b = Vector3::new(-2.0, 0.5, 4.0);
        let via_matrix = skew_symmetric(&a) * b;
        let direct = a.cross(&b);
        assert_relative_eq!(via_matrix, direct, epsilon = 1e-12);
    }

    #[test]
    fn epipolar_constraint_holds() -> Result<(), CalibError> {
        let k1 = Matrix3::new(700.0, 0.0, 320.0, 0.0, 700.0, 240.0, 0.0, 0.0, 1.0);
        let k2 = Matrix3::new(710.0, 0.0, 315.0, 0.0, 705.0, 245.0, 0.0, 0.0, 1.0);

        let rvec = Vector3::new(0.02, -0.03, 0.01);
        let r = *Rotation3::from_scaled_axis(rvec).matrix();
        let t = Vector3::new(-0.1, 0.002, 0.004);

        let f = fundamental_from_pose(&k1, &k2, &r, &t, true)?;
        let no_dist = DistortionCoefficients::default();

        // project world points into both cameras and check x2^T F x1 = 0
        for p in [
            Point3::new(0.1, -0.05, 1.2),
            Point3::new(-0.2, 0.1, 0.9),
            Point3::new(0.05, 0.2, 1.6),
        ] {
            let x1 = project_points(
                &[p],
                &Vector3::zeros(),
                &Vector3::zeros(),
                &k1,
                &no_dist,
            )[0];
            let x2 = project_points(&[p], &rvec, &t, &k2, &no_dist)[0];

            let x1h = Vector3::new(x1.x, x1.y, 1.0);
            let x2h = Vector3::new(x2.x, x2.y, 1.0);
            let residual = (x2h.transpose() * f * x1h)[0];
            assert!(residual.abs() < 1e-6, "epipolar residual {}", residual);
        }
        Ok(())
    }

    #[test]
    fn essential_matches_fundamental() -> Result<(), CalibError> {
        let k = Matrix3::new(700.0, 0.0, 320.0, 0.0, 700.0, 240.0, 0.0, 0.0, 1.0);
        let r = *Rotation3::from_scaled_axis(Vector3::new(0.0, 0.05, 0.0)).matrix();
        let t = Vector3::new(-0.12, 0.0, 0.0);

        let e = essential_from_pose(&r, &t);
        let f = fundamental_from_pose(&k, &k, &r, &t, false)?;

        // E and K2^T F K1 agree up to scale
        let e_from_f = k.transpose() * f * k;
        let scale = e[(1, 2)] / e_from_f[(1, 2)];
        assert_relative_eq!(e, e_from_f * scale, epsilon = 1e-6);
        Ok(())
    }
}
