use camkit_targets::Detection;
use nalgebra::{Matrix3, Vector3};

use crate::distortion::{project_points, DistortionCoefficients};

/// Per-axis reprojection residuals plus RMS summaries.
#[derive(Debug, Clone, Default)]
pub struct ReprojectionErrors {
    /// RMS over every point of every view, in pixels.
    pub rms: f64,
    /// RMS per view, in pixels.
    pub per_view_rms: Vec<f64>,
    /// Signed x residual per point, per view.
    pub errors_x: Vec<Vec<f64>>,
    /// Signed y residual per point, per view.
    pub errors_y: Vec<Vec<f64>>,
}

/// Reproject object points through a calibrated model and compare against
/// the observed image points.
///
/// Views whose observation count does not match their object point count
/// are skipped rather than failing the whole batch.
pub fn compute_reprojection_errors(
    detections: &[Detection],
    rvecs: &[Vector3<f64>],
    tvecs: &[Vector3<f64>],
    k: &Matrix3<f64>,
    dist: &DistortionCoefficients,
) -> ReprojectionErrors {
    let mut out = ReprojectionErrors::default();
    let mut total_sq = 0.0;
    let mut total_points = 0usize;

    for ((det, rvec), tvec) in detections.iter().zip(rvecs).zip(tvecs) {
        let projected = project_points(&det.object_points, rvec, tvec, k, dist);

        if projected.len() != det.image_points.len() {
            log::warn!(
                "view skipped: {} projected vs {} observed points",
                projected.len(),
                det.image_points.len()
            );
            continue;
        }

        let mut ex = Vec::with_capacity(projected.len());
        let mut ey = Vec::with_capacity(projected.len());
        let mut view_sq = 0.0;

        for (proj, obs) in projected.iter().zip(det.image_points.iter()) {
            let dx = proj.x - obs.x;
            let dy = proj.y - obs.y;
            ex.push(dx);
            ey.push(dy);
            view_sq += dx * dx + dy * dy;
        }

        out.per_view_rms.push((view_sq / projected.len() as f64).sqrt());
        out.errors_x.push(ex);
        out.errors_y.push(ey);
        total_sq += view_sq;
        total_points += projected.len();
    }

    if total_points > 0 {
        out.rms = (total_sq / total_points as f64).sqrt();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::{Point2, Point3};

    #[test]
    fn perfect_projection_has_zero_error() {
        let k = Matrix3::new(500.0, 0.0, 320.0, 0.0, 500.0, 240.0, 0.0, 0.0, 1.0);
        let dist = DistortionCoefficients::default();
        let rvec = Vector3::new(0.05, -0.02, 0.0);
        let tvec = Vector3::new(0.01, 0.02, 0.8);

        let obj: Vec<Point3<f64>> = (0..12)
            .map(|i| Point3::new((i % 4) as f64 * 0.03, (i / 4) as f64 * 0.03, 0.0))
            .collect();
        let img = project_points(&obj, &rvec, &tvec, &k, &dist);
        let det = Detection::new(img, obj, None).unwrap();

        let errs = compute_reprojection_errors(&[det], &[rvec], &[tvec], &k, &dist);
        assert_relative_eq!(errs.rms, 0.0, epsilon = 1e-12);
        assert_eq!(errs.per_view_rms.len(), 1);
    }

    #[test]
    fn shifted_observations_measure_the_shift() {
        let k = Matrix3::new(500.0, 0.0, 320.0, 0.0, 500.0, 240.0, 0.0, 0.0, 1.0);
        let dist = DistortionCoefficients::default();
        let rvec = Vector3::zeros();
        let tvec = Vector3::new(0.0, 0.0, 1.0);

        let obj = vec![Point3::new(0.0, 0.0, 0.0), Point3::new(0.1, 0.0, 0.0)];
        let img: Vec<Point2<f64>> = project_points(&obj, &rvec, &tvec, &k, &dist)
            .iter()
            .map(|p| Point2::new(p.x + 2.0, p.y))
            .collect();
        let det = Detection::new(img, obj, None).unwrap();

        let errs = compute_reprojection_errors(&[det], &[rvec], &[tvec], &k, &dist);
        assert_relative_eq!(errs.rms, 2.0, epsilon = 1e-12);
        assert!(errs.errors_x[0].iter().all(|&dx| (dx + 2.0).abs() < 1e-12));
    }
}
