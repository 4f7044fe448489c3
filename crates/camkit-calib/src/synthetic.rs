//! Synthetic planar calibration scenes.
//!
//! Generates exact correspondences by projecting an ideal planar grid
//! through a known camera model, so calibration results can be checked
//! against ground truth without image data.

use camkit_image::ImageSize;
use camkit_targets::Detection;
use nalgebra::{Matrix3, Point3, Vector3};

use crate::distortion::{project_points, DistortionCoefficients};
use crate::error::CalibError;

/// A generated scene: ground-truth camera model plus exact detections.
#[derive(Debug, Clone)]
pub struct PlanarScene {
    /// Ground-truth intrinsic matrix.
    pub k: Matrix3<f64>,
    /// Ground-truth distortion.
    pub dist: DistortionCoefficients,
    /// Image size the projections assume.
    pub image_size: ImageSize,
    /// One exact detection per pose.
    pub detections: Vec<Detection>,
    /// Ground-truth rotation per pose.
    pub rvecs: Vec<Vector3<f64>>,
    /// Ground-truth translation per pose.
    pub tvecs: Vec<Vector3<f64>>,
}

/// A planar grid of `rows x cols` object points with the given spacing.
pub fn planar_grid(rows: usize, cols: usize, spacing: f64) -> Vec<Point3<f64>> {
    let mut pts = Vec::with_capacity(rows * cols);
    for r in 0..rows {
        for c in 0..cols {
            pts.push(Point3::new(c as f64 * spacing, r as f64 * spacing, 0.0));
        }
    }
    pts
}

/// A set of target poses that covers the view with varying tilt and depth.
pub fn default_poses() -> Vec<(Vector3<f64>, Vector3<f64>)> {
    vec![
        (Vector3::new(0.0, 0.0, 0.0), Vector3::new(-0.06, -0.05, 0.5)),
        (Vector3::new(0.2, 0.0, 0.0), Vector3::new(-0.10, -0.02, 0.6)),
        (Vector3::new(0.0, 0.25, 0.0), Vector3::new(-0.02, -0.08, 0.55)),
        (Vector3::new(-0.15, 0.1, 0.05), Vector3::new(-0.04, -0.03, 0.7)),
        (Vector3::new(0.1, -0.2, -0.05), Vector3::new(-0.08, -0.06, 0.45)),
        (Vector3::new(-0.05, -0.1, 0.15), Vector3::new(-0.03, -0.07, 0.65)),
    ]
}

/// Project a planar grid through a known camera at each pose.
pub fn planar_scene(
    k: Matrix3<f64>,
    dist: DistortionCoefficients,
    image_size: ImageSize,
    poses: &[(Vector3<f64>, Vector3<f64>)],
    rows: usize,
    cols: usize,
    spacing: f64,
) -> Result<PlanarScene, CalibError> {
    let object_points = planar_grid(rows, cols, spacing);

    let mut detections = Vec::with_capacity(poses.len());
    let mut rvecs = Vec::with_capacity(poses.len());
    let mut tvecs = Vec::with_capacity(poses.len());

    for (rvec, tvec) in poses {
        let image_points = project_points(&object_points, rvec, tvec, &k, &dist);
        detections.push(Detection::new(
            image_points,
            object_points.clone(),
            None,
        )?);
        rvecs.push(*rvec);
        tvecs.push(*tvec);
    }

    Ok(PlanarScene {
        k,
        dist,
        image_size,
        detections,
        rvecs,
        tvecs,
    })
}
