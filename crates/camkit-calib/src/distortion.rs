use nalgebra::{Matrix3, Point2, Point3, Rotation3, Vector3};
use serde::{Deserialize, Serialize};

/// Plumb-bob lens distortion coefficients in OpenCV order.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DistortionCoefficients {
    /// First radial coefficient.
    pub k1: f64,
    /// Second radial coefficient.
    pub k2: f64,
    /// First tangential coefficient.
    pub p1: f64,
    /// Second tangential coefficient.
    pub p2: f64,
    /// Third radial coefficient.
    pub k3: f64,
}

impl DistortionCoefficients {
    /// Build from a coefficient slice in `[k1, k2, p1, p2, k3]` order.
    ///
    /// Shorter slices are zero-filled, matching calibration outputs that
    /// only carry the leading coefficients.
    pub fn from_slice(d: &[f64]) -> Self {
        let get = |i: usize| d.get(i).copied().unwrap_or(0.0);
        Self {
            k1: get(0),
            k2: get(1),
            p1: get(2),
            p2: get(3),
            k3: get(4),
        }
    }

    /// The coefficients as a `[k1, k2, p1, p2, k3]` array.
    pub fn to_array(self) -> [f64; 5] {
        [self.k1, self.k2, self.p1, self.p2, self.k3]
    }

    /// Whether all coefficients are zero.
    pub fn is_zero(&self) -> bool {
        self.to_array().iter().all(|&c| c == 0.0)
    }

    /// Apply the forward distortion model to a normalized image coordinate.
    pub fn distort(&self, x: f64, y: f64) -> (f64, f64) {
        let r2 = x * x + y * y;
        let r4 = r2 * r2;
        let r6 = r4 * r2;

        let radial = 1.0 + self.k1 * r2 + self.k2 * r4 + self.k3 * r6;
        let xd = x * radial + 2.0 * self.p1 * x * y + self.p2 * (r2 + 2.0 * x * x);
        let yd = y * radial + self.p1 * (r2 + 2.0 * y * y) + 2.0 * self.p2 * x * y;

        (xd, yd)
    }

    /// Invert the distortion model for a normalized image coordinate.
    ///
    /// Fixed-point iteration; five rounds are sufficient for lens models in
    /// the plumb-bob regime.
    pub fn undistort(&self, xd: f64, yd: f64) -> (f64, f64) {
        let mut x = xd;
        let mut y = yd;

        for _ in 0..5 {
            let r2 = x * x + y * y;
            let r4 = r2 * r2;
            let r6 = r4 * r2;

            let radial = 1.0 + self.k1 * r2 + self.k2 * r4 + self.k3 * r6;
            let dx = 2.0 * self.p1 * x * y + self.p2 * (r2 + 2.0 * x * x);
            let dy = self.p1 * (r2 + 2.0 * y * y) + 2.0 * self.p2 * x * y;

            x = (xd - dx) / radial;
            y = (yd - dy) / radial;
        }

        (x, y)
    }
}

impl From<[f64; 5]> for DistortionCoefficients {
    fn from(d: [f64; 5]) -> Self {
        Self::from_slice(&d)
    }
}

/// Project 3-D object points into pixel coordinates.
///
/// The pose maps object coordinates into the camera frame: `p_cam = R p + t`
/// with `R` the Rodrigues rotation of `rvec`.
pub fn project_points(
    object_points: &[Point3<f64>],
    rvec: &Vector3<f64>,
    tvec: &Vector3<f64>,
    k: &Matrix3<f64>,
    dist: &DistortionCoefficients,
) -> Vec<Point2<f64>> {
    let rotation = Rotation3::from_scaled_axis(*rvec);
    let (fx, fy) = (k[(0, 0)], k[(1, 1)]);
    let (cx, cy) = (k[(0, 2)], k[(1, 2)]);

    object_points
        .iter()
        .map(|p| {
            let pc = rotation * p + tvec;
            let x = pc.x / pc.z;
            let y = pc.y / pc.z;
            let (xd, yd) = dist.distort(x, y);
            Point2::new(fx * xd + cx, fy * yd + cy)
        })
        .collect()
}
