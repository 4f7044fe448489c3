use camkit_image::Image;
use nalgebra::{Point2, Point3};

use crate::TargetError;

/// A correspondence set detected in a single image.
///
/// Invariant: `image_points` and `object_points` always have the same
/// length, and `ids` (when present) carries one entry per point.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    /// Detected 2-D feature positions in pixel coordinates.
    pub image_points: Vec<Point2<f64>>,
    /// Matching ideal 3-D positions on the target, in target units.
    pub object_points: Vec<Point3<f64>>,
    /// Per-point marker IDs for targets that carry them (tag boards).
    pub ids: Option<Vec<u32>>,
}

impl Detection {
    /// Create a detection, enforcing the matching-lengths invariant.
    pub fn new(
        image_points: Vec<Point2<f64>>,
        object_points: Vec<Point3<f64>>,
        ids: Option<Vec<u32>>,
    ) -> Result<Self, TargetError> {
        if image_points.len() != object_points.len() {
            return Err(TargetError::LengthMismatch(
                image_points.len(),
                object_points.len(),
            ));
        }
        if let Some(ids) = &ids {
            if ids.len() != image_points.len() {
                return Err(TargetError::LengthMismatch(image_points.len(), ids.len()));
            }
        }
        Ok(Self {
            image_points,
            object_points,
            ids,
        })
    }

    /// Number of correspondences in this detection.
    pub fn len(&self) -> usize {
        self.image_points.len()
    }

    /// Whether the detection is empty.
    pub fn is_empty(&self) -> bool {
        self.image_points.is_empty()
    }
}

/// A calibration target that can locate itself in a grayscale image.
pub trait TargetFinder {
    /// Human-readable target kind, e.g. `"Chessboard"`.
    fn kind(&self) -> &'static str;

    /// The target's ideal 3-D feature points in target units.
    fn object_points(&self) -> Vec<Point3<f64>>;

    /// Locate the target in an image.
    ///
    /// Returns `Ok(None)` when the pattern is not found; detector failures
    /// that indicate misconfiguration surface as errors.
    fn find(&self, gray: &Image<u8, 1>) -> Result<Option<Detection>, TargetError>;
}
